//! BitTorrent wire protocol message serialization and deserialization
//!
//! The codec operates on a single already-length-delimited region: the
//! 4-byte big-endian length prefix that frames every non-handshake message
//! on the wire belongs to the connection layer, never to the codec. The
//! codec never reads past the region it is handed.

use bytes::{Buf, BufMut, Bytes};

use super::ProtocolError;
use super::types::PeerMessage;

/// Message serialization utilities for the BitTorrent wire protocol.
pub struct MessageCodec;

impl MessageCodec {
    /// Serializes a peer message into its length-delimited region.
    ///
    /// Returns the message id byte followed by the payload; `KeepAlive`
    /// serializes to the empty region. Encoding is deterministic and never
    /// alters logical content, so `deserialize(serialize(m)) == m`.
    pub fn serialize_message(message: &PeerMessage) -> Vec<u8> {
        let mut buf = Vec::new();

        match message {
            PeerMessage::KeepAlive => {}
            PeerMessage::Choke => buf.put_u8(0),
            PeerMessage::Unchoke => buf.put_u8(1),
            PeerMessage::Interested => buf.put_u8(2),
            PeerMessage::NotInterested => buf.put_u8(3),
            PeerMessage::Have { piece_index } => {
                buf.put_u8(4);
                buf.put_u32(*piece_index);
            }
            PeerMessage::Bitfield { bitfield } => {
                buf.put_u8(5);
                buf.extend_from_slice(bitfield);
            }
            PeerMessage::Request {
                piece_index,
                offset,
                length,
            } => {
                buf.put_u8(6);
                buf.put_u32(*piece_index);
                buf.put_u32(*offset);
                buf.put_u32(*length);
            }
            PeerMessage::Piece {
                piece_index,
                offset,
                data,
            } => {
                buf.put_u8(7);
                buf.put_u32(*piece_index);
                buf.put_u32(*offset);
                buf.extend_from_slice(data);
            }
            PeerMessage::Cancel {
                piece_index,
                offset,
                length,
            } => {
                buf.put_u8(8);
                buf.put_u32(*piece_index);
                buf.put_u32(*offset);
                buf.put_u32(*length);
            }
            PeerMessage::Port { port } => {
                buf.put_u8(9);
                buf.put_u16(*port);
            }
        }

        buf
    }

    /// Deserializes a peer message from its length-delimited region.
    ///
    /// The empty region is `KeepAlive`. Every fixed-size variant requires
    /// its exact payload length; a mismatch is a format error, never a
    /// short or over-long read.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::MessageLength` - Wrong payload length for the declared type
    /// - `ProtocolError::UnknownMessageId` - Unrecognized message id byte
    pub fn deserialize_message(data: &[u8]) -> Result<PeerMessage, ProtocolError> {
        let Some((&message_id, payload)) = data.split_first() else {
            return Ok(PeerMessage::KeepAlive);
        };

        let expect_len = |kind: &'static str, len: usize| {
            if payload.len() == len {
                Ok(())
            } else {
                Err(ProtocolError::MessageLength {
                    kind,
                    length: payload.len(),
                })
            }
        };

        let mut buf = payload;
        match message_id {
            0 => {
                expect_len("choke", 0)?;
                Ok(PeerMessage::Choke)
            }
            1 => {
                expect_len("unchoke", 0)?;
                Ok(PeerMessage::Unchoke)
            }
            2 => {
                expect_len("interested", 0)?;
                Ok(PeerMessage::Interested)
            }
            3 => {
                expect_len("not interested", 0)?;
                Ok(PeerMessage::NotInterested)
            }
            4 => {
                expect_len("have", 4)?;
                Ok(PeerMessage::Have {
                    piece_index: buf.get_u32(),
                })
            }
            5 => Ok(PeerMessage::Bitfield {
                bitfield: Bytes::copy_from_slice(payload),
            }),
            6 => {
                expect_len("request", 12)?;
                Ok(PeerMessage::Request {
                    piece_index: buf.get_u32(),
                    offset: buf.get_u32(),
                    length: buf.get_u32(),
                })
            }
            7 => {
                if payload.len() < 8 {
                    return Err(ProtocolError::MessageLength {
                        kind: "piece",
                        length: payload.len(),
                    });
                }
                let piece_index = buf.get_u32();
                let offset = buf.get_u32();
                Ok(PeerMessage::Piece {
                    piece_index,
                    offset,
                    data: Bytes::copy_from_slice(buf),
                })
            }
            8 => {
                expect_len("cancel", 12)?;
                Ok(PeerMessage::Cancel {
                    piece_index: buf.get_u32(),
                    offset: buf.get_u32(),
                    length: buf.get_u32(),
                })
            }
            9 => {
                expect_len("port", 2)?;
                Ok(PeerMessage::Port {
                    port: buf.get_u16(),
                })
            }
            id => Err(ProtocolError::UnknownMessageId { id }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_round_trip_all_variants() {
        let test_cases = vec![
            PeerMessage::KeepAlive,
            PeerMessage::Choke,
            PeerMessage::Unchoke,
            PeerMessage::Interested,
            PeerMessage::NotInterested,
            PeerMessage::Have { piece_index: 42 },
            PeerMessage::Bitfield {
                bitfield: Bytes::from_static(&[0b1010_0001, 0b0100_0000]),
            },
            PeerMessage::Request {
                piece_index: 10,
                offset: 16384,
                length: 16384,
            },
            PeerMessage::Piece {
                piece_index: 3,
                offset: 32768,
                data: Bytes::from(vec![1, 2, 3, 4, 5]),
            },
            PeerMessage::Cancel {
                piece_index: 10,
                offset: 16384,
                length: 16384,
            },
            PeerMessage::Port { port: 6881 },
        ];

        for original in test_cases {
            let serialized = MessageCodec::serialize_message(&original);
            let deserialized = MessageCodec::deserialize_message(&serialized).unwrap();
            assert_eq!(original, deserialized);
        }
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let message = PeerMessage::Request {
            piece_index: 7,
            offset: 0,
            length: 16384,
        };
        assert_eq!(
            MessageCodec::serialize_message(&message),
            MessageCodec::serialize_message(&message)
        );
    }

    #[test]
    fn test_keep_alive_is_empty_region() {
        assert!(MessageCodec::serialize_message(&PeerMessage::KeepAlive).is_empty());
        assert_eq!(
            MessageCodec::deserialize_message(&[]).unwrap(),
            PeerMessage::KeepAlive
        );
    }

    #[test]
    fn test_wrong_length_for_declared_type() {
        // Have with a 3-byte payload
        let result = MessageCodec::deserialize_message(&[4, 0, 0, 1]);
        assert!(matches!(
            result,
            Err(ProtocolError::MessageLength {
                kind: "have",
                length: 3
            })
        ));

        // Choke with a trailing byte
        let result = MessageCodec::deserialize_message(&[0, 0]);
        assert!(matches!(
            result,
            Err(ProtocolError::MessageLength { kind: "choke", .. })
        ));

        // Piece shorter than its fixed header
        let result = MessageCodec::deserialize_message(&[7, 0, 0, 0, 1]);
        assert!(matches!(
            result,
            Err(ProtocolError::MessageLength { kind: "piece", .. })
        ));
    }

    #[test]
    fn test_unknown_message_id() {
        let result = MessageCodec::deserialize_message(&[42]);
        assert!(matches!(
            result,
            Err(ProtocolError::UnknownMessageId { id: 42 })
        ));
    }

    #[test]
    fn test_empty_bitfield_allowed() {
        let deserialized = MessageCodec::deserialize_message(&[5]).unwrap();
        assert_eq!(
            deserialized,
            PeerMessage::Bitfield {
                bitfield: Bytes::new()
            }
        );
    }
}
