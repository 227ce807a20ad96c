//! BitTorrent wire protocol abstractions and message types.
//!
//! Peer-to-peer protocol implementation following BEP 3. Defines the
//! handshake procedure that gates every peer connection, the closed set of
//! wire message types with their symmetric encode/decode contract, and the
//! TCP framing layer that carries them.

pub mod connection;
pub mod handshake;
pub mod messages;
pub mod types;

// Re-export public API
pub use connection::TcpPeerConnection;
pub use handshake::{BASE_HANDSHAKE_LENGTH, HandshakeCodec, PROTOCOL_IDENTIFIER};
pub use messages::MessageCodec;
pub use types::{PeerHandshake, PeerId, PeerMessage, PeerProtocol, PeerState};

/// Errors from wire protocol encoding, decoding, and connection handling.
///
/// Decode errors are hard failures: a connection that produced one is
/// unusable and must be dropped, without affecting any other peer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Incorrect handshake message length (pstrlen={pstrlen}, {remaining} bytes after it)")]
    HandshakeLength { pstrlen: u8, remaining: usize },

    #[error("Unknown protocol {name:?}")]
    UnknownProtocol { name: String },

    #[error("Info hash mismatch in handshake")]
    InfoHashMismatch,

    #[error("Incorrect {kind} message length ({length} payload bytes)")]
    MessageLength { kind: &'static str, length: usize },

    #[error("Unknown message id: {id}")]
    UnknownMessageId { id: u8 },

    #[error("Message frame of {length} bytes exceeds maximum {max}")]
    FrameTooLarge { length: u32, max: u32 },

    #[error("Peer connection error: {reason}")]
    Connection { reason: String },
}

#[cfg(test)]
mod tests {
    use super::handshake::HandshakeCodec;
    use super::types::{PeerHandshake, PeerId};
    use crate::InfoHash;

    #[test]
    fn test_peer_id_generation() {
        let peer_id = PeerId::generate();
        let bytes = peer_id.as_bytes();

        // Should start with the Tidewire client identifier
        assert_eq!(&bytes[..8], b"-TW0001-");

        // Should have random remaining bytes
        let peer_id2 = PeerId::generate();
        assert_ne!(peer_id.as_bytes(), peer_id2.as_bytes());
    }

    #[test]
    fn test_peer_handshake_creation() {
        let info_hash = InfoHash::new([1u8; 20]);
        let peer_id = PeerId::new([2u8; 20]);

        let handshake = PeerHandshake::new(info_hash, peer_id);

        assert_eq!(handshake.protocol, "BitTorrent protocol");
        assert_eq!(handshake.reserved, [0u8; 8]);
        assert_eq!(handshake.info_hash, info_hash);
        assert_eq!(handshake.peer_id, peer_id);
    }

    #[test]
    fn test_handshake_round_trip_preserves_identities() {
        // Round-trip law over a handful of distinct (info_hash, peer_id) pairs
        for seed in [0u8, 1, 0x7F, 0xFE] {
            let info_hash = InfoHash::new([seed; 20]);
            let peer_id = PeerId::new([seed.wrapping_add(1); 20]);
            let handshake = PeerHandshake::new(info_hash, peer_id);

            let decoded = HandshakeCodec::deserialize_handshake(
                &HandshakeCodec::serialize_handshake(&handshake),
            )
            .unwrap();

            assert_eq!(decoded.info_hash, info_hash);
            assert_eq!(decoded.peer_id, peer_id);
        }
    }
}
