//! BitTorrent handshake serialization and deserialization

use super::ProtocolError;
use super::types::{PeerHandshake, PeerId};
use crate::InfoHash;

/// Total handshake length assuming a zero-length protocol identifier:
/// 1 length byte + 8 reserved + 20 info hash + 20 peer id.
pub const BASE_HANDSHAKE_LENGTH: usize = 49;

/// The canonical 19-byte protocol identifier from BEP 3.
pub const PROTOCOL_IDENTIFIER: &[u8; 19] = b"BitTorrent protocol";

/// Handshake serialization utilities for the BitTorrent wire protocol.
pub struct HandshakeCodec;

impl HandshakeCodec {
    /// Serializes a handshake message following BEP 3.
    ///
    /// Writes the protocol identifier length byte, the identifier itself,
    /// the 8 reserved bytes, then info hash and peer id. Performs no
    /// validation; callers construct handshakes via [`PeerHandshake::new`]
    /// or obtain them from [`Self::deserialize_handshake`].
    pub fn serialize_handshake(handshake: &PeerHandshake) -> Vec<u8> {
        let mut buf = Vec::with_capacity(BASE_HANDSHAKE_LENGTH + handshake.protocol.len());

        buf.push(handshake.protocol.len() as u8);
        buf.extend_from_slice(handshake.protocol.as_bytes());
        buf.extend_from_slice(&handshake.reserved);
        buf.extend_from_slice(handshake.info_hash.as_bytes());
        buf.extend_from_slice(handshake.peer_id.as_bytes());

        buf
    }

    /// Deserializes a handshake message following BEP 3.
    ///
    /// The buffer must contain exactly one handshake: after the length
    /// byte, exactly `BASE_HANDSHAKE_LENGTH + pstrlen - 1` bytes must
    /// remain, and the protocol identifier must byte-for-byte equal
    /// `"BitTorrent protocol"`. A failed decode populates nothing.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::HandshakeLength` - Buffer length does not match pstrlen
    /// - `ProtocolError::UnknownProtocol` - Identifier is not the BEP 3 string
    pub fn deserialize_handshake(data: &[u8]) -> Result<PeerHandshake, ProtocolError> {
        let Some((&pstrlen, rest)) = data.split_first() else {
            return Err(ProtocolError::HandshakeLength {
                pstrlen: 0,
                remaining: 0,
            });
        };

        // pstrlen is read unsigned, so only an exact-length check is needed.
        if rest.len() != BASE_HANDSHAKE_LENGTH + pstrlen as usize - 1 {
            return Err(ProtocolError::HandshakeLength {
                pstrlen,
                remaining: rest.len(),
            });
        }

        let (protocol, rest) = rest.split_at(pstrlen as usize);
        if protocol != PROTOCOL_IDENTIFIER {
            // Latin-1 decode for diagnostics: every byte maps to a char.
            return Err(ProtocolError::UnknownProtocol {
                name: protocol.iter().map(|&b| b as char).collect(),
            });
        }

        // Reserved bytes are ignored on read.
        let (reserved_bytes, rest) = rest.split_at(8);
        let mut reserved = [0u8; 8];
        reserved.copy_from_slice(reserved_bytes);

        let (hash_bytes, id_bytes) = rest.split_at(20);
        let mut info_hash = [0u8; 20];
        info_hash.copy_from_slice(hash_bytes);
        let mut peer_id = [0u8; 20];
        peer_id.copy_from_slice(id_bytes);

        Ok(PeerHandshake {
            protocol: String::from_utf8_lossy(protocol).to_string(),
            reserved,
            info_hash: InfoHash::new(info_hash),
            peer_id: PeerId::new(peer_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_handshake() -> PeerHandshake {
        PeerHandshake::new(InfoHash::new([0xAB; 20]), PeerId::new([0xCD; 20]))
    }

    #[test]
    fn test_handshake_round_trip() {
        let handshake = test_handshake();

        let serialized = HandshakeCodec::serialize_handshake(&handshake);
        assert_eq!(serialized.len(), 68);
        assert_eq!(serialized[0], 19);

        let deserialized = HandshakeCodec::deserialize_handshake(&serialized).unwrap();
        assert_eq!(deserialized, handshake);
    }

    #[test]
    fn test_handshake_reserved_bytes_zeroed_on_write() {
        let serialized = HandshakeCodec::serialize_handshake(&test_handshake());
        assert_eq!(&serialized[20..28], &[0u8; 8]);
    }

    #[test]
    fn test_handshake_wrong_protocol_identifier() {
        let mut serialized = HandshakeCodec::serialize_handshake(&test_handshake());
        // "BitTorrent protocoI" - capital I instead of l
        serialized[19] = b'I';

        let result = HandshakeCodec::deserialize_handshake(&serialized);
        assert!(matches!(
            result,
            Err(ProtocolError::UnknownProtocol { name }) if name == "BitTorrent protocoI"
        ));
    }

    #[test]
    fn test_handshake_length_mismatch() {
        let mut serialized = HandshakeCodec::serialize_handshake(&test_handshake());

        // Truncated buffer
        serialized.truncate(60);
        let result = HandshakeCodec::deserialize_handshake(&serialized);
        assert!(matches!(
            result,
            Err(ProtocolError::HandshakeLength {
                pstrlen: 19,
                remaining: 59
            })
        ));

        // Declared pstrlen too large for the buffer
        let mut serialized = HandshakeCodec::serialize_handshake(&test_handshake());
        serialized[0] = 25;
        let result = HandshakeCodec::deserialize_handshake(&serialized);
        assert!(matches!(
            result,
            Err(ProtocolError::HandshakeLength { pstrlen: 25, .. })
        ));
    }

    #[test]
    fn test_handshake_empty_buffer() {
        let result = HandshakeCodec::deserialize_handshake(&[]);
        assert!(matches!(
            result,
            Err(ProtocolError::HandshakeLength { .. })
        ));
    }

    #[test]
    fn test_handshake_error_display_includes_diagnostics() {
        // Binary garbage in the identifier survives Latin-1 decoding
        let mut serialized = HandshakeCodec::serialize_handshake(&test_handshake());
        serialized[1] = 0xFF;

        let err = HandshakeCodec::deserialize_handshake(&serialized).unwrap_err();
        assert!(err.to_string().contains("nknown protocol"));
    }
}
