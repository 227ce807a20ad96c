//! Core types and enumerations for the BitTorrent wire protocol

use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::Bytes;

use super::ProtocolError;
use crate::InfoHash;

/// BitTorrent peer identifier.
///
/// 20-byte identifier for peers in the BitTorrent network.
/// Used in handshakes and tracker communication to identify clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId([u8; 20]);

impl PeerId {
    /// Creates peer ID from 20-byte array.
    pub fn new(id: [u8; 20]) -> Self {
        Self(id)
    }

    /// Returns peer ID as byte array reference.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Generate random peer ID for this client.
    pub fn generate() -> Self {
        let mut id = [0u8; 20];
        // Azureus-style client identifier prefix
        id[..8].copy_from_slice(b"-TW0001-");
        // Fill remaining with random bytes
        for byte in &mut id[8..] {
            *byte = rand::random();
        }
        Self(id)
    }
}

/// BitTorrent wire protocol messages.
///
/// Complete set of message types defined in BEP 3 for peer communication.
/// Each variant has a fixed wire identifier and a symmetric encode/decode
/// contract; no variant carries nondeterministic state, so two encodes of
/// the same logical value are byte-identical.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerMessage {
    /// Keep-alive message to maintain connection
    KeepAlive,
    /// Inform peer that we are choking them
    Choke,
    /// Inform peer that we are no longer choking them
    Unchoke,
    /// Inform peer that we are interested in their pieces
    Interested,
    /// Inform peer that we are not interested in their pieces
    NotInterested,
    /// Inform peer that we have acquired a specific piece
    Have {
        /// Index of the piece we now have
        piece_index: u32,
    },
    /// Send our complete piece availability bitmap
    Bitfield {
        /// Bitmap indicating which pieces we have
        bitfield: Bytes,
    },
    /// Request a block of data from a piece
    Request {
        /// Index of the piece to request from
        piece_index: u32,
        /// Byte offset within the piece
        offset: u32,
        /// Number of bytes to request
        length: u32,
    },
    /// Send a block of piece data
    Piece {
        /// Index of the piece this data belongs to
        piece_index: u32,
        /// Byte offset within the piece
        offset: u32,
        /// The actual piece data
        data: Bytes,
    },
    /// Cancel a previously sent request
    Cancel {
        /// Index of the piece to cancel
        piece_index: u32,
        /// Byte offset within the piece
        offset: u32,
        /// Number of bytes that were requested
        length: u32,
    },
    /// Inform peer of our DHT port
    Port {
        /// UDP port for DHT communication
        port: u16,
    },
}

/// Peer handshake information.
///
/// The distinguished first message on every peer connection. Establishes
/// protocol identity, torrent identity, and peer identity before any other
/// traffic is allowed. Never mutated after decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerHandshake {
    /// Protocol identifier string ("BitTorrent protocol")
    pub protocol: String,
    /// Reserved bytes for protocol extensions; ignored on read, zeroed on write
    pub reserved: [u8; 8],
    /// Info hash of the torrent being exchanged
    pub info_hash: InfoHash,
    /// Unique identifier for the peer
    pub peer_id: PeerId,
}

impl PeerHandshake {
    /// Create an outbound handshake with the canonical protocol identifier.
    pub fn new(info_hash: InfoHash, peer_id: PeerId) -> Self {
        Self {
            protocol: "BitTorrent protocol".to_string(),
            reserved: [0u8; 8],
            info_hash,
            peer_id,
        }
    }
}

/// Peer connection state.
///
/// Tracks connection lifecycle from initial disconnect through handshake
/// to an established message exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeerState {
    /// No connection established
    #[default]
    Disconnected,
    /// TCP connection in progress
    Connecting,
    /// Performing BitTorrent handshake
    Handshaking,
    /// Handshake validated, messages may flow
    Connected,
}

/// Abstract peer protocol interface for BitTorrent communication.
///
/// Defines wire protocol operations for connecting to peers, exchanging
/// framed messages, and managing connection state. Implementations handle
/// socket management and message framing.
#[async_trait]
pub trait PeerProtocol: Send + Sync {
    /// Establishes a connection and performs the BitTorrent handshake.
    ///
    /// Exchanges handshake messages and validates protocol identity and
    /// info hash before the connection is allowed to proceed. A corrupted
    /// handshake terminates the connection; it is not retried.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Connection` - If the transport failed
    /// - `ProtocolError::UnknownProtocol` - If the peer spoke something else
    /// - `ProtocolError::InfoHashMismatch` - If the peer is in another swarm
    async fn connect(
        &mut self,
        address: SocketAddr,
        handshake: PeerHandshake,
    ) -> Result<(), ProtocolError>;

    /// Sends a wire protocol message to the connected peer.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Connection` - If connection lost or write failed
    async fn send_message(&mut self, message: PeerMessage) -> Result<(), ProtocolError>;

    /// Receives the next wire protocol message from the peer.
    ///
    /// Blocks until a complete message is received or the connection fails.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Connection` - If connection lost or read failed
    /// - `ProtocolError::FrameTooLarge` - If the peer declared an absurd frame
    async fn receive_message(&mut self) -> Result<PeerMessage, ProtocolError>;

    /// Returns current connection state.
    fn peer_state(&self) -> PeerState;

    /// Returns peer socket address if connected.
    fn peer_address(&self) -> Option<SocketAddr>;

    /// Closes the connection gracefully.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Connection` - If error during shutdown
    async fn disconnect(&mut self) -> Result<(), ProtocolError>;
}
