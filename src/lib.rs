//! Tidewire - BitTorrent peer wire protocol and tracker announce client
//!
//! This crate provides the two wire contracts every BitTorrent client is
//! built on: the peer protocol handshake and message codec used to establish
//! and frame peer connections, and the HTTP tracker announce cycle used to
//! register with a tracker and discover peers.

pub mod config;
pub mod protocol;
pub mod tracing_setup;
pub mod tracker;

use std::fmt;

// Re-export main types for convenient access
pub use config::TrackerConfig;
pub use protocol::{
    HandshakeCodec, MessageCodec, PeerHandshake, PeerId, PeerMessage, PeerProtocol, PeerState,
    ProtocolError, TcpPeerConnection,
};
pub use tracker::{
    AnnounceError, AnnounceEvent, AnnounceRequest, AnnounceResponse, AnnounceResponseListener,
    HttpTrackerClient, PeerAddressProvider, ResponseError, TorrentMetadataProvider, TrackerClient,
    TrackerMessage, TrackerPeer,
};

/// SHA-1 hash identifying a unique torrent.
///
/// 20-byte SHA-1 hash of the info dictionary from a torrent file.
/// Used to select which swarm a peer connection or tracker announce
/// refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InfoHash([u8; 20]);

impl InfoHash {
    /// Creates InfoHash from 20-byte SHA-1 hash.
    pub fn new(hash: [u8; 20]) -> Self {
        Self(hash)
    }

    /// Returns reference to underlying 20-byte hash.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
