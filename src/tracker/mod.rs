//! BitTorrent tracker communication contract and HTTP implementation.
//!
//! Defines the transport-agnostic announce lifecycle (start/stop/announce
//! with listener callbacks) and the HTTP transport that serializes announce
//! requests into URLs, classifies bencoded responses into success or
//! failure, and reports every outcome through the listener.

pub mod client;
pub mod http;
pub mod protocol;
pub mod types;

// Re-export public API
pub use client::{TrackerClient, format_announce_event};
pub use http::HttpTrackerClient;
pub use types::{
    AnnounceError, AnnounceEvent, AnnounceRequest, AnnounceResponse, AnnounceResponseListener,
    PeerAddressProvider, ResponseError, TorrentMetadataProvider, TrackerMessage, TrackerPeer,
};
