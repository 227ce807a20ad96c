//! Core types and collaborator contracts for tracker communication

use std::fmt;
use std::net::SocketAddr;

use url::Url;

use super::protocol::encoding::url_encode_bytes;
use crate::InfoHash;
use crate::protocol::PeerId;

/// Synchronous announce errors.
///
/// Only failures detectable before any I/O is attempted surface through
/// this type; everything that can only be known after the request is
/// submitted reaches the listener instead, never the caller.
#[derive(Debug, thiserror::Error)]
pub enum AnnounceError {
    #[error("Invalid announce URI ({tracker}): {source}")]
    InvalidAnnounceUri {
        tracker: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Error building announce request: {reason}")]
    Request { reason: String },

    #[error("Tracker client is not started")]
    NotStarted,
}

/// The single error type for tracker response classification.
///
/// Transport read failures, bencode decoding failures, and structural
/// validation failures all collapse here so callers have one error to
/// handle per response.
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("Content length was too big: {length} (maximum {max})")]
    ContentTooLarge { length: u64, max: u64 },

    #[error("Failed to read tracker response body: {0}")]
    Body(#[from] reqwest::Error),

    #[error("Failed to parse tracker response: {reason}")]
    Bencode { reason: String },

    #[error("Invalid tracker response: {reason}")]
    InvalidResponse { reason: String },
}

/// BitTorrent announce events.
///
/// Reported to the tracker on state changes; `None` marks the periodic
/// re-announce and is omitted from request URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceEvent {
    /// Client started downloading this torrent
    Started,
    /// Client stopped downloading this torrent
    Stopped,
    /// Client completed downloading this torrent
    Completed,
    /// Periodic update, no state change
    None,
}

impl fmt::Display for AnnounceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnnounceEvent::Started => "started",
            AnnounceEvent::Stopped => "stopped",
            AnnounceEvent::Completed => "completed",
            AnnounceEvent::None => "none",
        };
        write!(f, "{name}")
    }
}

/// Tracker announce request.
///
/// Ephemeral: built fresh for every announce call from the metadata and
/// address providers, serialized into the request URL, never persisted.
#[derive(Debug, Clone)]
pub struct AnnounceRequest {
    /// Unique identifier for the torrent being announced
    pub info_hash: InfoHash,
    /// Client's unique 20-byte identifier
    pub peer_id: PeerId,
    /// Local addresses the client advertises for peer connections
    pub addresses: Vec<SocketAddr>,
    /// Total bytes uploaded to other peers
    pub uploaded: u64,
    /// Total bytes downloaded from other peers
    pub downloaded: u64,
    /// Bytes remaining to download (0 for seeders)
    pub left: u64,
    /// Request the compact 6-bytes-per-peer response encoding
    pub compact: bool,
    /// Ask the tracker to omit peer ids from non-compact responses
    pub no_peer_id: bool,
    /// Current client state for this torrent
    pub event: AnnounceEvent,
    /// Number of peers requested from the tracker
    pub num_want: u32,
}

impl AnnounceRequest {
    /// Builds a request from the collaborator providers.
    ///
    /// # Errors
    ///
    /// - `AnnounceError::Request` - If no local address is available to advertise
    pub fn build(
        torrent: &dyn TorrentMetadataProvider,
        peers: &dyn PeerAddressProvider,
        event: AnnounceEvent,
        num_want: u32,
    ) -> Result<Self, AnnounceError> {
        let addresses = peers.local_peer_addresses();
        if addresses.is_empty() {
            return Err(AnnounceError::Request {
                reason: "no local peer address to advertise".to_string(),
            });
        }

        Ok(Self {
            info_hash: torrent.info_hash(),
            peer_id: peers.local_peer_id(),
            addresses,
            uploaded: torrent.uploaded(),
            downloaded: torrent.downloaded(),
            left: torrent.left(),
            compact: true,
            no_peer_id: false,
            event,
            num_want,
        })
    }

    /// Serializes the request into an announce URL.
    ///
    /// Appends the query to the tracker's base URL, preserving any query
    /// the tracker URL already carries (passkeys). The binary info hash
    /// and peer id fields are %XX-encoded byte-for-byte to avoid the
    /// double-encoding a generic URL serializer would apply.
    ///
    /// # Errors
    ///
    /// - `AnnounceError::InvalidAnnounceUri` - If the result is not a valid URL
    pub fn to_url(&self, tracker: &Url) -> Result<Url, AnnounceError> {
        // The HTTP announce form carries a single port parameter.
        let port = self
            .addresses
            .first()
            .map(SocketAddr::port)
            .ok_or_else(|| AnnounceError::Request {
                reason: "no local peer address to advertise".to_string(),
            })?;

        let mut query = format!(
            "info_hash={}&peer_id={}&port={}&uploaded={}&downloaded={}&left={}&compact={}",
            url_encode_bytes(self.info_hash.as_bytes()),
            url_encode_bytes(self.peer_id.as_bytes()),
            port,
            self.uploaded,
            self.downloaded,
            self.left,
            if self.compact { 1 } else { 0 },
        );
        if self.no_peer_id {
            query.push_str("&no_peer_id=1");
        }
        query.push_str(&format!("&numwant={}", self.num_want));
        if self.event != AnnounceEvent::None {
            query.push_str(&format!("&event={}", self.event));
        }

        let separator = if tracker.query().is_some() { '&' } else { '?' };
        let target = format!("{tracker}{separator}{query}");

        Url::parse(&target).map_err(|source| AnnounceError::InvalidAnnounceUri {
            tracker: tracker.to_string(),
            source,
        })
    }
}

/// One peer returned by a tracker.
///
/// Compact responses carry only the address; non-compact responses may
/// additionally name the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerPeer {
    /// Socket address for connection attempts
    pub address: SocketAddr,
    /// Peer id, when the tracker's response format includes one
    pub peer_id: Option<PeerId>,
}

/// Successful tracker announce response.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnounceResponse {
    /// Seconds until next announce request should be sent
    pub interval: u32,
    /// Minimum allowed interval between announces
    pub min_interval: Option<u32>,
    /// Tracker-specific identifier for subsequent requests
    pub tracker_id: Option<String>,
    /// Number of seeders in the swarm
    pub complete: u32,
    /// Number of leechers in the swarm
    pub incomplete: u32,
    /// Peers available for connection attempts
    pub peers: Vec<TrackerPeer>,
}

/// A classified tracker response.
///
/// Presence of the `"failure reason"` key in the bencoded map selects
/// `Failure`; every other map is handed to the Success parser, whose own
/// failure surfaces as a parse error rather than a distinct shape error.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerMessage {
    /// Announce accepted; peers and swarm statistics follow
    Success(AnnounceResponse),
    /// Announce rejected with a human-readable reason
    Failure {
        /// Reason string supplied by the tracker
        reason: String,
    },
}

/// Read-only provider of the torrent state an announce reports.
pub trait TorrentMetadataProvider: Send + Sync {
    /// Info hash of the torrent being announced.
    fn info_hash(&self) -> InfoHash;
    /// Total bytes uploaded to other peers.
    fn uploaded(&self) -> u64;
    /// Total bytes downloaded from other peers.
    fn downloaded(&self) -> u64;
    /// Bytes remaining to download.
    fn left(&self) -> u64;
}

/// Read-only provider of the local peer identity and addresses.
pub trait PeerAddressProvider: Send + Sync {
    /// The local client's peer id.
    fn local_peer_id(&self) -> PeerId;
    /// Addresses the local client advertises for incoming connections.
    fn local_peer_addresses(&self) -> Vec<SocketAddr>;
}

/// Listener for announce outcomes.
///
/// Both callbacks are invoked from transport-owned tasks: they happen
/// concurrently with the announcing caller's subsequent code, on no
/// particular task, in no particular order across attempts.
pub trait AnnounceResponseListener: Send + Sync {
    /// A tracker accepted the announce and returned peers.
    fn handle_announce_response(
        &self,
        tracker: &Url,
        event: AnnounceEvent,
        response: &AnnounceResponse,
    );

    /// An announce attempt terminally failed (transport or protocol).
    fn handle_announce_failed(&self, tracker: &Url, event: AnnounceEvent, reason: &str);
}
