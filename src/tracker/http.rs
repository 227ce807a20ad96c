//! HTTP tracker client: URL building, async announce, response classification

use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use url::Url;

use super::client::{TrackerClient, dispatch_announce_message, format_announce_event};
use super::protocol::constants::COMPACT_PEER_SIZE;
use super::types::{
    AnnounceError, AnnounceEvent, AnnounceRequest, AnnounceResponse, AnnounceResponseListener,
    ResponseError, TorrentMetadataProvider, TrackerMessage, TrackerPeer,
};
use crate::config::TrackerConfig;
use crate::protocol::PeerId;
use crate::tracker::PeerAddressProvider;

/// Transport handle shared by all announces issued while started.
struct Transport {
    http: reqwest::Client,
    shutdown: watch::Sender<bool>,
}

/// HTTP implementation of the tracker announce contract.
///
/// One transport engine is created in `start` and torn down in `stop`;
/// every announce issued in between clones the engine handle, so stopping
/// never frees a connection the engine still has in flight. Connect and
/// socket timeouts default to 3000 ms each and bound how long one announce
/// may run before surfacing as a failure callback.
pub struct HttpTrackerClient {
    peers: Arc<dyn PeerAddressProvider>,
    config: TrackerConfig,
    transport: Mutex<Option<Transport>>,
}

impl HttpTrackerClient {
    /// Creates a client in the Created state; call `start` before announcing.
    pub fn new(peers: Arc<dyn PeerAddressProvider>, config: TrackerConfig) -> Self {
        Self {
            peers,
            config,
            transport: Mutex::new(None),
        }
    }

    /// Classifies an HTTP tracker response into a tracker message.
    ///
    /// `Ok(None)` means the response carried no entity (204-no-content or
    /// an empty body) - not an error. When `max_content_length` is set, a
    /// response declaring a larger content length fails before any body
    /// byte is read. The transport scopes the connection to this call and
    /// releases it on every exit path.
    ///
    /// Trackers may return valid bencoded data even on non-2xx status
    /// codes, so the status is not used as a discriminator.
    ///
    /// # Errors
    ///
    /// - `ResponseError::ContentTooLarge` - Declared length over the bound
    /// - `ResponseError::Body` - The body could not be read
    /// - `ResponseError::Bencode` / `ResponseError::InvalidResponse` - The
    ///   body was not a classifiable bencoded map
    pub async fn response_to_message(
        response: reqwest::Response,
        max_content_length: Option<u64>,
    ) -> Result<Option<TrackerMessage>, ResponseError> {
        if response.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }

        if let Some(max) = max_content_length
            && let Some(length) = response.content_length()
            && length > max
        {
            return Err(ResponseError::ContentTooLarge { length, max });
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            return Ok(None);
        }

        Self::classify_response(&body).map(Some)
    }

    /// Classifies raw bencoded response bytes.
    ///
    /// A map containing `"failure reason"` is a Failure; any other map is
    /// handed to the Success parser, whose own validation failure surfaces
    /// as the parse error.
    pub fn classify_response(response_bytes: &[u8]) -> Result<TrackerMessage, ResponseError> {
        let parsed =
            bencode_rs::Value::parse(response_bytes).map_err(|e| ResponseError::Bencode {
                reason: format!("{e:?}"),
            })?;

        let Some(value) = parsed.first() else {
            return Err(ResponseError::Bencode {
                reason: "empty tracker response".to_string(),
            });
        };

        let bencode_rs::Value::Dictionary(dict) = value else {
            return Err(ResponseError::InvalidResponse {
                reason: "top-level value is not a map".to_string(),
            });
        };

        if let Some(bencode_rs::Value::Bytes(failure_reason)) =
            dict.get(b"failure reason".as_slice())
        {
            return Ok(TrackerMessage::Failure {
                reason: String::from_utf8_lossy(failure_reason).to_string(),
            });
        }

        Self::parse_announce_response(value).map(TrackerMessage::Success)
    }

    /// Parses the Success shape of an announce response map.
    fn parse_announce_response(value: &bencode_rs::Value) -> Result<AnnounceResponse, ResponseError> {
        let bencode_rs::Value::Dictionary(dict) = value else {
            return Err(ResponseError::InvalidResponse {
                reason: "top-level value is not a map".to_string(),
            });
        };

        let interval = match dict.get(b"interval".as_slice()) {
            Some(bencode_rs::Value::Integer(val)) => *val as u32,
            _ => {
                return Err(ResponseError::InvalidResponse {
                    reason: "missing interval in tracker response".to_string(),
                });
            }
        };

        let min_interval = match dict.get(b"min interval".as_slice()) {
            Some(bencode_rs::Value::Integer(val)) => Some(*val as u32),
            _ => None,
        };

        let tracker_id = match dict.get(b"tracker id".as_slice()) {
            Some(bencode_rs::Value::Bytes(id_bytes)) => {
                Some(String::from_utf8_lossy(id_bytes).to_string())
            }
            _ => None,
        };

        let complete = match dict.get(b"complete".as_slice()) {
            Some(bencode_rs::Value::Integer(val)) => *val as u32,
            _ => 0, // Optional field
        };

        let incomplete = match dict.get(b"incomplete".as_slice()) {
            Some(bencode_rs::Value::Integer(val)) => *val as u32,
            _ => 0, // Optional field
        };

        let peers = match dict.get(b"peers".as_slice()) {
            Some(bencode_rs::Value::Bytes(peer_data)) => Self::parse_compact_peers(peer_data)?,
            Some(bencode_rs::Value::List(entries)) => Self::parse_peer_list(entries)?,
            Some(_) => {
                return Err(ResponseError::InvalidResponse {
                    reason: "peers field has unrecognized type".to_string(),
                });
            }
            None => Vec::new(),
        };

        Ok(AnnounceResponse {
            interval,
            min_interval,
            tracker_id,
            complete,
            incomplete,
            peers,
        })
    }

    /// Parses the compact peer encoding: 6 raw bytes per peer, IPv4 + port.
    fn parse_compact_peers(peer_bytes: &[u8]) -> Result<Vec<TrackerPeer>, ResponseError> {
        if !peer_bytes.len().is_multiple_of(COMPACT_PEER_SIZE) {
            return Err(ResponseError::InvalidResponse {
                reason: "invalid compact peer data length".to_string(),
            });
        }

        let mut peers = Vec::with_capacity(peer_bytes.len() / COMPACT_PEER_SIZE);
        for chunk in peer_bytes.chunks(COMPACT_PEER_SIZE) {
            let ip = Ipv4Addr::new(chunk[0], chunk[1], chunk[2], chunk[3]);
            let port = u16::from_be_bytes([chunk[4], chunk[5]]);
            peers.push(TrackerPeer {
                address: SocketAddr::V4(SocketAddrV4::new(ip, port)),
                peer_id: None,
            });
        }

        Ok(peers)
    }

    /// Parses the non-compact peer list: one map per peer with `ip`,
    /// `port`, and an optional `peer id`.
    fn parse_peer_list(entries: &[bencode_rs::Value]) -> Result<Vec<TrackerPeer>, ResponseError> {
        let mut peers = Vec::with_capacity(entries.len());

        for entry in entries {
            let bencode_rs::Value::Dictionary(dict) = entry else {
                return Err(ResponseError::InvalidResponse {
                    reason: "peer entry is not a map".to_string(),
                });
            };

            let ip = match dict.get(b"ip".as_slice()) {
                Some(bencode_rs::Value::Bytes(ip_bytes)) => String::from_utf8_lossy(ip_bytes)
                    .parse::<IpAddr>()
                    .map_err(|e| ResponseError::InvalidResponse {
                        reason: format!("invalid peer ip: {e}"),
                    })?,
                _ => {
                    return Err(ResponseError::InvalidResponse {
                        reason: "peer entry missing ip".to_string(),
                    });
                }
            };

            let port = match dict.get(b"port".as_slice()) {
                Some(bencode_rs::Value::Integer(val)) => *val as u16,
                _ => {
                    return Err(ResponseError::InvalidResponse {
                        reason: "peer entry missing port".to_string(),
                    });
                }
            };

            let peer_id = match dict.get(b"peer id".as_slice()) {
                Some(bencode_rs::Value::Bytes(id_bytes)) if id_bytes.len() == 20 => {
                    let mut id = [0u8; 20];
                    id.copy_from_slice(id_bytes);
                    Some(PeerId::new(id))
                }
                _ => None,
            };

            peers.push(TrackerPeer {
                address: SocketAddr::new(ip, port),
                peer_id,
            });
        }

        Ok(peers)
    }
}

impl TrackerClient for HttpTrackerClient {
    fn start(&self) -> Result<(), AnnounceError> {
        let http = reqwest::Client::builder()
            .connect_timeout(self.config.connect_timeout)
            .timeout(self.config.socket_timeout)
            .user_agent(self.config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(3))
            .build()
            .map_err(|e| AnnounceError::Request {
                reason: format!("failed to create HTTP transport: {e}"),
            })?;

        let (shutdown, _) = watch::channel(false);
        *self.transport.lock() = Some(Transport { http, shutdown });
        tracing::debug!("HTTP tracker client started");
        Ok(())
    }

    fn stop(&self) {
        if let Some(transport) = self.transport.lock().take() {
            // In-flight announces hold their own engine clone; this only
            // signals cancellation and releases our handle.
            let _ = transport.shutdown.send(true);
            tracing::debug!("HTTP tracker client stopped");
        }
    }

    fn announce(
        &self,
        listener: Arc<dyn AnnounceResponseListener>,
        torrent: &dyn TorrentMetadataProvider,
        tracker: Url,
        event: AnnounceEvent,
        inhibit_events: bool,
    ) -> Result<(), AnnounceError> {
        tracing::info!(
            "Announcing{} to tracker {} with {}U/{}D/{}L bytes...",
            format_announce_event(event),
            tracker,
            torrent.uploaded(),
            torrent.downloaded(),
            torrent.left()
        );

        let request =
            AnnounceRequest::build(torrent, self.peers.as_ref(), event, self.config.num_want)?;
        let target = request.to_url(&tracker)?;

        let (http, mut shutdown) = {
            let guard = self.transport.lock();
            let transport = guard.as_ref().ok_or(AnnounceError::NotStarted)?;
            (transport.http.clone(), transport.shutdown.subscribe())
        };
        let max_content_length = self.config.max_content_length;

        // Each attempt owns its own closure state; the only shared handle
        // is the transport engine, which is designed for concurrent use.
        tokio::spawn(async move {
            let attempt = async {
                match http.get(target.clone()).send().await {
                    Ok(response) => {
                        tracing::trace!("Completed: {} -> {}", target, response.status());
                        match Self::response_to_message(response, max_content_length).await {
                            Ok(Some(message)) => dispatch_announce_message(
                                listener.as_ref(),
                                &tracker,
                                event,
                                message,
                                inhibit_events,
                            ),
                            Ok(None) => {
                                tracing::trace!("Tracker {} returned no message", tracker);
                            }
                            Err(e) => {
                                // Classification failures take the same path
                                // as transport failures and never escape.
                                tracing::debug!("Failed to handle announce response: {}", e);
                                listener.handle_announce_failed(&tracker, event, &e.to_string());
                            }
                        }
                    }
                    Err(e) => {
                        tracing::debug!("Failed: {} -> {}", target, e);
                        listener.handle_announce_failed(
                            &tracker,
                            event,
                            &format!("HTTP failed: {e}"),
                        );
                    }
                }
            };

            tokio::select! {
                _ = attempt => {}
                _ = shutdown.wait_for(|stopped| *stopped) => {
                    // Cancellation is caller-initiated; nobody to notify.
                    tracing::trace!("Cancelled announce to {}", tracker);
                }
            }
        });

        Ok(())
    }
}
