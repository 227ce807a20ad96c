//! Transport-agnostic tracker client contract
//!
//! Defines the lifecycle and announce shape every tracker transport (HTTP
//! today, UDP as a sibling implementation) must provide, plus the shared
//! listener fan-out that maps a classified tracker message onto the
//! [`AnnounceResponseListener`] callbacks.

use std::sync::Arc;

use url::Url;

use super::types::{
    AnnounceError, AnnounceEvent, AnnounceResponseListener, TorrentMetadataProvider,
    TrackerMessage,
};

/// Abstract tracker announce contract.
///
/// Lifecycle is Created -> Started -> Stopped. `start` and `stop` are not
/// internally thread-safe: callers must serialize start/stop/announce with
/// an external lock so `stop` never races a new `announce`. Once started,
/// concurrent `announce` calls share the transport safely. A stopped
/// client makes in-flight announces terminate cleanly instead of crashing.
pub trait TrackerClient: Send + Sync {
    /// Acquires transport resources.
    ///
    /// Calling `start` twice without an intervening `stop` is undefined by
    /// contract and should be avoided by the caller.
    ///
    /// # Errors
    ///
    /// - `AnnounceError::Request` - If the transport could not be created
    fn start(&self) -> Result<(), AnnounceError>;

    /// Releases transport resources. No-op when already stopped.
    fn stop(&self);

    /// Builds and submits one announce attempt.
    ///
    /// Returns after submission; the outcome arrives later through the
    /// listener, from a transport-owned task. Exactly one of {success
    /// callback, failure callback, silent cancellation} follows per
    /// attempt. No automatic retry is performed; re-announce cadence
    /// belongs to the caller's scheduler.
    ///
    /// # Errors
    ///
    /// Synchronous errors cover only request construction: a malformed
    /// announce URI, missing local addresses, or a stopped client.
    fn announce(
        &self,
        listener: Arc<dyn AnnounceResponseListener>,
        torrent: &dyn TorrentMetadataProvider,
        tracker: Url,
        event: AnnounceEvent,
        inhibit_events: bool,
    ) -> Result<(), AnnounceError>;
}

/// Fans a classified tracker message out to the listener.
///
/// Failures always reach `handle_announce_failed`; success notifications
/// are suppressed when `inhibit_events` is set (shutdown-time "stopped"
/// announces want the tracker updated without waking the swarm logic).
pub(crate) fn dispatch_announce_message(
    listener: &dyn AnnounceResponseListener,
    tracker: &Url,
    event: AnnounceEvent,
    message: TrackerMessage,
    inhibit_events: bool,
) {
    match message {
        TrackerMessage::Failure { reason } => {
            tracing::debug!("Tracker {} rejected announce: {}", tracker, reason);
            listener.handle_announce_failed(tracker, event, &reason);
        }
        TrackerMessage::Success(response) => {
            tracing::debug!(
                "Tracker {} returned {} peers (interval {}s)",
                tracker,
                response.peers.len(),
                response.interval
            );
            if !inhibit_events {
                listener.handle_announce_response(tracker, event, &response);
            }
        }
    }
}

/// Formats an announce event for log lines: empty for periodic announces,
/// `" started"` style otherwise.
pub fn format_announce_event(event: AnnounceEvent) -> String {
    match event {
        AnnounceEvent::None => String::new(),
        event => format!(" {event}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::tracker::types::{AnnounceResponse, TrackerPeer};

    #[derive(Default)]
    struct RecordingListener {
        responses: Mutex<Vec<AnnounceResponse>>,
        failures: Mutex<Vec<String>>,
    }

    impl AnnounceResponseListener for RecordingListener {
        fn handle_announce_response(
            &self,
            _tracker: &Url,
            _event: AnnounceEvent,
            response: &AnnounceResponse,
        ) {
            self.responses.lock().unwrap().push(response.clone());
        }

        fn handle_announce_failed(&self, _tracker: &Url, _event: AnnounceEvent, reason: &str) {
            self.failures.lock().unwrap().push(reason.to_string());
        }
    }

    fn success_message() -> TrackerMessage {
        TrackerMessage::Success(AnnounceResponse {
            interval: 1800,
            min_interval: None,
            tracker_id: None,
            complete: 4,
            incomplete: 2,
            peers: vec![TrackerPeer {
                address: "10.0.0.1:6881".parse().unwrap(),
                peer_id: None,
            }],
        })
    }

    #[test]
    fn test_dispatch_success_reaches_listener() {
        let listener = RecordingListener::default();
        let tracker = Url::parse("http://tracker.example.com/announce").unwrap();

        dispatch_announce_message(
            &listener,
            &tracker,
            AnnounceEvent::Started,
            success_message(),
            false,
        );

        assert_eq!(listener.responses.lock().unwrap().len(), 1);
        assert!(listener.failures.lock().unwrap().is_empty());
    }

    #[test]
    fn test_dispatch_success_inhibited() {
        let listener = RecordingListener::default();
        let tracker = Url::parse("http://tracker.example.com/announce").unwrap();

        dispatch_announce_message(
            &listener,
            &tracker,
            AnnounceEvent::Stopped,
            success_message(),
            true,
        );

        assert!(listener.responses.lock().unwrap().is_empty());
        assert!(listener.failures.lock().unwrap().is_empty());
    }

    #[test]
    fn test_dispatch_failure_always_reported() {
        let listener = RecordingListener::default();
        let tracker = Url::parse("http://tracker.example.com/announce").unwrap();

        dispatch_announce_message(
            &listener,
            &tracker,
            AnnounceEvent::Started,
            TrackerMessage::Failure {
                reason: "boom".to_string(),
            },
            true,
        );

        assert_eq!(
            listener.failures.lock().unwrap().as_slice(),
            ["boom".to_string()]
        );
    }

    #[test]
    fn test_format_announce_event() {
        assert_eq!(format_announce_event(AnnounceEvent::None), "");
        assert_eq!(format_announce_event(AnnounceEvent::Started), " started");
        assert_eq!(format_announce_event(AnnounceEvent::Completed), " completed");
    }
}
