//! Centralized configuration for Tidewire.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::time::Duration;

/// Tracker communication configuration.
///
/// Controls HTTP transport timeouts and announce request parameters.
/// The timeouts bound how long a single announce's network operation may
/// run before it surfaces as a failure callback; they are defaults, not
/// protocol constants.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// TCP connect timeout for tracker requests
    pub connect_timeout: Duration,
    /// Socket read timeout for tracker requests
    pub socket_timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: &'static str,
    /// Number of peers requested per announce
    pub num_want: u32,
    /// Upper bound on the declared response content length (None = unbounded)
    pub max_content_length: Option<u64>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(3000),
            socket_timeout: Duration::from_millis(3000),
            user_agent: "tidewire/0.1.0",
            num_want: crate::tracker::protocol::constants::DEFAULT_NUM_WANT,
            max_content_length: None, // Trackers are trusted by default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_config_defaults() {
        let config = TrackerConfig::default();

        assert_eq!(config.connect_timeout, Duration::from_millis(3000));
        assert_eq!(config.socket_timeout, Duration::from_millis(3000));
        assert_eq!(config.num_want, 50);
        assert_eq!(config.max_content_length, None);
    }
}
