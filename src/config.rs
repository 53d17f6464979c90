//! Relay configuration

use crate::core::EPHEMERAL_VALIDITY_SECS;
use std::path::PathBuf;
use std::time::Duration;

/// Relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Directory holding keys and the authority registry
    pub data_dir: PathBuf,
    /// How long an ephemeral anchor is treated as live
    pub ephemeral_window: Duration,
    /// Bound on a single confirmation wait
    pub confirm_timeout: Duration,
    /// Interval between ledger status polls
    pub poll_interval: Duration,
    /// Bound on waiting for the counterparty's payload
    pub handoff_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".cosign_data"),
            ephemeral_window: Duration::from_secs(EPHEMERAL_VALIDITY_SECS as u64),
            confirm_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
            handoff_timeout: Duration::from_secs(10 * 60),
        }
    }
}

impl RelayConfig {
    pub fn keys_dir(&self) -> PathBuf {
        self.data_dir.join("keys")
    }

    pub fn registry_path(&self) -> PathBuf {
        self.data_dir.join("authorities.json")
    }

    /// The ephemeral window as a calendar duration
    pub fn ephemeral_window_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.ephemeral_window)
            .unwrap_or_else(|_| chrono::Duration::seconds(EPHEMERAL_VALIDITY_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.ephemeral_window, Duration::from_secs(90));
        assert_eq!(config.ephemeral_window_chrono(), chrono::Duration::seconds(90));
        assert_eq!(config.keys_dir(), PathBuf::from(".cosign_data/keys"));
        assert!(config.confirm_timeout < config.handoff_timeout);
    }
}
