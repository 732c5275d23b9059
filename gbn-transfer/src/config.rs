//! Transfer configuration.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::packet::HEADER_LEN;
use crate::socket::MAX_DATAGRAM;

/// Largest payload that still fits a single receive buffer.
pub const MAX_CHUNK_SIZE: usize = MAX_DATAGRAM - HEADER_LEN;

/// Tunable protocol parameters shared by sender and receiver.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferConfig {
    /// Fraction of sends the lossy channel discards, in `[0, 1)`.
    pub drop_probability: f64,
    /// Maximum number of packets in flight.
    pub window_size: usize,
    /// Retransmission deadline.
    pub timeout: Duration,
    /// Upper bound on how long the transmit loop waits before re-checking
    /// the timer.
    pub poll_interval: Duration,
    /// Payload bytes per packet.
    pub chunk_size: usize,
    /// Where the receiver listens and the sender sends.
    pub receiver_addr: SocketAddr,
    /// Give up after this many consecutive timeouts without progress.
    /// `None` retries forever.
    pub max_timeouts: Option<u32>,
    /// End-of-stream sentinels transmitted when the sender finishes.
    pub sentinel_copies: u32,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            // One send in nine is lost.
            drop_probability: 1.0 / 9.0,
            window_size: 4,
            timeout: Duration::from_millis(500),
            poll_interval: Duration::from_millis(50),
            chunk_size: 512,
            receiver_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            max_timeouts: None,
            sentinel_copies: 1,
        }
    }
}

/// A configuration value outside its legal range.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("drop probability {0} is outside [0, 1)")]
    DropProbability(f64),
    #[error("window size must be at least 1")]
    ZeroWindow,
    #[error("timeout must be non-zero")]
    ZeroTimeout,
    #[error("poll interval must be non-zero")]
    ZeroPollInterval,
    #[error("chunk size {0} is outside 1..={max}", max = MAX_CHUNK_SIZE)]
    ChunkSize(usize),
    #[error("at least one end-of-stream sentinel must be sent")]
    NoSentinel,
}

impl TransferConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..1.0).contains(&self.drop_probability) {
            return Err(ConfigError::DropProbability(self.drop_probability));
        }
        if self.window_size == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        if !(1..=MAX_CHUNK_SIZE).contains(&self.chunk_size) {
            return Err(ConfigError::ChunkSize(self.chunk_size));
        }
        if self.sentinel_copies == 0 {
            return Err(ConfigError::NoSentinel);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let cfg = TransferConfig::default();
        assert_eq!(cfg.validate(), Ok(()));
        assert_eq!(cfg.window_size, 4);
        assert_eq!(cfg.chunk_size, 512);
        assert_eq!(cfg.receiver_addr.port(), 8080);
        assert!(cfg.max_timeouts.is_none());
    }

    #[test]
    fn drop_probability_of_one_is_rejected() {
        // Certain loss can never complete a transfer.
        let cfg = TransferConfig {
            drop_probability: 1.0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::DropProbability(1.0)));
    }

    #[test]
    fn negative_drop_probability_is_rejected() {
        let cfg = TransferConfig {
            drop_probability: -0.1,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_values_are_rejected() {
        let base = TransferConfig::default();
        let cases = [
            (
                TransferConfig { window_size: 0, ..base.clone() },
                ConfigError::ZeroWindow,
            ),
            (
                TransferConfig { timeout: Duration::ZERO, ..base.clone() },
                ConfigError::ZeroTimeout,
            ),
            (
                TransferConfig { poll_interval: Duration::ZERO, ..base.clone() },
                ConfigError::ZeroPollInterval,
            ),
            (
                TransferConfig { sentinel_copies: 0, ..base.clone() },
                ConfigError::NoSentinel,
            ),
        ];
        for (cfg, expected) in cases {
            assert_eq!(cfg.validate(), Err(expected));
        }
    }

    #[test]
    fn chunk_must_fit_a_datagram() {
        let ok = TransferConfig {
            chunk_size: MAX_CHUNK_SIZE,
            ..Default::default()
        };
        assert_eq!(ok.validate(), Ok(()));

        let too_big = TransferConfig {
            chunk_size: MAX_CHUNK_SIZE + 1,
            ..Default::default()
        };
        assert_eq!(
            too_big.validate(),
            Err(ConfigError::ChunkSize(MAX_CHUNK_SIZE + 1))
        );
    }
}
