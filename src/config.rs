//! Per-connection configuration.

use thiserror::Error;

use crate::adapter::MAX_SEG_DATA_SIZE;

/// Rejected configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("send window must be at least one byte")]
    ZeroSendWindow,
    #[error("receive window must be at least one byte")]
    ZeroRecvWindow,
    #[error("retransmission timeout must be non-zero")]
    ZeroRtTimeout,
    #[error("timer tick period must be non-zero")]
    ZeroTickPeriod,
}

/// Tunables fixed at connection init.
///
/// Both windows are static byte budgets — there is no congestion control, so
/// `send_window` caps unacknowledged bytes for the whole connection lifetime.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum unacknowledged bytes outstanding.
    pub send_window: u16,
    /// Maximum buffered received bytes.
    pub recv_window: u16,
    /// Retransmission timeout in milliseconds.
    pub rt_timeout: u64,
    /// Tick period in milliseconds.
    pub timer: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            send_window: MAX_SEG_DATA_SIZE as u16,
            recv_window: MAX_SEG_DATA_SIZE as u16,
            rt_timeout: 1000,
            timer: 40,
        }
    }
}

impl Config {
    /// Check every field is usable before handing the config to a connection.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.send_window == 0 {
            return Err(ConfigError::ZeroSendWindow);
        }
        if self.recv_window == 0 {
            return Err(ConfigError::ZeroRecvWindow);
        }
        if self.rt_timeout == 0 {
            return Err(ConfigError::ZeroRtTimeout);
        }
        if self.timer == 0 {
            return Err(ConfigError::ZeroTickPeriod);
        }
        Ok(())
    }

    /// Ticks between arming the retransmit timer and it expiring, rounded up
    /// so a partial trailing tick still counts.
    pub fn ticks_per_rto(&self) -> u32 {
        (self.rt_timeout.div_ceil(self.timer)).max(1) as u32
    }
}
