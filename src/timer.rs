//! Retransmit timer management.
//!
//! Reliable delivery requires that unacknowledged segments are re-sent if no
//! ACK arrives within a bounded time.  The host delivers a bare periodic
//! tick; [`RetransmitTimer`] counts ticks up to the retransmission timeout
//! (`ticks_per_rto = ⌈rt_timeout / tick_period⌉`) and tracks how many
//! consecutive timeouts have elapsed without forward progress.
//!
//! The retry budget is per-connection, not per-segment: [`MAX_RETRIES`]
//! consecutive expiries surface as [`TimerTick::BudgetExhausted`] and the
//! driver either force-FINs or destroys the connection.

use crate::config::Config;

/// Consecutive unanswered timeouts a connection survives before the driver
/// gives up on it.
pub const MAX_RETRIES: u32 = 6;

/// What the driver should do after feeding the timer one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTick {
    /// Timer disarmed: nothing is awaiting acknowledgement.  The driver may
    /// use the tick for an opportunistic transmit/drain pass.
    Idle,
    /// Armed but the RTO has not elapsed yet.
    Counting,
    /// The RTO elapsed: retransmit (Go-Back-N replay or FIN resend).
    Expired,
    /// The RTO elapsed for the [`MAX_RETRIES`]th consecutive time.  The
    /// internal retry count restarts so a forced FIN gets a fresh budget.
    BudgetExhausted,
}

/// Tick-counting retransmit timer for one connection.
#[derive(Debug)]
pub struct RetransmitTimer {
    enabled: bool,
    tick_counter: u32,
    retry_count: u32,
    ticks_per_rto: u32,
}

impl RetransmitTimer {
    pub fn new(config: &Config) -> Self {
        Self {
            enabled: false,
            tick_counter: 0,
            retry_count: 0,
            ticks_per_rto: config.ticks_per_rto(),
        }
    }

    /// Whether the timer is currently armed.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Arm the timer.  Called after any data segment or FIN goes out; a
    /// no-op when already armed so an in-progress RTO keeps counting.
    pub fn arm(&mut self) {
        self.enabled = true;
    }

    /// Disarm and forget all progress.  Called when the sender is fully
    /// caught up or the connection is destroyed.
    pub fn disarm(&mut self) {
        self.enabled = false;
        self.tick_counter = 0;
        self.retry_count = 0;
    }

    /// Acknowledgement progress arrived: restart both the current RTO and
    /// the retry budget without disarming.
    pub fn ack_progress(&mut self) {
        self.tick_counter = 0;
        self.retry_count = 0;
    }

    /// Feed one external tick and report what it amounted to.
    pub fn on_tick(&mut self) -> TimerTick {
        if !self.enabled {
            return TimerTick::Idle;
        }
        self.tick_counter += 1;
        if self.tick_counter < self.ticks_per_rto {
            return TimerTick::Counting;
        }
        self.tick_counter = 0;
        self.retry_count += 1;
        if self.retry_count >= MAX_RETRIES {
            self.retry_count = 0;
            TimerTick::BudgetExhausted
        } else {
            TimerTick::Expired
        }
    }
}
