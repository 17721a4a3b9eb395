//! Timeout supervision driven by the periodic tick.
//!
//! Each tick yields exactly one [`SupervisorAction`], checked in order:
//! a pending deferred close, then the ack timeout, then the idle-receive
//! timeout. If none applies the tick is an ordinary poll.
//!
//! Timestamps are stack milliseconds and may wrap; all differences use
//! wrapping arithmetic.

/// Action the supervisor requests for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorAction {
    /// A deferred close was requested; tear down now.
    Close,
    /// Outbound data went unacknowledged for this many milliseconds.
    AckTimeout(u32),
    /// Nothing arrived within the idle-receive timeout; tear down now.
    IdleTimeout,
    /// Nothing special happened.
    Poll,
}

/// Per-connection timeout state.
#[derive(Debug, Clone)]
pub struct TimeoutSupervisor {
    /// Ack timeout in milliseconds (0 = disabled).
    ack_timeout_ms: u32,
    /// Idle-receive timeout in seconds (0 = disabled).
    rx_timeout_secs: u32,
    /// When the last flush was issued.
    sent_at: u32,
    /// Whether a flush awaits its acknowledgment.
    in_flight: bool,
    /// When data last arrived (or was acknowledged).
    last_rx: u32,
    /// Close requested for the next tick.
    close_requested: bool,
}

impl TimeoutSupervisor {
    /// Create a supervisor with the given thresholds.
    pub fn new(ack_timeout_ms: u32, rx_timeout_secs: u32, now: u32) -> Self {
        Self {
            ack_timeout_ms,
            rx_timeout_secs,
            sent_at: now,
            in_flight: false,
            last_rx: now,
            close_requested: false,
        }
    }

    /// Forget everything about the previous handle.
    pub fn reset(&mut self, now: u32) {
        self.reset_timers(now);
        self.close_requested = false;
    }

    /// Restart the ack and idle clocks, keeping a pending close.
    pub fn reset_timers(&mut self, now: u32) {
        self.sent_at = now;
        self.in_flight = false;
        self.last_rx = now;
    }

    /// Ack timeout in milliseconds.
    pub fn ack_timeout(&self) -> u32 {
        self.ack_timeout_ms
    }

    /// Set the ack timeout in milliseconds (0 disables).
    pub fn set_ack_timeout(&mut self, millis: u32) {
        self.ack_timeout_ms = millis;
    }

    /// Idle-receive timeout in seconds.
    pub fn rx_timeout(&self) -> u32 {
        self.rx_timeout_secs
    }

    /// Set the idle-receive timeout in seconds (0 disables).
    pub fn set_rx_timeout(&mut self, secs: u32) {
        self.rx_timeout_secs = secs;
    }

    /// Record a flush.
    pub fn on_send(&mut self, now: u32) {
        self.sent_at = now;
        self.in_flight = true;
    }

    /// Record a sent-data acknowledgment. Returns milliseconds since the flush.
    pub fn on_sent(&mut self, now: u32) -> u32 {
        self.in_flight = false;
        self.last_rx = now;
        now.wrapping_sub(self.sent_at)
    }

    /// Record inbound data.
    pub fn on_receive(&mut self, now: u32) {
        self.last_rx = now;
    }

    /// Ask for a close on the next tick.
    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    /// Check if a close is pending.
    pub fn is_close_requested(&self) -> bool {
        self.close_requested
    }

    /// Check if a flush awaits its acknowledgment.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Evaluate one tick.
    pub fn tick(&mut self, now: u32) -> SupervisorAction {
        if self.close_requested {
            self.close_requested = false;
            return SupervisorAction::Close;
        }

        if self.in_flight && self.ack_timeout_ms != 0 {
            let elapsed = now.wrapping_sub(self.sent_at);
            if elapsed >= self.ack_timeout_ms {
                self.in_flight = false;
                return SupervisorAction::AckTimeout(elapsed);
            }
        }

        if self.rx_timeout_secs != 0 {
            let idle = now.wrapping_sub(self.last_rx);
            if idle >= self.rx_timeout_secs.saturating_mul(1000) {
                return SupervisorAction::IdleTimeout;
            }
        }

        SupervisorAction::Poll
    }
}
