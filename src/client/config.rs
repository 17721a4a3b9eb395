//! Connection object configuration.

use crate::core::constants::{DEFAULT_ACK_TIMEOUT_MS, DEFAULT_RX_TIMEOUT_SECS};

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Ack timeout in milliseconds. Zero disables the check.
    pub ack_timeout_ms: u32,

    /// Idle-receive timeout in seconds. Zero disables the check.
    pub rx_timeout_secs: u32,

    /// Nagle preference applied whenever a handle becomes operational.
    /// `None` leaves the stack default untouched.
    pub no_delay: Option<bool>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ack_timeout_ms: DEFAULT_ACK_TIMEOUT_MS,
            rx_timeout_secs: DEFAULT_RX_TIMEOUT_SECS,
            no_delay: None,
        }
    }
}

/// Builder for a [`ClientConfig`].
#[derive(Debug)]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    /// Create a new client builder.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    /// Set the ack timeout in milliseconds.
    pub fn ack_timeout(mut self, millis: u32) -> Self {
        self.config.ack_timeout_ms = millis;
        self
    }

    /// Set the idle-receive timeout in seconds.
    pub fn rx_timeout(mut self, secs: u32) -> Self {
        self.config.rx_timeout_secs = secs;
        self
    }

    /// Disable (`true`) or enable (`false`) Nagle's algorithm.
    pub fn no_delay(mut self, no_delay: bool) -> Self {
        self.config.no_delay = Some(no_delay);
        self
    }

    /// Build the client configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
