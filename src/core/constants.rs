//! Default thresholds and stack constants.

use std::time::Duration;

// =============================================================================
// TIMEOUTS
// =============================================================================

/// Default ack timeout in milliseconds.
pub const DEFAULT_ACK_TIMEOUT_MS: u32 = 5000;

/// Default idle-receive timeout in seconds (disabled).
pub const DEFAULT_RX_TIMEOUT_SECS: u32 = 0;

/// Period of the stack's poll callback.
///
/// The poll interval is registered as one coarse timer tick of the stack.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

// =============================================================================
// ENDPOINTS
// =============================================================================

/// Port value reported when no handle is held.
pub const NO_PORT: u16 = 0;
