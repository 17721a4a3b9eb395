//! Error codes reported by the network stack.
//!
//! The stack reports failures as small signed integers. [`ErrorCode`] gives
//! each of them an explicit variant and a stable human-readable label.

use thiserror::Error;

/// Error code space of the underlying stack, plus the reserved
/// name-resolution failure code.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// No error.
    #[error("OK")]
    Ok,

    /// Out of memory.
    #[error("Out of memory error")]
    OutOfMemory,

    /// Buffer error.
    #[error("Buffer error")]
    Buffer,

    /// Timeout.
    #[error("Timeout")]
    Timeout,

    /// No route to the remote host.
    #[error("Routing problem")]
    Routing,

    /// Operation in progress.
    #[error("Operation in progress")]
    InProgress,

    /// Illegal value.
    #[error("Illegal value")]
    IllegalValue,

    /// Operation would block.
    #[error("Operation would block")]
    WouldBlock,

    /// Connection aborted.
    #[error("Connection aborted")]
    Aborted,

    /// Connection reset by the peer.
    #[error("Connection reset")]
    Reset,

    /// Connection closed.
    #[error("Connection closed")]
    Closed,

    /// Not connected.
    #[error("Not connected")]
    NotConnected,

    /// Illegal argument.
    #[error("Illegal argument")]
    IllegalArgument,

    /// Local address already in use.
    #[error("Address in use")]
    AddressInUse,

    /// Low-level network interface error.
    #[error("Low-level netif error")]
    Netif,

    /// Already connected.
    #[error("Already connected")]
    AlreadyConnected,

    /// Hostname resolution failed. Never produced by the stack itself.
    #[error("DNS failed")]
    DnsFailed,

    /// A code outside the known space.
    #[error("UNKNOWN")]
    Unknown(i8),
}

impl ErrorCode {
    /// Raw value of the reserved name-resolution failure code.
    pub const DNS_FAILED_RAW: i8 = -55;

    /// Map a raw stack code to its variant.
    pub fn from_raw(raw: i8) -> Self {
        match raw {
            0 => ErrorCode::Ok,
            -1 => ErrorCode::OutOfMemory,
            -2 => ErrorCode::Buffer,
            -3 => ErrorCode::Timeout,
            -4 => ErrorCode::Routing,
            -5 => ErrorCode::InProgress,
            -6 => ErrorCode::IllegalValue,
            -7 => ErrorCode::WouldBlock,
            -8 => ErrorCode::Aborted,
            -9 => ErrorCode::Reset,
            -10 => ErrorCode::Closed,
            -11 => ErrorCode::NotConnected,
            -12 => ErrorCode::IllegalArgument,
            -13 => ErrorCode::AddressInUse,
            -14 => ErrorCode::Netif,
            -15 => ErrorCode::AlreadyConnected,
            Self::DNS_FAILED_RAW => ErrorCode::DnsFailed,
            other => ErrorCode::Unknown(other),
        }
    }

    /// The raw stack value of this code.
    pub fn raw(&self) -> i8 {
        match *self {
            ErrorCode::Ok => 0,
            ErrorCode::OutOfMemory => -1,
            ErrorCode::Buffer => -2,
            ErrorCode::Timeout => -3,
            ErrorCode::Routing => -4,
            ErrorCode::InProgress => -5,
            ErrorCode::IllegalValue => -6,
            ErrorCode::WouldBlock => -7,
            ErrorCode::Aborted => -8,
            ErrorCode::Reset => -9,
            ErrorCode::Closed => -10,
            ErrorCode::NotConnected => -11,
            ErrorCode::IllegalArgument => -12,
            ErrorCode::AddressInUse => -13,
            ErrorCode::Netif => -14,
            ErrorCode::AlreadyConnected => -15,
            ErrorCode::DnsFailed => Self::DNS_FAILED_RAW,
            ErrorCode::Unknown(raw) => raw,
        }
    }

    /// Stable human-readable label.
    pub fn as_str(&self) -> &'static str {
        match *self {
            ErrorCode::Ok => "OK",
            ErrorCode::OutOfMemory => "Out of memory error",
            ErrorCode::Buffer => "Buffer error",
            ErrorCode::Timeout => "Timeout",
            ErrorCode::Routing => "Routing problem",
            ErrorCode::InProgress => "Operation in progress",
            ErrorCode::IllegalValue => "Illegal value",
            ErrorCode::WouldBlock => "Operation would block",
            ErrorCode::Aborted => "Connection aborted",
            ErrorCode::Reset => "Connection reset",
            ErrorCode::Closed => "Connection closed",
            ErrorCode::NotConnected => "Not connected",
            ErrorCode::IllegalArgument => "Illegal argument",
            ErrorCode::AddressInUse => "Address in use",
            ErrorCode::Netif => "Low-level netif error",
            ErrorCode::AlreadyConnected => "Already connected",
            ErrorCode::DnsFailed => "DNS failed",
            ErrorCode::Unknown(_) => "UNKNOWN",
        }
    }

    /// Check if this code ends the connection it was reported on.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ErrorCode::Aborted
                | ErrorCode::Reset
                | ErrorCode::Closed
                | ErrorCode::Timeout
                | ErrorCode::DnsFailed
        )
    }

    /// Check if this is the success code.
    pub fn is_ok(&self) -> bool {
        *self == ErrorCode::Ok
    }
}

impl From<i8> for ErrorCode {
    fn from(raw: i8) -> Self {
        ErrorCode::from_raw(raw)
    }
}

impl From<ErrorCode> for i8 {
    fn from(code: ErrorCode) -> i8 {
        code.raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_mapping() {
        for raw in -15..=0 {
            assert_eq!(ErrorCode::from_raw(raw).raw(), raw);
        }
        assert_eq!(ErrorCode::from_raw(-55), ErrorCode::DnsFailed);
        assert_eq!(ErrorCode::from_raw(-42), ErrorCode::Unknown(-42));
        assert_eq!(ErrorCode::Unknown(-42).raw(), -42);
    }

    #[test]
    fn test_labels() {
        assert_eq!(ErrorCode::Routing.as_str(), "Routing problem");
        assert_eq!(ErrorCode::Aborted.as_str(), "Connection aborted");
        assert_eq!(ErrorCode::DnsFailed.as_str(), "DNS failed");
        assert_eq!(ErrorCode::Unknown(7).as_str(), "UNKNOWN");

        // Display matches the label
        assert_eq!(ErrorCode::Reset.to_string(), "Connection reset");
        assert_eq!(ErrorCode::from(-13).to_string(), "Address in use");
    }

    #[test]
    fn test_fatal_codes() {
        assert!(ErrorCode::Aborted.is_fatal());
        assert!(ErrorCode::Reset.is_fatal());
        assert!(ErrorCode::DnsFailed.is_fatal());

        assert!(!ErrorCode::Ok.is_fatal());
        assert!(!ErrorCode::WouldBlock.is_fatal());
        assert!(!ErrorCode::OutOfMemory.is_fatal());
    }
}
