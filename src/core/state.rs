//! TCP protocol states as reported by the stack.

use std::fmt;

/// Protocol state of a stack handle.
///
/// A connection object without a handle reports [`TcpState::Closed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum TcpState {
    /// No connection.
    #[default]
    Closed,
    /// Waiting for incoming connections.
    Listen,
    /// Active open, SYN sent.
    SynSent,
    /// SYN received, waiting for the final ACK.
    SynReceived,
    /// Data transfer.
    Established,
    /// Local close, FIN sent.
    FinWait1,
    /// Local FIN acknowledged.
    FinWait2,
    /// Remote FIN received.
    CloseWait,
    /// Simultaneous close.
    Closing,
    /// Waiting for the ACK of our FIN after the remote close.
    LastAck,
    /// Waiting out stray segments.
    TimeWait,
}

impl TcpState {
    /// Map the stack's numeric state to a variant.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(TcpState::Closed),
            1 => Some(TcpState::Listen),
            2 => Some(TcpState::SynSent),
            3 => Some(TcpState::SynReceived),
            4 => Some(TcpState::Established),
            5 => Some(TcpState::FinWait1),
            6 => Some(TcpState::FinWait2),
            7 => Some(TcpState::CloseWait),
            8 => Some(TcpState::Closing),
            9 => Some(TcpState::LastAck),
            10 => Some(TcpState::TimeWait),
            _ => None,
        }
    }

    /// Human-readable label.
    pub fn as_str(&self) -> &'static str {
        match *self {
            TcpState::Closed => "Closed",
            TcpState::Listen => "Listen",
            TcpState::SynSent => "SYN Sent",
            TcpState::SynReceived => "SYN Received",
            TcpState::Established => "Established",
            TcpState::FinWait1 => "FIN Wait 1",
            TcpState::FinWait2 => "FIN Wait 2",
            TcpState::CloseWait => "Close Wait",
            TcpState::Closing => "Closing",
            TcpState::LastAck => "Last ACK",
            TcpState::TimeWait => "Time Wait",
        }
    }

    /// Opening handshake in progress.
    pub fn is_connecting(&self) -> bool {
        matches!(
            self,
            TcpState::Listen | TcpState::SynSent | TcpState::SynReceived
        )
    }

    /// Closing sequence in progress (FIN exchanged, not yet timed out).
    pub fn is_disconnecting(&self) -> bool {
        matches!(
            self,
            TcpState::FinWait1
                | TcpState::FinWait2
                | TcpState::CloseWait
                | TcpState::Closing
                | TcpState::LastAck
        )
    }

    /// Fully closed or lingering in TIME-WAIT.
    pub fn is_disconnected(&self) -> bool {
        matches!(self, TcpState::Closed | TcpState::TimeWait)
    }

    /// Closed, or past the data transfer phase.
    pub fn is_freeable(&self) -> bool {
        *self == TcpState::Closed || *self > TcpState::Established
    }
}

impl fmt::Display for TcpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw() {
        assert_eq!(TcpState::from_raw(0), Some(TcpState::Closed));
        assert_eq!(TcpState::from_raw(4), Some(TcpState::Established));
        assert_eq!(TcpState::from_raw(10), Some(TcpState::TimeWait));
        assert_eq!(TcpState::from_raw(11), None);
    }

    #[test]
    fn test_predicates() {
        assert!(TcpState::SynSent.is_connecting());
        assert!(!TcpState::Established.is_connecting());

        assert!(TcpState::FinWait1.is_disconnecting());
        assert!(TcpState::LastAck.is_disconnecting());
        assert!(!TcpState::TimeWait.is_disconnecting());

        assert!(TcpState::TimeWait.is_disconnected());
        assert!(TcpState::Closed.is_disconnected());

        assert!(TcpState::Closed.is_freeable());
        assert!(TcpState::CloseWait.is_freeable());
        assert!(!TcpState::Established.is_freeable());
        assert!(!TcpState::SynSent.is_freeable());
    }

    #[test]
    fn test_labels() {
        assert_eq!(TcpState::SynReceived.to_string(), "SYN Received");
        assert_eq!(TcpState::LastAck.as_str(), "Last ACK");
        assert_eq!(TcpState::default(), TcpState::Closed);
    }
}
