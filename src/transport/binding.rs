//! The capability set consumed from the network stack.
//!
//! The stack owns every protocol control block. The core only ever holds a
//! [`Handle`], a stable identifier the stack also uses to route its events
//! back (see [`crate::registry::TransportEvent`]). Events are delivered only
//! for the kinds a handle has registered [`Interest`] in.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};

use crate::core::{ErrorCode, TcpState};

/// Stable identifier of one stack connection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u32);

impl Handle {
    /// Wrap a raw stack identifier.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw stack identifier.
    pub const fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pcb#{}", self.0)
    }
}

/// Identifier of an outstanding asynchronous hostname lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryId(u32);

impl QueryId {
    /// Wrap a raw resolver identifier.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw resolver identifier.
    pub const fn raw(&self) -> u32 {
        self.0
    }
}

/// Outcome of starting a hostname lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The name was answered from cache or was a literal address.
    Resolved(Ipv4Addr),
    /// The lookup continues; its result arrives later for this query.
    Pending(QueryId),
    /// The lookup could not be started.
    Failed,
}

/// Set of event kinds a handle wants delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Interest {
    /// Connect completion.
    pub connected: bool,
    /// Fatal errors.
    pub error: bool,
    /// Inbound data and peer close.
    pub received: bool,
    /// Sent-data acknowledgments.
    pub sent: bool,
    /// Periodic tick.
    pub poll: bool,
    /// Incoming connections on a listening handle.
    pub accept: bool,
}

impl Interest {
    /// No events; used when releasing a handle.
    pub const NONE: Interest = Interest {
        connected: false,
        error: false,
        received: false,
        sent: false,
        poll: false,
        accept: false,
    };

    /// A connect has been issued: completion and errors only.
    pub const CONNECTING: Interest = Interest {
        connected: true,
        error: true,
        received: false,
        sent: false,
        poll: false,
        accept: false,
    };

    /// Full operation of an established handle.
    pub const ESTABLISHED: Interest = Interest {
        connected: false,
        error: true,
        received: true,
        sent: true,
        poll: true,
        accept: false,
    };

    /// A listening handle: accepted connections only.
    pub const LISTENING: Interest = Interest {
        connected: false,
        error: false,
        received: false,
        sent: false,
        poll: false,
        accept: true,
    };

    /// Check if no event kind is selected.
    pub fn is_empty(&self) -> bool {
        *self == Interest::NONE
    }
}

/// Network stack capabilities driven by the core.
///
/// All methods take `&self`: the stack is a single-threaded singleton shared by
/// every connection object, so implementations use interior mutability.
/// Operations on a handle the stack no longer knows must be harmless.
pub trait Transport {
    /// Milliseconds since an arbitrary epoch. May wrap.
    fn now_millis(&self) -> u32;

    /// Check if an interface can reach `addr`.
    fn has_route(&self, addr: Ipv4Addr) -> bool;

    /// Allocate a fresh connection handle.
    fn allocate(&self) -> Option<Handle>;

    /// Replace the set of events delivered for `handle`.
    fn register(&self, handle: Handle, interest: Interest);

    /// Start an active open. Completion arrives as a connected event.
    fn connect(&self, handle: Handle, remote: SocketAddrV4) -> Result<(), ErrorCode>;

    /// Bind `handle` to a local endpoint.
    fn bind(&self, handle: Handle, local: SocketAddrV4) -> Result<(), ErrorCode>;

    /// Turn a bound handle into a listening one.
    ///
    /// On success the stack returns the listening handle and the one passed in
    /// is consumed. On failure the caller still owns `handle`.
    fn listen(&self, handle: Handle) -> Option<Handle>;

    /// Queue bytes for transmission without forcing them out.
    fn write(&self, handle: Handle, data: &[u8]) -> Result<(), ErrorCode>;

    /// Transmit everything queued.
    fn output(&self, handle: Handle) -> Result<(), ErrorCode>;

    /// Acknowledge `len` received bytes, reopening the receive window.
    fn recved(&self, handle: Handle, len: usize);

    /// Graceful close. On failure the handle is still owned by the caller.
    fn close(&self, handle: Handle) -> Result<(), ErrorCode>;

    /// Forced termination; the handle is gone afterwards.
    fn abort(&self, handle: Handle);

    /// Free space in the send buffer.
    fn send_buffer(&self, handle: Handle) -> usize;

    /// Protocol state of the handle.
    fn state(&self, handle: Handle) -> TcpState;

    /// Local endpoint of the handle.
    fn local_endpoint(&self, handle: Handle) -> SocketAddrV4;

    /// Remote endpoint of the handle.
    fn remote_endpoint(&self, handle: Handle) -> SocketAddrV4;

    /// Enable or disable Nagle's algorithm.
    fn set_nagle(&self, handle: Handle, enabled: bool);

    /// Check if Nagle's algorithm is enabled.
    fn nagle_enabled(&self, handle: Handle) -> bool;

    /// Start resolving `host`.
    fn resolve(&self, host: &str) -> Resolution;
}
