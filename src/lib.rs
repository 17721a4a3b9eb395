//! # async-tcp
//!
//! Callback-driven TCP connection management for hosts whose network stack
//! only exposes synchronous, single-threaded event callbacks (connected, data
//! arrived, data acknowledged, error, periodic poll).
//!
//! The crate provides:
//!
//! - **Connection objects**: [`AsyncClient`] owns one stack handle and turns the
//!   raw event model into seven single-slot application callbacks
//! - **Write pacing**: writes are bounded by the free send window the stack
//!   reports, never buffered beyond it
//! - **Deferred acknowledgment**: application-controlled receive backpressure
//! - **Timeout supervision**: ack-timeout and idle-receive timeout on each tick
//! - **Passive listening**: [`AsyncServer`] wraps every accepted handle in a
//!   connection object
//!
//! ## Feature Flags
//!
//! - `driver` (default): [`driver::PollTimer`], a tokio based periodic tick source
//!
//! ## Modules
//!
//! - [`core`]: Error codes, protocol states and constants (always included)
//! - [`transport`]: The capability set the core requires from the stack
//! - [`client`]: Connection object and timeout supervisor
//! - [`server`]: Passive listener
//! - [`registry`]: Externally owned set of live connections
//!
//! ## Example Usage
//!
//! ```rust
//! use std::cell::Cell;
//! use std::net::{Ipv4Addr, SocketAddrV4};
//! use std::rc::Rc;
//!
//! use async_tcp::prelude::*;
//!
//! /// A one-connection stack that admits every operation.
//! #[derive(Default)]
//! struct LoopStack {
//!     state: Cell<TcpState>,
//! }
//!
//! impl Transport for LoopStack {
//!     fn now_millis(&self) -> u32 { 0 }
//!     fn has_route(&self, _: Ipv4Addr) -> bool { true }
//!     fn allocate(&self) -> Option<Handle> { Some(Handle::new(1)) }
//!     fn register(&self, _: Handle, _: Interest) {}
//!     fn connect(&self, _: Handle, _: SocketAddrV4) -> Result<(), ErrorCode> {
//!         self.state.set(TcpState::SynSent);
//!         Ok(())
//!     }
//!     fn bind(&self, _: Handle, _: SocketAddrV4) -> Result<(), ErrorCode> { Ok(()) }
//!     fn listen(&self, handle: Handle) -> Option<Handle> { Some(handle) }
//!     fn write(&self, _: Handle, _: &[u8]) -> Result<(), ErrorCode> { Ok(()) }
//!     fn output(&self, _: Handle) -> Result<(), ErrorCode> { Ok(()) }
//!     fn recved(&self, _: Handle, _: usize) {}
//!     fn close(&self, _: Handle) -> Result<(), ErrorCode> {
//!         self.state.set(TcpState::Closed);
//!         Ok(())
//!     }
//!     fn abort(&self, _: Handle) { self.state.set(TcpState::Closed); }
//!     fn send_buffer(&self, _: Handle) -> usize { 1024 }
//!     fn state(&self, _: Handle) -> TcpState { self.state.get() }
//!     fn local_endpoint(&self, _: Handle) -> SocketAddrV4 {
//!         SocketAddrV4::new(Ipv4Addr::LOCALHOST, 49152)
//!     }
//!     fn remote_endpoint(&self, _: Handle) -> SocketAddrV4 {
//!         SocketAddrV4::new(Ipv4Addr::LOCALHOST, 80)
//!     }
//!     fn set_nagle(&self, _: Handle, _: bool) {}
//!     fn nagle_enabled(&self, _: Handle) -> bool { true }
//!     fn resolve(&self, _: &str) -> Resolution { Resolution::Resolved(Ipv4Addr::LOCALHOST) }
//! }
//!
//! let stack = Rc::new(LoopStack::default());
//! let mut client = AsyncClient::new(stack.clone());
//!
//! let sent = Rc::new(Cell::new(0));
//! let s = sent.clone();
//! client.on_connect(move |c| s.set(c.write(b"GET / HTTP/1.0\r\n\r\n")));
//!
//! assert!(client.connect_host("example.com", 80));
//! let handle = client.handle().unwrap();
//!
//! // The stack reports the completed handshake
//! stack.state.set(TcpState::Established);
//! client.handle_connected(handle);
//! assert_eq!(sent.get(), 18);
//!
//! client.close(true);
//! assert!(client.disconnected());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

pub mod transport;

pub mod client;

pub mod server;

pub mod registry;

// Tick driver (feature-gated)
#[cfg(feature = "driver")]
#[cfg_attr(docsrs, doc(cfg(feature = "driver")))]
pub mod driver;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::*;

    pub use crate::transport::{Handle, Interest, QueryId, Resolution, Transport};

    pub use crate::client::{AsyncClient, ClientBuilder, ClientConfig};

    pub use crate::server::{AsyncServer, ServerBuilder, ServerConfig};

    pub use crate::registry::{ClientKey, ConnectionSet, TransportEvent};

    #[cfg(feature = "driver")]
    pub use crate::driver::PollTimer;
}

// Re-export commonly used items at crate root
pub use crate::core::{ErrorCode, TcpState};

pub use client::AsyncClient;
pub use registry::ConnectionSet;
pub use server::AsyncServer;
pub use transport::{Handle, Transport};
