//! Transport Binding
//!
//! The network stack is an external collaborator. This module names the
//! capabilities the core requires from it and nothing more:
//!
//! - **Handles**: [`Handle`] identifies one stack connection
//! - **Registration**: [`Interest`] selects which events a handle delivers
//! - **Operations**: connect, bind, listen, write, output, recved, close, abort
//! - **Queries**: free send window, protocol state, endpoints, Nagle mode
//! - **Resolution**: [`Resolution`] of a hostname, possibly deferred
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          Application callbacks          │
//! ├─────────────────────────────────────────┤
//! │   AsyncClient / AsyncServer (core)      │
//! ├─────────────────────────────────────────┤
//! │         Transport trait                 │  ← This module
//! ├─────────────────────────────────────────┤
//! │   Network stack (TCP, DNS, buffers)     │
//! └─────────────────────────────────────────┘
//! ```

mod binding;

#[cfg(test)]
#[allow(dead_code)]
pub(crate) mod mock;

pub use binding::*;
