//! Passive Listener
//!
//! Binds a local endpoint and wraps every accepted connection in an
//! [`AsyncClient`](crate::client::AsyncClient).

#[allow(clippy::module_inception)]
mod server;

pub use server::*;
