//! Connection Object
//!
//! Callback-driven TCP connection over a [`Transport`](crate::transport::Transport),
//! together with its configuration and timeout supervision.

#[allow(clippy::module_inception)]
mod client;
mod config;
mod handlers;
mod supervisor;

pub use client::*;
pub use config::*;
pub use handlers::{AckHandler, ConnectHandler, DataHandler, ErrorHandler, Slot, TimeoutHandler};
pub use supervisor::*;
