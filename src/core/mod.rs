//! Core types shared by every layer: error codes, protocol states, constants.

pub mod constants;
mod error;
mod state;

pub use error::ErrorCode;
pub use state::TcpState;
