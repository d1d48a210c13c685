//! telescreen host library.
//!
//! Exposes the server core so integration tests (and alternative
//! front-ends) can drive it without going through `main`.

pub mod config;
pub mod host;
pub mod platform;

pub use config::HostConfig;
pub use host::{ControlHost, HostHandle};
