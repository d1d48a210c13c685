//! # telescreen-core
//!
//! Core protocol library for the telescreen remote-control tool.
//!
//! This crate contains:
//! - **Messages**: the closed tagged union exchanged between viewer and host
//! - **Codec**: `FrameCodec`, 8-byte big-endian length-prefixed framing
//! - **Transport**: `SecureChannel`, mutually authenticated TLS over TCP
//! - **Gate**: `RestrictedPaths`, canonical-path access control
//! - **Capability**: traits for the OS screen-capture and input-injection
//!   primitives, plus recording mocks for tests
//! - **Error**: `TsError`, the typed `thiserror` hierarchy

pub use rustls;

pub mod capability;
pub mod codec;
pub mod error;
pub mod gate;
pub mod message;
pub mod tls;
pub mod transport;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use capability::{InputInjector, ScreenCapture};
pub use codec::{FrameCodec, LEN_PREFIX, MAX_FRAME_SIZE};
pub use error::TsError;
pub use gate::RestrictedPaths;
pub use message::{
    ButtonState, FileAccessResponse, KeyEvent, KeyState, Message, MouseButton, MouseEvent,
};
pub use tls::{TlsIdentity, client_config, load_root_store, root_store_from_pem, server_config};
pub use transport::SecureChannel;
