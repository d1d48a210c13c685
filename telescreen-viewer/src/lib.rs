//! telescreen viewer library.
//!
//! The controller side: drives the screenshot request/render cycle and
//! converts local input events into protocol messages. The presentation
//! layer (window, canvas, settings widgets) is external and consumes the
//! [`render::ScaledFrame`] watch channel.

pub mod config;
pub mod controller;
pub mod input;
pub mod render;

pub use config::ViewerConfig;
pub use controller::Controller;
pub use input::InputTracker;
pub use render::ScaledFrame;
