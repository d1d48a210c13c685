//! Traits for the OS-level primitives the core invokes as black boxes.
//!
//! The host wires platform implementations (Win32 capture/injection) at
//! startup; tests use the recording mocks in [`mock`].

use crate::error::TsError;
use crate::message::{ButtonState, KeyState, MouseButton};

/// Captures the full screen as one encoded image (PNG or JPEG bytes).
pub trait ScreenCapture: Send + Sync {
    fn capture(&self) -> Result<Vec<u8>, TsError>;
}

/// Injects cursor, button, key, and scroll events into the OS.
pub trait InputInjector: Send + Sync {
    /// Move the cursor to an absolute screen position.
    fn move_cursor(&self, x: i32, y: i32) -> Result<(), TsError>;

    /// Press or release a mouse button at the given position.
    fn button(&self, button: MouseButton, state: ButtonState, x: i32, y: i32)
    -> Result<(), TsError>;

    /// Press or release a named key.
    fn key(&self, key: &str, state: KeyState) -> Result<(), TsError>;

    /// Scroll by a wheel delta.
    fn scroll(&self, delta: i32) -> Result<(), TsError>;
}

// ── Mocks ────────────────────────────────────────────────────────

/// Recording fakes used by unit and integration tests.
pub mod mock {
    use std::io::Cursor;
    use std::sync::Mutex;

    use super::{ButtonState, InputInjector, KeyState, MouseButton, ScreenCapture, TsError};

    /// Produces a solid-color PNG of fixed dimensions.
    #[derive(Debug, Clone, Copy)]
    pub struct MockCapture {
        pub width: u32,
        pub height: u32,
    }

    impl MockCapture {
        pub fn new(width: u32, height: u32) -> Self {
            Self { width, height }
        }
    }

    impl Default for MockCapture {
        fn default() -> Self {
            Self::new(640, 480)
        }
    }

    impl ScreenCapture for MockCapture {
        fn capture(&self) -> Result<Vec<u8>, TsError> {
            let img = image::RgbaImage::from_pixel(
                self.width,
                self.height,
                image::Rgba([40, 44, 52, 255]),
            );
            let mut buf = Cursor::new(Vec::new());
            image::DynamicImage::ImageRgba8(img)
                .write_to(&mut buf, image::ImageFormat::Png)
                .map_err(|e| TsError::Capability(format!("mock encode: {e}")))?;
            Ok(buf.into_inner())
        }
    }

    /// One event observed by [`MockInjector`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum InjectedEvent {
        Move { x: i32, y: i32 },
        Button {
            button: MouseButton,
            state: ButtonState,
            x: i32,
            y: i32,
        },
        Key { key: String, state: KeyState },
        Scroll { delta: i32 },
    }

    /// Records every injected event for later assertions.
    #[derive(Debug, Default)]
    pub struct MockInjector {
        events: Mutex<Vec<InjectedEvent>>,
    }

    impl MockInjector {
        pub fn new() -> Self {
            Self::default()
        }

        /// Snapshot of everything injected so far.
        pub fn events(&self) -> Vec<InjectedEvent> {
            self.events.lock().map(|g| g.clone()).unwrap_or_default()
        }

        fn record(&self, event: InjectedEvent) {
            if let Ok(mut guard) = self.events.lock() {
                guard.push(event);
            }
        }
    }

    impl InputInjector for MockInjector {
        fn move_cursor(&self, x: i32, y: i32) -> Result<(), TsError> {
            self.record(InjectedEvent::Move { x, y });
            Ok(())
        }

        fn button(
            &self,
            button: MouseButton,
            state: ButtonState,
            x: i32,
            y: i32,
        ) -> Result<(), TsError> {
            self.record(InjectedEvent::Button {
                button,
                state,
                x,
                y,
            });
            Ok(())
        }

        fn key(&self, key: &str, state: KeyState) -> Result<(), TsError> {
            self.record(InjectedEvent::Key {
                key: key.to_string(),
                state,
            });
            Ok(())
        }

        fn scroll(&self, delta: i32) -> Result<(), TsError> {
            self.record(InjectedEvent::Scroll { delta });
            Ok(())
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
