//! Local input tracking and coordinate mapping.
//!
//! Viewport coordinates are mapped into remote-screen space before an
//! event is forwarded. Mouse moves are deduplicated with a small
//! threshold so a connection is not flooded with sub-pixel jitter, and
//! held keys are reported once until released.

use std::collections::HashSet;

use telescreen_core::message::{
    ButtonState, KeyEvent, KeyState, Message, MouseButton, MouseEvent,
};

use crate::config::ViewerConfig;

/// Map one viewport coordinate to remote-screen space.
///
/// The result is clamped to `[0, remote_dim - 1]` so a cursor dragged
/// past the viewport edge never produces an out-of-screen position.
pub fn map_to_remote(v: i32, viewport_dim: u32, remote_dim: u32) -> i32 {
    if viewport_dim == 0 || remote_dim == 0 {
        return 0;
    }
    let mapped = (v as f64 * remote_dim as f64 / viewport_dim as f64).round() as i32;
    mapped.clamp(0, remote_dim as i32 - 1)
}

/// Tracks pointer and keyboard state between events.
#[derive(Debug)]
pub struct InputTracker {
    /// Minimum remote-space movement (px, either axis) before a move
    /// event is emitted.
    threshold: i32,
    forward_mouse: bool,
    forward_keyboard: bool,
    last_sent: Option<(i32, i32)>,
    pressed: HashSet<String>,
    viewport: (u32, u32),
    remote: Option<(u32, u32)>,
}

impl InputTracker {
    pub fn new(threshold: i32, viewport_w: u32, viewport_h: u32) -> Self {
        Self {
            threshold: threshold.max(0),
            forward_mouse: true,
            forward_keyboard: true,
            last_sent: None,
            pressed: HashSet::new(),
            viewport: (viewport_w, viewport_h),
            remote: None,
        }
    }

    /// Build a tracker from the `[input]` and `[display]` config
    /// sections: threshold, forward toggles, and initial viewport.
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            forward_mouse: config.input.forward_mouse,
            forward_keyboard: config.input.forward_keyboard,
            ..Self::new(
                config.input.mouse_threshold,
                config.display.width,
                config.display.height,
            )
        }
    }

    /// Update the viewport size after a resize.
    pub fn set_viewport(&mut self, w: u32, h: u32) {
        self.viewport = (w, h);
    }

    /// Record the remote screen size, learned from the first frame.
    pub fn set_remote(&mut self, w: u32, h: u32) {
        self.remote = Some((w, h));
    }

    /// Map a viewport position into remote space, if the remote size is
    /// known yet.
    pub fn remote_position(&self, x: i32, y: i32) -> Option<(i32, i32)> {
        let (rw, rh) = self.remote?;
        let (vw, vh) = self.viewport;
        Some((map_to_remote(x, vw, rw), map_to_remote(y, vh, rh)))
    }

    /// Process a pointer move at viewport coordinates.
    ///
    /// Returns a message only when the mapped position moved more than
    /// the threshold on at least one axis since the last reported move.
    pub fn pointer_moved(&mut self, x: i32, y: i32) -> Option<Message> {
        if !self.forward_mouse {
            return None;
        }
        let (rx, ry) = self.remote_position(x, y)?;

        if let Some((lx, ly)) = self.last_sent
            && (rx - lx).abs() <= self.threshold
            && (ry - ly).abs() <= self.threshold
        {
            return None;
        }

        self.last_sent = Some((rx, ry));
        Some(Message::Mouse(MouseEvent::Move { x: rx, y: ry }))
    }

    /// Process a button press or release at viewport coordinates.
    pub fn button(
        &mut self,
        button: MouseButton,
        state: ButtonState,
        x: i32,
        y: i32,
    ) -> Option<Message> {
        if !self.forward_mouse {
            return None;
        }
        let (rx, ry) = self.remote_position(x, y)?;
        // A click pins the cursor; future moves measure from here.
        self.last_sent = Some((rx, ry));
        Some(Message::Mouse(MouseEvent::Click {
            button,
            state,
            x: rx,
            y: ry,
        }))
    }

    /// Process a wheel notch.
    pub fn wheel(&self, delta: i32, x: i32, y: i32) -> Option<Message> {
        if !self.forward_mouse {
            return None;
        }
        let (rx, ry) = self.remote_position(x, y)?;
        Some(Message::Mouse(MouseEvent::Wheel {
            delta,
            x: rx,
            y: ry,
        }))
    }

    /// Process a key press. Auto-repeat while held is suppressed.
    pub fn key_down(&mut self, key: &str) -> Option<Message> {
        if !self.forward_keyboard || !self.pressed.insert(key.to_string()) {
            return None;
        }
        Some(Message::Keyboard(KeyEvent {
            key: key.to_string(),
            state: KeyState::Down,
        }))
    }

    /// Process a key release.
    pub fn key_up(&mut self, key: &str) -> Option<Message> {
        self.pressed.remove(key);
        if !self.forward_keyboard {
            return None;
        }
        Some(Message::Keyboard(KeyEvent {
            key: key.to_string(),
            state: KeyState::Up,
        }))
    }
}

// ── Tests ────────────────────────────────────────────────────────
