//! Protocol messages exchanged between viewer and host.
//!
//! # Wire Protocol
//!
//! Every message travels inside one [`FrameCodec`](crate::codec::FrameCodec)
//! frame as a UTF-8 JSON object with a `type` tag and a nested `data` object:
//!
//! ```text
//! Viewer ──{"type":"mouse","data":{"type":"move","x":100,"y":50}}──► Host
//! Viewer ──{"type":"keyboard","data":{"key":"a","state":"down"}}───► Host
//! Viewer ──{"type":"screenshot"}───────────────────────────────────► Host
//!   Host replies with one frame of raw encoded image bytes.
//! Viewer ──{"type":"file_access","data":{"path":"/tmp/x"}}─────────► Host
//!   Host replies with {"allowed":bool}.
//! ```
//!
//! The file-access reply is a bare object, not a tagged message, so it is a
//! standalone [`FileAccessResponse`] rather than a `Message` variant.

use serde::{Deserialize, Serialize};

use crate::error::TsError;

// ── Message ──────────────────────────────────────────────────────

/// The closed set of requests a viewer can send to a host.
///
/// Dispatch is an exhaustive `match`; there is no string-keyed routing,
/// and an unknown `type` tag fails deserialization with a
/// [`TsError::Protocol`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Message {
    /// Forwarded mouse activity.
    Mouse(MouseEvent),
    /// Forwarded keyboard activity.
    Keyboard(KeyEvent),
    /// Request one full-screen capture. Carries no data.
    Screenshot,
    /// Ask whether `path` falls outside the host's restricted set.
    FileAccess { path: String },
}

impl Message {
    /// Serialize to the JSON wire payload.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TsError> {
        serde_json::to_vec(self).map_err(|e| TsError::Encoding(e.to_string()))
    }

    /// Deserialize from a JSON wire payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TsError> {
        serde_json::from_slice(bytes).map_err(|e| TsError::Protocol(e.to_string()))
    }
}

// ── Mouse ────────────────────────────────────────────────────────

/// A mouse event, internally tagged by its `type` field.
///
/// Coordinates are in remote screen space; the viewer maps them before
/// sending. Wheel events from older peers may omit coordinates, so those
/// default to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MouseEvent {
    /// Absolute cursor move.
    Move { x: i32, y: i32 },
    /// Button press or release.
    Click {
        button: MouseButton,
        state: ButtonState,
        x: i32,
        y: i32,
    },
    /// Scroll wheel.
    Wheel {
        delta: i32,
        #[serde(default)]
        x: i32,
        #[serde(default)]
        y: i32,
    },
}

/// Mouse buttons understood by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Right,
}

/// Press/release state shared by mouse buttons and keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonState {
    Down,
    Up,
}

// ── Keyboard ─────────────────────────────────────────────────────

/// A single key press or release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Key name as reported by the viewer's windowing layer (`"a"`,
    /// `"Return"`, `"shift"`, …).
    pub key: String,
    pub state: KeyState,
}

/// Key press/release state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyState {
    Down,
    Up,
}

// ── File access response ─────────────────────────────────────────

/// Reply to [`Message::FileAccess`].
///
/// `allowed == false` is a normal response, not an error path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAccessResponse {
    pub allowed: bool,
}

impl FileAccessResponse {
    /// Serialize to the JSON wire payload.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TsError> {
        serde_json::to_vec(self).map_err(|e| TsError::Encoding(e.to_string()))
    }

    /// Deserialize from a JSON wire payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TsError> {
        serde_json::from_slice(bytes).map_err(|e| TsError::Protocol(e.to_string()))
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(msg: Message) {
        let bytes = msg.to_bytes().unwrap();
        let back = Message::from_bytes(&bytes).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn mouse_move_wire_shape() {
        let msg = Message::Mouse(MouseEvent::Move { x: 100, y: 50 });
        let json: serde_json::Value =
            serde_json::from_slice(&msg.to_bytes().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "mouse", "data": {"type": "move", "x": 100, "y": 50}})
        );
    }

    #[test]
    fn click_wire_shape() {
        let msg = Message::Mouse(MouseEvent::Click {
            button: MouseButton::Left,
            state: ButtonState::Down,
            x: 10,
            y: 20,
        });
        let json: serde_json::Value =
            serde_json::from_slice(&msg.to_bytes().unwrap()).unwrap();
        assert_eq!(json["type"], "mouse");
        assert_eq!(json["data"]["type"], "click");
        assert_eq!(json["data"]["button"], "left");
        assert_eq!(json["data"]["state"], "down");
    }

    #[test]
    fn keyboard_wire_shape() {
        let msg = Message::Keyboard(KeyEvent {
            key: "a".into(),
            state: KeyState::Down,
        });
        let json: serde_json::Value =
            serde_json::from_slice(&msg.to_bytes().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "keyboard", "data": {"key": "a", "state": "down"}})
        );
    }

    #[test]
    fn screenshot_has_no_data_member() {
        let bytes = Message::Screenshot.to_bytes().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json, serde_json::json!({"type": "screenshot"}));
        assert_eq!(Message::from_bytes(&bytes).unwrap(), Message::Screenshot);
    }

    #[test]
    fn file_access_wire_shape() {
        let msg = Message::FileAccess {
            path: "/tmp/x".into(),
        };
        let json: serde_json::Value =
            serde_json::from_slice(&msg.to_bytes().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "file_access", "data": {"path": "/tmp/x"}})
        );
    }

    #[test]
    fn all_variants_roundtrip() {
        roundtrip(Message::Mouse(MouseEvent::Move { x: -3, y: 7 }));
        roundtrip(Message::Mouse(MouseEvent::Click {
            button: MouseButton::Right,
            state: ButtonState::Up,
            x: 0,
            y: 0,
        }));
        roundtrip(Message::Mouse(MouseEvent::Wheel {
            delta: -120,
            x: 5,
            y: 9,
        }));
        roundtrip(Message::Keyboard(KeyEvent {
            key: "Return".into(),
            state: KeyState::Up,
        }));
        roundtrip(Message::Screenshot);
        roundtrip(Message::FileAccess {
            path: "C:\\Users\\alice".into(),
        });
    }

    #[test]
    fn wheel_without_coordinates_decodes() {
        // Older peers send wheel events with only a delta.
        let msg =
            Message::from_bytes(br#"{"type":"mouse","data":{"type":"wheel","delta":120}}"#)
                .unwrap();
        assert_eq!(
            msg,
            Message::Mouse(MouseEvent::Wheel {
                delta: 120,
                x: 0,
                y: 0
            })
        );
    }

    #[test]
    fn unknown_type_tag_rejected() {
        let err = Message::from_bytes(br#"{"type":"reboot","data":{}}"#).unwrap_err();
        assert!(matches!(err, TsError::Protocol(_)));
    }

    #[test]
    fn malformed_payload_rejected() {
        assert!(Message::from_bytes(b"not json").is_err());
        assert!(Message::from_bytes(br#"{"type":"mouse","data":{"type":"move"}}"#).is_err());
    }

    #[test]
    fn file_access_response_roundtrip() {
        let resp = FileAccessResponse { allowed: false };
        let bytes = resp.to_bytes().unwrap();
        assert_eq!(bytes, br#"{"allowed":false}"#);
        assert_eq!(FileAccessResponse::from_bytes(&bytes).unwrap(), resp);
    }
}
