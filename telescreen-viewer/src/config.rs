//! Viewer configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration for the viewer.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ViewerConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// TLS material.
    pub tls: TlsConfig,
    /// Display settings.
    pub display: DisplayConfig,
    /// Input forwarding settings.
    pub input: InputConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Host address (IP:port).
    pub host_addr: String,
    /// Connection timeout in milliseconds.
    pub timeout_ms: u64,
    /// Whether the host certificate's name must match `host_addr`.
    ///
    /// Defaults to `false`: the chain is still validated against the
    /// shared root, but the name check is skipped. A known security
    /// gap; enable for stricter setups.
    pub verify_hostname: bool,
}

/// Paths to the viewer certificate, key, and shared trusted root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    pub cert: PathBuf,
    pub key: PathBuf,
    pub ca: PathBuf,
}

/// Display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Screenshot refresh interval in milliseconds (16–200).
    pub refresh_ms: u64,
    /// Initial viewport width.
    pub width: u32,
    /// Initial viewport height.
    pub height: u32,
}

/// Input forwarding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Forward mouse events.
    pub forward_mouse: bool,
    /// Forward keyboard events.
    pub forward_keyboard: bool,
    /// Minimum remote-space movement (px, either axis) before a mouse
    /// move is reported.
    pub mouse_threshold: i32,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host_addr: "127.0.0.1:4443".into(),
            timeout_ms: 5000,
            verify_hostname: false,
        }
    }
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            cert: "viewer.crt".into(),
            key: "viewer.key".into(),
            ca: "rootCA.crt".into(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            refresh_ms: 50,
            width: 1280,
            height: 720,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            forward_mouse: true,
            forward_keyboard: true,
            mouse_threshold: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ViewerConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
