//! Host configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration for the host.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HostConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// TLS material.
    pub tls: TlsConfig,
    /// Input forwarding settings.
    pub input: InputConfig,
    /// Screenshot encoding.
    pub capture: CaptureConfig,
    /// Restricted-path seeds.
    pub restricted: RestrictedConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address to listen on.
    pub bind_addr: String,
}

/// Paths to the host certificate, key, and shared trusted root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    pub cert: PathBuf,
    pub key: PathBuf,
    pub ca: PathBuf,
}

/// Input forwarding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Whether remote mouse/keyboard events are injected. When false,
    /// input messages are silently dropped.
    pub allow_input: bool,
}

/// Screenshot encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Image format: "png" or "jpeg".
    pub format: String,
    /// JPEG quality (1-100), ignored for PNG.
    pub jpeg_quality: u8,
}

/// Restricted paths added on top of the OS defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RestrictedConfig {
    pub extra_paths: Vec<PathBuf>,
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
            bind_addr: "0.0.0.0:4443".into(),
        }
    }
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            cert: "host.crt".into(),
            key: "host.key".into(),
            ca: "rootCA.crt".into(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { allow_input: true }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            format: "png".into(),
            jpeg_quality: 85,
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

impl HostConfig {
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
