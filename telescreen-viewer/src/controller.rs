//! The controller: owns the connection and drives the capture loop.
//!
//! ```text
//!             ┌────────────┐   mpsc    ┌─────────────┐
//!  input ───▶ │ Controller │ ────────▶ │ writer task │ ──▶ TLS
//!             │            │           └─────────────┘
//!  frames ◀── │  watch ch  │ ◀──────── reader task  ◀──── TLS
//!             └────────────┘
//! ```
//!
//! The channel carries requests (screenshot, file-access) that expect a
//! reply, and input events that do not. A reply is always the next
//! inbound frame, so requests are serialized: whoever holds the response
//! receiver lock sends and then reads exactly one frame.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, info, warn};

use telescreen_core::error::TsError;
use telescreen_core::message::{FileAccessResponse, Message};
use telescreen_core::tls::{TlsIdentity, client_config, load_root_store};
use telescreen_core::transport::SecureChannel;

use crate::config::ViewerConfig;
use crate::render::{ScaledFrame, scale_to_fit};

/// Bounds on the capture refresh interval.
const MIN_REFRESH_MS: u64 = 16;
const MAX_REFRESH_MS: u64 = 200;

fn clamp_refresh(ms: u64) -> u64 {
    ms.clamp(MIN_REFRESH_MS, MAX_REFRESH_MS)
}

/// A connected controller session.
pub struct Controller {
    outbound: mpsc::UnboundedSender<Bytes>,
    /// Replies from the host, in order. Held across a send+recv pair so
    /// only one request can be outstanding.
    responses: Mutex<mpsc::UnboundedReceiver<Bytes>>,
    running: Arc<AtomicBool>,
    refresh_ms: AtomicU64,
    viewport: std::sync::Mutex<(u32, u32)>,
    frame_tx: watch::Sender<Option<ScaledFrame>>,
    remote_size_tx: watch::Sender<Option<(u32, u32)>>,
}

impl Controller {
    /// Connect to the host named in `config` and complete the handshake.
    pub async fn connect(config: &ViewerConfig) -> Result<Arc<Self>, TsError> {
        let identity = TlsIdentity::load(&config.tls.cert, &config.tls.key)?;
        let roots = load_root_store(&config.tls.ca)?;
        let tls = client_config(identity, roots, config.network.verify_hostname)?;

        let addr: SocketAddr = config.network.host_addr.parse().map_err(|e| {
            TsError::Config(format!("bad host_addr '{}': {e}", config.network.host_addr))
        })?;
        let server_name = addr.ip().to_string();

        let deadline = Duration::from_millis(config.network.timeout_ms);
        let channel = tokio::time::timeout(
            deadline,
            SecureChannel::connect(addr, &server_name, tls),
        )
        .await
        .map_err(|_| TsError::Timeout(deadline))??;

        info!("connected to {}", channel.peer_addr());
        Ok(Self::from_channel(channel, config))
    }

    /// Wrap an already established channel. Spawns the writer and reader
    /// tasks.
    pub fn from_channel(channel: SecureChannel, config: &ViewerConfig) -> Arc<Self> {
        let (mut sink, mut stream) = channel.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Bytes>();
        let (response_tx, response_rx) = mpsc::unbounded_channel::<Bytes>();

        let running = Arc::new(AtomicBool::new(true));
        let (frame_tx, _) = watch::channel(None);
        let (remote_size_tx, _) = watch::channel(None);

        // Writer: drains the outbound queue onto the TLS sink.
        let writer_running = Arc::clone(&running);
        tokio::spawn(async move {
            while let Some(payload) = outbound_rx.recv().await {
                if let Err(e) = sink.send(payload).await {
                    warn!("send failed: {e}");
                    break;
                }
            }
            writer_running.store(false, Ordering::SeqCst);
        });

        // Reader: every inbound frame is a reply to an earlier request.
        let reader_running = Arc::clone(&running);
        tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(payload) => {
                        if response_tx.send(payload).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("receive failed: {e}");
                        break;
                    }
                }
            }
            reader_running.store(false, Ordering::SeqCst);
        });

        Arc::new(Self {
            outbound,
            responses: Mutex::new(response_rx),
            running,
            refresh_ms: AtomicU64::new(clamp_refresh(config.display.refresh_ms)),
            viewport: std::sync::Mutex::new((config.display.width, config.display.height)),
            frame_tx,
            remote_size_tx,
        })
    }

    // ── Requests ─────────────────────────────────────────────────

    /// Send a request and wait for the single reply frame.
    async fn request(&self, msg: &Message) -> Result<Bytes, TsError> {
        // Lock first: the reply must pair with this request.
        let mut responses = self.responses.lock().await;
        self.outbound.send(Bytes::from(msg.to_bytes()?))?;
        responses.recv().await.ok_or(TsError::ConnectionClosed)
    }

    /// Request one screenshot and return the raw encoded image bytes.
    pub async fn request_screenshot(&self) -> Result<Bytes, TsError> {
        self.request(&Message::Screenshot).await
    }

    /// Ask the host whether `path` may be opened remotely.
    pub async fn check_file_access(&self, path: &str) -> Result<bool, TsError> {
        let reply = self
            .request(&Message::FileAccess { path: path.into() })
            .await?;
        Ok(FileAccessResponse::from_bytes(&reply)?.allowed)
    }

    /// Forward an input event. No reply is expected.
    pub fn forward(&self, msg: &Message) -> Result<(), TsError> {
        self.outbound.send(Bytes::from(msg.to_bytes()?))?;
        Ok(())
    }

    // ── Capture loop ─────────────────────────────────────────────

    /// Run the screenshot/render cycle until stopped or the connection
    /// drops. Each decoded frame is scaled to the current viewport and
    /// published on the frame watch channel.
    pub async fn run(self: Arc<Self>) -> Result<(), TsError> {
        while self.is_running() {
            let raw = match self.request_screenshot().await {
                Ok(raw) => raw,
                Err(TsError::ConnectionClosed) => {
                    info!("host closed the connection");
                    self.stop();
                    return Err(TsError::ConnectionClosed);
                }
                Err(e) => {
                    self.stop();
                    return Err(e);
                }
            };

            let decoded = match image::load_from_memory(&raw) {
                Ok(img) => img,
                Err(e) => {
                    self.stop();
                    return Err(e.into());
                }
            };
            self.remote_size_tx
                .send_replace(Some((decoded.width(), decoded.height())));

            let (vw, vh) = self.viewport();
            let frame = scale_to_fit(&decoded, vw, vh);
            debug!(
                "frame {}x{} -> {}x{}",
                frame.remote_width,
                frame.remote_height,
                frame.width(),
                frame.height()
            );
            self.frame_tx.send_replace(Some(frame));

            let interval = self.refresh_ms.load(Ordering::Relaxed);
            tokio::time::sleep(Duration::from_millis(interval)).await;
        }
        Ok(())
    }

    // ── Control surface ──────────────────────────────────────────

    /// Subscribe to scaled frames.
    pub fn frame_receiver(&self) -> watch::Receiver<Option<ScaledFrame>> {
        self.frame_tx.subscribe()
    }

    /// Subscribe to the remote screen size, learned from frames.
    pub fn remote_size_receiver(&self) -> watch::Receiver<Option<(u32, u32)>> {
        self.remote_size_tx.subscribe()
    }

    /// Change the capture interval. Clamped to 16–200 ms.
    pub fn set_refresh_ms(&self, ms: u64) {
        self.refresh_ms.store(clamp_refresh(ms), Ordering::Relaxed);
    }

    /// The current capture interval in milliseconds.
    pub fn refresh_ms(&self) -> u64 {
        self.refresh_ms.load(Ordering::Relaxed)
    }

    /// Update the viewport size frames are scaled to.
    pub fn set_viewport(&self, w: u32, h: u32) {
        if let Ok(mut viewport) = self.viewport.lock() {
            *viewport = (w.max(1), h.max(1));
        }
    }

    fn viewport(&self) -> (u32, u32) {
        match self.viewport.lock() {
            Ok(viewport) => *viewport,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Ask the capture loop to stop after the current frame.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

// ── Tests ────────────────────────────────────────────────────────
