//! Control host: accepts viewer connections and dispatches messages.
//!
//! One task per accepted socket, spawned with no upper bound. A
//! handler's failure tears down only its own connection; the accept
//! loop and other handlers are unaffected.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use bytes::Bytes;
use tokio::net::TcpListener;
use tracing::{info, warn};

use telescreen_core::capability::{InputInjector, ScreenCapture};
use telescreen_core::gate::RestrictedPaths;
use telescreen_core::message::{FileAccessResponse, Message, MouseEvent};
use telescreen_core::tls::{TlsIdentity, load_root_store, server_config};
use telescreen_core::transport::SecureChannel;
use telescreen_core::error::TsError;

use crate::config::HostConfig;

// ── ControlHost ──────────────────────────────────────────────────

/// The controlled-side server.
///
/// # Lifetime
///
/// Call [`run`](Self::run) to bind and serve. It runs until
/// [`stop`](Self::stop) is called or the listener fails. Established
/// handlers keep their connections until the peer closes or errors.
pub struct ControlHost {
    config: HostConfig,
    shared: Shared,
    running: Arc<AtomicBool>,
}

/// State shared between the accept loop and every handler task.
#[derive(Clone)]
struct Shared {
    capture: Arc<dyn ScreenCapture>,
    injector: Arc<dyn InputInjector>,
    allow_input: Arc<AtomicBool>,
    restricted: Arc<RwLock<RestrictedPaths>>,
}

impl ControlHost {
    /// Create a host with the given capabilities.
    ///
    /// The restricted set starts from the OS defaults plus any
    /// `[restricted] extra_paths` from the config.
    pub fn new(
        config: HostConfig,
        capture: Arc<dyn ScreenCapture>,
        injector: Arc<dyn InputInjector>,
    ) -> Self {
        let mut restricted = RestrictedPaths::with_defaults();
        for path in &config.restricted.extra_paths {
            restricted.add(path);
        }

        let shared = Shared {
            capture,
            injector,
            allow_input: Arc::new(AtomicBool::new(config.input.allow_input)),
            restricted: Arc::new(RwLock::new(restricted)),
        };

        Self {
            config,
            shared,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The operator control surface (input toggle, restricted-path edits).
    pub fn handle(&self) -> HostHandle {
        HostHandle {
            allow_input: Arc::clone(&self.shared.allow_input),
            restricted: Arc::clone(&self.shared.restricted),
        }
    }

    /// A cloneable handle that can stop the accept loop from another task.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Signal the accept loop to stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the accept loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Load TLS material, bind the listener, and serve until stopped.
    pub async fn run(&self) -> Result<(), TsError> {
        let identity = TlsIdentity::load(&self.config.tls.cert, &self.config.tls.key)?;
        let roots = load_root_store(&self.config.tls.ca)?;
        let tls = server_config(identity, roots)?;

        let addr: SocketAddr = self
            .config
            .network
            .bind_addr
            .parse()
            .map_err(|e| TsError::Config(format!("invalid bind address: {e}")))?;
        let listener = TcpListener::bind(addr).await?;
        info!("host listening on {addr}");

        self.serve(listener, tls).await
    }

    /// Serve an already-bound listener. Split out so tests can bind an
    /// ephemeral port themselves.
    pub async fn serve(
        &self,
        listener: TcpListener,
        tls: Arc<telescreen_core::rustls::ServerConfig>,
    ) -> Result<(), TsError> {
        self.running.store(true, Ordering::SeqCst);

        while self.running.load(Ordering::SeqCst) {
            let accept = tokio::select! {
                result = listener.accept() => result,
                _ = Self::wait_for_stop(&self.running) => break,
            };

            let (stream, peer) = match accept {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("accept error: {e}");
                    continue;
                }
            };

            let shared = self.shared.clone();
            let tls = Arc::clone(&tls);
            tokio::spawn(async move {
                handle_connection(stream, peer, tls, shared).await;
            });
        }

        self.running.store(false, Ordering::SeqCst);
        info!("host stopped");
        Ok(())
    }

    /// Async helper: resolves when `running` becomes false.
    async fn wait_for_stop(running: &Arc<AtomicBool>) {
        loop {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }
}

// ── Connection handler ───────────────────────────────────────────

/// One handler per viewer. Reads frames until the peer closes or any
/// read/decode error occurs, then releases the connection.
async fn handle_connection(
    stream: tokio::net::TcpStream,
    peer: SocketAddr,
    tls: Arc<telescreen_core::rustls::ServerConfig>,
    shared: Shared,
) {
    let mut channel = match SecureChannel::accept(stream, tls).await {
        Ok(c) => c,
        Err(e) => {
            warn!("tls handshake with {peer} failed: {e}");
            return;
        }
    };
    info!("viewer connected from {peer}");

    loop {
        let msg = match channel.recv_message().await {
            Ok(m) => m,
            Err(TsError::ConnectionClosed) => {
                info!("{peer} disconnected");
                break;
            }
            Err(e) => {
                warn!("closing {peer}: {e}");
                break;
            }
        };

        if let Err(e) = dispatch(&mut channel, msg, &shared).await {
            warn!("closing {peer}: {e}");
            break;
        }
    }
}

/// Route one message to the capture/injection capabilities or the gate.
async fn dispatch(
    channel: &mut SecureChannel,
    msg: Message,
    shared: &Shared,
) -> Result<(), TsError> {
    match msg {
        Message::Mouse(event) => {
            // Silently dropped when forwarding is disabled: no error,
            // no response.
            if shared.allow_input.load(Ordering::SeqCst) {
                let result = match event {
                    MouseEvent::Move { x, y } => shared.injector.move_cursor(x, y),
                    MouseEvent::Click {
                        button,
                        state,
                        x,
                        y,
                    } => shared.injector.button(button, state, x, y),
                    MouseEvent::Wheel { delta, .. } => shared.injector.scroll(delta),
                };
                if let Err(e) = result {
                    warn!("mouse injection failed: {e}");
                }
            }
        }
        Message::Keyboard(event) => {
            if shared.allow_input.load(Ordering::SeqCst) {
                if let Err(e) = shared.injector.key(&event.key, event.state) {
                    warn!("key injection failed: {e}");
                }
            }
        }
        Message::Screenshot => {
            let img = shared.capture.capture()?;
            channel.send_bytes(Bytes::from(img)).await?;
        }
        Message::FileAccess { path } => {
            let allowed = {
                let gate = shared
                    .restricted
                    .read()
                    .unwrap_or_else(PoisonError::into_inner);
                !gate.is_restricted(Path::new(&path))
            };
            let resp = FileAccessResponse { allowed };
            channel.send_bytes(Bytes::from(resp.to_bytes()?)).await?;
        }
    }
    Ok(())
}

// ── HostHandle ───────────────────────────────────────────────────

/// Operator control surface shared with the accept loop and handlers.
///
/// This is what a front-end (tray icon, TUI, whatever) mutates; nothing
/// here is persisted.
#[derive(Clone)]
pub struct HostHandle {
    allow_input: Arc<AtomicBool>,
    restricted: Arc<RwLock<RestrictedPaths>>,
}

impl HostHandle {
    /// Enable or disable remote input injection.
    pub fn set_allow_input(&self, allow: bool) {
        self.allow_input.store(allow, Ordering::SeqCst);
    }

    /// Whether remote input is currently injected.
    pub fn allow_input(&self) -> bool {
        self.allow_input.load(Ordering::SeqCst)
    }

    /// Add a restricted root (canonicalized before insertion).
    pub fn add_restricted_path(&self, path: &Path) {
        self.restricted
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add(path);
    }

    /// Remove a restricted root. Returns `true` if it was present.
    pub fn remove_restricted_path(&self, path: &Path) -> bool {
        self.restricted
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path)
    }

    /// Sorted snapshot of the restricted roots.
    pub fn restricted_paths(&self) -> Vec<std::path::PathBuf> {
        self.restricted
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .members()
    }
}

// ── Tests ────────────────────────────────────────────────────────
