//! End-to-end host tests over real TLS sockets.
//!
//! A throwaway CA signs one leaf per side; the host serves an ephemeral
//! loopback listener with mock capabilities, and a raw `SecureChannel`
//! plays the viewer.

use std::sync::Arc;

use bytes::Bytes;
use rcgen::{BasicConstraints, CertificateParams, IsCa, KeyPair};
use tempfile::TempDir;
use tokio::net::TcpListener;

use telescreen_core::capability::mock::{InjectedEvent, MockCapture, MockInjector};
use telescreen_core::message::{FileAccessResponse, Message, MouseEvent};
use telescreen_core::tls::{TlsIdentity, client_config, root_store_from_pem, server_config};
use telescreen_core::transport::SecureChannel;
use telescreen_host::config::HostConfig;
use telescreen_host::host::ControlHost;

// ── Test PKI ─────────────────────────────────────────────────────

struct TestPki {
    ca_pem: String,
    host_cert: String,
    host_key: String,
    viewer_cert: String,
    viewer_key: String,
}

fn test_pki() -> TestPki {
    let ca_key = KeyPair::generate().unwrap();
    let mut ca_params = CertificateParams::new(Vec::new()).unwrap();
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    let ca_cert = ca_params.self_signed(&ca_key).unwrap();

    let host_key = KeyPair::generate().unwrap();
    let host_cert = CertificateParams::new(vec!["localhost".into()])
        .unwrap()
        .signed_by(&host_key, &ca_cert, &ca_key)
        .unwrap();

    let viewer_key = KeyPair::generate().unwrap();
    let viewer_cert = CertificateParams::new(vec!["viewer".into()])
        .unwrap()
        .signed_by(&viewer_key, &ca_cert, &ca_key)
        .unwrap();

    TestPki {
        ca_pem: ca_cert.pem(),
        host_cert: host_cert.pem(),
        host_key: host_key.serialize_pem(),
        viewer_cert: viewer_cert.pem(),
        viewer_key: viewer_key.serialize_pem(),
    }
}

// ── Harness ──────────────────────────────────────────────────────

struct Harness {
    addr: std::net::SocketAddr,
    host: Arc<ControlHost>,
    injector: Arc<MockInjector>,
    pki: TestPki,
}

async fn start_host(config: HostConfig) -> Harness {
    let pki = test_pki();
    let injector = Arc::new(MockInjector::new());

    let host = Arc::new(ControlHost::new(
        config,
        Arc::new(MockCapture::new(640, 480)),
        Arc::clone(&injector) as Arc<dyn telescreen_core::capability::InputInjector>,
    ));

    let identity =
        TlsIdentity::from_pem(pki.host_cert.as_bytes(), pki.host_key.as_bytes()).unwrap();
    let roots = root_store_from_pem(pki.ca_pem.as_bytes()).unwrap();
    let tls = server_config(identity, roots).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let serve_host = Arc::clone(&host);
    tokio::spawn(async move {
        serve_host.serve(listener, tls).await.unwrap();
    });

    Harness {
        addr,
        host,
        injector,
        pki,
    }
}

async fn connect_viewer(harness: &Harness) -> SecureChannel {
    let identity = TlsIdentity::from_pem(
        harness.pki.viewer_cert.as_bytes(),
        harness.pki.viewer_key.as_bytes(),
    )
    .unwrap();
    let roots = root_store_from_pem(harness.pki.ca_pem.as_bytes()).unwrap();
    let tls = client_config(identity, roots, false).unwrap();
    SecureChannel::connect(harness.addr, "localhost", tls)
        .await
        .unwrap()
}

// ── Tests ────────────────────────────────────────────────────────

#[tokio::test]
async fn screenshot_roundtrip_yields_decodable_png() {
    let harness = start_host(HostConfig::default()).await;
    let mut channel = connect_viewer(&harness).await;

    channel.send(&Message::Screenshot).await.unwrap();
    let frame = channel.recv_bytes().await.unwrap();

    let img = image::load_from_memory(&frame).unwrap();
    assert_eq!((img.width(), img.height()), (640, 480));

    harness.host.stop();
}

#[tokio::test]
async fn mouse_move_is_injected_when_input_enabled() {
    let harness = start_host(HostConfig::default()).await;
    let mut channel = connect_viewer(&harness).await;

    channel
        .send(&Message::Mouse(MouseEvent::Move { x: 100, y: 50 }))
        .await
        .unwrap();

    // Dispatch is sequential per connection: once the screenshot reply
    // arrives, the move has been processed.
    channel.send(&Message::Screenshot).await.unwrap();
    channel.recv_bytes().await.unwrap();

    assert_eq!(
        harness.injector.events(),
        vec![InjectedEvent::Move { x: 100, y: 50 }]
    );

    harness.host.stop();
}

#[tokio::test]
async fn every_input_kind_reaches_the_injector() {
    use telescreen_core::message::{ButtonState, KeyEvent, KeyState, MouseButton};

    let harness = start_host(HostConfig::default()).await;
    let mut channel = connect_viewer(&harness).await;

    channel
        .send(&Message::Mouse(MouseEvent::Move { x: 10, y: 20 }))
        .await
        .unwrap();
    channel
        .send(&Message::Mouse(MouseEvent::Click {
            button: MouseButton::Right,
            state: ButtonState::Down,
            x: 10,
            y: 20,
        }))
        .await
        .unwrap();
    channel
        .send(&Message::Mouse(MouseEvent::Wheel {
            delta: -120,
            x: 10,
            y: 20,
        }))
        .await
        .unwrap();
    channel
        .send(&Message::Keyboard(KeyEvent {
            key: "Return".into(),
            state: KeyState::Down,
        }))
        .await
        .unwrap();

    // Sync: the screenshot reply proves the preceding events were
    // dispatched in order.
    channel.send(&Message::Screenshot).await.unwrap();
    channel.recv_bytes().await.unwrap();

    assert_eq!(
        harness.injector.events(),
        vec![
            InjectedEvent::Move { x: 10, y: 20 },
            InjectedEvent::Button {
                button: MouseButton::Right,
                state: ButtonState::Down,
                x: 10,
                y: 20,
            },
            InjectedEvent::Scroll { delta: -120 },
            InjectedEvent::Key {
                key: "Return".into(),
                state: KeyState::Down,
            },
        ]
    );

    harness.host.stop();
}

#[tokio::test]
async fn input_dropped_silently_when_disabled() {
    let harness = start_host(HostConfig::default()).await;
    harness.host.handle().set_allow_input(false);
    let mut channel = connect_viewer(&harness).await;

    channel
        .send(&Message::Mouse(MouseEvent::Move { x: 1, y: 2 }))
        .await
        .unwrap();

    // No response, no error. The next request still works.
    channel.send(&Message::Screenshot).await.unwrap();
    channel.recv_bytes().await.unwrap();

    assert!(harness.injector.events().is_empty());

    harness.host.stop();
}

#[tokio::test]
async fn file_access_gate_answers_both_ways() {
    let restricted_dir = TempDir::new().unwrap();
    let open_dir = TempDir::new().unwrap();

    let mut config = HostConfig::default();
    config
        .restricted
        .extra_paths
        .push(restricted_dir.path().to_path_buf());

    let harness = start_host(config).await;
    let mut channel = connect_viewer(&harness).await;

    let denied = restricted_dir.path().join("secrets.txt");
    channel
        .send(&Message::FileAccess {
            path: denied.to_string_lossy().into_owned(),
        })
        .await
        .unwrap();
    let reply = channel.recv_bytes().await.unwrap();
    assert!(!FileAccessResponse::from_bytes(&reply).unwrap().allowed);

    let allowed = open_dir.path().join("notes.txt");
    channel
        .send(&Message::FileAccess {
            path: allowed.to_string_lossy().into_owned(),
        })
        .await
        .unwrap();
    let reply = channel.recv_bytes().await.unwrap();
    assert!(FileAccessResponse::from_bytes(&reply).unwrap().allowed);

    harness.host.stop();
}

#[tokio::test]
async fn unchained_client_certificate_is_rejected() {
    let harness = start_host(HostConfig::default()).await;

    // Self-signed identity, not chained to the shared root.
    let rogue_key = KeyPair::generate().unwrap();
    let rogue_cert = CertificateParams::new(vec!["rogue".into()])
        .unwrap()
        .self_signed(&rogue_key)
        .unwrap();

    let identity =
        TlsIdentity::from_pem(rogue_cert.pem().as_bytes(), rogue_key.serialize_pem().as_bytes())
            .unwrap();
    let roots = root_store_from_pem(harness.pki.ca_pem.as_bytes()).unwrap();
    let tls = client_config(identity, roots, false).unwrap();

    // The rejection may surface during connect or on first use,
    // depending on handshake timing.
    match SecureChannel::connect(harness.addr, "localhost", tls).await {
        Err(_) => {}
        Ok(mut channel) => {
            channel.send(&Message::Screenshot).await.ok();
            assert!(channel.recv_bytes().await.is_err());
        }
    }

    harness.host.stop();
}

#[tokio::test]
async fn malformed_frame_tears_down_only_that_connection() {
    let harness = start_host(HostConfig::default()).await;

    let mut bad = connect_viewer(&harness).await;
    bad.send_bytes(Bytes::from_static(b"not json")).await.unwrap();
    assert!(bad.recv_bytes().await.is_err());

    // A fresh connection is unaffected.
    let mut good = connect_viewer(&harness).await;
    good.send(&Message::Screenshot).await.unwrap();
    good.recv_bytes().await.unwrap();

    harness.host.stop();
}
