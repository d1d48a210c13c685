//! Mutually authenticated channel between viewer and host.
//!
//! A [`SecureChannel`] is a TLS stream wrapped in the
//! [`FrameCodec`](crate::codec::FrameCodec) via `tokio_util::codec::Framed`.
//! Handshake failure surfaces as an error and the connection is never
//! established; there are no retries at this layer.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ServerConfig};
use tokio::net::TcpStream;
use tokio_rustls::{TlsAcceptor, TlsConnector, TlsStream};
use tokio_util::codec::Framed;

use crate::codec::FrameCodec;
use crate::error::TsError;
use crate::message::Message;

/// The framed TLS stream underlying a channel.
pub type FramedTls = Framed<TlsStream<TcpStream>, FrameCodec>;

/// Write half of a split channel.
pub type ChannelSink = SplitSink<FramedTls, Bytes>;

/// Read half of a split channel.
pub type ChannelStream = SplitStream<FramedTls>;

/// A mutually authenticated, frame-oriented connection.
pub struct SecureChannel {
    framed: FramedTls,
    peer: SocketAddr,
}

impl SecureChannel {
    /// Connect to a host and complete the mutual-TLS handshake.
    ///
    /// `server_name` is the name presented during the handshake (SNI);
    /// whether it is actually checked against the certificate depends on
    /// the `ClientConfig` (see [`crate::tls::client_config`]).
    pub async fn connect(
        addr: SocketAddr,
        server_name: &str,
        config: Arc<ClientConfig>,
    ) -> Result<Self, TsError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;

        let name = ServerName::try_from(server_name.to_string())
            .map_err(|_| TsError::InvalidServerName(server_name.to_string()))?;

        let tls = TlsConnector::from(config).connect(name, stream).await?;
        Ok(Self {
            framed: Framed::new(TlsStream::Client(tls), FrameCodec),
            peer: addr,
        })
    }

    /// Complete the server-side handshake on an accepted socket.
    pub async fn accept(stream: TcpStream, config: Arc<ServerConfig>) -> Result<Self, TsError> {
        let peer = stream.peer_addr()?;
        stream.set_nodelay(true)?;

        let tls = TlsAcceptor::from(config).accept(stream).await?;
        Ok(Self {
            framed: Framed::new(TlsStream::Server(tls), FrameCodec),
            peer,
        })
    }

    /// The remote endpoint's address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Send one message as a frame.
    pub async fn send(&mut self, msg: &Message) -> Result<(), TsError> {
        self.send_bytes(Bytes::from(msg.to_bytes()?)).await
    }

    /// Send one raw payload as a frame.
    pub async fn send_bytes(&mut self, payload: Bytes) -> Result<(), TsError> {
        self.framed.send(payload).await
    }

    /// Receive the next frame payload.
    ///
    /// End of stream maps to [`TsError::ConnectionClosed`].
    pub async fn recv_bytes(&mut self) -> Result<Bytes, TsError> {
        match self.framed.next().await {
            Some(frame) => frame,
            None => Err(TsError::ConnectionClosed),
        }
    }

    /// Receive and parse the next frame as a [`Message`].
    pub async fn recv_message(&mut self) -> Result<Message, TsError> {
        let frame = self.recv_bytes().await?;
        Message::from_bytes(&frame)
    }

    /// Split into independent read and write halves so sending and
    /// receiving can run on separate tasks.
    pub fn split(self) -> (ChannelSink, ChannelStream) {
        self.framed.split()
    }
}
