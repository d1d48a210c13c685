//! Length-prefixed framing for the telescreen wire protocol.
//!
//! Every frame is an 8-byte **big-endian** unsigned length followed by
//! exactly that many payload bytes. The payload is either a JSON
//! [`Message`](crate::message::Message), a JSON
//! [`FileAccessResponse`](crate::message::FileAccessResponse), or raw
//! encoded image bytes; the codec itself is payload-agnostic.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::TsError;

/// Size of the length prefix in bytes.
pub const LEN_PREFIX: usize = 8;

/// Maximum accepted frame payload. A full-screen PNG is a few
/// megabytes, so 64 MiB bounds memory without ever rejecting a
/// legitimate frame.
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Tokio codec for length-prefixed frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameCodec;

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = TsError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, TsError> {
        if src.len() < LEN_PREFIX {
            return Ok(None);
        }

        let mut prefix = [0u8; LEN_PREFIX];
        prefix.copy_from_slice(&src[..LEN_PREFIX]);
        let len = u64::from_be_bytes(prefix);

        if len > MAX_FRAME_SIZE as u64 {
            return Err(TsError::FrameTooLarge {
                size: len as usize,
                max: MAX_FRAME_SIZE,
            });
        }
        let len = len as usize;

        if src.len() < LEN_PREFIX + len {
            src.reserve(LEN_PREFIX + len - src.len());
            return Ok(None);
        }

        src.advance(LEN_PREFIX);
        Ok(Some(src.split_to(len).freeze()))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, TsError> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            // Fewer bytes arrived than the prefix declared and the peer
            // closed: a truncated or maliciously cut stream.
            None => Err(TsError::ConnectionClosed),
        }
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = TsError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), TsError> {
        if item.len() > MAX_FRAME_SIZE {
            return Err(TsError::FrameTooLarge {
                size: item.len(),
                max: MAX_FRAME_SIZE,
            });
        }
        dst.reserve(LEN_PREFIX + item.len());
        dst.put_u64(item.len() as u64);
        dst.extend_from_slice(&item);
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
