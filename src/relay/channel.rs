//! Stream transport for relay payloads
//!
//! Frames are `FRAME_MAGIC (4) | length (u32 BE) | payload`. The payload is
//! the opaque handoff byte sequence; decoding it into a transaction is left
//! to `handoff::from_relay_payload` so the framing never interprets it.

use bytes::{Buf, BufMut, BytesMut};
use futures::stream::{Stream, StreamExt};
use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::codec::{Decoder, Encoder};

/// Frame marker, distinct from the payload's own magic
pub const FRAME_MAGIC: [u8; 4] = *b"CSRF";

/// Largest payload accepted in one frame
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

const HEADER_LEN: usize = 8;

/// Length-prefixed framing for relay payloads
#[derive(Debug, Clone, Copy, Default)]
pub struct RelayFrameCodec;

impl Encoder<Vec<u8>> for RelayFrameCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Vec<u8>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.len() > MAX_FRAME_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("payload of {} bytes exceeds frame limit", item.len()),
            ));
        }

        dst.reserve(HEADER_LEN + item.len());
        dst.put_slice(&FRAME_MAGIC);
        dst.put_u32(item.len() as u32);
        dst.put_slice(&item);

        Ok(())
    }
}

impl Decoder for RelayFrameCodec {
    type Item = Vec<u8>;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        if src[..4] != FRAME_MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Invalid frame magic",
            ));
        }

        let len = u32::from_be_bytes([src[4], src[5], src[6], src[7]]) as usize;
        if len > MAX_FRAME_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("frame of {} bytes exceeds limit", len),
            ));
        }

        if src.len() < HEADER_LEN + len {
            src.reserve(HEADER_LEN + len - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        Ok(Some(src.split_to(len).to_vec()))
    }
}

/// Errors while waiting on the counterparty
#[derive(Error, Debug)]
pub enum HandoffError {
    #[error("No payload within {0:?}")]
    TimedOut(Duration),
    #[error("Handoff cancelled")]
    Cancelled,
    #[error("Channel closed before a payload arrived")]
    Closed,
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

/// Wait for the counterparty's next payload
///
/// Bounded by `timeout` and abandoned as soon as `cancel` receives (or its
/// sender is dropped). Abandoning a handoff has no ledger-visible effect.
pub async fn await_payload<S>(
    incoming: &mut S,
    timeout: Duration,
    cancel: &mut mpsc::Receiver<()>,
) -> Result<Vec<u8>, HandoffError>
where
    S: Stream<Item = Result<Vec<u8>, io::Error>> + Unpin,
{
    tokio::select! {
        _ = cancel.recv() => {
            log::info!("Handoff cancelled while waiting for counterparty");
            Err(HandoffError::Cancelled)
        }
        next = tokio::time::timeout(timeout, incoming.next()) => match next {
            Err(_) => {
                log::warn!("No relay payload within {:?}", timeout);
                Err(HandoffError::TimedOut(timeout))
            }
            Ok(None) => Err(HandoffError::Closed),
            Ok(Some(Err(e))) => Err(HandoffError::IoError(e)),
            Ok(Some(Ok(payload))) => {
                log::debug!("Received relay payload ({} bytes)", payload.len());
                Ok(payload)
            }
        },
    }
}
