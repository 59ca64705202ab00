//! Bounded byte relay between two tasks.
//!
//! A relay carries chunks from one producer to one consumer with explicit
//! closing: the writer either `finish`es (the reader sees end-of-stream) or
//! `abort`s (the reader sees an error). A writer dropped without doing either
//! counts as an abort, so a consumer can never mistake an abandoned stream
//! for a complete one.

use bytes::Bytes;
use futures::Stream;
use std::io::{self, Write};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::io::StreamReader;

enum Frame {
    Chunk(Bytes),
    End,
    Abort(String),
}

/// Create a relay that buffers at most `capacity` chunks.
pub fn relay(capacity: usize) -> (RelayWriter, RelayReader) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (RelayWriter { tx }, RelayReader { rx, done: false })
}

fn reader_gone() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "relay reader closed")
}

/// Async producing half.
pub struct RelayWriter {
    tx: mpsc::Sender<Frame>,
}

impl RelayWriter {
    /// Send a chunk, waiting for room. Fails once the reader is gone.
    pub async fn send(&self, chunk: Bytes) -> io::Result<()> {
        if chunk.is_empty() {
            return Ok(());
        }
        self.tx
            .send(Frame::Chunk(chunk))
            .await
            .map_err(|_| reader_gone())
    }

    /// Whether the reader has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Mark the stream complete.
    pub async fn finish(self) {
        // A vanished reader has nothing left to be told.
        let _ = self.tx.send(Frame::End).await;
    }

    /// Terminate the stream with an error.
    ///
    /// Never waits: if the buffer is full the abort frame is skipped and the
    /// dropped sender alone signals the failure.
    pub fn abort(self, reason: impl Into<String>) {
        let _ = self.tx.try_send(Frame::Abort(reason.into()));
    }

    /// Convert into a writer for use on a blocking thread.
    ///
    /// Writes after `deadline` fail with `TimedOut`.
    pub fn into_blocking(self, deadline: Option<Instant>) -> BlockingRelayWriter {
        BlockingRelayWriter {
            tx: self.tx,
            deadline,
        }
    }
}

/// Blocking producing half, usable as a `std::io::Write` sink.
///
/// Must only be driven from a blocking thread (e.g. `spawn_blocking`).
pub struct BlockingRelayWriter {
    tx: mpsc::Sender<Frame>,
    deadline: Option<Instant>,
}

impl BlockingRelayWriter {
    pub fn finish(self) {
        let _ = self.tx.blocking_send(Frame::End);
    }

    pub fn abort(self, reason: impl Into<String>) {
        let _ = self.tx.try_send(Frame::Abort(reason.into()));
    }
}

impl Write for BlockingRelayWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "relay write deadline exceeded",
                ));
            }
        }
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx
            .blocking_send(Frame::Chunk(Bytes::copy_from_slice(buf)))
            .map_err(|_| reader_gone())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Consuming half; yields chunks until the writer finishes or fails.
pub struct RelayReader {
    rx: mpsc::Receiver<Frame>,
    done: bool,
}

impl RelayReader {
    /// Adapt into an `AsyncRead`.
    pub fn into_async_read(self) -> StreamReader<RelayReader, Bytes> {
        StreamReader::new(self)
    }
}

impl Stream for RelayReader {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }
        let frame = match self.rx.poll_recv(cx) {
            Poll::Ready(frame) => frame,
            Poll::Pending => return Poll::Pending,
        };
        match frame {
            Some(Frame::Chunk(chunk)) => Poll::Ready(Some(Ok(chunk))),
            Some(Frame::End) => {
                self.done = true;
                Poll::Ready(None)
            }
            Some(Frame::Abort(reason)) => {
                self.done = true;
                Poll::Ready(Some(Err(io::Error::other(reason))))
            }
            None => {
                self.done = true;
                Poll::Ready(Some(Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "relay writer dropped before finishing",
                ))))
            }
        }
    }
}
