//! Mock bridge link for testing
//!
//! Simulates the TCP side of an RS485 bridge without a socket. Responses are
//! queued ahead of time, one frame per exchange; an empty queue leaves the
//! reader pending so timeout handling can be exercised.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Mock bridge link that simulates bidirectional communication.
#[derive(Clone, Default)]
pub struct MockBridgeLink {
    /// Data written to the link (outgoing)
    tx_buffer: Arc<Mutex<Vec<u8>>>,
    /// Response frames to be read from the link, one per exchange
    rx_frames: Arc<Mutex<VecDeque<Vec<u8>>>>,
    /// Simulated io error for the next operation
    next_error: Arc<Mutex<Option<io::Error>>>,
    /// When set, an empty rx queue reads as end-of-stream instead of pending
    eof: Arc<Mutex<bool>>,
}

impl MockBridgeLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one response frame. Each read delivers exactly one frame,
    /// mirroring the request/response lockstep of the real bus.
    pub fn queue_rx_data(&self, data: &[u8]) {
        let mut rx = self.rx_frames.lock().unwrap();
        rx.push_back(data.to_vec());
    }

    /// Get data that was written to the link.
    pub fn get_tx_data(&self) -> Vec<u8> {
        self.tx_buffer.lock().unwrap().clone()
    }

    /// Number of queued response frames not yet consumed.
    pub fn pending_rx_frames(&self) -> usize {
        self.rx_frames.lock().unwrap().len()
    }

    /// Clear the tx record (to inspect requests one exchange at a time).
    pub fn clear_tx(&self) {
        self.tx_buffer.lock().unwrap().clear();
    }

    /// Set an error to be returned on the next operation.
    pub fn set_next_error(&self, error: io::Error) {
        *self.next_error.lock().unwrap() = Some(error);
    }

    /// Make further reads on an empty queue return end-of-stream.
    pub fn set_eof(&self) {
        *self.eof.lock().unwrap() = true;
    }
}

impl AsyncRead for MockBridgeLink {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Poll::Ready(Err(error));
        }

        let mut rx = self.rx_frames.lock().unwrap();
        if let Some(frame) = rx.pop_front() {
            // Response frames are small; the read buffer always fits one
            buf.put_slice(&frame);
            return Poll::Ready(Ok(()));
        }

        if *self.eof.lock().unwrap() {
            // Zero-length read signals a closed connection
            return Poll::Ready(Ok(()));
        }

        // No data and not closed: stay pending, as a silent socket would.
        // The caller's timeout timer provides the wakeup.
        Poll::Pending
    }
}

impl AsyncWrite for MockBridgeLink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Poll::Ready(Err(error));
        }

        let mut tx = self.tx_buffer.lock().unwrap();
        tx.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
