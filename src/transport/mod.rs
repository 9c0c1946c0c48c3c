//! # Bridge Transport
//!
//! Communication with the RS485-TCP/IP bridge. The actual byte stream sits
//! behind the [`BridgeLink`] trait so the protocol codecs can run against a
//! real TCP socket or a mock link in tests.

pub mod mock;

use crate::constants::MAX_RESPONSE_LEN;
use crate::error::MercuryError;
use crate::logging::{log_debug, log_error};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Byte-stream connection to the bridge.
pub trait BridgeLink: AsyncReadExt + AsyncWriteExt + Unpin + Send {}

impl BridgeLink for TcpStream {}

impl BridgeLink for mock::MockBridgeLink {}

/// An io failure outside the timeout/closed-connection taxonomy. Logged at
/// error level because it points at the bridge or the network, not the meter.
fn unexpected_io(context: &str, e: std::io::Error) -> MercuryError {
    let message = format!("{context}: {e}");
    log_error(&message);
    MercuryError::Unexpected(message)
}

/// One request/response channel to a meter behind the bridge.
///
/// Every read is bounded by the exchange timeout set at connect time; an
/// elapsed timer maps to [`MercuryError::Timeout`] and is a normal, expected
/// outcome, not a fatal one.
pub struct BridgeHandle<L: BridgeLink> {
    link: L,
    timeout: Duration,
}

impl BridgeHandle<TcpStream> {
    /// Opens a TCP connection to the bridge. The connect itself is bounded
    /// by the same timeout as subsequent exchanges.
    pub async fn connect(
        host: &str,
        port: u16,
        exchange_timeout: Duration,
    ) -> Result<Self, MercuryError> {
        let addr = format!("{host}:{port}");
        let stream = timeout(exchange_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| MercuryError::Connection(format!("connect to {addr} timed out")))?
            .map_err(|e| MercuryError::Connection(format!("connect to {addr} failed: {e}")))?;
        Ok(BridgeHandle::new(stream, exchange_timeout))
    }
}

impl<L: BridgeLink> BridgeHandle<L> {
    /// Wraps an already-open link.
    pub fn new(link: L, exchange_timeout: Duration) -> Self {
        BridgeHandle {
            link,
            timeout: exchange_timeout,
        }
    }

    /// Sends one request frame and reads one response frame.
    pub async fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>, MercuryError> {
        log_debug(&format!("tx: {}", hex::encode(request)));

        self.link
            .write_all(request)
            .await
            .map_err(|e| unexpected_io("bridge write failed", e))?;
        self.link
            .flush()
            .await
            .map_err(|e| unexpected_io("bridge flush failed", e))?;

        let mut buf = [0u8; MAX_RESPONSE_LEN];
        let n = timeout(self.timeout, self.link.read(&mut buf))
            .await
            .map_err(|_| MercuryError::Timeout)?
            .map_err(|e| unexpected_io("bridge read failed", e))?;

        if n == 0 {
            return Err(MercuryError::Connection(
                "bridge closed the connection".to_string(),
            ));
        }

        log_debug(&format!("rx: {}", hex::encode(&buf[..n])));
        Ok(buf[..n].to_vec())
    }

    /// Best-effort release of the underlying socket.
    pub async fn shutdown(&mut self) {
        let _ = self.link.shutdown().await;
    }
}
