//! TCP transport for remote sinks
//!
//! Plain payloads are sent newline-delimited over a lazily established
//! connection. Compressed output may itself contain newlines, so compressed
//! payloads are framed with a 4-byte big-endian length prefix instead. A
//! failed write drops the connection, reconnects once and resends.

use super::queued::Transport;
use crate::core::{LoggerError, Result};
use flate2::write::{GzEncoder, ZlibEncoder};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::net::TcpStream;
use std::time::Duration;

pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Zlib,
}

impl Compression {
    fn encode(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let level = flate2::Compression::default();
        match self {
            Compression::None => Ok(payload.to_vec()),
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), level);
                encoder.write_all(payload)?;
                Ok(encoder.finish()?)
            }
            Compression::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::new(), level);
                encoder.write_all(payload)?;
                Ok(encoder.finish()?)
            }
        }
    }

    fn frame(&self, payload: &[u8]) -> Result<Vec<u8>> {
        if *self == Compression::None {
            let mut frame = Vec::with_capacity(payload.len() + 1);
            frame.extend_from_slice(payload);
            frame.push(b'\n');
            return Ok(frame);
        }
        let body = self.encode(payload)?;
        let len = u32::try_from(body.len())
            .map_err(|_| LoggerError::other(format!("compressed payload too large: {} bytes", body.len())))?;
        let mut frame = Vec::with_capacity(body.len() + 4);
        frame.extend_from_slice(&len.to_be_bytes());
        frame.extend_from_slice(&body);
        Ok(frame)
    }
}

/// Payloads over TCP, newline-delimited or length-prefixed when compressed
///
/// # Example
///
/// ```no_run
/// use rust_deferred_logger::hooks::{Compression, TcpTransport};
///
/// let transport = TcpTransport::new("logs.internal:12201").with_compression(Compression::Gzip);
/// ```
pub struct TcpTransport {
    address: String,
    stream: Option<TcpStream>,
    compression: Compression,
    write_timeout: Duration,
    reconnect_on_error: bool,
}

impl TcpTransport {
    /// No connection is made until the first send
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            stream: None,
            compression: Compression::None,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            reconnect_on_error: true,
        }
    }

    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Enable or disable automatic reconnection on errors
    ///
    /// Default: enabled
    #[must_use]
    pub fn with_reconnect(mut self, enable: bool) -> Self {
        self.reconnect_on_error = enable;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn connect(&mut self) -> Result<&mut TcpStream> {
        if self.stream.is_none() {
            let stream = TcpStream::connect(&self.address)
                .map_err(|e| LoggerError::io_operation("connecting", self.address.clone(), e))?;
            stream.set_write_timeout(Some(self.write_timeout))?;
            stream.set_nodelay(true)?;
            self.stream = Some(stream);
        }
        self.stream
            .as_mut()
            .ok_or_else(|| LoggerError::other("TCP stream not connected"))
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        let stream = self.connect()?;
        let result = stream.write_all(frame).and_then(|()| stream.flush());
        if result.is_err() {
            self.stream = None;
        }
        result.map_err(Into::into)
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, payload: &[u8]) -> Result<()> {
        let frame = self.compression.frame(payload)?;

        match self.write_frame(&frame) {
            Ok(()) => Ok(()),
            Err(first) if self.reconnect_on_error => self.write_frame(&frame).map_err(|retry| {
                LoggerError::delivery(
                    self.address.clone(),
                    format!("{} (after reconnect: {})", first, retry),
                )
            }),
            Err(e) => Err(e),
        }
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut stream) = self.stream {
            stream.flush()?;
        }
        Ok(())
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        let _ = Transport::flush(self);
    }
}
