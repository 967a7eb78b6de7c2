//! Transports: raw byte (and, for the Seatalk serial port, parity bit) I/O
//! over TCP, serial lines, files and standard output.
//!
//! `open` hands back a reader/writer pair so the device's two loops can
//! progress independently. Each pair is exclusively owned by its device
//! task; dropping both halves closes the transport on every error and
//! cancellation path.

pub mod file;
pub mod serial;
pub mod tcp;

use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::IoSpec;

pub const READ_BUF_SIZE: usize = 512;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport closed")]
    Closed,
    #[error("write timed out")]
    Timeout,
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("not supported on this platform: {0}")]
    Unsupported(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One chunk of received bytes. `marks` carries the 9th (parity) bit per
/// byte and is only present on the Seatalk serial transport.
#[derive(Debug, Default)]
pub struct Chunk {
    pub bytes: Vec<u8>,
    pub marks: Option<Vec<bool>>,
}

pub struct TransportPair {
    pub reader: TransportReader,
    pub writer: TransportWriter,
}

/// Opens a transport. The cancellation token scopes the background tasks a
/// TCP server needs; all other variants need none.
pub async fn open(spec: &IoSpec, cancel: &CancellationToken) -> Result<TransportPair, TransportError> {
    match spec {
        IoSpec::TCPServer { port } => {
            let handles = tcp::spawn_server(*port, cancel.child_token()).await?;
            Ok(TransportPair {
                reader: TransportReader::TcpServer(handles.inbound),
                writer: TransportWriter::TcpServer(handles.outbound),
            })
        }
        IoSpec::TCPClient { host, port } => {
            let stream = TcpStream::connect((host.as_str(), *port)).await?;
            let (read_half, write_half) = stream.into_split();
            Ok(TransportPair {
                reader: TransportReader::TcpClient(read_half),
                writer: TransportWriter::TcpClient(write_half),
            })
        }
        IoSpec::File { path } => file::open_append(path).await,
        IoSpec::FileRewriter { path } => file::open_rewriter(path).await,
        IoSpec::Serial { port, baudrate } => serial::open_plain(port, *baudrate),
        IoSpec::SeatalkSerial { port } => serial::open_seatalk(port),
        IoSpec::StdOutPrinter {} => Ok(TransportPair {
            reader: TransportReader::Null,
            writer: TransportWriter::StdOut(tokio::io::stdout()),
        }),
        IoSpec::IO {} => Ok(TransportPair {
            reader: TransportReader::Null,
            writer: TransportWriter::Null,
        }),
    }
}

pub enum TransportReader {
    TcpClient(tokio::net::tcp::OwnedReadHalf),
    /// The ordered merge of every connected client's bytes.
    TcpServer(mpsc::Receiver<Vec<u8>>),
    Serial(tokio::io::ReadHalf<tokio_serial::SerialStream>),
    #[cfg(target_os = "linux")]
    SeatalkSerial(serial::ParityReader),
    File(tokio::fs::File),
    FileRewriter(tokio::fs::File),
    /// Write-only and observer-only transports: never yields bytes.
    Null,
}

impl TransportReader {
    /// Reads the next chunk. An `Ok` chunk may be empty (file tail reads);
    /// end-of-stream on connection-oriented transports is `Closed`.
    pub async fn read(&mut self) -> Result<Chunk, TransportError> {
        match self {
            TransportReader::TcpClient(half) => {
                let mut buf = [0u8; READ_BUF_SIZE];
                let n = half.read(&mut buf).await?;
                if n == 0 {
                    return Err(TransportError::Closed);
                }
                Ok(Chunk { bytes: buf[..n].to_vec(), marks: None })
            }
            TransportReader::TcpServer(inbound) => match inbound.recv().await {
                Some(bytes) => Ok(Chunk { bytes, marks: None }),
                None => Err(TransportError::Closed),
            },
            TransportReader::Serial(half) => {
                let mut buf = [0u8; READ_BUF_SIZE];
                let n = half.read(&mut buf).await?;
                if n == 0 {
                    // Zero-length serial reads mean the port went away.
                    return Err(TransportError::Closed);
                }
                Ok(Chunk { bytes: buf[..n].to_vec(), marks: None })
            }
            #[cfg(target_os = "linux")]
            TransportReader::SeatalkSerial(reader) => reader.read().await,
            TransportReader::File(handle) => file::read_tail(handle, false).await,
            TransportReader::FileRewriter(handle) => file::read_tail(handle, true).await,
            TransportReader::Null => std::future::pending().await,
        }
    }
}

pub enum TransportWriter {
    TcpClient(tokio::net::tcp::OwnedWriteHalf),
    /// Broadcasts to every connected client.
    TcpServer(mpsc::Sender<Vec<u8>>),
    Serial(tokio::io::WriteHalf<tokio_serial::SerialStream>),
    #[cfg(target_os = "linux")]
    SeatalkSerial(serial::ParityWriter),
    File(tokio::fs::File),
    FileRewriter(tokio::fs::File),
    StdOut(tokio::io::Stdout),
    Null,
}

impl TransportWriter {
    /// Whether this transport can put the 9th bit on the wire.
    pub fn supports_parity(&self) -> bool {
        #[cfg(target_os = "linux")]
        if matches!(self, TransportWriter::SeatalkSerial(_)) {
            return true;
        }
        false
    }

    /// Writes one unit (a sentence or a datagram). `marks` requests mark
    /// parity per byte; only the Seatalk serial writer honours it, callers
    /// warn once when it is dropped.
    pub async fn write(&mut self, bytes: &[u8], marks: Option<&[bool]>) -> Result<usize, TransportError> {
        match self {
            TransportWriter::TcpClient(half) => {
                half.write_all(bytes).await?;
                Ok(bytes.len())
            }
            TransportWriter::TcpServer(outbound) => {
                outbound
                    .send(bytes.to_vec())
                    .await
                    .map_err(|_| TransportError::Closed)?;
                Ok(bytes.len())
            }
            TransportWriter::Serial(half) => {
                half.write_all(bytes).await?;
                Ok(bytes.len())
            }
            #[cfg(target_os = "linux")]
            TransportWriter::SeatalkSerial(writer) => writer.write(bytes, marks).await,
            TransportWriter::File(handle) | TransportWriter::FileRewriter(handle) => {
                handle.write_all(bytes).await?;
                Ok(bytes.len())
            }
            TransportWriter::StdOut(out) => {
                out.write_all(bytes).await?;
                Ok(bytes.len())
            }
            TransportWriter::Null => Ok(bytes.len()),
        }
    }

    pub async fn flush(&mut self) -> Result<(), TransportError> {
        match self {
            TransportWriter::TcpClient(half) => Ok(half.flush().await?),
            TransportWriter::TcpServer(_) => Ok(()),
            TransportWriter::Serial(half) => Ok(half.flush().await?),
            #[cfg(target_os = "linux")]
            TransportWriter::SeatalkSerial(_) => Ok(()),
            TransportWriter::File(handle) | TransportWriter::FileRewriter(handle) => {
                Ok(handle.flush().await?)
            }
            TransportWriter::StdOut(out) => Ok(out.flush().await?),
            TransportWriter::Null => Ok(()),
        }
    }
}

/// Reconnection backoff: 1 s initial, doubling to a 30 s cap, reset on a
/// successful open.
pub struct Backoff {
    current: Duration,
    initial: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new() -> Self {
        Self {
            current: Duration::from_secs(1),
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps an open error onto the taxonomy: permission problems are reported
/// as such so privileged features can fail without retry storms.
pub fn classify_open_error(err: std::io::Error, what: &Path) -> TransportError {
    if err.kind() == std::io::ErrorKind::PermissionDenied {
        TransportError::PermissionDenied(what.display().to_string())
    } else {
        TransportError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut backoff = Backoff::new();
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
        assert_eq!(backoff.next_delay(), Duration::from_secs(4));
        for _ in 0..10 {
            backoff.next_delay();
        }
        assert_eq!(backoff.next_delay(), Duration::from_secs(30));
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }
}
