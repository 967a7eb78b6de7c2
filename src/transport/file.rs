//! File transports. `File` appends on write and tails the file on read;
//! `FileRewriter` truncates on open and rewinds its reader at end of file.

use std::path::Path;
use std::time::Duration;

use tokio::fs::OpenOptions;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::{classify_open_error, Chunk, TransportError, TransportPair, TransportReader, TransportWriter};

pub async fn open_append(path: &Path) -> Result<TransportPair, TransportError> {
    let writer = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .await
        .map_err(|e| classify_open_error(e, path))?;
    let reader = OpenOptions::new()
        .read(true)
        .open(path)
        .await
        .map_err(|e| classify_open_error(e, path))?;
    Ok(TransportPair {
        reader: TransportReader::File(reader),
        writer: TransportWriter::File(writer),
    })
}

pub async fn open_rewriter(path: &Path) -> Result<TransportPair, TransportError> {
    let writer = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .await
        .map_err(|e| classify_open_error(e, path))?;
    let reader = OpenOptions::new()
        .read(true)
        .open(path)
        .await
        .map_err(|e| classify_open_error(e, path))?;
    Ok(TransportPair {
        reader: TransportReader::FileRewriter(reader),
        writer: TransportWriter::FileRewriter(writer),
    })
}

/// Tail-style read: at end of file, back off briefly and return an empty
/// chunk so the reader loop keeps its liveness heartbeat. The rewriter
/// variant seeks back to the start instead of waiting for appends.
pub async fn read_tail(file: &mut tokio::fs::File, rewind_on_eof: bool) -> Result<Chunk, TransportError> {
    let mut buf = [0u8; super::READ_BUF_SIZE];
    let n = file.read(&mut buf).await?;
    if n == 0 {
        if rewind_on_eof {
            file.seek(std::io::SeekFrom::Start(0)).await?;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
        return Ok(Chunk::default());
    }
    Ok(Chunk { bytes: buf[..n].to_vec(), marks: None })
}
