//! TCP server transport: accepts any number of clients, merges their bytes
//! into one inbound stream and broadcasts writes to all of them. A client
//! that cannot take a write within the timeout is disconnected rather than
//! back-pressuring the bus.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{TransportError, READ_BUF_SIZE};

const CHANNEL_DEPTH: usize = 64;
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ServerHandles {
    pub inbound: mpsc::Receiver<Vec<u8>>,
    pub outbound: mpsc::Sender<Vec<u8>>,
}

pub async fn spawn_server(port: u16, cancel: CancellationToken) -> Result<ServerHandles, TransportError> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!("TCP server listening on port {port}");

    let (inbound_tx, inbound_rx) = mpsc::channel(CHANNEL_DEPTH);
    let (outbound_tx, outbound_rx) = mpsc::channel(CHANNEL_DEPTH);
    tokio::spawn(serve(listener, inbound_tx, outbound_rx, cancel));

    Ok(ServerHandles { inbound: inbound_rx, outbound: outbound_tx })
}

async fn serve(
    listener: TcpListener,
    inbound: mpsc::Sender<Vec<u8>>,
    mut outbound: mpsc::Receiver<Vec<u8>>,
    cancel: CancellationToken,
) {
    let mut clients: Vec<(SocketAddr, OwnedWriteHalf)> = Vec::new();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, addr)) => {
                        info!("client {addr} connected");
                        let (read_half, write_half) = stream.into_split();
                        clients.push((addr, write_half));
                        tokio::spawn(client_reader(read_half, addr, inbound.clone(), cancel.clone()));
                    }
                    Err(e) => {
                        warn!("accept failed: {e}");
                    }
                }
            }
            chunk = outbound.recv() => {
                let Some(bytes) = chunk else { break };
                broadcast(&mut clients, &bytes).await;
            }
        }
    }
}

/// Writes one chunk to every client, dropping the ones that fail or stall.
async fn broadcast(clients: &mut Vec<(SocketAddr, OwnedWriteHalf)>, bytes: &[u8]) {
    let mut keep = Vec::with_capacity(clients.len());
    for (addr, mut half) in clients.drain(..) {
        match tokio::time::timeout(WRITE_TIMEOUT, half.write_all(bytes)).await {
            Ok(Ok(())) => keep.push((addr, half)),
            Ok(Err(e)) => warn!("client {addr} write failed, dropping: {e}"),
            Err(_) => warn!("client {addr} stalled for {WRITE_TIMEOUT:?}, dropping"),
        }
    }
    *clients = keep;
}

async fn client_reader(
    mut read_half: tokio::net::tcp::OwnedReadHalf,
    addr: SocketAddr,
    inbound: mpsc::Sender<Vec<u8>>,
    cancel: CancellationToken,
) {
    let mut buf = [0u8; READ_BUF_SIZE];
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            read = read_half.read(&mut buf) => {
                match read {
                    Ok(0) => {
                        debug!("client {addr} closed connection");
                        break;
                    }
                    Ok(n) => {
                        if inbound.send(buf[..n].to_vec()).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("client {addr} read failed: {e}");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn test_server_merges_reads_and_broadcasts_writes() {
        let cancel = CancellationToken::new();
        // Port 0 lets the OS choose; rebind through a probe first.
        let probe = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);

        let mut handles = spawn_server(port, cancel.clone()).await.unwrap();

        let mut client_a = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let mut client_b = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        client_a.write_all(b"$IIMTW,21.5,C*15\r\n").await.unwrap();
        let merged = handles.inbound.recv().await.unwrap();
        assert_eq!(&merged, b"$IIMTW,21.5,C*15\r\n");

        handles.outbound.send(b"$IIDBT,10.0,f,3.0,M,1.7,F*25\r\n".to_vec()).await.unwrap();
        let mut buf = [0u8; 64];
        let n = client_a.read(&mut buf).await.unwrap();
        assert!(n > 0);
        let n = client_b.read(&mut buf).await.unwrap();
        assert!(n > 0);

        cancel.cancel();
    }
}
