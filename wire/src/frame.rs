//! Length-prefixed message frames for the control plane.
//!
//! Every control RPC is one connection carrying one request frame and one
//! response frame: a u32 little-endian byte length followed by a JSON
//! payload.

use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use utilities::result::{DfsError, Result};

const MAX_FRAME_BYTES: u32 = 64 * 1024 * 1024;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a connection to a peer. An unreachable peer surfaces as a
/// transport error after at most [`CONNECT_TIMEOUT`] rather than
/// hanging the caller.
pub async fn connect(addr: &str) -> Result<TcpStream> {
    match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) => Err(DfsError::transport(format!("cannot reach {addr}: {e}"))),
        Err(_) => Err(DfsError::transport(format!(
            "connection to {addr} timed out after {}s",
            CONNECT_TIMEOUT.as_secs()
        ))),
    }
}

pub async fn write_frame(stream: &mut (impl AsyncWrite + Unpin), payload: &[u8]) -> Result<()> {
    if payload.len() > MAX_FRAME_BYTES as usize {
        return Err(DfsError::protocol(format!(
            "refusing to send frame of {} bytes",
            payload.len()
        )));
    }
    stream
        .write_u32_le(payload.len() as u32)
        .await
        .map_err(DfsError::transport)?;
    stream
        .write_all(payload)
        .await
        .map_err(DfsError::transport)?;
    stream.flush().await.map_err(DfsError::transport)?;
    Ok(())
}

pub async fn read_frame(stream: &mut (impl AsyncRead + Unpin)) -> Result<Vec<u8>> {
    let len = stream.read_u32_le().await.map_err(DfsError::transport)?;
    if len > MAX_FRAME_BYTES {
        return Err(DfsError::protocol(format!(
            "frame length {len} exceeds the limit"
        )));
    }
    let mut payload = vec![0u8; len as usize];
    stream
        .read_exact(&mut payload)
        .await
        .map_err(DfsError::transport)?;
    Ok(payload)
}

pub async fn send<T: Serialize>(stream: &mut (impl AsyncWrite + Unpin), message: &T) -> Result<()> {
    let payload = serde_json::to_vec(message)?;
    write_frame(stream, &payload).await
}

pub async fn recv<T: DeserializeOwned>(stream: &mut (impl AsyncRead + Unpin)) -> Result<T> {
    let payload = read_frame(stream).await?;
    Ok(serde_json::from_slice(&payload)?)
}

/// One request/response round trip on a fresh connection.
pub async fn call<Req, Resp>(addr: &str, request: &Req) -> Result<Resp>
where
    Req: Serialize,
    Resp: DeserializeOwned,
{
    let mut stream = connect(addr).await?;
    send(&mut stream, request).await?;
    recv(&mut stream).await
}
