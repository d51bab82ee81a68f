//! IPC (Inter-Process Communication) via Unix sockets
//!
//! The host and `mura-deck ctl` talk to the daemon one request at a time.
//! Uses length-prefixed JSON over Unix domain sockets.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};

mod messages;
pub use messages::{Request, Response};

use crate::constants::config;

/// Maximum message size (10 MB) to prevent DoS via memory exhaustion
const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Get default socket path (XDG_RUNTIME_DIR with fallback to cache)
pub fn default_socket_path() -> Result<PathBuf> {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return Ok(PathBuf::from(runtime_dir)
            .join(config::APP_DIR)
            .join(config::SOCKET_NAME));
    }

    // Fallback to cache dir
    let cache = dirs::cache_dir()
        .context("Failed to determine cache directory (no XDG_RUNTIME_DIR or HOME)")?;
    Ok(cache.join(config::APP_DIR).join(config::SOCKET_NAME))
}

/// Client connection to the daemon
pub struct IpcClient {
    stream: UnixStream,
}

impl IpcClient {
    pub async fn connect_to(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path)
            .await
            .with_context(|| format!("Failed to connect to daemon at {}", path.display()))?;
        Ok(Self { stream })
    }

    /// Send request and wait for response
    pub async fn request(&mut self, req: &Request) -> Result<Response> {
        write_message(&mut self.stream, req).await?;
        read_message(&mut self.stream)
            .await?
            .context("Daemon closed the connection without responding")
    }
}

/// One accepted host connection
pub struct Connection {
    stream: UnixStream,
}

impl Connection {
    /// Next request, or `None` once the peer hangs up
    pub async fn recv_request(&mut self) -> Result<Option<Request>> {
        read_message(&mut self.stream).await
    }

    pub async fn send_response(&mut self, resp: &Response) -> Result<()> {
        write_message(&mut self.stream, resp).await
    }
}

/// Server listener for the daemon
pub struct IpcServer {
    listener: UnixListener,
    socket_path: PathBuf,
}

impl IpcServer {
    /// Create server and bind to specific socket path
    pub fn bind_to(socket_path: PathBuf) -> Result<Self> {
        // Create directory if needed
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {}", parent.display()))?;
        }

        // Remove stale socket if exists
        if socket_path.exists() {
            std::fs::remove_file(&socket_path)
                .with_context(|| format!("Failed to remove stale socket: {}", socket_path.display()))?;
        }

        let listener = UnixListener::bind(&socket_path)
            .with_context(|| format!("Failed to bind socket at {}", socket_path.display()))?;

        // Set permissions to 0700 (owner only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o700))
                .context("Failed to set socket permissions")?;
        }

        Ok(Self {
            listener,
            socket_path,
        })
    }

    pub async fn accept(&self) -> Result<Connection> {
        let (stream, _addr) = self
            .listener
            .accept()
            .await
            .context("Failed to accept IPC connection")?;
        Ok(Connection { stream })
    }

    pub fn path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        // Clean up socket file
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

/// Write length-prefixed message to stream
async fn write_message<T: Serialize>(stream: &mut UnixStream, msg: &T) -> Result<()> {
    let json = serde_json::to_vec(msg).context("Failed to serialize message to JSON")?;

    // Write length prefix (u32 little-endian)
    let len = json.len() as u32;
    stream
        .write_all(&len.to_le_bytes())
        .await
        .context("Failed to write message length")?;

    // Write JSON payload
    stream
        .write_all(&json)
        .await
        .context("Failed to write message payload")?;

    stream.flush().await.context("Failed to flush stream")?;

    Ok(())
}

/// Read length-prefixed message from stream. `None` on a clean hang-up
/// between messages.
async fn read_message<T: for<'de> Deserialize<'de>>(stream: &mut UnixStream) -> Result<Option<T>> {
    // Read length prefix
    let mut len_buf = [0u8; 4];
    match stream.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e).context("Failed to read message length"),
    }
    let len = u32::from_le_bytes(len_buf) as usize;

    // Sanity check (prevent DoS via huge allocation)
    if len > MAX_MESSAGE_SIZE {
        return Err(anyhow!("Message too large: {} bytes (max: {})", len, MAX_MESSAGE_SIZE));
    }

    // Read JSON payload
    let mut json_buf = vec![0u8; len];
    stream
        .read_exact(&mut json_buf)
        .await
        .context("Failed to read message payload")?;

    // Deserialize
    serde_json::from_slice(&json_buf)
        .map(Some)
        .context("Failed to deserialize message from JSON")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_request_response_over_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run/daemon.sock");
        let server = IpcServer::bind_to(path.clone()).unwrap();

        let serve = async {
            let mut conn = server.accept().await.unwrap();
            let req = conn.recv_request().await.unwrap();
            assert_eq!(req, Some(Request::Brightness { percent: 55 }));
            conn.send_response(&Response::Ok).await.unwrap();
            // client hung up
            assert_eq!(conn.recv_request().await.unwrap(), None);
        };
        let client = async {
            let mut client = IpcClient::connect_to(&path).await.unwrap();
            let resp = client.request(&Request::Brightness { percent: 55 }).await.unwrap();
            assert_eq!(resp, Response::Ok);
        };
        tokio::join!(serve, client);
    }

    #[tokio::test]
    async fn test_stale_socket_replaced_and_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daemon.sock");
        std::fs::write(&path, b"stale").unwrap();

        let server = IpcServer::bind_to(path.clone()).unwrap();
        assert_eq!(server.path(), path.as_path());
        drop(server);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let (mut a, mut b) = UnixStream::pair().unwrap();
        let len = (MAX_MESSAGE_SIZE as u32) + 1;
        a.write_all(&len.to_le_bytes()).await.unwrap();
        let result: Result<Option<Request>> = read_message(&mut b).await;
        assert!(result.is_err());
    }
}
