//! Unix socket client for the gcal daemon.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::net::UnixStream;
use tracing::{debug, warn};
use uuid::Uuid;

use gcal_protocol::{Envelope, Method, Request, Response, read_frame, write_frame};

use crate::error::{ClientError, ClientResult};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One connection per request, one frame each way.
pub struct SocketClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl SocketClient {
    pub fn new(socket_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub async fn send(&self, request: Request) -> ClientResult<Response> {
        let request_id = Uuid::new_v4().to_string();
        debug!(
            socket = %self.socket_path.display(),
            request_id = %request_id,
            method = %request.method,
            "sending request"
        );

        let mut stream = tokio::time::timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .map_err(|_| ClientError::Timeout("connecting to the daemon"))?
            .map_err(|source| ClientError::Connection {
                path: self.socket_path.clone(),
                source,
            })?;

        let envelope = Envelope::request(&request_id, request);
        tokio::time::timeout(self.timeout, write_frame(&mut stream, &envelope))
            .await
            .map_err(|_| ClientError::Timeout("sending the request"))??;

        let reply: Option<Envelope<Response>> =
            tokio::time::timeout(self.timeout, read_frame(&mut stream))
                .await
                .map_err(|_| ClientError::Timeout("waiting for the response"))??;
        let reply = reply.ok_or_else(|| {
            ClientError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "daemon closed the connection without responding",
            ))
        })?;

        if reply.request_id != request_id {
            warn!(
                expected = %request_id,
                received = %reply.request_id,
                "response request_id mismatch"
            );
        }
        Ok(reply.payload)
    }

    /// Whether a daemon answers `health` on the socket.
    pub async fn is_running(&self) -> bool {
        self.send(Request::for_method(Method::Health)).await.is_ok()
    }
}
