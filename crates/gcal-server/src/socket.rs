//! Unix socket listener for IPC.
//!
//! Each accepted connection holds a semaphore permit for its lifetime, so
//! at most `max_connections` are served at once. Reads and writes are bound
//! by the configured connection timeout.

use std::path::Path;
use std::sync::Arc;

use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info, warn};

use gcal_protocol::{Envelope, ProtocolError, Request, Response, read_frame, write_frame};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

pub struct SocketServer {
    config: ServerConfig,
    listener: UnixListener,
    connection_semaphore: Arc<Semaphore>,
}

impl SocketServer {
    /// Binds the socket, creating its directory when missing.
    ///
    /// A live socket at the path is an error. A dead one is removed first
    /// when `cleanup_stale_socket` is set.
    pub async fn new(config: ServerConfig) -> ServerResult<Self> {
        let socket_path = &config.socket_path;

        if let Some(parent) = socket_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.is_dir()
        {
            std::fs::create_dir_all(parent)
                .map_err(|_| ServerError::socket_path_invalid(parent.display().to_string()))?;
            restrict(parent, 0o700)?;
        }

        if socket_path.exists() {
            if UnixStream::connect(socket_path).await.is_ok() || !config.cleanup_stale_socket {
                return Err(ServerError::socket_in_use(socket_path.display().to_string()));
            }
            info!(path = %socket_path.display(), "removing stale socket");
            std::fs::remove_file(socket_path)?;
        }

        let listener = UnixListener::bind(socket_path)?;
        restrict(socket_path, 0o600)?;
        info!(path = %socket_path.display(), "socket server listening");

        let connection_semaphore = Arc::new(Semaphore::new(config.max_connections));
        Ok(Self {
            config,
            listener,
            connection_semaphore,
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.config.socket_path
    }

    /// Waits for a connection slot, then for a client.
    pub async fn accept(&self) -> ServerResult<Connection> {
        let permit = self
            .connection_semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ServerError::Shutdown)?;

        let (stream, _addr) = self.listener.accept().await?;
        debug!(
            available = self.connection_semaphore.available_permits(),
            "accepted connection"
        );

        Ok(Connection {
            stream,
            timeout: self.config.connection_timeout,
            _permit: permit,
        })
    }

    /// Accepts connections forever, spawning `handler` for each.
    pub async fn run<F, Fut>(&self, handler: F) -> ServerResult<()>
    where
        F: Fn(Connection) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        loop {
            match self.accept().await {
                Ok(connection) => {
                    tokio::spawn(handler(connection));
                }
                Err(ServerError::Shutdown) => return Err(ServerError::Shutdown),
                Err(e) => error!(error = %e, "failed to accept connection"),
            }
        }
    }

    /// Like [`SocketServer::run`], returning once `shutdown` completes.
    pub async fn run_until_shutdown<F, Fut, S>(&self, handler: F, shutdown: S) -> ServerResult<()>
    where
        F: Fn(Connection) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
        S: std::future::Future<Output = ()> + Send,
    {
        tokio::select! {
            result = self.run(handler) => result,
            _ = shutdown => {
                info!("shutdown signal received");
                self.connection_semaphore.close();
                Ok(())
            }
        }
    }
}

impl Drop for SocketServer {
    fn drop(&mut self) {
        let path = &self.config.socket_path;
        if !path.exists() {
            return;
        }
        match std::fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "removed socket file"),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove socket file"),
        }
    }
}

#[cfg(unix)]
fn restrict(path: &Path, mode: u32) -> ServerResult<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict(_path: &Path, _mode: u32) -> ServerResult<()> {
    Ok(())
}

/// A client connection to the server.
pub struct Connection {
    stream: UnixStream,
    timeout: std::time::Duration,
    _permit: OwnedSemaphorePermit,
}

impl Connection {
    /// Reads a request envelope from the connection.
    ///
    /// Returns `Ok(None)` if the connection was closed cleanly.
    pub async fn read_request(&mut self) -> ServerResult<Option<Envelope<Request>>> {
        match tokio::time::timeout(self.timeout, read_frame(&mut self.stream)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ProtocolError::Timeout {
                operation: "read request",
            }
            .into()),
        }
    }

    pub async fn write_response(&mut self, envelope: &Envelope<Response>) -> ServerResult<()> {
        match tokio::time::timeout(self.timeout, write_frame(&mut self.stream, envelope)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ProtocolError::Timeout {
                operation: "write response",
            }
            .into()),
        }
    }

    /// Sends a response for the given request.
    pub async fn respond(
        &mut self,
        request_id: impl Into<String>,
        response: Response,
    ) -> ServerResult<()> {
        let envelope = Envelope::response(request_id, response);
        self.write_response(&envelope).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use gcal_protocol::{ErrorCode, Method};
    use gcal_providers::InMemoryProvider;
    use tempfile::tempdir;
    use tokio::io::AsyncWriteExt;

    use crate::handler::{RequestHandler, make_connection_handler};
    use crate::service::CalendarService;

    fn handler() -> Arc<RequestHandler> {
        let service = CalendarService::new(Arc::new(InMemoryProvider::new()))
            .with_clock(Arc::new(|| Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()));
        Arc::new(RequestHandler::new(Arc::new(service)))
    }

    #[tokio::test]
    async fn socket_server_creates_socket_file() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("run").join("daemon.sock");

        let server = SocketServer::new(ServerConfig::new(&socket_path)).await.unwrap();
        assert!(socket_path.exists());
        assert_eq!(server.socket_path(), socket_path);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&socket_path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        drop(server);
        assert!(!socket_path.exists());
    }

    #[tokio::test]
    async fn socket_server_rejects_live_socket() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("daemon.sock");

        let config = ServerConfig::new(&socket_path);
        let _server = SocketServer::new(config.clone()).await.unwrap();

        let result = SocketServer::new(config).await;
        assert!(matches!(result, Err(ServerError::SocketInUse { .. })));
    }

    #[tokio::test]
    async fn socket_server_cleans_stale_socket() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("daemon.sock");
        std::fs::write(&socket_path, b"stale").unwrap();

        let kept = ServerConfig::new(&socket_path).with_cleanup_stale_socket(false);
        assert!(matches!(
            SocketServer::new(kept).await,
            Err(ServerError::SocketInUse { .. })
        ));

        let server = SocketServer::new(ServerConfig::new(&socket_path)).await.unwrap();
        assert!(socket_path.exists());
        drop(server);
    }

    #[tokio::test]
    async fn socket_dir_under_a_file_is_invalid() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"").unwrap();

        let result = SocketServer::new(ServerConfig::new(file.join("daemon.sock"))).await;
        assert!(matches!(result, Err(ServerError::SocketPathInvalid { .. })));
    }

    #[tokio::test]
    async fn serves_requests_over_the_socket() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("daemon.sock");
        let config = ServerConfig::new(&socket_path).with_connection_timeout(Duration::from_secs(5));
        let server = SocketServer::new(config).await.unwrap();

        let client_path = socket_path.clone();
        let client = tokio::spawn(async move {
            let mut stream = UnixStream::connect(&client_path).await.unwrap();

            let request = Envelope::request("req-1", Request::for_method(Method::Health));
            write_frame(&mut stream, &request).await.unwrap();
            let reply: Envelope<Response> = read_frame(&mut stream).await.unwrap().unwrap();
            assert_eq!(reply.request_id, "req-1");
            assert!(reply.payload.is_success());

            let request = Envelope::request("req-2", Request::new("calendar.nope"));
            write_frame(&mut stream, &request).await.unwrap();
            let reply: Envelope<Response> = read_frame(&mut stream).await.unwrap().unwrap();
            assert_eq!(reply.request_id, "req-2");
            assert_eq!(reply.payload.as_error().unwrap().code, ErrorCode::UnknownMethod);
        });

        let conn = server.accept().await.unwrap();
        handler().handle_connection(conn).await.unwrap();
        client.await.unwrap();
    }

    #[tokio::test]
    async fn malformed_frame_gets_an_error_reply() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("daemon.sock");
        let server = SocketServer::new(ServerConfig::new(&socket_path)).await.unwrap();

        let client_path = socket_path.clone();
        let client = tokio::spawn(async move {
            let mut stream = UnixStream::connect(&client_path).await.unwrap();
            let garbage = b"{not json";
            stream
                .write_all(&(garbage.len() as u32).to_be_bytes())
                .await
                .unwrap();
            stream.write_all(garbage).await.unwrap();

            let reply: Envelope<Response> = read_frame(&mut stream).await.unwrap().unwrap();
            assert_eq!(reply.request_id, "");
            assert_eq!(reply.payload.as_error().unwrap().code, ErrorCode::InvalidRequest);

            let old = Envelope {
                protocol_version: "0".to_string(),
                ..Envelope::request("req-3", Request::for_method(Method::Methods))
            };
            write_frame(&mut stream, &old).await.unwrap();
            let reply: Envelope<Response> = read_frame(&mut stream).await.unwrap().unwrap();
            assert_eq!(reply.request_id, "req-3");
            assert_eq!(reply.payload.as_error().unwrap().code, ErrorCode::InvalidRequest);
        });

        let conn = server.accept().await.unwrap();
        handler().handle_connection(conn).await.unwrap();
        client.await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_stops_the_accept_loop() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("daemon.sock");
        let server = SocketServer::new(ServerConfig::new(&socket_path)).await.unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(1),
            server.run_until_shutdown(make_connection_handler(handler()), async {}),
        )
        .await
        .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn idle_connection_times_out() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("daemon.sock");
        let config =
            ServerConfig::new(&socket_path).with_connection_timeout(Duration::from_millis(50));
        let server = SocketServer::new(config).await.unwrap();

        let _client = UnixStream::connect(&socket_path).await.unwrap();
        let mut conn = server.accept().await.unwrap();
        let err = conn.read_request().await.unwrap_err();
        assert!(matches!(
            err,
            ServerError::Protocol(ProtocolError::Timeout { .. })
        ));
    }
}
