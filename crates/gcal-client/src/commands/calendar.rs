//! Calendar commands: one request, answered in-process or by the daemon.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use gcal_protocol::{Request, Response};
use gcal_server::RequestHandler;

use crate::cli::Cli;
use crate::commands::server::build_service;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::socket::SocketClient;

/// Where a calendar request is answered.
pub enum Target {
    InProcess(RequestHandler),
    Daemon(SocketClient),
}

impl Target {
    /// `--daemon` selects the socket; otherwise the service is built here.
    pub fn from_cli(cli: &Cli, config: &ClientConfig) -> ClientResult<Self> {
        if cli.daemon {
            Ok(Self::Daemon(SocketClient::new(
                config.server.socket_path(cli.socket.as_deref()),
                config.server.connection_timeout(),
            )))
        } else {
            let service = build_service(config)?;
            Ok(Self::InProcess(RequestHandler::new(Arc::new(service))))
        }
    }

    pub async fn call(&self, request: Request) -> ClientResult<Value> {
        let response: Response = match self {
            Self::InProcess(handler) => handler.handle(&request).await,
            Self::Daemon(client) => client.send(request).await?,
        };
        debug!(success = response.is_success(), "request answered");
        response.into_result().map_err(ClientError::Remote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use gcal_protocol::{ErrorCode, Method, param};
    use gcal_providers::InMemoryProvider;
    use gcal_server::CalendarService;

    fn in_process() -> Target {
        let service = CalendarService::new(Arc::new(InMemoryProvider::new()));
        Target::InProcess(RequestHandler::new(Arc::new(service)))
    }

    #[tokio::test]
    async fn create_then_get_in_process() {
        let target = in_process();
        let created = target
            .call(
                Request::for_method(Method::Create)
                    .with_param(param::SUMMARY, "Planning")
                    .with_param(param::START, "2026-03-02T10:00:00Z")
                    .with_param(param::END, "2026-03-02T11:00:00Z"),
            )
            .await
            .unwrap();
        assert_eq!(created["created"], true);

        let event_id = created["event_id"].as_str().unwrap().to_string();
        let event = target
            .call(Request::for_method(Method::Get).with_param(param::EVENT_ID, event_id.as_str()))
            .await
            .unwrap();
        assert_eq!(event["summary"], "Planning");
    }

    #[tokio::test]
    async fn error_responses_become_remote_errors() {
        let err = in_process()
            .call(Request::for_method(Method::Search))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::MissingParameter));
    }

    #[tokio::test]
    async fn daemon_target_without_daemon() {
        let dir = tempfile::tempdir().unwrap();
        let target = Target::Daemon(SocketClient::new(
            dir.path().join("absent.sock"),
            Duration::from_secs(1),
        ));
        let err = target.call(Request::for_method(Method::Health)).await.unwrap_err();
        assert!(matches!(err, ClientError::Connection { .. }));
    }
}
