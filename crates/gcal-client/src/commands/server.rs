//! Server command: runs the daemon in the foreground.
//!
//! Wires the provider, [`CalendarService`], signal handling and the socket
//! server together, then serves until SIGTERM or SIGINT.

use std::sync::Arc;

use tracing::{info, warn};

use gcal_providers::{CalendarProvider, ErrorProvider, ProviderError};
use gcal_server::{
    CalendarService, RequestHandler, SignalHandler, SocketServer, make_connection_handler,
};

use crate::cli::Cli;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

pub async fn run(cli: &Cli, config: &ClientConfig) -> ClientResult<()> {
    let service = build_service(config)?;
    let health = service.health();
    if health.calendar_service.ok {
        info!(provider = %health.provider, "calendar service ready");
    } else {
        // Requests still get served; each one reports the provider failure.
        warn!(
            provider = %health.provider,
            reason = %health.calendar_service.message,
            "calendar service unavailable"
        );
    }
    let handler = Arc::new(RequestHandler::new(Arc::new(service)));

    let signal_handler = SignalHandler::new();
    signal_handler.spawn_listener()?;

    let server_config = config.server.to_server_config(cli.socket.as_deref())?;
    let server = SocketServer::new(server_config).await?;
    info!(path = %server.socket_path().display(), "server listening");

    server
        .run_until_shutdown(
            make_connection_handler(handler),
            signal_handler.shutdown().wait(),
        )
        .await?;

    info!("server stopped");
    Ok(())
}

/// The service every calendar command runs against, in-process or in the
/// daemon.
pub fn build_service(config: &ClientConfig) -> ClientResult<CalendarService> {
    let settings = config.availability.to_settings()?;
    Ok(CalendarService::new(build_provider(config)).with_settings(settings))
}

/// Builds the Google provider. A provider that cannot be built is replaced
/// by one that fails every call with the reason.
pub fn build_provider(config: &ClientConfig) -> Arc<dyn CalendarProvider> {
    match google_provider(config) {
        Ok(provider) => provider,
        Err(error) => {
            let error = match error {
                ClientError::Provider(error) => error,
                other => ProviderError::configuration(other.to_string()),
            };
            Arc::new(ErrorProvider::new("google", error))
        }
    }
}

#[cfg(feature = "google")]
fn google_provider(config: &ClientConfig) -> ClientResult<Arc<dyn CalendarProvider>> {
    use gcal_providers::google::GoogleProvider;

    let settings = config.google.as_ref().ok_or_else(|| {
        ClientError::config(format!(
            "no [google] section in {}; run `gcal auth google`",
            ClientConfig::default_path().display()
        ))
    })?;
    let provider = GoogleProvider::new(settings.to_provider_config()?)?;
    if !provider.is_authenticated() {
        warn!(provider = provider.name(), "no stored tokens; run `gcal auth google`");
    }
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "google"))]
fn google_provider(_config: &ClientConfig) -> ClientResult<Arc<dyn CalendarProvider>> {
    Err(ClientError::config("built without Google Calendar support"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_google_section_yields_failing_provider() {
        let service = build_service(&ClientConfig::default()).unwrap();
        let health = service.health();
        assert!(!health.calendar_service.ok);
        assert!(
            health.calendar_service.message.starts_with("Service not initialized:"),
            "{}",
            health.calendar_service.message
        );
        assert_eq!(health.provider, "google");
    }

    #[test]
    fn invalid_availability_is_a_config_error() {
        let mut config = ClientConfig::default();
        config.availability.working_days.clear();
        assert!(matches!(build_service(&config), Err(ClientError::Config(_))));
    }

    #[cfg(feature = "google")]
    #[test]
    fn configured_google_without_tokens_is_unauthenticated() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            google: Some(crate::config::GoogleSettings {
                client_id: Some("test.apps.googleusercontent.com".into()),
                client_secret: Some("secret".into()),
                token_path: Some(dir.path().join("token.json")),
                ..Default::default()
            }),
            ..Default::default()
        };
        let health = build_service(&config).unwrap().health();
        assert_eq!(health.provider, "google:primary");
        assert!(!health.calendar_service.ok);
        assert_eq!(
            health.calendar_service.message,
            "Not authenticated - run 'gcal auth google'"
        );
    }
}
