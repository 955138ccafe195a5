//! Authentication commands.

use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tracing::info;

use gcal_providers::CalendarProvider;
use gcal_providers::google::{GoogleConfig, GoogleProvider, OAuthCredentials, TokenStorage};

use crate::config::{ClientConfig, GoogleSettings};
use crate::error::{ClientError, ClientResult};

/// Where the client credentials came from.
#[derive(Debug, PartialEq)]
enum CredentialSource {
    /// `--client-id`/`--client-secret` or `--credentials-file`.
    Cli,
    /// Already in `config.toml`.
    Config,
}

/// Runs the OAuth installed-app flow and stores the tokens.
///
/// Credentials given on the command line are written into `[google]` of
/// `config_path` so the daemon finds them later.
pub async fn google(
    client_id: Option<String>,
    client_secret: Option<String>,
    credentials_file: Option<PathBuf>,
    force: bool,
    config: &ClientConfig,
    config_path: &Path,
) -> ClientResult<Value> {
    let (id, secret, source) = resolve_google_credentials(
        client_id,
        client_secret,
        credentials_file,
        config.google.as_ref(),
    )?;

    let credentials = OAuthCredentials::new(&id, &secret);
    credentials
        .validate()
        .map_err(|e| ClientError::config(format!("invalid Google credentials: {e}")))?;

    let settings = config.google.clone().unwrap_or_default();
    let google_config = settings.apply(GoogleConfig::new(credentials));
    let token_path = google_config.token_path.clone();
    let provider = GoogleProvider::new(google_config)?;

    if source == CredentialSource::Cli {
        save_credentials(config_path, &id, &secret)?;
    }

    if !force && !provider.needs_reauth().await {
        return Ok(json!({
            "authenticated": true,
            "already_authenticated": true,
            "provider": provider.name(),
            "token_path": token_path,
        }));
    }

    eprintln!("Starting Google Calendar authorization.");
    eprintln!("A browser window will open; if it does not, open the URL printed below.");
    provider.authenticate().await?;
    info!(provider = provider.name(), "Google authentication successful");

    Ok(json!({
        "authenticated": true,
        "already_authenticated": false,
        "provider": provider.name(),
        "token_path": token_path,
    }))
}

/// Reports stored tokens without contacting Google.
pub fn status(config: &ClientConfig) -> ClientResult<Value> {
    let storage = TokenStorage::new(token_path(config));
    let tokens = storage.load()?;
    let required = [GoogleConfig::DEFAULT_SCOPE.to_string()];

    Ok(json!({
        "token_path": storage.path(),
        "tokens_stored": tokens.is_some(),
        "can_refresh": tokens.as_ref().is_some_and(|t| t.refresh_token.is_some()),
        "access_token_expired": tokens.as_ref().map(|t| t.is_expired()),
        "has_required_scopes": tokens.as_ref().is_some_and(|t| t.has_scopes(&required)),
    }))
}

pub fn logout(config: &ClientConfig) -> ClientResult<Value> {
    let storage = TokenStorage::new(token_path(config));
    let removed = storage.clear()?;
    Ok(json!({
        "logged_out": removed,
        "token_path": storage.path(),
    }))
}

fn token_path(config: &ClientConfig) -> PathBuf {
    config
        .google
        .as_ref()
        .map(GoogleSettings::token_path)
        .unwrap_or_else(GoogleConfig::default_token_path)
}

/// Writes the credentials into `[google]`, keeping the rest of the file
/// as it was.
fn save_credentials(config_path: &Path, client_id: &str, client_secret: &str) -> ClientResult<()> {
    let content = if config_path.exists() {
        std::fs::read_to_string(config_path)?
    } else {
        String::new()
    };

    let mut doc = content.parse::<toml_edit::DocumentMut>().map_err(|e| {
        ClientError::config(format!("failed to parse {}: {e}", config_path.display()))
    })?;

    if !doc.contains_key("google") {
        doc["google"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    let google = doc["google"].as_table_mut().ok_or_else(|| {
        ClientError::config(format!("`google` in {} is not a table", config_path.display()))
    })?;
    google["client_id"] = toml_edit::value(client_id);
    google["client_secret"] = toml_edit::value(client_secret);

    if let Some(parent) = config_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(config_path, doc.to_string())?;
    info!(path = %config_path.display(), "saved Google credentials");
    Ok(())
}

/// Priority: `--client-id` with `--client-secret`, then
/// `--credentials-file`, then `[google]` in `config.toml`.
fn resolve_google_credentials(
    cli_client_id: Option<String>,
    cli_client_secret: Option<String>,
    cli_credentials_file: Option<PathBuf>,
    config_google: Option<&GoogleSettings>,
) -> ClientResult<(String, String, CredentialSource)> {
    if let (Some(id), Some(secret)) = (&cli_client_id, &cli_client_secret) {
        return Ok((id.clone(), secret.clone(), CredentialSource::Cli));
    }

    if let Some(ref path) = cli_credentials_file {
        let creds = OAuthCredentials::from_file(path).map_err(|e| {
            ClientError::config(format!(
                "failed to load credentials from {}: {e}",
                path.display()
            ))
        })?;
        return Ok((creds.client_id, creds.client_secret, CredentialSource::Cli));
    }

    if cli_client_id.is_some() || cli_client_secret.is_some() {
        return Err(ClientError::config(
            "both --client-id and --client-secret are required when providing credentials directly",
        ));
    }

    if let Some(google) = config_google
        && google.client_id.is_some()
        && google.client_secret.is_some()
    {
        let creds = google.resolve_credentials()?;
        return Ok((creds.client_id, creds.client_secret, CredentialSource::Config));
    }

    Err(ClientError::config(format!(
        "Google credentials are required. Provide via:\n  \
         - client_id + client_secret in {}\n  \
         - --client-id and --client-secret flags\n  \
         - --credentials-file flag (path to Google Cloud Console JSON)\n  \
         - GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET env vars",
        ClientConfig::default_path().display()
    )))
}
