//! Google Calendar provider configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ProviderError, ProviderResult};

/// OAuth 2.0 client credentials for an installed application.
///
/// Google requires every caller to register its own client, so these always
/// come from the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Shape of a `client_secret_*.json` download: nested under `installed` or
/// `web`, or flat.
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<ClientSection>,
    web: Option<ClientSection>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClientSection {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to read credentials file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> ProviderResult<Self> {
        let file: CredentialsFile = serde_json::from_str(json).map_err(|e| {
            ProviderError::configuration(format!("failed to parse credentials JSON: {e}"))
        })?;

        if let Some(section) = file.installed.or(file.web) {
            return Ok(Self::new(section.client_id, section.client_secret));
        }
        match (file.client_id, file.client_secret) {
            (Some(id), Some(secret)) => Ok(Self::new(id, secret)),
            _ => Err(ProviderError::configuration(
                "credentials must have an 'installed' or 'web' section, or top-level client_id and client_secret",
            )),
        }
    }

    pub fn validate(&self) -> ProviderResult<()> {
        if self.client_id.is_empty() {
            return Err(ProviderError::configuration("client_id is required"));
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err(ProviderError::configuration(
                "client_id should end with .apps.googleusercontent.com",
            ));
        }
        if self.client_secret.is_empty() {
            return Err(ProviderError::configuration("client_secret is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub credentials: OAuthCredentials,
    /// Calendar every operation targets.
    pub calendar_id: String,
    pub token_path: PathBuf,
    pub timeout: Duration,
    /// Ports tried, in order, for the OAuth loopback redirect.
    pub loopback_port_range: (u16, u16),
    pub scopes: Vec<String>,
    /// Calendar API root. Overridden only in tests.
    pub api_base: String,
}

impl GoogleConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_CALENDAR_ID: &'static str = "primary";
    /// Read and write access to calendars and events.
    pub const DEFAULT_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar";
    pub const API_BASE: &'static str = "https://www.googleapis.com/calendar/v3";

    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            calendar_id: Self::DEFAULT_CALENDAR_ID.to_string(),
            token_path: Self::default_token_path(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            loopback_port_range: (8080, 8090),
            scopes: vec![Self::DEFAULT_SCOPE.to_string()],
            api_base: Self::API_BASE.to_string(),
        }
    }

    /// `<data dir>/gcal/google-token.json`, e.g.
    /// `~/.local/share/gcal/google-token.json` on Linux.
    pub fn default_token_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gcal")
            .join("google-token.json")
    }

    /// e.g. `"google:primary"`.
    pub fn provider_name(&self) -> String {
        format!("google:{}", self.calendar_id)
    }

    #[must_use]
    pub fn with_calendar_id(mut self, id: impl Into<String>) -> Self {
        self.calendar_id = id.into();
        self
    }

    #[must_use]
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_loopback_port_range(mut self, start: u16, end: u16) -> Self {
        self.loopback_port_range = (start, end);
        self
    }

    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    pub fn validate(&self) -> ProviderResult<()> {
        self.credentials.validate()?;
        if self.calendar_id.is_empty() {
            return Err(ProviderError::configuration("calendar_id must not be empty"));
        }
        if self.scopes.is_empty() {
            return Err(ProviderError::configuration(
                "at least one OAuth scope is required",
            ));
        }
        if self.loopback_port_range.0 > self.loopback_port_range.1 {
            return Err(ProviderError::configuration("invalid loopback port range"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> OAuthCredentials {
        OAuthCredentials::new("test-client.apps.googleusercontent.com", "test-secret")
    }

    #[test]
    fn credentials_validation() {
        assert!(credentials().validate().is_ok());
        assert!(OAuthCredentials::new("", "secret").validate().is_err());
        assert!(OAuthCredentials::new("bad-id", "secret").validate().is_err());
        assert!(
            OAuthCredentials::new("x.apps.googleusercontent.com", "")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn defaults() {
        let config = GoogleConfig::new(credentials());
        assert_eq!(config.calendar_id, "primary");
        assert_eq!(config.provider_name(), "google:primary");
        assert_eq!(config.scopes, ["https://www.googleapis.com/auth/calendar"]);
        assert!(config.token_path.ends_with("gcal/google-token.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_configs() {
        let config = GoogleConfig::new(credentials()).with_calendar_id("");
        assert!(config.validate().is_err());

        let config = GoogleConfig::new(credentials()).with_loopback_port_range(9000, 8000);
        assert!(config.validate().is_err());
    }

    #[test]
    fn credentials_file_formats() {
        let installed = r#"{"installed": {"client_id": "a.apps.googleusercontent.com", "client_secret": "s", "project_id": "p"}}"#;
        let web = r#"{"web": {"client_id": "b.apps.googleusercontent.com", "client_secret": "s"}}"#;
        let flat = r#"{"client_id": "c.apps.googleusercontent.com", "client_secret": "s", "refresh_token": "r"}"#;

        assert_eq!(
            OAuthCredentials::from_json(installed).unwrap().client_id,
            "a.apps.googleusercontent.com"
        );
        assert_eq!(
            OAuthCredentials::from_json(web).unwrap().client_id,
            "b.apps.googleusercontent.com"
        );
        assert_eq!(
            OAuthCredentials::from_json(flat).unwrap().client_id,
            "c.apps.googleusercontent.com"
        );
    }

    #[test]
    fn credentials_file_errors() {
        let err = OAuthCredentials::from_json(r#"{"other": {}}"#).unwrap_err();
        assert!(err.message().contains("client_id"));

        let err = OAuthCredentials::from_json("not json").unwrap_err();
        assert!(err.message().contains("parse"));
    }

    #[test]
    fn credentials_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client_secret.json");
        std::fs::write(
            &path,
            r#"{"installed": {"client_id": "d.apps.googleusercontent.com", "client_secret": "s"}}"#,
        )
        .unwrap();
        assert_eq!(
            OAuthCredentials::from_file(&path).unwrap(),
            OAuthCredentials::new("d.apps.googleusercontent.com", "s")
        );
        assert!(OAuthCredentials::from_file(dir.path().join("missing.json")).is_err());
    }
}
