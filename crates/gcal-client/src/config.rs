//! Client configuration.
//!
//! Everything lives in one `config.toml`, by default at
//! `~/.config/gcal/config.toml`:
//!
//! ```toml
//! [google]
//! client_id = "env::GCAL_CLIENT_ID"
//! client_secret = "pass::google/gcal"
//!
//! [server]
//! max_connections = 50
//!
//! [availability]
//! start_hour = 8
//! end_hour = 16
//! working_days = ["mon", "tue", "wed", "thu"]
//! utc_offset = "+02:00"
//! ```
//!
//! `client_id` and `client_secret` accept the references described in
//! [`crate::secret`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Duration as ChronoDuration, FixedOffset, Weekday};
use serde::{Deserialize, Serialize};

use gcal_core::WorkingHoursPolicy;
use gcal_core::availability::{DEFAULT_MAX_RESULTS, DEFAULT_STEP_MINUTES};
use gcal_server::{
    AvailabilitySettings, DEFAULT_CONNECTION_TIMEOUT, DEFAULT_MAX_CONNECTIONS, ServerConfig,
    default_socket_path,
};

use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    #[cfg(feature = "google")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google: Option<GoogleSettings>,

    pub server: ServerSettings,

    pub availability: AvailabilityConfig,
}

impl ClientConfig {
    /// Loads the default file, or defaults when it does not exist.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&content)
            .map_err(|e| ClientError::config(format!("failed to parse {}: {e}", path.display())))
    }

    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gcal")
    }

    /// Checks every section without contacting Google.
    pub fn validate(&self) -> ClientResult<()> {
        self.server.to_server_config(None)?;
        self.availability.to_settings()?;
        #[cfg(feature = "google")]
        if let Some(ref google) = self.google {
            google.to_provider_config()?;
        }
        Ok(())
    }
}

/// The `[google]` section.
#[cfg(feature = "google")]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub calendar_id: Option<String>,
    pub token_path: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

#[cfg(feature = "google")]
impl GoogleSettings {
    /// Resolves credentials and builds the provider configuration.
    pub fn to_provider_config(&self) -> ClientResult<gcal_providers::google::GoogleConfig> {
        use gcal_providers::google::GoogleConfig;

        let credentials = self.resolve_credentials()?;
        credentials.validate()?;
        Ok(self.apply(GoogleConfig::new(credentials)))
    }

    /// Applies everything but the credentials.
    pub(crate) fn apply(
        &self,
        mut config: gcal_providers::google::GoogleConfig,
    ) -> gcal_providers::google::GoogleConfig {
        if let Some(ref id) = self.calendar_id {
            config = config.with_calendar_id(id);
        }
        if let Some(ref path) = self.token_path {
            config = config.with_token_path(path);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        config
    }

    pub fn token_path(&self) -> PathBuf {
        self.token_path
            .clone()
            .unwrap_or_else(gcal_providers::google::GoogleConfig::default_token_path)
    }

    pub(crate) fn resolve_credentials(
        &self,
    ) -> ClientResult<gcal_providers::google::OAuthCredentials> {
        use gcal_providers::google::OAuthCredentials;

        let raw_id = self.client_id.as_deref().ok_or_else(|| {
            ClientError::config(format!(
                "Google credentials not found. Add to {}:\n  \
                 [google]\n  \
                 client_id = \"YOUR_ID.apps.googleusercontent.com\"\n  \
                 client_secret = \"YOUR_SECRET\"\n\n  \
                 Or run: gcal auth google --credentials-file <path>",
                ClientConfig::default_path().display()
            ))
        })?;
        let raw_secret = self
            .client_secret
            .as_deref()
            .ok_or_else(|| ClientError::config("client_secret is missing from [google]"))?;

        Ok(OAuthCredentials::new(
            crate::secret::resolve(raw_id)?,
            crate::secret::resolve(raw_secret)?,
        ))
    }
}

/// The `[server]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub socket_path: Option<PathBuf>,
    pub connection_timeout_secs: u64,
    pub max_connections: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            socket_path: None,
            connection_timeout_secs: DEFAULT_CONNECTION_TIMEOUT.as_secs(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl ServerSettings {
    /// `cli_socket` wins over the file, which wins over the default path.
    pub fn socket_path(&self, cli_socket: Option<&Path>) -> PathBuf {
        cli_socket
            .map(Path::to_path_buf)
            .or_else(|| self.socket_path.clone())
            .unwrap_or_else(default_socket_path)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    pub fn to_server_config(&self, cli_socket: Option<&Path>) -> ClientResult<ServerConfig> {
        if self.connection_timeout_secs == 0 {
            return Err(ClientError::config("[server] connection_timeout_secs must be positive"));
        }
        if self.max_connections == 0 {
            return Err(ClientError::config("[server] max_connections must be positive"));
        }
        Ok(ServerConfig::new(self.socket_path(cli_socket))
            .with_connection_timeout(self.connection_timeout())
            .with_max_connections(self.max_connections))
    }
}

/// The `[availability]` section: the working calendar for free-slot search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailabilityConfig {
    pub start_hour: u32,
    pub end_hour: u32,
    /// Weekday names, e.g. `"mon"` or `"Friday"`.
    pub working_days: Vec<String>,
    /// `"+HH:MM"`, `"-HH:MM"` or `"Z"`.
    pub utc_offset: String,
    pub step_minutes: i64,
    pub max_results: usize,
}

impl Default for AvailabilityConfig {
    fn default() -> Self {
        let policy = WorkingHoursPolicy::default();
        Self {
            start_hour: policy.start_hour,
            end_hour: policy.end_hour,
            working_days: ["mon", "tue", "wed", "thu", "fri"]
                .into_iter()
                .map(String::from)
                .collect(),
            utc_offset: "+00:00".to_string(),
            step_minutes: DEFAULT_STEP_MINUTES,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl AvailabilityConfig {
    pub fn to_settings(&self) -> ClientResult<AvailabilitySettings> {
        let weekdays = self
            .working_days
            .iter()
            .map(|day| {
                day.parse::<Weekday>().map_err(|_| {
                    ClientError::config(format!("[availability] unknown weekday `{day}`"))
                })
            })
            .collect::<ClientResult<Vec<_>>>()?;

        let policy = WorkingHoursPolicy::default()
            .with_hours(self.start_hour, self.end_hour)
            .with_weekdays(weekdays)
            .with_offset(parse_offset(&self.utc_offset)?);
        policy
            .validate()
            .map_err(|e| ClientError::config(format!("[availability] {e}")))?;

        if self.step_minutes <= 0 {
            return Err(ClientError::config("[availability] step_minutes must be positive"));
        }
        let step = ChronoDuration::try_minutes(self.step_minutes)
            .ok_or_else(|| ClientError::config("[availability] step_minutes is too large"))?;

        Ok(AvailabilitySettings {
            policy,
            step,
            max_results: self.max_results,
        })
    }
}

fn parse_offset(raw: &str) -> ClientResult<FixedOffset> {
    let invalid = || ClientError::config(format!("[availability] invalid utc_offset `{raw}`"));

    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }
    let (sign, rest) = match raw.as_bytes().first() {
        Some(b'+') => (1, &raw[1..]),
        Some(b'-') => (-1, &raw[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 => rest.split_at(2),
        None => (rest, "0"),
    };
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(config, ClientConfig::default());

        let settings = config.availability.to_settings().unwrap();
        assert_eq!(settings, AvailabilitySettings::default());
    }

    #[test]
    fn availability_section() {
        let config: ClientConfig = toml::from_str(
            r#"
[availability]
start_hour = 8
end_hour = 16
working_days = ["Mon", "tuesday", "wed"]
utc_offset = "-05:30"
step_minutes = 30
max_results = 5
"#,
        )
        .unwrap();
        let settings = config.availability.to_settings().unwrap();
        assert_eq!(settings.policy.start_hour, 8);
        assert_eq!(settings.policy.end_hour, 16);
        assert_eq!(
            settings.policy.working_weekdays,
            vec![Weekday::Mon, Weekday::Tue, Weekday::Wed]
        );
        assert_eq!(settings.policy.utc_offset.local_minus_utc(), -(5 * 3600 + 30 * 60));
        assert_eq!(settings.step, ChronoDuration::minutes(30));
        assert_eq!(settings.max_results, 5);
    }

    #[test]
    fn rejects_bad_availability() {
        let cases = [
            AvailabilityConfig {
                start_hour: 17,
                end_hour: 9,
                ..Default::default()
            },
            AvailabilityConfig {
                working_days: vec!["someday".into()],
                ..Default::default()
            },
            AvailabilityConfig {
                working_days: vec![],
                ..Default::default()
            },
            AvailabilityConfig {
                utc_offset: "CET".into(),
                ..Default::default()
            },
            AvailabilityConfig {
                step_minutes: 0,
                ..Default::default()
            },
        ];
        for case in cases {
            assert!(
                matches!(case.to_settings(), Err(ClientError::Config(_))),
                "{case:?}"
            );
        }
    }

    #[test]
    fn offsets() {
        assert_eq!(parse_offset("Z").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_offset("+02:00").unwrap().local_minus_utc(), 7200);
        assert_eq!(parse_offset("+0530").unwrap().local_minus_utc(), 19800);
        assert_eq!(parse_offset("-3").unwrap().local_minus_utc(), -10800);
        assert!(parse_offset("+24:00").is_err());
        assert!(parse_offset("02:00").is_err());
    }

    #[test]
    fn socket_path_precedence() {
        let mut server = ServerSettings::default();
        assert_eq!(server.socket_path(None), default_socket_path());

        server.socket_path = Some(PathBuf::from("/tmp/from-file.sock"));
        assert_eq!(server.socket_path(None), PathBuf::from("/tmp/from-file.sock"));
        assert_eq!(
            server.socket_path(Some(Path::new("/tmp/from-cli.sock"))),
            PathBuf::from("/tmp/from-cli.sock")
        );
    }

    #[test]
    fn server_section() {
        let config: ClientConfig =
            toml::from_str("[server]\nconnection_timeout_secs = 5\nmax_connections = 0\n").unwrap();
        assert_eq!(config.server.connection_timeout(), Duration::from_secs(5));
        assert!(config.server.to_server_config(None).is_err());
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\n").unwrap();
        let err = ClientConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));

        assert!(ClientConfig::load_from(&dir.path().join("missing.toml")).is_err());
    }

    #[cfg(feature = "google")]
    mod google {
        use super::*;

        #[test]
        fn inline_credentials() {
            let config: ClientConfig = toml::from_str(
                r#"
[google]
client_id = "test-id.apps.googleusercontent.com"
client_secret = "test-secret"
calendar_id = "team@example.com"
timeout_secs = 10
"#,
            )
            .unwrap();
            let provider = config.google.unwrap().to_provider_config().unwrap();
            assert_eq!(provider.credentials.client_id, "test-id.apps.googleusercontent.com");
            assert_eq!(provider.credentials.client_secret, "test-secret");
            assert_eq!(provider.calendar_id, "team@example.com");
            assert_eq!(provider.timeout, Duration::from_secs(10));
        }

        #[test]
        fn env_references() {
            unsafe {
                std::env::set_var("_GCAL_CFG_ID", "env-id.apps.googleusercontent.com");
                std::env::set_var("_GCAL_CFG_SECRET", "env-secret");
            }
            let settings = GoogleSettings {
                client_id: Some("env::_GCAL_CFG_ID".into()),
                client_secret: Some("env::_GCAL_CFG_SECRET".into()),
                ..Default::default()
            };
            let creds = settings.resolve_credentials().unwrap();
            assert_eq!(creds.client_id, "env-id.apps.googleusercontent.com");
            assert_eq!(creds.client_secret, "env-secret");
            unsafe {
                std::env::remove_var("_GCAL_CFG_ID");
                std::env::remove_var("_GCAL_CFG_SECRET");
            }
        }

        #[test]
        fn missing_credentials() {
            let err = GoogleSettings::default().resolve_credentials().unwrap_err();
            assert!(err.to_string().contains("credentials not found"));

            let err = GoogleSettings {
                client_id: Some("id.apps.googleusercontent.com".into()),
                ..Default::default()
            }
            .resolve_credentials()
            .unwrap_err();
            assert!(err.to_string().contains("client_secret"));
        }

        #[test]
        fn token_path_override() {
            let settings = GoogleSettings {
                token_path: Some(PathBuf::from("/tmp/token.json")),
                ..Default::default()
            };
            assert_eq!(settings.token_path(), PathBuf::from("/tmp/token.json"));
        }
    }
}
