//! OAuth token records and their on-disk store.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

/// Tokens are treated as expired this long before Google says they are.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Already reduced by the expiry margin.
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub last_refresh: DateTime<Utc>,
}

fn expiry(now: DateTime<Utc>, expires_in_secs: Option<i64>) -> Option<DateTime<Utc>> {
    expires_in_secs.map(|secs| now + Duration::seconds(secs - EXPIRY_MARGIN_SECS))
}

impl TokenInfo {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expiry(now, expires_in_secs),
            scopes,
            last_refresh: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Tokens without an expiry never expire.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Applies a refresh result. Google may rotate the refresh token.
    pub fn apply_refresh(&mut self, refreshed: RefreshedToken) {
        let now = Utc::now();
        self.access_token = refreshed.access_token;
        self.expires_at = expiry(now, refreshed.expires_in_secs);
        if let Some(token) = refreshed.refresh_token {
            self.refresh_token = Some(token);
        }
        self.last_refresh = now;
    }
}

/// Outcome of a refresh-token grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_in_secs: Option<i64>,
    pub refresh_token: Option<String>,
}

/// JSON token file, written atomically with owner-only permissions.
#[derive(Debug, Clone)]
pub struct TokenStorage {
    path: PathBuf,
}

impl TokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when no token file exists yet.
    pub fn load(&self) -> ProviderResult<Option<TokenInfo>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no token file");
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            ProviderError::configuration(format!("failed to read token file: {e}")).with_source(e)
        })?;
        let tokens = serde_json::from_str(&content).map_err(|e| {
            ProviderError::configuration(format!("failed to parse token file: {e}"))
        })?;

        info!(path = %self.path.display(), "loaded tokens");
        Ok(Some(tokens))
    }

    pub fn save(&self, tokens: &TokenInfo) -> ProviderResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::configuration(format!("failed to create token directory: {e}"))
            })?;
        }

        let content = serde_json::to_string_pretty(tokens)
            .map_err(|e| ProviderError::internal(format!("failed to serialize tokens: {e}")))?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content).map_err(|e| {
            ProviderError::configuration(format!("failed to write token file: {e}"))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600)).map_err(|e| {
                ProviderError::configuration(format!("failed to restrict token file: {e}"))
            })?;
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            ProviderError::configuration(format!("failed to replace token file: {e}"))
        })?;

        debug!(path = %self.path.display(), "saved tokens");
        Ok(())
    }

    /// Removes the token file. Returns whether one existed.
    pub fn clear(&self) -> ProviderResult<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path).map_err(|e| {
            ProviderError::configuration(format!("failed to remove token file: {e}"))
        })?;
        info!(path = %self.path.display(), "cleared tokens");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TokenInfo {
        TokenInfo::new(
            "access-token",
            Some("refresh-token".to_string()),
            Some(3600),
            vec!["scope1".to_string()],
        )
    }

    #[test]
    fn expiry_includes_margin() {
        let token = sample();
        let expires_at = token.expires_at.unwrap();
        assert!(!token.is_expired());
        assert!(token.is_expired_at(expires_at));
        assert!(!token.is_expired_at(expires_at - Duration::seconds(1)));
        assert!(expires_at <= token.last_refresh + Duration::seconds(3540));
    }

    #[test]
    fn no_expiry_never_expires() {
        let token = TokenInfo::new("access", None, None, vec![]);
        assert!(!token.is_expired_at(Utc::now() + Duration::days(365)));
    }

    #[test]
    fn scope_check() {
        let token = sample();
        assert!(token.has_scopes(&["scope1".to_string()]));
        assert!(!token.has_scopes(&["scope1".to_string(), "scope2".to_string()]));
    }

    #[test]
    fn refresh_keeps_refresh_token_unless_rotated() {
        let mut token = sample();
        token.apply_refresh(RefreshedToken {
            access_token: "second".into(),
            expires_in_secs: Some(3600),
            refresh_token: None,
        });
        assert_eq!(token.access_token, "second");
        assert_eq!(token.refresh_token.as_deref(), Some("refresh-token"));

        token.apply_refresh(RefreshedToken {
            access_token: "third".into(),
            expires_in_secs: None,
            refresh_token: Some("rotated".into()),
        });
        assert_eq!(token.refresh_token.as_deref(), Some("rotated"));
        assert_eq!(token.expires_at, None);
    }

    #[test]
    fn storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = TokenStorage::new(dir.path().join("nested").join("google-token.json"));
        assert_eq!(storage.load().unwrap(), None);

        let tokens = sample();
        storage.save(&tokens).unwrap();
        assert_eq!(storage.load().unwrap(), Some(tokens));
        assert!(!storage.path().with_extension("json.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn storage_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let storage = TokenStorage::new(dir.path().join("google-token.json"));
        storage.save(&sample()).unwrap();
        let mode = fs::metadata(storage.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn storage_clear() {
        let dir = tempfile::tempdir().unwrap();
        let storage = TokenStorage::new(dir.path().join("google-token.json"));
        assert!(!storage.clear().unwrap());
        storage.save(&sample()).unwrap();
        assert!(storage.clear().unwrap());
        assert!(!storage.path().exists());
    }

    #[test]
    fn corrupt_file_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = TokenStorage::new(dir.path().join("google-token.json"));
        fs::write(storage.path(), "{").unwrap();
        let err = storage.load().unwrap_err();
        assert_eq!(err.code(), crate::error::ProviderErrorCode::ConfigurationError);
    }
}
