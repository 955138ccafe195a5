//! The shared Google credential session.
//!
//! A [`GoogleSession`] owns the current token set. Readers take the read
//! lock and get the access token straight away while it is fresh. When it
//! has expired, callers queue on the refresh gate; the first one through
//! refreshes and stores the result under the write lock, the rest re-check
//! and find a fresh token waiting for them.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::BoxFuture;

use super::tokens::{RefreshedToken, TokenInfo, TokenStorage};

const REAUTH_HINT: &str = "run 'gcal auth google'";

/// Exchanges a refresh token for a new access token.
pub trait TokenRefresher: Send + Sync {
    fn refresh<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, ProviderResult<RefreshedToken>>;
}

pub struct GoogleSession {
    storage: TokenStorage,
    refresher: Arc<dyn TokenRefresher>,
    tokens: RwLock<Option<TokenInfo>>,
    refresh_gate: Mutex<()>,
}

impl std::fmt::Debug for GoogleSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSession")
            .field("token_path", &self.storage.path())
            .finish_non_exhaustive()
    }
}

impl GoogleSession {
    /// Loads any stored tokens. A missing file is not an error; the session
    /// then fails each call with an authentication error until
    /// [`GoogleSession::store`] is called.
    pub fn open(storage: TokenStorage, refresher: Arc<dyn TokenRefresher>) -> ProviderResult<Self> {
        let tokens = storage.load()?;
        Ok(Self {
            storage,
            refresher,
            tokens: RwLock::new(tokens),
            refresh_gate: Mutex::new(()),
        })
    }

    /// Whether a token set is loaded. A refresh in progress counts.
    pub fn has_tokens(&self) -> bool {
        self.tokens.try_read().map(|t| t.is_some()).unwrap_or(true)
    }

    /// A currently valid access token, refreshing first if needed.
    pub async fn access_token(&self) -> ProviderResult<String> {
        if let Some(token) = self.fresh_token().await? {
            return Ok(token);
        }

        let _gate = self.refresh_gate.lock().await;
        // Someone else may have refreshed while we waited.
        if let Some(token) = self.fresh_token().await? {
            return Ok(token);
        }

        let refresh_token = {
            let tokens = self.tokens.read().await;
            tokens
                .as_ref()
                .and_then(|t| t.refresh_token.clone())
                .ok_or_else(|| {
                    ProviderError::authentication(format!(
                        "access token expired and no refresh token is stored - {REAUTH_HINT}"
                    ))
                })?
        };

        debug!("refreshing access token");
        let refreshed = self.refresher.refresh(&refresh_token).await?;

        let mut tokens = self.tokens.write().await;
        let current = tokens
            .as_mut()
            .ok_or_else(|| ProviderError::authentication(format!("not authenticated - {REAUTH_HINT}")))?;
        current.apply_refresh(refreshed);
        self.storage.save(current)?;
        info!("access token refreshed");
        Ok(current.access_token.clone())
    }

    /// `Ok(None)` when the stored token has expired.
    async fn fresh_token(&self) -> ProviderResult<Option<String>> {
        let tokens = self.tokens.read().await;
        match tokens.as_ref() {
            None => Err(ProviderError::authentication(format!(
                "not authenticated - {REAUTH_HINT}"
            ))),
            Some(t) if t.is_expired() => Ok(None),
            Some(t) => Ok(Some(t.access_token.clone())),
        }
    }

    /// Persists and adopts a new token set.
    pub async fn store(&self, tokens: TokenInfo) -> ProviderResult<()> {
        let _gate = self.refresh_gate.lock().await;
        self.storage.save(&tokens)?;
        *self.tokens.write().await = Some(tokens);
        Ok(())
    }

    /// Drops the token set from memory and disk.
    pub async fn clear(&self) -> ProviderResult<bool> {
        let _gate = self.refresh_gate.lock().await;
        *self.tokens.write().await = None;
        self.storage.clear()
    }

    pub async fn needs_reauth(&self, required_scopes: &[String]) -> bool {
        self.tokens
            .read()
            .await
            .as_ref()
            .is_none_or(|t| !t.has_scopes(required_scopes))
    }
}
