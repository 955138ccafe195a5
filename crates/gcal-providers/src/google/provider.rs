//! [`CalendarProvider`] for Google Calendar.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, CalendarProvider, ListQuery, SendUpdates};
use crate::raw_event::RawEvent;

use super::client::GoogleCalendarClient;
use super::config::GoogleConfig;
use super::oauth::OAuthClient;
use super::session::GoogleSession;
use super::tokens::TokenStorage;

/// Every call fetches a valid access token from the shared
/// [`GoogleSession`], then makes exactly one API request.
pub struct GoogleProvider {
    config: GoogleConfig,
    name: String,
    client: GoogleCalendarClient,
    oauth: Arc<OAuthClient>,
    session: Arc<GoogleSession>,
}

impl GoogleProvider {
    /// Builds the provider and loads stored tokens. Does not start the
    /// browser flow; see [`GoogleProvider::authenticate`].
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        config.validate()?;

        let name = config.provider_name();
        let oauth = Arc::new(OAuthClient::new(config.credentials.clone(), config.timeout)?);
        let session = Arc::new(GoogleSession::open(
            TokenStorage::new(&config.token_path),
            oauth.clone(),
        )?);
        let client = GoogleCalendarClient::new(&config.api_base, &config.calendar_id, config.timeout)?;

        Ok(Self {
            config,
            name,
            client,
            oauth,
            session,
        })
    }

    pub fn session(&self) -> &Arc<GoogleSession> {
        &self.session
    }

    /// Runs the OAuth browser flow and stores the resulting tokens.
    pub async fn authenticate(&self) -> ProviderResult<()> {
        info!(provider = %self.name, "starting Google authorization");
        let tokens = self
            .oauth
            .authorize(&self.config.scopes, self.config.loopback_port_range)
            .await
            .map_err(|e| self.tag(e))?;
        self.session.store(tokens).await?;
        info!(provider = %self.name, "authorization stored");
        Ok(())
    }

    /// Whether stored tokens are missing or lack the configured scopes.
    pub async fn needs_reauth(&self) -> bool {
        self.session.needs_reauth(&self.config.scopes).await
    }

    fn tag(&self, error: ProviderError) -> ProviderError {
        match error.provider() {
            Some(_) => error,
            None => error.with_provider(&self.name),
        }
    }

    async fn token(&self) -> ProviderResult<String> {
        self.session.access_token().await.map_err(|e| self.tag(e))
    }
}

impl CalendarProvider for GoogleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(provider = %self.name))]
    fn list_events(&self, query: ListQuery) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>> {
        Box::pin(async move {
            let token = self.token().await?;
            self.client
                .list_events(&token, &query)
                .await
                .map_err(|e| self.tag(e))
        })
    }

    fn get_event<'a>(&'a self, event_id: &'a str) -> BoxFuture<'a, ProviderResult<RawEvent>> {
        Box::pin(async move {
            let token = self.token().await?;
            self.client
                .get_event(&token, event_id)
                .await
                .map_err(|e| self.tag(e))
        })
    }

    fn insert_event<'a>(
        &'a self,
        event: &'a RawEvent,
        send_updates: SendUpdates,
    ) -> BoxFuture<'a, ProviderResult<RawEvent>> {
        Box::pin(async move {
            let token = self.token().await?;
            self.client
                .insert_event(&token, event, send_updates)
                .await
                .map_err(|e| self.tag(e))
        })
    }

    fn update_event<'a>(
        &'a self,
        event_id: &'a str,
        event: &'a RawEvent,
    ) -> BoxFuture<'a, ProviderResult<RawEvent>> {
        Box::pin(async move {
            let token = self.token().await?;
            self.client
                .update_event(&token, event_id, event)
                .await
                .map_err(|e| self.tag(e))
        })
    }

    fn delete_event<'a>(&'a self, event_id: &'a str) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let token = self.token().await?;
            self.client
                .delete_event(&token, event_id)
                .await
                .map_err(|e| self.tag(e))
        })
    }

    fn quick_add<'a>(&'a self, text: &'a str) -> BoxFuture<'a, ProviderResult<RawEvent>> {
        Box::pin(async move {
            let token = self.token().await?;
            self.client
                .quick_add(&token, text)
                .await
                .map_err(|e| self.tag(e))
        })
    }

    fn is_authenticated(&self) -> bool {
        self.session.has_tokens()
    }
}
