//! OAuth 2.0 authorization code flow with PKCE for installed apps.
//!
//! 1. Generate a code verifier and its SHA-256 challenge.
//! 2. Bind a loopback listener and send the user's browser to Google.
//! 3. Read the `code` and `state` from the redirect.
//! 4. Exchange the code (with the verifier) for tokens.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::BoxFuture;

use super::config::OAuthCredentials;
use super::session::TokenRefresher;
use super::tokens::{RefreshedToken, TokenInfo};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Bytes of entropy in the code verifier, before encoding.
const CODE_VERIFIER_LENGTH: usize = 32;

const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

const SUCCESS_PAGE: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
    <html><body><h1>gcal is authorized</h1><p>You can close this window.</p></body></html>";
const FAILURE_PAGE: &str = "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
    <html><body><h1>Authorization failed</h1><p>You can close this window.</p></body></html>";

#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    http_client: reqwest::Client,
    token_url: String,
}

impl OAuthClient {
    pub fn new(credentials: OAuthCredentials, timeout: Duration) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            credentials,
            http_client,
            token_url: GOOGLE_TOKEN_URL.to_string(),
        })
    }

    #[must_use]
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Runs the interactive browser flow and returns fresh tokens.
    pub async fn authorize(
        &self,
        scopes: &[String],
        port_range: (u16, u16),
    ) -> ProviderResult<TokenInfo> {
        let pkce = PkceFlow::new();
        let (listener, port) = bind_loopback(port_range).await?;
        let redirect_uri = format!("http://127.0.0.1:{port}/callback");
        let auth_url = pkce.auth_url(&self.credentials.client_id, &redirect_uri, scopes);

        info!(port, "starting OAuth flow");
        debug!(url = %auth_url, "authorization URL");
        if let Err(e) = open::that(&auth_url) {
            warn!(error = %e, "failed to open browser");
            eprintln!("\nOpen this URL in your browser:\n\n{auth_url}\n");
        }

        let callback = tokio::time::timeout(CALLBACK_TIMEOUT, wait_for_callback(&listener))
            .await
            .map_err(|_| ProviderError::authentication("timed out waiting for the OAuth redirect"))??;

        if callback.state != pkce.state {
            return Err(ProviderError::authentication("OAuth state mismatch"));
        }

        info!("received authorization code");
        self.exchange_code(&callback.code, &pkce.verifier, &redirect_uri, scopes)
            .await
    }

    /// Trades a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> ProviderResult<RefreshedToken> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let response = self.post_token(&params, "token refresh").await?;
        info!("refreshed access token");
        Ok(RefreshedToken {
            access_token: response.access_token,
            expires_in_secs: response.expires_in,
            refresh_token: response.refresh_token,
        })
    }

    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> ProviderResult<TokenInfo> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];
        let response = self.post_token(&params, "token exchange").await?;
        info!("obtained tokens");

        let granted = response
            .scope
            .map(|s| s.split_whitespace().map(String::from).collect())
            .unwrap_or_else(|| scopes.to_vec());
        Ok(TokenInfo::new(
            response.access_token,
            response.refresh_token,
            response.expires_in,
            granted,
        ))
    }

    async fn post_token(
        &self,
        params: &[(&str, &str)],
        what: &str,
    ) -> ProviderResult<TokenResponse> {
        let response = self
            .http_client
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| ProviderError::network(format!("{what} request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read {what} response: {e}")))?;

        if !status.is_success() {
            return Err(ProviderError::authentication(format!(
                "{what} failed ({status}): {body}"
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| ProviderError::invalid_response(format!("invalid {what} response: {e}")))
    }
}

impl TokenRefresher for OAuthClient {
    fn refresh<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, ProviderResult<RefreshedToken>> {
        Box::pin(OAuthClient::refresh(self, refresh_token))
    }
}

async fn bind_loopback(port_range: (u16, u16)) -> ProviderResult<(TcpListener, u16)> {
    for port in port_range.0..=port_range.1 {
        if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)).await {
            debug!(port, "bound loopback listener");
            return Ok((listener, port));
        }
    }
    Err(ProviderError::configuration(format!(
        "no available port in range {}-{}",
        port_range.0, port_range.1
    )))
}

#[derive(Debug, PartialEq, Eq)]
struct Callback {
    code: String,
    state: String,
}

async fn wait_for_callback(listener: &TcpListener) -> ProviderResult<Callback> {
    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .map_err(|e| ProviderError::internal(format!("failed to accept redirect: {e}")))?;
        debug!(%peer, "redirect connection");
        if let Some(result) = handle_callback(stream).await {
            return result;
        }
    }
}

/// Answers one browser request. `None` for requests that are not the
/// redirect (favicon and the like).
async fn handle_callback(mut stream: TcpStream) -> Option<ProviderResult<Callback>> {
    let mut request_line = String::new();
    BufReader::new(&mut stream)
        .read_line(&mut request_line)
        .await
        .ok()?;

    let result = parse_callback(&request_line)?;
    let page = if result.is_ok() { SUCCESS_PAGE } else { FAILURE_PAGE };
    if let Err(e) = stream.write_all(page.as_bytes()).await {
        debug!(error = %e, "failed to answer the browser");
    }
    let _ = stream.shutdown().await;
    Some(result)
}

/// Parses `GET /callback?code=..&state=.. HTTP/1.1`.
fn parse_callback(request_line: &str) -> Option<ProviderResult<Callback>> {
    let mut parts = request_line.split_whitespace();
    if parts.next()? != "GET" {
        return None;
    }
    let target = parts.next()?;
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    if path != "/callback" {
        return None;
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = urlencoding::decode(value)
            .map(|v| v.into_owned())
            .unwrap_or_default();
        match key {
            "code" => code = Some(value),
            "state" => state = Some(value),
            "error" => error = Some(value),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Some(Err(ProviderError::authentication(format!(
            "authorization denied: {error}"
        ))));
    }
    Some(match code {
        Some(code) => Ok(Callback {
            code,
            state: state.unwrap_or_default(),
        }),
        None => Err(ProviderError::authentication(
            "missing authorization code in redirect",
        )),
    })
}

/// RFC 7636 verifier, challenge and CSRF state.
#[derive(Debug)]
pub struct PkceFlow {
    pub verifier: String,
    pub challenge: String,
    pub state: String,
}

impl PkceFlow {
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_LENGTH);
        let challenge = Self::challenge_for(&verifier);
        Self {
            verifier,
            challenge,
            state: random_token(16),
        }
    }

    fn challenge_for(verifier: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
    }

    pub fn auth_url(&self, client_id: &str, redirect_uri: &str, scopes: &[String]) -> String {
        format!(
            "{GOOGLE_AUTH_URL}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
            code_challenge={}&code_challenge_method=S256&state={}&\
            access_type=offline&prompt=consent",
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scopes.join(" ")),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(bytes)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
}
