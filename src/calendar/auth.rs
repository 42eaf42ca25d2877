//! Access tokens for Microsoft Graph
//!
//! [`OAuthTokenProvider`] runs the authorization-code flow with PKCE
//! against the Microsoft identity platform and keeps the token in a JSON
//! file. The first run is interactive: the user opens the consent URL and
//! pastes back the URL the browser was redirected to.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use oauth2::basic::BasicClient;
use oauth2::url::Url;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::CalendarConfig;
use crate::{MorningBotError, Result};

const SCOPES: [&str; 3] = ["offline_access", "Calendars.Read", "User.Read"];

/// Seconds before expiry at which a stored token is treated as stale
const EXPIRY_SKEW_SECS: i64 = 300;

pub const CONSENT_MESSAGE: &str = "Visit the following url to give consent:";
pub const PASTE_MESSAGE: &str = "Paste the authenticated url here:";
pub const SUCCESS_MESSAGE: &str =
    "Authentication Flow Completed. Oauth Access Token Stored. You can now use the API.";
pub const FAILURE_MESSAGE: &str = "Something go wrong. Please try again.";

/// Outcome of asking for an access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenState {
    Authenticated(String),
    /// The user has not granted consent yet
    NeedsConsent { consent_url: String },
    /// The flow ran and failed; rerunning starts it over
    Failed(String),
}

impl TokenState {
    /// Bearer token, or an `Auth` error describing why there is none
    pub fn into_access_token(self) -> Result<String> {
        match self {
            Self::Authenticated(token) => Ok(token),
            Self::NeedsConsent { consent_url } => Err(MorningBotError::auth(format!(
                "calendar access has not been granted yet, visit {consent_url}"
            ))),
            Self::Failed(reason) => Err(MorningBotError::auth(format!(
                "calendar authentication failed: {reason}"
            ))),
        }
    }
}

#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<TokenState>;
}

/// Hands out a pre-issued access token
pub struct StaticTokenProvider {
    state: TokenState,
}

impl StaticTokenProvider {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            state: TokenState::Authenticated(access_token.into()),
        }
    }

    pub fn with_state(state: TokenState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self) -> Result<TokenState> {
        Ok(self.state.clone())
    }
}

/// Token as persisted between runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix seconds
    pub expiry: i64,
}

impl StoredToken {
    pub fn is_fresh(&self, now: i64) -> bool {
        self.expiry > now + EXPIRY_SKEW_SECS
    }

    fn from_response<T: TokenResponse<oauth2::basic::BasicTokenType>>(
        response: &T,
        previous_refresh: Option<&str>,
    ) -> Self {
        let expires_in = response
            .expires_in()
            .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX / 2))
            .unwrap_or(3600);
        Self {
            access_token: response.access_token().secret().clone(),
            refresh_token: response
                .refresh_token()
                .map(|t| t.secret().clone())
                .or_else(|| previous_refresh.map(str::to_string)),
            expiry: Utc::now().timestamp() + expires_in,
        }
    }
}

/// JSON file holding a [`StoredToken`]
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when no token has been stored yet
    pub fn load(&self) -> Result<Option<StoredToken>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, token: &StoredToken) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(token)?)?;
        debug!("Stored OAuth token at {}", self.path.display());
        Ok(())
    }
}

/// Interaction with the person granting consent
pub trait ConsentPrompt: Send + Sync {
    /// Show `consent_url` and return whatever URL the user pastes back
    fn request_redirect(&self, consent_url: &str) -> Result<String>;

    fn notify(&self, message: &str);
}

/// Terminal prompt on stderr/stdin, keeping stdout for the briefing
pub struct StdinPrompt;

impl ConsentPrompt for StdinPrompt {
    fn request_redirect(&self, consent_url: &str) -> Result<String> {
        let mut stderr = io::stderr().lock();
        writeln!(stderr, "{CONSENT_MESSAGE}")?;
        writeln!(stderr, "{consent_url}")?;
        write!(stderr, "{PASTE_MESSAGE} ")?;
        stderr.flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line)
    }

    fn notify(&self, message: &str) {
        eprintln!("{message}");
    }
}

/// Authorization-code flow with PKCE and a file-backed token
pub struct OAuthTokenProvider {
    client: BasicClient,
    store: TokenStore,
    prompt: Box<dyn ConsentPrompt>,
}

impl OAuthTokenProvider {
    pub fn new(config: &CalendarConfig, prompt: Box<dyn ConsentPrompt>) -> Result<Self> {
        let client_id = config.require_client_id()?;
        let authority = format!(
            "{}/{}/oauth2/v2.0",
            config.authority_url.trim_end_matches('/'),
            config.tenant
        );

        let auth_url = AuthUrl::new(format!("{authority}/authorize"))
            .map_err(|e| MorningBotError::config(format!("Invalid authorize URL: {e}")))?;
        let token_url = TokenUrl::new(format!("{authority}/token"))
            .map_err(|e| MorningBotError::config(format!("Invalid token URL: {e}")))?;
        let redirect_url = RedirectUrl::new(config.redirect_url.clone())
            .map_err(|e| MorningBotError::config(format!("Invalid calendar.redirect_url: {e}")))?;

        let client = BasicClient::new(
            ClientId::new(client_id.to_string()),
            config
                .client_secret
                .as_ref()
                .filter(|s| !s.is_empty())
                .map(|s| ClientSecret::new(s.clone())),
            auth_url,
            Some(token_url),
        )
        .set_redirect_uri(redirect_url);

        Ok(Self {
            client,
            store: TokenStore::new(config.token_path()?),
            prompt,
        })
    }

    /// Consent URL with a fresh CSRF token and PKCE challenge
    fn authorization_url(&self) -> (Url, CsrfToken, PkceCodeVerifier) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (url, csrf_token) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(SCOPES.iter().map(|s| Scope::new((*s).to_string())))
            .set_pkce_challenge(pkce_challenge)
            .url();
        (url, csrf_token, pkce_verifier)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<StoredToken> {
        let response = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(oauth2::reqwest::async_http_client)
            .await
            .map_err(|e| MorningBotError::auth(format!("Failed to refresh token: {e}")))?;
        Ok(StoredToken::from_response(&response, Some(refresh_token)))
    }

    async fn exchange_code(&self, code: String, verifier: PkceCodeVerifier) -> Result<StoredToken> {
        let response = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(verifier)
            .request_async(oauth2::reqwest::async_http_client)
            .await
            .map_err(|e| MorningBotError::auth(format!("Failed to exchange code for token: {e}")))?;
        Ok(StoredToken::from_response(&response, None))
    }

    async fn consent_flow(&self) -> Result<TokenState> {
        let (url, csrf_token, verifier) = self.authorization_url();
        let pasted = self.prompt.request_redirect(url.as_str())?;
        let pasted = pasted.trim();
        if pasted.is_empty() {
            info!("No redirect URL provided, calendar consent still pending");
            return Ok(TokenState::NeedsConsent {
                consent_url: url.to_string(),
            });
        }

        let outcome = match authorization_code(pasted, csrf_token.secret()) {
            Ok(code) => self.exchange_code(code, verifier).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(token) => {
                self.store.save(&token)?;
                self.prompt.notify(SUCCESS_MESSAGE);
                info!("Calendar consent granted");
                Ok(TokenState::Authenticated(token.access_token))
            }
            Err(e) => {
                warn!("Calendar consent flow failed: {e}");
                self.prompt.notify(FAILURE_MESSAGE);
                Ok(TokenState::Failed(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl TokenProvider for OAuthTokenProvider {
    #[instrument(skip(self), fields(store = %self.store.path().display()))]
    async fn token(&self) -> Result<TokenState> {
        let stored = match self.store.load() {
            Ok(stored) => stored,
            // an unreadable store must not block a fresh consent
            Err(e @ MorningBotError::Parse { .. }) => {
                warn!("Ignoring unreadable token store: {e}");
                None
            }
            Err(e) => return Err(e),
        };

        if let Some(token) = stored {
            if token.is_fresh(Utc::now().timestamp()) {
                debug!("Using stored access token");
                return Ok(TokenState::Authenticated(token.access_token));
            }

            if let Some(refresh_token) = &token.refresh_token {
                match self.refresh(refresh_token).await {
                    Ok(fresh) => {
                        self.store.save(&fresh)?;
                        info!("Refreshed calendar access token");
                        return Ok(TokenState::Authenticated(fresh.access_token));
                    }
                    Err(e) => warn!("{e}, falling back to consent"),
                }
            }
        }

        self.consent_flow().await
    }
}

/// Pull `code` out of the redirect URL after checking `state`
fn authorization_code(redirect: &str, expected_state: &str) -> Result<String> {
    let url = Url::parse(redirect)
        .map_err(|e| MorningBotError::auth(format!("Pasted text is not a URL: {e}")))?;

    let param = |name: &str| {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    };

    if let Some(error) = param("error") {
        let description = param("error_description").unwrap_or_default();
        return Err(MorningBotError::auth(format!(
            "authorization denied: {error} {description}"
        )));
    }
    if param("state").as_deref() != Some(expected_state) {
        return Err(MorningBotError::auth(
            "state mismatch in redirect URL, possible stale or forged response",
        ));
    }
    param("code").ok_or_else(|| MorningBotError::auth("redirect URL carries no authorization code"))
}
