//! Per-account credential sessions
//!
//! A [`CredentialSession`] is rebuilt from an [`Account`] each time a tool is
//! configured and moves through a small state machine:
//!
//! ```text
//! Unset ──────────────┐
//! Expired (no refresh)├─> Authorizing ──> Valid
//! Expired ─ refresh ──┴──────────────────> Valid
//! ```
//!
//! Every transition into `Valid` writes the tokens through the
//! [`TokenProvider`], and [`CredentialStore::export_token_material`] turns a
//! session back into the hex material stored on the account record.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::OAuthConfig;
use crate::error::{Error, Result};
use crate::models::{Account, OAuthTokens};
use crate::oauth::{OAuthClient, OAuthManager};
use crate::token_provider::TokenProvider;

/// Envelope version written into token material
pub const TOKEN_MATERIAL_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct TokenEnvelope {
    version: u32,
    tokens: OAuthTokens,
}

/// Encode tokens as account token material (hex of a versioned JSON envelope)
pub fn encode_token_material(tokens: &OAuthTokens) -> Result<String> {
    let envelope = TokenEnvelope {
        version: TOKEN_MATERIAL_VERSION,
        tokens: tokens.clone(),
    };
    Ok(hex::encode(serde_json::to_vec(&envelope)?))
}

/// Decode account token material
pub fn decode_token_material(material: &str) -> Result<OAuthTokens> {
    let bytes = hex::decode(material.trim())
        .map_err(|e| Error::Token(format!("Token material is not hex: {}", e)))?;
    let envelope: TokenEnvelope = serde_json::from_slice(&bytes)
        .map_err(|e| Error::Token(format!("Unreadable token material: {}", e)))?;
    if envelope.version != TOKEN_MATERIAL_VERSION {
        return Err(Error::Token(format!(
            "Unsupported token material version {}",
            envelope.version
        )));
    }
    Ok(envelope.tokens)
}

/// Lifecycle state of a session's credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    /// No tokens loaded
    Unset,
    /// Access token usable
    Valid,
    /// Access token past (or near) its expiry
    Expired,
    /// Interactive authorization in progress
    Authorizing,
}

/// One tool's decoded copy of an account's credentials
#[derive(Debug, Clone)]
pub struct CredentialSession {
    account: String,
    client: OAuthClient,
    tokens: Option<OAuthTokens>,
    state: CredentialState,
}

impl CredentialSession {
    pub fn new(account: impl Into<String>, client: OAuthClient, tokens: Option<OAuthTokens>) -> Self {
        let mut session = Self {
            account: account.into(),
            client,
            tokens,
            state: CredentialState::Unset,
        };
        session.refresh_state();
        session
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn client(&self) -> &OAuthClient {
        &self.client
    }

    pub fn tokens(&self) -> Option<&OAuthTokens> {
        self.tokens.as_ref()
    }

    pub fn state(&self) -> CredentialState {
        self.state
    }

    /// Re-derive the state from the tokens; expiry moves with the clock
    fn refresh_state(&mut self) {
        self.state = match &self.tokens {
            None => CredentialState::Unset,
            Some(tokens) if tokens.is_expired() => CredentialState::Expired,
            Some(_) => CredentialState::Valid,
        };
    }

    fn accept(&mut self, tokens: OAuthTokens) -> String {
        let access_token = tokens.access_token.clone();
        self.tokens = Some(tokens);
        self.state = CredentialState::Valid;
        access_token
    }
}

/// Interactive authorization seam
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Obtain fresh tokens for an account, typically through the browser
    async fn authorize(&self, oauth: &OAuthManager, account: &str) -> Result<OAuthTokens>;
}

/// Owns credential loading, refresh and interactive authorization
pub struct CredentialStore {
    token_provider: Arc<dyn TokenProvider>,
    authorizer: Arc<dyn Authorizer>,
    scopes: Vec<String>,
    http: reqwest::Client,
}

impl CredentialStore {
    pub fn new(
        token_provider: Arc<dyn TokenProvider>,
        authorizer: Arc<dyn Authorizer>,
        config: &OAuthConfig,
        http: reqwest::Client,
    ) -> Self {
        Self {
            token_provider,
            authorizer,
            scopes: config.scopes.clone(),
            http,
        }
    }

    pub fn token_provider(&self) -> &Arc<dyn TokenProvider> {
        &self.token_provider
    }

    fn oauth_manager(&self, session: &CredentialSession) -> OAuthManager {
        OAuthManager::new(session.client.clone(), self.scopes.clone(), self.http.clone())
    }

    /// Build a session from an account record.
    ///
    /// Token material on the record wins; if it is absent or unreadable the
    /// local token file is tried, and failing both the session is `Unset`.
    pub async fn configure(&self, account: &Account) -> CredentialSession {
        let client = OAuthClient::from_account(account);

        let from_material = match account.token_material.as_deref() {
            Some(material) if !material.trim().is_empty() => {
                match decode_token_material(material) {
                    Ok(tokens) => Some(tokens),
                    Err(e) => {
                        warn!("Ignoring token material for {}: {}", account.name, e);
                        None
                    }
                }
            }
            _ => None,
        };

        let tokens = match from_material {
            Some(tokens) => Some(tokens),
            None => match self.token_provider.get_tokens(&account.name).await {
                Ok(tokens) => tokens,
                Err(e) => {
                    warn!("Could not load token file for {}: {}", account.name, e);
                    None
                }
            },
        };

        let session = CredentialSession::new(account.name.clone(), client, tokens);
        debug!("Configured session for {} ({:?})", account.name, session.state);
        session
    }

    /// Return a usable access token, refreshing or authorizing as needed
    pub async fn ensure_authenticated(&self, session: &mut CredentialSession) -> Result<String> {
        if !session.client.has_secrets() {
            return Err(Error::AuthenticationFailed(
                "Client credentials not set. Please configure account first.".to_string(),
            ));
        }

        if session.state == CredentialState::Unset {
            // another session for the account may have authorized since
            if let Ok(Some(tokens)) = self.token_provider.get_tokens(&session.account).await {
                debug!("Picked up stored tokens for {}", session.account);
                session.tokens = Some(tokens);
            }
        }

        session.refresh_state();
        if session.state == CredentialState::Valid {
            if let Some(tokens) = &session.tokens {
                return Ok(tokens.access_token.clone());
            }
        }

        let oauth = self.oauth_manager(session);

        if session.state == CredentialState::Expired {
            if let Some(current) = session.tokens.clone().filter(OAuthTokens::can_refresh) {
                match oauth.refresh(&session.account, &current).await {
                    Ok(tokens) => {
                        info!("Session for {} refreshed silently", session.account);
                        return Ok(self.accept(session, tokens).await);
                    }
                    Err(e) => warn!(
                        "Silent refresh failed for {}, re-authorizing: {}",
                        session.account, e
                    ),
                }
            }
        }

        self.authorize_session(session, &oauth).await
    }

    /// Run interactive authorization regardless of the current state
    pub async fn authorize(&self, session: &mut CredentialSession) -> Result<String> {
        if !session.client.has_secrets() {
            return Err(Error::AuthenticationFailed(
                "Client credentials not set. Please configure account first.".to_string(),
            ));
        }
        let oauth = self.oauth_manager(session);
        self.authorize_session(session, &oauth).await
    }

    async fn authorize_session(
        &self,
        session: &mut CredentialSession,
        oauth: &OAuthManager,
    ) -> Result<String> {
        session.state = CredentialState::Authorizing;
        info!("Starting interactive authorization for {}", session.account);

        match self.authorizer.authorize(oauth, &session.account).await {
            Ok(tokens) => Ok(self.accept(session, tokens).await),
            Err(e) => {
                session.refresh_state();
                error!("Authorization failed for {}: {}", session.account, e);
                Err(match e {
                    Error::AuthenticationFailed(reason) => Error::AuthenticationFailed(reason),
                    other => Error::AuthenticationFailed(other.to_string()),
                })
            }
        }
    }

    async fn accept(&self, session: &mut CredentialSession, tokens: OAuthTokens) -> String {
        if let Err(e) = self
            .token_provider
            .store_tokens(&session.account, &tokens)
            .await
        {
            warn!("Could not persist tokens for {}: {}", session.account, e);
        }
        session.accept(tokens)
    }

    /// Current credentials as account token material
    pub fn export_token_material(session: &CredentialSession) -> Option<String> {
        let tokens = session.tokens.as_ref()?;
        match encode_token_material(tokens) {
            Ok(material) => Some(material),
            Err(e) => {
                warn!("Could not export tokens for {}: {}", session.account, e);
                None
            }
        }
    }
}

const SUCCESS_PAGE: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
    <!DOCTYPE html><html><body style='font-family: sans-serif; padding: 40px; text-align: center;'>\
    <h1>Authentication Successful!</h1><p>You can close this window.</p></body></html>";

const BAD_STATE_PAGE: &str = "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
    <h1>Error: Invalid state</h1>";

const DENIED_PAGE: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
    <h1>Authorization was not granted</h1><p>You can close this window.</p>";

const NOT_FOUND_PAGE: &str = "HTTP/1.1 404 Not Found\r\nConnection: close\r\n\r\n";

/// Browser flow with a one-shot loopback HTTP listener
pub struct LoopbackAuthorizer {
    timeout: Duration,
    callback_path: String,
    open_browser: bool,
}

impl LoopbackAuthorizer {
    pub fn new(config: &OAuthConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.authorization_timeout_secs),
            callback_path: config.callback_path.clone(),
            open_browser: config.open_browser,
        }
    }

    /// Port and callback path taken from a loopback redirect URI
    fn listen_target(&self, redirect_uri: &str) -> (u16, String) {
        let parsed = Url::parse(redirect_uri).ok().filter(|u| {
            matches!(u.host_str(), Some("localhost") | Some("127.0.0.1"))
        });

        match parsed {
            Some(url) => {
                let path = if url.path().is_empty() || url.path() == "/" {
                    self.callback_path.clone()
                } else {
                    url.path().to_string()
                };
                (url.port().unwrap_or(0), path)
            }
            None => (0, self.callback_path.clone()),
        }
    }
}

#[async_trait]
impl Authorizer for LoopbackAuthorizer {
    async fn authorize(&self, oauth: &OAuthManager, account: &str) -> Result<OAuthTokens> {
        let (port, path) = self.listen_target(&oauth.client().redirect_uri);
        let listener = TcpListener::bind(("127.0.0.1", port)).await?;
        let port = listener.local_addr()?.port();
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };
        let redirect_uri = format!("http://localhost:{}{}", port, path);

        let state = format!("gmassist_{}", uuid::Uuid::new_v4());
        let auth_url = oauth.authorization_url(&state, &redirect_uri)?;

        info!("Waiting for authorization callback for {} on {}", account, redirect_uri);
        let opened = self.open_browser
            && match open::that(&auth_url) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Failed to open browser: {}", e);
                    false
                }
            };
        if !opened {
            eprintln!("Open this URL to authorize '{}':\n{}", account, auth_url);
        }

        let code = match tokio::time::timeout(self.timeout, wait_for_callback(&listener, &state, &path)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::AuthenticationFailed(format!(
                    "no callback received within {} seconds",
                    self.timeout.as_secs()
                )))
            }
        };

        debug!("Received authorization code for {}", account);
        oauth.exchange_code(&code, &redirect_uri).await
    }
}

/// Query parameters of an OAuth redirect
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Parse the request line of a redirect, e.g. `GET /?code=..&state=.. HTTP/1.1`.
/// Returns `None` when the target is not the callback path.
pub fn parse_oauth_callback(request_line: &str, callback_path: &str) -> Result<Option<CallbackParams>> {
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 {
        return Err(Error::OAuth("Invalid HTTP request".to_string()));
    }

    let target = parts[1];
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    if path != callback_path {
        return Ok(None);
    }

    let mut params = CallbackParams::default();
    for param in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = param.split_once('=').unwrap_or((param, ""));
        let value = urlencoding::decode(value)
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| value.to_string());
        match key {
            "code" => params.code = Some(value),
            "state" => params.state = Some(value),
            "error" => params.error = Some(value),
            _ => {}
        }
    }

    Ok(Some(params))
}

/// Serve requests on the listener until the OAuth redirect arrives
async fn wait_for_callback(listener: &TcpListener, state: &str, callback_path: &str) -> Result<String> {
    loop {
        let (mut socket, peer) = listener.accept().await?;
        let mut reader = BufReader::new(&mut socket);
        let mut request_line = String::new();
        reader.read_line(&mut request_line).await?;
        debug!("Loopback request from {}: {}", peer, request_line.trim());

        let Some(params) = parse_oauth_callback(&request_line, callback_path)? else {
            // favicon and other stray requests
            socket.write_all(NOT_FOUND_PAGE.as_bytes()).await?;
            continue;
        };

        if params.state.as_deref() != Some(state) {
            socket.write_all(BAD_STATE_PAGE.as_bytes()).await?;
            return Err(Error::AuthenticationFailed(
                "OAuth state mismatch - possible CSRF attack".to_string(),
            ));
        }

        if let Some(reason) = params.error {
            socket.write_all(DENIED_PAGE.as_bytes()).await?;
            return Err(Error::AuthenticationFailed(reason));
        }

        let Some(code) = params.code else {
            socket.write_all(BAD_STATE_PAGE.as_bytes()).await?;
            return Err(Error::AuthenticationFailed(
                "No authorization code in callback".to_string(),
            ));
        };

        socket.write_all(SUCCESS_PAGE.as_bytes()).await?;
        return Ok(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token_provider::FileTokenProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpStream;

    /// Authorizer that hands out canned tokens and counts calls
    struct StubAuthorizer {
        calls: AtomicUsize,
        fail: bool,
    }

    impl StubAuthorizer {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Authorizer for StubAuthorizer {
        async fn authorize(&self, _oauth: &OAuthManager, _account: &str) -> Result<OAuthTokens> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::AuthenticationFailed("access_denied".to_string()));
            }
            Ok(tokens("ya29.interactive", 3600, Some("1//interactive")))
        }
    }

    fn tokens(access: &str, expires_in: i64, refresh: Option<&str>) -> OAuthTokens {
        OAuthTokens {
            access_token: access.to_string(),
            refresh_token: refresh.map(String::from),
            expires_at: chrono::Utc::now().timestamp() + expires_in,
            scopes: vec![],
        }
    }

    fn account(token_uri: &str, material: Option<&OAuthTokens>) -> Account {
        let mut account = Account::new(
            "work",
            "client-id",
            "client-secret",
            "https://accounts.google.com/o/oauth2/auth",
            token_uri,
            "http://localhost",
        );
        account.token_material = material.map(|t| encode_token_material(t).unwrap());
        account
    }

    fn store(dir: &std::path::Path, authorizer: Arc<StubAuthorizer>) -> CredentialStore {
        CredentialStore::new(
            Arc::new(FileTokenProvider::new(dir)),
            authorizer,
            &OAuthConfig::default(),
            reqwest::Client::new(),
        )
    }

    #[test]
    fn test_token_material_round_trip_and_versioning() {
        let original = tokens("ya29.a", 3600, Some("1//r"));
        let material = encode_token_material(&original).unwrap();
        assert!(material.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(decode_token_material(&material).unwrap(), original);

        let future = hex::encode(br#"{"version":2,"tokens":{"access_token":"a","expires_at":0}}"#);
        assert!(matches!(decode_token_material(&future), Err(Error::Token(_))));
        assert!(decode_token_material("zz-not-hex").is_err());
    }

    #[tokio::test]
    async fn test_configure_prefers_material_then_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), StubAuthorizer::new(false));

        let valid = tokens("ya29.material", 3600, None);
        let session = store.configure(&account("https://t", Some(&valid))).await;
        assert_eq!(session.state(), CredentialState::Valid);
        assert_eq!(session.tokens().unwrap().access_token, "ya29.material");

        let mut broken = account("https://t", None);
        broken.token_material = Some("80049500".to_string());
        assert_eq!(store.configure(&broken).await.state(), CredentialState::Unset);

        store
            .token_provider()
            .store_tokens("work", &tokens("ya29.file", 3600, None))
            .await
            .unwrap();
        let session = store.configure(&broken).await;
        assert_eq!(session.tokens().unwrap().access_token, "ya29.file");
    }

    #[tokio::test]
    async fn test_valid_session_returns_token_without_calls() {
        let dir = tempfile::tempdir().unwrap();
        let authorizer = StubAuthorizer::new(false);
        let store = store(dir.path(), authorizer.clone());

        let mut session = store
            .configure(&account("https://t", Some(&tokens("ya29.ok", 3600, None))))
            .await;
        assert_eq!(store.ensure_authenticated(&mut session).await.unwrap(), "ya29.ok");
        assert_eq!(authorizer.calls(), 0);
    }

    #[tokio::test]
    async fn test_expired_with_refresh_token_refreshes_silently() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"ya29.refreshed","expires_in":3600}"#)
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let authorizer = StubAuthorizer::new(false);
        let store = store(dir.path(), authorizer.clone());
        let token_uri = format!("{}/token", server.url());

        let mut session = store
            .configure(&account(&token_uri, Some(&tokens("ya29.old", -60, Some("1//r")))))
            .await;
        assert_eq!(session.state(), CredentialState::Expired);

        let access = store.ensure_authenticated(&mut session).await.unwrap();
        assert_eq!(access, "ya29.refreshed");
        assert_eq!(session.state(), CredentialState::Valid);
        assert_eq!(authorizer.calls(), 0);
        mock.assert_async().await;

        // persisted through the provider and exportable
        let stored = store.token_provider().get_tokens("work").await.unwrap().unwrap();
        assert_eq!(stored.access_token, "ya29.refreshed");
        let material = CredentialStore::export_token_material(&session).unwrap();
        assert_eq!(decode_token_material(&material).unwrap().access_token, "ya29.refreshed");
    }

    #[tokio::test]
    async fn test_failed_refresh_falls_back_to_authorization() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant"}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let authorizer = StubAuthorizer::new(false);
        let store = store(dir.path(), authorizer.clone());
        let token_uri = format!("{}/token", server.url());

        let mut session = store
            .configure(&account(&token_uri, Some(&tokens("ya29.old", -60, Some("1//revoked")))))
            .await;
        let access = store.ensure_authenticated(&mut session).await.unwrap();
        assert_eq!(access, "ya29.interactive");
        assert_eq!(authorizer.calls(), 1);
    }

    #[tokio::test]
    async fn test_unset_and_expired_without_refresh_authorize() {
        let dir = tempfile::tempdir().unwrap();
        let authorizer = StubAuthorizer::new(false);
        let store = store(dir.path(), authorizer.clone());

        let mut unset = store.configure(&account("https://t", None)).await;
        assert_eq!(unset.state(), CredentialState::Unset);
        store.ensure_authenticated(&mut unset).await.unwrap();

        let mut expired = store
            .configure(&account("https://t", Some(&tokens("ya29.old", -60, None))))
            .await;
        store.ensure_authenticated(&mut expired).await.unwrap();

        assert_eq!(authorizer.calls(), 2);
        assert_eq!(expired.state(), CredentialState::Valid);
    }

    #[tokio::test]
    async fn test_unset_session_reuses_tokens_stored_by_another() {
        let dir = tempfile::tempdir().unwrap();
        let authorizer = StubAuthorizer::new(false);
        let store = store(dir.path(), authorizer.clone());

        let mut first = store.configure(&account("https://t", None)).await;
        let mut second = store.configure(&account("https://t", None)).await;

        store.ensure_authenticated(&mut first).await.unwrap();
        let access = store.ensure_authenticated(&mut second).await.unwrap();

        assert_eq!(access, "ya29.interactive");
        assert_eq!(authorizer.calls(), 1);
    }

    #[tokio::test]
    async fn test_authorization_failure_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let authorizer = StubAuthorizer::new(true);
        let store = store(dir.path(), authorizer.clone());

        let mut session = store.configure(&account("https://t", None)).await;
        let err = store.ensure_authenticated(&mut session).await.unwrap_err();

        assert_eq!(err.to_string(), "Authentication failed: access_denied");
        assert_eq!(authorizer.calls(), 1);
        assert_eq!(session.state(), CredentialState::Unset);
    }

    #[tokio::test]
    async fn test_missing_client_secret_fails_before_any_flow() {
        let dir = tempfile::tempdir().unwrap();
        let authorizer = StubAuthorizer::new(false);
        let store = store(dir.path(), authorizer.clone());

        let mut incomplete = account("https://t", None);
        incomplete.client_secret.clear();
        let mut session = store.configure(&incomplete).await;

        assert!(matches!(
            store.ensure_authenticated(&mut session).await,
            Err(Error::AuthenticationFailed(_))
        ));
        assert_eq!(authorizer.calls(), 0);
    }

    #[test]
    fn test_parse_oauth_callback() {
        let params = parse_oauth_callback("GET /?state=s%201&code=4%2Fabc&scope=x HTTP/1.1\r\n", "/")
            .unwrap()
            .unwrap();
        assert_eq!(params.code.as_deref(), Some("4/abc"));
        assert_eq!(params.state.as_deref(), Some("s 1"));

        assert!(parse_oauth_callback("GET /favicon.ico HTTP/1.1", "/").unwrap().is_none());
        assert!(parse_oauth_callback("garbage", "/").is_err());

        let denied = parse_oauth_callback("GET /cb?error=access_denied&state=s HTTP/1.1", "/cb")
            .unwrap()
            .unwrap();
        assert_eq!(denied.error.as_deref(), Some("access_denied"));
    }

    #[test]
    fn test_listen_target() {
        let authorizer = LoopbackAuthorizer::new(&OAuthConfig::default());
        assert_eq!(authorizer.listen_target("http://localhost"), (0, "/".to_string()));
        assert_eq!(
            authorizer.listen_target("http://127.0.0.1:8085/oauth/callback"),
            (8085, "/oauth/callback".to_string())
        );
        assert_eq!(
            authorizer.listen_target("https://example.com/cb"),
            (0, "/".to_string())
        );
    }

    async fn send(port: u16, request: &str) -> String {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_wait_for_callback_skips_stray_requests() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let client = tokio::spawn(async move {
            let stray = send(port, "GET /favicon.ico HTTP/1.1\r\n\r\n").await;
            let ok = send(port, "GET /?state=expected&code=4%2Fxyz HTTP/1.1\r\n\r\n").await;
            (stray, ok)
        });

        let code = wait_for_callback(&listener, "expected", "/").await.unwrap();
        assert_eq!(code, "4/xyz");

        let (stray, ok) = client.await.unwrap();
        assert!(stray.starts_with("HTTP/1.1 404"));
        assert!(ok.contains("Authentication Successful!"));
    }

    #[tokio::test]
    async fn test_wait_for_callback_rejects_bad_state() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let client = tokio::spawn(async move {
            send(port, "GET /?state=forged&code=abc HTTP/1.1\r\n\r\n").await
        });

        let err = wait_for_callback(&listener, "expected", "/").await.unwrap_err();
        assert!(err.to_string().contains("state mismatch"));
        assert!(client.await.unwrap().starts_with("HTTP/1.1 400"));
    }
}
