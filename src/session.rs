//! Session establishment and credential lifecycle.
//!
//! The conversation endpoint wants a short-lived bearer token that users
//! never configure directly.  What they configure is one of three things: a
//! long-lived session-token cookie to exchange for a bearer token, an
//! email/password pair for a login provider, or a bearer token they minted
//! themselves.  [`SessionManager`] turns whichever is present into a
//! [`Session`], falling back down that list as tokens go stale.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use time::OffsetDateTime;

use crate::error::{Error, Result};
use crate::observability::{
    SESSION_FALLBACK_LOGINS, SESSION_REFRESHES, SESSION_REFRESH_FAILURES, SESSION_TOKEN_ROTATIONS,
};
use crate::types::{Credential, Credentials, SessionInfo};

/// Path of the session endpoint, relative to the base URL.
pub(crate) const SESSION_PATH: &str = "api/auth/session";

/// Cookie carrying the long-lived session token.
const SESSION_TOKEN_COOKIE: &str = "__Secure-next-auth.session-token";

/// Cookie the auth flow expects alongside the session token.
const CALLBACK_URL_COOKIE: &str = "__Secure-next-auth.callback-url";

/// Fixed value of the callback-url cookie.
const CALLBACK_URL: &str = "https://chat.openai.com/";

/// The browser the backend thinks it is talking to.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 \
     (KHTML, like Gecko) Version/16.1 Safari/605.1.15";

/// Referer sent with every request.
const REFERER: &str = "https://chat.openai.com/chat";

/// Where the session manager stands with the backend.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No session has been established yet.
    Unauthenticated,

    /// A refresh is in flight.
    Authenticating,

    /// A session is established and usable.
    Ready,

    /// The most recent refresh failed.  A later refresh may recover.
    Failed,
}

/// The result of a successful login.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginOutcome {
    /// The bearer token for the conversation endpoint.
    pub access_token: String,

    /// A session token the flow reported directly, if any.
    pub session_token: Option<String>,

    /// Session-token cookie values observed during the flow.  Consulted
    /// in order when no direct token was reported.
    pub cookie_session_tokens: Vec<String>,
}

impl LoginOutcome {
    /// Create an outcome carrying just an access token.
    pub fn new(access_token: impl Into<String>) -> Self {
        LoginOutcome {
            access_token: access_token.into(),
            session_token: None,
            cookie_session_tokens: Vec::new(),
        }
    }

    /// Set the directly-reported session token.
    pub fn with_session_token(mut self, session_token: impl Into<String>) -> Self {
        self.session_token = Some(session_token.into());
        self
    }

    /// Set the session-token cookie values observed during the flow.
    pub fn with_cookie_session_tokens(mut self, tokens: Vec<String>) -> Self {
        self.cookie_session_tokens = tokens;
        self
    }
}

/// A pluggable email/password login flow.
///
/// The real flow involves a browser-grade OAuth dance and a CAPTCHA wall,
/// so it lives behind this seam.  Implementations that hit a CAPTCHA
/// should return [`Error::Captcha`]; it is reported to the user as
/// unsolvable rather than retried.
#[async_trait]
pub trait LoginProvider: fmt::Debug + Send + Sync {
    /// Log in and report the tokens the flow produced.
    async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome>;
}

/// An established session.
///
/// Immutable once constructed: the header map is derived from the access
/// token at construction, so the two can never disagree.  A token change
/// means a new `Session`.
#[derive(Clone, Debug)]
pub struct Session {
    access_token: String,
    session_token: Option<String>,
    expires_at: Option<OffsetDateTime>,
    headers: HeaderMap,
}

impl Session {
    /// Create a session from an access token and an optional session
    /// token, deriving the full header set.
    pub fn new(access_token: impl Into<String>, session_token: Option<String>) -> Result<Self> {
        let access_token = access_token.into();
        let headers = build_headers(&access_token, session_token.as_deref())?;
        Ok(Session {
            access_token,
            session_token,
            expires_at: None,
            headers,
        })
    }

    /// Attach the expiry the backend reported.
    pub fn with_expiry(mut self, expires_at: OffsetDateTime) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// The bearer token in effect.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// The session token in effect, if any.
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    /// When the session expires, if the backend said.
    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        self.expires_at
    }

    /// The headers every conversation request must carry.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

enum SessionRefresh {
    Established(Session),
    InvalidToken,
}

/// Owns the credentials and the session derived from them.
#[derive(Debug)]
pub struct SessionManager {
    credentials: Credentials,
    login: Option<Arc<dyn LoginProvider>>,
    session: Option<Session>,
    state: SessionState,
    rotated_session_token: Option<String>,
    session_token_rejected: bool,
}

impl SessionManager {
    /// Create a manager around a fixed set of credentials.
    pub fn new(credentials: Credentials) -> Self {
        SessionManager {
            credentials,
            login: None,
            session: None,
            state: SessionState::Unauthenticated,
            rotated_session_token: None,
            session_token_rejected: false,
        }
    }

    /// Install the login provider used for email/password credentials.
    pub fn set_login_provider(&mut self, provider: Arc<dyn LoginProvider>) {
        self.login = Some(provider);
    }

    /// The credentials this manager was built with.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The current session, if one is established.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns true if a fallback to password login is possible.
    pub fn has_email_password(&self) -> bool {
        self.credentials.has_email_password()
    }

    /// Return the current session, establishing one first if needed.
    pub async fn ensure(
        &mut self,
        http: &reqwest::Client,
        base_url: &str,
    ) -> Result<&Session> {
        if self.session.is_none() {
            self.refresh(http, base_url).await?;
        }
        match &self.session {
            Some(session) => Ok(session),
            None => Err(Error::authentication("session refresh produced no session")),
        }
    }

    /// Establish a fresh session from the configured credentials,
    /// replacing any session currently held.
    pub async fn refresh(&mut self, http: &reqwest::Client, base_url: &str) -> Result<()> {
        self.state = SessionState::Authenticating;
        match self.refresh_inner(http, base_url).await {
            Ok(session) => {
                self.session = Some(session);
                self.state = SessionState::Ready;
                SESSION_REFRESHES.click();
                Ok(())
            }
            Err(err) => {
                self.session = None;
                self.state = SessionState::Failed;
                SESSION_REFRESH_FAILURES.click();
                Err(err)
            }
        }
    }

    async fn refresh_inner(
        &mut self,
        http: &reqwest::Client,
        base_url: &str,
    ) -> Result<Session> {
        match self.active_credential() {
            Some(Credential::SessionToken(token)) => {
                match self.query_session_endpoint(http, base_url, &token).await? {
                    SessionRefresh::Established(session) => Ok(session),
                    SessionRefresh::InvalidToken => {
                        // A dead session token is never retried.
                        self.session_token_rejected = true;
                        self.rotated_session_token = None;
                        if let Some((email, password)) = self.credentials.email_password() {
                            let email = email.to_string();
                            let password = password.to_string();
                            SESSION_FALLBACK_LOGINS.click();
                            self.password_login(&email, &password).await
                        } else {
                            Err(Error::missing_credentials(
                                "session token was rejected and no email/password pair is configured",
                            ))
                        }
                    }
                }
            }
            Some(Credential::EmailPassword { email, password }) => {
                self.password_login(&email, &password).await
            }
            Some(Credential::AccessToken(token)) => {
                // Trust on first use; the conversation endpoint is the
                // only thing that can tell us whether it works.
                Session::new(token, None)
            }
            None => Err(Error::missing_credentials(
                "no session token, email/password pair, or bearer token is configured",
            )),
        }
    }

    /// The credential the next refresh should use.  A token rotated by
    /// the backend beats the configured one, and a configured token the
    /// backend rejected is skipped entirely.
    fn active_credential(&self) -> Option<Credential> {
        if let Some(token) = &self.rotated_session_token {
            return Some(Credential::SessionToken(token.clone()));
        }
        if self.session_token_rejected {
            let mut remaining = self.credentials.clone();
            remaining.session_token = None;
            return remaining.resolve();
        }
        self.credentials.resolve()
    }

    async fn query_session_endpoint(
        &mut self,
        http: &reqwest::Client,
        base_url: &str,
        session_token: &str,
    ) -> Result<SessionRefresh> {
        let url = format!("{base_url}{SESSION_PATH}");
        let response = http
            .get(&url)
            .header(header::USER_AGENT, HeaderValue::from_static(USER_AGENT))
            .header(header::COOKIE, session_cookie_header(Some(session_token))?)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(format!("session request timed out: {e}"), None)
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
                }
            })?;

        if !response.status().is_success() {
            return Err(Error::authentication(format!(
                "session endpoint returned {}",
                response.status()
            )));
        }

        let rotated = rotated_session_token(response.headers());
        let body: serde_json::Value = response.json().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse session response: {e}"),
                Some(Box::new(e)),
            )
        })?;

        // A dead session comes back 200 with an empty object.
        if body.as_object().is_some_and(|o| o.is_empty()) {
            return Ok(SessionRefresh::InvalidToken);
        }

        let info: SessionInfo = serde_json::from_value(body).map_err(|e| {
            Error::protocol(format!("session endpoint body was not understood: {e}"))
        })?;

        let session_token = match rotated {
            Some(rotated) => {
                SESSION_TOKEN_ROTATIONS.click();
                self.rotated_session_token = Some(rotated.clone());
                rotated
            }
            None => session_token.to_string(),
        };

        let mut session = Session::new(info.access_token, Some(session_token))?;
        if let Some(expires) = info.expires {
            session = session.with_expiry(expires);
        }
        Ok(SessionRefresh::Established(session))
    }

    async fn password_login(&mut self, email: &str, password: &str) -> Result<Session> {
        let Some(provider) = self.login.clone() else {
            return Err(Error::authentication(
                "email/password login requires a login provider; configure a session token instead",
            ));
        };
        let outcome = provider.login(email, password).await.map_err(|err| {
            if err.is_captcha() {
                err
            } else {
                Error::authentication(format!("login failed: {err}"))
            }
        })?;
        let session_token = outcome.session_token.or_else(|| {
            outcome
                .cookie_session_tokens
                .into_iter()
                .find(|token| !token.is_empty())
        });
        if let Some(token) = &session_token {
            self.rotated_session_token = Some(token.clone());
        }
        Session::new(outcome.access_token, session_token)
    }
}

/// Build the header set for a given access token.
fn build_headers(access_token: &str, session_token: Option<&str>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(header::REFERER, HeaderValue::from_static(REFERER));
    headers.insert("X-Openai-Assistant-App-Id", HeaderValue::from_static(""));
    let bearer = HeaderValue::from_str(&format!("Bearer {access_token}")).map_err(|_| {
        Error::validation(
            "access token contains characters not allowed in a header",
            Some("access_token".to_string()),
        )
    })?;
    headers.insert(header::AUTHORIZATION, bearer);
    headers.insert(header::COOKIE, session_cookie_header(session_token)?);
    Ok(headers)
}

/// Build the Cookie header: the fixed callback-url cookie, plus the
/// session token when one is in hand.
fn session_cookie_header(session_token: Option<&str>) -> Result<HeaderValue> {
    let cookie = match session_token {
        Some(token) => {
            format!("{CALLBACK_URL_COOKIE}={CALLBACK_URL}; {SESSION_TOKEN_COOKIE}={token}")
        }
        None => format!("{CALLBACK_URL_COOKIE}={CALLBACK_URL}"),
    };
    HeaderValue::from_str(&cookie).map_err(|_| {
        Error::validation(
            "session token contains characters not allowed in a Cookie header",
            Some("session_token".to_string()),
        )
    })
}

/// Pick a rotated session token out of Set-Cookie response headers.
fn rotated_session_token(headers: &HeaderMap) -> Option<String> {
    for value in headers.get_all(header::SET_COOKIE) {
        let Ok(value) = value.to_str() else {
            continue;
        };
        let pair = value.split(';').next().unwrap_or(value);
        if let Some((name, token)) = pair.split_once('=') {
            if name.trim() == SESSION_TOKEN_COOKIE && !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct StaticProvider {
        outcome: LoginOutcome,
    }

    #[async_trait]
    impl LoginProvider for StaticProvider {
        async fn login(&self, _: &str, _: &str) -> Result<LoginOutcome> {
            Ok(self.outcome.clone())
        }
    }

    #[derive(Debug)]
    struct FailingProvider {
        captcha: bool,
    }

    #[async_trait]
    impl LoginProvider for FailingProvider {
        async fn login(&self, _: &str, _: &str) -> Result<LoginOutcome> {
            if self.captcha {
                Err(Error::captcha("the login form presented a CAPTCHA"))
            } else {
                Err(Error::protocol("login form moved"))
            }
        }
    }

    #[test]
    fn session_headers_carry_bearer_and_cookies() {
        let session = Session::new("tok-123", Some("sess-456".to_string())).unwrap();
        let headers = session.headers();
        assert_eq!(
            headers.get(header::AUTHORIZATION).unwrap(),
            "Bearer tok-123"
        );
        let cookie = headers.get(header::COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.contains("__Secure-next-auth.callback-url=https://chat.openai.com/"));
        assert!(cookie.contains("__Secure-next-auth.session-token=sess-456"));
        assert_eq!(headers.get(header::ACCEPT).unwrap(), "text/event-stream");
        assert_eq!(
            headers.get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert!(headers.get(header::USER_AGENT).is_some());
        assert!(headers.get(header::REFERER).is_some());
        assert!(headers.get("X-Openai-Assistant-App-Id").is_some());
    }

    #[test]
    fn session_without_token_still_sends_callback_cookie() {
        let session = Session::new("tok-123", None).unwrap();
        let cookie = session
            .headers()
            .get(header::COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(cookie.contains("callback-url"));
        assert!(!cookie.contains("session-token"));
    }

    #[test]
    fn invalid_access_token_is_rejected() {
        let err = Session::new("tok\nwith-newline", None).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn rotated_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.append(
            header::SET_COOKIE,
            HeaderValue::from_static("unrelated=1; Path=/"),
        );
        headers.append(
            header::SET_COOKIE,
            HeaderValue::from_static(
                "__Secure-next-auth.session-token=fresh-token; Path=/; HttpOnly; Secure",
            ),
        );
        assert_eq!(
            rotated_session_token(&headers),
            Some("fresh-token".to_string())
        );

        let mut headers = HeaderMap::new();
        headers.append(
            header::SET_COOKIE,
            HeaderValue::from_static("unrelated=1; Path=/"),
        );
        assert_eq!(rotated_session_token(&headers), None);
    }

    #[test]
    fn active_credential_precedence() {
        let credentials = Credentials::new()
            .with_session_token("configured")
            .with_email_password("user@example.org", "hunter2");
        let mut manager = SessionManager::new(credentials);
        assert_eq!(
            manager.active_credential(),
            Some(Credential::SessionToken("configured".to_string()))
        );

        manager.rotated_session_token = Some("rotated".to_string());
        assert_eq!(
            manager.active_credential(),
            Some(Credential::SessionToken("rotated".to_string()))
        );

        manager.rotated_session_token = None;
        manager.session_token_rejected = true;
        assert_eq!(
            manager.active_credential(),
            Some(Credential::EmailPassword {
                email: "user@example.org".to_string(),
                password: "hunter2".to_string(),
            })
        );
    }

    #[test]
    fn rejected_token_with_nothing_else_leaves_no_credential() {
        let credentials = Credentials::new().with_session_token("configured");
        let mut manager = SessionManager::new(credentials);
        manager.session_token_rejected = true;
        assert_eq!(manager.active_credential(), None);
    }

    #[test]
    fn manager_starts_unauthenticated() {
        let manager = SessionManager::new(Credentials::new());
        assert_eq!(manager.state(), SessionState::Unauthenticated);
        assert!(manager.session().is_none());
    }

    #[tokio::test]
    async fn bearer_token_is_trusted_without_network() {
        let credentials = Credentials::new().with_access_token("bearer-tok");
        let mut manager = SessionManager::new(credentials);
        let http = reqwest::Client::new();
        manager.refresh(&http, "http://unused.invalid/").await.unwrap();
        assert_eq!(manager.state(), SessionState::Ready);
        let session = manager.session().unwrap();
        assert_eq!(session.access_token(), "bearer-tok");
        assert!(session.session_token().is_none());
    }

    #[tokio::test]
    async fn password_login_uses_first_cookie_token() {
        let credentials = Credentials::new().with_email_password("user@example.org", "hunter2");
        let mut manager = SessionManager::new(credentials);
        manager.set_login_provider(Arc::new(StaticProvider {
            outcome: LoginOutcome::new("login-tok").with_cookie_session_tokens(vec![
                "first".to_string(),
                "second".to_string(),
            ]),
        }));
        let http = reqwest::Client::new();
        manager.refresh(&http, "http://unused.invalid/").await.unwrap();
        let session = manager.session().unwrap();
        assert_eq!(session.access_token(), "login-tok");
        assert_eq!(session.session_token(), Some("first"));
        assert_eq!(manager.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn captcha_failures_pass_through() {
        let credentials = Credentials::new().with_email_password("user@example.org", "hunter2");
        let mut manager = SessionManager::new(credentials);
        manager.set_login_provider(Arc::new(FailingProvider { captcha: true }));
        let http = reqwest::Client::new();
        let err = manager
            .refresh(&http, "http://unused.invalid/")
            .await
            .unwrap_err();
        assert!(err.is_captcha());
        assert_eq!(manager.state(), SessionState::Failed);
    }

    #[tokio::test]
    async fn other_login_failures_become_authentication_errors() {
        let credentials = Credentials::new().with_email_password("user@example.org", "hunter2");
        let mut manager = SessionManager::new(credentials);
        manager.set_login_provider(Arc::new(FailingProvider { captcha: false }));
        let http = reqwest::Client::new();
        let err = manager
            .refresh(&http, "http://unused.invalid/")
            .await
            .unwrap_err();
        assert!(err.is_authentication());
    }

    #[tokio::test]
    async fn password_credentials_without_provider_fail() {
        let credentials = Credentials::new().with_email_password("user@example.org", "hunter2");
        let mut manager = SessionManager::new(credentials);
        let http = reqwest::Client::new();
        let err = manager
            .refresh(&http, "http://unused.invalid/")
            .await
            .unwrap_err();
        assert!(err.is_authentication());
        assert!(err.to_string().contains("session token"));
    }

    #[tokio::test]
    async fn refresh_without_credentials_is_missing_credentials() {
        let mut manager = SessionManager::new(Credentials::new());
        let http = reqwest::Client::new();
        let err = manager
            .refresh(&http, "http://unused.invalid/")
            .await
            .unwrap_err();
        assert!(err.is_missing_credentials());
        assert_eq!(manager.state(), SessionState::Failed);
    }
}
