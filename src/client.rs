use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::Stream;
use futures::stream::StreamExt;
use reqwest::Client as ReqwestClient;
use reqwest::header::HeaderMap;
use time::OffsetDateTime;

use crate::client_logger::ClientLogger;
use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, CLIENT_TOKEN_RETRIES,
    STREAM_ERRORS, STREAM_EVENTS, THREAD_RESETS, THREAD_ROLLBACKS,
};
use crate::session::{LoginProvider, SessionManager, SessionState};
use crate::sse;
use crate::thread::ConversationThread;
use crate::types::{ApiErrorBody, ConversationRequest, Credentials, Model, Reply};

const DEFAULT_BASE_URL: &str = "https://chat.openai.com/";
const CONVERSATION_PATH: &str = "backend-api/conversation";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(100);

/// Client for the ChatGPT web backend.
///
/// Owns the HTTP connection, the session derived from the configured
/// credentials, and the position within the current conversation.  All
/// operations take `&mut self`: one request is in flight at a time, and
/// replies move the conversation forward as a side effect.
#[derive(Debug)]
pub struct ChatGpt {
    http: ReqwestClient,
    base_url: String,
    timeout: Duration,
    model: Model,
    sessions: SessionManager,
    thread: ConversationThread,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl ChatGpt {
    /// Create a new client from credentials.
    ///
    /// No network traffic happens here; the session is established on
    /// first use or by an explicit [`refresh_session`] call.
    ///
    /// [`refresh_session`]: ChatGpt::refresh_session
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_options(credentials, None, None)
    }

    /// Create a new client with custom settings.
    ///
    /// `timeout` bounds buffered sends only; streaming responses are
    /// never timed out.
    pub fn with_options(
        credentials: Credentials,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        url::Url::parse(&base_url)?;
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        let mut builder = ReqwestClient::builder();
        if let Some(proxy) = credentials.proxy() {
            let proxy = reqwest::Proxy::all(proxy).map_err(|e| {
                Error::validation(
                    format!("invalid proxy URL: {e}"),
                    Some("proxy".to_string()),
                )
            })?;
            builder = builder.proxy(proxy);
        }
        // No client-wide timeout: buffered sends set one per request, and
        // streams stay open for as long as the backend keeps producing.
        let http = builder.build().map_err(|e| {
            Error::http_client(
                format!("Failed to build HTTP client: {e}"),
                Some(Box::new(e)),
            )
        })?;

        Ok(Self {
            http,
            base_url,
            timeout: timeout.unwrap_or(DEFAULT_TIMEOUT),
            model: Model::default(),
            sessions: SessionManager::new(credentials),
            thread: ConversationThread::new(),
            logger: None,
        })
    }

    /// Install a login provider for email/password credentials.
    pub fn with_login_provider(mut self, provider: Arc<dyn LoginProvider>) -> Self {
        self.sessions.set_login_provider(provider);
        self
    }

    /// Install a logger that observes all traffic.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The model requested for replies.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Change the model requested for replies.
    pub fn set_model(&mut self, model: Model) {
        self.model = model;
    }

    /// The current conversation identifier, once the backend assigned one.
    pub fn conversation_id(&self) -> Option<&str> {
        self.thread.conversation_id()
    }

    /// The identifier the next message will claim as its parent.
    pub fn parent_message_id(&self) -> &str {
        self.thread.parent_message_id()
    }

    /// Where the session lifecycle currently stands.
    pub fn session_state(&self) -> SessionState {
        self.sessions.state()
    }

    /// When the current session expires, if the backend said.
    pub fn session_expires_at(&self) -> Option<OffsetDateTime> {
        self.sessions.session().and_then(|s| s.expires_at())
    }

    /// Establish a fresh session from the configured credentials.
    pub async fn refresh_session(&mut self) -> Result<()> {
        self.sessions.refresh(&self.http, &self.base_url).await?;
        if let Some(logger) = &self.logger {
            logger.log_session("session refreshed");
        }
        Ok(())
    }

    /// Undo the thread advancement of the most recent turn.
    ///
    /// Returns true if there was a turn to undo.  Idempotent.
    pub fn rollback_last_turn(&mut self) -> bool {
        let rolled_back = self.thread.rollback();
        if rolled_back {
            THREAD_ROLLBACKS.click();
        }
        rolled_back
    }

    /// Abandon the current conversation and start a new one.  The
    /// session is untouched.
    pub fn reset_thread(&mut self) {
        self.thread.reset();
        THREAD_RESETS.click();
    }

    /// Send a prompt and wait for the complete reply.
    ///
    /// On success the conversation advances to the reply.  If the
    /// backend rejects the access token and an email/password pair is
    /// configured, the session is refreshed and the request retried
    /// exactly once; without that pair the rejection surfaces as
    /// [`Error::MissingCredentials`].
    pub async fn send(&mut self, prompt: impl Into<String>) -> Result<Reply> {
        let request = ConversationRequest::next(
            prompt,
            self.thread.conversation_id().map(String::from),
            self.thread.parent_message_id(),
            self.model.clone(),
        );
        if let Some(logger) = &self.logger {
            logger.log_request(&request);
        }
        self.thread.begin_turn();

        let start = Instant::now();
        let mut refreshed = false;
        loop {
            let headers = self
                .sessions
                .ensure(&self.http, &self.base_url)
                .await?
                .headers()
                .clone();
            CLIENT_REQUESTS.click();
            match self.complete_once(&request, headers).await {
                Ok(reply) => {
                    CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
                    self.thread
                        .advance(reply.conversation_id.clone(), reply.message_id.clone());
                    if let Some(logger) = &self.logger {
                        logger.log_reply(&reply);
                    }
                    return Ok(reply);
                }
                Err(err) if err.is_authentication() && !refreshed => {
                    CLIENT_REQUEST_ERRORS.click();
                    if !self.sessions.has_email_password() {
                        return Err(Error::missing_credentials(
                            "access token was rejected and no email/password pair is configured",
                        ));
                    }
                    refreshed = true;
                    CLIENT_TOKEN_RETRIES.click();
                    if let Some(logger) = &self.logger {
                        logger.log_session("access token rejected; refreshing session");
                    }
                    self.sessions.refresh(&self.http, &self.base_url).await?;
                }
                Err(err) => {
                    CLIENT_REQUEST_ERRORS.click();
                    return Err(err);
                }
            }
        }
    }

    async fn complete_once(
        &self,
        request: &ConversationRequest,
        headers: HeaderMap,
    ) -> Result<Reply> {
        let url = format!("{}{CONVERSATION_PATH}", self.base_url);
        let response = self
            .http
            .post(&url)
            .headers(headers)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(
                        format!("Request timed out: {e}"),
                        Some(self.timeout.as_secs_f64()),
                    )
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                Error::timeout(
                    format!("Request timed out: {e}"),
                    Some(self.timeout.as_secs_f64()),
                )
            } else {
                Error::http_client(
                    format!("Failed to read response: {e}"),
                    Some(Box::new(e)),
                )
            }
        })?;

        if !status.is_success() {
            return Err(classify_error_body(status.as_u16(), &body));
        }
        // Token rejections can arrive with a success status, so a body
        // that holds no reply gets a second read as an error body.
        parse_buffered_body(&body).map_err(|err| {
            let classified = classify_error_body(status.as_u16(), &body);
            if classified.is_protocol() {
                err
            } else {
                classified
            }
        })
    }

    /// Send a prompt and stream the reply as it is produced.
    ///
    /// Yields cumulative [`Reply`] events; each one advances the
    /// conversation before it is handed out, so dropping the stream
    /// mid-reply leaves the thread pointing at the last event seen.
    /// The stream borrows the client mutably, which keeps requests
    /// serialized.  Unlike [`send`], a rejected token is not retried.
    ///
    /// [`send`]: ChatGpt::send
    pub async fn stream(
        &mut self,
        prompt: impl Into<String>,
    ) -> Result<impl Stream<Item = Result<Reply>> + '_> {
        let request = ConversationRequest::next(
            prompt,
            self.thread.conversation_id().map(String::from),
            self.thread.parent_message_id(),
            self.model.clone(),
        );
        if let Some(logger) = &self.logger {
            logger.log_request(&request);
        }
        self.thread.begin_turn();

        let headers = self
            .sessions
            .ensure(&self.http, &self.base_url)
            .await?
            .headers()
            .clone();
        let url = format!("{}{CONVERSATION_PATH}", self.base_url);
        CLIENT_REQUESTS.click();
        // No timeout: the response stays open while the reply renders.
        let response = self
            .http
            .post(&url)
            .headers(headers)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            CLIENT_REQUEST_ERRORS.click();
            let body = response.text().await.map_err(|e| {
                Error::http_client(
                    format!("Failed to read response: {e}"),
                    Some(Box::new(e)),
                )
            })?;
            return Err(classify_error_body(status.as_u16(), &body));
        }

        let byte_stream = response.bytes_stream();
        let thread = &mut self.thread;
        let logger = self.logger.clone();
        Ok(sse::reply_events(byte_stream).map(move |event| match event {
            Ok(reply) => {
                STREAM_EVENTS.click();
                thread.advance(reply.conversation_id.clone(), reply.message_id.clone());
                if let Some(logger) = &logger {
                    logger.log_stream_event(&reply);
                }
                Ok(reply)
            }
            Err(err) => {
                STREAM_ERRORS.click();
                Err(err)
            }
        }))
    }
}

/// Interpret a non-success response body.
fn classify_error_body(status_code: u16, body: &str) -> Error {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(body) if body.is_token_rejection() => {
            Error::authentication(format!("access token rejected: {}", body.message()))
        }
        Ok(body) => Error::api(status_code, body.code().map(String::from), body.message()),
        Err(_) => Error::protocol(format!(
            "conversation endpoint returned status {status_code} with an uninterpretable body"
        )),
    }
}

/// Pull the final reply out of a buffered response body.
///
/// The body is the same line-delimited event stream the streaming path
/// consumes, already fully received; the last parseable `data:` line
/// carries the complete reply.
fn parse_buffered_body(body: &str) -> Result<Reply> {
    body.lines()
        .rev()
        .find_map(sse::parse_data_line)
        .ok_or_else(|| Error::protocol("conversation response contained no reply"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials::new().with_access_token("bearer-tok")
    }

    #[test]
    fn client_creation() {
        let client = ChatGpt::new(credentials()).unwrap();
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
        assert_eq!(client.timeout, DEFAULT_TIMEOUT);
        assert_eq!(client.model, Model::default());
        assert_eq!(client.session_state(), SessionState::Unauthenticated);
        assert!(client.conversation_id().is_none());

        let client = ChatGpt::with_options(
            credentials(),
            Some("http://127.0.0.1:8080".to_string()),
            Some(Duration::from_secs(30)),
        )
        .unwrap();
        assert_eq!(client.base_url, "http://127.0.0.1:8080/");
        assert_eq!(client.timeout, Duration::from_secs(30));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err =
            ChatGpt::with_options(credentials(), Some("not a url".to_string()), None).unwrap_err();
        assert!(matches!(err, Error::Url { .. }));
    }

    #[test]
    fn invalid_proxy_is_rejected() {
        let err = ChatGpt::new(credentials().with_proxy("\u{0}")).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn classify_token_rejection() {
        let err = classify_error_body(401, r#"{"detail": {"code": "token_expired"}}"#);
        assert!(err.is_authentication());

        let err = classify_error_body(401, r#"{"detail": {"code": "invalid_api_key"}}"#);
        assert!(err.is_authentication());

        // The status code carries no signal; the body shape decides.
        let err = classify_error_body(200, r#"{"detail": {"code": "token_expired"}}"#);
        assert!(err.is_authentication());
    }

    #[test]
    fn classify_other_api_errors() {
        let err = classify_error_body(429, r#"{"detail": "Too many requests"}"#);
        assert_eq!(err.status_code(), Some(429));

        let err = classify_error_body(403, r#"{"detail": {"code": "account_deactivated"}}"#);
        assert_eq!(err.code(), Some("account_deactivated"));
        assert!(!err.is_authentication());
    }

    #[test]
    fn classify_uninterpretable_body() {
        let err = classify_error_body(502, "<html>Bad Gateway</html>");
        assert!(err.is_protocol());
    }

    #[test]
    fn buffered_body_takes_last_reply_line() {
        let body = concat!(
            "data: {\"message\": {\"id\": \"m1\", \"content\": {\"content_type\": \"text\", \"parts\": [\"par\"]}}, \"conversation_id\": \"c1\"}\n",
            "data: {\"message\": {\"id\": \"m1\", \"content\": {\"content_type\": \"text\", \"parts\": [\"partial and final\"]}}, \"conversation_id\": \"c1\"}\n",
            "data: [DONE]\n",
        );
        let reply = parse_buffered_body(body).unwrap();
        assert_eq!(reply.text, "partial and final");
        assert_eq!(reply.conversation_id, "c1");
        assert_eq!(reply.message_id, "m1");
    }

    #[test]
    fn buffered_body_without_reply_is_protocol_error() {
        assert!(parse_buffered_body("").unwrap_err().is_protocol());
        assert!(
            parse_buffered_body("data: [DONE]\n")
                .unwrap_err()
                .is_protocol()
        );
        assert!(
            parse_buffered_body("<html>Service maintenance</html>")
                .unwrap_err()
                .is_protocol()
        );
    }

    #[test]
    fn model_can_be_changed() {
        let mut client = ChatGpt::new(credentials()).unwrap();
        client.set_model(Model::from("gpt-4"));
        assert_eq!(client.model().to_string(), "gpt-4");
    }
}
