use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Environment variable consulted for the session token.
pub const ENV_SESSION_TOKEN: &str = "GEPPETTO_SESSION_TOKEN";
/// Environment variable consulted for the account email.
pub const ENV_EMAIL: &str = "GEPPETTO_EMAIL";
/// Environment variable consulted for the account password.
pub const ENV_PASSWORD: &str = "GEPPETTO_PASSWORD";
/// Environment variable consulted for a pre-established bearer token.
pub const ENV_ACCESS_TOKEN: &str = "GEPPETTO_ACCESS_TOKEN";
/// Environment variable consulted for the proxy URL.
pub const ENV_PROXY: &str = "GEPPETTO_PROXY";

/// Credentials configured by the user.
///
/// Every field is optional; which fields are present determines how a
/// session gets established.  Validation is deferred until a session is
/// actually needed, so a half-filled configuration only fails when it is
/// used.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Credentials {
    /// A `__Secure-next-auth.session-token` cookie value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,

    /// Account email, used together with `password`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Account password, used together with `email`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// A pre-established bearer access token.
    #[serde(default, rename = "Authorization", skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Proxy URL for all backend traffic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
}

/// The credential shape selected by [`Credentials::resolve`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credential {
    /// Exchange a session-token cookie for an access token.
    SessionToken(String),

    /// Log in with email and password.
    EmailPassword {
        /// Account email.
        email: String,
        /// Account password.
        password: String,
    },

    /// Use a pre-established bearer token as-is.
    AccessToken(String),
}

impl Credentials {
    /// Create an empty credential set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the session token.
    pub fn with_session_token(mut self, session_token: impl Into<String>) -> Self {
        self.session_token = Some(session_token.into());
        self
    }

    /// Set the email and password pair.
    pub fn with_email_password(
        mut self,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.email = Some(email.into());
        self.password = Some(password.into());
        self
    }

    /// Set a pre-established bearer access token.
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    /// Set the proxy URL.
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Load credentials from a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|err| {
            Error::io(format!("could not read {}", path.display()), err)
        })?;
        let credentials = serde_json::from_str(&contents)?;
        Ok(credentials)
    }

    /// Load credentials from `GEPPETTO_*` environment variables.
    ///
    /// Unset variables leave the corresponding field absent.
    pub fn from_env() -> Self {
        fn var(name: &str) -> Option<String> {
            std::env::var(name).ok()
        }
        Credentials {
            session_token: var(ENV_SESSION_TOKEN),
            email: var(ENV_EMAIL),
            password: var(ENV_PASSWORD),
            access_token: var(ENV_ACCESS_TOKEN),
            proxy: var(ENV_PROXY),
        }
    }

    /// Select the highest-priority usable credential.
    ///
    /// Session token beats email/password beats bearer token.  Fields set
    /// to the empty string count as absent.
    pub fn resolve(&self) -> Option<Credential> {
        if let Some(session_token) = non_empty(&self.session_token) {
            return Some(Credential::SessionToken(session_token.to_string()));
        }
        if let (Some(email), Some(password)) =
            (non_empty(&self.email), non_empty(&self.password))
        {
            return Some(Credential::EmailPassword {
                email: email.to_string(),
                password: password.to_string(),
            });
        }
        if let Some(access_token) = non_empty(&self.access_token) {
            return Some(Credential::AccessToken(access_token.to_string()));
        }
        None
    }

    /// Returns true if a usable email/password pair is present.
    pub fn has_email_password(&self) -> bool {
        non_empty(&self.email).is_some() && non_empty(&self.password).is_some()
    }

    /// Returns the email/password pair, if usable.
    pub fn email_password(&self) -> Option<(&str, &str)> {
        match (non_empty(&self.email), non_empty(&self.password)) {
            (Some(email), Some(password)) => Some((email, password)),
            _ => None,
        }
    }

    /// Returns the proxy URL, if usable.
    pub fn proxy(&self) -> Option<&str> {
        non_empty(&self.proxy)
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}
