use serde::{Deserialize, Serialize};

/// Error codes the backend uses for a rejected or expired token.
const TOKEN_REJECTION_CODES: &[&str] = &["invalid_api_key", "token_expired"];

/// The JSON body the backend sends with non-success statuses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiErrorBody {
    /// The error detail; a structured object or a bare string.
    pub detail: ErrorDetail,
}

/// The `detail` field of an error body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ErrorDetail {
    /// A structured error with a machine-readable code.
    Structured {
        /// Machine-readable error code, e.g. `"token_expired"`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,

        /// Human-readable error message.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// A bare error string, e.g. rate-limit notices.
    Message(String),
}

impl ApiErrorBody {
    /// The machine-readable error code, if the backend sent one.
    pub fn code(&self) -> Option<&str> {
        match &self.detail {
            ErrorDetail::Structured { code, .. } => code.as_deref(),
            ErrorDetail::Message(_) => None,
        }
    }

    /// Best-effort human-readable description.
    pub fn message(&self) -> String {
        match &self.detail {
            ErrorDetail::Structured { code, message } => message
                .clone()
                .or_else(|| code.clone())
                .unwrap_or_else(|| "unspecified error".to_string()),
            ErrorDetail::Message(message) => message.clone(),
        }
    }

    /// Returns true when the backend rejected the access token, which
    /// means a session refresh may fix the request.
    pub fn is_token_rejection(&self) -> bool {
        self.code()
            .map(|code| TOKEN_REJECTION_CODES.contains(&code))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn structured_detail() {
        let json = json!({
            "detail": { "code": "token_expired", "message": "Your token has expired" }
        });
        let body: ApiErrorBody = serde_json::from_value(json).unwrap();
        assert_eq!(body.code(), Some("token_expired"));
        assert_eq!(body.message(), "Your token has expired");
        assert!(body.is_token_rejection());
    }

    #[test]
    fn invalid_api_key_is_token_rejection() {
        let json = json!({ "detail": { "code": "invalid_api_key" } });
        let body: ApiErrorBody = serde_json::from_value(json).unwrap();
        assert!(body.is_token_rejection());
        assert_eq!(body.message(), "invalid_api_key");
    }

    #[test]
    fn bare_string_detail() {
        let json = json!({ "detail": "Too many requests in 1 hour. Try again later." });
        let body: ApiErrorBody = serde_json::from_value(json).unwrap();
        assert_eq!(body.code(), None);
        assert!(!body.is_token_rejection());
        assert_eq!(body.message(), "Too many requests in 1 hour. Try again later.");
    }

    #[test]
    fn other_codes_are_not_token_rejections() {
        let json = json!({ "detail": { "code": "account_deactivated" } });
        let body: ApiErrorBody = serde_json::from_value(json).unwrap();
        assert!(!body.is_token_rejection());
    }

    #[test]
    fn missing_detail_fails() {
        let json = json!({ "error": "nope" });
        assert!(serde_json::from_value::<ApiErrorBody>(json).is_err());
    }
}
