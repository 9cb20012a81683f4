use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// The body returned by the session endpoint for a live session.
///
/// The endpoint returns additional user-profile fields; only the token
/// and its expiry matter here.  A dead session comes back as an empty
/// object, which fails to deserialize into this type; callers check for
/// that case first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionInfo {
    /// The bearer token for the conversation endpoint.
    #[serde(rename = "accessToken")]
    pub access_token: String,

    /// When the session expires, if reported.
    #[serde(
        default,
        with = "crate::utils::time::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires: Option<OffsetDateTime>,
}
