use uuid::Uuid;

/// Generate a fresh message identifier.
///
/// The backend expects every message in a conversation, including the
/// synthetic parent of the first one, to be identified by a random UUID.
pub fn message_id() -> String {
    Uuid::new_v4().to_string()
}
