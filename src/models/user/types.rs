use serde::Serialize;
use uuid::Uuid;

/// Minimal identity block attached to messages, participants and conversation lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserSummary {
    /// Stand-in for a sender whose account no longer resolves.
    pub fn deleted(id: Uuid) -> Self {
        UserSummary {
            id,
            name: "Deleted user".to_string(),
            email: None,
        }
    }
}
