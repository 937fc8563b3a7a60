use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::Conversation;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub conversation_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

impl ListQuery {
    /// Defaults to 50 rows, never more than 200.
    pub fn limit(&self) -> i64 {
        self.limit.filter(|l| *l > 0).unwrap_or(50).min(200)
    }
}

#[derive(Debug, Serialize)]
pub struct ConversationList {
    pub conversations: Vec<Conversation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_caps() {
        assert_eq!(ListQuery { limit: None }.limit(), 50);
        assert_eq!(ListQuery { limit: Some(-3) }.limit(), 50);
        assert_eq!(ListQuery { limit: Some(10) }.limit(), 10);
        assert_eq!(ListQuery { limit: Some(5000) }.limit(), 200);
    }
}
