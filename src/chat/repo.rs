use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::client::HistoryTurn;

/// One stored chat turn. `username` is only filled by the listing queries.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub user_message: String,
    pub ai_response: String,
    pub user_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

pub async fn insert(
    db: &PgPool,
    user_id: Uuid,
    user_message: &str,
    ai_response: &str,
) -> Result<Conversation, sqlx::Error> {
    sqlx::query_as::<_, Conversation>(
        r#"
        INSERT INTO conversations (user_message, ai_response, user_id)
        VALUES ($1, $2, $3)
        RETURNING id, user_message, ai_response, user_id, timestamp
        "#,
    )
    .bind(user_message)
    .bind(ai_response)
    .bind(user_id)
    .fetch_one(db)
    .await
}

/// The user's last `turns` exchanges, oldest first.
pub async fn recent_history(db: &PgPool, user_id: Uuid, turns: i64) -> Result<Vec<HistoryTurn>, sqlx::Error> {
    if turns <= 0 {
        return Ok(Vec::new());
    }
    let mut rows = sqlx::query_as::<_, (String, String)>(
        r#"
        SELECT user_message, ai_response
        FROM conversations
        WHERE user_id = $1
        ORDER BY timestamp DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(turns)
    .fetch_all(db)
    .await?;
    rows.reverse();
    Ok(rows
        .into_iter()
        .map(|(user_message, ai_response)| HistoryTurn {
            user_message,
            ai_response,
        })
        .collect())
}

pub async fn list_for_user(db: &PgPool, user_id: Uuid, limit: i64) -> Result<Vec<Conversation>, sqlx::Error> {
    sqlx::query_as::<_, Conversation>(
        r#"
        SELECT c.id, c.user_message, c.ai_response, c.user_id, c.timestamp, u.username
        FROM conversations c
        LEFT JOIN users u ON u.id = c.user_id
        WHERE c.user_id = $1
        ORDER BY c.timestamp DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(db)
    .await
}

pub async fn list_all(db: &PgPool, limit: i64) -> Result<Vec<Conversation>, sqlx::Error> {
    sqlx::query_as::<_, Conversation>(
        r#"
        SELECT c.id, c.user_message, c.ai_response, c.user_id, c.timestamp, u.username
        FROM conversations c
        LEFT JOIN users u ON u.id = c.user_id
        ORDER BY c.timestamp DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(db)
    .await
}
