use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use super::client::AiClient;
use super::dto::ChatReply;
use super::repo::{self, Conversation};
use crate::error::{AppError, AppResult};

/// Relays one message to the AI service with recent history and stores the turn.
/// Nothing is written when the AI call fails.
pub async fn send_message(
    db: &PgPool,
    ai: &dyn AiClient,
    history_turns: i64,
    user_id: Uuid,
    message: &str,
) -> AppResult<ChatReply> {
    let message = message.trim();
    if message.is_empty() {
        return Err(AppError::validation("Message is required"));
    }

    let history = repo::recent_history(db, user_id, history_turns).await?;
    let response = ai.generate_response(message, &history).await.map_err(|e| {
        warn!(%user_id, error = %e, "chat turn not stored");
        e
    })?;

    let saved = repo::insert(db, user_id, message, &response).await?;
    info!(%user_id, conversation_id = %saved.id, history = history.len(), "chat turn stored");

    Ok(ChatReply {
        response: saved.ai_response,
        conversation_id: saved.id,
        timestamp: saved.timestamp,
        user_id,
    })
}

pub async fn user_conversations(db: &PgPool, user_id: Uuid, limit: i64) -> AppResult<Vec<Conversation>> {
    Ok(repo::list_for_user(db, user_id, limit).await?)
}

pub async fn all_conversations(db: &PgPool, limit: i64) -> AppResult<Vec<Conversation>> {
    Ok(repo::list_all(db, limit).await?)
}
