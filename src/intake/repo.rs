use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{IntakeForm, ScreeningModuleRecord};
use super::sections::{IntakeSection, SectionProgress};
use crate::error::{AppError, AppResult};
use crate::patch::Patch;

pub async fn create(db: &PgPool, user_id: Uuid) -> Result<IntakeForm, sqlx::Error> {
    sqlx::query_as::<_, IntakeForm>(
        "INSERT INTO client_intake_forms (user_id) VALUES ($1) RETURNING *",
    )
    .bind(user_id)
    .fetch_one(db)
    .await
}

pub async fn find_by_user(db: &PgPool, user_id: Uuid) -> Result<Option<IntakeForm>, sqlx::Error> {
    sqlx::query_as::<_, IntakeForm>("SELECT * FROM client_intake_forms WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<IntakeForm>, sqlx::Error> {
    sqlx::query_as::<_, IntakeForm>("SELECT * FROM client_intake_forms WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Applies `patch` to the user's form and flags `section` as done.
/// The row is locked while `section_progress` is read and rewritten.
pub async fn update(
    db: &PgPool,
    user_id: Uuid,
    mut patch: Patch,
    section: Option<IntakeSection>,
) -> AppResult<Option<IntakeForm>> {
    let mut tx = db.begin().await?;

    let progress = sqlx::query_scalar::<_, Json<SectionProgress>>(
        "SELECT section_progress FROM client_intake_forms WHERE user_id = $1 FOR UPDATE",
    )
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(Json(mut progress)) = progress else {
        return Ok(None);
    };

    if let Some(section) = section {
        progress.mark(section);
        let stored = serde_json::to_value(&progress).map_err(AppError::internal)?;
        patch.set("section_progress", stored);
    }

    let mut query = patch.into_update("client_intake_forms", "user_id", user_id);
    let form = query
        .build_query_as::<IntakeForm>()
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(Some(form))
}

/// Marks the form complete and mirrors the state onto the owner.
pub async fn complete(db: &PgPool, user_id: Uuid) -> Result<Option<IntakeForm>, sqlx::Error> {
    let mut tx = db.begin().await?;

    let form = sqlx::query_as::<_, IntakeForm>(
        r#"
        UPDATE client_intake_forms
        SET is_complete = true, completed_at = COALESCE(completed_at, now()), updated_at = now()
        WHERE user_id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(form) = form else {
        return Ok(None);
    };

    sqlx::query(
        r#"
        UPDATE users
        SET intake_form_completed = true, intake_form_id = $1, updated_at = now()
        WHERE id = $2
        "#,
    )
    .bind(form.id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Some(form))
}

/// Deletes the form (modules cascade) and resets the owner. False when no
/// form has that id.
pub async fn delete(db: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let mut tx = db.begin().await?;

    let owner = sqlx::query_scalar::<_, Uuid>(
        "DELETE FROM client_intake_forms WHERE id = $1 RETURNING user_id",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(owner) = owner else {
        return Ok(false);
    };

    sqlx::query(
        r#"
        UPDATE users
        SET intake_form_completed = false, intake_form_id = NULL, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(owner)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(true)
}

pub async fn list(db: &PgPool, limit: i64, offset: i64) -> Result<(Vec<IntakeForm>, i64), sqlx::Error> {
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM client_intake_forms")
        .fetch_one(db)
        .await?;

    let forms = sqlx::query_as::<_, IntakeForm>(
        r#"
        SELECT * FROM client_intake_forms
        ORDER BY created_at DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;

    Ok((forms, total))
}

/// Inserts the scored module or overwrites an earlier submission of the same type.
pub async fn upsert_module(
    db: &PgPool,
    intake_form_id: Uuid,
    user_id: Uuid,
    module_type: &str,
    responses: Value,
    score: i32,
    severity_level: &str,
) -> Result<ScreeningModuleRecord, sqlx::Error> {
    sqlx::query_as::<_, ScreeningModuleRecord>(
        r#"
        INSERT INTO intake_screening_modules
            (intake_form_id, user_id, module_type, responses, score, severity_level)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT ON CONSTRAINT uq_screening_form_module DO UPDATE
        SET user_id = EXCLUDED.user_id,
            responses = EXCLUDED.responses,
            score = EXCLUDED.score,
            severity_level = EXCLUDED.severity_level,
            completed_at = now()
        RETURNING *
        "#,
    )
    .bind(intake_form_id)
    .bind(user_id)
    .bind(module_type)
    .bind(responses)
    .bind(score)
    .bind(severity_level)
    .fetch_one(db)
    .await
}

pub async fn list_modules(db: &PgPool, intake_form_id: Uuid) -> Result<Vec<ScreeningModuleRecord>, sqlx::Error> {
    sqlx::query_as::<_, ScreeningModuleRecord>(
        r#"
        SELECT * FROM intake_screening_modules
        WHERE intake_form_id = $1
        ORDER BY completed_at DESC
        "#,
    )
    .bind(intake_form_id)
    .fetch_all(db)
    .await
}
