use serde_json::{Map, Value};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use super::dto::{
    ConcernSeverity, IntakeFormDetail, IntakeFormPage, IntakeFormPatch, IntakeProgress, IntakeStatus,
    Symptom, TraumaResponse,
};
use super::repo;
use super::repo_types::{IntakeForm, ScreeningModuleRecord};
use crate::error::{AppError, AppResult};
use crate::screening::{ModuleType, ScoredModule, ScreeningResponses};

const FORM_NOT_FOUND: &str = "Intake form not found";

/// What the intake answers suggest screening for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiskSignals {
    pub low_mood: bool,
    pub anxiety: bool,
    pub trauma: bool,
}

impl RiskSignals {
    pub fn from_form(form: &IntakeForm) -> Self {
        Self {
            low_mood: form.has_symptom(Symptom::SadnessDepression)
                || form.severity_is(ConcernSeverity::Severe)
                || form.severity_is(ConcernSeverity::Crisis),
            anxiety: form.has_symptom(Symptom::AnxietyWorry)
                || form.has_symptom(Symptom::PanicAttacks),
            trauma: form.trauma_is(TraumaResponse::Yes) || form.has_symptom(Symptom::TraumaPtsd),
        }
    }
}

/// Scored instruments worth taking next, minus the ones already submitted.
pub fn recommend(signals: RiskSignals, taken: &[&str]) -> Vec<ModuleType> {
    [
        (signals.low_mood, ModuleType::Phq9),
        (signals.anxiety, ModuleType::Gad7),
        (signals.trauma, ModuleType::PcPtsd5),
    ]
    .into_iter()
    .filter(|(wanted, module)| *wanted && module.is_scored() && !taken.contains(&module.as_str()))
    .map(|(_, module)| module)
    .collect()
}

pub fn status_of(form: Option<&IntakeForm>) -> IntakeStatus {
    match form {
        None => IntakeStatus {
            needs_intake: true,
            has_form: false,
            is_complete: false,
            completion_percentage: 0,
            intake_form_id: None,
        },
        Some(form) => IntakeStatus {
            needs_intake: !form.is_complete,
            has_form: true,
            is_complete: form.is_complete,
            completion_percentage: form.completion_percentage(),
            intake_form_id: Some(form.id),
        },
    }
}

pub async fn recommended_modules(db: &PgPool, form: &IntakeForm) -> AppResult<Vec<ModuleType>> {
    let taken = repo::list_modules(db, form.id).await?;
    let taken: Vec<&str> = taken.iter().map(|m| m.module_type.as_str()).collect();
    Ok(recommend(RiskSignals::from_form(form), &taken))
}

pub async fn create_form(db: &PgPool, user_id: Uuid) -> AppResult<IntakeForm> {
    if repo::find_by_user(db, user_id).await?.is_some() {
        return Err(AppError::Conflict("Intake form already exists for this user".into()));
    }
    let form = repo::create(db, user_id).await?;
    info!(%user_id, form_id = %form.id, "intake form created");
    Ok(form)
}

/// Outcome of `start`: the form the user already had, or a fresh one.
pub enum Started {
    Existing(IntakeForm),
    Created(IntakeForm),
}

pub async fn start(db: &PgPool, user_id: Uuid) -> AppResult<Started> {
    match repo::find_by_user(db, user_id).await? {
        Some(form) => Ok(Started::Existing(form)),
        None => Ok(Started::Created(create_form(db, user_id).await?)),
    }
}

pub async fn get(db: &PgPool, user_id: Uuid) -> AppResult<IntakeForm> {
    repo::find_by_user(db, user_id)
        .await?
        .ok_or_else(|| AppError::not_found(FORM_NOT_FOUND))
}

pub async fn update(db: &PgPool, user_id: Uuid, body: IntakeFormPatch) -> AppResult<IntakeForm> {
    let (patch, section) = body.into_patch()?;
    if patch.is_empty() && section.is_none() {
        return Err(AppError::validation("No fields to update"));
    }

    let form = repo::update(db, user_id, patch, section)
        .await?
        .ok_or_else(|| AppError::not_found(FORM_NOT_FOUND))?;

    info!(%user_id, section = ?section.map(|s| s.as_str()), "intake form updated");
    Ok(form)
}

/// Completes the form once every section is done.
pub async fn complete(db: &PgPool, user_id: Uuid) -> AppResult<IntakeForm> {
    let current = get(db, user_id).await?;
    let progress = &current.section_progress;
    if progress.percentage() < 100 {
        warn!(%user_id, pending = progress.pending().len(), "intake completion refused");
        return Err(AppError::Incomplete {
            completion_percentage: progress.percentage(),
            pending_sections: progress.pending(),
        });
    }

    let form = repo::complete(db, user_id)
        .await?
        .ok_or_else(|| AppError::not_found(FORM_NOT_FOUND))?;
    info!(%user_id, form_id = %form.id, "intake form completed");
    Ok(form)
}

pub async fn progress(db: &PgPool, user_id: Uuid) -> AppResult<IntakeProgress> {
    let form = get(db, user_id).await?;
    let recommended_modules = recommended_modules(db, &form).await?;
    Ok(IntakeProgress {
        user_id,
        completion_percentage: form.completion_percentage(),
        completed_sections: form.section_progress.completed(),
        pending_sections: form.section_progress.pending(),
        recommended_modules,
    })
}

pub async fn status(db: &PgPool, user_id: Uuid) -> AppResult<IntakeStatus> {
    let form = repo::find_by_user(db, user_id).await?;
    Ok(status_of(form.as_ref()))
}

/// Scores the answers server-side and stores them against the user's form.
pub async fn submit_module(
    db: &PgPool,
    user_id: Uuid,
    module_type: ModuleType,
    responses: &Map<String, Value>,
) -> AppResult<(ScreeningModuleRecord, ScoredModule)> {
    let parsed = ScreeningResponses::parse(module_type, responses)?;
    let scored = parsed.scored();

    let form = repo::find_by_user(db, user_id).await?.ok_or_else(|| {
        AppError::not_found("Intake form not found. Please complete intake form first.")
    })?;

    let record = repo::upsert_module(
        db,
        form.id,
        user_id,
        module_type.as_str(),
        parsed.to_json(),
        scored.score,
        scored.severity.as_str(),
    )
    .await?;

    info!(
        %user_id,
        module = module_type.as_str(),
        score = scored.score,
        severity = scored.severity.as_str(),
        "screening module scored"
    );
    Ok((record, scored))
}

pub async fn modules(db: &PgPool, user_id: Uuid) -> AppResult<(Vec<ScreeningModuleRecord>, Vec<ModuleType>)> {
    let form = get(db, user_id).await?;
    let completed = repo::list_modules(db, form.id).await?;
    let taken: Vec<&str> = completed.iter().map(|m| m.module_type.as_str()).collect();
    let recommended = recommend(RiskSignals::from_form(&form), &taken);
    Ok((completed, recommended))
}

pub async fn list_forms(db: &PgPool, page: i64, limit: i64) -> AppResult<IntakeFormPage> {
    let offset = (page - 1)
        .checked_mul(limit)
        .ok_or_else(|| AppError::validation("Page out of range"))?;
    let (intake_forms, total) = repo::list(db, limit, offset).await?;
    Ok(IntakeFormPage {
        intake_forms,
        total,
        page,
        limit,
    })
}

pub async fn form_detail(db: &PgPool, id: Uuid) -> AppResult<IntakeFormDetail> {
    let form = repo::find_by_id(db, id)
        .await?
        .ok_or_else(|| AppError::not_found(FORM_NOT_FOUND))?;
    let screening_modules = repo::list_modules(db, form.id).await?;
    let taken: Vec<&str> = screening_modules.iter().map(|m| m.module_type.as_str()).collect();
    let recommended_modules = recommend(RiskSignals::from_form(&form), &taken);
    Ok(IntakeFormDetail {
        completion_percentage: form.completion_percentage(),
        intake_form: form,
        recommended_modules,
        screening_modules,
    })
}

pub async fn delete_form(db: &PgPool, id: Uuid, deleted_by: Uuid) -> AppResult<()> {
    if !repo::delete(db, id).await? {
        return Err(AppError::not_found(FORM_NOT_FOUND));
    }
    info!(form_id = %id, %deleted_by, "intake form deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn huge_page_is_rejected_before_querying() {
        let state = crate::state::AppState::fake();
        let err = list_forms(&state.db, i64::MAX, 50).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn no_signals_no_recommendations() {
        assert!(recommend(RiskSignals::default(), &[]).is_empty());
    }

    #[test]
    fn signals_map_to_instruments_in_order() {
        let signals = RiskSignals {
            low_mood: true,
            anxiety: true,
            trauma: true,
        };
        assert_eq!(
            recommend(signals, &[]),
            vec![ModuleType::Phq9, ModuleType::Gad7, ModuleType::PcPtsd5]
        );
    }

    #[test]
    fn taken_modules_are_excluded() {
        let signals = RiskSignals {
            low_mood: true,
            anxiety: true,
            trauma: false,
        };
        assert_eq!(recommend(signals, &["PHQ-9"]), vec![ModuleType::Gad7]);
    }

    #[test]
    fn missing_form_needs_intake() {
        let status = status_of(None);
        assert!(status.needs_intake);
        assert!(!status.has_form);
        assert_eq!(status.completion_percentage, 0);
        let json = serde_json::to_value(&status).unwrap();
        assert!(json.get("intake_form_id").is_none());
    }
}
