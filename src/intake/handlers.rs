use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde_json::Value;
use tracing::instrument;
use uuid::Uuid;

use super::dto::{
    IntakeFormDetail, IntakeFormPage, IntakeFormPatch, IntakeFormResponse, IntakeProgress,
    IntakeStatus, MessageResponse, ModuleSubmitted, ModulesOverview, PageQuery, RecommendedModules,
    SectionReport, SubmitModuleRequest, ValidateSectionRequest,
};
use super::sections::IntakeSection;
use super::services::{self as intake, Started};
use super::validation::validate_section;
use crate::{
    auth::{
        extractors::AuthUser,
        permissions::{require_permission, Permission},
    },
    extract::{Json, Path, Query},
    error::{AppError, AppResult},
    screening::{interpretation, ModuleType},
    state::AppState,
};

pub fn client_routes() -> Router<AppState> {
    Router::new()
        .route("/intake", get(get_form).put(update_form))
        .route("/intake/start", post(start_form))
        .route("/intake/complete", post(complete_form))
        .route("/intake/progress", get(progress))
        .route("/intake/status", get(status))
        .route("/intake/validate", post(validate))
        .route("/intake/modules", get(list_modules))
        .route("/intake/modules/recommended", get(recommended))
        .route("/intake/modules/:module_type", post(submit_module))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/intake/admin/all", get(admin_list))
        .route("/intake/admin/:id", get(admin_get).delete(admin_delete))
}

#[instrument(skip(state, user))]
pub async fn start_form(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<(StatusCode, Json<IntakeFormResponse>)> {
    match intake::start(&state.db, user.id).await? {
        Started::Existing(form) => {
            let recommended_modules = intake::recommended_modules(&state.db, &form).await?;
            Ok((
                StatusCode::OK,
                Json(IntakeFormResponse {
                    message: Some("Intake form already exists"),
                    completion_percentage: form.completion_percentage(),
                    intake_form: form,
                    recommended_modules,
                }),
            ))
        }
        Started::Created(form) => Ok((
            StatusCode::CREATED,
            Json(IntakeFormResponse {
                message: Some("Intake form initialized successfully"),
                completion_percentage: 0,
                intake_form: form,
                recommended_modules: Vec::new(),
            }),
        )),
    }
}

#[instrument(skip(state, user))]
pub async fn get_form(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<IntakeFormResponse>> {
    let form = intake::get(&state.db, user.id).await?;
    let recommended_modules = intake::recommended_modules(&state.db, &form).await?;
    Ok(Json(IntakeFormResponse {
        message: None,
        completion_percentage: form.completion_percentage(),
        intake_form: form,
        recommended_modules,
    }))
}

#[instrument(skip(state, user, body))]
pub async fn update_form(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<Value>,
) -> AppResult<Json<IntakeFormResponse>> {
    let patch = IntakeFormPatch::from_json(body)?;
    let form = intake::update(&state.db, user.id, patch).await?;
    let recommended_modules = intake::recommended_modules(&state.db, &form).await?;
    Ok(Json(IntakeFormResponse {
        message: Some("Intake form updated successfully"),
        completion_percentage: form.completion_percentage(),
        intake_form: form,
        recommended_modules,
    }))
}

#[instrument(skip(state, user))]
pub async fn complete_form(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<IntakeFormResponse>> {
    let form = intake::complete(&state.db, user.id).await?;
    let recommended_modules = intake::recommended_modules(&state.db, &form).await?;
    Ok(Json(IntakeFormResponse {
        message: Some("Intake form completed successfully"),
        completion_percentage: 100,
        intake_form: form,
        recommended_modules,
    }))
}

#[instrument(skip(state, user))]
pub async fn progress(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<IntakeProgress>> {
    Ok(Json(intake::progress(&state.db, user.id).await?))
}

#[instrument(skip(state, user))]
pub async fn status(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<IntakeStatus>> {
    Ok(Json(intake::status(&state.db, user.id).await?))
}

#[instrument(skip_all)]
pub async fn validate(
    AuthUser(_user): AuthUser,
    Json(req): Json<ValidateSectionRequest>,
) -> AppResult<Json<SectionReport>> {
    let (Some(section), Some(data)) = (req.section_name, req.data) else {
        return Err(AppError::validation("Section name and data are required"));
    };
    let section: IntakeSection = section.parse()?;
    Ok(Json(validate_section(section, &data)))
}

#[instrument(skip(state, user, req))]
pub async fn submit_module(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(module_type): Path<String>,
    Json(req): Json<SubmitModuleRequest>,
) -> AppResult<(StatusCode, Json<ModuleSubmitted>)> {
    let module_type: ModuleType = module_type.parse()?;
    let (module, scored) =
        intake::submit_module(&state.db, user.id, module_type, &req.responses).await?;
    Ok((
        StatusCode::CREATED,
        Json(ModuleSubmitted {
            message: "Screening module submitted successfully",
            module,
            interpretation: interpretation::interpretation(scored.module_type, scored.severity),
            recommendations: interpretation::recommendations(scored.module_type, scored.severity),
        }),
    ))
}

#[instrument(skip(state, user))]
pub async fn list_modules(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<ModulesOverview>> {
    let (completed_modules, recommended_modules) = intake::modules(&state.db, user.id).await?;
    Ok(Json(ModulesOverview {
        total_completed: completed_modules.len(),
        total_recommended: recommended_modules.len(),
        completed_modules,
        recommended_modules,
    }))
}

#[instrument(skip(state, user))]
pub async fn recommended(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<RecommendedModules>> {
    let (_, recommended_modules) = intake::modules(&state.db, user.id).await?;
    Ok(Json(RecommendedModules {
        total: recommended_modules.len(),
        recommended_modules,
    }))
}

#[instrument(skip(state, user))]
pub async fn admin_list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(q): Query<PageQuery>,
) -> AppResult<Json<IntakeFormPage>> {
    require_permission(&state.db, &user, Permission::UsersRead).await?;
    let (page, limit) = q.resolve();
    Ok(Json(intake::list_forms(&state.db, page, limit).await?))
}

#[instrument(skip(state, user))]
pub async fn admin_get(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<IntakeFormDetail>> {
    require_permission(&state.db, &user, Permission::UsersRead).await?;
    Ok(Json(intake::form_detail(&state.db, id).await?))
}

#[instrument(skip(state, user))]
pub async fn admin_delete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    require_permission(&state.db, &user, Permission::UsersDelete).await?;
    intake::delete_form(&state.db, id, user.id).await?;
    Ok(Json(MessageResponse {
        message: "Intake form deleted successfully",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    fn app() -> Router {
        client_routes()
            .merge(admin_routes())
            .with_state(AppState::fake())
    }

    #[tokio::test]
    async fn intake_routes_require_a_token() {
        for (method, uri) in [
            ("GET", "/intake"),
            ("PUT", "/intake"),
            ("POST", "/intake/start"),
            ("POST", "/intake/complete"),
            ("GET", "/intake/progress"),
            ("GET", "/intake/status"),
            ("GET", "/intake/modules"),
            ("GET", "/intake/modules/recommended"),
            ("POST", "/intake/modules/PHQ-9"),
            ("GET", "/intake/admin/all"),
        ] {
            let req = Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap();
            let res = app().oneshot(req).await.unwrap();
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn malformed_token_is_forbidden() {
        let req = Request::get("/intake/status")
            .header("authorization", "Bearer abc.def.ghi")
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }
}
