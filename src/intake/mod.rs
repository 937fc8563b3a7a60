//! Client intake questionnaire: ten sections saved incrementally, completion
//! tracking, screening submissions and the admin views over all forms.

pub mod dto;
pub mod handlers;
mod repo;
pub mod repo_types;
pub mod sections;
pub mod services;
mod validation;

use axum::Router;
use time::format_description::FormatItem;
use time::macros::format_description;

use crate::state::AppState;

const ISO_DATE: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::client_routes())
        .merge(handlers::admin_routes())
}

#[cfg(test)]
mod flow_tests {
    use serde_json::json;
    use sqlx::PgPool;

    use super::dto::IntakeFormPatch;
    use super::sections::IntakeSection;
    use super::services;
    use crate::auth::repo_types::{Role, User};
    use crate::auth::services::{create_user, CreateUser};
    use crate::error::AppError;
    use crate::screening::ModuleType;

    async fn client(db: &PgPool) -> User {
        create_user(
            db,
            CreateUser {
                username: "robin".into(),
                email: "robin@example.com".into(),
                password: "secret1".into(),
                first_name: None,
                last_name: None,
                role: Role::User,
            },
            None,
        )
        .await
        .unwrap()
    }

    fn patch(body: serde_json::Value) -> IntakeFormPatch {
        IntakeFormPatch::from_json(body).unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn intake_lifecycle(db: PgPool) {
        let user = client(&db).await;

        let status = services::status(&db, user.id).await.unwrap();
        assert!(status.needs_intake && !status.has_form);

        let form = services::create_form(&db, user.id).await.unwrap();
        assert_eq!(form.completion_percentage(), 0);
        assert!(matches!(
            services::create_form(&db, user.id).await,
            Err(AppError::Conflict(_))
        ));

        let form = services::update(
            &db,
            user.id,
            patch(json!({
                "section_name": "current_symptoms",
                "current_symptoms": ["Sadness/Depression", "Anxiety/Worry"]
            })),
        )
        .await
        .unwrap();
        assert_eq!(form.completion_percentage(), 10);

        let progress = services::progress(&db, user.id).await.unwrap();
        assert_eq!(progress.completed_sections, vec!["current_symptoms"]);
        assert_eq!(
            progress.recommended_modules,
            vec![ModuleType::Phq9, ModuleType::Gad7]
        );

        assert!(matches!(
            services::complete(&db, user.id).await,
            Err(AppError::Incomplete { completion_percentage: 10, .. })
        ));

        let answers = json!({ "q1": "3", "q2": "3", "q3": "3", "q4": "3", "q5": "3", "q6": "3", "q7": "0", "q8": "0", "q9": "0" });
        let (record, scored) = services::submit_module(&db, user.id, ModuleType::Phq9, answers.as_object().unwrap())
            .await
            .unwrap();
        assert_eq!(record.score, 18);
        assert_eq!(scored.severity.as_str(), "Moderately Severe");

        let (_, recommended) = services::modules(&db, user.id).await.unwrap();
        assert_eq!(recommended, vec![ModuleType::Gad7]);

        for section in IntakeSection::ALL {
            services::update(&db, user.id, patch(json!({ "section_name": section.as_str() })))
                .await
                .unwrap();
        }
        let form = services::complete(&db, user.id).await.unwrap();
        assert!(form.is_complete);

        let owner = User::find_by_id(&db, user.id).await.unwrap().unwrap();
        assert!(owner.intake_form_completed);
        assert_eq!(owner.intake_form_id, Some(form.id));

        services::delete_form(&db, form.id, user.id).await.unwrap();
        let owner = User::find_by_id(&db, user.id).await.unwrap().unwrap();
        assert!(!owner.intake_form_completed);
        assert!(owner.intake_form_id.is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn later_updates_keep_untouched_fields(db: PgPool) {
        let user = client(&db).await;
        services::create_form(&db, user.id).await.unwrap();

        services::update(
            &db,
            user.id,
            patch(json!({ "full_name": "Robin Hart", "pronouns": "they", "date_of_birth": "1994-03-02" })),
        )
        .await
        .unwrap();
        let form = services::update(&db, user.id, patch(json!({ "full_name": "Robin H." })))
            .await
            .unwrap();
        assert_eq!(form.full_name.as_deref(), Some("Robin H."));
        assert_eq!(form.pronouns.as_deref(), Some("they"));
        assert!(form.date_of_birth.is_some());

        let form = services::update(&db, user.id, patch(json!({ "date_of_birth": null })))
            .await
            .unwrap();
        assert!(form.date_of_birth.is_none());
        assert_eq!(form.pronouns.as_deref(), Some("they"));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn resubmitting_a_module_replaces_it(db: PgPool) {
        let user = client(&db).await;
        services::create_form(&db, user.id).await.unwrap();

        let low = json!({ "q1": 1, "q2": 1 });
        let high = json!({ "q1": 3, "q2": 3, "q3": 3 });
        services::submit_module(&db, user.id, ModuleType::Gad7, low.as_object().unwrap())
            .await
            .unwrap();
        services::submit_module(&db, user.id, ModuleType::Gad7, high.as_object().unwrap())
            .await
            .unwrap();

        let (completed, _) = services::modules(&db, user.id).await.unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].module_type, "GAD-7");
        assert_eq!(completed[0].score, 9);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn completing_again_keeps_the_first_timestamp(db: PgPool) {
        let user = client(&db).await;
        services::create_form(&db, user.id).await.unwrap();
        for section in IntakeSection::ALL {
            services::update(&db, user.id, patch(json!({ "section_name": section.as_str() })))
                .await
                .unwrap();
        }
        let first = services::complete(&db, user.id).await.unwrap();
        let again = services::complete(&db, user.id).await.unwrap();
        assert!(again.is_complete);
        assert_eq!(again.completed_at, first.completed_at);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn update_without_form_is_not_found(db: PgPool) {
        let user = client(&db).await;
        let err = services::update(&db, user.id, patch(json!({ "full_name": "Robin" })))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
