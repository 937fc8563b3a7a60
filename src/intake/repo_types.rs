use serde::Serialize;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::dto::{ConcernSeverity, Symptom, TraumaResponse};
use super::sections::SectionProgress;

/// Row of `client_intake_forms`. Constrained text fields come back as the
/// labels they were stored with.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct IntakeForm {
    pub id: Uuid,
    pub user_id: Uuid,

    pub full_name: Option<String>,
    pub preferred_name: Option<String>,
    pub pronouns: Option<String>,
    #[serde(with = "super::iso_date::option")]
    pub date_of_birth: Option<Date>,
    pub gender_identity: Option<String>,
    pub gender_self_describe: Option<String>,
    pub marital_status: Option<String>,
    pub occupation_school: Option<String>,
    pub primary_language: Option<String>,
    pub religion_spirituality: Option<String>,

    pub main_issues: Option<String>,
    pub concern_duration: Option<String>,
    pub current_severity: Option<String>,
    pub therapy_goals: Option<Value>,

    pub prior_counselling: Option<bool>,
    pub prior_counselling_helpful: Option<i32>,
    pub prior_counselling_details: Option<String>,
    pub psychiatric_hospitalization: Option<bool>,
    pub psychiatric_hospitalization_details: Option<String>,
    pub current_self_harm_thoughts: Option<bool>,
    pub current_self_harm_details: Option<String>,
    pub suicide_attempt_history: Option<bool>,
    pub suicide_attempt_details: Option<String>,
    pub violence_history: Option<bool>,
    pub violence_details: Option<String>,
    pub previous_diagnoses: Option<bool>,
    pub previous_diagnoses_details: Option<String>,

    pub current_symptoms: Option<Value>,
    pub current_symptoms_other: Option<String>,

    pub chronic_pain_illness: Option<bool>,
    pub chronic_pain_details: Option<String>,
    pub neurological_conditions: Option<bool>,
    pub neurological_details: Option<String>,
    pub allergies: Option<bool>,
    pub allergies_details: Option<String>,
    pub pregnancy_postpartum: Option<bool>,
    pub pregnancy_details: Option<String>,
    pub other_medical_issues: Option<bool>,
    pub other_medical_details: Option<String>,
    pub current_medications: Option<String>,

    pub family_mental_health: Option<String>,
    pub family_mental_health_details: Option<String>,
    pub family_substance_abuse: Option<String>,
    pub family_substance_abuse_details: Option<String>,

    pub substance_use: Option<Value>,

    pub living_situation: Option<String>,
    pub living_situation_other: Option<String>,
    pub relationship_quality: Option<String>,
    pub adequate_social_support: Option<String>,
    pub in_romantic_relationship: Option<bool>,
    pub romantic_relationship_duration: Option<String>,
    pub romantic_relationship_quality: Option<String>,
    pub family_structure_support: Option<String>,
    pub social_network_friendships: Option<String>,
    pub work_school_stress: Option<String>,
    pub sleep_details: Option<String>,
    pub exercise_hobbies: Option<String>,

    pub experienced_trauma: Option<String>,
    pub trauma_types: Option<Value>,
    pub trauma_ages: Option<String>,
    pub trauma_details: Option<String>,

    pub preferred_therapy_approach: Option<String>,

    pub section_progress: Json<SectionProgress>,
    pub is_complete: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl IntakeForm {
    pub fn completion_percentage(&self) -> u8 {
        self.section_progress.percentage()
    }

    pub fn has_symptom(&self, symptom: Symptom) -> bool {
        self.current_symptoms
            .as_ref()
            .and_then(Value::as_array)
            .is_some_and(|items| items.iter().any(|v| v.as_str() == Some(symptom.as_str())))
    }

    pub fn severity_is(&self, severity: ConcernSeverity) -> bool {
        self.current_severity.as_deref() == Some(severity.as_str())
    }

    pub fn trauma_is(&self, response: TraumaResponse) -> bool {
        self.experienced_trauma.as_deref() == Some(response.as_str())
    }
}

/// Row of `intake_screening_modules`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ScreeningModuleRecord {
    pub id: Uuid,
    pub intake_form_id: Uuid,
    pub user_id: Uuid,
    pub module_type: String,
    pub responses: Value,
    pub score: i32,
    pub severity_level: String,
    #[serde(with = "time::serde::rfc3339")]
    pub completed_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
