use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use time::Date;
use uuid::Uuid;

use super::repo_types::{IntakeForm, ScreeningModuleRecord};
use super::sections::IntakeSection;
use crate::error::{AppError, AppResult};
use crate::patch::{Field, Patch, PatchValue};
use crate::screening::ModuleType;

/// String-valued enum stored as its label in a TEXT or JSONB column.
macro_rules! labelled_enum {
    ($name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $label)] $variant,)+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl From<$name> for PatchValue {
            fn from(v: $name) -> Self {
                PatchValue::Text(v.as_str().to_string())
            }
        }
    };
}

labelled_enum!(GenderIdentity {
    Female => "Female",
    Male => "Male",
    NonBinary => "Non-binary",
    SelfDescribe => "Self-describe",
});

labelled_enum!(ConcernDuration {
    UnderOneMonth => "<1 month",
    OneToSixMonths => "1-6 months",
    SixToTwelveMonths => "6-12 months",
    OverOneYear => ">1 year",
});

labelled_enum!(ConcernSeverity {
    Mild => "Mild",
    Moderate => "Moderate",
    Severe => "Severe",
    Crisis => "Crisis",
});

labelled_enum!(YesNoUnknown {
    Yes => "Yes",
    No => "No",
    Unknown => "Unknown",
});

labelled_enum!(YesNoUnsure {
    Yes => "Yes",
    No => "No",
    Unsure => "Unsure",
});

labelled_enum!(TraumaResponse {
    Yes => "Yes",
    No => "No",
    PreferNotToAnswer => "Prefer not to answer",
});

labelled_enum!(LivingSituation {
    Alone => "Alone",
    WithPartner => "With spouse/partner",
    WithFamily => "With family",
    WithRoommates => "With roommates",
    Other => "Other",
});

labelled_enum!(RelationshipQuality {
    VerySatisfied => "Very satisfied",
    Satisfied => "Satisfied",
    Neutral => "Neutral",
    Unsatisfied => "Unsatisfied",
    VeryUnsatisfied => "Very unsatisfied",
});

labelled_enum!(Symptom {
    SadnessDepression => "Sadness/Depression",
    AnxietyWorry => "Anxiety/Worry",
    PanicAttacks => "Panic Attacks",
    MoodSwings => "Mood Swings",
    AngerIrritability => "Anger/Irritability",
    SleepProblems => "Sleep Problems",
    AppetiteChanges => "Appetite Changes",
    ConcentrationIssues => "Concentration Issues",
    MemoryProblems => "Memory Problems",
    Fatigue => "Fatigue",
    SocialWithdrawal => "Social Withdrawal",
    RelationshipProblems => "Relationship Problems",
    WorkSchoolProblems => "Work/School Problems",
    SubstanceUse => "Substance Use",
    EatingIssues => "Eating Issues",
    TraumaPtsd => "Trauma/PTSD",
    ObsessiveThoughts => "Obsessive Thoughts",
    CompulsiveBehaviors => "Compulsive Behaviors",
    Hallucinations => "Hallucinations",
    SuicidalThoughts => "Suicidal Thoughts",
    SelfHarm => "Self-Harm",
    Other => "Other",
});

labelled_enum!(TraumaType {
    PhysicalAbuse => "Physical abuse",
    SexualAbuse => "Sexual abuse",
    EmotionalAbuse => "Emotional abuse",
    Neglect => "Neglect",
    DomesticViolence => "Domestic violence",
    CombatTrauma => "Combat trauma",
    Accident => "Accident",
    NaturalDisaster => "Natural disaster",
    LossOfLovedOne => "Loss of loved one",
    MedicalTrauma => "Medical trauma",
    Bullying => "Bullying",
    Discrimination => "Discrimination",
    Other => "Other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubstanceStatus {
    Never,
    Past,
    Current,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstanceUseItem {
    pub status: SubstanceStatus,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstanceUse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alcohol: Option<SubstanceUseItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nicotine: Option<SubstanceUseItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cannabis: Option<SubstanceUseItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prescription_misuse: Option<SubstanceUseItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other: Option<SubstanceUseItem>,
}

/// Body of `PUT /intake`. Absent fields leave the column alone and `null`
/// clears it.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct IntakeFormPatch {
    pub section_name: Option<IntakeSection>,

    pub full_name: Field<String>,
    pub preferred_name: Field<String>,
    pub pronouns: Field<String>,
    #[serde(deserialize_with = "nullable_date")]
    pub date_of_birth: Field<Date>,
    pub gender_identity: Field<GenderIdentity>,
    pub gender_self_describe: Field<String>,
    pub marital_status: Field<String>,
    pub occupation_school: Field<String>,
    pub primary_language: Field<String>,
    pub religion_spirituality: Field<String>,

    pub main_issues: Field<String>,
    pub concern_duration: Field<ConcernDuration>,
    pub current_severity: Field<ConcernSeverity>,
    pub therapy_goals: Field<Vec<String>>,

    pub prior_counselling: Field<bool>,
    pub prior_counselling_helpful: Field<i32>,
    pub prior_counselling_details: Field<String>,
    pub psychiatric_hospitalization: Field<bool>,
    pub psychiatric_hospitalization_details: Field<String>,
    pub current_self_harm_thoughts: Field<bool>,
    pub current_self_harm_details: Field<String>,
    pub suicide_attempt_history: Field<bool>,
    pub suicide_attempt_details: Field<String>,
    pub violence_history: Field<bool>,
    pub violence_details: Field<String>,
    pub previous_diagnoses: Field<bool>,
    pub previous_diagnoses_details: Field<String>,

    pub current_symptoms: Field<Vec<Symptom>>,
    pub current_symptoms_other: Field<String>,

    pub chronic_pain_illness: Field<bool>,
    pub chronic_pain_details: Field<String>,
    pub neurological_conditions: Field<bool>,
    pub neurological_details: Field<String>,
    pub allergies: Field<bool>,
    pub allergies_details: Field<String>,
    pub pregnancy_postpartum: Field<bool>,
    pub pregnancy_details: Field<String>,
    pub other_medical_issues: Field<bool>,
    pub other_medical_details: Field<String>,
    pub current_medications: Field<String>,

    pub family_mental_health: Field<YesNoUnknown>,
    pub family_mental_health_details: Field<String>,
    pub family_substance_abuse: Field<YesNoUnknown>,
    pub family_substance_abuse_details: Field<String>,

    pub substance_use: Field<SubstanceUse>,

    pub living_situation: Field<LivingSituation>,
    pub living_situation_other: Field<String>,
    pub relationship_quality: Field<RelationshipQuality>,
    pub adequate_social_support: Field<YesNoUnsure>,
    pub in_romantic_relationship: Field<bool>,
    pub romantic_relationship_duration: Field<String>,
    pub romantic_relationship_quality: Field<RelationshipQuality>,
    pub family_structure_support: Field<String>,
    pub social_network_friendships: Field<String>,
    pub work_school_stress: Field<String>,
    pub sleep_details: Field<String>,
    pub exercise_hobbies: Field<String>,

    pub experienced_trauma: Field<TraumaResponse>,
    pub trauma_types: Field<Vec<TraumaType>>,
    pub trauma_ages: Field<String>,
    pub trauma_details: Field<String>,

    pub preferred_therapy_approach: Field<String>,
}

fn nullable_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Field<Date>, D::Error> {
    super::iso_date::option::deserialize(deserializer).map(Field::from)
}

fn json_column<T: Serialize>(value: Field<T>) -> AppResult<Field<Value>> {
    value.try_map(|v| serde_json::to_value(v).map_err(AppError::internal))
}

impl IntakeFormPatch {
    /// Parses a raw request body; shape and domain errors become 400s.
    pub fn from_json(body: Value) -> AppResult<Self> {
        serde_json::from_value(body).map_err(|e| AppError::validation(format!("Invalid intake data: {e}")))
    }

    /// Splits the body into column assignments and the section being saved.
    pub fn into_patch(self) -> AppResult<(Patch, Option<IntakeSection>)> {
        if let Some(rating) = self.prior_counselling_helpful.value() {
            if !(1..=5).contains(rating) {
                return Err(AppError::validation(
                    "prior_counselling_helpful must be between 1 and 5",
                ));
            }
        }

        let mut p = Patch::new();
        p.set_field("full_name", self.full_name)
            .set_field("preferred_name", self.preferred_name)
            .set_field("pronouns", self.pronouns)
            .set_field("date_of_birth", self.date_of_birth)
            .set_field("gender_identity", self.gender_identity)
            .set_field("gender_self_describe", self.gender_self_describe)
            .set_field("marital_status", self.marital_status)
            .set_field("occupation_school", self.occupation_school)
            .set_field("primary_language", self.primary_language)
            .set_field("religion_spirituality", self.religion_spirituality);

        p.set_field("main_issues", self.main_issues)
            .set_field("concern_duration", self.concern_duration)
            .set_field("current_severity", self.current_severity)
            .set_field("therapy_goals", json_column(self.therapy_goals)?);

        p.set_field("prior_counselling", self.prior_counselling)
            .set_field("prior_counselling_helpful", self.prior_counselling_helpful)
            .set_field("prior_counselling_details", self.prior_counselling_details)
            .set_field("psychiatric_hospitalization", self.psychiatric_hospitalization)
            .set_field(
                "psychiatric_hospitalization_details",
                self.psychiatric_hospitalization_details,
            )
            .set_field("current_self_harm_thoughts", self.current_self_harm_thoughts)
            .set_field("current_self_harm_details", self.current_self_harm_details)
            .set_field("suicide_attempt_history", self.suicide_attempt_history)
            .set_field("suicide_attempt_details", self.suicide_attempt_details)
            .set_field("violence_history", self.violence_history)
            .set_field("violence_details", self.violence_details)
            .set_field("previous_diagnoses", self.previous_diagnoses)
            .set_field("previous_diagnoses_details", self.previous_diagnoses_details);

        p.set_field("current_symptoms", json_column(self.current_symptoms)?)
            .set_field("current_symptoms_other", self.current_symptoms_other);

        p.set_field("chronic_pain_illness", self.chronic_pain_illness)
            .set_field("chronic_pain_details", self.chronic_pain_details)
            .set_field("neurological_conditions", self.neurological_conditions)
            .set_field("neurological_details", self.neurological_details)
            .set_field("allergies", self.allergies)
            .set_field("allergies_details", self.allergies_details)
            .set_field("pregnancy_postpartum", self.pregnancy_postpartum)
            .set_field("pregnancy_details", self.pregnancy_details)
            .set_field("other_medical_issues", self.other_medical_issues)
            .set_field("other_medical_details", self.other_medical_details)
            .set_field("current_medications", self.current_medications);

        p.set_field("family_mental_health", self.family_mental_health)
            .set_field("family_mental_health_details", self.family_mental_health_details)
            .set_field("family_substance_abuse", self.family_substance_abuse)
            .set_field("family_substance_abuse_details", self.family_substance_abuse_details);

        p.set_field("substance_use", json_column(self.substance_use)?);

        p.set_field("living_situation", self.living_situation)
            .set_field("living_situation_other", self.living_situation_other)
            .set_field("relationship_quality", self.relationship_quality)
            .set_field("adequate_social_support", self.adequate_social_support)
            .set_field("in_romantic_relationship", self.in_romantic_relationship)
            .set_field("romantic_relationship_duration", self.romantic_relationship_duration)
            .set_field("romantic_relationship_quality", self.romantic_relationship_quality)
            .set_field("family_structure_support", self.family_structure_support)
            .set_field("social_network_friendships", self.social_network_friendships)
            .set_field("work_school_stress", self.work_school_stress)
            .set_field("sleep_details", self.sleep_details)
            .set_field("exercise_hobbies", self.exercise_hobbies);

        p.set_field("experienced_trauma", self.experienced_trauma)
            .set_field("trauma_types", json_column(self.trauma_types)?)
            .set_field("trauma_ages", self.trauma_ages)
            .set_field("trauma_details", self.trauma_details);

        p.set_field("preferred_therapy_approach", self.preferred_therapy_approach);

        Ok((p, self.section_name))
    }
}

/// Form plus derived fields, returned by most `/intake` endpoints.
#[derive(Debug, Serialize)]
pub struct IntakeFormResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub intake_form: IntakeForm,
    pub completion_percentage: u8,
    pub recommended_modules: Vec<ModuleType>,
}

#[derive(Debug, Serialize)]
pub struct IntakeProgress {
    pub user_id: Uuid,
    pub completion_percentage: u8,
    pub completed_sections: Vec<&'static str>,
    pub pending_sections: Vec<&'static str>,
    pub recommended_modules: Vec<ModuleType>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct IntakeStatus {
    pub needs_intake: bool,
    pub has_form: bool,
    pub is_complete: bool,
    pub completion_percentage: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intake_form_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ValidateSectionRequest {
    pub section_name: Option<String>,
    pub data: Option<Value>,
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct SectionReport {
    pub valid: bool,
    pub errors: Vec<&'static str>,
    pub warnings: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitModuleRequest {
    #[serde(default)]
    pub responses: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct ModuleSubmitted {
    pub message: &'static str,
    pub module: ScreeningModuleRecord,
    pub interpretation: &'static str,
    pub recommendations: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct ModulesOverview {
    pub completed_modules: Vec<ScreeningModuleRecord>,
    pub recommended_modules: Vec<ModuleType>,
    pub total_completed: usize,
    pub total_recommended: usize,
}

#[derive(Debug, Serialize)]
pub struct RecommendedModules {
    pub recommended_modules: Vec<ModuleType>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    /// 1-based page and a limit in 1..=200, defaulting to 1 and 50.
    pub fn resolve(&self) -> (i64, i64) {
        let page = self.page.filter(|p| *p > 0).unwrap_or(1);
        let limit = self.limit.filter(|l| *l > 0).unwrap_or(50).min(200);
        (page, limit)
    }
}

#[derive(Debug, Serialize)]
pub struct IntakeFormPage {
    pub intake_forms: Vec<IntakeForm>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Serialize)]
pub struct IntakeFormDetail {
    pub intake_form: IntakeForm,
    pub completion_percentage: u8,
    pub recommended_modules: Vec<ModuleType>,
    pub screening_modules: Vec<ScreeningModuleRecord>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
