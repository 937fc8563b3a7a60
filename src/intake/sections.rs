use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// The ten parts of the intake questionnaire, in the order clients fill them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeSection {
    ClientIdentification,
    PresentingConcerns,
    MentalHealthHistory,
    CurrentSymptoms,
    MedicalHistory,
    FamilyHistory,
    SubstanceUse,
    PsychosocialSnapshot,
    TraumaHistory,
    TherapyPreferences,
}

impl IntakeSection {
    pub const ALL: [IntakeSection; 10] = [
        IntakeSection::ClientIdentification,
        IntakeSection::PresentingConcerns,
        IntakeSection::MentalHealthHistory,
        IntakeSection::CurrentSymptoms,
        IntakeSection::MedicalHistory,
        IntakeSection::FamilyHistory,
        IntakeSection::SubstanceUse,
        IntakeSection::PsychosocialSnapshot,
        IntakeSection::TraumaHistory,
        IntakeSection::TherapyPreferences,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IntakeSection::ClientIdentification => "client_identification",
            IntakeSection::PresentingConcerns => "presenting_concerns",
            IntakeSection::MentalHealthHistory => "mental_health_history",
            IntakeSection::CurrentSymptoms => "current_symptoms",
            IntakeSection::MedicalHistory => "medical_history",
            IntakeSection::FamilyHistory => "family_history",
            IntakeSection::SubstanceUse => "substance_use",
            IntakeSection::PsychosocialSnapshot => "psychosocial_snapshot",
            IntakeSection::TraumaHistory => "trauma_history",
            IntakeSection::TherapyPreferences => "therapy_preferences",
        }
    }
}

impl fmt::Display for IntakeSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntakeSection {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IntakeSection::ALL
            .into_iter()
            .find(|section| section.as_str() == s)
            .ok_or_else(|| AppError::validation(format!("Unknown section: {s}")))
    }
}

/// Per-section completion flags as stored in `section_progress`.
/// Missing keys read as `false`; serialization always writes all ten.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionProgress {
    pub client_identification: bool,
    pub presenting_concerns: bool,
    pub mental_health_history: bool,
    pub current_symptoms: bool,
    pub medical_history: bool,
    pub family_history: bool,
    pub substance_use: bool,
    pub psychosocial_snapshot: bool,
    pub trauma_history: bool,
    pub therapy_preferences: bool,
}

impl SectionProgress {
    fn flag_mut(&mut self, section: IntakeSection) -> &mut bool {
        match section {
            IntakeSection::ClientIdentification => &mut self.client_identification,
            IntakeSection::PresentingConcerns => &mut self.presenting_concerns,
            IntakeSection::MentalHealthHistory => &mut self.mental_health_history,
            IntakeSection::CurrentSymptoms => &mut self.current_symptoms,
            IntakeSection::MedicalHistory => &mut self.medical_history,
            IntakeSection::FamilyHistory => &mut self.family_history,
            IntakeSection::SubstanceUse => &mut self.substance_use,
            IntakeSection::PsychosocialSnapshot => &mut self.psychosocial_snapshot,
            IntakeSection::TraumaHistory => &mut self.trauma_history,
            IntakeSection::TherapyPreferences => &mut self.therapy_preferences,
        }
    }

    pub fn is_done(&self, section: IntakeSection) -> bool {
        match section {
            IntakeSection::ClientIdentification => self.client_identification,
            IntakeSection::PresentingConcerns => self.presenting_concerns,
            IntakeSection::MentalHealthHistory => self.mental_health_history,
            IntakeSection::CurrentSymptoms => self.current_symptoms,
            IntakeSection::MedicalHistory => self.medical_history,
            IntakeSection::FamilyHistory => self.family_history,
            IntakeSection::SubstanceUse => self.substance_use,
            IntakeSection::PsychosocialSnapshot => self.psychosocial_snapshot,
            IntakeSection::TraumaHistory => self.trauma_history,
            IntakeSection::TherapyPreferences => self.therapy_preferences,
        }
    }

    pub fn mark(&mut self, section: IntakeSection) {
        *self.flag_mut(section) = true;
    }

    pub fn completed(&self) -> Vec<&'static str> {
        IntakeSection::ALL
            .into_iter()
            .filter(|s| self.is_done(*s))
            .map(IntakeSection::as_str)
            .collect()
    }

    pub fn pending(&self) -> Vec<&'static str> {
        IntakeSection::ALL
            .into_iter()
            .filter(|s| !self.is_done(*s))
            .map(IntakeSection::as_str)
            .collect()
    }

    /// Share of completed sections, 0-100, rounded down.
    pub fn percentage(&self) -> u8 {
        let total = IntakeSection::ALL.len();
        let done = IntakeSection::ALL.iter().filter(|s| self.is_done(**s)).count();
        (done * 100 / total) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_progress_is_zero() {
        let progress = SectionProgress::default();
        assert_eq!(progress.percentage(), 0);
        assert!(progress.completed().is_empty());
        assert_eq!(progress.pending().len(), 10);
    }

    #[test]
    fn sections_keep_canonical_order() {
        let mut progress = SectionProgress::default();
        progress.mark(IntakeSection::TherapyPreferences);
        progress.mark(IntakeSection::ClientIdentification);
        progress.mark(IntakeSection::PresentingConcerns);
        assert_eq!(progress.percentage(), 30);
        assert_eq!(
            progress.completed(),
            vec!["client_identification", "presenting_concerns", "therapy_preferences"]
        );
        assert_eq!(progress.pending()[0], "mental_health_history");
    }

    #[test]
    fn all_sections_make_one_hundred() {
        let mut progress = SectionProgress::default();
        for section in IntakeSection::ALL {
            progress.mark(section);
        }
        assert_eq!(progress.percentage(), 100);
        assert!(progress.pending().is_empty());
    }

    #[test]
    fn stored_json_round_trips_with_all_keys() {
        let stored = json!({ "client_identification": true });
        let progress: SectionProgress = serde_json::from_value(stored).unwrap();
        assert!(progress.client_identification);
        let written = serde_json::to_value(&progress).unwrap();
        assert_eq!(written.as_object().unwrap().len(), 10);
        assert_eq!(written["trauma_history"], json!(false));
    }

    #[test]
    fn unknown_section_is_a_validation_error() {
        assert!(matches!(
            "hobbies".parse::<IntakeSection>(),
            Err(AppError::Validation(_))
        ));
        assert_eq!(
            "trauma_history".parse::<IntakeSection>().unwrap(),
            IntakeSection::TraumaHistory
        );
    }
}
