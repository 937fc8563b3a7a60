use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime};

use super::dto::SectionReport;
use super::sections::IntakeSection;

fn text<'a>(data: &'a Value, key: &str) -> Option<&'a str> {
    data.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn flag(data: &Value, key: &str) -> bool {
    data.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn is_date(raw: &str) -> bool {
    Date::parse(raw, super::ISO_DATE).is_ok() || OffsetDateTime::parse(raw, &Rfc3339).is_ok()
}

/// Advisory check of one section's answers before they are saved.
/// Errors block the section, warnings only prompt for more detail.
pub fn validate_section(section: IntakeSection, data: &Value) -> SectionReport {
    let mut report = SectionReport::default();

    match section {
        IntakeSection::ClientIdentification => {
            if text(data, "full_name").is_none() {
                report.errors.push("Full name is required");
            }
            if let Some(dob) = text(data, "date_of_birth") {
                if !is_date(dob) {
                    report.errors.push("Invalid date of birth format");
                }
            }
            if text(data, "gender_identity") == Some("Self-describe")
                && text(data, "gender_self_describe").is_none()
            {
                report
                    .warnings
                    .push("Please provide self-description for gender identity");
            }
        }
        IntakeSection::PresentingConcerns => {
            if text(data, "main_issues").is_none() {
                report.errors.push("Please describe your main concerns");
            }
            if text(data, "current_severity").is_none() {
                report
                    .errors
                    .push("Please rate the current severity of your concerns");
            }
        }
        IntakeSection::MentalHealthHistory => {
            if flag(data, "current_self_harm_thoughts") && text(data, "current_self_harm_details").is_none() {
                report
                    .warnings
                    .push("Please provide details about self-harm thoughts for proper care");
            }
            if flag(data, "suicide_attempt_history") && text(data, "suicide_attempt_details").is_none() {
                report
                    .warnings
                    .push("Please provide details about suicide attempt history");
            }
        }
        IntakeSection::TraumaHistory => {
            let no_types = data
                .get("trauma_types")
                .and_then(Value::as_array)
                .map_or(true, Vec::is_empty);
            if text(data, "experienced_trauma") == Some("Yes") && no_types {
                report
                    .warnings
                    .push("Please specify the types of trauma experienced");
            }
        }
        _ => {}
    }

    report.valid = report.errors.is_empty();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identification_requires_name_and_valid_date() {
        let report = validate_section(
            IntakeSection::ClientIdentification,
            &json!({ "full_name": "  ", "date_of_birth": "not a date" }),
        );
        assert!(!report.valid);
        assert_eq!(report.errors, vec!["Full name is required", "Invalid date of birth format"]);
    }

    #[test]
    fn self_describe_without_text_warns() {
        let report = validate_section(
            IntakeSection::ClientIdentification,
            &json!({ "full_name": "Ada", "date_of_birth": "1990-05-01", "gender_identity": "Self-describe" }),
        );
        assert!(report.valid);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn presenting_concerns_needs_issue_and_severity() {
        let report = validate_section(IntakeSection::PresentingConcerns, &json!({}));
        assert_eq!(report.errors.len(), 2);
        let report = validate_section(
            IntakeSection::PresentingConcerns,
            &json!({ "main_issues": "sleep", "current_severity": "Mild" }),
        );
        assert_eq!(report, SectionReport { valid: true, ..Default::default() });
    }

    #[test]
    fn risk_flags_without_details_warn() {
        let report = validate_section(
            IntakeSection::MentalHealthHistory,
            &json!({ "current_self_harm_thoughts": true, "suicide_attempt_history": true, "suicide_attempt_details": "2015" }),
        );
        assert!(report.valid);
        assert_eq!(
            report.warnings,
            vec!["Please provide details about self-harm thoughts for proper care"]
        );
    }

    #[test]
    fn trauma_yes_without_types_warns() {
        let report = validate_section(IntakeSection::TraumaHistory, &json!({ "experienced_trauma": "Yes", "trauma_types": [] }));
        assert_eq!(report.warnings.len(), 1);
        let report = validate_section(IntakeSection::TraumaHistory, &json!({ "experienced_trauma": "No" }));
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn other_sections_pass() {
        assert!(validate_section(IntakeSection::MedicalHistory, &json!({})).valid);
    }
}
