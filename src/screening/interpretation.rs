use super::scoring::{ModuleType, Severity};

/// One-line reading of a scored result.
pub fn interpretation(module: ModuleType, severity: Severity) -> &'static str {
    use Severity::*;
    match (module, severity) {
        (ModuleType::Phq9, Minimal) => "Minimal depression symptoms",
        (ModuleType::Phq9, Mild) => "Mild depression symptoms",
        (ModuleType::Phq9, Moderate) => "Moderate depression symptoms",
        (ModuleType::Phq9, ModeratelySevere) => "Moderately severe depression symptoms",
        (ModuleType::Phq9, Severe) => "Severe depression symptoms",
        (ModuleType::Gad7, Minimal) => "Minimal anxiety symptoms",
        (ModuleType::Gad7, Mild) => "Mild anxiety symptoms",
        (ModuleType::Gad7, Moderate) => "Moderate anxiety symptoms",
        (ModuleType::Gad7, Severe) => "Severe anxiety symptoms",
        (ModuleType::PcPtsd5, PositiveScreen) => "Positive screen for PTSD",
        (ModuleType::PcPtsd5, NegativeScreen) => "Negative screen for PTSD",
        _ => "Assessment completed",
    }
}

pub fn recommendations(module: ModuleType, severity: Severity) -> Vec<&'static str> {
    use Severity::*;
    let mut out = Vec::new();
    match module {
        ModuleType::Phq9 => {
            if matches!(severity, Moderate | ModeratelySevere | Severe) {
                out.push("Consider discussing these symptoms with your therapist");
                out.push("Focus on mood regulation techniques in therapy");
            }
            if matches!(severity, ModeratelySevere | Severe) {
                out.push("Consider psychiatric evaluation for medication options");
                out.push("Increase therapy session frequency if possible");
            }
        }
        ModuleType::Gad7 => {
            if matches!(severity, Moderate | Severe) {
                out.push("Explore anxiety management techniques");
                out.push("Consider mindfulness and relaxation exercises");
            }
            if severity == Severe {
                out.push("Discuss anxiety medication with a healthcare provider");
                out.push("Consider specialized anxiety treatment approaches");
            }
        }
        ModuleType::PcPtsd5 => {
            if severity == PositiveScreen {
                out.push("Consider trauma-focused therapy approaches");
                out.push("Discuss PTSD symptoms with your therapist");
                out.push("Consider EMDR or trauma-specific interventions");
            }
        }
        _ => {}
    }
    if out.is_empty() {
        out.push("Continue with regular therapy sessions as planned");
    }
    out
}
