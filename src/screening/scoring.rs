use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};

/// Every instrument a client may be asked to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleType {
    #[serde(rename = "PHQ-9")]
    Phq9,
    #[serde(rename = "GAD-7")]
    Gad7,
    #[serde(rename = "PC-PTSD-5")]
    PcPtsd5,
    #[serde(rename = "AUDIT-C")]
    AuditC,
    #[serde(rename = "DAST-10")]
    Dast10,
    #[serde(rename = "C-SSRS")]
    CSsrs,
    #[serde(rename = "ASRS-v1.1")]
    Asrs,
    #[serde(rename = "MDQ")]
    Mdq,
    #[serde(rename = "ISI")]
    Isi,
    #[serde(rename = "SCOFF")]
    Scoff,
    #[serde(rename = "OCI-R")]
    OciR,
    #[serde(rename = "K10")]
    K10,
    #[serde(rename = "WHODAS-2.0")]
    Whodas,
    #[serde(rename = "DASS-21")]
    Dass21,
    #[serde(rename = "NODS-CLiP")]
    NodsClip,
}

impl ModuleType {
    pub const ALL: [ModuleType; 15] = [
        ModuleType::Phq9,
        ModuleType::Gad7,
        ModuleType::PcPtsd5,
        ModuleType::AuditC,
        ModuleType::Dast10,
        ModuleType::CSsrs,
        ModuleType::Asrs,
        ModuleType::Mdq,
        ModuleType::Isi,
        ModuleType::Scoff,
        ModuleType::OciR,
        ModuleType::K10,
        ModuleType::Whodas,
        ModuleType::Dass21,
        ModuleType::NodsClip,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModuleType::Phq9 => "PHQ-9",
            ModuleType::Gad7 => "GAD-7",
            ModuleType::PcPtsd5 => "PC-PTSD-5",
            ModuleType::AuditC => "AUDIT-C",
            ModuleType::Dast10 => "DAST-10",
            ModuleType::CSsrs => "C-SSRS",
            ModuleType::Asrs => "ASRS-v1.1",
            ModuleType::Mdq => "MDQ",
            ModuleType::Isi => "ISI",
            ModuleType::Scoff => "SCOFF",
            ModuleType::OciR => "OCI-R",
            ModuleType::K10 => "K10",
            ModuleType::Whodas => "WHODAS-2.0",
            ModuleType::Dass21 => "DASS-21",
            ModuleType::NodsClip => "NODS-CLiP",
        }
    }

    /// Instruments with a scoring routine.
    pub fn is_scored(self) -> bool {
        matches!(self, ModuleType::Phq9 | ModuleType::Gad7 | ModuleType::PcPtsd5)
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModuleType::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::validation(format!("Unknown screening module type: {s}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Minimal,
    Mild,
    Moderate,
    #[serde(rename = "Moderately Severe")]
    ModeratelySevere,
    Severe,
    #[serde(rename = "Positive Screen")]
    PositiveScreen,
    #[serde(rename = "Negative Screen")]
    NegativeScreen,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Minimal => "Minimal",
            Severity::Mild => "Mild",
            Severity::Moderate => "Moderate",
            Severity::ModeratelySevere => "Moderately Severe",
            Severity::Severe => "Severe",
            Severity::PositiveScreen => "Positive Screen",
            Severity::NegativeScreen => "Negative Screen",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn phq9_severity(score: i32) -> Severity {
    match score {
        i32::MIN..=4 => Severity::Minimal,
        5..=9 => Severity::Mild,
        10..=14 => Severity::Moderate,
        15..=19 => Severity::ModeratelySevere,
        _ => Severity::Severe,
    }
}

pub fn gad7_severity(score: i32) -> Severity {
    match score {
        i32::MIN..=4 => Severity::Minimal,
        5..=9 => Severity::Mild,
        10..=14 => Severity::Moderate,
        _ => Severity::Severe,
    }
}

pub fn pc_ptsd5_severity(score: i32) -> Severity {
    if score >= 3 {
        Severity::PositiveScreen
    } else {
        Severity::NegativeScreen
    }
}

/// Validated answers for one scored instrument, keyed `q1..qN` on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreeningResponses {
    /// Nine items, 0-3 each.
    Phq9([u8; 9]),
    /// Seven items, 0-3 each.
    Gad7([u8; 7]),
    /// Five yes/no items.
    PcPtsd5([bool; 5]),
}

impl ScreeningResponses {
    /// Missing items count as 0 (or "no"); malformed ones are rejected.
    /// Keys that are not items of the instrument are ignored.
    pub fn parse(module: ModuleType, raw: &Map<String, Value>) -> AppResult<Self> {
        match module {
            ModuleType::Phq9 => Ok(Self::Phq9(likert_items(module, raw)?)),
            ModuleType::Gad7 => Ok(Self::Gad7(likert_items(module, raw)?)),
            ModuleType::PcPtsd5 => {
                let mut items = [false; 5];
                for (i, slot) in items.iter_mut().enumerate() {
                    let key = format!("q{}", i + 1);
                    *slot = match raw.get(&key) {
                        None | Some(Value::Null) => false,
                        Some(Value::String(s)) if s == "yes" => true,
                        Some(Value::String(s)) if s == "no" => false,
                        Some(other) => {
                            return Err(AppError::validation(format!(
                                "{module} item {key} must be \"yes\" or \"no\", got {other}"
                            )))
                        }
                    };
                }
                Ok(Self::PcPtsd5(items))
            }
            other => Err(AppError::validation(format!(
                "Scoring for {other} is not supported yet"
            ))),
        }
    }

    pub fn module_type(&self) -> ModuleType {
        match self {
            Self::Phq9(_) => ModuleType::Phq9,
            Self::Gad7(_) => ModuleType::Gad7,
            Self::PcPtsd5(_) => ModuleType::PcPtsd5,
        }
    }

    pub fn score(&self) -> i32 {
        match self {
            Self::Phq9(items) => items.iter().map(|&v| i32::from(v)).sum(),
            Self::Gad7(items) => items.iter().map(|&v| i32::from(v)).sum(),
            Self::PcPtsd5(items) => items.iter().filter(|&&yes| yes).count() as i32,
        }
    }

    pub fn severity(&self) -> Severity {
        let score = self.score();
        match self {
            Self::Phq9(_) => phq9_severity(score),
            Self::Gad7(_) => gad7_severity(score),
            Self::PcPtsd5(_) => pc_ptsd5_severity(score),
        }
    }

    /// Normalized JSON form stored alongside the score.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        match self {
            Self::Phq9(items) => fill(&mut map, items.iter().map(|&v| Value::from(v))),
            Self::Gad7(items) => fill(&mut map, items.iter().map(|&v| Value::from(v))),
            Self::PcPtsd5(items) => fill(
                &mut map,
                items.iter().map(|&yes| Value::from(if yes { "yes" } else { "no" })),
            ),
        }
        Value::Object(map)
    }

    pub fn scored(&self) -> ScoredModule {
        ScoredModule {
            module_type: self.module_type(),
            score: self.score(),
            severity: self.severity(),
        }
    }
}

fn fill(map: &mut Map<String, Value>, values: impl Iterator<Item = Value>) {
    for (i, v) in values.enumerate() {
        map.insert(format!("q{}", i + 1), v);
    }
}

fn likert_items<const N: usize>(module: ModuleType, raw: &Map<String, Value>) -> AppResult<[u8; N]> {
    let mut items = [0u8; N];
    for (i, slot) in items.iter_mut().enumerate() {
        let key = format!("q{}", i + 1);
        let value = match raw.get(&key) {
            None | Some(Value::Null) => continue,
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            Some(_) => None,
        };
        *slot = match value {
            Some(v @ 0..=3) => v as u8,
            _ => {
                return Err(AppError::validation(format!(
                    "{module} item {key} must be an integer between 0 and 3"
                )))
            }
        };
    }
    Ok(items)
}

/// Result of scoring one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredModule {
    pub module_type: ModuleType,
    pub score: i32,
    pub severity: Severity,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn score_phq9(raw: &Map<String, Value>) -> AppResult<i32> {
        Ok(ScreeningResponses::parse(ModuleType::Phq9, raw)?.score())
    }

    fn score_gad7(raw: &Map<String, Value>) -> AppResult<i32> {
        Ok(ScreeningResponses::parse(ModuleType::Gad7, raw)?.score())
    }

    fn score_pc_ptsd5(raw: &Map<String, Value>) -> AppResult<i32> {
        Ok(ScreeningResponses::parse(ModuleType::PcPtsd5, raw)?.score())
    }

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn all(n: usize, v: Value) -> Map<String, Value> {
        (1..=n).map(|i| (format!("q{i}"), v.clone())).collect()
    }

    #[test]
    fn phq9_max_and_empty() {
        assert_eq!(score_phq9(&all(9, json!("3"))).unwrap(), 27);
        assert_eq!(score_phq9(&Map::new()).unwrap(), 0);
    }

    #[test]
    fn phq9_is_stable_across_calls() {
        let responses = all(9, json!(2));
        let first = score_phq9(&responses).unwrap();
        let _ = score_gad7(&all(7, json!(3))).unwrap();
        assert_eq!(score_phq9(&responses).unwrap(), first);
        assert_eq!(first, 18);
    }

    #[test]
    fn phq9_bands_are_contiguous() {
        for score in 0..=27 {
            let expected = match score {
                0..=4 => Severity::Minimal,
                5..=9 => Severity::Mild,
                10..=14 => Severity::Moderate,
                15..=19 => Severity::ModeratelySevere,
                _ => Severity::Severe,
            };
            assert_eq!(phq9_severity(score), expected, "score {score}");
        }
    }

    #[test]
    fn gad7_bands() {
        assert_eq!(gad7_severity(0), Severity::Minimal);
        assert_eq!(gad7_severity(4), Severity::Minimal);
        assert_eq!(gad7_severity(5), Severity::Mild);
        assert_eq!(gad7_severity(10), Severity::Moderate);
        assert_eq!(gad7_severity(14), Severity::Moderate);
        assert_eq!(gad7_severity(15), Severity::Severe);
        assert_eq!(gad7_severity(21), Severity::Severe);
        assert_eq!(score_gad7(&all(7, json!(3))).unwrap(), 21);
    }

    #[test]
    fn pc_ptsd5_counts_yes() {
        let responses = map(json!({ "q1": "yes", "q2": "no", "q3": "yes", "q4": "yes" }));
        let parsed = ScreeningResponses::parse(ModuleType::PcPtsd5, &responses).unwrap();
        assert_eq!(parsed.score(), 3);
        assert_eq!(parsed.severity(), Severity::PositiveScreen);

        let two = map(json!({ "q1": "yes", "q5": "yes" }));
        assert_eq!(score_pc_ptsd5(&two).unwrap(), 2);
        assert_eq!(pc_ptsd5_severity(2), Severity::NegativeScreen);
    }

    #[test]
    fn out_of_range_item_is_rejected() {
        let err = score_phq9(&map(json!({ "q1": "4" }))).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(score_phq9(&map(json!({ "q2": "often" }))).is_err());
        assert!(score_gad7(&map(json!({ "q3": -1 }))).is_err());
        assert!(score_pc_ptsd5(&map(json!({ "q1": "maybe" }))).is_err());
    }

    #[test]
    fn client_score_and_extra_keys_are_ignored() {
        let responses = map(json!({ "q1": 1, "score": 27, "q10": "3" }));
        assert_eq!(score_phq9(&responses).unwrap(), 1);
    }

    #[test]
    fn unscored_modules_are_rejected() {
        let err = ScreeningResponses::parse(ModuleType::AuditC, &Map::new()).unwrap_err();
        assert!(err.to_string().contains("AUDIT-C"));
        assert!(!ModuleType::K10.is_scored());
    }

    #[test]
    fn module_type_parses_labels() {
        assert_eq!("PHQ-9".parse::<ModuleType>().unwrap(), ModuleType::Phq9);
        assert_eq!("gad-7".parse::<ModuleType>().unwrap(), ModuleType::Gad7);
        assert_eq!("NODS-CLiP".parse::<ModuleType>().unwrap(), ModuleType::NodsClip);
        assert!("PHQ-10".parse::<ModuleType>().is_err());
        for m in ModuleType::ALL {
            assert_eq!(m.as_str().parse::<ModuleType>().unwrap(), m);
            assert_eq!(serde_json::to_value(m).unwrap(), json!(m.as_str()));
        }
    }

    #[test]
    fn normalized_json_uses_item_keys() {
        let parsed = ScreeningResponses::parse(ModuleType::Gad7, &map(json!({ "q2": "2" }))).unwrap();
        let stored = parsed.to_json();
        assert_eq!(stored["q1"], json!(0));
        assert_eq!(stored["q2"], json!(2));
        assert_eq!(stored.as_object().unwrap().len(), 7);
    }
}
