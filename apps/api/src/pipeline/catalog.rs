//! Stage Catalog: the static, ordered list of interview stages every pipeline walks through.
//!
//! Stage behaviour is keyed on `StageKind`, never on the display name. Names that do not
//! match a known kind fall back to `StageKind::Custom`, which has no AI side effects.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("Stage catalog must contain at least one stage")]
    Empty,

    #[error("Stage orders must be contiguous starting at 1 (expected {expected}, found {found})")]
    NonContiguous { expected: u32, found: u32 },

    #[error("Failed to read stage catalog: {0}")]
    Io(String),

    #[error("Invalid stage catalog JSON: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    ResumeScreening,
    AiTechnicalInterview,
    TechnicalAssessment,
    HrRound,
    Viva,
    FinalReview,
    OfferStage,
    Custom,
}

impl StageKind {
    /// Maps a stage display name to its kind. Matching ignores case, whitespace and
    /// punctuation, so "HR Round", "hr-round" and "HR round" are the same stage.
    pub fn from_name(name: &str) -> Self {
        let key: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match key.as_str() {
            "resumescreening" | "screening" => StageKind::ResumeScreening,
            "aitechnicalinterview" | "aiinterview" | "technicalinterview" => {
                StageKind::AiTechnicalInterview
            }
            "technicalassessment" | "assessment" => StageKind::TechnicalAssessment,
            "hrround" | "hrinterview" => StageKind::HrRound,
            "viva" => StageKind::Viva,
            "finalreview" => StageKind::FinalReview,
            "offerstage" | "offer" => StageKind::OfferStage,
            _ => StageKind::Custom,
        }
    }

    /// Entering this stage triggers generation of interview questions.
    pub fn generates_material(&self) -> bool {
        matches!(self, StageKind::AiTechnicalInterview)
    }

    /// `evaluate` on this stage may be scored by the AI evaluator from submitted answers.
    pub fn ai_graded(&self) -> bool {
        matches!(self, StageKind::AiTechnicalInterview)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Stage {
    pub name: String,
    pub order: u32,
    pub description: String,
    pub kind: StageKind,
}

impl Stage {
    pub fn new(name: &str, order: u32, description: &str) -> Self {
        Self {
            name: name.to_string(),
            order,
            description: description.to_string(),
            kind: StageKind::from_name(name),
        }
    }
}

/// On-disk shape of a catalog entry. The kind is always derived from the name.
#[derive(Debug, Deserialize)]
struct StageDefinition {
    name: String,
    order: u32,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageCatalog {
    stages: Vec<Stage>,
}

impl StageCatalog {
    /// Builds a catalog, sorting by order and rejecting empty or gapped orderings.
    pub fn new(mut stages: Vec<Stage>) -> Result<Self, CatalogError> {
        if stages.is_empty() {
            return Err(CatalogError::Empty);
        }
        stages.sort_by_key(|s| s.order);

        for (idx, stage) in stages.iter().enumerate() {
            let expected = idx as u32 + 1;
            if stage.order != expected {
                return Err(CatalogError::NonContiguous {
                    expected,
                    found: stage.order,
                });
            }
        }

        Ok(Self { stages })
    }

    /// The standard seven-stage interview process.
    pub fn default_interview() -> Self {
        Self {
            stages: vec![
                Stage::new(
                    "Resume Screening",
                    1,
                    "Resume reviewed against the job requirements",
                ),
                Stage::new(
                    "AI Technical Interview",
                    2,
                    "Recorded interview with AI-generated technical questions",
                ),
                Stage::new(
                    "Technical Assessment",
                    3,
                    "Hands-on assessment reviewed by the hiring team",
                ),
                Stage::new("HR Round", 4, "Culture and expectations discussion with HR"),
                Stage::new("Viva", 5, "Oral examination with a technical panel"),
                Stage::new("Final Review", 6, "Hiring committee decision"),
                Stage::new("Offer Stage", 7, "Offer extended to the candidate"),
            ],
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|e| CatalogError::Io(e.to_string()))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let definitions: Vec<StageDefinition> =
            serde_json::from_str(raw).map_err(|e| CatalogError::Parse(e.to_string()))?;
        let stages = definitions
            .into_iter()
            .map(|d| Stage::new(&d.name, d.order, &d.description))
            .collect();
        Self::new(stages)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage(&self, order: u32) -> Option<&Stage> {
        order
            .checked_sub(1)
            .and_then(|idx| self.stages.get(idx as usize))
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Order of the last stage. Advancing from here hires the candidate.
    pub fn final_order(&self) -> u32 {
        self.stages.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_is_contiguous() {
        let catalog = StageCatalog::default_interview();
        assert_eq!(catalog.len(), 7);
        assert_eq!(catalog.final_order(), 7);
        for (idx, stage) in catalog.stages().iter().enumerate() {
            assert_eq!(stage.order, idx as u32 + 1);
        }
        assert!(StageCatalog::new(catalog.stages().to_vec()).is_ok());
    }

    #[test]
    fn test_default_catalog_kinds_are_recognised() {
        let catalog = StageCatalog::default_interview();
        assert!(catalog.stages().iter().all(|s| s.kind != StageKind::Custom));
        assert_eq!(
            catalog.stage(2).map(|s| s.kind),
            Some(StageKind::AiTechnicalInterview)
        );
    }

    #[test]
    fn test_from_name_ignores_case_and_punctuation() {
        assert_eq!(StageKind::from_name("HR Round"), StageKind::HrRound);
        assert_eq!(StageKind::from_name("hr-round"), StageKind::HrRound);
        assert_eq!(
            StageKind::from_name("ai technical INTERVIEW"),
            StageKind::AiTechnicalInterview
        );
    }

    #[test]
    fn test_unknown_name_falls_back_to_custom() {
        let kind = StageKind::from_name("Coffee Chat");
        assert_eq!(kind, StageKind::Custom);
        assert!(!kind.generates_material());
        assert!(!kind.ai_graded());
    }

    #[test]
    fn test_new_sorts_stages() {
        let catalog = StageCatalog::new(vec![
            Stage::new("HR Round", 2, ""),
            Stage::new("Resume Screening", 1, ""),
        ])
        .unwrap();
        assert_eq!(catalog.stages()[0].name, "Resume Screening");
        assert_eq!(catalog.stage(2).unwrap().name, "HR Round");
    }

    #[test]
    fn test_new_rejects_empty() {
        assert_eq!(StageCatalog::new(vec![]).unwrap_err(), CatalogError::Empty);
    }

    #[test]
    fn test_new_rejects_gaps_and_duplicates() {
        let gapped = StageCatalog::new(vec![Stage::new("A", 1, ""), Stage::new("B", 3, "")]);
        assert_eq!(
            gapped.unwrap_err(),
            CatalogError::NonContiguous {
                expected: 2,
                found: 3
            }
        );

        let duplicated = StageCatalog::new(vec![Stage::new("A", 1, ""), Stage::new("B", 1, "")]);
        assert!(duplicated.is_err());

        let zero_based = StageCatalog::new(vec![Stage::new("A", 0, "")]);
        assert!(zero_based.is_err());
    }

    #[test]
    fn test_stage_lookup_out_of_range() {
        let catalog = StageCatalog::default_interview();
        assert!(catalog.stage(0).is_none());
        assert!(catalog.stage(8).is_none());
    }

    #[test]
    fn test_from_json_derives_kinds() {
        let raw = r#"[
            {"name": "Resume Screening", "order": 1, "description": "screen"},
            {"name": "AI Interview", "order": 2},
            {"name": "Panel", "order": 3}
        ]"#;
        let catalog = StageCatalog::from_json(raw).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.stage(2).unwrap().kind, StageKind::AiTechnicalInterview);
        assert_eq!(catalog.stage(3).unwrap().kind, StageKind::Custom);
        assert_eq!(catalog.stage(3).unwrap().description, "");
    }

    #[test]
    fn test_from_json_rejects_malformed_input() {
        assert!(matches!(
            StageCatalog::from_json("{not json"),
            Err(CatalogError::Parse(_))
        ));
    }
}
