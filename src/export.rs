//! Portable JSON export of a finished breakdown.

use crate::model::{
    AnalysisRecord, BudgetEstimate, BudgetTier, Challenge, Character, GenreAnalysis, Location,
    Prop, VehicleAnimal, VfxSfx, WardrobeItem,
};
use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub title: String,
    pub metadata: ExportMetadata,
    pub element_breakdown: ElementBreakdown,
    pub budget_estimation: BudgetEstimation,
    pub genre_analysis: Option<GenreAnalysis>,
    pub production_challenges: Vec<Challenge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub total_pages: Option<f64>,
    pub total_scenes: Option<f64>,
    /// When the export was produced.
    pub analysis_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementBreakdown {
    pub characters: Vec<Character>,
    pub locations: Vec<Location>,
    pub props: Vec<Prop>,
    pub wardrobe: Vec<WardrobeItem>,
    pub vehicles_animals: Vec<VehicleAnimal>,
    pub vfx_sfx: Vec<VfxSfx>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetEstimation {
    pub tier: BudgetTier,
    pub estimate: Option<BudgetEstimate>,
}

pub fn build_export(record: &AnalysisRecord, now: OffsetDateTime) -> ExportDocument {
    let a = &record.analysis;
    ExportDocument {
        title: record.title.clone(),
        metadata: ExportMetadata {
            total_pages: a.total_pages,
            total_scenes: a.total_scenes,
            analysis_date: now.format(&Rfc3339).unwrap_or_else(|_| "now".into()),
        },
        element_breakdown: ElementBreakdown {
            characters: a.characters.clone(),
            locations: a.locations.clone(),
            props: a.props.clone(),
            wardrobe: a.wardrobe.clone(),
            vehicles_animals: a.vehicles_animals.clone(),
            vfx_sfx: a.vfx_sfx.clone(),
        },
        budget_estimation: BudgetEstimation {
            tier: record.budget_tier,
            estimate: a.budget_estimate.clone(),
        },
        genre_analysis: a.genre_analysis.clone(),
        production_challenges: a.challenges.clone(),
    }
}

/// Pretty JSON of the export document, as written to files and the clipboard.
pub fn export_string(record: &AnalysisRecord) -> Result<String> {
    let doc = build_export(record, OffsetDateTime::now_utc());
    Ok(serde_json::to_string_pretty(&doc)?)
}

pub fn write_export(record: &AnalysisRecord, path: &Path) -> Result<()> {
    let doc = build_export(record, OffsetDateTime::now_utc());
    crate::storage::export_json(path, &doc)
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

/// `My Script` becomes `My_Script_analysis.json`.
pub fn default_file_name(title: &str) -> String {
    let stem = whitespace_re().replace_all(title, "_");
    if stem.is_empty() {
        "script_analysis.json".to_string()
    } else {
        format!("{stem}_analysis.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnalysisStatus, ScriptAnalysis};
    use time::macros::datetime;

    fn record() -> AnalysisRecord {
        let mut r = AnalysisRecord::new(
            "r1".into(),
            "The Long Night".into(),
            "file:///x.pdf".into(),
            BudgetTier::Studio,
        );
        r.status = AnalysisStatus::Completed;
        r.analysis = ScriptAnalysis {
            total_pages: Some(98.0),
            total_scenes: Some(41.0),
            characters: vec![Character {
                name: "MAYA".into(),
                is_lead: true,
                ..Default::default()
            }],
            challenges: vec![Challenge {
                category: Some("safety".into()),
                ..Default::default()
            }],
            budget_estimate: Some(BudgetEstimate {
                min: Some(5e6),
                max: Some(2e7),
                top_cost_drivers: vec![],
            }),
            ..Default::default()
        };
        r
    }

    #[test]
    fn export_carries_record_title_and_sections() {
        let doc = build_export(&record(), datetime!(2024-05-01 12:00 UTC));
        assert_eq!(doc.title, "The Long Night");
        assert_eq!(doc.metadata.total_pages, Some(98.0));
        assert_eq!(doc.metadata.analysis_date, "2024-05-01T12:00:00Z");
        assert_eq!(doc.element_breakdown.characters[0].name, "MAYA");
        assert_eq!(doc.budget_estimation.tier, BudgetTier::Studio);
        assert_eq!(doc.production_challenges.len(), 1);
    }

    #[test]
    fn export_json_shape() {
        let json = export_string(&record()).unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["title"], "The Long Night");
        assert_eq!(v["budget_estimation"]["tier"], "studio");
        assert!(v["element_breakdown"]["vfx_sfx"].is_array());
        assert!(v["genre_analysis"].is_null());
    }

    #[test]
    fn writes_export_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join(default_file_name("The Long Night"));
        write_export(&record(), &path).unwrap();
        let doc: ExportDocument =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(doc.title, "The Long Night");
    }

    #[test]
    fn file_names() {
        assert_eq!(default_file_name("The Long  Night"), "The_Long_Night_analysis.json");
        assert_eq!(default_file_name("Solo"), "Solo_analysis.json");
        assert_eq!(default_file_name(""), "script_analysis.json");
    }
}
