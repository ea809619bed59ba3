use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::llm::LlmConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub data_dir: PathBuf,
    pub llm: LlmConfig,
    #[serde(with = "humantime_serde")]
    pub llm_timeout: Duration,
    pub budget_tier: BudgetTier,
    pub user_agent: String,
}

/// Lifecycle of an analysis record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Uploading,
    Processing,
    Analyzing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    fn rank(self) -> u8 {
        match self {
            AnalysisStatus::Uploading => 0,
            AnalysisStatus::Processing => 1,
            AnalysisStatus::Analyzing => 2,
            AnalysisStatus::Completed => 3,
            AnalysisStatus::Failed => 4,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AnalysisStatus::Completed | AnalysisStatus::Failed)
    }

    /// Statuses only move forward one step at a time; `Failed` can be entered from any
    /// non-terminal status and is never left.
    pub fn can_advance_to(self, next: AnalysisStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            AnalysisStatus::Failed => true,
            _ => next.rank() == self.rank() + 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisStatus::Uploading => "uploading",
            AnalysisStatus::Processing => "processing",
            AnalysisStatus::Analyzing => "analyzing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BudgetTier {
    Micro,
    #[default]
    Indie,
    Studio,
}

impl BudgetTier {
    pub fn as_str(self) -> &'static str {
        match self {
            BudgetTier::Micro => "micro",
            BudgetTier::Indie => "indie",
            BudgetTier::Studio => "studio",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeroStage {
    pub stage: Option<String>,
    pub page_range: Option<String>,
    pub scene_reference: Option<String>,
    pub narrative_purpose: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Act {
    pub page_range: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    pub percentage: Option<f64>,
    pub emotional_arc: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub turning_points: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreeActStructure {
    pub act_one: Option<Act>,
    pub act_two: Option<Act>,
    pub act_three: Option<Act>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sequence {
    pub sequence_letter: Option<String>,
    pub title: Option<String>,
    pub page_range: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub key_scenes: Vec<String>,
    pub narrative_function: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scene {
    #[serde(deserialize_with = "lenient_count")]
    pub scene_number: Option<u32>,
    pub slugline: Option<String>,
    pub location: Option<String>,
    pub int_ext: Option<String>,
    pub time_of_day: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    pub page_number: Option<f64>,
    pub summary: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub characters_present: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Character {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    pub age_range: Option<String>,
    pub gender: Option<String>,
    #[serde(deserialize_with = "lenient_count")]
    pub scene_count: Option<u32>,
    #[serde(deserialize_with = "null_as_default")]
    pub special_requirements: Vec<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub is_lead: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Prop {
    pub name: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardrobeItem {
    pub description: Option<String>,
    pub character: Option<String>,
    pub period: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleAnimal {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VfxSfx {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub description: Option<String>,
    pub complexity: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub slugline: Option<String>,
    pub int_ext: Option<String>,
    pub time_of_day: Option<String>,
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient_count")]
    pub scene_count: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetEstimate {
    #[serde(deserialize_with = "lenient_number")]
    pub min: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub max: Option<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub top_cost_drivers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenreAnalysis {
    pub primary_genre: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub sub_genres: Vec<String>,
    #[serde(deserialize_with = "lenient_number")]
    pub confidence: Option<f64>,
    pub humor_scale: Option<String>,
    pub pacing_scale: Option<String>,
    pub visual_style: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub comparable_films: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Challenge {
    pub category: Option<String>,
    pub description: Option<String>,
    pub severity: Option<String>,
    pub scene_reference: Option<String>,
}

/// Structured breakdown returned by the model. Every field is optional because the model
/// is free to omit any section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptAnalysis {
    pub logline: Option<String>,
    pub synopsis: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub heros_journey: Vec<HeroStage>,
    pub three_act_structure: Option<ThreeActStructure>,
    #[serde(deserialize_with = "null_as_default")]
    pub eight_sequences: Vec<Sequence>,
    #[serde(deserialize_with = "lenient_number")]
    pub total_pages: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub total_scenes: Option<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub scenes: Vec<Scene>,
    #[serde(deserialize_with = "null_as_default")]
    pub characters: Vec<Character>,
    #[serde(deserialize_with = "null_as_default")]
    pub props: Vec<Prop>,
    #[serde(deserialize_with = "null_as_default")]
    pub wardrobe: Vec<WardrobeItem>,
    #[serde(deserialize_with = "null_as_default")]
    pub vehicles_animals: Vec<VehicleAnimal>,
    #[serde(deserialize_with = "null_as_default")]
    pub vfx_sfx: Vec<VfxSfx>,
    #[serde(deserialize_with = "null_as_default")]
    pub locations: Vec<Location>,
    pub budget_estimate: Option<BudgetEstimate>,
    pub genre_analysis: Option<GenreAnalysis>,
    #[serde(deserialize_with = "null_as_default")]
    pub challenges: Vec<Challenge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: String,
    pub title: String,
    pub file_url: String,
    pub status: AnalysisStatus,
    #[serde(default)]
    pub created_date: String,
    #[serde(default)]
    pub updated_date: String,
    #[serde(default)]
    pub budget_tier: BudgetTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    /// Tier-agnostic estimate that tier changes are derived from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_budget: Option<BudgetEstimate>,
    #[serde(flatten)]
    pub analysis: ScriptAnalysis,
}

impl AnalysisRecord {
    pub fn new(id: String, title: String, file_url: String, tier: BudgetTier) -> Self {
        let now = now_rfc3339();
        Self {
            id,
            title,
            file_url,
            status: AnalysisStatus::Uploading,
            created_date: now.clone(),
            updated_date: now,
            budget_tier: tier,
            raw_text: None,
            base_budget: None,
            analysis: ScriptAnalysis::default(),
        }
    }

    pub fn apply(&mut self, update: RecordUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(raw_text) = update.raw_text {
            self.raw_text = Some(raw_text);
        }
        if let Some(analysis) = update.analysis {
            self.analysis = *analysis;
        }
        if let Some(tier) = update.budget_tier {
            self.budget_tier = tier;
        }
        if let Some(estimate) = update.budget_estimate {
            self.analysis.budget_estimate = Some(estimate);
        }
        if let Some(base) = update.base_budget {
            self.base_budget = Some(base);
        }
        self.updated_date = now_rfc3339();
    }
}

/// Partial update applied to a stored record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordUpdate {
    pub status: Option<AnalysisStatus>,
    pub raw_text: Option<String>,
    pub analysis: Option<Box<ScriptAnalysis>>,
    pub budget_tier: Option<BudgetTier>,
    pub budget_estimate: Option<BudgetEstimate>,
    pub base_budget: Option<BudgetEstimate>,
}

impl RecordUpdate {
    pub fn status(status: AnalysisStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AnalysisEvent {
    StatusChanged {
        id: String,
        status: AnalysisStatus,
    },
    Info(InfoEvent),
    RunCompleted {
        // Boxed: the record carries the whole breakdown.
        record: Box<AnalysisRecord>,
    },
    RunFailed {
        id: String,
        error: String,
    },
    /// The run never got a record: bad path, unsupported type, empty title.
    StartFailed {
        error: String,
    },
}

/// Structured info events emitted by the engine and consumed by UI/CLI layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InfoEvent {
    Message(String),
    Uploaded { file_name: String, bytes: u64 },
    TextExtracted { chars: usize, method: String },
    RequestingModel { model: String },
}

impl InfoEvent {
    /// Render a human-readable message for UI/CLI layers.
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::Message(msg) => msg.clone(),
            InfoEvent::Uploaded { file_name, bytes } => {
                format!("Uploaded {} ({:.1} KB)", file_name, *bytes as f64 / 1024.0)
            }
            InfoEvent::TextExtracted { chars, method } => {
                format!("Extracted {} characters via {}", chars, method)
            }
            InfoEvent::RequestingModel { model } => {
                format!("Requesting breakdown from {}", model)
            }
        }
    }
}

// Structured output is best effort on both providers: keys come back as `null`, numbers as
// strings. A stray shape degrades to "absent" instead of failing the run.

fn number_value(value: serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(number_value))
}

/// Counts may arrive as floats or numeric strings.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(number_value)
        .filter(|n| *n >= 0.0)
        .map(|n| n.round() as u32))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Anything but an explicit truthy value is `false`.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Bool(b)) => b,
        Some(serde_json::Value::String(s)) => {
            matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes")
        }
        Some(serde_json::Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    })
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "now".into())
}

/// Truncate to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
