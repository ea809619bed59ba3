//! Presentation layer: pure transforms from an analysis record to titled, styled lines.
//!
//! Panels carry no state of their own. The caller decides whether lists are expanded
//! and which scene filter applies; the TUI maps [`Tone`] to colors and the text mode
//! prints the lines as-is.

mod breakdown;
mod narrative;
mod overview;
mod production;
mod structure;

pub use breakdown::{characters, elements, locations, scenes};
pub use narrative::{narrative_map, NarrativeNav};
#[cfg_attr(not(feature = "tui"), allow(unused_imports))]
pub use overview::{format_created, history, local_offset, progress, story, summary};
#[cfg_attr(not(feature = "tui"), allow(unused_imports))]
pub use production::{budget, challenges, genre, scale_position, tone_scales};
#[cfg_attr(not(feature = "tui"), allow(unused_imports))]
pub use structure::{act_percentages, eight_sequences, heros_journey, three_act};

use crate::model::AnalysisRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Normal,
    Muted,
    Heading,
    Accent,
    Good,
    Warn,
    Danger,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelLine {
    pub text: String,
    pub tone: Tone,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub title: String,
    pub subtitle: Option<String>,
    pub lines: Vec<PanelLine>,
}

impl Panel {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: None,
            lines: Vec::new(),
        }
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn push(&mut self, text: impl Into<String>, tone: Tone) {
        self.lines.push(PanelLine {
            text: text.into(),
            tone,
        });
    }

    pub fn text(&mut self, text: impl Into<String>) {
        self.push(text, Tone::Normal);
    }

    pub fn muted(&mut self, text: impl Into<String>) {
        self.push(text, Tone::Muted);
    }

    pub fn blank(&mut self) {
        self.push(String::new(), Tone::Normal);
    }

    /// Plain-text rendering used by the CLI.
    pub fn to_text_lines(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.lines.len() + 2);
        match &self.subtitle {
            Some(sub) => out.push(format!("== {} ({}) ==", self.title, sub)),
            None => out.push(format!("== {} ==", self.title)),
        }
        out.extend(self.lines.iter().map(|l| l.text.clone()));
        out
    }

    #[cfg(test)]
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.text.contains(needle))
    }
}

/// Caller-owned view choices for the results panels.
#[derive(Debug, Clone, Default)]
pub struct ViewOptions {
    pub expanded: bool,
    pub scene_filter: String,
}

/// Every results panel for a completed record, in display order.
pub fn results_panels(
    record: &AnalysisRecord,
    opts: &ViewOptions,
    nav: &NarrativeNav,
) -> Vec<Panel> {
    let a = &record.analysis;
    let mut panels = vec![summary(record)];
    panels.extend(story(a.logline.as_deref(), a.synopsis.as_deref()));
    panels.extend(narrative_map(a, nav));
    panels.extend(heros_journey(&a.heros_journey, opts.expanded));
    panels.extend(three_act(a.three_act_structure.as_ref()));
    panels.extend(eight_sequences(&a.eight_sequences, opts.expanded));
    panels.push(scenes(&a.scenes, &opts.scene_filter, opts.expanded));
    panels.push(characters(&a.characters, opts.expanded));
    panels.push(locations(&a.locations, opts.expanded));
    panels.push(elements(a));
    panels.push(budget(a.budget_estimate.as_ref(), record.budget_tier));
    panels.push(genre(a.genre_analysis.as_ref()));
    panels.push(challenges(&a.challenges));
    panels
}

/// "Show all (N more)" hint for collapsed lists, if anything is hidden.
fn more_hint(total: usize, shown: usize, noun: Option<&str>) -> Option<PanelLine> {
    if total <= shown {
        return None;
    }
    let hidden = total - shown;
    let text = match noun {
        Some(noun) => format!("Show all ({hidden} more {noun}) [x]"),
        None => format!("Show all ({hidden} more) [x]"),
    };
    Some(PanelLine {
        text,
        tone: Tone::Muted,
    })
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Whole numbers print without decimals.
fn fmt_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v:.1}")
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}
