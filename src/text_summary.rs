//! Text summary builder for CLI output.
//!
//! Flattens the presentation panels into printable lines.

use crate::model::{AnalysisRecord, AnalysisStatus};
use crate::panels::{self, NarrativeNav, ViewOptions};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Build a text summary of one record: the results panels when complete, otherwise its
/// lifecycle progress.
pub(crate) fn build_text_summary(record: &AnalysisRecord, opts: &ViewOptions) -> TextSummary {
    let panels = if record.status == AnalysisStatus::Completed {
        panels::results_panels(record, opts, &NarrativeNav::default())
    } else {
        let mut progress = panels::progress(record.status);
        progress.title = format!("{}: {}", record.title, progress.title);
        vec![progress]
    };

    let mut lines = Vec::new();
    for (i, panel) in panels.iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        lines.extend(panel.to_text_lines());
    }
    TextSummary { lines }
}

/// One line per record for `list` and the non-TUI default view.
pub(crate) fn build_history_lines(records: &[AnalysisRecord]) -> Vec<String> {
    let mut lines = Vec::with_capacity(records.len() + 1);
    let offset = panels::local_offset();
    if records.is_empty() {
        lines.push("No Scripts Analyzed".to_string());
        return lines;
    }
    for r in records {
        lines.push(format!(
            "{}  {:<10}  {:<7}  {}  {}",
            r.id,
            r.status.as_str(),
            r.budget_tier.as_str(),
            panels::format_created(&r.created_date, offset),
            r.title
        ));
    }
    lines
}
