use super::{fmt_number, non_empty, Panel, Tone};
use crate::model::{AnalysisRecord, AnalysisStatus};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

pub fn summary(record: &AnalysisRecord) -> Panel {
    let a = &record.analysis;
    let elements = a.props.len() + a.wardrobe.len() + a.vehicles_animals.len() + a.vfx_sfx.len();
    let high = a
        .challenges
        .iter()
        .filter(|c| c.severity.as_deref() == Some("high"))
        .count();
    let total = |v: Option<f64>| {
        v.filter(|n| *n != 0.0)
            .map(fmt_number)
            .unwrap_or_else(|| "—".into())
    };

    let mut p = Panel::new(record.title.clone()).with_subtitle("Script Analysis Complete");
    p.push(
        format!(
            "Pages {}  ·  Scenes {}  ·  Characters {}  ·  Locations {}",
            total(a.total_pages),
            total(a.total_scenes),
            a.characters.len(),
            a.locations.len()
        ),
        Tone::Accent,
    );
    p.push(
        format!(
            "Elements {}  ·  Challenges {}  ·  High Risk {}",
            elements,
            a.challenges.len(),
            high
        ),
        if high > 0 { Tone::Danger } else { Tone::Accent },
    );
    p
}

const STEPS: [(AnalysisStatus, &str); 4] = [
    (AnalysisStatus::Uploading, "Uploading Script"),
    (AnalysisStatus::Processing, "Extracting Text"),
    (AnalysisStatus::Analyzing, "AI Analysis"),
    (AnalysisStatus::Completed, "Complete"),
];

/// Index of the current lifecycle step; statuses outside the steps map to the first.
pub fn step_index(status: AnalysisStatus) -> usize {
    STEPS.iter().position(|(s, _)| *s == status).unwrap_or(0)
}

pub fn progress(status: AnalysisStatus) -> Panel {
    let (title, message) = match status {
        AnalysisStatus::Uploading => ("Analyzing Your Script", "Uploading your screenplay..."),
        AnalysisStatus::Processing => (
            "Analyzing Your Script",
            "Extracting and parsing script content...",
        ),
        AnalysisStatus::Analyzing => (
            "Analyzing Your Script",
            "AI is analyzing elements, budget, genre, and challenges...",
        ),
        AnalysisStatus::Completed => ("Analysis Complete", "Your script breakdown is ready!"),
        AnalysisStatus::Failed => ("Analysis Failed", ""),
    };

    let mut p = Panel::new(title);
    if !message.is_empty() {
        p.muted(message);
    }
    p.blank();

    let current = step_index(status);
    for (idx, (_, label)) in STEPS.iter().enumerate() {
        let (marker, tone) = if idx < current || status == AnalysisStatus::Completed {
            ("✓", Tone::Good)
        } else if idx == current {
            ("▶", Tone::Accent)
        } else {
            ("○", Tone::Muted)
        };
        p.push(format!("{marker} {label}"), tone);
    }

    if status == AnalysisStatus::Failed {
        p.blank();
        p.push(
            "The analysis failed. Start a new analysis to try again.",
            Tone::Danger,
        );
    }
    p
}

pub fn story(logline: Option<&str>, synopsis: Option<&str>) -> Option<Panel> {
    let logline = non_empty(logline);
    let synopsis = non_empty(synopsis);
    if logline.is_none() && synopsis.is_none() {
        return None;
    }
    let mut p = Panel::new("Story Overview");
    if let Some(l) = logline {
        p.push("Logline", Tone::Heading);
        p.push(format!("\"{l}\""), Tone::Accent);
    }
    if let Some(s) = synopsis {
        if logline.is_some() {
            p.blank();
        }
        p.push("Synopsis", Tone::Heading);
        p.text(s);
    }
    Some(p)
}

fn status_badge(status: AnalysisStatus) -> (&'static str, Tone) {
    match status {
        AnalysisStatus::Completed => ("Complete", Tone::Good),
        AnalysisStatus::Failed => ("Failed", Tone::Danger),
        _ => ("Processing", Tone::Warn),
    }
}

/// `Mar 4, 2024 • 9:05 PM` in the given offset; unparseable input is returned as-is.
pub fn format_created(created: &str, offset: UtcOffset) -> String {
    let date_fmt = format_description!("[month repr:short] [day padding:none], [year]");
    let time_fmt = format_description!("[hour repr:12 padding:none]:[minute] [period]");
    OffsetDateTime::parse(created, &Rfc3339)
        .ok()
        .map(|t| t.to_offset(offset))
        .and_then(|t| Some(format!("{} • {}", t.format(&date_fmt).ok()?, t.format(&time_fmt).ok()?)))
        .unwrap_or_else(|| created.to_string())
}

pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

pub fn history(records: &[AnalysisRecord], selected_id: Option<&str>) -> Panel {
    history_at(records, selected_id, local_offset())
}

fn history_at(records: &[AnalysisRecord], selected_id: Option<&str>, offset: UtcOffset) -> Panel {
    if records.is_empty() {
        let mut p = Panel::new("No Scripts Analyzed");
        p.muted("Upload your first screenplay to get started with AI-powered analysis.");
        return p;
    }
    let mut p = Panel::new("Previous Analyses");
    for r in records {
        let selected = selected_id == Some(r.id.as_str());
        let (badge, tone) = status_badge(r.status);
        p.push(
            format!(
                "{} {}  ·  {}  [{}]",
                if selected { "▸" } else { " " },
                r.title,
                format_created(&r.created_date, offset),
                badge
            ),
            if selected { Tone::Accent } else { tone },
        );
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BudgetTier, Challenge, Prop, ScriptAnalysis};

    fn record(id: &str, status: AnalysisStatus) -> AnalysisRecord {
        let mut r = AnalysisRecord::new(id.into(), format!("Script {id}"), "file:///x".into(), BudgetTier::Indie);
        r.status = status;
        r.created_date = "2024-03-04T21:05:00Z".into();
        r
    }

    #[test]
    fn summary_counts() {
        let mut r = record("a", AnalysisStatus::Completed);
        r.analysis = ScriptAnalysis {
            total_pages: Some(110.0),
            props: vec![Prop::default(), Prop::default()],
            challenges: vec![
                Challenge {
                    severity: Some("high".into()),
                    ..Default::default()
                },
                Challenge::default(),
            ],
            ..Default::default()
        };
        let p = summary(&r);
        assert_eq!(p.title, "Script a");
        assert!(p.contains("Pages 110  ·  Scenes —"));
        assert!(p.contains("Elements 2  ·  Challenges 2  ·  High Risk 1"));
    }

    #[test]
    fn progress_steps_follow_status() {
        let p = progress(AnalysisStatus::Analyzing);
        assert_eq!(p.title, "Analyzing Your Script");
        assert!(p.contains("✓ Extracting Text"));
        assert!(p.contains("▶ AI Analysis"));
        assert!(p.contains("○ Complete"));

        let done = progress(AnalysisStatus::Completed);
        assert!(done.contains("✓ Complete"));

        assert_eq!(step_index(AnalysisStatus::Failed), 0);
        let failed = progress(AnalysisStatus::Failed);
        assert!(failed.contains("▶ Uploading Script"));
        assert!(failed.lines.iter().any(|l| l.tone == Tone::Danger));
    }

    #[test]
    fn story_hidden_without_content() {
        assert!(story(None, Some("  ")).is_none());
        let p = story(Some("A cop must stop a heist."), None).unwrap();
        assert!(p.contains("\"A cop must stop a heist.\""));
    }

    #[test]
    fn created_date_format() {
        assert_eq!(
            format_created("2024-03-04T21:05:00Z", UtcOffset::UTC),
            "Mar 4, 2024 • 9:05 PM"
        );
        assert_eq!(format_created("garbage", UtcOffset::UTC), "garbage");
    }

    #[test]
    fn history_marks_selection_and_status() {
        let records = vec![
            record("a", AnalysisStatus::Completed),
            record("b", AnalysisStatus::Analyzing),
            record("c", AnalysisStatus::Failed),
        ];
        let p = history_at(&records, Some("b"), UtcOffset::UTC);
        assert_eq!(p.title, "Previous Analyses");
        assert_eq!(p.lines[0].text, "  Script a  ·  Mar 4, 2024 • 9:05 PM  [Complete]");
        assert!(p.lines[1].text.starts_with("▸ Script b"));
        assert!(p.lines[1].text.ends_with("[Processing]"));
        assert!(p.lines[2].text.ends_with("[Failed]"));

        let empty = history_at(&[], None, UtcOffset::UTC);
        assert_eq!(empty.title, "No Scripts Analyzed");
    }
}
