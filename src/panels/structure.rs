use super::{more_hint, non_empty, Panel, Tone};
use crate::model::{Act, HeroStage, Sequence, ThreeActStructure};

const JOURNEY_COLLAPSED: usize = 6;
const SEQUENCES_COLLAPSED: usize = 4;

pub(crate) const ACT_LABELS: [(&str, &str); 3] = [
    ("Act I", "Setup"),
    ("Act II", "Confrontation"),
    ("Act III", "Resolution"),
];

pub fn heros_journey(stages: &[HeroStage], expanded: bool) -> Option<Panel> {
    if stages.is_empty() {
        return None;
    }
    let mut p = Panel::new("Hero's Journey").with_subtitle(format!("{} stages", stages.len()));
    let shown = if expanded {
        stages.len()
    } else {
        stages.len().min(JOURNEY_COLLAPSED)
    };
    for (idx, stage) in stages.iter().take(shown).enumerate() {
        let name = non_empty(stage.stage.as_deref()).unwrap_or("Stage");
        match non_empty(stage.page_range.as_deref()) {
            Some(range) => p.push(format!("{}. {name}  [pp. {range}]", idx + 1), Tone::Heading),
            None => p.push(format!("{}. {name}", idx + 1), Tone::Heading),
        }
        if let Some(r) = non_empty(stage.scene_reference.as_deref()) {
            p.muted(format!("   {r}"));
        }
        if let Some(purpose) = non_empty(stage.narrative_purpose.as_deref()) {
            p.text(format!("   {purpose}"));
        }
    }
    p.lines.extend(more_hint(stages.len(), shown, None));
    Some(p)
}

/// Act shares for the timeline; missing or zero values fall back to 25/50/25.
pub fn act_percentages(structure: &ThreeActStructure) -> [f64; 3] {
    let defaults = [25.0, 50.0, 25.0];
    let acts = [&structure.act_one, &structure.act_two, &structure.act_three];
    let mut out = defaults;
    for (i, act) in acts.iter().enumerate() {
        if let Some(pct) = act.as_ref().and_then(|a| a.percentage).filter(|p| *p != 0.0) {
            out[i] = pct;
        }
    }
    out
}

pub fn three_act(structure: Option<&ThreeActStructure>) -> Option<Panel> {
    let structure = structure?;
    let pct = act_percentages(structure);
    let mut p = Panel::new("Three-Act Structure");
    p.push(
        format!(
            "Act I {:.0}%  |  Act II {:.0}%  |  Act III {:.0}%",
            pct[0], pct[1], pct[2]
        ),
        Tone::Accent,
    );

    let acts: [Option<&Act>; 3] = [
        structure.act_one.as_ref(),
        structure.act_two.as_ref(),
        structure.act_three.as_ref(),
    ];
    for (i, act) in acts.iter().enumerate() {
        let Some(act) = act else { continue };
        let (label, name) = ACT_LABELS[i];
        p.blank();
        let range = non_empty(act.page_range.as_deref())
            .map(|r| format!("  [pp. {r}]"))
            .unwrap_or_default();
        p.push(
            format!("{label}: {name}{range}  {:.0}%", pct[i]),
            Tone::Heading,
        );
        if let Some(arc) = non_empty(act.emotional_arc.as_deref()) {
            p.text(format!("   {arc}"));
        }
        for point in &act.turning_points {
            p.muted(format!("   • {point}"));
        }
    }
    Some(p)
}

/// Letter for a sequence, falling back to its position (A, B, ...).
pub(crate) fn sequence_letter(seq: &Sequence, idx: usize) -> String {
    non_empty(seq.sequence_letter.as_deref())
        .map(str::to_string)
        .unwrap_or_else(|| char::from(b'A' + (idx % 26) as u8).to_string())
}

pub(crate) fn sequence_title(seq: &Sequence, idx: usize) -> String {
    non_empty(seq.title.as_deref())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Sequence {}", idx + 1))
}

pub fn eight_sequences(sequences: &[Sequence], expanded: bool) -> Option<Panel> {
    if sequences.is_empty() {
        return None;
    }
    let mut p = Panel::new("Eight-Sequence Structure");
    let shown = if expanded {
        sequences.len()
    } else {
        sequences.len().min(SEQUENCES_COLLAPSED)
    };
    for (idx, seq) in sequences.iter().take(shown).enumerate() {
        if idx > 0 {
            p.blank();
        }
        let range = non_empty(seq.page_range.as_deref())
            .map(|r| format!("  [pp. {r}]"))
            .unwrap_or_default();
        p.push(
            format!(
                "Sequence {}: {}{range}",
                sequence_letter(seq, idx),
                sequence_title(seq, idx)
            ),
            Tone::Heading,
        );
        if let Some(f) = non_empty(seq.narrative_function.as_deref()) {
            p.text(format!("   {f}"));
        }
        for scene in &seq.key_scenes {
            p.muted(format!("   • {scene}"));
        }
    }
    p.lines.extend(more_hint(sequences.len(), shown, None));
    Some(p)
}
