//! Drill-down map: acts, then their sequences, then the hero's journey, then the scenes
//! inside one journey stage's page range.

use super::structure::{sequence_letter, sequence_title, ACT_LABELS};
use super::{fmt_number, non_empty, Panel, Tone};
use crate::model::{Act, HeroStage, Scene, ScriptAnalysis, Sequence};
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NarrativeLevel {
    #[default]
    Acts,
    Sequences {
        act: usize,
    },
    Journey {
        act: usize,
        sequence: usize,
    },
    Scenes {
        act: usize,
        sequence: usize,
        stage: usize,
    },
}

/// Where the user is in the map and which item is highlighted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NarrativeNav {
    pub level: NarrativeLevel,
    pub cursor: usize,
}

impl NarrativeNav {
    fn item_count(&self, a: &ScriptAnalysis) -> usize {
        match self.level {
            NarrativeLevel::Acts => 3,
            NarrativeLevel::Sequences { act } => sequences_for_act(&a.eight_sequences, act).len(),
            NarrativeLevel::Journey { .. } => a.heros_journey.len(),
            NarrativeLevel::Scenes { .. } => 0,
        }
    }

    pub fn next(&mut self, a: &ScriptAnalysis) {
        let n = self.item_count(a);
        if n > 0 {
            self.cursor = (self.cursor + 1) % n;
        }
    }

    pub fn prev(&mut self, a: &ScriptAnalysis) {
        let n = self.item_count(a);
        if n > 0 {
            self.cursor = (self.cursor + n - 1) % n;
        }
    }

    /// Open the highlighted item.
    pub fn drill(&mut self, a: &ScriptAnalysis) {
        if self.cursor >= self.item_count(a) {
            return;
        }
        self.level = match self.level {
            NarrativeLevel::Acts => NarrativeLevel::Sequences { act: self.cursor },
            NarrativeLevel::Sequences { act } => {
                let seqs = sequences_for_act(&a.eight_sequences, act);
                NarrativeLevel::Journey {
                    act,
                    sequence: seqs[self.cursor].0,
                }
            }
            NarrativeLevel::Journey { act, sequence } => NarrativeLevel::Scenes {
                act,
                sequence,
                stage: self.cursor,
            },
            NarrativeLevel::Scenes { .. } => return,
        };
        self.cursor = 0;
    }

    /// Step back one level, re-highlighting the item that was opened.
    pub fn back(&mut self, a: &ScriptAnalysis) {
        let (level, cursor) = match self.level {
            NarrativeLevel::Acts => return,
            NarrativeLevel::Sequences { act } => (NarrativeLevel::Acts, act),
            NarrativeLevel::Journey { act, sequence } => {
                let pos = sequences_for_act(&a.eight_sequences, act)
                    .iter()
                    .position(|(i, _)| *i == sequence)
                    .unwrap_or(0);
                (NarrativeLevel::Sequences { act }, pos)
            }
            NarrativeLevel::Scenes {
                act,
                sequence,
                stage,
            } => (NarrativeLevel::Journey { act, sequence }, stage),
        };
        self.level = level;
        self.cursor = cursor;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Position of a sequence letter in the alphabet (`A` = 0).
fn letter_index(seq: &Sequence, idx: usize) -> usize {
    sequence_letter(seq, idx)
        .chars()
        .next()
        .map(|c| c.to_ascii_uppercase())
        .filter(char::is_ascii_uppercase)
        .map(|c| (c as u8 - b'A') as usize)
        .unwrap_or(idx)
}

/// Sequences belonging to an act: A–B for act one, C–F for act two, G–H for act three.
pub fn sequences_for_act(sequences: &[Sequence], act: usize) -> Vec<(usize, &Sequence)> {
    sequences
        .iter()
        .enumerate()
        .filter(|(idx, seq)| {
            let li = letter_index(seq, *idx);
            match act {
                0 => li <= 1,
                1 => (2..=5).contains(&li),
                _ => li >= 6,
            }
        })
        .collect()
}

fn digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid digits regex"))
}

/// Page bounds of a stage: the first two numbers in its page range, else 0 and 999.
pub fn stage_page_bounds(page_range: Option<&str>) -> (f64, f64) {
    let nums: Vec<f64> = page_range
        .map(|r| {
            digits_re()
                .find_iter(r)
                .take(2)
                .filter_map(|m| m.as_str().parse::<f64>().ok())
                .collect()
        })
        .unwrap_or_default();
    let start = nums.first().copied().unwrap_or(0.0);
    let end = nums.get(1).copied().filter(|e| *e != 0.0).unwrap_or(999.0);
    (start, end)
}

pub fn scenes_in_stage<'a>(scenes: &'a [Scene], stage: &HeroStage) -> Vec<&'a Scene> {
    let (start, end) = stage_page_bounds(stage.page_range.as_deref());
    scenes
        .iter()
        .filter(|s| s.page_number.is_some_and(|p| p >= start && p <= end))
        .collect()
}

fn act_of(a: &ScriptAnalysis, idx: usize) -> Option<&Act> {
    let s = a.three_act_structure.as_ref()?;
    match idx {
        0 => s.act_one.as_ref(),
        1 => s.act_two.as_ref(),
        _ => s.act_three.as_ref(),
    }
}

fn cursor_line(p: &mut Panel, selected: bool, text: String) {
    if selected {
        p.push(format!("› {text}"), Tone::Accent);
    } else {
        p.text(format!("  {text}"));
    }
}

pub fn narrative_map(a: &ScriptAnalysis, nav: &NarrativeNav) -> Option<Panel> {
    if a.three_act_structure.is_none() && a.eight_sequences.is_empty() && a.heros_journey.is_empty()
    {
        return None;
    }

    let p = match nav.level {
        NarrativeLevel::Acts => {
            let mut p = Panel::new("Narrative Universe").with_subtitle("Explore the three-act structure");
            for (idx, (label, name)) in ACT_LABELS.iter().enumerate() {
                let detail = act_of(a, idx)
                    .map(|act| {
                        let range = non_empty(act.page_range.as_deref()).unwrap_or("—");
                        let pct = act.percentage.map(fmt_number).unwrap_or_else(|| "—".into());
                        format!("  [pp. {range}]  {pct}%")
                    })
                    .unwrap_or_default();
                cursor_line(&mut p, nav.cursor == idx, format!("{label} · {name}{detail}"));
            }
            p
        }
        NarrativeLevel::Sequences { act } => {
            let name = ["ACT ONE", "ACT TWO", "ACT THREE"][act.min(2)];
            let mut p = Panel::new(format!("Sequences - {name}"))
                .with_subtitle("Drill into eight sequences");
            let seqs = sequences_for_act(&a.eight_sequences, act);
            if seqs.is_empty() {
                p.muted("No sequences in this act");
            }
            for (pos, (idx, seq)) in seqs.iter().enumerate() {
                let range = non_empty(seq.page_range.as_deref()).unwrap_or("");
                cursor_line(
                    &mut p,
                    nav.cursor == pos,
                    format!(
                        "{}  {}  {range}",
                        sequence_letter(seq, *idx),
                        sequence_title(seq, *idx)
                    ),
                );
            }
            p
        }
        NarrativeLevel::Journey { .. } => {
            let mut p = Panel::new("Hero's Journey").with_subtitle("Navigate the hero's path");
            if a.heros_journey.is_empty() {
                p.muted("No journey stages mapped");
            }
            for (idx, stage) in a.heros_journey.iter().enumerate() {
                cursor_line(
                    &mut p,
                    nav.cursor == idx,
                    format!(
                        "Stage {}  {}  {}",
                        idx + 1,
                        non_empty(stage.stage.as_deref()).unwrap_or(""),
                        non_empty(stage.page_range.as_deref()).unwrap_or("")
                    ),
                );
                if let Some(r) = non_empty(stage.scene_reference.as_deref()) {
                    p.muted(format!("    {r}"));
                }
            }
            p
        }
        NarrativeLevel::Scenes { stage, .. } => {
            let hero = a.heros_journey.get(stage).cloned().unwrap_or_default();
            let mut p = Panel::new(format!(
                "Scenes - {}",
                non_empty(hero.stage.as_deref()).unwrap_or("")
            ))
            .with_subtitle("Scene-by-scene breakdown");
            let scenes = scenes_in_stage(&a.scenes, &hero);
            if scenes.is_empty() {
                p.muted("No scenes found for this stage");
            }
            for scene in scenes {
                p.push(
                    format!(
                        "Scene {}  Page {}  {}",
                        scene.scene_number.map(|n| n.to_string()).unwrap_or_default(),
                        scene.page_number.map(fmt_number).unwrap_or_default(),
                        scene.slugline.as_deref().unwrap_or("")
                    ),
                    Tone::Heading,
                );
                if let Some(s) = non_empty(scene.summary.as_deref()) {
                    p.text(format!("    {s}"));
                }
                if !scene.characters_present.is_empty() {
                    p.muted(format!("    {}", scene.characters_present.join(", ")));
                }
            }
            p
        }
    };

    let mut p = p;
    let hint = match nav.level {
        NarrativeLevel::Acts => "[ ] move  ·  n open",
        NarrativeLevel::Scenes { .. } => "b back",
        _ => "[ ] move  ·  n open  ·  b back",
    };
    p.muted(hint);
    Some(p)
}
