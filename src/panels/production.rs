use super::{non_empty, Panel, Tone};
use crate::budget::format_currency;
use crate::model::{BudgetEstimate, BudgetTier, Challenge, GenreAnalysis};

const DISCLAIMER: &str = "Preliminary Estimate: this is an AI-generated estimate based on script \
elements. Actual costs may vary significantly based on production choices, locations, and market \
conditions.";

pub fn budget(estimate: Option<&BudgetEstimate>, tier: BudgetTier) -> Panel {
    let mut p = Panel::new("Budget Estimate");
    let Some(est) = estimate.filter(|e| {
        e.min.is_some_and(|v| v != 0.0) || e.max.is_some_and(|v| v != 0.0)
    }) else {
        p.muted("No budget estimate available");
        return p;
    };

    let tiers = [BudgetTier::Micro, BudgetTier::Indie, BudgetTier::Studio];
    let selector = tiers
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let label = t.info().label;
            if *t == tier {
                format!("[{}] ({label})", i + 1)
            } else {
                format!("[{}] {label}", i + 1)
            }
        })
        .collect::<Vec<_>>()
        .join("  ");
    p.muted(selector);

    let amount = |v: Option<f64>| v.map(format_currency).unwrap_or_else(|| "—".into());
    p.push(
        format!("{} — {}", amount(est.min), amount(est.max)),
        Tone::Accent,
    );
    let info = tier.info();
    p.push(
        format!("{} Production  ({})", info.label, info.range),
        Tone::Heading,
    );

    if !est.top_cost_drivers.is_empty() {
        p.blank();
        p.push("Top Cost Drivers", Tone::Heading);
        for (idx, driver) in est.top_cost_drivers.iter().enumerate() {
            p.push(
                format!("  {}. {driver}", idx + 1),
                if idx == 0 { Tone::Warn } else { Tone::Normal },
            );
        }
    }
    p.blank();
    p.muted(DISCLAIMER);
    p
}

/// Position (0..=100) of a tone value on its scale; unknown values sit in the middle.
pub fn scale_position(value: &str) -> u16 {
    match value.trim().to_lowercase().as_str() {
        "slapstick" | "meditative" | "gritty" => 0,
        "dry" | "medium" | "naturalistic" => 50,
        "none" | "frenetic" | "stylized" | "saturated" => 100,
        _ => 50,
    }
}

/// The three tone scales shown for a genre analysis: (label, value, left, right).
pub fn tone_scales(g: &GenreAnalysis) -> Vec<(&'static str, &str, &'static str, &'static str)> {
    [
        ("Humor", g.humor_scale.as_deref(), "Slapstick", "None"),
        ("Pacing", g.pacing_scale.as_deref(), "Meditative", "Frenetic"),
        ("Visual Style", g.visual_style.as_deref(), "Gritty", "Stylized"),
    ]
    .into_iter()
    .filter_map(|(label, v, l, r)| non_empty(v).map(|v| (label, v, l, r)))
    .collect()
}

fn scale_bar(position: u16) -> String {
    const WIDTH: usize = 20;
    let filled = (position as usize * WIDTH) / 100;
    let mut bar = "=".repeat(filled.min(WIDTH));
    bar.push('|');
    bar.push_str(&"-".repeat(WIDTH - filled.min(WIDTH)));
    bar
}

pub fn genre(genre: Option<&GenreAnalysis>) -> Panel {
    let Some(g) = genre.filter(|g| non_empty(g.primary_genre.as_deref()).is_some()) else {
        let mut p = Panel::new("Genre & Tone");
        p.muted("No genre analysis available");
        return p;
    };
    let mut p = Panel::new("Genre & Tone Analysis");
    let mut head = g.primary_genre.clone().unwrap_or_default();
    if let Some(c) = g.confidence {
        head.push_str(&format!("  ({}% confidence)", super::fmt_number(c)));
    }
    p.push(head, Tone::Heading);
    if !g.sub_genres.is_empty() {
        p.muted(g.sub_genres.join(" · "));
    }

    let scales = tone_scales(g);
    if !scales.is_empty() {
        p.blank();
    }
    for (label, value, left, right) in scales {
        p.text(format!(
            "{label:<12} {left:>10} [{}] {right:<9} {value}",
            scale_bar(scale_position(value))
        ));
    }

    if !g.comparable_films.is_empty() {
        p.blank();
        p.push("Comparable Films", Tone::Heading);
        for film in &g.comparable_films {
            p.text(format!("  • {film}"));
        }
    }
    p
}

pub fn challenge_label(category: &str) -> &'static str {
    match category {
        "legal" => "Legal/Clearance",
        "scheduling" => "Scheduling",
        "safety" => "Safety/Stunts",
        _ => "Logistical",
    }
}

fn severity_tone(severity: &str) -> Tone {
    match severity {
        "high" => Tone::Danger,
        "medium" => Tone::Warn,
        _ => Tone::Muted,
    }
}

/// Challenges grouped by category in first-seen order; missing categories are logistical.
pub fn group_challenges(challenges: &[Challenge]) -> Vec<(String, Vec<&Challenge>)> {
    let mut groups: Vec<(String, Vec<&Challenge>)> = Vec::new();
    for c in challenges {
        let cat = non_empty(c.category.as_deref()).unwrap_or("logistical");
        match groups.iter_mut().find(|(k, _)| k == cat) {
            Some((_, items)) => items.push(c),
            None => groups.push((cat.to_string(), vec![c])),
        }
    }
    groups
}

pub fn challenges(challenges: &[Challenge]) -> Panel {
    let mut p = Panel::new("Production Challenges");
    if challenges.is_empty() {
        p.muted("No significant challenges flagged");
        return p;
    }
    let count = |sev: &str| {
        challenges
            .iter()
            .filter(|c| c.severity.as_deref() == Some(sev))
            .count()
    };
    p.subtitle = Some(format!("{} flags identified", challenges.len()));
    let (high, medium) = (count("high"), count("medium"));
    let mut badges = Vec::new();
    if high > 0 {
        badges.push(format!("{high} High"));
    }
    if medium > 0 {
        badges.push(format!("{medium} Medium"));
    }
    if !badges.is_empty() {
        p.push(
            badges.join("  ·  "),
            if high > 0 { Tone::Danger } else { Tone::Warn },
        );
    }

    for (category, items) in group_challenges(challenges) {
        p.blank();
        p.push(
            format!("{} ({})", challenge_label(&category), items.len()),
            Tone::Heading,
        );
        for c in items {
            let severity = non_empty(c.severity.as_deref()).unwrap_or("medium");
            p.push(
                format!(
                    "  [{severity}] {}",
                    c.description.as_deref().unwrap_or("")
                ),
                severity_tone(severity),
            );
            if let Some(r) = non_empty(c.scene_reference.as_deref()) {
                p.muted(format!("      Scene: {r}"));
            }
        }
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_lines() {
        let est = BudgetEstimate {
            min: Some(750_000.0),
            max: Some(2_500_000.0),
            top_cost_drivers: vec!["Car chase".into(), "Period sets".into()],
        };
        let p = budget(Some(&est), BudgetTier::Indie);
        assert!(p.contains("$750K — $2.5M"));
        assert!(p.contains("Independent Production  ($500K - $5M)"));
        assert!(p.contains("[2] (Independent)"));
        assert!(p.contains("1. Car chase"));
        assert!(p.contains("Preliminary Estimate"));

        let none = budget(
            Some(&BudgetEstimate {
                min: Some(0.0),
                max: None,
                top_cost_drivers: vec![],
            }),
            BudgetTier::Studio,
        );
        assert!(none.contains("No budget estimate available"));
        assert!(budget(None, BudgetTier::Indie).contains("No budget estimate available"));
    }

    #[test]
    fn scale_positions() {
        assert_eq!(scale_position("Slapstick"), 0);
        assert_eq!(scale_position("dry"), 50);
        assert_eq!(scale_position("none"), 100);
        assert_eq!(scale_position("meditative"), 0);
        assert_eq!(scale_position("frenetic"), 100);
        assert_eq!(scale_position("naturalistic"), 50);
        assert_eq!(scale_position("saturated"), 100);
        assert_eq!(scale_position("whimsical"), 50);
        assert_eq!(scale_bar(50), "==========|----------");
    }

    #[test]
    fn genre_panel() {
        let g = GenreAnalysis {
            primary_genre: Some("Thriller".into()),
            confidence: Some(85.0),
            humor_scale: Some("dry".into()),
            comparable_films: vec!["Heat".into()],
            ..Default::default()
        };
        let p = genre(Some(&g));
        assert_eq!(p.title, "Genre & Tone Analysis");
        assert!(p.contains("Thriller  (85% confidence)"));
        assert!(p.contains("Humor"));
        assert!(!p.contains("Pacing"));
        assert!(p.contains("• Heat"));

        let empty = genre(Some(&GenreAnalysis::default()));
        assert_eq!(empty.title, "Genre & Tone");
        assert!(empty.contains("No genre analysis available"));
    }

    #[test]
    fn challenges_grouped_in_first_seen_order() {
        let cs = vec![
            Challenge {
                category: Some("safety".into()),
                severity: Some("high".into()),
                description: Some("Rooftop fight".into()),
                scene_reference: Some("42".into()),
            },
            Challenge {
                description: Some("Company moves".into()),
                ..Default::default()
            },
            Challenge {
                category: Some("safety".into()),
                severity: Some("medium".into()),
                description: Some("Fire gag".into()),
                ..Default::default()
            },
        ];
        let groups = group_challenges(&cs);
        let keys: Vec<_> = groups.iter().map(|(k, v)| (k.as_str(), v.len())).collect();
        assert_eq!(keys, vec![("safety", 2), ("logistical", 1)]);

        let p = challenges(&cs);
        assert_eq!(p.subtitle.as_deref(), Some("3 flags identified"));
        assert!(p.contains("1 High  ·  1 Medium"));
        assert!(p.contains("Safety/Stunts (2)"));
        assert!(p.contains("[high] Rooftop fight"));
        assert!(p.contains("Scene: 42"));
        assert!(p.contains("Logistical (1)"));
        assert!(p.contains("[medium] Company moves"));

        assert!(challenges(&[]).contains("No significant challenges flagged"));
        assert_eq!(challenge_label("weather"), "Logistical");
    }
}
