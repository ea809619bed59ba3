use super::{fmt_number, more_hint, non_empty, plural, Panel, Tone};
use crate::model::{Character, Location, Scene, ScriptAnalysis};

const SCENES_COLLAPSED: usize = 10;
const SCENE_CHARACTERS: usize = 5;
const CHARACTERS_COLLAPSED: usize = 6;
const LOCATIONS_COLLAPSED: usize = 6;
const ELEMENTS_PER_CARD: usize = 8;

/// Case-insensitive match on slugline, summary or any character present.
pub fn scene_matches(scene: &Scene, query: &str) -> bool {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return true;
    }
    let hit = |s: Option<&str>| s.is_some_and(|s| s.to_lowercase().contains(&q));
    hit(scene.slugline.as_deref())
        || hit(scene.summary.as_deref())
        || scene
            .characters_present
            .iter()
            .any(|c| c.to_lowercase().contains(&q))
}

pub fn scenes(scenes: &[Scene], filter: &str, expanded: bool) -> Panel {
    let mut p = Panel::new("Scene Breakdown");
    if scenes.is_empty() {
        p.muted("No scenes extracted");
        return p;
    }
    p.subtitle = Some(plural(scenes.len(), "scene"));

    let matching: Vec<(usize, &Scene)> = scenes
        .iter()
        .enumerate()
        .filter(|(_, s)| scene_matches(s, filter))
        .collect();
    if !filter.trim().is_empty() {
        p.muted(format!(
            "Filter \"{}\": {} of {}",
            filter.trim(),
            matching.len(),
            scenes.len()
        ));
    }

    let shown = if expanded {
        matching.len()
    } else {
        matching.len().min(SCENES_COLLAPSED)
    };
    for (idx, scene) in matching.iter().take(shown) {
        let number = scene.scene_number.unwrap_or(*idx as u32 + 1);
        let mut head = format!("{number:>3}. {}", scene.slugline.as_deref().unwrap_or(""));
        if let Some(ie) = non_empty(scene.int_ext.as_deref()) {
            head.push_str(&format!("  [{ie}]"));
        }
        if let Some(t) = non_empty(scene.time_of_day.as_deref()) {
            head.push_str(&format!("  [{t}]"));
        }
        if let Some(pg) = scene.page_number.filter(|p| *p != 0.0) {
            head.push_str(&format!("  p.{}", fmt_number(pg)));
        }
        p.push(head, Tone::Heading);
        if let Some(loc) = non_empty(scene.location.as_deref()) {
            p.muted(format!("     {loc}"));
        }
        if let Some(summary) = non_empty(scene.summary.as_deref()) {
            p.text(format!("     {summary}"));
        }
        if !scene.characters_present.is_empty() {
            let mut cast = scene
                .characters_present
                .iter()
                .take(SCENE_CHARACTERS)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ");
            if scene.characters_present.len() > SCENE_CHARACTERS {
                cast.push_str(&format!(
                    " +{} more",
                    scene.characters_present.len() - SCENE_CHARACTERS
                ));
            }
            p.muted(format!("     {cast}"));
        }
    }
    p.lines
        .extend(more_hint(matching.len(), shown, Some("scenes")));
    p
}

pub fn characters(characters: &[Character], expanded: bool) -> Panel {
    let mut p = Panel::new("Characters");
    if characters.is_empty() {
        p.muted("No characters extracted");
        return p;
    }
    let leads = characters.iter().filter(|c| c.is_lead).count();
    p.subtitle = Some(format!("{} speaking roles", characters.len()));
    p.push(
        format!(
            "{} Lead{}  ·  {} Supporting",
            leads,
            if leads == 1 { "" } else { "s" },
            characters.len() - leads
        ),
        Tone::Accent,
    );

    let shown = if expanded {
        characters.len()
    } else {
        characters.len().min(CHARACTERS_COLLAPSED)
    };
    for c in characters.iter().take(shown) {
        let mut line = format!("{} {}", if c.is_lead { "★" } else { " " }, c.name);
        for extra in [c.age_range.as_deref(), c.gender.as_deref()]
            .into_iter()
            .filter_map(non_empty)
        {
            line.push_str(&format!("  {extra}"));
        }
        if let Some(n) = c.scene_count {
            line.push_str(&format!("  {}", plural(n as usize, "scene")));
        }
        p.push(line, if c.is_lead { Tone::Heading } else { Tone::Normal });
        if !c.special_requirements.is_empty() {
            p.push(
                format!("    {}", c.special_requirements.join(" · ")),
                Tone::Warn,
            );
        }
    }
    p.lines.extend(more_hint(characters.len(), shown, None));
    p
}

fn is_night(time_of_day: Option<&str>) -> bool {
    time_of_day.is_some_and(|t| t.to_uppercase().contains("NIGHT"))
}

pub fn locations(locations: &[Location], expanded: bool) -> Panel {
    let mut p = Panel::new("Locations");
    if locations.is_empty() {
        p.muted("No locations extracted");
        return p;
    }
    let count_ie = |v: &str| {
        locations
            .iter()
            .filter(|l| l.int_ext.as_deref() == Some(v))
            .count()
    };
    let day = locations
        .iter()
        .filter(|l| {
            l.time_of_day
                .as_deref()
                .is_some_and(|t| t.to_uppercase().contains("DAY"))
        })
        .count();
    let night = locations
        .iter()
        .filter(|l| is_night(l.time_of_day.as_deref()))
        .count();

    p.subtitle = Some(format!("{} unique locations", locations.len()));
    p.push(
        format!(
            "Interior {}  ·  Exterior {}  ·  Day Scenes {}  ·  Night Scenes {}",
            count_ie("INT"),
            count_ie("EXT"),
            day,
            night
        ),
        Tone::Accent,
    );

    let shown = if expanded {
        locations.len()
    } else {
        locations.len().min(LOCATIONS_COLLAPSED)
    };
    for loc in locations.iter().take(shown) {
        let time = non_empty(loc.time_of_day.as_deref()).unwrap_or("DAY");
        let mut line = format!(
            "{}  [{}]  [{}]",
            loc.slugline.as_deref().unwrap_or(""),
            loc.int_ext.as_deref().unwrap_or(""),
            time
        );
        if let Some(n) = loc.scene_count {
            line.push_str(&format!("  {}", plural(n as usize, "scene")));
        }
        p.push(line, Tone::Heading);
        if let Some(d) = non_empty(loc.description.as_deref()) {
            p.muted(format!("    {d}"));
        }
    }
    p.lines.extend(more_hint(locations.len(), shown, None));
    p
}

/// One badge on an element card.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementItem {
    pub label: String,
    pub category: Option<String>,
}

fn first_of(options: &[Option<&str>]) -> Option<String> {
    options
        .iter()
        .copied()
        .find_map(non_empty)
        .map(str::to_string)
}

fn element_cards(a: &ScriptAnalysis) -> [(&'static str, Vec<ElementItem>); 4] {
    let props = a
        .props
        .iter()
        .map(|i| ElementItem {
            label: first_of(&[i.name.as_deref()]).unwrap_or_default(),
            category: first_of(&[i.category.as_deref()]),
        })
        .collect();
    let wardrobe = a
        .wardrobe
        .iter()
        .map(|i| ElementItem {
            label: first_of(&[i.description.as_deref()]).unwrap_or_default(),
            category: None,
        })
        .collect();
    let vehicles = a
        .vehicles_animals
        .iter()
        .map(|i| ElementItem {
            label: first_of(&[i.description.as_deref(), i.kind.as_deref()]).unwrap_or_default(),
            category: first_of(&[i.kind.as_deref()]),
        })
        .collect();
    let vfx = a
        .vfx_sfx
        .iter()
        .map(|i| ElementItem {
            label: first_of(&[i.description.as_deref(), i.kind.as_deref()]).unwrap_or_default(),
            category: first_of(&[i.complexity.as_deref(), i.kind.as_deref()]),
        })
        .collect();
    [
        ("Props", props),
        ("Wardrobe", wardrobe),
        ("Vehicles & Animals", vehicles),
        ("VFX / SFX", vfx),
    ]
}

pub fn element_tone(category: Option<&str>) -> Tone {
    match category {
        Some("weapons_stunts") | Some("complex") => Tone::Danger,
        Some("specialty") | Some("moderate") => Tone::Warn,
        _ => Tone::Normal,
    }
}

pub fn elements(a: &ScriptAnalysis) -> Panel {
    let mut p = Panel::new("Production Elements");
    let cards = element_cards(a);
    if cards.iter().all(|(_, items)| items.is_empty()) {
        p.muted("No production elements extracted");
        return p;
    }
    let mut first = true;
    for (title, items) in cards.iter().filter(|(_, items)| !items.is_empty()) {
        if !first {
            p.blank();
        }
        first = false;
        p.push(
            format!("{title}  ({})", plural(items.len(), "item")),
            Tone::Heading,
        );
        for item in items.iter().take(ELEMENTS_PER_CARD) {
            let category = item
                .category
                .as_deref()
                .map(|c| c.replace('_', " "))
                .unwrap_or_else(|| "Standard".into());
            p.push(
                format!("  • {}  ({category})", item.label),
                element_tone(item.category.as_deref()),
            );
        }
        if items.len() > ELEMENTS_PER_CARD {
            p.muted(format!("  +{} more", items.len() - ELEMENTS_PER_CARD));
        }
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Prop, VfxSfx, WardrobeItem};

    fn scene(n: u32, slug: &str, chars: &[&str]) -> Scene {
        Scene {
            scene_number: Some(n),
            slugline: Some(slug.into()),
            characters_present: chars.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn scene_search_is_case_insensitive() {
        let s = Scene {
            summary: Some("Maya cracks the safe".into()),
            ..scene(1, "INT. VAULT - NIGHT", &["MAYA", "Dev"])
        };
        assert!(scene_matches(&s, "vault"));
        assert!(scene_matches(&s, "CRACKS"));
        assert!(scene_matches(&s, "dev"));
        assert!(scene_matches(&s, ""));
        assert!(!scene_matches(&s, "beach"));
    }

    #[test]
    fn scenes_collapse_and_filter() {
        let list: Vec<Scene> = (1..=14)
            .map(|n| scene(n, &format!("EXT. STREET {n}"), &[]))
            .collect();
        let p = scenes(&list, "", false);
        assert_eq!(p.subtitle.as_deref(), Some("14 scenes"));
        assert!(p.contains("10. EXT. STREET 10"));
        assert!(!p.contains("11. EXT. STREET 11"));
        assert!(p.contains("Show all (4 more scenes)"));

        let filtered = scenes(&list, "street 1", false);
        assert!(filtered.contains("Filter \"street 1\": 6 of 14"));
        assert!(!filtered.contains("Show all"));
    }

    #[test]
    fn scene_cast_truncates_after_five() {
        let s = scene(1, "INT. BAR", &["A", "B", "C", "D", "E", "F", "G"]);
        let p = scenes(&[s], "", false);
        assert!(p.contains("A, B, C, D, E +2 more"));
    }

    #[test]
    fn character_counts() {
        let cs: Vec<Character> = (0..8)
            .map(|i| Character {
                name: format!("C{i}"),
                is_lead: i == 0,
                scene_count: Some(if i == 1 { 1 } else { 3 }),
                ..Default::default()
            })
            .collect();
        let p = characters(&cs, false);
        assert_eq!(p.subtitle.as_deref(), Some("8 speaking roles"));
        assert!(p.contains("1 Lead  ·  7 Supporting"));
        assert!(p.contains("★ C0  3 scenes"));
        assert!(p.contains("C1  1 scene"));
        assert!(!p.contains("C6"));
        assert!(p.contains("Show all (2 more)"));
    }

    #[test]
    fn location_counts_and_day_default() {
        let ls = vec![
            Location {
                slugline: Some("INT. HOUSE".into()),
                int_ext: Some("INT".into()),
                time_of_day: Some("Night".into()),
                scene_count: Some(2),
                ..Default::default()
            },
            Location {
                slugline: Some("EXT. FIELD".into()),
                int_ext: Some("EXT".into()),
                ..Default::default()
            },
        ];
        let p = locations(&ls, false);
        assert!(p.contains("Interior 1  ·  Exterior 1  ·  Day Scenes 0  ·  Night Scenes 1"));
        assert!(p.contains("EXT. FIELD  [EXT]  [DAY]"));
        assert!(p.contains("INT. HOUSE  [INT]  [Night]  2 scenes"));
    }

    #[test]
    fn element_labels_and_tones() {
        let a = ScriptAnalysis {
            props: (0..10)
                .map(|i| Prop {
                    name: Some(format!("Prop{i}")),
                    category: Some(if i == 0 { "weapons_stunts" } else { "common" }.into()),
                })
                .collect(),
            wardrobe: vec![WardrobeItem {
                description: Some("Tux".into()),
                ..Default::default()
            }],
            vfx_sfx: vec![VfxSfx {
                kind: Some("vfx".into()),
                description: None,
                complexity: Some("moderate".into()),
            }],
            ..Default::default()
        };
        let p = elements(&a);
        assert!(p.contains("Props  (10 items)"));
        assert!(p.contains("• Prop0  (weapons stunts)"));
        assert!(p.contains("+2 more"));
        assert!(p.contains("Wardrobe  (1 item)"));
        assert!(p.contains("• Tux  (Standard)"));
        assert!(p.contains("• vfx  (moderate)"));
        assert!(!p.contains("Vehicles & Animals"));

        assert_eq!(element_tone(Some("complex")), Tone::Danger);
        assert_eq!(element_tone(Some("specialty")), Tone::Warn);
        assert_eq!(element_tone(None), Tone::Normal);

        assert!(elements(&ScriptAnalysis::default()).contains("No production elements extracted"));
    }
}
