//! The breakdown instruction and the JSON schemas sent with it.

use serde_json::{json, Value};

use crate::model::truncate_chars;

/// Maximum characters of script text embedded in the prompt.
pub const MAX_PROMPT_SCRIPT_CHARS: usize = 350_000;

/// Maximum characters of extracted text stored on the record.
pub const MAX_STORED_TEXT_CHARS: usize = 200_000;

const INSTRUCTIONS: &str = r#"Provide a complete analysis covering:

1. LOGLINE & SYNOPSIS
- Logline: One compelling sentence in format "[Protagonist] must [Goal] or else [Consequence]"
- Synopsis: 150-word story summary with key plot points

2. HERO'S JOURNEY (12 stages)
Map each of these stages with page range, scene description, and purpose:
Ordinary World, Call to Adventure, Refusal of the Call, Meeting the Mentor, Crossing the Threshold, Tests/Allies/Enemies, Approach to Inmost Cave, Ordeal, Reward, The Road Back, Resurrection, Return with the Elixir

3. THREE-ACT STRUCTURE
Divide script into 3 acts with page ranges, percentages, emotional arcs, and turning points

4. EIGHT SEQUENCES
Break into 8 sequences (A-H), each with title, page range, key scenes, and narrative function

5. SCENES
Extract all scenes with: scene number, slugline, location, INT/EXT, time of day, page number, brief summary, characters present

6. PRODUCTION ELEMENTS
- Characters: name, age range, gender, scene count, special requirements, is_lead status
- Props: name, category (common/specialty/weapons_stunts)
- Wardrobe: description, character, period
- Vehicles/Animals: type, description
- VFX/SFX: type (vfx/sfx), description, complexity (simple/moderate/complex)

7. LOCATIONS
All unique locations with INT/EXT, time of day, description, scene count

8. BUDGET ESTIMATE
Min/max USD estimates for indie tier, top 3-5 cost drivers

9. GENRE & TONE
Primary genre, sub-genres, confidence (0-100), humor scale (slapstick/dry/none), pacing (meditative/medium/frenetic), visual style (gritty/naturalistic/stylized), comparable films

10. PRODUCTION CHALLENGES
Category (logistical/legal/scheduling/safety), description, severity (low/medium/high), scene reference

Include total_pages and total_scenes count."#;

/// Build the full breakdown prompt around the script text.
pub fn analysis_prompt(script_text: &str) -> String {
    format!(
        "You are an expert Hollywood script analyst. Analyze this complete screenplay comprehensively.\n\n\
         SCRIPT TEXT:\n{}\n\n{}",
        truncate_chars(script_text, MAX_PROMPT_SCRIPT_CHARS),
        INSTRUCTIONS
    )
}

fn string() -> Value {
    json!({ "type": "string" })
}

fn number() -> Value {
    json!({ "type": "number" })
}

fn strings() -> Value {
    json!({ "type": "array", "items": { "type": "string" } })
}

fn object(properties: Value) -> Value {
    json!({ "type": "object", "properties": properties })
}

fn array_of(properties: Value) -> Value {
    json!({ "type": "array", "items": object(properties) })
}

fn act() -> Value {
    object(json!({
        "page_range": string(),
        "percentage": number(),
        "emotional_arc": string(),
        "turning_points": strings(),
    }))
}

/// Response schema matching [`crate::model::ScriptAnalysis`].
pub fn analysis_schema() -> Value {
    object(json!({
        "logline": string(),
        "synopsis": string(),
        "heros_journey": array_of(json!({
            "stage": string(),
            "page_range": string(),
            "scene_reference": string(),
            "narrative_purpose": string(),
        })),
        "three_act_structure": object(json!({
            "act_one": act(),
            "act_two": act(),
            "act_three": act(),
        })),
        "eight_sequences": array_of(json!({
            "sequence_letter": string(),
            "title": string(),
            "page_range": string(),
            "key_scenes": strings(),
            "narrative_function": string(),
        })),
        "total_pages": number(),
        "total_scenes": number(),
        "scenes": array_of(json!({
            "scene_number": number(),
            "slugline": string(),
            "location": string(),
            "int_ext": string(),
            "time_of_day": string(),
            "page_number": number(),
            "summary": string(),
            "characters_present": strings(),
        })),
        "characters": array_of(json!({
            "name": string(),
            "age_range": string(),
            "gender": string(),
            "scene_count": number(),
            "special_requirements": strings(),
            "is_lead": { "type": "boolean" },
        })),
        "props": array_of(json!({
            "name": string(),
            "category": string(),
        })),
        "wardrobe": array_of(json!({
            "description": string(),
            "character": string(),
            "period": string(),
        })),
        "vehicles_animals": array_of(json!({
            "type": string(),
            "description": string(),
        })),
        "vfx_sfx": array_of(json!({
            "type": string(),
            "description": string(),
            "complexity": string(),
        })),
        "locations": array_of(json!({
            "slugline": string(),
            "int_ext": string(),
            "time_of_day": string(),
            "description": string(),
            "scene_count": number(),
        })),
        "budget_estimate": object(json!({
            "min": number(),
            "max": number(),
            "top_cost_drivers": strings(),
        })),
        "genre_analysis": object(json!({
            "primary_genre": string(),
            "sub_genres": strings(),
            "confidence": number(),
            "humor_scale": string(),
            "pacing_scale": string(),
            "visual_style": string(),
            "comparable_films": strings(),
        })),
        "challenges": array_of(json!({
            "category": string(),
            "description": string(),
            "severity": string(),
            "scene_reference": string(),
        })),
    }))
}

/// Schema for a model-backed text extraction: a single `full_text` string.
pub fn extraction_schema() -> Value {
    object(json!({ "full_text": string() }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_truncated_script() {
        let script = "é".repeat(MAX_PROMPT_SCRIPT_CHARS + 10);
        let p = analysis_prompt(&script);
        assert_eq!(p.matches('é').count(), MAX_PROMPT_SCRIPT_CHARS);
        assert!(p.starts_with("You are an expert Hollywood script analyst."));
        assert!(p.ends_with("Include total_pages and total_scenes count."));
    }

    #[test]
    fn prompt_names_all_sections() {
        let p = analysis_prompt("FADE IN:");
        for section in [
            "LOGLINE & SYNOPSIS",
            "HERO'S JOURNEY",
            "THREE-ACT STRUCTURE",
            "EIGHT SEQUENCES",
            "SCENES",
            "PRODUCTION ELEMENTS",
            "LOCATIONS",
            "BUDGET ESTIMATE",
            "GENRE & TONE",
            "PRODUCTION CHALLENGES",
        ] {
            assert!(p.contains(section), "missing {section}");
        }
        assert!(p.contains("SCRIPT TEXT:\nFADE IN:"));
    }

    #[test]
    fn schema_covers_payload_fields() {
        let schema = analysis_schema();
        let props = schema["properties"].as_object().unwrap();
        assert_eq!(props.len(), 17);
        assert_eq!(
            schema["properties"]["characters"]["items"]["properties"]["is_lead"]["type"],
            "boolean"
        );
        assert_eq!(
            schema["properties"]["three_act_structure"]["properties"]["act_two"]["properties"]
                ["turning_points"]["type"],
            "array"
        );
    }

    #[test]
    fn extraction_schema_has_full_text() {
        assert_eq!(
            extraction_schema()["properties"]["full_text"]["type"],
            "string"
        );
    }
}
