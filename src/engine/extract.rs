//! File-to-text integration.
//!
//! Plain text and Fountain are read directly, Final Draft XML is reduced to its text
//! runs, and PDFs are handed to `pdftotext`.

use regex::{Captures, Regex};
use serde_json::Value;
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;
use thiserror::Error;

use super::upload::file_url_to_path;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    PlainText,
    FinalDraftXml,
    PdfToText,
}

impl ExtractionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ExtractionMethod::PlainText => "plain text",
            ExtractionMethod::FinalDraftXml => "Final Draft XML",
            ExtractionMethod::PdfToText => "pdftotext",
        }
    }
}

#[derive(Debug)]
pub struct ExtractionResult {
    pub full_text: String,
    pub method: ExtractionMethod,
}

/// Turns an uploaded file into the complete script text.
///
/// `schema` describes the requested output and must ask for a `full_text` string.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, file_url: &str, schema: &Value) -> Result<ExtractionResult, ExtractionError>;
}

fn requests_full_text(schema: &Value) -> bool {
    schema
        .pointer("/properties/full_text/type")
        .and_then(Value::as_str)
        == Some("string")
}

#[derive(Debug, Default)]
pub struct LocalExtractor;

impl TextExtractor for LocalExtractor {
    fn extract(&self, file_url: &str, schema: &Value) -> Result<ExtractionResult, ExtractionError> {
        if !requests_full_text(schema) {
            return Err(ExtractionError::ExtractionFailed(
                "output schema does not request full_text".into(),
            ));
        }
        let path = file_url_to_path(file_url);
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "txt" | "fountain" => {
                let data = std::fs::read(&path)?;
                Ok(ExtractionResult {
                    full_text: String::from_utf8_lossy(&data).into_owned(),
                    method: ExtractionMethod::PlainText,
                })
            }
            "fdx" => {
                let data = std::fs::read(&path)?;
                Ok(ExtractionResult {
                    full_text: fdx_text(&String::from_utf8_lossy(&data)),
                    method: ExtractionMethod::FinalDraftXml,
                })
            }
            "pdf" => Ok(ExtractionResult {
                full_text: run_pdftotext(&path)?,
                method: ExtractionMethod::PdfToText,
            }),
            other => Err(ExtractionError::UnsupportedFileType(other.to_string())),
        }
    }
}

fn run_pdftotext(path: &Path) -> Result<String, ExtractionError> {
    let result = Command::new("pdftotext")
        .arg("-layout")
        .arg(path)
        .arg("-")
        .output();
    match result {
        Ok(output) if output.status.success() => {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        Ok(output) => Err(ExtractionError::ExtractionFailed(format!(
            "pdftotext failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ExtractionError::ToolNotFound("pdftotext".into()))
        }
        Err(e) => Err(ExtractionError::Io(e)),
    }
}

// Opening tags may be self-closing (`<Paragraph Type="Action"/>`), so `/>` ends the match
// without a body.
fn paragraph_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<Paragraph\b(?:[^>/]|/[^>])*(?:/>|>(.*?)</Paragraph>)")
            .expect("valid paragraph regex")
    })
}

fn text_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<Text\b(?:[^>/]|/[^>])*(?:/>|>(.*?)</Text>)").expect("valid text regex")
    })
}

fn numeric_entity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"&#(?:[xX]([0-9a-fA-F]+)|([0-9]+));").expect("valid entity regex")
    })
}

/// Concatenate the `<Text>` runs of each `<Paragraph>`, one paragraph per line.
fn fdx_text(xml: &str) -> String {
    let mut lines = Vec::new();
    for para in paragraph_re().captures_iter(xml) {
        let body = para.get(1).map_or("", |m| m.as_str());
        let line: String = text_re()
            .captures_iter(body)
            .filter_map(|t| t.get(1))
            .map(|t| decode_entities(t.as_str()))
            .collect();
        lines.push(line);
    }
    lines.join("\n")
}

fn decode_entities(s: &str) -> String {
    let s = numeric_entity_re().replace_all(s, |caps: &Captures| {
        let code = match caps.get(1) {
            Some(hex) => u32::from_str_radix(hex.as_str(), 16).ok(),
            None => caps[2].parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::upload::path_to_file_url;
    use crate::llm::prompt::extraction_schema;

    const FDX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<FinalDraft DocumentType="Script" Version="5">
  <Content>
    <Paragraph Type="Scene Heading"><Text>INT. DINER - NIGHT</Text></Paragraph>
    <Paragraph Type="Action"><Text>Rain hammers the glass. </Text><Text Style="Bold">Nobody moves.</Text></Paragraph>
    <Paragraph Type="Character"><Text>VINCENT</Text></Paragraph>
    <Paragraph Type="Dialogue"><Text>Fish &amp; chips &lt;again&gt;?</Text></Paragraph>
  </Content>
</FinalDraft>"#;

    #[test]
    fn fdx_paragraphs_become_lines() {
        let text = fdx_text(FDX);
        assert_eq!(
            text,
            "INT. DINER - NIGHT\nRain hammers the glass. Nobody moves.\nVINCENT\nFish & chips <again>?"
        );
    }

    #[test]
    fn fdx_self_closing_paragraphs_stay_separate() {
        let xml = r#"<Content>
    <Paragraph Type="Action"/>
    <Paragraph Type="Action"><Text>She runs.</Text><Text/></Paragraph>
    <Paragraph Type="Dialogue"><Text>It&#8217;s late &#x2014; go.</Text></Paragraph>
</Content>"#;
        assert_eq!(fdx_text(xml), "\nShe runs.\nIt\u{2019}s late \u{2014} go.");
    }

    #[test]
    fn bad_numeric_entities_are_kept() {
        assert_eq!(decode_entities("&#xD800; &amp;#38;"), "&#xD800; &#38;");
    }

    #[test]
    fn reads_plain_text_and_fountain() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("a.fountain");
        std::fs::write(&p, "EXT. BEACH - DAY\n\nWaves.").unwrap();
        let r = LocalExtractor.extract(&path_to_file_url(&p), &extraction_schema()).unwrap();
        assert_eq!(r.method, ExtractionMethod::PlainText);
        assert!(r.full_text.starts_with("EXT. BEACH"));
    }

    #[test]
    fn reads_fdx_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("a.fdx");
        std::fs::write(&p, FDX).unwrap();
        let r = LocalExtractor.extract(&path_to_file_url(&p), &extraction_schema()).unwrap();
        assert_eq!(r.method, ExtractionMethod::FinalDraftXml);
        assert!(r.full_text.contains("VINCENT"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let r = LocalExtractor.extract("file:///definitely/not/here.txt", &extraction_schema());
        assert!(matches!(r, Err(ExtractionError::Io(_))));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let r = LocalExtractor.extract("file:///tmp/script.docx", &extraction_schema());
        assert!(matches!(r, Err(ExtractionError::UnsupportedFileType(_))));
    }

    #[test]
    fn schema_must_request_full_text() {
        let schema = serde_json::json!({ "type": "object", "properties": { "text": { "type": "string" } } });
        let r = LocalExtractor.extract("file:///tmp/script.txt", &schema);
        assert!(matches!(r, Err(ExtractionError::ExtractionFailed(_))));
    }
}
