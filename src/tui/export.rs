use crate::model::AnalysisRecord;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;
use std::time::Duration;

// Global clipboard manager channel - initialized once on first use
static CLIPBOARD_SENDER: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();

/// Write the export document for `record` into the current directory.
/// Returns the absolute path of the exported file.
pub fn export_record_json(record: &AnalysisRecord) -> Result<PathBuf> {
    let current_dir = std::env::current_dir().context("get current directory")?;
    let path = current_dir.join(crate::export::default_file_name(&record.title));
    crate::export::write_export(record, &path)?;
    Ok(path)
}

/// Start the clipboard thread on first use.
/// Each copy keeps its clipboard handle alive for a moment so clipboard managers on Linux
/// can take ownership of the contents.
fn init_clipboard_manager() -> Result<&'static std_mpsc::Sender<String>> {
    CLIPBOARD_SENDER.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();

        std::thread::spawn(move || {
            use arboard::Clipboard;

            for text in rx {
                match Clipboard::new() {
                    Ok(mut clipboard) => {
                        if let Err(e) = clipboard.set_text(&text) {
                            tracing::warn!("clipboard write failed: {e}");
                            continue;
                        }
                        std::thread::sleep(Duration::from_secs(2));
                    }
                    Err(e) => tracing::warn!("clipboard unavailable: {e}"),
                }
            }
        });

        tx
    });

    CLIPBOARD_SENDER
        .get()
        .ok_or_else(|| anyhow::anyhow!("Failed to initialize clipboard manager"))
}

/// Queue `text` for the clipboard thread; returns without waiting for the copy.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let sender = init_clipboard_manager()?;
    sender
        .send(text.to_string())
        .map_err(|_| anyhow::anyhow!("Clipboard manager channel closed"))?;
    Ok(())
}

/// Short form of a path for the status line.
pub fn display_path(path: &str) -> String {
    let chars: Vec<char> = path.chars().collect();
    if chars.len() > 60 {
        format!("…{}", chars[chars.len() - 57..].iter().collect::<String>())
    } else {
        path.to_string()
    }
}
