//! Post-run processing: optional JSON export and a history refresh.

use crate::export;
use crate::model::AnalysisRecord;
use crate::storage::RecordStore;
use std::path::PathBuf;
use tracing::warn;

/// Result of post-run processing, ready for presentation layers.
pub(crate) struct ProcessedRun {
    pub export_messages: Vec<String>,
    pub export_failed: bool,
    pub history: Vec<AnalysisRecord>,
}

/// Process a completed run: export if requested, then reload history.
/// A `history_load` of 0 skips the reload.
pub(crate) fn process_run_completion(
    store: &dyn RecordStore,
    export_json: Option<&PathBuf>,
    history_load: usize,
    record: &AnalysisRecord,
) -> ProcessedRun {
    let mut export_messages = Vec::new();
    let mut export_failed = false;
    if let Some(path) = export_json {
        match export::write_export(record, path) {
            Ok(()) => export_messages.push(format!("Exported JSON: {}", path.display())),
            Err(e) => {
                export_failed = true;
                export_messages.push(format!("Export JSON failed: {e:#}"));
            }
        }
    }

    let history = if history_load == 0 {
        Vec::new()
    } else {
        store.list(history_load).unwrap_or_else(|e| {
            warn!("history reload failed: {e}");
            Vec::new()
        })
    };

    ProcessedRun {
        export_messages,
        export_failed,
        history,
    }
}
