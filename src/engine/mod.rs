pub mod extract;
pub mod upload;

use crate::budget;
use crate::llm::{prompt, LanguageModel, LlmClient};
use crate::model::{
    truncate_chars, AnalysisEvent, AnalysisRecord, AnalysisStatus, BudgetTier, InfoEvent,
    RecordUpdate, RunConfig, ScriptAnalysis,
};
use crate::storage::{gen_record_id, JsonDirStore, RecordStore};
use anyhow::{bail, Context, Result};
use extract::{LocalExtractor, TextExtractor};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info, warn};
use upload::FileStorage;

/// Shown to the user when a run fails; details go to the log.
pub const FAILURE_MESSAGE: &str = "Analysis failed. Please try again.";

/// Drives one script through upload, extraction and model analysis.
pub struct AnalysisEngine {
    cfg: RunConfig,
    store: Arc<dyn RecordStore>,
    files: FileStorage,
    extractor: Arc<dyn TextExtractor>,
    model: Arc<dyn LanguageModel>,
}

impl AnalysisEngine {
    pub fn new(
        cfg: RunConfig,
        store: Arc<dyn RecordStore>,
        extractor: Arc<dyn TextExtractor>,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        let files = FileStorage::new(&cfg.data_dir);
        Self {
            cfg,
            store,
            files,
            extractor,
            model,
        }
    }

    /// Engine wired to the JSON record store, local extraction and the configured LLM.
    pub fn from_config(cfg: RunConfig) -> Result<Self> {
        let store = JsonDirStore::open(&cfg.data_dir)
            .with_context(|| format!("open record store in {}", cfg.data_dir.display()))?;
        let model = LlmClient::new(cfg.llm.clone(), cfg.llm_timeout, &cfg.user_agent)
            .context("build LLM client")?;
        Ok(Self::new(
            cfg,
            Arc::new(store),
            Arc::new(LocalExtractor),
            Arc::new(model),
        ))
    }

    pub fn store(&self) -> Arc<dyn RecordStore> {
        self.store.clone()
    }

    /// Upload + run.
    pub async fn analyze(
        &self,
        path: &Path,
        title: Option<&str>,
        event_tx: &UnboundedSender<AnalysisEvent>,
    ) -> Result<AnalysisRecord> {
        let record = match self.start(path, title, event_tx) {
            Ok(record) => record,
            Err(e) => {
                warn!(path = %path.display(), "analysis not started: {e:#}");
                let _ = event_tx.send(AnalysisEvent::StartFailed {
                    error: format!("{e:#}"),
                });
                return Err(e);
            }
        };
        self.run(record, event_tx).await
    }

    /// Validate and upload the file, then create its record in `uploading`.
    pub fn start(
        &self,
        path: &Path,
        title: Option<&str>,
        event_tx: &UnboundedSender<AnalysisEvent>,
    ) -> Result<AnalysisRecord> {
        let title = upload::resolve_title(path, title)?;
        let id = gen_record_id();
        let uploaded = self
            .files
            .upload(path, &id)
            .with_context(|| format!("upload {}", path.display()))?;
        let _ = event_tx.send(AnalysisEvent::Info(InfoEvent::Uploaded {
            file_name: uploaded.file_name.clone(),
            bytes: uploaded.bytes,
        }));

        let record = AnalysisRecord::new(id, title, uploaded.file_url, BudgetTier::Indie);
        let record = match self.store.create(&record) {
            Ok(record) => record,
            Err(e) => {
                self.files.discard(&record.file_url);
                return Err(anyhow::Error::new(e).context("create analysis record"));
            }
        };
        info!(id = %record.id, title = %record.title, "analysis started");
        let _ = event_tx.send(AnalysisEvent::StatusChanged {
            id: record.id.clone(),
            status: record.status,
        });
        Ok(record)
    }

    /// Run the lifecycle for a freshly created record. Any failure marks it `failed`.
    pub async fn run(
        &self,
        record: AnalysisRecord,
        event_tx: &UnboundedSender<AnalysisEvent>,
    ) -> Result<AnalysisRecord> {
        let id = record.id.clone();
        match self.run_stages(record, event_tx).await {
            Ok(done) => {
                info!(id = %done.id, "analysis completed");
                let _ = event_tx.send(AnalysisEvent::RunCompleted {
                    record: Box::new(done.clone()),
                });
                Ok(done)
            }
            Err(e) => {
                error!(id = %id, "analysis failed: {e:#}");
                self.mark_failed(&id, event_tx);
                let _ = event_tx.send(AnalysisEvent::Info(InfoEvent::Message(
                    FAILURE_MESSAGE.into(),
                )));
                let _ = event_tx.send(AnalysisEvent::RunFailed {
                    id,
                    error: format!("{e:#}"),
                });
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        record: AnalysisRecord,
        event_tx: &UnboundedSender<AnalysisEvent>,
    ) -> Result<AnalysisRecord> {
        let mut record = record;

        record = self
            .advance(&record, RecordUpdate::status(AnalysisStatus::Processing), event_tx)?;

        let extractor = self.extractor.clone();
        let file_url = record.file_url.clone();
        let extracted = tokio::task::spawn_blocking(move || {
            extractor.extract(&file_url, &prompt::extraction_schema())
        })
        .await
        .context("extraction task")?
        .context("extract script text")?;
        let script_text = extracted.full_text;
        let _ = event_tx.send(AnalysisEvent::Info(InfoEvent::TextExtracted {
            chars: script_text.chars().count(),
            method: extracted.method.as_str().to_string(),
        }));

        record = self.advance(
            &record,
            RecordUpdate {
                status: Some(AnalysisStatus::Analyzing),
                raw_text: Some(
                    truncate_chars(&script_text, prompt::MAX_STORED_TEXT_CHARS).to_string(),
                ),
                ..Default::default()
            },
            event_tx,
        )?;

        let _ = event_tx.send(AnalysisEvent::Info(InfoEvent::RequestingModel {
            model: self.model.model_name().to_string(),
        }));
        let value = self
            .model
            .invoke(
                &prompt::analysis_prompt(&script_text),
                &prompt::analysis_schema(),
            )
            .await
            .context("model invocation")?;
        let analysis: ScriptAnalysis =
            serde_json::from_value(value).context("model output does not match the schema")?;

        // The requested tier is part of the completing write.
        let mut completion = RecordUpdate {
            status: Some(AnalysisStatus::Completed),
            base_budget: analysis.budget_estimate.clone(),
            ..Default::default()
        };
        if self.cfg.budget_tier != BudgetTier::Indie {
            let mut priced = record.clone();
            priced.base_budget = completion.base_budget.clone();
            priced.analysis.budget_estimate = analysis.budget_estimate.clone();
            let tier = budget::tier_change(&priced, self.cfg.budget_tier);
            completion.budget_tier = tier.budget_tier;
            completion.budget_estimate = tier.budget_estimate;
            completion.base_budget = tier.base_budget;
        }
        completion.analysis = Some(Box::new(analysis));
        self.advance(&record, completion, event_tx)
    }

    /// Move a record to `failed` unless it already reached a terminal status.
    fn mark_failed(&self, id: &str, event_tx: &UnboundedSender<AnalysisEvent>) {
        match self.store.get(id) {
            Ok(current) if !current.status.can_advance_to(AnalysisStatus::Failed) => {
                warn!(id = %id, status = %current.status, "record already terminal; not marking failed");
                return;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(id = %id, "could not read record before marking failed: {e}");
                return;
            }
        }
        match self
            .store
            .update(id, RecordUpdate::status(AnalysisStatus::Failed))
        {
            Ok(_) => {
                let _ = event_tx.send(AnalysisEvent::StatusChanged {
                    id: id.to_string(),
                    status: AnalysisStatus::Failed,
                });
            }
            Err(store_err) => warn!(id = %id, "could not mark record failed: {store_err}"),
        }
    }

    /// Persist a status step and announce it.
    fn advance(
        &self,
        current: &AnalysisRecord,
        update: RecordUpdate,
        event_tx: &UnboundedSender<AnalysisEvent>,
    ) -> Result<AnalysisRecord> {
        let Some(next) = update.status else {
            bail!("status step without a status");
        };
        if !current.status.can_advance_to(next) {
            bail!("invalid status transition {} -> {}", current.status, next);
        }
        let updated = self
            .store
            .update(&current.id, update)
            .with_context(|| format!("set status {next}"))?;
        let _ = event_tx.send(AnalysisEvent::StatusChanged {
            id: updated.id.clone(),
            status: updated.status,
        });
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmConfig, LlmError};
    use crate::model::BudgetEstimate;
    use async_trait::async_trait;
    use extract::{ExtractionError, ExtractionMethod, ExtractionResult};
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct FakeExtractor {
        text: Option<String>,
    }

    impl TextExtractor for FakeExtractor {
        fn extract(&self, _file_url: &str, _schema: &Value) -> Result<ExtractionResult, ExtractionError> {
            match &self.text {
                Some(t) => Ok(ExtractionResult {
                    full_text: t.clone(),
                    method: ExtractionMethod::PlainText,
                }),
                None => Err(ExtractionError::ExtractionFailed("unreadable".into())),
            }
        }
    }

    struct FakeModel {
        reply: Result<Value, ()>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LanguageModel for FakeModel {
        fn model_name(&self) -> &str {
            "fake"
        }

        async fn invoke(&self, prompt: &str, _schema: &Value) -> Result<Value, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply
                .clone()
                .map_err(|_| LlmError::Connection("refused".into()))
        }
    }

    fn cfg(dir: &Path, tier: BudgetTier) -> RunConfig {
        RunConfig {
            data_dir: dir.to_path_buf(),
            llm: LlmConfig::default(),
            llm_timeout: Duration::from_secs(5),
            budget_tier: tier,
            user_agent: "test".into(),
        }
    }

    struct Harness {
        _dir: tempfile::TempDir,
        script: std::path::PathBuf,
        engine: AnalysisEngine,
        model: Arc<FakeModel>,
    }

    fn harness(text: Option<&str>, reply: Result<Value, ()>, tier: BudgetTier) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("heist.fountain");
        std::fs::write(&script, "FADE IN:").unwrap();
        let store = Arc::new(JsonDirStore::open(dir.path()).unwrap());
        let model = Arc::new(FakeModel {
            reply,
            prompts: Mutex::new(Vec::new()),
        });
        let engine = AnalysisEngine::new(
            cfg(dir.path(), tier),
            store,
            Arc::new(FakeExtractor {
                text: text.map(str::to_string),
            }),
            model.clone(),
        );
        Harness {
            _dir: dir,
            script,
            engine,
            model,
        }
    }

    fn statuses(rx: &mut mpsc::UnboundedReceiver<AnalysisEvent>) -> Vec<AnalysisStatus> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if let AnalysisEvent::StatusChanged { status, .. } = ev {
                out.push(status);
            }
        }
        out
    }

    fn analysis_json() -> Value {
        json!({
            "logline": "A safecracker must pull one last job or lose her family.",
            "total_pages": 104,
            "total_scenes": 2,
            "scenes": [{ "scene_number": 1, "slugline": "INT. VAULT - NIGHT" }],
            "budget_estimate": { "min": 1000000, "max": 3000000, "top_cost_drivers": ["Vault set"] }
        })
    }

    #[tokio::test]
    async fn successful_run_walks_every_status() {
        let h = harness(Some("FADE IN:"), Ok(analysis_json()), BudgetTier::Indie);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let record = h.engine.analyze(&h.script, None, &tx).await.unwrap();
        assert_eq!(record.status, AnalysisStatus::Completed);
        assert_eq!(record.title, "heist");
        assert_eq!(record.budget_tier, BudgetTier::Indie);
        assert_eq!(
            record.base_budget.as_ref().and_then(|b| b.min),
            Some(1_000_000.0)
        );
        assert_eq!(record.analysis.scenes.len(), 1);

        assert_eq!(
            statuses(&mut rx),
            vec![
                AnalysisStatus::Uploading,
                AnalysisStatus::Processing,
                AnalysisStatus::Analyzing,
                AnalysisStatus::Completed,
            ]
        );

        let stored = h.engine.store().get(&record.id).unwrap();
        assert_eq!(stored.raw_text.as_deref(), Some("FADE IN:"));
    }

    #[tokio::test]
    async fn extraction_failure_marks_record_failed() {
        let h = harness(None, Ok(analysis_json()), BudgetTier::Indie);
        let (tx, mut rx) = mpsc::unbounded_channel();

        assert!(h.engine.analyze(&h.script, Some("Heist"), &tx).await.is_err());
        let mut seen = Vec::new();
        let mut failed_event = false;
        while let Ok(ev) = rx.try_recv() {
            match ev {
                AnalysisEvent::StatusChanged { status, .. } => seen.push(status),
                AnalysisEvent::RunFailed { .. } => failed_event = true,
                _ => {}
            }
        }
        assert_eq!(
            seen,
            vec![
                AnalysisStatus::Uploading,
                AnalysisStatus::Processing,
                AnalysisStatus::Failed
            ]
        );
        assert!(failed_event);

        let records = h.engine.store().list(10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, AnalysisStatus::Failed);
        assert!(h.model.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn model_failure_marks_record_failed_after_analyzing() {
        let h = harness(Some("FADE IN:"), Err(()), BudgetTier::Indie);
        let (tx, mut rx) = mpsc::unbounded_channel();

        assert!(h.engine.analyze(&h.script, None, &tx).await.is_err());
        assert_eq!(
            statuses(&mut rx),
            vec![
                AnalysisStatus::Uploading,
                AnalysisStatus::Processing,
                AnalysisStatus::Analyzing,
                AnalysisStatus::Failed
            ]
        );
        let rec = &h.engine.store().list(1).unwrap()[0];
        assert_eq!(rec.status, AnalysisStatus::Failed);
        assert_eq!(rec.raw_text.as_deref(), Some("FADE IN:"));
    }

    #[tokio::test]
    async fn schema_mismatch_fails_run() {
        let h = harness(Some("x"), Ok(json!({ "scenes": "not a list" })), BudgetTier::Indie);
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(h.engine.analyze(&h.script, None, &tx).await.is_err());
        assert_eq!(
            h.engine.store().list(1).unwrap()[0].status,
            AnalysisStatus::Failed
        );
    }

    #[tokio::test]
    async fn stored_and_prompted_text_are_truncated() {
        let long = "a".repeat(prompt::MAX_PROMPT_SCRIPT_CHARS + 1000);
        let h = harness(Some(&long), Ok(analysis_json()), BudgetTier::Indie);
        let (tx, _rx) = mpsc::unbounded_channel();

        let record = h.engine.analyze(&h.script, None, &tx).await.unwrap();
        let stored = h.engine.store().get(&record.id).unwrap();
        assert_eq!(
            stored.raw_text.unwrap().chars().count(),
            prompt::MAX_STORED_TEXT_CHARS
        );
        let prompts = h.model.prompts.lock().unwrap();
        assert!(prompts[0].contains(&"a".repeat(prompt::MAX_PROMPT_SCRIPT_CHARS)));
        assert!(!prompts[0].contains(&"a".repeat(prompt::MAX_PROMPT_SCRIPT_CHARS + 1)));
    }

    #[tokio::test]
    async fn configured_tier_is_written_with_completion() {
        let h = harness(Some("x"), Ok(analysis_json()), BudgetTier::Micro);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let record = h.engine.analyze(&h.script, None, &tx).await.unwrap();
        assert_eq!(
            statuses(&mut rx).last(),
            Some(&AnalysisStatus::Completed)
        );
        let stored = h.engine.store().get(&record.id).unwrap();
        assert_eq!(stored, record);
        assert_eq!(stored.base_budget.as_ref().and_then(|b| b.min), Some(1_000_000.0));
        assert_eq!(record.budget_tier, BudgetTier::Micro);
        assert_eq!(
            record.analysis.budget_estimate,
            Some(BudgetEstimate {
                min: Some(100_000.0),
                max: Some(900_000.0),
                top_cost_drivers: vec!["Vault set".into()],
            })
        );
    }

    #[tokio::test]
    async fn rejects_unsupported_file_before_creating_record() {
        let h = harness(Some("x"), Ok(analysis_json()), BudgetTier::Indie);
        let bad = h.script.with_extension("docx");
        std::fs::write(&bad, "x").unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        assert!(h.engine.analyze(&bad, None, &tx).await.is_err());
        assert!(h.engine.store().list(10).unwrap().is_empty());
        match rx.try_recv() {
            Ok(AnalysisEvent::StartFailed { error }) => assert!(error.contains("heist.docx")),
            other => panic!("expected StartFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_file_reports_start_failure() {
        let h = harness(Some("x"), Ok(analysis_json()), BudgetTier::Indie);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let missing = h.script.with_file_name("nowhere.fountain");
        assert!(h.engine.analyze(&missing, None, &tx).await.is_err());
        assert!(matches!(rx.try_recv(), Ok(AnalysisEvent::StartFailed { .. })));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn completed_record_is_never_marked_failed() {
        let h = harness(Some("x"), Ok(analysis_json()), BudgetTier::Indie);
        let store = h.engine.store();
        let mut record = AnalysisRecord::new(
            "done".into(),
            "Done".into(),
            "file:///done.txt".into(),
            BudgetTier::Indie,
        );
        record.status = AnalysisStatus::Completed;
        store.create(&record).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        h.engine.mark_failed("done", &tx);
        assert_eq!(store.get("done").unwrap().status, AnalysisStatus::Completed);
        assert!(rx.try_recv().is_err());
    }

    struct RefusingStore;

    impl RecordStore for RefusingStore {
        fn list(&self, _limit: usize) -> Result<Vec<AnalysisRecord>, crate::storage::StoreError> {
            Ok(Vec::new())
        }
        fn get(&self, id: &str) -> Result<AnalysisRecord, crate::storage::StoreError> {
            Err(crate::storage::StoreError::NotFound(id.to_string()))
        }
        fn create(&self, record: &AnalysisRecord) -> Result<AnalysisRecord, crate::storage::StoreError> {
            Err(crate::storage::StoreError::AlreadyExists(record.id.clone()))
        }
        fn update(
            &self,
            id: &str,
            _update: RecordUpdate,
        ) -> Result<AnalysisRecord, crate::storage::StoreError> {
            Err(crate::storage::StoreError::NotFound(id.to_string()))
        }
        fn delete(&self, _id: &str) -> Result<(), crate::storage::StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_record_creation_removes_the_upload() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("pilot.txt");
        std::fs::write(&script, "FADE IN:").unwrap();
        let engine = AnalysisEngine::new(
            cfg(dir.path(), BudgetTier::Indie),
            Arc::new(RefusingStore),
            Arc::new(FakeExtractor { text: None }),
            Arc::new(FakeModel {
                reply: Err(()),
                prompts: Mutex::new(Vec::new()),
            }),
        );
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(engine.analyze(&script, None, &tx).await.is_err());
        let leftovers = std::fs::read_dir(dir.path().join("uploads")).unwrap().count();
        assert_eq!(leftovers, 0);
    }
}
