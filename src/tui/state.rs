use crate::engine::FAILURE_MESSAGE;
use crate::model::{AnalysisEvent, AnalysisRecord, AnalysisStatus};
use crate::panels::{NarrativeNav, ViewOptions};
use std::path::PathBuf;

pub const TAB_ANALYSIS: usize = 0;
pub const TAB_HISTORY: usize = 1;
pub const TAB_HELP: usize = 2;

/// What the Analysis tab is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Upload,
    Progress,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    EditPath,
    EditTitle,
    EditFilter,
}

pub struct UiState {
    pub tab: usize,
    pub view: View,
    pub mode: InputMode,
    pub info: String,

    pub history: Vec<AnalysisRecord>,
    pub history_selected: usize, // Cursor in the History tab (0 = most recent)
    pub history_load: usize,

    /// Record shown in Progress/Results; `None` while on the upload form or watching a
    /// run whose record has not been created yet.
    pub selected: Option<AnalysisRecord>,
    /// The view is following a record that is still being processed.
    pub processing: bool,
    pub run_in_flight: bool,
    pub active_run_id: Option<String>,
    pub live_status: Option<AnalysisStatus>,

    pub path_input: String,
    pub title_input: String,

    pub view_opts: ViewOptions,
    pub nav: NarrativeNav,
    pub scroll: u16,
    pub last_exported_path: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: TAB_ANALYSIS,
            view: View::Upload,
            mode: InputMode::Normal,
            info: String::new(),
            history: Vec::new(),
            history_selected: 0,
            history_load: crate::storage::DEFAULT_LIST_LIMIT,
            selected: None,
            processing: false,
            run_in_flight: false,
            active_run_id: None,
            live_status: None,
            path_input: String::new(),
            title_input: String::new(),
            view_opts: ViewOptions::default(),
            nav: NarrativeNav::default(),
            scroll: 0,
            last_exported_path: None,
        }
    }
}

impl UiState {
    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_ref().map(|r| r.id.as_str())
    }

    fn reset_results_view(&mut self) {
        self.view_opts = ViewOptions::default();
        self.nav.reset();
        self.scroll = 0;
    }

    /// Show a record: Results when completed, otherwise its lifecycle progress.
    pub fn select_record(&mut self, record: AnalysisRecord) {
        self.reset_results_view();
        if record.status == AnalysisStatus::Completed {
            self.view = View::Results;
            self.processing = false;
        } else {
            self.view = View::Progress;
            self.processing = matches!(
                record.status,
                AnalysisStatus::Processing | AnalysisStatus::Analyzing
            );
        }
        self.selected = Some(record);
        self.tab = TAB_ANALYSIS;
    }

    /// Clear the selection and return to the upload form.
    pub fn new_analysis(&mut self) {
        self.selected = None;
        self.processing = false;
        self.view = View::Upload;
        self.mode = InputMode::Normal;
        self.reset_results_view();
    }

    /// Validate the upload form and switch to the progress view.
    /// Returns what the controller needs to start a run.
    pub fn begin_run(&mut self) -> Option<(PathBuf, Option<String>)> {
        if self.run_in_flight {
            self.info = "An analysis is already running".into();
            return None;
        }
        let path = self.path_input.trim();
        if path.is_empty() {
            self.info = "Enter a script path first (press i)".into();
            return None;
        }
        let path = PathBuf::from(path);
        let title = Some(self.title_input.trim().to_string()).filter(|t| !t.is_empty());

        self.selected = None;
        self.reset_results_view();
        self.view = View::Progress;
        self.processing = true;
        self.run_in_flight = true;
        self.active_run_id = None;
        self.live_status = Some(AnalysisStatus::Uploading);
        self.info = format!("Uploading {}…", path.display());
        Some((path, title))
    }

    /// Status shown by the progress view.
    pub fn progress_status(&self) -> AnalysisStatus {
        match &self.selected {
            Some(r) => r.status,
            None => self.live_status.unwrap_or(AnalysisStatus::Uploading),
        }
    }

    fn watching_active_run(&self) -> bool {
        self.view == View::Progress
            && match (&self.selected, &self.active_run_id) {
                (None, _) => true,
                (Some(r), Some(active)) => &r.id == active,
                (Some(_), None) => false,
            }
    }

    /// Fold an engine event into the UI. `RunCompleted` is handled by [`Self::complete_run`].
    pub fn apply_event(&mut self, ev: AnalysisEvent) {
        match ev {
            AnalysisEvent::StatusChanged { id, status } => {
                if self.run_in_flight && self.active_run_id.is_none() {
                    self.active_run_id = Some(id.clone());
                }
                let is_active = self.active_run_id.as_deref() == Some(id.as_str());
                if is_active && self.selected.is_none() && self.view == View::Progress {
                    self.live_status = Some(status);
                }
                if let Some(r) = self.selected.as_mut().filter(|r| r.id == id) {
                    r.status = status;
                }
                if let Some(r) = self.history.iter_mut().find(|r| r.id == id) {
                    r.status = status;
                }
            }
            AnalysisEvent::Info(info) => {
                self.info = info.to_message();
            }
            AnalysisEvent::RunFailed { id, .. } => {
                if self.active_run_id.as_deref() == Some(id.as_str()) || self.active_run_id.is_none()
                {
                    self.run_in_flight = false;
                    self.active_run_id = None;
                    if self.watching_active_run() || self.selected.is_none() {
                        self.processing = false;
                        self.live_status = Some(AnalysisStatus::Failed);
                    }
                }
                self.info = FAILURE_MESSAGE.into();
            }
            AnalysisEvent::StartFailed { error } => {
                self.run_in_flight = false;
                self.active_run_id = None;
                self.live_status = None;
                if self.selected.is_none() && self.view == View::Progress {
                    self.processing = false;
                    self.view = View::Upload;
                }
                self.info = format!("Could not start analysis: {error}");
            }
            AnalysisEvent::RunCompleted { record } => {
                self.complete_run(*record, None);
            }
        }
    }

    /// A run finished: refresh history and show the results if the user is watching it.
    pub fn complete_run(&mut self, record: AnalysisRecord, history: Option<Vec<AnalysisRecord>>) {
        let watching = self.watching_active_run();
        self.run_in_flight = false;
        self.active_run_id = None;
        self.live_status = None;

        match history {
            Some(h) => self.history = h,
            None => self.upsert_history(record.clone()),
        }
        self.clamp_history_cursor();

        if watching {
            self.select_record(record);
        }
    }

    /// Replace a record everywhere it is shown (after a tier change, for instance).
    pub fn replace_record(&mut self, record: AnalysisRecord) {
        if let Some(sel) = self.selected.as_mut().filter(|r| r.id == record.id) {
            *sel = record.clone();
        }
        self.upsert_history(record);
    }

    fn upsert_history(&mut self, record: AnalysisRecord) {
        match self.history.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => self.history.insert(0, record),
        }
    }

    /// Drop a deleted record; deleting the one on screen returns to the upload form.
    pub fn remove_record(&mut self, id: &str) {
        self.history.retain(|r| r.id != id);
        self.clamp_history_cursor();
        if self.selected_id() == Some(id) {
            self.new_analysis();
        }
    }

    pub fn set_history(&mut self, history: Vec<AnalysisRecord>) {
        self.history = history;
        self.clamp_history_cursor();
    }

    fn clamp_history_cursor(&mut self) {
        if self.history_selected >= self.history.len() {
            self.history_selected = self.history.len().saturating_sub(1);
        }
    }

    pub fn history_cursor_record(&self) -> Option<&AnalysisRecord> {
        self.history.get(self.history_selected)
    }

    /// Record the Results view acts on.
    pub fn results_record(&self) -> Option<&AnalysisRecord> {
        self.selected
            .as_ref()
            .filter(|r| self.view == View::Results && r.status == AnalysisStatus::Completed)
    }

    pub fn scroll_by(&mut self, delta: i32) {
        self.scroll = (self.scroll as i32 + delta).clamp(0, u16::MAX as i32) as u16;
    }
}
