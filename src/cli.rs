use crate::budget;
use crate::engine::AnalysisEngine;
use crate::llm::{LlmConfig, LlmProvider};
use crate::model::{AnalysisEvent, AnalysisStatus, BudgetTier, RunConfig};
use crate::panels::ViewOptions;
use crate::storage::{JsonDirStore, RecordStore, DEFAULT_LIST_LIMIT};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "script-breakdown",
    version,
    about = "Screenplay breakdown: upload a script, get an LLM-built production analysis"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Directory holding analysis records, uploads and the log file
    #[arg(long, global = true, env = "SCRIPT_BREAKDOWN_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// LLM API flavour
    #[arg(long, global = true, value_enum, default_value_t = LlmProvider::Ollama, env = "SCRIPT_BREAKDOWN_LLM_PROVIDER")]
    pub llm_provider: LlmProvider,

    /// LLM base URL (defaults per provider)
    #[arg(long, global = true, env = "SCRIPT_BREAKDOWN_LLM_ENDPOINT")]
    pub llm_endpoint: Option<String>,

    /// Model name (defaults per provider)
    #[arg(long, global = true, env = "SCRIPT_BREAKDOWN_LLM_MODEL")]
    pub llm_model: Option<String>,

    /// Bearer key for OpenAI-compatible providers
    #[arg(long, global = true, env = "SCRIPT_BREAKDOWN_LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    /// Timeout for a single model request
    #[arg(long, global = true, default_value = "5m", env = "SCRIPT_BREAKDOWN_LLM_TIMEOUT")]
    pub llm_timeout: humantime::Duration,

    /// Log filter (e.g. info, debug, script_breakdown=trace); RUST_LOG wins when set
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Upload a script and run the full analysis
    Analyze(AnalyzeArgs),
    /// List previous analyses, newest first
    List {
        #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: usize,
    },
    /// Print one analysis
    Show {
        id: String,
        /// Expand every collapsed list
        #[arg(long)]
        all: bool,
        /// Only show scenes matching this text
        #[arg(long)]
        scene_filter: Option<String>,
        /// Print the stored record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an analysis
    Delete { id: String },
    /// Write the JSON export document of a completed analysis
    Export {
        id: String,
        /// Output path (defaults to <Title>_analysis.json; `-` for stdout)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Switch the budget tier of a completed analysis
    Tier {
        id: String,
        #[arg(value_enum)]
        tier: BudgetTier,
    },
}

#[derive(Debug, Args, Clone)]
pub struct AnalyzeArgs {
    /// Script file (.pdf, .fdx, .fountain, .txt)
    pub file: PathBuf,

    /// Title for the analysis (defaults to the file name)
    #[arg(long)]
    pub title: Option<String>,

    /// Budget tier applied once the analysis completes
    #[arg(long, value_enum, default_value_t = BudgetTier::Indie)]
    pub tier: BudgetTier,

    /// Print the finished record as JSON
    #[arg(long, conflicts_with = "text")]
    pub json: bool,

    /// Print the results panels as text (default)
    #[arg(long)]
    pub text: bool,

    /// Run silently: suppress all output except errors
    #[arg(long, conflicts_with = "text")]
    pub silent: bool,

    /// Also write the JSON export document to this path
    #[arg(long)]
    pub export_json: Option<PathBuf>,
}

impl Cli {
    /// True when this invocation ends up in the interactive UI.
    pub fn is_tui(&self) -> bool {
        self.command.is_none() && cfg!(feature = "tui")
    }

    pub fn is_silent(&self) -> bool {
        matches!(&self.command, Some(Command::Analyze(a)) if a.silent)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(crate::storage::default_data_dir)
    }
}

pub async fn run(args: Cli) -> Result<()> {
    match args.command.clone() {
        None => {
            #[cfg(feature = "tui")]
            {
                crate::tui::run(args).await
            }
            #[cfg(not(feature = "tui"))]
            {
                // Fallback when built without TUI support.
                run_list(&args, DEFAULT_LIST_LIMIT)
            }
        }
        Some(Command::Analyze(a)) => run_analyze(&args, a).await,
        Some(Command::List { limit }) => run_list(&args, limit),
        Some(Command::Show {
            id,
            all,
            scene_filter,
            json,
        }) => run_show(&args, &id, all, scene_filter, json),
        Some(Command::Delete { id }) => {
            open_store(&args)?
                .delete(&id)
                .with_context(|| format!("delete analysis {id}"))?;
            eprintln!("Deleted: {id}");
            Ok(())
        }
        Some(Command::Export { id, output }) => run_export(&args, &id, output),
        Some(Command::Tier { id, tier }) => run_tier(&args, &id, tier),
    }
}

/// Build a `RunConfig` from CLI arguments.
pub fn build_config(args: &Cli, budget_tier: BudgetTier) -> RunConfig {
    RunConfig {
        data_dir: args.data_dir(),
        llm: LlmConfig::for_provider(args.llm_provider).with_overrides(
            args.llm_endpoint.clone(),
            args.llm_model.clone(),
            args.llm_api_key.clone(),
        ),
        llm_timeout: args.llm_timeout.into(),
        budget_tier,
        user_agent: format!("script-breakdown/{}", env!("CARGO_PKG_VERSION")),
    }
}

fn open_store(args: &Cli) -> Result<JsonDirStore> {
    let dir = args.data_dir();
    JsonDirStore::open(&dir).with_context(|| format!("open record store in {}", dir.display()))
}

async fn run_analyze(args: &Cli, a: AnalyzeArgs) -> Result<()> {
    let cfg = build_config(args, a.tier);
    let engine = AnalysisEngine::from_config(cfg)?;
    let (out_tx, out_handle) = if a.silent {
        (None, None)
    } else {
        let (tx, handle) = spawn_output_writer();
        (Some(tx), Some(handle))
    };

    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<AnalysisEvent>();
    let file = a.file.clone();
    let title = a.title.clone();
    let handle =
        tokio::spawn(async move { engine.analyze(&file, title.as_deref(), &evt_tx).await });

    // JSON mode keeps stderr quiet too; progress is only narrated in text mode.
    let narrate = !a.json;
    while let Some(ev) = evt_rx.recv().await {
        let (Some(tx), true) = (out_tx.as_ref(), narrate) else {
            continue;
        };
        match ev {
            AnalysisEvent::StatusChanged { status, .. } => {
                let _ = tx.send(OutputLine::Stderr(format!("== {status} ==")));
            }
            AnalysisEvent::Info(info) => {
                let _ = tx.send(OutputLine::Stderr(info.to_message()));
            }
            AnalysisEvent::RunCompleted { .. }
            | AnalysisEvent::RunFailed { .. }
            | AnalysisEvent::StartFailed { .. } => {}
        }
    }

    let record = handle
        .await
        .context("analysis task failed")?
        .context("script analysis failed")?;

    let store = open_store(args)?;
    let processed =
        crate::orchestrator::process_run_completion(&store, a.export_json.as_ref(), 0, &record);
    if processed.export_failed {
        bail!("{}", processed.export_messages.join("; "));
    }
    if let Some(tx) = out_tx.as_ref() {
        for msg in processed.export_messages {
            let _ = tx.send(OutputLine::Stderr(msg));
        }
    }

    if let Some(tx) = out_tx.as_ref() {
        if a.json {
            let _ = tx.send(OutputLine::Stdout(serde_json::to_string_pretty(&record)?));
        } else {
            let summary =
                crate::text_summary::build_text_summary(&record, &ViewOptions::default());
            for line in summary.lines {
                let _ = tx.send(OutputLine::Stdout(line));
            }
            let _ = tx.send(OutputLine::Stderr(format!("Saved: {}", record.id)));
        }
    }

    drop(out_tx);
    if let Some(handle) = out_handle {
        let _ = handle.await;
    }
    Ok(())
}

fn run_list(args: &Cli, limit: usize) -> Result<()> {
    let records = open_store(args)?.list(limit).context("list analyses")?;
    for line in crate::text_summary::build_history_lines(&records) {
        println!("{line}");
    }
    Ok(())
}

fn run_show(
    args: &Cli,
    id: &str,
    all: bool,
    scene_filter: Option<String>,
    json: bool,
) -> Result<()> {
    let record = open_store(args)?
        .get(id)
        .with_context(|| format!("load analysis {id}"))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }
    let opts = ViewOptions {
        expanded: all,
        scene_filter: scene_filter.unwrap_or_default(),
    };
    for line in crate::text_summary::build_text_summary(&record, &opts).lines {
        println!("{line}");
    }
    Ok(())
}

fn run_export(args: &Cli, id: &str, output: Option<PathBuf>) -> Result<()> {
    let record = open_store(args)?
        .get(id)
        .with_context(|| format!("load analysis {id}"))?;
    if record.status != AnalysisStatus::Completed {
        bail!("analysis {id} is {}; only completed analyses can be exported", record.status);
    }
    if output.as_deref() == Some(std::path::Path::new("-")) {
        println!("{}", crate::export::export_string(&record)?);
        return Ok(());
    }
    let path = output.unwrap_or_else(|| PathBuf::from(crate::export::default_file_name(&record.title)));
    crate::export::write_export(&record, &path)?;
    eprintln!("Exported JSON: {}", path.display());
    Ok(())
}

fn run_tier(args: &Cli, id: &str, tier: BudgetTier) -> Result<()> {
    let store = open_store(args)?;
    let record = store
        .get(id)
        .with_context(|| format!("load analysis {id}"))?;
    if record.status != AnalysisStatus::Completed {
        bail!("analysis {id} is {}; budget tiers apply to completed analyses", record.status);
    }
    let updated = store
        .update(id, budget::tier_change(&record, tier))
        .context("save budget tier")?;
    let panel = crate::panels::budget(updated.analysis.budget_estimate.as_ref(), updated.budget_tier);
    for line in panel.to_text_lines() {
        println!("{line}");
    }
    Ok(())
}
