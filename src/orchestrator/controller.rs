//! Analysis lifecycle controller.
//!
//! Owns start/quit orchestration for interactive front ends and forwards engine events to
//! presentation layers. At most one analysis runs at a time.

use crate::engine::AnalysisEngine;
use crate::model::{AnalysisEvent, AnalysisRecord, InfoEvent};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{info, warn};

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Analyze {
        path: PathBuf,
        title: Option<String>,
    },
    Quit,
}

type RunHandle = tokio::task::JoinHandle<Result<AnalysisRecord>>;

fn start_run(
    engine: Arc<AnalysisEngine>,
    path: PathBuf,
    title: Option<String>,
    event_tx: UnboundedSender<AnalysisEvent>,
) -> RunHandle {
    tokio::spawn(async move { engine.analyze(&path, title.as_deref(), &event_tx).await })
}

/// Run analyses on request and emit their events back to presentation layers.
pub(crate) async fn run_controller(
    engine: Arc<AnalysisEngine>,
    event_tx: UnboundedSender<AnalysisEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut running: Option<RunHandle> = None;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Analyze { path, title }) => {
                        if running.is_some() {
                            let _ = event_tx.send(AnalysisEvent::Info(InfoEvent::Message(
                                "An analysis is already running".into(),
                            )));
                            continue;
                        }
                        info!(path = %path.display(), "starting analysis");
                        running = Some(start_run(engine.clone(), path, title, event_tx.clone()));
                    }
                    Some(UiCommand::Quit) | None => {
                        if let Some(handle) = running.take() {
                            warn!("quitting with an analysis in flight; its record keeps its last status");
                            handle.abort();
                        }
                        break;
                    }
                }
            }
            // Keep the handle in place until this branch wins so a losing select never drops it.
            done = async {
                match running.as_mut() {
                    Some(h) => h.await,
                    None => futures::future::pending().await,
                }
            } => {
                running = None;
                match done {
                    // The engine reports completion and failure itself.
                    Ok(_) => {}
                    Err(e) => {
                        let _ = event_tx.send(AnalysisEvent::Info(InfoEvent::Message(format!(
                            "Analysis task failed: {e}"
                        ))));
                    }
                }
            }
        }
    }
    Ok(())
}
