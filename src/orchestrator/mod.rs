//! Application-level orchestration utilities.
//!
//! This module owns analysis lifecycle control (start/quit) and post-run processing such
//! as exports and history refresh. UI layers call into this module to keep
//! responsibilities separated.

#[cfg(feature = "tui")]
mod controller;
mod post_process;

#[cfg(feature = "tui")]
pub(crate) use controller::{run_controller, UiCommand};
pub(crate) use post_process::process_run_completion;
