//! `cur act`: press one of a phase's configured action buttons.

use crate::cmd::external::perform_external;
use crate::cmd::split_phase;
use crate::output::{OutputMode, render_mode};
use crate::workspace::Workspace;
use anyhow::{Context, bail};
use clap::Args;
use curate_core::ActionInput;
use curate_core::config::WorkflowConfig;
use curate_core::lock::LockKind;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Args, Debug)]
pub struct ActArgs {
    /// Optional phase, then the action label (case-insensitive).
    #[arg(required = true, num_args = 1..=2, value_name = "[PHASE] LABEL")]
    pub words: Vec<String>,

    /// New file name for `save_name` steps.
    #[arg(long)]
    pub name: Option<String>,

    /// Category for `save_category` steps.
    #[arg(long)]
    pub category: Option<String>,

    /// Transcription text for `save_transcription` steps.
    #[arg(long, conflicts_with = "text_file")]
    pub text: Option<String>,

    /// Read the transcription from a file.
    #[arg(long)]
    pub text_file: Option<PathBuf>,

    /// Act on this image instead of the phase's current one.
    #[arg(long)]
    pub item: Option<PathBuf>,
}

pub fn read_text(text: Option<&str>, file: Option<&Path>) -> anyhow::Result<Option<String>> {
    if let Some(path) = file {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        return Ok(Some(text));
    }
    Ok(text.map(ToString::to_string))
}

/// Execute `cur act`.
///
/// Steps run in order and stop at the first failure; earlier steps stay
/// applied.
pub fn run_act(
    args: &ActArgs,
    output: OutputMode,
    root: &Path,
    config: &WorkflowConfig,
) -> anyhow::Result<()> {
    let (phase, rest) = split_phase(&args.words, |_| false);
    let [label] = rest else {
        bail!("expected [PHASE] LABEL");
    };
    let input = ActionInput {
        name: args.name.clone(),
        category: args.category.clone(),
        transcription: read_text(args.text.as_deref(), args.text_file.as_deref())?,
    };

    let mut ws = Workspace::open(root, config, LockKind::Exclusive)?;
    let phase = ws.phase(phase)?;
    let steps = ws.organizer.action_steps(phase, label)?;
    let item = ws.target(phase, args.item.as_deref())?;

    let mut result = Ok(());
    for step in &steps {
        debug!(%step, "running action step");
        result = if step.is_external() {
            perform_external(&mut ws, item, step)
        } else {
            ws.organizer
                .perform(phase, item, step, &input)
                .map(|_| ())
                .map_err(anyhow::Error::from)
        };
        if result.is_err() {
            break;
        }
    }
    ws.save()?;
    result.with_context(|| format!("action '{label}' failed"))?;

    let outcome = ws.outcome(phase)?;
    render_mode(
        output,
        &outcome,
        |o, w| o.write_text(w),
        |o, w| o.write_pretty(w),
    )
}
