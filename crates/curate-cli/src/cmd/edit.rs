//! Direct save operations: `cur rename`, `cur categorize`, `cur transcribe`,
//! `cur delete`.

use crate::cmd::act::read_text;
use crate::output::{OutputMode, render_mode};
use crate::workspace::Workspace;
use clap::Args;
use curate_core::config::WorkflowConfig;
use curate_core::lock::LockKind;
use curate_core::{ItemId, Organizer};
use std::path::{Path, PathBuf};
use tracing::info;

/// Which image a direct operation applies to.
#[derive(Args, Debug, Default)]
pub struct TargetArgs {
    /// Phase whose current image is used (defaults to the active phase).
    #[arg(long)]
    pub phase: Option<String>,

    /// Use this image instead of the phase's current one.
    #[arg(long)]
    pub item: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RenameArgs {
    /// New file name; the image extension is kept.
    pub name: String,

    #[command(flatten)]
    pub target: TargetArgs,
}

#[derive(Args, Debug)]
pub struct CategorizeArgs {
    /// Category name, relative to the workflow root.
    pub category: String,

    #[command(flatten)]
    pub target: TargetArgs,
}

#[derive(Args, Debug)]
pub struct TranscribeArgs {
    /// Transcription text.
    #[arg(required_unless_present = "file")]
    pub text: Option<String>,

    /// Read the transcription from a file.
    #[arg(long, conflicts_with = "text")]
    pub file: Option<PathBuf>,

    #[command(flatten)]
    pub target: TargetArgs,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

fn edit(
    target: &TargetArgs,
    output: OutputMode,
    root: &Path,
    config: &WorkflowConfig,
    op: impl FnOnce(&mut Organizer, ItemId) -> curate_core::error::Result<()>,
) -> anyhow::Result<()> {
    let mut ws = Workspace::open(root, config, LockKind::Exclusive)?;
    let phase = ws.phase(target.phase.as_deref())?;
    let item = ws.target(phase, target.item.as_deref())?;
    op(&mut ws.organizer, item)?;

    ws.save()?;
    let outcome = ws.outcome(phase)?;
    render_mode(
        output,
        &outcome,
        |o, w| o.write_text(w),
        |o, w| o.write_pretty(w),
    )
}

pub fn run_rename(
    args: &RenameArgs,
    output: OutputMode,
    root: &Path,
    config: &WorkflowConfig,
) -> anyhow::Result<()> {
    edit(&args.target, output, root, config, |org, item| {
        org.save_name(item, Some(args.name.as_str()))
    })
}

pub fn run_categorize(
    args: &CategorizeArgs,
    output: OutputMode,
    root: &Path,
    config: &WorkflowConfig,
) -> anyhow::Result<()> {
    edit(&args.target, output, root, config, |org, item| {
        org.save_category(item, Some(args.category.as_str()))
    })
}

pub fn run_transcribe(
    args: &TranscribeArgs,
    output: OutputMode,
    root: &Path,
    config: &WorkflowConfig,
) -> anyhow::Result<()> {
    let text = read_text(args.text.as_deref(), args.file.as_deref())?;
    edit(&args.target, output, root, config, |org, item| {
        org.save_transcription(item, text.as_deref())
    })
}

pub fn run_delete(
    args: &DeleteArgs,
    output: OutputMode,
    root: &Path,
    config: &WorkflowConfig,
) -> anyhow::Result<()> {
    edit(&args.target, output, root, config, |org, item| {
        let path = org.relative_path(item)?;
        org.delete(item)?;
        info!(path = %path.display(), "image deleted");
        Ok(())
    })
}
