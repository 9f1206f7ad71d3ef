//! `cur tag`: add or remove tags on an image.

use crate::cmd::split_phase;
use crate::output::{OutputMode, render_mode};
use crate::workspace::Workspace;
use anyhow::bail;
use clap::Args;
use curate_core::config::WorkflowConfig;
use curate_core::{ItemId, SignedTag};
use curate_core::lock::LockKind;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct TagArgs {
    /// Optional phase, then one or more signed tags (`+name` adds, `-name` removes).
    #[arg(required = true, allow_hyphen_values = true, value_name = "[PHASE] SIGNED")]
    pub words: Vec<String>,

    /// Tag this image instead of the phase's current one.
    #[arg(long)]
    pub item: Option<PathBuf>,
}

fn is_signed(word: &str) -> bool {
    word.starts_with(['+', '-'])
}

/// Apply tags in order, stopping at the first failure. The session is saved
/// either way: earlier tags are already on disk and may have moved cursors.
fn apply_tags(ws: &mut Workspace, item: ItemId, tags: &[SignedTag]) -> anyhow::Result<()> {
    let result = tags.iter().try_for_each(|tag| ws.organizer.tag(item, tag));
    ws.save()?;
    Ok(result?)
}

/// Execute `cur tag`.
pub fn run_tag(
    args: &TagArgs,
    output: OutputMode,
    root: &Path,
    config: &WorkflowConfig,
) -> anyhow::Result<()> {
    let (phase, raw_tags) = split_phase(&args.words, is_signed);
    let tags = raw_tags
        .iter()
        .map(|raw| raw.parse::<SignedTag>())
        .collect::<Result<Vec<_>, _>>()?;
    if tags.is_empty() {
        bail!("no tags given");
    }

    let mut ws = Workspace::open(root, config, LockKind::Exclusive)?;
    let phase = ws.phase(phase)?;
    let item = ws.target(phase, args.item.as_deref())?;
    apply_tags(&mut ws, item, &tags)?;

    let outcome = ws.outcome(phase)?;
    render_mode(
        output,
        &outcome,
        |o, w| o.write_text(w),
        |o, w| o.write_pretty(w),
    )
}
