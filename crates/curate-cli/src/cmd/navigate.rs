//! `cur next` / `cur prev`: move a phase's cursor.

use crate::output::{OutputMode, render_mode};
use crate::workspace::Workspace;
use clap::Args;
use curate_core::config::WorkflowConfig;
use curate_core::lock::LockKind;
use std::path::Path;

#[derive(Args, Debug)]
pub struct NavigateArgs {
    /// Phase number or name (defaults to the active phase).
    pub phase: Option<String>,

    /// Only visit images that still need work in this phase.
    #[arg(long)]
    pub work: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

/// Execute `cur next` or `cur prev`.
pub fn run_navigate(
    args: &NavigateArgs,
    direction: Direction,
    output: OutputMode,
    root: &Path,
    config: &WorkflowConfig,
) -> anyhow::Result<()> {
    let mut ws = Workspace::open(root, config, LockKind::Exclusive)?;
    let phase = ws.phase(args.phase.as_deref())?;

    let org = &mut ws.organizer;
    match (direction, args.work) {
        (Direction::Next, false) => org.next(phase)?,
        (Direction::Next, true) => org.next_work(phase)?,
        (Direction::Prev, false) => org.prev(phase)?,
        (Direction::Prev, true) => org.prev_work(phase)?,
    };

    ws.save()?;
    let outcome = ws.outcome(phase)?;
    render_mode(
        output,
        &outcome,
        |o, w| o.write_text(w),
        |o, w| o.write_pretty(w),
    )
}
