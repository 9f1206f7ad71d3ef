//! `cur status`: progress of every phase at a glance.

use std::path::Path;

use clap::Args;
use curate_core::config::WorkflowConfig;
use curate_core::lock::LockKind;
use curate_core::phase::Progress;
use serde::Serialize;

use crate::output::{OutputMode, pretty_section, render_mode};
use crate::workspace::Workspace;

/// Arguments for `cur status`.
#[derive(Args, Debug, Default)]
pub struct StatusArgs {}

#[derive(Debug, Serialize)]
struct PhaseRow {
    number: usize,
    name: String,
    predicates: Vec<String>,
    progress: Progress,
    summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    current: Option<String>,
    active: bool,
    complete: bool,
}

#[derive(Debug, Serialize)]
struct StatusOutput {
    root: String,
    items: usize,
    phases: Vec<PhaseRow>,
}

/// Execute `cur status`.
pub fn run_status(
    _args: &StatusArgs,
    output: OutputMode,
    root: &Path,
    config: &WorkflowConfig,
) -> anyhow::Result<()> {
    let ws = Workspace::open(root, config, LockKind::Shared)?;
    let org = &ws.organizer;

    let phases = org
        .phases()
        .map(|phase| PhaseRow {
            number: phase.id().index() + 1,
            name: phase.name().to_string(),
            predicates: phase.predicates().iter().map(ToString::to_string).collect(),
            progress: phase.progress(),
            summary: phase.progress().to_string(),
            current: phase
                .cursor()
                .and_then(|id| org.relative_path(id).ok())
                .map(|p| p.display().to_string()),
            active: org.active_phase() == Some(phase.id()),
            complete: phase.is_complete(),
        })
        .collect();

    let status = StatusOutput {
        root: org.root().display().to_string(),
        items: org.items().count(),
        phases,
    };

    render_mode(
        output,
        &status,
        |s, w| {
            for row in &s.phases {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                    row.number,
                    row.name,
                    row.progress.percent_done(),
                    row.progress.finished,
                    row.progress.todo,
                    row.progress.skipped,
                    row.current.as_deref().unwrap_or("-"),
                )?;
            }
            Ok(())
        },
        |s, w| {
            pretty_section(w, &format!("{} ({} images)", s.root, s.items))?;
            for row in &s.phases {
                let marker = if row.active { "*" } else { " " };
                writeln!(
                    w,
                    "{marker} {}. {}  [{}]",
                    row.number,
                    row.name,
                    row.predicates.join(" ")
                )?;
                writeln!(w, "     {}", row.summary)?;
                if let Some(current) = &row.current {
                    writeln!(w, "     current: {current}")?;
                }
            }
            Ok(())
        },
    )
}
