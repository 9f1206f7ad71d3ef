//! `cur show`: one phase in detail, plus the item under its cursor.

use crate::output::{OutputMode, pretty_kv, pretty_rule, pretty_section, render_mode};
use crate::workspace::Workspace;
use clap::Args;
use curate_core::ItemId;
use curate_core::config::WorkflowConfig;
use curate_core::lock::LockKind;
use curate_core::phase::Extra;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Phase number or name (defaults to the active phase).
    pub phase: Option<String>,

    /// Show this image instead of the phase's current one.
    #[arg(long)]
    pub item: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct ShowItem {
    pub path: PathBuf,
    pub pending: bool,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub transcription: String,
    /// Sidecar header as it would be written next.
    pub metadata: String,
}

#[derive(Debug, Serialize)]
pub struct ShowPhase {
    pub name: String,
    pub predicates: Vec<String>,
    pub progress: String,
    pub extras: Vec<Extra>,
    pub actions: Vec<String>,
    pub full: Vec<PathBuf>,
    pub work: Vec<PathBuf>,
    pub current: Option<ShowItem>,
}

/// Execute `cur show`.
pub fn run_show(
    args: &ShowArgs,
    output: OutputMode,
    root: &Path,
    config: &WorkflowConfig,
) -> anyhow::Result<()> {
    let ws = Workspace::open(root, config, LockKind::Shared)?;
    let phase_id = ws.phase(args.phase.as_deref())?;
    let org = &ws.organizer;
    let phase = org.phase(phase_id)?;

    let target = match &args.item {
        Some(path) => Some(ws.item(path)?),
        None => phase.cursor(),
    };
    let current = match target {
        Some(id) => {
            let item = org.item(id)?;
            Some(ShowItem {
                path: org.relative_path(id)?,
                pending: phase.in_work(id),
                tags: item.tags().to_vec(),
                category: org.category_of(id)?.map(|c| c.name.clone()),
                transcription: item.transcription().to_string(),
                metadata: item.metadata_string()?,
            })
        }
        None => None,
    };

    let paths = |ids: Vec<ItemId>| -> Vec<PathBuf> {
        ids.into_iter()
            .filter_map(|id| org.relative_path(id).ok())
            .collect()
    };
    let shown = ShowPhase {
        name: phase.name().to_string(),
        predicates: phase.predicates().iter().map(ToString::to_string).collect(),
        progress: phase.progress().to_string(),
        extras: phase.spec().extras.clone(),
        actions: phase.spec().actions.iter().map(|a| a.label.clone()).collect(),
        full: paths(phase.full().collect()),
        work: paths(phase.work().collect()),
        current,
    };

    render_mode(
        output,
        &shown,
        |s, w| {
            writeln!(w, "phase\t{}", s.name)?;
            writeln!(w, "progress\t{}", s.progress)?;
            if let Some(item) = &s.current {
                writeln!(w, "current\t{}", item.path.display())?;
                writeln!(w, "tags\t{}", item.tags.join(","))?;
            }
            for path in &s.work {
                writeln!(w, "work\t{}", path.display())?;
            }
            Ok(())
        },
        |s, w| {
            pretty_section(w, &s.name)?;
            pretty_kv(w, "Predicate", s.predicates.join(" "))?;
            pretty_kv(w, "Progress", &s.progress)?;
            pretty_kv(w, "Work", format!("{} of {} images", s.work.len(), s.full.len()))?;
            if !s.actions.is_empty() {
                pretty_kv(w, "Actions", s.actions.join(" | "))?;
            }
            writeln!(w)?;
            let Some(item) = &s.current else {
                writeln!(w, "(no current image)")?;
                return Ok(());
            };
            pretty_kv(w, "Image", item.path.display().to_string())?;
            pretty_kv(w, "Pending", if item.pending { "yes" } else { "no" })?;
            if let Some(category) = &item.category {
                pretty_kv(w, "Category", category)?;
            }
            if s.extras.contains(&Extra::MetadataDisplay) {
                pretty_rule(w)?;
                write!(w, "{}", item.metadata)?;
            } else {
                pretty_kv(w, "Tags", item.tags.join(", "))?;
            }
            if !item.transcription.is_empty() {
                pretty_rule(w)?;
                writeln!(w, "{}", item.transcription.trim_end())?;
            }
            Ok(())
        },
    )
}
