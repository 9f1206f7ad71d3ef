//! `cur category` and `cur recent`: the category registry.

use crate::output::{OutputMode, render, render_mode};
use crate::workspace::Workspace;
use clap::{Args, Subcommand};
use curate_core::Organizer;
use curate_core::category::CategoryId;
use curate_core::config::WorkflowConfig;
use curate_core::lock::LockKind;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    #[command(
        about = "List known categories",
        after_help = "EXAMPLES:\n    # Every directory under the root\n    cur category list"
    )]
    List,

    #[command(
        about = "Create a category directory",
        after_help = "EXAMPLES:\n    # Create a nested category\n    cur category create letters/1962"
    )]
    Create(CreateArgs),

    #[command(
        about = "Rename a category and move its images",
        after_help = "EXAMPLES:\n    # Rename a category\n    cur category rename letters mail"
    )]
    Rename(RenameCategoryArgs),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Directory name relative to the workflow root.
    pub name: String,
}

#[derive(Args, Debug)]
pub struct RenameCategoryArgs {
    /// Existing category name.
    pub old: String,
    /// New name relative to the workflow root.
    pub new: String,
}

#[derive(Debug, Serialize)]
struct CategoryRow {
    name: String,
    path: PathBuf,
    images: usize,
}

impl CategoryRow {
    fn new(org: &Organizer, id: CategoryId) -> Self {
        let category = org.categories().get(id);
        Self {
            name: category.name.clone(),
            path: category.path.clone(),
            images: org
                .items()
                .filter(|item| item.category() == Some(id))
                .count(),
        }
    }
}

fn write_rows(rows: &[CategoryRow], w: &mut dyn Write) -> std::io::Result<()> {
    for row in rows {
        writeln!(w, "{}\t{}", row.name, row.images)?;
    }
    Ok(())
}

/// Execute `cur category ...`.
pub fn run_category(
    command: &CategoryCommand,
    output: OutputMode,
    root: &Path,
    config: &WorkflowConfig,
) -> anyhow::Result<()> {
    match command {
        CategoryCommand::List => {
            let ws = Workspace::open(root, config, LockKind::Shared)?;
            let rows: Vec<CategoryRow> = ws
                .organizer
                .categories()
                .iter()
                .map(|(id, _)| CategoryRow::new(&ws.organizer, id))
                .collect();
            render_mode(output, &rows, |r, w| write_rows(r, w), |r, w| {
                for row in r {
                    writeln!(w, "{:<40} {:>5} images", row.name, row.images)?;
                }
                Ok(())
            })
        }
        CategoryCommand::Create(args) => {
            let mut ws = Workspace::open(root, config, LockKind::Exclusive)?;
            let id = ws.organizer.create_category(&args.name)?;
            let row = CategoryRow::new(&ws.organizer, id);
            render(output, &row, |r, w| writeln!(w, "created {}", r.name))
        }
        CategoryCommand::Rename(args) => {
            let mut ws = Workspace::open(root, config, LockKind::Exclusive)?;
            let id = ws.organizer.category_by_name(&args.old)?;
            let renamed = ws.organizer.rename_category(id, &args.new);
            // Items that did move keep their new paths in the session.
            ws.save()?;
            renamed?;
            let row = CategoryRow::new(&ws.organizer, id);
            render(output, &row, |r, w| {
                writeln!(w, "renamed {} -> {} ({} images)", args.old, r.name, r.images)
            })
        }
    }
}

/// Execute `cur recent`.
pub fn run_recent(output: OutputMode, root: &Path, config: &WorkflowConfig) -> anyhow::Result<()> {
    let ws = Workspace::open(root, config, LockKind::Shared)?;
    let rows: Vec<CategoryRow> = ws
        .organizer
        .recent_categories()
        .filter_map(|c| ws.organizer.category_by_name(&c.name).ok())
        .map(|id| CategoryRow::new(&ws.organizer, id))
        .collect();
    render(output, &rows, |r, w| write_rows(r, w))
}
