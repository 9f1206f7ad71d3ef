//! `cur rotate-left`, `cur rotate-right`, `cur crop`: edit the image with an
//! external program, then let the engine know the file changed.

use crate::output::{OutputMode, render_mode};
use crate::workspace::Workspace;
use anyhow::{Context, bail};
use clap::Args;
use curate_core::config::WorkflowConfig;
use curate_core::lock::LockKind;
use curate_core::phase::Step;
use curate_core::{ItemId, PhaseId};
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

/// Arguments shared by the external image commands.
#[derive(Args, Debug)]
pub struct ExternalArgs {
    /// Phase number or name (defaults to the active phase).
    pub phase: Option<String>,

    /// Edit this image instead of the phase's current one.
    #[arg(long)]
    pub item: Option<PathBuf>,
}

fn program(var: &str, default: &str) -> OsString {
    env::var_os(var).unwrap_or_else(|| default.into())
}

fn run(mut command: Command) -> anyhow::Result<()> {
    let shown = format!("{command:?}");
    info!(command = %shown, "running external program");
    let status = command
        .status()
        .with_context(|| format!("failed to start {shown}"))?;
    if !status.success() {
        bail!("{shown} exited with {status}");
    }
    Ok(())
}

/// `{stem}-crop.{ext}` next to the image, as written by cropgui.
fn cropped_path(image: &Path) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match image.extension() {
        Some(ext) => format!("{stem}-crop.{}", ext.to_string_lossy()),
        None => format!("{stem}-crop"),
    };
    image.with_file_name(name)
}

/// Run an external step against `item` and reload it.
///
/// Rotation uses ImageMagick `convert` (overridable with `CURATE_CONVERT`);
/// cropping uses `cropgui` (`CURATE_CROPGUI`) and moves its output over the
/// original.
pub fn perform_external(ws: &mut Workspace, item: ItemId, step: &Step) -> anyhow::Result<()> {
    let image = ws.organizer.item(item)?.image_path().to_path_buf();
    match step {
        Step::RotateLeft | Step::RotateRight => {
            let degrees = if *step == Step::RotateLeft { "270" } else { "90" };
            let mut command = Command::new(program("CURATE_CONVERT", "convert"));
            command.arg(&image).args(["-rotate", degrees]).arg(&image);
            run(command)?;
        }
        Step::Crop => {
            let mut command = Command::new(program("CURATE_CROPGUI", "cropgui"));
            command.arg(&image);
            run(command)?;
            let cropped = cropped_path(&image);
            if cropped.exists() {
                fs::rename(&cropped, &image).with_context(|| {
                    format!("failed to replace {} with {}", image.display(), cropped.display())
                })?;
            } else {
                warn!(expected = %cropped.display(), "crop produced no output");
            }
        }
        other => bail!("'{other}' is not an external step"),
    }
    ws.organizer.reload_image(item)?;
    Ok(())
}

/// Execute one of the external image commands.
pub fn run_external(
    args: &ExternalArgs,
    step: &Step,
    output: OutputMode,
    root: &Path,
    config: &WorkflowConfig,
) -> anyhow::Result<()> {
    let mut ws = Workspace::open(root, config, LockKind::Exclusive)?;
    let phase: PhaseId = ws.phase(args.phase.as_deref())?;
    let item = ws.target(phase, args.item.as_deref())?;
    perform_external(&mut ws, item, step)?;

    ws.save()?;
    let outcome = ws.outcome(phase)?;
    render_mode(
        output,
        &outcome,
        |o, w| o.write_text(w),
        |o, w| o.write_pretty(w),
    )
}
