//! Per-invocation engine setup shared by every command: lock, config, engine,
//! and the persisted session.

use anyhow::{Context, Result, anyhow};
use curate_core::config::WorkflowConfig;
use curate_core::lock::{DEFAULT_LOCK_TIMEOUT, LockKind, WorkflowLock};
use curate_core::session::Session;
use curate_core::{ItemId, Notification, OrganizeError, Organizer, PhaseId};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

pub struct Workspace {
    root: PathBuf,
    pub organizer: Organizer,
    _lock: WorkflowLock,
}

impl Workspace {
    /// Lock `root`, load every image and restore the saved session.
    pub fn open(root: &Path, config: &WorkflowConfig, kind: LockKind) -> Result<Self> {
        if !root.is_dir() {
            return Err(OrganizeError::NotADirectory {
                path: root.to_path_buf(),
            }
            .into());
        }
        let root = root
            .canonicalize()
            .with_context(|| format!("failed to resolve {}", root.display()))?;
        let lock = WorkflowLock::acquire(&root, kind, DEFAULT_LOCK_TIMEOUT)?;

        let mut organizer = Organizer::open(&root, config)?;
        Session::load(&root)?.apply(&mut organizer);
        debug!(root = %root.display(), ?kind, "workspace opened");
        Ok(Self {
            root,
            organizer,
            _lock: lock,
        })
    }

    /// Persist cursors, recent categories and the active phase.
    pub fn save(&self) -> Result<()> {
        Session::capture(&self.organizer).save(&self.root)?;
        Ok(())
    }

    /// Resolve a phase by name or number, defaulting to the active phase.
    pub fn phase(&self, query: Option<&str>) -> Result<PhaseId> {
        if let Some(query) = query {
            return Ok(self.organizer.phase_by_name(query)?);
        }
        self.organizer
            .active_phase()
            .ok_or_else(|| anyhow!("no phase has outstanding work; name a phase explicitly"))
    }

    /// The item named by `path`, or the phase's current item.
    pub fn target(&self, phase: PhaseId, path: Option<&Path>) -> Result<ItemId> {
        if let Some(path) = path {
            return self.item(path);
        }
        let phase = self.organizer.phase(phase)?;
        phase
            .cursor()
            .ok_or_else(|| anyhow!("phase '{}' has no current item", phase.name()))
    }

    pub fn item(&self, path: &Path) -> Result<ItemId> {
        let path = if path.is_absolute() {
            path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
        } else {
            path.components()
                .filter(|c| !matches!(c, Component::CurDir))
                .collect()
        };
        Ok(self.organizer.item_by_path(&path)?)
    }

    pub fn phase_name(&self, id: PhaseId) -> String {
        self.organizer
            .phase(id)
            .map(|p| p.name().to_string())
            .unwrap_or_default()
    }

    pub fn item_view(&self, phase: PhaseId, id: ItemId) -> Result<ItemView> {
        let item = self.organizer.item(id)?;
        Ok(ItemView {
            id,
            path: self.organizer.relative_path(id)?,
            tags: item.tags().to_vec(),
            category: self.organizer.category_of(id)?.map(|c| c.name.clone()),
            pending: self.organizer.phase(phase)?.in_work(id),
        })
    }

    /// Drain engine notifications into a report of where `phase` now stands.
    pub fn outcome(&mut self, phase: PhaseId) -> Result<Outcome> {
        let mut completed = Vec::new();
        for note in self.organizer.take_notifications() {
            debug!(?note, "notification");
            if let Notification::PhaseComplete {
                phase,
                announce: true,
            } = note
            {
                let name = self.phase_name(phase);
                info!(phase = %name, "phase complete");
                completed.push(name);
            }
        }
        let current = match self.organizer.phase(phase)?.cursor() {
            Some(id) => Some(self.item_view(phase, id)?),
            None => None,
        };
        Ok(Outcome {
            phase: self.phase_name(phase),
            progress: self.organizer.phase(phase)?.progress().to_string(),
            current,
            completed,
            active: self.organizer.active_phase().map(|p| self.phase_name(p)),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ItemView {
    pub id: ItemId,
    pub path: PathBuf,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Still in the phase's work set.
    pub pending: bool,
}

/// What a mutating command reports back.
#[derive(Debug, Serialize)]
pub struct Outcome {
    pub phase: String,
    pub progress: String,
    pub current: Option<ItemView>,
    /// Phases whose last outstanding item was just finished.
    pub completed: Vec<String>,
    pub active: Option<String>,
}

impl Outcome {
    pub fn write_text(&self, w: &mut dyn Write) -> io::Result<()> {
        match &self.current {
            Some(item) => writeln!(w, "{}\t{}", self.phase, item.path.display())?,
            None => writeln!(w, "{}\t-", self.phase)?,
        }
        for name in &self.completed {
            writeln!(w, "complete\t{name}")?;
        }
        Ok(())
    }

    pub fn write_pretty(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "{}: {}", self.phase, self.progress)?;
        match &self.current {
            Some(item) => {
                let marker = if item.pending { "" } else { " (done)" };
                writeln!(w, "  current: {}{marker}", item.path.display())?;
                if !item.tags.is_empty() {
                    writeln!(w, "  tags:    {}", item.tags.join(", "))?;
                }
            }
            None => writeln!(w, "  current: (none)")?,
        }
        for name in &self.completed {
            writeln!(w, "{name} complete!")?;
        }
        if !self.completed.is_empty() {
            match &self.active {
                Some(active) => writeln!(w, "Next up: {active}")?,
                None => writeln!(w, "Every phase is complete.")?,
            }
        }
        Ok(())
    }
}
