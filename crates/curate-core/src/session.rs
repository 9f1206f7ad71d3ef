//! Cross-invocation state: active phase, per-phase cursors and recent
//! categories, persisted as `.curate/session.json`.

use crate::config::state_dir;
use crate::error::ErrorCode;
use crate::organizer::Organizer;
use crate::phase::Phase;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

const SESSION_FILE: &str = "session.json";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to access session file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed session file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl SessionError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } => ErrorCode::FileOperationFailed,
            Self::Parse { .. } => ErrorCode::SessionParseError,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_phase: Option<String>,
    /// Phase name to root-relative image path.
    #[serde(default)]
    pub cursors: BTreeMap<String, PathBuf>,
    /// Category names, most recent first.
    #[serde(default)]
    pub recent: Vec<String>,
}

#[must_use]
pub fn session_path(root: &Path) -> PathBuf {
    state_dir(root).join(SESSION_FILE)
}

impl Session {
    /// Read the session for `root`. A missing file is an empty session.
    pub fn load(root: &Path) -> Result<Self, SessionError> {
        let path = session_path(root);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(SessionError::Io { path, source }),
        };
        serde_json::from_str(&text).map_err(|source| SessionError::Parse { path, source })
    }

    pub fn save(&self, root: &Path) -> Result<(), SessionError> {
        let dir = state_dir(root);
        fs::create_dir_all(&dir).map_err(|source| SessionError::Io {
            path: dir.clone(),
            source,
        })?;
        let path = session_path(root);
        let json = serde_json::to_string_pretty(self).map_err(|source| SessionError::Parse {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(|source| SessionError::Io { path, source })
    }

    /// Snapshot the parts of `organizer` that should survive the process.
    #[must_use]
    pub fn capture(organizer: &Organizer) -> Self {
        let active_phase = organizer
            .active_phase()
            .and_then(|id| organizer.phase(id).ok())
            .map(|p| p.name().to_string());
        let cursors = organizer
            .phases()
            .filter_map(|phase| {
                let cursor = phase.cursor()?;
                let path = organizer.relative_path(cursor).ok()?;
                Some((phase.name().to_string(), path))
            })
            .collect();
        let recent = organizer
            .recent_categories()
            .map(|c| c.name.clone())
            .collect();
        Self {
            active_phase,
            cursors,
            recent,
        }
    }

    /// Restore cursors, recent categories and the active phase.
    ///
    /// Entries naming phases, items or categories that no longer exist are
    /// dropped. A stored active phase only wins over auto-selection while it
    /// still has work.
    pub fn apply(&self, organizer: &mut Organizer) {
        for (phase_name, path) in &self.cursors {
            let Ok(phase) = organizer.phase_by_name(phase_name) else {
                debug!(phase = %phase_name, "dropping cursor for unknown phase");
                continue;
            };
            let Ok(item) = organizer.item_by_path(path) else {
                debug!(path = %path.display(), "dropping cursor for missing item");
                continue;
            };
            if organizer.set_image(phase, item).is_err() {
                debug!(phase = %phase_name, path = %path.display(), "cursor no longer in phase");
            }
        }

        for name in self.recent.iter().rev() {
            if let Ok(category) = organizer.category_by_name(name) {
                organizer.touch_recent(category);
            }
        }

        if let Some(name) = &self.active_phase
            && let Ok(phase) = organizer.phase_by_name(name)
            && organizer.phase(phase).is_ok_and(Phase::has_work)
        {
            organizer.select_phase(phase).ok();
        }
        organizer.take_notifications();
    }
}
