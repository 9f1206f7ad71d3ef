use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Machine-readable error codes for scripted callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotADirectory,
    ConfigParseError,
    SessionParseError,
    ItemNotFound,
    PhaseNotFound,
    CategoryNotFound,
    InvalidInput,
    Clobbering,
    DuplicateCategory,
    SidecarParseError,
    FileOperationFailed,
    LockContention,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotADirectory => "E1001",
            Self::ConfigParseError => "E1002",
            Self::SessionParseError => "E1003",
            Self::ItemNotFound => "E2001",
            Self::PhaseNotFound => "E2002",
            Self::CategoryNotFound => "E2003",
            Self::InvalidInput => "E2004",
            Self::Clobbering => "E3001",
            Self::DuplicateCategory => "E3002",
            Self::SidecarParseError => "E3003",
            Self::FileOperationFailed => "E5001",
            Self::LockContention => "E5002",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotADirectory => "Workflow root is not a directory",
            Self::ConfigParseError => "Config file parse error",
            Self::SessionParseError => "Session file parse error",
            Self::ItemNotFound => "Item not found",
            Self::PhaseNotFound => "Phase not found",
            Self::CategoryNotFound => "Category not found",
            Self::InvalidInput => "Invalid or missing input",
            Self::Clobbering => "Destination already exists",
            Self::DuplicateCategory => "Category already exists",
            Self::SidecarParseError => "Sidecar metadata parse error",
            Self::FileOperationFailed => "File operation failed",
            Self::LockContention => "Lock contention",
        }
    }

    /// Optional remediation hint that can be surfaced to the user.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotADirectory => Some("Pass a directory with --root or run from inside one."),
            Self::ConfigParseError => Some("Fix syntax in .curate/config.toml and retry."),
            Self::SessionParseError => Some("Delete .curate/session.json to reset cursors."),
            Self::ItemNotFound => Some("Use a path relative to the workflow root."),
            Self::PhaseNotFound => Some("Run `cur status` to list phase names."),
            Self::CategoryNotFound => Some("Run `cur category list` to see known categories."),
            Self::InvalidInput => Some("Provide a non-blank value and retry."),
            Self::Clobbering => Some("Pick a different name; existing files are never overwritten."),
            Self::DuplicateCategory => Some("Select the existing category instead."),
            Self::SidecarParseError => Some("Fix the YAML header of the sidecar file."),
            Self::FileOperationFailed => Some("Check permissions and free space, then retry."),
            Self::LockContention => Some("Retry after the other `cur` process exits."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors surfaced by the workflow engine.
///
/// All of them are recoverable: the engine checks for them before mutating
/// anything, so the caller may present the message and let the user retry.
#[derive(Debug, thiserror::Error)]
pub enum OrganizeError {
    #[error("not a directory: {}", .path.display())]
    NotADirectory { path: PathBuf },

    /// Destination path already occupied by another file or directory.
    #[error("destination already exists: {}", .path.display())]
    Clobbering { path: PathBuf },

    /// A category directory with this name already exists.
    #[error("category already exists: {}", .path.display())]
    DuplicateCategory { path: PathBuf },

    /// Required input was blank or malformed.
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("no such item: {0}")]
    UnknownItem(String),

    #[error("no such phase: {0}")]
    UnknownPhase(String),

    #[error("no such category: {0}")]
    UnknownCategory(String),

    #[error(transparent)]
    Sidecar(#[from] crate::sidecar::SidecarError),

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl OrganizeError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotADirectory { .. } => ErrorCode::NotADirectory,
            Self::Clobbering { .. } => ErrorCode::Clobbering,
            Self::DuplicateCategory { .. } => ErrorCode::DuplicateCategory,
            Self::Validation { .. } => ErrorCode::InvalidInput,
            Self::UnknownItem(_) => ErrorCode::ItemNotFound,
            Self::UnknownPhase(_) => ErrorCode::PhaseNotFound,
            Self::UnknownCategory(_) => ErrorCode::CategoryNotFound,
            Self::Sidecar(_) => ErrorCode::SidecarParseError,
            Self::Io { .. } => ErrorCode::FileOperationFailed,
        }
    }

    /// Optional remediation hint for the user.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

pub type Result<T, E = OrganizeError> = std::result::Result<T, E>;
