//! Shared output layer for pretty/text/JSON parity across all CLI commands.
//!
//! Every command handler receives an [`OutputMode`] and formats its output
//! accordingly: pretty output for humans at a terminal, compact text for pipes,
//! or stable JSON.
//!
//! # Output mode resolution
//!
//! Precedence (highest wins):
//! 1. `--json` flag
//! 2. `FORMAT` env var (`text` | `pretty` | `json`)
//! 3. `output` in the user config
//! 4. Default: [`OutputMode::Pretty`] if stdout is a TTY; [`OutputMode::Text`] if piped.

use curate_core::config::ConfigError;
use curate_core::error::ErrorCode;
use curate_core::lock::LockError;
use curate_core::session::SessionError;
use curate_core::OrganizeError;
use serde::Serialize;
use std::io::{self, IsTerminal, Write};

/// Shared width for human pretty separators.
pub const PRETTY_RULE_WIDTH: usize = 72;

/// Write a horizontal separator used by pretty human output.
pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = PRETTY_RULE_WIDTH)
}

/// Write a section heading followed by a separator.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

/// Render a left-aligned key/value line in human output.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<12} {}", format!("{key}:"), value.as_ref())
}

/// The three output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-optimized output (sections, visual framing).
    Pretty,
    /// Plain tab-separated text for pipes and scripts.
    Text,
    /// Machine-readable JSON.
    Json,
}

impl OutputMode {
    /// Returns `true` if JSON output was requested.
    #[must_use]
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }

    /// Map a resolved config value (`text` or `json`) to a mode.
    ///
    /// `text` becomes pretty output when stdout is a terminal.
    #[must_use]
    pub fn from_resolved(resolved: &str) -> Self {
        from_resolved_inner(resolved, io::stdout().is_terminal())
    }
}

fn from_resolved_inner(resolved: &str, is_tty: bool) -> OutputMode {
    match resolved {
        "json" => OutputMode::Json,
        _ if is_tty => OutputMode::Pretty,
        _ => OutputMode::Text,
    }
}

/// Render a serializable value to stdout in the requested format.
///
/// In JSON mode, the value is serialized with `serde_json`. In pretty/text mode,
/// the provided `human_fn` closure is called to produce text output.
/// For distinct text/pretty rendering, use [`render_mode`].
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Pretty | OutputMode::Text => {
            human_fn(value, &mut out)?;
        }
    }
    Ok(())
}

/// Render a serializable value with explicit pretty/text renderers.
pub fn render_mode<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Text => text_fn(value, &mut out)?,
        OutputMode::Pretty => pretty_fn(value, &mut out)?,
    }
    Ok(())
}

/// A structured error with optional suggestion and error code.
#[derive(Debug, Serialize)]
pub struct CliError {
    /// Human-readable error message.
    pub message: String,
    /// Optional suggestion for how to fix the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Machine-readable error code (e.g. "E3001").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    /// Create a simple error with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            error_code: None,
        }
    }

    fn coded(message: String, code: ErrorCode) -> Self {
        Self {
            message,
            suggestion: code.hint().map(ToString::to_string),
            error_code: Some(code.code().to_string()),
        }
    }
}

/// Find the first engine error in the chain and use its code and hint.
impl From<&anyhow::Error> for CliError {
    fn from(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");
        for cause in err.chain() {
            if let Some(e) = cause.downcast_ref::<OrganizeError>() {
                return Self::coded(message, e.code());
            }
            if let Some(e) = cause.downcast_ref::<LockError>() {
                return Self::coded(message, e.code());
            }
            if let Some(e) = cause.downcast_ref::<SessionError>() {
                return Self::coded(message, e.code());
            }
            if let Some(e) = cause.downcast_ref::<ConfigError>() {
                return Self::coded(message, e.code());
            }
        }
        Self::new(message)
    }
}

/// Render an error to stderr in the requested format.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({
                "error": error,
            });
            serde_json::to_writer_pretty(&mut out, &wrapper)?;
            writeln!(out)?;
        }
        OutputMode::Pretty | OutputMode::Text => {
            match &error.error_code {
                Some(code) => writeln!(out, "error[{code}]: {}", error.message)?,
                None => writeln!(out, "error: {}", error.message)?,
            }
            if let Some(ref suggestion) = error.suggestion {
                writeln!(out, "  suggestion: {suggestion}")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn resolved_text_depends_on_terminal() {
        assert_eq!(from_resolved_inner("text", true), OutputMode::Pretty);
        assert_eq!(from_resolved_inner("text", false), OutputMode::Text);
        assert_eq!(from_resolved_inner("json", true), OutputMode::Json);
        assert!(OutputMode::Json.is_json());
        assert!(!OutputMode::Text.is_json());
    }

    #[test]
    fn engine_errors_carry_code_and_hint() {
        let err = anyhow::Error::new(OrganizeError::Clobbering {
            path: "a/b.png".into(),
        })
        .context("rename failed");
        let cli = CliError::from(&err);
        assert_eq!(cli.error_code.as_deref(), Some("E3001"));
        assert!(cli.suggestion.is_some());
        assert!(cli.message.starts_with("rename failed: "));
    }

    #[test]
    fn plain_errors_have_no_code() {
        let err: anyhow::Result<()> = Err(anyhow::anyhow!("boom")).context("outer");
        let cli = CliError::from(&err.unwrap_err());
        assert!(cli.error_code.is_none());
        assert_eq!(cli.message, "outer: boom");
    }

    #[test]
    fn cli_error_json_omits_empty_fields() {
        let json = serde_json::to_value(CliError::new("nope")).unwrap();
        assert_eq!(json, serde_json::json!({ "message": "nope" }));
    }
}
