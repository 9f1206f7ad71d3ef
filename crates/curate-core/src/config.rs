use crate::error::ErrorCode;
use crate::phase::{Action, Extra, PhaseSpec, Step};
use crate::recent::DEFAULT_RECENT_CAPACITY;
use crate::tag::SignedTag;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Directory under the workflow root holding config, session and lock files.
pub const STATE_DIR: &str = ".curate";

/// A config file that exists but cannot be used.
#[derive(Debug, thiserror::Error)]
#[error("invalid config {}: {reason}", .path.display())]
pub struct ConfigError {
    pub path: PathBuf,
    pub reason: String,
}

impl ConfigError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::ConfigParseError
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default = "default_sidecar_extension")]
    pub sidecar_extension: String,
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
    #[serde(default = "default_recent_capacity")]
    pub recent_capacity: usize,
    #[serde(default = "default_phases")]
    pub phases: Vec<PhaseSpec>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            sidecar_extension: default_sidecar_extension(),
            image_extensions: default_image_extensions(),
            recent_capacity: default_recent_capacity(),
            phases: default_phases(),
        }
    }
}

impl WorkflowConfig {
    /// True if `path` has one of the configured image extensions.
    #[must_use]
    pub fn is_image(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.image_extensions
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
    }
}

fn default_sidecar_extension() -> String {
    "txt".to_string()
}

fn default_image_extensions() -> Vec<String> {
    ["png", "jpg", "jpeg", "tiff", "tif", "gif"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

const fn default_recent_capacity() -> usize {
    DEFAULT_RECENT_CAPACITY
}

fn tags(raw: &[&str]) -> Vec<SignedTag> {
    raw.iter()
        .filter_map(|t| t.parse().ok())
        .collect()
}

fn tag_step(raw: &str) -> Vec<Step> {
    tags(&[raw]).into_iter().map(Step::Tag).collect()
}

fn skip_buttons() -> [Action; 2] {
    [
        Action::new("Skip Prev", vec![Step::Prev]),
        Action::new("Skip Next", vec![Step::Next]),
    ]
}

/// The five-phase scanning workflow.
#[must_use]
pub fn default_phases() -> Vec<PhaseSpec> {
    let [skip_prev, skip_next] = skip_buttons();
    vec![
        PhaseSpec {
            name: "Phase 1: Clean".into(),
            tags: tags(&["-cleaned"]),
            extras: vec![],
            actions: vec![
                Action::new("Rotate left", vec![Step::RotateLeft]),
                Action::new("Rotate right", vec![Step::RotateRight]),
                Action::new("Crop", vec![Step::Crop]),
                skip_prev.clone(),
                skip_next.clone(),
                Action::new("Done", tag_step("+cleaned")),
            ],
        },
        PhaseSpec {
            name: "Phase 2: Categorize".into(),
            tags: tags(&["-categorized"]),
            extras: vec![Extra::CategoryPicker],
            actions: vec![
                skip_prev.clone(),
                skip_next.clone(),
                Action::new(
                    "Categorize",
                    [vec![Step::SaveCategory], tag_step("+categorized")].concat(),
                ),
            ],
        },
        PhaseSpec {
            name: "Phase 3: Renaming".into(),
            tags: tags(&["-named", "+categorized"]),
            extras: vec![Extra::Rename, Extra::ShowCategory],
            actions: vec![Action::new(
                "Rename",
                [vec![Step::SaveName], tag_step("+named")].concat(),
            )],
        },
        PhaseSpec {
            name: "Phase 4: Tagging".into(),
            tags: tags(&[
                "-hand_transcribe",
                "-computer_transcribe",
                "-no_text",
                "-text_elsewhere",
            ]),
            extras: vec![],
            actions: vec![
                Action::new("No text", tag_step("+no_text")),
                Action::new("Very short", tag_step("+hand_transcribe")),
                Action::new("Handwritten text", tag_step("+hand_transcribe")),
                Action::new("Computer font", tag_step("+computer_transcribe")),
                Action::new("Text stored elsewhere", tag_step("+text_elsewhere")),
                skip_prev.clone(),
                skip_next.clone(),
            ],
        },
        PhaseSpec {
            name: "Phase 5: Transcription".into(),
            tags: tags(&["+hand_transcribe", "-transcribed"]),
            extras: vec![Extra::Transcribe],
            actions: vec![
                skip_prev,
                skip_next,
                Action::new(
                    "Transcribed",
                    [vec![Step::SaveTranscription], tag_step("+transcribed")].concat(),
                ),
            ],
        },
    ]
}

#[must_use]
pub fn state_dir(root: &Path) -> PathBuf {
    root.join(STATE_DIR)
}

/// Load `<root>/.curate/config.toml`, falling back to defaults when absent.
pub fn load_workflow_config(root: &Path) -> Result<WorkflowConfig> {
    let path = state_dir(root).join("config.toml");
    if !path.exists() {
        return Ok(WorkflowConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config = toml::from_str::<WorkflowConfig>(&content).map_err(|e| ConfigError {
        path: path.clone(),
        reason: e.message().to_string(),
    })?;
    if config.phases.is_empty() {
        return Err(ConfigError {
            path,
            reason: "no phases declared".to_string(),
        }
        .into());
    }
    Ok(config)
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("curate/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    pub workflow: WorkflowConfig,
    pub user: UserConfig,
    pub resolved_output: String,
}

pub fn resolve_config(root: &Path, cli_json: bool) -> Result<EffectiveConfig> {
    let workflow = load_workflow_config(root)?;
    let user = load_user_config()?;

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(cli_json, user.output.clone(), env_format)?;

    Ok(EffectiveConfig {
        workflow,
        user,
        resolved_output,
    })
}

fn resolve_output(
    cli_json: bool,
    user_output: Option<String>,
    env_format: Option<String>,
) -> Result<String> {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" | "human" | "pretty" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return Ok("json".to_string());
    }

    if let Some(raw) = env_format {
        let mode = normalize_output_mode(&raw)
            .with_context(|| format!("Invalid FORMAT value '{raw}', expected text or json"))?;
        return Ok(mode.to_string());
    }

    if let Some(raw) = user_output {
        let mode = normalize_output_mode(&raw)
            .with_context(|| format!("Invalid user output '{raw}', expected text or json"))?;
        return Ok(mode.to_string());
    }

    Ok("text".to_string())
}
