//! Sidecar metadata files: a YAML header between `---` fences, a blank line,
//! then the free-text body (the transcription).
//!
//! ```text
//! ---
//! category: letters/1962
//! filename: scan-0001.jpg
//! tags:
//! - cleaned
//! ---
//!
//! Dear Margaret, ...
//! ```

use crate::tag::{Sign, SignedTag};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Errors reading or writing a sidecar file.
#[derive(Debug, thiserror::Error)]
pub enum SidecarError {
    #[error("sidecar I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed sidecar header in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to encode sidecar header: {0}")]
    Encode(#[source] serde_yaml::Error),
}

/// Structured header fields. Unknown keys are kept in `extra` and written back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SidecarHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// In-memory copy of one sidecar file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sidecar {
    pub header: SidecarHeader,
    pub body: String,
}

impl Sidecar {
    /// Load a sidecar, treating a missing file as empty metadata.
    pub fn load(path: &Path) -> Result<Self, SidecarError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(SidecarError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::parse(&text).map_err(|source| SidecarError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse sidecar text. Text without a leading `---` fence is all body.
    pub fn parse(text: &str) -> Result<Self, serde_yaml::Error> {
        let Some((header, body)) = split_header(text) else {
            return Ok(Self {
                header: SidecarHeader::default(),
                body: text.to_string(),
            });
        };

        let mut parsed: SidecarHeader = if header.trim().is_empty() {
            SidecarHeader::default()
        } else {
            serde_yaml::from_str(header)?
        };
        dedup_in_place(&mut parsed.tags);

        let body = body
            .strip_prefix("\r\n")
            .or_else(|| body.strip_prefix('\n'))
            .unwrap_or(body);
        Ok(Self {
            header: parsed,
            body: body.to_string(),
        })
    }

    /// The YAML header as written to disk, without fences.
    pub fn header_text(&self) -> Result<String, SidecarError> {
        serde_yaml::to_string(&self.header).map_err(SidecarError::Encode)
    }

    /// Full file contents.
    pub fn render(&self) -> Result<String, SidecarError> {
        let header = self.header_text()?;
        Ok(format!("---\n{header}---\n\n{}", self.body))
    }

    pub fn save(&self, path: &Path) -> Result<(), SidecarError> {
        let text = self.render()?;
        fs::write(path, text).map_err(|source| SidecarError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.header.tags
    }

    /// Apply a signed tag to the tag list. Returns true if the list changed.
    pub fn apply(&mut self, tag: &SignedTag) -> bool {
        let position = self.header.tags.iter().position(|t| *t == tag.name);
        match (tag.sign, position) {
            (Sign::Add, None) => {
                self.header.tags.push(tag.name.clone());
                true
            }
            (Sign::Remove, Some(idx)) => {
                self.header.tags.remove(idx);
                true
            }
            _ => false,
        }
    }
}

fn split_header(text: &str) -> Option<(&str, &str)> {
    let rest = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == "---" {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

fn dedup_in_place(tags: &mut Vec<String>) {
    let mut seen = Vec::with_capacity(tags.len());
    tags.retain(|t| {
        if seen.contains(t) {
            false
        } else {
            seen.push(t.clone());
            true
        }
    });
}
