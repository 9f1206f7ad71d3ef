//! One image on disk together with its sidecar metadata.

use crate::category::CategoryId;
use crate::error::{OrganizeError, Result};
use crate::sidecar::Sidecar;
use crate::tag::{self, SignedTag};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Identity assigned at load time, in discovery order. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ItemId(pub(crate) usize);

impl ItemId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Derive the sidecar path for an image: same directory, same stem.
#[must_use]
pub fn sidecar_path_for(image_path: &Path, extension: &str) -> PathBuf {
    image_path.with_extension(extension)
}

#[derive(Debug, Clone)]
pub struct Item {
    id: ItemId,
    image_path: PathBuf,
    sidecar_path: PathBuf,
    sidecar_extension: String,
    sidecar: Sidecar,
    category: Option<CategoryId>,
}

impl Item {
    /// Load an image's sidecar (missing sidecar means no metadata).
    pub fn load(
        id: ItemId,
        image_path: PathBuf,
        sidecar_extension: &str,
        category: Option<CategoryId>,
    ) -> Result<Self> {
        let sidecar_path = sidecar_path_for(&image_path, sidecar_extension);
        let sidecar = Sidecar::load(&sidecar_path)?;
        Ok(Self {
            id,
            image_path,
            sidecar_path,
            sidecar_extension: sidecar_extension.to_string(),
            sidecar,
            category,
        })
    }

    #[must_use]
    pub const fn id(&self) -> ItemId {
        self.id
    }

    #[must_use]
    pub fn image_path(&self) -> &Path {
        &self.image_path
    }

    #[must_use]
    pub fn sidecar_path(&self) -> &Path {
        &self.sidecar_path
    }

    #[must_use]
    pub fn file_name(&self) -> String {
        self.image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    #[must_use]
    pub const fn category(&self) -> Option<CategoryId> {
        self.category
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        self.sidecar.tags()
    }

    #[must_use]
    pub fn transcription(&self) -> &str {
        &self.sidecar.body
    }

    #[must_use]
    pub fn has_tag(&self, name: &str) -> bool {
        self.tags().iter().any(|t| t == name)
    }

    /// True if every predicate holds for the current tags.
    #[must_use]
    pub fn matches(&self, predicates: &[SignedTag]) -> bool {
        tag::matches(self.tags(), predicates)
    }

    /// Apply a tag and persist. Persists even when the tag set is unchanged.
    /// The in-memory tags are restored if the write fails.
    pub fn tag(&mut self, signed: &SignedTag, category_name: Option<&str>) -> Result<bool> {
        let previous = self.sidecar.header.tags.clone();
        let changed = self.sidecar.apply(signed);
        if let Err(e) = self.save(category_name) {
            self.sidecar.header.tags = previous;
            return Err(e);
        }
        Ok(changed)
    }

    pub fn set_transcription(&mut self, text: &str, category_name: Option<&str>) -> Result<()> {
        let previous = std::mem::replace(&mut self.sidecar.body, text.to_string());
        if let Err(e) = self.save(category_name) {
            self.sidecar.body = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Rewrite the sidecar with the current filename and category.
    pub fn save(&mut self, category_name: Option<&str>) -> Result<()> {
        self.sidecar.header.filename = Some(self.file_name());
        if let Some(name) = category_name {
            self.sidecar.header.category = Some(name.to_string());
        }
        self.sidecar.save(&self.sidecar_path)?;
        Ok(())
    }

    /// The header exactly as it would be written next.
    pub fn metadata_string(&self) -> Result<String> {
        let mut preview = self.sidecar.clone();
        preview.header.filename = Some(self.file_name());
        Ok(preview.header_text()?)
    }

    /// Build the destination for a rename within the same directory.
    ///
    /// A recognised image extension typed by the user is dropped; the current
    /// extension is kept, lower-cased.
    pub fn rename_target(&self, new_name: &str, image_extensions: &[String]) -> Result<PathBuf> {
        let trimmed = new_name.trim();
        if trimmed.is_empty() {
            return Err(OrganizeError::validation("name", "name is blank"));
        }
        if trimmed.contains('/') || trimmed.contains('\\') {
            return Err(OrganizeError::validation(
                "name",
                format!("'{trimmed}' must not contain a path separator"),
            ));
        }

        let typed = Path::new(trimmed);
        let stem = match typed.extension().and_then(|e| e.to_str()) {
            Some(ext) if image_extensions.iter().any(|k| k.eq_ignore_ascii_case(ext)) => typed
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            _ => trimmed.to_string(),
        };
        if stem.is_empty() || stem == "." || stem == ".." {
            return Err(OrganizeError::validation("name", format!("'{trimmed}' is not a file name")));
        }

        let file_name = match self.image_path.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{stem}.{}", ext.to_ascii_lowercase()),
            None => stem,
        };
        let parent = self.image_path.parent().unwrap_or_else(|| Path::new(""));
        Ok(parent.join(file_name))
    }

    /// Fail with `Clobbering` if moving to `new_path` would overwrite anything.
    pub fn check_move(&self, new_path: &Path) -> Result<()> {
        if new_path == self.image_path {
            return Ok(());
        }
        if new_path.exists() {
            return Err(OrganizeError::Clobbering {
                path: new_path.to_path_buf(),
            });
        }
        let new_sidecar = sidecar_path_for(new_path, &self.sidecar_extension);
        // A sidecar at the destination belongs to some other image, whether or
        // not this one has a sidecar yet.
        if new_sidecar != self.sidecar_path && new_sidecar.exists() {
            return Err(OrganizeError::Clobbering { path: new_sidecar });
        }
        Ok(())
    }

    /// Move the image and its sidecar. Returns false if `new_path` is the
    /// current path.
    ///
    /// The two renames are not atomic. If the sidecar rename fails after the
    /// image moved, the in-memory paths follow the image and the error is
    /// returned; the old sidecar is left where it was.
    pub fn move_to(&mut self, new_path: &Path) -> Result<bool> {
        if new_path == self.image_path {
            return Ok(false);
        }
        self.check_move(new_path)?;

        let new_sidecar = sidecar_path_for(new_path, &self.sidecar_extension);
        let had_sidecar = self.sidecar_path.exists();

        fs::rename(&self.image_path, new_path).map_err(|e| OrganizeError::io(&self.image_path, e))?;
        info!(from = %self.image_path.display(), to = %new_path.display(), "moved image");

        let old_sidecar = std::mem::replace(&mut self.sidecar_path, new_sidecar);
        self.image_path = new_path.to_path_buf();

        if had_sidecar {
            if let Err(e) = fs::rename(&old_sidecar, &self.sidecar_path) {
                warn!(
                    sidecar = %old_sidecar.display(),
                    image = %self.image_path.display(),
                    "image moved but sidecar rename failed"
                );
                return Err(OrganizeError::io(&old_sidecar, e));
            }
        }
        Ok(true)
    }

    pub(crate) fn set_category(&mut self, category: Option<CategoryId>) {
        self.category = category;
    }

    /// Point the item at a directory that was moved as a whole.
    pub(crate) fn rebase(&mut self, old_dir: &Path, new_dir: &Path) -> bool {
        let Ok(rest) = self.image_path.strip_prefix(old_dir) else {
            return false;
        };
        self.image_path = new_dir.join(rest);
        self.sidecar_path = sidecar_path_for(&self.image_path, &self.sidecar_extension);
        true
    }

    #[must_use]
    pub fn has_sidecar_file(&self) -> bool {
        self.sidecar_path.exists()
    }

    /// Delete both files. A missing sidecar is not an error.
    pub(crate) fn remove_files(&self) -> Result<()> {
        fs::remove_file(&self.image_path).map_err(|e| OrganizeError::io(&self.image_path, e))?;
        match fs::remove_file(&self.sidecar_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(OrganizeError::io(&self.sidecar_path, e)),
        }
    }
}
