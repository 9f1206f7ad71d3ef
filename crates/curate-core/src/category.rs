//! Category registry: the directories under the workflow root.

use crate::error::{OrganizeError, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::info;

/// Index of a category in the registry. Stable for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CategoryId(pub(crate) usize);

impl CategoryId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A directory items can be sorted into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub path: PathBuf,
    /// Path relative to the workflow root (`.` for the root itself).
    pub name: String,
}

/// Every category known to the workflow, in registration order.
#[derive(Debug, Clone)]
pub struct CategoryRegistry {
    root: PathBuf,
    categories: Vec<Category>,
}

impl CategoryRegistry {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            categories: Vec::new(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Register an existing directory. Registering the same path twice returns
    /// the original id.
    pub fn add(&mut self, path: impl Into<PathBuf>) -> CategoryId {
        let path = path.into();
        if let Some(idx) = self.categories.iter().position(|c| c.path == path) {
            return CategoryId(idx);
        }
        let name = display_name(&self.root, &path);
        self.categories.push(Category { path, name });
        CategoryId(self.categories.len() - 1)
    }

    #[must_use]
    pub fn get(&self, id: CategoryId) -> &Category {
        &self.categories[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = (CategoryId, &Category)> {
        self.categories
            .iter()
            .enumerate()
            .map(|(idx, c)| (CategoryId(idx), c))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<CategoryId> {
        let name = name.trim().trim_end_matches('/');
        self.categories
            .iter()
            .position(|c| c.name == name)
            .map(CategoryId)
    }

    /// The category with the longest directory that contains `path`.
    #[must_use]
    pub fn find_narrowest(&self, path: &Path) -> Option<CategoryId> {
        self.categories
            .iter()
            .enumerate()
            .filter(|(_, c)| path.starts_with(&c.path))
            .max_by_key(|(_, c)| c.path.as_os_str().len())
            .map(|(idx, _)| CategoryId(idx))
    }

    /// Create a new category directory under the root.
    pub fn create(&mut self, name: &str) -> Result<CategoryId> {
        let relative = validate_name(name)?;
        let path = self.root.join(relative);
        if path.exists() {
            return Err(OrganizeError::DuplicateCategory { path });
        }
        fs::create_dir_all(&path).map_err(|e| OrganizeError::io(&path, e))?;
        info!(path = %path.display(), "created category");
        self.add_parents(&path);
        Ok(self.add(path))
    }

    /// Register every directory between the root and `path`, outermost first.
    fn add_parents(&mut self, path: &Path) {
        let mut parents: Vec<PathBuf> = path
            .ancestors()
            .skip(1)
            .take_while(|p| p.starts_with(&self.root) && *p != self.root)
            .map(Path::to_path_buf)
            .collect();
        parents.reverse();
        for parent in parents {
            self.add(parent);
        }
    }

    /// Check that `id` can be renamed to `new_name` and return the destination.
    pub fn plan_rename(&self, id: CategoryId, new_name: &str) -> Result<PathBuf> {
        let relative = validate_name(new_name)?;
        let category = self.get(id);
        if category.path == self.root {
            return Err(OrganizeError::validation(
                "category",
                "the workflow root cannot be renamed",
            ));
        }
        let dest = self.root.join(relative);
        if dest.starts_with(&category.path) {
            return Err(OrganizeError::validation(
                "category",
                "cannot move a category inside itself",
            ));
        }
        if dest.exists() {
            return Err(OrganizeError::Clobbering { path: dest });
        }
        Ok(dest)
    }

    /// Rename the category directory and rebase it and every nested category.
    ///
    /// Returns the old and new directory so callers can re-home items.
    pub fn rename(&mut self, id: CategoryId, new_name: &str) -> Result<(PathBuf, PathBuf)> {
        let dest = self.plan_rename(id, new_name)?;
        let old = self.get(id).path.clone();
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| OrganizeError::io(parent, e))?;
        }
        fs::rename(&old, &dest).map_err(|e| OrganizeError::io(&old, e))?;
        info!(from = %old.display(), to = %dest.display(), "renamed category");
        self.add_parents(&dest);

        for category in &mut self.categories {
            if let Ok(rest) = category.path.strip_prefix(&old) {
                category.path = dest.join(rest);
                category.name = display_name(&self.root, &category.path);
            }
        }
        Ok((old, dest))
    }
}

fn display_name(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}

fn validate_name(name: &str) -> Result<&Path> {
    let trimmed = name.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(OrganizeError::validation("category", "name is blank"));
    }
    let path = Path::new(trimmed);
    if !path.components().all(|c| matches!(c, Component::Normal(_))) {
        return Err(OrganizeError::validation(
            "category",
            format!("'{trimmed}' must be a relative path below the root"),
        ));
    }
    // Discovery never enters hidden directories.
    if path
        .components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
    {
        return Err(OrganizeError::validation(
            "category",
            format!("'{trimmed}' must not name a hidden directory"),
        ));
    }
    Ok(path)
}
