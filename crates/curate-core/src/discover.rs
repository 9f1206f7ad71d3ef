//! Walk the workflow root for image files and category directories.

use crate::config::WorkflowConfig;
use crate::error::{OrganizeError, Result};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Everything found under a root, in a deterministic order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    /// Every visited directory, root first, breadth-first.
    pub dirs: Vec<PathBuf>,
    /// Image files sorted by path.
    pub images: Vec<PathBuf>,
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// Breadth-first walk of `root`. Hidden directories are not entered.
pub fn discover(root: &Path, config: &WorkflowConfig) -> Result<Discovery> {
    if !root.is_dir() {
        return Err(OrganizeError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let mut found = Discovery::default();
    let mut queue = VecDeque::from([root.to_path_buf()]);
    while let Some(dir) = queue.pop_front() {
        let mut children = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| OrganizeError::io(&dir, e))? {
            let entry = entry.map_err(|e| OrganizeError::io(&dir, e))?;
            children.push(entry.path());
        }
        children.sort();

        for child in children {
            if child.is_dir() {
                if !is_hidden(&child) {
                    queue.push_back(child);
                }
            } else if child.is_file() && config.is_image(&child) {
                found.images.push(child);
            }
        }
        found.dirs.push(dir);
    }
    found.images.sort();

    debug!(
        root = %root.display(),
        dirs = found.dirs.len(),
        images = found.images.len(),
        "discovery finished"
    );
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, rel: &str) {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn finds_images_recursively_and_ignores_other_files() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "b.PNG");
        touch(&dir, "a.jpg");
        touch(&dir, "a.txt");
        touch(&dir, "letters/1962/c.tiff");
        touch(&dir, "notes.md");

        let found = discover(dir.path(), &WorkflowConfig::default()).unwrap();
        let rel: Vec<_> = found
            .images
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            rel,
            vec![
                PathBuf::from("a.jpg"),
                PathBuf::from("b.PNG"),
                PathBuf::from("letters/1962/c.tiff"),
            ]
        );
        assert_eq!(found.dirs.len(), 3);
        assert_eq!(found.dirs[0], dir.path());
    }

    #[test]
    fn hidden_directories_are_skipped() {
        let dir = TempDir::new().unwrap();
        touch(&dir, ".curate/thumb.png");
        touch(&dir, "kept.png");
        let found = discover(dir.path(), &WorkflowConfig::default()).unwrap();
        assert_eq!(found.images.len(), 1);
        assert_eq!(found.dirs.len(), 1);
    }

    #[test]
    fn non_directory_root_is_rejected() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "file.png");
        let err = discover(&dir.path().join("file.png"), &WorkflowConfig::default()).unwrap_err();
        assert!(matches!(err, OrganizeError::NotADirectory { .. }));
    }
}
