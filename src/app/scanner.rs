use crate::app::error::Result;
use crate::app::models::{Enumeration, EnumerationConfig, TreeErrorKind, TreeNode};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Bounded, sorted walk of the base directory.
pub struct Scanner<'a> {
    config: &'a EnumerationConfig,
}

impl<'a> Scanner<'a> {
    pub fn new(config: &'a EnumerationConfig) -> Self {
        Self { config }
    }

    /// Walks the base directory depth-first.
    ///
    /// Permission and not-found failures become inline `Error` nodes; any
    /// other listing failure aborts the walk.
    pub fn scan(&self) -> Result<Enumeration> {
        log::debug!(
            "Scanning {:?} (max depth {}, max files {})",
            self.config.base_dir,
            self.config.max_depth,
            self.config.max_files
        );

        let mut file_count = 0;
        let nodes = self.scan_dir(&self.config.base_dir, "", 0, &mut file_count)?;

        log::info!(
            "Scanned {:?}: {} file(s)",
            self.config.base_dir,
            file_count
        );
        Ok(Enumeration { nodes, file_count })
    }

    fn scan_dir(
        &self,
        dir: &Path,
        relative_dir: &str,
        depth: usize,
        file_count: &mut usize,
    ) -> Result<Vec<TreeNode>> {
        let mut items = Vec::new();
        if depth > self.config.max_depth || *file_count >= self.config.max_files {
            return Ok(items);
        }

        let names = match list_sorted(dir) {
            Ok(names) => names,
            Err(err) => match inline_error_kind(&err) {
                Some(kind) => {
                    log::warn!("Cannot list {:?}: {}", dir, err);
                    items.push(TreeNode::error(kind));
                    return Ok(items);
                }
                None => return Err(err.into()),
            },
        };

        for name in names {
            if *file_count >= self.config.max_files {
                break;
            }
            if self.is_ignored(&name) {
                continue;
            }

            let path = dir.join(&name);
            let relative_path = if relative_dir.is_empty() {
                name.clone()
            } else {
                format!("{}/{}", relative_dir, name)
            };

            // Follows symlinks; unreadable metadata means neither file nor dir.
            let Ok(metadata) = fs::metadata(&path) else {
                log::debug!("Skipping unreadable entry {:?}", path);
                continue;
            };

            if metadata.is_file() {
                items.push(TreeNode::File {
                    name,
                    relative_path,
                });
                *file_count += 1;
            } else if metadata.is_dir() {
                let children = self.scan_dir(&path, &relative_path, depth + 1, file_count)?;
                items.push(TreeNode::Folder {
                    name,
                    relative_path,
                    children,
                });
            }
        }

        Ok(items)
    }

    fn is_ignored(&self, name: &str) -> bool {
        extension_of(name).is_some_and(|ext| self.config.ignored_extensions.contains(&ext))
    }
}

/// Listing failures reported as tree nodes; anything else aborts the walk.
fn inline_error_kind(err: &std::io::Error) -> Option<TreeErrorKind> {
    match err.kind() {
        ErrorKind::PermissionDenied => Some(TreeErrorKind::PermissionDenied),
        ErrorKind::NotFound => Some(TreeErrorKind::NotFound),
        _ => None,
    }
}

fn list_sorted(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<std::io::Result<Vec<_>>>()?;
    names.sort();
    Ok(names)
}

/// Lowercased extension with its leading dot; dotfiles like `.bashrc` have none.
fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{}", ext))
}
