use crate::app::error::{AppError, Result};
use crate::app::models::{ConcatenationResult, FileSection, GatheredFile, SectionStatus};
use std::fs;
use std::path::{Component, Path, PathBuf};

pub struct OutputGenerator;

impl OutputGenerator {
    /// Renders every selected path, in order, into one text blob.
    ///
    /// Missing or unreadable files become inline placeholder sections; the
    /// selection is not deduplicated.
    pub fn render<S: AsRef<str>>(
        base_dir: &Path,
        relative_paths: &[S],
        include_line_numbers: bool,
    ) -> ConcatenationResult {
        let mut sections = Vec::with_capacity(relative_paths.len());
        let mut text = String::new();

        for rel in relative_paths {
            let rel = rel.as_ref();
            let status = match resolve_file(base_dir, rel) {
                None => {
                    log::warn!("Selected file not found: {}", rel);
                    text.push_str(&format!("File not found: {}\n\n", rel));
                    SectionStatus::NotFound
                }
                Some(path) => {
                    text.push_str(&format!("--- {} ---\n", rel));
                    match read_lossy(&path) {
                        Ok(content) => {
                            text.push_str(&number_lines(&content, include_line_numbers));
                            text.push_str("\n\n");
                            SectionStatus::Ok(content)
                        }
                        Err(e) => {
                            log::warn!("Failed to read {}: {}", rel, e);
                            text.push_str(&format!("Error reading file {}: {}\n\n", rel, e));
                            SectionStatus::ReadError(e.to_string())
                        }
                    }
                }
            };

            sections.push(FileSection {
                relative_path: rel.to_string(),
                status,
            });
        }

        ConcatenationResult { sections, text }
    }

    /// Collects `(file name, raw text)` pairs for the Q&A flow.
    ///
    /// Unlike `render`, the first missing or unreadable file fails the whole
    /// request and nothing is returned.
    pub fn gather_strict<S: AsRef<str>>(
        base_dir: &Path,
        relative_paths: &[S],
    ) -> Result<Vec<GatheredFile>> {
        let mut gathered = Vec::with_capacity(relative_paths.len());

        for rel in relative_paths {
            let rel = rel.as_ref();
            let path =
                resolve_file(base_dir, rel).ok_or_else(|| AppError::FileNotFound(rel.to_string()))?;
            let content = read_lossy(&path).map_err(|source| AppError::FileRead {
                path: rel.to_string(),
                source,
            })?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| rel.to_string());

            gathered.push(GatheredFile { name, content });
        }

        Ok(gathered)
    }
}

/// Joins `rel` onto `base_dir` if it stays inside it and names a regular file.
fn resolve_file(base_dir: &Path, rel: &str) -> Option<PathBuf> {
    let mut path = base_dir.to_path_buf();
    let mut depth = 0usize;

    for component in Path::new(rel).components() {
        match component {
            Component::Normal(part) => {
                path.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return None;
                }
                path.pop();
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    path.is_file().then_some(path)
}

fn read_lossy(path: &Path) -> std::io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Splits on `\r\n`, `\n` or a lone `\r`; a trailing terminator adds no line.
fn split_lines(content: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = content;

    while let Some(idx) = rest.find(['\n', '\r']) {
        lines.push(&rest[..idx]);
        let skip = if rest[idx..].starts_with("\r\n") { 2 } else { 1 };
        rest = &rest[idx + skip..];
    }
    if !rest.is_empty() {
        lines.push(rest);
    }

    lines
}

fn number_lines(content: &str, include_line_numbers: bool) -> String {
    let mut out = String::with_capacity(content.len() + 16);
    for (i, line) in split_lines(content).into_iter().enumerate() {
        if include_line_numbers {
            out.push_str(&format!("{:4} | {}\n", i + 1, line));
        } else {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}
