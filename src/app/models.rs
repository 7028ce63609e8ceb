use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;

/// Bounds and filters for a single tree enumeration.
#[derive(Debug, Clone)]
pub struct EnumerationConfig {
    pub base_dir: PathBuf,
    pub max_depth: usize,
    pub max_files: usize,
    /// Lowercase, with the leading dot (".log").
    pub ignored_extensions: HashSet<String>,
}

/// Why a directory could not be listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeErrorKind {
    PermissionDenied,
    NotFound,
}

impl TreeErrorKind {
    pub fn message(self) -> &'static str {
        match self {
            TreeErrorKind::PermissionDenied => "Permission denied",
            TreeErrorKind::NotFound => "Directory not found",
        }
    }
}

/// One node of the browsable tree, serialized as
/// `{name, type, path?, children?}` for the file explorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeNode {
    File {
        name: String,
        #[serde(rename = "path")]
        relative_path: String,
    },
    Folder {
        name: String,
        #[serde(skip_serializing)]
        relative_path: String,
        children: Vec<TreeNode>,
    },
    Error {
        name: String,
        #[serde(skip_serializing)]
        kind: TreeErrorKind,
    },
}

impl TreeNode {
    pub fn error(kind: TreeErrorKind) -> Self {
        TreeNode::Error {
            name: kind.message().to_string(),
            kind,
        }
    }

    #[cfg(test)]
    pub fn name(&self) -> &str {
        match self {
            TreeNode::File { name, .. }
            | TreeNode::Folder { name, .. }
            | TreeNode::Error { name, .. } => name,
        }
    }
}

/// Result of walking the base directory.
#[derive(Debug, Clone)]
pub struct Enumeration {
    pub nodes: Vec<TreeNode>,
    pub file_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionStatus {
    Ok(String),
    NotFound,
    ReadError(String),
}

/// Serializes as `{status, detail?}`; file text stays out of the wire form
/// since it is already part of the rendered blob.
impl Serialize for SectionStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            SectionStatus::Ok(_) => map.serialize_entry("status", "ok")?,
            SectionStatus::NotFound => map.serialize_entry("status", "not_found")?,
            SectionStatus::ReadError(message) => {
                map.serialize_entry("status", "read_error")?;
                map.serialize_entry("detail", message)?;
            }
        }
        map.end()
    }
}

/// One selected file's contribution to a concatenation.
#[derive(Debug, Clone, Serialize)]
pub struct FileSection {
    pub relative_path: String,
    #[serde(flatten)]
    pub status: SectionStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConcatenationResult {
    pub sections: Vec<FileSection>,
    pub text: String,
}

/// Raw file handed to the Q&A flow: final path component and full text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatheredFile {
    pub name: String,
    pub content: String,
}
