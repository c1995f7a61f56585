//! Filesystem operations behind the file tools
//!
//! Every path a client sends is resolved against the manager's root, so a
//! relative `notes/todo.txt` means the same file no matter where the
//! process was started.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use std::fmt;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;

use mcp_server::ToolError;

/// How `read_file` turns bytes into text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// UTF-8, invalid sequences replaced
    #[default]
    Utf8,
    Base64,
    /// One char per byte (latin-1)
    Binary,
}

impl Encoding {
    pub const NAMES: &'static [&'static str] = &["utf8", "base64", "binary"];

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "utf8" => Some(Self::Utf8),
            "base64" => Some(Self::Base64),
            "binary" => Some(Self::Binary),
            _ => None,
        }
    }

    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Base64 => STANDARD.encode(bytes),
            Self::Binary => bytes.iter().map(|&b| b as char).collect(),
        }
    }
}

/// What a directory entry is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File { size: u64 },
    Directory,
    Other,
}

impl EntryKind {
    fn from_metadata(metadata: &Metadata) -> Self {
        if metadata.is_file() {
            Self::File { size: metadata.len() }
        } else if metadata.is_dir() {
            Self::Directory
        } else {
            Self::Other
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::File { .. } => "file",
            Self::Directory => "directory",
            Self::Other => "other",
        }
    }
}

/// One line of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Name relative to the listed directory (`sub/file.txt` when nested)
    pub name: String,
    pub kind: EntryKind,
    pub depth: usize,
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indent = "  ".repeat(self.depth);
        match self.kind {
            EntryKind::File { size } => write!(f, "{}📄 {} ({} bytes)", indent, self.name, size),
            EntryKind::Directory => write!(f, "{}📁 {}/", indent, self.name),
            EntryKind::Other => write!(f, "{}❔ {}", indent, self.name),
        }
    }
}

/// Result of `read_file`
#[derive(Debug, Clone)]
pub struct FileContents {
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub content: String,
}

/// Result of `file_info`
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub kind: EntryKind,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub permissions: String,
    pub absolute_path: PathBuf,
}

/// Filesystem access rooted at one directory
#[derive(Debug, Clone)]
pub struct FileManager {
    root: PathBuf,
}

impl FileManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute paths pass through; relative ones are joined to the root
    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub async fn read_file(&self, path: &str, encoding: Encoding) -> Result<FileContents, ToolError> {
        let target = self.resolve(path);
        let context = || format!("Failed to read file {}", path);

        let bytes = fs::read(&target).await.map_err(|e| ToolError::io(context(), e))?;
        let metadata = fs::metadata(&target).await.map_err(|e| ToolError::io(context(), e))?;

        Ok(FileContents {
            size: metadata.len(),
            modified: timestamp(metadata.modified()),
            content: encoding.decode(&bytes),
        })
    }

    pub async fn write_file(&self, path: &str, content: &str, create_dirs: bool) -> Result<(), ToolError> {
        let target = self.resolve(path);
        let context = || format!("Failed to write file {}", path);

        if create_dirs {
            if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| ToolError::io(context(), e))?;
            }
        }

        fs::write(&target, content)
            .await
            .map_err(|e| ToolError::io(context(), e))
    }

    /// List a directory sorted by name, optionally one level deeper
    pub async fn list_directory(
        &self,
        path: &str,
        show_hidden: bool,
        recursive: bool,
    ) -> Result<Vec<Entry>, ToolError> {
        let dir = self.resolve(path);
        let context = || format!("Failed to read directory {}", path);

        let mut listing = Vec::new();
        for (name, kind) in read_sorted(&dir, show_hidden)
            .await
            .map_err(|e| ToolError::io(context(), e))?
        {
            let nested = recursive && kind == EntryKind::Directory;
            listing.push(Entry {
                name: name.clone(),
                kind,
                depth: 0,
            });

            if nested {
                let children = read_sorted(&dir.join(&name), show_hidden)
                    .await
                    .map_err(|e| ToolError::io(context(), e))?;
                listing.extend(children.into_iter().map(|(child, kind)| Entry {
                    name: format!("{}/{}", name, child),
                    kind,
                    depth: 1,
                }));
            }
        }

        Ok(listing)
    }

    pub async fn create_directory(&self, path: &str, recursive: bool) -> Result<(), ToolError> {
        let target = self.resolve(path);
        let result = if recursive {
            fs::create_dir_all(&target).await
        } else {
            fs::create_dir(&target).await
        };
        result.map_err(|e| ToolError::io(format!("Failed to create directory {}", path), e))
    }

    /// Delete a file, a symlink or a directory
    ///
    /// Non-empty directories need `recursive`. Symlinks are removed, never
    /// followed.
    pub async fn delete_path(&self, path: &str, recursive: bool) -> Result<(), ToolError> {
        let target = self.resolve(path);
        let context = || format!("Failed to delete {}", path);

        let metadata = fs::symlink_metadata(&target)
            .await
            .map_err(|e| ToolError::io(context(), e))?;

        let result = if metadata.is_dir() {
            if recursive {
                fs::remove_dir_all(&target).await
            } else {
                fs::remove_dir(&target).await
            }
        } else {
            fs::remove_file(&target).await
        };
        result.map_err(|e| ToolError::io(context(), e))
    }

    pub async fn file_info(&self, path: &str) -> Result<FileInfo, ToolError> {
        let target = self.resolve(path);
        let metadata = fs::metadata(&target)
            .await
            .map_err(|e| ToolError::io(format!("Failed to get file info for {}", path), e))?;

        let canonical = fs::canonicalize(&target).await;
        let absolute_path = canonical.unwrap_or(target);

        Ok(FileInfo {
            kind: EntryKind::from_metadata(&metadata),
            created: timestamp(metadata.created()),
            modified: timestamp(metadata.modified()),
            permissions: permissions(&metadata),
            absolute_path,
        })
    }
}

/// Entries of one directory, sorted by name
async fn read_sorted(dir: &Path, show_hidden: bool) -> std::io::Result<Vec<(String, EntryKind)>> {
    let mut reader = fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !show_hidden && name.starts_with('.') {
            continue;
        }
        // Follows symlinks; a dangling link is listed as "other"
        let kind = match fs::metadata(entry.path()).await {
            Ok(metadata) => EntryKind::from_metadata(&metadata),
            Err(_) => EntryKind::Other,
        };
        entries.push((name, kind));
    }

    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

/// Render an optional timestamp, or "unavailable"
pub fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "unavailable".to_string())
}

fn timestamp(time: std::io::Result<SystemTime>) -> Option<DateTime<Utc>> {
    time.ok().map(DateTime::<Utc>::from)
}

#[cfg(unix)]
fn permissions(metadata: &Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;
    format!("{:o}", metadata.permissions().mode())
}

#[cfg(not(unix))]
fn permissions(metadata: &Metadata) -> String {
    if metadata.permissions().readonly() {
        "read-only".to_string()
    } else {
        "read-write".to_string()
    }
}
