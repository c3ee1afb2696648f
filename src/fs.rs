//! `FileManager`: the external collaborator providing sandboxed,
//! path-rooted read/write/list. This module's `SandboxedFileManager` is the
//! default concrete implementation the binary wires up.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct DirEntryInfo {
    pub path: String,
    pub is_dir: bool,
}

#[async_trait]
pub trait FileManager: Send + Sync {
    async fn read(&self, path: &str) -> std::io::Result<String>;
    async fn write(&self, path: &str, content: &str) -> std::io::Result<()>;
    async fn list(&self, path: &str, recursive: bool) -> std::io::Result<Vec<DirEntryInfo>>;
    async fn exists(&self, path: &str) -> bool;
    fn resolve(&self, path: &str) -> PathBuf;
}

/// Resolves a possibly-relative path against `root`, rejecting escapes via
/// `..` traversal. Paths outside `root` after lexical resolution are
/// rejected rather than silently clamped.
pub struct SandboxedFileManager {
    root: PathBuf,
}

impl SandboxedFileManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve_checked(&self, path: &str) -> std::io::Result<PathBuf> {
        let candidate = Path::new(path);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        };
        let normalized = lexical_normalize(&joined);
        if !normalized.starts_with(lexical_normalize(&self.root)) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("path '{path}' escapes the working directory"),
            ));
        }
        Ok(normalized)
    }
}

/// Manual `.`/`..` component resolution, performed lexically (no
/// filesystem access) so it also works for paths that don't exist yet —
/// required for `edit_file`'s create-on-empty-`old_str` path.
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                out.pop();
            }
            std::path::Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[async_trait]
impl FileManager for SandboxedFileManager {
    async fn read(&self, path: &str) -> std::io::Result<String> {
        let resolved = self.resolve_checked(path)?;
        tokio::fs::read_to_string(resolved).await
    }

    async fn write(&self, path: &str, content: &str) -> std::io::Result<()> {
        let resolved = self.resolve_checked(path)?;
        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(resolved, content).await
    }

    async fn list(&self, path: &str, recursive: bool) -> std::io::Result<Vec<DirEntryInfo>> {
        let resolved = self.resolve_checked(path)?;
        let mut out = Vec::new();
        if recursive {
            for entry in walkdir::WalkDir::new(&resolved)
                .min_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                out.push(DirEntryInfo {
                    path: entry.path().display().to_string(),
                    is_dir: entry.file_type().is_dir(),
                });
            }
        } else {
            let mut rd = tokio::fs::read_dir(&resolved).await?;
            while let Some(entry) = rd.next_entry().await? {
                let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
                out.push(DirEntryInfo {
                    path: entry.path().display().to_string(),
                    is_dir,
                });
            }
        }
        out.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
    }

    async fn exists(&self, path: &str) -> bool {
        self.resolve_checked(path)
            .map(|p| p.exists())
            .unwrap_or(false)
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.resolve_checked(path).unwrap_or_else(|_| self.root.join(path))
    }
}
