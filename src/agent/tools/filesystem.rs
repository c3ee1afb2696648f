//! `read_file`, `list_files`, `edit_file` — the canonical file tools.

use crate::agent::tools::base::{ExecutionContext, Tool, ToolResult};
use crate::fs::FileManager;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

pub struct ReadFileTool {
    fs: Arc<dyn FileManager>,
}

impl ReadFileTool {
    pub fn new(fs: Arc<dyn FileManager>) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the full contents of a file at the given path."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"path": {"type": "string"}},
            "required": ["path"],
        })
    }

    async fn execute(&self, input: Value, _ctx: &ExecutionContext) -> anyhow::Result<ToolResult> {
        let path = input["path"].as_str().unwrap_or_default();
        match self.fs.read(path).await {
            Ok(content) => Ok(ToolResult::ok(content)),
            Err(e) => Ok(ToolResult::error(format!("could not read '{path}': {e}"))),
        }
    }
}

pub struct ListFilesTool {
    fs: Arc<dyn FileManager>,
}

impl ListFilesTool {
    pub fn new(fs: Arc<dyn FileManager>) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List directory entries at the given path, optionally recursive."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "recursive": {"type": "boolean"},
            },
            "required": ["path"],
        })
    }

    async fn execute(&self, input: Value, _ctx: &ExecutionContext) -> anyhow::Result<ToolResult> {
        let path = input["path"].as_str().unwrap_or_default();
        let recursive = input["recursive"].as_bool().unwrap_or(false);
        match self.fs.list(path, recursive).await {
            Ok(entries) => {
                let listing = entries
                    .into_iter()
                    .map(|e| if e.is_dir { format!("{}/", e.path) } else { e.path })
                    .collect::<Vec<_>>()
                    .join("\n");
                Ok(ToolResult::ok(listing))
            }
            Err(e) => Ok(ToolResult::error(format!("could not list '{path}': {e}"))),
        }
    }
}

pub struct EditFileTool {
    fs: Arc<dyn FileManager>,
}

impl EditFileTool {
    pub fn new(fs: Arc<dyn FileManager>) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn description(&self) -> &str {
        "Replace an exact, unique occurrence of old_str with new_str in path. \
         If old_str is empty, creates the file (and missing parent \
         directories) with new_str as its content."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "old_str": {"type": "string"},
                "new_str": {"type": "string"},
            },
            "required": ["path", "old_str", "new_str"],
        })
    }

    fn is_mutating(&self) -> bool {
        true
    }

    async fn execute(&self, input: Value, _ctx: &ExecutionContext) -> anyhow::Result<ToolResult> {
        let path = input["path"].as_str().unwrap_or_default();
        let old_str = input["old_str"].as_str().unwrap_or_default();
        let new_str = input["new_str"].as_str().unwrap_or_default();

        Ok(apply_edit(self.fs.as_ref(), path, old_str, new_str).await)
    }
}

/// The exact-once edit semantics, factored out so the planning gate (which
/// needs to write the plan file without going through the full executor
/// pipeline recursively) and the tool share one
/// implementation.
pub async fn apply_edit(
    fs: &dyn FileManager,
    path: &str,
    old_str: &str,
    new_str: &str,
) -> ToolResult {
    if old_str.is_empty() {
        if fs.exists(path).await {
            return ToolResult::error(format!(
                "'{path}' already exists; old_str must be non-empty to edit it"
            ));
        }
        return match fs.write(path, new_str).await {
            Ok(()) => ToolResult::ok(format!("created '{path}'")),
            Err(e) => ToolResult::error(format!("could not create '{path}': {e}")),
        };
    }

    let content = match fs.read(path).await {
        Ok(content) => content,
        Err(e) => return ToolResult::error(format!("could not read '{path}': {e}")),
    };

    let occurrences = content.matches(old_str).count();
    if occurrences == 0 {
        return ToolResult::error(format!("old_str not found in '{path}'"));
    }
    if occurrences > 1 {
        return ToolResult::error(format!(
            "old_str occurs {occurrences} times in '{path}'; multiple matches \
             are ambiguous, provide a larger old_str that is unique"
        ));
    }

    let updated = content.replacen(old_str, new_str, 1);
    match fs.write(path, &updated).await {
        Ok(()) => ToolResult::ok(format!("edited '{path}'")),
        Err(e) => ToolResult::error(format!("could not write '{path}': {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::SandboxedFileManager;
    use tempfile::tempdir;

    fn ctx(dir: &std::path::Path) -> ExecutionContext {
        ExecutionContext::new(dir, "s1")
    }

    #[tokio::test]
    async fn edit_replaces_unique_occurrence() {
        let dir = tempdir().unwrap();
        let fm: Arc<dyn FileManager> = Arc::new(SandboxedFileManager::new(dir.path()));
        fm.write("x.go", "package main\nfunc foo() {}\n").await.unwrap();
        let tool = EditFileTool::new(fm.clone());
        let result = tool
            .execute(
                json!({"path": "x.go", "old_str": "foo", "new_str": "bar"}),
                &ctx(dir.path()),
            )
            .await
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(fm.read("x.go").await.unwrap(), "package main\nfunc bar() {}\n");
    }

    #[tokio::test]
    async fn edit_with_ambiguous_old_str_errors_without_modifying() {
        let dir = tempdir().unwrap();
        let fm: Arc<dyn FileManager> = Arc::new(SandboxedFileManager::new(dir.path()));
        fm.write("x.go", "foo foo").await.unwrap();
        let tool = EditFileTool::new(fm.clone());
        let result = tool
            .execute(
                json!({"path": "x.go", "old_str": "foo", "new_str": "bar"}),
                &ctx(dir.path()),
            )
            .await
            .unwrap();
        assert!(result.is_error);
        assert!(result.content.contains("multiple"));
        assert_eq!(fm.read("x.go").await.unwrap(), "foo foo");
    }

    #[tokio::test]
    async fn edit_with_empty_old_str_creates_file() {
        let dir = tempdir().unwrap();
        let fm: Arc<dyn FileManager> = Arc::new(SandboxedFileManager::new(dir.path()));
        let tool = EditFileTool::new(fm.clone());
        let result = tool
            .execute(
                json!({"path": "new/plan.md", "old_str": "", "new_str": "# plan"}),
                &ctx(dir.path()),
            )
            .await
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(fm.read("new/plan.md").await.unwrap(), "# plan");
    }

    #[tokio::test]
    async fn edit_with_empty_old_str_on_existing_file_errors() {
        let dir = tempdir().unwrap();
        let fm: Arc<dyn FileManager> = Arc::new(SandboxedFileManager::new(dir.path()));
        fm.write("exists.txt", "already here").await.unwrap();
        let tool = EditFileTool::new(fm.clone());
        let result = tool
            .execute(
                json!({"path": "exists.txt", "old_str": "", "new_str": "overwritten"}),
                &ctx(dir.path()),
            )
            .await
            .unwrap();
        assert!(result.is_error);
        assert_eq!(fm.read("exists.txt").await.unwrap(), "already here");
    }

    #[tokio::test]
    async fn list_files_reports_directories_with_trailing_slash() {
        let dir = tempdir().unwrap();
        let fm: Arc<dyn FileManager> = Arc::new(SandboxedFileManager::new(dir.path()));
        fm.write("sub/file.txt", "x").await.unwrap();
        let tool = ListFilesTool::new(fm);
        let result = tool
            .execute(json!({"path": ".", "recursive": false}), &ctx(dir.path()))
            .await
            .unwrap();
        assert!(result.content.contains('/'));
    }
}
