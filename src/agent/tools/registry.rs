//! `ToolRegistry`: look up a tool by name, list all. Populated at startup
//! under a lock, thereafter read-mostly.

use crate::agent::tools::base::Tool;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if name.is_empty() {
            warn!("tool registry: rejecting tool with empty name");
            return;
        }
        if self.tools.contains_key(&name) {
            warn!("tool registry: overwriting duplicate tool '{}'", name);
        }
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn list_tools(&self) -> Vec<Arc<dyn Tool>> {
        let mut tools: Vec<_> = self.tools.values().cloned().collect();
        tools.sort_by(|a, b| a.name().cmp(b.name()));
        tools
    }

    pub fn get_tool_definitions(&self) -> Vec<crate::providers::base::ToolDefinition> {
        self.list_tools()
            .iter()
            .map(|t| t.to_tool_definition())
            .collect()
    }

    /// Builds a fresh registry containing only the tools named in `allowed`
    /// (by exact name match), used to build the restricted view a subagent
    /// or investigation session sees.
    pub fn filtered(&self, allowed: &[String]) -> ToolRegistry {
        let mut filtered = ToolRegistry::new();
        for name in allowed {
            if let Some(tool) = self.get(name) {
                filtered.register(tool);
            } else {
                warn!("tool registry: allowed-tools entry '{}' not found", name);
            }
        }
        filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::tools::base::{ExecutionContext, ToolResult};
    use async_trait::async_trait;
    use serde_json::{Value, json};

    struct StubTool(&'static str);

    #[async_trait]
    impl Tool for StubTool {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "stub"
        }
        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, _input: Value, _ctx: &ExecutionContext) -> anyhow::Result<ToolResult> {
            Ok(ToolResult::ok("stub"))
        }
    }

    #[test]
    fn unknown_tool_lookup_returns_none() {
        let registry = ToolRegistry::new();
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn names_are_sorted() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(StubTool("zeta")));
        registry.register(Arc::new(StubTool("alpha")));
        assert_eq!(registry.tool_names(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn filtered_keeps_only_allowed_names() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(StubTool("read_file")));
        registry.register(Arc::new(StubTool("bash")));
        let filtered = registry.filtered(&["read_file".to_string()]);
        assert_eq!(filtered.tool_names(), vec!["read_file"]);
    }
}
