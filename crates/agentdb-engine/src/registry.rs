use std::collections::HashMap;
use std::sync::Arc;

use agentdb_core::{Tool, ToolDefinition};
use agentdb_store::AgentStores;

use crate::interceptor::LoggedTool;

/// Tools that read or write the call log themselves and are never wrapped.
pub const UNLOGGED_TOOLS: [&str; 3] = ["log_tool_call", "list_tool_calls", "get_tool_stats"];

pub fn is_unlogged(name: &str) -> bool {
    UNLOGGED_TOOLS.contains(&name)
}

struct ToolEntry {
    tool: Arc<dyn Tool>,
    logged: bool,
}

/// Registry of available tools. Registration wraps every tool in a
/// [`LoggedTool`] unless its name is in [`UNLOGGED_TOOLS`].
pub struct ToolRegistry {
    tools: HashMap<String, ToolEntry>,
    stores: Arc<AgentStores>,
}

impl ToolRegistry {
    pub fn new(stores: Arc<AgentStores>) -> Self {
        Self {
            tools: HashMap::new(),
            stores,
        }
    }

    pub fn stores(&self) -> &Arc<AgentStores> {
        &self.stores
    }

    /// Register a tool, replacing any tool of the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        let entry = if is_unlogged(&name) {
            ToolEntry {
                tool,
                logged: false,
            }
        } else {
            ToolEntry {
                tool: Arc::new(LoggedTool::new(tool, Arc::clone(&self.stores))),
                logged: true,
            }
        };
        self.tools.insert(name, entry);
    }

    /// Get a tool by name, already wrapped if it is logged.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(|e| Arc::clone(&e.tool))
    }

    /// Whether invocations of `name` are auto-logged.
    pub fn is_logged(&self, name: &str) -> Option<bool> {
        self.tools.get(name).map(|e| e.logged)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// List all tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Tool definitions, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|e| e.tool.to_definition())
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn count(&self) -> usize {
        self.tools.len()
    }
}
