//! Awakening: assemble an agent's layered context and snapshot what was loaded.

pub mod layers;
pub mod tokens;

use agentdb_core::text::estimate_json_tokens;
use agentdb_core::AgentId;
use agentdb_store::awakenings::NewAwakening;
use agentdb_store::buffers::BufferRef;
use agentdb_store::skills::SkillCatalog;
use agentdb_store::tool_calls::ToolCallRef;
use agentdb_store::{AgentStore, StoreError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use self::layers::{MemoryItem, PromptLayer, TodoItem};
use self::tokens::{estimate_collection, estimate_optional, LayerTokens};

/// Everything an agent sees on waking up.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContextBundle {
    pub agent_id: AgentId,
    /// Snapshot row id; `None` if recording the snapshot failed.
    pub awakening_id: Option<i64>,
    pub system_prompt: Option<PromptLayer>,
    pub todos: Vec<TodoItem>,
    pub skills_catalog: SkillCatalog,
    pub memories: Vec<MemoryItem>,
    pub buffer_refs: Vec<BufferRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_history: Option<Vec<ToolCallRef>>,
    pub total_tokens: u32,
}

impl ContextBundle {
    /// Tool history layer; empty when it was not requested.
    pub fn tool_layer(&self) -> &[ToolCallRef] {
        self.tool_history.as_deref().unwrap_or_default()
    }

    fn layer_tokens(&self) -> LayerTokens {
        LayerTokens {
            system_prompt: estimate_optional(self.system_prompt.as_ref()),
            todos: estimate_collection(&self.todos, self.todos.is_empty()),
            skills: estimate_collection(&self.skills_catalog, self.skills_catalog.is_empty()),
            memories: estimate_collection(&self.memories, self.memories.is_empty()),
            buffer_refs: estimate_collection(&self.buffer_refs, self.buffer_refs.is_empty()),
            tool_history: match &self.tool_history {
                Some(history) if !history.is_empty() => estimate_json_tokens(history),
                _ => 0,
            },
        }
    }

    fn snapshot(&self) -> NewAwakening {
        NewAwakening {
            system_prompt_version: self.system_prompt.as_ref().map(|p| p.version),
            todos: self.todos.iter().map(|t| t.id).collect(),
            skills: self
                .skills_catalog
                .values()
                .flatten()
                .map(|s| s.id)
                .collect(),
            memories: self.memories.iter().map(|m| m.id).collect(),
            buffers: self.buffer_refs.iter().map(|b| b.id).collect(),
            tool_calls: self
                .tool_history
                .as_ref()
                .map(|calls| calls.iter().map(|c| c.id).collect()),
            total_tokens: self.total_tokens,
        }
    }
}

/// Assemble the six layers for `store`'s agent and record a snapshot.
///
/// Layer reads fail the call. A failed snapshot write is logged and the
/// bundle is returned with `awakening_id: None`.
#[instrument(skip(store), fields(agent_id = %store.agent_id()))]
pub fn awaken(store: &AgentStore, include_tool_history: bool) -> Result<ContextBundle, StoreError> {
    let mut bundle = ContextBundle {
        agent_id: store.agent_id().clone(),
        awakening_id: None,
        system_prompt: layers::system_prompt_layer(store)?,
        todos: layers::todo_layer(store)?,
        skills_catalog: layers::skill_catalog_layer(store)?,
        memories: layers::memory_layer(store)?,
        buffer_refs: layers::buffer_ref_layer(store)?,
        tool_history: layers::tool_history_layer(store, include_tool_history)?,
        total_tokens: 0,
    };

    let tokens = bundle.layer_tokens();
    for (layer, estimate, budget) in tokens.over_budget() {
        debug!(layer, estimate, budget, "awakening layer over token budget");
    }
    bundle.total_tokens = tokens.total();

    match store.awakenings().record(&bundle.snapshot()) {
        Ok(id) => bundle.awakening_id = Some(id),
        Err(e) => warn!(error = %e, "failed to record awakening snapshot"),
    }

    info!(
        awakening_id = ?bundle.awakening_id,
        total_tokens = bundle.total_tokens,
        todos = bundle.todos.len(),
        memories = bundle.memories.len(),
        "agent awakened"
    );
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentdb_store::memories::{Importance, MemoryType};
    use agentdb_store::todos::Priority;

    fn store() -> AgentStore {
        AgentStore::in_memory(AgentId::parse("sleeper").unwrap()).unwrap()
    }

    #[test]
    fn empty_agent_wakes_with_empty_layers() {
        let store = store();
        let bundle = awaken(&store, false).unwrap();
        assert_eq!(bundle.agent_id.as_str(), "sleeper");
        assert!(bundle.system_prompt.is_none());
        assert!(bundle.todos.is_empty());
        assert!(bundle.tool_layer().is_empty());
        assert_eq!(bundle.total_tokens, 0);
        assert!(bundle.awakening_id.is_some());
    }

    #[test]
    fn snapshot_records_loaded_ids() {
        let store = store();
        store.prompts().update("be helpful").unwrap();
        let todo = store.todos().add("ship", Priority::default()).unwrap();
        let mem = store
            .memories()
            .add("k", "v", Importance::default(), MemoryType::Fact)
            .unwrap();

        let bundle = awaken(&store, false).unwrap();
        let row = store.awakenings().get(bundle.awakening_id.unwrap()).unwrap();
        assert_eq!(row.loaded_system_prompt_version, Some(1));
        assert_eq!(row.loaded_todos, vec![todo.id]);
        assert_eq!(row.loaded_memories, vec![mem.id]);
        assert_eq!(row.loaded_tool_calls, None);
        assert_eq!(row.total_tokens, i64::from(bundle.total_tokens));
    }

    #[test]
    fn tool_history_key_only_serialized_when_requested() {
        let store = store();
        let without = serde_json::to_value(awaken(&store, false).unwrap()).unwrap();
        assert!(without.get("tool_history").is_none());
        let with = serde_json::to_value(awaken(&store, true).unwrap()).unwrap();
        assert_eq!(with["tool_history"], serde_json::json!([]));
    }

    #[test]
    fn tokens_grow_with_content() {
        let store = store();
        let before = awaken(&store, false).unwrap().total_tokens;
        store
            .memories()
            .add("long", &"x".repeat(4000), Importance::default(), MemoryType::Fact)
            .unwrap();
        let after = awaken(&store, false).unwrap().total_tokens;
        assert!(after >= before + 1000);
    }
}
