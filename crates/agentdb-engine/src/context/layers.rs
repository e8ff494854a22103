//! The six awakening layers. Each is a pure read over one agent store.

use agentdb_store::buffers::BufferRef;
use agentdb_store::memories::{Importance, MemoryRow, MemoryType};
use agentdb_store::skills::SkillCatalog;
use agentdb_store::todos::{Priority, TodoRow, TodoStatus};
use agentdb_store::tool_calls::ToolCallRef;
use agentdb_store::{AgentStore, StoreError};
use serde::{Deserialize, Serialize};

pub const TODO_LIMIT: u32 = 5;
pub const MEMORY_LIMIT: u32 = 10;
pub const TOOL_HISTORY_LIMIT: u32 = 20;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptLayer {
    pub id: i64,
    pub content: String,
    pub version: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: i64,
    pub content: String,
    pub priority: Priority,
    pub status: TodoStatus,
}

impl From<TodoRow> for TodoItem {
    fn from(row: TodoRow) -> Self {
        Self {
            id: row.id,
            content: row.content,
            priority: row.priority,
            status: row.status,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub importance: Importance,
    pub mem_type: MemoryType,
}

impl From<MemoryRow> for MemoryItem {
    fn from(row: MemoryRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            importance: row.importance,
            mem_type: row.mem_type,
        }
    }
}

/// Layer 1: the active system prompt, if any.
pub fn system_prompt_layer(store: &AgentStore) -> Result<Option<PromptLayer>, StoreError> {
    Ok(store.prompts().active()?.map(|row| PromptLayer {
        id: row.id,
        content: row.content,
        version: row.version,
    }))
}

/// Layer 2: most urgent pending todos.
pub fn todo_layer(store: &AgentStore) -> Result<Vec<TodoItem>, StoreError> {
    Ok(store
        .todos()
        .top_pending(TODO_LIMIT)?
        .into_iter()
        .map(TodoItem::from)
        .collect())
}

/// Layer 3: skill metadata grouped by category.
pub fn skill_catalog_layer(store: &AgentStore) -> Result<SkillCatalog, StoreError> {
    store.skills().catalog()
}

/// Layer 4: most important memories.
pub fn memory_layer(store: &AgentStore) -> Result<Vec<MemoryItem>, StoreError> {
    Ok(store
        .memories()
        .top(MEMORY_LIMIT)?
        .into_iter()
        .map(MemoryItem::from)
        .collect())
}

/// Layer 5: buffer ids and titles.
pub fn buffer_ref_layer(store: &AgentStore) -> Result<Vec<BufferRef>, StoreError> {
    store.buffers().refs()
}

/// Layer 6: recent tool calls, only when requested.
pub fn tool_history_layer(
    store: &AgentStore,
    include: bool,
) -> Result<Option<Vec<ToolCallRef>>, StoreError> {
    if !include {
        return Ok(None);
    }
    Ok(Some(store.tool_calls().recent_refs(TOOL_HISTORY_LIMIT)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentdb_core::AgentId;
    use agentdb_store::skills::NewSkill;
    use agentdb_store::tool_calls::{CallSource, CallStatus, NewToolCall};

    fn store() -> AgentStore {
        AgentStore::in_memory(AgentId::parse("layers").unwrap()).unwrap()
    }

    #[test]
    fn empty_store_yields_empty_layers() {
        let store = store();
        assert_eq!(system_prompt_layer(&store).unwrap(), None);
        assert!(todo_layer(&store).unwrap().is_empty());
        assert!(skill_catalog_layer(&store).unwrap().is_empty());
        assert!(memory_layer(&store).unwrap().is_empty());
        assert!(buffer_ref_layer(&store).unwrap().is_empty());
        assert_eq!(tool_history_layer(&store, true).unwrap(), Some(vec![]));
    }

    #[test]
    fn todo_layer_caps_at_five_pending() {
        let store = store();
        for i in 1..=7 {
            store.todos().add(&format!("t{i}"), Priority::new(i).unwrap()).unwrap();
        }
        let layer = todo_layer(&store).unwrap();
        let priorities: Vec<u8> = layer.iter().map(|t| t.priority.get()).collect();
        assert_eq!(priorities, vec![7, 6, 5, 4, 3]);
    }

    #[test]
    fn todo_item_has_four_fields() {
        let store = store();
        store.todos().add("t", Priority::default()).unwrap();
        let json = serde_json::to_value(&todo_layer(&store).unwrap()[0]).unwrap();
        let mut keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        keys.sort();
        assert_eq!(keys, ["content", "id", "priority", "status"]);
    }

    #[test]
    fn skill_layer_excludes_full_doc() {
        let store = store();
        store
            .skills()
            .add(NewSkill {
                category: "coding",
                name: "rust",
                description: "systems",
                full_doc: Some("SECRET MANUAL"),
            })
            .unwrap();
        let json = serde_json::to_string(&skill_catalog_layer(&store).unwrap()).unwrap();
        assert!(!json.contains("full_doc"));
        assert!(!json.contains("SECRET MANUAL"));
    }

    #[test]
    fn tool_history_absent_unless_requested() {
        let store = store();
        store
            .tool_calls()
            .append(&NewToolCall {
                tool_name: "awaken".into(),
                status: CallStatus::Success,
                input_summary: None,
                output_summary: None,
                duration_ms: Some(1),
                source: CallSource::Auto,
            })
            .unwrap();
        assert_eq!(tool_history_layer(&store, false).unwrap(), None);
        assert_eq!(tool_history_layer(&store, true).unwrap().unwrap().len(), 1);
    }
}
