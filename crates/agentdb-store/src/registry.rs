//! Process-wide resolution of agent ids to their databases.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use agentdb_core::AgentId;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::awakenings::AwakeningRepo;
use crate::buffers::BufferRepo;
use crate::database::{ConnectionConfig, Database};
use crate::error::StoreError;
use crate::memories::MemoryRepo;
use crate::prompts::PromptRepo;
use crate::skills::SkillRepo;
use crate::todos::TodoRepo;
use crate::tool_calls::ToolCallRepo;

/// Per-agent counts for the admin listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: AgentId,
    pub pending_todos: i64,
    pub memory_count: i64,
    pub tool_call_count: i64,
    pub last_awakening: Option<String>,
}

/// One agent's datastore. Clones share the same pool.
#[derive(Clone, Debug)]
pub struct AgentStore {
    agent_id: AgentId,
    db: Database,
}

impl AgentStore {
    pub fn new(agent_id: AgentId, db: Database) -> Self {
        Self { agent_id, db }
    }

    /// Fresh in-memory store (for testing).
    pub fn in_memory(agent_id: AgentId) -> Result<Self, StoreError> {
        Ok(Self::new(agent_id, Database::in_memory()?))
    }

    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn prompts(&self) -> PromptRepo {
        PromptRepo::new(self.db.clone())
    }

    pub fn todos(&self) -> TodoRepo {
        TodoRepo::new(self.db.clone())
    }

    pub fn memories(&self) -> MemoryRepo {
        MemoryRepo::new(self.db.clone())
    }

    pub fn skills(&self) -> SkillRepo {
        SkillRepo::new(self.db.clone())
    }

    pub fn buffers(&self) -> BufferRepo {
        BufferRepo::new(self.db.clone())
    }

    pub fn tool_calls(&self) -> ToolCallRepo {
        ToolCallRepo::new(self.db.clone())
    }

    pub fn awakenings(&self) -> AwakeningRepo {
        AwakeningRepo::new(self.db.clone())
    }

    #[instrument(skip(self), fields(agent_id = %self.agent_id))]
    pub fn summary(&self) -> Result<AgentSummary, StoreError> {
        self.db.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT (SELECT COUNT(*) FROM todos WHERE status = 'pending'),
                        (SELECT COUNT(*) FROM memories),
                        (SELECT COUNT(*) FROM tool_calls),
                        (SELECT MAX(created_at) FROM awakenings)",
                [],
                |row| {
                    Ok(AgentSummary {
                        id: self.agent_id.clone(),
                        pending_todos: row.get(0)?,
                        memory_count: row.get(1)?,
                        tool_call_count: row.get(2)?,
                        last_awakening: row.get(3)?,
                    })
                },
            )?)
        })
    }
}

/// An agent's store once opened. The slot's own lock serializes the first
/// open for that agent only.
type StoreSlot = Arc<Mutex<Option<AgentStore>>>;

/// Lazily opened per-agent stores rooted at one directory, one
/// `<agent_id>.db` file each.
///
/// Map shard locks are held only to look up or insert a slot, never while a
/// database file is opened.
#[derive(Debug)]
pub struct AgentStores {
    root: PathBuf,
    config: ConnectionConfig,
    stores: DashMap<AgentId, StoreSlot>,
}

impl AgentStores {
    pub fn new(root: impl Into<PathBuf>, config: ConnectionConfig) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|e| StoreError::Io(format!("create agents dir {}: {e}", root.display())))?;
        info!(root = %root.display(), "agent stores ready");
        Ok(Self {
            root,
            config,
            stores: DashMap::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, agent: &AgentId) -> PathBuf {
        self.root.join(format!("{agent}.db"))
    }

    pub fn exists(&self, agent: &AgentId) -> bool {
        self.path_for(agent).is_file()
    }

    fn slot(&self, agent: &AgentId) -> StoreSlot {
        if let Some(slot) = self.stores.get(agent) {
            return Arc::clone(slot.value());
        }
        Arc::clone(self.stores.entry(agent.clone()).or_default().value())
    }

    /// The agent's store, creating its file and schema on first access.
    ///
    /// A slow first open blocks later callers for the same agent only.
    pub fn get_or_open(&self, agent: &AgentId) -> Result<AgentStore, StoreError> {
        let slot = self.slot(agent);
        let mut opened = slot.lock();
        if let Some(store) = opened.as_ref() {
            return Ok(store.clone());
        }
        let db = Database::open(&self.path_for(agent), &self.config)?;
        debug!(agent_id = %agent, "agent store opened");
        let store = AgentStore::new(agent.clone(), db);
        *opened = Some(store.clone());
        Ok(store)
    }

    /// Like [`get_or_open`](Self::get_or_open) but never creates a file.
    pub fn open_existing(&self, agent: &AgentId) -> Result<AgentStore, StoreError> {
        if !self.exists(agent) {
            return Err(StoreError::NotFound(format!("agent {agent}")));
        }
        self.get_or_open(agent)
    }

    /// Agents with a database file under the root, sorted.
    pub fn list_agents(&self) -> Result<Vec<AgentId>, StoreError> {
        let mut agents = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("db") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Ok(agent) = AgentId::parse(stem) {
                agents.push(agent);
            }
        }
        agents.sort();
        Ok(agents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::todos::Priority;

    fn agent(raw: &str) -> AgentId {
        AgentId::parse(raw).unwrap()
    }

    fn stores(dir: &tempfile::TempDir) -> AgentStores {
        AgentStores::new(dir.path().join("agents"), ConnectionConfig::default()).unwrap()
    }

    #[test]
    fn get_or_open_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let stores = stores(&dir);
        let alice = agent("alice");
        assert!(!stores.exists(&alice));

        stores.get_or_open(&alice).unwrap();
        assert!(stores.exists(&alice));
        assert!(dir.path().join("agents").join("alice.db").is_file());
    }

    #[test]
    fn same_agent_shares_data() {
        let dir = tempfile::tempdir().unwrap();
        let stores = stores(&dir);
        let bob = agent("bob");
        stores.get_or_open(&bob).unwrap().todos().add("x", Priority::default()).unwrap();
        assert_eq!(stores.get_or_open(&bob).unwrap().todos().list(None).unwrap().len(), 1);
    }

    #[test]
    fn agents_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let stores = stores(&dir);
        stores.get_or_open(&agent("a")).unwrap().todos().add("x", Priority::default()).unwrap();
        assert!(stores.get_or_open(&agent("b")).unwrap().todos().list(None).unwrap().is_empty());
    }

    #[test]
    fn open_existing_does_not_create() {
        let dir = tempfile::tempdir().unwrap();
        let stores = stores(&dir);
        let ghost = agent("ghost");
        assert!(matches!(stores.open_existing(&ghost), Err(StoreError::NotFound(_))));
        assert!(!stores.path_for(&ghost).exists());
    }

    #[test]
    fn open_existing_finds_file_from_previous_process() {
        let dir = tempfile::tempdir().unwrap();
        stores(&dir).get_or_open(&agent("carol")).unwrap();
        let fresh = stores(&dir);
        assert!(fresh.open_existing(&agent("carol")).is_ok());
    }

    #[test]
    fn summary_counts_records() {
        let store = AgentStore::in_memory(agent("counted")).unwrap();
        store.todos().add("a", Priority::default()).unwrap();
        let done = store.todos().add("b", Priority::default()).unwrap();
        store.todos().complete(done.id).unwrap();

        let summary = store.summary().unwrap();
        assert_eq!(summary.id, agent("counted"));
        assert_eq!(summary.pending_todos, 1);
        assert_eq!(summary.memory_count, 0);
        assert_eq!(summary.tool_call_count, 0);
        assert_eq!(summary.last_awakening, None);
    }

    #[test]
    fn pending_open_does_not_block_other_agents() {
        let dir = tempfile::tempdir().unwrap();
        let stores = std::sync::Arc::new(stores(&dir));
        let slow = stores.slot(&agent("slow"));
        let held = slow.lock();

        let (tx, rx) = std::sync::mpsc::channel();
        let worker = {
            let stores = std::sync::Arc::clone(&stores);
            std::thread::spawn(move || {
                let opened = stores.get_or_open(&agent("quick")).is_ok();
                let exists = stores.exists(&agent("slow"));
                tx.send((opened, exists)).unwrap();
            })
        };
        let outcome = rx.recv_timeout(std::time::Duration::from_secs(5));
        drop(held);
        worker.join().unwrap();
        assert_eq!(outcome.unwrap(), (true, false));
        assert!(stores.get_or_open(&agent("slow")).is_ok());
    }

    #[test]
    fn concurrent_first_opens_share_one_store() {
        let dir = tempfile::tempdir().unwrap();
        let stores = std::sync::Arc::new(stores(&dir));
        let workers: Vec<_> = (0..8)
            .map(|i| {
                let stores = std::sync::Arc::clone(&stores);
                std::thread::spawn(move || {
                    let store = stores.get_or_open(&agent("crowd")).unwrap();
                    store.todos().add(&format!("t{i}"), Priority::default()).unwrap();
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        let store = stores.get_or_open(&agent("crowd")).unwrap();
        assert_eq!(store.todos().list(None).unwrap().len(), 8);
        assert_eq!(stores.stores.len(), 1);
    }

    #[test]
    fn list_agents_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let stores = stores(&dir);
        for name in ["zed", "alice", "mallory"] {
            stores.get_or_open(&agent(name)).unwrap();
        }
        std::fs::write(stores.root().join("notes.txt"), "x").unwrap();
        std::fs::write(stores.root().join("bad name.db"), "").unwrap();

        let listed: Vec<String> = stores.list_agents().unwrap().into_iter().map(String::from).collect();
        assert_eq!(listed, ["alice", "mallory", "zed"]);
    }
}
