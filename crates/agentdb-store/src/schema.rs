//! Bootstrap DDL for an agent database.
//! WAL mode + foreign keys are applied per pooled connection, not here.
pub const SCHEMA_VERSION: u32 = 1;

pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS system_prompts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    content TEXT NOT NULL,
    version INTEGER NOT NULL CHECK (version >= 1),
    is_active INTEGER NOT NULL DEFAULT 1 CHECK (is_active IN (0, 1)),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS todos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    content TEXT NOT NULL,
    priority INTEGER NOT NULL DEFAULT 5 CHECK (priority BETWEEN 1 AND 10),
    status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'in_progress', 'done')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS memories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    importance REAL NOT NULL DEFAULT 0.5 CHECK (importance BETWEEN 0.0 AND 1.0),
    mem_type TEXT NOT NULL DEFAULT 'fact' CHECK (mem_type IN ('fact', 'experience', 'insight')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS skills (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    category TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    full_doc TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS buffers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    summary TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tool_calls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tool_name TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'success' CHECK (status IN ('success', 'error')),
    input_summary TEXT,
    output_summary TEXT,
    duration_ms INTEGER,
    source TEXT NOT NULL DEFAULT 'auto' CHECK (source IN ('auto', 'manual')),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS awakenings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    loaded_system_prompt_version INTEGER,
    loaded_todos TEXT NOT NULL,
    loaded_skills TEXT NOT NULL,
    loaded_memories TEXT NOT NULL,
    loaded_buffers TEXT NOT NULL,
    loaded_tool_calls TEXT,
    total_tokens INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_system_prompts_active ON system_prompts(is_active, version);
CREATE INDEX IF NOT EXISTS idx_todos_status_priority ON todos(status, priority DESC, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_memories_importance ON memories(importance DESC, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_skills_category ON skills(category, name);
CREATE INDEX IF NOT EXISTS idx_buffers_created ON buffers(created_at DESC);
CREATE INDEX IF NOT EXISTS idx_tool_calls_created ON tool_calls(created_at DESC);
CREATE INDEX IF NOT EXISTS idx_tool_calls_name ON tool_calls(tool_name, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_awakenings_created ON awakenings(created_at DESC);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);
"#;

/// Applied on every pooled connection. `busy_timeout` goes first so the
/// switch to WAL waits out a concurrent opener instead of failing.
pub fn connection_pragmas(busy_timeout_ms: u32) -> String {
    format!(
        "PRAGMA busy_timeout = {busy_timeout_ms};\
         PRAGMA journal_mode = WAL;\
         PRAGMA foreign_keys = ON;\
         PRAGMA synchronous = NORMAL;"
    )
}
