pub mod awakenings;
pub mod buffers;
pub mod database;
pub mod error;
pub mod memories;
pub mod prompts;
pub mod registry;
pub mod row_helpers;
pub mod schema;
pub mod skills;
pub mod todos;
pub mod tool_calls;

pub use database::{ConnectionConfig, Database};
pub use error::StoreError;
pub use registry::{AgentStore, AgentStores, AgentSummary};
