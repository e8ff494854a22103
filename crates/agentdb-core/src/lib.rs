pub mod ids;
pub mod settings;
pub mod text;
pub mod tools;

pub use ids::{AgentId, InvalidAgentId};
pub use tools::{Tool, ToolContext, ToolDefinition, ToolError};
