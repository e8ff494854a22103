pub mod context;
pub mod interceptor;
pub mod registry;
pub mod tools;

pub use context::{awaken, ContextBundle};
pub use interceptor::LoggedTool;
pub use registry::{ToolRegistry, UNLOGGED_TOOLS};
pub use tools::create_default_registry;
