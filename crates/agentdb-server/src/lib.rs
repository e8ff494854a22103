pub mod admin;
pub mod handlers;
pub mod rpc;
pub mod server;

pub use handlers::HandlerState;
pub use server::{start, start_with_state, ServerConfig, ServerHandle};
