pub mod backend;
pub mod logger;
pub mod settings;
pub mod tool_executor;
pub mod transport;
