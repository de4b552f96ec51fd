pub mod args;
pub mod fields;
pub mod suggest;
pub mod text;
pub mod tool_errors;
