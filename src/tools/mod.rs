//! Tool plumbing between the model and the tool host.

pub mod arguments;
pub mod catalog;
pub mod invoker;

pub use arguments::{parse_tool_arguments, try_parse_arguments};
pub use catalog::to_model_schema;
pub use invoker::ToolInvoker;
