pub mod builtin;
pub mod invoker;
pub mod registry;
pub mod tool;

pub use invoker::{Invocation, ToolInvoker};
pub use registry::ToolRegistry;
pub use tool::{Tool, ToolResult};
