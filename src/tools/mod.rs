//! Vendor tools: the closed set of operations the model can call.

pub mod builtin;
pub mod executor;
pub mod registry;
pub mod tool;

pub use executor::ToolExecutor;
pub use registry::ToolRegistry;
pub use tool::*;
