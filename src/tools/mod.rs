//! Tool system.
//!
//! Tools are the operations a decision-maker can ask for. The pipeline is
//! the only caller of [`Tool::execute`].

pub mod builtin;

mod registry;
mod tool;

pub use registry::ToolRegistry;
pub use tool::{Tool, ToolError, ToolOutput, ToolSchema, optional_str, require_f64, require_str};
