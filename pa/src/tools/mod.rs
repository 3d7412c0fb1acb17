//! Tool system for pipeline generation
//!
//! Tools are declared in the config file and offered to the model in the
//! generation prompt. The set of tools is closed: every configured name must
//! map to a `ToolKind`, and every `ToolKind` has exactly one handler.

mod kind;
mod registry;
mod traits;

pub mod builtin;

pub use kind::ToolKind;
pub use registry::ToolRegistry;
pub use traits::{Tool, ToolResult};
