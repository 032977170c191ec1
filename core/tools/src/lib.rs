//! coderelay-tools - The tool-protocol operation surface.

pub mod builtin;
mod context;
mod error;
mod registry;
mod resources;
mod tool;

pub use context::TodoItem;
pub use context::ToolContext;
pub use error::ToolError;
pub use registry::ToolRegistry;
pub use resources::RESOURCE_NAMES;
pub use resources::read_resource;
pub use tool::Tool;
pub use tool::ToolDescriptor;
pub use tool::ToolFailure;
pub use tool::ToolReply;
pub use tool::ToolResult;
