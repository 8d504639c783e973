//! Core data model: messages, tools, generation settings, final answers.

pub mod answer;
pub mod generation;
pub mod message;
pub mod tool;

pub use answer::{Artifact, StructuredAnswer};
pub use generation::GenerationSettings;
pub use message::{ContentPart, ModelMessage, Role};
pub use tool::{ToolCall, ToolDefinition, ToolResult};
