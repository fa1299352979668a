mod conversation;
mod error;
mod llm;
mod tools;

pub use conversation::{Agent, AgentEvent, Conversation, TranscriptEntry};
pub use error::AgentError;
pub use llm::OpenAiChat;
#[cfg(test)]
pub use llm::{AssistantMessage, ChatMessage, ChatModel, ToolSpec};
