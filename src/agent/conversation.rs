use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use utoipa::ToSchema;

use super::error::AgentError;
use super::llm::{AssistantMessage, ChatMessage, ChatModel, Role, ToolSpec};
use super::tools;
use crate::catalog::Satellite;
use crate::fetch::SceneFetcher;

const FALLBACK_REPLY: &str =
    "I could not finish this request within the allowed number of steps. Please try rephrasing it or narrowing it down.";

fn system_prompt(today: NaiveDate) -> String {
    format!(
        "You help users download Sentinel satellite imagery. Today is {today}.\n\
         \n\
         Workflow:\n\
         1. If the user names a place instead of coordinates, call geocode_location first and use the returned latitude and longitude.\n\
         2. Choose the sensor from the user's words. Radar, SAR, night, clouds or flooding mean download_sentinel1. \
         Optical, true colour, RGB, photo or vegetation mean download_sentinel2.\n\
         3. If the place, the date or the kind of imagery is unclear, ask one short question instead of guessing.\n\
         4. Unless the user says otherwise, search 10 days around the date and, for optical imagery, accept up to 20 % cloud cover.\n\
         5. When a tool returns an error, explain it plainly and suggest a wider date range or a higher cloud ceiling when relevant.\n\
         \n\
         Report the scene id, acquisition time and saved files. Always answer in the language the user wrote in."
    )
}

/// Progress shown to the user while a turn runs.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    Geocoding {
        query: String,
    },
    Downloading {
        satellite: Satellite,
        lat: f64,
        lon: f64,
        #[schema(value_type = String, format = Date)]
        date: NaiveDate,
        day_window: u32,
    },
    ToolResult {
        tool: String,
        #[schema(value_type = Object)]
        content: Value,
    },
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AgentTurn {
    pub reply: String,
    pub events: Vec<AgentEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TranscriptEntry {
    pub role: String,
    pub text: String,
}

/// One chat session's message history, starting with the system prompt.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt(Utc::now().date_naive()))],
        }
    }

    #[cfg(test)]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// User messages and assistant text replies, in order. Tool traffic is left out.
    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.messages
            .iter()
            .filter_map(|m| {
                let role = match m.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::System | Role::Tool => return None,
                };
                let text = m.content.as_deref().filter(|t| !t.trim().is_empty())?;
                Some(TranscriptEntry {
                    role: role.to_string(),
                    text: text.to_string(),
                })
            })
            .collect()
    }
}

pub struct Agent {
    model: Arc<dyn ChatModel>,
    fetcher: Arc<SceneFetcher>,
    tools: Vec<ToolSpec>,
    max_iterations: usize,
}

impl Agent {
    pub fn new(model: Arc<dyn ChatModel>, fetcher: Arc<SceneFetcher>, max_iterations: usize) -> Self {
        Self {
            model,
            fetcher,
            tools: tools::tool_specs(),
            max_iterations: max_iterations.max(1),
        }
    }

    /// Runs one user turn: model calls alternate with tool execution until
    /// the model answers in text or the iteration cap is hit.
    ///
    /// If the model backend fails, the conversation is restored to its state
    /// before `message` so the user can simply retry.
    pub async fn respond(
        &self,
        conversation: &mut Conversation,
        message: &str,
    ) -> Result<AgentTurn, AgentError> {
        let checkpoint = conversation.messages.len();
        conversation.messages.push(ChatMessage::user(message));
        let mut events = Vec::new();

        for iteration in 0..self.max_iterations {
            let reply = match self.model.complete(&conversation.messages, &self.tools).await {
                Ok(reply) => reply,
                Err(e) => {
                    log::error!("Chat model failed: {}", e);
                    conversation.messages.truncate(checkpoint);
                    return Err(e);
                }
            };

            if reply.tool_calls.is_empty() {
                let text = reply.content.clone().unwrap_or_default();
                conversation.messages.push(reply.into());
                return Ok(AgentTurn {
                    reply: text,
                    events,
                });
            }

            log::debug!(
                "Iteration {}: {} tool call(s)",
                iteration + 1,
                reply.tool_calls.len()
            );
            let calls = reply.tool_calls.clone();
            conversation.messages.push(reply.into());
            for call in &calls {
                let result = tools::execute(&self.fetcher, call, &mut events).await;
                conversation
                    .messages
                    .push(ChatMessage::tool_result(&call.id, result.to_string()));
            }
        }

        log::warn!("Stopped after {} iterations without a reply", self.max_iterations);
        conversation
            .messages
            .push(ChatMessage::from(AssistantMessage {
                content: Some(FALLBACK_REPLY.to_string()),
                tool_calls: Vec::new(),
            }));
        Ok(AgentTurn {
            reply: FALLBACK_REPLY.to_string(),
            events,
        })
    }
}
