use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("no API key configured for the language model (set llm.api_key or OPENAI_API_KEY)")]
    MissingApiKey,
    #[error("language model request failed: {0}")]
    Request(String),
    #[error("language model returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("language model response invalid: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        AgentError::Request(err.to_string())
    }
}
