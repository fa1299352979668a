use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use crate::agent::{Agent, Conversation};
use crate::config::Config;
use crate::fetch::SceneFetcher;

pub type Session = Arc<Mutex<Conversation>>;

struct SessionEntry {
    conversation: Session,
    last_used: Instant,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub fetcher: Arc<SceneFetcher>,
    /// `None` when no LLM key is configured; the chat endpoints then answer 503.
    pub agent: Option<Arc<Agent>>,
    sessions: Arc<Mutex<HashMap<Uuid, SessionEntry>>>,
    session_ttl: Duration,
}

impl AppState {
    pub fn new(config: Config, fetcher: Arc<SceneFetcher>, agent: Option<Arc<Agent>>) -> Self {
        let session_ttl = config.web.session_ttl;
        Self {
            config: Arc::new(config),
            fetcher,
            agent,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            session_ttl,
        }
    }

    /// Returns the session for `id`, creating an empty one if it is unknown.
    /// Sessions idle for longer than `web.session_ttl` are dropped first.
    pub async fn session(&self, id: Uuid) -> Session {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;

        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_used) <= self.session_ttl);
        if sessions.len() < before {
            log::info!("Dropped {} idle chat session(s)", before - sessions.len());
        }

        let entry = sessions.entry(id).or_insert_with(|| {
            log::info!("New chat session {}", id);
            SessionEntry {
                conversation: Arc::new(Mutex::new(Conversation::new())),
                last_used: now,
            }
        });
        entry.last_used = now;
        entry.conversation.clone()
    }

    pub async fn end_session(&self, id: &Uuid) -> bool {
        self.sessions.lock().await.remove(id).is_some()
    }

    #[cfg(test)]
    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
