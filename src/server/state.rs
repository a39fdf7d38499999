//! Shared server state: the agent, conversation store, and event channels

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, RwLock};

use crate::agent::ResearchAgent;
use crate::config::Config;

use super::types::{ServerEvent, StoredMessageDto};

/// One message retained in a conversation
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub role: String,
    pub content: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub metadata: Option<Value>,
}

impl StoredMessage {
    pub fn to_dto(&self) -> StoredMessageDto {
        StoredMessageDto {
            role: self.role.clone(),
            content: self.content.clone(),
            timestamp: self.timestamp.to_rfc3339(),
            metadata: self.metadata.clone(),
        }
    }
}

pub struct AppState {
    pub config: Config,

    /// The research agent shared by all requests
    pub agent: Arc<ResearchAgent>,

    /// In-memory conversation store, bounded per conversation
    pub conversations: RwLock<HashMap<String, Vec<StoredMessage>>>,

    /// Event broadcast channels per conversation
    pub event_channels: RwLock<HashMap<String, broadcast::Sender<ServerEvent>>>,

    /// Conversations with a pipeline run in flight
    processing: RwLock<HashSet<String>>,
}

impl AppState {
    pub fn new(config: Config, agent: ResearchAgent) -> Self {
        Self {
            config,
            agent: Arc::new(agent),
            conversations: RwLock::new(HashMap::new()),
            event_channels: RwLock::new(HashMap::new()),
            processing: RwLock::new(HashSet::new()),
        }
    }

    /// Get or create the event channel for a conversation
    pub async fn get_event_sender(&self, conversation_id: &str) -> broadcast::Sender<ServerEvent> {
        let mut channels = self.event_channels.write().await;

        if let Some(sender) = channels.get(conversation_id) {
            sender.clone()
        } else {
            let (sender, _) = broadcast::channel(1024);
            channels.insert(conversation_id.to_string(), sender.clone());
            sender
        }
    }

    /// Subscribe to events for a conversation
    pub async fn subscribe_events(
        &self,
        conversation_id: &str,
    ) -> broadcast::Receiver<ServerEvent> {
        self.get_event_sender(conversation_id).await.subscribe()
    }

    /// Try to claim a conversation for processing. Returns false when a
    /// run is already in flight.
    pub async fn try_begin_processing(&self, conversation_id: &str) -> bool {
        let mut processing = self.processing.write().await;
        processing.insert(conversation_id.to_string())
    }

    pub async fn finish_processing(&self, conversation_id: &str) {
        let mut processing = self.processing.write().await;
        processing.remove(conversation_id);
    }

    pub async fn is_processing(&self, conversation_id: &str) -> bool {
        let processing = self.processing.read().await;
        processing.contains(conversation_id)
    }

    /// Append a message to a conversation, dropping the oldest entries
    /// once the history limit is exceeded
    pub async fn append_message(&self, conversation_id: &str, message: StoredMessage) {
        let limit = self.config.agent.history_limit;
        let mut conversations = self.conversations.write().await;
        let history = conversations
            .entry(conversation_id.to_string())
            .or_default();

        history.push(message);
        if history.len() > limit {
            let excess = history.len() - limit;
            history.drain(..excess);
        }
    }

    /// Snapshot the newest `limit` messages and the total count
    pub async fn history(
        &self,
        conversation_id: &str,
        limit: Option<usize>,
    ) -> (Vec<StoredMessage>, usize) {
        let conversations = self.conversations.read().await;
        match conversations.get(conversation_id) {
            Some(history) => {
                let total = history.len();
                let start = limit.map(|l| total.saturating_sub(l)).unwrap_or(0);
                (history[start..].to_vec(), total)
            }
            None => (Vec::new(), 0),
        }
    }

    /// Remove a conversation and its event channel. Returns whether the
    /// conversation existed.
    pub async fn clear_conversation(&self, conversation_id: &str) -> bool {
        let existed = {
            let mut conversations = self.conversations.write().await;
            conversations.remove(conversation_id).is_some()
        };
        let mut channels = self.event_channels.write().await;
        channels.remove(conversation_id);
        existed
    }

    /// Find the most recent assistant message that looks like a full
    /// report (long enough to be worth exporting)
    pub async fn last_report(&self, conversation_id: &str) -> Option<StoredMessage> {
        const MIN_REPORT_CHARS: usize = 500;
        let conversations = self.conversations.read().await;
        conversations.get(conversation_id).and_then(|history| {
            history
                .iter()
                .rev()
                .find(|m| m.role == "assistant" && m.content.chars().count() > MIN_REPORT_CHARS)
                .cloned()
        })
    }
}
