use crate::domain::ports::Transport;
use crate::error::{PayError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A request captured by [`InMemoryTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRequest {
    pub url: String,
    pub body: String,
}

/// A thread-safe transport that answers from canned replies.
///
/// Replies are matched by URL suffix (e.g. `"pay/unifiedorder"`), so the same
/// fixtures work against production and sandbox endpoints. Every request is
/// recorded for later inspection.
#[derive(Default, Clone)]
pub struct InMemoryTransport {
    replies: Arc<RwLock<Vec<(String, String)>>>,
    sent: Arc<RwLock<Vec<SentRequest>>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `reply` for every URL ending with `path_suffix`. Later
    /// registrations for the same suffix win.
    pub async fn reply_to(&self, path_suffix: impl Into<String>, reply: impl Into<String>) {
        let mut replies = self.replies.write().await;
        replies.push((path_suffix.into(), reply.into()));
    }

    /// Requests posted so far, oldest first.
    pub async fn sent(&self) -> Vec<SentRequest> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn post(&self, url: &str, body: String) -> Result<String> {
        self.sent.write().await.push(SentRequest {
            url: url.to_string(),
            body,
        });

        let replies = self.replies.read().await;
        replies
            .iter()
            .rev()
            .find(|(suffix, _)| url.ends_with(suffix.as_str()))
            .map(|(_, reply)| reply.clone())
            .ok_or_else(|| {
                PayError::TransportError(format!("no reply configured for {url}").into())
            })
    }
}
