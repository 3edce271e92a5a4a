//! Mail sender abstraction.
//!
//! The host queues messages for SMTP delivery; this crate hands it one batch
//! per fired event. `OutboxSender` collects batches in memory for previews
//! and tests.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use super::EmailMessage;

#[derive(Debug, Error)]
pub enum MailError {
    /// The sender refused a message (bad address, oversized body, ...)
    #[error("Message rejected: {0}")]
    Rejected(String),

    /// The mail queue cannot be reached
    #[error("Mail queue unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait MailSender: Send + Sync {
    /// Queue a batch of messages, returning how many were accepted
    async fn send_batch(&self, messages: Vec<EmailMessage>) -> Result<usize, MailError>;
}

/// In-memory sender that records every batch it receives.
#[derive(Default)]
pub struct OutboxSender {
    batches: RwLock<Vec<Vec<EmailMessage>>>,
}

impl OutboxSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `send_batch` calls received
    pub async fn batch_count(&self) -> usize {
        self.batches.read().await.len()
    }

    pub async fn batches(&self) -> Vec<Vec<EmailMessage>> {
        self.batches.read().await.clone()
    }

    /// All messages across batches, in send order
    pub async fn messages(&self) -> Vec<EmailMessage> {
        self.batches.read().await.iter().flatten().cloned().collect()
    }

    pub async fn clear(&self) {
        self.batches.write().await.clear();
    }
}

#[async_trait]
impl MailSender for OutboxSender {
    async fn send_batch(&self, messages: Vec<EmailMessage>) -> Result<usize, MailError> {
        if let Some(bad) = messages.iter().find(|m| m.to.is_empty()) {
            return Err(MailError::Rejected(format!(
                "no recipients for \"{}\"",
                bad.subject
            )));
        }

        let count = messages.len();
        self.batches.write().await.push(messages);

        tracing::debug!(count = count, "Batch added to outbox");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn message(to: &[&str]) -> EmailMessage {
        EmailMessage {
            subject: "Hello".to_string(),
            body: "Body".to_string(),
            from_email: "notifications@example.com".to_string(),
            to: to.iter().map(|s| s.to_string()).collect(),
            extra_headers: BTreeMap::new(),
            locale: None,
        }
    }

    #[tokio::test]
    async fn test_outbox_records_batches() {
        let outbox = OutboxSender::new();

        let sent = outbox
            .send_batch(vec![message(&["a@example.com"]), message(&["b@example.com"])])
            .await
            .unwrap();
        assert_eq!(sent, 2);
        outbox.send_batch(vec![message(&["c@example.com"])]).await.unwrap();

        assert_eq!(outbox.batch_count().await, 2);
        assert_eq!(outbox.messages().await.len(), 3);

        outbox.clear().await;
        assert_eq!(outbox.batch_count().await, 0);
    }

    #[tokio::test]
    async fn test_outbox_rejects_message_without_recipients() {
        let outbox = OutboxSender::new();
        let result = outbox.send_batch(vec![message(&[])]).await;

        assert!(matches!(result, Err(MailError::Rejected(_))));
        assert_eq!(outbox.batch_count().await, 0);
    }
}
