use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::config::Settings;
use crate::error::Result;

use super::{EmailMessage, MailSender, WatchBackend};

/// Result of handing a batch to the mail sender
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryResult {
    /// Identifier for this delivery, for log correlation
    pub delivery_id: Uuid,
    /// Number of messages formatted
    pub recipients: usize,
    /// Number of messages the sender accepted
    pub sent: usize,
    /// Whether anything was sent
    pub success: bool,
}

impl DeliveryResult {
    fn new(recipients: usize, sent: usize) -> Self {
        Self {
            delivery_id: Uuid::new_v4(),
            recipients,
            sent,
            success: sent > 0,
        }
    }
}

/// Statistics for the notification dispatcher
#[derive(Debug, Default)]
pub struct DispatcherStats {
    /// Batches handed to the sender
    pub total_batches: AtomicU64,
    /// Messages accepted by the sender
    pub total_sent: AtomicU64,
    /// Messages lost to sender errors
    pub total_failed: AtomicU64,
    /// Deliveries skipped because nobody was watching
    pub total_skipped: AtomicU64,
}

impl DispatcherStats {
    pub fn snapshot(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            total_batches: self.total_batches.load(Ordering::Relaxed),
            total_sent: self.total_sent.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
            total_skipped: self.total_skipped.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatcher statistics
#[derive(Debug, Clone, Serialize)]
pub struct DispatcherStatsSnapshot {
    pub total_batches: u64,
    pub total_sent: u64,
    pub total_failed: u64,
    pub total_skipped: u64,
}

/// Holds the watch registry and mail sender that events fire through
pub struct NotificationDispatcher {
    watches: Arc<dyn WatchBackend>,
    sender: Arc<dyn MailSender>,
    settings: Arc<Settings>,
    stats: DispatcherStats,
}

impl NotificationDispatcher {
    pub fn new(
        watches: Arc<dyn WatchBackend>,
        sender: Arc<dyn MailSender>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            watches,
            sender,
            settings,
            stats: DispatcherStats::default(),
        }
    }

    pub fn watches(&self) -> &dyn WatchBackend {
        self.watches.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get dispatcher statistics
    pub fn stats(&self) -> DispatcherStatsSnapshot {
        self.stats.snapshot()
    }

    /// Hand a batch of messages to the sender in a single call.
    ///
    /// Empty batches are skipped. Sender errors propagate without retry.
    #[tracing::instrument(name = "dispatcher.deliver", skip(self, messages), fields(count = messages.len()))]
    pub async fn deliver(&self, messages: Vec<EmailMessage>) -> Result<DeliveryResult> {
        let count = messages.len();
        if count == 0 {
            self.stats.total_skipped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("No recipients, nothing to deliver");
            return Ok(DeliveryResult::new(0, 0));
        }

        self.stats.total_batches.fetch_add(1, Ordering::Relaxed);
        let sent = match self.sender.send_batch(messages).await {
            Ok(sent) => sent,
            Err(e) => {
                self.stats
                    .total_failed
                    .fetch_add(count as u64, Ordering::Relaxed);
                tracing::warn!(error = %e, count = count, "Mail sender rejected batch");
                return Err(e.into());
            }
        };
        self.stats.total_sent.fetch_add(sent as u64, Ordering::Relaxed);

        let result = DeliveryResult::new(count, sent);
        tracing::info!(
            delivery_id = %result.delivery_id,
            recipients = count,
            sent = sent,
            "Notification batch delivered"
        );
        Ok(result)
    }

    /// Send a single standalone message
    pub async fn send(&self, message: EmailMessage) -> Result<DeliveryResult> {
        self.deliver(vec![message]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{MailError, MemoryWatchBackend, OutboxSender};
    use crate::NotifyError;
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    struct FailingSender;

    #[async_trait]
    impl MailSender for FailingSender {
        async fn send_batch(&self, _messages: Vec<EmailMessage>) -> std::result::Result<usize, MailError> {
            Err(MailError::Unavailable("queue down".to_string()))
        }
    }

    fn message() -> EmailMessage {
        EmailMessage {
            subject: "Subject".to_string(),
            body: "Body".to_string(),
            from_email: "notifications@example.com".to_string(),
            to: vec!["someone@example.com".to_string()],
            extra_headers: BTreeMap::new(),
            locale: None,
        }
    }

    #[test]
    fn test_delivery_result() {
        let result = DeliveryResult::new(5, 5);
        assert!(result.success);
        assert_eq!(result.recipients, 5);

        let empty_result = DeliveryResult::new(0, 0);
        assert!(!empty_result.success);
    }

    #[tokio::test]
    async fn test_empty_batch_is_skipped() {
        let outbox = Arc::new(OutboxSender::new());
        let dispatcher = NotificationDispatcher::new(
            Arc::new(MemoryWatchBackend::new()),
            outbox.clone(),
            Arc::new(Settings::default()),
        );

        let result = dispatcher.deliver(vec![]).await.unwrap();
        assert!(!result.success);
        assert_eq!(outbox.batch_count().await, 0);
        assert_eq!(dispatcher.stats().total_skipped, 1);
    }

    #[tokio::test]
    async fn test_sender_failure_propagates() {
        let dispatcher = NotificationDispatcher::new(
            Arc::new(MemoryWatchBackend::new()),
            Arc::new(FailingSender),
            Arc::new(Settings::default()),
        );

        let result = dispatcher.send(message()).await;
        assert!(matches!(result, Err(NotifyError::Delivery(MailError::Unavailable(_)))));

        let stats = dispatcher.stats();
        assert_eq!(stats.total_batches, 1);
        assert_eq!(stats.total_failed, 1);
        assert_eq!(stats.total_sent, 0);
    }

    #[tokio::test]
    async fn test_send_single_message() {
        let outbox = Arc::new(OutboxSender::new());
        let dispatcher = NotificationDispatcher::new(
            Arc::new(MemoryWatchBackend::new()),
            outbox.clone(),
            Arc::new(Settings::default()),
        );

        let result = dispatcher.send(message()).await.unwrap();
        assert!(result.success);
        assert_eq!(outbox.messages().await, vec![message()]);
        assert_eq!(dispatcher.stats().total_sent, 1);
    }
}
