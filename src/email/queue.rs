use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::db::Repository;
use crate::email::mailer::MailTransport;
use crate::error::Result;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    pub sent: usize,
    pub failed: usize,
}

/// Durable email queue. Producers enqueue PENDING rows; `drain` attempts
/// delivery and commits each item's terminal status before touching the next,
/// so a crash mid-batch leaves at most the in-flight item ambiguous.
pub struct DeliveryQueue {
    repository: Arc<Repository>,
    transport: Arc<dyn MailTransport>,
    // Serializes drain passes so overlapping ticks cannot double-send.
    drain_lock: Mutex<()>,
}

impl DeliveryQueue {
    pub fn new(repository: Arc<Repository>, transport: Arc<dyn MailTransport>) -> Self {
        Self {
            repository,
            transport,
            drain_lock: Mutex::new(()),
        }
    }

    pub async fn enqueue(&self, recipient: &str, subject: &str, body: &str) -> Result<i64> {
        let id = self.repository.enqueue_email(recipient, subject, body).await?;
        debug!(id, recipient, "Email enqueued");
        Ok(id)
    }

    /// Process up to `batch_size` PENDING items, oldest first. FAILED items
    /// stay failed; re-delivery is an operator decision.
    pub async fn drain(&self, batch_size: i64) -> Result<DrainReport> {
        let _guard = self.drain_lock.lock().await;

        let pending = self.repository.pending_emails(batch_size).await?;
        let mut report = DrainReport::default();

        for item in pending {
            match self
                .transport
                .send(&item.recipient, &item.subject, &item.body)
                .await
            {
                Ok(()) => {
                    self.repository.mark_email_sent(item.id).await?;
                    report.sent += 1;
                    info!(id = item.id, recipient = %item.recipient, "Email sent");
                }
                Err(e) => {
                    let reason = e.to_string();
                    self.repository.mark_email_failed(item.id, &reason).await?;
                    report.failed += 1;
                    error!(id = item.id, recipient = %item.recipient, error = %e, "Email delivery failed");
                }
            }
        }

        if report.sent > 0 || report.failed > 0 {
            info!(sent = report.sent, failed = report.failed, "Queue drain complete");
        }
        Ok(report)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::EmailStatus;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport stub failing for chosen recipients.
    pub(crate) struct MockTransport {
        pub fail_for: Vec<String>,
        pub sends: AtomicUsize,
    }

    impl MockTransport {
        pub fn reliable() -> Self {
            Self {
                fail_for: Vec::new(),
                sends: AtomicUsize::new(0),
            }
        }

        pub fn failing_for(recipient: &str) -> Self {
            Self {
                fail_for: vec![recipient.to_string()],
                sends: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MailTransport for MockTransport {
        async fn send(&self, recipient: &str, _subject: &str, _html_body: &str) -> Result<()> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            if self.fail_for.iter().any(|r| r == recipient) {
                return Err(AppError::ExternalService {
                    service: "mail API",
                    status: 502,
                    body: "relay refused".to_string(),
                });
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_drained_items_end_terminal_exactly_once() {
        let repo = Arc::new(Repository::open_in_memory().await.unwrap());
        let transport = Arc::new(MockTransport::failing_for("bad@example.com"));
        let queue = DeliveryQueue::new(repo.clone(), transport.clone());

        let good = queue.enqueue("good@example.com", "s", "b").await.unwrap();
        let bad = queue.enqueue("bad@example.com", "s", "b").await.unwrap();

        let report = queue.drain(10).await.unwrap();
        assert_eq!(report, DrainReport { sent: 1, failed: 1 });

        let good_item = repo.email_by_id(good).await.unwrap().unwrap();
        assert_eq!(good_item.status, EmailStatus::Sent);
        assert!(good_item.sent_at.is_some());

        let bad_item = repo.email_by_id(bad).await.unwrap().unwrap();
        assert_eq!(bad_item.status, EmailStatus::Failed);
        assert!(bad_item
            .failure_reason
            .as_deref()
            .unwrap()
            .contains("relay refused"));

        // Terminal items are not reconsidered on the next pass.
        let report = queue.drain(10).await.unwrap();
        assert_eq!(report, DrainReport::default());
        assert_eq!(transport.sends.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_drain_respects_batch_size() {
        let repo = Arc::new(Repository::open_in_memory().await.unwrap());
        let transport = Arc::new(MockTransport::reliable());
        let queue = DeliveryQueue::new(repo.clone(), transport);

        for i in 0..5 {
            queue
                .enqueue(&format!("u{i}@example.com"), "s", "b")
                .await
                .unwrap();
        }

        let report = queue.drain(2).await.unwrap();
        assert_eq!(report.sent, 2);
        assert_eq!(repo.pending_emails(10).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_drains_do_not_double_send() {
        let repo = Arc::new(Repository::open_in_memory().await.unwrap());
        let transport = Arc::new(MockTransport::reliable());
        let queue = Arc::new(DeliveryQueue::new(repo.clone(), transport.clone()));

        for i in 0..4 {
            queue
                .enqueue(&format!("u{i}@example.com"), "s", "b")
                .await
                .unwrap();
        }

        let (a, b) = tokio::join!(
            {
                let queue = Arc::clone(&queue);
                async move { queue.drain(10).await.unwrap() }
            },
            {
                let queue = Arc::clone(&queue);
                async move { queue.drain(10).await.unwrap() }
            }
        );

        assert_eq!(a.sent + b.sent, 4);
        assert_eq!(transport.sends.load(Ordering::SeqCst), 4);
    }
}
