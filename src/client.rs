//! Gmail API client with rate limiting and retry logic

use async_trait::async_trait;
use google_gmail1::api::Message;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::auth::GmailHub;
use crate::error::{Result, StatementError};

/// Reference to one PDF attachment inside a message payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    pub filename: String,
    pub attachment_id: String,
}

/// Trait defining the mailbox operations the pipeline needs, for easier testing
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailClient: Send + Sync {
    /// List all message IDs matching a query
    async fn list_message_ids(&self, query: &str) -> Result<Vec<String>>;

    /// List the PDF attachments referenced by a message's payload parts
    async fn list_pdf_attachments(&self, message_id: &str) -> Result<Vec<AttachmentRef>>;

    /// Download one attachment's bytes
    async fn fetch_attachment(&self, message_id: &str, attachment_id: &str) -> Result<Vec<u8>>;
}

/// Production Gmail client with semaphore rate limiting and retry logic
pub struct ProductionMailClient {
    hub: GmailHub,
    rate_limiter: Arc<Semaphore>,
}

impl ProductionMailClient {
    /// Create a new production client
    ///
    /// # Arguments
    /// * `hub` - Gmail API hub instance
    /// * `max_concurrent` - Maximum concurrent requests
    pub fn new(hub: GmailHub, max_concurrent: usize) -> Self {
        Self {
            hub,
            rate_limiter: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    async fn acquire_permit(&self) -> Result<tokio::sync::SemaphorePermit<'_>> {
        self.rate_limiter
            .acquire()
            .await
            .map_err(|e| StatementError::Unknown(format!("Failed to acquire permit: {}", e)))
    }

    /// Execute an async operation with exponential backoff retry
    async fn with_retry<T, F, Fut>(operation_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        const MAX_RETRIES: u32 = 3;
        let mut delay = Duration::from_millis(500);
        let mut attempts = 0;

        loop {
            attempts += 1;
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_transient() && attempts <= MAX_RETRIES => {
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
                        operation_name,
                        attempts,
                        MAX_RETRIES + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, Duration::from_secs(30));
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl MailClient for ProductionMailClient {
    async fn list_message_ids(&self, query: &str) -> Result<Vec<String>> {
        let _permit = self.acquire_permit().await?;

        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let token = page_token.clone();
            let (_, response) = Self::with_retry("messages.list", || {
                let mut call = self
                    .hub
                    .users()
                    .messages_list("me")
                    .q(query)
                    .add_scope("https://www.googleapis.com/auth/gmail.readonly");
                if let Some(ref t) = token {
                    call = call.page_token(t);
                }
                async move { call.doit().await.map_err(StatementError::from) }
            })
            .await?;

            for message in response.messages.unwrap_or_default() {
                if let Some(id) = message.id {
                    ids.push(id);
                }
            }

            page_token = response.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        debug!(count = ids.len(), query, "listed matching messages");
        Ok(ids)
    }

    async fn list_pdf_attachments(&self, message_id: &str) -> Result<Vec<AttachmentRef>> {
        let _permit = self.acquire_permit().await?;

        let (_, message) = Self::with_retry("messages.get", || {
            let call = self
                .hub
                .users()
                .messages_get("me", message_id)
                .add_scope("https://www.googleapis.com/auth/gmail.readonly");
            async move { call.doit().await.map_err(StatementError::from) }
        })
        .await?;

        Ok(pdf_parts(&message))
    }

    async fn fetch_attachment(&self, message_id: &str, attachment_id: &str) -> Result<Vec<u8>> {
        let _permit = self.acquire_permit().await?;

        let (_, body) = Self::with_retry("attachments.get", || {
            let call = self
                .hub
                .users()
                .messages_attachments_get("me", message_id, attachment_id)
                .add_scope("https://www.googleapis.com/auth/gmail.readonly");
            async move { call.doit().await.map_err(StatementError::from) }
        })
        .await?;

        body.data.ok_or_else(|| {
            StatementError::AttachmentError(format!(
                "attachment {} of message {} has no data",
                attachment_id, message_id
            ))
        })
    }
}

/// Extract PDF attachment references from a message's top-level payload parts.
///
/// Only top-level parts are inspected; parts must carry a `.pdf` filename and
/// an attachment id to qualify.
pub fn pdf_parts(message: &Message) -> Vec<AttachmentRef> {
    let Some(parts) = message.payload.as_ref().and_then(|p| p.parts.as_ref()) else {
        return Vec::new();
    };

    parts
        .iter()
        .filter_map(|part| {
            let filename = part.filename.as_deref().unwrap_or("");
            if !filename.ends_with(".pdf") {
                return None;
            }
            let attachment_id = part.body.as_ref()?.attachment_id.clone()?;
            Some(AttachmentRef {
                filename: filename.to_string(),
                attachment_id,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use google_gmail1::api::{MessagePart, MessagePartBody};

    fn part(filename: &str, attachment_id: Option<&str>) -> MessagePart {
        MessagePart {
            filename: Some(filename.to_string()),
            body: Some(MessagePartBody {
                attachment_id: attachment_id.map(|s| s.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn message_with_parts(parts: Vec<MessagePart>) -> Message {
        Message {
            payload: Some(MessagePart {
                parts: Some(parts),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_pdf_parts_selects_only_pdf_filenames() {
        let message = message_with_parts(vec![
            part("statement_jan.pdf", Some("att-1")),
            part("logo.png", Some("att-2")),
            part("statement_feb.pdf", Some("att-3")),
        ]);

        let refs = pdf_parts(&message);
        assert_eq!(
            refs,
            vec![
                AttachmentRef {
                    filename: "statement_jan.pdf".to_string(),
                    attachment_id: "att-1".to_string(),
                },
                AttachmentRef {
                    filename: "statement_feb.pdf".to_string(),
                    attachment_id: "att-3".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_pdf_parts_requires_attachment_id() {
        let message = message_with_parts(vec![part("inline.pdf", None)]);
        assert!(pdf_parts(&message).is_empty());
    }

    #[test]
    fn test_pdf_parts_handles_missing_payload() {
        assert!(pdf_parts(&Message::default()).is_empty());
    }

    #[test]
    fn test_pdf_parts_handles_missing_parts() {
        let message = Message {
            payload: Some(MessagePart::default()),
            ..Default::default()
        };
        assert!(pdf_parts(&message).is_empty());
    }
}
