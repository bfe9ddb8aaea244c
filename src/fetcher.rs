//! Mail fetching: query the mailbox and download statement PDF attachments

use tracing::{debug, info};

use crate::client::MailClient;
use crate::error::Result;

/// One downloaded PDF attachment
#[derive(Debug, Clone)]
pub struct PdfAttachment {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Fetch all PDF attachments of messages matching `query`.
///
/// The message list is reversed once so attachments arrive oldest-first;
/// within a message, attachments keep payload-part order. Messages without
/// PDF attachments contribute nothing. Attachments are downloaded
/// sequentially, one at a time.
pub async fn fetch_statement_pdfs(
    client: &dyn MailClient,
    query: &str,
) -> Result<Vec<PdfAttachment>> {
    let mut message_ids = client.list_message_ids(query).await?;
    message_ids.reverse();

    let mut attachments = Vec::new();
    for message_id in &message_ids {
        for attachment_ref in client.list_pdf_attachments(message_id).await? {
            debug!(
                message_id = %message_id,
                filename = %attachment_ref.filename,
                "downloading attachment"
            );
            let data = client
                .fetch_attachment(message_id, &attachment_ref.attachment_id)
                .await?;
            attachments.push(PdfAttachment {
                filename: attachment_ref.filename,
                data,
            });
        }
    }

    info!(
        messages = message_ids.len(),
        attachments = attachments.len(),
        "fetched statement PDFs"
    );
    Ok(attachments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{AttachmentRef, MockMailClient};
    use crate::error::StatementError;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_messages_processed_oldest_first() {
        let mut client = MockMailClient::new();
        client
            .expect_list_message_ids()
            .returning(|_| Ok(vec!["newest".to_string(), "oldest".to_string()]));
        client.expect_list_pdf_attachments().returning(|id| {
            Ok(vec![AttachmentRef {
                filename: format!("{}.pdf", id),
                attachment_id: format!("att-{}", id),
            }])
        });
        client
            .expect_fetch_attachment()
            .returning(|_, att| Ok(att.as_bytes().to_vec()));

        let pdfs = fetch_statement_pdfs(&client, "q").await.unwrap();
        assert_eq!(pdfs.len(), 2);
        assert_eq!(pdfs[0].filename, "oldest.pdf");
        assert_eq!(pdfs[1].filename, "newest.pdf");
        assert_eq!(pdfs[0].data, b"att-oldest".to_vec());
    }

    #[tokio::test]
    async fn test_messages_without_pdfs_are_skipped() {
        let mut client = MockMailClient::new();
        client
            .expect_list_message_ids()
            .returning(|_| Ok(vec!["m1".to_string()]));
        client
            .expect_list_pdf_attachments()
            .with(eq("m1"))
            .returning(|_| Ok(vec![]));

        let pdfs = fetch_statement_pdfs(&client, "q").await.unwrap();
        assert!(pdfs.is_empty());
    }

    #[tokio::test]
    async fn test_empty_mailbox_yields_no_attachments() {
        let mut client = MockMailClient::new();
        client.expect_list_message_ids().returning(|_| Ok(vec![]));

        let pdfs = fetch_statement_pdfs(&client, "q").await.unwrap();
        assert!(pdfs.is_empty());
    }

    #[tokio::test]
    async fn test_list_failure_propagates() {
        let mut client = MockMailClient::new();
        client
            .expect_list_message_ids()
            .returning(|_| Err(StatementError::Forbidden("denied".to_string())));

        let result = fetch_statement_pdfs(&client, "q").await;
        assert!(matches!(result, Err(StatementError::Forbidden(_))));
    }
}
