//! Extraction pipeline: mail query, PDF extraction, parsing, assembly
//!
//! One extraction request runs end-to-end and sequentially: list messages,
//! download each PDF attachment, extract its text, parse it, fold the
//! records into one dataset, persist the dataset. No concurrent fan-out
//! across attachments, no cancellation, no timeout beyond the underlying
//! HTTP/IO calls.

use tracing::{info, warn};

use crate::client::MailClient;
use crate::config::Config;
use crate::dataset;
use crate::error::Result;
use crate::fetcher;
use crate::models::TransactionDataset;
use crate::parser::{self, StatementFormat};
use crate::pdf;

/// Run one full extraction: fetch, extract, parse, assemble, persist.
///
/// Each fetched PDF is also saved under the downloads directory, mirroring
/// what the operator sees in the mailbox. The dataset CSV is only written
/// when at least one record was parsed; an empty result leaves the previous
/// run's file untouched.
pub async fn run_extraction(
    client: &dyn MailClient,
    config: &Config,
    format: &StatementFormat,
) -> Result<TransactionDataset> {
    let attachments = fetcher::fetch_statement_pdfs(client, &config.gmail.query).await?;

    tokio::fs::create_dir_all(&config.storage.downloads_dir).await?;
    tokio::fs::create_dir_all(&config.storage.processed_dir).await?;

    let password = config.pdf.password();
    let mut all_records = TransactionDataset::new();

    for attachment in &attachments {
        let pdf_path = config.storage.downloads_dir.join(&attachment.filename);
        tokio::fs::write(&pdf_path, &attachment.data).await?;

        let lines = pdf::extract_text_lines(&attachment.data, password.as_deref())?;
        let records = parser::parse_statement_text(&lines, format);
        if records.is_empty() {
            warn!(filename = %attachment.filename, "no transactions found");
        }
        all_records.extend(records);
    }

    if all_records.is_empty() {
        info!("extraction finished with no transactions");
        return Ok(all_records);
    }

    dataset::write_csv(&all_records, &config.storage.dataset_path())?;
    info!(rows = all_records.len(), "extraction finished");
    Ok(all_records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{AttachmentRef, MockMailClient};
    use tempfile::tempdir;

    fn config_in(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.storage.downloads_dir = dir.join("downloads");
        config.storage.processed_dir = dir.join("processed");
        config
    }

    #[tokio::test]
    async fn test_empty_mailbox_writes_nothing() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());

        let mut client = MockMailClient::new();
        client.expect_list_message_ids().returning(|_| Ok(vec![]));

        let dataset = run_extraction(&client, &config, &StatementFormat::default())
            .await
            .unwrap();

        assert!(dataset.is_empty());
        assert!(!config.storage.dataset_path().exists());
    }

    #[tokio::test]
    async fn test_unparseable_pdf_aborts_request() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());

        let mut client = MockMailClient::new();
        client
            .expect_list_message_ids()
            .returning(|_| Ok(vec!["m1".to_string()]));
        client.expect_list_pdf_attachments().returning(|_| {
            Ok(vec![AttachmentRef {
                filename: "broken.pdf".to_string(),
                attachment_id: "att-1".to_string(),
            }])
        });
        client
            .expect_fetch_attachment()
            .returning(|_, _| Ok(b"not a pdf".to_vec()));

        let result = run_extraction(&client, &config, &StatementFormat::default()).await;
        assert!(result.is_err());

        // The attachment was still saved before extraction failed
        assert!(config.storage.downloads_dir.join("broken.pdf").exists());
    }
}
