//! Label requester: uploads the persisted dataset to the remote classifier
//!
//! The classifier is an external HTTP service accepting a multipart CSV
//! upload (field name `file`) and returning a JSON body. Any non-2xx status
//! is a failure; there is no retry.

use std::path::Path;

use tracing::info;

use crate::error::{Result, StatementError};

/// Client for the remote classification endpoint
pub struct LabelRequester {
    client: reqwest::Client,
    model_api_url: String,
}

impl LabelRequester {
    pub fn new(model_api_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            model_api_url: model_api_url.into(),
        }
    }

    /// Upload the dataset CSV at `path` and relay the classifier's JSON verbatim.
    pub async fn request_labels(&self, path: &Path) -> Result<serde_json::Value> {
        let bytes = tokio::fs::read(path).await?;

        let file_part = reqwest::multipart::Part::bytes(bytes)
            .file_name("unlabeled_transactions.csv")
            .mime_str("text/csv")
            .map_err(|e| StatementError::Unknown(format!("multipart error: {}", e)))?;
        let form = reqwest::multipart::Form::new().part("file", file_part);

        info!(path = %path.display(), url = %self.model_api_url, "uploading dataset to classifier");

        let response = self
            .client
            .post(&self.model_api_url)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let details = response
                .text()
                .await
                .unwrap_or_else(|_| "<body read error>".into());
            return Err(StatementError::ClassifierError {
                status: status.as_u16(),
                details,
            });
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn csv_fixture() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let file = dir.path().join("unlabeled_transactions.csv");
        tokio::fs::write(
            &file,
            "Date & Time,Transaction,Type,Amount\n\"Jan 05, 2024 10:30 AM\",John Doe,Debit,1200.5\n",
        )
        .await
        .unwrap();
        (dir, file)
    }

    #[tokio::test]
    async fn test_relays_classifier_json_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "labels": ["Food", "Transfers"]
            })))
            .mount(&server)
            .await;

        let (_dir, file) = csv_fixture().await;
        let requester = LabelRequester::new(format!("{}/predict", server.uri()));
        let body = requester.request_labels(&file).await.unwrap();

        assert_eq!(body["labels"][0], "Food");
    }

    #[tokio::test]
    async fn test_non_success_status_surfaces_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad csv"))
            .mount(&server)
            .await;

        let (_dir, file) = csv_fixture().await;
        let requester = LabelRequester::new(format!("{}/predict", server.uri()));
        let err = requester.request_labels(&file).await.unwrap_err();

        match err {
            StatementError::ClassifierError { status, details } => {
                assert_eq!(status, 422);
                assert_eq!(details, "bad csv");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let requester = LabelRequester::new("http://localhost:1/predict");
        let err = requester
            .request_labels(Path::new("does-not-exist.csv"))
            .await
            .unwrap_err();
        assert!(matches!(err, StatementError::IoError(_)));
    }
}
