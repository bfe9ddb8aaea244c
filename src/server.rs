//! HTTP API surface
//!
//! Two GET endpoints drive the whole tool: `/extract-transactions` runs the
//! full fetch/parse/assemble pipeline, `/predict-labels` forwards the latest
//! persisted dataset to the remote classifier. Pipeline failures are
//! reported as a 200 `{"error": ...}` payload; only `/predict-labels`
//! distinguishes 404 (no dataset file) and 500 (upstream failure).

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde_json::json;
use tracing::{error, info};

use crate::auth;
use crate::classifier::LabelRequester;
use crate::client::{MailClient, ProductionMailClient};
use crate::config::Config;
use crate::dataset;
use crate::error::{Result, StatementError};
use crate::models::TransactionDataset;
use crate::parser::StatementFormat;
use crate::pipeline;

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub format: Arc<StatementFormat>,
    pub requester: Arc<LabelRequester>,
    /// Fixed mail client; `None` authenticates a production Gmail client
    /// per request.
    mail_client: Option<Arc<dyn MailClient>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self::build(config, None)
    }

    /// State with the given mail client instead of per-request Gmail auth.
    pub fn with_mail_client(config: Config, mail_client: Arc<dyn MailClient>) -> Self {
        Self::build(config, Some(mail_client))
    }

    fn build(config: Config, mail_client: Option<Arc<dyn MailClient>>) -> Self {
        let format = StatementFormat::with_rules(
            &config.statement.currency_code,
            &config.statement.description_prefixes,
        );
        let requester = LabelRequester::new(config.classifier.model_api_url.clone());
        Self {
            config: Arc::new(config),
            format: Arc::new(format),
            requester: Arc::new(requester),
            mail_client,
        }
    }
}

/// Build the application router with permissive CORS on every route.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/extract-transactions", get(extract_transactions))
        .route("/predict-labels", get(predict_labels))
        .with_state(state)
        .layer(middleware::from_fn(cors_middleware))
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let bind = config.server.bind.clone();
    let app = router(AppState::new(config));

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!(bind = %bind, "HTTP server started");
    axum::serve(listener, app).await?;
    Ok(())
}

/// GET /extract-transactions
///
/// Always responds 200; the body distinguishes success, empty, and failure.
async fn extract_transactions(State(state): State<AppState>) -> Json<serde_json::Value> {
    match run_extraction(&state).await {
        Ok(dataset) if dataset.is_empty() => {
            Json(json!({ "message": "No transactions extracted." }))
        }
        Ok(dataset) => Json(json!({
            "columns": TransactionDataset::columns(),
            "data": dataset.records(),
        })),
        Err(e) => {
            error!("extraction failed: {}", e);
            Json(json!({ "error": e.to_string() }))
        }
    }
}

/// Run the pipeline end-to-end, authenticating per request unless the state
/// carries a fixed mail client.
async fn run_extraction(state: &AppState) -> Result<TransactionDataset> {
    if let Some(client) = &state.mail_client {
        return pipeline::run_extraction(client.as_ref(), &state.config, &state.format).await;
    }
    let hub = auth::gmail_hub(&state.config.gmail).await?;
    let client = ProductionMailClient::new(hub, state.config.gmail.max_concurrent_requests);
    pipeline::run_extraction(&client, &state.config, &state.format).await
}

/// GET /predict-labels
///
/// Finds the latest persisted dataset CSV and relays the classifier's JSON.
async fn predict_labels(State(state): State<AppState>) -> Response {
    let latest = match dataset::find_latest_csv(&state.config.storage.processed_dir) {
        Ok(Some(path)) => path,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "No extracted CSVs found" })),
            )
                .into_response();
        }
        Err(e) => {
            // Local filesystem failure; no classifier call happened
            error!("failed to scan processed directory: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to scan processed directory", "details": e.to_string() })),
            )
                .into_response();
        }
    };

    info!(path = %latest.display(), "using latest CSV");

    match state.requester.request_labels(&latest).await {
        Ok(body) => Json(body).into_response(),
        Err(StatementError::ClassifierError { status, details }) => {
            error!("classifier returned HTTP {}", status);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Model API failed", "details": details })),
            )
                .into_response()
        }
        Err(e) => {
            error!("classifier request failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Model API failed", "details": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Permissive CORS: all origins, methods, and headers.
async fn cors_middleware(
    request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> impl IntoResponse {
    // Handle preflight OPTIONS requests.
    if request.method() == axum::http::Method::OPTIONS {
        return axum::http::Response::builder()
            .status(204)
            .header("Access-Control-Allow-Origin", "*")
            .header("Access-Control-Allow-Methods", "*")
            .header("Access-Control-Allow-Headers", "*")
            .header("Access-Control-Max-Age", "3600")
            .body(axum::body::Body::empty())
            .unwrap()
            .into_response();
    }

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert("Access-Control-Allow-Origin", "*".parse().unwrap());
    response
}
