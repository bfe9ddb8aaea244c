//! UPI Statement Extraction & Labeling API
//!
//! Fetches bank/payment transaction PDF statements delivered as Gmail
//! attachments, extracts structured transaction records from their text via
//! fixed-format positional parsing, and forwards the resulting tabular
//! dataset to a remote classification endpoint for labeling.
//!
//! # Overview
//!
//! - **Authentication**: OAuth2 with token caching, credentials from a
//!   local file or base64-encoded environment variables
//! - **Fetching**: Gmail query for statement messages, PDF attachment
//!   download
//! - **Extraction**: PDF decryption and text linearization
//! - **Parsing**: fixed 8-line positional grammar reconstructing one
//!   transaction record per block
//! - **Assembly**: one ordered dataset per extraction run, persisted as CSV
//! - **Labeling**: multipart CSV upload to the remote classifier
//!
//! # Example Usage
//!
//! ```no_run
//! use upi_statement_api::config::Config;
//! use upi_statement_api::server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml".as_ref()).await?;
//!     server::serve(config).await
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`auth`] - OAuth2 authentication and Gmail API initialization
//! - [`client`] - Rate-limited Gmail API client with retry logic
//! - [`classifier`] - Remote label requester
//! - [`config`] - Configuration management
//! - [`dataset`] - Dataset assembly and CSV persistence
//! - [`error`] - Error types and result aliases
//! - [`fetcher`] - Mailbox query and attachment download
//! - [`models`] - Core data structures
//! - [`parser`] - Statement text parser (the core)
//! - [`pdf`] - PDF decryption and text extraction
//! - [`pipeline`] - End-to-end extraction orchestration
//! - [`server`] - HTTP API surface

pub mod auth;
pub mod classifier;
pub mod client;
pub mod config;
pub mod dataset;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod parser;
pub mod pdf;
pub mod pipeline;
pub mod server;

// Re-export commonly used types for convenience
pub use error::{Result, StatementError};

// Core data models
pub use models::{TransactionDataset, TransactionRecord, DATASET_COLUMNS};

// Parser types
pub use parser::{parse_statement_text, StatementFormat};

// Config types
pub use config::{ClassifierConfig, Config, GmailConfig, ServerConfig, StorageConfig};

// Client trait and production implementation
pub use client::{MailClient, ProductionMailClient};

// Server types
pub use server::AppState;
