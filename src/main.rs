use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use upi_statement_api::auth;
use upi_statement_api::classifier::LabelRequester;
use upi_statement_api::client::ProductionMailClient;
use upi_statement_api::config::Config;
use upi_statement_api::dataset;
use upi_statement_api::error::StatementError;
use upi_statement_api::parser::StatementFormat;
use upi_statement_api::pipeline;
use upi_statement_api::server;

#[derive(Parser)]
#[command(
    name = "upi-statement-api",
    about = "Extract transactions from Gmail PDF statements and request labels from a classifier"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Override the configured bind address
        #[arg(long)]
        bind: Option<String>,
    },
    /// Run one extraction pass and print the dataset as JSON
    Extract,
    /// Upload the latest dataset CSV to the classifier and print its response
    Predict,
    /// Run the interactive OAuth flow and persist the token cache
    Auth,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(&cli.config).await?;

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            server::serve(config).await
        }
        Commands::Extract => {
            let hub = auth::gmail_hub(&config.gmail).await?;
            let client = ProductionMailClient::new(hub, config.gmail.max_concurrent_requests);
            let format = StatementFormat::with_rules(
                &config.statement.currency_code,
                &config.statement.description_prefixes,
            );

            let result = pipeline::run_extraction(&client, &config, &format).await?;
            if result.is_empty() {
                println!("No transactions extracted.");
            } else {
                println!("{}", serde_json::to_string_pretty(result.records())?);
            }
            Ok(())
        }
        Commands::Predict => {
            let latest = dataset::find_latest_csv(&config.storage.processed_dir)?
                .ok_or(StatementError::DatasetNotFound)?;
            let requester = LabelRequester::new(config.classifier.model_api_url.clone());
            let response = requester.request_labels(&latest).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Commands::Auth => {
            // Building the hub drives the installed-app flow and persists
            // the token to the configured cache path.
            let _hub = auth::gmail_hub(&config.gmail).await?;
            auth::secure_token_file(&config.gmail.token_cache_path).await?;
            println!(
                "Authentication complete. Token saved to {}",
                config.gmail.token_cache_path.display()
            );
            Ok(())
        }
    }
}
