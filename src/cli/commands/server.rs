use std::time::Duration;

use anyhow::Context;
use clap::Subcommand;
use serde_json::Value;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::config::config;

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Check server health status from the /health endpoint")]
    Health {
        #[arg(long, help = "Server base URL (defaults to the configured host and port)")]
        url: Option<String>,
    },
}

pub async fn handle(cmd: ServerCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ServerCommands::Health { url } => {
            let base = url.unwrap_or_else(|| {
                let server = &config().server;
                format!("http://{}:{}", server.host, server.port)
            });
            let endpoint = format!("{}/health", base.trim_end_matches('/'));

            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()?;
            let response = client
                .get(&endpoint)
                .send()
                .await
                .with_context(|| format!("failed to reach {}", endpoint))?;
            let status = response.status();
            let body: Value = response
                .json()
                .await
                .with_context(|| format!("{} did not return JSON", endpoint))?;

            match output_format {
                OutputFormat::Json => output_json(&body)?,
                OutputFormat::Text => {
                    let state = body["data"]["status"].as_str().unwrap_or("unknown");
                    println!("{} -> {} ({})", endpoint, state, status);
                    if let Some(err) = body["data"]["database_error"].as_str() {
                        println!("Database: {}", err);
                    }
                }
            }

            if !status.is_success() {
                anyhow::bail!("server reported {}", status);
            }
            Ok(())
        }
    }
}
