use anyhow::anyhow;
use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::{Backend, OutputFormat};
use crate::config::config;

#[derive(Subcommand)]
pub enum DbCommands {
    #[command(about = "Ping the system database, or one trust database")]
    Ping {
        #[arg(help = "Trust code (defaults to the system database)")]
        code: Option<String>,
    },

    #[command(about = "Compare registered trusts with schemas on the server")]
    Inventory,
}

pub async fn handle(cmd: DbCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let backend = Backend::connect(config());
    let result = dispatch(&backend, cmd, &output_format).await;
    backend.close().await;
    result
}

async fn dispatch(backend: &Backend, cmd: DbCommands, output_format: &OutputFormat) -> anyhow::Result<()> {
    match cmd {
        DbCommands::Ping { code: None } => {
            let latency = backend.db.health_check().await?;
            output_success(
                output_format,
                &format!("{} reachable in {} ms", backend.db.system_database(), latency.as_millis()),
                Some(json!({
                    "database": backend.db.system_database(),
                    "latency_ms": latency.as_millis(),
                })),
            )
        }
        DbCommands::Ping { code: Some(code) } => {
            let trust = backend
                .registry
                .find_by_code(&code)
                .await?
                .ok_or_else(|| anyhow!("Trust '{}' not found", code))?;
            let report = backend.trusts.health(&trust).await;

            if !report.reachable {
                return Err(anyhow!(
                    "{} unreachable: {}",
                    report.database,
                    or_dash(report.error.as_deref())
                ));
            }

            match output_format {
                OutputFormat::Json => output_json(&report),
                OutputFormat::Text => {
                    println!(
                        "✓ {} reachable in {} ms, {} table(s)",
                        report.database,
                        report.latency_ms.unwrap_or_default(),
                        report.table_count.unwrap_or_default()
                    );
                    Ok(())
                }
            }
        }
        DbCommands::Inventory => {
            let inventory = backend.trusts.inventory().await?;

            match output_format {
                OutputFormat::Json => output_json(&inventory),
                OutputFormat::Text => {
                    print_section("Provisioned", &inventory.provisioned);
                    print_section("Missing schema", &inventory.missing_schema);
                    print_section("Orphaned schemas", &inventory.orphaned_schemas);
                    Ok(())
                }
            }
        }
    }
}

fn print_section(title: &str, items: &[String]) {
    println!("{} ({}):", title, items.len());
    for item in items {
        println!("  {}", item);
    }
}
