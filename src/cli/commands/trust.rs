use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::{Backend, OutputFormat};
use crate::config::config;
use crate::database::{NewTrust, Trust, TrustStatus};

#[derive(Subcommand)]
pub enum TrustCommands {
    #[command(about = "List registered trusts")]
    List,

    #[command(about = "Show one trust")]
    Show {
        #[arg(help = "Trust code")]
        code: String,
    },

    #[command(about = "Mark a trust ACTIVE so its subdomain serves requests again")]
    Activate {
        #[arg(help = "Trust code")]
        code: String,
    },

    #[command(
        about = "Mark a trust SUSPENDED; its subdomain answers 403",
        long_about = "Mark a trust SUSPENDED in the registry.\n\n\
            A running server notices once its trust cache expires \
            (ERP_TRUST_CACHE_TTL_SECS) and keeps the trust's pool open. \
            Use PUT /api/root/trusts/:code/status to suspend with immediate effect, \
            or DELETE /api/root/pools/:database to close the pool."
    )]
    Suspend {
        #[arg(help = "Trust code")]
        code: String,
    },

    #[command(about = "Create or update trusts from a YAML list")]
    Import {
        #[arg(help = "YAML file holding a list of trusts")]
        file: PathBuf,
    },
}

pub async fn handle(cmd: TrustCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let backend = Backend::connect(config());
    let result = dispatch(&backend, cmd, &output_format).await;
    backend.close().await;
    result
}

async fn dispatch(
    backend: &Backend,
    cmd: TrustCommands,
    output_format: &OutputFormat,
) -> anyhow::Result<()> {
    match cmd {
        TrustCommands::List => {
            let trusts = backend.registry.list().await?;
            if trusts.is_empty() {
                return output_empty_collection(output_format, "trusts", "No trusts registered");
            }

            match output_format {
                OutputFormat::Json => output_json(&json!({ "trusts": trusts })),
                OutputFormat::Text => {
                    println!(
                        "{:<12} {:<30} {:<15} {:<10} {}",
                        "CODE", "NAME", "SUBDOMAIN", "STATUS", "DATABASE"
                    );
                    println!("{}", "-".repeat(100));
                    for trust in &trusts {
                        println!(
                            "{:<12} {:<30} {:<15} {:<10} {}",
                            trust.trust_code,
                            trust.trust_name,
                            trust.subdomain,
                            trust.status,
                            backend.db.trust_database_name(trust)
                        );
                    }
                    Ok(())
                }
            }
        }
        TrustCommands::Show { code } => {
            let trust = backend
                .registry
                .find_by_code(&code)
                .await?
                .ok_or_else(|| anyhow!("Trust '{}' not found", code))?;

            match output_format {
                OutputFormat::Json => output_json(&trust),
                OutputFormat::Text => {
                    print_trust(backend, &trust);
                    Ok(())
                }
            }
        }
        TrustCommands::Activate { code } => {
            set_status(backend, &code, TrustStatus::Active, output_format).await
        }
        TrustCommands::Suspend { code } => {
            set_status(backend, &code, TrustStatus::Suspended, output_format).await
        }
        TrustCommands::Import { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let entries: Vec<NewTrust> = serde_yaml::from_str(&raw)
                .with_context(|| format!("failed to parse {}", file.display()))?;

            let mut imported = Vec::with_capacity(entries.len());
            for entry in &entries {
                let trust = backend
                    .registry
                    .upsert(entry)
                    .await
                    .with_context(|| format!("failed to import trust '{}'", entry.trust_code))?;
                if let OutputFormat::Text = output_format {
                    println!("  {} -> {}", trust.trust_code, backend.db.trust_database_name(&trust));
                }
                imported.push(trust.trust_code);
            }

            output_success(
                output_format,
                &format!("Imported {} trust(s) from {}", imported.len(), file.display()),
                Some(json!({ "imported": imported })),
            )
        }
    }
}

async fn set_status(
    backend: &Backend,
    code: &str,
    status: TrustStatus,
    output_format: &OutputFormat,
) -> anyhow::Result<()> {
    let trust = backend
        .registry
        .set_status(code, status)
        .await?
        .ok_or_else(|| anyhow!("Trust '{}' not found", code))?;

    output_success(
        output_format,
        &format!("Trust '{}' is now {}", trust.trust_code, trust.status),
        Some(json!({ "trust_code": trust.trust_code, "status": trust.status })),
    )?;

    if !trust.status.is_active() {
        if let OutputFormat::Text = output_format {
            println!(
                "  Running servers apply this after their trust cache expires; \
                 close the open pool with DELETE /api/root/pools/{}",
                backend.db.trust_database_name(&trust)
            );
        }
    }
    Ok(())
}

fn print_trust(backend: &Backend, trust: &Trust) {
    println!("Code:      {}", trust.trust_code);
    println!("Name:      {}", trust.trust_name);
    println!("Subdomain: {}", trust.subdomain);
    println!("Status:    {}", trust.status);
    println!("Database:  {}", backend.db.trust_database_name(trust));
    println!("Contact:   {}", or_dash(trust.contact_email.as_deref()));
    println!("Created:   {}", trust.created_at.format("%Y-%m-%d %H:%M"));
    println!("Updated:   {}", trust.updated_at.format("%Y-%m-%d %H:%M"));
}
