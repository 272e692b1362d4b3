use anyhow::anyhow;
use clap::Subcommand;
use serde_json::json;

use crate::auth::{generate_token, Claims, Role, TokenScope};
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::config::config;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Mint a signed access token")]
    Issue {
        #[arg(long, help = "`system`, `trust:<code>` or a bare trust code")]
        scope: TokenScope,
        #[arg(long, help = "SYSTEM_ADMIN, TRUST_ADMIN or STAFF")]
        role: Role,
        #[arg(long, help = "Subject recorded in the token (e.g. an email)")]
        sub: String,
        #[arg(long, help = "Lifetime in hours (defaults to SECURITY_JWT_EXPIRY_HOURS)")]
        hours: Option<i64>,
    },
}

pub async fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TokenCommands::Issue { scope, role, sub, hours } => {
            if role == Role::SystemAdmin && scope != TokenScope::System {
                return Err(anyhow!("SYSTEM_ADMIN tokens must use the system scope"));
            }

            let security = &config().security;
            let claims = match hours {
                Some(hours) if hours <= 0 => return Err(anyhow!("--hours must be positive")),
                Some(hours) => Claims::with_expiry(sub, scope, role, security, hours)?,
                None => Claims::new(sub, scope, role, security)?,
            };
            let token = generate_token(&claims, security)?;

            match output_format {
                OutputFormat::Json => output_json(&json!({
                    "token": token,
                    "claims": claims,
                })),
                OutputFormat::Text => {
                    println!("{}", token);
                    Ok(())
                }
            }
        }
    }
}
