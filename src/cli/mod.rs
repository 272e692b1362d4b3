pub mod commands;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::database::{DatabaseManager, MySqlTrustStore, TrustStore};
use crate::services::TrustService;
use crate::tenant::TrustRegistry;

#[derive(Parser)]
#[command(name = "erp")]
#[command(about = "School ERP operator CLI - trust registry, databases and tokens")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Trust registry management")]
    Trust {
        #[command(subcommand)]
        cmd: commands::trust::TrustCommands,
    },

    #[command(about = "Database connectivity and schema inventory")]
    Db {
        #[command(subcommand)]
        cmd: commands::db::DbCommands,
    },

    #[command(about = "Show which tenant a host name resolves to")]
    Resolve {
        #[arg(help = "Host name, optionally with port (e.g. demo.localhost:3000)")]
        host: String,
        #[arg(long, help = "Also look the trust up in the registry")]
        lookup: bool,
    },

    #[command(about = "Access token management")]
    Token {
        #[command(subcommand)]
        cmd: commands::token::TokenCommands,
    },

    #[command(about = "Running server checks")]
    Server {
        #[command(subcommand)]
        cmd: commands::server::ServerCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Services the database-backed commands share
pub struct Backend {
    pub db: Arc<DatabaseManager>,
    pub registry: Arc<TrustRegistry>,
    pub trusts: TrustService,
}

impl Backend {
    /// Registry lookups are never cached: every command sees the live table
    pub fn connect(config: &AppConfig) -> Self {
        let db = Arc::new(DatabaseManager::new(config.database.clone()));
        let store: Arc<dyn TrustStore> = Arc::new(MySqlTrustStore::new(db.clone()));
        let registry = Arc::new(TrustRegistry::new(store, Duration::ZERO));
        let trusts = TrustService::new(db.clone(), registry.clone());

        Self { db, registry, trusts }
    }

    pub async fn close(&self) {
        self.db.close_all().await;
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Trust { cmd } => commands::trust::handle(cmd, output_format).await,
        Commands::Db { cmd } => commands::db::handle(cmd, output_format).await,
        Commands::Resolve { host, lookup } => commands::resolve::handle(host, lookup, output_format).await,
        Commands::Token { cmd } => commands::token::handle(cmd, output_format).await,
        Commands::Server { cmd } => commands::server::handle(cmd, output_format).await,
    }
}
