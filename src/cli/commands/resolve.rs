use serde_json::json;

use crate::cli::utils::*;
use crate::cli::{Backend, OutputFormat};
use crate::config::config;
use crate::tenant::{resolve_host, HostScope, TenantContext};

pub async fn handle(host: String, lookup: bool, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = config();
    let scope = resolve_host(&host, &config.tenancy)?;

    if !lookup {
        let value = match &scope {
            HostScope::System => json!({ "host": host, "scope": "system" }),
            HostScope::Trust(subdomain) => {
                json!({ "host": host, "scope": "trust", "subdomain": subdomain })
            }
        };
        return match output_format {
            OutputFormat::Json => output_json(&value),
            OutputFormat::Text => {
                match &scope {
                    HostScope::System => println!("{} -> system", host),
                    HostScope::Trust(subdomain) => println!("{} -> trust subdomain '{}'", host, subdomain),
                }
                Ok(())
            }
        };
    }

    let backend = Backend::connect(config);
    let resolved = backend.registry.resolve(&scope).await;
    backend.close().await;
    let context = resolved?;

    match output_format {
        OutputFormat::Json => output_json(&context.to_json()),
        OutputFormat::Text => {
            match &context {
                TenantContext::System => println!("{} -> system ({})", host, backend.db.system_database()),
                TenantContext::Trust(trust) => println!(
                    "{} -> {} ({}, {})",
                    host,
                    trust.trust_code,
                    trust.trust_name,
                    backend.db.trust_database_name(trust)
                ),
            }
            Ok(())
        }
    }
}
