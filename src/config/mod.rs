use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub tenancy: TenancyConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Server URL; its path is replaced with the target database name
    pub url: Option<String>,
    pub system_database: String,
    pub trust_database_prefix: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Seconds to wait when acquiring a connection
    pub connection_timeout: u64,
    /// Seconds before an idle connection is closed
    pub idle_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenancyConfig {
    pub base_domains: Vec<String>,
    pub reserved_subdomains: Vec<String>,
    pub trust_cache_ttl_secs: u64,
    pub trust_proxy_headers: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    #[serde(skip_serializing, default)]
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_expiry_hours: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("ERP_HOST") {
            self.server.host = v;
        }
        if let Some(port) = env::var("ERP_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse().ok())
        {
            self.server.port = port;
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("ERP_SYSTEM_DB") {
            self.database.system_database = v;
        }
        if let Ok(v) = env::var("ERP_TRUST_DB_PREFIX") {
            self.database.trust_database_prefix = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_MIN_CONNECTIONS") {
            self.database.min_connections = v.parse().unwrap_or(self.database.min_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_IDLE_TIMEOUT") {
            self.database.idle_timeout = v.parse().unwrap_or(self.database.idle_timeout);
        }

        // Tenancy overrides
        if let Ok(v) = env::var("ERP_BASE_DOMAINS") {
            self.tenancy.base_domains = split_list(&v);
        }
        if let Ok(v) = env::var("ERP_RESERVED_SUBDOMAINS") {
            self.tenancy.reserved_subdomains = split_list(&v);
        }
        if let Ok(v) = env::var("ERP_TRUST_CACHE_TTL_SECS") {
            self.tenancy.trust_cache_ttl_secs = v.parse().unwrap_or(self.tenancy.trust_cache_ttl_secs);
        }
        if let Ok(v) = env::var("ERP_TRUST_PROXY_HEADERS") {
            self.tenancy.trust_proxy_headers = v.parse().unwrap_or(self.tenancy.trust_proxy_headers);
        }

        // API overrides
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = split_list(&v);
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_ISSUER") {
            self.security.jwt_issuer = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                system_database: "school_erp_system".to_string(),
                trust_database_prefix: "school_erp_trust_".to_string(),
                max_connections: 10,
                min_connections: 0,
                connection_timeout: 30,
                idle_timeout: 600,
            },
            tenancy: TenancyConfig {
                base_domains: vec!["localhost".to_string()],
                reserved_subdomains: vec!["www".to_string()],
                trust_cache_ttl_secs: 5,
                trust_proxy_headers: false,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string()],
                jwt_secret: "development-only-secret".to_string(),
                jwt_issuer: "school-erp".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                system_database: "school_erp_system".to_string(),
                trust_database_prefix: "school_erp_trust_".to_string(),
                max_connections: 20,
                min_connections: 0,
                connection_timeout: 10,
                idle_timeout: 300,
            },
            tenancy: TenancyConfig {
                base_domains: vec!["staging.example.com".to_string()],
                reserved_subdomains: vec!["www".to_string(), "admin".to_string()],
                trust_cache_ttl_secs: 30,
                trust_proxy_headers: true,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                jwt_secret: String::new(),
                jwt_issuer: "school-erp".to_string(),
                jwt_expiry_hours: 24,
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                system_database: "school_erp_system".to_string(),
                trust_database_prefix: "school_erp_trust_".to_string(),
                max_connections: 50,
                min_connections: 0,
                connection_timeout: 5,
                idle_timeout: 300,
            },
            tenancy: TenancyConfig {
                base_domains: vec!["example.com".to_string()],
                reserved_subdomains: vec!["www".to_string(), "admin".to_string()],
                trust_cache_ttl_secs: 60,
                trust_proxy_headers: true,
            },
            api: ApiConfig {
                enable_request_logging: false,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                jwt_secret: String::new(),
                jwt_issuer: "school-erp".to_string(),
                jwt_expiry_hours: 4,
            },
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

// Helper macros for common checks
#[macro_export]
macro_rules! is_development {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Development)
    };
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.tenancy.base_domains, vec!["localhost"]);
        assert_eq!(config.database.system_database, "school_erp_system");
        assert_eq!(config.database.trust_database_prefix, "school_erp_trust_");
        assert!(!config.security.jwt_secret.is_empty());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(config.tenancy.trust_proxy_headers);
        assert!(config.security.jwt_secret.is_empty());
        assert_eq!(config.database.max_connections, 50);
    }

    #[test]
    fn split_list_trims_and_lowercases() {
        assert_eq!(
            split_list(" School.Example.com, ,localhost "),
            vec!["school.example.com", "localhost"]
        );
    }

    #[test]
    fn jwt_secret_is_never_serialized() {
        let json = serde_json::to_value(AppConfig::development()).unwrap();
        assert!(json["security"].get("jwt_secret").is_none());
    }
}
