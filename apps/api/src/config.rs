use anyhow::{bail, Context, Result};

/// Which collaborators back the auth provider, document store and object storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// PostgreSQL for users, sessions and documents; S3 for file bytes.
    Postgres,
    /// Everything held in process memory. Nothing survives a restart.
    Memory,
}

impl BackendKind {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(BackendKind::Postgres),
            "memory" => Ok(BackendKind::Memory),
            other => bail!("PORTAL_BACKEND must be 'postgres' or 'memory', got '{other}'"),
        }
    }
}

/// Connection settings only needed by the postgres backend.
#[derive(Debug, Clone)]
pub struct PostgresBackendConfig {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub s3_region: String,
    pub s3_public_url: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
}

/// Application configuration loaded from environment variables.
/// Fails at startup if a variable required by the selected backend is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendKind,
    pub postgres: Option<PostgresBackendConfig>,
    pub port: u16,
    pub rust_log: String,
    pub password_hash_iterations: u32,
    /// Emails that are granted the HR role when their account signs up.
    pub hr_bootstrap_emails: Vec<String>,
    /// Shared secret the identity provider's relay presents on federated
    /// sign-in. Federated sign-in is disabled when unset.
    pub federation_secret: Option<String>,
    /// Allowed CORS origins. Empty means any origin.
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let backend = BackendKind::parse(
            &std::env::var("PORTAL_BACKEND").unwrap_or_else(|_| "postgres".to_string()),
        )?;

        let postgres = match backend {
            BackendKind::Postgres => Some(PostgresBackendConfig {
                database_url: require_env("DATABASE_URL")?,
                s3_bucket: require_env("S3_BUCKET")?,
                s3_endpoint: require_env("S3_ENDPOINT")?,
                s3_region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                s3_public_url: require_env("S3_PUBLIC_URL")?,
                aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
                aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            }),
            BackendKind::Memory => None,
        };

        Ok(Config {
            backend,
            postgres,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            password_hash_iterations: std::env::var("PASSWORD_HASH_ITERATIONS")
                .unwrap_or_else(|_| "210000".to_string())
                .parse::<u32>()
                .context("PASSWORD_HASH_ITERATIONS must be a positive integer")?,
            hr_bootstrap_emails: split_list(&std::env::var("HR_BOOTSTRAP_EMAILS").unwrap_or_default())
                .map(|e| e.to_lowercase())
                .collect(),
            federation_secret: std::env::var("FEDERATION_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            cors_allowed_origins: split_list(&std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default())
                .map(str::to_string)
                .collect(),
        })
    }

    /// Whether an account with `email` starts out as HR.
    pub fn is_bootstrap_hr(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.hr_bootstrap_emails.iter().any(|e| *e == email)
    }
}

/// Comma-separated list with blanks dropped.
fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!(BackendKind::parse("postgres").unwrap(), BackendKind::Postgres);
        assert_eq!(BackendKind::parse(" Memory ").unwrap(), BackendKind::Memory);
        assert!(BackendKind::parse("firestore").is_err());
    }

    #[test]
    fn test_split_list_drops_blanks() {
        let items: Vec<&str> = split_list(" hr@corp.com, ,Boss@Corp.com ,").collect();
        assert_eq!(items, vec!["hr@corp.com", "Boss@Corp.com"]);
        assert_eq!(split_list("").count(), 0);
    }

    #[test]
    fn test_bootstrap_hr_is_case_insensitive() {
        let config = Config {
            backend: BackendKind::Memory,
            postgres: None,
            port: 0,
            rust_log: "info".to_string(),
            password_hash_iterations: 1_000,
            hr_bootstrap_emails: vec!["boss@corp.com".to_string()],
            federation_secret: None,
            cors_allowed_origins: Vec::new(),
        };
        assert!(config.is_bootstrap_hr(" Boss@Corp.com "));
        assert!(!config.is_bootstrap_hr("ann@corp.com"));
    }
}
