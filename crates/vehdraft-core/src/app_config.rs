use std::path::PathBuf;
use std::time::Duration;

/// Deployment environment, read from `VEHDRAFT_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Production => "production",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime settings shared by the client, the engine and the CLI.
///
/// Holds no credentials, so the derived `Debug` is safe to log.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    /// Fallback `EnvFilter` directive when `RUST_LOG` is unset.
    pub log_level: String,
    pub api_base_url: String,
    pub field_schema_path: PathBuf,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Quiet period before a field edit is sent to the server.
    pub field_sync_debounce_ms: u64,
    pub autosave_interval_secs: u64,
    /// Extra attempts for idempotent reads; writes are never retried.
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
}

impl AppConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
