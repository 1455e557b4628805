use chrono::Duration;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the helpdesk.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub session: SessionConfig,
    pub loans: LoanConfig,
    pub admissions: AdmissionsConfig,
    pub knowledge: KnowledgeConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let session = SessionConfig {
            timeout_minutes: parse_var("HELPDESK_SESSION_TIMEOUT_MINUTES", 15)?,
            reservation_ttl_minutes: parse_var("HELPDESK_RESERVATION_TTL_MINUTES", 15)?,
        };

        let loans = LoanConfig {
            budget: parse_var("HELPDESK_LOAN_BUDGET", 500_000.0)?,
            income_threshold: parse_var("HELPDESK_INCOME_THRESHOLD", 300_000.0)?,
        };

        let accepted_grades = match env::var("HELPDESK_ACCEPTED_GRADES") {
            Ok(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|grade| !grade.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => AdmissionsConfig::default().accepted_grades,
        };
        let tesseract_cmd =
            env::var("HELPDESK_TESSERACT_CMD").unwrap_or_else(|_| "tesseract".to_string());
        let max_upload_mb = parse_var("HELPDESK_MAX_UPLOAD_MB", DEFAULT_MAX_UPLOAD_MB)?;

        let knowledge = KnowledgeConfig {
            admissions_faq: env::var("HELPDESK_ADMISSIONS_FAQ")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("faq_data.json")),
            loan_faq: env::var("HELPDESK_LOAN_FAQ")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("loan_data.json")),
            provider: env::var("HELPDESK_LLM_PROVIDER").unwrap_or_else(|_| "cohere".to_string()),
            embedding_provider: env::var("HELPDESK_EMBEDDING_PROVIDER")
                .unwrap_or_else(|_| "local".to_string()),
            api_key: env::var("COHERE_API_KEY").ok(),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            session,
            loans,
            admissions: AdmissionsConfig {
                accepted_grades,
                tesseract_cmd,
                max_upload_mb,
            },
            knowledge,
        })
    }
}

fn parse_var<T: std::str::FromStr>(variable: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(variable) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { variable, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Inactivity and reservation windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub timeout_minutes: i64,
    pub reservation_ttl_minutes: i64,
}

impl SessionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::minutes(self.timeout_minutes)
    }

    pub fn reservation_ttl(&self) -> Duration {
        Duration::minutes(self.reservation_ttl_minutes)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: 15,
            reservation_ttl_minutes: 15,
        }
    }
}

/// Starting loan budget and the income ceiling for eligibility.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanConfig {
    pub budget: f64,
    pub income_threshold: f64,
}

impl Default for LoanConfig {
    fn default() -> Self {
        Self {
            budget: 500_000.0,
            income_threshold: 300_000.0,
        }
    }
}

/// Upload ceiling applied when `HELPDESK_MAX_UPLOAD_MB` is unset.
pub const DEFAULT_MAX_UPLOAD_MB: usize = 25;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionsConfig {
    pub accepted_grades: Vec<String>,
    pub tesseract_cmd: String,
    pub max_upload_mb: usize,
}

impl AdmissionsConfig {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for AdmissionsConfig {
    fn default() -> Self {
        Self {
            accepted_grades: ["B", "B+", "A", "A+"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            tesseract_cmd: "tesseract".to_string(),
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
        }
    }
}

/// FAQ corpora plus the answer generator and embedding backends.
#[derive(Debug, Clone)]
pub struct KnowledgeConfig {
    pub admissions_faq: PathBuf,
    pub loan_faq: PathBuf,
    /// `cohere` or `extractive`.
    pub provider: String,
    /// `local` (hashing, offline) or `cohere`.
    pub embedding_provider: String,
    pub api_key: Option<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { variable: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { variable, value } => {
                write!(f, "{variable} has an invalid value '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidValue { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "HELPDESK_SESSION_TIMEOUT_MINUTES",
            "HELPDESK_RESERVATION_TTL_MINUTES",
            "HELPDESK_LOAN_BUDGET",
            "HELPDESK_INCOME_THRESHOLD",
            "HELPDESK_ACCEPTED_GRADES",
            "HELPDESK_ADMISSIONS_FAQ",
            "HELPDESK_LOAN_FAQ",
            "HELPDESK_TESSERACT_CMD",
            "HELPDESK_MAX_UPLOAD_MB",
            "HELPDESK_EMBEDDING_PROVIDER",
            "HELPDESK_LLM_PROVIDER",
            "COHERE_API_KEY",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.session.timeout(), Duration::minutes(15));
        assert_eq!(config.loans, LoanConfig::default());
        assert_eq!(config.admissions.accepted_grades, ["B", "B+", "A", "A+"]);
        assert_eq!(config.admissions.max_upload_bytes(), 25 * 1024 * 1024);
        assert_eq!(config.knowledge.provider, "cohere");
        assert_eq!(config.knowledge.embedding_provider, "local");
        assert!(config.knowledge.api_key.is_none());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reads_loan_and_grade_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("HELPDESK_LOAN_BUDGET", "750000");
        env::set_var("HELPDESK_ACCEPTED_GRADES", "A, A+ ,");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.loans.budget, 750_000.0);
        assert_eq!(config.admissions.accepted_grades, ["A", "A+"]);
        reset_env();
    }

    #[test]
    fn reads_upload_limit_and_embedding_provider() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("HELPDESK_MAX_UPLOAD_MB", "40");
        env::set_var("HELPDESK_EMBEDDING_PROVIDER", "cohere");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.admissions.max_upload_bytes(), 40 * 1024 * 1024);
        assert_eq!(config.knowledge.embedding_provider, "cohere");
        reset_env();
    }

    #[test]
    fn rejects_non_numeric_timeout() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("HELPDESK_SESSION_TIMEOUT_MINUTES", "soon");
        let err = AppConfig::load().expect_err("timeout must be numeric");
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                variable: "HELPDESK_SESSION_TIMEOUT_MINUTES",
                ..
            }
        ));
        reset_env();
    }
}
