use std::time::Duration;

use serde::Deserialize;

const DEV_JWT_SECRET: &str = "mellowmind-dev-secret";

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub idle_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Number of previous turns sent along with a new message.
    pub history_turns: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub ai: AiConfig,
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = match std::env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => format!(
                "postgres://{}:{}@{}:{}/{}",
                env_or("DB_USER", "mellow_user"),
                env_or("DB_PASSWORD", "mellow_password"),
                env_or("DB_HOST", "localhost"),
                env_parse("DB_PORT", 5432u16),
                env_or("DB_NAME", "mellow_db"),
            ),
        };
        let database = DatabaseConfig {
            url: database_url,
            max_connections: env_parse("DB_MAX_CONNECTIONS", 20),
            idle_timeout_secs: env_parse("DB_IDLE_TIMEOUT_SECS", 30),
            connect_timeout_secs: env_parse("DB_CONNECT_TIMEOUT_SECS", 2),
        };

        let secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set; using development secret");
            DEV_JWT_SECRET.into()
        });
        let expires_in = env_or("JWT_EXPIRES_IN", "24h");
        let ttl = parse_duration(&expires_in)
            .ok_or_else(|| anyhow::anyhow!("invalid JWT_EXPIRES_IN: {expires_in}"))?;
        let jwt = JwtConfig {
            secret,
            issuer: env_or("JWT_ISSUER", "mellowmind"),
            audience: env_or("JWT_AUDIENCE", "mellowmind-users"),
            ttl_secs: ttl.as_secs().max(1),
        };

        let ai = AiConfig {
            base_url: env_or("PYTHON_AI_URL", "http://localhost:8000")
                .trim_end_matches('/')
                .to_string(),
            timeout_secs: env_parse("AI_TIMEOUT_SECS", 30),
            history_turns: env_parse("CHAT_HISTORY_TURNS", 5),
        };

        let port = std::env::var("PORT")
            .or_else(|_| std::env::var("APP_PORT"))
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(3000);

        Ok(Self {
            database,
            jwt,
            ai,
            host: env_or("APP_HOST", "0.0.0.0"),
            port,
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", 60),
        })
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.database.idle_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.database.connect_timeout_secs)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Parses `"90"`, `"30s"`, `"15m"`, `"24h"` or `"7d"`.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let (digits, unit) = match raw.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&raw[..idx], Some(c)),
        _ => (raw, None),
    };
    let value: u64 = digits.parse().ok()?;
    let secs = match unit {
        None | Some('s') => value,
        Some('m') => value.checked_mul(60)?,
        Some('h') => value.checked_mul(60 * 60)?,
        Some('d') => value.checked_mul(24 * 60 * 60)?,
        Some(_) => return None,
    };
    Some(Duration::from_secs(secs))
}
