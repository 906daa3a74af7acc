use anyhow::{anyhow, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use crate::common::utils::MAX_LOOKBACK_DAYS;

const DEFAULT_LLM_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_SESSION_FILE: &str = "freelance_parser.session";
const DEFAULT_CHATS_CONFIG: &str = "config/chats.yaml";

/// Application configuration loaded from environment variables.
///
/// Only `DATABASE_URL` is required for every process. Process-specific
/// secrets are optional here and checked by the accessor the process calls
/// (`bot_token()`, `telegram_api()`, `llm_api_key()`).
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub bot_token: Option<String>,
    pub admin_ids: Vec<i64>,
    pub telegram_api_id: Option<i32>,
    pub telegram_api_hash: Option<String>,
    pub telegram_phone: Option<String>,
    pub telegram_session_file: PathBuf,
    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
    pub chats_config_path: PathBuf,
    pub parser: ParserSettings,
}

/// Tunables for the parse pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ParserSettings {
    pub parse_interval_hours: u64,
    pub request_delay: Duration,
    pub messages_ttl_days: i64,
    pub batch_size: usize,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            parse_interval_hours: 2,
            request_delay: Duration::from_millis(1500),
            messages_ttl_days: 30,
            batch_size: 50,
        }
    }
}

/// Userbot application credentials.
#[derive(Debug, Clone)]
pub struct TelegramApi<'a> {
    pub api_id: i32,
    pub api_hash: &'a str,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let defaults = ParserSettings::default();

        let parse_interval_hours: u64 = parse_var("PARSE_INTERVAL_HOURS", defaults.parse_interval_hours)?;
        if parse_interval_hours == 0 {
            return Err(anyhow!("PARSE_INTERVAL_HOURS must be greater than 0"));
        }

        let request_delay_sec: f64 = parse_var("REQUEST_DELAY_SEC", 1.5)?;
        if !request_delay_sec.is_finite() || request_delay_sec < 0.0 {
            return Err(anyhow!("REQUEST_DELAY_SEC must be a non-negative number"));
        }

        let batch_size: usize = parse_var("BATCH_SIZE", defaults.batch_size)?;
        if batch_size == 0 {
            return Err(anyhow!("BATCH_SIZE must be greater than 0"));
        }

        let messages_ttl_days = in_range(
            "MESSAGES_TTL_DAYS",
            parse_var("MESSAGES_TTL_DAYS", defaults.messages_ttl_days)?,
            1..=MAX_LOOKBACK_DAYS,
        )?;

        Ok(Self {
            database_url: normalize_database_url(
                &env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            ),
            bot_token: non_empty_var("BOT_TOKEN"),
            admin_ids: parse_admin_ids(&env::var("ADMIN_IDS").unwrap_or_default())
                .context("ADMIN_IDS must be a comma-separated list of integers")?,
            telegram_api_id: env::var("TELEGRAM_API_ID")
                .ok()
                .map(|v| v.trim().parse())
                .transpose()
                .context("TELEGRAM_API_ID must be a valid integer")?,
            telegram_api_hash: non_empty_var("TELEGRAM_API_HASH"),
            telegram_phone: non_empty_var("TELEGRAM_PHONE"),
            telegram_session_file: env::var("TELEGRAM_SESSION_FILE")
                .unwrap_or_else(|_| DEFAULT_SESSION_FILE.to_string())
                .into(),
            llm_api_key: non_empty_var("LLM_API_KEY").or_else(|| non_empty_var("GEMINI_API_KEY")),
            llm_base_url: env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| openai_client::GEMINI_BASE_URL.to_string()),
            llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string()),
            chats_config_path: env::var("CHATS_CONFIG")
                .unwrap_or_else(|_| DEFAULT_CHATS_CONFIG.to_string())
                .into(),
            parser: ParserSettings {
                parse_interval_hours,
                request_delay: Duration::from_secs_f64(request_delay_sec),
                messages_ttl_days,
                batch_size,
            },
        })
    }

    pub fn bot_token(&self) -> Result<&str> {
        self.bot_token
            .as_deref()
            .context("BOT_TOKEN must be set")
    }

    pub fn telegram_api(&self) -> Result<TelegramApi<'_>> {
        Ok(TelegramApi {
            api_id: self.telegram_api_id.context("TELEGRAM_API_ID must be set")?,
            api_hash: self
                .telegram_api_hash
                .as_deref()
                .context("TELEGRAM_API_HASH must be set")?,
        })
    }

    pub fn llm_api_key(&self) -> Result<&str> {
        self.llm_api_key
            .as_deref()
            .context("LLM_API_KEY (or GEMINI_API_KEY) must be set")
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn redact(v: &Option<String>) -> &'static str {
            if v.is_some() {
                "<set>"
            } else {
                "<unset>"
            }
        }

        f.debug_struct("Config")
            .field("database_url", &"<redacted>")
            .field("bot_token", &redact(&self.bot_token))
            .field("admin_ids", &self.admin_ids)
            .field("telegram_api_id", &self.telegram_api_id)
            .field("telegram_api_hash", &redact(&self.telegram_api_hash))
            .field("telegram_session_file", &self.telegram_session_file)
            .field("llm_api_key", &redact(&self.llm_api_key))
            .field("llm_base_url", &self.llm_base_url)
            .field("llm_model", &self.llm_model)
            .field("chats_config_path", &self.chats_config_path)
            .field("parser", &self.parser)
            .finish()
    }
}

/// Parse `ADMIN_IDS` from a comma-separated string. Blank input means no admins.
pub fn parse_admin_ids(raw: &str) -> Result<Vec<i64>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .with_context(|| format!("invalid admin id: {:?}", s))
        })
        .collect()
}

/// Accept SQLAlchemy-style async driver URLs as plain Postgres URLs.
pub fn normalize_database_url(url: &str) -> String {
    for prefix in ["postgresql+asyncpg://", "postgres+asyncpg://"] {
        if let Some(rest) = url.strip_prefix(prefix) {
            return format!("postgresql://{}", rest);
        }
    }
    url.to_string()
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn in_range(key: &str, value: i64, range: RangeInclusive<i64>) -> Result<i64> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(anyhow!(
            "{} must be between {} and {}, got {}",
            key,
            range.start(),
            range.end(),
            value
        ))
    }
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number", key)),
        _ => Ok(default),
    }
}
