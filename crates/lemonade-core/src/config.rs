use crate::app_config::{AppConfig, Environment, QuotaLimits};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_limit = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let value = parse_u32(var, default)?;
        if value == 0 {
            return Err(invalid(var, "must be at least 1".to_string()));
        }
        Ok(value)
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: bool| -> Result<bool, ConfigError> {
        match lookup(var) {
            Err(_) => Ok(default),
            Ok(raw) => match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                other => Err(invalid(var, format!("expected a boolean, got '{other}'"))),
            },
        }
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("LEMONADE_ENV", "development"))?;
    let bind_addr = parse_addr("LEMONADE_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("LEMONADE_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("LEMONADE_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("LEMONADE_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("LEMONADE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let openai_api_key = lookup("OPENAI_API_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty());
    let llm_base_url = or_default("LEMONADE_LLM_BASE_URL", "https://api.openai.com/v1");
    let llm_fast_model = or_default("LEMONADE_LLM_FAST_MODEL", "gpt-4o-mini");
    let llm_standard_model = or_default("LEMONADE_LLM_STANDARD_MODEL", "gpt-4o-mini");
    let llm_premium_model = or_default("LEMONADE_LLM_PREMIUM_MODEL", "gpt-4o");

    let http_timeout_secs = parse_u64("LEMONADE_HTTP_TIMEOUT_SECS", "30")?;
    let user_agent = or_default(
        "LEMONADE_USER_AGENT",
        "competitor-lemonade/0.1 (competitive-intelligence)",
    );

    let quota = QuotaLimits {
        free_daily: parse_limit("LEMONADE_FREE_DAILY_LIMIT", "5")?,
        pro_daily: parse_limit("LEMONADE_PRO_DAILY_LIMIT", "100")?,
        guest_lifetime: parse_limit("LEMONADE_GUEST_LIMIT", "1")?,
        free_tracked: parse_limit("LEMONADE_FREE_TRACKED_LIMIT", "10")?,
        pro_tracked: parse_limit("LEMONADE_PRO_TRACKED_LIMIT", "50")?,
    };

    let max_competitors = parse_usize("LEMONADE_MAX_COMPETITORS", "5")?;
    if max_competitors == 0 {
        return Err(invalid(
            "LEMONADE_MAX_COMPETITORS",
            "must be at least 1".to_string(),
        ));
    }
    let report_cache_hours = parse_u64("LEMONADE_REPORT_CACHE_HOURS", "6")?;
    let reddit_sentiment_enabled = parse_bool("LEMONADE_REDDIT_SENTIMENT_ENABLED", false)?;
    let reddit_comment_delay_ms = parse_u64("LEMONADE_REDDIT_COMMENT_DELAY_MS", "500")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        openai_api_key,
        llm_base_url,
        llm_fast_model,
        llm_standard_model,
        llm_premium_model,
        http_timeout_secs,
        user_agent,
        quota,
        max_competitors,
        report_cache_hours,
        reddit_sentiment_enabled,
        reddit_comment_delay_ms,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "LEMONADE_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
