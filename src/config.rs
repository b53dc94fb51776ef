// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Every knob has a default matching WHOOP's published limits, so a local
//! run only needs credentials (or `UPSTREAM_MODE=mock`).

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Default WHOOP developer API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.prod.whoop.com/developer";
/// Default WHOOP OAuth2 token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://api.prod.whoop.com/oauth/oauth2/token";
/// WHOOP caps collection pages at 25 records.
pub const DEFAULT_PAGE_LIMIT: u32 = 25;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub upstream: UpstreamConfig,
    pub http: HttpConfig,
    pub resilience: ResilienceConfig,
    pub sync: SyncConfig,
    pub token_mode: TokenMode,
    pub upstream_mode: UpstreamMode,
    /// Access token served by `TokenMode::Static`.
    pub static_access_token: Option<String>,
    /// Path of the encrypted credential file.
    pub credentials_path: String,
    /// Base64-encoded 32-byte AES-256 key for the credential file.
    pub credentials_key: Option<String>,
    /// Ops server port
    pub port: u16,
    /// Shared secret for `POST /sync/run`; the endpoint is closed when unset.
    pub admin_token: Option<String>,
}

/// WHOOP endpoint and OAuth client settings.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub page_limit: u32,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

/// Policies applied around every outbound WHOOP call.
#[derive(Debug, Clone, Default)]
pub struct ResilienceConfig {
    pub rate_limit: RateLimitConfig,
    pub retry: RetryConfig,
    pub circuit_breaker: CircuitBreakerConfig,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Permits per refresh period (kept below WHOOP's 100/min ceiling).
    pub permits: u32,
    pub period: Duration,
    /// How long a call may wait for a permit.
    pub timeout: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            permits: 90,
            period: Duration::from_secs(60),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_wait: Duration,
    pub multiplier: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_wait: Duration::from_secs(2),
            multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub window_size: usize,
    pub min_calls: usize,
    /// Failure rate (percent) at which the circuit opens.
    pub failure_threshold_percent: u8,
    pub open_wait: Duration,
    pub half_open_trials: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            min_calls: 5,
            failure_threshold_percent: 50,
            open_wait: Duration::from_secs(30),
            half_open_trials: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub interval: Duration,
    /// Run one sync immediately instead of waiting a full interval.
    pub run_on_startup: bool,
}

/// Which `TokenProvider` implementation to construct at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenMode {
    /// Stored OAuth token with refresh.
    OAuth,
    /// Fixed token from `STATIC_ACCESS_TOKEN`, never refreshed.
    Static,
}

/// Where pages come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamMode {
    Live,
    /// Deterministic synthetic data, no network.
    Mock,
}

impl FromStr for TokenMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "oauth" => Ok(TokenMode::OAuth),
            "static" => Ok(TokenMode::Static),
            _ => Err(()),
        }
    }
}

impl FromStr for UpstreamMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(UpstreamMode::Live),
            "mock" => Ok(UpstreamMode::Mock),
            _ => Err(()),
        }
    }
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            upstream: UpstreamConfig {
                base_url: "http://127.0.0.1:9".to_string(),
                token_url: "http://127.0.0.1:9/oauth/oauth2/token".to_string(),
                client_id: "test_client_id".to_string(),
                client_secret: "test_secret".to_string(),
                page_limit: DEFAULT_PAGE_LIMIT,
            },
            http: HttpConfig {
                connect_timeout: Duration::from_secs(10),
                read_timeout: Duration::from_secs(30),
            },
            resilience: ResilienceConfig::default(),
            sync: SyncConfig {
                interval: Duration::from_secs(30 * 60),
                run_on_startup: false,
            },
            token_mode: TokenMode::Static,
            upstream_mode: UpstreamMode::Mock,
            static_access_token: Some("test_access_token".to_string()),
            credentials_path: "credentials.json".to_string(),
            credentials_key: None,
            port: 8080,
            admin_token: Some("test_admin_token".to_string()),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let token_mode = parse_or(&var, "TOKEN_MODE", TokenMode::OAuth)?;
        let upstream_mode = parse_or(&var, "UPSTREAM_MODE", UpstreamMode::Live)?;
        let needs_oauth_client = token_mode == TokenMode::OAuth && upstream_mode == UpstreamMode::Live;

        let client_id = match var("WHOOP_CLIENT_ID") {
            Some(v) => v,
            None if needs_oauth_client => return Err(ConfigError::Missing("WHOOP_CLIENT_ID")),
            None => String::new(),
        };
        let client_secret = match var("WHOOP_CLIENT_SECRET") {
            Some(v) => v,
            None if needs_oauth_client => {
                return Err(ConfigError::Missing("WHOOP_CLIENT_SECRET"))
            }
            None => String::new(),
        };

        let static_access_token = var("STATIC_ACCESS_TOKEN");
        if token_mode == TokenMode::Static
            && upstream_mode == UpstreamMode::Live
            && static_access_token.is_none()
        {
            return Err(ConfigError::Missing("STATIC_ACCESS_TOKEN"));
        }

        let credentials_key = var("CREDENTIALS_KEY");
        if token_mode == TokenMode::OAuth && credentials_key.is_none() {
            return Err(ConfigError::Missing("CREDENTIALS_KEY"));
        }

        let page_limit: u32 = parse_or(&var, "WHOOP_PAGE_LIMIT", DEFAULT_PAGE_LIMIT)?;
        if page_limit == 0 || page_limit > DEFAULT_PAGE_LIMIT {
            return Err(ConfigError::Invalid {
                name: "WHOOP_PAGE_LIMIT",
                value: page_limit.to_string(),
            });
        }

        let defaults = ResilienceConfig::default();
        let resilience = ResilienceConfig {
            rate_limit: RateLimitConfig {
                permits: parse_or(&var, "RATE_LIMIT_PERMITS", defaults.rate_limit.permits)?,
                period: secs_or(&var, "RATE_LIMIT_PERIOD_SECS", defaults.rate_limit.period)?,
                timeout: secs_or(&var, "RATE_LIMIT_TIMEOUT_SECS", defaults.rate_limit.timeout)?,
            },
            retry: RetryConfig {
                max_attempts: parse_or(&var, "RETRY_MAX_ATTEMPTS", defaults.retry.max_attempts)?
                    .max(1),
                base_wait: secs_or(&var, "RETRY_BASE_WAIT_SECS", defaults.retry.base_wait)?,
                multiplier: parse_or(&var, "RETRY_MULTIPLIER", defaults.retry.multiplier)?,
            },
            circuit_breaker: CircuitBreakerConfig {
                window_size: parse_or(
                    &var,
                    "CB_WINDOW_SIZE",
                    defaults.circuit_breaker.window_size,
                )?
                .max(1),
                min_calls: parse_or(&var, "CB_MIN_CALLS", defaults.circuit_breaker.min_calls)?,
                failure_threshold_percent: parse_or(
                    &var,
                    "CB_FAILURE_THRESHOLD_PERCENT",
                    defaults.circuit_breaker.failure_threshold_percent,
                )?
                .min(100),
                open_wait: secs_or(
                    &var,
                    "CB_OPEN_WAIT_SECS",
                    defaults.circuit_breaker.open_wait,
                )?,
                half_open_trials: parse_or(
                    &var,
                    "CB_HALF_OPEN_TRIALS",
                    defaults.circuit_breaker.half_open_trials,
                )?
                .max(1),
            },
        };

        Ok(Self {
            upstream: UpstreamConfig {
                base_url: var("WHOOP_API_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                token_url: var("WHOOP_TOKEN_URL").unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
                client_id,
                client_secret,
                page_limit,
            },
            http: HttpConfig {
                connect_timeout: secs_or(&var, "HTTP_CONNECT_TIMEOUT_SECS", Duration::from_secs(10))?,
                read_timeout: secs_or(&var, "HTTP_READ_TIMEOUT_SECS", Duration::from_secs(30))?,
            },
            resilience,
            sync: SyncConfig {
                interval: secs_or(&var, "SYNC_INTERVAL_SECS", Duration::from_secs(30 * 60))?,
                run_on_startup: parse_or(&var, "SYNC_ON_STARTUP", true)?,
            },
            token_mode,
            upstream_mode,
            static_access_token,
            credentials_path: var("CREDENTIALS_PATH")
                .unwrap_or_else(|| "data/credentials.json".to_string()),
            credentials_key,
            port: parse_or(&var, "PORT", 8080)?,
            admin_token: var("ADMIN_TOKEN"),
        })
    }
}

fn parse_or<T, F>(var: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}

fn secs_or<F>(var: &F, name: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs: u64 = parse_or(var, name, default.as_secs())?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            name,
            value: "0".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = load(&[
            ("WHOOP_CLIENT_ID", "test_id"),
            ("WHOOP_CLIENT_SECRET", " test_secret \n"),
            ("CREDENTIALS_KEY", "a2V5"),
        ])
        .expect("Config should load");

        assert_eq!(config.upstream.client_id, "test_id");
        assert_eq!(config.upstream.client_secret, "test_secret");
        assert_eq!(config.upstream.page_limit, 25);
        assert_eq!(config.token_mode, TokenMode::OAuth);
        assert_eq!(config.upstream_mode, UpstreamMode::Live);
        assert_eq!(config.sync.interval, Duration::from_secs(1800));
        assert_eq!(config.http.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.http.read_timeout, Duration::from_secs(30));
        assert_eq!(config.resilience.rate_limit.permits, 90);
        assert_eq!(config.resilience.retry.max_attempts, 3);
        assert_eq!(config.resilience.circuit_breaker.half_open_trials, 3);
        assert_eq!(config.port, 8080);
        assert!(config.admin_token.is_none());
    }

    #[test]
    fn test_oauth_mode_requires_client_credentials() {
        let err = load(&[("CREDENTIALS_KEY", "a2V5")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("WHOOP_CLIENT_ID")));
    }

    #[test]
    fn test_mock_static_mode_needs_nothing() {
        let config = load(&[("TOKEN_MODE", "static"), ("UPSTREAM_MODE", "MOCK")]).unwrap();
        assert_eq!(config.token_mode, TokenMode::Static);
        assert_eq!(config.upstream_mode, UpstreamMode::Mock);
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let err = load(&[
            ("TOKEN_MODE", "static"),
            ("UPSTREAM_MODE", "mock"),
            ("SYNC_INTERVAL_SECS", "soon"),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "SYNC_INTERVAL_SECS",
                ..
            }
        ));

        let err = load(&[("TOKEN_MODE", "sometimes")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "TOKEN_MODE", .. }));
    }

    #[test]
    fn test_page_limit_capped_at_upstream_maximum() {
        let err = load(&[
            ("TOKEN_MODE", "static"),
            ("UPSTREAM_MODE", "mock"),
            ("WHOOP_PAGE_LIMIT", "50"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "WHOOP_PAGE_LIMIT", .. }));
    }
}
