use crate::error::{Result, SyncError};
use crate::sync::ReconnectPolicy;
use std::env;
use std::time::Duration;
use url::Url;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Upstream REST API configuration
    pub api: ApiConfig,
    /// Push channel configuration
    pub channel: ChannelConfig,
    /// Observed view configuration
    pub view: ViewConfig,
    /// Logging configuration
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// API base URL (default: http://localhost:8080/api/v1)
    pub base_url: Url,
    /// Request timeout in seconds
    pub request_timeout: u64,
}

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Push channel address, ws(s)://<host>:<port>/ws
    pub url: String,
    /// First reconnect delay in milliseconds
    pub reconnect_base_delay_ms: u64,
    /// Upper bound for reconnect delays in milliseconds
    pub reconnect_max_delay_ms: u64,
    /// Consecutive failed reconnects before giving up
    pub max_reconnect_attempts: u32,
}

#[derive(Debug, Clone)]
pub struct ViewConfig {
    /// Shareable view link carrying `from`/`to`
    pub location: Url,
    /// How often a live range slides forward, in seconds
    pub live_tick_secs: u64,
    /// Job followed by the detail view, if any
    pub job_id: Option<u64>,
    /// Executions requested for the detail view
    pub job_history_limit: usize,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let base_url = Url::parse(&get_env_or("MOOGIE_API_URL", "http://localhost:8080/api/v1"))
            .map_err(|e| {
                SyncError::InvalidConfig(format!("MOOGIE_API_URL must be a valid URL: {}", e))
            })?;

        let channel_url = match env::var("MOOGIE_WS_URL") {
            Ok(raw) if !raw.trim().is_empty() => parse_channel_url(raw.trim())?,
            _ => derive_channel_url(&base_url)?,
        };

        Ok(Config {
            api: ApiConfig {
                base_url,
                request_timeout: get_env_or("MOOGIE_API_TIMEOUT", "10")
                    .parse()
                    .unwrap_or(10),
            },
            channel: ChannelConfig {
                url: channel_url,
                reconnect_base_delay_ms: parse_env("MOOGIE_RECONNECT_BASE_MS", "1000")?,
                reconnect_max_delay_ms: parse_env("MOOGIE_RECONNECT_MAX_MS", "30000")?,
                max_reconnect_attempts: parse_env("MOOGIE_RECONNECT_MAX_ATTEMPTS", "5")?,
            },
            view: ViewConfig {
                location: Url::parse(&get_env_or("MOOGIE_VIEW_URL", "http://localhost:3000/"))
                    .map_err(|e| {
                        SyncError::InvalidConfig(format!(
                            "MOOGIE_VIEW_URL must be a valid URL: {}",
                            e
                        ))
                    })?,
                live_tick_secs: get_env_or("MOOGIE_LIVE_TICK_SECS", "30")
                    .parse::<u64>()
                    .unwrap_or(30)
                    .max(1),
                job_id: match env::var("MOOGIE_JOB_ID") {
                    Ok(raw) if !raw.trim().is_empty() => Some(raw.trim().parse().map_err(|_| {
                        SyncError::InvalidConfig("MOOGIE_JOB_ID must be a job id".into())
                    })?),
                    _ => None,
                },
                job_history_limit: get_env_or("MOOGIE_JOB_HISTORY_LIMIT", "100")
                    .parse::<usize>()
                    .unwrap_or(100)
                    .max(1),
            },
            log: LogConfig {
                level: get_env_or("LOG_LEVEL", "info"),
                format: get_env_or("LOG_FORMAT", "pretty"),
            },
        })
    }
}

impl ChannelConfig {
    /// Reconnect policy described by this configuration
    pub fn policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            base_delay: Duration::from_millis(self.reconnect_base_delay_ms),
            max_delay: Duration::from_millis(self.reconnect_max_delay_ms),
            max_attempts: self.max_reconnect_attempts,
        }
    }
}

/// Derive `ws(s)://<host>:<port>/ws` from the API base URL
pub fn derive_channel_url(api: &Url) -> Result<String> {
    let scheme = match api.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => {
            return Err(SyncError::InvalidConfig(format!(
                "MOOGIE_API_URL has unsupported scheme: {}",
                other
            )))
        }
    };

    let host = api
        .host_str()
        .ok_or_else(|| SyncError::InvalidConfig("MOOGIE_API_URL must include a host".into()))?;
    let port = api
        .port_or_known_default()
        .ok_or_else(|| SyncError::InvalidConfig("MOOGIE_API_URL must include a port".into()))?;

    Ok(format!("{}://{}:{}/ws", scheme, host, port))
}

fn parse_channel_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw).map_err(|e| {
        SyncError::InvalidConfig(format!("MOOGIE_WS_URL must be a valid URL: {}", e))
    })?;

    match url.scheme() {
        "ws" | "wss" => Ok(url.to_string()),
        other => Err(SyncError::InvalidConfig(format!(
            "MOOGIE_WS_URL has unsupported scheme: {}",
            other
        ))),
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: &str) -> Result<T> {
    get_env_or(key, default)
        .trim()
        .parse()
        .map_err(|_| SyncError::InvalidConfig(format!("{} must be a valid number", key)))
}

/// Get environment variable with a default value
fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const CONFIG_ENV_KEYS: &[&str] = &[
        "MOOGIE_API_URL",
        "MOOGIE_API_TIMEOUT",
        "MOOGIE_WS_URL",
        "MOOGIE_RECONNECT_BASE_MS",
        "MOOGIE_RECONNECT_MAX_MS",
        "MOOGIE_RECONNECT_MAX_ATTEMPTS",
        "MOOGIE_VIEW_URL",
        "MOOGIE_LIVE_TICK_SECS",
        "MOOGIE_JOB_ID",
        "MOOGIE_JOB_HISTORY_LIMIT",
        "LOG_LEVEL",
        "LOG_FORMAT",
    ];

    struct EnvGuard {
        saved: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new(keys: &[&str]) -> Self {
            let saved = keys
                .iter()
                .map(|&key| {
                    let old = env::var(key).ok();
                    env::remove_var(key);
                    (key.to_string(), old)
                })
                .collect();

            Self { saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.saved.drain(..) {
                match value {
                    Some(v) => env::set_var(key, v),
                    None => env::remove_var(key),
                }
            }
        }
    }

    #[test]
    fn test_config_from_env_defaults() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        let config = Config::from_env().unwrap();

        assert_eq!(config.api.base_url.as_str(), "http://localhost:8080/api/v1");
        assert_eq!(config.api.request_timeout, 10);
        assert_eq!(config.channel.url, "ws://localhost:8080/ws");
        assert_eq!(config.channel.policy(), ReconnectPolicy::default());
        assert_eq!(config.view.live_tick_secs, 30);
        assert_eq!(config.view.job_id, None);
        assert_eq!(config.view.job_history_limit, 100);
        assert_eq!(config.log.format, "pretty");
    }

    #[test]
    fn test_config_from_env_overrides() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        env::set_var("MOOGIE_API_URL", "https://monitor.example/api/v1");
        env::set_var("MOOGIE_RECONNECT_BASE_MS", "250");
        env::set_var("MOOGIE_RECONNECT_MAX_ATTEMPTS", "8");
        env::set_var("MOOGIE_JOB_ID", "42");
        env::set_var("LOG_FORMAT", "json");

        let config = Config::from_env().unwrap();

        assert_eq!(config.channel.url, "wss://monitor.example:443/ws");
        assert_eq!(
            config.channel.policy().base_delay,
            Duration::from_millis(250)
        );
        assert_eq!(config.channel.policy().max_attempts, 8);
        assert_eq!(config.view.job_id, Some(42));
        assert_eq!(config.log.format, "json");
    }

    #[test]
    fn test_config_explicit_channel_url() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        env::set_var("MOOGIE_WS_URL", "ws://push.example:9000/ws");
        let config = Config::from_env().unwrap();
        assert_eq!(config.channel.url, "ws://push.example:9000/ws");

        env::set_var("MOOGIE_WS_URL", "http://push.example/ws");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, SyncError::InvalidConfig(_)));
    }

    #[test]
    fn test_config_from_env_invalid_values() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvGuard::new(CONFIG_ENV_KEYS);

        env::set_var("MOOGIE_RECONNECT_MAX_ATTEMPTS", "many");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, SyncError::InvalidConfig(_)));

        env::remove_var("MOOGIE_RECONNECT_MAX_ATTEMPTS");
        env::set_var("MOOGIE_API_URL", "not a url");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, SyncError::InvalidConfig(_)));

        env::remove_var("MOOGIE_API_URL");
        env::set_var("MOOGIE_JOB_ID", "abc");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, SyncError::InvalidConfig(_)));
    }

    #[test]
    fn test_derive_channel_url() {
        let url = Url::parse("http://10.0.0.5:8080/api/v1").unwrap();
        assert_eq!(derive_channel_url(&url).unwrap(), "ws://10.0.0.5:8080/ws");

        let url = Url::parse("http://localhost/api/v1").unwrap();
        assert_eq!(derive_channel_url(&url).unwrap(), "ws://localhost:80/ws");

        let url = Url::parse("ftp://localhost/api").unwrap();
        assert!(derive_channel_url(&url).is_err());
    }
}
