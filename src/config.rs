use std::env;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug, Default)]
pub struct FawrySettings {
    pub merchant_code: Option<String>,
    pub secure_key: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct PaymobSettings {
    pub hmac_secret: Option<String>,
}

/// Bounded retry for the conditional payment update.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`, doubling from `base_backoff`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.base_backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

#[derive(Clone, Debug)]
pub struct RateLimitSettings {
    pub per_millisecond: u64,
    pub burst: u32,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub frontend_origin: String,
    pub fawry: FawrySettings,
    pub paymob: PaymobSettings,
    pub retry: RetryPolicy,
    pub rate_limit: RateLimitSettings,
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok(); // Load .env file

        let database_url = optional("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let bind_addr = parsed("BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3000)))?;

        let frontend_origin =
            optional("FRONTEND_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        let max_attempts = parsed("PAYMENT_UPDATE_MAX_ATTEMPTS", 3u32)?;
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "PAYMENT_UPDATE_MAX_ATTEMPTS",
                value: "0".to_string(),
            });
        }
        let backoff_ms = parsed("PAYMENT_UPDATE_BACKOFF_MS", 100u64)?;

        Ok(Config {
            database_url,
            bind_addr,
            frontend_origin,
            fawry: FawrySettings {
                merchant_code: optional("FAWRY_MERCHANT_CODE"),
                secure_key: optional("FAWRY_SECURE_KEY"),
            },
            paymob: PaymobSettings {
                hmac_secret: optional("PAYMOB_HMAC_SECRET"),
            },
            retry: RetryPolicy {
                max_attempts,
                base_backoff: Duration::from_millis(backoff_ms),
            },
            rate_limit: RateLimitSettings {
                // Default: 200ms/token (~5 req/sec)
                per_millisecond: parsed("RATE_LIMITER_MILLISECONDS", 200u64)?,
                burst: parsed("RATE_LIMITER_BURST", 20u32)?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-wide.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for name in [
            "DATABASE_URL",
            "BIND_ADDR",
            "FRONTEND_ORIGIN",
            "FAWRY_MERCHANT_CODE",
            "FAWRY_SECURE_KEY",
            "PAYMOB_HMAC_SECRET",
            "PAYMENT_UPDATE_MAX_ATTEMPTS",
            "PAYMENT_UPDATE_BACKOFF_MS",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn missing_secrets_stay_unset_instead_of_failing_startup() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("DATABASE_URL", "postgres://localhost/billing");

        let config = Config::from_env().expect("config should load");
        assert!(config.fawry.secure_key.is_none());
        assert!(config.paymob.hmac_secret.is_none());
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.bind_addr.port(), 3000);
    }

    #[test]
    fn blank_secret_counts_as_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("DATABASE_URL", "postgres://localhost/billing");
        env::set_var("PAYMOB_HMAC_SECRET", "   ");

        let config = Config::from_env().unwrap();
        assert!(config.paymob.hmac_secret.is_none());
    }

    #[test]
    fn invalid_retry_setting_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("DATABASE_URL", "postgres://localhost/billing");
        env::set_var("PAYMENT_UPDATE_MAX_ATTEMPTS", "lots");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "PAYMENT_UPDATE_MAX_ATTEMPTS",
                ..
            }
        ));
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_backoff: Duration::from_millis(50),
        };
        assert_eq!(policy.backoff_for(1), Duration::from_millis(50));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(200));
    }
}
