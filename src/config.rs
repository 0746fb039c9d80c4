use std::env;
use std::net::SocketAddr;

use crate::error::AppError;
use crate::persistence::RemoteConfig;

const DEFAULT_DATABASE_URL: &str = "sqlite://attendance.db?mode=rwc";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub remote: Option<RemoteConfig>,
    pub bind_addr: SocketAddr,
    pub seed_defaults: bool,
}

impl AppConfig {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick
    /// up a `.env` file.
    pub fn new_from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let remote = lookup("REMOTE_API_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .map(|base_url| RemoteConfig { base_url });

        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .parse::<SocketAddr>()
            .map_err(|e| AppError::Config(format!("BIND_ADDR {:?} is invalid: {}", bind_addr, e)))?;

        let seed_defaults = match lookup("SEED_DEFAULTS") {
            None => true,
            Some(value) => parse_flag(&value)
                .ok_or_else(|| AppError::Config(format!("SEED_DEFAULTS {:?} is not a boolean", value)))?,
        };

        Ok(Self {
            database_url,
            remote,
            bind_addr,
            seed_defaults,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert!(config.remote.is_none());
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert!(config.seed_defaults);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("REMOTE_API_URL", "http://localhost:3000/api"),
            ("BIND_ADDR", "0.0.0.0:9000"),
            ("SEED_DEFAULTS", "false"),
        ])
        .unwrap();
        assert_eq!(config.remote.unwrap().base_url, "http://localhost:3000/api");
        assert_eq!(config.bind_addr.port(), 9000);
        assert!(!config.seed_defaults);
    }

    #[test]
    fn test_blank_remote_url_means_no_remote() {
        let config = config_from(&[("REMOTE_API_URL", "  ")]).unwrap();
        assert!(config.remote.is_none());
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        assert!(matches!(
            config_from(&[("BIND_ADDR", "localhost")]),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            config_from(&[("SEED_DEFAULTS", "maybe")]),
            Err(AppError::Config(_))
        ));
    }
}
