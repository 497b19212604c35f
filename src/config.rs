use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub bitquery_api_url: String,
    pub bitquery_api_key: String,
    pub num_bins: usize,
    pub cache_ttl_minutes: i64,
    pub time_range_hours: i64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let bitquery_api_url = env_map
            .get("BITQUERY_API_URL")
            .cloned()
            .unwrap_or_else(|| "https://streaming.bitquery.io/graphql".to_string());

        let bitquery_api_key = env_map
            .get("BITQUERY_API_KEY")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("BITQUERY_API_KEY".to_string()))?;

        let num_bins = env_map
            .get("NUM_BINS")
            .map(|s| s.as_str())
            .unwrap_or("50")
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "NUM_BINS".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        let cache_ttl_minutes = env_map
            .get("CACHE_TTL_MINUTES")
            .map(|s| s.as_str())
            .unwrap_or("10")
            .parse::<i64>()
            .ok()
            .filter(|n| *n >= 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "CACHE_TTL_MINUTES".to_string(),
                    "must be a non-negative integer".to_string(),
                )
            })?;

        let time_range_hours = env_map
            .get("TIME_RANGE_HOURS")
            .map(|s| s.as_str())
            .unwrap_or("240")
            .parse::<i64>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "TIME_RANGE_HOURS".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        let request_timeout_secs = env_map
            .get("REQUEST_TIMEOUT_SECS")
            .map(|s| s.as_str())
            .unwrap_or("30")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "REQUEST_TIMEOUT_SECS".to_string(),
                    "must be a valid u64".to_string(),
                )
            })?;

        Ok(Config {
            port,
            bitquery_api_url,
            bitquery_api_key,
            num_bins,
            cache_ttl_minutes,
            time_range_hours,
            request_timeout_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("BITQUERY_API_KEY".to_string(), "test-key".to_string());
        map
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.num_bins, 50);
        assert_eq!(config.cache_ttl_minutes, 10);
        assert_eq!(config.time_range_hours, 240);
        assert_eq!(
            config.bitquery_api_url,
            "https://streaming.bitquery.io/graphql"
        );
    }

    #[test]
    fn test_missing_api_key() {
        let result = Config::from_env_map(HashMap::new());
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "BITQUERY_API_KEY"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_invalid_port() {
        let mut env_map = setup_required_env();
        env_map.insert("PORT".to_string(), "not_a_number".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PORT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_zero_bins_rejected() {
        let mut env_map = setup_required_env();
        env_map.insert("NUM_BINS".to_string(), "0".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "NUM_BINS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_overrides_applied() {
        let mut env_map = setup_required_env();
        env_map.insert("NUM_BINS".to_string(), "20".to_string());
        env_map.insert("CACHE_TTL_MINUTES".to_string(), "0".to_string());
        env_map.insert("TIME_RANGE_HOURS".to_string(), "24".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.num_bins, 20);
        assert_eq!(config.cache_ttl_minutes, 0);
        assert_eq!(config.time_range_hours, 24);
    }
}
