use std::env;
use std::time::Duration;

use crate::board::NewDeliveryDetection;
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub backend_url: String,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub new_delivery_alert: Duration,
    pub new_delivery_detection: NewDeliveryDetection,
    pub page_size: usize,
    pub price_top_tier: u32,
    pub map_api_url: String,
    pub map_api_key: String,
    pub event_buffer_size: usize,
    pub static_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let page_size = positive(&lookup, "PAGE_SIZE", 10usize)?;
        let poll_interval_ms = positive(&lookup, "POLL_INTERVAL_MS", 3_000u64)?;
        let event_buffer_size = positive(&lookup, "EVENT_BUFFER_SIZE", 1024usize)?;

        Ok(Self {
            http_port: parse_or_default(&lookup, "HTTP_PORT", 3000)?,
            log_level: text("LOG_LEVEL", "info"),
            backend_url: text("BACKEND_URL", "http://localhost:5000"),
            request_timeout: Duration::from_millis(parse_or_default(
                &lookup,
                "REQUEST_TIMEOUT_MS",
                10_000,
            )?),
            poll_interval: Duration::from_millis(poll_interval_ms),
            new_delivery_alert: Duration::from_millis(parse_or_default(
                &lookup,
                "NEW_DELIVERY_ALERT_MS",
                5_000,
            )?),
            new_delivery_detection: parse_or_default(
                &lookup,
                "NEW_DELIVERY_DETECTION",
                NewDeliveryDetection::IdDiff,
            )?,
            page_size,
            price_top_tier: parse_or_default(&lookup, "PRICE_TOP_TIER", 500)?,
            map_api_url: text("MAP_API_URL", "https://mapapi.gebeta.app"),
            map_api_key: text("MAP_API_KEY", ""),
            event_buffer_size,
            static_dir: text("STATIC_DIR", "static"),
        })
    }
}

fn parse_or_default<T, F>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        None => Ok(default),
    }
}

fn positive<T, F>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr + Default + PartialEq,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or_default(lookup, key, default)?;
    if value == T::default() {
        return Err(AppError::Internal(format!("invalid {key}: must be > 0")));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::Config;
    use crate::error::AppError;

    fn load(vars: &[(&str, &str)]) -> Result<Config, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    fn rejected(key: &str) {
        match load(&[(key, "0")]) {
            Err(AppError::Internal(msg)) => assert!(msg.contains(key), "{msg}"),
            other => panic!("{key}=0 accepted: {other:?}"),
        }
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.http_port, 3000);
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!(config.new_delivery_alert, Duration::from_secs(5));
        assert_eq!(config.page_size, 10);
        assert_eq!(config.event_buffer_size, 1024);
        assert_eq!(config.backend_url, "http://localhost:5000");
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        rejected("POLL_INTERVAL_MS");
    }

    #[test]
    fn zero_event_buffer_is_rejected() {
        rejected("EVENT_BUFFER_SIZE");
    }

    #[test]
    fn zero_page_size_is_rejected() {
        rejected("PAGE_SIZE");
    }

    #[test]
    fn unparsable_value_names_its_key() {
        match load(&[("HTTP_PORT", "eighty")]) {
            Err(AppError::Internal(msg)) => assert!(msg.starts_with("invalid HTTP_PORT")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = load(&[("POLL_INTERVAL_MS", "500"), ("PAGE_SIZE", "25")]).unwrap();
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.page_size, 25);
    }
}
