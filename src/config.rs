//! Application configuration (§6), parsed from environment variables the
//! same way the teacher's `AppConfig::from_env` is.

/// Default bounded-wait budget for the proxy's reader/writer lock (§4.2).
const DEFAULT_LOCK_WAIT_BUDGET_MS: u32 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub latitude: f64,
    pub longitude: f64,
    pub api_host: String,
    pub api_port: u16,
    /// Bounded try-acquire budget for the proxy's reader/writer lock.
    pub lock_wait_budget_ms: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            latitude: std::env::var("WEATHER_LATITUDE")
                .expect("WEATHER_LATITUDE must be set")
                .parse()
                .expect("WEATHER_LATITUDE must be a valid f64"),
            longitude: std::env::var("WEATHER_LONGITUDE")
                .expect("WEATHER_LONGITUDE must be set")
                .parse()
                .expect("WEATHER_LONGITUDE must be a valid f64"),
            api_host: std::env::var("WEATHER_API_HOST")
                .unwrap_or_else(|_| "api.open-meteo.com".to_string()),
            api_port: std::env::var("WEATHER_API_PORT")
                .unwrap_or_else(|_| "443".to_string())
                .parse()
                .expect("WEATHER_API_PORT must be a valid u16"),
            lock_wait_budget_ms: std::env::var("WEATHER_LOCK_WAIT_BUDGET_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_LOCK_WAIT_BUDGET_MS),
        }
    }

    pub fn lock_wait_budget(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.lock_wait_budget_ms as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        // NOTE: set_var/remove_var in tests is unsafe in multi-threaded contexts
        // (Rust may run tests in parallel). We accept the risk since cargo test
        // runs this module's tests sequentially within one test binary.
        unsafe {
            std::env::set_var("WEATHER_LATITUDE", "47.3769");
            std::env::set_var("WEATHER_LONGITUDE", "8.5417");
            std::env::remove_var("WEATHER_API_HOST");
            std::env::remove_var("WEATHER_API_PORT");
            std::env::remove_var("WEATHER_LOCK_WAIT_BUDGET_MS");
        }

        let config = AppConfig::from_env();

        assert_eq!(config.api_host, "api.open-meteo.com");
        assert_eq!(config.api_port, 443);
        assert_eq!(config.lock_wait_budget_ms, 100);
    }

    #[test]
    fn test_lock_wait_budget_converts_to_duration() {
        let config = AppConfig {
            latitude: 0.0,
            longitude: 0.0,
            api_host: "x".into(),
            api_port: 1,
            lock_wait_budget_ms: 250,
        };
        assert_eq!(
            config.lock_wait_budget(),
            std::time::Duration::from_millis(250)
        );
    }
}
