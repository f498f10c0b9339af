//! HTTP server configuration.

use std::time::Instant;

/// Where the server binds and which browser origins it accepts.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// `*` (or an empty list) allows any origin.
    pub cors_origins: Vec<String>,
    pub start_time: Instant,
}

impl ApiConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            cors_origins: vec!["*".to_string()],
            start_time: Instant::now(),
        }
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Whether every origin is allowed.
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new("0.0.0.0", 5000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:5000");
        assert!(config.allows_any_origin());
    }

    #[test]
    fn test_explicit_origins() {
        let config = ApiConfig::new("127.0.0.1", 8080)
            .with_cors_origins(vec!["https://anvik.app".to_string()]);
        assert!(!config.allows_any_origin());
        assert_eq!(config.bind_address(), "127.0.0.1:8080");

        let config = config.with_cors_origins(Vec::new());
        assert!(config.allows_any_origin());
    }
}
