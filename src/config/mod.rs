//! # Configuration
//!
//! Operator configuration loaded from environment variables (populated from a
//! ConfigMap via `envFrom` in the deployment). Every setting has a default in
//! [`crate::constants`].

mod cloud;
mod controller;
mod server;

pub use cloud::{CloudConfig, CloudCredentials};
pub use controller::ControllerConfig;
pub use server::ServerConfig;

/// Load configuration from environment variables with defaults
pub fn load_config() -> (ControllerConfig, ServerConfig, CloudConfig) {
    (
        ControllerConfig::from_env(),
        ServerConfig::from_env(),
        CloudConfig::from_env(),
    )
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read a non-empty environment variable
fn optional_env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_or_default_falls_back_on_garbage() {
        std::env::set_var("OSOK_TEST_GARBAGE_PORT", "not-a-number");
        assert_eq!(env_var_or_default("OSOK_TEST_GARBAGE_PORT", 8080u16), 8080);
        std::env::set_var("OSOK_TEST_GOOD_PORT", "9090");
        assert_eq!(env_var_or_default("OSOK_TEST_GOOD_PORT", 8080u16), 9090);
    }

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::default();
        assert_eq!(config.max_reset_counter, 30);
        assert_eq!(config.reconcile_timeout_secs, 60);
        assert!(config.watch_namespace.is_none());
        assert_eq!(ServerConfig::default().metrics_port, 8080);
    }
}
