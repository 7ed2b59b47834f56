//! Server configuration
//!
//! Configuration is loaded from environment variables.

use std::env;
use std::time::Duration;

/// Main server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Session configuration
    pub session: SessionConfig,
}

/// Session-related configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How often the registry sweeps for idle sessions
    pub sweep_interval: Duration,
    /// How long a session may sit untouched before the sweep evicts it
    pub idle_expiry: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            session: SessionConfig::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(60),
            idle_expiry: Duration::from_secs(2 * 60 * 60), // 2 hours
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = env::var("HOST") {
            config.host = host;
        }
        if let Ok(port) = env::var("PORT")
            && let Ok(p) = port.parse()
        {
            config.port = p;
        }

        if let Ok(val) = env::var("SWEEP_INTERVAL_SECS")
            && let Ok(secs) = val.parse::<u64>()
        {
            config.session.sweep_interval = Duration::from_secs(secs);
        }
        if let Ok(val) = env::var("SESSION_IDLE_EXPIRY_SECS")
            && let Ok(secs) = val.parse::<u64>()
        {
            config.session.idle_expiry = Duration::from_secs(secs);
        }

        config
    }
}
