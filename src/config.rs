use std::env;
use log::warn;

// Server Configuration
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5050";
pub const STATS_INTERVAL_SECS: u64 = 60;

// Receive Configuration
pub const RECV_BUFFER_SIZE: usize = 1024;

// Journal Configuration
pub const DEFAULT_JOURNAL_PATH: &str = "./bridge.log";

pub struct Config {
    pub bind_address: String,
    pub journal_path: String,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            bind_address: env::var("BRIDGE_BIND_ADDRESS")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string()),
            journal_path: env::var("BRIDGE_JOURNAL_PATH")
                .unwrap_or_else(|_| {
                    warn!("BRIDGE_JOURNAL_PATH not set, journaling to {}", DEFAULT_JOURNAL_PATH);
                    DEFAULT_JOURNAL_PATH.to_string()
                }),
            log_level: env::var("RUST_LOG")
                .unwrap_or_else(|_| "info".to_string()),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.bind_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!("Invalid bind address: {}", self.bind_address));
        }

        if self.journal_path.trim().is_empty() {
            return Err("Journal path cannot be empty".to_string());
        }

        Ok(())
    }

    pub fn log_config(&self) {
        println!("Bridge Configuration:");
        println!("  Bind Address: {}", self.bind_address);
        println!("  Journal Path: {}", self.journal_path);
        println!("  Log Level: {}", self.log_level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        let config = Config::from_env();
        assert!(!config.bind_address.is_empty());
        assert!(!config.journal_path.is_empty());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::from_env();
        config.bind_address = "not-an-address".to_string();

        assert!(config.validate().is_err());

        config.bind_address = DEFAULT_BIND_ADDRESS.to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_journal_path_rejected() {
        let mut config = Config::from_env();
        config.journal_path = "  ".to_string();

        assert!(config.validate().is_err());
    }
}
