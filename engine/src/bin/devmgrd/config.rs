//! Daemon configuration from environment variables
//!
//! All configuration is read from environment variables with sensible
//! defaults; there is no command-line parsing.

use std::env;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_FORCE_QUIT_SEC: f64 = 0.5;
const DEFAULT_CLIENT_WAIT_MS: u64 = 10_000;

/// Daemon configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Node descriptor path inside the domain file system (required)
    pub dcd_file: String,

    /// Root of the domain file system on the local host
    pub sdr_root: String,

    /// Root under which the per-node cache directory is created
    pub cache_root: String,

    /// Overrides the domain manager name from the node descriptor
    pub domain_name: Option<String>,

    /// Logging configuration reference exposed as a read-only property
    pub logging_config_uri: Option<String>,

    pub log_level: String,

    /// Seconds granted to children after each kill-escalation stage
    pub force_quit_sec: f64,

    /// Bounded-blocking timeout for child references (milliseconds)
    pub client_wait_ms: u64,
}

impl DaemonConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        // SDRROOT is consulted only when no explicit root is configured
        let sdr_root = env::var("DEVMGR_SDRROOT")
            .or_else(|_| env::var("SDRROOT"))
            .unwrap_or_else(|_| ".".to_string());

        let cache_root =
            env::var("DEVMGR_SDRCACHE").unwrap_or_else(|_| format!("{}/dev", sdr_root));

        Self {
            dcd_file: env::var("DEVMGR_DCD_FILE").unwrap_or_default(),
            cache_root,
            sdr_root,
            domain_name: env::var("DEVMGR_DOMAIN_NAME").ok(),
            logging_config_uri: env::var("DEVMGR_LOGGING_CONFIG_URI").ok(),
            log_level: env::var("DEVMGR_LOG_LEVEL")
                .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string()),
            force_quit_sec: parse_f64("DEVMGR_FORCE_QUIT_SEC", DEFAULT_FORCE_QUIT_SEC),
            client_wait_ms: parse_u64("DEVMGR_CLIENT_WAIT_MS", DEFAULT_CLIENT_WAIT_MS),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.dcd_file.is_empty() {
            return Err("DEVMGR_DCD_FILE must name the node descriptor".to_string());
        }
        if self.force_quit_sec < 0.0 {
            return Err("DEVMGR_FORCE_QUIT_SEC must not be negative".to_string());
        }
        Ok(())
    }
}

fn parse_f64(var: &str, default: f64) -> f64 {
    env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn parse_u64(var: &str, default: u64) -> u64 {
    env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
