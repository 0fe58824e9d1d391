//! Configuration management for the Tally server
//!
//! Settings load from `conf/application.yml`, `TALLY_*` environment
//! variables, and command line overrides, in that order of
//! precedence. Every accessor carries its default so a bare binary
//! starts with no config file at all.

use std::time::Duration;

use clap::Parser;
use config::{Config, Environment};

use tally_common::DEFAULT_FLOORS;

use crate::startup::LoggingConfig;

const DEFAULT_SERVER_PORT: u16 = 8090;
const DEFAULT_CONTEXT_PATH: &str = "/tally";
const DEFAULT_RACK_LOCK_TTL_SECS: u64 = 60;
const DEFAULT_SESSION_LOCK_TTL_SECS: u64 = 3600;
const DEFAULT_USER_HEARTBEAT_TTL_SECS: u64 = 90;

/// Command line arguments for the server
#[derive(Debug, Parser)]
#[command()]
struct Cli {
    #[arg(short = 'p', long = "port", env = "TALLY_PORT")]
    port: Option<u16>,
    #[arg(short = 'a', long = "address")]
    address: Option<String>,
}

/// Application configuration loaded from config files and environment
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    /// Load configuration for the server binary, including CLI
    /// overrides. Library and test callers use [`Configuration::default`].
    pub fn new() -> Self {
        let args = Cli::parse();
        let mut config_builder = Config::builder()
            .add_source(
                Environment::with_prefix("tally")
                    .separator(".")
                    .try_parsing(true),
            )
            .add_source(config::File::with_name("conf/application.yml").required(false));

        if let Some(v) = args.port {
            config_builder = config_builder
                .set_override("server.port", i64::from(v))
                .expect("Failed to set port override");
        }
        if let Some(v) = args.address {
            config_builder = config_builder
                .set_override("server.address", v)
                .expect("Failed to set address override");
        }

        let app_config = config_builder
            .build()
            .expect("Failed to build configuration - check conf/application.yml");

        Configuration { config: app_config }
    }

    // ========================================================================
    // Server configuration
    // ========================================================================

    pub fn server_address(&self) -> String {
        self.config
            .get_string("server.address")
            .unwrap_or("0.0.0.0".to_string())
    }

    pub fn server_port(&self) -> u16 {
        self.config
            .get_int("server.port")
            .unwrap_or(DEFAULT_SERVER_PORT.into()) as u16
    }

    pub fn context_path(&self) -> String {
        self.config
            .get_string("server.contextPath")
            .unwrap_or(DEFAULT_CONTEXT_PATH.to_string())
    }

    // ========================================================================
    // Lease configuration
    // ========================================================================

    pub fn rack_lock_ttl(&self) -> Duration {
        Duration::from_secs(
            self.config
                .get_int("tally.lock.rackTtlSeconds")
                .map(|v| v.max(1) as u64)
                .unwrap_or(DEFAULT_RACK_LOCK_TTL_SECS),
        )
    }

    pub fn session_lock_ttl(&self) -> Duration {
        Duration::from_secs(
            self.config
                .get_int("tally.lock.sessionTtlSeconds")
                .map(|v| v.max(1) as u64)
                .unwrap_or(DEFAULT_SESSION_LOCK_TTL_SECS),
        )
    }

    pub fn user_heartbeat_ttl(&self) -> Duration {
        Duration::from_secs(
            self.config
                .get_int("tally.lock.heartbeatTtlSeconds")
                .map(|v| v.max(1) as u64)
                .unwrap_or(DEFAULT_USER_HEARTBEAT_TTL_SECS),
        )
    }

    // ========================================================================
    // Warehouse configuration
    // ========================================================================

    /// Floors reported while the rack registry is empty
    pub fn default_floors(&self) -> Vec<String> {
        self.config
            .get_array("tally.floors")
            .ok()
            .map(|values| {
                values
                    .into_iter()
                    .filter_map(|v| v.into_string().ok())
                    .collect::<Vec<String>>()
            })
            .filter(|floors| !floors.is_empty())
            .unwrap_or_else(|| DEFAULT_FLOORS.iter().map(|f| f.to_string()).collect())
    }

    // ========================================================================
    // Logging configuration
    // ========================================================================

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            console_level: self
                .config
                .get_string("logging.consoleLevel")
                .unwrap_or("info".to_string()),
            file_level: self
                .config
                .get_string("logging.fileLevel")
                .unwrap_or("info".to_string()),
            file_logging: self.config.get_bool("logging.file").unwrap_or(false),
            log_dir: self
                .config
                .get_string("logging.dir")
                .unwrap_or("logs".to_string()),
        }
    }
}
