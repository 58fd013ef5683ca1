//! Service configuration.
//!
//! Defaults, then the JSON file given with `--config`, then command line
//! flags.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::error::ServiceError;

/// Default virtualization root.
pub const DEFAULT_ROOT: &str = r"C:\Secrets";

/// Default control pipe name.
pub const DEFAULT_PIPE_NAME: &str = "ProjFS_MCP_Pipe";

/// Default seed file, relative to the working directory.
pub const DEFAULT_SEED_FILE: &str = "canaryfs-tree.csv";

/// Resolved service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceConfig {
    /// Virtualization root directory.
    pub root_path: PathBuf,
    /// Domain receiving canary lookups; alerts are only logged when unset.
    pub alert_domain: Option<String>,
    /// Verbose logging.
    pub debug: bool,
    /// Rewrite the seed file after every tree mutation.
    pub auto_save: bool,
    /// Run the control server.
    pub enable_control: bool,
    /// Control pipe name (Windows).
    pub pipe_name: String,
    /// Serve control over TCP on this address instead of the pipe.
    pub tcp_address: Option<SocketAddr>,
    /// Seed file holding the decoy tree.
    pub seed_file: PathBuf,
    /// ProjFS pool thread count.
    pub pool_thread_count: u32,
    /// ProjFS concurrent thread count.
    pub concurrent_thread_count: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from(DEFAULT_ROOT),
            alert_domain: None,
            debug: false,
            auto_save: true,
            enable_control: true,
            pipe_name: DEFAULT_PIPE_NAME.to_string(),
            tcp_address: None,
            seed_file: PathBuf::from(DEFAULT_SEED_FILE),
            pool_thread_count: 4,
            concurrent_thread_count: 4,
        }
    }
}

impl ServiceConfig {
    /// Read a JSON configuration file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ServiceError> {
        let text: String = fs::read_to_string(path).map_err(|source| ServiceError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Build the effective configuration for a command line.
    pub fn resolve(cli: &Cli) -> Result<Self, ServiceError> {
        let mut config: ServiceConfig = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        Ok(config)
    }

    /// Override fields with the flags present on the command line.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(root) = &cli.root {
            self.root_path = root.clone();
        }
        if let Some(domain) = &cli.alert_domain {
            self.alert_domain = Some(domain.clone());
        }
        if let Some(seed) = &cli.seed {
            self.seed_file = seed.clone();
        }
        if cli.debug {
            self.debug = true;
        }
        if cli.no_control {
            self.enable_control = false;
        }
        if let Some(addr) = cli.tcp {
            self.tcp_address = Some(addr);
        }
    }
}
