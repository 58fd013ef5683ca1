use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Deception file tree with canary alerts.
#[derive(Parser, Debug, Clone, Default)]
#[command(version, about)]
pub struct Cli {
    /// JSON configuration file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Virtualization root directory
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Domain receiving canary lookups
    #[arg(long)]
    pub alert_domain: Option<String>,

    /// Seed file holding the decoy tree
    #[arg(long)]
    pub seed: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, short)]
    pub debug: bool,

    /// Do not start the control server
    #[arg(long)]
    pub no_control: bool,

    /// Serve the control protocol on TCP instead of the named pipe
    #[arg(long)]
    pub tcp: Option<SocketAddr>,
}
