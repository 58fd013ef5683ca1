//! canaryfs service entry point.
//!
//! Loads the decoy tree, projects it under the configured root and serves
//! the control protocol until Ctrl+C.

mod cli;
mod config;
mod error;

use std::process::ExitCode;
use std::sync::Arc;

use canaryfs_alert::DnsCanaryAlerter;
use canaryfs_control::{CommandHandler, ControlListener, ControlServer, TcpControlListener};
use canaryfs_model::{SeedFile, TreeStore, DEFAULT_SEED};
use canaryfs_vfs_projfs::{DecoyProjFs, ProjFsOptions};
use clap::Parser;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Level;

use crate::cli::Cli;
use crate::config::ServiceConfig;
use crate::error::ServiceError;

fn main() -> ExitCode {
    let cli: Cli = Cli::parse();

    let config: ServiceConfig = match ServiceConfig::resolve(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("canaryfs: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let level: Level = if config.debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "failed to start runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "canaryfs failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ServiceConfig) -> Result<(), ServiceError> {
    let seed: SeedFile = SeedFile::new(&config.seed_file);
    let (tree, from_file) = seed.load_or(DEFAULT_SEED)?;
    let tree: Arc<TreeStore> = Arc::new(tree);
    tracing::info!(
        seed = %seed.path().display(),
        from_file,
        "decoy tree loaded"
    );
    if !from_file && config.auto_save {
        seed.save_from(&tree)?;
    }

    let alerter = Arc::new(DnsCanaryAlerter::new(
        config.alert_domain.clone(),
        tokio::runtime::Handle::current(),
    ));
    if alerter.domain().is_none() {
        tracing::warn!("no alert domain configured; alerts are only logged");
    }

    let mut options: ProjFsOptions = ProjFsOptions::new(config.root_path.clone())
        .with_thread_counts(config.pool_thread_count, config.concurrent_thread_count);
    if config.auto_save {
        options = options.with_auto_save(seed.clone());
    }

    let vfs: DecoyProjFs = DecoyProjFs::new(tree.clone(), alerter, options)?;
    vfs.start()?;

    let shutdown: CancellationToken = CancellationToken::new();
    let control: Option<JoinHandle<()>> = if config.enable_control {
        let mut handler: CommandHandler = CommandHandler::new(tree.clone());
        if config.auto_save {
            handler = handler.with_auto_save(seed.clone());
        }
        start_control(&config, ControlServer::new(Arc::new(handler)), shutdown.clone()).await?
    } else {
        None
    };

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");

    shutdown.cancel();
    if let Some(task) = control {
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "control server task failed");
        }
    }

    if let Err(e) = seed.save_from(&tree) {
        tracing::warn!(path = %seed.path().display(), error = %e, "final save failed");
    }
    vfs.stop()?;
    Ok(())
}

/// Bind the configured control endpoint and spawn the accept loop.
///
/// # Returns
/// The server task, or None when no endpoint is available on this platform.
async fn start_control(
    config: &ServiceConfig,
    server: ControlServer,
    shutdown: CancellationToken,
) -> Result<Option<JoinHandle<()>>, ServiceError> {
    if let Some(addr) = config.tcp_address {
        let listener: TcpControlListener = TcpControlListener::bind(addr).await?;
        return Ok(Some(spawn_server(server, listener, shutdown)));
    }

    #[cfg(target_os = "windows")]
    {
        let listener = canaryfs_control::NamedPipeControlListener::create(&config.pipe_name)?;
        Ok(Some(spawn_server(server, listener, shutdown)))
    }

    #[cfg(not(target_os = "windows"))]
    {
        tracing::warn!(
            pipe = %config.pipe_name,
            "named pipes need Windows; pass --tcp to enable the control server"
        );
        let _ = (server, shutdown);
        Ok(None)
    }
}

fn spawn_server<L>(server: ControlServer, listener: L, shutdown: CancellationToken) -> JoinHandle<()>
where
    L: ControlListener + 'static,
{
    tokio::spawn(async move { server.run(listener, shutdown).await })
}
