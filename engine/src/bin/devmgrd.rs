//! Device Manager Daemon
//!
//! Boots one device manager on this host: parses the node descriptor,
//! federates into the domain, launches the node's devices and services, and
//! supervises them until shutdown.
//!
//! Configuration is loaded from environment variables (no CLI arguments).
//! The production object-bus adapter is an external component; this daemon
//! wires the in-memory bus for single-node bring-up.

mod devmgrd {
    pub mod config;
}
use devmgrd::config::DaemonConfig;

use dm_engine::application::{DeviceManager, DeviceManagerConfig};
use dm_engine::infrastructure::{
    InMemoryDomainManager, InMemoryNaming, LocalFileSystem, TokioProcessExecutor,
};
use std::sync::Arc;
use tokio::signal::unix::{signal as unix_signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Wait for SIGINT or SIGTERM
async fn wait_for_shutdown_signal() -> &'static str {
    let mut sigterm =
        unix_signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint =
        unix_signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = DaemonConfig::from_env();
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_level))
        .with_target(false)
        .init();

    info!("starting device manager daemon");
    info!(
        dcd_file = %config.dcd_file,
        sdr_root = %config.sdr_root,
        cache_root = %config.cache_root,
        "daemon configuration loaded from environment"
    );

    // Infrastructure: local domain file system, process executor, and the
    // in-memory bus standing in for the production adapter
    let file_system = Arc::new(LocalFileSystem::new(&config.sdr_root));
    let executor = Arc::new(TokioProcessExecutor::new());
    let naming = Arc::new(InMemoryNaming::new());

    let manager_config = DeviceManagerConfig {
        dcd_file: config.dcd_file.clone(),
        domain_name_override: config.domain_name.clone(),
        cache_root: config.cache_root.clone(),
        devmgr_ior: format!("ior:devmgr:{}", uuid::Uuid::new_v4()),
        logging_config_uri: config.logging_config_uri.clone(),
        force_quit_sec: config.force_quit_sec,
        client_wait_ms: config.client_wait_ms,
    };

    let (manager, exit_rx) = DeviceManager::new(
        manager_config,
        file_system,
        naming.clone(),
        executor,
    )?;

    naming.publish_domain_manager(manager.domain_name(), Arc::new(InMemoryDomainManager::new()));

    // Child-exit dispatch; stays live through shutdown so the escalation
    // waits observe exits
    let reaper = tokio::spawn(manager.clone().reap_loop(exit_rx));

    // Shutdown on SIGINT/SIGTERM
    let signal_manager = manager.clone();
    tokio::spawn(async move {
        let signal_name = wait_for_shutdown_signal().await;
        info!(signal = signal_name, "received shutdown signal");
        signal_manager.shutdown().await;
        signal_manager.halt();
    });

    if let Err(e) = manager.post_construct().await {
        error!(error = %e, "device manager startup failed");
        manager.shutdown().await;
        reaper.abort();
        return Err(e.into());
    }

    manager.run().await;

    // halt() without a preceding shutdown still tears the node down
    manager.shutdown().await;
    reaper.abort();

    info!("device manager daemon stopped");
    Ok(())
}
