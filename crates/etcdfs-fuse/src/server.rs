//! FUSE daemon server management.
//!
//! Manages the lifecycle of the mount: checking the mountpoint, resolving
//! the base key, serving the FUSE session in the background and unmounting
//! on a termination signal.

use std::io;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use etcdfs_client::KeysApi;
use tokio::runtime::Handle;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::MountConfig;
use crate::filesystem::EtcdFuse;
use crate::mount::{options_to_fuser, validate_mountpoint, MountError};
use crate::root::EtcdFs;

/// Server state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerState {
    /// Server is stopped.
    #[default]
    Stopped,
    /// Server is resolving the base key and mounting.
    Starting,
    /// Session is mounted and serving.
    Running,
    /// Server is unmounting.
    Stopping,
    /// Server failed to start.
    Error,
}

impl ServerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ServerState::Starting,
            2 => ServerState::Running,
            3 => ServerState::Stopping,
            4 => ServerState::Error,
            _ => ServerState::Stopped,
        }
    }
}

/// Signals that end the mount.
struct ShutdownSignals {
    interrupt: Signal,
    terminate: Signal,
    hangup: Signal,
}

impl ShutdownSignals {
    fn install() -> io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            hangup: signal(SignalKind::hangup())?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
            _ = self.hangup.recv() => "SIGHUP",
        }
    }
}

/// FUSE server instance.
pub struct FuseServer {
    config: MountConfig,
    /// Internal state as atomic for lock-free access.
    state: AtomicU8,
}

impl FuseServer {
    /// Create a new server with the given configuration.
    pub fn new(config: MountConfig) -> Self {
        FuseServer {
            config,
            state: AtomicU8::new(ServerState::Stopped as u8),
        }
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &MountConfig {
        &self.config
    }

    /// Get the current server state.
    pub fn state(&self) -> ServerState {
        ServerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, new_state: ServerState) {
        let old = self.state.swap(new_state as u8, Ordering::SeqCst);
        debug!("server state {:?} -> {:?}", ServerState::from_u8(old), new_state);
    }

    /// Mount the configured subtree and serve it until a termination signal
    /// arrives or the filesystem is unmounted externally.
    pub async fn run(&self, keys: Arc<dyn KeysApi>) -> Result<(), MountError> {
        self.set_state(ServerState::Starting);
        match self.serve(keys).await {
            Ok(()) => {
                self.set_state(ServerState::Stopped);
                Ok(())
            }
            Err(e) => {
                self.set_state(ServerState::Error);
                Err(e)
            }
        }
    }

    async fn serve(&self, keys: Arc<dyn KeysApi>) -> Result<(), MountError> {
        validate_config(&self.config)?;
        validate_mountpoint(&self.config.mountpoint)?;
        let options = options_to_fuser(&self.config.mount)?;

        let fs = Arc::new(EtcdFs::new(keys, &self.config.base_key));
        fs.root().await.map_err(|source| MountError::Root {
            base: fs.base().to_string(),
            source,
        })?;

        let mut signals = ShutdownSignals::install()?;
        let shutdown = CancellationToken::new();
        let adapter = EtcdFuse::new(
            Arc::clone(&fs),
            self.config.fs.clone(),
            Handle::current(),
            shutdown.clone(),
        );

        info!(
            "Mounting etcd:{} on {}",
            fs.base(),
            self.config.mountpoint.display()
        );
        let session = fuser::spawn_mount2(adapter, &self.config.mountpoint, &options)?;
        self.set_state(ServerState::Running);

        tokio::select! {
            name = signals.recv() => info!("Caught {}, unmounting", name),
            _ = shutdown.cancelled() => info!("Filesystem unmounted"),
        }

        self.set_state(ServerState::Stopping);
        shutdown.cancel();
        drop(session);
        info!("Unmounted {}", self.config.mountpoint.display());
        Ok(())
    }
}

/// Validate server configuration.
pub fn validate_config(config: &MountConfig) -> Result<(), MountError> {
    if config.mountpoint.as_os_str().is_empty() {
        return Err(MountError::InvalidOption(
            "mountpoint path is empty".to_string(),
        ));
    }

    if !config.base_key.starts_with('/') {
        return Err(MountError::InvalidOption(format!(
            "base key must be absolute: {}",
            config.base_key
        )));
    }

    if config.endpoints.iter().all(|e| e.trim().is_empty()) {
        return Err(MountError::InvalidOption(
            "no etcd endpoints configured".to_string(),
        ));
    }

    Ok(())
}
