//! campaignd - campaign manager server daemon
//!
//! Tracks combat encounters for tabletop sessions: one live combat at a time,
//! participants ordered by initiative, and per-round battle state.

pub mod api;
pub mod combat;
pub mod config;
pub mod db;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

pub use config::Config;
use db::Database;

/// The campaignd server instance.
///
/// Owns the combat database and serves the encounter API over it. Shutdown is
/// signalled through a watch channel so in-flight requests can finish.
pub struct Server {
    config: Config,
    db: Arc<Database>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Server {
    /// Open the combat database (in memory when `db_path` is unset) and
    /// bring its schema up to date
    pub async fn new(config: Config) -> Result<Self> {
        let db = Database::new(config.db_path.as_deref(), config.max_connections).await?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            db: Arc::new(db),
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Shared handle to the combat database
    pub fn db(&self) -> Arc<Database> {
        self.db.clone()
    }

    fn router(&self) -> Router {
        api::router(self.db.clone())
    }

    /// Serve the combat and initiative JSON API, plus `/health` and `/`,
    /// until [`Server::shutdown`] is called
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        info!(
            "campaignd listening on {} (database: {})",
            local_addr,
            self.config.db_path.as_deref().unwrap_or(":memory:")
        );

        let router = self.router();
        let mut shutdown_rx = self.shutdown_rx.clone();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_rx.changed().await.ok();
            })
            .await?;

        info!("campaignd shutdown complete");
        Ok(())
    }

    /// Stop accepting connections and let `run` return
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Configured listen address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}
