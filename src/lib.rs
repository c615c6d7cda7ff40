//! Errata - hot-reloadable gRPC error registry
//!
//! Keeps a database-backed registry of error definitions in memory,
//! reloading it whenever the definitions table changes, and translates
//! between definitions, application error values, and `tonic::Status`.

pub mod config;
pub mod definition;
pub mod dsn;
pub mod feed;
pub mod loader;
pub mod registry;
pub mod store;
pub mod translate;
pub mod value;
pub mod watcher;

pub use config::Config;
pub use definition::ErrorDefinition;
pub use loader::{LoadError, Loader};
pub use registry::Registry;
pub use translate::{ConnectMatcher, Translator};
pub use value::{AppError, ErrorInfo, ErrorView, TracedError};

use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;

use crate::dsn::DsnError;
use crate::feed::{ChangeFeed, PgChangeFeed};
use crate::store::{DefinitionStore, PostgresDefinitionStore, StoreError};
use crate::watcher::{ChangeWatcher, TableFilter};

/// Errors that can fail startup.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("Invalid database DSN: {0}")]
    Dsn(#[from] DsnError),

    #[error("Definition store error: {0}")]
    Store(#[from] StoreError),

    #[error("Initial registry load failed: {0}")]
    Load(#[from] LoadError),

    #[error("Database connection failed: {0}")]
    Connect(#[from] sqlx::Error),
}

/// Handle to the running change watcher task.
pub struct WatcherHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    /// Signal the watcher to stop and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        let _ = self.task.await;
    }
}

/// The assembled registry service: a loaded registry, its translator, and
/// the background watcher keeping it current.
pub struct Errata {
    registry: Arc<Registry>,
    translator: Translator,
    loader: Arc<Loader>,
    watcher: WatcherHandle,
}

impl Errata {
    /// Connect to PostgreSQL per `config`, run migrations, perform the cold
    /// start load, and spawn the change watcher.
    pub async fn connect(config: &Config) -> Result<Self, InitError> {
        let dsn = config.dsn()?;
        let pool = PgPool::connect(&dsn.postgres_url()).await?;
        let store = PostgresDefinitionStore::new(pool.clone());
        store.migrate(&config.registry.channel).await?;
        let feed = PgChangeFeed::new(pool, &config.registry.channel);
        Self::with_parts(Arc::new(store), Box::new(feed), config).await
    }

    /// Assemble from explicit store and feed implementations. Used directly
    /// in tests with mocks; `connect` is the production path.
    pub async fn with_parts(
        store: Arc<dyn DefinitionStore>,
        feed: Box<dyn ChangeFeed>,
        config: &Config,
    ) -> Result<Self, InitError> {
        let schema = config.watch_schema()?;
        let registry = Arc::new(Registry::new());
        let loader = Arc::new(Loader::new(store, registry.clone()));

        // Cold start is fatal on failure: without a first snapshot every
        // lookup would silently answer Unknown.
        loader.reload().await?;

        let matcher = ConnectMatcher::new(config.registry.connect_error_prefixes.clone());
        let translator = Translator::new(registry.clone(), matcher);

        let filter = TableFilter::new(schema, config.registry.table.clone());
        let watcher = ChangeWatcher::new(feed, loader.clone(), filter).with_retry_delays(
            std::time::Duration::from_millis(config.watcher.min_retry_delay_ms),
            std::time::Duration::from_millis(config.watcher.max_retry_delay_ms),
        );
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = watcher.spawn(shutdown_rx);
        info!(definitions = registry.len(), "error registry started");

        Ok(Self {
            registry,
            translator,
            loader,
            watcher: WatcherHandle {
                shutdown: shutdown_tx,
                task,
            },
        })
    }

    /// The live registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The translator over the live registry.
    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    /// The loader, for forcing a reload out of band.
    pub fn loader(&self) -> &Arc<Loader> {
        &self.loader
    }

    /// Stop the change watcher and wait for it to exit. The registry keeps
    /// serving its last snapshot afterwards.
    pub async fn shutdown(self) {
        self.watcher.shutdown().await;
    }
}
