//! Background change watcher.
//!
//! Subscribes to the change feed at its current tail and triggers a full
//! reload for every insert/update/delete that targets the watched table,
//! completing each reload before consuming the next notification. A failed
//! reload logs and keeps the previous snapshot serving; a lost feed
//! reconnects with exponential backoff. The task exits cleanly when the
//! shutdown signal fires.

use std::sync::Arc;
use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::feed::{ChangeEvent, ChangeFeed, FeedError, FeedPosition};
use crate::loader::Loader;

/// Default minimum reconnect delay.
const DEFAULT_MIN_RETRY_DELAY: Duration = Duration::from_millis(100);
/// Default maximum reconnect delay.
const DEFAULT_MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Selects the notifications that describe the definitions table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFilter {
    /// Schema the event must carry.
    pub schema: String,
    /// Table name the event must carry.
    pub table: String,
}

impl TableFilter {
    /// Filter for `schema`.`table`.
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Whether the event is a mutation of the watched table. Every
    /// [`ChangeEvent`] action is mutating, so only the target is checked.
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        event.schema == self.schema && event.table == self.table
    }
}

/// Backoff for feed reconnection: unbounded attempts with jitter. The
/// watcher must outlive transient database outages.
fn reconnect_backoff(min: Duration, max: Duration) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(min)
        .with_max_delay(max)
        .without_max_times()
        .with_jitter()
}

/// Long-running task keeping the registry consistent with the definition
/// store by reloading on change notifications.
pub struct ChangeWatcher {
    feed: Box<dyn ChangeFeed>,
    loader: Arc<Loader>,
    filter: TableFilter,
    min_retry_delay: Duration,
    max_retry_delay: Duration,
}

impl ChangeWatcher {
    /// Create a watcher over `feed`, reloading through `loader` for events
    /// matching `filter`.
    pub fn new(feed: Box<dyn ChangeFeed>, loader: Arc<Loader>, filter: TableFilter) -> Self {
        Self {
            feed,
            loader,
            filter,
            min_retry_delay: DEFAULT_MIN_RETRY_DELAY,
            max_retry_delay: DEFAULT_MAX_RETRY_DELAY,
        }
    }

    /// Override the reconnect delay bounds.
    pub fn with_retry_delays(mut self, min: Duration, max: Duration) -> Self {
        self.min_retry_delay = min;
        self.max_retry_delay = max;
        self
    }

    /// Spawn the watcher task. It runs until `shutdown` fires (or its sender
    /// is dropped) and then joins cleanly.
    pub fn spawn(self, shutdown: oneshot::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        let mut backoff = reconnect_backoff(self.min_retry_delay, self.max_retry_delay).build();
        loop {
            match self.subscribe_at_tail().await {
                Ok(position) => {
                    info!(
                        %position,
                        schema = %self.filter.schema,
                        table = %self.filter.table,
                        "watching definition changes"
                    );
                    backoff =
                        reconnect_backoff(self.min_retry_delay, self.max_retry_delay).build();
                }
                Err(err) => {
                    let delay = backoff.next().unwrap_or(self.max_retry_delay);
                    warn!(error = %err, ?delay, "change feed unavailable, retrying");
                    tokio::select! {
                        _ = &mut shutdown => {
                            info!("change watcher stopped");
                            return;
                        }
                        _ = tokio::time::sleep(delay) => continue,
                    }
                }
            }

            // Consume until the feed fails or shutdown fires. Notifications
            // are processed strictly in feed order; each reload completes
            // before the next recv.
            loop {
                tokio::select! {
                    _ = &mut shutdown => {
                        info!("change watcher stopped");
                        return;
                    }
                    received = self.feed.recv() => match received {
                        Ok(event) => self.handle(event).await,
                        Err(err) => {
                            warn!(error = %err, "change feed lost, reconnecting");
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn subscribe_at_tail(&mut self) -> Result<FeedPosition, FeedError> {
        let position = self.feed.tail().await?;
        self.feed.subscribe(position.clone()).await?;
        Ok(position)
    }

    async fn handle(&self, event: ChangeEvent) {
        if !self.filter.matches(&event) {
            debug!(schema = %event.schema, table = %event.table, "ignoring unrelated change");
            return;
        }
        debug!(action = ?event.action, "definition change, reloading");
        // A stale registry beats a dead process: on failure the previous
        // snapshot keeps serving.
        if let Err(err) = self.loader.reload().await {
            error!(error = %err, "reload failed, keeping previous snapshot");
        }
    }
}
