//! Mock change feed for testing.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{ChangeEvent, ChangeFeed, FeedError, FeedPosition, Result};

/// Sender half handed to tests for injecting events.
pub type FeedSender = mpsc::UnboundedSender<ChangeEvent>;

/// Mock feed delivering events pushed through an in-memory channel.
pub struct MockChangeFeed {
    rx: mpsc::UnboundedReceiver<ChangeEvent>,
    subscribed: bool,
    fail_subscribes: usize,
}

impl MockChangeFeed {
    /// Create a feed and the sender used to push events into it.
    pub fn channel() -> (Self, FeedSender) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                rx,
                subscribed: false,
                fail_subscribes: 0,
            },
            tx,
        )
    }

    /// Fail the next `count` subscribe attempts, then succeed. Exercises the
    /// watcher's reconnect backoff.
    pub fn fail_next_subscribes(&mut self, count: usize) {
        self.fail_subscribes = count;
    }
}

#[async_trait]
impl ChangeFeed for MockChangeFeed {
    async fn tail(&mut self) -> Result<FeedPosition> {
        Ok(FeedPosition("0/0".to_string()))
    }

    async fn subscribe(&mut self, _from: FeedPosition) -> Result<()> {
        if self.fail_subscribes > 0 {
            self.fail_subscribes -= 1;
            return Err(FeedError::Closed);
        }
        self.subscribed = true;
        Ok(())
    }

    async fn recv(&mut self) -> Result<ChangeEvent> {
        if !self.subscribed {
            return Err(FeedError::Closed);
        }
        self.rx.recv().await.ok_or(FeedError::Closed)
    }
}
