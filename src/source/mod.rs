pub mod decode;
pub mod file;
pub mod rtdb;

pub use decode::{parse_snapshot, parse_snapshot_str};
pub use file::FileSource;
pub use rtdb::RealtimeDbSource;

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use crate::core::Snapshot;

/// Shortest polling period a subscription accepts
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Snapshots buffered between a producer and the controller
const SUBSCRIPTION_CAPACITY: usize = 4;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered {status}: {body}")]
    Status { status: u16, body: String },
}

/// Somewhere the full playlist collection can be read from
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Read the complete current collection
    async fn fetch(&self) -> Result<Snapshot, SourceError>;
}

#[async_trait]
impl<T: SnapshotSource + ?Sized> SnapshotSource for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn fetch(&self) -> Result<Snapshot, SourceError> {
        (**self).fetch().await
    }
}

/// Receiving end of a snapshot stream.
///
/// Dropping it, or calling [`Subscription::unsubscribe`], stops the producer.
pub struct Subscription {
    rx: mpsc::Receiver<Snapshot>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// A subscription fed by hand through the returned sender
    pub fn channel(capacity: usize) -> (mpsc::Sender<Snapshot>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self { rx, task: None })
    }

    /// Next snapshot, or `None` once the producer is gone
    pub async fn recv(&mut self) -> Option<Snapshot> {
        self.rx.recv().await
    }

    pub fn unsubscribe(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.rx.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Poll `source` every `every` and deliver each snapshot that differs from
/// the last one delivered. The first fetch happens immediately.
///
/// A failed fetch is logged and skipped; the controller keeps whatever it
/// had.
pub fn subscribe<S>(source: S, every: Duration) -> Subscription
where
    S: SnapshotSource + 'static,
{
    let (tx, rx) = mpsc::channel(SUBSCRIPTION_CAPACITY);
    let every = every.max(MIN_POLL_INTERVAL);

    let task = tokio::spawn(async move {
        info!(source = source.name(), every_ms = every.as_millis() as u64, "subscribed to snapshot source");

        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last: Option<Snapshot> = None;

        loop {
            ticker.tick().await;

            let snapshot = match source.fetch().await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(source = source.name(), error = %e, "snapshot fetch failed");
                    continue;
                }
            };

            if last.as_ref() == Some(&snapshot) {
                continue;
            }

            debug!(source = source.name(), records = snapshot.len(), "snapshot changed");
            if tx.send(snapshot.clone()).await.is_err() {
                // Subscriber gone
                break;
            }
            last = Some(snapshot);
        }
    });

    Subscription { rx, task: Some(task) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PlaylistRecord;
    use std::sync::{Arc, Mutex};

    /// Source serving whatever the test puts in it
    #[derive(Clone, Default)]
    struct ScriptedSource {
        next: Arc<Mutex<Option<Result<Snapshot, String>>>>,
        fetches: Arc<Mutex<u32>>,
    }

    impl ScriptedSource {
        fn serve(&self, snapshot: Snapshot) {
            *self.next.lock().unwrap() = Some(Ok(snapshot));
        }

        fn fail(&self, reason: &str) {
            *self.next.lock().unwrap() = Some(Err(reason.to_string()));
        }

        fn fetches(&self) -> u32 {
            *self.fetches.lock().unwrap()
        }
    }

    #[async_trait]
    impl SnapshotSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn fetch(&self) -> Result<Snapshot, SourceError> {
            *self.fetches.lock().unwrap() += 1;
            match self.next.lock().unwrap().clone() {
                Some(Ok(snapshot)) => Ok(snapshot),
                Some(Err(reason)) => Err(SourceError::Status { status: 500, body: reason }),
                None => Ok(Vec::new()),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_delivers_only_changes() {
        let source = ScriptedSource::default();
        source.serve(vec![PlaylistRecord::new("a", "A")]);
        let mut subscription = subscribe(source.clone(), Duration::from_secs(1));

        let first = subscription.recv().await.unwrap();
        assert_eq!(first[0].id, "a");

        // Same data on the next few polls: nothing delivered
        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert!(source.fetches() >= 3);

        source.serve(vec![PlaylistRecord::new("b", "B")]);
        let second = subscription.recv().await.unwrap();
        assert_eq!(second[0].id, "b");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_keeps_previous() {
        let source = ScriptedSource::default();
        source.serve(vec![PlaylistRecord::new("a", "A")]);
        let mut subscription = subscribe(source.clone(), Duration::from_secs(1));
        subscription.recv().await.unwrap();

        source.fail("boom");
        let quiet = tokio::time::timeout(Duration::from_millis(2500), subscription.recv()).await;
        assert!(quiet.is_err());

        // Recovery with unchanged data is not a change either
        source.serve(vec![PlaylistRecord::new("a", "A")]);
        let quiet = tokio::time::timeout(Duration::from_millis(2500), subscription.recv()).await;
        assert!(quiet.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsubscribe_stops_producer() {
        let source = ScriptedSource::default();
        let mut subscription = subscribe(source.clone(), Duration::from_secs(1));
        subscription.recv().await.unwrap();

        subscription.unsubscribe();
        assert!(subscription.recv().await.is_none());

        let fetched = source.fetches();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(source.fetches(), fetched);
    }

    #[tokio::test]
    async fn test_manual_channel() {
        let (tx, mut subscription) = Subscription::channel(2);
        tx.send(vec![PlaylistRecord::new("a", "A")]).await.unwrap();
        drop(tx);

        assert_eq!(subscription.recv().await.map(|s| s.len()), Some(1));
        assert!(subscription.recv().await.is_none());
    }
}
