//! Per-deployment log broker.
//!
//! Tails a growing output sink and pushes each new chunk to every current
//! subscriber. One broker, one tail loop, per live deployment. Subscribers
//! receive only chunks broadcast after they join; a subscriber whose
//! channel is gone is dropped on the next broadcast without affecting the
//! rest.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

type SubscriberMap = Arc<RwLock<HashMap<u64, mpsc::UnboundedSender<String>>>>;

/// A live subscription to one deployment's output
pub struct Subscription {
    /// Subscriber id, used to unsubscribe
    pub id: u64,

    /// Delivery channel; closed when the broker shuts down
    pub rx: mpsc::UnboundedReceiver<String>,
}

/// Fan-out broker for one deployment's output sink
pub struct LogBroker {
    subscribers: SubscriberMap,
    next_id: AtomicU64,
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl LogBroker {
    /// Start tailing `sink` at the given poll interval. The tail loop runs
    /// until [`LogBroker::close`] is called.
    pub fn tail(sink: PathBuf, poll_interval: Duration) -> Self {
        let subscribers: SubscriberMap = Arc::new(RwLock::new(HashMap::new()));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let task = tokio::spawn(run_tail_loop(
            sink,
            poll_interval,
            subscribers.clone(),
            shutdown_rx,
        ));

        Self {
            subscribers,
            next_id: AtomicU64::new(0),
            shutdown_tx,
            task,
        }
    }

    /// Attach a new subscriber. It will see every chunk broadcast from this
    /// moment on; nothing already delivered is replayed.
    pub async fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.write().await.insert(id, tx);
        debug!("Subscriber {} attached", id);
        Subscription { id, rx }
    }

    /// Detach a subscriber. A no-op if it was already dropped.
    pub async fn unsubscribe(&self, id: u64) {
        if self.subscribers.write().await.remove(&id).is_some() {
            debug!("Subscriber {} detached", id);
        }
    }

    /// Number of currently attached subscribers
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Stop the tail loop and disconnect any remaining subscribers. The
    /// loop performs one final drain of the sink before closing, so output
    /// written just before a stop still reaches subscribers.
    pub async fn close(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            warn!("Tail loop ended abnormally: {}", e);
        }
    }
}

async fn run_tail_loop(
    sink: PathBuf,
    poll_interval: Duration,
    subscribers: SubscriberMap,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut cursor: u64 = 0;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                break;
            }
            _ = tokio::time::sleep(poll_interval) => {}
        }

        cursor = poll_once(&sink, cursor, &subscribers).await;
    }

    // Final drain so a chunk written right before the stop is not lost
    poll_once(&sink, cursor, &subscribers).await;
    subscribers.write().await.clear();
    debug!("Tail loop for {} ended", sink.display());
}

/// Read the unread suffix of the sink and broadcast it. Returns the new
/// cursor; the cursor never decreases (truncation mid-tail is undefined
/// behavior and treated as no growth).
async fn poll_once(sink: &Path, cursor: u64, subscribers: &SubscriberMap) -> u64 {
    let len = match fs::metadata(sink).await {
        Ok(meta) => meta.len(),
        Err(_) => return cursor,
    };
    if len <= cursor {
        return cursor;
    }

    let mut file = match fs::File::open(sink).await {
        Ok(file) => file,
        Err(e) => {
            warn!("Failed to open sink {}: {}", sink.display(), e);
            return cursor;
        }
    };
    if let Err(e) = file.seek(SeekFrom::Start(cursor)).await {
        warn!("Failed to seek sink {}: {}", sink.display(), e);
        return cursor;
    }

    let mut buf = Vec::with_capacity((len - cursor) as usize);
    let read = match file.take(len - cursor).read_to_end(&mut buf).await {
        Ok(read) => read as u64,
        Err(e) => {
            warn!("Failed to read sink {}: {}", sink.display(), e);
            return cursor;
        }
    };
    if read == 0 {
        return cursor;
    }

    let chunk = String::from_utf8_lossy(&buf).into_owned();

    let mut dead = Vec::new();
    {
        let subs = subscribers.read().await;
        for (id, tx) in subs.iter() {
            if tx.send(chunk.clone()).is_err() {
                dead.push(*id);
            }
        }
    }
    if !dead.is_empty() {
        let mut subs = subscribers.write().await;
        for id in dead {
            subs.remove(&id);
            debug!("Subscriber {} dropped (delivery failed)", id);
        }
    }

    cursor + read
}
