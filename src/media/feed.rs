//! Snapshots read from a newline-delimited JSON feed.
//!
//! Lets any external process (or a FIFO) act as the media source by writing
//! one snapshot per line in the inbound wire format. The feed is read-only:
//! transport commands are rejected.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::error::MediaError;
use super::snapshot::MediaSnapshot;
use super::{lock, IdAllocator, MediaSession, Subscription, SubscriptionId, TransportCommand};

/// Media session fed from a file of JSON snapshots.
#[derive(Debug)]
pub struct FeedSession {
    path: PathBuf,
    ids: IdAllocator,
    readers: Mutex<HashMap<SubscriptionId, JoinHandle<()>>>,
}

impl FeedSession {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ids: IdAllocator::default(),
            readers: Mutex::new(HashMap::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn readers(&self) -> MutexGuard<'_, HashMap<SubscriptionId, JoinHandle<()>>> {
        lock(&self.readers)
    }
}

impl MediaSession for FeedSession {
    fn name(&self) -> &'static str {
        "feed"
    }

    fn subscribe(&self) -> Result<Subscription, MediaError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.ids.next();
        let handle = tokio::spawn(read_feed(self.path.clone(), tx));
        self.readers().insert(id, handle);
        Ok(Subscription::new(id, rx))
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        if let Some(handle) = self.readers().remove(&id) {
            handle.abort();
        }
    }

    fn send_command(
        &self,
        command: TransportCommand,
    ) -> impl Future<Output = Result<(), MediaError>> + Send {
        std::future::ready(Err(MediaError::CommandUnsupported(command)))
    }
}

impl Drop for FeedSession {
    fn drop(&mut self) {
        for (_, handle) in self.readers().drain() {
            handle.abort();
        }
    }
}

/// Streams snapshots until end of input. Malformed lines are skipped.
async fn read_feed(path: PathBuf, tx: mpsc::UnboundedSender<MediaSnapshot>) {
    let file = match File::open(&path).await {
        Ok(file) => file,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot open media feed");
            return;
        }
    };

    let mut lines = BufReader::new(file).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!(path = %path.display(), "media feed reached end of input");
                return;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "media feed read failed");
                return;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match MediaSnapshot::from_json(line) {
            Ok(snapshot) => {
                if tx.send(snapshot).is_err() {
                    return;
                }
            }
            Err(e) => warn!(error = %e, "skipping malformed media snapshot"),
        }
    }
}
