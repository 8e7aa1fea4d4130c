//! JSON-lines audit sink backed by a background writer task.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::ports::{InteractionLog, InteractionRecord};

/// Records buffered before new ones are dropped.
const CHANNEL_CAPACITY: usize = 1024;

/// Appends records as JSON lines to a file.
///
/// `record` only enqueues; a background task owns the file. When the queue
/// is full or the writer has died, records are dropped with a warning.
#[derive(Debug)]
pub struct JsonlAuditLog {
    path: PathBuf,
    tx: mpsc::Sender<InteractionRecord>,
    writer: JoinHandle<()>,
}

impl JsonlAuditLog {
    /// Open (or create) `path` for appending and start the writer task.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        let (tx, mut rx) = mpsc::channel::<InteractionRecord>(CHANNEL_CAPACITY);
        let writer_path = path.clone();
        let writer = tokio::spawn(async move {
            let mut file = file;
            while let Some(record) = rx.recv().await {
                let mut line = match serde_json::to_vec(&record) {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("Failed to serialize audit record: {e}");
                        continue;
                    }
                };
                line.push(b'\n');
                if let Err(e) = file.write_all(&line).await {
                    warn!(path = %writer_path.display(), "Failed to write audit record: {e}");
                }
            }
            if let Err(e) = file.flush().await {
                warn!(path = %writer_path.display(), "Failed to flush audit log: {e}");
            }
            debug!(path = %writer_path.display(), "Audit writer stopped");
        });

        Ok(Self { path, tx, writer })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop accepting records and wait until everything queued is written.
    pub async fn close(self) {
        drop(self.tx);
        if let Err(e) = self.writer.await {
            warn!("Audit writer task failed: {e}");
        }
    }
}

impl InteractionLog for JsonlAuditLog {
    fn record(&self, record: InteractionRecord) {
        if let Err(e) = self.tx.try_send(record) {
            warn!(path = %self.path.display(), "Dropping audit record: {e}");
        }
    }
}
