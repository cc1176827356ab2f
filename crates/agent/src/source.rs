//! Line source — polls a growing file for newly appended lines.

use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader, SeekFrom};
use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::conf::SourceConfig;
use crate::error::{FatalError, SourceError};
use crate::monitor::CounterHandle;

/// Tails one file from its current end, emitting each complete line
/// (newline stripped) onto the raw-line queue.
///
/// Tailing is polling-based: on EOF the source sleeps `poll_interval` and
/// retries. A line whose newline has not been written yet is kept in the
/// read buffer and completed on a later poll.
pub struct FileSource {
    path: PathBuf,
    poll_interval: Duration,
}

impl FileSource {
    pub fn new(config: &SourceConfig) -> Self {
        Self {
            path: PathBuf::from(&config.path),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }

    /// Run the source until the pipeline shuts down or an I/O error occurs.
    /// Open and read failures are fatal and routed to the serve loop.
    pub async fn run(
        self,
        raw_tx: flume::Sender<Bytes>,
        counters: CounterHandle,
        fatal: mpsc::Sender<FatalError>,
    ) {
        if let Err(err) = self.tail(&raw_tx, &counters).await {
            let _ = fatal.send(err.into()).await;
        }
    }

    async fn tail(
        &self,
        raw_tx: &flume::Sender<Bytes>,
        counters: &CounterHandle,
    ) -> Result<(), SourceError> {
        let mut file = File::open(&self.path).await.map_err(|source| SourceError::Open {
            path: self.path.clone(),
            source,
        })?;
        file.seek(SeekFrom::End(0))
            .await
            .map_err(|source| self.read_error(source))?;

        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        loop {
            let read = reader
                .read_until(b'\n', &mut buf)
                .await
                .map_err(|source| self.read_error(source))?;

            // EOF: nothing new, or a line that is still being written.
            // Either way keep what we have and poll again.
            if read == 0 || buf.last() != Some(&b'\n') {
                sleep(self.poll_interval).await;
                continue;
            }

            buf.pop();
            let line = Bytes::copy_from_slice(&buf);
            buf.clear();

            // Counted before enqueueing: the counter reflects lines read,
            // not lines parsed.
            counters.line_handled().await;

            // Blocks when the raw queue is full: the source's sole
            // backpressure point.
            if raw_tx.send_async(line).await.is_err() {
                return Ok(());
            }
        }
    }

    fn read_error(&self, source: std::io::Error) -> SourceError {
        SourceError::Read {
            path: self.path.clone(),
            source,
        }
    }
}
