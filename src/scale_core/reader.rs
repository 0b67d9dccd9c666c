//! Asynchronous tail reader for JSONL filter event streams, with rotation detection

use super::event_source::FilterEvent;
use std::io::SeekFrom;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::time::sleep;

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

pub struct FilterEventTailReader {
    path: PathBuf,
    file: Option<BufReader<File>>,
    inode: Option<u64>,
    position: u64,
    poll_interval: Duration,
    skipped_lines: u64,
}

impl FilterEventTailReader {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            file: None,
            inode: None,
            position: 0,
            poll_interval: Duration::from_millis(100),
            skipped_lines: 0,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Lines that could not be parsed as filter events
    pub fn skipped_lines(&self) -> u64 {
        self.skipped_lines
    }

    /// Start tailing the file (seeks to end)
    pub async fn start(&mut self) -> std::io::Result<()> {
        let file = File::open(&self.path).await?;
        let metadata = file.metadata().await?;

        #[cfg(unix)]
        {
            self.inode = Some(metadata.ino());
        }

        let mut reader = BufReader::new(file);
        self.position = reader.seek(SeekFrom::End(0)).await?;
        self.file = Some(reader);

        log::info!(
            "📖 Started tailing: {} ({} bytes)",
            self.path.display(),
            metadata.len()
        );
        Ok(())
    }

    /// Reopen from the beginning after the file was rotated or truncated
    async fn reopen(&mut self) -> std::io::Result<()> {
        let file = File::open(&self.path).await?;

        #[cfg(unix)]
        {
            self.inode = Some(file.metadata().await?.ino());
        }

        self.file = Some(BufReader::new(file));
        self.position = 0;
        Ok(())
    }

    /// Read the next well-formed filter event, waiting if necessary
    pub async fn read_event(&mut self) -> std::io::Result<FilterEvent> {
        loop {
            if self.detect_rotation().await? {
                log::info!("🔄 File rotation detected, reopening: {}", self.path.display());
                self.reopen().await?;
            }

            let Some(ref mut reader) = self.file else {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "File not opened",
                ));
            };

            let mut line = String::new();
            let read = reader.read_line(&mut line).await?;
            if read == 0 {
                // No new data, sleep and retry
                sleep(self.poll_interval).await;
                continue;
            }
            self.position += read as u64;

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match FilterEvent::from_jsonl(line) {
                Ok(event) => return Ok(event),
                Err(e) => {
                    self.skipped_lines += 1;
                    log::warn!("Failed to parse filter event ({}): {}", e, line);
                }
            }
        }
    }

    /// Detect if the file has been rotated (inode changed) or truncated
    async fn detect_rotation(&self) -> std::io::Result<bool> {
        let metadata = tokio::fs::metadata(&self.path).await?;

        #[cfg(unix)]
        {
            if self.inode.map_or(false, |old| old != metadata.ino()) {
                return Ok(true);
            }
        }

        Ok(self.file.is_some() && metadata.len() < self.position)
    }
}
