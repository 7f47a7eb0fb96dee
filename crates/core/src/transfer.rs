use std::{
    io,
    path::{Path, PathBuf},
};

use tokio::{
    fs::{self, OpenOptions},
    io::{AsyncReadExt, AsyncWriteExt},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{
    config::{DEFAULT_CHUNK_SIZE, FetchConfig},
    error::{FailureReason, Result, TubefetchError},
    progress::{ProgressSink, ProgressSnapshot},
    source::{BoxedReader, Connector, SourceError},
    types::StreamVariant,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStatus {
    Pending,
    InProgress,
    Completed,
    Failed(FailureReason),
}

/// State of a single transfer, owned by the call that created it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferState {
    pub destination: PathBuf,
    pub total_bytes: Option<u64>,
    pub bytes_transferred: u64,
    /// Bytes already on disk when the transfer started.
    pub resumed_from: u64,
    pub status: TransferStatus,
}

impl TransferState {
    fn new(destination: &Path, total_bytes: Option<u64>) -> Self {
        Self {
            destination: destination.to_path_buf(),
            total_bytes,
            bytes_transferred: 0,
            resumed_from: 0,
            status: TransferStatus::Pending,
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot::new(self.bytes_transferred, self.total_bytes)
    }

    pub fn is_complete(&self) -> bool {
        self.status == TransferStatus::Completed
    }

    fn reached_total(&self) -> bool {
        self.total_bytes
            .is_some_and(|total| self.bytes_transferred >= total)
    }

    fn fail(mut self, reason: FailureReason) -> TubefetchError {
        warn!(
            "transfer to {} failed after {} bytes: {}",
            self.destination.display(),
            self.bytes_transferred,
            reason
        );
        self.status = TransferStatus::Failed(reason.clone());
        TubefetchError::Transfer {
            reason,
            state: Box::new(self),
        }
    }
}

/// Sequential, resumable chunked downloader.
pub struct TransferEngine<C> {
    connector: C,
    chunk_size: usize,
}

impl<C: Connector> TransferEngine<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn from_config(connector: C, config: &FetchConfig) -> Self {
        Self::new(connector).with_chunk_size(config.chunk_size)
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Download `variant` into `destination`, appending to whatever is already
    /// there.
    ///
    /// - An existing file matching the declared size returns `Completed`
    ///   without touching the source.
    /// - A shorter existing file is resumed with a ranged read; a source that
    ///   cannot do that yields [`TubefetchError::ResumeUnsupported`].
    /// - `cancel` is checked between chunks. The partial file is kept.
    /// - Faults never retry; they come back as [`TubefetchError::Transfer`]
    ///   carrying the final state.
    pub async fn transfer<S>(
        &self,
        variant: &StreamVariant,
        destination: &Path,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<TransferState>
    where
        S: ProgressSink + ?Sized,
    {
        let mut state = TransferState::new(destination, variant.size);

        let existing = match fs::metadata(destination).await {
            Ok(meta) if meta.is_file() => Some(meta.len()),
            Ok(_) => {
                return Err(state.fail(FailureReason::Io(format!(
                    "{} is not a regular file",
                    destination.display()
                ))));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(state.fail(FailureReason::Io(e.to_string()))),
        };

        let offset = existing.unwrap_or(0);
        state.bytes_transferred = offset;
        state.resumed_from = offset;

        if let (Some(total), Some(on_disk)) = (variant.size, existing) {
            if on_disk == total {
                debug!(
                    "{} already holds all {} bytes of {}",
                    destination.display(),
                    total,
                    variant.id
                );
                state.status = TransferStatus::Completed;
                return Ok(state);
            }
            if on_disk > total {
                return Err(state.fail(FailureReason::SizeMismatch {
                    expected: total,
                    found: on_disk,
                }));
            }
        }

        if offset > 0 {
            debug!(
                "resuming {} at byte {} into {}",
                variant.id,
                offset,
                destination.display()
            );
        } else {
            debug!("start downloading {} to {}", variant.id, destination.display());
        }

        let source = match self.connector.open(&variant.locator, offset).await {
            Ok(source) => source,
            Err(SourceError::RangeNotSupported) => {
                return Err(TubefetchError::ResumeUnsupported {
                    path: destination.to_path_buf(),
                    existing_bytes: offset,
                });
            }
            Err(e) => return Err(state.fail(FailureReason::Source(e.to_string()))),
        };

        match (state.total_bytes, source.remaining) {
            (None, Some(remaining)) => state.total_bytes = Some(offset + remaining),
            (Some(total), Some(remaining)) if offset + remaining != total => debug!(
                "source announces {} remaining bytes, declared total is {}",
                remaining, total
            ),
            _ => {}
        }

        let mut file = match OpenOptions::new()
            .create(true)
            .append(true)
            .open(destination)
            .await
        {
            Ok(file) => file,
            Err(e) => return Err(state.fail(FailureReason::Io(e.to_string()))),
        };

        state.status = TransferStatus::InProgress;
        let mut reader = source.reader;
        let mut buf = vec![0u8; self.chunk_size];
        let mut sink = Some(sink);

        loop {
            if state.reached_total() {
                break;
            }
            if cancel.is_cancelled() {
                return Err(state.fail(FailureReason::Cancelled));
            }

            let n = match read_chunk(&mut reader, &mut buf).await {
                Ok(n) => n,
                Err(e) => return Err(state.fail(FailureReason::Source(e.to_string()))),
            };

            if n == 0 {
                if let Some(total) = state.total_bytes {
                    let received = state.bytes_transferred;
                    return Err(state.fail(FailureReason::UnexpectedEof {
                        expected: total,
                        received,
                    }));
                }
                break;
            }

            let after = state.bytes_transferred + n as u64;
            match state.total_bytes {
                Some(total) if after > total => {
                    return Err(state.fail(FailureReason::SizeMismatch {
                        expected: total,
                        found: after,
                    }));
                }
                _ => {}
            }

            if let Err(e) = write_chunk(&mut file, &buf[..n]).await {
                return Err(state.fail(FailureReason::Io(e.to_string())));
            }
            state.bytes_transferred = after;
            trace!("wrote {} byte chunk, {} total", n, after);

            let closed = match sink.as_mut() {
                Some(s) => s.on_progress(state.snapshot()).is_err(),
                None => false,
            };
            if closed {
                debug!("progress sink closed, continuing without it");
                sink = None;
            }
        }

        state.status = TransferStatus::Completed;
        info!(
            "downloaded {} ({} bytes) to {}",
            variant.id,
            state.bytes_transferred,
            destination.display()
        );
        Ok(state)
    }
}

/// Fill `buf` unless the source ends first. Returns the number of bytes read.
async fn read_chunk(reader: &mut BoxedReader, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

async fn write_chunk(file: &mut fs::File, chunk: &[u8]) -> io::Result<()> {
    file.write_all(chunk).await?;
    file.flush().await
}
