//! The download pipeline: staging, resume, retry, cancellation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{FetchError, HttpError};
use crate::http::{HeadInfo, HttpClient};
use crate::progress::{DownloadPhase, Progress, ProgressFn};

#[derive(Clone)]
pub struct FetchOptions {
    /// Extra attempts after the first, on transient errors only.
    pub max_retries: u32,
    /// Base backoff, doubled per retry.
    pub retry_backoff: Duration,
    pub on_progress: Option<ProgressFn>,
    pub cancel: CancellationToken,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
            on_progress: None,
            cancel: CancellationToken::new(),
        }
    }
}

/// A fully downloaded but not yet committed file.
///
/// The content sits at `path()` (the `.part` staging name) until
/// [`commit`](Self::commit) renames it over the destination. Dropping an
/// uncommitted download removes the staging file.
#[derive(Debug)]
#[must_use = "a staged download must be committed or discarded"]
pub struct StagedDownload {
    part_path: PathBuf,
    destination: PathBuf,
    committed: bool,
}

impl StagedDownload {
    /// Staged content, for verification before commit.
    pub fn path(&self) -> &Path {
        &self.part_path
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Atomically rename the staged file to its final name. Staging and
    /// destination share a directory, so this never crosses filesystems.
    pub fn commit(mut self) -> Result<PathBuf, FetchError> {
        std::fs::rename(&self.part_path, &self.destination)
            .map_err(|e| FetchError::disk(&self.destination, e))?;
        self.committed = true;
        Ok(self.destination.clone())
    }

    /// Drop the staged content, leaving any previous artifact untouched.
    pub fn discard(mut self) {
        let _ = std::fs::remove_file(&self.part_path);
        self.committed = true;
    }
}

impl Drop for StagedDownload {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.part_path);
        }
    }
}

enum AttemptOutcome {
    Done(u64),
    TransientHttp(HttpError),
}

/// Streams a URL into a staging file beside its destination.
pub struct Fetcher<C: HttpClient> {
    client: Arc<C>,
}

impl<C: HttpClient> Fetcher<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// Download `url`, staging at `<destination>.part`.
    ///
    /// Transient failures are retried with exponential backoff, resuming
    /// the partial file via Range requests when the server advertises
    /// byte-range support. Permanent HTTP errors (4xx except 429) fail
    /// immediately. Cancellation removes the staging file.
    pub async fn fetch(
        &self,
        url: &str,
        destination: &Path,
        opts: &FetchOptions,
    ) -> Result<StagedDownload, FetchError> {
        let part_path = part_path_for(destination);

        self.emit(opts, DownloadPhase::Connecting, 0, None, 0);

        // Best effort probe; servers without HEAD still download fine.
        let head = self.client.head(url).await.unwrap_or_default();

        let mut attempt: u32 = 0;
        loop {
            if opts.cancel.is_cancelled() {
                let _ = tokio::fs::remove_file(&part_path).await;
                return Err(FetchError::Cancelled);
            }

            match self
                .attempt_stream(url, &part_path, &head, attempt, opts)
                .await
            {
                Ok(AttemptOutcome::Done(bytes)) => {
                    self.emit(
                        opts,
                        DownloadPhase::Completed,
                        bytes,
                        head.content_length,
                        attempt,
                    );
                    return Ok(StagedDownload {
                        part_path,
                        destination: destination.to_path_buf(),
                        committed: false,
                    });
                }
                Ok(AttemptOutcome::TransientHttp(e)) if attempt < opts.max_retries => {
                    let delay = opts.retry_backoff * 2u32.saturating_pow(attempt);
                    attempt += 1;
                    warn!(url, attempt, ?delay, error = %e, "transient download failure, backing off");
                    tokio::select! {
                        _ = opts.cancel.cancelled() => {
                            let _ = tokio::fs::remove_file(&part_path).await;
                            return Err(FetchError::Cancelled);
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Ok(AttemptOutcome::TransientHttp(last)) => {
                    let _ = tokio::fs::remove_file(&part_path).await;
                    return Err(FetchError::RetriesExhausted {
                        url: url.to_string(),
                        attempts: attempt + 1,
                        last,
                    });
                }
                Err(e) => {
                    let _ = tokio::fs::remove_file(&part_path).await;
                    return Err(e);
                }
            }
        }
    }

    async fn attempt_stream(
        &self,
        url: &str,
        part_path: &Path,
        head: &HeadInfo,
        attempt: u32,
        opts: &FetchOptions,
    ) -> Result<AttemptOutcome, FetchError> {
        let resume_from = if head.accept_ranges {
            tokio::fs::metadata(part_path)
                .await
                .map(|m| m.len())
                .unwrap_or(0)
        } else {
            0
        };

        let mut headers = Vec::new();
        if resume_from > 0 {
            debug!(url, resume_from, "resuming partial download");
            headers.push(("Range".to_string(), format!("bytes={resume_from}-")));
        }

        let response = match self.client.stream(url, &headers).await {
            Ok(r) => r,
            Err(e) if e.is_transient() => return Ok(AttemptOutcome::TransientHttp(e)),
            Err(e) => return Err(e.into()),
        };

        // A 200 answer to a ranged request restarts the whole body.
        let resumed = resume_from > 0 && response.status == 206;
        let mut file = self
            .open_part(part_path, resumed)
            .await
            .map_err(|e| FetchError::disk(part_path, e))?;
        let mut bytes_downloaded = if resumed { resume_from } else { 0 };

        let mut body = response.body;
        loop {
            tokio::select! {
                _ = opts.cancel.cancelled() => {
                    return Err(FetchError::Cancelled);
                }
                chunk = body.next() => match chunk {
                    Some(Ok(bytes)) => {
                        file.write_all(&bytes)
                            .await
                            .map_err(|e| FetchError::disk(part_path, e))?;
                        bytes_downloaded += bytes.len() as u64;
                        self.emit(
                            opts,
                            DownloadPhase::Downloading,
                            bytes_downloaded,
                            head.content_length,
                            attempt,
                        );
                    }
                    Some(Err(e)) if e.is_transient() => {
                        // Keep the partial file; the next attempt resumes it
                        // when the server supports ranges.
                        let _ = file.flush().await;
                        return Ok(AttemptOutcome::TransientHttp(e));
                    }
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                }
            }
        }

        file.flush()
            .await
            .map_err(|e| FetchError::disk(part_path, e))?;
        file.sync_all()
            .await
            .map_err(|e| FetchError::disk(part_path, e))?;

        Ok(AttemptOutcome::Done(bytes_downloaded))
    }

    async fn open_part(&self, part_path: &Path, resume: bool) -> std::io::Result<File> {
        if resume {
            OpenOptions::new().append(true).open(part_path).await
        } else {
            File::create(part_path).await
        }
    }

    fn emit(
        &self,
        opts: &FetchOptions,
        phase: DownloadPhase,
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
        attempt: u32,
    ) {
        if let Some(ref callback) = opts.on_progress {
            callback(Progress {
                phase,
                bytes_downloaded,
                total_bytes,
                attempt,
            });
        }
    }
}

fn part_path_for(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}
