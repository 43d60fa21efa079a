use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadPhase {
    Connecting,
    Downloading,
    Completed,
}

/// Snapshot pushed to the observer per chunk. Observers must not block;
/// the pipeline calls them inline on the download task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub phase: DownloadPhase,
    pub bytes_downloaded: u64,
    pub total_bytes: Option<u64>,
    pub attempt: u32,
}

impl Progress {
    pub fn percentage(&self) -> Option<f32> {
        self.total_bytes.map(|total| {
            if total == 0 {
                0.0
            } else {
                (self.bytes_downloaded as f32 / total as f32) * 100.0
            }
        })
    }
}

pub type ProgressFn = Arc<dyn Fn(Progress) + Send + Sync>;
