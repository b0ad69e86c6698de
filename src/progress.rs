//! Progress reporting capability (spec §4.11). Non-essential to
//! correctness — every method has an empty default body, so a caller that
//! doesn't care about progress passes [`NullReporter`] and pays nothing.

use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

/// Sink for progress events. Implementations must be non-blocking, or
/// buffer internally — the classifier and chunker call these from worker
/// threads and cannot afford to stall on a slow consumer.
pub trait ProgressReporter: Send + Sync {
    fn enumerated(&self, _total: usize) {}
    fn classified(&self, _count: usize) {}
    fn chunk_started(&self, _idx: usize) {}
    fn chunk_finished(&self, _idx: usize) {}
    fn archive_built(&self, _path: &Path) {}
    fn compressed(&self, _path: &Path) {}
}

/// Discards every event. The default reporter.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {}

/// A structured progress event, as delivered by [`ChannelReporter`].
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Enumerated(usize),
    Classified(usize),
    ChunkStarted(usize),
    ChunkFinished(usize),
    ArchiveBuilt(PathBuf),
    Compressed(PathBuf),
}

/// Forwards every event down an `mpsc::Sender`, so a caller can consume
/// progress from another thread (e.g. a UI loop) without blocking workers
/// (spec §5: "single-producer multi-consumer... buffered by the reporter").
/// A send failure (receiver dropped) is silently ignored — a caller that
/// stopped listening should not abort the pipeline.
pub struct ChannelReporter {
    sender: Sender<ProgressEvent>,
}

impl ChannelReporter {
    pub fn new(sender: Sender<ProgressEvent>) -> Self {
        Self { sender }
    }
}

impl ProgressReporter for ChannelReporter {
    fn enumerated(&self, total: usize) {
        let _ = self.sender.send(ProgressEvent::Enumerated(total));
    }
    fn classified(&self, count: usize) {
        let _ = self.sender.send(ProgressEvent::Classified(count));
    }
    fn chunk_started(&self, idx: usize) {
        let _ = self.sender.send(ProgressEvent::ChunkStarted(idx));
    }
    fn chunk_finished(&self, idx: usize) {
        let _ = self.sender.send(ProgressEvent::ChunkFinished(idx));
    }
    fn archive_built(&self, path: &Path) {
        let _ = self.sender.send(ProgressEvent::ArchiveBuilt(path.to_path_buf()));
    }
    fn compressed(&self, path: &Path) {
        let _ = self.sender.send(ProgressEvent::Compressed(path.to_path_buf()));
    }
}
