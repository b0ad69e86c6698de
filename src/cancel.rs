//! Cooperative cancellation threaded through Classifier, Chunker,
//! Compressor, and BatchOrchestrator. Observed at I/O boundaries — per
//! file, per chunk, per mod — never preemptively.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A cheaply-cloneable cancellation flag. Workers check
/// [`CancellationToken::is_cancelled`] at I/O boundaries and drain their
/// current unit of work before exiting.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uncancelled() {
        assert!(!CancellationToken::new().is_cancelled());
    }

    #[test]
    fn cancel_is_visible_through_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
