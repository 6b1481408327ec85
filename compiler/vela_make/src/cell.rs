//! Write-once result cell for build jobs.

use parking_lot::{Condvar, Mutex};
use vela_externs::ModuleName;

use crate::plan::BuildResult;

/// One-shot synchronization slot holding a build job's eventual outcome.
///
/// Written exactly once by whichever worker completes the module; read any
/// number of times by dependents and result collection. Reads return clones
/// (`Arc`-backed, so cheap), which makes peeks repeatable and
/// non-destructive. A second write is an invariant violation and panics:
/// a silently replaced result could hand dependents two different truths.
pub(crate) struct ResultCell {
    slot: Mutex<Option<BuildResult>>,
    ready: Condvar,
}

impl ResultCell {
    /// Create an empty cell.
    pub(crate) fn new() -> Self {
        ResultCell {
            slot: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    /// Store the single result and wake all waiters.
    ///
    /// # Panics
    /// Panics if a result was already written for this module.
    pub(crate) fn write(&self, module: &ModuleName, result: BuildResult) {
        let mut slot = self.slot.lock();
        assert!(
            slot.is_none(),
            "build job result for module {module} written twice"
        );
        *slot = Some(result);
        self.ready.notify_all();
    }

    /// Block until the result is written, then return a clone of it.
    pub(crate) fn wait(&self) -> BuildResult {
        let mut slot = self.slot.lock();
        loop {
            if let Some(result) = slot.as_ref() {
                return result.clone();
            }
            self.ready.wait(&mut slot);
        }
    }

    /// The result if already written; never blocks.
    pub(crate) fn peek(&self) -> Option<BuildResult> {
        self.slot.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    fn module(name: &str) -> ModuleName {
        ModuleName::new(name)
    }

    #[test]
    fn test_peek_before_write_is_none() {
        let cell = ResultCell::new();
        assert!(cell.peek().is_none());
    }

    #[test]
    fn test_write_then_wait_and_peek_agree() {
        let cell = ResultCell::new();
        cell.write(&module("m"), BuildResult::Skipped);
        assert!(matches!(cell.wait(), BuildResult::Skipped));
        assert!(matches!(cell.peek(), Some(BuildResult::Skipped)));
        // Reads are repeatable.
        assert!(matches!(cell.wait(), BuildResult::Skipped));
    }

    #[test]
    #[should_panic(expected = "written twice")]
    fn test_double_write_panics() {
        let cell = ResultCell::new();
        cell.write(&module("m"), BuildResult::Skipped);
        cell.write(&module("m"), BuildResult::Skipped);
    }

    #[test]
    fn test_wait_blocks_until_write() {
        let cell = std::sync::Arc::new(ResultCell::new());
        let (tx, rx) = mpsc::channel();

        let reader = {
            let cell = std::sync::Arc::clone(&cell);
            std::thread::spawn(move || {
                let result = cell.wait();
                let _ = tx.send(result);
            })
        };

        // Bounded wait: the reader must NOT complete before the write.
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        cell.write(&module("m"), BuildResult::Skipped);
        let observed = rx
            .recv_timeout(Duration::from_secs(5))
            .unwrap_or_else(|e| panic!("reader never woke: {e}"));
        assert!(matches!(observed, BuildResult::Skipped));
        reader.join().unwrap_or_else(|_| panic!("reader panicked"));
    }
}
