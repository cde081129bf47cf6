//! Cancellable handle for the single status-polling task.

use std::sync::{Mutex, PoisonError};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A running poll task and the token that stops it.
#[derive(Debug)]
pub(crate) struct PollHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub(crate) fn new(cancel: CancellationToken, task: JoinHandle<()>) -> Self {
        Self { cancel, task }
    }

    /// Stops scheduling further polls. A request already on the wire is left
    /// to finish; its result is discarded by the generation check.
    fn stop(self) {
        self.cancel.cancel();
    }

    /// Stops the task immediately, dropping any in-flight request.
    fn abort(self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

/// Holds at most one poll task. Arming a new one stops the previous first.
#[derive(Debug, Default)]
pub(crate) struct PollSlot {
    current: Mutex<Option<PollHandle>>,
}

impl PollSlot {
    pub(crate) fn arm(&self, handle: PollHandle) {
        let previous = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.stop();
        }
    }

    pub(crate) fn disarm(&self) {
        if let Some(handle) = self.take() {
            handle.stop();
        }
    }

    pub(crate) fn abort(&self) {
        if let Some(handle) = self.take() {
            handle.abort();
        }
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(false, |h| !h.cancel.is_cancelled())
    }

    fn take(&self) -> Option<PollHandle> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn spawn_until_cancelled() -> (PollHandle, CancellationToken) {
        let token = CancellationToken::new();
        let child = token.clone();
        let task = tokio::spawn(async move {
            child.cancelled().await;
        });
        (PollHandle::new(token.clone(), task), token)
    }

    #[tokio::test]
    async fn arming_cancels_previous_handle() {
        let slot = PollSlot::default();
        let (first, first_token) = spawn_until_cancelled();
        let (second, second_token) = spawn_until_cancelled();

        slot.arm(first);
        slot.arm(second);

        assert!(first_token.is_cancelled());
        assert!(!second_token.is_cancelled());
        assert!(slot.is_armed());
    }

    #[tokio::test]
    async fn disarm_stops_and_empties_slot() {
        let slot = PollSlot::default();
        let (handle, token) = spawn_until_cancelled();
        slot.arm(handle);

        slot.disarm();

        assert!(token.is_cancelled());
        assert!(!slot.is_armed());
        // Disarming an empty slot is a no-op
        slot.disarm();
    }

    #[tokio::test(start_paused = true)]
    async fn abort_ends_task_that_ignores_token() {
        let slot = PollSlot::default();
        let reached_end = Arc::new(AtomicBool::new(false));
        let flag = reached_end.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            flag.store(true, Ordering::SeqCst);
        });
        slot.arm(PollHandle::new(CancellationToken::new(), task));

        slot.abort();
        tokio::time::sleep(Duration::from_secs(120)).await;

        assert!(!reached_end.load(Ordering::SeqCst));
        assert!(!slot.is_armed());
    }
}
