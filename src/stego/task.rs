//! Background execution for long-running codec operations.
//!
//! Video encoding and decoding can walk hundreds of frames, so callers that
//! need to stay responsive run them through [`spawn`]: the operation executes
//! on a worker thread, reports frame progress over a channel, and can be
//! cancelled at any point. The result or error is only handed back on
//! [`TaskHandle::join`]. No GUI toolkit is involved; any frontend can drain
//! the progress receiver however it likes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;

use crate::stego::StegoError;

/// Progress of a frame-based operation.
#[derive(Debug, Clone, Copy)]
pub struct FrameProgress {
    /// Frames processed so far.
    pub processed: u64,
    /// Total frames when known up front.
    pub total: Option<u64>,
}

/// Progress reporting and cancellation hooks handed to codec operations.
///
/// [`ProgressSink::noop`] gives a sink that drops reports and never cancels,
/// for synchronous callers.
pub struct ProgressSink {
    tx: Option<Sender<FrameProgress>>,
    cancel: Arc<AtomicBool>,
}

impl ProgressSink {
    /// A sink that ignores progress and never cancels.
    pub fn noop() -> Self {
        Self {
            tx: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Reports progress. Disconnected receivers are ignored.
    pub fn report(&self, processed: u64, total: Option<u64>) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(FrameProgress { processed, total });
        }
    }

    /// Whether the caller has requested cancellation.
    pub fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

/// Handle to a spawned codec operation.
pub struct TaskHandle<T> {
    cancel: Arc<AtomicBool>,
    /// Receives [`FrameProgress`] updates while the task runs.
    pub progress: Receiver<FrameProgress>,
    handle: JoinHandle<Result<T, StegoError>>,
}

impl<T> TaskHandle<T> {
    /// Requests cancellation. The task notices at its next frame boundary and
    /// finishes with [`StegoError::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Waits for the task and returns its result.
    pub fn join(self) -> Result<T, StegoError> {
        self.handle
            .join()
            .unwrap_or_else(|_| Err(StegoError::Video("worker thread panicked".to_string())))
    }
}

/// Runs `op` on a worker thread with a connected [`ProgressSink`].
pub fn spawn<T, F>(op: F) -> TaskHandle<T>
where
    T: Send + 'static,
    F: FnOnce(&ProgressSink) -> Result<T, StegoError> + Send + 'static,
{
    let cancel = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel();

    let sink = ProgressSink {
        tx: Some(tx),
        cancel: Arc::clone(&cancel),
    };

    let handle = std::thread::spawn(move || op(&sink));

    TaskHandle {
        cancel,
        progress: rx,
        handle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_reports_progress_and_result() {
        let handle = spawn(|sink| {
            for i in 0..5u64 {
                sink.report(i + 1, Some(5));
            }
            Ok(42)
        });

        let updates: Vec<FrameProgress> = handle.progress.iter().collect();
        assert_eq!(updates.len(), 5);
        assert_eq!(updates[4].processed, 5);
        assert_eq!(handle.join().unwrap(), 42);
    }

    #[test]
    fn test_cancellation() {
        let handle = spawn::<(), _>(|sink| {
            loop {
                if sink.cancelled() {
                    return Err(StegoError::Cancelled);
                }
                std::thread::yield_now();
            }
        });

        handle.cancel();
        assert!(matches!(handle.join(), Err(StegoError::Cancelled)));
    }

    #[test]
    fn test_noop_sink() {
        let sink = ProgressSink::noop();
        sink.report(1, None);
        assert!(!sink.cancelled());
    }

    #[test]
    fn test_error_propagates() {
        let handle = spawn::<(), _>(|_| Err(StegoError::NoHiddenData));
        assert!(matches!(handle.join(), Err(StegoError::NoHiddenData)));
    }
}
