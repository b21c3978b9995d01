//! Running a batch off the caller's thread.

use std::any::Any;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};

use labelbatch_core::{BarcodeRender, Item};
use tracing::debug;

use crate::{BatchError, BatchPrintOptions, CancelToken, Orchestrator, PrintSink, Progress, RunResult};

/// A batch run on a dedicated thread.
///
/// Progress reports arrive on a channel; cancellation goes through the
/// shared [`CancelToken`]. The orchestrator's single-run guard still
/// applies, so spawning a second worker on a busy orchestrator yields
/// [`BatchError::AlreadyRunning`] from [`join`](Self::join).
#[derive(Debug)]
pub struct BatchWorker {
    handle: JoinHandle<Result<RunResult, BatchError>>,
    progress: Receiver<Progress>,
    cancel: CancelToken,
}

impl BatchWorker {
    /// Start `orchestrator.run` on a new thread. The worker owns the sink
    /// and the items for the duration of the run.
    pub fn spawn<R, S>(
        orchestrator: Arc<Orchestrator<R>>,
        mut sink: S,
        items: Vec<Item>,
        options: BatchPrintOptions,
    ) -> Result<Self, BatchError>
    where
        R: BarcodeRender + 'static,
        S: PrintSink + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let cancel = CancelToken::new();
        let token = cancel.clone();

        let handle = thread::Builder::new()
            .name("labelbatch-worker".into())
            .spawn(move || {
                debug!(items = items.len(), "worker started");
                orchestrator.run(
                    &mut sink,
                    &items,
                    &options,
                    |p| {
                        // The receiver may be gone; the run continues regardless.
                        let _ = tx.send(p.clone());
                    },
                    &token,
                )
            })
            .map_err(|e| BatchError::SpawnFailed(e.to_string()))?;

        Ok(Self {
            handle,
            progress: rx,
            cancel,
        })
    }

    /// The token shared with the running batch.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The progress channel. It disconnects when the run ends.
    pub fn progress(&self) -> &Receiver<Progress> {
        &self.progress
    }

    /// Next queued report, without blocking.
    pub fn try_progress(&self) -> Option<Progress> {
        match self.progress.try_recv() {
            Ok(p) => Some(p),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Whether the worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the run to end.
    pub fn join(self) -> Result<RunResult, BatchError> {
        self.handle
            .join()
            .map_err(|payload| BatchError::WorkerPanicked(panic_message(payload.as_ref())))?
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
