//! Batch print orchestration: validate, pre-render, then print a range of
//! items through a [`PrintSink`].
//!
//! A run moves through [`RunState::Validating`], [`RunState::PreRendering`]
//! and [`RunState::Printing`] and ends in one of the terminal states of
//! [`RunOutcome`]. Per-item problems never abort the call; they are
//! collected in [`RunResult::failures`].
//!
//! Rasters are owned values. Each one is dropped right after its item's
//! last copy is drawn, and whatever is still held when a run stops early is
//! dropped on the way out.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use labelbatch_core::{BarcodeRender, Item, RenderRequest, validate};
use tracing::{debug, info, warn};

use crate::{BatchError, BatchPrintOptions, DestRect, PrintSink};

/// Status text of the report emitted before pre-rendering starts.
pub const STATUS_GENERATING: &str = "Generating barcode images...";

// ── Cancellation ────────────────────────────────────────────────────────

/// Cooperative cancellation flag shared between a caller and a run.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The run stops at its next checkpoint.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ── States and reports ──────────────────────────────────────────────────

/// Where an orchestrator is in its current (or last) run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RunState {
    /// No run has started.
    #[default]
    Idle,
    /// Checking every selected item.
    Validating,
    /// Rendering rasters.
    PreRendering,
    /// Sending pages to the sink.
    Printing,
    /// The last run finished every item.
    Completed,
    /// The last run was cancelled.
    Cancelled,
    /// The last run stopped at its first failure.
    AbortedOnError,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RunOutcome {
    /// Every selected item was attempted.
    Completed,
    /// Cancellation was observed at a checkpoint.
    Cancelled,
    /// A failure stopped the run (`continue_on_error` was off, or the
    /// document could not be opened).
    AbortedOnError,
}

impl From<RunOutcome> for RunState {
    fn from(outcome: RunOutcome) -> Self {
        match outcome {
            RunOutcome::Completed => RunState::Completed,
            RunOutcome::Cancelled => RunState::Cancelled,
            RunOutcome::AbortedOnError => RunState::AbortedOnError,
        }
    }
}

/// Which phase a progress report belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Phase {
    /// Rendering rasters.
    PreRendering,
    /// Printing pages.
    Printing,
}

/// One progress report.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Progress {
    /// Phase the report belongs to.
    pub phase: Phase,
    /// 1-based position within the phase; 0 before the first item.
    pub current_item: usize,
    /// Number of items selected for the run.
    pub total_items: usize,
    /// Data of the current item (empty before the first item).
    pub current_data: String,
    /// Human-readable status line.
    pub status: String,
}

impl Progress {
    /// Completion within the phase, `0.0..=100.0`; 0 when nothing is selected.
    pub fn percentage(&self) -> f64 {
        if self.total_items == 0 {
            return 0.0;
        }
        self.current_item as f64 / self.total_items as f64 * 100.0
    }
}

/// A per-item failure.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Failure {
    /// Index of the item in the full item list.
    pub index: usize,
    /// The item's data.
    pub data: String,
    /// What went wrong.
    pub message: String,
}

/// Result of one run.
///
/// `printed_count` counts items whose every copy was drawn;
/// `pages_printed` counts individual pages.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RunResult {
    /// Items whose every copy reached the sink.
    pub printed_count: usize,
    /// Pages drawn.
    pub pages_printed: usize,
    /// Per-item failures, in print order.
    pub failures: Vec<Failure>,
    /// How the run ended.
    pub outcome: RunOutcome,
    /// The last progress report emitted, if any.
    pub last_progress: Option<Progress>,
    /// Error from opening or closing the sink's document, if any.
    pub document_error: Option<String>,
}

impl RunResult {
    /// Completed with no failures and a cleanly closed document.
    pub fn is_success(&self) -> bool {
        self.outcome == RunOutcome::Completed
            && self.failures.is_empty()
            && self.document_error.is_none()
    }
}

// ── Run bookkeeping ─────────────────────────────────────────────────────

#[derive(Default)]
struct Tally {
    printed_count: usize,
    pages_printed: usize,
    failures: Vec<Failure>,
    last_progress: Option<Progress>,
    document_error: Option<String>,
}

impl Tally {
    fn report<F: FnMut(&Progress)>(&mut self, on_progress: &mut F, progress: Progress) {
        on_progress(&progress);
        self.last_progress = Some(progress);
    }

    fn fail(&mut self, index: usize, item: &Item, message: impl Into<String>) {
        let message = message.into();
        warn!(index, data = %item.data, error = %message, "item failed");
        self.failures.push(Failure {
            index,
            data: item.data.clone(),
            message,
        });
    }

    fn finish(self, outcome: RunOutcome) -> RunResult {
        RunResult {
            printed_count: self.printed_count,
            pages_printed: self.pages_printed,
            failures: self.failures,
            outcome,
            last_progress: self.last_progress,
            document_error: self.document_error,
        }
    }
}

/// Clamp `start..=end` to `len` items. `None` when nothing is selected.
fn select_range(len: usize, start: usize, end: usize) -> Option<RangeInclusive<usize>> {
    let last = len.checked_sub(1)?;
    let (start, end) = (start.min(last), end.min(last));
    (start <= end).then_some(start..=end)
}

fn progress(phase: Phase, current: usize, total: usize, item: &Item, status: String) -> Progress {
    Progress {
        phase,
        current_item: current,
        total_items: total,
        current_data: item.data.clone(),
        status,
    }
}

/// Releases the single-run flag on every exit path.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ── Orchestrator ────────────────────────────────────────────────────────

/// Runs batches through a renderer and a print sink. One run at a time.
#[derive(Debug)]
pub struct Orchestrator<R> {
    renderer: R,
    running: AtomicBool,
    state: Mutex<RunState>,
    ledger: Mutex<BTreeSet<(usize, String)>>,
}

impl<R: BarcodeRender> Orchestrator<R> {
    /// An idle orchestrator with an empty print ledger.
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            running: AtomicBool::new(false),
            state: Mutex::new(RunState::Idle),
            ledger: Mutex::new(BTreeSet::new()),
        }
    }

    /// The renderer used for pre-rendering.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Current state; terminal states persist until the next run.
    pub fn state(&self) -> RunState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a run is active.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Forget which items earlier runs printed.
    pub fn reset_ledger(&self) {
        self.ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of (index, data) entries recorded as printed.
    pub fn ledger_len(&self) -> usize {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn set_state(&self, state: RunState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn was_printed(&self, index: usize, data: &str) -> bool {
        self.ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(index, data.to_string()))
    }

    fn mark_printed(&self, index: usize, data: &str) {
        self.ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((index, data.to_string()));
    }

    /// Print `items[options.start_index..=options.end_index]` through `sink`.
    ///
    /// `on_progress` is called once before pre-rendering, once per item
    /// while pre-rendering, and once per item while printing. `cancel` is
    /// checked before pre-rendering, before each pre-render item, before
    /// each printed item and before every page.
    ///
    /// Returns [`BatchError::AlreadyRunning`] if another run is active.
    pub fn run<S, F>(
        &self,
        sink: &mut S,
        items: &[Item],
        options: &BatchPrintOptions,
        mut on_progress: F,
        cancel: &CancelToken,
    ) -> Result<RunResult, BatchError>
    where
        S: PrintSink,
        F: FnMut(&Progress),
    {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(BatchError::AlreadyRunning);
        }
        let _guard = RunGuard(&self.running);

        let result = self.execute(sink, items, options, &mut on_progress, cancel);
        self.set_state(result.outcome.into());
        info!(
            outcome = ?result.outcome,
            printed = result.printed_count,
            pages = result.pages_printed,
            failures = result.failures.len(),
            "batch run finished"
        );
        Ok(result)
    }

    fn execute<S, F>(
        &self,
        sink: &mut S,
        items: &[Item],
        options: &BatchPrintOptions,
        on_progress: &mut F,
        cancel: &CancelToken,
    ) -> RunResult
    where
        S: PrintSink,
        F: FnMut(&Progress),
    {
        let mut tally = Tally::default();

        let Some(range) = select_range(items.len(), options.start_index, options.end_index)
        else {
            info!(items = items.len(), "empty selection; nothing to print");
            return tally.finish(RunOutcome::Completed);
        };
        let work: Vec<usize> = range
            .filter(|&i| {
                let skip = options.skip_printed_items && self.was_printed(i, &items[i].data);
                if skip {
                    debug!(index = i, "already printed; skipping");
                }
                !skip
            })
            .collect();
        let total = work.len();
        if total == 0 {
            info!("every selected item was already printed");
            return tally.finish(RunOutcome::Completed);
        }
        info!(total, printer = %options.printer, "batch run started");

        // -- Validating --
        self.set_state(RunState::Validating);
        let verdicts: Vec<_> = work
            .iter()
            .map(|&i| validate(&items[i].data, items[i].symbology))
            .collect();

        // -- Pre-rendering --
        self.set_state(RunState::PreRendering);
        tally.report(
            on_progress,
            Progress {
                phase: Phase::PreRendering,
                current_item: 0,
                total_items: total,
                current_data: String::new(),
                status: STATUS_GENERATING.to_string(),
            },
        );
        if cancel.is_cancelled() {
            return tally.finish(RunOutcome::Cancelled);
        }

        let mut rasters: Vec<Result<R::Raster, String>> = Vec::with_capacity(total);
        for (pos, (&i, verdict)) in work.iter().zip(&verdicts).enumerate() {
            if cancel.is_cancelled() {
                return tally.finish(RunOutcome::Cancelled);
            }
            let item = &items[i];
            let slot = if verdict.is_valid {
                let request = RenderRequest::for_item(item, &options.defaults, options.dpi);
                self.renderer.render(&request).map_err(|e| {
                    warn!(index = i, data = %item.data, reason = %e, "render failed");
                    e.reason
                })
            } else {
                debug!(index = i, reason = verdict.message, "invalid item; not rendered");
                Err(verdict.message.to_string())
            };
            rasters.push(slot);
            tally.report(
                on_progress,
                progress(
                    Phase::PreRendering,
                    pos + 1,
                    total,
                    item,
                    format!("Rendered {} of {total}", pos + 1),
                ),
            );
        }

        // -- Printing --
        self.set_state(RunState::Printing);
        let mut handle = match sink.begin_document(&options.printer) {
            Ok(h) => h,
            Err(e) => {
                warn!(printer = %options.printer, error = %e, "could not open document");
                tally.document_error = Some(e.to_string());
                return tally.finish(RunOutcome::AbortedOnError);
            }
        };
        let dest = DestRect::for_label(&options.label, sink.page_size(&handle));

        let outcome = self.print_pages(
            sink,
            &mut handle,
            items,
            &work,
            rasters,
            dest,
            options.continue_on_error,
            on_progress,
            cancel,
            &mut tally,
        );

        if let Err(e) = sink.end_document(handle) {
            warn!(error = %e, "could not close document");
            tally.document_error.get_or_insert(e.to_string());
        }
        tally.finish(outcome)
    }

    #[allow(clippy::too_many_arguments)]
    fn print_pages<S, F>(
        &self,
        sink: &mut S,
        handle: &mut S::Handle,
        items: &[Item],
        work: &[usize],
        rasters: Vec<Result<R::Raster, String>>,
        dest: DestRect,
        continue_on_error: bool,
        on_progress: &mut F,
        cancel: &CancelToken,
        tally: &mut Tally,
    ) -> RunOutcome
    where
        S: PrintSink,
        F: FnMut(&Progress),
    {
        let total = work.len();
        for (pos, (&i, slot)) in work.iter().zip(rasters).enumerate() {
            if cancel.is_cancelled() {
                return RunOutcome::Cancelled;
            }
            let item = &items[i];
            tally.report(
                on_progress,
                progress(
                    Phase::Printing,
                    pos + 1,
                    total,
                    item,
                    format!("Printing {} of {total}", pos + 1),
                ),
            );

            let raster = match slot {
                Ok(raster) => raster,
                Err(message) => {
                    tally.fail(i, item, message);
                    if continue_on_error {
                        continue;
                    }
                    return RunOutcome::AbortedOnError;
                }
            };

            let mut all_copies = true;
            for copy in 0..item.quantity {
                if cancel.is_cancelled() {
                    return RunOutcome::Cancelled;
                }
                if let Err(e) = sink.draw_page(handle, raster.as_ref(), dest) {
                    tally.fail(i, item, e.to_string());
                    all_copies = false;
                    break;
                }
                tally.pages_printed += 1;
                debug!(index = i, copy = copy + 1, of = item.quantity, "page drawn");
            }
            drop(raster);

            if all_copies {
                tally.printed_count += 1;
                self.mark_printed(i, &item.data);
            } else if !continue_on_error {
                return RunOutcome::AbortedOnError;
            }
        }
        RunOutcome::Completed
    }
}
