//! Batch execution of independent pipeline passes.
//!
//! Sensitivity perturbations and uncertainty samples share no mutable
//! state, so they can be fanned out. [`Executor::Threaded`] feeds task
//! indices through a crossbeam channel to a pool of scoped worker
//! threads; results come back tagged with their index and are
//! reassembled in order, so output never depends on scheduling.

use std::fmt;
use std::thread;

use crate::cancel::CancelToken;

/// Returned when a batch stops early because its token was cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cancelled {
    /// Tasks that finished before the stop.
    pub completed: usize,
}

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cancelled after {} completed tasks", self.completed)
    }
}

impl std::error::Error for Cancelled {}

/// How independent passes are scheduled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Executor {
    /// One after another on the calling thread.
    #[default]
    Sequential,
    /// A pool of scoped worker threads.
    Threaded {
        /// Worker count. `None` = auto-detect (`available_parallelism`,
        /// clamped to `[1, 16]`).
        workers: Option<usize>,
    },
}

impl Executor {
    /// Resolve the worker count, applying auto-detection if `None`.
    ///
    /// Explicit values are clamped to `[1, 64]`.
    pub fn resolved_workers(&self) -> usize {
        match *self {
            Self::Sequential => 1,
            Self::Threaded { workers: Some(n) } => n.clamp(1, 64),
            Self::Threaded { workers: None } => thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
                .clamp(1, 16),
        }
    }

    /// Run `f(0) .. f(count - 1)` and return the results in index order.
    ///
    /// `cancel` is checked before each task starts.
    ///
    /// # Errors
    ///
    /// [`Cancelled`] if the token was set before every task ran.
    pub fn map<R, F>(&self, count: usize, cancel: &CancelToken, f: F) -> Result<Vec<R>, Cancelled>
    where
        R: Send,
        F: Fn(usize) -> R + Sync,
    {
        match self {
            Self::Sequential => {
                let mut out = Vec::with_capacity(count);
                for i in 0..count {
                    if cancel.is_cancelled() {
                        return Err(Cancelled { completed: i });
                    }
                    out.push(f(i));
                }
                Ok(out)
            }
            Self::Threaded { .. } => self.map_threaded(count, cancel, &f),
        }
    }

    fn map_threaded<R, F>(&self, count: usize, cancel: &CancelToken, f: &F) -> Result<Vec<R>, Cancelled>
    where
        R: Send,
        F: Fn(usize) -> R + Sync,
    {
        let workers = self.resolved_workers().min(count.max(1));
        let (task_tx, task_rx) = crossbeam_channel::bounded::<usize>(count.max(1));
        let (done_tx, done_rx) = crossbeam_channel::unbounded::<(usize, R)>();

        for i in 0..count {
            // Capacity equals count, so this never blocks.
            let _ = task_tx.send(i);
        }
        drop(task_tx);

        thread::scope(|s| {
            for _ in 0..workers {
                let task_rx = task_rx.clone();
                let done_tx = done_tx.clone();
                s.spawn(move || {
                    while let Ok(i) = task_rx.recv() {
                        if cancel.is_cancelled() {
                            break;
                        }
                        if done_tx.send((i, f(i))).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(done_tx);

        let mut slots: Vec<Option<R>> = (0..count).map(|_| None).collect();
        for (i, r) in done_rx.try_iter() {
            slots[i] = Some(r);
        }
        let completed = slots.iter().filter(|s| s.is_some()).count();
        if completed < count {
            return Err(Cancelled { completed });
        }
        Ok(slots.into_iter().flatten().collect())
    }
}
