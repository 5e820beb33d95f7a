//! Fixed worker pool draining a bounded MPSC task queue.
//!
//! Submit-and-forget semantics: a task is a boxed closure, the queue never
//! grows, and a full queue is reported to the submitter. A panicking task is
//! caught and logged; the worker survives.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_utils::Backoff;
use thiserror::Error;
use tickring::MpscRing;

use crate::locks::recover;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Error from task submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The bounded task queue rejected the task.
    #[error("task queue is full")]
    QueueFull,
    /// The pool has been stopped.
    #[error("worker pool is shutting down")]
    ShuttingDown,
}

struct WorkersShared {
    queue: MpscRing<Task>,
    /// Serializes pops across workers; the ring's consumer side is
    /// single-reader. The lock covers only the pop, never task execution.
    consumer_gate: Mutex<()>,
    running: AtomicBool,
}

/// Fixed thread set executing submitted closures.
pub struct WorkerPool {
    shared: Arc<WorkersShared>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `num_threads` workers sharing a queue of `queue_capacity`
    /// slots (rounded up to a power of two).
    pub fn new(num_threads: usize, queue_capacity: usize) -> Self {
        let capacity = queue_capacity.max(2).next_power_of_two();
        let shared = Arc::new(WorkersShared {
            queue: MpscRing::with_capacity(capacity),
            consumer_gate: Mutex::new(()),
            running: AtomicBool::new(true),
        });

        let handles = (0..num_threads.max(1))
            .map(|i| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("worker-{i}"))
                    .spawn(move || worker_loop(&shared))
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    log::error!("[workers] failed to spawn worker: {e}");
                    None
                }
            })
            .collect();

        Self { shared, handles }
    }

    /// Returns the number of live worker threads.
    pub fn num_threads(&self) -> usize {
        self.handles.len()
    }

    /// Enqueues a fire-and-forget task.
    pub fn submit<F>(&self, task: F) -> Result<(), SubmitError>
    where
        F: FnOnce() + Send + 'static,
    {
        if !self.shared.running.load(Ordering::Acquire) {
            return Err(SubmitError::ShuttingDown);
        }
        if self.shared.queue.push(Box::new(task)) {
            Ok(())
        } else {
            Err(SubmitError::QueueFull)
        }
    }

    /// Enqueues a task whose result can be awaited through the returned
    /// handle. Layered on `submit`: the worker writes a single-shot slot
    /// the caller observes.
    pub fn submit_with_handle<R, F>(&self, task: F) -> Result<TaskHandle<R>, SubmitError>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let slot = Arc::new(ResultSlot {
            value: Mutex::new(None),
            ready: Condvar::new(),
        });
        let worker_slot = Arc::clone(&slot);
        self.submit(move || {
            let result = task();
            *recover(&worker_slot.value, "task result slot") = Some(result);
            worker_slot.ready.notify_all();
        })?;
        Ok(TaskHandle { slot })
    }

    /// Stops the pool: workers observe the flag between tasks and exit.
    /// In-flight tasks complete; queued tasks are abandoned. Idempotent.
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(shared: &WorkersShared) {
    let backoff = Backoff::new();
    loop {
        if !shared.running.load(Ordering::Acquire) {
            break;
        }

        let task = {
            let _gate = recover(&shared.consumer_gate, "task queue consumer gate");
            shared.queue.pop()
        };

        match task {
            Some(task) => {
                backoff.reset();
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
                    log::error!("[workers] task panicked: {}", panic_message(&payload));
                }
            }
            None => {
                backoff.snooze();
                if backoff.is_completed() {
                    backoff.reset();
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}

struct ResultSlot<R> {
    value: Mutex<Option<R>>,
    ready: Condvar,
}

/// Handle observing a single task's result.
///
/// If the task panics before writing its result, waiting times out and
/// yields `None`.
pub struct TaskHandle<R> {
    slot: Arc<ResultSlot<R>>,
}

impl<R> TaskHandle<R> {
    /// Takes the result if the task has finished.
    pub fn try_take(&self) -> Option<R> {
        recover(&self.slot.value, "task result slot").take()
    }

    /// Waits up to `timeout` for the result.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<R> {
        let deadline = Instant::now() + timeout;
        let mut guard = recover(&self.slot.value, "task result slot");
        loop {
            if let Some(result) = guard.take() {
                return Some(result);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            guard = match self.slot.ready.wait_timeout(guard, deadline - now) {
                Ok((g, _)) => g,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }
}
