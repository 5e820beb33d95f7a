//! Monotonic clock, drift-free periodic timer, and scheduling hints.
//!
//! Every timestamp in the pipeline comes from [`now_ns`]: nanoseconds on the
//! steady clock since a process-wide anchor. Wall-clock time never appears;
//! system time adjustments cannot reorder a tick stream.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;

fn anchor() -> Instant {
    static ANCHOR: OnceLock<Instant> = OnceLock::new();
    *ANCHOR.get_or_init(Instant::now)
}

/// Nanoseconds since the process clock anchor. Steady, monotonic,
/// unaffected by system time adjustments.
#[inline]
pub fn now_ns() -> u64 {
    anchor().elapsed().as_nanos() as u64
}

/// Sleeps the current thread until `deadline` on the steady clock.
pub(crate) fn sleep_until(deadline: Instant) {
    let now = Instant::now();
    if deadline > now {
        thread::sleep(deadline - now);
    }
}

/// Error from timer lifecycle operations.
#[derive(Debug, Error)]
pub enum TimerError {
    /// The timer already has a live worker thread.
    #[error("timer is already running")]
    AlreadyRunning,
    /// The worker thread could not be spawned.
    #[error("failed to spawn timer thread: {0}")]
    Spawn(#[from] io::Error),
}

struct TimerShared {
    running: AtomicBool,
    /// Pairs with `wakeup` so `stop()` interrupts a sleeping timer
    /// immediately instead of waiting out the interval.
    gate: Mutex<()>,
    wakeup: Condvar,
}

/// Periodic timer firing a callback on a drift-free schedule.
///
/// Firing `N` is scheduled at `anchor + N * interval`, where the anchor is
/// captured when the worker starts; callback duration does not accumulate
/// into the schedule. `stop()` cancels further fires, lets an in-progress
/// callback complete, and joins the worker.
pub struct PeriodicTimer {
    interval: Duration,
    shared: Arc<TimerShared>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTimer {
    /// Creates a stopped timer with the given interval.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            shared: Arc::new(TimerShared {
                running: AtomicBool::new(false),
                gate: Mutex::new(()),
                wakeup: Condvar::new(),
            }),
            handle: None,
        }
    }

    /// Returns the configured interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true while the worker thread is live.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Starts firing `callback` every interval. Errors if already running.
    pub fn start<F>(&mut self, mut callback: F) -> Result<(), TimerError>
    where
        F: FnMut() + Send + 'static,
    {
        if self.handle.is_some() {
            return Err(TimerError::AlreadyRunning);
        }

        self.shared.running.store(true, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let interval = self.interval;

        let handle = thread::Builder::new()
            .name("periodic-timer".into())
            .spawn(move || {
                let start = Instant::now();
                let mut fires: u32 = 1;
                loop {
                    let deadline = start + interval * fires;
                    if !wait_until(&shared, deadline) {
                        break;
                    }
                    callback();
                    fires += 1;
                }
            })?;

        self.handle = Some(handle);
        Ok(())
    }

    /// Stops the timer and joins the worker. Idempotent.
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        self.shared.wakeup.notify_all();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Waits until `deadline` or cancellation. Returns true if still running.
fn wait_until(shared: &TimerShared, deadline: Instant) -> bool {
    let mut guard = match shared.gate.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    };
    loop {
        if !shared.running.load(Ordering::Acquire) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        guard = match shared.wakeup.wait_timeout(guard, deadline - now) {
            Ok((g, _)) => g,
            Err(poisoned) => poisoned.into_inner().0,
        };
    }
}

/// Pins the calling thread to `core`. Returns false where unsupported or
/// rejected by the OS; no side effects on failure.
#[cfg(target_os = "linux")]
pub fn pin_to_core(core: usize) -> bool {
    // SAFETY: cpu_set_t is plain data; sched_setaffinity(0, ..) targets the
    // calling thread and only reads the set.
    unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(core, &mut set);
        libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set) == 0
    }
}

#[cfg(not(target_os = "linux"))]
pub fn pin_to_core(_core: usize) -> bool {
    false
}

/// Requests the SCHED_FIFO real-time class at `priority` (clamped to the
/// valid 1..=99 range) for the calling thread. Returns false where
/// unsupported or rejected (typically: not privileged).
#[cfg(target_os = "linux")]
pub fn set_realtime_priority(priority: i32) -> bool {
    let param = libc::sched_param {
        sched_priority: priority.clamp(1, 99),
    };
    // SAFETY: sched_setscheduler(0, ..) targets the calling thread and only
    // reads the parameter struct.
    unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) == 0 }
}

#[cfg(not(target_os = "linux"))]
pub fn set_realtime_priority(_priority: i32) -> bool {
    false
}
