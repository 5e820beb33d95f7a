//! Latency/throughput monitor: a sample reservoir with percentile
//! extraction plus monotonic operation counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::locks::recover;

/// Reservoir soft limit; crossing it drops the oldest half so a long-running
/// session keeps recent behavior without unbounded growth.
const RESERVOIR_HIGH_WATER: usize = 100_000;

/// Summary over the latency reservoir. All zero when no samples exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencyStats {
    pub min: Duration,
    pub max: Duration,
    pub mean: Duration,
    pub p99: Duration,
    pub count: usize,
}

/// Operation counters and rates since `start_monitoring`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThroughputStats {
    pub msgs_per_sec: f64,
    pub bytes_per_sec: f64,
    pub total_messages: u64,
    pub total_bytes: u64,
}

/// Records per-operation durations and message/byte counts.
///
/// The reservoir is mutex-protected; readers snapshot-copy before sorting so
/// concurrent writers never observe a partially sorted view. Counters are
/// plain atomics.
pub struct PerfMonitor {
    latencies: Mutex<Vec<Duration>>,
    total_messages: AtomicU64,
    total_bytes: AtomicU64,
    started: Mutex<Option<Instant>>,
}

impl PerfMonitor {
    pub fn new() -> Self {
        Self {
            latencies: Mutex::new(Vec::new()),
            total_messages: AtomicU64::new(0),
            total_bytes: AtomicU64::new(0),
            started: Mutex::new(None),
        }
    }

    /// Appends one latency sample, shedding the oldest half at the
    /// high-water mark.
    pub fn record_latency(&self, sample: Duration) {
        let mut reservoir = recover(&self.latencies, "latency reservoir");
        if reservoir.len() >= RESERVOIR_HIGH_WATER {
            let half = reservoir.len() / 2;
            reservoir.drain(..half);
        }
        reservoir.push(sample);
    }

    /// Counts one operation of `bytes` bytes.
    #[inline]
    pub fn record_operation(&self, bytes: u64) {
        self.total_messages.fetch_add(1, Ordering::Relaxed);
        self.total_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Anchors the elapsed-time base for [`throughput_stats`](Self::throughput_stats).
    pub fn start_monitoring(&self) {
        *recover(&self.started, "monitor anchor") = Some(Instant::now());
    }

    /// Snapshot-copies the reservoir, sorts it, and summarizes.
    ///
    /// `mean` is the integer-rounded average in nanoseconds; `p99` is the
    /// element at index `floor(0.99 * count)` of the sorted samples.
    pub fn latency_stats(&self) -> LatencyStats {
        let mut samples = recover(&self.latencies, "latency reservoir").clone();
        if samples.is_empty() {
            return LatencyStats::default();
        }
        samples.sort_unstable();

        let count = samples.len();
        let total_ns: u128 = samples.iter().map(|d| d.as_nanos()).sum();
        let mean_ns = (total_ns + count as u128 / 2) / count as u128;

        LatencyStats {
            min: samples[0],
            max: samples[count - 1],
            mean: Duration::from_nanos(mean_ns as u64),
            p99: samples[count * 99 / 100],
            count,
        }
    }

    /// Rates over elapsed seconds since `start_monitoring`; all zero before
    /// monitoring starts or when no time has elapsed.
    pub fn throughput_stats(&self) -> ThroughputStats {
        let total_messages = self.total_messages.load(Ordering::Relaxed);
        let total_bytes = self.total_bytes.load(Ordering::Relaxed);

        let elapsed = recover(&self.started, "monitor anchor")
            .map(|anchor| anchor.elapsed())
            .unwrap_or_default();
        let secs = elapsed.as_secs_f64();

        let (msgs_per_sec, bytes_per_sec) = if secs > 0.0 {
            (total_messages as f64 / secs, total_bytes as f64 / secs)
        } else {
            (0.0, 0.0)
        };

        ThroughputStats {
            msgs_per_sec,
            bytes_per_sec,
            total_messages,
            total_bytes,
        }
    }
}

impl Default for PerfMonitor {
    fn default() -> Self {
        Self::new()
    }
}
