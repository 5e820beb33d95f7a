//! mktsim - Synthetic Market-Data Core
//!
//! The simulation half of the tick pipeline: a market-data engine that
//! mutates per-symbol bid/ask/last snapshots on a precise periodic schedule
//! and publishes [`Tick`] records into a lock-free SPSC ring, a subscription
//! facade in front of it, and the cross-cutting facilities the pipeline
//! leans on (object pool, worker pool, latency/throughput monitor, timing
//! primitives).
//!
//! Everything here runs on parallel OS threads; there is no event loop.
//! Components with a worker thread expose an idempotent `stop()` that joins
//! the thread before returning.

pub mod engine;
pub mod feed;
pub mod monitor;
pub mod pool;
pub mod time;
pub mod types;
pub mod workers;

mod locks;

// Re-export main types
pub use engine::{EngineConfig, EngineError, MarketDataEngine};
pub use feed::{MarketDataFeed, SimulatedMarketDataFeed};
pub use monitor::{LatencyStats, PerfMonitor, ThroughputStats};
pub use pool::{ObjectPool, PoolGuard};
pub use time::{now_ns, pin_to_core, set_realtime_priority, PeriodicTimer, TimerError};
pub use types::{Order, OrderStatus, OrderType, Side, Symbol, Tick, Trade};
pub use workers::{SubmitError, TaskHandle, WorkerPool};
