//! Synthetic market-data engine.
//!
//! A single producer thread walks the symbol table on a drift-free cadence,
//! perturbs each bid/ask/last snapshot with a bounded random walk, and
//! publishes the resulting [`Tick`] into an SPSC ring. A slow consumer is
//! non-fatal: the tick is dropped and counted.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tickring::SpscRing;

use crate::locks::recover;
use crate::time::{now_ns, sleep_until};
use crate::types::{Symbol, Tick};

/// Engine construction parameters.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Cadence of the tick loop.
    pub tick_interval: Duration,
    /// Output ring capacity (power of two).
    pub ring_capacity: usize,
    /// Fixed RNG seed for reproducible streams; entropy-seeded when `None`.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(1),
            ring_capacity: 8192,
            seed: None,
        }
    }
}

/// Error from engine lifecycle operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The symbol table is frozen while the producer thread runs.
    #[error("engine is running; stop it before mutating the symbol table")]
    Running,
    /// The symbol was already added.
    #[error("symbol {0} is already registered")]
    DuplicateSymbol(Symbol),
    /// The producer thread could not be spawned.
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[from] io::Error),
}

pub(crate) struct EngineShared {
    pub(crate) ring: SpscRing<Tick>,
    /// Per-symbol current tick, in insertion order. Only the producer thread
    /// writes while running; `add_symbol` is rejected during a run, so the
    /// lock is effectively uncontended on the hot path.
    symbols: Mutex<Vec<Tick>>,
    rng: Mutex<StdRng>,
    running: AtomicBool,
    dropped_ticks: AtomicU64,
}

/// Per-symbol state machine publishing ticks on a periodic schedule.
pub struct MarketDataEngine {
    shared: Arc<EngineShared>,
    config: EngineConfig,
    handle: Option<JoinHandle<()>>,
}

impl MarketDataEngine {
    pub fn new(config: EngineConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            shared: Arc::new(EngineShared {
                ring: SpscRing::with_capacity(config.ring_capacity),
                symbols: Mutex::new(Vec::new()),
                rng: Mutex::new(rng),
                running: AtomicBool::new(false),
                dropped_ticks: AtomicU64::new(0),
            }),
            config,
            handle: None,
        }
    }

    /// Registers `symbol` at a reference price. Rejected while running: the
    /// symbol table is fixed once the producer starts (stop, add, restart).
    ///
    /// Initial book: bid at 99.9% and ask at 100.1% of the reference price,
    /// sizes drawn uniformly from `[100, 10_000]`, last at the reference.
    pub fn add_symbol(&self, symbol: impl Into<Symbol>, price: f64) -> Result<(), EngineError> {
        if self.is_running() {
            return Err(EngineError::Running);
        }
        let symbol = symbol.into();

        let mut symbols = recover(&self.shared.symbols, "symbol table");
        if symbols.iter().any(|tick| tick.symbol == symbol) {
            return Err(EngineError::DuplicateSymbol(symbol));
        }

        let mut rng = recover(&self.shared.rng, "engine rng");
        let sizes = Uniform::new_inclusive(100u32, 10_000);
        symbols.push(Tick {
            symbol,
            bid: price * 0.999,
            ask: price * 1.001,
            bid_size: sizes.sample(&mut *rng),
            ask_size: sizes.sample(&mut *rng),
            last_price: price,
            last_size: sizes.sample(&mut *rng) / 10,
            timestamp_ns: now_ns(),
        });
        Ok(())
    }

    /// Returns the registered symbols in insertion order.
    pub fn symbols(&self) -> Vec<Symbol> {
        recover(&self.shared.symbols, "symbol table")
            .iter()
            .map(|tick| tick.symbol)
            .collect()
    }

    /// Starts the producer thread. Idempotent while running.
    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.shared.running.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let shared = Arc::clone(&self.shared);
        let interval = self.config.tick_interval;
        let handle = thread::Builder::new()
            .name("mktsim-engine".into())
            .spawn(move || tick_loop(&shared, interval));

        match handle {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::Release);
                Err(EngineError::Spawn(e))
            }
        }
    }

    /// Stops the producer and joins it; no pushes occur after this returns.
    /// Idempotent.
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Returns true while the producer thread runs.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// By-value copy of the per-symbol current ticks. Safe to call while
    /// the producer runs; the table mutex orders the copy against a pass.
    pub fn current_snapshot(&self) -> Vec<Tick> {
        recover(&self.shared.symbols, "symbol table").clone()
    }

    /// Ticks dropped because the output ring was full.
    pub fn dropped_ticks(&self) -> u64 {
        self.shared.dropped_ticks.load(Ordering::Relaxed)
    }

    pub(crate) fn shared(&self) -> Arc<EngineShared> {
        Arc::clone(&self.shared)
    }
}

impl Drop for MarketDataEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

impl EngineShared {
    pub(crate) fn pop_tick(&self) -> Option<Tick> {
        self.ring.pop()
    }
}

fn tick_loop(shared: &EngineShared, interval: Duration) {
    let price_delta = Uniform::new_inclusive(-0.001f64, 0.001);
    let volatility = Uniform::new_inclusive(0.8f64, 1.2);
    let sizes = Uniform::new_inclusive(100u32, 10_000);

    let anchor = Instant::now();
    let mut fires: u32 = 0;

    while shared.running.load(Ordering::Acquire) {
        {
            let mut symbols = recover(&shared.symbols, "symbol table");
            let mut rng = recover(&shared.rng, "engine rng");

            for tick in symbols.iter_mut() {
                let delta = price_delta.sample(&mut *rng);
                // Drawn each pass to keep the stream stable when the
                // multiplier starts feeding the walk; not yet applied.
                let _vol_mult = volatility.sample(&mut *rng);

                let mid = ((tick.bid + tick.ask) / 2.0) * (1.0 + delta);
                let spread = mid * 0.001;
                tick.bid = (mid - spread / 2.0).max(0.01);
                tick.ask = (mid + spread / 2.0).max(tick.bid + 0.01);

                if rng.gen_ratio(1, 10) {
                    tick.bid_size = sizes.sample(&mut *rng);
                    tick.ask_size = sizes.sample(&mut *rng);
                }
                if rng.gen_ratio(1, 5) {
                    // A print: the last trade hits one side of the book.
                    tick.last_price = if rng.gen_bool(0.5) { tick.bid } else { tick.ask };
                    tick.last_size = sizes.sample(&mut *rng) / 10;
                }

                tick.timestamp_ns = now_ns();
                if !shared.ring.push(*tick) {
                    // Consumer is behind; dropping is the backpressure policy.
                    shared.dropped_ticks.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        fires += 1;
        sleep_until(anchor + interval * fires);
    }
}
