//! Subscription facade in front of the market-data engine.
//!
//! Filtering happens after the pop, not in the producer: the engine's hot
//! path publishes every symbol unconditionally, and the facade discards
//! ticks the caller never subscribed to.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::engine::{EngineShared, MarketDataEngine};
use crate::locks::recover;
use crate::types::{Symbol, Tick};

/// Capability set of a market-data feed. The simulated variant below is the
/// only one in this crate; a live variant would implement the same surface.
pub trait MarketDataFeed {
    /// Adds a symbol to the subscription set. Duplicates are ignored.
    fn subscribe(&self, symbol: Symbol);
    /// Removes a symbol from the subscription set. Absent symbols are ignored.
    fn unsubscribe(&self, symbol: Symbol);
    /// Pops at most one tick, non-blocking. Returns `None` when the ring is
    /// empty or the next tick's symbol is not subscribed (that tick is
    /// discarded).
    fn next_tick(&self) -> Option<Tick>;
    /// Returns the current subscription set.
    fn subscribed_symbols(&self) -> Vec<Symbol>;
}

/// Feed over the synthetic engine's tick ring.
///
/// Holds the consuming side of the engine's SPSC ring; construct exactly one
/// per engine and poll it from one thread.
pub struct SimulatedMarketDataFeed {
    shared: Arc<EngineShared>,
    subscriptions: Mutex<HashSet<Symbol>>,
}

impl SimulatedMarketDataFeed {
    pub fn new(engine: &MarketDataEngine) -> Self {
        Self {
            shared: engine.shared(),
            subscriptions: Mutex::new(HashSet::new()),
        }
    }
}

impl MarketDataFeed for SimulatedMarketDataFeed {
    fn subscribe(&self, symbol: Symbol) {
        recover(&self.subscriptions, "subscription set").insert(symbol);
    }

    fn unsubscribe(&self, symbol: Symbol) {
        recover(&self.subscriptions, "subscription set").remove(&symbol);
    }

    fn next_tick(&self) -> Option<Tick> {
        let tick = self.shared.pop_tick()?;
        if recover(&self.subscriptions, "subscription set").contains(&tick.symbol) {
            Some(tick)
        } else {
            None // not subscribed; the tick is dropped
        }
    }

    fn subscribed_symbols(&self) -> Vec<Symbol> {
        recover(&self.subscriptions, "subscription set")
            .iter()
            .copied()
            .collect()
    }
}
