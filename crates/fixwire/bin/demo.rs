//! # Tick Pipeline Demo
//!
//! End-to-end run of the simulation core: the market-data engine publishes
//! ticks into the SPSC ring, a subscribed feed drains them, each tick is
//! converted to a FIX MARKET_DATA_SNAPSHOT frame through a session into a
//! capture sink, and an order goes out as NEW_ORDER_SINGLE. The monitor
//! reports per-tick conversion latency and frame throughput at the end.
//!
//! ## Running
//!
//! ```bash
//! cargo run -p fixwire --bin demo --release
//! RUST_LOG=debug cargo run -p fixwire --bin demo
//! ```

use std::thread;
use std::time::{Duration, Instant};

use fixwire::{market_data_snapshot, FixSession, MemorySink};
use mktsim::{
    now_ns, EngineConfig, MarketDataEngine, MarketDataFeed, Order, OrderType, PerfMonitor, Side,
    SimulatedMarketDataFeed, Symbol,
};

const RUN_FOR: Duration = Duration::from_secs(2);

fn main() {
    env_logger::init();

    let mut engine = MarketDataEngine::new(EngineConfig::default());
    for (symbol, price) in [("AAPL", 150.0), ("GOOGL", 2800.0), ("MSFT", 380.0)] {
        if let Err(e) = engine.add_symbol(symbol, price) {
            log::error!("[demo] add_symbol {symbol}: {e}");
            return;
        }
    }

    let feed = SimulatedMarketDataFeed::new(&engine);
    feed.subscribe(Symbol::new("AAPL"));
    feed.subscribe(Symbol::new("GOOGL"));

    let mut session = FixSession::new("SIM", "STRATEGY", MemorySink::default());
    session.logon();

    let monitor = PerfMonitor::new();
    monitor.start_monitoring();

    if let Err(e) = engine.start() {
        log::error!("[demo] engine start failed: {e}");
        return;
    }
    log::info!("[demo] engine running on {:?}", engine.symbols());

    let deadline = Instant::now() + RUN_FOR;
    let mut converted = 0u64;
    while Instant::now() < deadline {
        match feed.next_tick() {
            Some(tick) => {
                let before = now_ns();
                let frame_len = {
                    let msg = market_data_snapshot(&tick);
                    session.send_message(msg);
                    session
                        .sink()
                        .frames
                        .last()
                        .map(|frame| frame.len())
                        .unwrap_or_default()
                };
                monitor.record_latency(Duration::from_nanos(now_ns() - before));
                monitor.record_operation(frame_len as u64);
                converted += 1;
            }
            None => thread::yield_now(),
        }
    }

    let order = Order::new(
        1,
        Symbol::new("AAPL"),
        Side::Buy,
        OrderType::Limit,
        150.50,
        100,
        "STRATEGY",
    );
    session.submit_order(&order);
    session.logout();
    engine.stop();

    let latency = monitor.latency_stats();
    let throughput = monitor.throughput_stats();
    println!("ticks converted to snapshots : {converted}");
    println!("ticks dropped by full ring   : {}", engine.dropped_ticks());
    println!(
        "conversion latency           : min {:?} / mean {:?} / p99 {:?} / max {:?}",
        latency.min, latency.mean, latency.p99, latency.max
    );
    println!(
        "frame throughput             : {:.0} frames/s, {:.0} bytes/s",
        throughput.msgs_per_sec, throughput.bytes_per_sec
    );
    println!(
        "frames captured              : {} (logon + snapshots + order + logout)",
        session.sink().frames.len()
    );
}
