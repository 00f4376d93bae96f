//! Exchange simulator entry point.
//!
//! Spawns one producer thread driving the synthetic traders and one
//! consumer thread running the matching engine, wired by the SPSC queue.
//! Prints a configuration banner, latency statistics and the final book
//! state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use tickforge::engine::{EngineConfig, MatchingEngine};
use tickforge::logger::AsyncLogger;
use tickforge::pinning;
use tickforge::spsc;
use tickforge::stats::StatsSnapshot;
use tickforge::time::now_ns;
use tickforge::trader::{run_traders, Trader, TraderConfig};
use tickforge::types::{TraderId, DEFAULT_QUEUE_CAPACITY};
use tickforge::OrderEvent;

#[derive(Parser, Debug)]
#[command(name = "simulate", about = "In-memory exchange simulator")]
struct Args {
    /// Total orders to generate
    #[arg(long, default_value_t = 10_000)]
    orders: u64,

    /// Number of synthetic trader identities
    #[arg(long, default_value_t = 1)]
    traders: u32,

    /// Random seed
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Enable thread pinning (engine on core 0, producer on core 1)
    #[arg(long)]
    pin: bool,

    /// Trade log file path
    #[arg(long)]
    log: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    println!("=== Tickforge Exchange Simulator ===\n");
    println!("Configuration:");
    println!("  Orders:      {}", args.orders);
    println!("  Traders:     {}", args.traders);
    println!("  Seed:        {}", args.seed);
    println!("  Pinning:     {}", if args.pin { "enabled" } else { "disabled" });
    println!("  Log file:    {}", args.log.as_deref().unwrap_or("none"));
    println!("  CPU cores:   {}\n", pinning::num_cores());

    let logger = match &args.log {
        Some(path) => {
            let logger = AsyncLogger::create(path)
                .with_context(|| format!("failed to open log file {path}"))?;
            info!(path = %path, "trade logging enabled");
            Some(logger)
        }
        None => None,
    };

    let (mut tx, mut rx) = spsc::channel::<OrderEvent>(DEFAULT_QUEUE_CAPACITY);

    let engine_config = EngineConfig {
        pin_to_core: (args.pin && pinning::num_cores() > 1).then_some(0),
        ..EngineConfig::default()
    };
    let mut engine =
        MatchingEngine::with_logger(engine_config, logger.as_ref().map(|l| l.handle()));
    engine.warm_up();

    let engine_stop = Arc::new(AtomicBool::new(false));
    let producer_stop = Arc::new(AtomicBool::new(false));

    info!("starting matching engine");
    let engine_thread = {
        let stop = Arc::clone(&engine_stop);
        thread::spawn(move || {
            engine.run(&mut rx, &stop);
            engine
        })
    };

    // Split the order quota across trader identities; trader 0 takes the
    // remainder. All identities run on one producer thread (SPSC).
    let orders_per_trader = args.orders / u64::from(args.traders.max(1));
    let remainder = args.orders % u64::from(args.traders.max(1));

    let mut traders = Vec::with_capacity(args.traders as usize);
    let mut next_order_id = 1u64;
    for i in 0..args.traders {
        let quota = orders_per_trader + if i == 0 { remainder } else { 0 };
        traders.push(Trader::new(
            TraderConfig {
                trader_id: TraderId(i),
                seed: args.seed + u64::from(i),
                orders_to_generate: quota,
                ..TraderConfig::default()
            },
            next_order_id,
        ));
        next_order_id += quota;
    }

    info!(traders = args.traders, "starting producer thread");
    let start_time = now_ns();

    let pin_producer = args.pin && pinning::num_cores() > 2;
    let producer_thread = {
        let stop = Arc::clone(&producer_stop);
        thread::spawn(move || {
            if pin_producer && !pinning::pin_to_core(1) {
                tracing::warn!("failed to pin producer thread");
            }
            run_traders(traders, &mut tx, &stop)
        })
    };

    let orders_sent = producer_thread
        .join()
        .expect("producer thread panicked");
    let producer_done_time = now_ns();
    info!(orders_sent, "producer finished");

    // Let the engine drain the tail of the queue, then stop it.
    thread::sleep(Duration::from_millis(100));
    engine_stop.store(true, Ordering::Release);
    let engine = engine_thread.join().expect("engine thread panicked");
    let end_time = now_ns();

    let total_s = (end_time - start_time) as f64 / 1e9;
    let produce_s = (producer_done_time - start_time) as f64 / 1e9;

    println!("\n=== Performance Results ===");
    println!("Total time:         {total_s:.3} seconds");
    println!("Order gen time:     {produce_s:.3} seconds");
    println!("Orders processed:   {}", engine.events_processed());
    println!(
        "Throughput:         {} orders/second",
        (args.orders as f64 / total_s) as u64
    );

    let snap = StatsSnapshot::capture(engine.stats());
    println!("\n=== Engine Statistics ===");
    println!("  Orders received:  {}", snap.orders_received);
    println!("  Orders accepted:  {}", snap.orders_accepted);
    println!("  Orders cancelled: {}", snap.orders_cancelled);
    println!("  Orders modified:  {}", snap.orders_modified);
    println!("  Rejected:         {}", snap.rejected_count);
    println!("  Trades:           {}", snap.trade_count);
    println!("  Volume:           {}", snap.volume);
    println!("  Filled qty:       {}", snap.filled_qty);

    println!("\n=== End-to-End Latency (ns) ===");
    println!("  Samples: {}", snap.latency.count);
    println!("  Mean:    {:.0}", snap.latency.mean_ns);
    println!("  P50:     {:.0}", snap.latency.p50_ns);
    println!("  P90:     {:.0}", snap.latency.p90_ns);
    println!("  P95:     {:.0}", snap.latency.p95_ns);
    println!("  P99:     {:.0}", snap.latency.p99_ns);
    println!("  P99.9:   {:.0}", snap.latency.p999_ns);
    println!("  Min:     {}", snap.latency.min_ns);
    println!("  Max:     {}", snap.latency.max_ns);

    let book = engine.book();
    println!("\n=== Final Book State ===");
    println!("  Active orders:  {}", book.order_count());
    println!("  Bid levels:     {}", book.bid_levels());
    println!("  Ask levels:     {}", book.ask_levels());
    if let Some(bid) = book.best_bid() {
        println!("  Best bid:       {bid}");
    }
    if let Some(ask) = book.best_ask() {
        println!("  Best ask:       {ask}");
    }
    if let Some(spread) = book.spread() {
        println!("  Spread:         {spread}");
    }

    if let Some(logger) = logger {
        println!("\n=== Logging Stats ===");
        println!("  Messages logged:  {}", logger.messages_logged());
        println!("  Messages dropped: {}", logger.messages_dropped());
        logger.shutdown();
    }

    println!("\nSimulation complete.");
    Ok(())
}
