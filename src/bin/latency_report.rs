//! Standalone per-operation latency report over the bare book.
//!
//! Feeds pre-generated events straight into the book (no queue, no risk)
//! and records each dispatch into an HDR histogram, so the numbers isolate
//! matching cost from pipeline cost.

use hdrhistogram::Histogram;
use std::time::Instant;

use tickforge::order_book::OrderBook;
use tickforge::types::{OrderId, Price, Qty, Side, TraderId};

fn main() {
    println!("Preparing latency benchmark...");

    let mut book = OrderBook::with_capacity(100_000, 1024);
    book.warm_up();

    let mut histogram = Histogram::<u64>::new_with_bounds(1, 100_000_000, 3).unwrap();

    const ITERATIONS: usize = 1_000_000;
    const BUFFER_SIZE: usize = 10_000;

    // Pre-generate the order stream so RNG cost stays out of the timing.
    println!("Pre-generating {BUFFER_SIZE} orders...");
    let orders: Vec<(Side, Price, Qty)> = (0..BUFFER_SIZE)
        .map(|i| {
            let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
            (side, Price(10_000 + (i as i64 % 100)), Qty(10))
        })
        .collect();

    // Warm the branch predictor with one pass.
    println!("Warming up ({BUFFER_SIZE} ops)...");
    for (i, &(side, price, qty)) in orders.iter().enumerate() {
        std::hint::black_box(book.add_limit(OrderId(i as u64), TraderId(1), side, price, qty));
    }

    println!("Running {ITERATIONS} iterations...");
    let mut next_id = BUFFER_SIZE as u64;
    let run_start = Instant::now();

    for i in 0..ITERATIONS {
        let (side, price, qty) = orders[i % BUFFER_SIZE];
        let id = OrderId(next_id);
        next_id += 1;

        let start = Instant::now();
        std::hint::black_box(book.add_limit(id, TraderId(1), side, price, qty));
        let elapsed = start.elapsed();

        histogram.record(elapsed.as_nanos() as u64).unwrap_or(());
    }

    let total = run_start.elapsed();

    println!("\n=== Latency Report (ns) ===");
    println!("Total ops:  {ITERATIONS}");
    println!(
        "Throughput: {:.2} ops/sec",
        ITERATIONS as f64 / total.as_secs_f64()
    );
    println!("---------------------------");
    println!("Min:    {:6} ns", histogram.min());
    println!("P50:    {:6} ns", histogram.value_at_quantile(0.50));
    println!("P90:    {:6} ns", histogram.value_at_quantile(0.90));
    println!("P99:    {:6} ns", histogram.value_at_quantile(0.99));
    println!("P99.9:  {:6} ns", histogram.value_at_quantile(0.999));
    println!("P99.99: {:6} ns", histogram.value_at_quantile(0.9999));
    println!("Max:    {:6} ns", histogram.max());
    println!("---------------------------");
    println!("Final book: {} orders resting", book.order_count());
}
