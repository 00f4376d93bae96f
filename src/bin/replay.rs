//! Replay orders from a CSV file through a standalone book.
//!
//! CSV format (`#` comments and blank lines allowed):
//!
//! ```text
//! type,order_id,trader_id,side,price,qty
//! L,1,0,B,10000,100    # NewLimit Buy
//! L,2,1,S,10100,50     # NewLimit Sell
//! N,3,0,B,,25          # NewMarket Buy
//! C,1,,,,              # Cancel order 1
//! M,2,,,,75            # Modify order 2 qty to 75
//! ```

use std::fs::File;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use tickforge::accounts::Accounts;
use tickforge::order_book::OrderBook;
use tickforge::replay::{parse_records, ReplayRecord};
use tickforge::time::now_ns;
use tickforge::types::OrderType;

#[derive(Parser, Debug)]
#[command(name = "replay", about = "Replay a CSV order stream through the book")]
struct Args {
    /// CSV file to replay
    file: String,

    /// Starting balance for lazily created accounts
    #[arg(long, default_value_t = 1_000_000_000)]
    initial_balance: i64,
}

fn main() -> Result<()> {
    let args = Args::parse();

    println!("Reading orders from: {}", args.file);
    let file = File::open(&args.file).with_context(|| format!("cannot open {}", args.file))?;

    let (records, errors) = parse_records(file);
    for (line, err) in &errors {
        eprintln!("line {line}: {err}");
    }
    println!("Parsed {} orders ({} bad rows)\n", records.len(), errors.len());

    let mut book = OrderBook::new();
    let accounts = Accounts::new(1024);

    let trade_count = Arc::new(AtomicU64::new(0));
    let trade_volume = Arc::new(AtomicU64::new(0));
    {
        let trade_count = Arc::clone(&trade_count);
        let trade_volume = Arc::clone(&trade_volume);
        book.set_trade_callback(Box::new(move |trade| {
            println!(
                "  TRADE: {} @ {} (maker={}, taker={})",
                trade.qty, trade.price, trade.maker_order_id, trade.taker_order_id
            );
            trade_count.fetch_add(1, Ordering::Relaxed);
            trade_volume.fetch_add(trade.qty.get() as u64, Ordering::Relaxed);
        }));
    }

    let start = now_ns();

    for record in &records {
        let response = apply(&mut book, &accounts, record, args.initial_balance);
        println!("  -> {response}");
    }

    let elapsed_ms = (now_ns() - start) as f64 / 1e6;

    println!("\n=== Replay Summary ===");
    println!("Orders processed: {}", records.len());
    println!("Trades executed:  {}", trade_count.load(Ordering::Relaxed));
    println!("Trade volume:     {}", trade_volume.load(Ordering::Relaxed));
    println!("Elapsed time:     {elapsed_ms:.3} ms");

    println!("\n=== Final Book State ===");
    println!("Active orders: {}", book.order_count());
    println!("Bid levels:    {}", book.bid_levels());
    println!("Ask levels:    {}", book.ask_levels());
    if let Some(bid) = book.best_bid() {
        println!("Best bid:      {bid}");
    }
    if let Some(ask) = book.best_ask() {
        println!("Best ask:      {ask}");
    }
    if let Some(spread) = book.spread() {
        println!("Spread:        {spread}");
    }

    Ok(())
}

fn apply(
    book: &mut OrderBook,
    accounts: &Accounts,
    record: &ReplayRecord,
    initial_balance: i64,
) -> tickforge::types::OrderResult {
    if record.r#type != OrderType::Cancel {
        accounts.get_or_create(record.trader_id, initial_balance);
    }

    match record.r#type {
        OrderType::NewLimit => {
            println!(
                "ADD LIMIT: id={} {} {} @ {}",
                record.order_id, record.side, record.qty, record.price
            );
            book.add_limit(
                record.order_id,
                record.trader_id,
                record.side,
                record.price,
                record.qty,
            )
            .result
        }
        OrderType::NewMarket => {
            println!(
                "ADD MARKET: id={} {} {}",
                record.order_id, record.side, record.qty
            );
            book.add_market(record.order_id, record.trader_id, record.side, record.qty)
                .result
        }
        OrderType::Cancel => {
            println!("CANCEL: id={}", record.order_id);
            book.cancel(record.order_id).result
        }
        OrderType::Modify => {
            println!(
                "MODIFY: id={} new_qty={} new_price={}",
                record.order_id, record.qty, record.price
            );
            book.modify(record.order_id, record.qty, record.price).result
        }
    }
}
