//! Orderbook Snapshot Printer
//!
//! Simple CLI tool to print orderbook state to terminal. Useful for
//! debugging and for sanity-checking the matching algorithm's resting
//! book against expectations without standing up the full pipeline.
//!
//! ## Usage
//!
//! ```bash
//! # Print top 5 levels of a built-in sample book
//! meridian-debug print-orderbook --symbol BTC-USD
//!
//! # Print top 10 levels
//! meridian-debug print-orderbook --symbol BTC-USD --levels 10
//!
//! # JSON output
//! meridian-debug print-orderbook --symbol BTC-USD --format json
//! ```

use anyhow::{anyhow, Result};
use clap::Parser;
use meridian_core::core::types::{AccountId, Order, OrderId, OrderType, Side, TimeInForce};
use meridian_core::orderbook::{BookSnapshot, OrderBook};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::json;

#[derive(Parser)]
#[command(name = "print-orderbook")]
#[command(about = "Print a sample orderbook snapshot", long_about = None)]
struct Args {
    /// Symbol to build the sample book for.
    #[arg(short, long, default_value = "BTC-USD")]
    symbol: String,

    /// Number of levels to display per side.
    #[arg(short, long, default_value = "5")]
    levels: usize,

    /// Output format (pretty, compact, json).
    #[arg(short, long, default_value = "pretty")]
    format: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let book = build_sample_book(&args.symbol);
    let snapshot = book.snapshot(args.levels);

    match args.format.as_str() {
        "json" => print_json(&snapshot),
        "compact" => print_compact(&snapshot),
        "pretty" => print_pretty(&snapshot),
        other => return Err(anyhow!("unknown format '{other}', expected pretty, compact, or json")),
    }

    Ok(())
}

/// Builds a resting book with a handful of bid/ask levels around a
/// round mid, so the formatting paths have something realistic to
/// render without a live feed or pipeline running.
fn build_sample_book(symbol: &str) -> OrderBook {
    let mut book = OrderBook::new(symbol);

    let levels: &[(i64, i64)] = &[(1, 1), (2, 2), (3, 1), (4, 3), (5, 2)];
    for (i, (offset, size)) in levels.iter().enumerate() {
        let bid_price = Decimal::new(50_000 - offset * 10, 0);
        let ask_price = Decimal::new(50_010 + offset * 10, 0);
        let qty = Decimal::new(*size, 0);

        book.submit(sample_order(symbol, i * 2, Side::Buy, bid_price, qty));
        book.submit(sample_order(symbol, i * 2 + 1, Side::Sell, ask_price, qty));
    }

    book
}

fn sample_order(symbol: &str, seq: usize, side: Side, price: Decimal, qty: Decimal) -> Order {
    Order::new(
        OrderId::new(seq as u128),
        format!("sample-{seq}"),
        "sample",
        AccountId::from("sample-account"),
        symbol,
        side,
        OrderType::Limit,
        qty,
        Some(price),
        TimeInForce::Gtc,
    )
}

fn mid_and_spread(snapshot: &BookSnapshot) -> (Option<Decimal>, Option<Decimal>) {
    match (snapshot.bids.first(), snapshot.asks.first()) {
        (Some((bid, _)), Some((ask, _))) => (Some((*bid + *ask) / Decimal::new(2, 0)), Some(*ask - *bid)),
        _ => (None, None),
    }
}

fn print_pretty(snapshot: &BookSnapshot) {
    let (mid, spread) = mid_and_spread(snapshot);
    let max_size = snapshot
        .bids
        .iter()
        .chain(snapshot.asks.iter())
        .map(|(_, s)| *s)
        .max()
        .unwrap_or(Decimal::ONE);

    println!();
    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║  {:<56}  ║", format!("{} ORDERBOOK", snapshot.symbol));
    println!("╚══════════════════════════════════════════════════════════╝");
    println!();

    println!("         ASKS        SIZE       BAR");
    println!("    ════════════════════════════════════════");
    for (price, size) in snapshot.asks.iter().rev() {
        println!("    {:>10.2}   {:>6.3}  {}", price, size, create_ascii_bar(*size, max_size, 15));
    }

    println!();
    println!("    ─────────────────────────────────────────");
    println!(
        "     MID: {}  │  Spread: {}",
        mid.map(|m| format!("${m:.2}")).unwrap_or_else(|| "-".into()),
        spread.map(|s| format!("${s:.2}")).unwrap_or_else(|| "-".into()),
    );
    println!("    ─────────────────────────────────────────");
    println!();

    println!("         BIDS        SIZE       BAR");
    println!("    ════════════════════════════════════════");
    for (price, size) in snapshot.bids.iter() {
        println!("    {:>10.2}   {:>6.3}  {}", price, size, create_ascii_bar(*size, max_size, 15));
    }
    println!();
}

fn print_compact(snapshot: &BookSnapshot) {
    let (mid, _) = mid_and_spread(snapshot);

    println!(
        "{}  Mid: {}",
        snapshot.symbol,
        mid.map(|m| format!("${m:.2}")).unwrap_or_else(|| "-".into())
    );

    for (price, size) in snapshot.asks.iter().rev() {
        println!("ASK  {price:>10.2}  {size:>6.3}");
    }
    if let Some(m) = mid {
        println!("MID  {m:>10.2}");
    }
    for (price, size) in snapshot.bids.iter() {
        println!("BID  {price:>10.2}  {size:>6.3}");
    }
}

fn print_json(snapshot: &BookSnapshot) {
    let to_pairs = |levels: &[(Decimal, Decimal)]| {
        levels
            .iter()
            .map(|(p, s)| json!({"price": p.to_f64(), "size": s.to_f64()}))
            .collect::<Vec<_>>()
    };

    let (mid, spread) = mid_and_spread(snapshot);
    let output = json!({
        "symbol": snapshot.symbol,
        "mid_price": mid.and_then(|m| m.to_f64()),
        "spread": spread.and_then(|s| s.to_f64()),
        "bids": to_pairs(&snapshot.bids),
        "asks": to_pairs(&snapshot.asks),
    });

    println!("{}", serde_json::to_string_pretty(&output).expect("snapshot json is always serializable"));
}

fn create_ascii_bar(size: Decimal, max_size: Decimal, width: usize) -> String {
    if max_size.is_zero() {
        return " ".repeat(width);
    }

    let ratio = (size / max_size).to_f64().unwrap_or(0.0);
    let filled = ((ratio * width as f64) as usize).min(width);

    "█".repeat(filled) + &"░".repeat(width - filled)
}
