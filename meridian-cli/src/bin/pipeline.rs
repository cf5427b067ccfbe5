//! Interactive front door for the matching pipeline: wires the component
//! coordinator, matching engine, risk gate and plugin registry together
//! and drives them from a small line-oriented command set read from
//! stdin (`submit`, `cancel`, `amend`, `snapshot`, `limits`).
//!
//! This is a demonstration/operator harness, not a wire protocol — a
//! real gateway would replace stdin with the order-entry transport
//! (FIX, a REST/WebSocket API, ...) and keep everything below this file
//! unchanged.

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use meridian_cli::common::{init_logging, CommonArgs};
use meridian_core::config::Config;
use meridian_core::coordinator::{ComponentPriority, ComponentRecord, Coordinator};
use meridian_core::core::types::{AccountId, Order, OrderId, OrderType, Side, TimeInForce};
use meridian_core::engine::{AlertConfig, AlertManager, MatchingEngine};
use meridian_core::plugins::{MatchingAlgorithm, PluginRegistry};
use meridian_core::resilience::rate_limiter::{RateLimiter, RateLimiterConfig};
use meridian_core::risk::{RiskGate, RiskLimits};
use meridian_plugins::PriceTimeAlgorithm;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde_json::Value as PluginConfig;
use std::io::{self, BufRead, Write};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const RISK_GATE: &str = "risk_gate";
const RATE_LIMITER: &str = "rate_limiter";
const ALERT_MANAGER: &str = "alert_manager";

/// Register the subsystems the matching engine depends on. Each is
/// lazily constructed the first time something calls
/// `coordinator.get_typed(...)` and then shared for the life of the
/// process; the engine itself isn't registered here; it owns its shard
/// workers directly rather than being a thing other components look up
/// by name, so it's built once in `main` from these three.
fn register_components(coordinator: &Coordinator) -> Result<()> {
    coordinator
        .register(
            ComponentRecord {
                name: RISK_GATE.to_string(),
                component_type: "risk::RiskGate".to_string(),
                memory_estimate: 8 * 1024 * 1024,
                priority: ComponentPriority::Critical,
                timeout: Duration::from_secs(5),
                dependencies: Vec::new(),
            },
            || Ok(Arc::new(RiskGate::new()) as Arc<dyn std::any::Any + Send + Sync>),
        )
        .map_err(|e| anyhow!("{e}"))?;

    coordinator
        .register(
            ComponentRecord {
                name: RATE_LIMITER.to_string(),
                component_type: "resilience::RateLimiter".to_string(),
                memory_estimate: 1024 * 1024,
                priority: ComponentPriority::High,
                timeout: Duration::from_secs(5),
                dependencies: Vec::new(),
            },
            || Ok(Arc::new(RateLimiter::new(RateLimiterConfig::standard())) as Arc<dyn std::any::Any + Send + Sync>),
        )
        .map_err(|e| anyhow!("{e}"))?;

    coordinator
        .register(
            ComponentRecord {
                name: ALERT_MANAGER.to_string(),
                component_type: "engine::AlertManager".to_string(),
                memory_estimate: 1024 * 1024,
                priority: ComponentPriority::Normal,
                timeout: Duration::from_secs(5),
                dependencies: Vec::new(),
            },
            || Ok(Arc::new(Mutex::new(AlertManager::new(AlertConfig::default()))) as Arc<dyn std::any::Any + Send + Sync>),
        )
        .map_err(|e| anyhow!("{e}"))?;

    Ok(())
}

async fn build_engine(coordinator: &Coordinator, config: &Config, registry: &PluginRegistry) -> Result<(MatchingEngine, Arc<RiskGate>)> {
    let risk_gate = coordinator
        .get_typed::<RiskGate>(RISK_GATE)
        .await
        .map_err(|e| anyhow!("{e}"))?;
    let rate_limiter = coordinator
        .get_typed::<RateLimiter>(RATE_LIMITER)
        .await
        .map_err(|e| anyhow!("{e}"))?;
    let alerts = coordinator
        .get_typed::<Mutex<AlertManager>>(ALERT_MANAGER)
        .await
        .map_err(|e| anyhow!("{e}"))?;

    let algorithm = registry
        .create_algorithm(&config.matching.default_algorithm, &PluginConfig::Null)
        .map_err(|e| anyhow!("{e}"))?;

    let engine = MatchingEngine::spawn(
        config.matching.shards,
        config.matching.ingress_queue_size,
        algorithm,
        rate_limiter,
        risk_gate.clone(),
        alerts,
    );
    Ok((engine, risk_gate))
}

fn parse_side(token: &str) -> Result<Side> {
    match token.to_ascii_lowercase().as_str() {
        "buy" | "b" => Ok(Side::Buy),
        "sell" | "s" => Ok(Side::Sell),
        other => bail!("unknown side '{other}', expected buy|sell"),
    }
}

fn parse_tif(token: &str) -> Result<TimeInForce> {
    match token.to_ascii_lowercase().as_str() {
        "gtc" => Ok(TimeInForce::Gtc),
        "ioc" => Ok(TimeInForce::Ioc),
        "fok" => Ok(TimeInForce::Fok),
        "day" => Ok(TimeInForce::Day),
        other => bail!("unknown time-in-force '{other}', expected gtc|ioc|fok|day"),
    }
}

fn parse_order_id(token: &str) -> Result<OrderId> {
    u128::from_str_radix(token, 16)
        .map(OrderId::new)
        .with_context(|| format!("'{token}' is not a valid hex order id"))
}

async fn handle_submit(engine: &MatchingEngine, risk_gate: &RiskGate, parts: &[&str]) -> Result<()> {
    if parts.len() < 6 {
        bail!("usage: submit <symbol> <buy|sell> <qty> <price|market> <gtc|ioc|fok|day> <account> [client-order-id]");
    }
    let symbol = parts[0];
    let side = parse_side(parts[1])?;
    let quantity = Decimal::from_str(parts[2]).context("invalid quantity")?;
    let (order_type, price) = if parts[3].eq_ignore_ascii_case("market") {
        (OrderType::Market, None)
    } else {
        (OrderType::Limit, Some(Decimal::from_str(parts[3]).context("invalid price")?))
    };
    let tif = parse_tif(parts[4])?;
    let account = parts[5];
    let client_order_id = parts.get(6).copied().unwrap_or("cli-order");

    if risk_gate.breaker_for(symbol).is_triggered() {
        warn!(symbol, "submitting into a symbol with a tripped regulatory breaker");
    }

    let order = Order::new(
        OrderId::generate(),
        client_order_id,
        "cli-user",
        AccountId::from(account),
        symbol,
        side,
        order_type,
        quantity,
        price,
        tif,
    );

    let outcome = engine.submit(order).await?;
    println!(
        "order {} status={:?} filled={} remaining={}",
        outcome.order.id,
        outcome.order.status,
        outcome.order.filled_qty,
        outcome.order.remaining_qty()
    );
    for trade in &outcome.trades {
        println!(
            "  trade #{} {} {}@{} (buy={} sell={})",
            trade.id, trade.symbol, trade.quantity, trade.price, trade.buy_order_id, trade.sell_order_id
        );
    }
    Ok(())
}

async fn handle_cancel(engine: &MatchingEngine, parts: &[&str]) -> Result<()> {
    if parts.len() < 2 {
        bail!("usage: cancel <symbol> <order-id>");
    }
    let symbol = parts[0];
    let order_id = parse_order_id(parts[1])?;
    match engine.cancel(symbol, order_id).await? {
        Some(order) => println!("cancelled {} status={:?}", order.id, order.status),
        None => println!("no resting order {order_id} on {symbol}"),
    }
    Ok(())
}

async fn handle_amend(engine: &MatchingEngine, parts: &[&str]) -> Result<()> {
    if parts.len() < 3 {
        bail!("usage: amend <symbol> <order-id> <new-qty> [new-price]");
    }
    let symbol = parts[0];
    let order_id = parse_order_id(parts[1])?;
    let new_qty = Decimal::from_str(parts[2]).context("invalid quantity")?;
    let new_price = match parts.get(3) {
        Some(p) => Some(Decimal::from_str(p).context("invalid price")?),
        None => None,
    };
    let outcome = engine.amend(symbol, order_id, new_qty, new_price).await?;
    println!("amended -> order {} status={:?}", outcome.order.id, outcome.order.status);
    Ok(())
}

/// Streams pipeline events rather than a book snapshot: the engine keeps
/// each symbol's order book inside its shard worker and never hands out
/// a reference to it, so the only view this binary has into book state
/// is the event stream every submit/cancel/amend already produces.
async fn handle_snapshot(engine: &MatchingEngine, parts: &[&str]) -> Result<()> {
    if parts.is_empty() {
        bail!("usage: snapshot <symbol>");
    }
    let symbol = parts[0];
    println!("watching pipeline events for '{symbol}' (ctrl-c to stop)...");
    let mut events = engine.subscribe();
    loop {
        match events.recv().await {
            Ok(event) => println!("  {event:?}"),
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                warn!(skipped = n, "event stream lagged");
            }
        }
    }
    Ok(())
}

fn handle_limits(risk_gate: &RiskGate, parts: &[&str]) -> Result<()> {
    if parts.len() < 2 {
        bail!("usage: limits <account> <conservative|default|aggressive>");
    }
    let account = parts[0];
    let limits = match parts[1] {
        "conservative" => RiskLimits::conservative(account),
        "aggressive" => RiskLimits::aggressive(account),
        "default" => RiskLimits::new(account),
        other => bail!("unknown limit profile '{other}'"),
    };
    risk_gate.set_limits(limits);
    println!("set {} limits for account {account}", parts[1]);
    Ok(())
}

fn print_help() {
    println!("commands:");
    println!("  submit <symbol> <buy|sell> <qty> <price|market> <gtc|ioc|fok|day> <account> [client-order-id]");
    println!("  cancel <symbol> <order-id-hex>");
    println!("  amend <symbol> <order-id-hex> <new-qty> [new-price]");
    println!("  limits <account> <conservative|default|aggressive>");
    println!("  snapshot <symbol>   (streams pipeline events; ctrl-c to stop)");
    println!("  help");
    println!("  quit");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CommonArgs::parse();
    init_logging(&args.log_level)?;

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    let coordinator = Coordinator::new(config.coordinator.memory_budget);
    let core_version = semver::Version::parse(env!("CARGO_PKG_VERSION")).unwrap_or(semver::Version::new(0, 1, 0));
    let registry = PluginRegistry::new(core_version);
    let price_time_info = PriceTimeAlgorithm::new().info().clone();
    registry
        .register_algorithm(price_time_info, |_config| {
            Arc::new(PriceTimeAlgorithm::new()) as Arc<dyn MatchingAlgorithm>
        })
        .map_err(|e| anyhow!("{e}"))?;

    register_components(&coordinator)?;
    let (engine, risk_gate) = build_engine(&coordinator, &config, &registry).await?;

    info!(shards = config.matching.shards, "matching pipeline ready");
    print_help();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush().ok();
        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                error!(error = %e, "stdin read error");
                break;
            }
            None => break,
        };
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((command, rest)) = parts.split_first() else { continue };

        let result = match *command {
            "submit" => handle_submit(&engine, &risk_gate, rest).await,
            "cancel" => handle_cancel(&engine, rest).await,
            "amend" => handle_amend(&engine, rest).await,
            "snapshot" => handle_snapshot(&engine, rest).await,
            "limits" => handle_limits(&risk_gate, rest),
            "help" => {
                print_help();
                Ok(())
            }
            "quit" | "exit" => break,
            other => {
                println!("unknown command '{other}', try 'help'");
                Ok(())
            }
        };
        if let Err(e) = result {
            println!("error: {e}");
        }
    }

    info!("shutting down");
    coordinator.shutdown_all().await;
    engine.close();
    Ok(())
}
