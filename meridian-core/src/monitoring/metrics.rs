//! Prometheus metrics for the order matching and execution pipeline.
//!
//! Provides metric families for:
//! - Trading activity (orders, fills, volume)
//! - Performance (latency, throughput)
//! - Risk (position, PnL, limits)
//! - System health (ingress queues, shard lag, errors)

use prometheus::{
    Counter, Gauge, GaugeVec, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec,
    IntGauge, IntGaugeVec, Opts, Registry,
};
use std::sync::Arc;
use tracing::info;

/// Central registry for all Prometheus metrics.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Arc<Registry>,
    trading: Arc<TradingMetrics>,
    performance: Arc<PerformanceMetrics>,
    risk: Arc<RiskMetrics>,
    system: Arc<SystemMetrics>,
    coordinator: Arc<CoordinatorMetrics>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Arc::new(Registry::new());

        let trading = Arc::new(TradingMetrics::new(&registry)?);
        let performance = Arc::new(PerformanceMetrics::new(&registry)?);
        let risk = Arc::new(RiskMetrics::new(&registry)?);
        let system = Arc::new(SystemMetrics::new(&registry)?);
        let coordinator = Arc::new(CoordinatorMetrics::new(&registry)?);

        info!("prometheus metrics registry initialized");

        Ok(Self {
            registry,
            trading,
            performance,
            risk,
            system,
            coordinator,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn trading(&self) -> &TradingMetrics {
        &self.trading
    }

    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance
    }

    pub fn risk(&self) -> &RiskMetrics {
        &self.risk
    }

    pub fn system(&self) -> &SystemMetrics {
        &self.system
    }

    pub fn coordinator(&self) -> &CoordinatorMetrics {
        &self.coordinator
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new().unwrap_or_else(|e| {
            tracing::error!("failed to create metrics registry: {}", e);
            panic!("cannot create metrics registry")
        })
    }
}

/// Trading activity metrics.
pub struct TradingMetrics {
    pub orders_total: IntCounterVec,
    pub fills_total: IntCounterVec,
    pub volume_total: Counter,
    pub rejections_total: IntCounterVec,
    pub cancellations_total: IntCounterVec,
    pub fill_rate: Gauge,
    pub orders_by_status: IntGaugeVec,
}

impl TradingMetrics {
    fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let orders_total = IntCounterVec::new(
            Opts::new("trading_orders_total", "Total number of orders submitted")
                .namespace("meridian"),
            &["symbol", "side", "type"],
        )?;
        registry.register(Box::new(orders_total.clone()))?;

        let fills_total = IntCounterVec::new(
            Opts::new("trading_fills_total", "Total number of fills produced")
                .namespace("meridian"),
            &["symbol", "taker_side"],
        )?;
        registry.register(Box::new(fills_total.clone()))?;

        let volume_total = Counter::new(
            "meridian_trading_volume_notional_total",
            "Total trading volume (notional, across symbols)",
        )?;
        registry.register(Box::new(volume_total.clone()))?;

        let rejections_total = IntCounterVec::new(
            Opts::new("trading_rejections_total", "Total number of order rejections")
                .namespace("meridian"),
            &["reason"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;

        let cancellations_total = IntCounterVec::new(
            Opts::new("trading_cancellations_total", "Total number of order cancellations")
                .namespace("meridian"),
            &["symbol"],
        )?;
        registry.register(Box::new(cancellations_total.clone()))?;

        let fill_rate = Gauge::new("meridian_trading_fill_rate", "Current order fill rate (0.0 to 1.0)")?;
        registry.register(Box::new(fill_rate.clone()))?;

        let orders_by_status = IntGaugeVec::new(
            Opts::new("trading_orders_by_status", "Number of orders currently in each status")
                .namespace("meridian"),
            &["status"],
        )?;
        registry.register(Box::new(orders_by_status.clone()))?;

        Ok(Self {
            orders_total,
            fills_total,
            volume_total,
            rejections_total,
            cancellations_total,
            fill_rate,
            orders_by_status,
        })
    }
}

/// Pipeline latency and throughput metrics.
pub struct PerformanceMetrics {
    pub order_to_trade_latency_ns: Histogram,
    pub plugin_latency_ns: HistogramVec,
    pub risk_validation_latency_ns: Histogram,
    pub persistence_latency_us: Histogram,
    pub orders_per_second: Gauge,
    pub trades_per_second: Gauge,
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let order_to_trade_latency_ns = Histogram::with_opts(
            HistogramOpts::new(
                "meridian_performance_order_to_trade_latency_ns",
                "Ingress-to-trade latency in nanoseconds",
            )
            .buckets(vec![
                10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
            ]),
        )?;
        registry.register(Box::new(order_to_trade_latency_ns.clone()))?;

        let plugin_latency_ns = HistogramVec::new(
            HistogramOpts::new(
                "performance_plugin_latency_ns",
                "Matching algorithm plugin latency in nanoseconds",
            )
            .namespace("meridian")
            .buckets(vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0]),
            &["plugin"],
        )?;
        registry.register(Box::new(plugin_latency_ns.clone()))?;

        let risk_validation_latency_ns = Histogram::with_opts(
            HistogramOpts::new(
                "meridian_performance_risk_validation_latency_ns",
                "Risk gate check latency in nanoseconds",
            )
            .buckets(vec![1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0]),
        )?;
        registry.register(Box::new(risk_validation_latency_ns.clone()))?;

        let persistence_latency_us = Histogram::with_opts(
            HistogramOpts::new(
                "meridian_performance_persistence_latency_us",
                "Persistence sink acknowledgement latency in microseconds",
            )
            .buckets(vec![10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0]),
        )?;
        registry.register(Box::new(persistence_latency_us.clone()))?;

        let orders_per_second =
            Gauge::new("meridian_performance_orders_per_second", "Orders accepted per second")?;
        registry.register(Box::new(orders_per_second.clone()))?;

        let trades_per_second =
            Gauge::new("meridian_performance_trades_per_second", "Trades produced per second")?;
        registry.register(Box::new(trades_per_second.clone()))?;

        Ok(Self {
            order_to_trade_latency_ns,
            plugin_latency_ns,
            risk_validation_latency_ns,
            persistence_latency_us,
            orders_per_second,
            trades_per_second,
        })
    }
}

/// Risk management metrics, labeled per account+symbol where the
/// underlying position is per account+symbol.
pub struct RiskMetrics {
    pub position_quantity: GaugeVec,
    pub position_utilization: GaugeVec,
    pub realized_pnl: GaugeVec,
    pub daily_pnl: GaugeVec,
    pub risk_violations_total: IntCounterVec,
    pub position_limit: GaugeVec,
    pub daily_loss_limit: GaugeVec,
}

impl RiskMetrics {
    fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let position_quantity = GaugeVec::new(
            Opts::new("risk_position_quantity", "Current position quantity").namespace("meridian"),
            &["account", "symbol"],
        )?;
        registry.register(Box::new(position_quantity.clone()))?;

        let position_utilization = GaugeVec::new(
            Opts::new("risk_position_utilization", "Position utilization ratio (0.0 to 1.0)")
                .namespace("meridian"),
            &["account", "symbol"],
        )?;
        registry.register(Box::new(position_utilization.clone()))?;

        let realized_pnl = GaugeVec::new(
            Opts::new("risk_realized_pnl", "Realized profit and loss").namespace("meridian"),
            &["account", "symbol"],
        )?;
        registry.register(Box::new(realized_pnl.clone()))?;

        let daily_pnl = GaugeVec::new(
            Opts::new("risk_daily_pnl", "Daily profit and loss").namespace("meridian"),
            &["account", "symbol"],
        )?;
        registry.register(Box::new(daily_pnl.clone()))?;

        let risk_violations_total = IntCounterVec::new(
            Opts::new("risk_violations_total", "Total number of risk gate rejections")
                .namespace("meridian"),
            &["reason"],
        )?;
        registry.register(Box::new(risk_violations_total.clone()))?;

        let position_limit = GaugeVec::new(
            Opts::new("risk_position_limit", "Configured position limit").namespace("meridian"),
            &["account", "symbol"],
        )?;
        registry.register(Box::new(position_limit.clone()))?;

        let daily_loss_limit = GaugeVec::new(
            Opts::new("risk_daily_loss_limit", "Configured daily loss limit").namespace("meridian"),
            &["account"],
        )?;
        registry.register(Box::new(daily_loss_limit.clone()))?;

        Ok(Self {
            position_quantity,
            position_utilization,
            realized_pnl,
            daily_pnl,
            risk_violations_total,
            position_limit,
            daily_loss_limit,
        })
    }
}

/// Ingress and system health metrics.
pub struct SystemMetrics {
    pub ingress_queue_depth: IntGaugeVec,
    pub shard_lag_ms: GaugeVec,
    pub regulatory_breaker_tripped: IntGaugeVec,
    pub resilience_breaker_open: IntGaugeVec,
    pub errors_total: IntCounterVec,
    pub cpu_usage_percent: Gauge,
    pub memory_usage_bytes: IntGauge,
    pub uptime_seconds: IntGauge,
}

impl SystemMetrics {
    fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let ingress_queue_depth = IntGaugeVec::new(
            Opts::new("system_ingress_queue_depth", "Depth of the bounded per-shard ingress queue")
                .namespace("meridian"),
            &["shard"],
        )?;
        registry.register(Box::new(ingress_queue_depth.clone()))?;

        let shard_lag_ms = GaugeVec::new(
            Opts::new("system_shard_lag_ms", "Time since a shard worker last drained its queue")
                .namespace("meridian"),
            &["shard"],
        )?;
        registry.register(Box::new(shard_lag_ms.clone()))?;

        let regulatory_breaker_tripped = IntGaugeVec::new(
            Opts::new(
                "system_regulatory_breaker_tripped",
                "1 if the per-symbol regulatory circuit breaker is tripped",
            )
            .namespace("meridian"),
            &["symbol"],
        )?;
        registry.register(Box::new(regulatory_breaker_tripped.clone()))?;

        let resilience_breaker_open = IntGaugeVec::new(
            Opts::new("system_resilience_breaker_open", "1 if a software circuit breaker is open")
                .namespace("meridian"),
            &["name"],
        )?;
        registry.register(Box::new(resilience_breaker_open.clone()))?;

        let errors_total = IntCounterVec::new(
            Opts::new("system_errors_total", "Total system errors").namespace("meridian"),
            &["component", "code"],
        )?;
        registry.register(Box::new(errors_total.clone()))?;

        let cpu_usage_percent =
            Gauge::new("meridian_system_cpu_usage_percent", "CPU usage percentage")?;
        registry.register(Box::new(cpu_usage_percent.clone()))?;

        let memory_usage_bytes =
            IntGauge::new("meridian_system_memory_usage_bytes", "Memory usage in bytes")?;
        registry.register(Box::new(memory_usage_bytes.clone()))?;

        let uptime_seconds =
            IntGauge::new("meridian_system_uptime_seconds", "System uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        Ok(Self {
            ingress_queue_depth,
            shard_lag_ms,
            regulatory_breaker_tripped,
            resilience_breaker_open,
            errors_total,
            cpu_usage_percent,
            memory_usage_bytes,
            uptime_seconds,
        })
    }
}

/// Component coordinator lifecycle metrics.
pub struct CoordinatorMetrics {
    pub components_ready: IntGaugeVec,
    pub construction_duration_ms: HistogramVec,
    pub construction_failures_total: IntCounterVec,
    pub idle_unloads_total: IntCounterVec,
    pub memory_budget_free_bytes: IntGauge,
}

impl CoordinatorMetrics {
    fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let components_ready = IntGaugeVec::new(
            Opts::new("coordinator_components_ready", "1 if the named component is ready")
                .namespace("meridian"),
            &["component"],
        )?;
        registry.register(Box::new(components_ready.clone()))?;

        let construction_duration_ms = HistogramVec::new(
            HistogramOpts::new(
                "coordinator_construction_duration_ms",
                "Time spent running a component's provider function",
            )
            .namespace("meridian")
            .buckets(vec![0.1, 0.5, 1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0]),
            &["component"],
        )?;
        registry.register(Box::new(construction_duration_ms.clone()))?;

        let construction_failures_total = IntCounterVec::new(
            Opts::new("coordinator_construction_failures_total", "Total component construction failures")
                .namespace("meridian"),
            &["component", "reason"],
        )?;
        registry.register(Box::new(construction_failures_total.clone()))?;

        let idle_unloads_total = IntCounterVec::new(
            Opts::new("coordinator_idle_unloads_total", "Total components unloaded for being idle")
                .namespace("meridian"),
            &["component"],
        )?;
        registry.register(Box::new(idle_unloads_total.clone()))?;

        let memory_budget_free_bytes = IntGauge::new(
            "meridian_coordinator_memory_budget_free_bytes",
            "Estimated free bytes remaining in the coordinator's memory budget",
        )?;
        registry.register(Box::new(memory_budget_free_bytes.clone()))?;

        Ok(Self {
            components_ready,
            construction_duration_ms,
            construction_failures_total,
            idle_unloads_total,
            memory_budget_free_bytes,
        })
    }
}
