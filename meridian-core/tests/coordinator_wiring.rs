//! The production wiring pattern from the pipeline binary: the risk
//! gate, rate limiter and alert manager registered as coordinator-
//! managed singletons and resolved by type.

use meridian_core::coordinator::{ComponentPriority, ComponentRecord, Coordinator};
use meridian_core::engine::AlertManager;
use meridian_core::resilience::{RateLimiter, RateLimiterConfig};
use meridian_core::risk::RiskGate;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

fn component(name: &str) -> ComponentRecord {
    ComponentRecord {
        name: name.to_string(),
        component_type: name.to_string(),
        memory_estimate: 1024,
        priority: ComponentPriority::Critical,
        timeout: Duration::from_secs(5),
        dependencies: Vec::new(),
    }
}

fn register_pipeline_components(coordinator: &Coordinator) {
    coordinator
        .register(component("risk_gate"), || {
            Ok(Arc::new(RiskGate::new()) as Arc<dyn std::any::Any + Send + Sync>)
        })
        .unwrap();

    coordinator
        .register(component("rate_limiter"), || {
            Ok(Arc::new(RateLimiter::new(RateLimiterConfig::standard())) as Arc<dyn std::any::Any + Send + Sync>)
        })
        .unwrap();

    coordinator
        .register(component("alert_manager"), || {
            Ok(Arc::new(Mutex::new(AlertManager::new(Default::default()))) as Arc<dyn std::any::Any + Send + Sync>)
        })
        .unwrap();
}

#[tokio::test]
async fn pipeline_dependencies_resolve_to_the_expected_types() {
    let coordinator = Coordinator::new(64 * 1024 * 1024);
    register_pipeline_components(&coordinator);

    let risk_gate = coordinator.get_typed::<RiskGate>("risk_gate").await.unwrap();
    let rate_limiter = coordinator.get_typed::<RateLimiter>("rate_limiter").await.unwrap();
    let alerts = coordinator.get_typed::<Mutex<AlertManager>>("alert_manager").await.unwrap();

    risk_gate.set_limits(meridian_core::risk::RiskLimits::aggressive("acct-1"));
    assert!(!alerts.lock().is_trading_halted());
    assert_eq!(Arc::strong_count(&rate_limiter), 1);

    coordinator.shutdown_all().await;
}

#[tokio::test]
async fn repeated_lookups_return_the_same_shared_instance() {
    let coordinator = Coordinator::new(64 * 1024 * 1024);
    register_pipeline_components(&coordinator);

    let first = coordinator.get_typed::<RiskGate>("risk_gate").await.unwrap();
    let second = coordinator.get_typed::<RiskGate>("risk_gate").await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}
