//! Per-operation timeout budgets.
//!
//! Looks up a named budget (falling back to a default) and races the
//! wrapped future against it. The future itself must honor cancellation
//! — dropping it when the timeout fires is all this primitive does.

use dashmap::DashMap;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutExceeded;

impl std::fmt::Display for TimeoutExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "operation timed out")
    }
}

impl std::error::Error for TimeoutExceeded {}

pub struct TimeoutPolicy {
    default_budget: Duration,
    per_operation: DashMap<String, Duration>,
}

impl TimeoutPolicy {
    pub fn new(default_budget: Duration) -> Self {
        Self {
            default_budget,
            per_operation: DashMap::new(),
        }
    }

    pub fn set_budget(&self, operation: impl Into<String>, budget: Duration) {
        self.per_operation.insert(operation.into(), budget);
    }

    pub fn budget_for(&self, operation: &str) -> Duration {
        self.per_operation
            .get(operation)
            .map(|v| *v)
            .unwrap_or(self.default_budget)
    }

    /// Run `fut` under the budget registered for `operation`.
    pub async fn run<F, T>(&self, operation: &str, fut: F) -> Result<T, TimeoutExceeded>
    where
        F: std::future::Future<Output = T>,
    {
        let budget = self.budget_for(operation);
        match tokio::time::timeout(budget, fut).await {
            Ok(v) => Ok(v),
            Err(_) => {
                warn!(operation, ?budget, "operation exceeded timeout budget");
                Err(TimeoutExceeded)
            }
        }
    }
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn completes_within_budget() {
        let policy = TimeoutPolicy::new(Duration::from_millis(50));
        let result = policy.run("fast", async { 42 }).await;
        assert_eq!(result, Ok(42));
    }

    #[tokio::test]
    async fn exceeding_budget_times_out() {
        let policy = TimeoutPolicy::new(Duration::from_millis(10));
        let result = policy
            .run("slow", async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                42
            })
            .await;
        assert_eq!(result, Err(TimeoutExceeded));
    }

    #[tokio::test]
    async fn per_operation_budget_overrides_default() {
        let policy = TimeoutPolicy::new(Duration::from_millis(5));
        policy.set_budget("patient", Duration::from_millis(100));
        let result = policy
            .run("patient", async {
                tokio::time::sleep(Duration::from_millis(30)).await;
                1
            })
            .await;
        assert_eq!(result, Ok(1));
    }
}
