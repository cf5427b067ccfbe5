//! Domain error types for the matching and execution pipeline.
//!
//! Every error kind named in the execution error taxonomy gets its own
//! variant with a manual `Display` impl rather than a stringly-typed
//! message, so callers can match on failure class without parsing text.

use std::fmt;

/// Errors that can occur during arithmetic on atomic fixed-point fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverflowError {
    QuantityOverflow { old: i64, delta: i64 },
    RealizedPnlOverflow { old: i64, delta: i64 },
    DailyPnlOverflow { old: i64, delta: i64 },
    TradeCountOverflow { old: u32 },
}

impl fmt::Display for OverflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowError::QuantityOverflow { old, delta } => write!(
                f,
                "position quantity overflow: {} + {} would exceed i64 limits",
                old, delta
            ),
            OverflowError::RealizedPnlOverflow { old, delta } => write!(
                f,
                "realized pnl overflow: {} + {} would exceed i64 limits",
                old, delta
            ),
            OverflowError::DailyPnlOverflow { old, delta } => write!(
                f,
                "daily pnl overflow: {} + {} would exceed i64 limits",
                old, delta
            ),
            OverflowError::TradeCountOverflow { old } => {
                write!(f, "trade count overflow: {} trades (limit: u32::MAX)", old)
            }
        }
    }
}

impl std::error::Error for OverflowError {}

/// The closed error taxonomy for the execution pipeline (ingress through
/// matching through trade emission). Each variant names exactly one
/// failure class from the error handling design; propagation policy
/// (terminal vs retryable) is exposed via [`ExecutionError::is_retryable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    Validation(String),
    RiskRejection(RiskRejectionReason),
    RateLimited,
    BulkheadFull,
    CircuitOpen,
    TimeoutExceeded,
    ResourceExhausted(String),
    NotFound(String),
    VersionIncompatible(String),
    DependencyUnavailable(String),
    InternalPanic(String),
    Cancelled,
    Temporary(String),
    Fatal(String),
}

/// Why the risk gate rejected an order. Kept distinct from
/// [`ExecutionError`] so the risk module can be tested without pulling in
/// the whole error taxonomy, and folded into `RiskRejection` at the gate
/// boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RiskRejectionReason {
    AccountInactive,
    SymbolNotPermitted,
    OrderSizeExceedsMax { size: String, max: String },
    PositionLimitExceeded { projected: String, limit: String },
    DailyLossLimitExceeded { projected: String, limit: String },
    CircuitBreakerTripped { symbol: String, reason: String },
    DuplicateClientOrderId { client_order_id: String },
}

impl fmt::Display for RiskRejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskRejectionReason::AccountInactive => write!(f, "account is not active"),
            RiskRejectionReason::SymbolNotPermitted => {
                write!(f, "account is not permitted to trade this symbol")
            }
            RiskRejectionReason::OrderSizeExceedsMax { size, max } => {
                write!(f, "order size {} exceeds maximum {}", size, max)
            }
            RiskRejectionReason::PositionLimitExceeded { projected, limit } => write!(
                f,
                "projected position {} would exceed limit {}",
                projected, limit
            ),
            RiskRejectionReason::DailyLossLimitExceeded { projected, limit } => write!(
                f,
                "projected daily loss {} would exceed limit {}",
                projected, limit
            ),
            RiskRejectionReason::CircuitBreakerTripped { symbol, reason } => {
                write!(f, "circuit breaker tripped for {}: {}", symbol, reason)
            }
            RiskRejectionReason::DuplicateClientOrderId { client_order_id } => {
                write!(f, "duplicate client order id: {}", client_order_id)
            }
        }
    }
}

impl std::error::Error for RiskRejectionReason {}

impl ExecutionError {
    /// Machine-stable short code for logs and metrics labels.
    pub fn code(&self) -> &'static str {
        match self {
            ExecutionError::Validation(_) => "validation_error",
            ExecutionError::RiskRejection(_) => "risk_rejection",
            ExecutionError::RateLimited => "rate_limited",
            ExecutionError::BulkheadFull => "bulkhead_full",
            ExecutionError::CircuitOpen => "circuit_open",
            ExecutionError::TimeoutExceeded => "timeout_exceeded",
            ExecutionError::ResourceExhausted(_) => "resource_exhausted",
            ExecutionError::NotFound(_) => "not_found",
            ExecutionError::VersionIncompatible(_) => "version_incompatible",
            ExecutionError::DependencyUnavailable(_) => "dependency_unavailable",
            ExecutionError::InternalPanic(_) => "internal_panic",
            ExecutionError::Cancelled => "cancelled",
            ExecutionError::Temporary(_) => "temporary",
            ExecutionError::Fatal(_) => "fatal",
        }
    }

    /// A short, user-safe description. Never includes a backtrace, raw
    /// pointer, or internal path — only the fields the variant carries.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Whether a caller (retry primitive, ingress shard) should retry this
    /// error. See the error handling design's propagation table.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExecutionError::RateLimited
                | ExecutionError::BulkheadFull
                | ExecutionError::CircuitOpen
                | ExecutionError::TimeoutExceeded
                | ExecutionError::Temporary(_)
        )
    }

    /// Whether this error should escalate to coordinator-driven shutdown.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExecutionError::Fatal(_))
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionError::Validation(detail) => write!(f, "validation failed: {}", detail),
            ExecutionError::RiskRejection(reason) => write!(f, "risk rejected: {}", reason),
            ExecutionError::RateLimited => write!(f, "rate limited"),
            ExecutionError::BulkheadFull => write!(f, "bulkhead at capacity"),
            ExecutionError::CircuitOpen => write!(f, "circuit breaker open"),
            ExecutionError::TimeoutExceeded => write!(f, "operation timed out"),
            ExecutionError::ResourceExhausted(detail) => {
                write!(f, "resource exhausted: {}", detail)
            }
            ExecutionError::NotFound(what) => write!(f, "not found: {}", what),
            ExecutionError::VersionIncompatible(detail) => {
                write!(f, "version incompatible: {}", detail)
            }
            ExecutionError::DependencyUnavailable(name) => {
                write!(f, "dependency unavailable: {}", name)
            }
            ExecutionError::InternalPanic(detail) => write!(f, "internal panic: {}", detail),
            ExecutionError::Cancelled => write!(f, "operation cancelled"),
            ExecutionError::Temporary(detail) => write!(f, "temporary failure: {}", detail),
            ExecutionError::Fatal(detail) => write!(f, "fatal error: {}", detail),
        }
    }
}

impl std::error::Error for ExecutionError {}

impl From<RiskRejectionReason> for ExecutionError {
    fn from(reason: RiskRejectionReason) -> Self {
        ExecutionError::RiskRejection(reason)
    }
}
