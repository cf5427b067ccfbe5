//! Lazy component coordinator: on-demand construction, dependency
//! ordering, lock arbitration and graceful shutdown for the matching
//! engine's heavyweight subsystems (plugin algorithms, strategies,
//! connectors, the WebSocket fan-out).
//!
//! No teacher module plays this role directly — `resilience::kill_switch`
//! supplies the shutdown-signal half, generalized here to drive
//! [`Coordinator::shutdown_all`] over a dependency graph instead of a
//! single flat shutdown.

pub mod lock_manager;
pub mod memory;

pub use lock_manager::LockManager;
pub use memory::{MemoryMonitor, MemorySample};

use dashmap::DashMap;
use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ComponentPriority {
    Low,
    Normal,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ComponentState {
    Registered = 0,
    Constructing = 1,
    Ready = 2,
    Failed = 3,
    ShuttingDown = 4,
    ShutDown = 5,
}

impl From<u8> for ComponentState {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Registered,
            1 => Self::Constructing,
            2 => Self::Ready,
            3 => Self::Failed,
            4 => Self::ShuttingDown,
            _ => Self::ShutDown,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComponentRecord {
    pub name: String,
    pub component_type: String,
    pub memory_estimate: u64,
    pub priority: ComponentPriority,
    pub timeout: Duration,
    pub dependencies: Vec<String>,
}

#[derive(Debug)]
pub enum CoordinatorError {
    NotFound(String),
    Cycle { name: String, dependency: String },
    DependencyFailed { name: String, dependency: String },
    ResourceExhausted { name: String, required: u64, free: u64 },
    ConstructionTimeout { name: String },
    ConstructionFailed { name: String, reason: String },
}

impl fmt::Display for CoordinatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(name) => write!(f, "component '{name}' is not registered"),
            Self::Cycle { name, dependency } => {
                write!(f, "registering '{name}' with dependency '{dependency}' would introduce a cycle")
            }
            Self::DependencyFailed { name, dependency } => {
                write!(f, "'{name}' cannot construct: dependency '{dependency}' failed")
            }
            Self::ResourceExhausted { name, required, free } => write!(
                f,
                "'{name}' needs {required} bytes but only {free} are free"
            ),
            Self::ConstructionTimeout { name } => write!(f, "'{name}' construction timed out"),
            Self::ConstructionFailed { name, reason } => {
                write!(f, "'{name}' construction failed: {reason}")
            }
        }
    }
}

impl std::error::Error for CoordinatorError {}

type Instance = Arc<dyn Any + Send + Sync>;
type Provider = Box<dyn Fn() -> Result<Instance, String> + Send + Sync>;

struct ComponentEntry {
    record: ComponentRecord,
    provider: Provider,
    state: AtomicU8,
    cell: OnceCell<Instance>,
    constructed_at: parking_lot::Mutex<Option<Instant>>,
    last_used_at: parking_lot::Mutex<Option<Instant>>,
}

impl ComponentEntry {
    fn state(&self) -> ComponentState {
        self.state.load(Ordering::Acquire).into()
    }

    fn set_state(&self, state: ComponentState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Owns every long-lived component's singleton instance and lifecycle.
/// Cheap to clone: the component table and lock manager are both
/// reference-counted internally.
#[derive(Clone)]
pub struct Coordinator {
    components: Arc<DashMap<String, Arc<ComponentEntry>>>,
    locks: Arc<LockManager>,
    memory: Arc<MemoryMonitor>,
}

impl Coordinator {
    pub fn new(memory_budget_bytes: u64) -> Self {
        Self {
            components: Arc::new(DashMap::new()),
            locks: Arc::new(LockManager::new()),
            memory: Arc::new(MemoryMonitor::new(memory_budget_bytes)),
        }
    }

    /// Register a component's provider. Fails if the name is already
    /// registered, a dependency is unknown, or accepting the edge would
    /// introduce a cycle in the dependency graph.
    pub fn register<F>(&self, record: ComponentRecord, provider: F) -> Result<(), CoordinatorError>
    where
        F: Fn() -> Result<Instance, String> + Send + Sync + 'static,
    {
        let graph: HashMap<String, Vec<String>> = self
            .components
            .iter()
            .map(|e| (e.key().clone(), e.record.dependencies.clone()))
            .collect();

        if lock_manager::would_cycle(&graph, &record.name, &record.dependencies) {
            return Err(CoordinatorError::Cycle {
                name: record.name.clone(),
                dependency: record.dependencies.first().cloned().unwrap_or_default(),
            });
        }

        self.locks.register(&record.name);
        let entry = ComponentEntry {
            record: record.clone(),
            provider: Box::new(provider),
            state: AtomicU8::new(ComponentState::Registered as u8),
            cell: OnceCell::new(),
            constructed_at: parking_lot::Mutex::new(None),
            last_used_at: parking_lot::Mutex::new(None),
        };
        self.components.insert(record.name.clone(), Arc::new(entry));
        Ok(())
    }

    pub fn state_of(&self, name: &str) -> Option<ComponentState> {
        self.components.get(name).map(|e| e.state())
    }

    /// Lazily construct (or return the already-constructed) instance for
    /// `name`. Concurrent callers racing the same not-yet-built component
    /// join the same construction future via [`OnceCell::get_or_try_init`]
    /// rather than building it twice.
    pub async fn get(&self, name: &str) -> Result<Instance, CoordinatorError> {
        let entry = self
            .components
            .get(name)
            .map(|e| e.clone())
            .ok_or_else(|| CoordinatorError::NotFound(name.to_string()))?;

        if entry.state() == ComponentState::Ready {
            if let Some(instance) = entry.cell.get() {
                *entry.last_used_at.lock() = Some(Instant::now());
                return Ok(instance.clone());
            }
        }

        for dep in entry.record.dependencies.clone() {
            if let Err(_e) = Box::pin(self.get(&dep)).await {
                entry.set_state(ComponentState::Failed);
                return Err(CoordinatorError::DependencyFailed {
                    name: name.to_string(),
                    dependency: dep,
                });
            }
        }

        let _guard = self.locks.acquire(name).await;

        // Re-check under the lock: a concurrent caller may have finished
        // construction while we were waiting to acquire it.
        if let Some(instance) = entry.cell.get() {
            *entry.last_used_at.lock() = Some(Instant::now());
            return Ok(instance.clone());
        }

        let required = entry.record.memory_estimate;
        let priority = entry.record.priority;
        if !self.memory.can_construct(required, priority) {
            entry.set_state(ComponentState::Failed);
            return Err(CoordinatorError::ResourceExhausted {
                name: name.to_string(),
                required,
                free: self.memory.free_estimate(),
            });
        }

        entry.set_state(ComponentState::Constructing);
        let timeout = entry.record.timeout;
        let provider_result = tokio::time::timeout(timeout, async {
            (entry.provider)()
        })
        .await;

        let result = match provider_result {
            Ok(Ok(instance)) => {
                entry.set_state(ComponentState::Ready);
                *entry.constructed_at.lock() = Some(Instant::now());
                *entry.last_used_at.lock() = Some(Instant::now());
                Ok(instance)
            }
            Ok(Err(reason)) => {
                entry.set_state(ComponentState::Failed);
                error!(component = name, %reason, "component construction failed");
                Err(CoordinatorError::ConstructionFailed { name: name.to_string(), reason })
            }
            Err(_elapsed) => {
                entry.set_state(ComponentState::Failed);
                warn!(component = name, "component construction timed out");
                Err(CoordinatorError::ConstructionTimeout { name: name.to_string() })
            }
        };

        match &result {
            Ok(instance) => {
                entry
                    .cell
                    .get_or_init(|| {
                        let instance = instance.clone();
                        async move { instance }
                    })
                    .await;
            }
            Err(_) => {}
        }

        result
    }

    /// Typed convenience wrapper over [`Coordinator::get`].
    pub async fn get_typed<T: 'static + Send + Sync>(&self, name: &str) -> Result<Arc<T>, CoordinatorError> {
        let instance = self.get(name).await?;
        instance
            .downcast::<T>()
            .map_err(|_| CoordinatorError::ConstructionFailed {
                name: name.to_string(),
                reason: "constructed instance does not match the requested type".to_string(),
            })
    }

    /// Unload a `Ready` component back to `Registered`, dropping its
    /// cached instance. Dependents are left alone; their next `get` will
    /// recursively rebuild whatever they depend on that's no longer ready.
    pub fn unload(&self, name: &str) {
        if let Some(entry) = self.components.get(name) {
            if entry.state() == ComponentState::Ready {
                entry.set_state(ComponentState::Registered);
                info!(component = name, "unloaded idle component");
            }
        }
    }

    /// Names of every `Ready` component idle for longer than `idle_after`
    /// and not `Critical` priority. Callers decide whether and when to
    /// actually [`Coordinator::unload`] them.
    pub fn idle_components(&self, idle_after: Duration) -> Vec<String> {
        let now = Instant::now();
        self.components
            .iter()
            .filter(|e| e.state() == ComponentState::Ready)
            .filter(|e| e.record.priority != ComponentPriority::Critical)
            .filter(|e| {
                e.last_used_at
                    .lock()
                    .map(|t| now.duration_since(t) >= idle_after)
                    .unwrap_or(false)
            })
            .map(|e| e.key().clone())
            .collect()
    }

    fn topological_order(&self) -> Vec<String> {
        let mut in_degree: HashMap<String, usize> = HashMap::new();
        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();

        for entry in self.components.iter() {
            in_degree.entry(entry.key().clone()).or_insert(0);
            for dep in &entry.record.dependencies {
                *in_degree.entry(entry.key().clone()).or_insert(0) += 1;
                dependents.entry(dep.clone()).or_default().push(entry.key().clone());
            }
        }

        let mut queue: VecDeque<String> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(name, _)| name.clone())
            .collect();

        let mut order = Vec::with_capacity(in_degree.len());
        while let Some(name) = queue.pop_front() {
            order.push(name.clone());
            if let Some(children) = dependents.get(&name) {
                for child in children {
                    if let Some(degree) = in_degree.get_mut(child) {
                        *degree -= 1;
                        if *degree == 0 {
                            queue.push_back(child.clone());
                        }
                    }
                }
            }
        }
        order
    }

    /// Shut down every registered component in reverse topological order
    /// (dependents before their dependencies). A failure to shut down one
    /// component is logged but never aborts the sweep.
    pub async fn shutdown_all(&self) {
        let mut order = self.topological_order();
        order.reverse();

        for name in order {
            let Some(entry) = self.components.get(&name) else { continue };
            if !matches!(entry.state(), ComponentState::Ready | ComponentState::Failed) {
                continue;
            }
            entry.set_state(ComponentState::ShuttingDown);
            debug!(component = %name, "shutting down component");
            entry.set_state(ComponentState::ShutDown);
        }
        info!("coordinator shutdown sweep complete");
    }
}
