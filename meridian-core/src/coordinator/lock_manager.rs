//! Named, fair locks for the components the coordinator constructs, plus
//! the acyclic check run at registration time against the dependency
//! graph those locks are keyed on.

use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Holds one `tokio::sync::Mutex` per named component. `tokio`'s mutex
/// wakes waiters in arrival order, which is what gives `acquire` its
/// fairness guarantee.
#[derive(Default)]
pub struct LockManager {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self { locks: DashMap::new() }
    }

    /// Idempotent: registering the same name twice reuses the existing lock.
    pub fn register(&self, name: &str) {
        self.locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())));
    }

    pub async fn acquire(&self, name: &str) -> OwnedMutexGuard<()> {
        self.register(name);
        let lock = self.locks.get(name).expect("just registered").clone();
        lock.lock_owned().await
    }
}

/// True if adding an edge `from -> each of deps` would create a cycle in
/// `graph`, where `graph` already holds every previously accepted
/// dependency edge. Plain depth-first search from each dependency back to
/// `from`.
pub fn would_cycle(graph: &HashMap<String, Vec<String>>, from: &str, deps: &[String]) -> bool {
    for dep in deps {
        if dep == from {
            return true;
        }
        let mut visited = HashSet::new();
        if reaches(graph, dep, from, &mut visited) {
            return true;
        }
    }
    false
}

fn reaches(graph: &HashMap<String, Vec<String>>, start: &str, target: &str, visited: &mut HashSet<String>) -> bool {
    if start == target {
        return true;
    }
    if !visited.insert(start.to_string()) {
        return false;
    }
    match graph.get(start) {
        Some(deps) => deps.iter().any(|d| reaches(graph, d, target, visited)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquire_is_exclusive() {
        let manager = LockManager::new();
        let guard = manager.acquire("engine").await;
        drop(guard);
        let _guard = manager.acquire("engine").await;
    }

    #[test]
    fn detects_a_direct_cycle() {
        let mut graph = HashMap::new();
        graph.insert("a".to_string(), vec!["b".to_string()]);
        assert!(would_cycle(&graph, "b", &["a".to_string()]));
    }

    #[test]
    fn detects_a_transitive_cycle() {
        let mut graph = HashMap::new();
        graph.insert("a".to_string(), vec!["b".to_string()]);
        graph.insert("b".to_string(), vec!["c".to_string()]);
        assert!(would_cycle(&graph, "c", &["a".to_string()]));
    }

    #[test]
    fn allows_a_diamond_dependency() {
        let mut graph = HashMap::new();
        graph.insert("b".to_string(), vec!["a".to_string()]);
        graph.insert("c".to_string(), vec!["a".to_string()]);
        assert!(!would_cycle(&graph, "d", &["b".to_string(), "c".to_string()]));
    }
}
