//! Per-client engines for multi-client hosts.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::SimulationEngine;

/// Shared handle to one client's engine.
pub type EngineHandle = Arc<Mutex<SimulationEngine>>;

/// Maps client ids to independent engines.
///
/// Every client gets its own engine behind its own lock, so concurrent
/// clients never contend on, or observe, each other's sessions. The map lock
/// is held only long enough to look up or insert a handle.
#[derive(Debug, Default)]
pub struct SessionPool {
    engines: Mutex<HashMap<String, EngineHandle>>,
}

impl SessionPool {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, HashMap<String, EngineHandle>> {
        // A panic while holding the map lock cannot leave the map half-updated.
        self.engines.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the engine for `client`, creating an idle one on first use.
    pub fn engine(&self, client: &str) -> EngineHandle {
        Arc::clone(
            self.map()
                .entry(client.to_owned())
                .or_insert_with(|| {
                    log::debug!("new engine for client {client}");
                    Arc::new(Mutex::new(SimulationEngine::new()))
                }),
        )
    }

    /// Runs `f` with exclusive access to `client`'s engine.
    pub fn with_engine<T>(&self, client: &str, f: impl FnOnce(&mut SimulationEngine) -> T) -> T {
        let handle = self.engine(client);
        let mut engine = handle.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut engine)
    }

    /// Drops `client`'s engine; returns whether one existed.
    pub fn remove(&self, client: &str) -> bool {
        self.map().remove(client).is_some()
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    pub fn clients(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.map().keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;
    use plume_core::{SimConfig, SimError};
    use std::thread;

    #[test]
    fn engines_are_created_lazily_and_reused() {
        let pool = SessionPool::new();
        assert!(pool.is_empty());
        let a = pool.engine("a");
        let again = pool.engine("a");
        assert!(Arc::ptr_eq(&a, &again));
        pool.engine("b");
        assert_eq!(pool.clients(), vec!["a".to_owned(), "b".to_owned()]);
        assert!(pool.remove("a"));
        assert!(!pool.remove("a"));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn sessions_are_isolated_between_clients() {
        let pool = SessionPool::new();
        pool.with_engine("a", |e| e.start_session(DVec2::new(10.0, 10.0), SimConfig::seeded(1)))
            .unwrap();
        let err = pool.with_engine("b", |e| e.step()).unwrap_err();
        assert_eq!(err, SimError::NoActiveSession);
        assert!(pool.with_engine("a", |e| e.step()).is_ok());
    }

    #[test]
    fn concurrent_clients_run_independently() {
        let pool = Arc::new(SessionPool::new());
        let workers: Vec<_> = (0..4_u64)
            .map(|id| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    let client = format!("client-{id}");
                    pool.with_engine(&client, |e| {
                        e.start_session(DVec2::new(10.0, 10.0), SimConfig::seeded(7))?;
                        e.run_multiple_steps(20)?;
                        e.state()
                    })
                })
            })
            .collect();

        let states: Vec<_> = workers
            .into_iter()
            .map(|w| w.join().unwrap().unwrap())
            .collect();
        assert_eq!(pool.len(), 4);
        for s in &states {
            assert_eq!(s.energy, 0.0);
            assert_eq!(s.trajectory.len(), 21);
            // Same seed and start, so every client saw the same run.
            assert_eq!(s.trajectory, states[0].trajectory);
        }
    }
}
