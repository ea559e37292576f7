//! SessionController - the entry point a host application drives.
//!
//! Owns one state machine, one history cache, one store and one aggregator.
//! The host calls the four trigger methods as its own events happen, calls
//! [`SessionController::shutdown`] when the session ends, and may query
//! [`SessionController::get_statistics`] at any time.
//!
//! All mutating methods take `&mut self`, which serializes triggers, cache
//! mutation and commits. Hosts sharing a controller across threads wrap it in
//! a `Mutex`.
//!
//! ```rust,ignore
//! use phasetime_core::{open_store, load_config, SessionController, StorageConfig};
//!
//! let storage = StorageConfig::default();
//! let store = open_store(&storage, &load_config(&storage));
//! let mut controller = SessionController::new(store);
//! controller.on_session_started()?;
//! controller.on_lobby_entered()?;
//! controller.shutdown()?;
//! ```

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::Result;
use crate::history::SessionHistoryCache;
use crate::phase::{Clock, PhaseKind, PhaseRecord, PhaseStateMachine, SystemClock, Trigger};
use crate::stats::{AggregateStats, StatisticsAggregator};
use crate::store::PersistenceStore;

#[derive(Debug)]
pub struct SessionController {
    machine: PhaseStateMachine,
    cache: SessionHistoryCache,
    store: Box<dyn PersistenceStore>,
    aggregator: StatisticsAggregator,
}

impl SessionController {
    pub fn new(store: Box<dyn PersistenceStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Box<dyn PersistenceStore>, clock: Arc<dyn Clock>) -> Self {
        SessionController {
            machine: PhaseStateMachine::new(clock),
            cache: SessionHistoryCache::new(),
            store,
            aggregator: StatisticsAggregator::new(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Triggers
    // ─────────────────────────────────────────────────────────────────────

    pub fn on_session_started(&mut self) -> Result<()> {
        self.fire(Trigger::Started)
    }

    pub fn on_lobby_entered(&mut self) -> Result<()> {
        self.fire(Trigger::LobbyLoaded)
    }

    pub fn on_active_phase_entered(&mut self) -> Result<()> {
        self.fire(Trigger::ArenaLoaded)
    }

    pub fn on_destruction_event(&mut self) -> Result<()> {
        self.fire(Trigger::VehicleDestroyed)
    }

    /// Dispatches a trigger by value. Errors from the machine pass through unchanged.
    pub fn fire(&mut self, trigger: Trigger) -> Result<()> {
        self.machine.fire(trigger, &mut self.cache).map(|_| ())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Persistence
    // ─────────────────────────────────────────────────────────────────────

    /// Persists every cached record. The cache is cleared only if the store
    /// confirms the write; on failure the records stay for the next attempt.
    ///
    /// Returns the number of records written.
    pub fn commit(&mut self) -> Result<usize> {
        let pending = self.cache.peek_all();
        if pending.is_empty() {
            return Ok(0);
        }

        let count = pending.len();
        match self.store.commit(pending) {
            Ok(()) => {
                self.cache.clear();
                info!(count, "Phase history committed; cache cleared");
                Ok(count)
            }
            Err(err) => {
                warn!(error = %err, pending = count, "Failed to commit phase history; keeping cache");
                Err(err)
            }
        }
    }

    /// Closes the current phase (once) and commits.
    pub fn shutdown(&mut self) -> Result<usize> {
        self.machine.shutdown(&mut self.cache)?;
        self.commit()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────

    /// Loads every persisted row and aggregates it. Storage errors propagate
    /// and the aggregator is not run.
    pub fn get_statistics(&self) -> Result<AggregateStats> {
        let rows = self.store.load_all()?;
        Ok(self.aggregator.compute(&rows))
    }

    pub fn current_phase(&self) -> PhaseKind {
        self.machine.current_phase()
    }

    pub fn current_record(&self) -> &PhaseRecord {
        self.machine.current_record()
    }

    /// Records closed but not yet committed, in close order.
    pub fn pending(&self) -> &[PhaseRecord] {
        self.cache.peek_all()
    }

    pub fn destroyed_at(&self) -> Option<i64> {
        self.machine.destroyed_at()
    }

    pub fn is_closed(&self) -> bool {
        self.machine.is_closed()
    }

    pub fn store(&self) -> &dyn PersistenceStore {
        self.store.as_ref()
    }
}
