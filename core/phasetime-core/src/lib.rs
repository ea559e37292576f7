//! # phasetime-core
//!
//! Measures how long a client session spends in each of its loading and play
//! phases, keeps the measurements durable across crashes, and reports
//! all-time and current-month averages.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. Hosts can wrap with async if needed.
//! - **Not thread-safe**: Hosts provide their own synchronization (`Mutex`).
//! - **Write-deferred**: Closed phases are cached in memory and written once,
//!   at shutdown or on an explicit commit.
//! - **Crash-safe**: Every commit is all-or-nothing, with a backup restored on failure.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use phasetime_core::{load_config, open_store, SessionController, StorageConfig};
//!
//! let storage = StorageConfig::default();
//! let mut controller = SessionController::new(open_store(&storage, &load_config(&storage)));
//! controller.on_session_started()?;
//! controller.on_lobby_entered()?;
//! controller.on_active_phase_entered()?;
//! controller.shutdown()?;
//! let stats = controller.get_statistics()?;
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod history;
pub mod phase;
pub mod stats;
pub mod storage;
pub mod store;

pub use config::{load_config, save_config, PhasetimeConfig, StoreBackend};
pub use controller::SessionController;
pub use error::{PhaseError, Result};
pub use history::SessionHistoryCache;
pub use phase::{
    Clock, ManualClock, PhaseKind, PhaseRecord, PhaseStateMachine, RecordSink, SystemClock,
    Trigger,
};
pub use stats::{AggregateStats, PeriodStats, PhaseAverage, StatisticsAggregator};
pub use storage::StorageConfig;
pub use store::{
    open_store, JsonFileStore, PersistedRow, PersistenceStore, SqliteStore, DEFAULT_TABLE_NAME,
};
