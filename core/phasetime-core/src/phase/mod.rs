//! Session phase tracking.
//!
//! A session moves through three phases:
//!
//! ```text
//! ClientLoading ──lobby──▶ LobbyLoaded ──arena──▶ ArenaLoaded
//!                              ▲                       │
//!                              └────────lobby──────────┘
//! ```
//!
//! Re-firing the trigger of the current phase only starts its timer (once).
//! `vehicle_destroyed` is legal in the arena and records a timestamp without
//! changing phase. Everything else is a [`BadStateTransition`].
//!
//! # Module Structure
//!
//! - [`types`]: `PhaseKind`, `Trigger` and the `PhaseRecord` timing value
//! - [`transition`]: the pure (phase, trigger) → step table
//! - [`machine`]: applies steps, stamps times, hands closed records to a sink
//! - [`clock`]: time source abstraction
//!
//! [`BadStateTransition`]: crate::error::PhaseError::BadStateTransition

pub mod clock;
pub mod machine;
pub mod transition;
pub mod types;


pub use clock::{Clock, ManualClock, SystemClock};
pub use machine::{PhaseStateMachine, RecordSink};
pub use transition::{next_step, Step};
pub use types::{PhaseKind, PhaseRecord, Trigger};
