//! The session-phase state machine.
//!
//! Owns the current phase record and applies the [`next_step`] table. Closed
//! records leave the machine through a [`RecordSink`], so the machine never
//! needs to know who stores them.

use std::sync::Arc;

use tracing::debug;

use super::clock::Clock;
use super::transition::{next_step, Step};
use super::types::{PhaseKind, PhaseRecord, Trigger};
use crate::error::{PhaseError, Result};

/// Receives each phase record exactly once, when it is closed.
pub trait RecordSink {
    fn accept(&mut self, record: PhaseRecord) -> Result<()>;
}

#[derive(Debug)]
pub struct PhaseStateMachine {
    current: PhaseRecord,
    /// Set at most once per arena phase; not persisted.
    destroyed_at: Option<i64>,
    closed: bool,
    clock: Arc<dyn Clock>,
}

impl PhaseStateMachine {
    /// Starts in `ClientLoading` with the timer not yet running.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        PhaseStateMachine {
            current: PhaseRecord::new(PhaseKind::ClientLoading),
            destroyed_at: None,
            closed: false,
            clock,
        }
    }

    pub fn current_phase(&self) -> PhaseKind {
        self.current.phase_kind()
    }

    pub fn current_record(&self) -> &PhaseRecord {
        &self.current
    }

    pub fn destroyed_at(&self) -> Option<i64> {
        self.destroyed_at
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Applies a trigger. Illegal triggers leave every field untouched.
    pub fn fire(&mut self, trigger: Trigger, sink: &mut dyn RecordSink) -> Result<Step> {
        if self.closed {
            return Err(PhaseError::SessionClosed { trigger });
        }

        let state = self.current.phase_kind();
        let step = next_step(state, trigger)
            .ok_or(PhaseError::BadStateTransition { state, trigger })?;

        match step {
            Step::StartTimer => {
                let now = self.clock.now_millis();
                if self.current.start(now) {
                    debug!(phase = %state, at = now, "Phase timer started");
                }
            }
            Step::MarkDestroyed => {
                if self.destroyed_at.is_none() {
                    let now = self.clock.now_millis();
                    self.destroyed_at = Some(now);
                    debug!(phase = %state, at = now, "Vehicle destroyed");
                }
            }
            Step::Advance(next) => self.advance(next, sink)?,
        }

        Ok(step)
    }

    /// Stops the current phase and hands it to the sink. Returns `false` if the
    /// session was already closed by an earlier call.
    ///
    /// If the sink fails the machine stays open, so a later call flushes the
    /// same (already stopped) record again.
    pub fn shutdown(&mut self, sink: &mut dyn RecordSink) -> Result<bool> {
        if self.closed {
            return Ok(false);
        }

        self.current.stop(self.clock.now_millis());
        sink.accept(self.current)?;
        self.closed = true;

        debug!(
            phase = %self.current.phase_kind(),
            duration_ms = self.current.duration_ms(),
            "Session closed"
        );
        Ok(true)
    }

    // The old record reaches the sink before the new one is installed, so a
    // sink failure leaves the machine on the stopped old phase.
    fn advance(&mut self, next: PhaseKind, sink: &mut dyn RecordSink) -> Result<()> {
        let now = self.clock.now_millis();
        let from = self.current.phase_kind();

        self.current.stop(now);
        sink.accept(self.current)?;

        let mut entered = PhaseRecord::new(next);
        entered.start(now);
        self.current = entered;
        self.destroyed_at = None;

        debug!(from = %from, to = %next, at = now, "Phase transition");
        Ok(())
    }
}
