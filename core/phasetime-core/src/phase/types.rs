//! Phase kinds, triggers and the per-phase timing record.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A named interval of session occupancy.
///
/// Labels are the persisted representation and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseKind {
    /// Uninitialized sentinel. Never produced by the state machine, never persisted.
    Base,
    ClientLoading,
    LobbyLoaded,
    ArenaLoaded,
}

impl PhaseKind {
    /// Kinds that show up in statistics, in display order.
    pub const TRACKED: [PhaseKind; 3] = [
        PhaseKind::ClientLoading,
        PhaseKind::LobbyLoaded,
        PhaseKind::ArenaLoaded,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PhaseKind::Base => "BASE",
            PhaseKind::ClientLoading => "CLIENT_LOADING",
            PhaseKind::LobbyLoaded => "LOBBY_LOADED",
            PhaseKind::ArenaLoaded => "ARENA_LOADED",
        }
    }

    /// Parses a persisted label, including the `STATE_*` and short
    /// (`LOADING`, `LOBBY`, `ARENA`) labels written by older tooling.
    /// Unknown labels yield `None` so readers can tolerate rows written by
    /// newer versions.
    pub fn from_label(label: &str) -> Option<PhaseKind> {
        match label {
            "BASE" | "STATE_BASE" => Some(PhaseKind::Base),
            "CLIENT_LOADING" | "STATE_CLIENT_LOADING" | "LOADING" => Some(PhaseKind::ClientLoading),
            "LOBBY_LOADED" | "STATE_LOBBY_LOADED" | "LOBBY" => Some(PhaseKind::LobbyLoaded),
            "ARENA_LOADED" | "STATE_ARENA_LOADED" | "ARENA" => Some(PhaseKind::ArenaLoaded),
            _ => None,
        }
    }

    pub fn is_persistable(self) -> bool {
        self != PhaseKind::Base
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// External event asking the state machine to act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Started,
    LobbyLoaded,
    ArenaLoaded,
    VehicleDestroyed,
}

impl Trigger {
    pub const ALL: [Trigger; 4] = [
        Trigger::Started,
        Trigger::LobbyLoaded,
        Trigger::ArenaLoaded,
        Trigger::VehicleDestroyed,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Trigger::Started => "started",
            Trigger::LobbyLoaded => "lobby_loaded",
            Trigger::ArenaLoaded => "arena_loaded",
            Trigger::VehicleDestroyed => "vehicle_destroyed",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Trigger {
    type Err = String;

    /// Accepts the canonical names plus short aliases (`lobby`, `arena`, `destroyed`).
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "started" | "start" => Ok(Trigger::Started),
            "lobby_loaded" | "lobby" => Ok(Trigger::LobbyLoaded),
            "arena_loaded" | "arena" => Ok(Trigger::ArenaLoaded),
            "vehicle_destroyed" | "destroyed" => Ok(Trigger::VehicleDestroyed),
            other => Err(format!("Unknown trigger: {}", other)),
        }
    }
}

/// Timing data for one phase occupancy.
///
/// Timestamps are milliseconds since the Unix epoch; `0` means "not set yet".
/// Each timestamp is written at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseRecord {
    start_timestamp: i64,
    stop_timestamp: i64,
    phase_kind: PhaseKind,
}

impl Default for PhaseRecord {
    fn default() -> Self {
        PhaseRecord::new(PhaseKind::Base)
    }
}

impl PhaseRecord {
    pub fn new(phase_kind: PhaseKind) -> Self {
        PhaseRecord {
            start_timestamp: 0,
            stop_timestamp: 0,
            phase_kind,
        }
    }

    /// Builds an already-closed record, e.g. when rehydrating from storage.
    pub fn closed(phase_kind: PhaseKind, start_timestamp: i64, stop_timestamp: i64) -> Self {
        PhaseRecord {
            start_timestamp,
            stop_timestamp: stop_timestamp.max(start_timestamp),
            phase_kind,
        }
    }

    pub fn phase_kind(&self) -> PhaseKind {
        self.phase_kind
    }

    pub fn start_timestamp(&self) -> i64 {
        self.start_timestamp
    }

    pub fn stop_timestamp(&self) -> i64 {
        self.stop_timestamp
    }

    pub fn is_started(&self) -> bool {
        self.start_timestamp > 0
    }

    pub fn is_stopped(&self) -> bool {
        self.stop_timestamp > 0
    }

    /// Sets the start time unless already started. Returns whether it changed.
    pub(crate) fn start(&mut self, now_ms: i64) -> bool {
        if self.is_started() {
            return false;
        }
        self.start_timestamp = now_ms;
        true
    }

    /// Sets the stop time unless already stopped. Returns whether it changed.
    ///
    /// The stop time is clamped to the start time so a clock that steps
    /// backwards cannot produce a negative duration.
    pub(crate) fn stop(&mut self, now_ms: i64) -> bool {
        if self.is_stopped() {
            return false;
        }
        self.stop_timestamp = now_ms.max(self.start_timestamp);
        true
    }

    /// Elapsed milliseconds; 0 for a record that never started or never stopped.
    pub fn duration_ms(&self) -> i64 {
        if !self.is_started() || !self.is_stopped() {
            return 0;
        }
        self.stop_timestamp - self.start_timestamp
    }

    /// The timestamp stored as a row's `date`: the start time, falling back to
    /// the stop time for a phase that was closed without ever starting.
    pub fn date_ms(&self) -> i64 {
        if self.is_started() {
            self.start_timestamp
        } else {
            self.stop_timestamp
        }
    }
}

impl fmt::Display for PhaseRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: start={} stop={}",
            self.phase_kind, self.start_timestamp, self.stop_timestamp
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip() {
        for kind in [
            PhaseKind::Base,
            PhaseKind::ClientLoading,
            PhaseKind::LobbyLoaded,
            PhaseKind::ArenaLoaded,
        ] {
            assert_eq!(PhaseKind::from_label(kind.label()), Some(kind));
        }
        assert_eq!(PhaseKind::from_label("GARAGE"), None);
    }

    #[test]
    fn test_legacy_labels_parse() {
        assert_eq!(PhaseKind::from_label("STATE_LOBBY_LOADED"), Some(PhaseKind::LobbyLoaded));
        assert_eq!(PhaseKind::from_label("LOADING"), Some(PhaseKind::ClientLoading));
        assert_eq!(PhaseKind::from_label("ARENA"), Some(PhaseKind::ArenaLoaded));
        assert_eq!(PhaseKind::from_label("STATE_BASE"), Some(PhaseKind::Base));
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&PhaseKind::ArenaLoaded).unwrap();
        assert_eq!(json, "\"ARENA_LOADED\"");
    }

    #[test]
    fn test_base_is_not_persistable() {
        assert!(!PhaseKind::Base.is_persistable());
        assert!(PhaseKind::TRACKED.iter().all(|k| k.is_persistable()));
    }

    #[test]
    fn test_trigger_parses_aliases() {
        assert_eq!("lobby".parse::<Trigger>(), Ok(Trigger::LobbyLoaded));
        assert_eq!("ARENA_LOADED".parse::<Trigger>(), Ok(Trigger::ArenaLoaded));
        assert_eq!(" destroyed ".parse::<Trigger>(), Ok(Trigger::VehicleDestroyed));
        assert!("garage".parse::<Trigger>().is_err());
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut record = PhaseRecord::new(PhaseKind::LobbyLoaded);
        assert!(record.start(1_000));
        assert!(!record.start(2_000));
        assert_eq!(record.start_timestamp(), 1_000);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut record = PhaseRecord::new(PhaseKind::LobbyLoaded);
        record.start(1_000);
        assert!(record.stop(1_500));
        assert!(!record.stop(9_000));
        assert_eq!(record.stop_timestamp(), 1_500);
        assert_eq!(record.duration_ms(), 500);
    }

    #[test]
    fn test_stop_never_precedes_start() {
        let mut record = PhaseRecord::new(PhaseKind::ArenaLoaded);
        record.start(5_000);
        record.stop(4_000);
        assert_eq!(record.stop_timestamp(), 5_000);
        assert_eq!(record.duration_ms(), 0);
    }

    #[test]
    fn test_never_started_record_has_zero_duration() {
        let mut record = PhaseRecord::new(PhaseKind::ClientLoading);
        record.stop(7_000);
        assert_eq!(record.duration_ms(), 0);
        assert_eq!(record.date_ms(), 7_000);
    }

    #[test]
    fn test_display_matches_dump_format() {
        let record = PhaseRecord::closed(PhaseKind::LobbyLoaded, 10, 20);
        assert_eq!(record.to_string(), "LOBBY_LOADED: start=10 stop=20");
    }
}
