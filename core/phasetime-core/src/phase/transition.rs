//! Maps (current phase, trigger) to the step the state machine must take.
//! Pure lookup; timestamps and record handling live in the machine.

use super::types::{PhaseKind, Trigger};

/// What a legal trigger asks the machine to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Re-entering the current phase: start its timer if not started yet.
    StartTimer,
    /// Close the current phase and enter another one.
    Advance(PhaseKind),
    /// Informational only: note when the vehicle was destroyed.
    MarkDestroyed,
}

/// Returns the step for `trigger` in `current`, or `None` if the trigger is illegal there.
pub fn next_step(current: PhaseKind, trigger: Trigger) -> Option<Step> {
    match (current, trigger) {
        (PhaseKind::ClientLoading, Trigger::Started) => Some(Step::StartTimer),
        (PhaseKind::ClientLoading, Trigger::LobbyLoaded) => {
            Some(Step::Advance(PhaseKind::LobbyLoaded))
        }

        (PhaseKind::LobbyLoaded, Trigger::LobbyLoaded) => Some(Step::StartTimer),
        (PhaseKind::LobbyLoaded, Trigger::ArenaLoaded) => {
            Some(Step::Advance(PhaseKind::ArenaLoaded))
        }

        (PhaseKind::ArenaLoaded, Trigger::LobbyLoaded) => {
            Some(Step::Advance(PhaseKind::LobbyLoaded))
        }
        (PhaseKind::ArenaLoaded, Trigger::ArenaLoaded) => Some(Step::StartTimer),
        (PhaseKind::ArenaLoaded, Trigger::VehicleDestroyed) => Some(Step::MarkDestroyed),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_loading_started_starts_timer() {
        assert_eq!(
            next_step(PhaseKind::ClientLoading, Trigger::Started),
            Some(Step::StartTimer)
        );
    }

    #[test]
    fn test_client_loading_lobby_advances() {
        assert_eq!(
            next_step(PhaseKind::ClientLoading, Trigger::LobbyLoaded),
            Some(Step::Advance(PhaseKind::LobbyLoaded))
        );
    }

    #[test]
    fn test_lobby_lobby_starts_timer() {
        assert_eq!(
            next_step(PhaseKind::LobbyLoaded, Trigger::LobbyLoaded),
            Some(Step::StartTimer)
        );
    }

    #[test]
    fn test_lobby_arena_advances() {
        assert_eq!(
            next_step(PhaseKind::LobbyLoaded, Trigger::ArenaLoaded),
            Some(Step::Advance(PhaseKind::ArenaLoaded))
        );
    }

    #[test]
    fn test_arena_lobby_advances() {
        assert_eq!(
            next_step(PhaseKind::ArenaLoaded, Trigger::LobbyLoaded),
            Some(Step::Advance(PhaseKind::LobbyLoaded))
        );
    }

    #[test]
    fn test_arena_arena_starts_timer() {
        assert_eq!(
            next_step(PhaseKind::ArenaLoaded, Trigger::ArenaLoaded),
            Some(Step::StartTimer)
        );
    }

    #[test]
    fn test_arena_destroyed_is_informational() {
        assert_eq!(
            next_step(PhaseKind::ArenaLoaded, Trigger::VehicleDestroyed),
            Some(Step::MarkDestroyed)
        );
    }

    #[test]
    fn test_illegal_transitions() {
        let illegal = [
            (PhaseKind::ClientLoading, Trigger::ArenaLoaded),
            (PhaseKind::ClientLoading, Trigger::VehicleDestroyed),
            (PhaseKind::LobbyLoaded, Trigger::Started),
            (PhaseKind::LobbyLoaded, Trigger::VehicleDestroyed),
            (PhaseKind::ArenaLoaded, Trigger::Started),
        ];
        for (state, trigger) in illegal {
            assert_eq!(next_step(state, trigger), None, "{state} x {trigger}");
        }
    }

    #[test]
    fn test_base_accepts_nothing() {
        for trigger in Trigger::ALL {
            assert_eq!(next_step(PhaseKind::Base, trigger), None);
        }
    }
}
