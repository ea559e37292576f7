//! Replays trigger names from a line stream into a controller.

use std::io::BufRead;

use phasetime_core::{PhaseError, SessionController, Trigger};
use tracing::warn;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied: usize,
    pub skipped: usize,
}

/// Fires one trigger per non-blank line. Lines starting with `#` are ignored.
/// Unknown names and illegal transitions are reported and skipped; any other
/// error stops the replay.
pub fn replay(input: impl BufRead, controller: &mut SessionController) -> Result<ReplaySummary, String> {
    let mut summary = ReplaySummary::default();

    for (index, line) in input.lines().enumerate() {
        let line = line.map_err(|err| format!("Failed to read stdin: {}", err))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let trigger = match line.parse::<Trigger>() {
            Ok(trigger) => trigger,
            Err(err) => {
                warn!(line = index + 1, error = %err, "Skipping unknown trigger");
                summary.skipped += 1;
                continue;
            }
        };

        match controller.fire(trigger) {
            Ok(()) => summary.applied += 1,
            Err(err @ PhaseError::BadStateTransition { .. }) => {
                warn!(line = index + 1, error = %err, "Skipping illegal trigger");
                summary.skipped += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use phasetime_core::{JsonFileStore, PhaseKind};
    use tempfile::tempdir;

    #[test]
    fn test_replay_applies_and_skips() {
        let temp = tempdir().unwrap();
        let store = JsonFileStore::at(&temp.path().join("history.json"));
        let mut controller = SessionController::new(Box::new(store));

        let input = "started\n\n# comment\narena\nlobby\ngarage\narena\ndestroyed\n";
        let summary = replay(input.as_bytes(), &mut controller).unwrap();

        assert_eq!(
            summary,
            ReplaySummary {
                applied: 4,
                skipped: 2
            }
        );
        assert_eq!(controller.current_phase(), PhaseKind::ArenaLoaded);
        assert_eq!(controller.pending().len(), 2);
        assert!(controller.destroyed_at().is_some());
    }

    #[test]
    fn test_replay_then_shutdown_commits() {
        let temp = tempdir().unwrap();
        let store = JsonFileStore::at(&temp.path().join("history.json"));
        let mut controller = SessionController::new(Box::new(store));

        replay("lobby\n".as_bytes(), &mut controller).unwrap();
        assert_eq!(controller.shutdown().unwrap(), 2);
        assert_eq!(controller.store().load_all().unwrap().len(), 2);
    }
}
