//! Ordered phase list with strictly forward progression.

use std::sync::Arc;
use thiserror::Error;

/// Returned when advancing past the last phase.
///
/// The session treats "no question, last phase" as completion and never asks
/// the sequencer to go further, so seeing this is a caller bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("already at the last phase")]
pub struct EndOfPhases;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseSequencer {
    phases: Arc<[String]>,
    index: usize,
}

impl PhaseSequencer {
    /// Start at the first phase. Returns `None` for an empty list.
    #[must_use]
    pub fn new(phases: Arc<[String]>) -> Option<Self> {
        if phases.is_empty() {
            return None;
        }
        Some(Self { phases, index: 0 })
    }

    #[must_use]
    pub fn current_phase(&self) -> &str {
        &self.phases[self.index]
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.index + 1 == self.phases.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.phases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    #[must_use]
    pub fn phases(&self) -> &[String] {
        &self.phases
    }

    /// Move to the next phase and return its name.
    ///
    /// # Errors
    ///
    /// Returns `EndOfPhases` when already at the last phase; the position is
    /// left unchanged.
    pub fn advance(&mut self) -> Result<&str, EndOfPhases> {
        if self.is_last() {
            return Err(EndOfPhases);
        }
        self.index += 1;
        Ok(self.current_phase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequencer(names: &[&str]) -> PhaseSequencer {
        let phases: Vec<String> = names.iter().map(|s| (*s).to_string()).collect();
        PhaseSequencer::new(phases.into()).unwrap()
    }

    #[test]
    fn test_advances_in_order_then_stops() {
        let mut seq = sequencer(&["Strategy", "Data", "People"]);
        assert_eq!(seq.current_phase(), "Strategy");
        assert_eq!(seq.advance(), Ok("Data"));
        assert_eq!(seq.advance(), Ok("People"));
        assert!(seq.is_last());
        assert_eq!(seq.advance(), Err(EndOfPhases));
        assert_eq!(seq.current_phase(), "People");
    }

    #[test]
    fn test_empty_list_rejected() {
        assert!(PhaseSequencer::new(Vec::<String>::new().into()).is_none());
    }

    #[test]
    fn test_single_phase_is_last() {
        let seq = sequencer(&["Only"]);
        assert!(seq.is_last());
    }

    proptest::proptest! {
        #[test]
        fn prop_advance_visits_each_phase_once(count in 1usize..8, extra in 0usize..4) {
            let names: Vec<String> = (0..count).map(|i| format!("P{i}")).collect();
            let mut seq = PhaseSequencer::new(names.clone().into()).unwrap();
            let mut visited = vec![seq.current_phase().to_string()];

            for _ in 0..count + extra {
                let before = seq.index();
                match seq.advance() {
                    Ok(next) => visited.push(next.to_string()),
                    Err(EndOfPhases) => proptest::prop_assert_eq!(seq.index(), before),
                }
                proptest::prop_assert!(seq.index() >= before);
            }

            proptest::prop_assert_eq!(visited, names);
        }
    }
}
