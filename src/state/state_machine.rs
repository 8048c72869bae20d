use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle phases of a single round, in the only order they can occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    /// The acting player uploads the product everyone will review.
    ProductSubmission,
    /// Players write comments about the product.
    Commenting,
    /// Players vote for their favourite comment.
    Voting,
    /// Votes have been tallied; no further transitions.
    Finished,
    /// Phase value persisted by something other than this engine. Never advanced.
    #[serde(other)]
    Unrecognized,
}

impl RoundPhase {
    /// Stable wire name of the phase.
    pub fn as_str(self) -> &'static str {
        match self {
            RoundPhase::ProductSubmission => "product_submission",
            RoundPhase::Commenting => "commenting",
            RoundPhase::Voting => "voting",
            RoundPhase::Finished => "finished",
            RoundPhase::Unrecognized => "unrecognized",
        }
    }

    /// Whether the phase has no outgoing transition.
    pub fn is_terminal(self) -> bool {
        matches!(self, RoundPhase::Finished)
    }
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a phase has no successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: no phase follows {from}")]
pub struct InvalidTransition {
    /// The phase the round was in when the advance was requested.
    pub from: RoundPhase,
}

/// A validated move from one phase to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseStep {
    /// Phase being left.
    pub from: RoundPhase,
    /// Phase being entered.
    pub to: RoundPhase,
    /// How long `to` lasts before its deadline fires; `None` for the terminal phase.
    pub duration: Option<Duration>,
}

/// Timed round state machine: the fixed transition table plus how long each phase lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseSchedule {
    /// Time given to upload the product.
    pub product_submission: Duration,
    /// Time given to comment.
    pub commenting: Duration,
    /// Time given to vote.
    pub voting: Duration,
}

impl Default for PhaseSchedule {
    fn default() -> Self {
        Self {
            product_submission: Duration::from_secs(60),
            commenting: Duration::from_secs(60),
            voting: Duration::from_secs(30),
        }
    }
}

impl PhaseSchedule {
    /// Duration of a timed phase, `None` when the phase is never timed.
    pub fn duration_of(&self, phase: RoundPhase) -> Option<Duration> {
        match phase {
            RoundPhase::ProductSubmission => Some(self.product_submission),
            RoundPhase::Commenting => Some(self.commenting),
            RoundPhase::Voting => Some(self.voting),
            RoundPhase::Finished | RoundPhase::Unrecognized => None,
        }
    }

    /// Phase every round starts in, with its deadline duration.
    pub fn opening(&self) -> (RoundPhase, Duration) {
        (RoundPhase::ProductSubmission, self.product_submission)
    }

    /// Compute the transition out of `from`. Transitions never depend on round content.
    pub fn advance(&self, from: RoundPhase) -> Result<PhaseStep, InvalidTransition> {
        let to = match from {
            RoundPhase::ProductSubmission => RoundPhase::Commenting,
            RoundPhase::Commenting => RoundPhase::Voting,
            RoundPhase::Voting => RoundPhase::Finished,
            RoundPhase::Finished | RoundPhase::Unrecognized => {
                return Err(InvalidTransition { from });
            }
        };

        Ok(PhaseStep {
            from,
            to,
            duration: self.duration_of(to),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_round_walks_every_phase_once() {
        let schedule = PhaseSchedule::default();
        let (mut phase, _) = schedule.opening();
        let mut visited = vec![phase];

        while let Ok(step) = schedule.advance(phase) {
            assert_eq!(step.from, phase);
            phase = step.to;
            visited.push(phase);
        }

        assert_eq!(
            visited,
            vec![
                RoundPhase::ProductSubmission,
                RoundPhase::Commenting,
                RoundPhase::Voting,
                RoundPhase::Finished,
            ]
        );
    }

    #[test]
    fn default_durations_match_the_game_rules() {
        let schedule = PhaseSchedule::default();
        assert_eq!(schedule.opening().1, Duration::from_secs(60));

        let commenting = schedule.advance(RoundPhase::ProductSubmission).unwrap();
        assert_eq!(commenting.duration, Some(Duration::from_secs(60)));

        let voting = schedule.advance(RoundPhase::Commenting).unwrap();
        assert_eq!(voting.duration, Some(Duration::from_secs(30)));

        let finished = schedule.advance(RoundPhase::Voting).unwrap();
        assert_eq!(finished.to, RoundPhase::Finished);
        assert_eq!(finished.duration, None);
    }

    #[test]
    fn finished_has_no_successor() {
        let err = PhaseSchedule::default()
            .advance(RoundPhase::Finished)
            .unwrap_err();
        assert_eq!(err.from, RoundPhase::Finished);
        assert!(RoundPhase::Finished.is_terminal());
    }

    #[test]
    fn unknown_persisted_phase_is_not_advanced() {
        let phase: RoundPhase = serde_json::from_str("\"lightning_round\"").unwrap();
        assert_eq!(phase, RoundPhase::Unrecognized);
        assert!(PhaseSchedule::default().advance(phase).is_err());
    }

    #[test]
    fn phases_use_snake_case_on_the_wire() {
        let json = serde_json::to_string(&RoundPhase::ProductSubmission).unwrap();
        assert_eq!(json, "\"product_submission\"");
        assert_eq!(RoundPhase::Voting.to_string(), "voting");
    }
}
