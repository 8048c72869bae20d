use serde::Serialize;
use utoipa::ToSchema;

use crate::state::state_machine::RoundPhase;

/// Round phase as exposed to clients (REST/SSE).
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleRoundPhase {
    /// The acting player uploads a product.
    ProductSubmission,
    /// Everyone comments on the product.
    Commenting,
    /// Everyone votes for a comment.
    Voting,
    /// Votes are tallied and the round is over.
    Finished,
    /// Stored phase this server does not know how to advance.
    Unknown,
}

impl From<RoundPhase> for VisibleRoundPhase {
    fn from(value: RoundPhase) -> Self {
        match value {
            RoundPhase::ProductSubmission => VisibleRoundPhase::ProductSubmission,
            RoundPhase::Commenting => VisibleRoundPhase::Commenting,
            RoundPhase::Voting => VisibleRoundPhase::Voting,
            RoundPhase::Finished => VisibleRoundPhase::Finished,
            RoundPhase::Unrecognized => VisibleRoundPhase::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialises_with_wire_names() {
        let json = serde_json::to_string(&VisibleRoundPhase::from(RoundPhase::ProductSubmission))
            .unwrap();
        assert_eq!(json, "\"product_submission\"");
    }
}
