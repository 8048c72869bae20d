//! Request and response bodies of the round endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::{
        CommentEntity, CommentId, LobbyId, ProductEntity, ProductId, RoundEntity, RoundId,
        UserId, VoteEntity, VoteId,
    },
    dto::{format_system_time, phase::VisibleRoundPhase, validation::validate_not_blank},
    state::round::RuntimeRoundState,
};

/// Longest comment accepted, in characters.
pub const MAX_COMMENT_LENGTH: usize = 500;

/// Product upload sent by the acting player during `product_submission`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmitProductRequest {
    /// Player uploading the product.
    pub uploader_id: UserId,
    /// Shop page of the product.
    #[serde(default)]
    #[validate(url)]
    pub link: Option<String>,
    /// Picture shown to the other players.
    #[serde(default)]
    #[validate(url)]
    pub image_url: Option<String>,
}

/// Comment about the product of a round.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmitCommentRequest {
    /// Product being commented on; must belong to the round.
    pub product_id: ProductId,
    /// Player writing the comment.
    pub author_id: UserId,
    /// Comment text, at most [`MAX_COMMENT_LENGTH`] characters and never blank.
    #[validate(
        length(min = 1, max = 500),
        custom(function = validate_not_blank)
    )]
    pub content: String,
}

/// Vote for a comment.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmitVoteRequest {
    /// Player casting the vote.
    pub voter_id: UserId,
}

/// Durable view of a round, used by the history endpoint and after `start_round`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoundSummary {
    /// Round identifier.
    pub id: RoundId,
    /// Lobby running the round.
    pub lobby_id: LobbyId,
    /// Sequential number within the lobby, starting at 1.
    pub round_number: u32,
    /// Last phase known for the round.
    pub phase: VisibleRoundPhase,
    /// Player expected to upload the product.
    pub current_player_id: Option<UserId>,
    /// Product uploaded for the round, if any.
    pub product_id: Option<ProductId>,
    /// RFC 3339 timestamp.
    pub start_time: String,
    /// RFC 3339 timestamp, set once the round is finished.
    pub end_time: Option<String>,
}

impl From<&RoundEntity> for RoundSummary {
    fn from(round: &RoundEntity) -> Self {
        Self {
            id: round.id,
            lobby_id: round.lobby_id,
            round_number: round.round_number,
            phase: round.phase.into(),
            current_player_id: round.current_player_id,
            product_id: round.product_id,
            start_time: format_system_time(round.start_time),
            end_time: round.end_time.map(format_system_time),
        }
    }
}

/// Current round of a lobby together with its live deadline.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoundSnapshot {
    /// Durable record of the round.
    pub round: RoundSummary,
    /// Whether a phase deadline is running for this round on this server.
    pub live: bool,
    /// Deadline of the live phase; absent once the round is finished or not running here.
    pub phase_end_time: Option<String>,
}

impl RoundSnapshot {
    /// Merge the durable round with the runtime state when it describes the same round.
    pub fn new(round: &RoundEntity, runtime: Option<RuntimeRoundState>) -> Self {
        let mut summary = RoundSummary::from(round);
        match runtime.filter(|runtime| runtime.round_id == round.id) {
            Some(runtime) => {
                summary.phase = runtime.phase.into();
                Self {
                    round: summary,
                    live: true,
                    phase_end_time: Some(format_system_time(runtime.phase_ends_at)),
                }
            }
            None => Self {
                round: summary,
                live: false,
                phase_end_time: None,
            },
        }
    }
}

/// Product as shown to lobby members.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductSummary {
    /// Product identifier.
    pub id: ProductId,
    /// Round the product was uploaded for.
    pub round_id: RoundId,
    /// Player who uploaded it.
    pub uploader_id: UserId,
    /// Shop page of the product.
    pub link: Option<String>,
    /// Picture of the product.
    pub image_url: Option<String>,
    /// RFC 3339 upload time.
    pub uploaded_at: String,
}

impl From<&ProductEntity> for ProductSummary {
    fn from(product: &ProductEntity) -> Self {
        Self {
            id: product.id,
            round_id: product.round_id,
            uploader_id: product.uploader_id,
            link: product.link.clone(),
            image_url: product.image_url.clone(),
            uploaded_at: format_system_time(product.uploaded_at),
        }
    }
}

/// Comment as shown to lobby members.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CommentSummary {
    /// Comment identifier, also its order within the round.
    pub id: CommentId,
    /// Round the comment belongs to.
    pub round_id: RoundId,
    /// Product the comment is about.
    pub product_id: ProductId,
    /// Player who wrote it.
    pub author_id: UserId,
    /// Comment text.
    pub content: String,
    /// RFC 3339 creation time.
    pub created_at: String,
}

impl From<&CommentEntity> for CommentSummary {
    fn from(comment: &CommentEntity) -> Self {
        Self {
            id: comment.id,
            round_id: comment.round_id,
            product_id: comment.product_id,
            author_id: comment.author_id,
            content: comment.content.clone(),
            created_at: format_system_time(comment.created_at),
        }
    }
}

/// Vote as shown to lobby members.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VoteSummary {
    /// Vote identifier.
    pub id: VoteId,
    /// Comment receiving the vote.
    pub comment_id: CommentId,
    /// Player who voted.
    pub voter_id: UserId,
    /// RFC 3339 time of the vote.
    pub voted_at: String,
}

impl From<&VoteEntity> for VoteSummary {
    fn from(vote: &VoteEntity) -> Self {
        Self {
            id: vote.id,
            comment_id: vote.comment_id,
            voter_id: vote.voter_id,
            voted_at: format_system_time(vote.voted_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use super::*;
    use crate::state::state_machine::RoundPhase;

    fn round(phase: RoundPhase) -> RoundEntity {
        RoundEntity {
            id: 7,
            lobby_id: 1,
            round_number: 2,
            product_id: None,
            start_time: UNIX_EPOCH,
            end_time: None,
            phase,
            current_player_id: Some(3),
        }
    }

    #[test]
    fn comment_content_must_not_be_blank_or_too_long() {
        let blank = SubmitCommentRequest {
            product_id: 1,
            author_id: 1,
            content: "   ".into(),
        };
        assert!(blank.validate().is_err());

        let long = SubmitCommentRequest {
            product_id: 1,
            author_id: 1,
            content: "a".repeat(MAX_COMMENT_LENGTH + 1),
        };
        assert!(long.validate().is_err());

        let fine = SubmitCommentRequest {
            product_id: 1,
            author_id: 1,
            content: "would buy twice".into(),
        };
        assert!(fine.validate().is_ok());
    }

    #[test]
    fn product_link_must_be_a_url() {
        let bad = SubmitProductRequest {
            uploader_id: 1,
            link: Some("not a url".into()),
            image_url: None,
        };
        assert!(bad.validate().is_err());

        let good = SubmitProductRequest {
            uploader_id: 1,
            link: Some("https://shop.example/item/1".into()),
            image_url: None,
        };
        assert!(good.validate().is_ok());
    }

    #[test]
    fn snapshot_prefers_runtime_phase_of_the_same_round() {
        let runtime = RuntimeRoundState {
            round_id: 7,
            phase: RoundPhase::Voting,
            phase_ends_at: UNIX_EPOCH + Duration::from_secs(30),
        };
        let snapshot = RoundSnapshot::new(&round(RoundPhase::Commenting), Some(runtime));
        assert!(snapshot.live);
        assert_eq!(snapshot.round.phase, VisibleRoundPhase::Voting);
        assert_eq!(
            snapshot.phase_end_time.as_deref(),
            Some("1970-01-01T00:00:30Z")
        );
    }

    #[test]
    fn snapshot_ignores_runtime_state_of_another_round() {
        let runtime = RuntimeRoundState {
            round_id: 99,
            phase: RoundPhase::Voting,
            phase_ends_at: UNIX_EPOCH,
        };
        let snapshot = RoundSnapshot::new(&round(RoundPhase::Finished), Some(runtime));
        assert!(!snapshot.live);
        assert_eq!(snapshot.round.phase, VisibleRoundPhase::Finished);
        assert!(snapshot.phase_end_time.is_none());
    }
}
