//! Storage-agnostic records exchanged with a [`GameStore`](crate::dao::game_store::GameStore).

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::state::state_machine::RoundPhase;

/// Identifier of a registered player.
pub type UserId = i64;
/// Identifier of a lobby.
pub type LobbyId = i64;
/// Identifier of a lobby membership row (ascending ids give the join order).
pub type MemberId = i64;
/// Identifier of a round.
pub type RoundId = i64;
/// Identifier of a submitted product.
pub type ProductId = i64;
/// Identifier of a comment.
pub type CommentId = i64;
/// Identifier of a vote.
pub type VoteId = i64;

/// Registered player and their running score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserEntity {
    /// Store-assigned identifier.
    pub id: UserId,
    /// Display name.
    pub username: String,
    /// Accumulated points across every round won.
    pub score: i32,
    /// Registration time.
    pub created_at: SystemTime,
}

/// Named group of players running a sequence of rounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LobbyEntity {
    /// Store-assigned identifier.
    pub id: LobbyId,
    /// Display name.
    pub name: String,
    /// Player who opened the lobby.
    pub creator_id: UserId,
    /// Cleared when the lobby is closed.
    pub is_active: bool,
    /// Creation time.
    pub created_at: SystemTime,
}

/// Membership of a user in a lobby.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LobbyMemberEntity {
    /// Store-assigned identifier.
    pub id: MemberId,
    /// Lobby joined.
    pub lobby_id: LobbyId,
    /// Player who joined.
    pub user_id: UserId,
    /// Join time.
    pub joined_at: SystemTime,
}

/// Durable mirror of a round and its last persisted phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundEntity {
    /// Store-assigned identifier.
    pub id: RoundId,
    /// Lobby running the round.
    pub lobby_id: LobbyId,
    /// Sequential per lobby, starting at 1.
    pub round_number: u32,
    /// Product uploaded for the round, once there is one.
    pub product_id: Option<ProductId>,
    /// When the round was opened.
    pub start_time: SystemTime,
    /// When the round reached `finished`.
    pub end_time: Option<SystemTime>,
    /// Last persisted phase.
    pub phase: RoundPhase,
    /// Player chosen to upload the product.
    pub current_player_id: Option<UserId>,
}

/// Product submitted by the acting player of a round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductEntity {
    /// Store-assigned identifier.
    pub id: ProductId,
    /// Round the product belongs to.
    pub round_id: RoundId,
    /// Player who uploaded it.
    pub uploader_id: UserId,
    /// Shop page.
    pub link: Option<String>,
    /// Product picture.
    pub image_url: Option<String>,
    /// Upload time.
    pub uploaded_at: SystemTime,
}

/// Comment written about the product of a round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommentEntity {
    /// Store-assigned identifier; ascending ids give the creation order.
    pub id: CommentId,
    /// Round the comment belongs to.
    pub round_id: RoundId,
    /// Product commented on.
    pub product_id: ProductId,
    /// Player who wrote it.
    pub author_id: UserId,
    /// Comment text.
    pub content: String,
    /// Creation time.
    pub created_at: SystemTime,
}

/// Single vote cast for a comment. Nothing prevents a voter from voting twice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteEntity {
    /// Store-assigned identifier.
    pub id: VoteId,
    /// Comment voted for.
    pub comment_id: CommentId,
    /// Player who voted.
    pub voter_id: UserId,
    /// Vote time.
    pub voted_at: SystemTime,
}

/// Fields required to persist a new round; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewRound {
    /// Lobby running the round.
    pub lobby_id: LobbyId,
    /// Next number in the lobby sequence.
    pub round_number: u32,
    /// Opening phase.
    pub phase: RoundPhase,
    /// Player chosen to upload the product.
    pub current_player_id: Option<UserId>,
    /// Opening time.
    pub start_time: SystemTime,
}

/// Fields required to persist a new product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    /// Round the product is uploaded for.
    pub round_id: RoundId,
    /// Uploading player.
    pub uploader_id: UserId,
    /// Shop page.
    pub link: Option<String>,
    /// Product picture.
    pub image_url: Option<String>,
}

/// Fields required to persist a new comment.
#[derive(Debug, Clone)]
pub struct NewComment {
    /// Round of the comment.
    pub round_id: RoundId,
    /// Product commented on.
    pub product_id: ProductId,
    /// Writing player.
    pub author_id: UserId,
    /// Comment text.
    pub content: String,
}

/// Fields required to persist a new vote.
#[derive(Debug, Clone)]
pub struct NewVote {
    /// Comment voted for.
    pub comment_id: CommentId,
    /// Voting player.
    pub voter_id: UserId,
}

impl RoundEntity {
    /// Build the persisted round from its creation payload.
    pub fn from_new(id: RoundId, round: NewRound) -> Self {
        Self {
            id,
            lobby_id: round.lobby_id,
            round_number: round.round_number,
            product_id: None,
            start_time: round.start_time,
            end_time: None,
            phase: round.phase,
            current_player_id: round.current_player_id,
        }
    }
}
