//! Persistence gateway used by the round engine.

/// Process-local backend.
pub mod memory;
/// MongoDB backend.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use std::time::SystemTime;

use crate::dao::models::{
    CommentEntity, CommentId, LobbyEntity, LobbyId, LobbyMemberEntity, NewComment, NewProduct,
    NewRound, NewVote, ProductEntity, ProductId, RoundEntity, RoundId, UserEntity, UserId,
    VoteEntity,
};
use crate::dao::storage::StorageResult;
use crate::state::state_machine::RoundPhase;
use futures::future::BoxFuture;

/// Abstraction over the persistence layer for players, lobbies, rounds and their content.
///
/// Update operations return `Ok(None)` when the targeted record does not exist.
/// Listing operations return records in ascending id order, which is also their
/// creation order.
pub trait GameStore: Send + Sync {
    /// Register a player with a zero score.
    fn create_user(&self, username: String) -> BoxFuture<'static, StorageResult<UserEntity>>;
    /// Load a player.
    fn get_user(&self, id: UserId) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    /// Add `delta` to a user's score in a single write and return the updated user.
    fn add_user_score(
        &self,
        id: UserId,
        delta: i32,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;

    /// Open a lobby owned by `creator_id`.
    fn create_lobby(
        &self,
        name: String,
        creator_id: UserId,
    ) -> BoxFuture<'static, StorageResult<LobbyEntity>>;
    /// Load a lobby.
    fn get_lobby(&self, id: LobbyId) -> BoxFuture<'static, StorageResult<Option<LobbyEntity>>>;
    /// Add a member to a lobby.
    fn join_lobby(
        &self,
        lobby_id: LobbyId,
        user_id: UserId,
    ) -> BoxFuture<'static, StorageResult<LobbyMemberEntity>>;
    /// Members of a lobby in join order.
    fn list_lobby_members(
        &self,
        lobby_id: LobbyId,
    ) -> BoxFuture<'static, StorageResult<Vec<LobbyMemberEntity>>>;

    /// Persist a round. Fails when the lobby already has that round number.
    fn create_round(&self, round: NewRound) -> BoxFuture<'static, StorageResult<RoundEntity>>;
    /// Load a round.
    fn get_round(&self, id: RoundId) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>>;
    /// Overwrite the persisted phase of a round.
    fn update_round_phase(
        &self,
        id: RoundId,
        phase: RoundPhase,
    ) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>>;
    /// Link the uploaded product to its round.
    fn update_round_product(
        &self,
        id: RoundId,
        product_id: ProductId,
    ) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>>;
    /// Record when a round finished.
    fn update_round_end_time(
        &self,
        id: RoundId,
        end_time: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>>;
    /// Rounds of a lobby ordered by round number.
    fn list_rounds_by_lobby(
        &self,
        lobby_id: LobbyId,
    ) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>>;
    /// Round of the lobby with the greatest round number.
    fn most_recent_round(
        &self,
        lobby_id: LobbyId,
    ) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>>;

    /// Persist an uploaded product.
    fn create_product(&self, product: NewProduct)
    -> BoxFuture<'static, StorageResult<ProductEntity>>;
    /// Load a product.
    fn get_product(
        &self,
        id: ProductId,
    ) -> BoxFuture<'static, StorageResult<Option<ProductEntity>>>;

    /// Persist a comment.
    fn create_comment(&self, comment: NewComment)
    -> BoxFuture<'static, StorageResult<CommentEntity>>;
    /// Load a comment.
    fn get_comment(
        &self,
        id: CommentId,
    ) -> BoxFuture<'static, StorageResult<Option<CommentEntity>>>;
    /// Comments of a round.
    fn list_comments_by_round(
        &self,
        round_id: RoundId,
    ) -> BoxFuture<'static, StorageResult<Vec<CommentEntity>>>;

    /// Persist a vote.
    fn create_vote(&self, vote: NewVote) -> BoxFuture<'static, StorageResult<VoteEntity>>;
    /// Number of votes cast for a comment.
    fn count_votes(&self, comment_id: CommentId) -> BoxFuture<'static, StorageResult<u64>>;

    /// Cheap round trip proving the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
