//! Process-local [`GameStore`] used when no database is configured and by the test-suite.

use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::SystemTime,
};

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::{
    dao::{
        game_store::GameStore,
        models::{
            CommentEntity, CommentId, LobbyEntity, LobbyId, LobbyMemberEntity, MemberId,
            NewComment, NewProduct, NewRound, NewVote, ProductEntity, ProductId, RoundEntity,
            RoundId, UserEntity, UserId, VoteEntity, VoteId,
        },
        storage::{StorageError, StorageResult},
    },
    state::state_machine::RoundPhase,
};

/// Failures produced by the in-memory backend.
#[derive(Debug, Error)]
pub enum MemoryStoreError {
    /// Set through [`InMemoryGameStore::set_offline`].
    #[error("in-memory store is offline")]
    Offline,
    /// Round numbers are unique per lobby.
    #[error("round {round_number} already exists for lobby {lobby_id}")]
    DuplicateRound {
        /// Lobby already holding the round.
        lobby_id: LobbyId,
        /// Number requested twice.
        round_number: u32,
    },
}

/// Cheaply clonable handle over shared in-memory tables.
#[derive(Clone, Default)]
pub struct InMemoryGameStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    tables: RwLock<Tables>,
    offline: AtomicBool,
}

#[derive(Default)]
struct Tables {
    last_id: i64,
    users: BTreeMap<UserId, UserEntity>,
    lobbies: BTreeMap<LobbyId, LobbyEntity>,
    members: BTreeMap<MemberId, LobbyMemberEntity>,
    rounds: BTreeMap<RoundId, RoundEntity>,
    products: BTreeMap<ProductId, ProductEntity>,
    comments: BTreeMap<CommentId, CommentEntity>,
    votes: BTreeMap<VoteId, VoteEntity>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn update_round(
        &mut self,
        id: RoundId,
        apply: impl FnOnce(&mut RoundEntity),
    ) -> Option<RoundEntity> {
        let round = self.rounds.get_mut(&id)?;
        apply(round);
        Some(round.clone())
    }
}

impl InMemoryGameStore {
    /// Empty, online store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every call fails with [`StorageError::Unavailable`] until reset.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self, operation: &'static str) -> StorageResult<()> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable(operation, MemoryStoreError::Offline));
        }
        Ok(())
    }

    async fn read<T>(
        &self,
        operation: &'static str,
        query: impl FnOnce(&Tables) -> T,
    ) -> StorageResult<T> {
        self.ensure_online(operation)?;
        let tables = self.inner.tables.read().await;
        Ok(query(&tables))
    }

    async fn write<T>(
        &self,
        operation: &'static str,
        mutation: impl FnOnce(&mut Tables) -> T,
    ) -> StorageResult<T> {
        self.ensure_online(operation)?;
        let mut tables = self.inner.tables.write().await;
        Ok(mutation(&mut tables))
    }
}

impl GameStore for InMemoryGameStore {
    fn create_user(&self, username: String) -> BoxFuture<'static, StorageResult<UserEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .write("create_user", |tables| {
                    let user = UserEntity {
                        id: tables.next_id(),
                        username,
                        score: 0,
                        created_at: SystemTime::now(),
                    };
                    tables.users.insert(user.id, user.clone());
                    user
                })
                .await
        })
    }

    fn get_user(&self, id: UserId) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .read("get_user", |tables| tables.users.get(&id).cloned())
                .await
        })
    }

    fn add_user_score(
        &self,
        id: UserId,
        delta: i32,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .write("add_user_score", |tables| {
                    let user = tables.users.get_mut(&id)?;
                    user.score = user.score.saturating_add(delta);
                    Some(user.clone())
                })
                .await
        })
    }

    fn create_lobby(
        &self,
        name: String,
        creator_id: UserId,
    ) -> BoxFuture<'static, StorageResult<LobbyEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .write("create_lobby", |tables| {
                    let lobby = LobbyEntity {
                        id: tables.next_id(),
                        name,
                        creator_id,
                        is_active: true,
                        created_at: SystemTime::now(),
                    };
                    tables.lobbies.insert(lobby.id, lobby.clone());
                    lobby
                })
                .await
        })
    }

    fn get_lobby(&self, id: LobbyId) -> BoxFuture<'static, StorageResult<Option<LobbyEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .read("get_lobby", |tables| tables.lobbies.get(&id).cloned())
                .await
        })
    }

    fn join_lobby(
        &self,
        lobby_id: LobbyId,
        user_id: UserId,
    ) -> BoxFuture<'static, StorageResult<LobbyMemberEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .write("join_lobby", |tables| {
                    let member = LobbyMemberEntity {
                        id: tables.next_id(),
                        lobby_id,
                        user_id,
                        joined_at: SystemTime::now(),
                    };
                    tables.members.insert(member.id, member.clone());
                    member
                })
                .await
        })
    }

    fn list_lobby_members(
        &self,
        lobby_id: LobbyId,
    ) -> BoxFuture<'static, StorageResult<Vec<LobbyMemberEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .read("list_lobby_members", |tables| {
                    tables
                        .members
                        .values()
                        .filter(|member| member.lobby_id == lobby_id)
                        .cloned()
                        .collect()
                })
                .await
        })
    }

    fn create_round(&self, round: NewRound) -> BoxFuture<'static, StorageResult<RoundEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .write("create_round", |tables| {
                    let duplicate = tables.rounds.values().any(|existing| {
                        existing.lobby_id == round.lobby_id
                            && existing.round_number == round.round_number
                    });
                    if duplicate {
                        return Err(StorageError::unavailable(
                            "create_round",
                            MemoryStoreError::DuplicateRound {
                                lobby_id: round.lobby_id,
                                round_number: round.round_number,
                            },
                        ));
                    }

                    let entity = RoundEntity::from_new(tables.next_id(), round);
                    tables.rounds.insert(entity.id, entity.clone());
                    Ok(entity)
                })
                .await?
        })
    }

    fn get_round(&self, id: RoundId) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .read("get_round", |tables| tables.rounds.get(&id).cloned())
                .await
        })
    }

    fn update_round_phase(
        &self,
        id: RoundId,
        phase: RoundPhase,
    ) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .write("update_round_phase", |tables| {
                    tables.update_round(id, |round| round.phase = phase)
                })
                .await
        })
    }

    fn update_round_product(
        &self,
        id: RoundId,
        product_id: ProductId,
    ) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .write("update_round_product", |tables| {
                    tables.update_round(id, |round| round.product_id = Some(product_id))
                })
                .await
        })
    }

    fn update_round_end_time(
        &self,
        id: RoundId,
        end_time: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .write("update_round_end_time", |tables| {
                    tables.update_round(id, |round| round.end_time = Some(end_time))
                })
                .await
        })
    }

    fn list_rounds_by_lobby(
        &self,
        lobby_id: LobbyId,
    ) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .read("list_rounds_by_lobby", |tables| {
                    let mut rounds: Vec<RoundEntity> = tables
                        .rounds
                        .values()
                        .filter(|round| round.lobby_id == lobby_id)
                        .cloned()
                        .collect();
                    rounds.sort_by_key(|round| round.round_number);
                    rounds
                })
                .await
        })
    }

    fn most_recent_round(
        &self,
        lobby_id: LobbyId,
    ) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .read("most_recent_round", |tables| {
                    tables
                        .rounds
                        .values()
                        .filter(|round| round.lobby_id == lobby_id)
                        .max_by_key(|round| round.round_number)
                        .cloned()
                })
                .await
        })
    }

    fn create_product(
        &self,
        product: NewProduct,
    ) -> BoxFuture<'static, StorageResult<ProductEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .write("create_product", |tables| {
                    let entity = ProductEntity {
                        id: tables.next_id(),
                        round_id: product.round_id,
                        uploader_id: product.uploader_id,
                        link: product.link,
                        image_url: product.image_url,
                        uploaded_at: SystemTime::now(),
                    };
                    tables.products.insert(entity.id, entity.clone());
                    entity
                })
                .await
        })
    }

    fn get_product(
        &self,
        id: ProductId,
    ) -> BoxFuture<'static, StorageResult<Option<ProductEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .read("get_product", |tables| tables.products.get(&id).cloned())
                .await
        })
    }

    fn create_comment(
        &self,
        comment: NewComment,
    ) -> BoxFuture<'static, StorageResult<CommentEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .write("create_comment", |tables| {
                    let entity = CommentEntity {
                        id: tables.next_id(),
                        round_id: comment.round_id,
                        product_id: comment.product_id,
                        author_id: comment.author_id,
                        content: comment.content,
                        created_at: SystemTime::now(),
                    };
                    tables.comments.insert(entity.id, entity.clone());
                    entity
                })
                .await
        })
    }

    fn get_comment(
        &self,
        id: CommentId,
    ) -> BoxFuture<'static, StorageResult<Option<CommentEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .read("get_comment", |tables| tables.comments.get(&id).cloned())
                .await
        })
    }

    fn list_comments_by_round(
        &self,
        round_id: RoundId,
    ) -> BoxFuture<'static, StorageResult<Vec<CommentEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .read("list_comments_by_round", |tables| {
                    tables
                        .comments
                        .values()
                        .filter(|comment| comment.round_id == round_id)
                        .cloned()
                        .collect()
                })
                .await
        })
    }

    fn create_vote(&self, vote: NewVote) -> BoxFuture<'static, StorageResult<VoteEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .write("create_vote", |tables| {
                    let entity = VoteEntity {
                        id: tables.next_id(),
                        comment_id: vote.comment_id,
                        voter_id: vote.voter_id,
                        voted_at: SystemTime::now(),
                    };
                    tables.votes.insert(entity.id, entity.clone());
                    entity
                })
                .await
        })
    }

    fn count_votes(&self, comment_id: CommentId) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .read("count_votes", |tables| {
                    tables
                        .votes
                        .values()
                        .filter(|vote| vote.comment_id == comment_id)
                        .count() as u64
                })
                .await
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_online("health_check") })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_online("try_reconnect") })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_round(lobby_id: LobbyId, round_number: u32) -> NewRound {
        NewRound {
            lobby_id,
            round_number,
            phase: RoundPhase::ProductSubmission,
            current_player_id: None,
            start_time: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn most_recent_round_uses_highest_round_number() {
        let store = InMemoryGameStore::new();
        store.create_round(new_round(1, 1)).await.unwrap();
        let second = store.create_round(new_round(1, 2)).await.unwrap();
        store.create_round(new_round(2, 7)).await.unwrap();

        let latest = store.most_recent_round(1).await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);
        assert_eq!(latest.round_number, 2);
        assert!(store.most_recent_round(3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_round_number_is_rejected() {
        let store = InMemoryGameStore::new();
        store.create_round(new_round(1, 1)).await.unwrap();
        let err = store.create_round(new_round(1, 1)).await.unwrap_err();
        assert_eq!(err.operation(), "create_round");
    }

    #[tokio::test]
    async fn members_are_listed_in_join_order() {
        let store = InMemoryGameStore::new();
        let alice = store.create_user("alice".into()).await.unwrap();
        let bob = store.create_user("bob".into()).await.unwrap();
        let lobby = store.create_lobby("den".into(), alice.id).await.unwrap();
        store.join_lobby(lobby.id, bob.id).await.unwrap();
        store.join_lobby(lobby.id, alice.id).await.unwrap();

        let members = store.list_lobby_members(lobby.id).await.unwrap();
        let order: Vec<UserId> = members.iter().map(|member| member.user_id).collect();
        assert_eq!(order, vec![bob.id, alice.id]);
    }

    #[tokio::test]
    async fn votes_are_counted_per_comment_without_uniqueness() {
        let store = InMemoryGameStore::new();
        let comment = store
            .create_comment(NewComment {
                round_id: 1,
                product_id: 1,
                author_id: 1,
                content: "sleek".into(),
            })
            .await
            .unwrap();
        for _ in 0..3 {
            store
                .create_vote(NewVote {
                    comment_id: comment.id,
                    voter_id: 9,
                })
                .await
                .unwrap();
        }

        assert_eq!(store.count_votes(comment.id).await.unwrap(), 3);
        assert_eq!(store.count_votes(comment.id + 1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn offline_store_fails_every_call() {
        let store = InMemoryGameStore::new();
        store.set_offline(true);
        assert!(store.create_user("carol".into()).await.is_err());
        assert!(store.health_check().await.is_err());

        store.set_offline(false);
        assert!(store.create_user("carol".into()).await.is_ok());
        assert!(store.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn score_increments_accumulate() {
        let store = InMemoryGameStore::new();
        let user = store.create_user("dana".into()).await.unwrap();

        let (first, second) = tokio::join!(
            store.add_user_score(user.id, 10),
            store.add_user_score(user.id, 10)
        );
        assert!(first.unwrap().is_some());
        assert!(second.unwrap().is_some());
        assert_eq!(store.get_user(user.id).await.unwrap().unwrap().score, 20);
        assert!(store.add_user_score(user.id + 100, 10).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn updating_a_missing_round_returns_none() {
        let store = InMemoryGameStore::new();
        let updated = store
            .update_round_phase(42, RoundPhase::Commenting)
            .await
            .unwrap();
        assert!(updated.is_none());
    }
}
