use std::{sync::Arc, time::SystemTime};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{DateTime, Document, doc},
    options::{IndexOptions, ReturnDocument},
};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        CounterDocument, MongoCommentDocument, MongoLobbyDocument, MongoMemberDocument,
        MongoProductDocument, MongoRoundDocument, MongoUserDocument, MongoVoteDocument,
    },
};
use crate::{
    dao::{
        game_store::GameStore,
        models::{
            CommentEntity, CommentId, LobbyEntity, LobbyId, LobbyMemberEntity, NewComment,
            NewProduct, NewRound, NewVote, ProductEntity, ProductId, RoundEntity, RoundId,
            UserEntity, UserId, VoteEntity,
        },
        storage::{StorageError, StorageResult},
    },
    state::state_machine::RoundPhase,
};

const USERS: &str = "users";
const LOBBIES: &str = "lobbies";
const MEMBERS: &str = "lobby_members";
const ROUNDS: &str = "rounds";
const PRODUCTS: &str = "products";
const COMMENTS: &str = "comments";
const VOTES: &str = "votes";
const COUNTERS: &str = "counters";

/// [`GameStore`] backed by one MongoDB collection per record type.
#[derive(Clone)]
pub struct MongoGameStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    _client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard._client = client;
        guard.database = database;
        Ok(())
    }
}

fn gateway_error(operation: &'static str) -> impl FnOnce(MongoDaoError) -> StorageError {
    move |err| StorageError::unavailable(operation, err)
}

impl MongoGameStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState {
                _client: client,
                database,
            }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let indexes: [(&'static str, &'static str, Document, bool); 4] = [
            (
                ROUNDS,
                "round_lobby_number_idx",
                doc! {"lobby_id": 1, "round_number": -1},
                true,
            ),
            (MEMBERS, "member_lobby_idx", doc! {"lobby_id": 1}, false),
            (COMMENTS, "comment_round_idx", doc! {"round_id": 1}, false),
            (VOTES, "vote_comment_idx", doc! {"comment_id": 1}, false),
        ];

        let database = self.database().await;
        for (collection, name, keys, unique) in indexes {
            let model = IndexModel::builder()
                .keys(keys)
                .options(
                    IndexOptions::builder()
                        .name(Some(name.to_owned()))
                        .unique(Some(unique))
                        .build(),
                )
                .build();

            database
                .collection::<Document>(collection)
                .create_index(model)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection,
                    index: name,
                    source,
                })?;
        }

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn collection<D: Send + Sync>(&self, name: &'static str) -> Collection<D> {
        self.database().await.collection::<D>(name)
    }

    /// Atomically bump the counter of `collection` and return the new value.
    async fn next_id(&self, collection: &'static str) -> MongoResult<i64> {
        let counter = self
            .collection::<CounterDocument>(COUNTERS)
            .await
            .find_one_and_update(doc! {"_id": collection}, doc! {"$inc": {"seq": 1_i64}})
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::NextId { collection, source })?;

        counter
            .map(|counter| counter.seq)
            .ok_or(MongoDaoError::CounterMissing { collection })
    }

    async fn insert<D>(&self, collection: &'static str, document: D) -> MongoResult<()>
    where
        D: Serialize + Send + Sync,
    {
        self.collection::<D>(collection)
            .await
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::Insert { collection, source })?;
        Ok(())
    }

    async fn find_by_id<D>(&self, collection: &'static str, id: i64) -> MongoResult<Option<D>>
    where
        D: DeserializeOwned + Send + Sync,
    {
        self.collection::<D>(collection)
            .await
            .find_one(doc! {"_id": id})
            .await
            .map_err(|source| MongoDaoError::Load {
                collection,
                id,
                source,
            })
    }

    async fn find_many<D>(
        &self,
        collection: &'static str,
        filter: Document,
        sort: Document,
    ) -> MongoResult<Vec<D>>
    where
        D: DeserializeOwned + Send + Sync,
    {
        self.collection::<D>(collection)
            .await
            .find(filter)
            .sort(sort)
            .await
            .map_err(|source| MongoDaoError::Query { collection, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Query { collection, source })
    }

    async fn update_by_id<D>(
        &self,
        collection: &'static str,
        id: i64,
        update: Document,
    ) -> MongoResult<Option<D>>
    where
        D: DeserializeOwned + Send + Sync,
    {
        self.collection::<D>(collection)
            .await
            .find_one_and_update(doc! {"_id": id}, update)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::Update {
                collection,
                id,
                source,
            })
    }

    async fn update_round(&self, id: RoundId, set: Document) -> MongoResult<Option<RoundEntity>> {
        let document: Option<MongoRoundDocument> =
            self.update_by_id(ROUNDS, id, doc! {"$set": set}).await?;
        Ok(document.map(Into::into))
    }

    async fn create_user(&self, username: String) -> MongoResult<UserEntity> {
        let user = UserEntity {
            id: self.next_id(USERS).await?,
            username,
            score: 0,
            created_at: SystemTime::now(),
        };
        self.insert(USERS, MongoUserDocument::from(user.clone()))
            .await?;
        Ok(user)
    }

    async fn create_lobby(&self, name: String, creator_id: UserId) -> MongoResult<LobbyEntity> {
        let lobby = LobbyEntity {
            id: self.next_id(LOBBIES).await?,
            name,
            creator_id,
            is_active: true,
            created_at: SystemTime::now(),
        };
        self.insert(LOBBIES, MongoLobbyDocument::from(lobby.clone()))
            .await?;
        Ok(lobby)
    }

    async fn join_lobby(
        &self,
        lobby_id: LobbyId,
        user_id: UserId,
    ) -> MongoResult<LobbyMemberEntity> {
        let member = LobbyMemberEntity {
            id: self.next_id(MEMBERS).await?,
            lobby_id,
            user_id,
            joined_at: SystemTime::now(),
        };
        self.insert(MEMBERS, MongoMemberDocument::from(member.clone()))
            .await?;
        Ok(member)
    }

    async fn create_round(&self, round: NewRound) -> MongoResult<RoundEntity> {
        let entity = RoundEntity::from_new(self.next_id(ROUNDS).await?, round);
        self.insert(ROUNDS, MongoRoundDocument::from(entity.clone()))
            .await?;
        Ok(entity)
    }

    async fn create_product(&self, product: NewProduct) -> MongoResult<ProductEntity> {
        let entity = ProductEntity {
            id: self.next_id(PRODUCTS).await?,
            round_id: product.round_id,
            uploader_id: product.uploader_id,
            link: product.link,
            image_url: product.image_url,
            uploaded_at: SystemTime::now(),
        };
        self.insert(PRODUCTS, MongoProductDocument::from(entity.clone()))
            .await?;
        Ok(entity)
    }

    async fn create_comment(&self, comment: NewComment) -> MongoResult<CommentEntity> {
        let entity = CommentEntity {
            id: self.next_id(COMMENTS).await?,
            round_id: comment.round_id,
            product_id: comment.product_id,
            author_id: comment.author_id,
            content: comment.content,
            created_at: SystemTime::now(),
        };
        self.insert(COMMENTS, MongoCommentDocument::from(entity.clone()))
            .await?;
        Ok(entity)
    }

    async fn create_vote(&self, vote: NewVote) -> MongoResult<VoteEntity> {
        let entity = VoteEntity {
            id: self.next_id(VOTES).await?,
            comment_id: vote.comment_id,
            voter_id: vote.voter_id,
            voted_at: SystemTime::now(),
        };
        self.insert(VOTES, MongoVoteDocument::from(entity.clone()))
            .await?;
        Ok(entity)
    }

    async fn count_votes(&self, comment_id: CommentId) -> MongoResult<u64> {
        self.collection::<MongoVoteDocument>(VOTES)
            .await
            .count_documents(doc! {"comment_id": comment_id})
            .await
            .map_err(|source| MongoDaoError::Query {
                collection: VOTES,
                source,
            })
    }
}

impl GameStore for MongoGameStore {
    fn create_user(&self, username: String) -> BoxFuture<'static, StorageResult<UserEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .create_user(username)
                .await
                .map_err(gateway_error("create_user"))
        })
    }

    fn get_user(&self, id: UserId) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document: Option<MongoUserDocument> = store
                .find_by_id(USERS, id)
                .await
                .map_err(gateway_error("get_user"))?;
            Ok(document.map(Into::into))
        })
    }

    fn add_user_score(
        &self,
        id: UserId,
        delta: i32,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document: Option<MongoUserDocument> = store
                .update_by_id(USERS, id, doc! {"$inc": {"score": delta}})
                .await
                .map_err(gateway_error("add_user_score"))?;
            Ok(document.map(Into::into))
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
                .create_lobby(name, creator_id)
                .await
                .map_err(gateway_error("create_lobby"))
        })
    }

    fn get_lobby(&self, id: LobbyId) -> BoxFuture<'static, StorageResult<Option<LobbyEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document: Option<MongoLobbyDocument> = store
                .find_by_id(LOBBIES, id)
                .await
                .map_err(gateway_error("get_lobby"))?;
            Ok(document.map(Into::into))
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
                .join_lobby(lobby_id, user_id)
                .await
                .map_err(gateway_error("join_lobby"))
        })
    }

    fn list_lobby_members(
        &self,
        lobby_id: LobbyId,
    ) -> BoxFuture<'static, StorageResult<Vec<LobbyMemberEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents: Vec<MongoMemberDocument> = store
                .find_many(MEMBERS, doc! {"lobby_id": lobby_id}, doc! {"_id": 1})
                .await
                .map_err(gateway_error("list_lobby_members"))?;
            Ok(documents.into_iter().map(Into::into).collect())
        })
    }

    fn create_round(&self, round: NewRound) -> BoxFuture<'static, StorageResult<RoundEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .create_round(round)
                .await
                .map_err(gateway_error("create_round"))
        })
    }

    fn get_round(&self, id: RoundId) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document: Option<MongoRoundDocument> = store
                .find_by_id(ROUNDS, id)
                .await
                .map_err(gateway_error("get_round"))?;
            Ok(document.map(Into::into))
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
                .update_round(id, doc! {"phase": phase.as_str()})
                .await
                .map_err(gateway_error("update_round_phase"))
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
                .update_round(id, doc! {"product_id": product_id})
                .await
                .map_err(gateway_error("update_round_product"))
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
                .update_round(id, doc! {"end_time": DateTime::from_system_time(end_time)})
                .await
                .map_err(gateway_error("update_round_end_time"))
        })
    }

    fn list_rounds_by_lobby(
        &self,
        lobby_id: LobbyId,
    ) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents: Vec<MongoRoundDocument> = store
                .find_many(
                    ROUNDS,
                    doc! {"lobby_id": lobby_id},
                    doc! {"round_number": 1},
                )
                .await
                .map_err(gateway_error("list_rounds_by_lobby"))?;
            Ok(documents.into_iter().map(Into::into).collect())
        })
    }

    fn most_recent_round(
        &self,
        lobby_id: LobbyId,
    ) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .collection::<MongoRoundDocument>(ROUNDS)
                .await
                .find_one(doc! {"lobby_id": lobby_id})
                .sort(doc! {"round_number": -1})
                .await
                .map_err(|source| MongoDaoError::Query {
                    collection: ROUNDS,
                    source,
                })
                .map_err(gateway_error("most_recent_round"))?;
            Ok(document.map(Into::into))
        })
    }

    fn create_product(
        &self,
        product: NewProduct,
    ) -> BoxFuture<'static, StorageResult<ProductEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .create_product(product)
                .await
                .map_err(gateway_error("create_product"))
        })
    }

    fn get_product(
        &self,
        id: ProductId,
    ) -> BoxFuture<'static, StorageResult<Option<ProductEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document: Option<MongoProductDocument> = store
                .find_by_id(PRODUCTS, id)
                .await
                .map_err(gateway_error("get_product"))?;
            Ok(document.map(Into::into))
        })
    }

    fn create_comment(
        &self,
        comment: NewComment,
    ) -> BoxFuture<'static, StorageResult<CommentEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .create_comment(comment)
                .await
                .map_err(gateway_error("create_comment"))
        })
    }

    fn get_comment(
        &self,
        id: CommentId,
    ) -> BoxFuture<'static, StorageResult<Option<CommentEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document: Option<MongoCommentDocument> = store
                .find_by_id(COMMENTS, id)
                .await
                .map_err(gateway_error("get_comment"))?;
            Ok(document.map(Into::into))
        })
    }

    fn list_comments_by_round(
        &self,
        round_id: RoundId,
    ) -> BoxFuture<'static, StorageResult<Vec<CommentEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents: Vec<MongoCommentDocument> = store
                .find_many(COMMENTS, doc! {"round_id": round_id}, doc! {"_id": 1})
                .await
                .map_err(gateway_error("list_comments_by_round"))?;
            Ok(documents.into_iter().map(Into::into).collect())
        })
    }

    fn create_vote(&self, vote: NewVote) -> BoxFuture<'static, StorageResult<VoteEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .create_vote(vote)
                .await
                .map_err(gateway_error("create_vote"))
        })
    }

    fn count_votes(&self, comment_id: CommentId) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .count_votes(comment_id)
                .await
                .map_err(gateway_error("count_votes"))
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .inner
                .ping()
                .await
                .map_err(gateway_error("health_check"))
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .inner
                .reconnect()
                .await
                .map_err(gateway_error("try_reconnect"))
        })
    }
}
