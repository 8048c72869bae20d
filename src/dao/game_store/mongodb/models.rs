use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

use crate::{
    dao::models::{
        CommentEntity, LobbyEntity, LobbyMemberEntity, ProductEntity, RoundEntity, UserEntity,
        VoteEntity,
    },
    state::state_machine::RoundPhase,
};

/// Per-collection sequence used to hand out integer ids.
#[derive(Debug, Deserialize)]
pub struct CounterDocument {
    pub seq: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoUserDocument {
    #[serde(rename = "_id")]
    id: i64,
    username: String,
    score: i32,
    created_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoLobbyDocument {
    #[serde(rename = "_id")]
    id: i64,
    name: String,
    creator_id: i64,
    is_active: bool,
    created_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMemberDocument {
    #[serde(rename = "_id")]
    id: i64,
    lobby_id: i64,
    user_id: i64,
    joined_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRoundDocument {
    #[serde(rename = "_id")]
    id: i64,
    lobby_id: i64,
    round_number: u32,
    product_id: Option<i64>,
    start_time: DateTime,
    end_time: Option<DateTime>,
    phase: RoundPhase,
    current_player_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoProductDocument {
    #[serde(rename = "_id")]
    id: i64,
    round_id: i64,
    uploader_id: i64,
    link: Option<String>,
    image_url: Option<String>,
    uploaded_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoCommentDocument {
    #[serde(rename = "_id")]
    id: i64,
    round_id: i64,
    product_id: i64,
    author_id: i64,
    content: String,
    created_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoVoteDocument {
    #[serde(rename = "_id")]
    id: i64,
    comment_id: i64,
    voter_id: i64,
    voted_at: DateTime,
}

impl From<UserEntity> for MongoUserDocument {
    fn from(value: UserEntity) -> Self {
        Self {
            id: value.id,
            username: value.username,
            score: value.score,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<MongoUserDocument> for UserEntity {
    fn from(value: MongoUserDocument) -> Self {
        Self {
            id: value.id,
            username: value.username,
            score: value.score,
            created_at: value.created_at.to_system_time(),
        }
    }
}

impl From<LobbyEntity> for MongoLobbyDocument {
    fn from(value: LobbyEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            creator_id: value.creator_id,
            is_active: value.is_active,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<MongoLobbyDocument> for LobbyEntity {
    fn from(value: MongoLobbyDocument) -> Self {
        Self {
            id: value.id,
            name: value.name,
            creator_id: value.creator_id,
            is_active: value.is_active,
            created_at: value.created_at.to_system_time(),
        }
    }
}

impl From<LobbyMemberEntity> for MongoMemberDocument {
    fn from(value: LobbyMemberEntity) -> Self {
        Self {
            id: value.id,
            lobby_id: value.lobby_id,
            user_id: value.user_id,
            joined_at: DateTime::from_system_time(value.joined_at),
        }
    }
}

impl From<MongoMemberDocument> for LobbyMemberEntity {
    fn from(value: MongoMemberDocument) -> Self {
        Self {
            id: value.id,
            lobby_id: value.lobby_id,
            user_id: value.user_id,
            joined_at: value.joined_at.to_system_time(),
        }
    }
}

impl From<RoundEntity> for MongoRoundDocument {
    fn from(value: RoundEntity) -> Self {
        Self {
            id: value.id,
            lobby_id: value.lobby_id,
            round_number: value.round_number,
            product_id: value.product_id,
            start_time: DateTime::from_system_time(value.start_time),
            end_time: value.end_time.map(DateTime::from_system_time),
            phase: value.phase,
            current_player_id: value.current_player_id,
        }
    }
}

impl From<MongoRoundDocument> for RoundEntity {
    fn from(value: MongoRoundDocument) -> Self {
        Self {
            id: value.id,
            lobby_id: value.lobby_id,
            round_number: value.round_number,
            product_id: value.product_id,
            start_time: value.start_time.to_system_time(),
            end_time: value.end_time.map(|end| end.to_system_time()),
            phase: value.phase,
            current_player_id: value.current_player_id,
        }
    }
}

impl From<ProductEntity> for MongoProductDocument {
    fn from(value: ProductEntity) -> Self {
        Self {
            id: value.id,
            round_id: value.round_id,
            uploader_id: value.uploader_id,
            link: value.link,
            image_url: value.image_url,
            uploaded_at: DateTime::from_system_time(value.uploaded_at),
        }
    }
}

impl From<MongoProductDocument> for ProductEntity {
    fn from(value: MongoProductDocument) -> Self {
        Self {
            id: value.id,
            round_id: value.round_id,
            uploader_id: value.uploader_id,
            link: value.link,
            image_url: value.image_url,
            uploaded_at: value.uploaded_at.to_system_time(),
        }
    }
}

impl From<CommentEntity> for MongoCommentDocument {
    fn from(value: CommentEntity) -> Self {
        Self {
            id: value.id,
            round_id: value.round_id,
            product_id: value.product_id,
            author_id: value.author_id,
            content: value.content,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<MongoCommentDocument> for CommentEntity {
    fn from(value: MongoCommentDocument) -> Self {
        Self {
            id: value.id,
            round_id: value.round_id,
            product_id: value.product_id,
            author_id: value.author_id,
            content: value.content,
            created_at: value.created_at.to_system_time(),
        }
    }
}

impl From<VoteEntity> for MongoVoteDocument {
    fn from(value: VoteEntity) -> Self {
        Self {
            id: value.id,
            comment_id: value.comment_id,
            voter_id: value.voter_id,
            voted_at: DateTime::from_system_time(value.voted_at),
        }
    }
}

impl From<MongoVoteDocument> for VoteEntity {
    fn from(value: MongoVoteDocument) -> Self {
        Self {
            id: value.id,
            comment_id: value.comment_id,
            voter_id: value.voter_id,
            voted_at: value.voted_at.to_system_time(),
        }
    }
}
