//! Payloads pushed to lobby rooms over server-sent events.

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dao::models::{CommentId, LobbyId, RoundId, UserId},
    dto::{
        phase::VisibleRoundPhase,
        round::{CommentSummary, ProductSummary, VoteSummary},
    },
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    /// SSE `event:` name; `None` sends an unnamed message.
    pub event: Option<String>,
    /// Serialised JSON payload.
    pub data: String,
}

impl ServerEvent {
    /// Build an event from an already serialised payload.
    pub fn new<E>(event: E, data: impl Into<String>) -> Self
    where
        E: Into<Option<String>>,
    {
        Self {
            event: event.into(),
            data: data.into(),
        }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it joins a lobby room.
pub struct Handshake {
    /// Lobby whose room was joined.
    pub lobby_id: LobbyId,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    /// True while no storage backend is reachable.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a lobby starts a new round.
pub struct RoundStartedEvent {
    /// Lobby starting the round.
    pub lobby_id: LobbyId,
    /// New round.
    pub round_id: RoundId,
    /// Sequential number within the lobby.
    pub round_number: u32,
    /// Player expected to upload the product.
    pub current_player_id: Option<UserId>,
    /// Opening phase, always `product_submission`.
    pub phase: VisibleRoundPhase,
    /// RFC 3339 deadline of the opening phase.
    pub phase_end_time: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast on every phase transition.
pub struct PhaseUpdateEvent {
    /// Lobby running the round.
    pub lobby_id: LobbyId,
    /// Round that changed phase.
    pub round_id: RoundId,
    /// Phase just entered.
    pub phase: VisibleRoundPhase,
    /// RFC 3339 deadline of the new phase; the transition time for `finished`.
    pub phase_end_time: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the acting player uploaded the round's product.
pub struct ProductSubmittedEvent {
    /// Lobby running the round.
    pub lobby_id: LobbyId,
    /// Stored product.
    pub product: ProductSummary,
}

/// Broadcast for every accepted comment.
#[derive(Debug, Serialize, ToSchema)]
pub struct CommentSubmittedEvent {
    /// Lobby running the round.
    pub lobby_id: LobbyId,
    /// Stored comment.
    pub comment: CommentSummary,
}

/// Broadcast for every accepted vote.
#[derive(Debug, Serialize, ToSchema)]
pub struct VoteSubmittedEvent {
    /// Lobby running the round.
    pub lobby_id: LobbyId,
    /// Round of the voted comment.
    pub round_id: RoundId,
    /// Stored vote.
    pub vote: VoteSummary,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast once votes are tallied, before the `finished` phase update.
pub struct RoundWinnerEvent {
    /// Lobby running the round.
    pub lobby_id: LobbyId,
    /// Finished round.
    pub round_id: RoundId,
    /// Author of the winning comment.
    pub winner_id: UserId,
    /// Comment with the most votes.
    pub winning_comment_id: CommentId,
    /// Winner's total score after the award.
    pub score: i32,
}
