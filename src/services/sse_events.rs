//! Typed builders for every event pushed to lobby rooms.

use std::time::SystemTime;

use serde::Serialize;
use tracing::warn;

use crate::{
    dao::models::{CommentEntity, LobbyId, ProductEntity, RoundEntity, RoundId, VoteEntity},
    dto::{
        format_system_time,
        sse::{
            CommentSubmittedEvent, PhaseUpdateEvent, ProductSubmittedEvent, RoundStartedEvent,
            RoundWinnerEvent, ServerEvent, SystemStatus, VoteSubmittedEvent,
        },
    },
    state::{SharedState, state_machine::RoundPhase},
};

/// A lobby opened a round.
pub const EVENT_ROUND_STARTED: &str = "round_started";
/// A round changed phase.
pub const EVENT_PHASE_UPDATE: &str = "phase_update";
/// The round's product was uploaded.
pub const EVENT_PRODUCT_SUBMITTED: &str = "product_submitted";
/// A comment was stored.
pub const EVENT_COMMENT_SUBMITTED: &str = "comment_submitted";
/// A vote was stored.
pub const EVENT_VOTE_SUBMITTED: &str = "vote_submitted";
/// Votes were tallied and a winner awarded.
pub const EVENT_ROUND_WINNER: &str = "round_winner";
/// Degraded mode was entered or left.
pub const EVENT_SYSTEM_STATUS: &str = "system_status";

/// Announce a freshly created round and the deadline of its opening phase.
pub fn broadcast_round_started(state: &SharedState, round: &RoundEntity, phase_ends_at: SystemTime) {
    let payload = RoundStartedEvent {
        lobby_id: round.lobby_id,
        round_id: round.id,
        round_number: round.round_number,
        current_player_id: round.current_player_id,
        phase: round.phase.into(),
        phase_end_time: format_system_time(phase_ends_at),
    };
    send_room_event(state, round.lobby_id, EVENT_ROUND_STARTED, &payload);
}

/// Announce a phase transition. For `finished`, `phase_end_time` is the transition time.
pub fn broadcast_phase_update(
    state: &SharedState,
    lobby_id: LobbyId,
    round_id: RoundId,
    phase: RoundPhase,
    phase_end_time: SystemTime,
) {
    let payload = PhaseUpdateEvent {
        lobby_id,
        round_id,
        phase: phase.into(),
        phase_end_time: format_system_time(phase_end_time),
    };
    send_room_event(state, lobby_id, EVENT_PHASE_UPDATE, &payload);
}

/// Announce the product uploaded for the current round.
pub fn broadcast_product_submitted(state: &SharedState, lobby_id: LobbyId, product: &ProductEntity) {
    let payload = ProductSubmittedEvent {
        lobby_id,
        product: product.into(),
    };
    send_room_event(state, lobby_id, EVENT_PRODUCT_SUBMITTED, &payload);
}

/// Announce a stored comment with its full record.
pub fn broadcast_comment_submitted(state: &SharedState, lobby_id: LobbyId, comment: &CommentEntity) {
    let payload = CommentSubmittedEvent {
        lobby_id,
        comment: comment.into(),
    };
    send_room_event(state, lobby_id, EVENT_COMMENT_SUBMITTED, &payload);
}

/// Announce a stored vote. Votes are never deduplicated.
pub fn broadcast_vote_submitted(
    state: &SharedState,
    lobby_id: LobbyId,
    round_id: RoundId,
    vote: &VoteEntity,
) {
    let payload = VoteSubmittedEvent {
        lobby_id,
        round_id,
        vote: vote.into(),
    };
    send_room_event(state, lobby_id, EVENT_VOTE_SUBMITTED, &payload);
}

/// Announce the author of the winning comment and their new total.
pub fn broadcast_round_winner(state: &SharedState, lobby_id: LobbyId, payload: &RoundWinnerEvent) {
    send_room_event(state, lobby_id, EVENT_ROUND_WINNER, payload);
}

/// Tell every open room that storage went away or came back.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    match ServerEvent::json(
        Some(EVENT_SYSTEM_STATUS.to_string()),
        &SystemStatus { degraded },
    ) {
        Ok(event) => state.rooms().broadcast_all(event),
        Err(err) => warn!(error = %err, "failed to serialize system status payload"),
    }
}

fn send_room_event(state: &SharedState, lobby_id: LobbyId, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.rooms().broadcast(lobby_id, event),
        Err(err) => warn!(lobby_id, event, error = %err, "failed to serialize room SSE payload"),
    }
}
