//! Round lifecycle: starting rounds, timed and early phase transitions, submissions.
//!
//! Every mutation of a lobby's round runs under that lobby's gate
//! ([`AppState::lock_lobby`](crate::state::AppState::lock_lobby)); storage writes and
//! broadcasts finish before the gate is released.

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use futures::future::BoxFuture;
use tracing::{debug, info, warn};

use crate::{
    dao::{
        game_store::GameStore,
        models::{
            CommentEntity, CommentId, LobbyId, NewComment, NewProduct, NewRound, NewVote,
            ProductEntity, RoundEntity, RoundId, VoteEntity,
        },
    },
    dto::round::{
        RoundSnapshot, RoundSummary, SubmitCommentRequest, SubmitProductRequest,
        SubmitVoteRequest,
    },
    error::ServiceError,
    services::{scoring, sse_events},
    state::{SharedState, round::RuntimeRoundState, state_machine::RoundPhase},
};

/// What a phase timer was armed for. A deadline only applies while the lobby still
/// runs this round in this phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PhaseToken {
    lobby_id: LobbyId,
    round_id: RoundId,
    phase: RoundPhase,
}

/// Open the next round of a lobby in `product_submission` and start its deadline.
pub async fn start_round(
    state: &SharedState,
    lobby_id: LobbyId,
) -> Result<RoundEntity, ServiceError> {
    let store = state.require_game_store().await?;
    let _gate = state.lock_lobby(lobby_id).await;

    store
        .get_lobby(lobby_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("lobby {lobby_id}")))?;
    let members = store.list_lobby_members(lobby_id).await?;
    if members.is_empty() {
        return Err(ServiceError::EmptyLobby(lobby_id));
    }

    let round_number = store
        .most_recent_round(lobby_id)
        .await?
        .map_or(1, |previous| previous.round_number + 1);
    let current_player_id = state.player_policy().select(&members, round_number);
    let (phase, duration) = state.config().schedule.opening();

    let now = SystemTime::now();
    let round = store
        .create_round(NewRound {
            lobby_id,
            round_number,
            phase,
            current_player_id,
            start_time: now,
        })
        .await?;

    let phase_ends_at = now + duration;
    state.rounds().set(
        lobby_id,
        RuntimeRoundState {
            round_id: round.id,
            phase,
            phase_ends_at,
        },
    );
    sse_events::broadcast_round_started(state, &round, phase_ends_at);
    arm_phase_timer(
        state,
        PhaseToken {
            lobby_id,
            round_id: round.id,
            phase,
        },
        duration,
    );

    info!(
        lobby_id,
        round_id = round.id,
        round_number,
        current_player_id = ?current_player_id,
        "round started"
    );
    Ok(round)
}

/// Move the lobby's most recent round to its next phase.
///
/// Returns `None` when there is nothing to advance (no round, or a finished one).
pub async fn advance_phase(
    state: &SharedState,
    lobby_id: LobbyId,
) -> Result<Option<RoundEntity>, ServiceError> {
    let store = state.require_game_store().await?;
    let _gate = state.lock_lobby(lobby_id).await;
    advance_locked(state, &store, lobby_id).await
}

/// Upload the product of the current round and move straight to `commenting`.
///
/// A round holds at most one product. When an earlier submission stored its product
/// but failed to leave `product_submission`, a repeated call only retries that phase
/// change and returns the stored product.
pub async fn submit_product(
    state: &SharedState,
    lobby_id: LobbyId,
    round_id: RoundId,
    request: SubmitProductRequest,
) -> Result<ProductEntity, ServiceError> {
    let store = state.require_game_store().await?;
    let _gate = state.lock_lobby(lobby_id).await;

    let round = load_round_of_lobby(&store, lobby_id, round_id).await?;
    let is_current = store
        .most_recent_round(lobby_id)
        .await?
        .is_some_and(|current| current.id == round_id);
    if !is_current {
        return Err(ServiceError::InvalidState(format!(
            "round {round_id} is not the current round of lobby {lobby_id}"
        )));
    }
    if round.phase != RoundPhase::ProductSubmission {
        return Err(ServiceError::InvalidState(format!(
            "products are only accepted during product_submission (round {round_id} is in {})",
            round.phase
        )));
    }

    // A product is already linked but the move to commenting did not persist:
    // finish that transition instead of storing a second product.
    if let Some(product_id) = round.product_id {
        let product = store
            .get_product(product_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product {product_id}")))?;
        warn!(lobby_id, round_id, product_id, "retrying pending transition to commenting");
        advance_locked(state, &store, lobby_id).await?;
        return Ok(product);
    }

    let SubmitProductRequest {
        uploader_id,
        link,
        image_url,
    } = request;
    store
        .get_user(uploader_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user {uploader_id}")))?;

    let product = store
        .create_product(NewProduct {
            round_id,
            uploader_id,
            link,
            image_url,
        })
        .await?;
    store
        .update_round_product(round_id, product.id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("round {round_id}")))?;

    info!(lobby_id, round_id, product_id = product.id, "product submitted");
    sse_events::broadcast_product_submitted(state, lobby_id, &product);

    advance_locked(state, &store, lobby_id).await?;
    Ok(product)
}

/// Record a comment on the product of a round. Accepted in every phase.
pub async fn submit_comment(
    state: &SharedState,
    lobby_id: LobbyId,
    round_id: RoundId,
    request: SubmitCommentRequest,
) -> Result<CommentEntity, ServiceError> {
    let store = state.require_game_store().await?;
    let _gate = state.lock_lobby(lobby_id).await;

    load_round_of_lobby(&store, lobby_id, round_id).await?;

    let SubmitCommentRequest {
        product_id,
        author_id,
        content,
    } = request;
    let product = store
        .get_product(product_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("product {product_id}")))?;
    if product.round_id != round_id {
        return Err(ServiceError::InvalidInput(format!(
            "product {product_id} was not submitted in round {round_id}"
        )));
    }
    store
        .get_user(author_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user {author_id}")))?;

    let comment = store
        .create_comment(NewComment {
            round_id,
            product_id,
            author_id,
            content,
        })
        .await?;

    debug!(lobby_id, round_id, comment_id = comment.id, "comment submitted");
    sse_events::broadcast_comment_submitted(state, lobby_id, &comment);
    Ok(comment)
}

/// Record a vote for a comment. Accepted in every phase; repeated votes all count.
pub async fn submit_vote(
    state: &SharedState,
    lobby_id: LobbyId,
    comment_id: CommentId,
    request: SubmitVoteRequest,
) -> Result<VoteEntity, ServiceError> {
    let store = state.require_game_store().await?;
    let _gate = state.lock_lobby(lobby_id).await;

    let comment = store
        .get_comment(comment_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("comment {comment_id}")))?;
    let round = load_round_of_lobby(&store, lobby_id, comment.round_id).await?;

    let voter_id = request.voter_id;
    store
        .get_user(voter_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user {voter_id}")))?;

    let vote = store
        .create_vote(NewVote {
            comment_id,
            voter_id,
        })
        .await?;

    debug!(lobby_id, comment_id, vote_id = vote.id, "vote submitted");
    sse_events::broadcast_vote_submitted(state, lobby_id, round.id, &vote);
    Ok(vote)
}

/// Most recent round of a lobby, with its live deadline when one is running.
pub async fn current_round(
    state: &SharedState,
    lobby_id: LobbyId,
) -> Result<RoundSnapshot, ServiceError> {
    let store = state.require_game_store().await?;
    store
        .get_lobby(lobby_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("lobby {lobby_id}")))?;

    let round = store
        .most_recent_round(lobby_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("lobby {lobby_id} has no rounds")))?;
    Ok(RoundSnapshot::new(&round, state.rounds().get(lobby_id)))
}

/// Every round a lobby played, by round number.
pub async fn round_history(
    state: &SharedState,
    lobby_id: LobbyId,
) -> Result<Vec<RoundSummary>, ServiceError> {
    let store = state.require_game_store().await?;
    store
        .get_lobby(lobby_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("lobby {lobby_id}")))?;

    let rounds = store.list_rounds_by_lobby(lobby_id).await?;
    Ok(rounds.iter().map(RoundSummary::from).collect())
}

async fn load_round_of_lobby(
    store: &Arc<dyn GameStore>,
    lobby_id: LobbyId,
    round_id: RoundId,
) -> Result<RoundEntity, ServiceError> {
    let round = store
        .get_round(round_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("round {round_id}")))?;
    if round.lobby_id != lobby_id {
        return Err(ServiceError::InvalidInput(format!(
            "round {round_id} does not belong to lobby {lobby_id}"
        )));
    }
    Ok(round)
}

/// Transition body shared by every trigger. The caller holds the lobby gate.
async fn advance_locked(
    state: &SharedState,
    store: &Arc<dyn GameStore>,
    lobby_id: LobbyId,
) -> Result<Option<RoundEntity>, ServiceError> {
    let Some(round) = store.most_recent_round(lobby_id).await? else {
        debug!(lobby_id, "no round to advance");
        return Ok(None);
    };

    let step = match state.config().schedule.advance(round.phase) {
        Ok(step) => step,
        Err(err) if round.phase.is_terminal() => {
            debug!(lobby_id, round_id = round.id, error = %err, "round already finished");
            return Ok(None);
        }
        Err(err) => {
            warn!(lobby_id, round_id = round.id, error = %err, "round phase cannot advance");
            return Ok(None);
        }
    };

    let updated = store
        .update_round_phase(round.id, step.to)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("round {}", round.id)))?;
    info!(
        lobby_id,
        round_id = round.id,
        from = %step.from,
        to = %step.to,
        "round phase advanced"
    );

    let now = SystemTime::now();
    match step.duration {
        Some(duration) => {
            let phase_ends_at = now + duration;
            state.rounds().set(
                lobby_id,
                RuntimeRoundState {
                    round_id: round.id,
                    phase: step.to,
                    phase_ends_at,
                },
            );
            sse_events::broadcast_phase_update(state, lobby_id, round.id, step.to, phase_ends_at);
            arm_phase_timer(
                state,
                PhaseToken {
                    lobby_id,
                    round_id: round.id,
                    phase: step.to,
                },
                duration,
            );
            Ok(Some(updated))
        }
        None => Ok(Some(finish_round(state, store, updated, now).await)),
    }
}

/// Terminal transition: stop the clock, record the end time and settle the votes.
async fn finish_round(
    state: &SharedState,
    store: &Arc<dyn GameStore>,
    round: RoundEntity,
    now: SystemTime,
) -> RoundEntity {
    let (lobby_id, round_id) = (round.lobby_id, round.id);
    state.timers().disarm(lobby_id);
    state.rounds().remove(lobby_id);

    let round = match store.update_round_end_time(round_id, now).await {
        Ok(Some(updated)) => updated,
        Ok(None) => round,
        Err(err) => {
            warn!(lobby_id, round_id, error = %err, "failed to record round end time");
            round
        }
    };

    if let Err(err) = scoring::tally_round(state, store, lobby_id, round_id).await {
        warn!(lobby_id, round_id, error = %err, "failed to tally round votes");
    }

    sse_events::broadcast_phase_update(state, lobby_id, round_id, round.phase, now);
    round
}

fn arm_phase_timer(state: &SharedState, token: PhaseToken, duration: Duration) {
    let callback_state = Arc::clone(state);
    state.timers().arm(token.lobby_id, duration, move || {
        on_phase_deadline(callback_state, token)
    });
}

/// Deadline callback. Boxed so the recursion through [`advance_locked`] has a nameable type.
fn on_phase_deadline(state: SharedState, token: PhaseToken) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        let PhaseToken {
            lobby_id,
            round_id,
            phase,
        } = token;

        let store = match state.require_game_store().await {
            Ok(store) => store,
            Err(err) => {
                warn!(lobby_id, round_id, phase = %phase, error = %err, "phase deadline dropped");
                return;
            }
        };
        let _gate = state.lock_lobby(lobby_id).await;

        let still_live = state
            .rounds()
            .get(lobby_id)
            .is_some_and(|live| live.is_at(round_id, phase));
        if !still_live {
            debug!(lobby_id, round_id, phase = %phase, "ignoring stale phase deadline");
            return;
        }

        if let Err(err) = advance_locked(&state, &store, lobby_id).await {
            warn!(lobby_id, round_id, phase = %phase, error = %err, "phase deadline transition failed");
        }
    })
}
