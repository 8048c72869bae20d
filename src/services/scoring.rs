//! Vote tallying and score award at the end of a round.

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    dao::{
        game_store::GameStore,
        models::{LobbyId, RoundId},
    },
    dto::sse::RoundWinnerEvent,
    error::ServiceError,
    services::sse_events,
    state::SharedState,
};

/// Index of the comment with the strictly greatest vote count.
///
/// Ties keep the earliest entry, so with comments in creation order the first
/// comment reaching the top count wins. `None` only when `counts` is empty.
pub fn select_winner(counts: &[u64]) -> Option<usize> {
    let mut best: Option<(usize, u64)> = None;
    for (index, &count) in counts.iter().enumerate() {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((index, count)),
        }
    }
    best.map(|(index, _)| index)
}

/// Count the votes of a finished round, award the winner and announce them.
///
/// Returns `None` without side effects when nobody commented.
pub async fn tally_round(
    state: &SharedState,
    store: &Arc<dyn GameStore>,
    lobby_id: LobbyId,
    round_id: RoundId,
) -> Result<Option<RoundWinnerEvent>, ServiceError> {
    let mut comments = store.list_comments_by_round(round_id).await?;
    if comments.is_empty() {
        debug!(lobby_id, round_id, "no comments to tally");
        return Ok(None);
    }
    comments.sort_by_key(|comment| comment.id);

    let mut counts = Vec::with_capacity(comments.len());
    for comment in &comments {
        counts.push(store.count_votes(comment.id).await?);
    }

    let Some(winner) = select_winner(&counts).and_then(|index| comments.get(index)) else {
        return Ok(None);
    };
    let (winning_comment_id, author_id) = (winner.id, winner.author_id);

    let score = store
        .add_user_score(author_id, state.config().winner_points)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user {author_id}")))?
        .score;

    info!(
        lobby_id,
        round_id,
        winner_id = author_id,
        winning_comment_id,
        score,
        "round winner decided"
    );

    let event = RoundWinnerEvent {
        lobby_id,
        round_id,
        winner_id: author_id,
        winning_comment_id,
        score,
    };
    sse_events::broadcast_round_winner(state, lobby_id, &event);
    Ok(Some(event))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greatest_count_wins() {
        assert_eq!(select_winner(&[2, 3, 1]), Some(1));
    }

    #[test]
    fn ties_go_to_the_first_comment() {
        assert_eq!(select_winner(&[2, 2]), Some(0));
        assert_eq!(select_winner(&[1, 4, 4, 2]), Some(1));
    }

    #[test]
    fn no_votes_at_all_still_names_the_first_comment() {
        assert_eq!(select_winner(&[0, 0, 0]), Some(0));
    }

    #[test]
    fn no_comments_no_winner() {
        assert_eq!(select_winner(&[]), None);
    }
}
