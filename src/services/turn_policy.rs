//! Rules choosing which lobby member acts (submits the product) in a round.

use std::sync::Arc;

use serde::Deserialize;

use crate::dao::models::{LobbyMemberEntity, UserId};

/// Picks the acting player of a round from the lobby members, given in join order.
pub trait CurrentPlayerPolicy: Send + Sync {
    /// `members` is never empty when called by the round engine.
    fn select(&self, members: &[LobbyMemberEntity], round_number: u32) -> Option<UserId>;
}

/// The first member to join acts in every round.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstJoined;

impl CurrentPlayerPolicy for FirstJoined {
    fn select(&self, members: &[LobbyMemberEntity], _round_number: u32) -> Option<UserId> {
        members.first().map(|member| member.user_id)
    }
}

/// Members take turns in join order: round 1 is the first member, round 2 the second...
#[derive(Debug, Default, Clone, Copy)]
pub struct RoundRobin;

impl CurrentPlayerPolicy for RoundRobin {
    fn select(&self, members: &[LobbyMemberEntity], round_number: u32) -> Option<UserId> {
        if members.is_empty() {
            return None;
        }
        let index = (round_number.saturating_sub(1) as usize) % members.len();
        members.get(index).map(|member| member.user_id)
    }
}

/// Configuration name of a built-in policy.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerPolicyKind {
    /// [`FirstJoined`].
    #[default]
    FirstJoined,
    /// [`RoundRobin`].
    RoundRobin,
}

impl PlayerPolicyKind {
    /// Instantiate the selected policy.
    pub fn build(self) -> Arc<dyn CurrentPlayerPolicy> {
        match self {
            PlayerPolicyKind::FirstJoined => Arc::new(FirstJoined),
            PlayerPolicyKind::RoundRobin => Arc::new(RoundRobin),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::UNIX_EPOCH;

    use super::*;

    fn members(user_ids: &[UserId]) -> Vec<LobbyMemberEntity> {
        user_ids
            .iter()
            .enumerate()
            .map(|(index, user_id)| LobbyMemberEntity {
                id: index as i64 + 1,
                lobby_id: 1,
                user_id: *user_id,
                joined_at: UNIX_EPOCH,
            })
            .collect()
    }

    #[test]
    fn first_joined_always_picks_the_earliest_member() {
        let members = members(&[40, 10, 30]);
        assert_eq!(FirstJoined.select(&members, 1), Some(40));
        assert_eq!(FirstJoined.select(&members, 5), Some(40));
    }

    #[test]
    fn round_robin_cycles_in_join_order() {
        let members = members(&[40, 10, 30]);
        let picks: Vec<_> = (1..=4)
            .map(|round| RoundRobin.select(&members, round))
            .collect();
        assert_eq!(picks, vec![Some(40), Some(10), Some(30), Some(40)]);
    }

    #[test]
    fn no_members_means_no_player() {
        assert_eq!(FirstJoined.select(&[], 1), None);
        assert_eq!(RoundRobin.select(&[], 1), None);
    }
}
