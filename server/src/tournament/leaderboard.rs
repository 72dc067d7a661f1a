use serde::{Deserialize, Serialize};

use super::state::Participant;
use crate::ids::UserId;

/// One leaderboard row. Points are whole games: win 1, draw 0.5.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub rank: usize,
    pub user_id: UserId,
    pub points: f64,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub games_played: u32,
}

/// Ranks by points, then wins, then join order.
pub(crate) fn rank(participants: &[Participant]) -> Vec<Standing> {
    let mut ordered: Vec<&Participant> = participants.iter().collect();
    ordered.sort_by(|a, b| {
        b.half_points
            .cmp(&a.half_points)
            .then(b.wins.cmp(&a.wins))
            .then(a.joined_seq.cmp(&b.joined_seq))
    });
    ordered
        .into_iter()
        .enumerate()
        .map(|(i, p)| Standing {
            rank: i + 1,
            user_id: p.user.clone(),
            points: f64::from(p.half_points) / 2.0,
            wins: p.wins,
            draws: p.draws,
            losses: p.losses,
            games_played: p.wins + p.draws + p.losses,
        })
        .collect()
}
