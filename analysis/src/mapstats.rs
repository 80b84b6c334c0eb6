//! One summary row per played round: teams, sides, score, site, winner.

use crate::replay::{Replay, Role};
use crate::Error;

/// The serde renames pin the public CSV column names and order.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MapStatRow {
    #[serde(rename = "Map")]
    pub map: String,
    #[serde(rename = "Round Number")]
    pub round_number: usize,
    #[serde(rename = "Team 1")]
    pub team_1: String,
    #[serde(rename = "Team 2")]
    pub team_2: String,
    #[serde(rename = "Team 1 Score")]
    pub team_1_score: usize,
    #[serde(rename = "Team 2 Score")]
    pub team_2_score: usize,
    #[serde(rename = "ATK Team")]
    pub atk_team: String,
    #[serde(rename = "DEF Team")]
    pub def_team: String,
    #[serde(rename = "Site")]
    pub site: String,
    #[serde(rename = "Winning Team")]
    pub winning_team: String,
    #[serde(rename = "Winning Side")]
    pub winning_side: String,
    #[serde(rename = "Won by Objective")]
    pub won_by_objective: bool,
}

/// Emits one row per round with a non-null event stream, in the
/// normalized round order. Round numbers are reported 1-based.
#[tracing::instrument(skip(replay))]
pub fn build(replay: &Replay) -> Result<Vec<MapStatRow>, Error> {
    let mut rows = Vec::new();

    for round in replay.rounds.iter() {
        let feedback = match round.match_feedback.as_ref() {
            Some(f) => f,
            None => continue,
        };

        let (team_1, team_2) = match (round.teams.first(), round.teams.get(1)) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                return Err(Error::TeamCount {
                    round: round.round_number,
                    count: round.teams.len(),
                })
            }
        };

        // Exactly one team may carry the won flag. replay::parse already
        // rejected ambiguous rounds, never guess a winner here either.
        let winner = match round.winner() {
            Some(w) => w,
            None => {
                return Err(Error::AmbiguousWinner {
                    round: round.round_number,
                    winners: round.teams.iter().filter(|t| t.won).count(),
                })
            }
        };

        let atk_team = match team_1.role {
            Role::Attack => &team_1.name,
            Role::Defend => &team_2.name,
        };
        let def_team = match team_1.role {
            Role::Defend => &team_1.name,
            Role::Attack => &team_2.name,
        };

        let won_by_objective = feedback.iter().any(|event| event.is_objective());

        rows.push(MapStatRow {
            map: round.map.name.clone(),
            round_number: round.round_number + 1,
            team_1: team_1.name.clone(),
            team_2: team_2.name.clone(),
            team_1_score: team_1.score,
            team_2_score: team_2.score,
            atk_team: atk_team.clone(),
            def_team: def_team.clone(),
            site: round.site.clone().unwrap_or_else(|| "N/A".to_owned()),
            winning_team: winner.name.clone(),
            winning_side: match winner.role {
                Role::Attack => "ATK".to_owned(),
                Role::Defend => "DEF".to_owned(),
            },
            won_by_objective,
        });
    }

    Ok(rows)
}
