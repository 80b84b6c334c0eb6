//! Model for the document emitted by the external replay decoder.
//!
//! The decoder hands over one JSON document per match, with a `rounds`
//! array and a flat `stats` array of per-player match tallies. This
//! module only normalizes that document, the derived metrics live in
//! [`crate::mapstats`] and [`crate::playerstats`].

use std::collections::HashMap;

use crate::Error;

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct Replay {
    pub rounds: Vec<Round>,
    pub stats: Vec<MatchStat>,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub round_number: usize,
    pub map: MapInfo,
    pub teams: Vec<Team>,
    pub site: Option<String>,
    pub match_feedback: Option<Vec<MatchEvent>>,
    pub players: Vec<RosterEntry>,
    pub stats: Vec<RoundStat>,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct MapInfo {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct Team {
    pub name: String,
    pub score: usize,
    pub role: Role,
    pub won: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub enum Role {
    Attack,
    Defend,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub username: String,
    pub team_index: usize,
}

/// Per-round per-player snapshot, taken straight from the decoder's
/// round-level stats block.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct RoundStat {
    pub username: String,
    pub kills: usize,
    pub died: bool,
}

/// Per-player tallies for the whole match, supplied by the decoder.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct MatchStat {
    pub username: String,
    pub kills: usize,
    pub deaths: usize,
    pub assists: usize,
    pub headshots: usize,
    pub rounds: usize,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub username: String,
    pub target: Option<String>,
    pub time_in_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct EventType {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Kill,
    Death,
    DefuserPlantComplete,
    DefuserDisableComplete,
    /// The decoder emits more event types than we model (pings,
    /// operator swaps, ...). They are ignored, not rejected.
    Other,
}

impl MatchEvent {
    pub fn kind(&self) -> EventKind {
        match self.event_type.name.as_str() {
            "Kill" => EventKind::Kill,
            "Death" => EventKind::Death,
            "DefuserPlantComplete" => EventKind::DefuserPlantComplete,
            "DefuserDisableComplete" => EventKind::DefuserDisableComplete,
            _ => EventKind::Other,
        }
    }

    /// Plant or disable, either one physically ends the round objective.
    pub fn is_objective(&self) -> bool {
        matches!(
            self.kind(),
            EventKind::DefuserPlantComplete | EventKind::DefuserDisableComplete
        )
    }
}

impl Round {
    /// The event stream, with a null `matchFeedback` flattened to empty.
    /// Callers that need to distinguish null from empty (map stats skip
    /// null-feedback rounds entirely) read the field directly.
    pub fn feedback(&self) -> &[MatchEvent] {
        self.match_feedback.as_deref().unwrap_or(&[])
    }

    pub fn winner(&self) -> Option<&Team> {
        let mut winners = self.teams.iter().filter(|t| t.won);
        match (winners.next(), winners.next()) {
            (Some(team), None) => Some(team),
            _ => None,
        }
    }
}

impl Replay {
    /// Flat player -> team-name mapping, read from the first round only.
    /// Sides rotate between rounds but the roster-to-team assignment is
    /// fixed for the whole match.
    pub fn player_teams(&self) -> HashMap<String, String> {
        let mut mapping = HashMap::new();

        if let Some(first) = self.rounds.first() {
            for entry in first.players.iter() {
                if let Some(team) = first.teams.get(entry.team_index) {
                    mapping.insert(entry.username.clone(), team.name.clone());
                }
            }
        }

        mapping
    }
}

/// Deserializes and normalizes one decoder document.
///
/// Rounds come back sorted by ascending combined team score, which
/// recovers chronological order when the decoder emits them unordered:
/// win totals only ever grow. The sort is stable, ties keep input order.
pub fn parse(buf: &[u8]) -> Result<Replay, Error> {
    let mut replay: Replay = serde_json::from_slice(buf)?;

    if replay.rounds.is_empty() {
        return Err(Error::NoRounds);
    }

    for round in replay.rounds.iter() {
        if round.teams.len() != 2 {
            return Err(Error::TeamCount {
                round: round.round_number,
                count: round.teams.len(),
            });
        }

        let winners = round.teams.iter().filter(|t| t.won).count();
        if winners != 1 {
            return Err(Error::AmbiguousWinner {
                round: round.round_number,
                winners,
            });
        }

        for entry in round.players.iter() {
            if entry.team_index >= round.teams.len() {
                return Err(Error::TeamIndexOutOfRange {
                    round: round.round_number,
                    username: entry.username.clone(),
                    team_index: entry.team_index,
                });
            }
        }
    }

    replay
        .rounds
        .sort_by_key(|round| round.teams[0].score + round.teams[1].score);

    Ok(replay)
}
