//! Aggregate per-player rows for the whole match.
//!
//! The raw tallies (kills/deaths/assists/headshots/rounds) come straight
//! from the decoder. Everything else is derived here by independent
//! passes over the normalized rounds, accumulated in a player-keyed map
//! and merged into the final rows at the end.

use std::collections::{HashMap, HashSet};

use crate::replay::{EventKind, Replay};
use crate::Error;

/// A kill is only traded if the avenging kill lands within this window.
const TRADE_WINDOW_SECONDS: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PlayerStatRow {
    pub player: String,
    /// Empty for players the decoder tallied but who are missing from
    /// the first round's roster.
    pub team: Option<String>,
    pub map: String,
    pub kills: usize,
    pub deaths: usize,
    pub assists: usize,
    pub headshots: usize,
    pub objectives: usize,
    pub trades: usize,
    #[serde(rename = "opening kill")]
    pub opening_kills: usize,
    #[serde(rename = "opening death")]
    pub opening_deaths: usize,
    #[serde(rename = "2ks")]
    pub double_kills: usize,
    #[serde(rename = "3ks")]
    pub triple_kills: usize,
    #[serde(rename = "4ks")]
    pub quad_kills: usize,
    pub aces: usize,
    pub rounds: usize,
    #[serde(rename = "kost rounds")]
    pub kost_rounds: usize,
    pub suicides: usize,
    pub teamkills: usize,
    #[serde(rename = "1vX")]
    pub clutches: usize,
}

#[derive(Debug, Default)]
struct Derived {
    objectives: usize,
    trades: usize,
    opening_kills: usize,
    opening_deaths: usize,
    double_kills: usize,
    triple_kills: usize,
    quad_kills: usize,
    aces: usize,
    kost_rounds: usize,
    suicides: usize,
    teamkills: usize,
    clutches: usize,
}

/// One entry of a round's kill feed, in event order.
#[derive(Debug)]
struct Kill<'r> {
    killer: &'r str,
    victim: &'r str,
    time: f64,
}

#[tracing::instrument(skip(replay))]
pub fn build(replay: &Replay) -> Result<Vec<PlayerStatRow>, Error> {
    let map = match replay.rounds.first() {
        Some(round) => round.map.name.clone(),
        None => return Err(Error::NoRounds),
    };
    let player_teams = replay.player_teams();

    let feeds = kill_feeds(replay);

    let mut derived = HashMap::<&str, Derived>::new();
    count_objectives(replay, &mut derived);
    let trade_log = count_trades(&feeds, &mut derived);
    count_openings(&feeds, &mut derived);
    count_multi_kills(replay, &mut derived);
    count_kost(replay, &trade_log, &mut derived);
    count_suicides(replay, &mut derived);
    count_team_kills(replay, &feeds, &mut derived);
    count_clutches(replay, &mut derived);

    let mut rows = Vec::with_capacity(replay.stats.len());
    for tally in replay.stats.iter() {
        let extra = derived
            .remove(tally.username.as_str())
            .unwrap_or_default();

        rows.push(PlayerStatRow {
            player: tally.username.clone(),
            team: player_teams.get(&tally.username).cloned(),
            map: map.clone(),
            kills: tally.kills,
            deaths: tally.deaths,
            assists: tally.assists,
            headshots: tally.headshots,
            objectives: extra.objectives,
            trades: extra.trades,
            opening_kills: extra.opening_kills,
            opening_deaths: extra.opening_deaths,
            double_kills: extra.double_kills,
            triple_kills: extra.triple_kills,
            quad_kills: extra.quad_kills,
            aces: extra.aces,
            rounds: tally.rounds,
            kost_rounds: extra.kost_rounds,
            suicides: extra.suicides,
            teamkills: extra.teamkills,
            clutches: extra.clutches,
        });
    }

    if !derived.is_empty() {
        // Event usernames without a match tally (spectator kills and the
        // like) have nowhere to go, the decoder's stats array defines the
        // row set.
        tracing::debug!(players = ?derived.keys(), "Derived stats for players without match tallies");
    }

    Ok(rows)
}

/// Per-round kill feeds, index-aligned with the normalized round list.
/// A round without an event stream keeps an empty slot so that round
/// indices in the trade log line up with the rounds they came from.
fn kill_feeds(replay: &Replay) -> Vec<Vec<Kill<'_>>> {
    replay
        .rounds
        .iter()
        .map(|round| {
            round
                .feedback()
                .iter()
                .filter(|event| event.kind() == EventKind::Kill)
                .filter_map(|event| {
                    Some(Kill {
                        killer: &event.username,
                        victim: event.target.as_deref()?,
                        time: event.time_in_seconds,
                    })
                })
                .collect()
        })
        .collect()
}

/// Rounds in which a player completed the objective, at most once per
/// round per player regardless of how often the decoder repeats the
/// completion event.
fn count_objectives<'r>(replay: &'r Replay, derived: &mut HashMap<&'r str, Derived>) {
    let mut credited = HashSet::new();

    for (round_idx, round) in replay.rounds.iter().enumerate() {
        for event in round.feedback() {
            if !event.is_objective() {
                continue;
            }

            if credited.insert((round_idx, event.username.as_str())) {
                derived.entry(&event.username).or_default().objectives += 1;
            }
        }
    }
}

/// Pairwise scan of each round's kill feed: the later killer is credited
/// whenever their victim got a kill of their own inside the trade
/// window. Several trades can land in the same round. Returns the
/// (round, player) log the KOST pass reads from.
fn count_trades<'r>(
    feeds: &[Vec<Kill<'r>>],
    derived: &mut HashMap<&'r str, Derived>,
) -> HashSet<(usize, &'r str)> {
    let mut trade_log = HashSet::new();

    for (round_idx, kills) in feeds.iter().enumerate() {
        for i in 0..kills.len() {
            for j in (i + 1)..kills.len() {
                if kills[i].killer == kills[j].victim
                    && (kills[j].time - kills[i].time).abs() <= TRADE_WINDOW_SECONDS
                {
                    derived.entry(kills[j].killer).or_default().trades += 1;
                    trade_log.insert((round_idx, kills[j].killer));
                }
            }
        }
    }

    trade_log
}

fn count_openings<'r>(feeds: &[Vec<Kill<'r>>], derived: &mut HashMap<&'r str, Derived>) {
    for kills in feeds.iter() {
        if let Some(first) = kills.first() {
            derived.entry(first.killer).or_default().opening_kills += 1;
            derived.entry(first.victim).or_default().opening_deaths += 1;
        }
    }
}

/// Multi-kill tiers come from the round snapshot, not the event stream,
/// and are mutually exclusive: exactly 2, 3, 4 or 5 round kills.
fn count_multi_kills<'r>(replay: &'r Replay, derived: &mut HashMap<&'r str, Derived>) {
    for round in replay.rounds.iter() {
        for stat in round.stats.iter() {
            match stat.kills {
                2 => derived.entry(&stat.username).or_default().double_kills += 1,
                3 => derived.entry(&stat.username).or_default().triple_kills += 1,
                4 => derived.entry(&stat.username).or_default().quad_kills += 1,
                5 => derived.entry(&stat.username).or_default().aces += 1,
                _ => {}
            };
        }
    }
}

/// KOST: survived OR got a kill OR got traded OR completed the
/// objective. The first two arms read the round snapshot, so rounds
/// without an event stream still count through them.
fn count_kost<'r>(
    replay: &'r Replay,
    trade_log: &HashSet<(usize, &'r str)>,
    derived: &mut HashMap<&'r str, Derived>,
) {
    for (round_idx, round) in replay.rounds.iter().enumerate() {
        for tally in replay.stats.iter() {
            let username = tally.username.as_str();

            let snapshot = round.stats.iter().find(|s| s.username == username);
            let survived = snapshot.map(|s| !s.died).unwrap_or(false);
            let got_kill = snapshot.map(|s| s.kills > 0).unwrap_or(false);
            let got_trade = trade_log.contains(&(round_idx, username));
            let did_objective = round
                .feedback()
                .iter()
                .any(|event| event.username == username && event.is_objective());

            if survived || got_kill || got_trade || did_objective {
                derived.entry(username).or_default().kost_rounds += 1;
            }
        }
    }
}

/// Standalone Death events are how the decoder reports self-inflicted
/// deaths, a killed player shows up as the target of a Kill instead.
fn count_suicides<'r>(replay: &'r Replay, derived: &mut HashMap<&'r str, Derived>) {
    for round in replay.rounds.iter() {
        for event in round.feedback() {
            if event.kind() == EventKind::Death {
                derived.entry(&event.username).or_default().suicides += 1;
            }
        }
    }
}

/// Killer and victim resolving to the same team index through the
/// round's roster. Usernames missing from the roster credit nothing.
fn count_team_kills<'r>(
    replay: &'r Replay,
    feeds: &[Vec<Kill<'r>>],
    derived: &mut HashMap<&'r str, Derived>,
) {
    for (round, kills) in replay.rounds.iter().zip(feeds.iter()) {
        for kill in kills.iter() {
            let team_of = |username: &str| {
                round
                    .players
                    .iter()
                    .find(|p| p.username == username)
                    .map(|p| p.team_index)
            };

            if let (Some(killer_team), Some(victim_team)) = (team_of(kill.killer), team_of(kill.victim)) {
                if killer_team == victim_team {
                    derived.entry(kill.killer).or_default().teamkills += 1;
                }
            }
        }
    }
}

/// 1vX: strip every player the snapshot marks as died from both
/// first-round rosters. When exactly one team is down to exactly one
/// survivor and that survivor's team won the round, the survivor gets
/// the clutch. Both teams at one survivor is not a clutch for anyone.
fn count_clutches<'r>(replay: &'r Replay, derived: &mut HashMap<&'r str, Derived>) {
    let first = match replay.rounds.first() {
        Some(round) => round,
        None => return,
    };

    let mut rosters: [Vec<&str>; 2] = [Vec::new(), Vec::new()];
    for entry in first.players.iter() {
        if let Some(roster) = rosters.get_mut(entry.team_index) {
            roster.push(&entry.username);
        }
    }

    for round in replay.rounds.iter() {
        let mut survivors = rosters.clone();
        for stat in round.stats.iter().filter(|s| s.died) {
            for team in survivors.iter_mut() {
                team.retain(|name| *name != stat.username);
            }
        }

        let mut solo_teams = survivors.iter().filter(|team| team.len() == 1);
        let lone = match (solo_teams.next(), solo_teams.next()) {
            (Some(team), None) => team[0],
            _ => continue,
        };

        // The side the survivor played this round, the first-round
        // rosters only identify the team by name.
        let team_index = match round.players.iter().find(|p| p.username == lone) {
            Some(entry) => entry.team_index,
            None => continue,
        };

        if round.teams.get(team_index).map(|t| t.won).unwrap_or(false) {
            derived.entry(lone).or_default().clutches += 1;
        }
    }
}
