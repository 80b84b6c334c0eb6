#![allow(dead_code)]

use serde_json::{json, Value};

pub fn document(rounds: Vec<Value>, stats: Vec<Value>) -> Vec<u8> {
    serde_json::to_vec(&json!({ "rounds": rounds, "stats": stats })).unwrap()
}

pub fn team(name: &str, score: usize, role: &str, won: bool) -> Value {
    json!({ "name": name, "score": score, "role": role, "won": won })
}

pub fn round(
    number: usize,
    teams: [Value; 2],
    feedback: Option<Vec<Value>>,
    players: Vec<Value>,
    stats: Vec<Value>,
) -> Value {
    json!({
        "roundNumber": number,
        "map": { "name": "Clubhouse" },
        "teams": teams,
        "matchFeedback": feedback,
        "players": players,
        "stats": stats,
    })
}

/// Roster entries for two teams of players, team indices 0 and 1.
pub fn roster(team0: &[&str], team1: &[&str]) -> Vec<Value> {
    team0
        .iter()
        .map(|name| json!({ "username": name, "teamIndex": 0 }))
        .chain(
            team1
                .iter()
                .map(|name| json!({ "username": name, "teamIndex": 1 })),
        )
        .collect()
}

pub fn round_stat(username: &str, kills: usize, died: bool) -> Value {
    json!({ "username": username, "kills": kills, "died": died })
}

pub fn match_stat(
    username: &str,
    kills: usize,
    deaths: usize,
    assists: usize,
    headshots: usize,
    rounds: usize,
) -> Value {
    json!({
        "username": username,
        "kills": kills,
        "deaths": deaths,
        "assists": assists,
        "headshots": headshots,
        "rounds": rounds,
    })
}

/// Zeroed match tallies, for tests that only exercise derived metrics.
pub fn zero_match_stats(usernames: &[&str], rounds: usize) -> Vec<Value> {
    usernames
        .iter()
        .map(|name| match_stat(name, 0, 0, 0, 0, rounds))
        .collect()
}

pub fn kill(killer: &str, victim: &str, time: f64) -> Value {
    json!({
        "type": { "name": "Kill" },
        "username": killer,
        "target": victim,
        "timeInSeconds": time,
    })
}

pub fn event(kind: &str, username: &str, time: f64) -> Value {
    json!({
        "type": { "name": kind },
        "username": username,
        "timeInSeconds": time,
    })
}
