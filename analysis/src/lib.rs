pub mod mapstats;
pub mod playerstats;
pub mod replay;

pub use mapstats::MapStatRow;
pub use playerstats::PlayerStatRow;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid replay document: {0}")]
    Document(#[from] serde_json::Error),
    #[error("replay document contains no rounds")]
    NoRounds,
    #[error("round {round} has {count} teams, expected exactly 2")]
    TeamCount { round: usize, count: usize },
    #[error("round {round} has {winners} winning teams, expected exactly 1")]
    AmbiguousWinner { round: usize, winners: usize },
    #[error("round {round}: player {username} references team index {team_index}")]
    TeamIndexOutOfRange {
        round: usize,
        username: String,
        team_index: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchStats {
    pub map_stats: Vec<MapStatRow>,
    pub player_stats: Vec<PlayerStatRow>,
}

/// Runs the full derivation pipeline on one decoded replay document.
///
/// The two tables are derived independently from the same normalized
/// round sequence, so the call is stateless and safe to run for distinct
/// replay directories in parallel.
#[tracing::instrument(skip(buf))]
pub fn parse(buf: &[u8]) -> Result<MatchStats, Error> {
    let replay = replay::parse(buf)?;

    tracing::debug!(
        rounds = replay.rounds.len(),
        players = replay.stats.len(),
        "Normalized replay document"
    );

    let map_stats = mapstats::build(&replay)?;
    let player_stats = playerstats::build(&replay)?;

    Ok(MatchStats {
        map_stats,
        player_stats,
    })
}
