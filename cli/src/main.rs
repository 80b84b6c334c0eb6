use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_subscriber::prelude::__tracing_subscriber_SubscriberExt;

static MAP_STATS_FILE: &str = "map_stats.csv";
static PLAYER_STATS_FILE: &str = "player_stats.csv";

#[derive(Debug, Parser)]
#[command(about = "Derive map and player stat tables from decoded match replays")]
struct Args {
    /// Directory tree containing the extracted replay directories, one
    /// per map, each holding the .rec round recordings
    root: PathBuf,
    /// The external replay decoder invoked once per replay directory
    #[arg(long, default_value = "r6-dissect")]
    dissect: PathBuf,
    /// Where map_stats.csv and player_stats.csv are written
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("reading {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("no replay directories under {}", .root.display())]
    NoReplays { root: PathBuf },
    #[error("running decoder on {}: {source}", .dir.display())]
    Decoder {
        dir: PathBuf,
        source: std::io::Error,
    },
    #[error("decoder failed on {}: {stderr}", .dir.display())]
    DecoderExit { dir: PathBuf, stderr: String },
    #[error("deriving stats for {}: {source}", .dir.display())]
    Derive {
        dir: PathBuf,
        source: analysis::Error,
    },
    #[error("writing {}: {source}", .path.display())]
    Csv { path: PathBuf, source: csv::Error },
    #[error("writing {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let registry = tracing_subscriber::Registry::default()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::filter::filter_fn(|meta| {
            meta.target().contains("replay_stats") || meta.target().contains("analysis")
        }));
    tracing::subscriber::set_global_default(registry).unwrap();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Error> {
    let dirs = replay_directories(&args.root)?;
    if dirs.is_empty() {
        return Err(Error::NoReplays { root: args.root });
    }
    tracing::info!(count = dirs.len(), "Found replay directories");

    // One pipeline invocation per directory, concatenated in directory
    // order. Any failure aborts the whole batch, partial tables would be
    // misleading.
    let mut map_stats = Vec::new();
    let mut player_stats = Vec::new();
    for dir in dirs.iter() {
        tracing::info!(dir = %dir.display(), "Decoding replay directory");
        let document = decode(&args.dissect, dir).await?;

        let result = analysis::parse(&document).map_err(|e| Error::Derive {
            dir: dir.clone(),
            source: e,
        })?;

        map_stats.extend(result.map_stats);
        player_stats.extend(result.player_stats);
    }

    write_csv(&args.out_dir.join(MAP_STATS_FILE), &map_stats)?;
    write_csv(&args.out_dir.join(PLAYER_STATS_FILE), &player_stats)?;

    tracing::info!(
        rounds = map_stats.len(),
        players = player_stats.len(),
        "Wrote stat tables"
    );

    Ok(())
}

/// Every directory under `root` that contains at least one `.rec` round
/// recording, sorted for a deterministic batch order.
fn replay_directories(root: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = std::fs::read_dir(&dir).map_err(|e| Error::Walk {
            path: dir.clone(),
            source: e,
        })?;

        let mut has_recording = false;
        for entry in entries {
            let entry = entry.map_err(|e| Error::Walk {
                path: dir.clone(),
                source: e,
            })?;

            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().map(|ext| ext == "rec").unwrap_or(false) {
                has_recording = true;
            }
        }

        if has_recording {
            found.push(dir);
        }
    }

    found.sort();
    Ok(found)
}

/// Runs the external decoder on one replay directory and returns the
/// JSON document it prints to stdout.
async fn decode(dissect: &Path, dir: &Path) -> Result<Vec<u8>, Error> {
    let output = tokio::process::Command::new(dissect)
        .arg(dir)
        .output()
        .await
        .map_err(|e| Error::Decoder {
            dir: dir.to_path_buf(),
            source: e,
        })?;

    if !output.status.success() {
        return Err(Error::DecoderExit {
            dir: dir.to_path_buf(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(output.stdout)
}

fn write_csv<R>(path: &Path, rows: &[R]) -> Result<(), Error>
where
    R: serde::Serialize,
{
    let mut writer = csv::Writer::from_path(path).map_err(|e| Error::Csv {
        path: path.to_path_buf(),
        source: e,
    })?;

    for row in rows.iter() {
        writer.serialize(row).map_err(|e| Error::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    writer.flush().map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use analysis::{MapStatRow, PlayerStatRow};

    fn csv_text<R: serde::Serialize>(rows: &[R]) -> String {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in rows {
            writer.serialize(row).unwrap();
        }
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn map_stats_column_order() {
        let text = csv_text(&[MapStatRow {
            map: "Clubhouse".to_owned(),
            round_number: 1,
            team_1: "RED".to_owned(),
            team_2: "BLU".to_owned(),
            team_1_score: 1,
            team_2_score: 0,
            atk_team: "RED".to_owned(),
            def_team: "BLU".to_owned(),
            site: "N/A".to_owned(),
            winning_team: "RED".to_owned(),
            winning_side: "ATK".to_owned(),
            won_by_objective: false,
        }]);

        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Map,Round Number,Team 1,Team 2,Team 1 Score,Team 2 Score,ATK Team,DEF Team,Site,Winning Team,Winning Side,Won by Objective")
        );
        assert_eq!(
            lines.next(),
            Some("Clubhouse,1,RED,BLU,1,0,RED,BLU,N/A,RED,ATK,false")
        );
    }

    #[test]
    fn player_stats_column_order() {
        let text = csv_text(&[PlayerStatRow {
            player: "alice".to_owned(),
            team: Some("RED".to_owned()),
            map: "Clubhouse".to_owned(),
            kills: 4,
            deaths: 2,
            assists: 1,
            headshots: 3,
            objectives: 1,
            trades: 0,
            opening_kills: 1,
            opening_deaths: 0,
            double_kills: 1,
            triple_kills: 0,
            quad_kills: 0,
            aces: 0,
            rounds: 3,
            kost_rounds: 3,
            suicides: 0,
            teamkills: 0,
            clutches: 1,
        }]);

        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("player,team,map,kills,deaths,assists,headshots,objectives,trades,opening kill,opening death,2ks,3ks,4ks,aces,rounds,kost rounds,suicides,teamkills,1vX")
        );
        assert_eq!(
            lines.next(),
            Some("alice,RED,Clubhouse,4,2,1,3,1,0,1,0,1,0,0,0,3,3,0,0,1")
        );
    }

    #[test]
    fn missing_team_serializes_empty() {
        let text = csv_text(&[PlayerStatRow {
            player: "drifter".to_owned(),
            team: None,
            map: "Clubhouse".to_owned(),
            kills: 0,
            deaths: 1,
            assists: 0,
            headshots: 0,
            objectives: 0,
            trades: 0,
            opening_kills: 0,
            opening_deaths: 0,
            double_kills: 0,
            triple_kills: 0,
            quad_kills: 0,
            aces: 0,
            rounds: 1,
            kost_rounds: 0,
            suicides: 0,
            teamkills: 0,
            clutches: 0,
        }]);

        assert!(text.lines().nth(1).unwrap().starts_with("drifter,,Clubhouse,"));
    }
}
