use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use pacman_duo::config::MatchConfig;
use pacman_duo::constants::{FRIGHTENED_TICKS, TICK_RATE};
use pacman_duo::engine::{offset, MatchEngine};
use pacman_duo::map::TileMap;
use pacman_duo::pathfinding::find_path;
use pacman_duo::types::{
    Difficulty, Direction, GameMode, GhostMode, MatchOutcome, MatchResult, PlayerSlot, Role, Vec2,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Collectibles considered per decision, nearest first by grid distance.
const AUTOPILOT_CANDIDATES: usize = 6;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    single: bool,
    #[arg(long)]
    duo: bool,
    #[arg(long)]
    difficulty: Option<String>,
    #[arg(long)]
    seed: Option<u32>,
    /// Match length cap in seconds of simulated time.
    #[arg(long, default_value_t = 600)]
    max_seconds: u32,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    difficulty: Difficulty,
    mode: GameMode,
    seed: u32,
    #[serde(rename = "maxTicks")]
    max_ticks: u64,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    difficulty: Difficulty,
    mode: GameMode,
    outcome: Option<MatchOutcome>,
    ticks: u64,
    scores: Vec<i32>,
    #[serde(rename = "collectiblesLeft")]
    collectibles_left: usize,
    #[serde(rename = "pelletsEaten")]
    pellets_eaten: u32,
    deaths: u32,
    rescues: u32,
    #[serde(rename = "frightenedTicks")]
    frightened_ticks: u64,
    result: Option<MatchResult>,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "startedAt")]
    started_at: String,
    #[serde(rename = "finishedAt")]
    finished_at: String,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageTicks")]
    average_ticks: u64,
    #[serde(rename = "outcomeCounts")]
    outcome_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let scenarios = resolve_scenarios(&cli);
    let started_at = Utc::now().to_rfc3339();
    let mut results = Vec::new();
    let mut outcome_counts: BTreeMap<String, usize> = BTreeMap::new();

    for scenario in scenarios {
        info!(
            scenario = %scenario.name,
            seed = scenario.seed,
            difficulty = scenario.difficulty.label(),
            mode = scenario.mode.label(),
            "scenario started"
        );
        let line = run_scenario(&scenario);
        for anomaly in &line.anomalies {
            warn!(scenario = %scenario.name, %anomaly, "anomaly detected");
        }
        *outcome_counts.entry(outcome_key(line.outcome)).or_insert(0) += 1;
        info!(
            scenario = %scenario.name,
            ticks = line.ticks,
            outcome = outcome_key(line.outcome),
            "scenario finished"
        );
        println!("{}", serde_json::to_string(&line)?);
        results.push(line);
    }

    let summary = build_run_summary(started_at, Utc::now().to_rfc3339(), results, outcome_counts);
    if let Some(path) = cli.summary_out.as_ref() {
        write_summary(path, &summary)
            .with_context(|| format!("writing summary to {}", path.display()))?;
    }
    info!(
        scenarios = summary.scenario_count,
        anomalies = summary.anomaly_count,
        average_ticks = summary.average_ticks,
        "run finished"
    );

    if summary.anomaly_count > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn run_scenario(scenario: &Scenario) -> ScenarioResultLine {
    let role = match scenario.mode {
        GameMode::Solo => Role::Solo,
        GameMode::Duo => Role::LocalDuo,
    };
    let mut engine = MatchEngine::new(MatchConfig::new(scenario.difficulty, role, scenario.seed));
    engine.start();

    let mut anomalies = Vec::new();
    let mut seen = HashSet::new();
    let mut deaths = 0;
    let mut rescues = 0;
    let mut frightened_ticks = 0;
    let mut result = None;
    let mut was_alive: Vec<bool> = engine.players().iter().map(|p| p.alive).collect();

    while engine.outcome().is_none() && engine.sim_tick() < scenario.max_ticks {
        for (slot, dir) in autopilot(&engine) {
            engine.set_input(slot, dir);
        }
        engine.step();

        if engine.mode() == GhostMode::Frightened {
            frightened_ticks += 1;
        }
        for (index, player) in engine.players().iter().enumerate() {
            match (was_alive[index], player.alive) {
                (true, false) => deaths += 1,
                (false, true) => rescues += 1,
                _ => {}
            }
            was_alive[index] = player.alive;
        }
        for message in collect_anomalies(&engine) {
            if seen.insert(message.clone()) {
                anomalies.push(message);
            }
        }
        if let Some(delivered) = engine.take_result() {
            result = Some(delivered);
        }
    }

    ScenarioResultLine {
        scenario: scenario.name.clone(),
        seed: scenario.seed,
        difficulty: scenario.difficulty,
        mode: scenario.mode,
        outcome: engine.outcome(),
        ticks: engine.sim_tick(),
        scores: engine.players().iter().map(|p| p.score).collect(),
        collectibles_left: engine.map().collectibles().len(),
        pellets_eaten: engine.capture_snapshot().pellets_eaten,
        deaths,
        rescues,
        frightened_ticks,
        result,
        anomalies,
    }
}

/// Picks a direction for every living player: the first step toward the
/// nearest reachable collectible that does not touch a tangible ghost.
fn autopilot(engine: &MatchEngine) -> Vec<(PlayerSlot, Direction)> {
    let map = engine.map();
    let danger: HashSet<Vec2> = if engine.mode() == GhostMode::Frightened {
        HashSet::new()
    } else {
        engine
            .ghosts()
            .iter()
            .filter(|ghost| ghost.is_tangible())
            .flat_map(|ghost| {
                let cell = ghost.cell();
                std::iter::once(cell).chain(Direction::ALL.into_iter().map(move |dir| offset(cell, dir)))
            })
            .collect()
    };

    engine
        .players()
        .iter()
        .filter(|player| player.alive)
        .filter_map(|player| {
            let from = player.body.cell;
            choose_route(map, from, &danger)
                .or_else(|| escape(map, from, &danger))
                .map(|dir| (player.slot, dir))
        })
        .collect()
}

fn choose_route(map: &TileMap, from: Vec2, danger: &HashSet<Vec2>) -> Option<Direction> {
    let mut targets: Vec<Vec2> = map
        .collectibles()
        .into_iter()
        .map(|item| Vec2::new(item.col, item.row))
        .collect();
    targets.sort_by_key(|cell| (cell.x - from.x).abs() + (cell.y - from.y).abs());

    targets
        .into_iter()
        .take(AUTOPILOT_CANDIDATES)
        .filter_map(|goal| {
            let path = find_path(map, from, goal, false);
            let next = *path.get(1)?;
            if danger.contains(&next) {
                return None;
            }
            Some((path.len(), direction_between(from, next)?))
        })
        .min_by_key(|(len, _)| *len)
        .map(|(_, dir)| dir)
}

fn escape(map: &TileMap, from: Vec2, danger: &HashSet<Vec2>) -> Option<Direction> {
    Direction::ALL.into_iter().find(|dir| {
        let next = offset(from, *dir);
        map.is_passable(next.x, next.y, false) && !danger.contains(&next)
    })
}

fn direction_between(from: Vec2, to: Vec2) -> Option<Direction> {
    Direction::ALL.into_iter().find(|dir| offset(from, *dir) == to)
}

fn collect_anomalies(engine: &MatchEngine) -> Vec<String> {
    let mut anomalies = Vec::new();
    let map = engine.map();
    for player in engine.players() {
        let cell = player.body.cell;
        if !map.in_bounds(cell.x, cell.y) {
            anomalies.push(format!("player {:?} off the grid at {cell:?}", player.slot));
        }
        if player.score < 0 {
            anomalies.push(format!("player {:?} has negative score", player.slot));
        }
    }
    for ghost in engine.ghosts() {
        let cell = ghost.cell();
        if !map.in_bounds(cell.x, cell.y) {
            anomalies.push(format!("ghost {:?} off the grid at {cell:?}", ghost.kind));
        }
    }
    if engine.frightened_ticks() > FRIGHTENED_TICKS {
        anomalies.push(format!(
            "frightened timer above cap: {}",
            engine.frightened_ticks()
        ));
    }
    anomalies
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = cli.seed.unwrap_or_else(rand::random::<u32>);
    let max_ticks = u64::from(cli.max_seconds.max(1)) * u64::from(TICK_RATE);

    if cli.single || cli.duo || cli.difficulty.is_some() {
        let difficulty = cli
            .difficulty
            .as_deref()
            .and_then(Difficulty::parse)
            .unwrap_or(Difficulty::Normal);
        let mode = if cli.duo { GameMode::Duo } else { GameMode::Solo };
        return vec![Scenario {
            name: format!(
                "custom-{}-{}",
                difficulty.label().to_ascii_lowercase(),
                mode.label().to_ascii_lowercase()
            ),
            difficulty,
            mode,
            seed,
            max_ticks,
        }];
    }

    [
        ("easy-solo", Difficulty::Easy, GameMode::Solo),
        ("normal-duo", Difficulty::Normal, GameMode::Duo),
        ("hard-solo", Difficulty::Hard, GameMode::Solo),
        ("insane-duo", Difficulty::Insane, GameMode::Duo),
    ]
    .into_iter()
    .zip(0u32..)
    .map(|((name, difficulty, mode), index)| Scenario {
        name: name.to_string(),
        difficulty,
        mode,
        seed: seed.wrapping_add(index),
        max_ticks,
    })
    .collect()
}

fn outcome_key(outcome: Option<MatchOutcome>) -> String {
    match outcome {
        Some(MatchOutcome::Won) => "won",
        Some(MatchOutcome::Lost) => "lost",
        None => "timeout",
    }
    .to_string()
}

fn build_run_summary(
    started_at: String,
    finished_at: String,
    scenarios: Vec<ScenarioResultLine>,
    outcome_counts: BTreeMap<String, usize>,
) -> RunSummary {
    let scenario_count = scenarios.len();
    let total_ticks: u64 = scenarios.iter().map(|s| s.ticks).sum();
    let average_ticks = if scenario_count == 0 {
        0
    } else {
        total_ticks / scenario_count as u64
    };
    RunSummary {
        started_at,
        finished_at,
        scenario_count,
        anomaly_count: scenarios.iter().map(|s| s.anomalies.len()).sum(),
        average_ticks,
        outcome_counts,
        scenarios,
    }
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let text = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, text)
}
