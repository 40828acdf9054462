use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cubedash_core::simulation::{forward_reports, render_frame};
use cubedash_core::{
    BodyFrame, CompletionRecord, InputFrame, ObstacleFrame, Rect, RenderSink, SimEvent, Simulation,
    StageColors,
};
use cubedash_sim::{Explorer, Level, LevelError, Run, SimConfig};

#[derive(Parser, Debug)]
#[command(name = "cubedash")]
#[command(about = "Headless cubedash level runner", long_about = None)]
struct Cli {
    /// Simulator config file
    #[arg(long, env = "CUBEDASH_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a level with a scripted press pattern
    Run {
        /// Level JSON file
        level: PathBuf,
        /// Maximum ticks to simulate
        #[arg(short, long, default_value_t = 5000)]
        ticks: u64,
        /// Press pattern, one character per tick, repeated: `1`/`x` pressed,
        /// `0`/`.` released
        #[arg(short, long, default_value = "0")]
        pattern: String,
        /// Write the completion record back into the level file
        #[arg(long)]
        save: bool,
        /// Log collision rects near the body every tick
        #[arg(long)]
        debug_rects: bool,
    },
    /// Advance every press/release history of a level at once
    Explore {
        /// Level JSON file
        level: PathBuf,
        /// Maximum ticks to simulate
        #[arg(short, long, default_value_t = 5000)]
        ticks: u64,
        /// Override the population cap
        #[arg(long)]
        cap: Option<usize>,
        /// Override the eviction seed
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Debug)]
enum RunnerError {
    Level(LevelError),
    Pattern(String),
    Io(String),
}

impl std::fmt::Display for RunnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Level(e) => write!(f, "{e}"),
            Self::Pattern(e) => write!(f, "invalid press pattern: {e}"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for RunnerError {}

impl From<LevelError> for RunnerError {
    fn from(e: LevelError) -> Self {
        Self::Level(e)
    }
}

/// Render sink that logs frames at trace level.
#[derive(Default)]
struct TraceSink {
    frames: u64,
}

impl RenderSink for TraceSink {
    fn frame(
        &mut self,
        tick: u64,
        bodies: &[BodyFrame],
        obstacles: &[ObstacleFrame],
        colors: &StageColors,
    ) {
        self.frames += 1;
        if let Some(body) = bodies.first() {
            tracing::trace!(
                tick,
                bodies = bodies.len(),
                x = body.x,
                y = body.y,
                rotation = body.rotation,
                mode = body.mode.as_str(),
                active = obstacles.iter().filter(|o| o.activated || o.collected).count(),
                bg = ?colors.bg,
                stage = ?colors.stage,
                "Frame"
            );
        }
    }

    fn debug_rects(&mut self, rects: &[Rect]) {
        tracing::trace!(count = rects.len(), "Debug rects");
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    if let Err(e) = execute(cli) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

fn execute(cli: Cli) -> Result<(), RunnerError> {
    let config = match &cli.config {
        Some(path) => SimConfig::load_from(&path.to_string_lossy()),
        None => SimConfig::load(),
    };

    match cli.command {
        Commands::Run {
            level,
            ticks,
            pattern,
            save,
            debug_rects,
        } => {
            let presses = parse_pattern(&pattern)?;
            play(&level, config, ticks, &presses, save, debug_rects)
        },
        Commands::Explore {
            level,
            ticks,
            cap,
            seed,
        } => {
            let mut config = config;
            if let Some(cap) = cap {
                config.explorer.population_cap = cap;
            }
            if let Some(seed) = seed {
                config.explorer.seed = seed;
            }
            explore(&level, config, ticks)
        },
    }
}

fn load_level(path: &Path) -> Result<Level, RunnerError> {
    Ok(Level::load(&path.to_string_lossy())?)
}

/// Parse a press pattern into one bool per tick.
fn parse_pattern(pattern: &str) -> Result<Vec<bool>, RunnerError> {
    let presses = pattern
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '1' | 'x' | 'X' => Ok(true),
            '0' | '.' => Ok(false),
            other => Err(RunnerError::Pattern(format!("unexpected character {other:?}"))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    if presses.is_empty() {
        return Err(RunnerError::Pattern("pattern is empty".to_string()));
    }
    Ok(presses)
}

fn play(
    path: &Path,
    config: SimConfig,
    ticks: u64,
    presses: &[bool],
    save: bool,
    debug_rects: bool,
) -> Result<(), RunnerError> {
    let level = load_level(path)?;
    let mut record: CompletionRecord = level.completion.clone();
    let mut run = Run::new(level, config);
    let mut sink = TraceSink::default();

    for (tick, pressing) in (0..ticks).zip(presses.iter().cycle()) {
        let events = run.tick(&InputFrame::RELEASED.with_pressing(*pressing));
        forward_reports(&events, &mut record);
        log_events(tick + 1, &events);
        render_frame(&run, &mut sink);
        if debug_rects {
            sink.debug_rects(&run.debug_rects());
        }
        if run.is_complete() {
            break;
        }
    }

    tracing::info!(
        level = %run.level().name,
        ticks = run.tick_count(),
        attempts = run.attempt(),
        best = record.percentage,
        complete = run.is_complete(),
        "Run finished"
    );

    if save {
        let mut level = run.level().clone();
        level.completion = record;
        let json = level.to_json()?;
        std::fs::write(path, json).map_err(|e| RunnerError::Io(format!("{}: {e}", path.display())))?;
        tracing::info!("Saved completion record to {}", path.display());
    }
    Ok(())
}

fn explore(path: &Path, config: SimConfig, ticks: u64) -> Result<(), RunnerError> {
    let level = load_level(path)?;
    let mut explorer = Explorer::new(level, config);
    let mut peak = explorer.population();
    let mut evicted = 0usize;
    let mut died = 0usize;

    for _ in 0..ticks {
        let events = explorer.tick(&InputFrame::RELEASED);
        for event in &events {
            match event {
                SimEvent::BranchDied { .. } => died += 1,
                SimEvent::BranchEvicted { .. } => evicted += 1,
                _ => {},
            }
        }
        log_events(explorer.tick_count(), &events);
        peak = peak.max(explorer.population());
        if explorer.is_complete() {
            break;
        }
    }

    tracing::info!(
        level = %explorer.level().name,
        ticks = explorer.tick_count(),
        population = explorer.population(),
        peak,
        died,
        evicted,
        won_at = ?explorer.won_at(),
        "Exploration finished"
    );
    Ok(())
}

fn log_events(tick: u64, events: &[SimEvent]) {
    for event in events {
        match event {
            SimEvent::Died { percentage, .. } => {
                tracing::info!(tick, percentage, "Died");
            },
            SimEvent::Won { percentage } => tracing::info!(tick, percentage, "Won"),
            SimEvent::ExplorationWon { tick } => tracing::info!(tick, "First branch won"),
            SimEvent::CoinCollected { index } => tracing::info!(tick, index, "Coin collected"),
            other => tracing::debug!(tick, ?other, "Event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_accepts_both_spellings() {
        assert_eq!(parse_pattern("10x.").unwrap(), vec![true, false, true, false]);
        assert_eq!(parse_pattern("1 1 0").unwrap(), vec![true, true, false]);
    }

    #[test]
    fn pattern_rejects_garbage() {
        assert!(matches!(parse_pattern("10z"), Err(RunnerError::Pattern(_))));
        assert!(matches!(parse_pattern("   "), Err(RunnerError::Pattern(_))));
    }

    #[test]
    fn cli_parses_run() {
        let cli = Cli::try_parse_from(["cubedash", "run", "level.json", "-t", "100", "-p", "0011", "--save"])
            .unwrap();
        match cli.command {
            Commands::Run {
                level,
                ticks,
                pattern,
                save,
                debug_rects,
            } => {
                assert_eq!(level, PathBuf::from("level.json"));
                assert_eq!(ticks, 100);
                assert_eq!(pattern, "0011");
                assert!(save);
                assert!(!debug_rects);
            },
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn cli_parses_explore_overrides() {
        let cli = Cli::try_parse_from(["cubedash", "explore", "level.json", "--cap", "64", "--seed", "7"])
            .unwrap();
        match cli.command {
            Commands::Explore { cap, seed, .. } => {
                assert_eq!(cap, Some(64));
                assert_eq!(seed, Some(7));
            },
            other => panic!("expected explore, got {other:?}"),
        }
    }

    #[test]
    fn missing_level_is_io_error() {
        let err = load_level(Path::new("/nonexistent/level.json")).unwrap_err();
        assert!(matches!(err, RunnerError::Level(LevelError::Io(_))));
    }
}
