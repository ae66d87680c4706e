#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter for evaluating, replaying, generating and sharing
//! Outbreak challenges.

mod generate;
mod solution;
mod transfer;

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use outbreak_core::{Grid, RunRecord};
use outbreak_rendering_macroquad::MacroquadBackend;
use outbreak_simulator::Simulator;

use crate::{
    generate::GeneratorConfig,
    solution::SolutionFile,
    transfer::ChallengeSnapshot,
};

#[derive(Debug, Parser)]
#[command(
    name = "outbreak",
    about = "Grid-based zombie puzzle evaluation and replay",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replays a candidate solution headlessly and prints the run record.
    Eval {
        /// Path to the seed map in marker-text form.
        #[arg(long, required_unless_present = "code")]
        map: Option<PathBuf>,
        /// Path to the candidate solution in TOML form.
        #[arg(long, required_unless_present = "code")]
        solution: Option<PathBuf>,
        /// Challenge code bundling map and solution.
        #[arg(long, conflicts_with_all = ["map", "solution"])]
        code: Option<String>,
    },
    /// Opens a window and replays the candidate step by step.
    Play {
        /// Path to the seed map in marker-text form.
        #[arg(long, required_unless_present = "code")]
        map: Option<PathBuf>,
        /// Path to the candidate solution in TOML form.
        #[arg(long, required_unless_present = "code")]
        solution: Option<PathBuf>,
        /// Challenge code bundling map and solution.
        #[arg(long, conflicts_with_all = ["map", "solution"])]
        code: Option<String>,
        /// Print frame timing metrics once per second.
        #[arg(long)]
        show_fps: bool,
        /// Render as fast as possible instead of syncing to the display.
        #[arg(long)]
        no_vsync: bool,
    },
    /// Generates a random seed map.
    Generate {
        /// Number of grid columns.
        #[arg(long, default_value_t = 8)]
        width: u32,
        /// Number of grid rows.
        #[arg(long, default_value_t = 8)]
        height: u32,
        /// Seed for the deterministic generator stream.
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Number of zombies to place.
        #[arg(long, default_value_t = 3)]
        zombies: u32,
        /// Number of rocks to place.
        #[arg(long, default_value_t = 4)]
        rocks: u32,
        /// Number of boxes to place.
        #[arg(long, default_value_t = 2)]
        boxes: u32,
        /// Number of landmines to place.
        #[arg(long, default_value_t = 1)]
        landmines: u32,
        /// Write the map here instead of printing it.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Encodes a map and solution into a shareable challenge code.
    Share {
        /// Path to the seed map in marker-text form.
        #[arg(long)]
        map: PathBuf,
        /// Path to the candidate solution in TOML form.
        #[arg(long)]
        solution: PathBuf,
    },
    /// Decodes a challenge code into map and solution files.
    Import {
        /// Challenge code produced by `share`.
        code: String,
        /// Destination for the decoded map.
        #[arg(long)]
        map_out: PathBuf,
        /// Destination for the decoded solution.
        #[arg(long)]
        solution_out: PathBuf,
    },
}

fn main() -> Result<()> {
    match Cli::parse().command {
        Command::Eval {
            map,
            solution,
            code,
        } => eval(map.as_deref(), solution.as_deref(), code.as_deref()),
        Command::Play {
            map,
            solution,
            code,
            show_fps,
            no_vsync,
        } => play(
            map.as_deref(),
            solution.as_deref(),
            code.as_deref(),
            show_fps,
            no_vsync,
        ),
        Command::Generate {
            width,
            height,
            seed,
            zombies,
            rocks,
            boxes,
            landmines,
            output,
        } => {
            let config = GeneratorConfig {
                width,
                height,
                zombies,
                rocks,
                boxes,
                landmines,
            };
            run_generate(&config, seed, output.as_deref())
        }
        Command::Share { map, solution } => share(&map, &solution),
        Command::Import {
            code,
            map_out,
            solution_out,
        } => import(&code, &map_out, &solution_out),
    }
}

fn load_grid(path: &Path) -> Result<Grid> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read map file at {}", path.display()))?;
    Grid::parse(&contents)
        .map_err(anyhow::Error::new)
        .with_context(|| format!("failed to parse map file at {}", path.display()))
}

/// Resolves the seed map and solution from files or a challenge code.
fn load_challenge(
    map: Option<&Path>,
    solution: Option<&Path>,
    code: Option<&str>,
) -> Result<(Grid, SolutionFile)> {
    if let Some(code) = code {
        let snapshot = ChallengeSnapshot::decode(code).map_err(anyhow::Error::new)?;
        let grid = Grid::parse(&snapshot.map)
            .map_err(anyhow::Error::new)
            .context("challenge code carries an invalid map")?;
        let file = SolutionFile::from_candidate(
            &outbreak_core::CandidateSolution::new(
                snapshot.player_path,
                snapshot.box_placements,
            ),
            None,
        );
        return Ok((grid, file));
    }

    // clap guarantees both paths are present when no code is given.
    let (Some(map), Some(solution)) = (map, solution) else {
        bail!("either a challenge code or a map and solution pair is required");
    };
    Ok((load_grid(map)?, solution::load(solution)?))
}

fn eval(map: Option<&Path>, solution: Option<&Path>, code: Option<&str>) -> Result<()> {
    let (grid, file) = load_challenge(map, solution, code)?;
    let record = evaluate(&grid, &file);
    println!("{}", serde_json::to_string(&record)?);
    Ok(())
}

/// Produces the run record for one candidate against one seed map.
///
/// Losing runs still complete: a `Completed` record with `winning: false`
/// carries the terminal grid. Only rejected candidates and invalid seed
/// maps fail.
fn evaluate(grid: &Grid, file: &SolutionFile) -> RunRecord {
    let candidate = file.candidate();
    let mut simulator = match Simulator::from_grid(grid) {
        Ok(simulator) => simulator,
        Err(error) => {
            return RunRecord::Failed {
                error: error.to_string(),
            }
        }
    };

    match simulator.run(&candidate) {
        Ok(terminal) => RunRecord::Completed {
            winning: Simulator::is_win(&terminal),
            grid: terminal,
            reasoning: file.reasoning.clone().unwrap_or_default(),
        },
        Err(rejection) => RunRecord::Failed {
            error: rejection.to_string(),
        },
    }
}

fn play(
    map: Option<&Path>,
    solution: Option<&Path>,
    code: Option<&str>,
    show_fps: bool,
    no_vsync: bool,
) -> Result<()> {
    let (grid, file) = load_challenge(map, solution, code)?;
    MacroquadBackend::new()
        .with_vsync(!no_vsync)
        .with_show_fps(show_fps)
        .run(&grid, &file.candidate())
}

fn run_generate(config: &GeneratorConfig, seed: u64, output: Option<&Path>) -> Result<()> {
    let grid = generate::generate(config, seed)?;
    let text = grid.to_text();
    match output {
        Some(path) => fs::write(path, text)
            .with_context(|| format!("failed to write map file at {}", path.display()))?,
        None => println!("{text}"),
    }
    Ok(())
}

fn share(map: &Path, solution: &Path) -> Result<()> {
    let grid = load_grid(map)?;
    let candidate = solution::load(solution)?.candidate();
    let snapshot = ChallengeSnapshot {
        columns: grid.width(),
        rows: grid.height(),
        map: grid.to_text(),
        player_path: candidate.player_path,
        box_placements: candidate.box_placements,
    };
    println!("{}", snapshot.encode());
    Ok(())
}

fn import(code: &str, map_out: &Path, solution_out: &Path) -> Result<()> {
    let snapshot = ChallengeSnapshot::decode(code).map_err(anyhow::Error::new)?;
    let grid = Grid::parse(&snapshot.map)
        .map_err(anyhow::Error::new)
        .context("challenge code carries an invalid map")?;
    if grid.width() != snapshot.columns || grid.height() != snapshot.rows {
        bail!(
            "challenge code dimensions {}x{} do not match its map ({}x{})",
            snapshot.columns,
            snapshot.rows,
            grid.width(),
            grid.height()
        );
    }

    let file = SolutionFile::from_candidate(
        &outbreak_core::CandidateSolution::new(snapshot.player_path, snapshot.box_placements),
        None,
    );
    let solution_toml =
        toml::to_string(&file).context("failed to serialise the decoded solution")?;

    fs::write(map_out, grid.to_text())
        .with_context(|| format!("failed to write map file at {}", map_out.display()))?;
    fs::write(solution_out, solution_toml)
        .with_context(|| format!("failed to write solution file at {}", solution_out.display()))?;
    Ok(())
}
