//! Candidate solution files in TOML form.
//!
//! A solution file lists the player path as `[x, y]` pairs (the first entry
//! is the spawn cell), optional box placements, and an optional free-form
//! reasoning string carried through to the run record.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use outbreak_core::{CandidateSolution, Position};
use serde::{Deserialize, Serialize};

/// On-disk representation of a candidate solution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct SolutionFile {
    /// Justification supplied alongside the candidate, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) reasoning: Option<String>,
    /// Ordered cells the player visits, spawn cell first.
    pub(crate) player: Vec<[i32; 2]>,
    /// Cells where boxes are dropped before the player spawns.
    #[serde(default)]
    pub(crate) boxes: Vec<[i32; 2]>,
}

impl SolutionFile {
    /// Converts the file into the candidate the simulator consumes.
    #[must_use]
    pub(crate) fn candidate(&self) -> CandidateSolution {
        CandidateSolution::new(
            self.player
                .iter()
                .map(|&[x, y]| Position::new(x, y))
                .collect(),
            self.boxes
                .iter()
                .map(|&[x, y]| Position::new(x, y))
                .collect(),
        )
    }

    /// Builds a file representation from an evaluated candidate.
    #[must_use]
    pub(crate) fn from_candidate(
        candidate: &CandidateSolution,
        reasoning: Option<String>,
    ) -> Self {
        Self {
            reasoning,
            player: candidate
                .player_path
                .iter()
                .map(|position| [position.x(), position.y()])
                .collect(),
            boxes: candidate
                .box_placements
                .iter()
                .map(|position| [position.x(), position.y()])
                .collect(),
        }
    }
}

/// Reads and parses a solution file from disk.
pub(crate) fn load(path: &Path) -> Result<SolutionFile> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read solution file at {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("failed to parse solution toml at {}", path.display()))
}
