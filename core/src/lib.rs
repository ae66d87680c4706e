#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Outbreak engine.
//!
//! This crate defines the value types that connect the simulator, the
//! replay renderer, and the command-line adapter: grid positions and cell
//! markers, per-step [`Change`] records, the [`CandidateSolution`] submitted
//! for evaluation, and the structured [`MoveRejection`] and [`RunRecord`]
//! types surfaced to callers. The simulator owns all rule evaluation; this
//! crate carries pure data only.

use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

/// Immutable integer coordinate on the puzzle grid.
///
/// Positions are value types compared by field equality and never mutated;
/// movement always produces a new position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    x: i32,
    y: i32,
}

impl Position {
    /// Creates a new grid position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Horizontal coordinate, increasing towards the right edge of the grid.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Vertical coordinate, increasing towards the bottom edge of the grid.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Computes the Manhattan distance between two positions.
    #[must_use]
    pub const fn manhattan_distance(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Returns `true` when `other` occupies an orthogonally neighbouring cell.
    #[must_use]
    pub const fn is_adjacent_to(self, other: Position) -> bool {
        self.manhattan_distance(other) == 1
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Discriminant used to query an entity's recorded changes by kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// The entity moved between two cells.
    Walking,
    /// The entity absorbed one point of damage.
    Hit,
    /// The entity's health reached zero during the step.
    Killed,
}

/// One observable mutation of an entity during the most recent step.
///
/// Changes are step-scoped: the simulator clears every entity's change list
/// at the start of a step, so the list always describes exactly what
/// happened during the latest step. At most one change of a given kind is
/// recorded per entity per step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Change {
    /// The entity relocated from one cell to another.
    Walking {
        /// Cell the entity occupied before moving.
        from: Position,
        /// Cell the entity occupies after the move completed.
        to: Position,
    },
    /// The entity absorbed one point of damage.
    Hit,
    /// The entity died during this step.
    Killed,
}

impl Change {
    /// Returns the discriminant describing this change.
    #[must_use]
    pub const fn kind(&self) -> ChangeKind {
        match self {
            Self::Walking { .. } => ChangeKind::Walking,
            Self::Hit => ChangeKind::Hit,
            Self::Killed => ChangeKind::Killed,
        }
    }
}

/// Closed set of entity kinds that can occupy a grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Destructible obstacle that can be placed by a candidate solution.
    Box,
    /// Hazard that kills whatever steps onto it, destroying itself.
    Landmine,
    /// The survivor controlled by the candidate solution's path.
    Player,
    /// Indestructible terrain that can never be entered or destroyed.
    Rock,
    /// Adversary that chases the player; the win condition requires that
    /// every zombie is eliminated.
    Zombie,
}

impl EntityKind {
    /// Reports whether entities of this kind can lose health when hit.
    ///
    /// The per-kind rule set is data rather than behaviour: rocks are the
    /// only indestructible kind.
    #[must_use]
    pub const fn destructible(self) -> bool {
        !matches!(self, Self::Rock)
    }

    /// Health assigned to a freshly created entity of this kind.
    ///
    /// Every kind currently spawns with a single point of health; the
    /// table exists so individual kinds can diverge without touching the
    /// combat rules.
    #[must_use]
    pub const fn default_health(self) -> u32 {
        match self {
            Self::Box | Self::Landmine | Self::Player | Self::Rock | Self::Zombie => 1,
        }
    }

    /// Marker used when serializing an entity of this kind into a grid.
    #[must_use]
    pub const fn marker(self) -> CellMarker {
        match self {
            Self::Box => CellMarker::Box,
            Self::Landmine => CellMarker::Landmine,
            Self::Player => CellMarker::Player,
            Self::Rock => CellMarker::Rock,
            Self::Zombie => CellMarker::Zombie,
        }
    }
}

/// Single-character cell marker used by map and terminal grids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellMarker {
    /// `'Z'` — adversary.
    Zombie,
    /// `'R'` — indestructible obstacle.
    Rock,
    /// `'B'` — destructible obstacle.
    Box,
    /// `'L'` — landmine hazard.
    Landmine,
    /// `'P'` — the player; appears only in terminal grids, never in seeds.
    Player,
    /// `' '` — empty cell.
    Empty,
}

impl CellMarker {
    /// Parses a marker from its single-character representation.
    #[must_use]
    pub const fn from_char(character: char) -> Option<Self> {
        match character {
            'Z' => Some(Self::Zombie),
            'R' => Some(Self::Rock),
            'B' => Some(Self::Box),
            'L' => Some(Self::Landmine),
            'P' => Some(Self::Player),
            ' ' => Some(Self::Empty),
            _ => None,
        }
    }

    /// Single-character representation of the marker.
    #[must_use]
    pub const fn to_char(self) -> char {
        match self {
            Self::Zombie => 'Z',
            Self::Rock => 'R',
            Self::Box => 'B',
            Self::Landmine => 'L',
            Self::Player => 'P',
            Self::Empty => ' ',
        }
    }

    /// Reports whether the marker denotes an unoccupied cell.
    #[must_use]
    pub const fn is_blank(self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Entity kind seeded for this marker, if any.
    #[must_use]
    pub const fn entity_kind(self) -> Option<EntityKind> {
        match self {
            Self::Zombie => Some(EntityKind::Zombie),
            Self::Rock => Some(EntityKind::Rock),
            Self::Box => Some(EntityKind::Box),
            Self::Landmine => Some(EntityKind::Landmine),
            Self::Player => Some(EntityKind::Player),
            Self::Empty => None,
        }
    }
}

/// Rectangular matrix of cell markers.
///
/// Grids seed the simulator and describe terminal states returned to
/// callers; the live state of record during a run is the simulator's entity
/// list, not the matrix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: u32,
    height: u32,
    cells: Vec<CellMarker>,
}

impl Grid {
    /// Creates an empty grid of the provided dimensions.
    #[must_use]
    pub fn blank(width: u32, height: u32) -> Self {
        let cell_count = width as usize * height as usize;
        Self {
            width,
            height,
            cells: vec![CellMarker::Empty; cell_count],
        }
    }

    /// Builds a grid from a matrix of markers.
    ///
    /// Returns an error when the rows have inconsistent lengths.
    pub fn from_rows(rows: Vec<Vec<CellMarker>>) -> Result<Self, GridError> {
        let height = rows.len() as u32;
        let expected = rows.first().map_or(0, Vec::len);

        let mut cells = Vec::with_capacity(rows.len() * expected);
        for (index, row) in rows.into_iter().enumerate() {
            if row.len() != expected {
                return Err(GridError::NonRectangular {
                    row: index,
                    expected,
                    found: row.len(),
                });
            }
            cells.extend(row);
        }

        Ok(Self {
            width: expected as u32,
            height,
            cells,
        })
    }

    /// Parses a grid from its textual form, one row per line.
    pub fn parse(text: &str) -> Result<Self, GridError> {
        let mut rows = Vec::new();
        for (row_index, line) in text.lines().enumerate() {
            let mut row = Vec::with_capacity(line.len());
            for (column, character) in line.chars().enumerate() {
                let marker = CellMarker::from_char(character).ok_or(GridError::UnknownMarker {
                    character,
                    row: row_index,
                    column,
                })?;
                row.push(marker);
            }
            rows.push(row);
        }
        Self::from_rows(rows)
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Reports whether the position lies inside the grid bounds.
    #[must_use]
    pub const fn contains(&self, position: Position) -> bool {
        position.x() >= 0
            && position.y() >= 0
            && (position.x() as u32) < self.width
            && (position.y() as u32) < self.height
    }

    /// Marker stored at the provided position, or `None` when out of bounds.
    #[must_use]
    pub fn marker_at(&self, position: Position) -> Option<CellMarker> {
        self.index_of(position)
            .and_then(|index| self.cells.get(index).copied())
    }

    /// Stores a marker at the provided position.
    ///
    /// Positions outside the grid are ignored; callers maintaining the
    /// one-entity-per-cell invariant never produce them.
    pub fn set_marker(&mut self, position: Position, marker: CellMarker) {
        if let Some(index) = self.index_of(position) {
            self.cells[index] = marker;
        }
    }

    /// Iterates over every cell alongside its position, row by row.
    pub fn iter(&self) -> impl Iterator<Item = (Position, CellMarker)> + '_ {
        let width = self.width.max(1) as usize;
        self.cells.iter().enumerate().map(move |(index, marker)| {
            let x = (index % width) as i32;
            let y = (index / width) as i32;
            (Position::new(x, y), *marker)
        })
    }

    /// Reports whether any adversary marker remains on the grid.
    #[must_use]
    pub fn has_zombies(&self) -> bool {
        self.cells.contains(&CellMarker::Zombie)
    }

    /// Number of non-blank cells in the grid.
    #[must_use]
    pub fn occupied_cell_count(&self) -> usize {
        self.cells.iter().filter(|marker| !marker.is_blank()).count()
    }

    /// Renders the grid into its textual form, one row per line.
    #[must_use]
    pub fn to_text(&self) -> String {
        let width = self.width as usize;
        let mut text = String::with_capacity(self.cells.len() + self.height as usize);
        for (index, row) in self.cells.chunks(width.max(1)).enumerate() {
            if index > 0 {
                text.push('\n');
            }
            text.extend(row.iter().map(|marker| marker.to_char()));
        }
        text
    }

    fn index_of(&self, position: Position) -> Option<usize> {
        if self.contains(position) {
            let row = position.y() as usize;
            let column = position.x() as usize;
            Some(row * self.width as usize + column)
        } else {
            None
        }
    }
}

/// Errors produced when constructing a grid from external input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridError {
    /// The provided rows do not share a single width.
    NonRectangular {
        /// Zero-based index of the offending row.
        row: usize,
        /// Width established by the first row.
        expected: usize,
        /// Width found on the offending row.
        found: usize,
    },
    /// The textual input contained a character outside the marker alphabet.
    UnknownMarker {
        /// Character that failed to parse.
        character: char,
        /// Zero-based row of the character.
        row: usize,
        /// Zero-based column of the character.
        column: usize,
    },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonRectangular {
                row,
                expected,
                found,
            } => write!(
                f,
                "grid row {row} holds {found} cells but the grid is {expected} cells wide"
            ),
            Self::UnknownMarker {
                character,
                row,
                column,
            } => write!(
                f,
                "unknown cell marker {character:?} at row {row}, column {column}"
            ),
        }
    }
}

impl Error for GridError {}

/// Proposed player path plus object placements submitted for evaluation.
///
/// This is the translated form of a solver answer: the path lists every
/// cell the player visits in order (the first entry is the spawn cell) and
/// the placements list the cells where boxes are dropped before the replay
/// begins.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSolution {
    /// Ordered cells the player occupies, starting with the spawn cell.
    pub player_path: Vec<Position>,
    /// Cells where boxes are inserted before the player spawns.
    pub box_placements: Vec<Position>,
}

impl CandidateSolution {
    /// Creates a new candidate solution.
    #[must_use]
    pub fn new(player_path: Vec<Position>, box_placements: Vec<Position>) -> Self {
        Self {
            player_path,
            box_placements,
        }
    }
}

/// Reasons the simulator rejects a candidate solution.
///
/// A rejection is a hard failure for the whole candidate: the simulator
/// reports it instead of silently clamping the offending move, so an
/// invalid solver answer can never appear to win.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveRejection {
    /// The candidate provided no player path at all.
    EmptyPath,
    /// A path step or placement referenced a cell outside the grid.
    OutOfBounds {
        /// Offending cell.
        position: Position,
    },
    /// The player attempted to enter a cell held by an indestructible entity.
    BlockedByIndestructible {
        /// Cell occupied by the indestructible entity.
        position: Position,
    },
    /// Consecutive path entries do not reference neighbouring cells.
    NonAdjacentStep {
        /// Cell the player occupied before the step.
        from: Position,
        /// Cell the path asked the player to reach.
        to: Position,
    },
    /// A box placement referenced a cell that already holds a live entity.
    PlacementOccupied {
        /// Occupied cell named by the placement.
        position: Position,
    },
    /// The first path entry referenced a cell that already holds a live entity.
    SpawnOccupied {
        /// Occupied cell named as the spawn.
        position: Position,
    },
}

impl fmt::Display for MoveRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPath => write!(f, "candidate solution provided an empty player path"),
            Self::OutOfBounds { position } => {
                write!(f, "candidate referenced {position}, outside the grid")
            }
            Self::BlockedByIndestructible { position } => {
                write!(
                    f,
                    "player cannot enter {position}: blocked by an indestructible entity"
                )
            }
            Self::NonAdjacentStep { from, to } => {
                write!(f, "path step from {from} to {to} is not a single-cell move")
            }
            Self::PlacementOccupied { position } => {
                write!(f, "box placement at {position} targets an occupied cell")
            }
            Self::SpawnOccupied { position } => {
                write!(f, "player spawn at {position} targets an occupied cell")
            }
        }
    }
}

impl Error for MoveRejection {}

/// Outcome of advancing the simulation by one discrete step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepStatus {
    /// The step applied and further path entries remain.
    Advanced,
    /// The step applied and the candidate path is now exhausted.
    PathExhausted,
    /// The player died during the step; the replay stops here.
    PlayerDied,
}

/// Recorded outcome of one evaluated run, as persisted by the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunRecord {
    /// The candidate replayed to a terminal grid.
    Completed {
        /// Whether the terminal grid satisfied the win condition.
        winning: bool,
        /// Terminal grid produced by the replay.
        grid: Grid,
        /// Free-form justification supplied alongside the candidate.
        reasoning: String,
    },
    /// The candidate (or the collaborator producing it) failed.
    Failed {
        /// Message describing the failure.
        error: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::DeserializeOwned;

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn adjacency_requires_manhattan_distance_of_one() {
        let origin = Position::new(2, 2);
        assert!(origin.is_adjacent_to(Position::new(2, 1)));
        assert!(origin.is_adjacent_to(Position::new(1, 2)));
        assert!(!origin.is_adjacent_to(Position::new(3, 3)));
        assert!(!origin.is_adjacent_to(origin));
    }

    #[test]
    fn rock_is_the_only_indestructible_kind() {
        assert!(!EntityKind::Rock.destructible());
        for kind in [
            EntityKind::Box,
            EntityKind::Landmine,
            EntityKind::Player,
            EntityKind::Zombie,
        ] {
            assert!(kind.destructible(), "{kind:?} should be destructible");
        }
    }

    #[test]
    fn every_kind_spawns_with_one_health() {
        for kind in [
            EntityKind::Box,
            EntityKind::Landmine,
            EntityKind::Player,
            EntityKind::Rock,
            EntityKind::Zombie,
        ] {
            assert_eq!(kind.default_health(), 1, "{kind:?}");
        }
    }

    #[test]
    fn markers_round_trip_through_characters() {
        for marker in [
            CellMarker::Zombie,
            CellMarker::Rock,
            CellMarker::Box,
            CellMarker::Landmine,
            CellMarker::Player,
            CellMarker::Empty,
        ] {
            assert_eq!(CellMarker::from_char(marker.to_char()), Some(marker));
        }
        assert_eq!(CellMarker::from_char('X'), None);
    }

    #[test]
    fn grid_parses_and_formats_textual_rows() {
        let text = "Z \n R";
        let grid = Grid::parse(text).expect("valid grid");

        assert_eq!(grid.width(), 2);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.marker_at(Position::new(0, 0)), Some(CellMarker::Zombie));
        assert_eq!(grid.marker_at(Position::new(1, 1)), Some(CellMarker::Rock));
        assert_eq!(grid.to_text(), text);
    }

    #[test]
    fn grid_rejects_ragged_rows() {
        let error = Grid::from_rows(vec![
            vec![CellMarker::Empty, CellMarker::Empty],
            vec![CellMarker::Empty],
        ])
        .expect_err("ragged rows must be rejected");

        assert_eq!(
            error,
            GridError::NonRectangular {
                row: 1,
                expected: 2,
                found: 1,
            }
        );
    }

    #[test]
    fn grid_rejects_unknown_markers() {
        let error = Grid::parse("Z \n x").expect_err("unknown marker must be rejected");

        assert_eq!(
            error,
            GridError::UnknownMarker {
                character: 'x',
                row: 1,
                column: 1,
            }
        );
    }

    #[test]
    fn marker_lookup_is_none_outside_bounds() {
        let grid = Grid::blank(2, 2);
        assert_eq!(grid.marker_at(Position::new(-1, 0)), None);
        assert_eq!(grid.marker_at(Position::new(0, 2)), None);
        assert!(grid.marker_at(Position::new(1, 1)).is_some());
    }

    #[test]
    fn zombie_detection_is_vacuously_false_for_empty_grids() {
        assert!(!Grid::blank(0, 0).has_zombies());
        assert!(!Grid::blank(3, 3).has_zombies());

        let mut grid = Grid::blank(3, 3);
        grid.set_marker(Position::new(2, 1), CellMarker::Zombie);
        assert!(grid.has_zombies());
    }

    #[test]
    fn change_reports_its_kind() {
        let walking = Change::Walking {
            from: Position::new(0, 0),
            to: Position::new(0, 1),
        };
        assert_eq!(walking.kind(), ChangeKind::Walking);
        assert_eq!(Change::Hit.kind(), ChangeKind::Hit);
        assert_eq!(Change::Killed.kind(), ChangeKind::Killed);
    }

    #[test]
    fn position_round_trips_through_bincode() {
        assert_round_trip(&Position::new(-3, 7));
    }

    #[test]
    fn grid_round_trips_through_bincode() {
        let grid = Grid::parse("ZB\nR ").expect("valid grid");
        assert_round_trip(&grid);
    }

    #[test]
    fn candidate_solution_round_trips_through_bincode() {
        let candidate = CandidateSolution::new(
            vec![Position::new(0, 1), Position::new(0, 0)],
            vec![Position::new(1, 1)],
        );
        assert_round_trip(&candidate);
    }
}
