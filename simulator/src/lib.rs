#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative entity state and discrete step engine for one puzzle run.
//!
//! A [`Simulator`] is seeded from a map grid, replays a candidate solution
//! one discrete step at a time, and records a [`Change`] on every entity it
//! touches so the replay renderer can animate each step. Win evaluation is
//! a pure function over a terminal grid and never inspects step history, so
//! externally produced grids can be judged without running a simulation.

mod entity;
mod lookup;

pub use entity::{Entity, MissingChange};
pub use lookup::entity_at;

use lookup::entity_index_at;
use outbreak_core::{
    CandidateSolution, Change, EntityKind, Grid, MoveRejection, Position, StepStatus,
};
use std::{collections::VecDeque, error::Error, fmt};

/// Owns the entity list and grid dimensions for one puzzle instance.
///
/// A simulator evaluates exactly one candidate solution and is discarded
/// once the run completes; entities are never removed from the list, only
/// marked dead.
#[derive(Clone, Debug)]
pub struct Simulator {
    width: u32,
    height: u32,
    entities: Vec<Entity>,
    pending_moves: VecDeque<Position>,
    player: Option<usize>,
}

impl Simulator {
    /// Seeds a simulator from a map grid, one entity per non-blank cell.
    ///
    /// Seed maps describe the puzzle before any candidate is applied, so a
    /// player marker in the input is rejected: the player only enters the
    /// world through a candidate's spawn cell.
    pub fn from_grid(grid: &Grid) -> Result<Self, MapError> {
        let mut entities = Vec::with_capacity(grid.occupied_cell_count());
        for (position, marker) in grid.iter() {
            match marker.entity_kind() {
                Some(EntityKind::Player) => {
                    return Err(MapError::PlayerMarkerInSeed { position });
                }
                Some(kind) => entities.push(Entity::new(kind, position)),
                None => {}
            }
        }

        Ok(Self {
            width: grid.width(),
            height: grid.height(),
            entities,
            pending_moves: VecDeque::new(),
            player: None,
        })
    }

    /// Number of columns in the puzzle grid.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows in the puzzle grid.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Every entity in the simulation, including dead entities that still
    /// carry unrendered changes. Slot order is creation order.
    #[must_use]
    pub fn all_entities(&self) -> &[Entity] {
        &self.entities
    }

    /// The player entity once a candidate has been applied.
    #[must_use]
    pub fn player(&self) -> Option<&Entity> {
        self.player.map(|index| &self.entities[index])
    }

    /// Number of path moves not yet replayed.
    #[must_use]
    pub fn pending_move_count(&self) -> usize {
        self.pending_moves.len()
    }

    /// Validates a candidate and applies its setup phase.
    ///
    /// Box placements are inserted first, then the player spawns at the
    /// first path entry; the remaining entries are queued for [`step`].
    /// Placements and the spawn must reference free, in-bounds cells.
    ///
    /// [`step`]: Simulator::step
    pub fn begin(&mut self, candidate: &CandidateSolution) -> Result<(), MoveRejection> {
        let Some(&spawn) = candidate.player_path.first() else {
            return Err(MoveRejection::EmptyPath);
        };

        for &placement in &candidate.box_placements {
            if !self.contains(placement) {
                return Err(MoveRejection::OutOfBounds {
                    position: placement,
                });
            }
            if entity_at(&self.entities, placement).is_some() {
                return Err(MoveRejection::PlacementOccupied {
                    position: placement,
                });
            }
            self.entities.push(Entity::new(EntityKind::Box, placement));
        }

        if !self.contains(spawn) {
            return Err(MoveRejection::OutOfBounds { position: spawn });
        }
        if entity_at(&self.entities, spawn).is_some() {
            return Err(MoveRejection::SpawnOccupied { position: spawn });
        }
        self.entities.push(Entity::new(EntityKind::Player, spawn));
        self.player = Some(self.entities.len() - 1);
        self.pending_moves = candidate.player_path.iter().skip(1).copied().collect();

        Ok(())
    }

    /// Advances the simulation by one discrete step.
    ///
    /// Every entity's change list is cleared first, then the player takes
    /// the next queued path move, then each live zombie takes one chase
    /// step. An invalid player move rejects the whole candidate: the error
    /// is returned and the run must not be treated as a win. Calling `step`
    /// before [`begin`](Simulator::begin) reports an empty path.
    pub fn step(&mut self) -> Result<StepStatus, MoveRejection> {
        for entity in &mut self.entities {
            entity.clear_changes();
        }

        let Some(player_index) = self.player else {
            return Err(MoveRejection::EmptyPath);
        };
        if self.entities[player_index].dead() {
            return Ok(StepStatus::PlayerDied);
        }
        let Some(target) = self.pending_moves.pop_front() else {
            return Ok(StepStatus::PathExhausted);
        };

        self.apply_player_move(player_index, target)?;
        self.advance_zombies(player_index);

        if self.entities[player_index].dead() {
            Ok(StepStatus::PlayerDied)
        } else if self.pending_moves.is_empty() {
            Ok(StepStatus::PathExhausted)
        } else {
            Ok(StepStatus::Advanced)
        }
    }

    /// Replays a full candidate and returns the terminal grid.
    ///
    /// This is the headless path used for win evaluation: `begin` followed
    /// by `step` until the path is exhausted or the player dies.
    pub fn run(&mut self, candidate: &CandidateSolution) -> Result<Grid, MoveRejection> {
        self.begin(candidate)?;
        loop {
            match self.step()? {
                StepStatus::Advanced => {}
                StepStatus::PathExhausted | StepStatus::PlayerDied => break,
            }
        }
        Ok(self.to_grid())
    }

    /// Serializes live entity positions into a marker grid.
    ///
    /// Dead entities leave their cells blank; the matrix is a terminal-state
    /// snapshot for storage and win evaluation, not live state.
    #[must_use]
    pub fn to_grid(&self) -> Grid {
        let mut grid = Grid::blank(self.width, self.height);
        for entity in &self.entities {
            if !entity.dead() {
                grid.set_marker(entity.position(), entity.kind().marker());
            }
        }
        grid
    }

    /// Judges a terminal grid: true iff no adversary marker remains.
    ///
    /// Pure over the matrix alone — no step history, no changes — so grids
    /// produced outside this simulator can be judged the same way. An empty
    /// grid wins vacuously.
    #[must_use]
    pub fn is_win(grid: &Grid) -> bool {
        !grid.has_zombies()
    }

    const fn contains(&self, position: Position) -> bool {
        position.x() >= 0
            && position.y() >= 0
            && (position.x() as u32) < self.width
            && (position.y() as u32) < self.height
    }

    fn apply_player_move(
        &mut self,
        player_index: usize,
        target: Position,
    ) -> Result<(), MoveRejection> {
        let from = self.entities[player_index].position();

        if !self.contains(target) {
            return Err(MoveRejection::OutOfBounds { position: target });
        }
        if !from.is_adjacent_to(target) {
            return Err(MoveRejection::NonAdjacentStep { from, to: target });
        }

        match entity_index_at(&self.entities, target) {
            None => {
                self.entities[player_index].set_position(target);
                self.entities[player_index].add_change(Change::Walking { from, to: target });
            }
            Some(occupant) if self.entities[occupant].kind() == EntityKind::Landmine => {
                self.entities[player_index].set_position(target);
                self.entities[player_index].add_change(Change::Walking { from, to: target });
                self.detonate(occupant, player_index);
            }
            Some(occupant) if self.entities[occupant].destructible() => {
                self.entities[occupant].hit();
                self.entities[occupant].add_change(Change::Hit);
                if self.entities[occupant].dead() {
                    self.entities[occupant].add_change(Change::Killed);
                }
            }
            Some(_) => {
                return Err(MoveRejection::BlockedByIndestructible { position: target });
            }
        }

        Ok(())
    }

    fn advance_zombies(&mut self, player_index: usize) {
        for index in 0..self.entities.len() {
            // Zombies stop acting the moment the player falls.
            if self.entities[player_index].dead() {
                break;
            }
            if self.entities[index].kind() != EntityKind::Zombie || self.entities[index].dead() {
                continue;
            }
            self.advance_zombie(index, player_index);
        }
    }

    /// One chase step: the axis with the larger remaining distance is tried
    /// first (x on ties). The player is attacked, landmines are walked onto
    /// and detonate, and any other live occupant blocks that axis.
    fn advance_zombie(&mut self, index: usize, player_index: usize) {
        let from = self.entities[index].position();
        let player_position = self.entities[player_index].position();
        let dx = player_position.x() - from.x();
        let dy = player_position.y() - from.y();

        let horizontal =
            (dx != 0).then(|| Position::new(from.x() + dx.signum(), from.y()));
        let vertical = (dy != 0).then(|| Position::new(from.x(), from.y() + dy.signum()));
        let ordered = if dx.abs() >= dy.abs() {
            [horizontal, vertical]
        } else {
            [vertical, horizontal]
        };

        for target in ordered.into_iter().flatten() {
            match entity_index_at(&self.entities, target) {
                None => {
                    self.entities[index].set_position(target);
                    self.entities[index].add_change(Change::Walking { from, to: target });
                    return;
                }
                Some(occupant) if occupant == player_index => {
                    self.entities[player_index].hit();
                    self.entities[player_index].add_change(Change::Hit);
                    if self.entities[player_index].dead() {
                        self.entities[player_index].add_change(Change::Killed);
                    }
                    return;
                }
                Some(occupant) if self.entities[occupant].kind() == EntityKind::Landmine => {
                    self.entities[index].set_position(target);
                    self.entities[index].add_change(Change::Walking { from, to: target });
                    self.detonate(occupant, index);
                    return;
                }
                Some(_) => {}
            }
        }
    }

    fn detonate(&mut self, landmine_index: usize, victim_index: usize) {
        self.entities[landmine_index].die();
        self.entities[landmine_index].add_change(Change::Killed);
        self.entities[victim_index].die();
        self.entities[victim_index].add_change(Change::Killed);
    }
}

/// Errors produced when seeding a simulator from a map grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapError {
    /// Seed maps must not contain a player marker.
    PlayerMarkerInSeed {
        /// Cell holding the unexpected marker.
        position: Position,
    },
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlayerMarkerInSeed { position } => {
                write!(
                    f,
                    "seed map holds a player marker at {position}; players spawn from candidates"
                )
            }
        }
    }
}

impl Error for MapError {}
