//! Seeded random map generation.
//!
//! Maps are built by shuffling the cell list with a seeded ChaCha stream and
//! assigning markers to the head of the shuffle, so the same seed and
//! configuration always reproduce the same map. Generated maps never contain
//! a player marker; the player only enters through a candidate's spawn cell.

use anyhow::{bail, Result};
use outbreak_core::{CellMarker, Grid, Position};
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Entity counts and dimensions for one generated map.
#[derive(Clone, Copy, Debug)]
pub(crate) struct GeneratorConfig {
    pub width: u32,
    pub height: u32,
    pub zombies: u32,
    pub rocks: u32,
    pub boxes: u32,
    pub landmines: u32,
}

impl GeneratorConfig {
    fn occupied(&self) -> u64 {
        u64::from(self.zombies)
            + u64::from(self.rocks)
            + u64::from(self.boxes)
            + u64::from(self.landmines)
    }
}

/// Generates a seed map for the provided configuration.
pub(crate) fn generate(config: &GeneratorConfig, seed: u64) -> Result<Grid> {
    if config.width == 0 || config.height == 0 {
        bail!("generated maps need at least one column and one row");
    }
    if config.zombies == 0 {
        bail!("generated maps need at least one zombie");
    }

    let cells = u64::from(config.width) * u64::from(config.height);
    // The spawn cell and at least part of a path must stay free.
    if config.occupied() >= cells {
        bail!(
            "{} entities do not leave a free spawn cell on a {}x{} map",
            config.occupied(),
            config.width,
            config.height
        );
    }

    let mut positions = Vec::with_capacity(cells as usize);
    for y in 0..config.height {
        for x in 0..config.width {
            positions.push(Position::new(x as i32, y as i32));
        }
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    positions.shuffle(&mut rng);

    let mut grid = Grid::blank(config.width, config.height);
    let mut remaining = positions.into_iter();
    for (marker, count) in [
        (CellMarker::Zombie, config.zombies),
        (CellMarker::Rock, config.rocks),
        (CellMarker::Box, config.boxes),
        (CellMarker::Landmine, config.landmines),
    ] {
        for _ in 0..count {
            // The shuffle holds every cell, and occupancy < cells.
            if let Some(position) = remaining.next() {
                grid.set_marker(position, marker);
            }
        }
    }

    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GeneratorConfig {
        GeneratorConfig {
            width: 8,
            height: 6,
            zombies: 3,
            rocks: 4,
            boxes: 2,
            landmines: 1,
        }
    }

    #[test]
    fn generation_is_deterministic_per_seed() {
        let first = generate(&config(), 42).expect("valid configuration");
        let second = generate(&config(), 42).expect("valid configuration");
        assert_eq!(first, second);
    }

    #[test]
    fn distinct_seeds_produce_distinct_maps() {
        let first = generate(&config(), 1).expect("valid configuration");
        let second = generate(&config(), 2).expect("valid configuration");
        assert_ne!(first, second);
    }

    #[test]
    fn generated_maps_hold_the_requested_entities() {
        let grid = generate(&config(), 7).expect("valid configuration");
        assert_eq!(grid.occupied_cell_count(), 10);
        assert!(grid.has_zombies());

        let mut zombies = 0;
        for (_, marker) in grid.iter() {
            assert_ne!(marker, CellMarker::Player, "maps never seed a player");
            if marker == CellMarker::Zombie {
                zombies += 1;
            }
        }
        assert_eq!(zombies, 3);
    }

    #[test]
    fn generation_rejects_overfull_maps() {
        let overfull = GeneratorConfig {
            width: 2,
            height: 2,
            zombies: 2,
            rocks: 2,
            boxes: 0,
            landmines: 0,
        };
        assert!(generate(&overfull, 0).is_err(), "no spawn cell remains");
    }

    #[test]
    fn generation_rejects_zombie_free_maps() {
        let pacifist = GeneratorConfig {
            zombies: 0,
            ..config()
        };
        assert!(generate(&pacifist, 0).is_err());
    }

    #[test]
    fn generated_maps_round_trip_through_text() {
        let grid = generate(&config(), 99).expect("valid configuration");
        let reparsed = Grid::parse(&grid.to_text()).expect("generated text parses");
        assert_eq!(grid, reparsed);
    }
}
