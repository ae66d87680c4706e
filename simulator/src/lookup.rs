//! Pure occupancy query over the simulator's entity list.

use crate::entity::Entity;
use outbreak_core::Position;

/// Returns the live entity occupying the provided cell, if any.
///
/// Dead entities are skipped, so a cell that only holds a corpse reads as
/// free. The scan is linear because puzzle grids are small; a simulator
/// ported to large grids should switch to a position-keyed map instead.
/// Ties cannot occur: the simulator keeps at most one live entity per cell.
#[must_use]
pub fn entity_at(entities: &[Entity], position: Position) -> Option<&Entity> {
    entities
        .iter()
        .find(|entity| !entity.dead() && entity.position() == position)
}

pub(crate) fn entity_index_at(entities: &[Entity], position: Position) -> Option<usize> {
    entities
        .iter()
        .position(|entity| !entity.dead() && entity.position() == position)
}
