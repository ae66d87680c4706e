//! Per-entity state and the minimal mutators the step engine needs.

use outbreak_core::{Change, ChangeKind, EntityKind, Position};
use std::{error::Error, fmt};

/// A simulated object occupying one grid cell.
///
/// Entity identity is the slot in the simulator's entity list; entities are
/// mutated in place during a step and never removed. A dead entity stays in
/// the list so that a just-recorded death can still be rendered once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entity {
    kind: EntityKind,
    destructible: bool,
    health: u32,
    position: Position,
    changes: Vec<Change>,
}

impl Entity {
    /// Creates a new entity of the provided kind at the provided cell.
    #[must_use]
    pub fn new(kind: EntityKind, position: Position) -> Self {
        Self {
            kind,
            destructible: kind.destructible(),
            health: kind.default_health(),
            position,
            changes: Vec::new(),
        }
    }

    /// Kind assigned at creation.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Whether the entity can lose health when hit; fixed at creation.
    #[must_use]
    pub const fn destructible(&self) -> bool {
        self.destructible
    }

    /// Remaining health; zero means the entity is dead.
    #[must_use]
    pub const fn health(&self) -> u32 {
        self.health
    }

    /// Cell the entity currently occupies.
    #[must_use]
    pub const fn position(&self) -> Position {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    /// Reports whether the entity's health has reached zero.
    #[must_use]
    pub const fn dead(&self) -> bool {
        self.health == 0
    }

    /// Applies one point of damage when the entity is destructible.
    ///
    /// Indestructible entities ignore the hit entirely; health never
    /// underflows past zero.
    pub fn hit(&mut self) {
        if !self.destructible {
            return;
        }
        self.health = self.health.saturating_sub(1);
    }

    /// Forces health to zero regardless of destructibility.
    pub fn die(&mut self) {
        self.health = 0;
    }

    /// Appends a change describing a mutation applied during this step.
    pub fn add_change(&mut self, change: Change) {
        self.changes.push(change);
    }

    /// Discards every recorded change; called at the start of each step so
    /// the list always describes exactly what happened during that step.
    pub fn clear_changes(&mut self) {
        self.changes.clear();
    }

    /// Changes recorded during the current step, in application order.
    #[must_use]
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Reports whether any change was recorded during the current step.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Reports whether a change of the provided kind was recorded.
    #[must_use]
    pub fn has_change(&self, kind: ChangeKind) -> bool {
        self.changes.iter().any(|change| change.kind() == kind)
    }

    /// Looks up the change of the provided kind recorded during this step.
    ///
    /// Requesting a kind that was not recorded is a programmer error; the
    /// returned [`MissingChange`] is deliberately descriptive rather than a
    /// silent default, so rendering code can never apply effect parameters
    /// from a change that never happened. Gate with [`Entity::has_change`].
    pub fn change(&self, kind: ChangeKind) -> Result<&Change, MissingChange> {
        self.changes
            .iter()
            .find(|change| change.kind() == kind)
            .ok_or(MissingChange { kind })
    }
}

/// Error produced when a change of a requested kind was never recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MissingChange {
    kind: ChangeKind,
}

impl MissingChange {
    /// Kind that was requested but never recorded.
    #[must_use]
    pub const fn kind(&self) -> ChangeKind {
        self.kind
    }
}

impl fmt::Display for MissingChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no change of kind {:?} was recorded during this step",
            self.kind
        )
    }
}

impl Error for MissingChange {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_never_damages_an_indestructible_entity() {
        let mut rock = Entity::new(EntityKind::Rock, Position::new(0, 0));
        rock.hit();
        rock.hit();
        assert_eq!(rock.health(), EntityKind::Rock.default_health());
        assert!(!rock.dead());
    }

    #[test]
    fn hit_decrements_destructible_health_with_a_floor_of_zero() {
        let mut zombie = Entity::new(EntityKind::Zombie, Position::new(1, 1));
        let initial = zombie.health();
        zombie.hit();
        assert_eq!(zombie.health(), initial - 1);

        for _ in 0..4 {
            zombie.hit();
        }
        assert_eq!(zombie.health(), 0);
        assert!(zombie.dead());
    }

    #[test]
    fn die_zeroes_health_regardless_of_destructibility() {
        let mut rock = Entity::new(EntityKind::Rock, Position::new(0, 0));
        rock.die();
        assert!(rock.dead());

        let mut player = Entity::new(EntityKind::Player, Position::new(2, 2));
        player.die();
        assert!(player.dead());
    }

    #[test]
    fn change_lookup_returns_the_exact_record_added() {
        let mut zombie = Entity::new(EntityKind::Zombie, Position::new(0, 0));
        let walking = Change::Walking {
            from: Position::new(0, 0),
            to: Position::new(1, 0),
        };
        zombie.add_change(walking);
        zombie.add_change(Change::Hit);

        assert!(zombie.has_change(ChangeKind::Walking));
        assert_eq!(zombie.change(ChangeKind::Walking), Ok(&walking));
        assert_eq!(zombie.change(ChangeKind::Hit), Ok(&Change::Hit));
    }

    #[test]
    fn change_lookup_fails_fast_for_unrecorded_kinds() {
        let zombie = Entity::new(EntityKind::Zombie, Position::new(0, 0));
        let error = zombie
            .change(ChangeKind::Killed)
            .expect_err("missing change must be reported");
        assert_eq!(error.kind(), ChangeKind::Killed);
    }

    #[test]
    fn clearing_changes_empties_every_kind() {
        let mut player = Entity::new(EntityKind::Player, Position::new(0, 0));
        player.add_change(Change::Hit);
        player.add_change(Change::Killed);
        assert!(player.has_changes());

        player.clear_changes();
        assert!(!player.has_changes());
        for kind in [ChangeKind::Walking, ChangeKind::Hit, ChangeKind::Killed] {
            assert!(!player.has_change(kind));
        }
    }
}
