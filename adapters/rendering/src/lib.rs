#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared replay-rendering contracts for Outbreak adapters.
//!
//! The renderer converts one simulator snapshot into a display list of
//! [`RendererItem`]s with derived [`RendererEffect`]s, then runs a
//! self-rescheduling draw loop over backend-provided [`Surface`] and
//! [`FrameClock`] implementations. Presentation state is rebuilt from the
//! snapshot on every [`Renderer::render`] call and never feeds back into
//! the simulation.

use anyhow::Result as AnyResult;
use glam::Vec2;
use outbreak_core::{Change, ChangeKind, EntityKind};
use outbreak_simulator::{Entity, Simulator};
use std::{
    error::Error,
    fmt,
    time::{Duration, Instant},
};

/// Shared duration of every movement animation; one simulation step is
/// replayed over exactly this span.
pub const REPLAY_SPEED: Duration = Duration::from_millis(600);

/// Hue-rotation applied as a tint flash when an entity was hit this step.
pub const HIT_HUE_ROTATE_DEGREES: f32 = 300.0;

/// Opacity percentage applied to the background item.
pub const BACKGROUND_OPACITY: f32 = 50.0;

/// Keys identifying the visual resources a backend must provide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpriteKey {
    /// Backdrop drawn underneath every entity.
    Background,
    /// Destructible box obstacle.
    Box,
    /// Landmine hazard.
    Landmine,
    /// The player.
    Player,
    /// Indestructible rock.
    Rock,
    /// Idle adversary.
    Zombie,
    /// Adversary that moved this step.
    ZombieWalking,
    /// Adversary that died this step.
    ZombieDead,
}

/// Discriminant used to query an item's effects by kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectKind {
    /// Cycles through a sequence of sprites over time.
    AssetSwap,
    /// Mirrors the sprite along its vertical axis.
    FlipHorizontal,
    /// Rotates the sprite's hue by a fixed angle.
    HueRotate,
    /// Scales the sprite's alpha channel.
    Opacity,
    /// Moves the item towards a target position over a fixed duration.
    Move,
}

/// Presentation-only transform attached to a drawable item.
#[derive(Clone, Debug, PartialEq)]
pub enum RendererEffect {
    /// Cycles through `steps`, advancing every `every`, for `duration`.
    AssetSwap {
        /// Sprites cycled through while the effect is live.
        steps: Vec<SpriteKey>,
        /// Interval between sprite advances.
        every: Duration,
        /// Total lifetime of the cycling animation.
        duration: Duration,
        /// Timestamp captured when the effect was attached.
        started_at: Instant,
    },
    /// Mirrors the sprite along its vertical axis.
    FlipHorizontal,
    /// Rotates the sprite's hue.
    HueRotate {
        /// Rotation angle in degrees.
        degrees: f32,
    },
    /// Scales the sprite's alpha channel.
    Opacity {
        /// Opacity percentage in the range 0.0..=100.0.
        value: f32,
    },
    /// Linearly interpolates the item towards a target position.
    Move {
        /// Screen-space position the item moves towards.
        to: Vec2,
        /// Time the movement takes to complete.
        duration: Duration,
        /// Timestamp captured when the effect was attached.
        started_at: Instant,
    },
}

impl RendererEffect {
    /// Returns the discriminant describing this effect.
    #[must_use]
    pub const fn kind(&self) -> EffectKind {
        match self {
            Self::AssetSwap { .. } => EffectKind::AssetSwap,
            Self::FlipHorizontal => EffectKind::FlipHorizontal,
            Self::HueRotate { .. } => EffectKind::HueRotate,
            Self::Opacity { .. } => EffectKind::Opacity,
            Self::Move { .. } => EffectKind::Move,
        }
    }
}

/// One drawable entry in the renderer's display list.
#[derive(Clone, Debug, PartialEq)]
pub struct RendererItem {
    sprite: SpriteKey,
    position: Vec2,
    width: f32,
    height: f32,
    effects: Vec<RendererEffect>,
}

impl RendererItem {
    /// Creates a new drawable item without effects.
    #[must_use]
    pub fn new(sprite: SpriteKey, position: Vec2, width: f32, height: f32) -> Self {
        Self {
            sprite,
            position,
            width,
            height,
            effects: Vec::new(),
        }
    }

    /// Attaches an effect, builder style.
    #[must_use]
    pub fn with_effect(mut self, effect: RendererEffect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Sprite selected for the item at registration time.
    #[must_use]
    pub const fn sprite(&self) -> SpriteKey {
        self.sprite
    }

    /// Registered screen-space position before movement interpolation.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Width of the drawn sprite in screen units.
    #[must_use]
    pub const fn width(&self) -> f32 {
        self.width
    }

    /// Height of the drawn sprite in screen units.
    #[must_use]
    pub const fn height(&self) -> f32 {
        self.height
    }

    /// Effects attached to the item, in attachment order.
    #[must_use]
    pub fn effects(&self) -> &[RendererEffect] {
        &self.effects
    }

    /// Reports whether an effect of the provided kind is attached.
    #[must_use]
    pub fn has_effect(&self, kind: EffectKind) -> bool {
        self.effects.iter().any(|effect| effect.kind() == kind)
    }

    /// Looks up the attached effect of the provided kind.
    ///
    /// Requesting an absent kind is a programmer error and yields a
    /// descriptive [`MissingEffect`] instead of defaulted parameters.
    pub fn effect(&self, kind: EffectKind) -> Result<&RendererEffect, MissingEffect> {
        self.effects
            .iter()
            .find(|effect| effect.kind() == kind)
            .ok_or(MissingEffect { kind })
    }

    /// Position of the item at the provided instant.
    ///
    /// A `Move` effect interpolates linearly from the registered position
    /// to its target; the interpolation factor is clamped to `[0, 1]`, so
    /// elapsed time zero yields the origin and anything at or past the
    /// duration yields exactly the target with no overshoot.
    #[must_use]
    pub fn position_at(&self, now: Instant) -> Vec2 {
        let Ok(&RendererEffect::Move {
            to,
            duration,
            started_at,
        }) = self.effect(EffectKind::Move)
        else {
            return self.position;
        };

        let elapsed = now.saturating_duration_since(started_at);
        let factor = if duration.is_zero() {
            1.0
        } else {
            (elapsed.as_secs_f32() / duration.as_secs_f32()).clamp(0.0, 1.0)
        };
        self.position.lerp(to, factor)
    }

    /// Sprite to draw at the provided instant, honouring asset swaps.
    #[must_use]
    pub fn sprite_at(&self, now: Instant) -> SpriteKey {
        let Ok(RendererEffect::AssetSwap {
            steps,
            every,
            duration,
            started_at,
        }) = self.effect(EffectKind::AssetSwap)
        else {
            return self.sprite;
        };

        let elapsed = now.saturating_duration_since(*started_at);
        if steps.is_empty() || elapsed >= *duration || every.is_zero() {
            return self.sprite;
        }
        let index = (elapsed.as_millis() / every.as_millis()) as usize % steps.len();
        steps[index]
    }

    /// Alpha multiplier derived from an `Opacity` effect, 1.0 by default.
    #[must_use]
    pub fn alpha(&self) -> f32 {
        match self.effect(EffectKind::Opacity) {
            Ok(RendererEffect::Opacity { value }) => (value / 100.0).clamp(0.0, 1.0),
            _ => 1.0,
        }
    }

    /// Hue-rotation degrees derived from a `HueRotate` effect, if any.
    #[must_use]
    pub fn hue_rotation(&self) -> Option<f32> {
        match self.effect(EffectKind::HueRotate) {
            Ok(RendererEffect::HueRotate { degrees }) => Some(*degrees),
            _ => None,
        }
    }

    /// Reports whether a `Move` effect is still within its duration.
    #[must_use]
    pub fn in_motion(&self, now: Instant) -> bool {
        matches!(
            self.effect(EffectKind::Move),
            Ok(&RendererEffect::Move {
                duration,
                started_at,
                ..
            }) if now.saturating_duration_since(started_at) < duration
        )
    }
}

/// Error produced when an effect of a requested kind is not attached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MissingEffect {
    kind: EffectKind,
}

impl MissingEffect {
    /// Kind that was requested but never attached.
    #[must_use]
    pub const fn kind(&self) -> EffectKind {
        self.kind
    }
}

impl fmt::Display for MissingEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no effect of kind {:?} is attached to this item", self.kind)
    }
}

impl Error for MissingEffect {}

/// Parameters describing one sprite blit on a [`Surface`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlitParams {
    /// Screen-space position of the sprite's top-left corner.
    pub position: Vec2,
    /// Destination size in screen units.
    pub size: Vec2,
    /// Alpha multiplier in the range 0.0..=1.0.
    pub alpha: f32,
    /// Whether the sprite is mirrored along its vertical axis.
    pub flip_horizontal: bool,
    /// Hue rotation in degrees, drawn through the backend's two-pass
    /// compose path when present.
    pub hue_rotate_degrees: Option<f32>,
}

impl BlitParams {
    /// Creates opaque, unrotated blit parameters.
    #[must_use]
    pub const fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            size,
            alpha: 1.0,
            flip_horizontal: false,
            hue_rotate_degrees: None,
        }
    }

    /// Overrides the alpha multiplier.
    #[must_use]
    pub const fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    /// Overrides the horizontal mirroring flag.
    #[must_use]
    pub const fn with_flip_horizontal(mut self, flip: bool) -> Self {
        self.flip_horizontal = flip;
        self
    }

    /// Overrides the hue rotation.
    #[must_use]
    pub const fn with_hue_rotation(mut self, degrees: Option<f32>) -> Self {
        self.hue_rotate_degrees = degrees;
        self
    }
}

/// Pixel-addressable 2-D drawing surface owned by one renderer.
///
/// Hue-rotated blits cannot be expressed as a single direct draw call on
/// most 2-D APIs; backends implement them as a two-pass compose through a
/// private scratch surface.
pub trait Surface {
    /// Clears the whole surface ahead of repainting a frame.
    fn clear(&mut self);

    /// Draws one sprite scaled into the destination rectangle.
    fn blit(&mut self, sprite: SpriteKey, params: BlitParams) -> AnyResult<()>;
}

/// Cancellable handle to one scheduled frame callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

impl FrameHandle {
    /// Creates a handle with the provided backend-assigned identity.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Backend-assigned identity of the handle.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Non-blocking "run before the next repaint" scheduling primitive.
///
/// The renderer holds at most one outstanding handle and always cancels it
/// before requesting another, so two draw chains can never overlap on the
/// same surface.
pub trait FrameClock {
    /// Requests one callback before the next repaint.
    fn request_frame(&mut self) -> FrameHandle;

    /// Cancels a previously requested callback.
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Converts simulator snapshots into an animated presentation.
///
/// The renderer exclusively owns its surface, frame clock, and display
/// list; there is exactly one logical writer, so no locking is involved.
#[derive(Debug)]
pub struct Renderer<S, C> {
    surface: S,
    clock: C,
    cell_size: f32,
    width: f32,
    height: f32,
    items: Vec<RendererItem>,
    pending: Option<FrameHandle>,
}

impl<S, C> Renderer<S, C>
where
    S: Surface,
    C: FrameClock,
{
    /// Creates a renderer for a board of `columns` × `rows` cells.
    ///
    /// Returns an error when the cell size is not strictly positive; a
    /// backend that failed to produce its drawing context reports
    /// [`RenderingError::SurfaceUnavailable`] before ever reaching here.
    pub fn new(
        surface: S,
        clock: C,
        columns: u32,
        rows: u32,
        cell_size: f32,
    ) -> Result<Self, RenderingError> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(RenderingError::InvalidCellSize { cell_size });
        }

        Ok(Self {
            surface,
            clock,
            cell_size,
            width: columns as f32 * cell_size,
            height: rows as f32 * cell_size,
            items: Vec::new(),
            pending: None,
        })
    }

    /// Renders one simulator snapshot and (re)starts the draw loop.
    ///
    /// Any frame still pending from a previous loop is cancelled before the
    /// display list is rebuilt, so overlapping draw chains cannot occur.
    pub fn render(&mut self, simulator: &Simulator, now: Instant) -> AnyResult<()> {
        if let Some(handle) = self.pending.take() {
            self.clock.cancel_frame(handle);
        }
        self.register(simulator, now);
        self.draw(now)
    }

    /// Scheduled-callback entry invoked when a requested frame fires.
    ///
    /// The pending handle is consumed before anything is drawn; a stale
    /// callback arriving after cancellation is ignored.
    pub fn frame(&mut self, now: Instant) -> AnyResult<()> {
        if self.pending.take().is_none() {
            return Ok(());
        }
        self.draw(now)
    }

    /// Redraws the current display list without altering frame scheduling.
    ///
    /// Continuously-presenting backends call this on repaints that fall
    /// outside the animation loop, so an idle scene stays on screen.
    pub fn repaint(&mut self, now: Instant) -> AnyResult<()> {
        self.draw_items(now)
    }

    /// Reports whether a frame callback is currently scheduled.
    #[must_use]
    pub const fn has_pending_frame(&self) -> bool {
        self.pending.is_some()
    }

    /// Current display list, background first.
    #[must_use]
    pub fn items(&self) -> &[RendererItem] {
        &self.items
    }

    /// Gives the backend access to its surface between frames.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    fn draw(&mut self, now: Instant) -> AnyResult<()> {
        self.draw_items(now)?;

        if self.items.iter().any(|item| item.in_motion(now)) {
            self.pending = Some(self.clock.request_frame());
        }

        Ok(())
    }

    fn draw_items(&mut self, now: Instant) -> AnyResult<()> {
        self.surface.clear();

        for item in &self.items {
            let params = BlitParams::new(item.position_at(now), Vec2::new(item.width(), item.height()))
                .with_alpha(item.alpha())
                .with_flip_horizontal(item.has_effect(EffectKind::FlipHorizontal))
                .with_hue_rotation(item.hue_rotation());
            self.surface.blit(item.sprite_at(now), params)?;
        }

        Ok(())
    }

    fn register(&mut self, simulator: &Simulator, now: Instant) {
        self.items.clear();
        self.register_background();
        for entity in simulator.all_entities() {
            self.register_entity(entity, now);
        }
    }

    fn register_background(&mut self) {
        self.items.push(
            RendererItem::new(SpriteKey::Background, Vec2::ZERO, self.width, self.height)
                .with_effect(RendererEffect::Opacity {
                    value: BACKGROUND_OPACITY,
                }),
        );
    }

    fn register_entity(&mut self, entity: &Entity, now: Instant) {
        // Already-resolved deaths carry no changes and are not redrawn.
        if entity.dead() && !entity.has_changes() {
            return;
        }

        let mut position = Vec2::new(
            entity.position().x() as f32 * self.cell_size,
            entity.position().y() as f32 * self.cell_size,
        );
        let mut item = RendererItem::new(
            sprite_for(entity),
            position,
            self.cell_size,
            self.cell_size,
        );

        if entity.has_change(ChangeKind::Hit) {
            item = item.with_effect(RendererEffect::HueRotate {
                degrees: HIT_HUE_ROTATE_DEGREES,
            });
        }

        if let Ok(&Change::Walking { from, to }) = entity.change(ChangeKind::Walking) {
            // The item starts where the walk began and animates towards the
            // destination over the shared replay interval.
            position = Vec2::new(
                from.x() as f32 * self.cell_size,
                from.y() as f32 * self.cell_size,
            );
            item = RendererItem::new(
                sprite_for(entity),
                position,
                self.cell_size,
                self.cell_size,
            )
            .with_effect(RendererEffect::Move {
                to: Vec2::new(
                    to.x() as f32 * self.cell_size,
                    to.y() as f32 * self.cell_size,
                ),
                duration: REPLAY_SPEED,
                started_at: now,
            });
            if entity.has_change(ChangeKind::Hit) {
                item = item.with_effect(RendererEffect::HueRotate {
                    degrees: HIT_HUE_ROTATE_DEGREES,
                });
            }
        }

        self.items.push(item);
    }
}

/// Selects the visual resource for an entity by kind and sub-state.
#[must_use]
pub fn sprite_for(entity: &Entity) -> SpriteKey {
    match entity.kind() {
        EntityKind::Box => SpriteKey::Box,
        EntityKind::Landmine => SpriteKey::Landmine,
        EntityKind::Player => SpriteKey::Player,
        EntityKind::Rock => SpriteKey::Rock,
        EntityKind::Zombie => {
            if entity.has_change(ChangeKind::Killed) {
                SpriteKey::ZombieDead
            } else if entity.has_change(ChangeKind::Walking) {
                SpriteKey::ZombieWalking
            } else {
                SpriteKey::Zombie
            }
        }
    }
}

/// Errors surfaced while constructing rendering state.
#[derive(Debug, PartialEq)]
pub enum RenderingError {
    /// Cell size must be a positive, finite number of screen units.
    InvalidCellSize {
        /// Provided cell size that failed validation.
        cell_size: f32,
    },
    /// The backend could not produce a 2-D drawing context.
    SurfaceUnavailable {
        /// Backend-specific description of the failure.
        detail: String,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCellSize { cell_size } => {
                write!(f, "cell_size must be positive (received {cell_size})")
            }
            Self::SurfaceUnavailable { detail } => {
                write!(f, "unable to acquire a 2d drawing context: {detail}")
            }
        }
    }
}

impl Error for RenderingError {}

#[cfg(test)]
mod tests {
    use super::*;
    use outbreak_core::{CandidateSolution, Grid, Position};
    use std::{cell::RefCell, rc::Rc};

    #[derive(Clone, Debug, Default)]
    struct RecordingSurface {
        blits: Rc<RefCell<Vec<(SpriteKey, BlitParams)>>>,
        clears: Rc<RefCell<u32>>,
    }

    impl Surface for RecordingSurface {
        fn clear(&mut self) {
            *self.clears.borrow_mut() += 1;
        }

        fn blit(&mut self, sprite: SpriteKey, params: BlitParams) -> AnyResult<()> {
            self.blits.borrow_mut().push((sprite, params));
            Ok(())
        }
    }

    #[derive(Clone, Debug, Default)]
    struct RecordingClock {
        next: Rc<RefCell<u64>>,
        cancelled: Rc<RefCell<Vec<FrameHandle>>>,
    }

    impl FrameClock for RecordingClock {
        fn request_frame(&mut self) -> FrameHandle {
            let mut next = self.next.borrow_mut();
            *next += 1;
            FrameHandle::new(*next)
        }

        fn cancel_frame(&mut self, handle: FrameHandle) {
            self.cancelled.borrow_mut().push(handle);
        }
    }

    fn renderer(
        columns: u32,
        rows: u32,
    ) -> (Renderer<RecordingSurface, RecordingClock>, RecordingSurface, RecordingClock) {
        let surface = RecordingSurface::default();
        let clock = RecordingClock::default();
        let renderer = Renderer::new(surface.clone(), clock.clone(), columns, rows, 64.0)
            .expect("valid cell size");
        (renderer, surface, clock)
    }

    fn stepped_simulator() -> Simulator {
        // Player kills the zombie with its first move; the rock idles.
        let grid = Grid::parse("Z \nR ").expect("valid grid");
        let mut simulator = Simulator::from_grid(&grid).expect("valid map");
        simulator
            .begin(&CandidateSolution::new(
                vec![Position::new(1, 0), Position::new(0, 0)],
                vec![],
            ))
            .expect("valid setup");
        let _ = simulator.step().expect("valid move");
        simulator
    }

    #[test]
    fn renderer_rejects_non_positive_cell_sizes() {
        let error = Renderer::new(
            RecordingSurface::default(),
            RecordingClock::default(),
            2,
            2,
            0.0,
        )
        .expect_err("zero cell size must be rejected");
        assert!(matches!(
            error,
            RenderingError::InvalidCellSize { .. }
        ));
    }

    #[test]
    fn move_interpolation_starts_at_origin_and_ends_exactly_on_target() {
        let start = Instant::now();
        let item = RendererItem::new(SpriteKey::Player, Vec2::new(0.0, 0.0), 64.0, 64.0)
            .with_effect(RendererEffect::Move {
                to: Vec2::new(64.0, 0.0),
                duration: Duration::from_millis(100),
                started_at: start,
            });

        assert_eq!(item.position_at(start), Vec2::new(0.0, 0.0));
        assert_eq!(
            item.position_at(start + Duration::from_millis(50)),
            Vec2::new(32.0, 0.0)
        );
        assert_eq!(
            item.position_at(start + Duration::from_millis(100)),
            Vec2::new(64.0, 0.0)
        );
        // No overshoot past the duration.
        assert_eq!(
            item.position_at(start + Duration::from_secs(5)),
            Vec2::new(64.0, 0.0)
        );
    }

    #[test]
    fn opacity_maps_percentages_onto_alpha() {
        let item = RendererItem::new(SpriteKey::Background, Vec2::ZERO, 10.0, 10.0)
            .with_effect(RendererEffect::Opacity { value: 50.0 });
        assert!((item.alpha() - 0.5).abs() < f32::EPSILON);

        let plain = RendererItem::new(SpriteKey::Rock, Vec2::ZERO, 10.0, 10.0);
        assert!((plain.alpha() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn effect_lookup_fails_fast_for_absent_kinds() {
        let item = RendererItem::new(SpriteKey::Rock, Vec2::ZERO, 10.0, 10.0);
        let error = item
            .effect(EffectKind::Move)
            .expect_err("missing effect must be reported");
        assert_eq!(error.kind(), EffectKind::Move);
    }

    #[test]
    fn asset_swap_cycles_until_its_duration_elapses() {
        let start = Instant::now();
        let item = RendererItem::new(SpriteKey::Zombie, Vec2::ZERO, 10.0, 10.0).with_effect(
            RendererEffect::AssetSwap {
                steps: vec![SpriteKey::Zombie, SpriteKey::ZombieWalking],
                every: Duration::from_millis(100),
                duration: Duration::from_millis(400),
                started_at: start,
            },
        );

        assert_eq!(item.sprite_at(start), SpriteKey::Zombie);
        assert_eq!(
            item.sprite_at(start + Duration::from_millis(150)),
            SpriteKey::ZombieWalking
        );
        assert_eq!(
            item.sprite_at(start + Duration::from_millis(500)),
            SpriteKey::Zombie
        );
    }

    #[test]
    fn display_list_starts_with_the_background() {
        let simulator = stepped_simulator();
        let (mut renderer, _surface, _clock) = renderer(2, 2);
        renderer.render(&simulator, Instant::now()).expect("draw ok");

        let items = renderer.items();
        assert_eq!(items[0].sprite(), SpriteKey::Background);
        assert!(items[0].has_effect(EffectKind::Opacity));
    }

    #[test]
    fn killed_zombies_render_once_with_death_sprite_and_tint() {
        let simulator = stepped_simulator();
        let (mut renderer, _surface, _clock) = renderer(2, 2);
        renderer.render(&simulator, Instant::now()).expect("draw ok");

        let dead: Vec<_> = renderer
            .items()
            .iter()
            .filter(|item| item.sprite() == SpriteKey::ZombieDead)
            .collect();
        assert_eq!(dead.len(), 1);
        assert!(dead[0].has_effect(EffectKind::HueRotate));
    }

    #[test]
    fn resolved_deaths_are_omitted_from_the_display_list() {
        let mut simulator = stepped_simulator();
        // The next step clears the death changes; nothing pends any more.
        let _ = simulator.step().expect("no pending moves");

        let (mut renderer, _surface, _clock) = renderer(2, 2);
        renderer.render(&simulator, Instant::now()).expect("draw ok");

        assert!(renderer
            .items()
            .iter()
            .all(|item| item.sprite() != SpriteKey::ZombieDead
                && item.sprite() != SpriteKey::Zombie));
        // Background, rock, player remain.
        assert_eq!(renderer.items().len(), 3);
    }

    #[test]
    fn walking_entities_start_from_their_origin_cell() {
        let grid = Grid::parse("  \n  ").expect("valid grid");
        let mut simulator = Simulator::from_grid(&grid).expect("valid map");
        simulator
            .begin(&CandidateSolution::new(
                vec![Position::new(0, 0), Position::new(1, 0)],
                vec![],
            ))
            .expect("valid setup");
        let _ = simulator.step().expect("valid move");

        let now = Instant::now();
        let (mut renderer, _surface, _clock) = renderer(2, 2);
        renderer.render(&simulator, now).expect("draw ok");

        let player = renderer
            .items()
            .iter()
            .find(|item| item.sprite() == SpriteKey::Player)
            .expect("player item expected");
        assert_eq!(player.position(), Vec2::new(0.0, 0.0));
        match player.effect(EffectKind::Move).expect("move attached") {
            RendererEffect::Move { to, duration, .. } => {
                assert_eq!(*to, Vec2::new(64.0, 0.0));
                assert_eq!(*duration, REPLAY_SPEED);
            }
            _ => unreachable!(),
        }
        assert!(player.in_motion(now));
    }

    #[test]
    fn draw_loop_reschedules_only_while_items_are_in_motion() {
        let grid = Grid::parse("  \n  ").expect("valid grid");
        let mut simulator = Simulator::from_grid(&grid).expect("valid map");
        simulator
            .begin(&CandidateSolution::new(
                vec![Position::new(0, 0), Position::new(1, 0)],
                vec![],
            ))
            .expect("valid setup");
        let _ = simulator.step().expect("valid move");

        let now = Instant::now();
        let (mut renderer, _surface, _clock) = renderer(2, 2);
        renderer.render(&simulator, now).expect("draw ok");
        assert!(renderer.has_pending_frame());

        // Mid-motion frames keep the chain alive.
        renderer
            .frame(now + REPLAY_SPEED / 2)
            .expect("frame draws");
        assert!(renderer.has_pending_frame());

        // Once every motion has completed the loop goes idle.
        renderer
            .frame(now + REPLAY_SPEED + Duration::from_millis(1))
            .expect("frame draws");
        assert!(!renderer.has_pending_frame());
    }

    #[test]
    fn rendering_again_cancels_the_pending_frame_first() {
        let grid = Grid::parse("  \n  ").expect("valid grid");
        let mut simulator = Simulator::from_grid(&grid).expect("valid map");
        simulator
            .begin(&CandidateSolution::new(
                vec![
                    Position::new(0, 0),
                    Position::new(1, 0),
                    Position::new(1, 1),
                ],
                vec![],
            ))
            .expect("valid setup");
        let _ = simulator.step().expect("valid move");

        let now = Instant::now();
        let (mut renderer, _surface, clock) = renderer(2, 2);
        renderer.render(&simulator, now).expect("draw ok");
        assert!(renderer.has_pending_frame());

        let _ = simulator.step().expect("valid move");
        renderer.render(&simulator, now).expect("draw ok");

        let cancelled = clock.cancelled.borrow();
        assert_eq!(cancelled.as_slice(), &[FrameHandle::new(1)]);
        assert!(renderer.has_pending_frame());
    }

    #[test]
    fn repaint_redraws_without_scheduling_a_frame() {
        let simulator = stepped_simulator();
        let (mut renderer, surface, _clock) = renderer(2, 2);
        renderer.render(&simulator, Instant::now()).expect("draw ok");
        assert!(!renderer.has_pending_frame());

        let blits_after_render = surface.blits.borrow().len();
        renderer.repaint(Instant::now()).expect("repaint draws");
        assert!(surface.blits.borrow().len() > blits_after_render);
        assert!(!renderer.has_pending_frame());
    }

    #[test]
    fn stale_frame_callbacks_are_ignored() {
        let simulator = stepped_simulator();
        let (mut renderer, surface, _clock) = renderer(2, 2);
        renderer.render(&simulator, Instant::now()).expect("draw ok");

        let clears_after_render = *surface.clears.borrow();
        renderer.frame(Instant::now()).expect("no-op");
        // Nothing pends for this snapshot, so no extra clear happened.
        assert_eq!(*surface.clears.borrow(), clears_after_render);
    }

    #[test]
    fn blits_respect_list_order_and_alpha() {
        let simulator = stepped_simulator();
        let (mut renderer, surface, _clock) = renderer(2, 2);
        renderer.render(&simulator, Instant::now()).expect("draw ok");

        let blits = surface.blits.borrow();
        assert_eq!(blits[0].0, SpriteKey::Background);
        assert!((blits[0].1.alpha - 0.5).abs() < f32::EPSILON);
        assert!(blits.len() > 1);
    }
}
