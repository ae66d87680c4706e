#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Macroquad-backed replay window for Outbreak.
//!
//! Macroquad's optional audio stack depends on native ALSA development
//! libraries, which are unavailable in the containerised CI environment.
//! To keep `cargo test` usable everywhere we depend on macroquad without its
//! default `audio` feature. Consumers that need sound playback can opt back
//! in by enabling `macroquad/audio` in their own `Cargo.toml` dependency
//! specification.
//!
//! The window replays one candidate solution against a seed map: every
//! replay interval the simulator advances one step and the shared renderer
//! animates the recorded changes. Hue-rotated blits go through a fragment
//! material because the 2-D draw path has no colour-matrix stage.

/// Sprite manifest parsing and texture atlas loading.
pub mod sprites;

use anyhow::{Context, Result};
use glam::Vec2;
use macroquad::{
    color::{Color as MacroquadColor, BLACK, WHITE},
    input::{is_key_pressed, KeyCode},
    material::{gl_use_default_material, gl_use_material, load_material, Material, MaterialParams},
    math::Vec2 as MacroquadVec2,
    miniquad::UniformType,
    text::draw_text,
    texture::{draw_texture_ex, DrawTextureParams},
    time::get_frame_time,
    window::{clear_background, next_frame},
};
use outbreak_core::{CandidateSolution, Grid, StepStatus};
use outbreak_rendering::{
    BlitParams, FrameClock, FrameHandle, Renderer, SpriteKey, Surface, REPLAY_SPEED,
};
use outbreak_simulator::Simulator;
use std::{
    sync::mpsc,
    time::{Duration, Instant},
};

use self::sprites::SpriteAtlas;

const WINDOW_SIZE: i32 = 960;

const HUE_VERTEX_SHADER: &str = r#"#version 100
attribute vec3 position;
attribute vec2 texcoord;
attribute vec4 color0;
varying lowp vec2 uv;
varying lowp vec4 color;
uniform mat4 Model;
uniform mat4 Projection;
void main() {
    gl_Position = Projection * Model * vec4(position, 1);
    uv = texcoord;
    color = color0 / 255.0;
}
"#;

const HUE_FRAGMENT_SHADER: &str = r#"#version 100
precision lowp float;
varying vec2 uv;
varying vec4 color;
uniform sampler2D Texture;
uniform float HueShift;
void main() {
    vec4 texel = texture2D(Texture, uv) * color;
    float c = cos(HueShift);
    float s = sin(HueShift);
    mat3 rotate = mat3(
        0.299 + 0.701 * c + 0.168 * s, 0.587 - 0.587 * c + 0.330 * s, 0.114 - 0.114 * c - 0.497 * s,
        0.299 - 0.299 * c - 0.328 * s, 0.587 + 0.413 * c + 0.035 * s, 0.114 - 0.114 * c + 0.292 * s,
        0.299 - 0.300 * c + 1.250 * s, 0.587 - 0.588 * c - 1.050 * s, 0.114 + 0.886 * c - 0.203 * s
    );
    gl_FragColor = vec4(clamp(texel.rgb * rotate, 0.0, 1.0), texel.a);
}
"#;

/// Decides when the next simulation step is due during a replay.
///
/// The first query fires immediately so the opening step is visible as soon
/// as the window appears; subsequent steps wait out the full interval.
#[derive(Clone, Copy, Debug)]
pub struct ReplaySchedule {
    interval: Duration,
    last_step: Option<Instant>,
}

impl ReplaySchedule {
    /// Creates a schedule stepping once per `interval`.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_step: None,
        }
    }

    /// Reports whether a step is due, recording the instant when it is.
    pub fn step_due(&mut self, now: Instant) -> bool {
        match self.last_step {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last_step = Some(now);
                true
            }
        }
    }
}

/// Frame bookkeeping for a backend that presents continuously.
///
/// Macroquad repaints every frame on its own, so handles only carry
/// identity; cancellation needs no side effect beyond the renderer dropping
/// the handle.
#[derive(Debug, Default)]
struct RedrawClock {
    next: u64,
}

impl FrameClock for RedrawClock {
    fn request_frame(&mut self) -> FrameHandle {
        self.next += 1;
        FrameHandle::new(self.next)
    }

    fn cancel_frame(&mut self, _handle: FrameHandle) {}
}

/// Drawing surface mapping renderer blits onto macroquad draw calls.
#[derive(Debug)]
struct MacroquadSurface {
    atlas: SpriteAtlas,
    background: MacroquadColor,
    offset: Vec2,
    hue_material: Material,
}

impl Surface for MacroquadSurface {
    fn clear(&mut self) {
        clear_background(self.background);
    }

    fn blit(&mut self, sprite: SpriteKey, params: BlitParams) -> Result<()> {
        let texture = self.atlas.texture(sprite)?;
        let tint = MacroquadColor::new(1.0, 1.0, 1.0, params.alpha.clamp(0.0, 1.0));
        let draw_params = DrawTextureParams {
            dest_size: Some(MacroquadVec2::new(params.size.x, params.size.y)),
            flip_x: params.flip_horizontal,
            ..DrawTextureParams::default()
        };
        let x = self.offset.x + params.position.x;
        let y = self.offset.y + params.position.y;

        match params.hue_rotate_degrees {
            Some(degrees) => {
                self.hue_material.set_uniform("HueShift", degrees.to_radians());
                gl_use_material(self.hue_material.clone());
                draw_texture_ex(texture, x, y, tint, draw_params);
                gl_use_default_material();
            }
            None => draw_texture_ex(texture, x, y, tint, draw_params),
        }

        Ok(())
    }
}

/// Tracks the average frames-per-second produced by the replay loop.
#[derive(Debug, Default)]
struct FpsCounter {
    elapsed: Duration,
    frames: u32,
}

impl FpsCounter {
    /// Records a rendered frame and returns the per-second average once one
    /// second has elapsed.
    fn record_frame(&mut self, frame: Duration) -> Option<f32> {
        self.elapsed += frame;
        self.frames = self.frames.saturating_add(1);

        if self.elapsed < Duration::from_secs(1) {
            return None;
        }

        let seconds = self.elapsed.as_secs_f32();
        let per_second = if seconds <= f32::EPSILON {
            0.0
        } else {
            self.frames as f32 / seconds
        };
        self.elapsed = Duration::ZERO;
        self.frames = 0;
        Some(per_second)
    }
}

/// Replay window implemented on top of macroquad.
#[derive(Clone, Copy, Debug)]
pub struct MacroquadBackend {
    swap_interval: Option<i32>,
    show_fps: bool,
}

impl Default for MacroquadBackend {
    fn default() -> Self {
        Self {
            swap_interval: None,
            show_fps: false,
        }
    }
}

impl MacroquadBackend {
    /// Returns a backend that requests the platform's default swap interval.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the backend to request a specific swap interval from the platform.
    #[must_use]
    pub fn with_swap_interval(mut self, swap_interval: Option<i32>) -> Self {
        self.swap_interval = swap_interval;
        self
    }

    /// Configures the backend to either synchronise presentation with the display refresh rate
    /// or render as fast as possible.
    #[must_use]
    pub fn with_vsync(self, enabled: bool) -> Self {
        let swap_interval = if enabled { Some(1) } else { Some(0) };
        self.with_swap_interval(swap_interval)
    }

    /// Configures whether the backend prints frame timing metrics once per second.
    #[must_use]
    pub fn with_show_fps(mut self, show: bool) -> Self {
        self.show_fps = show;
        self
    }

    /// Opens a window and replays the candidate against the seed map.
    ///
    /// Blocks until the window closes. `Escape` or `Q` quits, `Space`
    /// pauses. A rejected move ends the replay and is reported as an error
    /// once the window has closed.
    pub fn run(self, grid: &Grid, candidate: &CandidateSolution) -> Result<()> {
        let Self {
            swap_interval,
            show_fps,
        } = self;

        let simulator = Simulator::from_grid(grid).map_err(anyhow::Error::new)?;
        let candidate = candidate.clone();

        let mut config = macroquad::window::Conf {
            window_title: String::from("Outbreak"),
            window_width: WINDOW_SIZE,
            window_height: WINDOW_SIZE,
            ..macroquad::window::Conf::default()
        };
        if let Some(swap_interval) = swap_interval {
            config.platform.swap_interval = Some(swap_interval);
        }

        let (outcome_sender, outcome_receiver) = mpsc::channel::<Result<()>>();
        macroquad::Window::from_config(config, async move {
            let outcome = replay_loop(simulator, candidate, show_fps).await;
            let _ = outcome_sender.send(outcome);
        });

        outcome_receiver.recv().unwrap_or(Ok(()))
    }
}

async fn replay_loop(
    mut simulator: Simulator,
    candidate: CandidateSolution,
    show_fps: bool,
) -> Result<()> {
    let atlas = SpriteAtlas::from_default_manifest().context("failed to initialise sprite atlas")?;
    let hue_material = load_material(
        HUE_VERTEX_SHADER,
        HUE_FRAGMENT_SHADER,
        MaterialParams {
            uniforms: vec![(String::from("HueShift"), UniformType::Float1)],
            ..MaterialParams::default()
        },
    )
    .map_err(|error| anyhow::anyhow!("failed to compile hue-rotation shader: {error:?}"))?;

    let columns = simulator.width().max(1);
    let rows = simulator.height().max(1);
    let cell_size = (WINDOW_SIZE as f32 / columns.max(rows) as f32).floor();
    let board = Vec2::new(columns as f32 * cell_size, rows as f32 * cell_size);
    let offset = (Vec2::splat(WINDOW_SIZE as f32) - board) * 0.5;

    let surface = MacroquadSurface {
        atlas,
        background: BLACK,
        offset,
        hue_material,
    };
    let mut renderer = Renderer::new(
        surface,
        RedrawClock::default(),
        simulator.width(),
        simulator.height(),
        cell_size,
    )
    .map_err(anyhow::Error::new)?;

    simulator
        .begin(&candidate)
        .map_err(anyhow::Error::new)
        .context("candidate setup was rejected")?;

    let mut schedule = ReplaySchedule::new(REPLAY_SPEED);
    let mut fps_counter = FpsCounter::default();
    let mut finished = false;
    let mut paused = false;

    loop {
        if is_key_pressed(KeyCode::Escape) || is_key_pressed(KeyCode::Q) {
            break;
        }
        if is_key_pressed(KeyCode::Space) {
            paused = !paused;
        }

        let now = Instant::now();
        if !paused && !finished && schedule.step_due(now) {
            match simulator.step() {
                Ok(StepStatus::Advanced) => renderer.render(&simulator, now)?,
                Ok(_) => {
                    finished = true;
                    renderer.render(&simulator, now)?;
                }
                Err(rejection) => {
                    return Err(anyhow::Error::new(rejection))
                        .context("candidate move was rejected mid-replay");
                }
            }
        } else if renderer.has_pending_frame() {
            renderer.frame(now)?;
        } else {
            renderer.repaint(now)?;
        }

        if paused {
            draw_text("paused", 16.0, 32.0, 32.0, WHITE);
        } else if finished {
            let verdict = if Simulator::is_win(&simulator.to_grid()) {
                "outbreak cleared"
            } else {
                "the horde remains"
            };
            draw_text(verdict, 16.0, 32.0, 32.0, WHITE);
        }

        let frame_dt = Duration::from_secs_f32(get_frame_time().max(0.0));
        if show_fps {
            if let Some(per_second) = fps_counter.record_frame(frame_dt) {
                println!("FPS: {per_second:.2}");
            }
        }

        next_frame().await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_counter_reports_once_per_second() {
        let mut counter = FpsCounter::default();
        for _ in 0..59 {
            assert!(counter.record_frame(Duration::from_millis(16)).is_none());
        }
        let per_second = counter
            .record_frame(Duration::from_millis(64))
            .expect("a second has elapsed");
        assert!(per_second > 0.0);
    }

    #[test]
    fn vsync_toggles_map_onto_swap_intervals() {
        assert_eq!(
            MacroquadBackend::new().with_vsync(true).swap_interval,
            Some(1)
        );
        assert_eq!(
            MacroquadBackend::new().with_vsync(false).swap_interval,
            Some(0)
        );
    }
}
