//! Paddle Rally - single-player paddle game with synthesized audio
//!
//! Core modules:
//! - `sim`: Deterministic simulation (physics, collisions, difficulty)
//! - `audio`: Procedural sound effects and music over an unlockable audio device
//! - `controller`: Lifecycle, frame subscription, input and audio bridging
//! - `renderer`: Drawing the world onto a 2D surface
//! - `platform`: Browser bindings (Web Audio, canvas, timers)
//! - `settings`: Audio levels and unlock timing profiles

pub mod audio;
pub mod controller;
pub mod platform;
pub mod renderer;
pub mod settings;
pub mod sim;

pub use audio::{AudioState, AudioSynthesisManager, MusicTrack, SoundEffect};
pub use controller::{GameLoopController, SessionSnapshot};
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Ball defaults
    pub const BALL_RADIUS: f32 = 8.0;
    pub const BALL_START_DX: f32 = 4.0;
    pub const BALL_START_DY: f32 = 3.0;
    /// Ball base speed equals its initial horizontal speed
    pub const BALL_BASE_SPEED: f32 = BALL_START_DX;

    /// Paddle geometry (shared by player and AI)
    pub const PADDLE_WIDTH: f32 = 10.0;
    pub const PADDLE_HEIGHT: f32 = 80.0;
    /// Gap between the arena edge and each paddle
    pub const PADDLE_MARGIN: f32 = 10.0;

    /// AI paddle chase speed at level 1
    pub const AI_BASE_SPEED: f32 = 3.5;
    /// AI speed relative to the scaled ball speed after a level-up
    pub const AI_SPEED_FACTOR: f32 = 0.8;

    /// Points needed per speed level
    pub const POINTS_PER_LEVEL: u32 = 5;
    /// Speed gain per level (20%)
    pub const SPEED_STEP: f32 = 0.2;
    /// Hard cap on the speed multiplier
    pub const MAX_SPEED_MULTIPLIER: f32 = 2.5;
    /// Music variant rotates every this many levels crossed
    pub const LEVELS_PER_VARIANT: u32 = 3;

    /// Minimum |dy| after a wall bounce
    pub const WALL_MIN_DY: f32 = 1.5;
    /// Random jitter added to dy on wall bounces
    pub const WALL_JITTER: f32 = 0.25;
    /// |dy| range after a paddle hit
    pub const PADDLE_MIN_DY: f32 = 1.0;
    pub const PADDLE_MAX_DY: f32 = 6.0;
    /// dy per unit of normalized hit offset
    pub const PADDLE_ANGLE_FACTOR: f32 = 4.0;
    /// Random jitter added to dy on paddle hits
    pub const PADDLE_JITTER: f32 = 1.0;
    /// Minimum |dy| when the ball respawns after an AI miss
    pub const RESPAWN_MIN_DY: f32 = 2.0;
    /// Range of the random respawn dy
    pub const RESPAWN_DY_RANGE: f32 = 3.0;

    /// AI dead zone: max(floor, base - slope * level)
    pub const AI_MARGIN_FLOOR: f32 = 5.0;
    pub const AI_MARGIN_BASE: f32 = 20.0;
    pub const AI_MARGIN_SLOPE: f32 = 2.0;
}

/// Speed multiplier for a difficulty level (20% per level, capped at 2.5x)
#[inline]
pub fn speed_multiplier(level: u32) -> f32 {
    use consts::{MAX_SPEED_MULTIPLIER, SPEED_STEP};
    let steps = level.saturating_sub(1) as f32;
    (1.0 + steps * SPEED_STEP).min(MAX_SPEED_MULTIPLIER)
}

/// Copy the sign of `sign_of` onto `magnitude`, treating zero as positive
#[inline]
pub fn with_sign(magnitude: f32, sign_of: f32) -> f32 {
    if sign_of < 0.0 { -magnitude.abs() } else { magnitude.abs() }
}
