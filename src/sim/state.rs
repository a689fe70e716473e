//! World and session state
//!
//! The world is owned by the simulation and mutated once per frame. The only
//! outside write is the player paddle's `y`, set by the pointer mapping.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::speed_multiplier;

/// The ball
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub pos: Vec2,
    /// Velocity in pixels per frame (dx, dy)
    pub vel: Vec2,
    pub radius: f32,
    pub base_speed: f32,
    /// Always `base_speed * speed_multiplier(level)`
    pub current_speed: f32,
}

impl Ball {
    pub fn new(center: Vec2) -> Self {
        Self {
            pos: center,
            vel: Vec2::new(BALL_START_DX, BALL_START_DY),
            radius: BALL_RADIUS,
            base_speed: BALL_BASE_SPEED,
            current_speed: BALL_BASE_SPEED,
        }
    }

    /// Leftmost point of the ball
    pub fn left(&self) -> f32 {
        self.pos.x - self.radius
    }

    /// Rightmost point of the ball
    pub fn right(&self) -> f32 {
        self.pos.x + self.radius
    }
}

/// The player's paddle. Only the input mapping moves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paddle {
    /// Top-left corner
    pub pos: Vec2,
    pub width: f32,
    pub height: f32,
}

impl Paddle {
    pub fn new(x: f32, arena_height: f32) -> Self {
        Self {
            pos: Vec2::new(x, (arena_height - PADDLE_HEIGHT) / 2.0),
            width: PADDLE_WIDTH,
            height: PADDLE_HEIGHT,
        }
    }

    pub fn center_y(&self) -> f32 {
        self.pos.y + self.height / 2.0
    }

    /// Highest valid `pos.y` inside an arena of the given height
    pub fn max_y(&self, arena_height: f32) -> f32 {
        (arena_height - self.height).max(0.0)
    }

    /// Whether the ball overlaps this paddle's horizontal span and its center
    /// lies within the vertical span
    pub fn touches(&self, ball: &Ball) -> bool {
        let in_x = ball.left() <= self.pos.x + self.width && ball.right() >= self.pos.x;
        let in_y = ball.pos.y >= self.pos.y && ball.pos.y <= self.pos.y + self.height;
        in_x && in_y
    }

    /// Where the ball struck, from -1 (top edge) to 1 (bottom edge)
    pub fn hit_offset(&self, ball: &Ball) -> f32 {
        let half = self.height / 2.0;
        ((ball.pos.y - self.center_y()) / half).clamp(-1.0, 1.0)
    }
}

/// The computer-controlled paddle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiPaddle {
    pub paddle: Paddle,
    pub base_speed: f32,
    /// Never exceeds the ball's `current_speed`
    pub current_speed: f32,
}

impl AiPaddle {
    pub fn new(x: f32, arena_height: f32) -> Self {
        Self {
            paddle: Paddle::new(x, arena_height),
            base_speed: AI_BASE_SPEED,
            current_speed: AI_BASE_SPEED,
        }
    }
}

/// Playfield dimensions, fixed at initialization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    pub width: f32,
    pub height: f32,
}

impl Arena {
    /// Arenas must have finite, positive dimensions
    pub fn is_valid(width: f32, height: f32) -> bool {
        width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }
}

/// Difficulty tier and its double-increment guard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Difficulty {
    /// Starts at 1, never decreases
    pub speed_level: u32,
    /// Score at which the last level-up happened
    pub last_speed_increase_score: u32,
}

impl Default for Difficulty {
    fn default() -> Self {
        Self {
            speed_level: 1,
            last_speed_increase_score: 0,
        }
    }
}

impl Difficulty {
    pub fn multiplier(&self) -> f32 {
        speed_multiplier(self.speed_level)
    }

    /// AI dead zone in pixels; shrinks as the level rises
    pub fn ai_error_margin(&self) -> f32 {
        (AI_MARGIN_BASE - AI_MARGIN_SLOPE * self.speed_level as f32).max(AI_MARGIN_FLOOR)
    }
}

/// Everything the simulation mutates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub arena: Arena,
    pub ball: Ball,
    pub player: Paddle,
    pub ai: AiPaddle,
    pub difficulty: Difficulty,
}

impl World {
    pub fn new(width: f32, height: f32) -> Self {
        let arena = Arena { width, height };
        Self {
            arena,
            ball: Ball::new(arena.center()),
            player: Paddle::new(PADDLE_MARGIN, height),
            ai: AiPaddle::new(width - PADDLE_MARGIN - PADDLE_WIDTH, height),
            difficulty: Difficulty::default(),
        }
    }
}

/// Per-session counters owned by the controller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub score: u32,
    pub running: bool,
    pub over: bool,
}

/// Which surface a non-scoring bounce came off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitSurface {
    Wall,
    AiPaddle,
}

/// Discrete things that happened during a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Ball bounced off a wall or the AI paddle
    PaddleHit(HitSurface),
    /// Player returned the ball
    Scored { score: u32 },
    /// Difficulty went up
    SpeedUp { level: u32 },
    /// Background loop should rotate its melody
    SwitchMusicVariant,
    /// Player missed
    GameOver { score: u32 },
}
