//! Collision detection and response
//!
//! Walls and paddles only ever change the ball's velocity direction and the
//! vertical angle. Every clamp runs after the random jitter so the angle
//! bounds hold no matter what the RNG produced.

use rand::Rng;

use super::state::{Arena, Ball, Paddle};
use crate::consts::*;
use crate::with_sign;

/// Horizontal walls of the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wall {
    Top,
    Bottom,
}

impl Wall {
    /// Direction of travel away from this wall (+1 is down)
    fn away(self) -> f32 {
        match self {
            Wall::Top => 1.0,
            Wall::Bottom => -1.0,
        }
    }
}

/// Which side of the ball faces the paddle it may hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Paddle on the left edge; ball leaves moving right
    Left,
    /// Paddle on the right edge; ball leaves moving left
    Right,
}

/// Wall the ball currently overlaps, if any
pub fn wall_contact(ball: &Ball, arena: &Arena) -> Option<Wall> {
    if ball.pos.y - ball.radius <= 0.0 {
        Some(Wall::Top)
    } else if ball.pos.y + ball.radius >= arena.height {
        Some(Wall::Bottom)
    } else {
        None
    }
}

/// Reflect off a horizontal wall
///
/// Inverts dy, enforces the minimum angle, adds jitter to break periodic
/// rallies, then re-applies the minimum with the sign pointing into the arena.
pub fn bounce_off_wall<R: Rng>(ball: &mut Ball, wall: Wall, arena: &Arena, rng: &mut R) {
    let mut dy = -ball.vel.y;
    if dy.abs() < WALL_MIN_DY {
        dy = with_sign(WALL_MIN_DY, dy);
    }
    dy += rng.random_range(-WALL_JITTER..=WALL_JITTER);
    ball.vel.y = wall.away() * dy.abs().max(WALL_MIN_DY);

    let min_y = ball.radius;
    let max_y = (arena.height - ball.radius).max(min_y);
    ball.pos.y = ball.pos.y.clamp(min_y, max_y);
}

/// Whether the ball is hitting `paddle` while travelling toward it
pub fn paddle_contact(ball: &Ball, paddle: &Paddle, side: Side) -> bool {
    let approaching = match side {
        Side::Left => ball.vel.x < 0.0,
        Side::Right => ball.vel.x > 0.0,
    };
    approaching && paddle.touches(ball)
}

/// Send the ball back from a paddle
///
/// The new dy depends on where the ball struck: the further from center, the
/// steeper the return.
pub fn deflect_off_paddle<R: Rng>(ball: &mut Ball, paddle: &Paddle, side: Side, rng: &mut R) {
    let offset = paddle.hit_offset(ball);
    let dy = offset * PADDLE_ANGLE_FACTOR + rng.random_range(-PADDLE_JITTER..=PADDLE_JITTER);
    ball.vel.y = with_sign(dy.abs().clamp(PADDLE_MIN_DY, PADDLE_MAX_DY), dy);

    match side {
        Side::Left => {
            ball.vel.x = ball.vel.x.abs();
            ball.pos.x = ball.pos.x.max(paddle.pos.x + paddle.width + ball.radius);
        }
        Side::Right => {
            ball.vel.x = -ball.vel.x.abs();
            ball.pos.x = ball.pos.x.min(paddle.pos.x - ball.radius);
        }
    }
}
