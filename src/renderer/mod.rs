//! 2D rendering
//!
//! The world is drawn through the `Surface` trait: a cleared background, a
//! dashed centerline, two rectangular paddles and a round ball. The browser
//! implementation sits on a canvas 2D context (`platform::web`).

pub mod palette;

use glam::Vec2;

pub use palette::{Rgba, ball_color};

use crate::sim::World;

/// Dash pattern of the centerline
pub const CENTERLINE_DASH: f32 = 10.0;
pub const CENTERLINE_GAP: f32 = 10.0;
pub const CENTERLINE_WIDTH: f32 = 2.0;

/// Minimal immediate-mode drawing target
pub trait Surface {
    fn width(&self) -> f32;
    fn height(&self) -> f32;
    fn clear(&mut self, color: Rgba);
    fn fill_rect(&mut self, pos: Vec2, size: Vec2, color: Rgba);
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Rgba);
    /// Full-height dashed line at `x`
    fn dashed_vertical_line(&mut self, x: f32, dash: f32, gap: f32, width: f32, color: Rgba);
}

/// Draw one frame of the world
pub fn draw_world<S: Surface + ?Sized>(surface: &mut S, world: &World) {
    surface.clear(palette::BACKGROUND);
    surface.dashed_vertical_line(
        world.arena.width / 2.0,
        CENTERLINE_DASH,
        CENTERLINE_GAP,
        CENTERLINE_WIDTH,
        palette::CENTERLINE,
    );

    let player = &world.player;
    surface.fill_rect(
        player.pos,
        Vec2::new(player.width, player.height),
        palette::PLAYER,
    );
    let ai = &world.ai.paddle;
    surface.fill_rect(ai.pos, Vec2::new(ai.width, ai.height), palette::AI);

    let ball = &world.ball;
    surface.fill_circle(ball.pos, ball.radius, ball_color(ball.current_speed));
}

/// Draw an empty arena (nothing mounted yet)
pub fn draw_blank<S: Surface + ?Sized>(surface: &mut S) {
    surface.clear(palette::BACKGROUND);
}
