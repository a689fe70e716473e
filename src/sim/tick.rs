//! One simulation step per rendered frame
//!
//! Order matters: difficulty, translation, walls, player paddle, AI paddle,
//! AI movement, then terminal checks. The player paddle is checked after the
//! wall so it wins corner ties.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::collision::{Side, bounce_off_wall, deflect_off_paddle, paddle_contact, wall_contact};
use super::state::{GameEvent, HitSurface, Session, World};
use crate::consts::*;
use crate::with_sign;

/// Owns the world and the RNG that perturbs it
#[derive(Debug, Clone)]
pub struct PhysicsSimulation {
    world: World,
    rng: Pcg32,
}

impl PhysicsSimulation {
    /// Create a simulation for an arena; `seed` drives every random perturbation
    pub fn new(seed: u64, width: f32, height: f32) -> Self {
        Self {
            world: World::new(width, height),
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Put ball and paddles back at their starting positions, level 1
    pub fn initialize(&mut self, width: f32, height: f32) {
        self.world = World::new(width, height);
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Move the player paddle's top edge. The caller maps and clamps input.
    pub fn set_player_y(&mut self, top: f32) {
        self.world.player.pos.y = top;
    }

    /// Advance the world by one frame
    pub fn step(&mut self, session: &mut Session) -> Vec<GameEvent> {
        let mut events = Vec::new();

        self.update_difficulty(session.score, &mut events);

        let world = &mut self.world;
        world.ball.pos += world.ball.vel;

        if let Some(wall) = wall_contact(&world.ball, &world.arena) {
            bounce_off_wall(&mut world.ball, wall, &world.arena, &mut self.rng);
            events.push(GameEvent::PaddleHit(HitSurface::Wall));
        }

        if paddle_contact(&world.ball, &world.player, Side::Left) {
            deflect_off_paddle(&mut world.ball, &world.player, Side::Left, &mut self.rng);
            session.score += 1;
            events.push(GameEvent::Scored {
                score: session.score,
            });
        }

        if paddle_contact(&world.ball, &world.ai.paddle, Side::Right) {
            deflect_off_paddle(&mut world.ball, &world.ai.paddle, Side::Right, &mut self.rng);
            events.push(GameEvent::PaddleHit(HitSurface::AiPaddle));
        }

        move_ai(world);

        if world.ball.pos.x < 0.0 {
            session.over = true;
            session.running = false;
            log::info!(
                "Game over at score {} (level {})",
                session.score,
                world.difficulty.speed_level
            );
            events.push(GameEvent::GameOver {
                score: session.score,
            });
        } else if world.ball.pos.x > world.arena.width {
            self.respawn_ball();
        }

        events
    }

    /// Raise the speed level once per 5-point threshold
    ///
    /// The watermark stops the same score from triggering twice when it is
    /// evaluated on consecutive frames.
    pub fn update_difficulty(&mut self, score: u32, events: &mut Vec<GameEvent>) {
        let difficulty = &mut self.world.difficulty;
        let score_level = score / POINTS_PER_LEVEL;
        if score_level <= difficulty.speed_level - 1 || score <= difficulty.last_speed_increase_score
        {
            return;
        }

        let previous = difficulty.multiplier();
        difficulty.speed_level += 1;
        difficulty.last_speed_increase_score = score;
        let level = difficulty.speed_level;
        let multiplier = difficulty.multiplier();

        let ball = &mut self.world.ball;
        ball.current_speed = ball.base_speed * multiplier;
        ball.vel.x = with_sign(ball.current_speed, ball.vel.x);
        ball.vel.y *= multiplier / previous;

        let ai = &mut self.world.ai;
        ai.current_speed = (ai.base_speed * multiplier * AI_SPEED_FACTOR).min(ball.current_speed);

        log::debug!(
            "Speed level {} (x{:.1}), ball {:.2}, ai {:.2}",
            level,
            multiplier,
            ball.current_speed,
            ai.current_speed
        );
        events.push(GameEvent::SpeedUp { level });
        if (level - 1) % LEVELS_PER_VARIANT == 0 {
            events.push(GameEvent::SwitchMusicVariant);
        }
    }

    /// Serve from center toward the player after the AI misses
    fn respawn_ball(&mut self) {
        let center = self.world.arena.center();
        let dy = self.rng.random_range(-RESPAWN_DY_RANGE..=RESPAWN_DY_RANGE);
        let ball = &mut self.world.ball;
        ball.pos = center;
        ball.vel = Vec2::new(
            -ball.current_speed,
            with_sign(dy.abs().max(RESPAWN_MIN_DY), dy),
        );
    }
}

/// AI chases the ball but ignores small offsets
fn move_ai(world: &mut World) {
    let margin = world.difficulty.ai_error_margin();
    let max_y = world.ai.paddle.max_y(world.arena.height);
    let ai = &mut world.ai;

    let diff = world.ball.pos.y - ai.paddle.center_y();
    if diff.abs() > margin {
        ai.paddle.pos.y += diff.signum() * ai.current_speed.min(diff.abs());
    }
    ai.paddle.pos.y = ai.paddle.pos.y.clamp(0.0, max_y);
}
