//! Deterministic simulation module
//!
//! All gameplay logic lives here:
//! - One step per rendered frame
//! - Seeded RNG only
//! - No rendering, audio or platform dependencies; audio hears about the
//!   world only through the returned `GameEvent`s

pub mod collision;
pub mod state;
pub mod tick;

pub use collision::{Side, Wall, bounce_off_wall, deflect_off_paddle, paddle_contact, wall_contact};
pub use state::{AiPaddle, Arena, Ball, Difficulty, GameEvent, HitSurface, Paddle, Session, World};
pub use tick::PhysicsSimulation;
