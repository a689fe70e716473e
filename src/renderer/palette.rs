//! Colors

use crate::consts::{BALL_BASE_SPEED, MAX_SPEED_MULTIPLIER};

/// Linear RGBA, each channel 0.0 - 1.0
pub type Rgba = [f32; 4];

pub const BACKGROUND: Rgba = [0.0, 0.0, 0.0, 1.0];
pub const CENTERLINE: Rgba = [1.0, 1.0, 1.0, 0.5];
pub const PLAYER: Rgba = [1.0, 1.0, 1.0, 1.0];
pub const AI: Rgba = [1.0, 1.0, 1.0, 1.0];

/// Ball tint by speed: white at base speed warming to orange at the cap
pub fn ball_color(speed: f32) -> Rgba {
    let top = BALL_BASE_SPEED * MAX_SPEED_MULTIPLIER;
    let t = ((speed - BALL_BASE_SPEED) / (top - BALL_BASE_SPEED)).clamp(0.0, 1.0);
    [1.0, 1.0 - 0.45 * t, 1.0 - 0.8 * t, 1.0]
}

/// CSS `rgba()` string for canvas fill styles
pub fn css(color: Rgba) -> String {
    let [r, g, b, a] = color;
    format!(
        "rgba({}, {}, {}, {})",
        (r.clamp(0.0, 1.0) * 255.0).round() as u8,
        (g.clamp(0.0, 1.0) * 255.0).round() as u8,
        (b.clamp(0.0, 1.0) * 255.0).round() as u8,
        a.clamp(0.0, 1.0)
    )
}
