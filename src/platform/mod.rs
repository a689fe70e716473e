//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Audio hardware (Web Audio on the web, none natively)
//! - Timers and the local task executor
//! - Drawing surface (canvas 2D)
//! - Device-class detection

#[cfg(target_arch = "wasm32")]
pub mod web;

use crate::audio::NullAudioPlatform;

#[cfg(target_arch = "wasm32")]
pub use web::{CanvasSurface, WebAudioPlatform};

/// Audio platform for builds without audio hardware
pub type NativeAudioPlatform = NullAudioPlatform;
