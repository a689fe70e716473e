//! Audio hardware seam
//!
//! The manager only ever talks to these traits. The browser implementation
//! wraps Web Audio (`platform::web`); `NullAudioPlatform` stands in where no
//! audio hardware exists and always fails to open.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

/// Boxed future run on the platform's single-threaded executor
pub type LocalBoxFuture<T> = Pin<Box<dyn Future<Output = T>>>;

/// Audio failures. These never leave the audio manager.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioError {
    /// Hardware handle could not be constructed
    #[error("audio hardware unavailable: {0}")]
    Unavailable(String),

    /// Oscillator or gain construction failed
    #[error("failed to create {node} node: {message}")]
    NodeCreation {
        /// Kind of node
        node: &'static str,
        /// Host error message
        message: String,
    },

    /// Connecting two nodes failed
    #[error("failed to route audio graph: {0}")]
    Routing(String),

    /// Starting playback failed
    #[error("failed to schedule playback: {0}")]
    Scheduling(String),

    /// No device or graph to play through
    #[error("audio graph not ready")]
    NotReady,
}

/// Result type for audio operations.
pub type AudioResult<T> = Result<T, AudioError>;

/// Oscillator wave shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// Amplitude control node
pub trait GainControl {
    /// Jump to `value` at device time `time`
    fn set_value_at(&self, value: f32, time: f64);
    /// Exponential ramp from the previous value, reaching `value` at `time`
    fn exponential_ramp_to(&self, value: f32, time: f64);
    /// Route this node's output into `target`
    fn connect(&self, target: &Self) -> AudioResult<()>;
}

/// Periodic waveform generator with a bounded lifetime
pub trait OscillatorControl {
    type Gain: GainControl;

    fn set_frequency_at(&self, hz: f32, time: f64);
    fn exponential_ramp_frequency_to(&self, hz: f32, time: f64);
    fn connect(&self, gain: &Self::Gain) -> AudioResult<()>;
    fn start_at(&self, time: f64) -> AudioResult<()>;
    /// Stop at `time`. Stopping twice is harmless.
    fn stop_at(&self, time: f64);
    /// Called once playback ends, whether naturally or through `stop_at`
    fn on_ended(&self, callback: Box<dyn FnOnce()>);
}

/// An opened audio hardware handle
pub trait AudioDevice {
    type Gain: GainControl;
    type Oscillator: OscillatorControl<Gain = Self::Gain>;

    /// Device clock in seconds
    fn current_time(&self) -> f64;
    fn is_suspended(&self) -> bool;
    /// Fire-and-forget resume
    fn resume(&self);
    fn close(&self);
    fn create_gain(&self) -> AudioResult<Self::Gain>;
    fn create_oscillator(&self, waveform: Waveform) -> AudioResult<Self::Oscillator>;
    /// Route a gain node to the speakers
    fn connect_to_output(&self, gain: &Self::Gain) -> AudioResult<()>;
}

/// Host services the audio manager needs
pub trait AudioPlatform: Clone + 'static {
    type Device: AudioDevice + 'static;

    /// Construct the hardware handle. Must be called inside a user gesture on
    /// platforms that gate audio.
    fn open(&self) -> AudioResult<Self::Device>;
    /// Device-class hint used to pick unlock timings
    fn is_mobile(&self) -> bool;
    fn sleep(&self, ms: u32) -> LocalBoxFuture<()>;
    /// Run a task on the local executor without blocking the caller
    fn spawn(&self, task: LocalBoxFuture<()>);
}

/// Platform with no audio hardware
///
/// `open` always fails, so a manager built on it settles in `Failed` and every
/// sound request is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAudioPlatform;

/// Uninhabited device type for `NullAudioPlatform`
#[derive(Debug)]
pub enum NullDevice {}

impl GainControl for NullDevice {
    fn set_value_at(&self, _value: f32, _time: f64) {
        match *self {}
    }

    fn exponential_ramp_to(&self, _value: f32, _time: f64) {
        match *self {}
    }

    fn connect(&self, _target: &Self) -> AudioResult<()> {
        match *self {}
    }
}

impl OscillatorControl for NullDevice {
    type Gain = NullDevice;

    fn set_frequency_at(&self, _hz: f32, _time: f64) {
        match *self {}
    }

    fn exponential_ramp_frequency_to(&self, _hz: f32, _time: f64) {
        match *self {}
    }

    fn connect(&self, _gain: &Self::Gain) -> AudioResult<()> {
        match *self {}
    }

    fn start_at(&self, _time: f64) -> AudioResult<()> {
        match *self {}
    }

    fn stop_at(&self, _time: f64) {
        match *self {}
    }

    fn on_ended(&self, _callback: Box<dyn FnOnce()>) {
        match *self {}
    }
}

impl AudioDevice for NullDevice {
    type Gain = NullDevice;
    type Oscillator = NullDevice;

    fn current_time(&self) -> f64 {
        match *self {}
    }

    fn is_suspended(&self) -> bool {
        match *self {}
    }

    fn resume(&self) {
        match *self {}
    }

    fn close(&self) {
        match *self {}
    }

    fn create_gain(&self) -> AudioResult<Self::Gain> {
        match *self {}
    }

    fn create_oscillator(&self, _waveform: Waveform) -> AudioResult<Self::Oscillator> {
        match *self {}
    }

    fn connect_to_output(&self, _gain: &Self::Gain) -> AudioResult<()> {
        match *self {}
    }
}

impl AudioPlatform for NullAudioPlatform {
    type Device = NullDevice;

    fn open(&self) -> AudioResult<Self::Device> {
        Err(AudioError::Unavailable("no audio hardware on this platform".into()))
    }

    fn is_mobile(&self) -> bool {
        false
    }

    fn sleep(&self, _ms: u32) -> LocalBoxFuture<()> {
        Box::pin(std::future::ready(()))
    }

    fn spawn(&self, _task: LocalBoxFuture<()>) {
        log::debug!("No executor on the null audio platform; dropping task");
    }
}
