//! Browser bindings
//!
//! `AudioContext` creation must happen inside a user gesture; everything else
//! here is plain Web Audio node plumbing.

use glam::Vec2;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    AudioContext, AudioContextState, CanvasRenderingContext2d, GainNode, OscillatorNode,
    OscillatorType,
};

use crate::audio::{
    AudioDevice, AudioError, AudioPlatform, AudioResult, GainControl, LocalBoxFuture,
    OscillatorControl, Waveform,
};
use crate::renderer::palette::css;
use crate::renderer::{Rgba, Surface};
use crate::settings::is_mobile_user_agent;

fn js_message(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{:?}", err))
}

/// Web Audio backed platform
#[derive(Debug, Clone, Copy)]
pub struct WebAudioPlatform {
    mobile: bool,
}

impl WebAudioPlatform {
    /// Classify the device from the browser's user agent
    pub fn detect() -> Self {
        let user_agent = web_sys::window()
            .and_then(|w| w.navigator().user_agent().ok())
            .unwrap_or_default();
        let mobile = is_mobile_user_agent(&user_agent);
        log::info!("Audio device class: {}", if mobile { "mobile" } else { "desktop" });
        Self { mobile }
    }
}

impl AudioPlatform for WebAudioPlatform {
    type Device = WebAudioDevice;

    fn open(&self) -> AudioResult<Self::Device> {
        AudioContext::new()
            .map(|ctx| WebAudioDevice { ctx })
            .map_err(|e| AudioError::Unavailable(js_message(&e)))
    }

    fn is_mobile(&self) -> bool {
        self.mobile
    }

    fn sleep(&self, ms: u32) -> LocalBoxFuture<()> {
        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            let scheduled = web_sys::window().and_then(|w| {
                w.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms as i32)
                    .ok()
            });
            if scheduled.is_none() {
                let _ = resolve.call0(&JsValue::NULL);
            }
        });
        Box::pin(async move {
            let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
        })
    }

    fn spawn(&self, task: LocalBoxFuture<()>) {
        wasm_bindgen_futures::spawn_local(task);
    }
}

/// An open `AudioContext`
pub struct WebAudioDevice {
    ctx: AudioContext,
}

pub struct WebGain(GainNode);

pub struct WebOscillator(OscillatorNode);

impl GainControl for WebGain {
    fn set_value_at(&self, value: f32, time: f64) {
        let _ = self.0.gain().set_value_at_time(value, time);
    }

    fn exponential_ramp_to(&self, value: f32, time: f64) {
        let _ = self.0.gain().exponential_ramp_to_value_at_time(value, time);
    }

    fn connect(&self, target: &Self) -> AudioResult<()> {
        self.0
            .connect_with_audio_node(&target.0)
            .map(|_| ())
            .map_err(|e| AudioError::Routing(js_message(&e)))
    }
}

impl OscillatorControl for WebOscillator {
    type Gain = WebGain;

    fn set_frequency_at(&self, hz: f32, time: f64) {
        let _ = self.0.frequency().set_value_at_time(hz, time);
    }

    fn exponential_ramp_frequency_to(&self, hz: f32, time: f64) {
        let _ = self.0.frequency().exponential_ramp_to_value_at_time(hz, time);
    }

    fn connect(&self, gain: &Self::Gain) -> AudioResult<()> {
        self.0
            .connect_with_audio_node(&gain.0)
            .map(|_| ())
            .map_err(|e| AudioError::Routing(js_message(&e)))
    }

    fn start_at(&self, time: f64) -> AudioResult<()> {
        self.0
            .start_with_when(time)
            .map_err(|e| AudioError::Scheduling(js_message(&e)))
    }

    fn stop_at(&self, time: f64) {
        // Throws if already stopped
        let _ = self.0.stop_with_when(time);
    }

    fn on_ended(&self, callback: Box<dyn FnOnce()>) {
        let handler = Closure::once_into_js(move || callback());
        self.0.set_onended(Some(handler.unchecked_ref()));
    }
}

impl AudioDevice for WebAudioDevice {
    type Gain = WebGain;
    type Oscillator = WebOscillator;

    fn current_time(&self) -> f64 {
        self.ctx.current_time()
    }

    fn is_suspended(&self) -> bool {
        self.ctx.state() == AudioContextState::Suspended
    }

    fn resume(&self) {
        if let Err(e) = self.ctx.resume() {
            log::warn!("AudioContext resume failed: {}", js_message(&e));
        }
    }

    fn close(&self) {
        let _ = self.ctx.close();
    }

    fn create_gain(&self) -> AudioResult<Self::Gain> {
        self.ctx.create_gain().map(WebGain).map_err(|e| AudioError::NodeCreation {
            node: "gain",
            message: js_message(&e),
        })
    }

    fn create_oscillator(&self, waveform: Waveform) -> AudioResult<Self::Oscillator> {
        let osc = self.ctx.create_oscillator().map_err(|e| AudioError::NodeCreation {
            node: "oscillator",
            message: js_message(&e),
        })?;
        osc.set_type(match waveform {
            Waveform::Sine => OscillatorType::Sine,
            Waveform::Square => OscillatorType::Square,
            Waveform::Sawtooth => OscillatorType::Sawtooth,
            Waveform::Triangle => OscillatorType::Triangle,
        });
        Ok(WebOscillator(osc))
    }

    fn connect_to_output(&self, gain: &Self::Gain) -> AudioResult<()> {
        gain.0
            .connect_with_audio_node(&self.ctx.destination())
            .map(|_| ())
            .map_err(|e| AudioError::Routing(js_message(&e)))
    }
}

/// Canvas 2D drawing target
pub struct CanvasSurface {
    ctx: CanvasRenderingContext2d,
    width: f32,
    height: f32,
}

impl CanvasSurface {
    pub fn new(ctx: CanvasRenderingContext2d, width: f32, height: f32) -> Self {
        Self { ctx, width, height }
    }
}

impl Surface for CanvasSurface {
    fn width(&self) -> f32 {
        self.width
    }

    fn height(&self) -> f32 {
        self.height
    }

    fn clear(&mut self, color: Rgba) {
        self.ctx.set_fill_style_str(&css(color));
        self.ctx
            .fill_rect(0.0, 0.0, self.width as f64, self.height as f64);
    }

    fn fill_rect(&mut self, pos: Vec2, size: Vec2, color: Rgba) {
        self.ctx.set_fill_style_str(&css(color));
        self.ctx
            .fill_rect(pos.x as f64, pos.y as f64, size.x as f64, size.y as f64);
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Rgba) {
        self.ctx.set_fill_style_str(&css(color));
        self.ctx.begin_path();
        let _ = self.ctx.arc(
            center.x as f64,
            center.y as f64,
            radius as f64,
            0.0,
            std::f64::consts::TAU,
        );
        self.ctx.fill();
    }

    fn dashed_vertical_line(&mut self, x: f32, dash: f32, gap: f32, width: f32, color: Rgba) {
        let pattern = js_sys::Array::of2(&JsValue::from(dash), &JsValue::from(gap));
        let _ = self.ctx.set_line_dash(&pattern);
        self.ctx.set_stroke_style_str(&css(color));
        self.ctx.set_line_width(width as f64);
        self.ctx.begin_path();
        self.ctx.move_to(x as f64, 0.0);
        self.ctx.line_to(x as f64, self.height as f64);
        self.ctx.stroke();
        let _ = self.ctx.set_line_dash(&js_sys::Array::new());
    }
}
