//! Audio synthesis manager
//!
//! Owns the audio hardware handle, the `master <- {music, sfx}` gain graph and
//! every sound the game makes. Nothing here is pre-recorded.
//!
//! The manager is a state machine: `Inactive -> Unlocking -> Ready`, or
//! `Unlocking -> Failed`. Sound requests outside `Ready` are silent no-ops, so
//! callers never need to check. Failures are logged and absorbed here; they
//! never reach the simulation or the controller.

pub mod device;
#[cfg(test)]
pub(crate) mod mock;
pub mod sounds;

use std::cell::RefCell;
use std::rc::Rc;

pub use device::{
    AudioDevice, AudioError, AudioPlatform, AudioResult, GainControl, LocalBoxFuture,
    NullAudioPlatform, OscillatorControl, Waveform,
};
pub use sounds::{MAIN_VARIANTS, MusicTrack, SoundEffect};

use crate::settings::{AudioSettings, Settings, UnlockProfiles, UnlockTiming};

/// Length of the inaudible tone that primes the pipeline after unlock
pub const WARM_UP_SECS: f64 = 0.05;

/// Audio readiness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioState {
    /// No hardware handle yet
    Inactive,
    /// `unlock` in progress
    Unlocking,
    /// Sounds play
    Ready,
    /// Gave up; silent until a new manager is built
    Failed,
}

/// Music requested as part of unlocking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MusicCue {
    pub track: MusicTrack,
    pub looped: bool,
}

impl MusicCue {
    pub fn looping(track: MusicTrack) -> Self {
        Self {
            track,
            looped: true,
        }
    }

    pub fn once(track: MusicTrack) -> Self {
        Self {
            track,
            looped: false,
        }
    }
}

/// The three bus gain nodes
struct MixGraph<G> {
    master: G,
    music: G,
    sfx: G,
}

impl<G: GainControl> MixGraph<G> {
    fn build<D: AudioDevice<Gain = G>>(device: &D, settings: &AudioSettings) -> AudioResult<Self> {
        let master = device.create_gain()?;
        let music = device.create_gain()?;
        let sfx = device.create_gain()?;
        music.connect(&master)?;
        sfx.connect(&master)?;
        device.connect_to_output(&master)?;

        let graph = Self { master, music, sfx };
        graph.apply(settings, device.current_time());
        Ok(graph)
    }

    fn apply(&self, settings: &AudioSettings, t: f64) {
        self.master.set_value_at(settings.effective_master(), t);
        self.music.set_value_at(settings.music_volume.clamp(0.0, 1.0), t);
        self.sfx.set_value_at(settings.sfx_volume.clamp(0.0, 1.0), t);
    }
}

/// The one music oscillator allowed to play
struct MusicUnit<O> {
    id: u64,
    track: MusicTrack,
    looped: bool,
    osc: O,
}

struct Inner<D: AudioDevice> {
    state: AudioState,
    settings: AudioSettings,
    profiles: UnlockProfiles,
    device: Option<D>,
    graph: Option<MixGraph<D::Gain>>,
    music: Option<MusicUnit<D::Oscillator>>,
    next_unit_id: u64,
    main_variant: usize,
    /// Bumped by `cleanup`; pending unlock work from an older epoch stands down
    epoch: u64,
}

impl<D: AudioDevice> Inner<D> {
    fn stop_music(&mut self) {
        if let Some(unit) = self.music.take() {
            let now = self.device.as_ref().map_or(0.0, |d| d.current_time());
            unit.osc.stop_at(now);
        }
    }

    fn release(&mut self) {
        self.stop_music();
        self.graph = None;
        if let Some(device) = self.device.take() {
            device.close();
        }
    }

    fn fail(&mut self) {
        self.release();
        self.state = AudioState::Failed;
    }
}

/// Procedural audio over an unlockable device
///
/// Cloning gives another handle to the same manager.
pub struct AudioSynthesisManager<P: AudioPlatform> {
    platform: P,
    inner: Rc<RefCell<Inner<P::Device>>>,
}

impl<P: AudioPlatform> Clone for AudioSynthesisManager<P> {
    fn clone(&self) -> Self {
        Self {
            platform: self.platform.clone(),
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<P: AudioPlatform> AudioSynthesisManager<P> {
    pub fn new(platform: P, settings: &Settings) -> Self {
        Self {
            platform,
            inner: Rc::new(RefCell::new(Inner {
                state: AudioState::Inactive,
                settings: settings.audio.clone(),
                profiles: settings.unlock,
                device: None,
                graph: None,
                music: None,
                next_unit_id: 0,
                main_variant: 0,
                epoch: 0,
            })),
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn state(&self) -> AudioState {
        self.inner.borrow().state
    }

    pub fn is_ready(&self) -> bool {
        self.state() == AudioState::Ready
    }

    /// Track of the active music unit, if any
    pub fn current_music(&self) -> Option<MusicTrack> {
        self.inner.borrow().music.as_ref().map(|unit| unit.track)
    }

    /// Melody index the next main loop iteration will use
    pub fn main_variant(&self) -> usize {
        self.inner.borrow().main_variant
    }

    /// Timing profile for this device
    pub fn unlock_timing(&self) -> UnlockTiming {
        let inner = self.inner.borrow();
        let mobile = inner.settings.device_class.is_mobile(self.platform.is_mobile());
        inner.profiles.select(mobile)
    }

    /// Unlock the audio hardware
    ///
    /// Call from inside a user gesture: the hardware handle, gain graph,
    /// resume request and warm-up tone are all created before this returns.
    /// The returned future performs the stabilization wait and the retried
    /// content generation (`opening`), resolving to whether audio is ready.
    ///
    /// Calling again while not `Inactive` touches no hardware and resolves to
    /// the current readiness.
    pub fn unlock(&self, opening: Option<MusicCue>) -> LocalBoxFuture<bool> {
        self.unlock_gated(opening, Box::new(|| true))
    }

    /// `unlock` whose opening music only attaches while `wanted` holds
    ///
    /// `wanted` is checked right before each content attempt; once it reports
    /// false the content step is skipped and audio simply stays ready.
    pub fn unlock_gated(
        &self,
        opening: Option<MusicCue>,
        wanted: Box<dyn Fn() -> bool>,
    ) -> LocalBoxFuture<bool> {
        let state = self.state();
        if state != AudioState::Inactive {
            log::debug!("Audio unlock requested while {:?}", state);
            return Box::pin(std::future::ready(state == AudioState::Ready));
        }

        let timing = self.unlock_timing();
        let epoch = {
            let mut inner = self.inner.borrow_mut();
            inner.state = AudioState::Unlocking;
            inner.epoch
        };

        if let Err(err) = self.open_device() {
            log::warn!("Audio unavailable, continuing silently: {}", err);
            self.inner.borrow_mut().fail();
            return Box::pin(std::future::ready(false));
        }

        let manager = self.clone();
        Box::pin(async move { manager.settle(epoch, timing, opening, wanted).await })
    }

    /// Steps that must run synchronously inside the gesture
    fn open_device(&self) -> AudioResult<()> {
        let device = self.platform.open()?;
        let settings = self.inner.borrow().settings.clone();

        let graph = match MixGraph::build(&device, &settings) {
            Ok(graph) => graph,
            Err(err) => {
                device.close();
                return Err(err);
            }
        };
        device.resume();
        if let Err(err) = warm_up(&device, &graph.master) {
            device.close();
            return Err(err);
        }

        let mut inner = self.inner.borrow_mut();
        inner.device = Some(device);
        inner.graph = Some(graph);
        // Ready before any music so optimistic callers see a consistent state
        inner.state = AudioState::Ready;
        log::info!("Audio unlocked");
        Ok(())
    }

    /// Stabilize, then generate the opening content with retries
    async fn settle(
        &self,
        epoch: u64,
        timing: UnlockTiming,
        opening: Option<MusicCue>,
        wanted: Box<dyn Fn() -> bool>,
    ) -> bool {
        self.platform.sleep(timing.stabilize_ms).await;
        if !self.still_unlocked(epoch) {
            return false;
        }

        if self.device_suspended() {
            log::info!("Audio device still suspended, resuming");
            self.resume_device();
            self.platform.sleep(timing.resume_wait_ms).await;
            if !self.still_unlocked(epoch) {
                return false;
            }
        }

        let Some(cue) = opening else {
            return true;
        };

        let attempts = timing.attempts.max(1);
        for attempt in 1..=attempts {
            if !self.still_unlocked(epoch) {
                return false;
            }
            if !wanted() {
                log::debug!("Opening {:?} music no longer wanted", cue.track);
                return true;
            }
            if self.device_suspended() {
                self.resume_device();
            }
            match self.try_play_music(cue.track, cue.looped) {
                Ok(()) => {
                    log::info!("Audio content ready after {} attempt(s)", attempt);
                    return true;
                }
                Err(err) => {
                    log::warn!("Audio content attempt {}/{} failed: {}", attempt, attempts, err);
                    if attempt < attempts {
                        self.platform.sleep(timing.backoff_ms).await;
                    }
                }
            }
        }

        if self.still_unlocked(epoch) {
            log::error!(
                "Audio content failed after {} attempts; continuing silently",
                attempts
            );
            self.inner.borrow_mut().fail();
        }
        false
    }

    /// True while the unlock that captured `epoch` has not been torn down
    fn still_unlocked(&self, epoch: u64) -> bool {
        let inner = self.inner.borrow();
        inner.epoch == epoch && inner.state == AudioState::Ready
    }

    fn device_suspended(&self) -> bool {
        self.inner
            .borrow()
            .device
            .as_ref()
            .is_some_and(|d| d.is_suspended())
    }

    fn resume_device(&self) {
        if let Some(device) = self.inner.borrow().device.as_ref() {
            device.resume();
        }
    }

    /// Play a one-shot effect
    ///
    /// Each call builds its own oscillator and envelope, so overlapping
    /// effects never interfere.
    pub fn play_effect(&self, effect: SoundEffect) {
        let inner = self.inner.borrow();
        if inner.state != AudioState::Ready {
            return;
        }
        let (Some(device), Some(graph)) = (inner.device.as_ref(), inner.graph.as_ref()) else {
            return;
        };
        if let Err(err) = synthesize_effect(device, &graph.sfx, effect) {
            log::warn!("Failed to play {:?}: {}", effect, err);
        }
    }

    /// Play an effect by name; unknown names beep
    pub fn play_effect_named(&self, name: &str) {
        self.play_effect(SoundEffect::from_name(name));
    }

    /// Replace the current music with `track`
    ///
    /// Only a looping `Main` restarts itself when it ends.
    pub fn play_music(&self, track: MusicTrack, looped: bool) {
        if !self.is_ready() {
            return;
        }
        if let Err(err) = self.try_play_music(track, looped) {
            log::warn!("Failed to play {:?} music: {}", track, err);
        }
    }

    fn try_play_music(&self, track: MusicTrack, looped: bool) -> AudioResult<()> {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        inner.stop_music();

        let (Some(device), Some(graph)) = (inner.device.as_ref(), inner.graph.as_ref()) else {
            return Err(AudioError::NotReady);
        };
        let phrase = track.phrase(inner.main_variant);

        let osc = device.create_oscillator(phrase.waveform)?;
        let gain = device.create_gain()?;
        osc.connect(&gain)?;
        gain.connect(&graph.music)?;

        let t = device.current_time();
        phrase.schedule(&osc, &gain, t);
        osc.start_at(t)?;
        osc.stop_at(t + phrase.duration);

        inner.next_unit_id += 1;
        let id = inner.next_unit_id;
        osc.on_ended(self.music_end_handler(id));
        inner.music = Some(MusicUnit {
            id,
            track,
            looped,
            osc,
        });
        Ok(())
    }

    fn music_end_handler(&self, id: u64) -> Box<dyn FnOnce()> {
        let weak = Rc::downgrade(&self.inner);
        let platform = self.platform.clone();
        Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                AudioSynthesisManager { platform, inner }.music_ended(id);
            }
        })
    }

    /// Natural end (or stop) of music unit `id`
    fn music_ended(&self, id: u64) {
        let relaunch = {
            let mut inner = self.inner.borrow_mut();
            // Units that were stopped or replaced are no longer current
            let Some(unit) = inner.music.take_if(|unit| unit.id == id) else {
                return;
            };
            unit.looped && unit.track == MusicTrack::Main && inner.state == AudioState::Ready
        };
        if relaunch {
            log::trace!("Main loop iteration ended, re-synthesizing");
            self.play_music(MusicTrack::Main, true);
        }
    }

    /// Silence music immediately
    pub fn stop_music(&self) {
        self.inner.borrow_mut().stop_music();
    }

    /// Rotate the main loop melody; only while `Main` is looping
    pub fn switch_music_variant(&self) {
        let mut inner = self.inner.borrow_mut();
        let looping_main = inner
            .music
            .as_ref()
            .is_some_and(|unit| unit.track == MusicTrack::Main && unit.looped);
        if inner.state != AudioState::Ready || !looping_main {
            log::debug!("Ignoring music variant switch; main loop not playing");
            return;
        }
        inner.main_variant = (inner.main_variant + 1) % MAIN_VARIANTS.len();
        log::debug!("Main loop variant -> {}", inner.main_variant);
    }

    /// Stop music, close the hardware handle and return to `Inactive`
    ///
    /// Safe from any state and safe to repeat. A pending unlock notices and
    /// produces no further output.
    pub fn cleanup(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.epoch += 1;
        if inner.state != AudioState::Inactive {
            log::info!("Audio cleanup (was {:?})", inner.state);
        }
        inner.release();
        inner.state = AudioState::Inactive;
    }

    /// Mute/unmute all audio
    pub fn set_muted(&self, muted: bool) {
        self.update_settings(|s| s.muted = muted);
    }

    /// Set master volume (0.0 - 1.0)
    pub fn set_master_volume(&self, vol: f32) {
        self.update_settings(|s| s.master_volume = vol.clamp(0.0, 1.0));
    }

    /// Set music volume (0.0 - 1.0)
    pub fn set_music_volume(&self, vol: f32) {
        self.update_settings(|s| s.music_volume = vol.clamp(0.0, 1.0));
    }

    /// Set SFX volume (0.0 - 1.0)
    pub fn set_sfx_volume(&self, vol: f32) {
        self.update_settings(|s| s.sfx_volume = vol.clamp(0.0, 1.0));
    }

    fn update_settings(&self, change: impl FnOnce(&mut AudioSettings)) {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        change(&mut inner.settings);
        if let (Some(device), Some(graph)) = (inner.device.as_ref(), inner.graph.as_ref()) {
            graph.apply(&inner.settings, device.current_time());
        }
    }
}

/// Zero-gain tone that forces the platform to allocate the pipeline
fn warm_up<D: AudioDevice>(device: &D, master: &D::Gain) -> AudioResult<()> {
    let osc = device.create_oscillator(Waveform::Sine)?;
    let gain = device.create_gain()?;
    osc.connect(&gain)?;
    gain.connect(master)?;

    let t = device.current_time();
    gain.set_value_at(0.0, t);
    osc.start_at(t)?;
    osc.stop_at(t + WARM_UP_SECS);
    Ok(())
}

/// Build, schedule and start one disposable effect unit
fn synthesize_effect<D: AudioDevice>(
    device: &D,
    bus: &D::Gain,
    effect: SoundEffect,
) -> AudioResult<()> {
    let recipe = effect.recipe();
    let osc = device.create_oscillator(recipe.waveform)?;
    let gain = device.create_gain()?;
    osc.connect(&gain)?;
    gain.connect(bus)?;

    let t = device.current_time();
    recipe.schedule(&osc, &gain, t);
    osc.start_at(t)?;
    osc.stop_at(t + recipe.stop_after());
    Ok(())
}
