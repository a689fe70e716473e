//! Game loop controller
//!
//! Owns the session and the simulation, bridges pointer input into the world
//! and simulation events into audio. Frame-driven: the host calls `frame` once
//! per animation frame for as long as it returns `true`, and renders after
//! each call.

use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::audio::{
    AudioPlatform, AudioState, AudioSynthesisManager, MusicCue, MusicTrack, SoundEffect,
};
use crate::renderer::{self, Surface};
use crate::sim::{Arena, GameEvent, PhysicsSimulation, Session, World};

/// HUD-facing view of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub score: u32,
    pub speed_level: u32,
    pub game_over: bool,
    pub running: bool,
    pub paused: bool,
}

/// Paddle top for a pointer at `y`, keeping the paddle inside the arena
pub fn paddle_top_for_pointer(y: f32, paddle_height: f32, arena_height: f32) -> f32 {
    (y - paddle_height / 2.0).clamp(0.0, (arena_height - paddle_height).max(0.0))
}

pub struct GameLoopController<P: AudioPlatform> {
    audio: AudioSynthesisManager<P>,
    sim: Option<PhysicsSimulation>,
    session: Session,
    /// Best final score seen by this controller
    best_score: u32,
    seed: u64,
    /// Set by `start`, cleared by `reset`
    started: bool,
    frame_subscribed: bool,
    /// Whether the main loop should be playing; a pending unlock checks it
    /// before attaching its opening music
    music_wanted: Rc<Cell<bool>>,
}

impl<P: AudioPlatform> GameLoopController<P> {
    pub fn new(audio: AudioSynthesisManager<P>, seed: u64) -> Self {
        Self {
            audio,
            sim: None,
            session: Session::default(),
            best_score: 0,
            seed,
            started: false,
            frame_subscribed: false,
            music_wanted: Rc::new(Cell::new(false)),
        }
    }

    /// Size the arena. Refuses degenerate dimensions.
    pub fn mount(&mut self, width: f32, height: f32) -> bool {
        if !Arena::is_valid(width, height) {
            log::warn!("Refusing to mount on a {}x{} surface", width, height);
            return false;
        }
        self.sim = Some(PhysicsSimulation::new(self.seed, width, height));
        self.session = Session::default();
        self.started = false;
        log::info!("Mounted {}x{} arena (seed {})", width, height, self.seed);
        true
    }

    pub fn is_mounted(&self) -> bool {
        self.sim.is_some()
    }

    /// Begin or resume play
    ///
    /// Returns whether the host must subscribe to animation frames. Must be
    /// called from a user gesture the first time so audio can unlock; audio
    /// never delays the start of play.
    pub fn start(&mut self) -> bool {
        let Some(sim) = self.sim.as_mut() else {
            log::warn!("start() before a successful mount");
            return false;
        };
        if self.session.running {
            return false;
        }
        if self.session.over {
            let arena = sim.world().arena;
            sim.initialize(arena.width, arena.height);
            self.session = Session::default();
        }

        self.session.running = true;
        self.started = true;
        log::info!("Game started");
        self.start_music();

        let subscribe = !self.frame_subscribed;
        self.frame_subscribed = true;
        subscribe
    }

    fn start_music(&self) {
        self.music_wanted.set(true);
        match self.audio.state() {
            AudioState::Ready => self.audio.play_music(MusicTrack::Main, true),
            AudioState::Inactive => {
                let wanted = Rc::clone(&self.music_wanted);
                let pending = self.audio.unlock_gated(
                    Some(MusicCue::looping(MusicTrack::Main)),
                    Box::new(move || wanted.get()),
                );
                self.audio.platform().spawn(Box::pin(async move {
                    if !pending.await {
                        log::info!("Playing without sound");
                    }
                }));
            }
            // Unlocking: the pending unlock attaches the loop; Failed: silent
            AudioState::Unlocking | AudioState::Failed => {}
        }
    }

    fn silence_music(&self) {
        self.music_wanted.set(false);
        self.audio.stop_music();
    }

    /// Stop play; the frame subscription ends on the next frame
    pub fn pause(&mut self) {
        if self.session.running {
            self.session.running = false;
            log::info!("Game paused at score {}", self.session.score);
        }
        self.silence_music();
    }

    /// Back to a fresh session. The audio handle is kept.
    pub fn reset(&mut self) {
        self.pause();
        if let Some(sim) = self.sim.as_mut() {
            let arena = sim.world().arena;
            sim.initialize(arena.width, arena.height);
        }
        self.session = Session::default();
        self.started = false;
        log::info!("Game reset");
    }

    /// Tear down: no more frames and the audio hardware is released
    pub fn unmount(&mut self) {
        self.session.running = false;
        self.frame_subscribed = false;
        self.music_wanted.set(false);
        self.sim = None;
        self.audio.cleanup();
        log::info!("Unmounted");
    }

    /// Map a pointer position to the player paddle. Only `y` matters.
    pub fn pointer_moved(&mut self, y: f32) {
        if let Some(sim) = self.sim.as_mut() {
            let world = sim.world();
            let top = paddle_top_for_pointer(y, world.player.height, world.arena.height);
            sim.set_player_y(top);
        }
    }

    /// Advance one animation frame
    ///
    /// Returns whether the host should request another frame.
    pub fn frame(&mut self) -> bool {
        let Some(sim) = self.sim.as_mut().filter(|_| self.session.running) else {
            self.frame_subscribed = false;
            return false;
        };

        let events = sim.step(&mut self.session);
        for event in events {
            self.dispatch(event);
        }

        self.frame_subscribed = self.session.running;
        self.frame_subscribed
    }

    /// Translate a simulation event into sound
    fn dispatch(&mut self, event: GameEvent) {
        match event {
            GameEvent::PaddleHit(_) => self.audio.play_effect(SoundEffect::PaddleHit),
            GameEvent::Scored { .. } => self.audio.play_effect(SoundEffect::Score),
            GameEvent::SpeedUp { .. } => self.audio.play_effect(SoundEffect::SpeedUp),
            GameEvent::SwitchMusicVariant => self.audio.switch_music_variant(),
            GameEvent::GameOver { score } => {
                self.music_wanted.set(false);
                if self.best_score > 0 && score > self.best_score {
                    log::info!("New best score {} (was {})", score, self.best_score);
                    self.audio.play_effect(SoundEffect::RecordBroken);
                    self.audio.play_music(MusicTrack::Victory, false);
                } else {
                    self.audio.play_music(MusicTrack::GameOver, false);
                }
                self.best_score = self.best_score.max(score);
            }
        }
    }

    /// Draw the current world
    pub fn render<S: Surface + ?Sized>(&self, surface: &mut S) {
        match &self.sim {
            Some(sim) => renderer::draw_world(surface, sim.world()),
            None => renderer::draw_blank(surface),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            score: self.session.score,
            speed_level: self
                .sim
                .as_ref()
                .map_or(1, |sim| sim.world().difficulty.speed_level),
            game_over: self.session.over,
            running: self.session.running,
            paused: self.started && !self.session.running && !self.session.over,
        }
    }

    pub fn world(&self) -> Option<&World> {
        self.sim.as_ref().map(|sim| sim.world())
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn best_score(&self) -> u32 {
        self.best_score
    }

    pub fn audio(&self) -> &AudioSynthesisManager<P> {
        &self.audio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::mock::{MockPlatform, Op};
    use crate::audio::Waveform;
    use crate::renderer::tests::{Draw, RecordingSurface};
    use crate::settings::Settings;

    const SEED: u64 = 42;

    fn controller(platform: &MockPlatform) -> GameLoopController<MockPlatform> {
        let audio = AudioSynthesisManager::new(platform.clone(), &Settings::default());
        let mut ctl = GameLoopController::new(audio, SEED);
        assert!(ctl.mount(800.0, 400.0));
        ctl
    }

    /// Keep the paddle in the half the ball is not in
    fn dodge(ctl: &mut GameLoopController<MockPlatform>) {
        let ball_y = ctl.world().map_or(0.0, |w| w.ball.pos.y);
        ctl.pointer_moved(if ball_y < 200.0 { 400.0 } else { 0.0 });
    }

    fn play_until_over(ctl: &mut GameLoopController<MockPlatform>) -> usize {
        for frame in 1..=5000 {
            dodge(ctl);
            if !ctl.frame() {
                return frame;
            }
        }
        panic!("session never ended");
    }

    #[test]
    fn test_mount_refuses_bad_geometry() {
        let platform = MockPlatform::new();
        let audio = AudioSynthesisManager::new(platform.clone(), &Settings::default());
        let mut ctl = GameLoopController::new(audio, SEED);

        assert!(!ctl.mount(0.0, 400.0));
        assert!(!ctl.mount(800.0, -1.0));
        assert!(!ctl.mount(f32::NAN, 400.0));
        assert!(!ctl.is_mounted());
        assert!(!ctl.start());
        assert!(!ctl.frame());
        assert_eq!(platform.opens(), 0);
    }

    #[test]
    fn test_start_does_not_wait_for_audio() {
        let platform = MockPlatform::new();
        let mut ctl = controller(&platform);

        assert!(ctl.start());
        assert!(ctl.session().running);
        // Hardware opened inside the gesture, content still pending
        assert_eq!(platform.opens(), 1);
        assert_eq!(platform.pending_tasks(), 1);
        assert!(ctl.frame());

        platform.run_tasks();
        assert_eq!(ctl.audio().current_music(), Some(MusicTrack::Main));
    }

    #[test]
    fn test_start_subscribes_once() {
        let platform = MockPlatform::new();
        let mut ctl = controller(&platform);

        assert!(ctl.start());
        assert!(!ctl.start());
        ctl.pause();
        // Subscription still alive until the next frame sees the pause
        assert!(!ctl.start());
        ctl.pause();
        assert!(!ctl.frame());
        assert!(ctl.start());
    }

    #[test]
    fn test_start_when_ready_plays_main_directly() {
        let platform = MockPlatform::new();
        let mut ctl = controller(&platform);
        assert!(pollster::block_on(ctl.audio().unlock(None)));

        ctl.start();
        assert_eq!(platform.pending_tasks(), 0);
        assert_eq!(ctl.audio().current_music(), Some(MusicTrack::Main));
    }

    #[test]
    fn test_pause_during_unlock_keeps_music_off() {
        let platform = MockPlatform::new();
        let mut ctl = controller(&platform);

        ctl.start();
        ctl.pause();
        platform.run_tasks();

        assert_eq!(ctl.audio().state(), AudioState::Ready);
        assert_eq!(ctl.audio().current_music(), None);
    }

    #[test]
    fn test_restart_during_unlock_keeps_music() {
        let platform = MockPlatform::new();
        let mut ctl = controller(&platform);

        ctl.start();
        ctl.pause();
        ctl.start();
        platform.run_tasks();

        assert!(ctl.session().running);
        assert_eq!(ctl.audio().current_music(), Some(MusicTrack::Main));
    }

    #[test]
    fn test_game_over_cue_survives_pending_unlock() {
        let platform = MockPlatform::new();
        let mut ctl = controller(&platform);

        ctl.start();
        ctl.dispatch(GameEvent::GameOver { score: 0 });
        platform.run_tasks();

        assert_eq!(ctl.audio().current_music(), Some(MusicTrack::GameOver));
    }

    #[test]
    fn test_pause_stops_music_and_frames() {
        let platform = MockPlatform::new();
        let mut ctl = controller(&platform);
        ctl.start();
        platform.run_tasks();
        assert!(ctl.frame());

        ctl.pause();
        assert_eq!(ctl.audio().current_music(), None);
        assert!(!ctl.frame());
        assert!(ctl.snapshot().paused);
    }

    #[test]
    fn test_pointer_mapping_clamps() {
        assert_eq!(paddle_top_for_pointer(200.0, 80.0, 400.0), 160.0);
        assert_eq!(paddle_top_for_pointer(10.0, 80.0, 400.0), 0.0);
        assert_eq!(paddle_top_for_pointer(1000.0, 80.0, 400.0), 320.0);

        let platform = MockPlatform::new();
        let mut ctl = controller(&platform);
        ctl.pointer_moved(390.0);
        assert_eq!(ctl.world().map(|w| w.player.pos.y), Some(320.0));
    }

    #[test]
    fn test_event_bridge() {
        let platform = MockPlatform::new();
        let mut ctl = controller(&platform);
        assert!(pollster::block_on(ctl.audio().unlock(None)));
        platform.clear_ops();

        ctl.dispatch(GameEvent::PaddleHit(crate::sim::HitSurface::Wall));
        ctl.dispatch(GameEvent::Scored { score: 1 });
        ctl.dispatch(GameEvent::SpeedUp { level: 2 });
        let waveforms: Vec<Waveform> = platform
            .ops()
            .iter()
            .filter_map(|op| match op {
                Op::CreateOscillator(_, waveform) => Some(*waveform),
                _ => None,
            })
            .collect();
        assert_eq!(
            waveforms,
            vec![Waveform::Square, Waveform::Sine, Waveform::Sawtooth]
        );

        ctl.audio().play_music(MusicTrack::Main, true);
        ctl.dispatch(GameEvent::SwitchMusicVariant);
        assert_eq!(ctl.audio().main_variant(), 1);

        ctl.dispatch(GameEvent::GameOver { score: 3 });
        assert_eq!(ctl.audio().current_music(), Some(MusicTrack::GameOver));
        assert_eq!(ctl.best_score(), 3);
    }

    #[test]
    fn test_record_broken_plays_victory() {
        let platform = MockPlatform::new();
        let mut ctl = controller(&platform);
        assert!(pollster::block_on(ctl.audio().unlock(None)));

        // First game over never counts as a record
        ctl.dispatch(GameEvent::GameOver { score: 4 });
        assert_eq!(ctl.audio().current_music(), Some(MusicTrack::GameOver));

        platform.clear_ops();
        ctl.dispatch(GameEvent::GameOver { score: 7 });
        assert_eq!(ctl.audio().current_music(), Some(MusicTrack::Victory));
        let effect = SoundEffect::RecordBroken.recipe();
        assert!(platform.ops().iter().any(
            |op| matches!(op, Op::SetFrequency { hz, .. } if *hz == effect.start_hz)
        ));
        assert_eq!(ctl.best_score(), 7);

        // Equal is not better
        ctl.dispatch(GameEvent::GameOver { score: 7 });
        assert_eq!(ctl.audio().current_music(), Some(MusicTrack::GameOver));
    }

    #[test]
    fn test_game_over_ends_frames_and_restart_reinitializes() {
        let platform = MockPlatform::new();
        let mut ctl = controller(&platform);
        ctl.start();
        platform.run_tasks();

        play_until_over(&mut ctl);
        let snapshot = ctl.snapshot();
        assert!(snapshot.game_over);
        assert!(!snapshot.running);
        assert!(!snapshot.paused);
        assert_eq!(ctl.audio().current_music(), Some(MusicTrack::GameOver));

        assert!(ctl.start());
        assert!(!ctl.session().over);
        assert_eq!(ctl.session().score, 0);
        assert_eq!(ctl.world().map(|w| w.ball.pos), Some(glam::Vec2::new(400.0, 200.0)));
    }

    #[test]
    fn test_silent_mode_matches_audible_physics() {
        let audible = MockPlatform::new();
        let silent = MockPlatform::failing();
        let mut a = controller(&audible);
        let mut b = controller(&silent);

        a.start();
        b.start();
        audible.run_tasks();
        silent.run_tasks();
        assert_eq!(a.audio().state(), AudioState::Ready);
        assert_eq!(b.audio().state(), AudioState::Failed);

        let frames_a = play_until_over(&mut a);
        let frames_b = play_until_over(&mut b);

        assert_eq!(frames_a, frames_b);
        assert_eq!(a.world(), b.world());
        assert_eq!(a.session(), b.session());
        assert!(b.session().over);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let platform = MockPlatform::new();
        let mut ctl = controller(&platform);
        ctl.start();
        for _ in 0..50 {
            ctl.frame();
        }

        ctl.reset();
        let once = (ctl.world().cloned(), ctl.snapshot());
        ctl.reset();
        let twice = (ctl.world().cloned(), ctl.snapshot());

        assert_eq!(once, twice);
        assert_eq!(once.0, Some(World::new(800.0, 400.0)));
        assert_eq!(
            once.1,
            SessionSnapshot {
                score: 0,
                speed_level: 1,
                game_over: false,
                running: false,
                paused: false,
            }
        );
        // Audio handle survives
        assert_eq!(ctl.audio().state(), AudioState::Ready);
        assert_eq!(platform.count(|op| *op == Op::Close), 0);
    }

    #[test]
    fn test_unmount_releases_audio() {
        let platform = MockPlatform::new();
        let mut ctl = controller(&platform);
        ctl.start();
        platform.run_tasks();

        ctl.unmount();
        assert!(!ctl.frame());
        assert!(!ctl.is_mounted());
        assert_eq!(ctl.audio().state(), AudioState::Inactive);
        assert_eq!(platform.count(|op| *op == Op::Close), 1);
    }

    #[test]
    fn test_render_draws_world() {
        let platform = MockPlatform::new();
        let ctl = controller(&platform);
        let mut surface = RecordingSurface::default();
        ctl.render(&mut surface);
        assert_eq!(surface.calls.len(), 5);
        assert_eq!(surface.calls[4], Draw::Circle(glam::Vec2::new(400.0, 200.0), 8.0));
    }

    #[test]
    fn test_snapshot_serializes() {
        let platform = MockPlatform::new();
        let ctl = controller(&platform);
        let json = serde_json::to_string(&ctl.snapshot()).unwrap();
        assert_eq!(
            json,
            r#"{"score":0,"speed_level":1,"game_over":false,"running":false,"paused":false}"#
        );
    }
}
