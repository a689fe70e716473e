//! Sound effect and music recipes
//!
//! Procedurally generated - no external files needed! Effects are a single
//! oscillator sweep with an exponential decay; music phrases are a fixed
//! sequence of notes scheduled ahead of time on one oscillator.

use super::device::{GainControl, OscillatorControl, Waveform};

/// Gain value treated as silence (exponential ramps cannot reach zero)
pub const SILENCE: f32 = 0.001;

/// Extra time after the envelope before an effect oscillator stops
pub const EFFECT_TAIL: f64 = 0.02;

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEffect {
    /// Ball bounced off a wall or the AI paddle
    PaddleHit,
    /// Player returned the ball
    Score,
    /// Difficulty went up
    SpeedUp,
    /// Player missed
    GameOver,
    /// Session best beaten
    RecordBroken,
    /// Anything else
    Beep,
}

impl SoundEffect {
    /// Look up an effect by name; unknown names give the default beep
    pub fn from_name(name: &str) -> Self {
        let key: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "paddlehit" => SoundEffect::PaddleHit,
            "score" => SoundEffect::Score,
            "speedup" => SoundEffect::SpeedUp,
            "gameover" => SoundEffect::GameOver,
            "recordbroken" => SoundEffect::RecordBroken,
            _ => SoundEffect::Beep,
        }
    }

    pub fn recipe(self) -> EffectRecipe {
        match self {
            // Short square blip, pitch drops an octave
            SoundEffect::PaddleHit => EffectRecipe {
                waveform: Waveform::Square,
                start_hz: 520.0,
                end_hz: 260.0,
                duration: 0.1,
                peak: 0.3,
            },
            // Bright rising chirp
            SoundEffect::Score => EffectRecipe {
                waveform: Waveform::Sine,
                start_hz: 660.0,
                end_hz: 990.0,
                duration: 0.15,
                peak: 0.35,
            },
            // Sawtooth whoosh up
            SoundEffect::SpeedUp => EffectRecipe {
                waveform: Waveform::Sawtooth,
                start_hz: 300.0,
                end_hz: 900.0,
                duration: 0.3,
                peak: 0.25,
            },
            // Sad slide down
            SoundEffect::GameOver => EffectRecipe {
                waveform: Waveform::Triangle,
                start_hz: 400.0,
                end_hz: 100.0,
                duration: 0.6,
                peak: 0.4,
            },
            // Celebratory octave sweep
            SoundEffect::RecordBroken => EffectRecipe {
                waveform: Waveform::Square,
                start_hz: 600.0,
                end_hz: 1200.0,
                duration: 0.4,
                peak: 0.3,
            },
            SoundEffect::Beep => EffectRecipe {
                waveform: Waveform::Sine,
                start_hz: 440.0,
                end_hz: 440.0,
                duration: 0.1,
                peak: 0.2,
            },
        }
    }
}

/// Shape of one effect
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectRecipe {
    pub waveform: Waveform,
    pub start_hz: f32,
    pub end_hz: f32,
    /// Seconds until the envelope reaches silence
    pub duration: f64,
    pub peak: f32,
}

impl EffectRecipe {
    /// Schedule the sweep and envelope starting at `t`
    pub fn schedule<O: OscillatorControl>(&self, osc: &O, gain: &O::Gain, t: f64) {
        gain.set_value_at(self.peak, t);
        gain.exponential_ramp_to(SILENCE, t + self.duration);
        osc.set_frequency_at(self.start_hz, t);
        osc.exponential_ramp_frequency_to(self.end_hz, t + self.duration);
    }

    /// When the oscillator should stop, relative to its start
    pub fn stop_after(&self) -> f64 {
        self.duration + EFFECT_TAIL
    }
}

/// Background music tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MusicTrack {
    Intro,
    /// The gameplay loop; has several melodic variants
    Main,
    Victory,
    GameOver,
}

/// One note of a phrase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    pub hz: f32,
    /// Seconds from phrase start
    pub at: f64,
}

const fn note(hz: f32, at: f64) -> Note {
    Note { hz, at }
}

// Equal temperament, A4 = 440
const A3: f32 = 220.00;
const C4: f32 = 261.63;
const D4: f32 = 293.66;
const E4: f32 = 329.63;
const F4: f32 = 349.23;
const G4: f32 = 392.00;
const A4: f32 = 440.00;
const B4: f32 = 493.88;
const C5: f32 = 523.25;
const D5: f32 = 587.33;
const E5: f32 = 659.25;
const G5: f32 = 783.99;
const C6: f32 = 1046.50;

const INTRO: &[Note] = &[note(C5, 0.0), note(E5, 0.15), note(G5, 0.3), note(C6, 0.45)];

const MAIN_A: &[Note] = &[
    note(C4, 0.0),
    note(E4, 0.2),
    note(G4, 0.4),
    note(E4, 0.6),
    note(F4, 0.8),
    note(A4, 1.0),
    note(G4, 1.2),
    note(E4, 1.4),
];

const MAIN_B: &[Note] = &[
    note(A3, 0.0),
    note(C4, 0.2),
    note(E4, 0.4),
    note(C4, 0.6),
    note(D4, 0.8),
    note(F4, 1.0),
    note(E4, 1.2),
    note(C4, 1.4),
];

const MAIN_C: &[Note] = &[
    note(G4, 0.0),
    note(B4, 0.2),
    note(D5, 0.4),
    note(B4, 0.6),
    note(C5, 0.8),
    note(E5, 1.0),
    note(D5, 1.2),
    note(B4, 1.4),
];

/// Melodies the main loop rotates through
pub const MAIN_VARIANTS: &[&[Note]] = &[MAIN_A, MAIN_B, MAIN_C];

const VICTORY: &[Note] = &[
    note(C5, 0.0),
    note(E5, 0.15),
    note(G5, 0.3),
    note(C6, 0.45),
    note(G5, 0.7),
    note(C6, 0.85),
];

const GAME_OVER: &[Note] = &[note(G4, 0.0), note(F4, 0.3), note(E4, 0.6), note(C4, 0.9)];

/// A synthesized melodic phrase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Phrase {
    pub waveform: Waveform,
    pub notes: &'static [Note],
    /// Total length in seconds; the unit ends here
    pub duration: f64,
    pub level: f32,
}

/// Fade-out at the end of each phrase
const PHRASE_RELEASE: f64 = 0.1;

impl MusicTrack {
    /// Phrase for this track; `variant` only matters for `Main`
    pub fn phrase(self, variant: usize) -> Phrase {
        match self {
            MusicTrack::Intro => Phrase {
                waveform: Waveform::Triangle,
                notes: INTRO,
                duration: 0.8,
                level: 0.3,
            },
            MusicTrack::Main => Phrase {
                waveform: Waveform::Triangle,
                notes: MAIN_VARIANTS[variant % MAIN_VARIANTS.len()],
                duration: 1.6,
                level: 0.25,
            },
            MusicTrack::Victory => Phrase {
                waveform: Waveform::Square,
                notes: VICTORY,
                duration: 1.2,
                level: 0.2,
            },
            MusicTrack::GameOver => Phrase {
                waveform: Waveform::Sawtooth,
                notes: GAME_OVER,
                duration: 1.4,
                level: 0.2,
            },
        }
    }
}

impl Phrase {
    /// Schedule every note and the envelope relative to `t`
    pub fn schedule<O: OscillatorControl>(&self, osc: &O, gain: &O::Gain, t: f64) {
        for n in self.notes {
            osc.set_frequency_at(n.hz, t + n.at);
        }
        gain.set_value_at(self.level, t);
        gain.set_value_at(self.level, t + self.duration - PHRASE_RELEASE);
        gain.exponential_ramp_to(SILENCE, t + self.duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_names() {
        assert_eq!(SoundEffect::from_name("paddleHit"), SoundEffect::PaddleHit);
        assert_eq!(SoundEffect::from_name("speed_up"), SoundEffect::SpeedUp);
        assert_eq!(SoundEffect::from_name("record-broken"), SoundEffect::RecordBroken);
        assert_eq!(SoundEffect::from_name("gameOver"), SoundEffect::GameOver);
        assert_eq!(SoundEffect::from_name("kazoo"), SoundEffect::Beep);
    }

    #[test]
    fn test_effects_decay_to_silence() {
        for effect in [
            SoundEffect::PaddleHit,
            SoundEffect::Score,
            SoundEffect::SpeedUp,
            SoundEffect::GameOver,
            SoundEffect::RecordBroken,
            SoundEffect::Beep,
        ] {
            let recipe = effect.recipe();
            assert!(recipe.peak > SILENCE, "{:?}", effect);
            assert!(recipe.duration > 0.0 && recipe.duration < 1.0, "{:?}", effect);
            assert!(recipe.stop_after() > recipe.duration);
        }
    }

    #[test]
    fn test_phrases_are_short_and_ordered() {
        for track in [
            MusicTrack::Intro,
            MusicTrack::Main,
            MusicTrack::Victory,
            MusicTrack::GameOver,
        ] {
            let phrase = track.phrase(0);
            assert!((0.8..=2.0).contains(&phrase.duration), "{:?}", track);
            assert!(phrase.notes.windows(2).all(|w| w[0].at < w[1].at));
            let last = phrase.notes.last().map(|n| n.at).unwrap_or(0.0);
            assert!(last < phrase.duration - PHRASE_RELEASE);
        }
    }

    #[test]
    fn test_main_variants_differ_and_wrap() {
        let a = MusicTrack::Main.phrase(0);
        let b = MusicTrack::Main.phrase(1);
        assert_ne!(a.notes[0].hz, b.notes[0].hz);
        assert_eq!(MusicTrack::Main.phrase(MAIN_VARIANTS.len()), a);
        // Other tracks ignore the variant
        assert_eq!(MusicTrack::Victory.phrase(2), MusicTrack::Victory.phrase(0));
    }
}
