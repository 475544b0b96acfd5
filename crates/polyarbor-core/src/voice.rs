//! The tone-voice contract the scheduler fires per event, plus a sample-level
//! voice for backends that have no audio graph of their own.

use std::f32::consts::{FRAC_PI_2, TAU};

use crate::constants::*;
use crate::layer::LayerId;

/// Oscillator shape. Accents use a triangle, plain beats a sine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
}

impl Waveform {
    /// One sample at `phase` (cycles, 0..1). Both shapes start at 0 and rise.
    #[inline]
    pub fn sample(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (TAU * phase).sin(),
            Waveform::Triangle => 1.0 - 4.0 * ((phase + 0.25).fract() - 0.5).abs(),
        }
    }
}

/// A scheduled tone produced by the scheduler for playback.
///
/// Fields:
/// - `layer_id`: the layer that fired
/// - `frequency_hz`: pitch in Hertz (already octave-shifted for accents)
/// - `velocity`: peak linear gain, already scaled by the layer volume
/// - `pan`: stereo position, clamped to -1..1
/// - `accented`: first step of the layer's own beat cycle
/// - `start_time_sec`: absolute engine time the tone begins
/// - `event_index`: the layer's event counter at this tone
#[derive(Clone, Debug, PartialEq)]
pub struct ToneEvent {
    pub layer_id: LayerId,
    pub frequency_hz: f32,
    pub velocity: f32,
    pub pan: f32,
    pub accented: bool,
    pub start_time_sec: f64,
    pub event_index: u64,
}

impl ToneEvent {
    #[inline]
    pub fn waveform(&self) -> Waveform {
        if self.accented {
            Waveform::Triangle
        } else {
            Waveform::Sine
        }
    }

    #[inline]
    pub fn envelope(&self) -> Envelope {
        Envelope::new(self.velocity, self.accented)
    }

    /// Absolute engine time after which the voice is silent and released.
    #[inline]
    pub fn stop_time_sec(&self) -> f64 {
        self.start_time_sec + self.envelope().stop_offset()
    }
}

/// Attack / exponential-decay envelope, timed relative to the tone start.
///
/// Gain ramps linearly 0 -> `peak` over the attack, then exponentially down
/// to [`DECAY_FLOOR`] and holds there until the voice stops
/// [`RELEASE_TAIL_SEC`] later.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Envelope {
    pub peak: f32,
    pub attack_sec: f64,
    pub decay_sec: f64,
    pub tail_sec: f64,
}

impl Envelope {
    pub fn new(velocity: f32, accented: bool) -> Self {
        let peak = if velocity.is_nan() {
            0.0
        } else {
            velocity.clamp(0.0, 1.0)
        };
        Self {
            peak,
            attack_sec: ATTACK_SEC,
            decay_sec: if accented { ACCENT_DECAY_SEC } else { DECAY_SEC },
            tail_sec: RELEASE_TAIL_SEC,
        }
    }

    #[inline]
    pub fn decay_end(&self) -> f64 {
        self.attack_sec + self.decay_sec
    }

    #[inline]
    pub fn stop_offset(&self) -> f64 {
        self.decay_end() + self.tail_sec
    }

    /// Envelope gain `t` seconds after the tone start.
    pub fn gain_at(&self, t: f64) -> f32 {
        if t < 0.0 || t >= self.stop_offset() || self.peak <= 0.0 {
            return 0.0;
        }
        if t < self.attack_sec {
            return self.peak * (t / self.attack_sec) as f32;
        }
        let floor = DECAY_FLOOR.min(self.peak);
        if t < self.decay_end() {
            let x = ((t - self.attack_sec) / self.decay_sec) as f32;
            return self.peak * (floor / self.peak).powf(x);
        }
        floor
    }
}

/// Equal-power stereo gains for a pan position.
#[inline]
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let p = if pan.is_nan() { 0.0 } else { pan.clamp(-1.0, 1.0) };
    let angle = (p + 1.0) * 0.5 * FRAC_PI_2;
    (angle.cos(), angle.sin())
}

/// Anything that can sound a [`ToneEvent`]. Fire-and-forget: implementations
/// must not block and must tolerate any number of overlapping tones.
pub trait ToneSink {
    fn play(&mut self, tone: &ToneEvent);

    /// Glide the master bus toward `volume` starting at engine time `at_time`.
    fn set_master_volume(&mut self, _volume: f32, _at_time: f64) {}
}

/// Collects tones instead of sounding them.
impl ToneSink for Vec<ToneEvent> {
    fn play(&mut self, tone: &ToneEvent) {
        self.push(tone.clone());
    }
}

/// One sounding tone rendered sample by sample.
#[derive(Clone, Debug)]
pub struct ToneVoice {
    waveform: Waveform,
    envelope: Envelope,
    frequency_hz: f32,
    start_time_sec: f64,
    phase: f32,
    left_gain: f32,
    right_gain: f32,
}

impl ToneVoice {
    pub fn new(tone: &ToneEvent) -> Self {
        let (left_gain, right_gain) = pan_gains(tone.pan);
        let frequency_hz = if tone.frequency_hz.is_finite() {
            tone.frequency_hz.max(0.0)
        } else {
            0.0
        };
        Self {
            waveform: tone.waveform(),
            envelope: tone.envelope(),
            frequency_hz,
            start_time_sec: tone.start_time_sec,
            phase: 0.0,
            left_gain,
            right_gain,
        }
    }

    #[inline]
    pub fn start_time_sec(&self) -> f64 {
        self.start_time_sec
    }

    /// True once engine time `t` is past the voice's stop time.
    #[inline]
    pub fn is_finished(&self, t: f64) -> bool {
        t >= self.start_time_sec + self.envelope.stop_offset()
    }

    /// Render one stereo sample at engine time `t`, advancing the oscillator
    /// only once the tone has started.
    pub fn next_sample(&mut self, t: f64, sample_rate: f32) -> (f32, f32) {
        let rel = t - self.start_time_sec;
        if rel < 0.0 {
            return (0.0, 0.0);
        }
        let amp = self.envelope.gain_at(rel);
        let raw = self.waveform.sample(self.phase) * amp;
        self.phase = (self.phase + self.frequency_hz / sample_rate).fract();
        (raw * self.left_gain, raw * self.right_gain)
    }
}
