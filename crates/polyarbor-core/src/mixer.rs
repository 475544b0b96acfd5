//! Sample-level polyphonic mixer for the tone-voice contract.
//!
//! Used by backends that pull audio in blocks (cpal) instead of building a node
//! graph. Time is counted in rendered frames, so the mixer itself is the clock
//! the scheduler runs against.

use crate::constants::{DEFAULT_MASTER_VOLUME, MASTER_SMOOTHING_TAU_SEC};
use crate::voice::{ToneEvent, ToneSink, ToneVoice};

pub struct VoiceMixer {
    sample_rate: f32,
    frames_rendered: u64,
    voices: Vec<ToneVoice>,
    master_gain: f32,
    master_target: f32,
    master_alpha: f32,
}

impl VoiceMixer {
    pub fn new(sample_rate: f32) -> Self {
        let sample_rate = if sample_rate > 0.0 { sample_rate } else { 48_000.0 };
        Self {
            sample_rate,
            frames_rendered: 0,
            voices: Vec::new(),
            master_gain: DEFAULT_MASTER_VOLUME,
            master_target: DEFAULT_MASTER_VOLUME,
            // one-pole approach toward the target, tau in seconds
            master_alpha: 1.0 - (-1.0 / (MASTER_SMOOTHING_TAU_SEC * sample_rate)).exp(),
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Engine time of the next frame to be rendered.
    #[inline]
    pub fn time_sec(&self) -> f64 {
        self.frames_rendered as f64 / self.sample_rate as f64
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn master_gain(&self) -> f32 {
        self.master_gain
    }

    pub fn schedule(&mut self, tone: &ToneEvent) {
        if tone.velocity <= 0.0 || tone.stop_time_sec() <= self.time_sec() {
            return;
        }
        self.voices.push(ToneVoice::new(tone));
    }

    pub fn set_master_target(&mut self, volume: f32) {
        self.master_target = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };
    }

    /// Render one stereo frame and advance time by one sample.
    pub fn next_frame(&mut self) -> (f32, f32) {
        let t = self.time_sec();
        let sr = self.sample_rate;
        let mut left = 0.0f32;
        let mut right = 0.0f32;
        let mut i = 0usize;
        while i < self.voices.len() {
            if self.voices[i].is_finished(t) {
                self.voices.swap_remove(i);
                continue;
            }
            let (l, r) = self.voices[i].next_sample(t, sr);
            left += l;
            right += r;
            i += 1;
        }
        self.master_gain += (self.master_target - self.master_gain) * self.master_alpha;
        self.frames_rendered += 1;
        (
            (left * self.master_gain).tanh(),
            (right * self.master_gain).tanh(),
        )
    }

    /// Fill an interleaved buffer. Channels beyond two are left silent; a mono
    /// buffer gets the average of both sides.
    pub fn render_interleaved(&mut self, data: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        for frame in data.chunks_mut(channels) {
            let (l, r) = self.next_frame();
            match frame {
                [mono] => *mono = 0.5 * (l + r),
                [fl, fr, rest @ ..] => {
                    *fl = l;
                    *fr = r;
                    rest.iter_mut().for_each(|s| *s = 0.0);
                }
                [] => {}
            }
        }
    }
}

impl ToneSink for VoiceMixer {
    fn play(&mut self, tone: &ToneEvent) {
        self.schedule(tone);
    }

    fn set_master_volume(&mut self, volume: f32, _at_time: f64) {
        self.set_master_target(volume);
    }
}
