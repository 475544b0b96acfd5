//! Rhythmic layers and the editing model the UI uses to produce them.

use std::fmt;

use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::LayerError;

/// Stable identity of a layer. Survives reordering; keys all phase bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub u64);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// One independent rhythmic voice.
///
/// Fields:
/// - `beats`: evenly spaced base events per master cycle (>= 1)
/// - `speed`: multiplier on `beats`; effective events per cycle are `beats * speed`
/// - `mute`: muted layers keep advancing phase but stay silent
/// - `frequency`: base pitch in Hz (accents sound an octave above)
/// - `volume`: linear gain 0..1, `pan`: stereo position -1..1
/// - `color`: display only, ignored by the scheduler
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    pub beats: u32,
    pub speed: f64,
    pub mute: bool,
    pub frequency: f32,
    pub volume: f32,
    pub pan: f32,
    pub color: [f32; 3],
}

impl Layer {
    pub fn new(id: LayerId, beats: u32, frequency: f32) -> Self {
        Self {
            id,
            beats,
            speed: 1.0,
            mute: false,
            frequency,
            volume: DEFAULT_LAYER_VOLUME,
            pan: 0.0,
            color: LAYER_COLORS[0],
        }
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn muted(mut self, mute: bool) -> Self {
        self.mute = mute;
        self
    }

    #[inline]
    pub fn effective_beats(&self) -> f64 {
        self.beats as f64 * self.speed
    }

    /// Seconds between consecutive events for a given master cycle length.
    ///
    /// `None` when the layer cannot be scheduled (`beats * speed <= 0`, a
    /// non-finite result, or events closer than [`MIN_BEAT_DURATION_SEC`]);
    /// such layers are skipped rather than divided by.
    pub fn beat_duration(&self, cycle_duration: f64) -> Option<f64> {
        let effective = self.effective_beats();
        if !(effective > 0.0) || !effective.is_finite() {
            return None;
        }
        let d = cycle_duration / effective;
        (d >= MIN_BEAT_DURATION_SEC && d.is_finite()).then_some(d)
    }

    /// Accent lands on the first step of each of the layer's own beat cycles,
    /// independent of speed.
    #[inline]
    pub fn is_accent(&self, event_index: u64) -> bool {
        event_index % self.beats.max(1) as u64 == 0
    }

    #[inline]
    pub fn clamped_volume(&self) -> f32 {
        if self.volume.is_nan() {
            0.0
        } else {
            self.volume.clamp(0.0, 1.0)
        }
    }

    #[inline]
    pub fn clamped_pan(&self) -> f32 {
        if self.pan.is_nan() {
            0.0
        } else {
            self.pan.clamp(-1.0, 1.0)
        }
    }

    pub fn validate(&self) -> Result<(), LayerError> {
        if self.beats < BEATS_MIN {
            return Err(LayerError::InvalidBeats(self.beats));
        }
        if !(self.speed > 0.0) || !self.speed.is_finite() {
            return Err(LayerError::InvalidSpeed(self.speed));
        }
        if !(self.frequency > 0.0) || !self.frequency.is_finite() {
            return Err(LayerError::InvalidFrequency(self.frequency));
        }
        Ok(())
    }
}

/// Convert a MIDI note number to Hertz (A4=440 Hz).
///
/// Monotonic and exhibits octave symmetry: +12 semitones doubles the frequency.
pub fn midi_to_hz(midi: f32) -> f32 {
    440.0 * (2.0_f32).powf((midi - 69.0) / 12.0)
}

/// Frequency of the `index`-th pentatonic degree, wrapping around the scale.
pub fn pentatonic_hz(index: usize) -> f32 {
    midi_to_hz(PENTATONIC_MIDI[index % PENTATONIC_MIDI.len()] as f32)
}

/// Snap an arbitrary rate to the closest entry of [`SPEED_OPTIONS`].
pub fn snap_speed(speed: f64) -> f64 {
    if !speed.is_finite() {
        return 1.0;
    }
    SPEED_OPTIONS
        .iter()
        .copied()
        .min_by(|a, b| (a - speed).abs().total_cmp(&(b - speed).abs()))
        .unwrap_or(1.0)
}

/// Ordered, editable collection of layers with id generation.
///
/// This is the caller-side model: the UI edits it and hands
/// [`layers`](Self::layers) to the engine. Setters clamp values to the ranges
/// the controls expose.
pub struct LayerBank {
    layers: Vec<Layer>,
    next_id: u64,
    rng: StdRng,
}

impl Default for LayerBank {
    fn default() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl LayerBank {
    /// Empty bank with a deterministic pan RNG.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            layers: Vec::new(),
            next_id: 1,
            rng,
        }
    }

    /// The starting pattern: 3 against 4, on C4 and E4.
    pub fn with_defaults(seed: u64) -> Self {
        let mut bank = Self::with_seed(seed);
        for (beats, degree, color) in [(3, 2, 1), (4, 4, 2)] {
            let id = bank.fresh_id();
            let mut layer = Layer::new(id, beats, pentatonic_hz(degree));
            layer.color = LAYER_COLORS[color];
            bank.layers.push(layer);
        }
        bank
    }

    fn fresh_id(&mut self) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn to_vec(&self) -> Vec<Layer> {
        self.layers.clone()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// Append a layer derived from the current bank contents.
    ///
    /// Beats count up from the last layer (wrapping to 2 past 16), colour and
    /// pitch walk the palette and pentatonic scale, pan is randomised around
    /// the centre.
    pub fn add_layer(&mut self) -> Result<LayerId, LayerError> {
        let n = self.layers.len();
        if n >= MAX_LAYERS {
            return Err(LayerError::LimitReached(MAX_LAYERS));
        }
        let next_beats = self.layers.last().map_or(1, |l| l.beats) + 1;
        let beats = if next_beats > AUTO_BEATS_WRAP { 2 } else { next_beats };
        let id = self.fresh_id();
        let mut layer = Layer::new(id, beats, pentatonic_hz(n));
        layer.color = LAYER_COLORS[n % LAYER_COLORS.len()];
        layer.pan = self.rng.gen::<f32>() - 0.5;
        self.layers.push(layer);
        log::debug!("[bank] added {} beats={} pan={:.2}", id, beats, self.layers[n].pan);
        Ok(id)
    }

    /// Insert a caller-built layer, validating it first. Its id is kept if
    /// unused, otherwise a fresh one is assigned.
    pub fn insert(&mut self, mut layer: Layer) -> Result<LayerId, LayerError> {
        if self.layers.len() >= MAX_LAYERS {
            return Err(LayerError::LimitReached(MAX_LAYERS));
        }
        layer.validate()?;
        if self.get(layer.id).is_some() || layer.id.0 == 0 {
            layer.id = self.fresh_id();
        } else {
            self.next_id = self.next_id.max(layer.id.0 + 1);
        }
        let id = layer.id;
        self.layers.push(layer);
        Ok(id)
    }

    pub fn remove_layer(&mut self, id: LayerId) -> Result<Layer, LayerError> {
        let idx = self
            .layers
            .iter()
            .position(|l| l.id == id)
            .ok_or(LayerError::UnknownLayer(id))?;
        Ok(self.layers.remove(idx))
    }

    /// Apply an arbitrary edit to one layer.
    pub fn update_layer(
        &mut self,
        id: LayerId,
        edit: impl FnOnce(&mut Layer),
    ) -> Result<(), LayerError> {
        let layer = self
            .layers
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(LayerError::UnknownLayer(id))?;
        edit(layer);
        Ok(())
    }

    pub fn toggle_mute(&mut self, id: LayerId) -> Result<bool, LayerError> {
        let mut muted = false;
        self.update_layer(id, |l| {
            l.mute = !l.mute;
            muted = l.mute;
        })?;
        Ok(muted)
    }

    pub fn set_beats(&mut self, id: LayerId, beats: u32) -> Result<(), LayerError> {
        self.update_layer(id, |l| l.beats = beats.clamp(BEATS_MIN, BEATS_MAX))
    }

    pub fn set_speed(&mut self, id: LayerId, speed: f64) -> Result<(), LayerError> {
        self.update_layer(id, |l| l.speed = snap_speed(speed))
    }

    pub fn set_volume(&mut self, id: LayerId, volume: f32) -> Result<(), LayerError> {
        self.update_layer(id, |l| l.volume = volume.clamp(0.0, 1.0))
    }

    pub fn set_pan(&mut self, id: LayerId, pan: f32) -> Result<(), LayerError> {
        self.update_layer(id, |l| l.pan = pan.clamp(-1.0, 1.0))
    }

    pub fn set_frequency(&mut self, id: LayerId, frequency: f32) -> Result<(), LayerError> {
        if !(frequency > 0.0) || !frequency.is_finite() {
            return Err(LayerError::InvalidFrequency(frequency));
        }
        self.update_layer(id, |l| l.frequency = frequency)
    }
}
