use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MASTER_VOLUME, DEFAULT_TEMPO_CPM, TEMPO_MAX_CPM, TEMPO_MIN_CPM};
use crate::layer::Layer;

/// Snapshot of the caller-owned state the scheduler samples every pass.
///
/// - `layers`: ordered layer list (order is display-only; ids carry identity)
/// - `tempo_cpm`: master cycles per minute; one cycle lasts `60 / tempo_cpm` seconds
/// - `master_volume`: bus gain 0..1 applied after all voices
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub layers: Vec<Layer>,
    pub tempo_cpm: f64,
    pub master_volume: f32,
}

impl Default for Pattern {
    fn default() -> Self {
        Self {
            layers: Vec::new(),
            tempo_cpm: DEFAULT_TEMPO_CPM,
            master_volume: DEFAULT_MASTER_VOLUME,
        }
    }
}

impl Pattern {
    pub fn new(layers: Vec<Layer>) -> Self {
        Self {
            layers,
            ..Self::default()
        }
    }

    /// Master cycle length in seconds, or `None` for a non-positive tempo.
    #[inline]
    pub fn cycle_duration(&self) -> Option<f64> {
        cycle_duration(self.tempo_cpm)
    }
}

/// `60 / tempo`, guarded against zero, negative and non-finite tempos.
#[inline]
pub fn cycle_duration(tempo_cpm: f64) -> Option<f64> {
    (tempo_cpm > 0.0 && tempo_cpm.is_finite()).then(|| 60.0 / tempo_cpm)
}

/// Clamp a tempo to the range the transport control offers.
#[inline]
pub fn clamp_tempo(tempo_cpm: f64) -> f64 {
    if tempo_cpm.is_nan() {
        DEFAULT_TEMPO_CPM
    } else {
        tempo_cpm.clamp(TEMPO_MIN_CPM, TEMPO_MAX_CPM)
    }
}
