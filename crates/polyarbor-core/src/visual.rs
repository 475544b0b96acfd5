//! Render-side view of playback: cycle progress and the radial scope layout.
//!
//! Nothing here touches scheduler phase records. The renderer samples the clock
//! itself each frame and derives everything from the cycle start, the tempo and
//! the layer list, so a slow frame can never disturb audio timing.

use std::f32::consts::{FRAC_PI_2, TAU};

use glam::Vec2;

use crate::constants::*;
use crate::layer::Layer;
use crate::pattern::cycle_duration;

/// Unwrapped master-cycle progress: `(now - cycle_start) / (60 / tempo)`.
///
/// Returns 0 for a non-schedulable tempo. Not wrapped to 0..1; see
/// [`layer_phase`].
#[inline]
pub fn cycle_progress(now: f64, cycle_start: f64, tempo_cpm: f64) -> f64 {
    match cycle_duration(tempo_cpm) {
        Some(d) => (now - cycle_start) / d,
        None => 0.0,
    }
}

/// Position of a layer within its own (speed-scaled) loop, in 0..1.
#[inline]
pub fn layer_phase(progress: f64, speed: f64) -> f64 {
    let p = (progress * speed).rem_euclid(1.0);
    if p.is_finite() {
        p
    } else {
        0.0
    }
}

/// One beat node on a lane.
#[derive(Clone, Debug, PartialEq)]
pub struct BeatNode {
    /// Fraction along the lane, `b / beats`.
    pub fraction: f64,
    pub position: Vec2,
    /// The pulse is passing this node right now.
    pub hit: bool,
}

/// Everything needed to draw one layer's lane in the radial scope.
#[derive(Clone, Debug, PartialEq)]
pub struct ScopeLane {
    pub angle: f32,
    pub end: Vec2,
    /// Pulse distance from the centre as a fraction of the radius.
    pub phase: f64,
    pub pulse: Vec2,
    pub alpha: f32,
    pub color: [f32; 3],
    pub muted: bool,
    pub nodes: Vec<BeatNode>,
    /// Tip label: beat count plus `x<speed>` when not 1x. Empty when muted.
    pub label: String,
}

/// Radial scope geometry for a drawing surface of `size` pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RadialScope {
    pub center: Vec2,
    pub radius: f32,
}

impl RadialScope {
    pub fn new(size: Vec2) -> Self {
        Self {
            center: size * 0.5,
            radius: size.x.min(size.y) * SCOPE_RADIUS_FRACTION,
        }
    }

    /// Lane angle for layer `index` of `count`; lane 0 points straight up.
    #[inline]
    pub fn lane_angle(index: usize, count: usize) -> f32 {
        -FRAC_PI_2 + index as f32 * TAU / count.max(1) as f32
    }

    #[inline]
    fn along(&self, angle: f32, fraction: f32) -> Vec2 {
        self.center + Vec2::new(angle.cos(), angle.sin()) * self.radius * fraction
    }

    /// Lay out every layer for the given unwrapped cycle progress.
    pub fn lanes(&self, layers: &[Layer], progress: f64) -> Vec<ScopeLane> {
        let count = layers.len();
        layers
            .iter()
            .enumerate()
            .map(|(i, layer)| self.lane(layer, i, count, progress))
            .collect()
    }

    fn lane(&self, layer: &Layer, index: usize, count: usize, progress: f64) -> ScopeLane {
        let angle = Self::lane_angle(index, count);
        let speed = if layer.speed > 0.0 { layer.speed } else { 1.0 };
        let phase = layer_phase(progress, speed);
        let tolerance = SCOPE_HIT_TOLERANCE * speed;
        let beats = layer.beats.max(1);
        let nodes = (1..beats)
            .map(|b| {
                let fraction = b as f64 / beats as f64;
                BeatNode {
                    fraction,
                    position: self.along(angle, fraction as f32),
                    hit: !layer.mute && (phase - fraction).abs() < tolerance,
                }
            })
            .collect();
        let label = if layer.mute {
            String::new()
        } else if speed != 1.0 {
            format!("{} x{}", layer.beats, speed)
        } else {
            layer.beats.to_string()
        };
        ScopeLane {
            angle,
            end: self.along(angle, 1.0),
            phase,
            pulse: self.along(angle, phase as f32),
            alpha: if layer.mute {
                SCOPE_ALPHA_MUTED
            } else {
                SCOPE_ALPHA_ACTIVE
            },
            color: layer.color,
            muted: layer.mute,
            nodes,
            label,
        }
    }
}
