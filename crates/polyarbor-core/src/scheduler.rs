//! Look-ahead polyrhythm scheduler.
//!
//! A recurring pass (every [`SchedulerConfig::pass_interval`]) samples the
//! latest [`Pattern`], works out which layer events fall inside the window
//! `[now, now + lookahead)` and hands them to a [`ToneSink`] with their exact
//! start times. Per-layer phase lives in a map keyed by [`LayerId`], so layers
//! can be added, removed and reordered mid-session without disturbing the rest.
//!
//! Typical usage:
//! - `start(now, clock_active, &layers)` when the user presses play
//! - `pass(now, clock_active, &pattern, &mut sink)` from a timer
//! - `stop()` to end the session; in-flight tones ring out on their own

use std::time::Duration;

use fnv::{FnvHashMap, FnvHashSet};

use crate::constants::*;
use crate::layer::{Layer, LayerId};
use crate::pattern::Pattern;
use crate::visual::cycle_progress;
use crate::voice::{ToneEvent, ToneSink};

/// Timing policy for the scheduler.
///
/// - `lookahead_sec`: how far past `now` each pass schedules
/// - `pass_interval`: how often the frontend should call [`PolyrhythmScheduler::pass`]
/// - `start_delay_sec`: offset between the start call and cycle progress 0
/// - `backlog_tolerance_sec`: due events older than this are advanced over silently
#[derive(Clone, Debug, PartialEq)]
pub struct SchedulerConfig {
    pub lookahead_sec: f64,
    pub pass_interval: Duration,
    pub start_delay_sec: f64,
    pub backlog_tolerance_sec: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lookahead_sec: LOOKAHEAD_SEC,
            pass_interval: Duration::from_millis(PASS_INTERVAL_MS),
            start_delay_sec: START_DELAY_SEC,
            backlog_tolerance_sec: BACKLOG_TOLERANCE_SEC,
        }
    }
}

/// Where one layer is in its own event sequence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerPhase {
    /// Engine time of the earliest event not yet emitted or skipped.
    pub next_event_time: f64,
    /// Events emitted or skipped since the session started or the layer joined.
    pub event_index: u64,
}

impl LayerPhase {
    #[inline]
    fn origin(cycle_start: f64) -> Self {
        Self {
            next_event_time: cycle_start,
            event_index: 0,
        }
    }

    /// Advance silently over whole beats that end before `oldest_audible`,
    /// in one step instead of one beat at a time.
    fn skip_stale(&mut self, oldest_audible: f64, beat_duration: f64) {
        let behind = ((oldest_audible - self.next_event_time) / beat_duration).floor();
        if behind >= 1.0 {
            self.next_event_time += behind * beat_duration;
            self.event_index = self.event_index.saturating_add(behind as u64);
        }
    }
}

/// Session state machine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Transport {
    Stopped,
    /// Play was requested but the clock is not active yet. The cycle is
    /// anchored on the first pass that sees an active clock.
    AwaitingClock,
    Running { cycle_start: f64 },
}

pub struct PolyrhythmScheduler {
    config: SchedulerConfig,
    transport: Transport,
    phases: FnvHashMap<LayerId, LayerPhase>,
    unschedulable: FnvHashSet<LayerId>,
    tempo_warned: bool,
}

impl Default for PolyrhythmScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl PolyrhythmScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            transport: Transport::Stopped,
            phases: FnvHashMap::default(),
            unschedulable: FnvHashSet::default(),
            tempo_warned: false,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// True between `start` and `stop`, including while waiting for the clock.
    pub fn is_playing(&self) -> bool {
        !matches!(self.transport, Transport::Stopped)
    }

    /// Engine time of cycle progress 0, once anchored.
    pub fn cycle_start(&self) -> Option<f64> {
        match self.transport {
            Transport::Running { cycle_start } => Some(cycle_start),
            _ => None,
        }
    }

    /// Read-only view of one layer's phase.
    pub fn phase(&self, id: LayerId) -> Option<LayerPhase> {
        self.phases.get(&id).copied()
    }

    pub fn tracked_layers(&self) -> usize {
        self.phases.len()
    }

    /// Begin a session. No-op while already playing.
    pub fn start(&mut self, now: f64, clock_active: bool, layers: &[Layer]) {
        if self.is_playing() {
            log::debug!("[scheduler] start ignored; already playing");
            return;
        }
        self.phases.clear();
        self.unschedulable.clear();
        self.tempo_warned = false;
        if clock_active {
            self.anchor(now, layers);
        } else {
            log::info!("[scheduler] play requested; waiting for audio clock");
            self.transport = Transport::AwaitingClock;
        }
    }

    /// End the session and drop all phase state.
    pub fn stop(&mut self) {
        if !self.is_playing() {
            return;
        }
        self.transport = Transport::Stopped;
        self.phases.clear();
        self.unschedulable.clear();
        log::info!("[scheduler] stopped");
    }

    /// Drop a layer's phase immediately, so a later layer with the same id
    /// joins fresh even if no pass ran in between.
    pub fn forget_layer(&mut self, id: LayerId) {
        if self.phases.remove(&id).is_some() {
            log::debug!("[scheduler] forgot {}", id);
        }
        self.unschedulable.remove(&id);
    }

    fn anchor(&mut self, now: f64, layers: &[Layer]) {
        let cycle_start = now + self.config.start_delay_sec;
        self.transport = Transport::Running { cycle_start };
        for layer in layers {
            self.phases.insert(layer.id, LayerPhase::origin(cycle_start));
        }
        log::info!(
            "[scheduler] cycle anchored at {:.3}s with {} layers",
            cycle_start,
            layers.len()
        );
    }

    /// Unwrapped master-cycle progress; 0 unless running.
    pub fn cycle_progress(&self, now: f64, tempo_cpm: f64) -> f64 {
        self.cycle_start()
            .map_or(0.0, |start| cycle_progress(now, start, tempo_cpm))
    }

    /// One scheduling pass. Returns the number of tones handed to `sink`.
    pub fn pass(
        &mut self,
        now: f64,
        clock_active: bool,
        pattern: &Pattern,
        sink: &mut impl ToneSink,
    ) -> usize {
        let cycle_start = match self.transport {
            Transport::Stopped => return 0,
            Transport::AwaitingClock if !clock_active => return 0,
            Transport::AwaitingClock => {
                self.anchor(now, &pattern.layers);
                match self.transport {
                    Transport::Running { cycle_start } => cycle_start,
                    _ => return 0,
                }
            }
            Transport::Running { cycle_start } => cycle_start,
        };

        self.collect_garbage(&pattern.layers);

        let Some(cycle_duration) = pattern.cycle_duration() else {
            if !self.tempo_warned {
                log::warn!(
                    "[scheduler] tempo {} is not schedulable; pass skipped",
                    pattern.tempo_cpm
                );
                self.tempo_warned = true;
            }
            return 0;
        };
        self.tempo_warned = false;

        let horizon = now + self.config.lookahead_sec;
        let oldest_audible = now - self.config.backlog_tolerance_sec;
        let mut emitted = 0usize;

        for layer in &pattern.layers {
            let Some(beat_duration) = layer.beat_duration(cycle_duration) else {
                if self.unschedulable.insert(layer.id) {
                    log::warn!(
                        "[scheduler] {} skipped: beats={} speed={}",
                        layer.id,
                        layer.beats,
                        layer.speed
                    );
                }
                continue;
            };

            let phase = self.phases.entry(layer.id).or_insert_with(|| {
                let joined = join_phase(now, cycle_start, cycle_duration, beat_duration);
                log::debug!(
                    "[scheduler] {} joined at index {} (t={:.3}s)",
                    layer.id,
                    joined.event_index,
                    joined.next_event_time
                );
                joined
            });

            phase.skip_stale(oldest_audible, beat_duration);

            // time too large for the step to register; would never advance
            if phase.next_event_time + beat_duration <= phase.next_event_time {
                if self.unschedulable.insert(layer.id) {
                    log::warn!(
                        "[scheduler] {} skipped: step {}s lost at t={}s",
                        layer.id,
                        beat_duration,
                        phase.next_event_time
                    );
                }
                continue;
            }
            self.unschedulable.remove(&layer.id);

            while phase.next_event_time < horizon {
                if !layer.mute && phase.next_event_time >= oldest_audible {
                    sink.play(&tone_for(layer, phase));
                    emitted += 1;
                }
                phase.next_event_time += beat_duration;
                phase.event_index += 1;
            }
        }
        emitted
    }

    fn collect_garbage(&mut self, layers: &[Layer]) {
        if self.phases.len() <= layers.len()
            && self.phases.keys().all(|id| layers.iter().any(|l| l.id == *id))
        {
            return;
        }
        let present: FnvHashSet<LayerId> = layers.iter().map(|l| l.id).collect();
        self.phases.retain(|id, _| {
            let keep = present.contains(id);
            if !keep {
                log::debug!("[scheduler] dropped phase for removed {}", id);
            }
            keep
        });
        self.unschedulable.retain(|id| present.contains(id));
    }
}

/// Phase for a layer that appears mid-session: the first beat boundary of the
/// current master cycle strictly after `now`.
pub fn join_phase(now: f64, cycle_start: f64, cycle_duration: f64, beat_duration: f64) -> LayerPhase {
    let elapsed = now - cycle_start;
    let cycle_number = (elapsed / cycle_duration).floor();
    let current_cycle_start = cycle_start + cycle_number * cycle_duration;
    let beats_passed = ((now - current_cycle_start) / beat_duration).floor().max(0.0);
    let next_index = beats_passed + 1.0;
    LayerPhase {
        next_event_time: current_cycle_start + next_index * beat_duration,
        event_index: next_index as u64,
    }
}

fn tone_for(layer: &Layer, phase: &LayerPhase) -> ToneEvent {
    let accented = layer.is_accent(phase.event_index);
    let (gain, ratio) = if accented {
        (ACCENT_GAIN, ACCENT_FREQUENCY_RATIO)
    } else {
        (BEAT_GAIN, 1.0)
    };
    ToneEvent {
        layer_id: layer.id,
        frequency_hz: layer.frequency * ratio,
        velocity: gain * layer.clamped_volume(),
        pan: layer.clamped_pan(),
        accented,
        start_time_sec: phase.next_event_time,
        event_index: phase.event_index,
    }
}
