//! Facade tying a clock, a tone sink, the caller's latest pattern and the
//! scheduler together. Frontends own one of these and drive [`AudioEngine::tick`]
//! from a timer at [`SchedulerConfig::pass_interval`].

use smallvec::SmallVec;

use crate::clock::ClockSource;
use crate::layer::{Layer, LayerId};
use crate::pattern::Pattern;
use crate::scheduler::{PolyrhythmScheduler, SchedulerConfig, Transport};
use crate::voice::ToneSink;

pub struct AudioEngine<C: ClockSource, S: ToneSink> {
    clock: C,
    sink: S,
    pattern: Pattern,
    scheduler: PolyrhythmScheduler,
}

impl<C: ClockSource, S: ToneSink> AudioEngine<C, S> {
    pub fn new(clock: C, sink: S, config: SchedulerConfig) -> Self {
        Self {
            clock,
            sink,
            pattern: Pattern::default(),
            scheduler: PolyrhythmScheduler::new(config),
        }
    }

    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn scheduler(&self) -> &PolyrhythmScheduler {
        &self.scheduler
    }

    /// Replace the layer list. Ids that disappear lose their phase right away,
    /// so re-adding one later always joins fresh.
    pub fn set_layers(&mut self, layers: Vec<Layer>) {
        let removed: SmallVec<[LayerId; 8]> = self
            .pattern
            .layers
            .iter()
            .map(|l| l.id)
            .filter(|id| !layers.iter().any(|l| l.id == *id))
            .collect();
        for id in removed {
            self.scheduler.forget_layer(id);
        }
        self.pattern.layers = layers;
    }

    /// Cycles per minute. Takes effect from each layer's next event.
    pub fn set_tempo(&mut self, tempo_cpm: f64) {
        self.pattern.tempo_cpm = tempo_cpm;
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        let volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };
        self.pattern.master_volume = volume;
        self.sink.set_master_volume(volume, self.clock.now());
    }

    /// Request playback. Activation failures are logged and the session waits
    /// for the clock; calling again retries activation.
    pub fn start(&mut self) {
        if !self.clock.is_active() {
            if let Err(e) = self.clock.resume() {
                log::warn!("[engine] audio activation failed: {}", e);
            }
        }
        self.sink
            .set_master_volume(self.pattern.master_volume, self.clock.now());
        self.scheduler
            .start(self.clock.now(), self.clock.is_active(), &self.pattern.layers);
    }

    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    pub fn is_playing(&self) -> bool {
        self.scheduler.is_playing()
    }

    pub fn transport(&self) -> Transport {
        self.scheduler.transport()
    }

    /// Run one scheduling pass against the current clock time.
    pub fn tick(&mut self) -> usize {
        self.scheduler.pass(
            self.clock.now(),
            self.clock.is_active(),
            &self.pattern,
            &mut self.sink,
        )
    }

    pub fn cycle_start(&self) -> Option<f64> {
        self.scheduler.cycle_start()
    }

    pub fn cycle_progress(&self) -> f64 {
        self.scheduler
            .cycle_progress(self.clock.now(), self.pattern.tempo_cpm)
    }
}
