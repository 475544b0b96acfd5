//! Scripted demo session: exercises live edits against a running engine and
//! prints a text rendition of the radial scope once per second.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use glam::Vec2;
use polyarbor_core::{
    AudioEngine, ClockSource, LayerBank, LayerId, RadialScope, ScopeLane, ToneSink,
};

use crate::timer::{PassTimer, SharedEngine};

const SCOPE_WIDTH: usize = 32;
const REPORT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug)]
enum Step {
    Start,
    AddLayer,
    ToggleFirstMute,
    SetTempo(f64),
    RemoveAdded,
    Stop,
}

/// (seconds after launch, action)
const SCRIPT: [(f64, Step); 7] = [
    (0.0, Step::Start),
    (2.5, Step::AddLayer),
    (6.0, Step::ToggleFirstMute),
    (9.0, Step::SetTempo(30.0)),
    (12.0, Step::RemoveAdded),
    (13.0, Step::ToggleFirstMute),
    (18.0, Step::Stop),
];

pub struct DemoSession<C: ClockSource, S: ToneSink> {
    engine: SharedEngine<C, S>,
    bank: LayerBank,
    added: Option<LayerId>,
    scope: RadialScope,
    pass_interval: Duration,
    /// Present only while playing; dropping it stops the passes.
    timer: Option<PassTimer>,
}

impl<C, S> DemoSession<C, S>
where
    C: ClockSource + Send + 'static,
    S: ToneSink + Send + 'static,
{
    pub fn new(engine: SharedEngine<C, S>, bank: LayerBank, pass_interval: Duration) -> Self {
        Self {
            engine,
            bank,
            added: None,
            scope: RadialScope::new(Vec2::splat(100.0)),
            pass_interval,
            timer: None,
        }
    }

    fn with_engine<R>(&self, f: impl FnOnce(&mut AudioEngine<C, S>) -> R) -> R {
        let mut guard = self
            .engine
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut guard)
    }

    fn push_layers(&self) {
        let layers = self.bank.to_vec();
        self.with_engine(|e| e.set_layers(layers));
    }

    fn apply(&mut self, step: Step) -> anyhow::Result<()> {
        log::info!("[demo] {:?}", step);
        match step {
            Step::Start => {
                self.push_layers();
                self.with_engine(|e| e.start());
                if self.timer.is_none() {
                    self.timer = Some(PassTimer::spawn(
                        Arc::clone(&self.engine),
                        self.pass_interval,
                    )?);
                }
            }
            Step::AddLayer => {
                self.added = Some(self.bank.add_layer()?);
                self.push_layers();
            }
            Step::ToggleFirstMute => {
                if let Some(id) = self.bank.layers().first().map(|l| l.id) {
                    let muted = self.bank.toggle_mute(id)?;
                    log::info!("[demo] {} muted={}", id, muted);
                    self.push_layers();
                }
            }
            Step::SetTempo(cpm) => self.with_engine(|e| e.set_tempo(cpm)),
            Step::RemoveAdded => {
                if let Some(id) = self.added.take() {
                    self.bank.remove_layer(id)?;
                    self.push_layers();
                }
            }
            Step::Stop => {
                self.with_engine(|e| e.stop());
                self.timer = None;
            }
        }
        Ok(())
    }

    fn report(&self) {
        let (progress, playing) = self.with_engine(|e| (e.cycle_progress(), e.is_playing()));
        if !playing {
            return;
        }
        log::info!("[scope] cycle {:.2}", progress);
        for (layer, lane) in self
            .bank
            .layers()
            .iter()
            .zip(self.scope.lanes(self.bank.layers(), progress))
        {
            log::info!(
                "[scope] {} {:<6} {}",
                layer.id,
                lane.label,
                lane_bar(&lane, SCOPE_WIDTH)
            );
        }
    }

    /// Run the script to completion, blocking the calling thread.
    pub fn run(mut self) -> anyhow::Result<()> {
        let launched = Instant::now();
        let mut next_report = launched;
        for (at, step) in SCRIPT {
            let due = launched + Duration::from_secs_f64(at);
            while Instant::now() < due {
                if Instant::now() >= next_report {
                    self.report();
                    next_report += REPORT_INTERVAL;
                }
                thread::sleep(Duration::from_millis(20));
            }
            self.apply(step)?;
        }
        // let the last tails ring out
        thread::sleep(Duration::from_millis(400));
        Ok(())
    }
}

/// One lane as text: `o` for beat nodes, `*` for a node the pulse is on,
/// `>` for the pulse itself. Muted lanes draw as dots.
pub fn lane_bar(lane: &ScopeLane, width: usize) -> String {
    let width = width.max(2);
    let muted = lane.muted;
    let mut cells = vec![if muted { '.' } else { '-' }; width];
    cells[0] = '|';
    let slot = |fraction: f64| ((fraction * width as f64) as usize).min(width - 1);
    for node in &lane.nodes {
        cells[slot(node.fraction)] = if node.hit { '*' } else { 'o' };
    }
    if !muted {
        let pulse = slot(lane.phase);
        if cells[pulse] != '*' {
            cells[pulse] = '>';
        }
    }
    cells.into_iter().collect()
}
