use std::cell::RefCell;
use std::rc::Rc;

use polyarbor_core::{
    ClockError, ClockSource, ToneEvent, ToneSink, Waveform, DECAY_FLOOR,
    MASTER_SMOOTHING_TAU_SEC,
};
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys as web;

type SharedContext = Rc<RefCell<Option<web::AudioContext>>>;

/// `AudioContext` timeline. The context is created on the first `resume`,
/// which must happen inside a user gesture for browsers to allow it.
#[derive(Clone, Default)]
pub struct WebAudioClock {
    ctx: SharedContext,
}

impl WebAudioClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(&self) -> Option<web::AudioContext> {
        self.ctx.borrow().clone()
    }

    /// Sink bound to the same (possibly not yet created) context.
    pub fn sink(&self) -> WebAudioSink {
        WebAudioSink {
            ctx: Rc::clone(&self.ctx),
            master: None,
        }
    }
}

impl ClockSource for WebAudioClock {
    fn now(&self) -> f64 {
        self.ctx.borrow().as_ref().map_or(0.0, |c| c.current_time())
    }

    fn resume(&self) -> Result<(), ClockError> {
        if self.ctx.borrow().is_none() {
            let ctx = web::AudioContext::new()
                .map_err(|e| ClockError::Unavailable(format!("{:?}", e)))?;
            *self.ctx.borrow_mut() = Some(ctx);
        }
        let ctx = match self.context() {
            Some(c) => c,
            None => return Err(ClockError::Unavailable("no audio context".into())),
        };
        if ctx.state() == web::AudioContextState::Running {
            return Ok(());
        }
        let promise = ctx
            .resume()
            .map_err(|e| ClockError::ActivationDenied(format!("{:?}", e)))?;
        spawn_local(async move {
            match JsFuture::from(promise).await {
                Ok(_) => log::info!("[audio] context running"),
                Err(e) => log::warn!("[audio] resume rejected: {:?}", e),
            }
        });
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.ctx
            .borrow()
            .as_ref()
            .is_some_and(|c| c.state() == web::AudioContextState::Running)
    }
}

/// One-shot oscillator voices routed through a shared master gain.
pub struct WebAudioSink {
    ctx: SharedContext,
    master: Option<web::GainNode>,
}

fn create_gain(ctx: &web::AudioContext, value: f32, label: &str) -> Option<web::GainNode> {
    match web::GainNode::new(ctx) {
        Ok(g) => {
            g.gain().set_value(value);
            Some(g)
        }
        Err(e) => {
            log::error!("[audio] {} GainNode error: {:?}", label, e);
            None
        }
    }
}

impl WebAudioSink {
    fn master(&mut self, ctx: &web::AudioContext) -> Option<web::GainNode> {
        if self.master.is_none() {
            let g = create_gain(ctx, polyarbor_core::DEFAULT_MASTER_VOLUME, "master")?;
            let _ = g.connect_with_audio_node(&ctx.destination());
            self.master = Some(g);
        }
        self.master.clone()
    }
}

impl ToneSink for WebAudioSink {
    fn play(&mut self, tone: &ToneEvent) {
        if tone.velocity <= 0.0 {
            return;
        }
        let Some(ctx) = self.ctx.borrow().clone() else {
            return;
        };
        let Some(master) = self.master(&ctx) else {
            return;
        };
        let env = tone.envelope();
        let t0 = tone.start_time_sec;

        let Ok(src) = web::OscillatorNode::new(&ctx) else {
            return;
        };
        src.set_type(match tone.waveform() {
            Waveform::Sine => web::OscillatorType::Sine,
            Waveform::Triangle => web::OscillatorType::Triangle,
        });
        src.frequency().set_value(tone.frequency_hz);

        let Some(g) = create_gain(&ctx, 0.0, "voice") else {
            return;
        };
        let _ = g.gain().set_value_at_time(0.0, t0);
        let _ = g
            .gain()
            .linear_ramp_to_value_at_time(env.peak, t0 + env.attack_sec);
        let _ = g
            .gain()
            .exponential_ramp_to_value_at_time(DECAY_FLOOR.min(env.peak), t0 + env.decay_end());

        let _ = src.connect_with_audio_node(&g);
        match web::StereoPannerNode::new(&ctx) {
            Ok(p) => {
                p.pan().set_value(tone.pan);
                let _ = g.connect_with_audio_node(&p);
                let _ = p.connect_with_audio_node(&master);
            }
            Err(e) => {
                log::warn!("[audio] StereoPannerNode error: {:?}", e);
                let _ = g.connect_with_audio_node(&master);
            }
        }
        let _ = src.start_with_when(t0);
        let _ = src.stop_with_when(t0 + env.stop_offset());
    }

    fn set_master_volume(&mut self, volume: f32, at_time: f64) {
        let Some(ctx) = self.ctx.borrow().clone() else {
            return;
        };
        if let Some(master) = self.master(&ctx) {
            let _ = master.gain().set_target_at_time(
                volume,
                at_time,
                MASTER_SMOOTHING_TAU_SEC as f64,
            );
        }
    }
}
