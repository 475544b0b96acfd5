#![cfg(target_arch = "wasm32")]
use std::cell::RefCell;
use std::rc::Rc;

use polyarbor_core::{
    AudioEngine, Layer, LayerBank, LayerError, LayerId, SchedulerConfig, PASS_INTERVAL_MS,
};
use wasm_bindgen::prelude::*;

mod audio;
mod timer;

use audio::{WebAudioClock, WebAudioSink};
use timer::PassTimer;

type Engine = AudioEngine<WebAudioClock, WebAudioSink>;

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("polyarbor-web starting");
    Ok(())
}

fn js_err(e: LayerError) -> JsError {
    JsError::new(&e.to_string())
}

/// Handle the page holds on to. Every layer edit goes through the bank and is
/// pushed to the engine, which picks it up on its next pass.
#[wasm_bindgen]
pub struct PolyArbor {
    engine: Rc<RefCell<Engine>>,
    bank: LayerBank,
    timer: Option<PassTimer>,
}

#[wasm_bindgen]
impl PolyArbor {
    #[wasm_bindgen(constructor)]
    pub fn new() -> PolyArbor {
        let clock = WebAudioClock::new();
        let sink = clock.sink();
        let seed = (js_sys::Math::random() * u32::MAX as f64) as u64;
        let bank = LayerBank::with_defaults(seed);
        let mut engine = AudioEngine::new(clock, sink, SchedulerConfig::default());
        engine.set_layers(bank.to_vec());
        PolyArbor {
            engine: Rc::new(RefCell::new(engine)),
            bank,
            timer: None,
        }
    }

    /// Start playback. Call from a click or key handler so the browser lets
    /// the audio context run.
    pub fn start(&mut self) -> Result<(), JsValue> {
        self.engine.borrow_mut().start();
        if self.timer.is_none() {
            let engine = Rc::clone(&self.engine);
            self.timer = Some(PassTimer::start(PASS_INTERVAL_MS as i32, move || {
                engine.borrow_mut().tick();
            })?);
        }
        Ok(())
    }

    pub fn stop(&mut self) {
        self.engine.borrow_mut().stop();
        self.timer = None;
    }

    pub fn is_playing(&self) -> bool {
        self.engine.borrow().is_playing()
    }

    /// Unwrapped master-cycle progress for the renderer; 0 while stopped.
    pub fn cycle_progress(&self) -> f64 {
        self.engine.borrow().cycle_progress()
    }

    pub fn set_tempo(&mut self, tempo_cpm: f64) {
        self.engine.borrow_mut().set_tempo(tempo_cpm);
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.engine.borrow_mut().set_master_volume(volume);
    }

    pub fn add_layer(&mut self) -> Result<u64, JsError> {
        let id = self.bank.add_layer().map_err(js_err)?;
        self.sync();
        Ok(id.0)
    }

    pub fn remove_layer(&mut self, id: u64) -> Result<(), JsError> {
        self.bank.remove_layer(LayerId(id)).map_err(js_err)?;
        self.sync();
        Ok(())
    }

    pub fn toggle_mute(&mut self, id: u64) -> Result<bool, JsError> {
        let muted = self.bank.toggle_mute(LayerId(id)).map_err(js_err)?;
        self.sync();
        Ok(muted)
    }

    pub fn set_beats(&mut self, id: u64, beats: u32) -> Result<(), JsError> {
        self.bank.set_beats(LayerId(id), beats).map_err(js_err)?;
        self.sync();
        Ok(())
    }

    pub fn set_speed(&mut self, id: u64, speed: f64) -> Result<(), JsError> {
        self.bank.set_speed(LayerId(id), speed).map_err(js_err)?;
        self.sync();
        Ok(())
    }

    pub fn set_volume(&mut self, id: u64, volume: f32) -> Result<(), JsError> {
        self.bank.set_volume(LayerId(id), volume).map_err(js_err)?;
        self.sync();
        Ok(())
    }

    pub fn set_pan(&mut self, id: u64, pan: f32) -> Result<(), JsError> {
        self.bank.set_pan(LayerId(id), pan).map_err(js_err)?;
        self.sync();
        Ok(())
    }

    pub fn set_frequency(&mut self, id: u64, frequency: f32) -> Result<(), JsError> {
        self.bank
            .set_frequency(LayerId(id), frequency)
            .map_err(js_err)?;
        self.sync();
        Ok(())
    }

    /// Replace every layer from a JS array of layer objects.
    pub fn set_layers(&mut self, layers: JsValue) -> Result<(), JsError> {
        #[allow(deprecated)]
        let layers: Vec<Layer> = layers
            .into_serde()
            .map_err(|e| JsError::new(&format!("bad layer list: {e}")))?;
        let mut bank = LayerBank::default();
        for layer in layers {
            bank.insert(layer).map_err(js_err)?;
        }
        self.bank = bank;
        self.sync();
        Ok(())
    }

    /// Current layers as a JS array.
    pub fn layers(&self) -> Result<JsValue, JsError> {
        #[allow(deprecated)]
        JsValue::from_serde(self.bank.layers()).map_err(|e| JsError::new(&e.to_string()))
    }
}

impl PolyArbor {
    fn sync(&self) {
        self.engine.borrow_mut().set_layers(self.bank.to_vec());
    }
}

impl Default for PolyArbor {
    fn default() -> Self {
        Self::new()
    }
}
