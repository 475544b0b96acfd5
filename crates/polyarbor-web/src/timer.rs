use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys as web;

/// `setInterval`-driven pass timer. Cleared on drop.
pub struct PassTimer {
    handle: i32,
    _tick: Closure<dyn FnMut()>,
}

impl PassTimer {
    pub fn start(interval_ms: i32, mut tick: impl FnMut() + 'static) -> Result<Self, JsValue> {
        let window = web::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let closure = Closure::wrap(Box::new(move || tick()) as Box<dyn FnMut()>);
        let handle = window.set_interval_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            interval_ms,
        )?;
        Ok(Self {
            handle,
            _tick: closure,
        })
    }
}

impl Drop for PassTimer {
    fn drop(&mut self) {
        if let Some(w) = web::window() {
            w.clear_interval_with_handle(self.handle);
        }
    }
}
