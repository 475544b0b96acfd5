use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use polyarbor_core::{AudioEngine, ClockSource, ToneSink};

pub type SharedEngine<C, S> = Arc<Mutex<AudioEngine<C, S>>>;

/// Background thread that runs one scheduling pass per interval.
/// Stops and joins on drop.
pub struct PassTimer {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PassTimer {
    pub fn spawn<C, S>(engine: SharedEngine<C, S>, interval: Duration) -> std::io::Result<Self>
    where
        C: ClockSource + Send + 'static,
        S: ToneSink + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("pass-timer".into())
            .spawn(move || {
                while !stop_flag.load(Ordering::Relaxed) {
                    let emitted = engine
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .tick();
                    if emitted > 0 {
                        log::trace!("[timer] pass scheduled {emitted} tones");
                    }
                    thread::sleep(interval);
                }
            })?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }
}

impl Drop for PassTimer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
