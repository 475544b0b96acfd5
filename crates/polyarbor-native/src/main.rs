use std::sync::{Arc, Mutex};

use anyhow::Context;
use polyarbor_core::{AudioEngine, LayerBank, SchedulerConfig};

mod audio;
mod session;
mod timer;

use session::DemoSession;

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let audio = audio::open_default_output().context("opening audio output")?;
    log::info!(
        "[native] output ready: {} Hz, {} channels",
        audio.sample_rate,
        audio.channels
    );

    let config = SchedulerConfig::default();
    let interval = config.pass_interval;
    let engine = Arc::new(Mutex::new(AudioEngine::new(
        audio.clock.clone(),
        audio.sink.clone(),
        config,
    )));

    let bank = LayerBank::with_defaults(42);
    DemoSession::new(engine, bank, interval).run()?;
    log::info!("[native] session finished");
    Ok(())
}
