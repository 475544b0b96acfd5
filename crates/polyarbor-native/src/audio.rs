// ---------------- Native audio (cpal) ----------------

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{anyhow, Context};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use polyarbor_core::{ClockError, ClockSource, ToneEvent, ToneSink, VoiceMixer};

pub type SharedMixer = Arc<Mutex<VoiceMixer>>;

pub fn lock_mixer(mixer: &SharedMixer) -> MutexGuard<'_, VoiceMixer> {
    mixer.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Engine time derived from the number of frames the output stream has pulled.
///
/// Inactive until the first audio callback runs; `now` is 0 until then.
#[derive(Clone)]
pub struct StreamClock {
    frames: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    sample_rate: f64,
}

impl StreamClock {
    fn new(sample_rate: f32) -> Self {
        Self {
            frames: Arc::new(AtomicU64::new(0)),
            running: Arc::new(AtomicBool::new(false)),
            sample_rate: sample_rate as f64,
        }
    }

    fn publish(&self, frames_rendered: u64) {
        self.frames.store(frames_rendered, Ordering::Release);
        self.running.store(true, Ordering::Release);
    }
}

impl ClockSource for StreamClock {
    fn now(&self) -> f64 {
        if !self.is_active() {
            return 0.0;
        }
        self.frames.load(Ordering::Acquire) as f64 / self.sample_rate
    }

    fn resume(&self) -> Result<(), ClockError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(ClockError::Unavailable(
                "output stream has not rendered yet".into(),
            ))
        }
    }

    fn is_active(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Hands scheduled tones to the mixer the stream callback renders from.
#[derive(Clone)]
pub struct MixerSink {
    mixer: SharedMixer,
}

impl ToneSink for MixerSink {
    fn play(&mut self, tone: &ToneEvent) {
        lock_mixer(&self.mixer).schedule(tone);
    }

    fn set_master_volume(&mut self, volume: f32, _at_time: f64) {
        lock_mixer(&self.mixer).set_master_target(volume);
    }
}

/// An open output stream plus the clock and sink the engine needs.
pub struct NativeAudio {
    _stream: cpal::Stream,
    pub clock: StreamClock,
    pub sink: MixerSink,
    pub sample_rate: f32,
    pub channels: usize,
}

pub fn open_default_output() -> anyhow::Result<NativeAudio> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow!("no default output device"))?;
    let config = device
        .default_output_config()
        .context("querying default output config")?;
    let sample_rate = config.sample_rate().0 as f32;
    let channels = config.channels() as usize;
    log::info!(
        "[audio] {} @ {} Hz, {} ch, {:?}",
        device.name().unwrap_or_else(|_| "output".into()),
        sample_rate,
        channels,
        config.sample_format()
    );

    let mixer: SharedMixer = Arc::new(Mutex::new(VoiceMixer::new(sample_rate)));
    let clock = StreamClock::new(sample_rate);

    let err_fn = |err| log::error!("[audio] stream error: {err}");
    let stream_config: cpal::StreamConfig = config.clone().into();
    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => build_stream::<f32>(
            &device,
            &stream_config,
            Arc::clone(&mixer),
            clock.clone(),
            err_fn,
        )?,
        cpal::SampleFormat::I16 => build_stream::<i16>(
            &device,
            &stream_config,
            Arc::clone(&mixer),
            clock.clone(),
            err_fn,
        )?,
        cpal::SampleFormat::U16 => build_stream::<u16>(
            &device,
            &stream_config,
            Arc::clone(&mixer),
            clock.clone(),
            err_fn,
        )?,
        other => return Err(anyhow!("unsupported sample format {other:?}")),
    };
    stream.play().context("starting output stream")?;

    Ok(NativeAudio {
        _stream: stream,
        clock,
        sink: MixerSink { mixer },
        sample_rate,
        channels,
    })
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mixer: SharedMixer,
    clock: StreamClock,
    err_fn: impl Fn(cpal::StreamError) + Send + 'static,
) -> anyhow::Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let mut scratch: Vec<f32> = Vec::new();
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _| {
            scratch.resize(data.len(), 0.0);
            let frames = {
                let mut guard = lock_mixer(&mixer);
                guard.render_interleaved(&mut scratch, channels);
                guard.frames_rendered()
            };
            for (out, s) in data.iter_mut().zip(&scratch) {
                *out = T::from_sample(*s);
            }
            clock.publish(frames);
        },
        err_fn,
        None,
    )?;
    Ok(stream)
}
