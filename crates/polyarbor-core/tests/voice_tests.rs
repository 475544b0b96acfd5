// Host-side tests for the tone-voice contract and the sample-level mixer.

use polyarbor_core::*;

fn tone(accented: bool, velocity: f32, pan: f32, start: f64) -> ToneEvent {
    ToneEvent {
        layer_id: LayerId(1),
        frequency_hz: 220.0,
        velocity,
        pan,
        accented,
        start_time_sec: start,
        event_index: 0,
    }
}

#[test]
fn envelope_timings_match_contract() {
    let plain = Envelope::new(0.4, false);
    let accent = Envelope::new(0.8, true);
    assert_eq!(plain.attack_sec, 0.005);
    assert_eq!(plain.decay_sec, 0.1);
    assert_eq!(accent.decay_sec, 0.2);
    assert!((plain.stop_offset() - 0.205).abs() < 1e-12);
    assert!((accent.stop_offset() - 0.305).abs() < 1e-12);
}

#[test]
fn envelope_shape_attack_peak_decay_release() {
    let env = Envelope::new(0.8, true);
    assert_eq!(env.gain_at(-0.001), 0.0);
    assert_eq!(env.gain_at(0.0), 0.0);
    assert!((env.gain_at(0.0025) - 0.4).abs() < 1e-5, "linear attack midpoint");
    assert!((env.gain_at(0.005) - 0.8).abs() < 1e-6, "peak after attack");

    // exponential: halfway through the decay is the geometric mean
    let mid = env.gain_at(0.005 + 0.1);
    let expected = 0.8 * (DECAY_FLOOR / 0.8).sqrt();
    assert!((mid - expected).abs() < 1e-5);

    let mut prev = env.gain_at(0.005);
    for i in 1..=100 {
        let g = env.gain_at(0.005 + i as f64 * 0.002);
        assert!(g <= prev, "decay must be monotonic");
        prev = g;
    }
    assert!((env.gain_at(0.25) - DECAY_FLOOR).abs() < 1e-7, "holds floor in tail");
    assert_eq!(env.gain_at(0.31), 0.0, "stopped after tail");
}

#[test]
fn envelope_clamps_velocity() {
    assert_eq!(Envelope::new(4.0, false).peak, 1.0);
    assert_eq!(Envelope::new(-1.0, false).peak, 0.0);
    assert_eq!(Envelope::new(f32::NAN, false).peak, 0.0);
    assert_eq!(Envelope::new(0.0, false).gain_at(0.01), 0.0);
}

#[test]
fn waveforms_start_at_zero_and_peak_at_quarter() {
    for w in [Waveform::Sine, Waveform::Triangle] {
        assert!(w.sample(0.0).abs() < 1e-6);
        assert!((w.sample(0.25) - 1.0).abs() < 1e-6);
        assert!(w.sample(0.5).abs() < 1e-5);
        assert!((w.sample(0.75) + 1.0).abs() < 1e-5);
    }
    assert!((Waveform::Triangle.sample(0.125) - 0.5).abs() < 1e-6);
}

#[test]
fn pan_is_equal_power_and_clamped() {
    let (l, r) = pan_gains(-1.0);
    assert!((l - 1.0).abs() < 1e-6 && r.abs() < 1e-6);
    let (l, r) = pan_gains(1.0);
    assert!(l.abs() < 1e-6 && (r - 1.0).abs() < 1e-6);
    let (l, r) = pan_gains(0.0);
    assert!((l * l + r * r - 1.0).abs() < 1e-6);
    assert!((l - r).abs() < 1e-6);
    assert_eq!(pan_gains(9.0), pan_gains(1.0));
    assert_eq!(pan_gains(f32::NAN), pan_gains(0.0));
}

#[test]
fn voice_is_silent_before_start_and_finishes_after_tail() {
    let sr = 1000.0;
    let mut voice = ToneVoice::new(&tone(false, 0.4, 0.0, 0.5));
    assert_eq!(voice.next_sample(0.2, sr), (0.0, 0.0));
    assert!(!voice.is_finished(0.6));
    assert!(voice.is_finished(0.71));
}

#[test]
fn mixer_renders_scheduled_tone_at_its_start_time() {
    let sr = 1000.0;
    let mut mixer = VoiceMixer::new(sr);
    mixer.set_master_target(1.0);
    mixer.schedule(&tone(true, 0.8, 0.0, 0.05));
    assert_eq!(mixer.active_voices(), 1);

    let mut before = 0.0f32;
    for _ in 0..50 {
        let (l, r) = mixer.next_frame();
        before += l.abs() + r.abs();
    }
    assert_eq!(before, 0.0, "nothing sounds before the start time");

    let mut during = 0.0f32;
    for _ in 0..100 {
        let (l, r) = mixer.next_frame();
        during += l.abs() + r.abs();
    }
    assert!(during > 0.0);

    for _ in 0..400 {
        mixer.next_frame();
    }
    assert_eq!(mixer.active_voices(), 0, "voice released after its tail");
    assert!((mixer.time_sec() - 0.55).abs() < 1e-9);
}

#[test]
fn mixer_drops_silent_or_expired_tones() {
    let mut mixer = VoiceMixer::new(1000.0);
    for _ in 0..500 {
        mixer.next_frame();
    }
    mixer.schedule(&tone(false, 0.0, 0.0, 0.6));
    mixer.schedule(&tone(false, 0.4, 0.0, 0.1));
    assert_eq!(mixer.active_voices(), 0);
}

#[test]
fn mixer_polyphony_is_unbounded() {
    let mut mixer = VoiceMixer::new(1000.0);
    for i in 0..64 {
        mixer.schedule(&tone(i % 2 == 0, 0.3, 0.0, 0.01));
    }
    assert_eq!(mixer.active_voices(), 64);
    let (l, r) = mixer.next_frame();
    assert!(l.abs() <= 1.0 && r.abs() <= 1.0, "soft clip keeps output bounded");
}

#[test]
fn master_volume_glides_toward_target() {
    let sr = 1000.0;
    let mut mixer = VoiceMixer::new(sr);
    assert!((mixer.master_gain() - DEFAULT_MASTER_VOLUME).abs() < 1e-6);
    mixer.set_master_volume(1.0, 0.0);
    mixer.next_frame();
    assert!(mixer.master_gain() < 0.6, "no jump on change");
    for _ in 0..1000 {
        mixer.next_frame();
    }
    assert!((mixer.master_gain() - 1.0).abs() < 1e-3);
}

#[test]
fn interleaved_render_handles_mono_and_surround() {
    let mut mixer = VoiceMixer::new(1000.0);
    mixer.set_master_target(1.0);
    mixer.schedule(&tone(false, 0.8, -1.0, 0.0));

    let mut quad = vec![1.0f32; 4 * 16];
    mixer.render_interleaved(&mut quad, 4);
    for frame in quad.chunks(4) {
        assert_eq!(frame[1], 0.0, "hard left pan leaves right silent");
        assert_eq!(frame[2], 0.0);
        assert_eq!(frame[3], 0.0);
    }
    assert!(quad.chunks(4).any(|f| f[0] != 0.0));

    let mut mono = vec![0.0f32; 16];
    mixer.render_interleaved(&mut mono, 1);
    assert!(mono.iter().any(|s| *s != 0.0));
    assert_eq!(mixer.frames_rendered(), 32);
}

#[test]
fn vec_sink_records_tones() {
    let mut sink: Vec<ToneEvent> = Vec::new();
    sink.play(&tone(true, 0.5, 0.2, 1.0));
    assert_eq!(sink.len(), 1);
    assert!((sink[0].stop_time_sec() - 1.305).abs() < 1e-9);
}
