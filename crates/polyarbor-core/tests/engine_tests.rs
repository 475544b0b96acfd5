// Host-side tests for the engine facade: transport, activation, live edits.

use polyarbor_core::*;

#[derive(Default)]
struct RecordingSink {
    tones: Vec<ToneEvent>,
    volumes: Vec<(f32, f64)>,
}

impl ToneSink for RecordingSink {
    fn play(&mut self, tone: &ToneEvent) {
        self.tones.push(tone.clone());
    }

    fn set_master_volume(&mut self, volume: f32, at_sec: f64) {
        self.volumes.push((volume, at_sec));
    }
}

fn three_against_four() -> Vec<Layer> {
    vec![
        Layer::new(LayerId(1), 3, 261.63),
        Layer::new(LayerId(2), 4, 329.63),
    ]
}

fn make_engine(clock: &ManualClock) -> AudioEngine<&ManualClock, RecordingSink> {
    let mut engine = AudioEngine::new(
        clock,
        RecordingSink::default(),
        SchedulerConfig::default(),
    );
    engine.set_layers(three_against_four());
    engine
}

/// Tick every 25 ms over the step range, like the pass timer would.
fn drive(
    engine: &mut AudioEngine<&ManualClock, RecordingSink>,
    clock: &ManualClock,
    steps: std::ops::Range<u32>,
) {
    for i in steps {
        clock.set(i as f64 * 0.025);
        engine.tick();
    }
}

#[test]
fn progress_tracks_master_cycle() {
    let clock = ManualClock::running_at(0.0);
    let mut engine = make_engine(&clock);
    assert_eq!(engine.cycle_progress(), 0.0, "stopped engine reports 0");

    engine.start();
    assert_eq!(engine.cycle_start(), Some(0.1));
    clock.set(2.1);
    assert!((engine.cycle_progress() - 0.5).abs() < 1e-9);
    clock.set(6.1);
    assert!((engine.cycle_progress() - 1.5).abs() < 1e-9, "progress is unwrapped");

    engine.stop();
    assert!(!engine.is_playing());
    assert_eq!(engine.cycle_progress(), 0.0);
}

#[test]
fn ticks_deliver_three_against_four() {
    let clock = ManualClock::running_at(0.0);
    let mut engine = make_engine(&clock);
    engine.start();
    drive(&mut engine, &clock, 0..157);

    let tones = &engine.sink().tones;
    let l1: Vec<&ToneEvent> = tones.iter().filter(|t| t.layer_id == LayerId(1)).collect();
    let l2: Vec<&ToneEvent> = tones.iter().filter(|t| t.layer_id == LayerId(2)).collect();
    assert_eq!(l1.len(), 3);
    assert_eq!(l2.len(), 4);
    assert!(l1[0].accented && l2[0].accented);
    assert!((l1[0].start_time_sec - l2[0].start_time_sec).abs() < 1e-12);
    assert!((l1[1].start_time_sec - (0.1 + 4.0 / 3.0)).abs() < 1e-9);
    assert!((l2[3].start_time_sec - 3.1).abs() < 1e-9);
}

#[test]
fn blocked_activation_waits_then_anchors_on_clock() {
    let clock = ManualClock::new();
    clock.deny_activation(true);
    let mut engine = make_engine(&clock);

    engine.start();
    assert!(engine.is_playing());
    assert_eq!(engine.transport(), Transport::AwaitingClock);
    assert_eq!(engine.tick(), 0);
    assert_eq!(engine.cycle_progress(), 0.0);
    assert!(engine.sink().tones.is_empty());

    clock.set(42.0);
    clock.deny_activation(false);
    engine.start();
    assert!(clock.is_active());
    engine.tick();
    let anchored = engine.cycle_start().expect("anchored once the clock runs");
    assert!((anchored - 42.1).abs() < 1e-9);

    clock.set(42.125);
    assert_eq!(engine.tick(), 2, "both layers sound their first beat");
    assert!(engine
        .sink()
        .tones
        .iter()
        .all(|t| (t.start_time_sec - 42.1).abs() < 1e-9 && t.event_index == 0));
}

#[test]
fn remove_and_readd_between_passes_joins_fresh() {
    let clock = ManualClock::running_at(0.0);
    let mut engine = make_engine(&clock);
    engine.start();
    drive(&mut engine, &clock, 0..81);
    assert!(engine.scheduler().phase(LayerId(2)).is_some());

    engine.set_layers(vec![three_against_four().remove(0)]);
    engine.set_layers(three_against_four());
    assert_eq!(engine.scheduler().phase(LayerId(2)), None);

    engine.sink_mut().tones.clear();
    clock.set(2.05);
    engine.tick();
    let rejoined: Vec<&ToneEvent> = engine
        .sink()
        .tones
        .iter()
        .filter(|t| t.layer_id == LayerId(2))
        .collect();
    assert_eq!(rejoined.len(), 1);
    assert_eq!(rejoined[0].event_index, 2, "next boundary of the current cycle");
    assert!((rejoined[0].start_time_sec - 2.1).abs() < 1e-9);
}

#[test]
fn master_volume_is_clamped_and_forwarded() {
    let clock = ManualClock::running_at(3.0);
    let mut engine = make_engine(&clock);
    engine.set_master_volume(1.5);
    engine.set_master_volume(f32::NAN);
    engine.set_master_volume(0.25);
    assert_eq!(engine.pattern().master_volume, 0.25);
    let volumes: Vec<f32> = engine.sink().volumes.iter().map(|(v, _)| *v).collect();
    assert_eq!(volumes, vec![1.0, 0.0, 0.25]);
    assert!(engine.sink().volumes.iter().all(|(_, at)| *at == 3.0));

    engine.start();
    assert_eq!(engine.sink().volumes.last(), Some(&(0.25, 3.0)), "start pushes the bus level");
}

#[test]
fn muted_layer_stays_silent_but_keeps_phase() {
    let clock = ManualClock::running_at(0.0);
    let mut engine = make_engine(&clock);
    engine.start();
    drive(&mut engine, &clock, 0..20);

    let mut layers = three_against_four();
    layers[1].mute = true;
    engine.set_layers(layers);
    engine.sink_mut().tones.clear();
    drive(&mut engine, &clock, 20..157);
    assert!(engine.sink().tones.iter().all(|t| t.layer_id == LayerId(1)));

    engine.set_layers(three_against_four());
    drive(&mut engine, &clock, 157..165);
    let back = engine
        .sink()
        .tones
        .iter()
        .find(|t| t.layer_id == LayerId(2))
        .expect("unmuted layer sounds again");
    assert_eq!(back.event_index, 4, "phase kept advancing while muted");
    assert!((back.start_time_sec - 4.1).abs() < 1e-9);
}

#[test]
fn tempo_change_applies_to_next_events() {
    let clock = ManualClock::running_at(0.0);
    let mut engine = make_engine(&clock);
    engine.set_layers(vec![Layer::new(LayerId(2), 4, 329.63)]);
    engine.start();
    drive(&mut engine, &clock, 0..40);
    engine.set_tempo(30.0);
    engine.sink_mut().tones.clear();
    drive(&mut engine, &clock, 40..80);

    let times: Vec<f64> = engine.sink().tones.iter().map(|t| t.start_time_sec).collect();
    assert_eq!(times.len(), 2);
    assert!((times[0] - 1.1).abs() < 1e-9, "already-planned beat keeps its time");
    assert!((times[1] - 1.6).abs() < 1e-9, "then half-second spacing");
}
