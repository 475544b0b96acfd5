// Shared timing/voicing constants used by both web and native frontends.

// Scheduler timing
pub const PASS_INTERVAL_MS: u64 = 25; // how often the look-ahead pass runs
pub const LOOKAHEAD_SEC: f64 = 0.1; // events due before now + this are scheduled
pub const START_DELAY_SEC: f64 = 0.1; // cycle origin offset so the first beats are not late
pub const BACKLOG_TOLERANCE_SEC: f64 = 0.05; // late events older than this are skipped silently
pub const MIN_BEAT_DURATION_SEC: f64 = 0.001; // faster layers are treated as unschedulable

// Tone voice envelope
pub const ATTACK_SEC: f64 = 0.005;
pub const DECAY_SEC: f64 = 0.1;
pub const ACCENT_DECAY_SEC: f64 = 0.2;
pub const RELEASE_TAIL_SEC: f64 = 0.1; // voice keeps running this long after the decay ends
pub const DECAY_FLOOR: f32 = 0.001; // exponential ramps cannot reach 0

// Accent voicing
pub const ACCENT_GAIN: f32 = 0.8;
pub const BEAT_GAIN: f32 = 0.4;
pub const ACCENT_FREQUENCY_RATIO: f32 = 2.0; // accents sound an octave up

// Master bus
pub const MASTER_SMOOTHING_TAU_SEC: f32 = 0.1;

// Pattern ranges
pub const TEMPO_MIN_CPM: f64 = 5.0;
pub const TEMPO_MAX_CPM: f64 = 120.0;
pub const DEFAULT_TEMPO_CPM: f64 = 15.0;
pub const DEFAULT_MASTER_VOLUME: f32 = 0.5;
pub const BEATS_MIN: u32 = 1;
pub const BEATS_MAX: u32 = 32;
pub const MAX_LAYERS: usize = 12;
pub const DEFAULT_LAYER_VOLUME: f32 = 0.6;
pub const SPEED_OPTIONS: [f64; 6] = [0.25, 0.5, 1.0, 2.0, 3.0, 4.0];

// New-layer beat counts wrap back to 2 past this
pub const AUTO_BEATS_WRAP: u32 = 16;

// Pentatonic scale as MIDI notes: G3 A3 C4 D4 E4 G4 A4 C5 D5 E5
pub const PENTATONIC_MIDI: [i32; 10] = [55, 57, 60, 62, 64, 67, 69, 72, 74, 76];

// Default palette for layers (RGB 0..1)
pub const LAYER_COLORS: [[f32; 3]; 8] = [
    [1.000, 0.420, 0.420], // red
    [0.306, 0.804, 0.769], // teal
    [0.271, 0.718, 0.820], // blue
    [0.588, 0.808, 0.706], // green
    [1.000, 0.933, 0.678], // yellow
    [0.831, 0.647, 0.647], // pink
    [0.608, 0.349, 0.714], // purple
    [0.204, 0.596, 0.859], // dark blue
];

// Radial scope
pub const SCOPE_RADIUS_FRACTION: f32 = 0.4; // of min(width, height)
pub const SCOPE_HIT_TOLERANCE: f64 = 0.015; // scaled by layer speed
pub const SCOPE_ALPHA_ACTIVE: f32 = 0.8;
pub const SCOPE_ALPHA_MUTED: f32 = 0.1;
