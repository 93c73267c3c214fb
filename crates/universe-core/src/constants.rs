// Shared simulation/audio tuning constants.

// Physics parameter bounds (min, max) applied when merging updates
pub const GRAVITY_BOUNDS: (f32, f32) = (-100.0, 100.0);
pub const FRICTION_BOUNDS: (f32, f32) = (0.0, 1.0);
pub const ELASTICITY_BOUNDS: (f32, f32) = (0.0, 1.0);
pub const AIR_RESISTANCE_BOUNDS: (f32, f32) = (0.0, 10.0);
pub const DENSITY_BOUNDS: (f32, f32) = (0.01, 100.0);
pub const TIME_SCALE_BOUNDS: (f32, f32) = (0.0, 10.0);
pub const PARTICLE_SIZE_BOUNDS: (f32, f32) = (0.5, 100.0);
pub const MAX_PARTICLES_BOUNDS: (usize, usize) = (0, 10_000);
pub const PARTICLE_LIFETIME_BOUNDS: (f32, f32) = (0.1, 3600.0); // seconds

// Default simulation area (screen space, +y is down)
pub const DEFAULT_BOUNDS_SIZE: [f32; 2] = [800.0, 600.0];

// Spawn velocity used when the caller omits a component
pub const SPAWN_VX_RANGE: (f32, f32) = (-120.0, 120.0);
pub const SPAWN_VY_RANGE: (f32, f32) = (-220.0, -60.0); // upward kick

// Particle palette (RGBA)
pub const PARTICLE_PALETTE: [[f32; 4]; 5] = [
    [0.9, 0.3, 0.3, 1.0], // red-ish
    [0.3, 0.9, 0.4, 1.0], // green-ish
    [0.3, 0.5, 0.9, 1.0], // blue-ish
    [0.95, 0.8, 0.3, 1.0],
    [0.8, 0.4, 0.95, 1.0],
];

// Audio graph
pub const DEFAULT_VOICE_COUNT: usize = 8;
pub const DEFAULT_MASTER_GAIN: f32 = 0.25;
pub const DEFAULT_ATTACK_SEC: f32 = 0.02;
pub const DEFAULT_RELEASE_SEC: f32 = 0.08;
pub const DEFAULT_SMOOTHING_SEC: f32 = 0.02; // parameter glide time constant
pub const DEFAULT_REVERB_DECAY: f32 = 0.84;
pub const DEFAULT_MAX_DELAY_SEC: f32 = 2.0;
pub const DELAY_TONE_HZ: f32 = 1400.0; // lowpass inside the delay feedback loop
pub const FILTER_UPDATE_INTERVAL: u32 = 16; // samples between biquad coefficient refreshes

// Initial node values before the first parameter map arrives
pub const DEFAULT_BASE_FREQUENCY_HZ: f32 = 440.0;
pub const DEFAULT_FILTER_CUTOFF_HZ: f32 = 2000.0;
pub const DEFAULT_FILTER_Q: f32 = 0.707;
pub const DEFAULT_REVERB_MIX: f32 = 0.3;
pub const DEFAULT_DELAY_FEEDBACK: f32 = 0.35;
pub const DEFAULT_DELAY_TIME_SEC: f32 = 0.35;
pub const DEFAULT_DELAY_WET: f32 = 0.4;

// Analysis
pub const DEFAULT_FFT_SIZE: usize = 2048;
pub const BASS_BAND_HZ: (f32, f32) = (20.0, 250.0);
pub const MID_BAND_HZ: (f32, f32) = (250.0, 2000.0);
pub const TREBLE_BAND_HZ: (f32, f32) = (2000.0, 16000.0);

// Transport
pub const DEFAULT_BPM: f32 = 110.0;
pub const DEFAULT_STEPS_PER_BEAT: u32 = 2; // eighth-note grid
pub const DEFAULT_LOOKAHEAD_SEC: f64 = 0.1;
pub const DEFAULT_START_DELAY_SEC: f64 = 0.02;
pub const DEFAULT_MAX_CATCH_UP_STEPS: u32 = 4;
pub const MIN_STEP_DURATION_SEC: f64 = 0.01; // 100 steps/s
pub const MAX_STEPS_PER_TICK: usize = 64;
