// Tuning defaults - the config file overrides all of these
// Kept in one place so the config defaults and tests agree

// === Timeline ===
/// Spacing between filmstrip samples, in seconds
pub const DEFAULT_CAPTURE_INTERVAL_SECS: f64 = 5.0;

/// Periodic time observer ticks per second.
/// 600 is a common multiple of 24, 25 and 30 fps, so ticks land on frame boundaries.
pub const DEFAULT_PERIODIC_TIME_SCALE: u32 = 600;

// === Filmstrip cells ===
pub const DEFAULT_CELL_WIDTH: f64 = 80.0;
pub const DEFAULT_CELL_HEIGHT: f64 = 45.0;

// === Workers ===
/// Upper bound on simultaneous frame extractions per batch
pub const DEFAULT_MAX_CONCURRENT_EXTRACTIONS: usize = 8;

// === Events ===
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;
pub const DEFAULT_EVENT_HISTORY_SIZE: usize = 100;

// === Readout ===
pub const INITIAL_TIME_LABEL: &str = "00:00";
