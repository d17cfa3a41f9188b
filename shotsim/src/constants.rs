// ============================================================================
// Simulator Constants
// ============================================================================

pub const DEFAULT_TICK_RATE: u64 = 30; // Hz

// Arena generation
pub const GRID_SIZE: f32 = 40.0; // Edge length of one building cell (meters)
pub const NUM_BUILDINGS: usize = 40;
pub const BUILDING_MIN_HALF: f32 = 4.0;
pub const BUILDING_MAX_HALF: f32 = 12.0;
pub const BUILDING_MAX_HEIGHT: f32 = 20.0;
pub const RICOCHET_BUILDING_PROBABILITY: f64 = 0.25;
pub const TELEPORTER_HALF_WIDTH: f32 = 4.0;
pub const TELEPORTER_HALF_HEIGHT: f32 = 5.0;

// Shooters
pub const NUM_TANKS: usize = 6;
pub const MUZZLE_HEIGHT: f32 = 1.57; // Above the ground at the tank's position
pub const MAX_PITCH: f32 = 0.08; // radians, either way
pub const SHOT_INTERVAL: f32 = 0.2; // seconds between shots
pub const SPAWN_ATTEMPTS: usize = 200;
