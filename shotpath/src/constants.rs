// ============================================================================
// Floating-Point Comparisons
// ============================================================================

// Minimum forward progress for a ray test and floor for consumed segment time.
pub const SHOT_EPSILON: f32 = 1e-5;

// ============================================================================
// Segment Builder
// ============================================================================

// Hard cap on segments per shot; guards against zero-progress ricochet loops.
pub const MAX_SEGMENTS: usize = 100;

// Test rays start this far inside the world boundary.
pub const BOUNDARY_INSET: f32 = 0.01;

// Smallest world that leaves room inside the boundary inset.
pub const MIN_WORLD_SIZE: f32 = 2.0 * BOUNDARY_INSET;

// Teleport failure messages are only shown during the first second of a shot.
pub const TELEPORT_FAIL_MESSAGE_WINDOW: f64 = 1.0;

// ============================================================================
// World
// ============================================================================

pub const WORLD_SIZE: f32 = 800.0; // Edge length of the square playing field (meters)
pub const TANK_HEIGHT: f32 = 2.05;
pub const WALL_HEIGHT: f32 = 3.0 * TANK_HEIGHT; // Outer boundary wall height

// ============================================================================
// Tanks
// ============================================================================

pub const TANK_LENGTH: f32 = 6.0;
pub const TANK_RADIUS: f32 = 0.72 * TANK_LENGTH;
pub const MUZZLE_FRONT: f32 = TANK_RADIUS + 0.1; // Muzzle offset in front of the tank centre
pub const SERVER_PLAYER: u8 = 253; // Player id used for world weapons

// Tank size multipliers for flags that resize the carrier.
pub const OBESE_FACTOR: f32 = 2.5;
pub const TINY_FACTOR: f32 = 0.4;
pub const THIEF_TINY_FACTOR: f32 = 0.5;

// Hit-sphere shrink so that grazing shots don't register.
pub const HIT_RADIUS_FACTOR: f32 = 0.99;

// ============================================================================
// Shots
// ============================================================================

pub const SHOT_SPEED: f32 = 100.0; // meters per second
pub const SHOT_RANGE: f32 = 350.0; // meters
pub const SHOT_RADIUS: f32 = 0.5; // meters
pub const RELOAD_TIME: f32 = SHOT_RANGE / SHOT_SPEED; // seconds

// ============================================================================
// Weapon Adjustments (lifetime, velocity, reload-rate multipliers)
// ============================================================================

pub const RAPID_FIRE_LIFE: f32 = 0.5;
pub const RAPID_FIRE_VEL: f32 = 1.5;
pub const RAPID_FIRE_RATE: f32 = 2.0;

pub const MACHINE_GUN_LIFE: f32 = 0.1;
pub const MACHINE_GUN_VEL: f32 = 1.5;
pub const MACHINE_GUN_RATE: f32 = 10.0;

pub const LASER_LIFE: f32 = 0.1;
pub const LASER_VEL: f32 = 1000.0;
pub const LASER_RATE: f32 = 0.5;

pub const THIEF_LIFE: f32 = 0.05;
pub const THIEF_VEL: f32 = 8.0;
pub const THIEF_RATE: f32 = 12.0;
