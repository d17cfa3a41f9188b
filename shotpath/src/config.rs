use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

use crate::constants::*;

// ============================================================================
// Weapon Scaling
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponScale {
    pub life: f32, // lifetime multiplier
    pub vel: f32,  // velocity multiplier
    pub rate: f32, // reload-rate multiplier (reload time is divided by it)
}

impl WeaponScale {
    pub const IDENTITY: Self = Self {
        life: 1.0,
        vel: 1.0,
        rate: 1.0,
    };

    #[must_use]
    pub const fn new(life: f32, vel: f32, rate: f32) -> Self {
        Self { life, vel, rate }
    }
}

// ============================================================================
// Shot Settings
// ============================================================================

/// Game variables read while firing and building shot paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShotSettings {
    pub shot_speed: f32,
    pub shot_range: f32,
    pub shot_radius: f32,
    pub reload_time: f32,
    pub muzzle_front: f32,
    pub rapid_fire: WeaponScale,
    pub machine_gun: WeaponScale,
    pub laser: WeaponScale,
    pub thief: WeaponScale,
}

impl Default for ShotSettings {
    fn default() -> Self {
        Self {
            shot_speed: SHOT_SPEED,
            shot_range: SHOT_RANGE,
            shot_radius: SHOT_RADIUS,
            reload_time: RELOAD_TIME,
            muzzle_front: MUZZLE_FRONT,
            rapid_fire: WeaponScale::new(RAPID_FIRE_LIFE, RAPID_FIRE_VEL, RAPID_FIRE_RATE),
            machine_gun: WeaponScale::new(MACHINE_GUN_LIFE, MACHINE_GUN_VEL, MACHINE_GUN_RATE),
            laser: WeaponScale::new(LASER_LIFE, LASER_VEL, LASER_RATE),
            thief: WeaponScale::new(THIEF_LIFE, THIEF_VEL, THIEF_RATE),
        }
    }
}

impl ShotSettings {
    // Lifetime of an unscaled shot.
    #[must_use]
    pub fn shot_lifetime(&self) -> f32 {
        self.shot_range / self.shot_speed
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.shot_speed > 0.0, "shot_speed must be positive, got {}", self.shot_speed);
        ensure!(self.shot_range > 0.0, "shot_range must be positive, got {}", self.shot_range);
        ensure!(self.shot_radius >= 0.0, "shot_radius must not be negative, got {}", self.shot_radius);
        ensure!(self.reload_time >= 0.0, "reload_time must not be negative, got {}", self.reload_time);
        ensure!(self.muzzle_front >= 0.0, "muzzle_front must not be negative, got {}", self.muzzle_front);

        for (name, scale) in [
            ("rapid_fire", self.rapid_fire),
            ("machine_gun", self.machine_gun),
            ("laser", self.laser),
            ("thief", self.thief),
        ] {
            ensure!(
                scale.life > 0.0 && scale.vel > 0.0 && scale.rate > 0.0,
                "{name} multipliers must be positive, got {scale:?}"
            );
        }
        Ok(())
    }
}
