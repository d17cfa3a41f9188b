use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{
    config::{ShotSettings, WeaponScale},
    protocol::TeamColor,
};

// ============================================================================
// Flags
// ============================================================================

// Flags that change how a shot is fired, resolved through links or hit-tested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FlagKind {
    #[default]
    None,
    RapidFire,
    MachineGun,
    Laser,
    Thief,
    Ricochet,
    SuperBullet,
    PhantomZone,
    Seer,
    Colorblindness,
    Obesity,
    Tiny,
    Narrow,
}

// ============================================================================
// Weapon Kinds
// ============================================================================

// How a shot treats solid obstacles while its path is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleEffect {
    Stop,
    Reflect,
    Through,
}

// How a shot is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Appearance {
    pub team: TeamColor,
    pub super_texture: bool,
    pub faint: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponKind {
    Normal,
    RapidFire,
    MachineGun,
    Thief,
    Ricochet,
    SuperBullet,
    PhantomBullet,
    Laser,
}

impl WeaponKind {
    pub const ALL: [Self; 8] = [
        Self::Normal,
        Self::RapidFire,
        Self::MachineGun,
        Self::Thief,
        Self::Ricochet,
        Self::SuperBullet,
        Self::PhantomBullet,
        Self::Laser,
    ];

    // Weapon fired by a tank carrying `flag`.
    #[must_use]
    pub const fn from_flag(flag: FlagKind) -> Self {
        match flag {
            FlagKind::RapidFire => Self::RapidFire,
            FlagKind::MachineGun => Self::MachineGun,
            FlagKind::Laser => Self::Laser,
            FlagKind::Thief => Self::Thief,
            FlagKind::Ricochet => Self::Ricochet,
            FlagKind::SuperBullet => Self::SuperBullet,
            FlagKind::PhantomZone => Self::PhantomBullet,
            _ => Self::Normal,
        }
    }

    // Flag a tank carries to fire this kind.
    #[must_use]
    pub const fn flag(self) -> FlagKind {
        match self {
            Self::Normal => FlagKind::None,
            Self::RapidFire => FlagKind::RapidFire,
            Self::MachineGun => FlagKind::MachineGun,
            Self::Thief => FlagKind::Thief,
            Self::Ricochet => FlagKind::Ricochet,
            Self::SuperBullet => FlagKind::SuperBullet,
            Self::PhantomBullet => FlagKind::PhantomZone,
            Self::Laser => FlagKind::Laser,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::RapidFire => "rapid-fire",
            Self::MachineGun => "machine-gun",
            Self::Thief => "thief",
            Self::Ricochet => "ricochet",
            Self::SuperBullet => "super-bullet",
            Self::PhantomBullet => "phantom",
            Self::Laser => "laser",
        }
    }

    #[must_use]
    pub const fn policy(self) -> ObstacleEffect {
        match self {
            Self::Ricochet => ObstacleEffect::Reflect,
            Self::SuperBullet | Self::PhantomBullet => ObstacleEffect::Through,
            Self::Normal | Self::RapidFire | Self::MachineGun | Self::Thief | Self::Laser => ObstacleEffect::Stop,
        }
    }

    // Lifetime, velocity and reload-rate multipliers for this kind.
    #[must_use]
    pub const fn scale(self, settings: &ShotSettings) -> WeaponScale {
        match self {
            Self::RapidFire => settings.rapid_fire,
            Self::MachineGun => settings.machine_gun,
            Self::Laser => settings.laser,
            Self::Thief => settings.thief,
            Self::Normal | Self::Ricochet | Self::SuperBullet | Self::PhantomBullet => WeaponScale::IDENTITY,
        }
    }

    // Beams have near-zero flight time: every segment is drawn at once and
    // the shot lives out its lifetime without segment events.
    #[must_use]
    pub const fn is_beam(self) -> bool {
        matches!(self, Self::Laser | Self::Thief)
    }

    // Beams aren't removed by hitting a tank; they only run out.
    #[must_use]
    pub const fn is_stopped_by_hit(self) -> bool {
        !self.is_beam()
    }

    #[must_use]
    pub const fn appearance(self, team: TeamColor) -> Appearance {
        Appearance {
            team,
            super_texture: matches!(self, Self::SuperBullet),
            faint: matches!(self, Self::PhantomBullet),
        }
    }
}

impl FromStr for WeaponKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let lower = s.to_ascii_lowercase();
        match Self::ALL.into_iter().find(|kind| kind.name() == lower) {
            Some(kind) => Ok(kind),
            None => bail!("unknown weapon \"{s}\""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_beams_ignore_hits() {
        for kind in WeaponKind::ALL {
            let expected = !matches!(kind, WeaponKind::Laser | WeaponKind::Thief);
            assert_eq!(kind.is_stopped_by_hit(), expected, "{kind:?}");
        }
    }

    #[test]
    fn policies() {
        assert_eq!(WeaponKind::Normal.policy(), ObstacleEffect::Stop);
        assert_eq!(WeaponKind::Laser.policy(), ObstacleEffect::Stop);
        assert_eq!(WeaponKind::Ricochet.policy(), ObstacleEffect::Reflect);
        assert_eq!(WeaponKind::SuperBullet.policy(), ObstacleEffect::Through);
        assert_eq!(WeaponKind::PhantomBullet.policy(), ObstacleEffect::Through);
    }

    #[test]
    fn only_special_bullets_look_different() {
        let super_bullet = WeaponKind::SuperBullet.appearance(TeamColor::Red);
        assert!(super_bullet.super_texture && !super_bullet.faint);
        assert_eq!(super_bullet.team, TeamColor::Red);

        assert!(WeaponKind::PhantomBullet.appearance(TeamColor::Red).faint);
        let normal = WeaponKind::Normal.appearance(TeamColor::Blue);
        assert!(!normal.super_texture && !normal.faint);
    }

    #[test]
    fn flags_map_to_weapons() {
        assert_eq!(WeaponKind::from_flag(FlagKind::PhantomZone), WeaponKind::PhantomBullet);
        assert_eq!(WeaponKind::from_flag(FlagKind::Seer), WeaponKind::Normal);
        assert_eq!(WeaponKind::from_flag(FlagKind::None), WeaponKind::Normal);

        for kind in WeaponKind::ALL {
            assert_eq!(WeaponKind::from_flag(kind.flag()), kind);
        }
    }

    #[test]
    fn names_parse() {
        assert_eq!("Laser".parse::<WeaponKind>().unwrap(), WeaponKind::Laser);
        assert_eq!("super-bullet".parse::<WeaponKind>().unwrap(), WeaponKind::SuperBullet);
        assert!("bazooka".parse::<WeaponKind>().is_err());
    }

    #[test]
    fn rapid_fire_uses_its_settings() {
        let settings = ShotSettings::default();
        let scale = WeaponKind::RapidFire.scale(&settings);
        assert!((scale.life - 0.5).abs() < f32::EPSILON);
        assert!((scale.vel - 1.5).abs() < f32::EPSILON);
        assert_eq!(WeaponKind::Ricochet.scale(&settings), WeaponScale::IDENTITY);
    }
}
