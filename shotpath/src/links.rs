use bevy_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::{
    obstacles::{ObstacleId, ObstacleKind, ObstacleRef},
    protocol::TeamColor,
    ray::Ray,
    weapon::FlagKind,
};

// ============================================================================
// Link Data Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkFaceId(pub u32);

/// How a shot's motion is transformed while passing through a link.
///
/// Scales are applied in the source face's frame: `x` along the face's right
/// axis, `y` along its up axis and `z` along its normal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkPhysics {
    pub shot_src_pos_scale: Vec3,
    pub shot_src_vel_scale: Vec3,
    // Added to the velocity after the frame change.
    pub shot_dst_vel: Vec3,
    // Keep the incoming speed regardless of scaling.
    pub shot_same_speed: bool,
    // Message shown whenever a shot passes.
    pub shot_pass_text: String,
}

impl Default for LinkPhysics {
    fn default() -> Self {
        Self {
            shot_src_pos_scale: Vec3::ONE,
            shot_src_vel_scale: Vec3::ONE,
            shot_dst_vel: Vec3::ZERO,
            shot_same_speed: false,
            shot_pass_text: String::new(),
        }
    }
}

/// A rectangular, one-sided portal surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalFace {
    pub id: LinkFaceId,
    pub obstacle: ObstacleId,
    pub center: Vec3,
    // Unit normal pointing out of the front (enterable) side.
    pub normal: Vec3,
    // Unit axis in the face plane; `up` is derived as `normal x right`.
    pub right: Vec3,
    pub half_width: f32,
    pub half_height: f32,
    #[serde(default)]
    pub ricochet: bool,
    #[serde(default)]
    pub no_effect: bool,
    #[serde(default)]
    pub shot_fail_text: String,
    #[serde(default)]
    pub blocked_teams: Vec<TeamColor>,
    #[serde(default)]
    pub blocked_flags: Vec<FlagKind>,
}

impl PortalFace {
    #[must_use]
    pub fn up(&self) -> Vec3 {
        self.normal.cross(self.right)
    }

    #[must_use]
    pub fn obstacle_ref(&self) -> ObstacleRef {
        ObstacleRef {
            id: self.obstacle,
            kind: ObstacleKind::Face,
            height: self.center.z + self.half_height,
            ricochet: self.ricochet,
        }
    }

    // Front-side intersection with the face rectangle.
    #[must_use]
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        let denom = ray.direction.dot(self.normal);
        if denom >= 0.0 {
            return None;
        }

        let t = (self.center - ray.origin).dot(self.normal) / denom;
        let local = ray.point(t) - self.center;
        if local.dot(self.right).abs() > self.half_width || local.dot(self.up()).abs() > self.half_height {
            return None;
        }
        Some(t)
    }

    fn to_local(&self, v: Vec3) -> Vec3 {
        Vec3::new(v.dot(self.right), v.dot(self.up()), v.dot(self.normal))
    }

    // Inverse of `to_local` for a vector leaving through this face: the
    // entering frame is turned around, so right and normal flip.
    fn from_exit_local(&self, local: Vec3) -> Vec3 {
        -local.x * self.right + local.y * self.up() - local.z * self.normal
    }

    fn blocks(&self, team: TeamColor, flag: FlagKind) -> bool {
        self.blocked_teams.contains(&team) || self.blocked_flags.contains(&flag)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub src: LinkFaceId,
    pub dst: LinkFaceId,
    #[serde(default)]
    pub physics: LinkPhysics,
}

// Resolved link for one teleport attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkDestination {
    pub src: LinkFaceId,
    pub dst: LinkFaceId,
    pub physics: LinkPhysics,
}

// ============================================================================
// Link Resolver
// ============================================================================

pub trait LinkResolver {
    // Pick the destination for a shot entering `src`, or `None` when the shot
    // may not pass (blocked team or flag, or no destination).
    fn resolve(&self, src: LinkFaceId, seed: u32, team: TeamColor, flag: FlagKind) -> Option<LinkDestination>;

    // Move `pos` and `vel` from the source face to the destination face.
    fn teleport_shot(&self, dest: &LinkDestination, pos: &mut Vec3, vel: &mut Vec3);

    // Message for a failed shot teleport through `src`.
    fn shot_fail_text(&self, src: LinkFaceId) -> Option<&str>;

    // Whether passing through `src` should show no effects.
    fn suppresses_effects(&self, src: LinkFaceId) -> bool;
}

// ============================================================================
// Link Table
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkTable {
    pub faces: Vec<PortalFace>,
    pub links: Vec<Link>,
}

impl LinkTable {
    #[must_use]
    pub fn face(&self, id: LinkFaceId) -> Option<&PortalFace> {
        self.faces.iter().find(|face| face.id == id)
    }

    // Faces that are the source of at least one link.
    pub fn source_faces(&self) -> impl Iterator<Item = &PortalFace> {
        self.faces
            .iter()
            .filter(|face| self.links.iter().any(|link| link.src == face.id))
    }

    pub fn add_face(&mut self, face: PortalFace) {
        self.faces.push(face);
    }

    pub fn add_link(&mut self, src: LinkFaceId, dst: LinkFaceId, physics: LinkPhysics) {
        self.links.push(Link { src, dst, physics });
    }
}

impl LinkResolver for LinkTable {
    fn resolve(&self, src: LinkFaceId, seed: u32, team: TeamColor, flag: FlagKind) -> Option<LinkDestination> {
        let face = self.face(src)?;
        if face.blocks(team, flag) {
            return None;
        }

        let candidates: Vec<&Link> = self.links.iter().filter(|link| link.src == src).collect();
        if candidates.is_empty() {
            return None;
        }

        let link = candidates[seed as usize % candidates.len()];
        self.face(link.dst)?;
        Some(LinkDestination {
            src: link.src,
            dst: link.dst,
            physics: link.physics.clone(),
        })
    }

    fn teleport_shot(&self, dest: &LinkDestination, pos: &mut Vec3, vel: &mut Vec3) {
        let (Some(src), Some(dst)) = (self.face(dest.src), self.face(dest.dst)) else {
            return;
        };
        let physics = &dest.physics;

        let local_pos = src.to_local(*pos - src.center) * physics.shot_src_pos_scale;
        *pos = dst.center + dst.from_exit_local(local_pos);

        let speed = vel.length();
        let local_vel = src.to_local(*vel) * physics.shot_src_vel_scale;
        let mut new_vel = dst.from_exit_local(local_vel) + physics.shot_dst_vel;
        if physics.shot_same_speed {
            new_vel = new_vel.normalize_or_zero() * speed;
        }
        *vel = new_vel;
    }

    fn shot_fail_text(&self, src: LinkFaceId) -> Option<&str> {
        self.face(src)
            .map(|face| face.shot_fail_text.as_str())
            .filter(|text| !text.is_empty())
    }

    fn suppresses_effects(&self, src: LinkFaceId) -> bool {
        self.face(src).is_some_and(|face| face.no_effect)
    }
}
