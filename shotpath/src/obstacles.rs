use bevy_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::{links::LinkFaceId, ray::Ray};

// ============================================================================
// Obstacle Handles
// ============================================================================

// Globally unique obstacle identifier, as reported upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObstacleId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleKind {
    Wall,
    Box,
    Pyramid,
    Mesh,
    Face,
}

// Value handle for something a shot ran into. Carries what the segment
// builder needs so segments never borrow from the obstacle database.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstacleRef {
    pub id: ObstacleId,
    pub kind: ObstacleKind,
    pub height: f32,
    pub ricochet: bool,
}

impl ObstacleRef {
    #[must_use]
    pub fn is_outer_wall(&self) -> bool {
        self.kind == ObstacleKind::Wall
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleHit {
    pub t: f32,
    pub obstacle: ObstacleRef,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortalHit {
    pub t: f32,
    pub obstacle: ObstacleRef,
    pub face: LinkFaceId,
}

// ============================================================================
// Obstacle Query
// ============================================================================

/// Read-only view of the world geometry used to build shot paths.
///
/// Every `first_*` query only reports hits with `min < t < max_t`, where `t`
/// is in units of the ray's direction (seconds for a shot ray).
pub trait ObstacleQuery {
    // Edge length of the square playing field.
    fn world_size(&self) -> f32;

    // World option forcing every Stop shot to bounce.
    fn all_shots_ricochet(&self) -> bool;

    fn first_ground_hit(&self, ray: &Ray, min: f32, max_t: f32) -> Option<f32>;

    // Nearest solid obstacle. With `through` set only obstacles that also stop
    // building-piercing shots are considered.
    fn first_building_hit(&self, ray: &Ray, min: f32, max_t: f32, through: bool) -> Option<ObstacleHit>;

    // Nearest face that is the source side of a teleport link.
    fn first_link_source_hit(&self, ray: &Ray, min: f32, max_t: f32) -> Option<PortalHit>;

    // Unit outward normal of `obstacle` at (or near) `point`.
    fn surface_normal(&self, obstacle: &ObstacleRef, point: Vec3) -> Vec3;
}
