use bevy_math::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    links::LinkFaceId,
    obstacles::ObstacleRef,
    ray::{Aabb, Ray},
};

// ============================================================================
// Segment Reason
// ============================================================================

// The event that started a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentReason {
    Initial,
    Through,
    Boundary,
    Ricochet,
    Teleport,
}

impl SegmentReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Through => "through",
            Self::Boundary => "boundary",
            Self::Ricochet => "ricochet",
            Self::Teleport => "teleport",
        }
    }
}

impl fmt::Display for SegmentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Link pair used to enter a Teleport segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkTransit {
    pub src: LinkFaceId,
    pub dst: LinkFaceId,
    // Source face asks for no teleport/ricochet effects.
    pub no_effect: bool,
}

// ============================================================================
// Shot Path Segment
// ============================================================================

/// One straight leg of a shot over `[start, end)` in absolute seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotPathSegment {
    pub start: f64,
    pub end: f64,
    pub ray: Ray,
    pub reason: SegmentReason,
    // Obstacle that ended this segment (ricochet or stop), if any.
    pub hit_obstacle: Option<ObstacleRef>,
    // Set only when `reason` is Teleport.
    pub link: Option<LinkTransit>,
    pub bbox: Aabb,
}

impl ShotPathSegment {
    #[must_use]
    pub fn new(start: f64, end: f64, ray: Ray, reason: SegmentReason) -> Self {
        let bbox = Aabb::from_points(ray.point(0.0), ray.point((end - start) as f32));
        Self {
            start,
            end,
            ray,
            reason,
            hit_obstacle: None,
            link: None,
            bbox,
        }
    }

    #[must_use]
    pub fn duration(&self) -> f32 {
        (self.end - self.start) as f32
    }

    #[must_use]
    pub fn point_at(&self, time: f64) -> Vec3 {
        self.ray.point((time - self.start) as f32)
    }

    #[must_use]
    pub fn end_point(&self) -> Vec3 {
        self.ray.point(self.duration())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_spans_both_endpoints() {
        let ray = Ray::new(Vec3::new(0.0, 5.0, 1.0), Vec3::new(-2.0, 1.0, 0.0));
        let segment = ShotPathSegment::new(10.0, 12.0, ray, SegmentReason::Initial);

        assert_eq!(segment.bbox.min, Vec3::new(-4.0, 5.0, 1.0));
        assert_eq!(segment.bbox.max, Vec3::new(0.0, 7.0, 1.0));
        assert_eq!(segment.end_point(), Vec3::new(-4.0, 7.0, 1.0));
        assert_eq!(segment.point_at(11.0), Vec3::new(-2.0, 6.0, 1.0));
    }
}
