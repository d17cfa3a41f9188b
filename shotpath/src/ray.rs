use bevy_math::Vec3;
use serde::{Deserialize, Serialize};

// ============================================================================
// Ray
// ============================================================================

/// A straight leg of motion. The direction is not normalized: its length is
/// the speed, so `t` is measured in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    #[must_use]
    pub const fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    #[must_use]
    pub fn point(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

// Reflect `v` about the plane with unit normal `n`. `v` needn't be normalized.
#[must_use]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

// Ray of `r1` relative to `r2`, with `r1` sampled at `t1` and `r2` at `t2`.
#[must_use]
pub fn ray_minus_ray(r1: &Ray, t1: f32, r2: &Ray, t2: f32) -> Ray {
    Ray::new(r1.point(t1) - r2.point(t2), r1.direction - r2.direction)
}

// Time at which the ray is `radius` away from the origin. Returns the first
// non-negative root, `Some(0.0)` for a stationary ray and `None` on a miss.
#[must_use]
pub fn ray_at_distance_from_origin(ray: &Ray, radius: f32) -> Option<f32> {
    let d = ray.direction;
    if d == Vec3::ZERO {
        return Some(0.0);
    }

    let p = ray.origin;
    let a = d.length_squared();
    let b = -p.dot(d);
    let c = radius.mul_add(-radius, p.length_squared());
    let disc = b.mul_add(b, -a * c);
    if disc < 0.0 {
        return None;
    }

    let root = disc.sqrt();
    let near = (b - root).min(b + root);
    let far = (b - root).max(b + root);
    if near < 0.0 { Some(far / a) } else { Some(near / a) }
}

// ============================================================================
// Axis-Aligned Bounding Box
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    // Box that overlaps nothing and grows to exactly the first box it is expanded with.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(f32::MIN),
    };

    #[must_use]
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn expand_to(&mut self, other: &Self) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.max.x >= other.min.x
            && self.min.x <= other.max.x
            && self.max.y >= other.min.y
            && self.min.y <= other.max.y
            && self.max.z >= other.min.z
            && self.min.z <= other.max.z
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}
