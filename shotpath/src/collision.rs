use bevy_math::Vec3;

use crate::ray::Ray;

// Small value for near-zero direction components.
const SLAB_EPSILON: f32 = 1e-6;

// Compute the intersection interval of a ray with a slab (used in ray-AABB tests)
#[must_use]
pub fn slab_interval(local_coord: f32, ray_dir: f32, half_extent: f32, t_min: f32, t_max: f32) -> Option<(f32, f32)> {
    if ray_dir.abs() > SLAB_EPSILON {
        let t1 = (-half_extent - local_coord) / ray_dir;
        let t2 = (half_extent - local_coord) / ray_dir;
        let new_min = t_min.max(t1.min(t2));
        let new_max = t_max.min(t1.max(t2));
        if new_min <= new_max {
            Some((new_min, new_max))
        } else {
            None
        }
    } else if local_coord.abs() > half_extent {
        None
    } else {
        Some((t_min, t_max))
    }
}

// Entry time of a ray into an axis-aligned box. A ray starting inside the box
// reports a negative entry time.
#[must_use]
pub fn ray_box_entry(ray: &Ray, center: Vec3, half: Vec3) -> Option<f32> {
    let local = ray.origin - center;

    let mut t_min = f32::NEG_INFINITY;
    let mut t_max = f32::INFINITY;
    for axis in 0..3 {
        let (new_min, new_max) = slab_interval(local[axis], ray.direction[axis], half[axis], t_min, t_max)?;
        t_min = new_min;
        t_max = new_max;
    }

    (t_max >= 0.0).then_some(t_min)
}

// Outward normal of the box face closest to `point`.
#[must_use]
pub fn box_face_normal(center: Vec3, half: Vec3, point: Vec3) -> Vec3 {
    let local = (point - center) / half.max(Vec3::splat(SLAB_EPSILON));
    let abs = local.abs();

    if abs.x >= abs.y && abs.x >= abs.z {
        Vec3::X * local.x.signum()
    } else if abs.y >= abs.z {
        Vec3::Y * local.y.signum()
    } else {
        Vec3::Z * local.z.signum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slab_rejects_parallel_outside() {
        assert!(slab_interval(2.0, 0.0, 1.0, 0.0, 1.0).is_none());
        assert_eq!(slab_interval(0.5, 0.0, 1.0, 0.0, 1.0), Some((0.0, 1.0)));
    }

    #[test]
    fn box_entry_from_outside_and_inside() {
        let center = Vec3::new(10.0, 0.0, 5.0);
        let half = Vec3::splat(1.0);

        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(3.0, 0.0, 0.0));
        assert!((ray_box_entry(&ray, center, half).unwrap() - 3.0).abs() < 1e-6);

        let inside = Ray::new(center, Vec3::X);
        assert!(ray_box_entry(&inside, center, half).unwrap() < 0.0);

        let behind = Ray::new(Vec3::new(20.0, 0.0, 5.0), Vec3::X);
        assert!(ray_box_entry(&behind, center, half).is_none());
    }

    #[test]
    fn face_normal_picks_dominant_axis() {
        let center = Vec3::ZERO;
        let half = Vec3::new(4.0, 1.0, 1.0);
        assert_eq!(box_face_normal(center, half, Vec3::new(-4.0, 0.2, 0.1)), Vec3::NEG_X);
        assert_eq!(box_face_normal(center, half, Vec3::new(1.0, 1.0, 0.2)), Vec3::Y);
    }
}
