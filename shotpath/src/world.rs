use anyhow::{Result, ensure};
use bevy_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::{
    collision::{box_face_normal, ray_box_entry},
    constants::{MIN_WORLD_SIZE, WALL_HEIGHT, WORLD_SIZE},
    links::{LinkTable, PortalFace},
    obstacles::{ObstacleHit, ObstacleId, ObstacleKind, ObstacleQuery, ObstacleRef, PortalHit},
    ray::Ray,
};

// Outer walls take GUIDs 0..4; buildings and faces carry their own.
const WALL_GUID_BASE: u32 = 0;

// ============================================================================
// Arena Geometry
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxBuilding {
    pub id: ObstacleId,
    pub center: Vec3,
    pub half: Vec3,
    #[serde(default)]
    pub ricochet: bool,
}

impl BoxBuilding {
    #[must_use]
    pub fn obstacle_ref(&self) -> ObstacleRef {
        ObstacleRef {
            id: self.id,
            kind: ObstacleKind::Box,
            height: self.center.z + self.half.z,
            ricochet: self.ricochet,
        }
    }
}

// One of the four boundary walls: an infinite vertical plane with an inward normal.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OuterWall {
    id: ObstacleId,
    normal: Vec3,
    offset: f32, // plane: normal . p + offset = 0
}

/// Square playing field with ground, boundary walls, box buildings and
/// teleport faces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Arena {
    pub size: f32,
    pub wall_height: f32,
    pub all_shots_ricochet: bool,
    pub boxes: Vec<BoxBuilding>,
    pub links: LinkTable,
}

impl Default for Arena {
    fn default() -> Self {
        Self::new(WORLD_SIZE)
    }
}

impl Arena {
    #[must_use]
    pub fn new(size: f32) -> Self {
        Self {
            size,
            wall_height: WALL_HEIGHT,
            all_shots_ricochet: false,
            boxes: Vec::new(),
            links: LinkTable::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.size.is_finite() && self.size > MIN_WORLD_SIZE,
            "world size must be finite and above {MIN_WORLD_SIZE}, got {}",
            self.size
        );
        ensure!(self.wall_height >= 0.0, "wall_height must not be negative, got {}", self.wall_height);
        for building in &self.boxes {
            ensure!(
                building.half.cmpge(Vec3::ZERO).all(),
                "building {} has a negative half extent {:?}",
                building.id.0,
                building.half
            );
        }
        Ok(())
    }

    pub fn add_box(&mut self, building: BoxBuilding) {
        self.boxes.push(building);
    }

    pub fn add_face(&mut self, face: PortalFace) {
        self.links.add_face(face);
    }

    fn walls(&self) -> [OuterWall; 4] {
        let half = self.size * 0.5;
        let wall = |guid: u32, normal: Vec3| OuterWall {
            id: ObstacleId(WALL_GUID_BASE + guid),
            normal,
            offset: half,
        };
        [wall(0, Vec3::NEG_X), wall(1, Vec3::X), wall(2, Vec3::NEG_Y), wall(3, Vec3::Y)]
    }

    fn wall_ref(&self, wall: &OuterWall) -> ObstacleRef {
        ObstacleRef {
            id: wall.id,
            kind: ObstacleKind::Wall,
            height: self.wall_height,
            ricochet: false,
        }
    }

    fn find_box(&self, id: ObstacleId) -> Option<&BoxBuilding> {
        self.boxes.iter().find(|building| building.id == id)
    }
}

impl ObstacleQuery for Arena {
    fn world_size(&self) -> f32 {
        self.size
    }

    fn all_shots_ricochet(&self) -> bool {
        self.all_shots_ricochet
    }

    fn first_ground_hit(&self, ray: &Ray, min: f32, max_t: f32) -> Option<f32> {
        if ray.direction.z >= 0.0 {
            return None;
        }
        let t = -ray.origin.z / ray.direction.z;
        (t > min && t < max_t).then_some(t)
    }

    fn first_building_hit(&self, ray: &Ray, min: f32, max_t: f32, through: bool) -> Option<ObstacleHit> {
        // Nothing in an arena stops a building-piercing shot
        if through {
            return None;
        }

        let mut best: Option<ObstacleHit> = None;
        let mut consider = |t: f32, obstacle: ObstacleRef| {
            if t > min && t < best.map_or(max_t, |hit| hit.t) {
                best = Some(ObstacleHit { t, obstacle });
            }
        };

        for wall in &self.walls() {
            // Walls only stop shots heading outward
            let denom = ray.direction.dot(wall.normal);
            if denom < 0.0 {
                let t = -(wall.normal.dot(ray.origin) + wall.offset) / denom;
                consider(t, self.wall_ref(wall));
            }
        }

        for building in &self.boxes {
            if let Some(t) = ray_box_entry(ray, building.center, building.half) {
                consider(t, building.obstacle_ref());
            }
        }

        best
    }

    fn first_link_source_hit(&self, ray: &Ray, min: f32, max_t: f32) -> Option<PortalHit> {
        let mut best: Option<PortalHit> = None;
        for face in self.links.source_faces() {
            let Some(t) = face.intersect(ray) else {
                continue;
            };
            if t > min && t < best.map_or(max_t, |hit| hit.t) {
                best = Some(PortalHit {
                    t,
                    obstacle: face.obstacle_ref(),
                    face: face.id,
                });
            }
        }
        best
    }

    fn surface_normal(&self, obstacle: &ObstacleRef, point: Vec3) -> Vec3 {
        match obstacle.kind {
            ObstacleKind::Wall => self
                .walls()
                .iter()
                .find(|wall| wall.id == obstacle.id)
                .map_or(Vec3::Z, |wall| wall.normal),
            ObstacleKind::Face => self
                .links
                .faces
                .iter()
                .find(|face| face.obstacle == obstacle.id)
                .map_or(Vec3::Z, |face| face.normal),
            ObstacleKind::Box | ObstacleKind::Pyramid | ObstacleKind::Mesh => self
                .find_box(obstacle.id)
                .map_or(Vec3::Z, |building| box_face_normal(building.center, building.half, point)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> Arena {
        let mut arena = Arena::new(100.0);
        arena.add_box(BoxBuilding {
            id: ObstacleId(10),
            center: Vec3::new(20.0, 0.0, 5.0),
            half: Vec3::new(2.0, 2.0, 5.0),
            ricochet: false,
        });
        arena
    }

    #[test]
    fn ground_only_when_descending() {
        let arena = arena();
        let down = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 1.0, -2.0));
        assert!((arena.first_ground_hit(&down, 0.0, 100.0).unwrap() - 5.0).abs() < 1e-6);
        assert!(arena.first_ground_hit(&down, 0.0, 4.0).is_none());

        let level = Ray::new(Vec3::new(0.0, 0.0, 1.0), Vec3::X);
        assert!(arena.first_ground_hit(&level, 0.0, 100.0).is_none());
    }

    #[test]
    fn nearest_of_box_and_wall() {
        let arena = arena();
        let ray = Ray::new(Vec3::new(0.0, 0.0, 1.0), Vec3::new(10.0, 0.0, 0.0));
        let hit = arena.first_building_hit(&ray, 0.0, 100.0, false).unwrap();
        assert_eq!(hit.obstacle.id, ObstacleId(10));
        assert!((hit.t - 1.8).abs() < 1e-5);
        assert!(arena.first_building_hit(&ray, 0.0, 100.0, true).is_none());

        let away = Ray::new(Vec3::new(0.0, 0.0, 1.0), Vec3::new(-10.0, 0.0, 0.0));
        let wall = arena.first_building_hit(&away, 0.0, 100.0, false).unwrap();
        assert_eq!(wall.obstacle.kind, ObstacleKind::Wall);
        assert!((wall.t - 5.0).abs() < 1e-5);
        assert_eq!(arena.surface_normal(&wall.obstacle, ray.point(wall.t)), Vec3::X);
    }

    #[test]
    fn tiny_worlds_are_rejected() {
        arena().validate().unwrap();
        assert!(Arena::new(0.01).validate().is_err());
        assert!(Arena::new(f32::NAN).validate().is_err());
    }

    #[test]
    fn box_normal_faces_the_shooter() {
        let arena = arena();
        let obstacle = arena.boxes[0].obstacle_ref();
        assert_eq!(arena.surface_normal(&obstacle, Vec3::new(18.0, 0.5, 1.0)), Vec3::NEG_X);
    }
}
