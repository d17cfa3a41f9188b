use bevy_math::Vec3;
use rand::Rng;

use crate::constants::*;
use shotpath::{
    constants::{TANK_HEIGHT, TANK_RADIUS},
    links::{LinkFaceId, LinkPhysics, PortalFace},
    obstacles::ObstacleId,
    world::{Arena, BoxBuilding},
};

// Buildings and teleporter faces get GUIDs after the outer walls.
const FIRST_OBSTACLE_ID: u32 = 16;

fn cell_center(size: f32, col: i32, row: i32) -> Vec3 {
    Vec3::new(
        (col as f32 + 0.5).mul_add(GRID_SIZE, -(size / 2.0)),
        (row as f32 + 0.5).mul_add(GRID_SIZE, -(size / 2.0)),
        0.0,
    )
}

fn teleporter_face(id: u32, obstacle: u32, base: Vec3, normal: Vec3) -> PortalFace {
    PortalFace {
        id: LinkFaceId(id),
        obstacle: ObstacleId(obstacle),
        center: base + Vec3::Z * TELEPORTER_HALF_HEIGHT,
        normal,
        right: Vec3::Z.cross(normal),
        half_width: TELEPORTER_HALF_WIDTH,
        half_height: TELEPORTER_HALF_HEIGHT,
        ricochet: false,
        no_effect: false,
        shot_fail_text: String::new(),
        blocked_teams: Vec::new(),
        blocked_flags: Vec::new(),
    }
}

// Generate a random arena.
//
// Buildings are dropped into random cells of a grid laid over the field,
// never touching the outermost ring so the boundary stays open. The next two
// free cells get a linked teleporter pair.
#[must_use]
pub fn generate_arena(size: f32, rng: &mut impl Rng) -> Arena {
    let mut arena = Arena::new(size);
    let cells_per_side = (size / GRID_SIZE) as i32;

    let mut cells = Vec::new();
    for row in 1..cells_per_side - 1 {
        for col in 1..cells_per_side - 1 {
            cells.push((col, row));
        }
    }

    // Shuffle the cells randomly
    for i in (1..cells.len()).rev() {
        let j = rng.gen_range(0..=i);
        cells.swap(i, j);
    }

    let mut free = cells.into_iter();
    let mut next_id = FIRST_OBSTACLE_ID;

    for (col, row) in free.by_ref().take(NUM_BUILDINGS) {
        let base = cell_center(size, col, row);
        let height = rng.gen_range(TANK_HEIGHT..BUILDING_MAX_HEIGHT);
        let half = Vec3::new(
            rng.gen_range(BUILDING_MIN_HALF..BUILDING_MAX_HALF),
            rng.gen_range(BUILDING_MIN_HALF..BUILDING_MAX_HALF),
            height / 2.0,
        );

        arena.add_box(BoxBuilding {
            id: ObstacleId(next_id),
            center: base + Vec3::Z * half.z,
            half,
            ricochet: rng.gen_bool(RICOCHET_BUILDING_PROBABILITY),
        });
        next_id += 1;
    }

    if let (Some(a), Some(b)) = (free.next(), free.next()) {
        let a = cell_center(size, a.0, a.1);
        let b = cell_center(size, b.0, b.1);
        // Each face looks at the other one
        let toward_b = (b - a).normalize_or_zero();
        arena.add_face(teleporter_face(0, next_id, a, toward_b));
        arena.add_face(teleporter_face(1, next_id + 1, b, -toward_b));
        arena.links.add_link(LinkFaceId(0), LinkFaceId(1), LinkPhysics::default());
        arena.links.add_link(LinkFaceId(1), LinkFaceId(0), LinkPhysics::default());
    }

    arena
}

// Random ground point with room for a tank, clear of every building.
pub fn random_open_point(arena: &Arena, rng: &mut impl Rng) -> Vec3 {
    let half = (arena.size / 2.0 - 2.0 * TANK_RADIUS).max(1.0);

    for _ in 0..SPAWN_ATTEMPTS {
        let point = Vec3::new(rng.gen_range(-half..half), rng.gen_range(-half..half), 0.0);
        let clear = arena.boxes.iter().all(|building| {
            let d = (point - building.center).abs();
            d.x > building.half.x + TANK_RADIUS || d.y > building.half.y + TANK_RADIUS
        });
        if clear {
            return point;
        }
    }
    Vec3::ZERO
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn same_seed_same_arena() {
        let first = generate_arena(800.0, &mut StdRng::seed_from_u64(9));
        let second = generate_arena(800.0, &mut StdRng::seed_from_u64(9));
        assert_eq!(first, second);
        assert_eq!(first.boxes.len(), NUM_BUILDINGS);
        assert_eq!(first.links.faces.len(), 2);
        assert_eq!(first.links.links.len(), 2);
    }

    #[test]
    fn small_arena_gets_what_fits() {
        let arena = generate_arena(160.0, &mut StdRng::seed_from_u64(1));
        assert_eq!(arena.boxes.len(), 4);
        assert!(arena.links.faces.is_empty());
    }

    #[test]
    fn tanks_spawn_clear_of_buildings() {
        let mut rng = StdRng::seed_from_u64(4);
        let arena = generate_arena(800.0, &mut rng);
        for _ in 0..50 {
            let point = random_open_point(&arena, &mut rng);
            for building in &arena.boxes {
                let d = (point - building.center).abs();
                assert!(d.x > building.half.x || d.y > building.half.y);
            }
        }
    }
}
