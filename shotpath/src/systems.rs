#[allow(clippy::wildcard_imports)]
use bevy_ecs::prelude::*;
use bevy_math::Vec3;
use bevy_time::Time;

use crate::{
    observer::{EventLog, ReportSettings, ShotEvent, ShotKey},
    protocol::PlayerId,
    strategy::{HitTarget, SegmentedShot},
};

// ============================================================================
// Messages
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Message)]
pub struct TankHit {
    pub shot: ShotKey,
    pub target: PlayerId,
    // Seconds into the tick at which the shot touched the tank.
    pub time: f32,
    pub position: Vec3,
}

// ============================================================================
// Shot Systems
// ============================================================================

// Advance every shot by the frame time and forward its events. Shots that
// have finished expiring are despawned.
pub fn shots_update_system(
    mut commands: Commands,
    time: Res<Time>,
    reporting: Res<ReportSettings>,
    mut shots: Query<(Entity, &mut SegmentedShot)>,
    mut events: MessageWriter<ShotEvent>,
) {
    let delta = time.delta_secs();
    let mut log = EventLog::default();

    for (entity, mut shot) in &mut shots {
        shot.update(delta, &reporting, &mut log);
        for event in log.drain() {
            events.write(event);
        }

        if shot.is_expired() {
            commands.entity(entity).despawn();
        }
    }
}

// Hit-test every shot against every tank for the tick just simulated. The
// earliest hit wins; shots that stop on impact are removed.
pub fn shot_hits_system(
    mut commands: Commands,
    shots: Query<(Entity, &SegmentedShot)>,
    targets: Query<&HitTarget>,
    mut hits: MessageWriter<TankHit>,
) {
    for (entity, shot) in &shots {
        let earliest = targets
            .iter()
            .filter_map(|target| shot.check_hit(target).map(|hit| (target.id, hit)))
            .min_by(|a, b| a.1.time.total_cmp(&b.1.time));

        let Some((target, hit)) = earliest else {
            continue;
        };

        hits.write(TankHit {
            shot: shot.key(),
            target,
            time: hit.time,
            position: hit.position,
        });

        if shot.is_stopped_by_hit() {
            commands.entity(entity).despawn();
        }
    }
}
