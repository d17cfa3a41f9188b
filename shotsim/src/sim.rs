#[allow(clippy::wildcard_imports)]
use bevy_ecs::prelude::*;
use bevy_time::Time;
use std::time::Duration;

use shotpath::{
    observer::{ReportSettings, ShotEvent},
    strategy::{HitTarget, SegmentedShot},
    systems::{TankHit, shot_hits_system, shots_update_system},
};

// What one tick produced, in the order it happened.
#[derive(Debug, Default)]
pub struct Tick {
    pub events: Vec<ShotEvent>,
    pub hits: Vec<TankHit>,
}

/// Fixed-rate ECS world holding the live shots and the tanks they can hit.
pub struct Simulation {
    world: World,
    schedule: Schedule,
    tick: Duration,
}

impl Simulation {
    #[must_use]
    pub fn new(reporting: ReportSettings, tick_rate: u64) -> Self {
        let mut world = World::new();
        world.insert_resource(Time::<()>::default());
        world.insert_resource(reporting);
        world.init_resource::<Messages<ShotEvent>>();
        world.init_resource::<Messages<TankHit>>();

        // Hits are tested against the tick the shots just moved through
        let mut schedule = Schedule::default();
        schedule.add_systems((shots_update_system, shot_hits_system).chain());

        Self {
            world,
            schedule,
            tick: Duration::from_nanos(1_000_000_000 / tick_rate.max(1)),
        }
    }

    #[must_use]
    pub const fn tick_duration(&self) -> Duration {
        self.tick
    }

    // Simulation clock in seconds.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.world.resource::<Time>().elapsed_secs_f64()
    }

    pub fn spawn_shot(&mut self, shot: SegmentedShot) {
        self.world.spawn(shot);
    }

    pub fn spawn_tank(&mut self, target: HitTarget) {
        self.world.spawn(target);
    }

    pub fn live_shots(&mut self) -> usize {
        self.world.query::<&SegmentedShot>().iter(&self.world).count()
    }

    pub fn step(&mut self) -> Tick {
        self.world.resource_mut::<Time>().advance_by(self.tick);
        self.schedule.run(&mut self.world);

        Tick {
            events: self.world.resource_mut::<Messages<ShotEvent>>().drain().collect(),
            hits: self.world.resource_mut::<Messages<TankHit>>().drain().collect(),
        }
    }
}
