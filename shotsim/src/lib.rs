pub mod arena;
pub mod config;
pub mod constants;
pub mod sim;

use anyhow::{Result, ensure};
use bevy_math::Vec3;
use clap::Parser;
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::{f32::consts::TAU, path::PathBuf, thread, time::Instant};
use tracing::{debug, info, warn};

use crate::{
    arena::{generate_arena, random_open_point},
    config::{load_arena, load_settings},
    constants::*,
    sim::{Simulation, Tick},
};
use shotpath::{
    config::ShotSettings,
    constants::{MIN_WORLD_SIZE, TANK_HEIGHT, TANK_RADIUS, WORLD_SIZE},
    io,
    observer::{EventLog, ReportFilter, ReportSettings, ShotEvent},
    protocol::{PlayerId, ShotId, ShotInfo, TeamColor},
    ray::{Aabb, Ray},
    strategy::{FiringInfo, HitTarget, SegmentedShot, SimContext, Viewer},
    weapon::{FlagKind, WeaponKind},
    world::Arena,
};

pub use config::init_tracing;

const TEAMS: [TeamColor; 4] = [TeamColor::Red, TeamColor::Green, TeamColor::Blue, TeamColor::Purple];

// Flags handed out to tanks in turn; they change how big a target each tank is.
const TANK_FLAGS: [FlagKind; 5] = [FlagKind::None, FlagKind::Obesity, FlagKind::None, FlagKind::Tiny, FlagKind::Narrow];

// ============================================================================
// CLI Argument Parsing
// ============================================================================

fn parse_world_size(s: &str) -> Result<f32> {
    let size: f32 = s.parse()?;
    ensure!(
        size.is_finite() && size > MIN_WORLD_SIZE,
        "world size must be finite and above {MIN_WORLD_SIZE}"
    );
    Ok(size)
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Segmented shot path simulator", long_about = None)]
pub struct Args {
    /// World description (JSON); a random arena is generated when omitted
    #[arg(short, long)]
    pub world: Option<PathBuf>,

    /// Shot settings (JSON); missing fields keep their defaults
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Seed for arena generation and firing
    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    /// Edge length of a generated arena
    #[arg(long, default_value_t = WORLD_SIZE, value_parser = parse_world_size)]
    pub size: f32,

    /// Weapon for every shot (normal, rapid-fire, machine-gun, thief, ricochet,
    /// super-bullet, phantom, laser); mixed when omitted
    #[arg(long)]
    pub weapon: Option<WeaponKind>,

    /// Number of shots to fire
    #[arg(short = 'n', long, default_value_t = 20)]
    pub shots: usize,

    /// Simulation ticks per second
    #[arg(long, default_value_t = DEFAULT_TICK_RATE)]
    pub tick_rate: u64,

    /// Reports for the local player's shots: "1" for all, or letters from RTES
    #[arg(long, default_value = "1")]
    pub report: ReportFilter,

    /// Make every shot ricochet
    #[arg(long)]
    pub all_ricochet: bool,

    /// Log every segment of every shot
    #[arg(long)]
    pub dump_segments: bool,

    /// Give up after this many simulated seconds
    #[arg(long, default_value_t = 60.0)]
    pub max_seconds: f32,

    /// Pace ticks in wall-clock time
    #[arg(long)]
    pub realtime: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log: String,
}

// ============================================================================
// Run Statistics
// ============================================================================

#[derive(Debug, Default)]
pub struct RunStats {
    pub shots: usize,
    pub segments: usize,
    pub ricochets: usize,
    pub teleports: usize,
    pub explosions: usize,
    pub messages: usize,
    pub reports: usize,
    pub report_bytes: usize,
    pub hits: usize,
    // Shots still flying when the run stopped.
    pub in_flight: usize,
}

impl RunStats {
    fn record(&mut self, event: &ShotEvent) -> Result<()> {
        match event {
            ShotEvent::Ricochet { shot, pos, .. } => {
                self.ricochets += 1;
                debug!(player = shot.player.0, shot = shot.shot.0, ?pos, "ricochet");
            }
            ShotEvent::Teleport { shot, src, dst, .. } => {
                self.teleports += 1;
                debug!(player = shot.player.0, shot = shot.shot.0, src = src.0, dst = dst.0, "teleport");
            }
            ShotEvent::Explosion { shot, pos } => {
                self.explosions += 1;
                debug!(player = shot.player.0, shot = shot.shot.0, ?pos, "explosion");
            }
            ShotEvent::Message(text) => {
                self.messages += 1;
                info!("{text}");
            }
            ShotEvent::Report(report) => {
                let data = io::encode(&ShotInfo::from(report))?;
                self.reports += 1;
                self.report_bytes += data.len();
                info!(
                    shot = report.shot.0,
                    kind = ?report.kind,
                    pos = ?report.pos,
                    obstacle = ?report.obstacle.map(|id| id.0),
                    bytes = data.len(),
                    "shot report"
                );
            }
        }
        Ok(())
    }

    fn record_tick(&mut self, tick: &Tick) -> Result<()> {
        for event in &tick.events {
            self.record(event)?;
        }
        for hit in &tick.hits {
            self.hits += 1;
            info!(
                shooter = hit.shot.player.0,
                shot = hit.shot.shot.0,
                target = hit.target.0,
                pos = ?hit.position,
                "tank hit"
            );
        }
        Ok(())
    }
}

// ============================================================================
// Tanks
// ============================================================================

struct Tank {
    id: PlayerId,
    team: TeamColor,
    flag: FlagKind,
    angle: f32,
    position: Vec3,
}

impl Tank {
    fn hit_target(&self) -> HitTarget {
        let mut target = HitTarget {
            id: self.id,
            last_motion: Ray::new(self.position + Vec3::Z * (TANK_HEIGHT / 2.0), Vec3::ZERO),
            bbox: Aabb::EMPTY,
            radius: TANK_RADIUS,
            flag: self.flag,
            angle: self.angle,
        };
        let scale = target.size_factor();
        let reach = Vec3::new(TANK_RADIUS, TANK_RADIUS, 0.0) * scale;
        target.bbox = Aabb::from_points(self.position - reach, self.position + reach + Vec3::Z * (TANK_HEIGHT * scale));
        target
    }
}

fn fire(
    tank: &Tank,
    shot_id: ShotId,
    kind: WeaponKind,
    now: f64,
    ctx: &SimContext<'_>,
    rng: &mut impl Rng,
    log: &mut EventLog,
) -> SegmentedShot {
    let yaw = rng.gen_range(0.0..TAU);
    let pitch = rng.gen_range(-MAX_PITCH..MAX_PITCH);
    let heading = Vec3::new(yaw.cos(), yaw.sin(), 0.0);
    let dir = heading * pitch.cos() + Vec3::Z * pitch.sin();

    let muzzle = tank.position + Vec3::Z * MUZZLE_HEIGHT + heading * ctx.settings.muzzle_front;
    let firing = FiringInfo::new(tank.id, shot_id, muzzle, dir, now, ctx.settings)
        .with_team(tank.team)
        .with_flag(kind.flag());
    SegmentedShot::new(firing, kind, ctx, log)
}

fn dump_segments(shot: &SegmentedShot) {
    let look = shot.appearance(&Viewer {
        player: None,
        flag: FlagKind::None,
    });
    info!(
        player = shot.firing().player.0,
        shot = shot.firing().shot.0,
        weapon = shot.kind().name(),
        team = ?look.team,
        super_texture = look.super_texture,
        faint = look.faint,
        "shot"
    );
    for (index, segment) in shot.segments().iter().enumerate() {
        info!(
            player = shot.firing().player.0,
            shot = shot.firing().shot.0,
            index,
            start = segment.start,
            end = segment.end,
            reason = %segment.reason,
            from = ?segment.ray.origin,
            to = ?segment.end_point(),
            "segment"
        );
    }
}

// ============================================================================
// Main Simulation Loop
// ============================================================================

pub fn run(args: &Args) -> Result<RunStats> {
    let settings = match &args.settings {
        Some(path) => load_settings(path)?,
        None => ShotSettings::default(),
    };

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut arena: Arena = match &args.world {
        Some(path) => load_arena(path)?,
        None => generate_arena(args.size, &mut rng),
    };
    arena.all_shots_ricochet |= args.all_ricochet;
    info!(
        "arena {}m with {} buildings and {} teleporter faces",
        arena.size,
        arena.boxes.len(),
        arena.links.faces.len()
    );

    let tanks: Vec<Tank> = (0..NUM_TANKS)
        .map(|i| Tank {
            id: PlayerId(i as u8),
            team: TEAMS[i % TEAMS.len()],
            flag: TANK_FLAGS[i % TANK_FLAGS.len()],
            angle: rng.gen_range(0.0..TAU),
            position: random_open_point(&arena, &mut rng),
        })
        .collect();

    let reporting = ReportSettings {
        local_player: Some(tanks[0].id),
        filter: args.report,
    };
    let mut sim = Simulation::new(reporting, args.tick_rate);
    for tank in &tanks {
        sim.spawn_tank(tank.hit_target());
    }

    let ctx = SimContext {
        world: Some(&arena),
        links: &arena.links,
        settings: &settings,
    };

    info!("starting shot simulation with {} shots...", args.shots);

    let tick_duration = sim.tick_duration();
    let max_frames = (f64::from(args.max_seconds) / tick_duration.as_secs_f64()).ceil() as u64;
    let mut stats = RunStats::default();
    let mut next_shot_time = 0.0;
    let mut log = EventLog::default();

    for frame in 0..max_frames {
        let update_start = Instant::now();

        while stats.shots < args.shots && sim.now() >= next_shot_time {
            let tank = &tanks[stats.shots % tanks.len()];
            let kind = args
                .weapon
                .unwrap_or_else(|| WeaponKind::ALL[rng.gen_range(0..WeaponKind::ALL.len())]);
            let shot = fire(tank, ShotId(stats.shots as u16), kind, sim.now(), &ctx, &mut rng, &mut log);

            if args.dump_segments {
                dump_segments(&shot);
            }
            for event in log.drain() {
                stats.record(&event)?;
            }

            stats.shots += 1;
            stats.segments += shot.segments().len();
            sim.spawn_shot(shot);
            next_shot_time += f64::from(SHOT_INTERVAL);
        }

        let tick = sim.step();
        stats.record_tick(&tick)?;

        if stats.shots == args.shots && sim.live_shots() == 0 {
            break;
        }

        if args.realtime {
            let update_elapsed = update_start.elapsed();
            if update_elapsed > tick_duration {
                warn!(
                    "tick {} took {:.2}ms (exceeded {:.2}ms budget)",
                    frame,
                    update_elapsed.as_secs_f64() * 1000.0,
                    tick_duration.as_secs_f64() * 1000.0
                );
            } else {
                thread::sleep(tick_duration - update_elapsed);
            }
        }
    }

    stats.in_flight = sim.live_shots();
    if stats.in_flight > 0 {
        warn!(
            "stopped after {}s with {} shots still in flight",
            args.max_seconds, stats.in_flight
        );
    }

    info!(
        shots = stats.shots,
        segments = stats.segments,
        ricochets = stats.ricochets,
        teleports = stats.teleports,
        explosions = stats.explosions,
        reports = stats.reports,
        report_bytes = stats.report_bytes,
        hits = stats.hits,
        elapsed = sim.now(),
        "simulation finished"
    );
    Ok(stats)
}
