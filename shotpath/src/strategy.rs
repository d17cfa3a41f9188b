use bevy_ecs::component::Component;
use bevy_math::{Quat, Vec3};
use tracing::{debug, trace};

use crate::{
    collision::ray_box_entry,
    config::ShotSettings,
    constants::*,
    links::{LinkFaceId, LinkResolver},
    observer::{ReportKind, ReportSettings, ShotKey, ShotObserver, ShotReport},
    obstacles::{ObstacleQuery, ObstacleRef, PortalHit},
    protocol::{PlayerId, ShotId, TeamColor},
    ray::{Aabb, Ray, ray_at_distance_from_origin, ray_minus_ray, reflect},
    segment::{LinkTransit, SegmentReason, ShotPathSegment},
    weapon::{Appearance, FlagKind, ObstacleEffect, WeaponKind},
};

// ============================================================================
// Firing Info
// ============================================================================

/// Everything known about a shot at the moment it was fired.
#[derive(Debug, Clone, PartialEq)]
pub struct FiringInfo {
    pub player: PlayerId,
    pub shot: ShotId,
    // Team carried in the shot itself (only trusted for world weapons).
    pub team: TeamColor,
    // Shooter's team from the roster, if the shooter is known.
    pub shooter_team: Option<TeamColor>,
    pub flag: FlagKind,
    pub position: Vec3,
    pub velocity: Vec3,
    pub start_time: f64,
    pub lifetime: f32,
    pub reload_time: f32,
    pub shot_radius: f32,
    // Stealth shots are only visible to their owner and to Seers.
    pub cloaked: bool,
}

impl FiringInfo {
    // Standard shot from `position` along `direction` with the settings' speed and range.
    #[must_use]
    pub fn new(
        player: PlayerId,
        shot: ShotId,
        position: Vec3,
        direction: Vec3,
        start_time: f64,
        settings: &ShotSettings,
    ) -> Self {
        Self {
            player,
            shot,
            team: TeamColor::Rogue,
            shooter_team: None,
            flag: FlagKind::None,
            position,
            velocity: direction.normalize_or_zero() * settings.shot_speed,
            start_time,
            lifetime: settings.shot_lifetime(),
            reload_time: settings.reload_time,
            shot_radius: settings.shot_radius,
            cloaked: false,
        }
    }

    #[must_use]
    pub const fn with_team(mut self, team: TeamColor) -> Self {
        self.team = team;
        self.shooter_team = Some(team);
        self
    }

    #[must_use]
    pub const fn with_flag(mut self, flag: FlagKind) -> Self {
        self.flag = flag;
        self
    }
}

// Read-only collaborators for building a shot path. A missing world means
// no shot can leave the muzzle.
#[derive(Clone, Copy)]
pub struct SimContext<'a> {
    pub world: Option<&'a dyn ObstacleQuery>,
    pub links: &'a dyn LinkResolver,
    pub settings: &'a ShotSettings,
}

// ============================================================================
// Hit Testing Types
// ============================================================================

// A tank as seen by hit testing. `last_motion` is the centre of the tank over
// the current tick, with `t = 0` at the start of the tick. `radius` is the
// unscaled tank radius; the flag the tank carries resizes it.
#[derive(Debug, Clone, Copy, PartialEq, Component)]
pub struct HitTarget {
    pub id: PlayerId,
    pub last_motion: Ray,
    pub bbox: Aabb,
    pub radius: f32,
    pub flag: FlagKind,
    // Heading around +Z, radians.
    pub angle: f32,
}

impl HitTarget {
    #[must_use]
    pub const fn size_factor(&self) -> f32 {
        match self.flag {
            FlagKind::Obesity => OBESE_FACTOR,
            FlagKind::Tiny => TINY_FACTOR,
            FlagKind::Thief => THIEF_TINY_FACTOR,
            _ => 1.0,
        }
    }

    #[must_use]
    pub fn hit_radius(&self) -> f32 {
        self.radius * self.size_factor()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotHit {
    // Seconds after the start of the current tick.
    pub time: f32,
    pub position: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    pub player: Option<PlayerId>,
    pub flag: FlagKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotStatus {
    Active,
    // Out of segments; one more tick for the explosion.
    Expiring,
    Expired,
}

// What ended a segment during path building.
#[derive(Debug, Clone, Copy)]
enum PathHit {
    Ground,
    Solid(ObstacleRef),
    Portal(PortalHit),
}

// ============================================================================
// Segmented Shot
// ============================================================================

/// A live shot whose whole path is precomputed as straight segments.
#[derive(Debug, Clone, Component)]
pub struct SegmentedShot {
    firing: FiringInfo,
    kind: WeaponKind,
    team: TeamColor,
    segments: Vec<ShotPathSegment>,
    segment: usize,
    last_segment: usize,
    current_time: f64,
    prev_time: f64,
    last_time: f64,
    bbox: Aabb,
    end_obstacle: Option<ObstacleRef>,
    position: Vec3,
    velocity: Vec3,
    status: ShotStatus,
    beam_elapsed: f32,
}

impl SegmentedShot {
    /// Fire a shot of `kind`: scale it for the weapon, then build its path once.
    pub fn new(mut firing: FiringInfo, kind: WeaponKind, ctx: &SimContext<'_>, observer: &mut dyn ShotObserver) -> Self {
        let scale = kind.scale(ctx.settings);
        firing.lifetime *= scale.life;
        firing.velocity *= scale.vel;
        firing.reload_time /= scale.rate;

        let mut shot = Self::unbuilt(firing, kind);
        shot.make_segments(kind.policy(), ctx, observer);

        if kind.is_beam() {
            shot.current_time = shot.last_time;
            shot.segment = shot.segments.len().saturating_sub(1);
        }
        shot
    }

    /// Shot with an already known path; firing info is used as-is.
    #[must_use]
    pub fn with_segments(firing: FiringInfo, kind: WeaponKind, segments: Vec<ShotPathSegment>) -> Self {
        let mut shot = Self::unbuilt(firing, kind);
        shot.segments = segments;
        shot.finish_path();
        shot
    }

    fn unbuilt(firing: FiringInfo, kind: WeaponKind) -> Self {
        let team = TeamColor::for_shot(firing.player, firing.team, firing.shooter_team);
        let start = firing.start_time;
        let position = firing.position;
        let velocity = firing.velocity;
        Self {
            firing,
            kind,
            team,
            segments: Vec::new(),
            segment: 0,
            last_segment: 0,
            current_time: start,
            prev_time: start,
            last_time: start,
            bbox: Aabb::EMPTY,
            end_obstacle: None,
            position,
            velocity,
            status: ShotStatus::Active,
            beam_elapsed: 0.0,
        }
    }

    // ------------------------------------------------------------------------
    // Path building
    // ------------------------------------------------------------------------

    /// Build the complete path for the shot's remaining lifetime under `policy`.
    pub fn make_segments(&mut self, policy: ObstacleEffect, ctx: &SimContext<'_>, observer: &mut dyn ShotObserver) {
        self.segments.clear();
        self.end_obstacle = None;

        let Some(world) = ctx.world else {
            debug!(shot = self.firing.shot.0, "no world, shot path left empty");
            self.finish_path();
            return;
        };

        let policy = if policy == ObstacleEffect::Stop && world.all_shots_ricochet() {
            ObstacleEffect::Reflect
        } else {
            policy
        };

        let mut orig = self.firing.position;
        let mut vel = self.firing.velocity;
        let mut start_time = self.firing.start_time;
        let mut time_left = self.firing.lifetime;

        // Back the first test ray up to the tank so the muzzle offset can't skip walls
        let speed = vel.length();
        let mut min_time = if speed > 0.0 { ctx.settings.muzzle_front / speed } else { 0.0 };
        // Degenerate worlds collapse the clamp box onto the centre
        let bound = (world.world_size() * 0.5 - BOUNDARY_INSET).max(0.0);

        let mut reason = SegmentReason::Initial;
        let mut link: Option<LinkTransit> = None;
        let mut disabled_links: Vec<LinkFaceId> = Vec::new();
        let mut fail_reported = false;

        for iteration in 0..MAX_SEGMENTS {
            if time_left <= SHOT_EPSILON {
                break;
            }

            let mut test_orig = orig - min_time * vel;
            test_orig.x = test_orig.x.max(-bound).min(bound);
            test_orig.y = test_orig.y.max(-bound).min(bound);
            let test_ray = Ray::new(test_orig, vel);

            let max_t = time_left + min_time;
            let hit = nearest_hit(world, &test_ray, max_t, policy == ObstacleEffect::Through);
            let t = hit.map_or(max_t, |(t, _)| t) - min_time;
            min_time = 0.0;

            let consumed = t.max(SHOT_EPSILON);
            let end_time = start_time + f64::from(consumed);
            let next_orig = orig + t * vel;

            let mut segment = ShotPathSegment::new(start_time, end_time, Ray::new(orig, vel), reason);
            segment.link = link.take();

            let mut next_reason = SegmentReason::Through;
            let mut stop = false;
            let mut solid: Option<ObstacleRef> = None;

            match hit.map(|(_, hit)| hit) {
                None => {}
                Some(PathHit::Ground) => match policy {
                    ObstacleEffect::Stop | ObstacleEffect::Through => stop = true,
                    ObstacleEffect::Reflect => {
                        orig = next_orig;
                        vel = reflect(vel, Vec3::Z);
                        next_reason = SegmentReason::Ricochet;
                    }
                },
                Some(PathHit::Solid(obstacle))
                    if policy == ObstacleEffect::Reflect && obstacle.is_outer_wall() && next_orig.z > obstacle.height =>
                {
                    // Cleared the top of the boundary wall: the shot leaves the world here
                    orig = next_orig;
                    next_reason = SegmentReason::Boundary;
                    stop = true;
                    self.end_obstacle = Some(obstacle);
                }
                Some(PathHit::Solid(obstacle)) => solid = Some(obstacle),
                Some(PathHit::Portal(portal)) if disabled_links.contains(&portal.face) => solid = Some(portal.obstacle),
                Some(PathHit::Portal(portal)) => {
                    let seed = u32::from(self.firing.shot.0).wrapping_add(iteration as u32);
                    // Links judge the team the shot carries, not the roster's view of the shooter
                    if let Some(dest) = ctx.links.resolve(portal.face, seed, self.firing.team, self.firing.flag) {
                        orig = next_orig;
                        ctx.links.teleport_shot(&dest, &mut orig, &mut vel);
                        if !dest.physics.shot_pass_text.is_empty() {
                            observer.on_message(&dest.physics.shot_pass_text);
                        }
                        next_reason = SegmentReason::Teleport;
                        link = Some(LinkTransit {
                            src: dest.src,
                            dst: dest.dst,
                            no_effect: ctx.links.suppresses_effects(dest.src),
                        });
                    } else {
                        // Face refuses this shot: it acts as a plain surface from now on
                        disabled_links.push(portal.face);
                        let age = end_time - self.firing.start_time;
                        if !fail_reported
                            && age < TELEPORT_FAIL_MESSAGE_WINDOW
                            && let Some(text) = ctx.links.shot_fail_text(portal.face)
                        {
                            observer.on_message(text);
                            fail_reported = true;
                        }
                        solid = Some(portal.obstacle);
                    }
                }
            }

            if let Some(obstacle) = solid {
                segment.hit_obstacle = Some(obstacle);
                match deflect(policy, world, &obstacle, next_orig, vel) {
                    Some((reflected_reason, reflected_vel)) => {
                        orig = next_orig;
                        vel = reflected_vel;
                        next_reason = reflected_reason;
                    }
                    None => {
                        stop = true;
                        self.end_obstacle = Some(obstacle);
                    }
                }
            }

            self.segments.push(segment);
            start_time = end_time;
            reason = next_reason;
            time_left = if stop { 0.0 } else { time_left - consumed };
        }

        if time_left > SHOT_EPSILON {
            debug!(
                shot = self.firing.shot.0,
                segments = self.segments.len(),
                time_left,
                "shot path truncated at segment cap"
            );
        }

        self.finish_path();
        self.trace_segments();
    }

    fn finish_path(&mut self) {
        self.last_time = self.segments.last().map_or(self.firing.start_time, |segment| segment.end);
        self.bbox = self.segments.iter().fold(Aabb::EMPTY, |mut bbox, segment| {
            bbox.expand_to(&segment.bbox);
            bbox
        });
    }

    fn trace_segments(&self) {
        for (index, segment) in self.segments.iter().enumerate() {
            trace!(
                shot = self.firing.shot.0,
                index,
                start = segment.start,
                end = segment.end,
                orig = ?segment.ray.origin,
                end_pos = ?segment.end_point(),
                dir = ?segment.ray.direction,
                reason = %segment.reason,
                hit = ?segment.hit_obstacle.map(|obstacle| obstacle.id),
                "shot segment"
            );
        }
        trace!(shot = self.firing.shot.0, mins = ?self.bbox.min, maxs = ?self.bbox.max, "shot path bounds");
    }

    // ------------------------------------------------------------------------
    // Simulation
    // ------------------------------------------------------------------------

    /// Advance the shot clock by `dt` and fire the events of every segment
    /// boundary crossed, in order.
    pub fn update(&mut self, dt: f32, reporting: &ReportSettings, observer: &mut dyn ShotObserver) {
        match self.status {
            ShotStatus::Expired => return,
            ShotStatus::Expiring => {
                self.status = ShotStatus::Expired;
                return;
            }
            ShotStatus::Active => {}
        }

        if self.kind.is_beam() {
            self.beam_elapsed += dt;
            if self.beam_elapsed >= self.firing.lifetime {
                self.status = ShotStatus::Expired;
            }
            return;
        }

        self.prev_time = self.current_time;
        self.current_time += f64::from(dt);
        self.last_segment = self.segment;

        let count = self.segments.len();
        while self.segment < count && self.segments[self.segment].end <= self.current_time {
            self.segment += 1;
            if self.segment < count {
                self.dispatch_segment_event(self.segment, reporting, observer);
            }
        }

        if self.segment == count {
            self.status = ShotStatus::Expiring;
            if let Some(last) = self.segments.last() {
                let pos = last.end_point();
                observer.on_explosion(self.key(), pos);

                let kind = if self.end_obstacle.is_some() {
                    ReportKind::Stopped
                } else {
                    ReportKind::Expired
                };
                if reporting.should_report(self.firing.player, kind) {
                    observer.report(self.report(kind, pos, self.end_obstacle, None));
                }
            }
        } else {
            let segment = &self.segments[self.segment];
            self.position = segment.point_at(self.current_time);
            self.velocity = segment.ray.direction;
        }
    }

    fn dispatch_segment_event(&self, index: usize, reporting: &ReportSettings, observer: &mut dyn ShotObserver) {
        let segment = &self.segments[index];
        let previous = &self.segments[index - 1];
        let player = self.firing.player;

        match segment.reason {
            SegmentReason::Initial | SegmentReason::Through | SegmentReason::Boundary => {}
            SegmentReason::Ricochet => {
                let pos = segment.ray.origin;
                let normal = (segment.ray.direction - previous.ray.direction).normalize_or_zero();
                observer.on_ricochet(self.key(), pos, normal, reporting.is_local(player));

                if reporting.should_report(player, ReportKind::Ricochet) {
                    observer.report(self.report(ReportKind::Ricochet, pos, previous.hit_obstacle, None));
                }
            }
            SegmentReason::Teleport => {
                let Some(link) = segment.link else {
                    return;
                };
                if !link.no_effect {
                    observer.on_teleport(self.key(), link.src, link.dst, segment.ray.origin, segment.ray.direction);
                }

                if reporting.should_report(player, ReportKind::Teleport) {
                    observer.report(self.report(ReportKind::Teleport, previous.end_point(), None, Some(link)));
                }
            }
        }
    }

    fn report(&self, kind: ReportKind, pos: Vec3, obstacle: Option<ObstacleRef>, link: Option<LinkTransit>) -> ShotReport {
        ShotReport {
            player: self.firing.player,
            shot: self.firing.shot,
            kind,
            pos,
            obstacle: obstacle.map(|obstacle| obstacle.id),
            link_src: link.map(|link| link.src),
            link_dst: link.map(|link| link.dst),
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    fn segment_at(&self, time: f64) -> Option<&ShotPathSegment> {
        self.segments.iter().find(|segment| segment.end >= time)
    }

    /// Where the shot will be `dt` seconds from now, if it still exists then.
    #[must_use]
    pub fn predict_position(&self, dt: f32) -> Option<Vec3> {
        let time = self.current_time + f64::from(dt);
        self.segment_at(time).map(|segment| segment.point_at(time))
    }

    #[must_use]
    pub fn predict_velocity(&self, dt: f32) -> Option<Vec3> {
        let time = self.current_time + f64::from(dt);
        self.segment_at(time).map(|segment| segment.ray.direction)
    }

    /// Earliest time within the last tick at which the shot touches `target`.
    #[must_use]
    pub fn check_hit(&self, target: &HitTarget) -> Option<ShotHit> {
        if self.status == ShotStatus::Expired || !self.bbox.overlaps(&target.bbox) {
            return None;
        }

        let dt = (self.current_time - self.prev_time) as f32;
        let radius = target.hit_radius();
        let radius_sq = radius * radius;
        let mut best: Option<ShotHit> = None;

        let segments = self.segments.iter().enumerate();
        for (index, segment) in segments.take(self.segment + 1).skip(self.last_segment) {
            // Can't hit yourself with the start of your own laser
            if index == 0 && self.kind == WeaponKind::Laser && self.firing.player == target.id {
                continue;
            }
            if !segment.bbox.overlaps(&target.bbox) {
                continue;
            }

            let relative = ray_minus_ray(
                &segment.ray,
                (self.prev_time - segment.start) as f32,
                &target.last_motion,
                0.0,
            );
            let t = if target.flag == FlagKind::Narrow {
                narrow_hit_time(&relative, target.angle, self.firing.shot_radius)
            } else {
                ray_at_distance_from_origin(&relative, HIT_RADIUS_FACTOR * radius)
            };
            let Some(t) = t else {
                continue;
            };

            if best.is_some_and(|hit| t > hit.time) {
                continue;
            }
            // Within the tick and within this segment's own lifetime
            let t_segment = f64::from(t);
            if t < 0.0
                || t > dt
                || t_segment < segment.start - self.prev_time
                || t_segment > segment.end - self.prev_time
            {
                continue;
            }

            let closest = relative.point(t);
            if closest.length_squared() < radius_sq {
                best = Some(ShotHit {
                    time: t,
                    position: target.last_motion.point(t) + closest,
                });
            }
        }
        best
    }

    /// How the shot is drawn for `viewer`. Colorblind viewers see every shot
    /// in rogue colours.
    #[must_use]
    pub fn appearance(&self, viewer: &Viewer) -> Appearance {
        let team = if viewer.flag == FlagKind::Colorblindness {
            TeamColor::Rogue
        } else {
            self.team
        };
        self.kind.appearance(team)
    }

    #[must_use]
    pub fn visible_to(&self, viewer: &Viewer) -> bool {
        !self.firing.cloaked || viewer.player == Some(self.firing.player) || viewer.flag == FlagKind::Seer
    }

    #[must_use]
    pub const fn is_stopped_by_hit(&self) -> bool {
        self.kind.is_stopped_by_hit()
    }

    #[must_use]
    pub fn key(&self) -> ShotKey {
        ShotKey {
            player: self.firing.player,
            shot: self.firing.shot,
        }
    }

    #[must_use]
    pub const fn firing(&self) -> &FiringInfo {
        &self.firing
    }

    #[must_use]
    pub const fn kind(&self) -> WeaponKind {
        self.kind
    }

    #[must_use]
    pub const fn team(&self) -> TeamColor {
        self.team
    }

    #[must_use]
    pub fn segments(&self) -> &[ShotPathSegment] {
        &self.segments
    }

    #[must_use]
    pub const fn current_segment(&self) -> usize {
        self.segment
    }

    #[must_use]
    pub const fn current_time(&self) -> f64 {
        self.current_time
    }

    #[must_use]
    pub const fn last_time(&self) -> f64 {
        self.last_time
    }

    #[must_use]
    pub const fn bbox(&self) -> &Aabb {
        &self.bbox
    }

    #[must_use]
    pub const fn end_obstacle(&self) -> Option<ObstacleRef> {
        self.end_obstacle
    }

    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    #[must_use]
    pub const fn velocity(&self) -> Vec3 {
        self.velocity
    }

    #[must_use]
    pub const fn status(&self) -> ShotStatus {
        self.status
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.status == ShotStatus::Expired
    }

    #[must_use]
    pub const fn reload_time(&self) -> f32 {
        self.firing.reload_time
    }
}

// Reaction to a solid obstacle at `point`: the reason and velocity of the
// next segment, or `None` when the obstacle absorbs the shot.
fn deflect(
    policy: ObstacleEffect,
    world: &dyn ObstacleQuery,
    obstacle: &ObstacleRef,
    point: Vec3,
    vel: Vec3,
) -> Option<(SegmentReason, Vec3)> {
    match policy {
        // Only a refused link face gets here
        ObstacleEffect::Through => Some((SegmentReason::Through, vel)),
        ObstacleEffect::Stop if !obstacle.ricochet => None,
        ObstacleEffect::Stop | ObstacleEffect::Reflect => {
            Some((SegmentReason::Ricochet, reflect(vel, world.surface_normal(obstacle, point))))
        }
    }
}

// Entry time into the sliver a Narrow tank presents: its full length along
// the heading but only a shot radius across.
fn narrow_hit_time(relative: &Ray, angle: f32, shot_radius: f32) -> Option<f32> {
    let to_tank = Quat::from_rotation_z(-angle);
    let local = Ray::new(to_tank * relative.origin, to_tank * relative.direction);
    let half = Vec3::new(0.5 * TANK_LENGTH, shot_radius, 0.5 * TANK_HEIGHT);
    ray_box_entry(&local, Vec3::ZERO, half).map(|t| t.max(0.0))
}

// Nearest thing along `ray` within `(SHOT_EPSILON, max_t)`. On equal times a
// link face beats a solid obstacle and both beat the ground.
fn nearest_hit(world: &dyn ObstacleQuery, ray: &Ray, max_t: f32, through: bool) -> Option<(f32, PathHit)> {
    let mut best = world
        .first_ground_hit(ray, SHOT_EPSILON, max_t)
        .map(|t| (t, PathHit::Ground));

    let limit = |best: &Option<(f32, PathHit)>| best.map_or(max_t, |(t, _)| t);

    if let Some(hit) = world.first_building_hit(ray, SHOT_EPSILON, max_t, through)
        && hit.t <= limit(&best)
    {
        best = Some((hit.t, PathHit::Solid(hit.obstacle)));
    }
    if let Some(hit) = world.first_link_source_hit(ray, SHOT_EPSILON, max_t)
        && hit.t <= limit(&best)
    {
        best = Some((hit.t, PathHit::Portal(hit)));
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        observer::{EventLog, NullObserver, ReportFilter, ShotEvent},
        obstacles::{ObstacleId, ObstacleKind},
        world::{Arena, BoxBuilding},
    };

    const SHOOTER: PlayerId = PlayerId(1);

    fn settings() -> ShotSettings {
        ShotSettings {
            shot_speed: 10.0,
            shot_range: 100.0,
            ..ShotSettings::default()
        }
    }

    fn arena() -> Arena {
        Arena::new(100.0)
    }

    fn local_reports() -> ReportSettings {
        ReportSettings {
            local_player: Some(SHOOTER),
            filter: ReportFilter::ALL,
        }
    }

    fn fire(arena: &Arena, settings: &ShotSettings, kind: WeaponKind, pos: Vec3, dir: Vec3) -> (SegmentedShot, EventLog) {
        let ctx = SimContext {
            world: Some(arena),
            links: &arena.links,
            settings,
        };
        let firing = FiringInfo::new(SHOOTER, ShotId(7), pos, dir, 0.0, settings);
        let mut log = EventLog::default();
        let shot = SegmentedShot::new(firing, kind, &ctx, &mut log);
        (shot, log)
    }

    fn assert_close(actual: Vec3, expected: Vec3) {
        assert!(
            actual.distance(expected) < 1e-3,
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn ricochet_bounces_between_walls() {
        let arena = arena();
        let settings = settings();
        let (mut shot, _) = fire(&arena, &settings, WeaponKind::Ricochet, Vec3::new(0.0, 0.0, 1.0), Vec3::X);

        let segments = shot.segments();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].reason, SegmentReason::Initial);
        assert_eq!(segments[1].reason, SegmentReason::Ricochet);
        assert!((segments[0].end - 5.0).abs() < 1e-4);
        assert_eq!(segments[0].hit_obstacle.map(|o| o.id), Some(ObstacleId(0)));
        assert_close(segments[1].ray.origin, Vec3::new(50.0, 0.0, 1.0));
        assert_close(segments[1].ray.direction, Vec3::new(-10.0, 0.0, 0.0));
        assert!((shot.last_time() - 10.0).abs() < 1e-4);
        assert!(shot.end_obstacle().is_none());

        let reporting = local_reports();
        let mut log = EventLog::default();
        shot.update(6.0, &reporting, &mut log);
        assert_eq!(shot.current_segment(), 1);
        assert_close(shot.position(), Vec3::new(40.0, 0.0, 1.0));
        assert_close(shot.velocity(), Vec3::new(-10.0, 0.0, 0.0));

        match &log.events[..] {
            [ShotEvent::Ricochet { normal, important, .. }, ShotEvent::Report(report)] => {
                assert_close(*normal, Vec3::NEG_X);
                assert!(*important);
                assert_eq!(report.kind, ReportKind::Ricochet);
                assert_eq!(report.obstacle, Some(ObstacleId(0)));
            }
            other => panic!("unexpected events {other:?}"),
        }

        log.events.clear();
        shot.update(5.0, &reporting, &mut log);
        assert_eq!(shot.status(), ShotStatus::Expiring);
        match &log.events[..] {
            [ShotEvent::Explosion { pos, .. }, ShotEvent::Report(report)] => {
                assert_close(*pos, Vec3::new(0.0, 0.0, 1.0));
                assert_eq!(report.kind, ReportKind::Expired);
            }
            other => panic!("unexpected events {other:?}"),
        }

        shot.update(0.1, &reporting, &mut log);
        assert!(shot.is_expired());
    }

    #[test]
    fn normal_shot_stops_at_box() {
        let mut arena = arena();
        arena.add_box(BoxBuilding {
            id: ObstacleId(42),
            center: Vec3::new(20.0, 0.0, 5.0),
            half: Vec3::new(1.0, 5.0, 5.0),
            ricochet: false,
        });
        let settings = settings();
        let (mut shot, _) = fire(&arena, &settings, WeaponKind::Normal, Vec3::new(0.0, 0.0, 1.0), Vec3::X);

        assert_eq!(shot.segments().len(), 1);
        let end = shot.end_obstacle().expect("stopped by the box");
        assert_eq!(end.id, ObstacleId(42));
        assert_eq!(end.kind, ObstacleKind::Box);
        assert!((shot.last_time() - 1.9).abs() < 1e-4);

        let mut log = EventLog::default();
        shot.update(2.0, &local_reports(), &mut log);
        let report = log.reports().next().expect("stop report");
        assert_eq!(report.kind, ReportKind::Stopped);
        assert_eq!(report.obstacle, Some(ObstacleId(42)));
        assert_close(report.pos, Vec3::new(19.0, 0.0, 1.0));
    }

    #[test]
    fn super_bullet_ignores_buildings() {
        let mut arena = arena();
        arena.add_box(BoxBuilding {
            id: ObstacleId(42),
            center: Vec3::new(20.0, 0.0, 5.0),
            half: Vec3::new(1.0, 5.0, 5.0),
            ricochet: false,
        });
        let settings = ShotSettings {
            shot_range: 35.0,
            ..settings()
        };
        let (shot, _) = fire(&arena, &settings, WeaponKind::SuperBullet, Vec3::new(0.0, 0.0, 1.0), Vec3::X);

        assert_eq!(shot.segments().len(), 1);
        assert_eq!(shot.segments()[0].reason, SegmentReason::Initial);
        assert!((shot.last_time() - 3.5).abs() < 1e-4);
        assert!(shot.end_obstacle().is_none());
    }

    #[test]
    fn ground_stops_or_bounces() {
        let arena = arena();
        let settings = settings();
        let dir = Vec3::new(1.0, 0.0, -0.5);

        let (normal, _) = fire(&arena, &settings, WeaponKind::Normal, Vec3::new(0.0, 0.0, 2.0), dir);
        assert_eq!(normal.segments().len(), 1);
        assert!(normal.end_obstacle().is_none());
        assert!(normal.segments()[0].end_point().z.abs() < 1e-3);

        let (bouncy, _) = fire(&arena, &settings, WeaponKind::Ricochet, Vec3::new(0.0, 0.0, 2.0), dir);
        let second = &bouncy.segments()[1];
        assert_eq!(second.reason, SegmentReason::Ricochet);
        assert!(second.ray.direction.z > 0.0);
        assert!(second.hit_obstacle.is_none());
    }

    #[test]
    fn all_shots_ricochet_turns_stops_into_bounces() {
        let mut arena = arena();
        arena.all_shots_ricochet = true;
        let settings = settings();
        let (shot, _) = fire(&arena, &settings, WeaponKind::Normal, Vec3::new(0.0, 0.0, 1.0), Vec3::X);

        assert_eq!(shot.segments().len(), 2);
        assert_eq!(shot.segments()[1].reason, SegmentReason::Ricochet);
    }

    #[test]
    fn shot_over_the_wall_leaves_the_world() {
        let arena = arena();
        let settings = settings();
        let (shot, _) = fire(&arena, &settings, WeaponKind::Ricochet, Vec3::new(0.0, 0.0, 20.0), Vec3::X);

        assert_eq!(shot.segments().len(), 1);
        assert!((shot.last_time() - 5.0).abs() < 1e-4);
        assert_eq!(shot.end_obstacle().map(|o| o.kind), Some(ObstacleKind::Wall));
    }

    #[test]
    fn weapon_scaling_applies_at_fire_time() {
        let arena = Arena::new(10_000.0);
        let settings = ShotSettings::default();
        let (shot, _) = fire(&arena, &settings, WeaponKind::RapidFire, Vec3::new(0.0, 0.0, 1.0), Vec3::Y);

        assert!((shot.firing().velocity.length() - 150.0).abs() < 1e-3);
        assert!((shot.firing().lifetime - 1.75).abs() < 1e-5);
        assert!((shot.reload_time() - 1.75).abs() < 1e-5);
    }

    #[test]
    fn beam_is_laid_out_at_once() {
        let arena = arena();
        let settings = settings();
        let (mut shot, log) = fire(&arena, &settings, WeaponKind::Laser, Vec3::new(0.0, 0.0, 1.0), Vec3::X);

        assert!(log.events.is_empty());
        assert_eq!(shot.segments().len(), 1);
        assert_eq!(shot.current_segment(), 0);
        assert!((shot.current_time() - shot.last_time()).abs() < 1e-9);
        assert!(!shot.is_stopped_by_hit());

        let mut log = EventLog::default();
        let lifetime = shot.firing().lifetime;
        shot.update(lifetime * 0.5, &local_reports(), &mut log);
        assert_eq!(shot.status(), ShotStatus::Active);
        shot.update(lifetime, &local_reports(), &mut log);
        assert!(shot.is_expired());
        assert!(log.events.is_empty());
    }

    #[test]
    fn laser_cannot_hit_its_owner_on_the_first_leg() {
        let arena = arena();
        let settings = settings();
        let (shot, _) = fire(&arena, &settings, WeaponKind::Laser, Vec3::new(0.0, 0.0, 1.0), Vec3::X);

        let mut target = HitTarget {
            id: SHOOTER,
            last_motion: Ray::new(Vec3::new(20.0, 0.0, 1.0), Vec3::ZERO),
            bbox: Aabb::from_points(Vec3::new(18.0, -2.0, -1.0), Vec3::new(22.0, 2.0, 3.0)),
            radius: 1.0,
            flag: FlagKind::None,
            angle: 0.0,
        };
        assert!(shot.check_hit(&target).is_none());

        target.id = PlayerId(2);
        let hit = shot.check_hit(&target).expect("laser hits another tank");
        assert_close(hit.position, Vec3::new(19.01, 0.0, 1.0));
    }

    #[test]
    fn hit_found_only_within_the_tick() {
        let arena = arena();
        let settings = ShotSettings {
            shot_range: 35.0,
            ..settings()
        };
        let (mut shot, _) = fire(&arena, &settings, WeaponKind::Normal, Vec3::new(0.0, 0.0, 1.0), Vec3::X);
        let target = HitTarget {
            id: PlayerId(2),
            last_motion: Ray::new(Vec3::new(12.0, 0.0, 1.0), Vec3::ZERO),
            bbox: Aabb::from_points(Vec3::new(10.0, -2.0, -1.0), Vec3::new(14.0, 2.0, 3.0)),
            radius: 1.0,
            flag: FlagKind::None,
            angle: 0.0,
        };

        shot.update(1.0, &ReportSettings::default(), &mut NullObserver);
        assert!(shot.check_hit(&target).is_none());

        shot.update(0.5, &ReportSettings::default(), &mut NullObserver);
        let hit = shot.check_hit(&target).expect("shot reaches the tank");
        assert!((hit.time - 0.101).abs() < 1e-4);
        assert_close(hit.position, Vec3::new(11.01, 0.0, 1.0));
    }

    #[test]
    fn prediction_follows_the_path() {
        let arena = arena();
        let settings = settings();
        let (shot, _) = fire(&arena, &settings, WeaponKind::Ricochet, Vec3::new(0.0, 0.0, 1.0), Vec3::X);

        assert_close(shot.predict_position(2.0).unwrap_or_default(), Vec3::new(20.0, 0.0, 1.0));
        assert_close(shot.predict_position(7.0).unwrap_or_default(), Vec3::new(30.0, 0.0, 1.0));
        assert_close(shot.predict_velocity(7.0).unwrap_or_default(), Vec3::new(-10.0, 0.0, 0.0));
        assert!(shot.predict_position(11.0).is_none());
        assert!(shot.predict_velocity(11.0).is_none());
    }

    #[test]
    fn missing_world_expires_quietly() {
        let settings = settings();
        let links = crate::links::LinkTable::default();
        let ctx = SimContext {
            world: None,
            links: &links,
            settings: &settings,
        };
        let firing = FiringInfo::new(SHOOTER, ShotId(1), Vec3::ZERO, Vec3::X, 0.0, &settings);
        let mut shot = SegmentedShot::new(firing, WeaponKind::Normal, &ctx, &mut NullObserver);
        assert!(shot.segments().is_empty());

        let mut log = EventLog::default();
        shot.update(0.1, &local_reports(), &mut log);
        assert_eq!(shot.status(), ShotStatus::Expiring);
        assert!(log.events.is_empty());
        shot.update(0.1, &local_reports(), &mut log);
        assert!(shot.is_expired());
    }

    #[test]
    fn cloaked_shots_need_a_seer() {
        let arena = arena();
        let settings = settings();
        let ctx = SimContext {
            world: Some(&arena),
            links: &arena.links,
            settings: &settings,
        };
        let mut firing = FiringInfo::new(SHOOTER, ShotId(1), Vec3::ZERO, Vec3::X, 0.0, &settings);
        firing.cloaked = true;
        let shot = SegmentedShot::new(firing, WeaponKind::Normal, &ctx, &mut NullObserver);

        let stranger = Viewer {
            player: Some(PlayerId(9)),
            flag: FlagKind::None,
        };
        assert!(!shot.visible_to(&stranger));
        assert!(shot.visible_to(&Viewer {
            flag: FlagKind::Seer,
            ..stranger
        }));
        assert!(shot.visible_to(&Viewer {
            player: Some(SHOOTER),
            flag: FlagKind::None,
        }));
    }

    #[test]
    fn tiny_world_still_builds_a_path() {
        let arena = Arena::new(0.01);
        let settings = settings();
        let (shot, _) = fire(&arena, &settings, WeaponKind::Normal, Vec3::new(0.0, 0.0, 1.0), Vec3::X);

        assert_eq!(shot.segments().len(), 1);
        assert_eq!(shot.end_obstacle().map(|o| o.kind), Some(ObstacleKind::Wall));
    }

    fn parked_target(center: Vec3, radius: f32, flag: FlagKind, angle: f32) -> HitTarget {
        HitTarget {
            id: PlayerId(2),
            last_motion: Ray::new(center, Vec3::ZERO),
            bbox: Aabb::from_points(center - Vec3::splat(10.0), center + Vec3::splat(10.0)),
            radius,
            flag,
            angle,
        }
    }

    #[test]
    fn carried_flags_resize_the_target() {
        let arena = arena();
        let settings = settings();
        let (mut shot, _) = fire(&arena, &settings, WeaponKind::Normal, Vec3::new(0.0, 0.0, 1.0), Vec3::X);
        shot.update(3.0, &ReportSettings::default(), &mut NullObserver);

        let wide = Vec3::new(20.0, 3.0, 1.0);
        assert!(shot.check_hit(&parked_target(wide, 2.0, FlagKind::None, 0.0)).is_none());
        let hit = shot
            .check_hit(&parked_target(wide, 2.0, FlagKind::Obesity, 0.0))
            .expect("obese tank fills the gap");
        assert!((hit.time - 1.6063).abs() < 1e-3);

        let near = Vec3::new(20.0, 1.0, 1.0);
        assert!(shot.check_hit(&parked_target(near, 2.0, FlagKind::None, 0.0)).is_some());
        assert!(shot.check_hit(&parked_target(near, 2.0, FlagKind::Tiny, 0.0)).is_none());
    }

    #[test]
    fn narrow_tanks_are_thin_from_the_side() {
        let arena = arena();
        let settings = settings();
        let (mut shot, _) = fire(&arena, &settings, WeaponKind::Normal, Vec3::new(0.0, 0.0, 1.0), Vec3::X);
        shot.update(3.0, &ReportSettings::default(), &mut NullObserver);

        // Shot runs along the tank's long axis, off by more than a shot radius
        let offset = Vec3::new(20.0, 0.8, 1.0);
        assert!(shot.check_hit(&parked_target(offset, TANK_RADIUS, FlagKind::None, 0.0)).is_some());
        assert!(shot.check_hit(&parked_target(offset, TANK_RADIUS, FlagKind::Narrow, 0.0)).is_none());

        // Broadside the same tank is as long as ever
        let broadside = parked_target(offset, TANK_RADIUS, FlagKind::Narrow, std::f32::consts::FRAC_PI_2);
        let hit = shot.check_hit(&broadside).expect("broadside narrow tank is hit");
        assert!((hit.time - 1.95).abs() < 1e-3);

        // Head on the shot meets the tank's nose
        let head_on = parked_target(Vec3::new(20.0, 0.0, 1.0), TANK_RADIUS, FlagKind::Narrow, 0.0);
        let hit = shot.check_hit(&head_on).expect("head-on narrow tank is hit");
        assert!((hit.time - 1.7).abs() < 1e-3);
        assert_close(hit.position, Vec3::new(17.0, 0.0, 1.0));
    }

    #[test]
    fn bounce_leg_cannot_hit_before_the_bounce() {
        let arena = arena();
        let settings = settings();
        let (mut shot, _) = fire(&arena, &settings, WeaponKind::Ricochet, Vec3::new(0.0, 0.0, 1.0), Vec3::X);

        // Tick spans the bounce at x = 50; the tank sits just outside the wall
        shot.update(4.0, &ReportSettings::default(), &mut NullObserver);
        shot.update(2.0, &ReportSettings::default(), &mut NullObserver);
        assert_eq!(shot.current_segment(), 1);

        let target = HitTarget {
            bbox: Aabb::from_points(Vec3::new(40.0, -2.0, -1.0), Vec3::new(57.0, 2.0, 3.0)),
            ..parked_target(Vec3::new(55.0, 0.0, 1.0), 1.0, FlagKind::None, 0.0)
        };
        assert!(shot.check_hit(&target).is_none());
    }

    #[test]
    fn colorblind_viewers_see_rogue_shots() {
        let arena = arena();
        let settings = settings();
        let ctx = SimContext {
            world: Some(&arena),
            links: &arena.links,
            settings: &settings,
        };
        let firing = FiringInfo::new(SHOOTER, ShotId(1), Vec3::new(0.0, 0.0, 1.0), Vec3::X, 0.0, &settings)
            .with_team(TeamColor::Blue);
        let shot = SegmentedShot::new(firing, WeaponKind::SuperBullet, &ctx, &mut NullObserver);

        let mut viewer = Viewer {
            player: Some(PlayerId(9)),
            flag: FlagKind::None,
        };
        let look = shot.appearance(&viewer);
        assert_eq!(look.team, TeamColor::Blue);
        assert!(look.super_texture);

        viewer.flag = FlagKind::Colorblindness;
        assert_eq!(shot.appearance(&viewer).team, TeamColor::Rogue);
    }
}
