use anyhow::{Result, bail};
use bevy_ecs::{message::Message, prelude::Resource};
use bevy_math::Vec3;
use std::str::FromStr;

use crate::{
    links::LinkFaceId,
    obstacles::ObstacleId,
    protocol::{PlayerId, ShotId},
};

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Ricochet,
    Teleport,
    Expired,
    Stopped,
}

impl ReportKind {
    // Letter used in the report filter string.
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Ricochet => 'R',
            Self::Teleport => 'T',
            Self::Expired => 'E',
            Self::Stopped => 'S',
        }
    }
}

// Upstream notice about a local player's shot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotReport {
    pub player: PlayerId,
    pub shot: ShotId,
    pub kind: ReportKind,
    pub pos: Vec3,
    pub obstacle: Option<ObstacleId>,
    pub link_src: Option<LinkFaceId>,
    pub link_dst: Option<LinkFaceId>,
}

// Which report kinds get sent upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportFilter {
    pub ricochet: bool,
    pub teleport: bool,
    pub expired: bool,
    pub stopped: bool,
}

impl ReportFilter {
    pub const ALL: Self = Self {
        ricochet: true,
        teleport: true,
        expired: true,
        stopped: true,
    };

    #[must_use]
    pub const fn wants(&self, kind: ReportKind) -> bool {
        match kind {
            ReportKind::Ricochet => self.ricochet,
            ReportKind::Teleport => self.teleport,
            ReportKind::Expired => self.expired,
            ReportKind::Stopped => self.stopped,
        }
    }
}

// "1" enables every report, otherwise each letter (R, T, E, S) enables one.
impl FromStr for ReportFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == "1" {
            return Ok(Self::ALL);
        }

        let mut filter = Self::default();
        for c in s.chars() {
            match c.to_ascii_uppercase() {
                'R' => filter.ricochet = true,
                'T' => filter.teleport = true,
                'E' => filter.expired = true,
                'S' => filter.stopped = true,
                '0' => {}
                other => bail!("unknown shot report code '{other}' in \"{s}\""),
            }
        }
        Ok(filter)
    }
}

// Who is watching the simulation and what they want reported.
#[derive(Debug, Clone, Copy, Default, Resource)]
pub struct ReportSettings {
    pub local_player: Option<PlayerId>,
    pub filter: ReportFilter,
}

impl ReportSettings {
    #[must_use]
    pub fn is_local(&self, player: PlayerId) -> bool {
        self.local_player == Some(player)
    }

    #[must_use]
    pub fn should_report(&self, player: PlayerId, kind: ReportKind) -> bool {
        self.is_local(player) && self.filter.wants(kind)
    }
}

// ============================================================================
// Observer Hooks
// ============================================================================

// Identity of the shot an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShotKey {
    pub player: PlayerId,
    pub shot: ShotId,
}

/// Side effects of the shot simulation. Every hook is fire-and-forget: the
/// simulation never looks at what an observer does with an event.
pub trait ShotObserver {
    // Bounce sound and effect; `important` when the local player fired.
    fn on_ricochet(&mut self, _shot: ShotKey, _pos: Vec3, _normal: Vec3, _important: bool) {}

    fn on_teleport(&mut self, _shot: ShotKey, _src: LinkFaceId, _dst: LinkFaceId, _pos: Vec3, _dir: Vec3) {}

    fn on_explosion(&mut self, _shot: ShotKey, _pos: Vec3) {}

    fn on_message(&mut self, _text: &str) {}

    fn report(&mut self, _report: ShotReport) {}
}

pub struct NullObserver;

impl ShotObserver for NullObserver {}

// ============================================================================
// Event Log
// ============================================================================

#[derive(Debug, Clone, PartialEq, Message)]
pub enum ShotEvent {
    Ricochet {
        shot: ShotKey,
        pos: Vec3,
        normal: Vec3,
        important: bool,
    },
    Teleport {
        shot: ShotKey,
        src: LinkFaceId,
        dst: LinkFaceId,
        pos: Vec3,
        dir: Vec3,
    },
    Explosion {
        shot: ShotKey,
        pos: Vec3,
    },
    Message(String),
    Report(ShotReport),
}

// Observer that records events in the order they fire.
#[derive(Debug, Default)]
pub struct EventLog {
    pub events: Vec<ShotEvent>,
}

impl EventLog {
    pub fn drain(&mut self) -> impl Iterator<Item = ShotEvent> + '_ {
        self.events.drain(..)
    }

    pub fn reports(&self) -> impl Iterator<Item = &ShotReport> {
        self.events.iter().filter_map(|event| match event {
            ShotEvent::Report(report) => Some(report),
            _ => None,
        })
    }

    #[must_use]
    pub fn ricochet_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, ShotEvent::Ricochet { .. }))
            .count()
    }
}

impl ShotObserver for EventLog {
    fn on_ricochet(&mut self, shot: ShotKey, pos: Vec3, normal: Vec3, important: bool) {
        self.events.push(ShotEvent::Ricochet {
            shot,
            pos,
            normal,
            important,
        });
    }

    fn on_teleport(&mut self, shot: ShotKey, src: LinkFaceId, dst: LinkFaceId, pos: Vec3, dir: Vec3) {
        self.events.push(ShotEvent::Teleport {
            shot,
            src,
            dst,
            pos,
            dir,
        });
    }

    fn on_explosion(&mut self, shot: ShotKey, pos: Vec3) {
        self.events.push(ShotEvent::Explosion { shot, pos });
    }

    fn on_message(&mut self, text: &str) {
        self.events.push(ShotEvent::Message(text.to_string()));
    }

    fn report(&mut self, report: ShotReport) {
        self.events.push(ShotEvent::Report(report));
    }
}
