use serde::{Deserialize, Serialize};

#[cfg(feature = "bincode")]
use bincode::{Decode, Encode};

use crate::{
    constants::SERVER_PLAYER,
    observer::{ReportKind, ShotReport},
};

// Macro to reduce boilerplate for structs
macro_rules! message {
    ($(#[$meta:meta])* struct $name:ident $body:tt) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[cfg_attr(feature = "bincode", derive(Encode, Decode))]
        pub struct $name $body
    };
}

// ============================================================================
// Common Data Types
// ============================================================================

// Player ID - identifies who fired a shot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub struct PlayerId(pub u8);

impl PlayerId {
    pub const SERVER: Self = Self(SERVER_PLAYER);

    #[must_use]
    pub const fn is_server(self) -> bool {
        self.0 == SERVER_PLAYER
    }
}

// Shot ID - unique per player, wraps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub struct ShotId(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub enum TeamColor {
    NoTeam,
    #[default]
    Rogue,
    Red,
    Green,
    Blue,
    Purple,
    Observer,
    Rabbit,
    Hunter,
}

impl TeamColor {
    // Team to draw and resolve a shot with. World weapons carry whatever team
    // the server put in the shot; anything outside the playing teams is Rogue.
    #[must_use]
    pub const fn for_shot(player: PlayerId, shot_team: Self, roster_team: Option<Self>) -> Self {
        if player.is_server() {
            match shot_team {
                Self::NoTeam => Self::Rogue,
                team => team,
            }
        } else {
            match roster_team {
                Some(team) => team,
                None => Self::Rogue,
            }
        }
    }
}

// ============================================================================
// Shot Reports
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub enum ShotInfoKind {
    Ricochet,
    Teleport,
    Expired,
    Stopped,
}

message! {
// Client to Server: something happened to one of our shots.
struct ShotInfo {
    pub player: PlayerId,
    pub shot: ShotId,
    pub kind: ShotInfoKind,
    pub pos: [f32; 3],
    pub obstacle: Option<u32>,
    pub link_src: Option<u32>,
    pub link_dst: Option<u32>,
}
}

impl From<&ShotReport> for ShotInfo {
    fn from(report: &ShotReport) -> Self {
        let kind = match report.kind {
            ReportKind::Ricochet => ShotInfoKind::Ricochet,
            ReportKind::Teleport => ShotInfoKind::Teleport,
            ReportKind::Expired => ShotInfoKind::Expired,
            ReportKind::Stopped => ShotInfoKind::Stopped,
        };
        Self {
            player: report.player,
            shot: report.shot,
            kind,
            pos: report.pos.to_array(),
            obstacle: report.obstacle.map(|id| id.0),
            link_src: report.link_src.map(|id| id.0),
            link_dst: report.link_dst.map(|id| id.0),
        }
    }
}
