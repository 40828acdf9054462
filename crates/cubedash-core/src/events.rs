use serde::{Deserialize, Serialize};

use crate::completion::CompletionReport;

/// Render-facing tag for the active movement mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeTag {
    #[default]
    Cube,
    Ship,
    Ball,
    Wave,
}

impl ModeTag {
    pub const ALL: [ModeTag; 4] = [ModeTag::Cube, ModeTag::Ship, ModeTag::Ball, ModeTag::Wave];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModeTag::Cube => "cube",
            ModeTag::Ship => "ship",
            ModeTag::Ball => "ball",
            ModeTag::Wave => "wave",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }
}

/// One live body as the render sink sees it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyFrame {
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub gravity_sign: i8,
    pub mode: ModeTag,
}

/// Trip-state flags of one obstacle, indexed by load order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ObstacleFrame {
    pub index: usize,
    /// Trigger has fired this attempt.
    pub activated: bool,
    /// Orb or pad is inside its retrigger timeout.
    pub cooling_down: bool,
    /// Coin was picked up this attempt.
    pub collected: bool,
    /// Coin was picked up in an earlier completed run, per the level's
    /// completion record.
    pub previously_collected: bool,
    /// Remaining pickup fade, in ticks. Visual only.
    pub collect_fade: f32,
}

/// Interpolated level colors as RGB components in 0..=255.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StageColors {
    pub bg: [f32; 3],
    pub stage: [f32; 3],
}

/// Events emitted by a simulation tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    Died {
        x: f32,
        y: f32,
        percentage: u8,
    },
    RespawnScheduled {
        at_tick: u64,
    },
    Respawned {
        attempt: u32,
    },
    Won {
        percentage: u8,
    },
    CoinCollected {
        index: usize,
    },
    TriggerFired {
        index: usize,
    },
    ModeChanged {
        mode: ModeTag,
    },
    /// Completion data for the persistence sink (sent on death and on win).
    Report(CompletionReport),
    /// A branch of the explorer died and was dropped.
    BranchDied {
        x: f32,
        y: f32,
    },
    /// Converged branches were merged.
    BranchesCollapsed {
        removed: usize,
    },
    /// A branch was evicted by the population cap. `burst` asks the
    /// render sink to show it exploding rather than vanishing.
    BranchEvicted {
        x: f32,
        y: f32,
        burst: bool,
    },
    /// The first branch reached the end of the stage.
    ExplorationWon {
        tick: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_tag_names_roundtrip() {
        for tag in ModeTag::ALL {
            assert_eq!(ModeTag::parse(tag.as_str()), Some(tag));
        }
        assert_eq!(ModeTag::parse("spider"), None);
    }

    #[test]
    fn mode_tag_serializes_lowercase() {
        let json = serde_json::to_string(&ModeTag::Wave).unwrap();
        assert_eq!(json, "\"wave\"");
    }
}
