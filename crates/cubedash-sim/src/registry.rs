//! Static table mapping serialized obstacle type paths to obstacle kinds.
//!
//! Every path a level document may name is listed here. Lookup failures are
//! reported at load time, never during simulation.

use cubedash_core::ModeTag;

use crate::collision;
use crate::level::{
    BlockShape, LevelError, ObjectData, ObjectFile, Obstacle, ObstacleKind, OrbKind, PadKind,
    PaletteSection, SpikeShape, TriggerAction, TriggerCondition,
};

/// How the kind-specific part of an entry is built from object data.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Build {
    Fixed(ObstacleKind),
    ColorTrigger,
    GravityTrigger,
    Coin,
}

#[derive(Debug, Clone, Copy)]
pub struct RegistryEntry {
    pub path: &'static str,
    build: Build,
}

const fn fixed(path: &'static str, kind: ObstacleKind) -> RegistryEntry {
    RegistryEntry {
        path,
        build: Build::Fixed(kind),
    }
}

static REGISTRY: &[RegistryEntry] = &[
    fixed("block.basic-block", ObstacleKind::Block(BlockShape::Full)),
    fixed("block.half-block", ObstacleKind::Block(BlockShape::Half)),
    fixed("death.basic-spike", ObstacleKind::Hazard(SpikeShape::Full)),
    fixed("death.half-spike", ObstacleKind::Hazard(SpikeShape::Half)),
    fixed("jump.orb.jump", ObstacleKind::Orb(OrbKind::Jump)),
    fixed("jump.orb.black", ObstacleKind::Orb(OrbKind::Black)),
    fixed("jump.orb.gravity", ObstacleKind::Orb(OrbKind::Gravity)),
    fixed("jump.pad.jump", ObstacleKind::Pad(PadKind::Jump)),
    fixed("jump.pad.jump-small", ObstacleKind::Pad(PadKind::SmallJump)),
    fixed("jump.pad.gravity", ObstacleKind::Pad(PadKind::Gravity)),
    fixed("portal.gamemode.cube", ObstacleKind::ModePortal(ModeTag::Cube)),
    fixed("portal.gamemode.ship", ObstacleKind::ModePortal(ModeTag::Ship)),
    fixed("portal.gamemode.ball", ObstacleKind::ModePortal(ModeTag::Ball)),
    fixed("portal.gamemode.wave", ObstacleKind::ModePortal(ModeTag::Wave)),
    fixed("portal.gravity-down", ObstacleKind::GravityPortal { sign: 1 }),
    fixed("portal.gravity-up", ObstacleKind::GravityPortal { sign: -1 }),
    RegistryEntry {
        path: "special.trigger.color",
        build: Build::ColorTrigger,
    },
    RegistryEntry {
        path: "special.trigger.gravity",
        build: Build::GravityTrigger,
    },
    RegistryEntry {
        path: "special.coin",
        build: Build::Coin,
    },
    fixed("special.start-pos", ObstacleKind::StartPos),
];

/// All registered entries, in table order.
pub fn entries() -> &'static [RegistryEntry] {
    REGISTRY
}

pub fn lookup(path: &str) -> Option<&'static RegistryEntry> {
    REGISTRY.iter().find(|e| e.path == path)
}

/// Build one obstacle from a serialized placement.
pub fn build(path: &str, data: &ObjectData) -> Result<Obstacle, LevelError> {
    let entry = lookup(path).ok_or_else(|| LevelError::UnknownObstacle(path.to_string()))?;

    let invalid = |field: &'static str, reason: String| LevelError::InvalidField {
        kind: path.to_string(),
        field,
        reason,
    };

    if !data.x.is_finite() {
        return Err(invalid("x", "must be finite".to_string()));
    }
    if !data.y.is_finite() {
        return Err(invalid("y", "must be finite".to_string()));
    }
    let rotation = data.rotation.unwrap_or(0.0);
    if ![0.0, 90.0, 180.0, 270.0].contains(&rotation) {
        return Err(invalid(
            "rotation",
            format!("{rotation} is not one of 0, 90, 180, 270"),
        ));
    }

    let condition = if data.needs_touch.unwrap_or(false) {
        TriggerCondition::Touch
    } else {
        TriggerCondition::Pass
    };

    let kind = match entry.build {
        Build::Fixed(kind) => kind,
        Build::Coin => ObstacleKind::Coin { index: 0 },
        Build::ColorTrigger => {
            let section = match data.section.as_deref().unwrap_or("stage") {
                "stage" => PaletteSection::Stage,
                "bg" => PaletteSection::Bg,
                other => return Err(invalid("section", format!("unknown section {other:?}"))),
            };
            let [r, g, b] = data.color.unwrap_or([255.0, 0.0, 0.0]);
            let duration = data.duration.unwrap_or(0.0);
            if !duration.is_finite() || duration < 0.0 {
                return Err(invalid("duration", format!("{duration} is not a tick count")));
            }
            ObstacleKind::Trigger {
                condition,
                action: TriggerAction::Color {
                    section,
                    color: [channel(r), channel(g), channel(b)],
                    duration,
                },
            }
        },
        Build::GravityTrigger => {
            let sign = match data.gravity {
                Some(1) => 1,
                Some(-1) => -1,
                Some(other) => return Err(invalid("gravity", format!("{other} is not 1 or -1"))),
                None => return Err(invalid("gravity", "missing".to_string())),
            };
            ObstacleKind::Trigger {
                condition,
                action: TriggerAction::Gravity { sign },
            }
        },
    };

    if collision::rule_for(kind.class()).is_none() {
        return Err(LevelError::NoContactRule(path.to_string()));
    }

    Ok(Obstacle {
        kind,
        x: data.x,
        y: data.y,
        rotation,
        groups: data.groups.clone(),
    })
}

fn channel(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Registry path of an obstacle kind.
pub fn path_of(kind: &ObstacleKind) -> &'static str {
    let found = REGISTRY.iter().find(|e| match (e.build, kind) {
        (Build::Fixed(k), _) => k == *kind,
        (Build::Coin, ObstacleKind::Coin { .. }) => true,
        (
            Build::ColorTrigger,
            ObstacleKind::Trigger {
                action: TriggerAction::Color { .. },
                ..
            },
        ) => true,
        (
            Build::GravityTrigger,
            ObstacleKind::Trigger {
                action: TriggerAction::Gravity { .. },
                ..
            },
        ) => true,
        _ => false,
    });
    // Every constructible kind has an entry; see `every_kind_has_a_path`.
    found.map_or("special.start-pos", |e| e.path)
}

/// Serialize an obstacle back to a placement record.
pub fn describe(obstacle: &Obstacle) -> ObjectFile {
    let mut data = ObjectData {
        x: obstacle.x,
        y: obstacle.y,
        rotation: Some(obstacle.rotation),
        groups: obstacle.groups.clone(),
        ..ObjectData::default()
    };
    if let ObstacleKind::Trigger { condition, action } = obstacle.kind {
        data.needs_touch = Some(condition == TriggerCondition::Touch);
        match action {
            TriggerAction::Color {
                section,
                color,
                duration,
            } => {
                data.section = Some(
                    match section {
                        PaletteSection::Stage => "stage",
                        PaletteSection::Bg => "bg",
                    }
                    .to_string(),
                );
                data.color = Some(color.map(f32::from));
                data.duration = Some(duration);
            },
            TriggerAction::Gravity { sign } => data.gravity = Some(sign),
        }
    }
    ObjectFile {
        kind: path_of(&obstacle.kind).to_string(),
        data,
    }
}
