use serde::{Deserialize, Serialize};

use cubedash_core::{CompletionRecord, ModeTag, Rect};

use crate::registry;

/// Portal collision boxes are this many tiles tall, centered on their tile.
pub const PORTAL_HEIGHT: f32 = 3.0;
/// Stage extends this far past the rightmost obstacle.
pub const STAGE_TAIL: f32 = 5.0;
/// Default `settings.speed`; forward speed is `speed * 0.01` tiles per tick.
pub const DEFAULT_SPEED: f32 = 10.0;
/// Default maximum height before a body is destroyed.
pub const DEFAULT_FALL_LIMIT: f32 = 40.0;

#[derive(Debug)]
pub enum LevelError {
    Io(String),
    Parse(String),
    /// Object type path with no registry entry.
    UnknownObstacle(String),
    /// Obstacle kind with no collision rule.
    NoContactRule(String),
    UnknownMode(String),
    InvalidField {
        kind: String,
        field: &'static str,
        reason: String,
    },
}

impl std::fmt::Display for LevelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "level io error: {e}"),
            Self::Parse(e) => write!(f, "level parse error: {e}"),
            Self::UnknownObstacle(path) => write!(f, "unknown obstacle type: {path}"),
            Self::NoContactRule(path) => write!(f, "no collision rule for obstacle type: {path}"),
            Self::UnknownMode(name) => write!(f, "unknown movement mode: {name}"),
            Self::InvalidField {
                kind,
                field,
                reason,
            } => write!(f, "invalid field `{field}` on {kind}: {reason}"),
        }
    }
}

impl std::error::Error for LevelError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockShape {
    Full,
    Half,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpikeShape {
    Full,
    Half,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrbKind {
    Jump,
    Black,
    Gravity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PadKind {
    Jump,
    SmallJump,
    Gravity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaletteSection {
    Stage,
    Bg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerCondition {
    /// Hit-box overlap with the trigger tile.
    Touch,
    /// Hit-box center has moved past the trigger's center.
    Pass,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TriggerAction {
    Color {
        section: PaletteSection,
        color: [u8; 3],
        duration: f32,
    },
    Gravity {
        sign: i8,
    },
}

/// Placed obstacle variants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ObstacleKind {
    Block(BlockShape),
    Hazard(SpikeShape),
    Orb(OrbKind),
    Pad(PadKind),
    ModePortal(ModeTag),
    GravityPortal { sign: i8 },
    Trigger {
        condition: TriggerCondition,
        action: TriggerAction,
    },
    /// `index` is the coin's slot in the completion record.
    Coin { index: usize },
    StartPos,
}

/// Coarse class used to pick a collision rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObstacleClass {
    Block,
    Hazard,
    Orb,
    Pad,
    ModePortal,
    GravityPortal,
    Trigger,
    Coin,
    Marker,
}

impl ObstacleKind {
    pub fn class(&self) -> ObstacleClass {
        match self {
            ObstacleKind::Block(_) => ObstacleClass::Block,
            ObstacleKind::Hazard(_) => ObstacleClass::Hazard,
            ObstacleKind::Orb(_) => ObstacleClass::Orb,
            ObstacleKind::Pad(_) => ObstacleClass::Pad,
            ObstacleKind::ModePortal(_) => ObstacleClass::ModePortal,
            ObstacleKind::GravityPortal { .. } => ObstacleClass::GravityPortal,
            ObstacleKind::Trigger { .. } => ObstacleClass::Trigger,
            ObstacleKind::Coin { .. } => ObstacleClass::Coin,
            ObstacleKind::StartPos => ObstacleClass::Marker,
        }
    }
}

/// A placed level object. Position is fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub kind: ObstacleKind,
    pub x: f32,
    pub y: f32,
    /// Degrees, one of 0, 90, 180, 270.
    pub rotation: f32,
    pub groups: Vec<String>,
}

impl Obstacle {
    pub fn new(kind: ObstacleKind, x: f32, y: f32) -> Self {
        Self {
            kind,
            x,
            y,
            rotation: 0.0,
            groups: Vec::new(),
        }
    }

    pub fn rotated(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn tile(&self) -> Rect {
        Rect::tile(self.x, self.y)
    }

    /// Collision rect in world space, after rotation. `None` for markers.
    pub fn rect(&self) -> Option<Rect> {
        let tile = self.tile();
        let local = match self.kind {
            ObstacleKind::Block(BlockShape::Full) => tile,
            ObstacleKind::Block(BlockShape::Half) => tile.relative(0.0, 0.5, 1.0, 0.5),
            ObstacleKind::Hazard(SpikeShape::Full) => tile.relative(0.2, 0.0, 0.6, 0.8),
            ObstacleKind::Hazard(SpikeShape::Half) => tile.relative(0.2, 0.0, 0.6, 0.4),
            ObstacleKind::Orb(_) | ObstacleKind::Coin { .. } => tile,
            ObstacleKind::Pad(_) => tile.relative(0.0, 0.0, 1.0, 0.2),
            // Portals and triggers are never rotated for collision.
            ObstacleKind::ModePortal(_) | ObstacleKind::GravityPortal { .. } => {
                return Some(tile.relative(
                    0.0,
                    PORTAL_HEIGHT * -0.5 + 0.5,
                    1.0,
                    PORTAL_HEIGHT,
                ));
            },
            ObstacleKind::Trigger { .. } => return Some(tile),
            ObstacleKind::StartPos => return None,
        };
        Some(local.rotate_in_tile(self.rotation, self.x, self.y))
    }
}

/// Level-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSettings {
    pub start_mode: ModeTag,
    /// Tiles per tick.
    pub forward_speed: f32,
    /// Blocks push the body sideways instead of killing it, and left input
    /// can move it backward.
    pub platformer: bool,
    pub fall_limit: f32,
    pub color_bg: [u8; 3],
    pub color_stage: [u8; 3],
}

impl Default for LevelSettings {
    fn default() -> Self {
        Self {
            start_mode: ModeTag::Cube,
            forward_speed: DEFAULT_SPEED * 0.01,
            platformer: false,
            fall_limit: DEFAULT_FALL_LIMIT,
            color_bg: [0, 125, 255],
            color_stage: [0, 125, 255],
        }
    }
}

/// Immutable-per-run level: obstacles plus settings.
#[derive(Debug, Clone)]
pub struct Level {
    pub name: String,
    pub description: String,
    pub settings: LevelSettings,
    obstacles: Vec<Obstacle>,
    /// Collision rect per obstacle, computed once at load.
    rects: Vec<Option<Rect>>,
    /// Obstacle indices sorted by x, for range culling.
    by_x: Vec<usize>,
    stage_width: f32,
    coin_count: usize,
    start_pos: Option<(f32, f32)>,
    /// Completion record read at load time.
    pub completion: CompletionRecord,
    source: Option<LevelFile>,
}

impl Level {
    /// Build a level from already-constructed obstacles. Coins are numbered
    /// in order of appearance.
    pub fn new(settings: LevelSettings, obstacles: Vec<Obstacle>) -> Self {
        let mut obstacles = obstacles;
        let mut coin_count = 0;
        for ob in &mut obstacles {
            if let ObstacleKind::Coin { index } = &mut ob.kind {
                *index = coin_count;
                coin_count += 1;
            }
        }

        let stage_width = obstacles
            .iter()
            .map(|o| o.x + STAGE_TAIL)
            .fold(0.0f32, f32::max);

        let start_pos = obstacles
            .iter()
            .rev()
            .find(|o| o.kind == ObstacleKind::StartPos)
            .map(|o| (o.x, o.y));

        let rects = obstacles.iter().map(Obstacle::rect).collect();

        let mut by_x: Vec<usize> = (0..obstacles.len()).collect();
        by_x.sort_by(|&a, &b| obstacles[a].x.total_cmp(&obstacles[b].x));

        Self {
            name: "Untitled Level".to_string(),
            description: String::new(),
            settings,
            obstacles,
            rects,
            by_x,
            stage_width,
            coin_count,
            start_pos,
            completion: CompletionRecord::with_coin_count(coin_count),
            source: None,
        }
    }

    /// Parse a level document (see `LevelFile`).
    pub fn from_json(data: &str) -> Result<Self, LevelError> {
        let file: LevelFile =
            serde_json::from_str(data).map_err(|e| LevelError::Parse(e.to_string()))?;
        Self::from_file(file)
    }

    pub fn load(path: &str) -> Result<Self, LevelError> {
        let data = std::fs::read_to_string(path).map_err(|e| LevelError::Io(format!("{path}: {e}")))?;
        Self::from_json(&data)
    }

    pub fn from_file(file: LevelFile) -> Result<Self, LevelError> {
        let settings = file.settings.resolve()?;

        let mut obstacles = Vec::with_capacity(file.objects.len());
        for object in &file.objects {
            obstacles.push(registry::build(&object.kind, &object.data)?);
        }

        let mut level = Level::new(settings, obstacles);
        level.name = file.name.clone();
        level.description = file.description.clone();
        level.completion = file.completion.clone();
        if level.completion.coins.len() < level.coin_count {
            level.completion.coins.resize(level.coin_count, false);
        }

        tracing::info!(
            name = %level.name,
            obstacles = level.obstacles.len(),
            coins = level.coin_count,
            stage_width = level.stage_width,
            "Level loaded"
        );

        level.source = Some(file);
        Ok(level)
    }

    /// Serialize the level document back, carrying the current completion
    /// record. Unknown top-level fields of the source document are kept.
    pub fn to_json(&self) -> Result<String, LevelError> {
        let mut file = match &self.source {
            Some(file) => file.clone(),
            None => LevelFile::from_level(self),
        };
        file.completion = self.completion.clone();
        serde_json::to_string_pretty(&file).map_err(|e| LevelError::Parse(e.to_string()))
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn rect(&self, index: usize) -> Option<Rect> {
        self.rects.get(index).copied().flatten()
    }

    pub fn stage_width(&self) -> f32 {
        self.stage_width
    }

    pub fn coin_count(&self) -> usize {
        self.coin_count
    }

    pub fn start_pos(&self) -> Option<(f32, f32)> {
        self.start_pos
    }

    /// Indices of obstacles whose x lies within `distance` of `x`, in x order.
    pub fn nearby(&self, x: f32, distance: f32) -> impl Iterator<Item = usize> + '_ {
        let lo = self
            .by_x
            .partition_point(|&i| self.obstacles[i].x < x - distance);
        let hi = self
            .by_x
            .partition_point(|&i| self.obstacles[i].x <= x + distance);
        self.by_x[lo..hi].iter().copied()
    }
}

// ================================================================
// Level document
// ================================================================

/// On-disk level document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelFile {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub settings: SettingsFile,
    #[serde(default)]
    pub objects: Vec<ObjectFile>,
    #[serde(default)]
    pub completion: CompletionRecord,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_name() -> String {
    "Untitled Level".to_string()
}

impl LevelFile {
    fn from_level(level: &Level) -> Self {
        let s = &level.settings;
        Self {
            name: level.name.clone(),
            description: level.description.clone(),
            settings: SettingsFile {
                colorbg: s.color_bg,
                colorstage: s.color_stage,
                gamemode: s.start_mode.as_str().to_string(),
                speed: s.forward_speed / 0.01,
                platformer: s.platformer,
                fall_limit: s.fall_limit,
            },
            objects: level.obstacles.iter().map(registry::describe).collect(),
            completion: level.completion.clone(),
            extra: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsFile {
    pub colorbg: [u8; 3],
    pub colorstage: [u8; 3],
    pub gamemode: String,
    pub speed: f32,
    pub platformer: bool,
    pub fall_limit: f32,
}

impl Default for SettingsFile {
    fn default() -> Self {
        let d = LevelSettings::default();
        Self {
            colorbg: d.color_bg,
            colorstage: d.color_stage,
            gamemode: d.start_mode.as_str().to_string(),
            speed: DEFAULT_SPEED,
            platformer: d.platformer,
            fall_limit: d.fall_limit,
        }
    }
}

impl SettingsFile {
    fn resolve(&self) -> Result<LevelSettings, LevelError> {
        let start_mode =
            ModeTag::parse(&self.gamemode).ok_or_else(|| LevelError::UnknownMode(self.gamemode.clone()))?;
        if !self.speed.is_finite() || self.speed < 0.0 {
            return Err(LevelError::InvalidField {
                kind: "settings".to_string(),
                field: "speed",
                reason: format!("{} is not a non-negative number", self.speed),
            });
        }
        if !self.fall_limit.is_finite() {
            return Err(LevelError::InvalidField {
                kind: "settings".to_string(),
                field: "fall_limit",
                reason: "must be finite".to_string(),
            });
        }
        Ok(LevelSettings {
            start_mode,
            forward_speed: self.speed * 0.01,
            platformer: self.platformer,
            fall_limit: self.fall_limit,
            color_bg: self.colorbg,
            color_stage: self.colorstage,
        })
    }
}

/// One serialized placement: a registry path plus kind-specific data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectFile {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: ObjectData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectData {
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    #[serde(
        default,
        rename = "needsTouch",
        skip_serializing_if = "Option::is_none"
    )]
    pub needs_touch: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gravity: Option<i8>,
}
