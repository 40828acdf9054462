use serde::{Deserialize, Serialize};

use cubedash_core::ModeTag;

/// Gravity acceleration per tick squared.
pub const GRAVITY: f32 = 0.028;
/// Standard jump velocity (cube jump, jump orb, jump pad).
pub const JUMP_VELOCITY: f32 = 0.34;
/// Small jump pad velocity.
pub const SMALL_JUMP_VELOCITY: f32 = 0.22;
/// Black orb downward impulse magnitude.
pub const BLACK_ORB_IMPULSE: f32 = 0.7;
/// Velocity after a gravity orb or pad flips gravity.
pub const GRAVITY_FLIP_VELOCITY: f32 = 0.5;
/// Ship thrust per tick.
pub const SHIP_THRUST: f32 = 0.005;
/// Wave vertical speed magnitude.
pub const WAVE_SPEED: f32 = 0.1;
/// Sub-steps per unit of |vy|.
pub const SUBSTEPS_PER_UNIT_VELOCITY: f32 = 4.0;
/// Maximum distance the ground snap moves a body per sub-step.
pub const GROUND_SNAP_PER_STEP: f32 = 0.1;
/// Fraction of the hit-box height trimmed from top and bottom for block contact.
pub const COLLIDE_MARGIN: f32 = 0.2;
/// Obstacles farther than this horizontally are skipped.
pub const CULL_DISTANCE: f32 = 40.0;
/// Ticks an orb stays inert after firing.
pub const ORB_TIMEOUT: f32 = 10.0;
/// Ticks a pad stays inert after firing.
pub const PAD_TIMEOUT: f32 = 10.0;
/// Residual velocity after a ship or wave bounces off a ceiling.
pub const CEILING_BOUNCE_VELOCITY: f32 = 0.01;
/// Ticks between death and respawn.
pub const DEATH_DELAY_TICKS: u64 = 40;
/// Hard limit on explorer population.
pub const POPULATION_CAP: usize = 1000;

/// Movement and collision constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: f32,
    pub jump_velocity: f32,
    pub small_jump_velocity: f32,
    pub black_orb_impulse: f32,
    pub gravity_flip_velocity: f32,
    pub ship_thrust: f32,
    pub wave_speed: f32,
    pub substeps_per_unit_velocity: f32,
    pub ground_snap_per_step: f32,
    pub collide_margin: f32,
    pub cull_distance: f32,
    pub orb_timeout: f32,
    pub pad_timeout: f32,
    pub ceiling_bounce_velocity: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            jump_velocity: JUMP_VELOCITY,
            small_jump_velocity: SMALL_JUMP_VELOCITY,
            black_orb_impulse: BLACK_ORB_IMPULSE,
            gravity_flip_velocity: GRAVITY_FLIP_VELOCITY,
            ship_thrust: SHIP_THRUST,
            wave_speed: WAVE_SPEED,
            substeps_per_unit_velocity: SUBSTEPS_PER_UNIT_VELOCITY,
            ground_snap_per_step: GROUND_SNAP_PER_STEP,
            collide_margin: COLLIDE_MARGIN,
            cull_distance: CULL_DISTANCE,
            orb_timeout: ORB_TIMEOUT,
            pad_timeout: PAD_TIMEOUT,
            ceiling_bounce_velocity: CEILING_BOUNCE_VELOCITY,
        }
    }
}

/// Run lifecycle parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub death_delay_ticks: u64,
    /// Spawn point used when the level has no start-position marker.
    pub spawn_x: f32,
    pub spawn_y: f32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            death_delay_ticks: DEATH_DELAY_TICKS,
            spawn_x: 0.0,
            spawn_y: 0.0,
        }
    }
}

/// Collapse tolerances for one movement mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollapseThreshold {
    pub position: f32,
    pub velocity: f32,
}

impl CollapseThreshold {
    pub const fn new(position: f32, velocity: f32) -> Self {
        Self { position, velocity }
    }
}

impl Default for CollapseThreshold {
    fn default() -> Self {
        Self::new(0.03, 0.03)
    }
}

/// Branching explorer parameters. Tuned empirically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    pub population_cap: usize,
    /// Seed for eviction sampling, so runs are reproducible.
    pub seed: u64,
    /// Chance an evicted branch is shown exploding instead of vanishing.
    pub eviction_burst_chance: f64,
    pub cube: CollapseThreshold,
    pub ship: CollapseThreshold,
    pub ball: CollapseThreshold,
    pub wave: CollapseThreshold,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            population_cap: POPULATION_CAP,
            seed: 42,
            eviction_burst_chance: 0.05,
            cube: CollapseThreshold::new(0.03, 0.03),
            ship: CollapseThreshold::new(0.85, 0.015),
            ball: CollapseThreshold::default(),
            wave: CollapseThreshold::new(0.1, 0.03),
        }
    }
}

impl ExplorerConfig {
    pub fn threshold(&self, mode: ModeTag) -> CollapseThreshold {
        match mode {
            ModeTag::Cube => self.cube,
            ModeTag::Ship => self.ship,
            ModeTag::Ball => self.ball,
            ModeTag::Wave => self.wave,
        }
    }
}

/// Top-level simulator configuration, loadable from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub physics: PhysicsConfig,
    pub run: RunConfig,
    pub explorer: ExplorerConfig,
}

impl SimConfig {
    /// Load config from the file named by `CUBEDASH_CONFIG`, or
    /// `config/cubedash.toml`. Falls back to defaults if the file is missing
    /// or unparseable.
    pub fn load() -> Self {
        let path = std::env::var("CUBEDASH_CONFIG")
            .unwrap_or_else(|_| "config/cubedash.toml".to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse {path}: {e}, using defaults");
                SimConfig::default()
            }),
            Err(_) => SimConfig::default(),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let cfg = SimConfig::default();
        assert_eq!(cfg.physics.gravity, 0.028);
        assert_eq!(cfg.physics.jump_velocity, 0.34);
        assert_eq!(cfg.run.death_delay_ticks, 40);
        assert_eq!(cfg.explorer.population_cap, 1000);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let cfg = SimConfig::from_toml(
            r#"
            [physics]
            gravity = 0.05

            [explorer]
            population_cap = 64
            "#,
        )
        .unwrap();
        assert_eq!(cfg.physics.gravity, 0.05);
        assert_eq!(cfg.physics.wave_speed, WAVE_SPEED);
        assert_eq!(cfg.explorer.population_cap, 64);
        assert_eq!(cfg.explorer.ship, CollapseThreshold::new(0.85, 0.015));
    }

    #[test]
    fn per_mode_thresholds() {
        let cfg = ExplorerConfig::default();
        assert_eq!(cfg.threshold(ModeTag::Cube), CollapseThreshold::new(0.03, 0.03));
        assert_eq!(cfg.threshold(ModeTag::Ship), CollapseThreshold::new(0.85, 0.015));
        assert_eq!(cfg.threshold(ModeTag::Wave), CollapseThreshold::new(0.1, 0.03));
        assert_eq!(cfg.threshold(ModeTag::Ball), CollapseThreshold::new(0.03, 0.03));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let cfg = SimConfig::load_from("/nonexistent/cubedash.toml");
        assert_eq!(cfg, SimConfig::default());
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(SimConfig::from_toml("[physics\ngravity = ").is_err());
    }
}
