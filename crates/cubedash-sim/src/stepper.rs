use cubedash_core::{InputFrame, SimEvent};

use crate::body::Body;
use crate::collision;
use crate::config::PhysicsConfig;
use crate::level::{Level, LevelSettings};
use crate::mode;
use crate::stage::StageState;

/// Upper bound on sub-steps per tick, reached only by runaway velocities.
pub const MAX_SUBSTEPS: u32 = 1024;

/// Everything a body needs from the world to advance one tick. Each branch
/// of the explorer builds its own context over its own stage state.
pub struct SimContext<'a> {
    pub level: &'a Level,
    pub physics: &'a PhysicsConfig,
    pub stage: &'a mut StageState,
    pub input: InputFrame,
    pub events: &'a mut Vec<SimEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Alive,
    Died,
    Won,
}

/// Sub-steps for one tick at vertical speed `vy`.
pub fn substep_count(vy: f32, per_unit_velocity: f32) -> u32 {
    let n = (vy.abs() * per_unit_velocity).ceil();
    if n.is_nan() {
        return 1;
    }
    (n as u32).saturating_add(1).min(MAX_SUBSTEPS)
}

/// Horizontal speed in tiles per tick.
fn horizontal_speed(settings: &LevelSettings, input: InputFrame) -> f32 {
    if settings.platformer && input.left && !input.right {
        -settings.forward_speed
    } else {
        settings.forward_speed
    }
}

/// Advance `body` by one outer tick. Stops at the first sub-step that kills
/// the body or carries it past the end of the stage.
pub fn step_body(ctx: &mut SimContext<'_>, body: &mut Body) -> StepOutcome {
    let level = ctx.level;
    let n = substep_count(body.vy, ctx.physics.substeps_per_unit_velocity);
    let dt = 1.0 / n as f32;
    let dx = horizontal_speed(&level.settings, ctx.input);

    for _ in 0..n {
        body.x += dx * dt;
        ctx.stage.advance(dt);
        mode::integrate_gravity(body, dt, ctx.physics);
        body.y += body.vy * dt;

        // The stage floor. Only solid ground under standard gravity.
        if body.y < 0.0 {
            body.y = 0.0;
            if body.gravity > 0 {
                body.ground_height = Some(0.0);
            } else if body.vy < 0.0 {
                body.vy = 0.0;
            }
        }

        if mode::exceeds_fall_limit(body, level.settings.fall_limit) {
            body.alive = false;
            return StepOutcome::Died;
        }

        collision::resolve(ctx, body);
        if !body.alive {
            return StepOutcome::Died;
        }

        if let Some(orb) = mode::on_tick(body, dt, ctx.input.pressing, ctx.physics) {
            ctx.stage.trips[orb].timeout = ctx.physics.orb_timeout;
        }

        if body.x > level.stage_width() {
            return StepOutcome::Won;
        }
    }

    StepOutcome::Alive
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubedash_core::ModeTag;

    use crate::level::{BlockShape, Obstacle, ObstacleKind, OrbKind, SpikeShape};

    struct Harness {
        level: Level,
        physics: PhysicsConfig,
        stage: StageState,
        events: Vec<SimEvent>,
    }

    impl Harness {
        fn new(level: Level) -> Self {
            let stage = StageState::new(&level);
            Self {
                level,
                physics: PhysicsConfig::default(),
                stage,
                events: Vec::new(),
            }
        }

        fn step(&mut self, body: &mut Body, input: InputFrame) -> StepOutcome {
            let mut ctx = SimContext {
                level: &self.level,
                physics: &self.physics,
                stage: &mut self.stage,
                input,
                events: &mut self.events,
            };
            step_body(&mut ctx, body)
        }
    }

    /// A long level whose only obstacle is far off to the right.
    fn open_level() -> Level {
        Level::new(
            crate::level::LevelSettings::default(),
            vec![Obstacle::new(ObstacleKind::StartPos, 500.0, 0.0)],
        )
    }

    fn level_with(obstacles: Vec<Obstacle>) -> Level {
        let mut obstacles = obstacles;
        obstacles.push(Obstacle::new(ObstacleKind::StartPos, 500.0, 0.0));
        Level::new(crate::level::LevelSettings::default(), obstacles)
    }

    #[test]
    fn substeps_grow_with_speed() {
        assert_eq!(substep_count(0.0, 4.0), 1);
        assert_eq!(substep_count(0.34, 4.0), 3);
        assert_eq!(substep_count(-2.0, 4.0), 9);
        assert_eq!(substep_count(f32::NAN, 4.0), 1);
        assert_eq!(substep_count(f32::INFINITY, 4.0), MAX_SUBSTEPS);
    }

    #[test]
    fn flat_floor_ten_ticks() {
        let mut h = Harness::new(open_level());
        let mut body = Body::new(0.0, 0.0, ModeTag::Cube);
        for _ in 0..10 {
            assert_eq!(h.step(&mut body, InputFrame::RELEASED), StepOutcome::Alive);
        }
        assert_eq!(body.y, 0.0);
        assert_eq!(body.vy, 0.0);
        assert!((body.x - 1.0).abs() < 1e-5, "x = {}", body.x);
    }

    #[test]
    fn jump_then_gravity_per_tick() {
        let mut h = Harness::new(open_level());
        let mut body = Body::new(0.0, 0.0, ModeTag::Cube);

        h.step(&mut body, InputFrame::PRESSED);
        assert!((body.vy - 0.34).abs() < 1e-6, "vy = {}", body.vy);

        let mut expected = 0.34;
        for _ in 0..100 {
            h.step(&mut body, InputFrame::PRESSED);
            if body.y == 0.0 {
                break;
            }
            expected -= 0.028;
            assert!(
                (body.vy - expected).abs() < 1e-4,
                "vy = {}, expected {expected}",
                body.vy
            );
        }
        assert!(expected < 0.0, "body came back down");
    }

    #[test]
    fn hazard_kills_within_tick() {
        let spike = Obstacle::new(ObstacleKind::Hazard(SpikeShape::Full), 0.5, 0.0);
        let mut h = Harness::new(level_with(vec![spike]));
        let mut body = Body::new(0.0, 0.0, ModeTag::Cube);
        assert_eq!(h.step(&mut body, InputFrame::RELEASED), StepOutcome::Died);
        assert!(!body.alive);
    }

    #[test]
    fn fast_body_does_not_tunnel_through_block() {
        // A one-tile ceiling two tiles up. At vy = 2 a single step would
        // jump straight over it.
        let blocks = (-1..=2)
            .map(|i| Obstacle::new(ObstacleKind::Block(BlockShape::Full), i as f32, 2.0))
            .collect();
        let mut h = Harness::new(level_with(blocks));
        let mut body = Body::new(0.0, 0.0, ModeTag::Cube);
        body.vy = 2.0;
        assert_eq!(h.step(&mut body, InputFrame::RELEASED), StepOutcome::Died);
        assert!(body.y < 3.0, "stopped at the block, y = {}", body.y);
    }

    #[test]
    fn crossing_stage_width_wins() {
        let level = Level::new(
            crate::level::LevelSettings::default(),
            vec![Obstacle::new(ObstacleKind::Block(BlockShape::Full), 0.0, 5.0)],
        );
        assert_eq!(level.stage_width(), 5.0);
        let mut h = Harness::new(level);
        let mut body = Body::new(4.95, 0.0, ModeTag::Cube);
        assert_eq!(h.step(&mut body, InputFrame::RELEASED), StepOutcome::Won);
    }

    #[test]
    fn fall_limit_kills() {
        let mut h = Harness::new(open_level());
        let mut body = Body::new(0.0, 39.95, ModeTag::Ship);
        body.vy = 0.1;
        assert_eq!(h.step(&mut body, InputFrame::PRESSED), StepOutcome::Died);
    }

    #[test]
    fn inverted_gravity_floor_is_not_ground() {
        let mut h = Harness::new(open_level());
        let mut body = Body::new(0.0, 0.0, ModeTag::Cube);
        body.gravity = -1;
        body.vy = -0.2;
        h.step(&mut body, InputFrame::PRESSED);
        assert!(body.y >= 0.0 && body.y < 0.05, "y = {}", body.y);
        assert!(body.vy >= 0.0);
        assert!(body.ground_height.is_none());
    }

    #[test]
    fn orb_fires_on_press_and_times_out() {
        let orb = Obstacle::new(ObstacleKind::Orb(OrbKind::Jump), 0.0, 1.5);
        let mut h = Harness::new(level_with(vec![orb]));
        let mut body = Body::new(0.0, 1.0, ModeTag::Cube);
        body.vy = 0.0;
        h.step(&mut body, InputFrame::PRESSED);
        assert!(body.vy > 0.3, "orb jump fired, vy = {}", body.vy);
        assert!(h.stage.trips[0].timeout > 0.0);
    }

    #[test]
    fn platformer_left_moves_back() {
        let settings = crate::level::LevelSettings {
            platformer: true,
            ..crate::level::LevelSettings::default()
        };
        let level = Level::new(settings, vec![Obstacle::new(ObstacleKind::StartPos, 500.0, 0.0)]);
        let mut h = Harness::new(level);
        let mut body = Body::new(5.0, 0.0, ModeTag::Cube);
        let left = InputFrame {
            left: true,
            ..InputFrame::RELEASED
        };
        h.step(&mut body, left);
        assert!((body.x - 4.9).abs() < 1e-5);

        let both = InputFrame {
            left: true,
            right: true,
            ..InputFrame::RELEASED
        };
        h.step(&mut body, both);
        assert!((body.x - 5.0).abs() < 1e-5);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn substeps_cover_velocity(vy in -20.0f32..20.0) {
                let n = substep_count(vy, 4.0);
                prop_assert!(n as f32 >= vy.abs() * 4.0);
            }

            #[test]
            fn forward_progress_is_monotonic(presses in proptest::collection::vec(any::<bool>(), 1..200)) {
                let obstacles = vec![
                    Obstacle::new(ObstacleKind::Block(BlockShape::Full), 6.0, 0.0),
                    Obstacle::new(ObstacleKind::Block(BlockShape::Half), 9.0, 1.0),
                    Obstacle::new(ObstacleKind::Orb(OrbKind::Gravity), 12.0, 2.0),
                    Obstacle::new(ObstacleKind::Pad(crate::level::PadKind::Jump), 14.0, 0.0),
                ];
                let mut h = Harness::new(level_with(obstacles));
                let mut body = Body::new(0.0, 0.0, ModeTag::Cube);
                for pressing in presses {
                    let before = body.x;
                    let outcome = h.step(&mut body, InputFrame::RELEASED.with_pressing(pressing));
                    prop_assert!(body.x >= before);
                    if outcome != StepOutcome::Alive {
                        break;
                    }
                }
            }
        }
    }
}
