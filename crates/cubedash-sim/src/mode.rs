//! Movement modes. Each variant decides gravity integration, input response,
//! rotation feedback, ceiling response and hit-box shape for the body that
//! carries it.

use serde::{Deserialize, Serialize};

use cubedash_core::{ModeTag, Rect};

use crate::body::{Body, PendingImpulse};
use crate::config::PhysicsConfig;
use crate::level::OrbKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Cube,
    Ship,
    /// `flip_latched` is set after a flip and cleared once the ball is
    /// airborne, so one ground contact gives at most one flip.
    Ball { flip_latched: bool },
    Wave,
}

impl Mode {
    pub fn from_tag(tag: ModeTag) -> Self {
        match tag {
            ModeTag::Cube => Mode::Cube,
            ModeTag::Ship => Mode::Ship,
            ModeTag::Ball => Mode::Ball {
                flip_latched: false,
            },
            ModeTag::Wave => Mode::Wave,
        }
    }

    pub fn tag(&self) -> ModeTag {
        match self {
            Mode::Cube => ModeTag::Cube,
            Mode::Ship => ModeTag::Ship,
            Mode::Ball { .. } => ModeTag::Ball,
            Mode::Wave => ModeTag::Wave,
        }
    }

    /// Hit-box for a body at `(x, y)`.
    pub fn hit_box(&self, x: f32, y: f32) -> Rect {
        let tile = Rect::tile(x, y);
        match self {
            Mode::Ship | Mode::Wave => tile.relative(0.0, 0.1, 1.0, 0.8),
            Mode::Cube | Mode::Ball { .. } => tile,
        }
    }
}

pub fn integrate_gravity(body: &mut Body, dt: f32, physics: &PhysicsConfig) {
    match body.mode {
        Mode::Ship | Mode::Wave => {},
        Mode::Cube | Mode::Ball { .. } => {
            body.vy -= physics.gravity * body.g() * dt;
        },
    }
}

/// Per-sub-step mode response. Consumes `ground_height` and the pending
/// impulse. Returns the index of the orb whose impulse fired, if any.
pub fn on_tick(
    body: &mut Body,
    dt: f32,
    pressing: bool,
    physics: &PhysicsConfig,
) -> Option<usize> {
    let grounded = settle(body, physics);
    let pending = body.pending.take();
    let g = body.g();
    let mut fired = None;

    match body.mode {
        Mode::Cube => {
            if grounded {
                body.rotation = snap_rotation(body.rotation);
            } else {
                body.rotation += 5.0 * dt * g;
            }
            if pressing {
                if let Some(p) = pending {
                    fired = Some(fire(body, p, physics));
                } else if grounded {
                    body.vy = physics.jump_velocity * g;
                }
            }
        },
        Mode::Ship => {
            body.rotation = body.vy * -100.0;
            if pressing {
                if let Some(p) = pending {
                    fired = Some(fire(body, p, physics));
                } else {
                    body.vy += physics.ship_thrust * g * dt;
                }
            } else {
                body.vy -= physics.ship_thrust * g * dt;
            }
        },
        Mode::Ball { flip_latched } => {
            body.rotation += 10.0 * dt * g;
            let mut latched = flip_latched && grounded;
            if pressing {
                if let Some(p) = pending {
                    fired = Some(fire(body, p, physics));
                } else if grounded && !latched {
                    body.flip_gravity();
                    latched = true;
                }
            }
            body.mode = Mode::Ball {
                flip_latched: latched,
            };
        },
        Mode::Wave => {
            body.rotation = body.vy * -450.0;
            let dir = if pressing { 1.0 } else { -1.0 };
            body.vy = dir * physics.wave_speed * g;
        },
    }

    fired
}

/// Ceiling contact. `flush_y` is the body y that puts the hit-box against
/// the ceiling. Returns true if the contact is lethal.
pub fn on_ceiling_hit(
    body: &mut Body,
    flush_y: f32,
    platformer: bool,
    physics: &PhysicsConfig,
) -> bool {
    match body.mode {
        Mode::Cube | Mode::Ball { .. } => {
            if !platformer {
                return true;
            }
            body.y = flush_y;
            body.vy = 0.0;
            false
        },
        Mode::Ship | Mode::Wave => {
            body.y = flush_y;
            body.vy = -physics.ceiling_bounce_velocity * body.g();
            false
        },
    }
}

pub fn exceeds_fall_limit(body: &Body, fall_limit: f32) -> bool {
    body.y > fall_limit
}

/// Apply an orb impulse. Returns the orb index.
pub fn fire(body: &mut Body, pending: PendingImpulse, physics: &PhysicsConfig) -> usize {
    match pending.kind {
        OrbKind::Jump => body.vy = physics.jump_velocity * body.g(),
        OrbKind::Black => body.vy += -physics.black_orb_impulse * body.g(),
        OrbKind::Gravity => {
            body.flip_gravity();
            body.vy = -physics.gravity_flip_velocity * body.g();
        },
    }
    pending.source
}

/// Move toward the registered ground surface, at most one snap step.
/// Returns whether the body is grounded this sub-step.
fn settle(body: &mut Body, physics: &PhysicsConfig) -> bool {
    let Some(target) = body.ground_height.take() else {
        return false;
    };
    let step = physics.ground_snap_per_step;
    body.y += (target - body.y).clamp(-step, step);
    if body.gravity > 0 {
        if body.vy < 0.0 {
            body.vy = 0.0;
        }
    } else if body.vy > 0.0 {
        body.vy = 0.0;
    }
    true
}

/// Nearest multiple of 90 degrees.
fn snap_rotation(rotation: f32) -> f32 {
    ((rotation - 45.0) / 90.0).floor() * 90.0 + 90.0
}
