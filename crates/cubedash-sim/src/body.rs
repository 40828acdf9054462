use serde::{Deserialize, Serialize};

use cubedash_core::{BodyFrame, ModeTag, Rect};

use crate::level::OrbKind;
use crate::mode::Mode;

/// An orb impulse waiting for input. Installed by orb contact each
/// sub-step, consumed or cleared by the next mode tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingImpulse {
    /// Index of the orb that installed it.
    pub source: usize,
    pub kind: OrbKind,
}

/// The simulated player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub x: f32,
    pub y: f32,
    pub vy: f32,
    /// +1 falls toward y = 0, -1 falls upward.
    pub gravity: i8,
    /// Degrees, for rendering only.
    pub rotation: f32,
    pub mode: Mode,
    /// Body y that puts the hit-box flush on the surface registered this
    /// sub-step. Cleared by the mode tick.
    pub ground_height: Option<f32>,
    pub pending: Option<PendingImpulse>,
    pub alive: bool,
}

impl Body {
    pub fn new(x: f32, y: f32, mode: ModeTag) -> Self {
        Self {
            x,
            y,
            vy: 0.0,
            gravity: 1,
            rotation: 0.0,
            mode: Mode::from_tag(mode),
            ground_height: None,
            pending: None,
            alive: true,
        }
    }

    /// Gravity sign as a float multiplier.
    pub fn g(&self) -> f32 {
        f32::from(self.gravity)
    }

    pub fn flip_gravity(&mut self) {
        self.gravity = -self.gravity;
    }

    pub fn hit_box(&self) -> Rect {
        self.mode.hit_box(self.x, self.y)
    }

    /// Switch movement mode. Returns false if already in `tag`.
    pub fn set_mode(&mut self, tag: ModeTag) -> bool {
        if self.mode.tag() == tag {
            return false;
        }
        self.mode = Mode::from_tag(tag);
        true
    }

    pub fn frame(&self) -> BodyFrame {
        BodyFrame {
            x: self.x,
            y: self.y,
            rotation: self.rotation,
            gravity_sign: self.gravity,
            mode: self.mode.tag(),
        }
    }
}
