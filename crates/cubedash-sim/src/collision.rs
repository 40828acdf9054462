//! Per-obstacle contact rules, applied against a body's hit-box once per
//! sub-step.

use cubedash_core::{Rect, SimEvent};

use crate::body::{Body, PendingImpulse};
use crate::level::{ObstacleClass, ObstacleKind, PadKind, TriggerAction, TriggerCondition};
use crate::mode;
use crate::stage::COIN_FADE_TICKS;
use crate::stepper::SimContext;

type ResolveFn = fn(&mut SimContext<'_>, &mut Body, usize, Rect);

/// Contact handler for one obstacle class.
pub struct ContactRule {
    pub class: ObstacleClass,
    pub name: &'static str,
    resolve: ResolveFn,
}

impl std::fmt::Debug for ContactRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContactRule")
            .field("class", &self.class)
            .field("name", &self.name)
            .finish()
    }
}

static CONTACT_RULES: &[ContactRule] = &[
    ContactRule {
        class: ObstacleClass::Block,
        name: "block",
        resolve: block,
    },
    ContactRule {
        class: ObstacleClass::Hazard,
        name: "hazard",
        resolve: hazard,
    },
    ContactRule {
        class: ObstacleClass::Orb,
        name: "orb",
        resolve: orb,
    },
    ContactRule {
        class: ObstacleClass::Pad,
        name: "pad",
        resolve: pad,
    },
    ContactRule {
        class: ObstacleClass::ModePortal,
        name: "mode-portal",
        resolve: mode_portal,
    },
    ContactRule {
        class: ObstacleClass::GravityPortal,
        name: "gravity-portal",
        resolve: gravity_portal,
    },
    ContactRule {
        class: ObstacleClass::Trigger,
        name: "trigger",
        resolve: trigger,
    },
    ContactRule {
        class: ObstacleClass::Coin,
        name: "coin",
        resolve: coin,
    },
    ContactRule {
        class: ObstacleClass::Marker,
        name: "marker",
        resolve: marker,
    },
];

pub fn rule_for(class: ObstacleClass) -> Option<&'static ContactRule> {
    CONTACT_RULES.iter().find(|r| r.class == class)
}

/// Run every in-range obstacle's contact rule against `body`. Stops at the
/// first lethal contact.
pub fn resolve(ctx: &mut SimContext<'_>, body: &mut Body) {
    let level = ctx.level;
    for index in level.nearby(body.x, ctx.physics.cull_distance) {
        let Some(rect) = level.rect(index) else {
            continue;
        };
        let Some(rule) = rule_for(level.obstacles()[index].kind.class()) else {
            continue;
        };
        (rule.resolve)(ctx, body, index, rect);
        if !body.alive {
            return;
        }
    }
}

fn kill(body: &mut Body) {
    body.alive = false;
}

fn block(ctx: &mut SimContext<'_>, body: &mut Body, _index: usize, rect: Rect) {
    let hit = body.hit_box();
    if !hit.overlaps(&rect) {
        return;
    }

    let m = ctx.physics.collide_margin;
    let collide = hit.relative(0.0, m, 1.0, 1.0 - 2.0 * m);
    let sides = hit.relative(0.0, 0.4, 1.0, 0.2);
    let up = body.gravity > 0;

    let ceiling = if collide.overlaps(&rect) {
        if sides.overlaps(&rect) {
            side_hit(ctx, body, hit, rect);
            return;
        }
        if up {
            rect.top() > hit.top()
        } else {
            rect.y < hit.y
        }
    } else if up {
        rect.center_y() > hit.center_y()
    } else {
        rect.center_y() < hit.center_y()
    };

    if ceiling {
        let flush_y = if up {
            body.y + (rect.y - hit.top())
        } else {
            body.y + (rect.top() - hit.y)
        };
        if mode::on_ceiling_hit(body, flush_y, ctx.level.settings.platformer, ctx.physics) {
            kill(body);
        }
    } else {
        let ground = if up {
            body.y + (rect.top() - hit.y)
        } else {
            body.y + (rect.y - hit.top())
        };
        // Rest on whichever surface holds the body furthest from its fall.
        body.ground_height = Some(match body.ground_height {
            Some(prev) if up => prev.max(ground),
            Some(prev) => prev.min(ground),
            None => ground,
        });
    }
}

fn side_hit(ctx: &mut SimContext<'_>, body: &mut Body, hit: Rect, rect: Rect) {
    if !ctx.level.settings.platformer {
        kill(body);
        return;
    }
    if hit.center_x() < rect.center_x() {
        body.x -= hit.right() - rect.x;
    } else {
        body.x += rect.right() - hit.x;
    }
}

fn hazard(_ctx: &mut SimContext<'_>, body: &mut Body, _index: usize, rect: Rect) {
    if body.hit_box().overlaps(&rect) {
        kill(body);
    }
}

fn orb(ctx: &mut SimContext<'_>, body: &mut Body, index: usize, rect: Rect) {
    if ctx.stage.trips[index].timeout > 0.0 || !body.hit_box().overlaps(&rect) {
        return;
    }
    if let ObstacleKind::Orb(kind) = ctx.level.obstacles()[index].kind {
        body.pending = Some(PendingImpulse {
            source: index,
            kind,
        });
    }
}

fn pad(ctx: &mut SimContext<'_>, body: &mut Body, index: usize, rect: Rect) {
    if ctx.stage.trips[index].timeout > 0.0 || !body.hit_box().overlaps(&rect) {
        return;
    }
    let ob = &ctx.level.obstacles()[index];
    let ObstacleKind::Pad(kind) = ob.kind else {
        return;
    };
    let physics = ctx.physics;
    match kind {
        PadKind::Jump => body.vy = physics.jump_velocity * body.g(),
        PadKind::SmallJump => body.vy = physics.small_jump_velocity * body.g(),
        PadKind::Gravity => {
            if ob.rotation == 0.0 {
                body.gravity = -1;
            } else if ob.rotation == 180.0 {
                body.gravity = 1;
            } else {
                body.flip_gravity();
            }
            body.vy = -physics.gravity_flip_velocity * body.g();
        },
    }
    ctx.stage.trips[index].timeout = physics.pad_timeout;
}

fn mode_portal(ctx: &mut SimContext<'_>, body: &mut Body, index: usize, rect: Rect) {
    if !body.hit_box().overlaps(&rect) {
        return;
    }
    if let ObstacleKind::ModePortal(tag) = ctx.level.obstacles()[index].kind {
        if body.set_mode(tag) {
            tracing::debug!(mode = tag.as_str(), x = body.x, "Mode changed");
            ctx.events.push(SimEvent::ModeChanged { mode: tag });
        }
    }
}

fn gravity_portal(ctx: &mut SimContext<'_>, body: &mut Body, index: usize, rect: Rect) {
    if !body.hit_box().overlaps(&rect) {
        return;
    }
    if let ObstacleKind::GravityPortal { sign } = ctx.level.obstacles()[index].kind {
        body.gravity = sign;
    }
}

fn trigger(ctx: &mut SimContext<'_>, body: &mut Body, index: usize, rect: Rect) {
    if ctx.stage.trips[index].activated {
        return;
    }
    let ObstacleKind::Trigger { condition, action } = ctx.level.obstacles()[index].kind else {
        return;
    };
    let hit = body.hit_box();
    let fired = match condition {
        TriggerCondition::Touch => hit.overlaps(&rect),
        TriggerCondition::Pass => hit.center_x() > rect.center_x(),
    };
    if !fired {
        return;
    }

    ctx.stage.trips[index].activated = true;
    match action {
        TriggerAction::Color {
            section,
            color,
            duration,
        } => ctx.stage.palette.retarget(section, color, duration),
        TriggerAction::Gravity { sign } => body.gravity = sign,
    }
    tracing::debug!(index, x = body.x, "Trigger fired");
    ctx.events.push(SimEvent::TriggerFired { index });
}

fn coin(ctx: &mut SimContext<'_>, body: &mut Body, index: usize, rect: Rect) {
    let trip = &mut ctx.stage.trips[index];
    if trip.collected || !body.hit_box().overlaps(&rect) {
        return;
    }
    trip.collected = true;
    trip.collect_fade = COIN_FADE_TICKS;
    if let ObstacleKind::Coin { index: coin } = ctx.level.obstacles()[index].kind {
        ctx.events.push(SimEvent::CoinCollected { index: coin });
    }
}

fn marker(_ctx: &mut SimContext<'_>, _body: &mut Body, _index: usize, _rect: Rect) {}
