//! Branching explorer: advances every press/release history of a level at
//! once, merging branches whose states have converged.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use cubedash_core::{BodyFrame, InputFrame, ObstacleFrame, SimEvent, Simulation, StageColors};

use crate::body::Body;
use crate::config::{ExplorerConfig, SimConfig};
use crate::level::Level;
use crate::palette::Palette;
use crate::stage::StageState;
use crate::stepper::{SimContext, StepOutcome, step_body};

/// One candidate future. Owns its body and its own copy of the trip state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub body: Body,
    /// Press value this branch was forked with.
    pub pressing: bool,
    pub stage: StageState,
    /// Reached the end of the stage. Frozen from then on.
    pub won: bool,
}

impl Branch {
    fn fork(&self, pressing: bool) -> Branch {
        Branch {
            pressing,
            ..self.clone()
        }
    }

    /// Whether `self` and `other` have reconverged within tolerance.
    pub fn equivalent(&self, other: &Branch, config: &ExplorerConfig) -> bool {
        let tag = self.body.mode.tag();
        if tag != other.body.mode.tag()
            || self.body.gravity != other.body.gravity
            || self.pressing != other.pressing
        {
            return false;
        }
        let threshold = config.threshold(tag);
        (self.body.y - other.body.y).abs() <= threshold.position
            && (self.body.vy - other.body.vy).abs() <= threshold.velocity
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorerSnapshot {
    pub tick: u64,
    pub won_at: Option<u64>,
    pub branches: Vec<Branch>,
}

pub struct Explorer {
    level: Level,
    config: SimConfig,
    branches: Vec<Branch>,
    tick: u64,
    rng: StdRng,
    /// Tick of the first win. Forking stops once set.
    won_at: Option<u64>,
}

impl Explorer {
    pub fn new(level: Level, config: SimConfig) -> Self {
        let (x, y) = level
            .start_pos()
            .unwrap_or((config.run.spawn_x, config.run.spawn_y));
        let root = Branch {
            body: Body::new(x, y, level.settings.start_mode),
            pressing: false,
            stage: StageState::new(&level),
            won: false,
        };
        let rng = StdRng::seed_from_u64(config.explorer.seed);
        Self {
            level,
            config,
            branches: vec![root],
            tick: 0,
            rng,
            won_at: None,
        }
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn population(&self) -> usize {
        self.branches.len()
    }

    pub fn won_at(&self) -> Option<u64> {
        self.won_at
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    fn fork_all(&mut self) {
        let parents = std::mem::take(&mut self.branches);
        let mut children = Vec::with_capacity(parents.len() * 2);
        for parent in parents {
            if parent.won {
                children.push(parent);
                continue;
            }
            children.push(parent.fork(false));
            children.push(parent.fork(true));
        }
        self.branches = children;
    }

    /// Step every live branch once. Each branch sees only its own state.
    fn advance_all(&mut self, input: &InputFrame, events: &mut Vec<SimEvent>) {
        let level = &self.level;
        let physics = &self.config.physics;
        let mut scratch = Vec::new();
        let mut won_now = false;

        self.branches.retain_mut(|branch| {
            if branch.won {
                return true;
            }
            let mut ctx = SimContext {
                level,
                physics,
                stage: &mut branch.stage,
                input: input.with_pressing(branch.pressing),
                events: &mut scratch,
            };
            let outcome = step_body(&mut ctx, &mut branch.body);
            scratch.clear();
            match outcome {
                StepOutcome::Alive => true,
                StepOutcome::Died => {
                    events.push(SimEvent::BranchDied {
                        x: branch.body.x,
                        y: branch.body.y,
                    });
                    false
                },
                StepOutcome::Won => {
                    branch.won = true;
                    won_now = true;
                    true
                },
            }
        });

        if won_now && self.won_at.is_none() {
            self.won_at = Some(self.tick);
            tracing::info!(
                level = %self.level.name,
                tick = self.tick,
                population = self.branches.len(),
                "Exploration reached the end of the stage"
            );
            events.push(SimEvent::ExplorationWon { tick: self.tick });
        }
    }

    /// Drop every branch equivalent to an earlier one. Returns how many
    /// were removed.
    fn collapse(&mut self) -> usize {
        let config = &self.config.explorer;
        let mut kept: Vec<Branch> = Vec::with_capacity(self.branches.len());
        let before = self.branches.len();
        for branch in self.branches.drain(..) {
            if branch.won || !kept.iter().any(|k| !k.won && k.equivalent(&branch, config)) {
                kept.push(branch);
            }
        }
        self.branches = kept;
        before - self.branches.len()
    }

    /// Evict random exploring branches until the population fits the cap.
    /// Won branches are never evicted.
    fn cap(&mut self, events: &mut Vec<SimEvent>) {
        let limit = self.config.explorer.population_cap.max(1);
        while self.branches.len() > limit {
            let exploring: Vec<usize> = self
                .branches
                .iter()
                .enumerate()
                .filter(|(_, b)| !b.won)
                .map(|(i, _)| i)
                .collect();
            if exploring.is_empty() {
                break;
            }
            let index = exploring[self.rng.random_range(0..exploring.len())];
            let evicted = self.branches.swap_remove(index);
            let burst = self.rng.random_bool(self.config.explorer.eviction_burst_chance.clamp(0.0, 1.0));
            events.push(SimEvent::BranchEvicted {
                x: evicted.body.x,
                y: evicted.body.y,
                burst,
            });
        }
    }

    pub fn snapshot(&self) -> ExplorerSnapshot {
        ExplorerSnapshot {
            tick: self.tick,
            won_at: self.won_at,
            branches: self.branches.clone(),
        }
    }
}

impl Simulation for Explorer {
    fn tick(&mut self, input: &InputFrame) -> Vec<SimEvent> {
        self.tick += 1;
        let mut events = Vec::new();
        if self.is_complete() {
            return events;
        }

        if self.won_at.is_none() {
            self.fork_all();
        }
        self.advance_all(input, &mut events);

        let removed = self.collapse();
        if removed > 0 {
            events.push(SimEvent::BranchesCollapsed { removed });
        }
        self.cap(&mut events);

        tracing::trace!(
            tick = self.tick,
            population = self.branches.len(),
            collapsed = removed,
            "Explorer tick"
        );
        events
    }

    fn tick_count(&self) -> u64 {
        self.tick
    }

    fn bodies(&self) -> Vec<BodyFrame> {
        self.branches.iter().map(|b| b.body.frame()).collect()
    }

    /// Trip state of the first branch, which is the oldest surviving line.
    fn obstacles(&self) -> Vec<ObstacleFrame> {
        self.branches
            .first()
            .map(|b| b.stage.frames(&self.level))
            .unwrap_or_default()
    }

    /// Colors of the first branch, like `obstacles`. The level's own colors
    /// once the population is empty.
    fn stage_colors(&self) -> StageColors {
        match self.branches.first() {
            Some(b) => b.stage.palette.colors(),
            None => Palette::new(&self.level.settings).colors(),
        }
    }

    fn serialize_state(&self) -> Vec<u8> {
        rmp_serde::to_vec(&self.snapshot()).expect("ExplorerSnapshot serialization should not fail")
    }

    /// Complete when no branch is left exploring.
    fn is_complete(&self) -> bool {
        self.branches.iter().all(|b| b.won)
    }
}
