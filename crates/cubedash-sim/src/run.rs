use serde::{Deserialize, Serialize};

use cubedash_core::{
    BodyFrame, CompletionRecord, CompletionReport, InputFrame, ObstacleFrame, PersistenceSink,
    Rect, SimEvent, Simulation, StageColors, progress_percentage,
};

use crate::body::Body;
use crate::config::SimConfig;
use crate::level::Level;
use crate::palette::Palette;
use crate::stage::StageState;
use crate::stepper::{SimContext, StepOutcome, step_body};

/// Lifecycle phase of a single-body run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Alive,
    Dead { respawn_at: u64 },
    /// Terminal until `restart`.
    Won,
}

/// Snapshot of a run for render and replay consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub tick: u64,
    pub attempt: u32,
    pub phase: Phase,
    pub body: Body,
    pub stage: StageState,
}

/// One body playing a level: death, respawn, win and completion reporting.
pub struct Run {
    level: Level,
    config: SimConfig,
    body: Body,
    stage: StageState,
    phase: Phase,
    tick: u64,
    attempt: u32,
    /// Completion as of the last report. Death reports carry its coin flags.
    record: CompletionRecord,
}

impl Run {
    pub fn new(level: Level, config: SimConfig) -> Self {
        let stage = StageState::new(&level);
        let record = level.completion.clone();
        let body = Body::new(0.0, 0.0, level.settings.start_mode);
        let mut run = Self {
            level,
            config,
            body,
            stage,
            phase: Phase::Alive,
            tick: 0,
            attempt: 1,
            record,
        };
        run.place_at_start();
        run
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn palette(&self) -> &Palette {
        &self.stage.palette
    }

    pub fn record(&self) -> &CompletionRecord {
        &self.record
    }

    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            tick: self.tick,
            attempt: self.attempt,
            phase: self.phase,
            body: self.body.clone(),
            stage: self.stage.clone(),
        }
    }

    /// Kill the body. A no-op unless the body is alive, so repeated calls
    /// never double-report or double-schedule.
    pub fn destroy(&mut self) -> Vec<SimEvent> {
        let mut events = Vec::new();
        self.destroy_into(&mut events);
        events
    }

    fn destroy_into(&mut self, events: &mut Vec<SimEvent>) {
        if self.phase != Phase::Alive {
            return;
        }
        self.body.alive = false;
        let respawn_at = self.tick + self.config.run.death_delay_ticks;
        self.phase = Phase::Dead { respawn_at };

        let percentage = progress_percentage(self.body.x, self.level.stage_width());
        tracing::debug!(
            attempt = self.attempt,
            percentage,
            x = self.body.x,
            y = self.body.y,
            respawn_at,
            "Body died"
        );

        let report = CompletionReport {
            percentage,
            coins: self.record.coins.clone(),
            won: false,
        };
        self.record.report(&report);

        events.push(SimEvent::Died {
            x: self.body.x,
            y: self.body.y,
            percentage,
        });
        events.push(SimEvent::RespawnScheduled { at_tick: respawn_at });
        events.push(SimEvent::Report(report));
    }

    fn win(&mut self, events: &mut Vec<SimEvent>) {
        self.phase = Phase::Won;
        let percentage = progress_percentage(self.body.x, self.level.stage_width());
        let report = CompletionReport {
            percentage,
            coins: self.stage.collected_coins(&self.level),
            won: true,
        };
        self.record.report(&report);

        tracing::info!(
            level = %self.level.name,
            attempt = self.attempt,
            tick = self.tick,
            "Level complete"
        );
        events.push(SimEvent::Won { percentage });
        events.push(SimEvent::Report(report));
    }

    fn respawn(&mut self, events: &mut Vec<SimEvent>) {
        self.body = Body::new(0.0, 0.0, self.level.settings.start_mode);
        self.place_at_start();
        self.stage.reset(&self.level);
        self.phase = Phase::Alive;
        self.attempt += 1;
        tracing::debug!(attempt = self.attempt, "Respawned");
        events.push(SimEvent::Respawned {
            attempt: self.attempt,
        });
    }

    fn place_at_start(&mut self) {
        let (x, y) = self
            .level
            .start_pos()
            .unwrap_or((self.config.run.spawn_x, self.config.run.spawn_y));
        self.body.x = x;
        self.body.y = y;
    }

    /// Start over from a fresh body with the attempt counter reset. The
    /// completion record is kept.
    pub fn restart(&mut self) {
        self.body = Body::new(0.0, 0.0, self.level.settings.start_mode);
        self.place_at_start();
        self.stage.reset(&self.level);
        self.phase = Phase::Alive;
        self.attempt = 1;
        tracing::debug!(level = %self.level.name, "Run restarted");
    }

    /// Collision rects near the body for a debug overlay, hit-box first.
    /// Non-finite rects are dropped.
    pub fn debug_rects(&self) -> Vec<Rect> {
        let mut rects = vec![self.body.hit_box()];
        rects.extend(
            self.level
                .nearby(self.body.x, self.config.physics.cull_distance)
                .filter_map(|i| self.level.rect(i)),
        );
        rects.retain(|r| {
            let valid = r.is_valid();
            if !valid {
                tracing::warn!(?r, "Dropping invalid debug rect");
            }
            valid
        });
        rects
    }
}

impl Simulation for Run {
    fn tick(&mut self, input: &InputFrame) -> Vec<SimEvent> {
        self.tick += 1;
        let mut events = Vec::new();

        match self.phase {
            Phase::Won => return events,
            Phase::Dead { respawn_at } => {
                if self.tick >= respawn_at {
                    self.respawn(&mut events);
                }
                return events;
            },
            Phase::Alive => {},
        }

        let mut ctx = SimContext {
            level: &self.level,
            physics: &self.config.physics,
            stage: &mut self.stage,
            input: *input,
            events: &mut events,
        };
        match step_body(&mut ctx, &mut self.body) {
            StepOutcome::Alive => {},
            StepOutcome::Died => self.destroy_into(&mut events),
            StepOutcome::Won => self.win(&mut events),
        }
        events
    }

    fn tick_count(&self) -> u64 {
        self.tick
    }

    fn bodies(&self) -> Vec<BodyFrame> {
        match self.phase {
            Phase::Dead { .. } => Vec::new(),
            Phase::Alive | Phase::Won => vec![self.body.frame()],
        }
    }

    fn obstacles(&self) -> Vec<ObstacleFrame> {
        self.stage.frames(&self.level)
    }

    fn stage_colors(&self) -> StageColors {
        self.stage.palette.colors()
    }

    fn serialize_state(&self) -> Vec<u8> {
        rmp_serde::to_vec(&self.snapshot()).expect("RunSnapshot serialization should not fail")
    }

    fn is_complete(&self) -> bool {
        self.phase == Phase::Won
    }
}
