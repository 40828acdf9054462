use serde::{Deserialize, Serialize};

use crate::completion::{CompletionRecord, CompletionReport};
use crate::events::{BodyFrame, ObstacleFrame, SimEvent, StageColors};
use crate::geometry::Rect;

/// Input sampled once per tick before the stepper runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFrame {
    pub pressing: bool,
    /// Only read in platformer levels.
    pub left: bool,
    /// Only read in platformer levels.
    pub right: bool,
}

impl InputFrame {
    pub const RELEASED: InputFrame = InputFrame {
        pressing: false,
        left: false,
        right: false,
    };

    pub const PRESSED: InputFrame = InputFrame {
        pressing: true,
        left: false,
        right: false,
    };

    pub fn with_pressing(self, pressing: bool) -> Self {
        Self { pressing, ..self }
    }
}

/// Core trait shared by the single-body run and the branching explorer.
///
/// The caller owns the frame loop: it samples input, calls `tick`, and
/// forwards the returned events and frames to its sinks. Cancellation is
/// simply not calling `tick` again.
pub trait Simulation {
    /// Advance one outer tick.
    fn tick(&mut self, input: &InputFrame) -> Vec<SimEvent>;

    /// Number of outer ticks advanced so far.
    fn tick_count(&self) -> u64;

    /// Every live body, for the render sink.
    fn bodies(&self) -> Vec<BodyFrame>;

    /// Obstacle trip flags, for the render sink.
    fn obstacles(&self) -> Vec<ObstacleFrame>;

    /// Current background and stage colors, for the render sink.
    fn stage_colors(&self) -> StageColors;

    /// Full simulation state as MessagePack, for replay and render consumers.
    fn serialize_state(&self) -> Vec<u8>;

    /// Whether the simulation has reached a terminal state.
    fn is_complete(&self) -> bool;
}

/// Consumes per-tick observational output. Never feeds back into the core.
pub trait RenderSink {
    fn frame(
        &mut self,
        tick: u64,
        bodies: &[BodyFrame],
        obstacles: &[ObstacleFrame],
        colors: &StageColors,
    );

    /// Collision rects for a debug overlay. Only valid rects are passed.
    fn debug_rects(&mut self, _rects: &[Rect]) {}
}

/// Receives completion data on death and on win.
pub trait PersistenceSink {
    fn report(&mut self, report: &CompletionReport);
}

/// A completion record can persist its own reports in memory.
impl PersistenceSink for CompletionRecord {
    fn report(&mut self, report: &CompletionReport) {
        self.record_progress(report.percentage);
        if report.won {
            self.merge_coins(&report.coins);
        }
    }
}

/// Forward every `SimEvent::Report` in `events` to `sink`.
pub fn forward_reports(events: &[SimEvent], sink: &mut dyn PersistenceSink) -> usize {
    let mut sent = 0;
    for event in events {
        if let SimEvent::Report(report) = event {
            sink.report(report);
            sent += 1;
        }
    }
    sent
}

/// Push the current frame of `sim` into `sink`.
pub fn render_frame(sim: &dyn Simulation, sink: &mut dyn RenderSink) {
    sink.frame(
        sim.tick_count(),
        &sim.bodies(),
        &sim.obstacles(),
        &sim.stage_colors(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_sink_only_merges_coins_on_win() {
        let mut rec = CompletionRecord::with_coin_count(2);
        rec.report(&CompletionReport {
            percentage: 30,
            coins: vec![true, false],
            won: false,
        });
        assert_eq!(rec.percentage, 30);
        assert_eq!(rec.coins, vec![false, false]);

        rec.report(&CompletionReport {
            percentage: 100,
            coins: vec![false, true],
            won: true,
        });
        assert_eq!(rec.percentage, 100);
        assert_eq!(rec.coins, vec![false, true]);
    }

    #[test]
    fn forward_reports_skips_other_events() {
        let events = vec![
            SimEvent::CoinCollected { index: 0 },
            SimEvent::Report(CompletionReport {
                percentage: 12,
                coins: vec![],
                won: false,
            }),
            SimEvent::Respawned { attempt: 2 },
        ];
        let mut rec = CompletionRecord::default();
        assert_eq!(forward_reports(&events, &mut rec), 1);
        assert_eq!(rec.percentage, 12);
    }
}
