pub mod completion;
pub mod events;
pub mod geometry;
pub mod simulation;

pub use completion::{CompletionRecord, CompletionReport, RecordError, progress_percentage};
pub use events::{BodyFrame, ModeTag, ObstacleFrame, SimEvent, StageColors};
pub use geometry::Rect;
pub use simulation::{InputFrame, PersistenceSink, RenderSink, Simulation};

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::completion::CompletionReport;
    use crate::events::{BodyFrame, ObstacleFrame, SimEvent, StageColors};
    use crate::geometry::Rect;
    use crate::simulation::{InputFrame, PersistenceSink, RenderSink, Simulation};

    /// Render sink that keeps everything it was given.
    #[derive(Debug, Default)]
    pub struct RecordingRenderSink {
        pub frames: Vec<(u64, Vec<BodyFrame>, Vec<ObstacleFrame>)>,
        /// Colors passed with each frame, parallel to `frames`.
        pub colors: Vec<StageColors>,
        pub debug_rects: Vec<Rect>,
    }

    impl RenderSink for RecordingRenderSink {
        fn frame(
            &mut self,
            tick: u64,
            bodies: &[BodyFrame],
            obstacles: &[ObstacleFrame],
            colors: &StageColors,
        ) {
            self.frames.push((tick, bodies.to_vec(), obstacles.to_vec()));
            self.colors.push(*colors);
        }

        fn debug_rects(&mut self, rects: &[Rect]) {
            self.debug_rects.extend_from_slice(rects);
        }
    }

    /// Persistence sink that keeps every report.
    #[derive(Debug, Default)]
    pub struct RecordingPersistenceSink {
        pub reports: Vec<CompletionReport>,
    }

    impl PersistenceSink for RecordingPersistenceSink {
        fn report(&mut self, report: &CompletionReport) {
            self.reports.push(report.clone());
        }
    }

    /// Run `n` ticks with a fixed input, returning all accumulated events.
    pub fn run_ticks(sim: &mut dyn Simulation, n: usize, input: InputFrame) -> Vec<SimEvent> {
        let mut all_events = Vec::new();
        for _ in 0..n {
            all_events.extend(sim.tick(&input));
        }
        all_events
    }

    /// Run ticks until `pred` holds for an emitted event or `max_ticks` pass.
    /// Returns the tick count at which the event was seen.
    pub fn run_until(
        sim: &mut dyn Simulation,
        max_ticks: usize,
        input: InputFrame,
        mut pred: impl FnMut(&SimEvent) -> bool,
    ) -> Option<u64> {
        for _ in 0..max_ticks {
            let events = sim.tick(&input);
            if events.iter().any(&mut pred) {
                return Some(sim.tick_count());
            }
        }
        None
    }

    // ================================================================
    // Simulation Trait Contract Tests
    // ================================================================
    // Every Simulation implementation must pass these. Crates call them
    // from their own #[cfg(test)] modules with a concrete instance.

    /// tick() must advance the tick counter by exactly one.
    pub fn contract_tick_advances_counter(sim: &mut dyn Simulation) {
        let before = sim.tick_count();
        sim.tick(&InputFrame::RELEASED);
        assert_eq!(
            sim.tick_count(),
            before + 1,
            "tick() must advance tick_count by one"
        );
    }

    /// A fresh simulation must expose at least one body and a non-empty state blob.
    pub fn contract_initial_state_observable(sim: &dyn Simulation) {
        assert!(
            !sim.bodies().is_empty(),
            "a fresh simulation must have a live body"
        );
        assert!(
            !sim.serialize_state().is_empty(),
            "serialize_state() must return non-empty bytes"
        );
    }

    /// Identical input sequences on identical simulations give identical state.
    pub fn contract_deterministic(
        a: &mut dyn Simulation,
        b: &mut dyn Simulation,
        inputs: &[InputFrame],
    ) {
        for input in inputs {
            let ea = a.tick(input);
            let eb = b.tick(input);
            assert_eq!(ea, eb, "same input must produce the same events");
        }
        assert_eq!(
            a.serialize_state(),
            b.serialize_state(),
            "same input history must produce the same state"
        );
    }

    /// Once complete, further ticks must not move any body.
    pub fn contract_complete_is_frozen(sim: &mut dyn Simulation) {
        assert!(sim.is_complete(), "precondition: simulation must be complete");
        let before = sim.bodies();
        sim.tick(&InputFrame::PRESSED);
        assert_eq!(before, sim.bodies(), "bodies must not move once complete");
    }
}
