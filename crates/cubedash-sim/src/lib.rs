pub mod body;
pub mod collision;
pub mod config;
pub mod explorer;
pub mod level;
pub mod mode;
pub mod palette;
pub mod registry;
pub mod run;
pub mod stage;
pub mod stepper;

pub use body::{Body, PendingImpulse};
pub use config::{CollapseThreshold, ExplorerConfig, PhysicsConfig, RunConfig, SimConfig};
pub use explorer::{Branch, Explorer, ExplorerSnapshot};
pub use level::{Level, LevelError, LevelSettings, Obstacle, ObstacleKind};
pub use mode::Mode;
pub use run::{Phase, Run, RunSnapshot};
pub use stepper::{SimContext, StepOutcome, step_body};
