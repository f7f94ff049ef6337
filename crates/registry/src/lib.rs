pub mod capture;
pub mod cleanup;
pub mod errors;
pub mod metrics;
pub mod model;
pub mod scenario;
pub mod session;

pub use cleanup::CleanupCoordinator;
pub use model::{
    CommandEntry, ConsoleEntry, NetworkEntry, PageErrorEntry, ScenarioLink, ScreenshotMeta,
    Session, SessionFlags, SessionSummary,
};
pub use scenario::{
    ScenarioEvent, ScenarioMeta, ScenarioPhase, ScenarioRegistry, ScenarioSummary, StateUpdate,
    TestScenario,
};
pub use session::{SessionFilter, SessionRegistry, SessionSpec};
