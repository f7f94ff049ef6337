use std::path::PathBuf;
use std::sync::Arc;

use webrig_core_types::{RigError, SessionId};
use webrig_page_driver::{DriverFactory, StubFactory};
use webrig_registry::{CleanupCoordinator, ScenarioRegistry, SessionRegistry};
use webrig_scheduler::SessionGate;

use crate::config::RigConfig;

/// Explicitly constructed application state passed to every tool handler.
///
/// Registries are owned here rather than living in process-wide singletons,
/// so tests build isolated instances and tear them down deterministically.
pub struct AppContext {
    pub config: RigConfig,
    pub sessions: Arc<SessionRegistry>,
    pub scenarios: Arc<ScenarioRegistry>,
    pub cleanup: CleanupCoordinator,
    pub gate: Arc<SessionGate>,
    pub factory: Arc<dyn DriverFactory>,
}

impl AppContext {
    pub fn new(config: RigConfig, factory: Arc<dyn DriverFactory>) -> Self {
        let sessions = Arc::new(SessionRegistry::new());
        let scenarios = Arc::new(ScenarioRegistry::new());
        let cleanup = CleanupCoordinator::new(Arc::clone(&sessions), Arc::clone(&scenarios));
        Self {
            config,
            sessions,
            scenarios,
            cleanup,
            gate: Arc::new(SessionGate::new()),
            factory,
        }
    }

    /// Context backed by the deterministic stub driver.
    pub fn with_stub(config: RigConfig) -> Self {
        Self::new(config, Arc::new(StubFactory))
    }

    pub fn session_dir(&self, session: &SessionId) -> PathBuf {
        self.config.artifacts_root.join(&session.0)
    }

    /// Scoped creation of the per-session artifacts directory.
    pub fn ensure_session_dir(&self, session: &SessionId) -> Result<PathBuf, RigError> {
        let dir = self.session_dir(session);
        std::fs::create_dir_all(&dir)
            .map_err(|err| RigError::resource(format!("artifacts dir {}: {err}", dir.display())))?;
        Ok(dir)
    }
}
