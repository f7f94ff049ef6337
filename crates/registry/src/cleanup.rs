use std::sync::Arc;

use tracing::{info, warn};

use chrono::Utc;
use webrig_core_types::{RigError, ScenarioId, SessionId};

use crate::metrics;
use crate::scenario::{ScenarioPhase, ScenarioRegistry, StateUpdate};
use crate::session::SessionRegistry;

/// Idempotent teardown of sessions and cascading teardown of scenarios.
///
/// Registry consistency wins over resource-close success: a session whose
/// driver refuses to close is still removed from the registry and from its
/// scenario's membership. The failure is logged and recorded on the session.
pub struct CleanupCoordinator {
    sessions: Arc<SessionRegistry>,
    scenarios: Arc<ScenarioRegistry>,
}

impl CleanupCoordinator {
    pub fn new(sessions: Arc<SessionRegistry>, scenarios: Arc<ScenarioRegistry>) -> Self {
        Self {
            sessions,
            scenarios,
        }
    }

    /// Close one session. Absent id is success-as-no-op; returns whether a
    /// session was actually present.
    pub async fn close_session(&self, id: &SessionId) -> bool {
        // removing first claims the session atomically, making concurrent
        // closes race-free: exactly one caller tears the resource down
        let Some(session) = self.sessions.remove(id) else {
            return false;
        };

        // unsubscribe before releasing the handle
        session.stop_pump();

        // membership detaches before the close await: while a slow close is
        // pending, scenario members and the session registry must not
        // disagree about which sessions are live
        if let Some(link) = session.detach_link() {
            if let Ok(scenario) = self.scenarios.get(&link.scenario) {
                scenario.remove_session(id);
            }
        }

        if let Err(err) = session.driver().close().await {
            metrics::record_driver_close_failure();
            session.record_error(format!("driver close failed: {err}"), Utc::now());
            warn!(session = %id, error = %err, "driver close failed, session removed anyway");
        }

        metrics::record_session_closed();
        info!(session = %id, "session closed");
        true
    }

    /// Cascading close: closes every current member, marks the scenario
    /// completed and removes it. Returns the number of sessions actually
    /// closed; a single member's failure does not stop the sweep.
    pub async fn close_scenario(&self, id: &ScenarioId) -> Result<usize, RigError> {
        let scenario = self.scenarios.get(id)?;

        // snapshot, not a live view: members mutate while we iterate
        let members = scenario.member_ids();
        let mut closed = 0usize;
        for member in &members {
            if self.close_session(member).await {
                closed += 1;
            }
        }

        scenario.update_state(StateUpdate {
            phase: Some(ScenarioPhase::Completed),
            custom: None,
        });
        self.scenarios.remove(id);
        info!(scenario = %id, closed, "scenario closed");
        Ok(closed)
    }

    /// Best-effort sweep on process termination.
    pub async fn shutdown_all(&self) -> usize {
        let ids = self.sessions.ids();
        let mut closed = 0usize;
        for id in &ids {
            if self.close_session(id).await {
                closed += 1;
            }
        }
        info!(closed, "shutdown sweep complete");
        closed
    }
}
