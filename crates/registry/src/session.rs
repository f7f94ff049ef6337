use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};

use webrig_core_types::{RigError, SessionId};
use webrig_page_driver::PageDriver;

use crate::capture;
use crate::errors::RegistryError;
use crate::metrics;
use crate::model::{ScenarioLink, Session, SessionFlags};
use crate::scenario::ScenarioRegistry;

#[derive(Clone, Debug, Default)]
pub struct SessionSpec {
    pub requested_id: Option<SessionId>,
    pub flags: SessionFlags,
    pub link: Option<ScenarioLink>,
}

#[derive(Clone, Debug, Default)]
pub struct SessionFilter {
    pub scenario: Option<webrig_core_types::ScenarioId>,
    pub role: Option<String>,
}

impl SessionFilter {
    fn matches(&self, session: &Session) -> bool {
        let link = session.link();
        if let Some(scenario) = &self.scenario {
            if link.as_ref().map(|l| &l.scenario) != Some(scenario) {
                return false;
            }
        }
        if let Some(role) = &self.role {
            if link.as_ref().map(|l| l.role.as_str()) != Some(role.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Owns the set of live sessions.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<Session>>,
    seq: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct and register a session around an already-launched driver
    /// handle, wiring its event capture pump.
    ///
    /// If the spec links a scenario that exists, membership is registered
    /// synchronously. A link to an unknown scenario is an explicit leniency:
    /// the session is still created, just unscoped.
    pub fn create(
        &self,
        driver: Box<dyn PageDriver>,
        spec: SessionSpec,
        scenarios: &ScenarioRegistry,
    ) -> Result<Arc<Session>, RigError> {
        let id = spec.requested_id.unwrap_or_default();
        if self.sessions.contains_key(&id) {
            return Err(RegistryError::IdInUse.into_rig_error(format!("session {id}")));
        }

        let link = match spec.link {
            Some(link) => match scenarios.get(&link.scenario) {
                Ok(scenario) => {
                    scenario.add_session(id.clone(), link.role.clone(), link.label.clone());
                    Some(link)
                }
                Err(_) => {
                    debug!(
                        session = %id,
                        scenario = %link.scenario,
                        "scenario missing, session created unscoped"
                    );
                    None
                }
            },
            None => None,
        };

        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let session = Arc::new(Session::new(id.clone(), seq, driver, link, spec.flags));
        capture::attach(&session);
        info!(session = %id, "session created");
        self.sessions.insert(id, Arc::clone(&session));
        metrics::set_session_count(self.sessions.len());
        Ok(session)
    }

    pub fn get(&self, id: &SessionId) -> Result<Arc<Session>, RigError> {
        self.sessions
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| RegistryError::NotFound.into_rig_error(format!("session {id}")))
    }

    /// Idempotent. Does not close the driver handle; that is the cleanup
    /// coordinator's job.
    pub fn remove(&self, id: &SessionId) -> Option<Arc<Session>> {
        let removed = self.sessions.remove(id).map(|(_, session)| session);
        metrics::set_session_count(self.sessions.len());
        removed
    }

    pub fn list(&self, filter: &SessionFilter) -> Vec<Arc<Session>> {
        let mut sessions: Vec<_> = self
            .sessions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .filter(|session| filter.matches(session))
            .collect();
        sessions.sort_by_key(|session| session.seq);
        sessions
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::ScenarioMeta;
    use serde_json::Map;
    use webrig_core_types::ScenarioId;
    use webrig_page_driver::{LaunchOptions, StubDriver};

    fn stub() -> Box<dyn PageDriver> {
        Box::new(StubDriver::new(&LaunchOptions::default()))
    }

    fn linked_spec(scenario: ScenarioId, role: &str) -> SessionSpec {
        SessionSpec {
            link: Some(ScenarioLink {
                scenario,
                role: role.to_string(),
                label: role.to_uppercase(),
            }),
            ..SessionSpec::default()
        }
    }

    #[tokio::test]
    async fn create_allocates_unique_ids() {
        let sessions = SessionRegistry::new();
        let scenarios = ScenarioRegistry::new();
        let a = sessions
            .create(stub(), SessionSpec::default(), &scenarios)
            .unwrap();
        let b = sessions
            .create(stub(), SessionSpec::default(), &scenarios)
            .unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(sessions.len(), 2);
    }

    #[tokio::test]
    async fn requested_id_collision_is_rejected() {
        let sessions = SessionRegistry::new();
        let scenarios = ScenarioRegistry::new();
        let spec = SessionSpec {
            requested_id: Some(SessionId("fixed".to_string())),
            ..SessionSpec::default()
        };
        sessions.create(stub(), spec.clone(), &scenarios).unwrap();
        let err = sessions.create(stub(), spec, &scenarios).unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[tokio::test]
    async fn linking_registers_membership() {
        let sessions = SessionRegistry::new();
        let scenarios = ScenarioRegistry::new();
        let scenario = scenarios.create(ScenarioMeta::default(), Map::new());

        let session = sessions
            .create(stub(), linked_spec(scenario.id.clone(), "admin"), &scenarios)
            .unwrap();

        let members = scenario.members();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].session, session.id);
        assert_eq!(members[0].role, "admin");
    }

    #[tokio::test]
    async fn missing_scenario_leaves_session_unscoped() {
        let sessions = SessionRegistry::new();
        let scenarios = ScenarioRegistry::new();

        let session = sessions
            .create(stub(), linked_spec(ScenarioId::new(), "admin"), &scenarios)
            .unwrap();
        assert!(session.link().is_none());
        assert!(sessions.get(&session.id).is_ok());
    }

    #[tokio::test]
    async fn list_filters_by_scenario_and_role() {
        let sessions = SessionRegistry::new();
        let scenarios = ScenarioRegistry::new();
        let scenario = scenarios.create(ScenarioMeta::default(), Map::new());

        sessions
            .create(stub(), linked_spec(scenario.id.clone(), "admin"), &scenarios)
            .unwrap();
        sessions
            .create(
                stub(),
                linked_spec(scenario.id.clone(), "participant"),
                &scenarios,
            )
            .unwrap();
        sessions
            .create(stub(), SessionSpec::default(), &scenarios)
            .unwrap();

        let all = sessions.list(&SessionFilter::default());
        assert_eq!(all.len(), 3);

        let scoped = sessions.list(&SessionFilter {
            scenario: Some(scenario.id.clone()),
            role: None,
        });
        assert_eq!(scoped.len(), 2);

        let admins = sessions.list(&SessionFilter {
            scenario: Some(scenario.id.clone()),
            role: Some("admin".to_string()),
        });
        assert_eq!(admins.len(), 1);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let sessions = SessionRegistry::new();
        let scenarios = ScenarioRegistry::new();
        let session = sessions
            .create(stub(), SessionSpec::default(), &scenarios)
            .unwrap();
        assert!(sessions.remove(&session.id).is_some());
        assert!(sessions.remove(&session.id).is_none());
        assert!(sessions.get(&session.id).is_err());
    }
}
