use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;

use webrig_core_types::{RigError, RingBuffer, ScenarioId, SessionId};

use crate::errors::RegistryError;
use crate::metrics;

pub const EVENT_LOG_CAPACITY: usize = 500;

pub const MEMBER_STATUS_ACTIVE: &str = "active";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioPhase {
    #[default]
    Created,
    Running,
    Completed,
    Failed,
}

impl FromStr for ScenarioPhase {
    type Err = RigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "created" => Ok(Self::Created),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(RigError::validation(
                "phase",
                format!("unknown phase `{other}`"),
            )),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ScenarioMeta {
    pub name: String,
    pub description: String,
    pub experiment: String,
    pub parameters: Map<String, Value>,
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberEntry {
    pub session: SessionId,
    pub role: String,
    pub label: String,
    pub status: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ScenarioEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: String,
    pub data: Value,
}

/// Partial state update; `custom` merges shallowly, key by key.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StateUpdate {
    pub phase: Option<ScenarioPhase>,
    pub custom: Option<Map<String, Value>>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSummary {
    pub id: ScenarioId,
    pub name: String,
    pub description: String,
    pub experiment: String,
    pub parameters: Map<String, Value>,
    pub tags: Vec<String>,
    pub phase: ScenarioPhase,
    pub custom_data: Map<String, Value>,
    pub members: Vec<MemberEntry>,
    pub member_count: usize,
    pub event_count: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
struct ScenarioInner {
    members: Vec<MemberEntry>,
    phase: ScenarioPhase,
    custom: Map<String, Value>,
    events: RingBuffer<ScenarioEvent>,
}

/// One named coordination unit grouping the sessions of a test run.
///
/// Membership keeps join order. Every mutation is logged into the bounded
/// event log; no event type is exempt from eviction.
pub struct TestScenario {
    pub id: ScenarioId,
    pub created_at: DateTime<Utc>,
    pub(crate) seq: u64,
    meta: ScenarioMeta,
    inner: RwLock<ScenarioInner>,
}

impl TestScenario {
    fn new(id: ScenarioId, seq: u64, meta: ScenarioMeta, initial: Map<String, Value>) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            seq,
            meta,
            inner: RwLock::new(ScenarioInner {
                members: Vec::new(),
                phase: ScenarioPhase::Created,
                custom: initial,
                events: RingBuffer::new(EVENT_LOG_CAPACITY),
            }),
        }
    }

    pub fn meta(&self) -> &ScenarioMeta {
        &self.meta
    }

    pub fn phase(&self) -> ScenarioPhase {
        self.inner.read().phase
    }

    /// Insert or overwrite the membership entry for `session`.
    pub fn add_session(&self, session: SessionId, role: String, label: String) {
        let mut inner = self.inner.write();
        let entry = MemberEntry {
            session: session.clone(),
            role: role.clone(),
            label,
            status: MEMBER_STATUS_ACTIVE.to_string(),
            joined_at: Utc::now(),
        };
        match inner.members.iter_mut().find(|m| m.session == session) {
            Some(existing) => *existing = entry,
            None => inner.members.push(entry),
        }
        inner.events.push(ScenarioEvent {
            timestamp: Utc::now(),
            kind: "session_joined".to_string(),
            data: json!({ "sessionId": session, "role": role }),
        });
    }

    /// Idempotent: removing an absent session is a no-op and logs no event.
    pub fn remove_session(&self, session: &SessionId) -> bool {
        let mut inner = self.inner.write();
        let before = inner.members.len();
        inner.members.retain(|m| &m.session != session);
        if inner.members.len() == before {
            return false;
        }
        inner.events.push(ScenarioEvent {
            timestamp: Utc::now(),
            kind: "session_left".to_string(),
            data: json!({ "sessionId": session }),
        });
        true
    }

    /// Replace the phase unconditionally if given (no transition table) and
    /// merge custom data shallowly, last write wins per key.
    pub fn update_state(&self, update: StateUpdate) {
        let mut inner = self.inner.write();
        let mut payload = Map::new();
        if let Some(phase) = update.phase {
            inner.phase = phase;
            payload.insert("phase".to_string(), json!(phase));
        }
        if let Some(custom) = update.custom {
            payload.insert("customData".to_string(), Value::Object(custom.clone()));
            for (key, value) in custom {
                inner.custom.insert(key, value);
            }
        }
        inner.events.push(ScenarioEvent {
            timestamp: Utc::now(),
            kind: "state_updated".to_string(),
            data: Value::Object(payload),
        });
    }

    pub fn members(&self) -> Vec<MemberEntry> {
        self.inner.read().members.clone()
    }

    pub fn member_ids(&self) -> Vec<SessionId> {
        self.inner
            .read()
            .members
            .iter()
            .map(|m| m.session.clone())
            .collect()
    }

    pub fn recent_events(&self, n: usize) -> Vec<ScenarioEvent> {
        self.inner.read().events.tail(n)
    }

    /// Read-only projection for external reporting.
    pub fn summary(&self) -> ScenarioSummary {
        let inner = self.inner.read();
        ScenarioSummary {
            id: self.id.clone(),
            name: self.meta.name.clone(),
            description: self.meta.description.clone(),
            experiment: self.meta.experiment.clone(),
            parameters: self.meta.parameters.clone(),
            tags: self.meta.tags.clone(),
            phase: inner.phase,
            custom_data: inner.custom.clone(),
            members: inner.members.clone(),
            member_count: inner.members.len(),
            event_count: inner.events.len(),
            created_at: self.created_at,
        }
    }
}

impl std::fmt::Debug for TestScenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestScenario")
            .field("id", &self.id)
            .field("name", &self.meta.name)
            .finish_non_exhaustive()
    }
}

/// Owns the set of live scenarios.
#[derive(Debug, Default)]
pub struct ScenarioRegistry {
    scenarios: DashMap<ScenarioId, Arc<TestScenario>>,
    seq: AtomicU64,
}

impl ScenarioRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All metadata fields have defaults; creation never fails on missing
    /// fields.
    pub fn create(&self, meta: ScenarioMeta, initial: Map<String, Value>) -> Arc<TestScenario> {
        let id = ScenarioId::new();
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let scenario = Arc::new(TestScenario::new(id.clone(), seq, meta, initial));
        info!(scenario = %id, name = %scenario.meta.name, "scenario created");
        self.scenarios.insert(id, Arc::clone(&scenario));
        metrics::set_scenario_count(self.scenarios.len());
        scenario
    }

    pub fn get(&self, id: &ScenarioId) -> Result<Arc<TestScenario>, RigError> {
        self.scenarios
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| RegistryError::NotFound.into_rig_error(format!("scenario {id}")))
    }

    pub fn remove(&self, id: &ScenarioId) -> bool {
        let removed = self.scenarios.remove(id).is_some();
        metrics::set_scenario_count(self.scenarios.len());
        removed
    }

    pub fn list(&self, tag: Option<&str>) -> Vec<Arc<TestScenario>> {
        let mut scenarios: Vec<_> = self
            .scenarios
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .filter(|scenario| match tag {
                Some(tag) => scenario.meta.tags.iter().any(|t| t == tag),
                None => true,
            })
            .collect();
        scenarios.sort_by_key(|scenario| scenario.seq);
        scenarios
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}
