use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::debug;

use webrig_core_types::{RingBuffer, ScenarioId, SessionId};
use webrig_page_driver::{ConsoleLevel, PageDriver};

pub const CONSOLE_LOG_CAPACITY: usize = 100;
pub const NETWORK_LOG_CAPACITY: usize = 200;
pub const COMMAND_HISTORY_CAPACITY: usize = 100;

/// Non-owning back-reference from a session to its scenario. Absence means
/// the session is unscoped.
#[derive(Clone, Debug, Serialize)]
pub struct ScenarioLink {
    pub scenario: ScenarioId,
    pub role: String,
    pub label: String,
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct SessionFlags {
    pub record_screenshots: bool,
    pub debug_mode: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct ConsoleEntry {
    pub level: ConsoleLevel,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PageErrorEntry {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkEntry {
    pub request_id: String,
    pub url: String,
    pub method: String,
    pub status: Option<u16>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CommandEntry {
    pub tool: String,
    pub detail: String,
    pub ok: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotMeta {
    pub path: PathBuf,
    pub full_page: bool,
    pub taken_at: DateTime<Utc>,
}

/// Bounded telemetry captured from one session's driver events and commands.
#[derive(Debug)]
pub struct CaptureState {
    pub console: RingBuffer<ConsoleEntry>,
    pub errors: Vec<PageErrorEntry>,
    pub network: RingBuffer<NetworkEntry>,
    pub history: RingBuffer<CommandEntry>,
    pub screenshots: Vec<ScreenshotMeta>,
    pub watched: HashSet<String>,
}

impl Default for CaptureState {
    fn default() -> Self {
        Self {
            console: RingBuffer::new(CONSOLE_LOG_CAPACITY),
            errors: Vec::new(),
            network: RingBuffer::new(NETWORK_LOG_CAPACITY),
            history: RingBuffer::new(COMMAND_HISTORY_CAPACITY),
            screenshots: Vec::new(),
            watched: HashSet::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: SessionId,
    pub scenario: Option<ScenarioId>,
    pub role: Option<String>,
    pub label: Option<String>,
    pub record_screenshots: bool,
    pub debug_mode: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct DebugReport {
    pub console: Vec<ConsoleEntry>,
    pub errors: Vec<PageErrorEntry>,
    pub network: Vec<NetworkEntry>,
    pub history: Vec<CommandEntry>,
    pub watched: Vec<String>,
}

/// One stateful automation context.
///
/// Owns its driver handle exclusively; the handle is released exactly once,
/// by the cleanup coordinator. Capture buffers are written only by this
/// session's own pump task and by handlers operating on this session id.
pub struct Session {
    pub id: SessionId,
    pub flags: SessionFlags,
    pub created_at: DateTime<Utc>,
    pub(crate) seq: u64,
    driver: Box<dyn PageDriver>,
    link: RwLock<Option<ScenarioLink>>,
    capture: RwLock<CaptureState>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    pub(crate) fn new(
        id: SessionId,
        seq: u64,
        driver: Box<dyn PageDriver>,
        link: Option<ScenarioLink>,
        flags: SessionFlags,
    ) -> Self {
        Self {
            id,
            flags,
            created_at: Utc::now(),
            seq,
            driver,
            link: RwLock::new(link),
            capture: RwLock::new(CaptureState::default()),
            pump: Mutex::new(None),
        }
    }

    pub fn driver(&self) -> &dyn PageDriver {
        self.driver.as_ref()
    }

    pub fn link(&self) -> Option<ScenarioLink> {
        self.link.read().clone()
    }

    pub(crate) fn detach_link(&self) -> Option<ScenarioLink> {
        self.link.write().take()
    }

    pub(crate) fn set_pump(&self, handle: JoinHandle<()>) {
        *self.pump.lock() = Some(handle);
    }

    /// Stop the event pump. This is the unsubscribe step and must run before
    /// the driver handle is closed.
    pub(crate) fn stop_pump(&self) {
        if let Some(handle) = self.pump.lock().take() {
            handle.abort();
        }
    }

    pub fn record_console(&self, level: ConsoleLevel, text: String, timestamp: DateTime<Utc>) {
        self.capture.write().console.push(ConsoleEntry {
            level,
            text,
            timestamp,
        });
    }

    pub fn record_error(&self, message: String, timestamp: DateTime<Utc>) {
        self.capture
            .write()
            .errors
            .push(PageErrorEntry { message, timestamp });
    }

    pub fn record_request_started(
        &self,
        request_id: String,
        url: String,
        method: String,
        timestamp: DateTime<Utc>,
    ) {
        self.capture.write().network.push(NetworkEntry {
            request_id,
            url,
            method,
            status: None,
            error: None,
            started_at: timestamp,
            finished_at: None,
        });
    }

    /// Correlate by the driver-assigned request id. A response whose request
    /// was already evicted from the bounded log is dropped.
    pub fn record_response(&self, request_id: &str, status: u16, timestamp: DateTime<Utc>) {
        let mut capture = self.capture.write();
        let entry = capture
            .network
            .iter_mut()
            .find(|entry| entry.request_id == request_id);
        if let Some(entry) = entry {
            entry.status = Some(status);
            entry.finished_at = Some(timestamp);
        } else {
            debug!(session = %self.id, request_id, "response for evicted request");
        }
    }

    pub fn record_request_failed(&self, request_id: &str, error: String, timestamp: DateTime<Utc>) {
        let mut capture = self.capture.write();
        let entry = capture
            .network
            .iter_mut()
            .find(|entry| entry.request_id == request_id);
        if let Some(entry) = entry {
            entry.error = Some(error);
            entry.finished_at = Some(timestamp);
        } else {
            debug!(session = %self.id, request_id, "failure for evicted request");
        }
    }

    pub fn record_command(&self, tool: &str, detail: impl Into<String>, ok: bool) {
        self.capture.write().history.push(CommandEntry {
            tool: tool.to_string(),
            detail: detail.into(),
            ok,
            timestamp: Utc::now(),
        });
    }

    pub fn record_screenshot(&self, path: PathBuf, full_page: bool) {
        self.capture.write().screenshots.push(ScreenshotMeta {
            path,
            full_page,
            taken_at: Utc::now(),
        });
    }

    pub fn watch_expression(&self, expression: impl Into<String>) {
        self.capture.write().watched.insert(expression.into());
    }

    pub fn screenshot_history(&self) -> Vec<ScreenshotMeta> {
        self.capture.read().screenshots.clone()
    }

    pub fn summary(&self) -> SessionSummary {
        let link = self.link.read();
        SessionSummary {
            id: self.id.clone(),
            scenario: link.as_ref().map(|l| l.scenario.clone()),
            role: link.as_ref().map(|l| l.role.clone()),
            label: link.as_ref().map(|l| l.label.clone()),
            record_screenshots: self.flags.record_screenshots,
            debug_mode: self.flags.debug_mode,
            created_at: self.created_at,
        }
    }

    pub fn debug_report(
        &self,
        include_console: bool,
        include_errors: bool,
        include_network: bool,
        tail: usize,
    ) -> DebugReport {
        let capture = self.capture.read();
        let mut report = DebugReport {
            history: capture.history.tail(tail),
            watched: capture.watched.iter().cloned().collect(),
            ..DebugReport::default()
        };
        if include_console {
            report.console = capture.console.tail(tail);
        }
        if include_errors {
            report.errors = capture.errors.clone();
        }
        if include_network {
            report.network = capture.network.tail(tail);
        }
        report
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("flags", &self.flags)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webrig_page_driver::{LaunchOptions, StubDriver};

    fn session() -> Session {
        Session::new(
            SessionId::new(),
            0,
            Box::new(StubDriver::new(&LaunchOptions::default())),
            None,
            SessionFlags::default(),
        )
    }

    fn start_request(session: &Session, request_id: &str) {
        session.record_request_started(
            request_id.to_string(),
            "https://api.test/data".to_string(),
            "GET".to_string(),
            Utc::now(),
        );
    }

    #[test]
    fn responses_update_the_matching_network_entry() {
        let session = session();
        start_request(&session, "r1");
        session.record_response("r1", 204, Utc::now());

        let report = session.debug_report(false, false, true, 10);
        assert_eq!(report.network[0].status, Some(204));
        assert!(report.network[0].finished_at.is_some());
    }

    #[test]
    fn failures_update_the_matching_network_entry() {
        let session = session();
        start_request(&session, "r2");
        session.record_request_failed("r2", "net::ERR_ABORTED".to_string(), Utc::now());

        let report = session.debug_report(false, false, true, 10);
        assert_eq!(report.network[0].error.as_deref(), Some("net::ERR_ABORTED"));
    }

    #[test]
    fn late_results_for_evicted_requests_are_dropped() {
        let session = session();
        for i in 0..=NETWORK_LOG_CAPACITY {
            start_request(&session, &format!("r{i}"));
        }

        // r0 was evicted by the overflow push; its late results go nowhere
        session.record_response("r0", 200, Utc::now());
        session.record_request_failed("r0", "reset".to_string(), Utc::now());

        let report = session.debug_report(false, false, true, NETWORK_LOG_CAPACITY + 1);
        assert!(report.network.iter().all(|e| e.request_id != "r0"));
        assert!(report
            .network
            .iter()
            .all(|e| e.status.is_none() && e.error.is_none()));
    }
}
