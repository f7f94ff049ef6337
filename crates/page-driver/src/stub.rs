use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::debug;

use crate::driver::{Cookie, DriverFactory, LaunchOptions, PageDriver, Viewport, WaitCondition};
use crate::error::DriverError;
use crate::events::DriverEvent;

#[derive(Debug, Default)]
struct StubState {
    url: String,
    title: String,
    cookies: Vec<Cookie>,
    fields: Vec<(String, String)>,
    clicks: Vec<String>,
    screenshots: Vec<String>,
}

/// Deterministic in-memory backend.
///
/// Stands in for a real CDP/WebDriver adapter in tests and when the tool
/// surface runs without a browser. Navigation latency and close failures are
/// scriptable so lifecycle and serialization behavior can be exercised.
pub struct StubDriver {
    state: Mutex<StubState>,
    viewport: Viewport,
    events: broadcast::Sender<DriverEvent>,
    closed: AtomicBool,
    navigate_delay: Mutex<Duration>,
    close_delay: Mutex<Duration>,
    fail_close: AtomicBool,
    op_log: Mutex<Vec<String>>,
}

impl StubDriver {
    pub fn new(options: &LaunchOptions) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            state: Mutex::new(StubState {
                title: "about:blank".to_string(),
                url: "about:blank".to_string(),
                ..StubState::default()
            }),
            viewport: options.viewport,
            events,
            closed: AtomicBool::new(false),
            navigate_delay: Mutex::new(Duration::ZERO),
            close_delay: Mutex::new(Duration::ZERO),
            fail_close: AtomicBool::new(false),
            op_log: Mutex::new(Vec::new()),
        }
    }

    /// Inject a raw event as a real backend would emit it.
    pub fn emit(&self, event: DriverEvent) {
        let _ = self.events.send(event);
    }

    pub fn set_navigate_delay(&self, delay: Duration) {
        *self.navigate_delay.lock() = delay;
    }

    /// Make `close` linger, as a real backend tearing down a browser would.
    pub fn set_close_delay(&self, delay: Duration) {
        *self.close_delay.lock() = delay;
    }

    pub fn fail_next_close(&self) {
        self.fail_close.store(true, Ordering::SeqCst);
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.state.lock().title = title.into();
    }

    pub fn set_cookies(&self, cookies: Vec<Cookie>) {
        self.state.lock().cookies = cookies;
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Completed operations in the order the driver ran them.
    pub fn op_log(&self) -> Vec<String> {
        self.op_log.lock().clone()
    }

    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(DriverError::Closed)
        } else {
            Ok(())
        }
    }

    fn record(&self, op: String) {
        self.op_log.lock().push(op);
    }
}

#[async_trait]
impl PageDriver for StubDriver {
    async fn navigate(
        &self,
        url: &str,
        _wait: WaitCondition,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        self.ensure_open()?;
        let delay = *self.navigate_delay.lock();
        if delay > timeout {
            sleep(timeout).await;
            return Err(DriverError::Timeout {
                operation: "navigate".to_string(),
                timeout_ms: timeout.as_millis() as u64,
            });
        }
        sleep(delay).await;
        self.state.lock().url = url.to_string();
        self.record(format!("navigate:{url}"));
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), DriverError> {
        self.ensure_open()?;
        self.state
            .lock()
            .fields
            .push((selector.to_string(), value.to_string()));
        self.record(format!("fill:{selector}"));
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), DriverError> {
        self.ensure_open()?;
        self.state.lock().clicks.push(selector.to_string());
        self.record(format!("click:{selector}"));
        Ok(())
    }

    async fn screenshot(&self, path: &Path, _full_page: bool) -> Result<(), DriverError> {
        self.ensure_open()?;
        std::fs::write(path, b"stub-png")
            .map_err(|err| DriverError::backend(format!("screenshot write: {err}")))?;
        self.state
            .lock()
            .screenshots
            .push(path.display().to_string());
        self.record(format!("screenshot:{}", path.display()));
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, DriverError> {
        self.ensure_open()?;
        self.record(format!("evaluate:{expression}"));
        Ok(Value::Null)
    }

    async fn cookies(&self) -> Result<Vec<Cookie>, DriverError> {
        self.ensure_open()?;
        Ok(self.state.lock().cookies.clone())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        self.ensure_open()?;
        Ok(self.state.lock().url.clone())
    }

    async fn title(&self) -> Result<String, DriverError> {
        self.ensure_open()?;
        Ok(self.state.lock().title.clone())
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn subscribe(&self) -> broadcast::Receiver<DriverEvent> {
        self.events.subscribe()
    }

    async fn close(&self) -> Result<(), DriverError> {
        let delay = *self.close_delay.lock();
        if !delay.is_zero() {
            sleep(delay).await;
        }
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        debug!("stub driver closed");
        if self.fail_close.swap(false, Ordering::SeqCst) {
            return Err(DriverError::backend("close refused by backend"));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct StubFactory;

#[async_trait]
impl DriverFactory for StubFactory {
    async fn launch(&self, options: LaunchOptions) -> Result<Box<dyn PageDriver>, DriverError> {
        Ok(Box::new(StubDriver::new(&options)))
    }
}
