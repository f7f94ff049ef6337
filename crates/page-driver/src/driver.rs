use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::DriverError;
use crate::events::DriverEvent;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitCondition {
    #[default]
    Load,
    DomContentLoaded,
    NetworkIdle,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
}

#[derive(Clone, Debug)]
pub struct LaunchOptions {
    pub headless: bool,
    pub viewport: Viewport,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: Viewport::default(),
        }
    }
}

/// One exclusively owned browser context + page.
///
/// Not safe for concurrent use on one page; callers serialize operations per
/// handle (the scheduler's session gate enforces this). `close` releases the
/// underlying resources and must be called at most once per handle; event
/// subscribers must be torn down before it.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn navigate(
        &self,
        url: &str,
        wait: WaitCondition,
        timeout: Duration,
    ) -> Result<(), DriverError>;

    async fn fill(&self, selector: &str, value: &str) -> Result<(), DriverError>;

    async fn click(&self, selector: &str) -> Result<(), DriverError>;

    async fn screenshot(&self, path: &Path, full_page: bool) -> Result<(), DriverError>;

    async fn evaluate(&self, expression: &str) -> Result<Value, DriverError>;

    async fn cookies(&self) -> Result<Vec<Cookie>, DriverError>;

    async fn current_url(&self) -> Result<String, DriverError>;

    async fn title(&self) -> Result<String, DriverError>;

    fn viewport(&self) -> Viewport;

    /// Subscribe to the raw event stream. Dropping the receiver ends the
    /// subscription; the capture layer owns the pump task built on top.
    fn subscribe(&self) -> broadcast::Receiver<DriverEvent>;

    async fn close(&self) -> Result<(), DriverError>;
}

#[async_trait]
impl<T> PageDriver for std::sync::Arc<T>
where
    T: PageDriver + ?Sized,
{
    async fn navigate(
        &self,
        url: &str,
        wait: WaitCondition,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        (**self).navigate(url, wait, timeout).await
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), DriverError> {
        (**self).fill(selector, value).await
    }

    async fn click(&self, selector: &str) -> Result<(), DriverError> {
        (**self).click(selector).await
    }

    async fn screenshot(&self, path: &Path, full_page: bool) -> Result<(), DriverError> {
        (**self).screenshot(path, full_page).await
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, DriverError> {
        (**self).evaluate(expression).await
    }

    async fn cookies(&self) -> Result<Vec<Cookie>, DriverError> {
        (**self).cookies().await
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        (**self).current_url().await
    }

    async fn title(&self) -> Result<String, DriverError> {
        (**self).title().await
    }

    fn viewport(&self) -> Viewport {
        (**self).viewport()
    }

    fn subscribe(&self) -> broadcast::Receiver<DriverEvent> {
        (**self).subscribe()
    }

    async fn close(&self) -> Result<(), DriverError> {
        (**self).close().await
    }
}

/// Launches fresh driver handles. The orchestration core owns exactly one
/// handle per session and never shares it.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn launch(&self, options: LaunchOptions) -> Result<Box<dyn PageDriver>, DriverError>;
}
