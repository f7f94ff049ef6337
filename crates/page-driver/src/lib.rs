//! Page automation capability seam.
//!
//! The orchestration core consumes browser automation through the
//! [`PageDriver`] trait and never talks to a concrete backend directly.
//! A deterministic in-memory [`StubDriver`] ships with the crate for tests
//! and for running the tool surface without a browser.

mod driver;
mod error;
mod events;
mod stub;

pub use driver::{Cookie, DriverFactory, LaunchOptions, PageDriver, Viewport, WaitCondition};
pub use error::DriverError;
pub use events::{ConsoleLevel, DriverEvent};
pub use stub::{StubDriver, StubFactory};
