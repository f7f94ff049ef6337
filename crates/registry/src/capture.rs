use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use webrig_page_driver::DriverEvent;

use crate::model::Session;

/// Wire a session's driver event stream into its capture buffers.
///
/// One pump task per session; it holds only a weak reference so a session
/// dropped elsewhere is not kept alive by its own telemetry. The task handle
/// is stored on the session as the unsubscribe handle and aborted by the
/// cleanup coordinator before the driver handle is closed.
pub fn attach(session: &Arc<Session>) {
    let mut events = session.driver().subscribe();
    let weak = Arc::downgrade(session);
    let id = session.id.clone();
    let handle = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let Some(session) = weak.upgrade() else {
                        break;
                    };
                    apply(&session, event);
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!(session = %id, missed, "capture pump lagged, events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
    session.set_pump(handle);
}

fn apply(session: &Session, event: DriverEvent) {
    match event {
        DriverEvent::Console {
            level,
            text,
            timestamp,
        } => session.record_console(level, text, timestamp),
        DriverEvent::PageError { message, timestamp } => session.record_error(message, timestamp),
        DriverEvent::RequestStarted {
            request_id,
            url,
            method,
            timestamp,
        } => session.record_request_started(request_id, url, method, timestamp),
        DriverEvent::ResponseReceived {
            request_id,
            status,
            timestamp,
            ..
        } => session.record_response(&request_id, status, timestamp),
        DriverEvent::RequestFailed {
            request_id,
            error,
            timestamp,
            ..
        } => session.record_request_failed(&request_id, error, timestamp),
    }
}
