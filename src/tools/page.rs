use chrono::Utc;
use serde_json::{json, Value};

use webrig_core_types::{RigError, SessionId};
use webrig_page_driver::WaitCondition;

use crate::context::AppContext;

/// Thin delegation into the driver: resolve, serialize through the gate,
/// record command history. The session is re-fetched inside the gated block
/// so a close that won the race surfaces as NotFound, never as a call on
/// torn-down state.
pub async fn navigate(
    ctx: &AppContext,
    id: &SessionId,
    url: &str,
    wait: WaitCondition,
    timeout_ms: Option<u64>,
) -> Result<Value, RigError> {
    let timeout = timeout_ms
        .map(std::time::Duration::from_millis)
        .unwrap_or_else(|| ctx.config.navigation_timeout());
    let outcome = ctx
        .gate
        .run(id, "navigate", Some(timeout), async {
            let session = ctx.sessions.get(id)?;
            session
                .driver()
                .navigate(url, wait, timeout)
                .await
                .map_err(RigError::from)
        })
        .await;
    record(ctx, id, "navigate", url, outcome.is_ok());
    outcome?;
    Ok(json!({ "url": url }))
}

pub async fn fill(
    ctx: &AppContext,
    id: &SessionId,
    selector: &str,
    value: &str,
) -> Result<Value, RigError> {
    let outcome = ctx
        .gate
        .run(id, "fill_field", None, async {
            let session = ctx.sessions.get(id)?;
            session
                .driver()
                .fill(selector, value)
                .await
                .map_err(RigError::from)
        })
        .await;
    record(ctx, id, "fill_field", selector, outcome.is_ok());
    outcome?;
    Ok(json!({ "filled": selector }))
}

pub async fn click(ctx: &AppContext, id: &SessionId, selector: &str) -> Result<Value, RigError> {
    let outcome = ctx
        .gate
        .run(id, "click_element", None, async {
            let session = ctx.sessions.get(id)?;
            session
                .driver()
                .click(selector)
                .await
                .map_err(RigError::from)
        })
        .await;
    record(ctx, id, "click_element", selector, outcome.is_ok());
    outcome?;
    Ok(json!({ "clicked": selector }))
}

pub async fn evaluate(
    ctx: &AppContext,
    id: &SessionId,
    expression: &str,
    watch: bool,
) -> Result<Value, RigError> {
    let outcome = ctx
        .gate
        .run(id, "evaluate_script", None, async {
            let session = ctx.sessions.get(id)?;
            if watch {
                session.watch_expression(expression);
            }
            session
                .driver()
                .evaluate(expression)
                .await
                .map_err(RigError::from)
        })
        .await;
    record(ctx, id, "evaluate_script", expression, outcome.is_ok());
    let result = outcome?;
    Ok(json!({ "result": result }))
}

pub async fn screenshot(
    ctx: &AppContext,
    id: &SessionId,
    full_page: bool,
) -> Result<Value, RigError> {
    let dir = ctx.ensure_session_dir(id)?;
    let path = dir.join(format!("{}.png", Utc::now().timestamp_millis()));
    let outcome = ctx
        .gate
        .run(id, "take_screenshot", None, async {
            let session = ctx.sessions.get(id)?;
            session
                .driver()
                .screenshot(&path, full_page)
                .await
                .map_err(RigError::from)?;
            session.record_screenshot(path.clone(), full_page);
            Ok(())
        })
        .await;
    record(ctx, id, "take_screenshot", path.display().to_string(), outcome.is_ok());
    outcome?;
    Ok(json!({ "path": path }))
}

fn record(ctx: &AppContext, id: &SessionId, tool: &str, detail: impl Into<String>, ok: bool) {
    // history is best-effort; a session closed mid-operation has nowhere to
    // record and that is fine
    if let Ok(session) = ctx.sessions.get(id) {
        session.record_command(tool, detail, ok);
    }
}
