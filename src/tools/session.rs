use serde_json::{json, Value};
use tracing::warn;

use webrig_core_types::{RigError, ScenarioId, SessionId};
use webrig_page_driver::{LaunchOptions, WaitCondition};
use webrig_registry::{ScenarioLink, SessionFilter, SessionFlags, SessionSpec};

use crate::context::AppContext;

const DEFAULT_ROLE: &str = "participant";

#[allow(clippy::too_many_arguments)]
pub async fn start(
    ctx: &AppContext,
    scenario_id: Option<ScenarioId>,
    role: Option<String>,
    label: Option<String>,
    headless: Option<bool>,
    url: Option<String>,
    record_screenshots: bool,
    debug_mode: bool,
) -> Result<Value, RigError> {
    let options = LaunchOptions {
        headless: headless.unwrap_or(ctx.config.headless),
        ..LaunchOptions::default()
    };
    let driver = ctx.factory.launch(options).await?;

    let link = scenario_id.map(|scenario| {
        let role = role.unwrap_or_else(|| DEFAULT_ROLE.to_string());
        ScenarioLink {
            scenario,
            label: label.unwrap_or_else(|| role.clone()),
            role,
        }
    });
    let spec = SessionSpec {
        requested_id: None,
        flags: SessionFlags {
            record_screenshots,
            debug_mode,
        },
        link,
    };
    let session = ctx.sessions.create(driver, spec, &ctx.scenarios)?;
    let id = session.id.clone();

    if record_screenshots {
        ctx.ensure_session_dir(&id)?;
    }

    let mut response = json!({ "sessionId": id });
    if let Some(url) = url {
        let timeout = ctx.config.navigation_timeout();
        let outcome = ctx
            .gate
            .run(&id, "navigate", Some(timeout), async {
                let session = ctx.sessions.get(&id)?;
                session
                    .driver()
                    .navigate(&url, WaitCondition::Load, timeout)
                    .await
                    .map_err(RigError::from)
            })
            .await;
        session.record_command("navigate", &url, outcome.is_ok());
        if let Err(err) = outcome {
            // the session stays usable; initial navigation is best-effort
            warn!(session = %id, error = %err, "initial navigation failed");
            response["navigationError"] = json!(err.to_string());
        } else {
            response["url"] = json!(url);
        }
    }
    Ok(response)
}

pub async fn end(ctx: &AppContext, id: &SessionId) -> Result<Value, RigError> {
    if !ctx.cleanup.close_session(id).await {
        return Err(RigError::not_found(format!("session {id}")));
    }
    ctx.gate.forget(id);
    Ok(json!({ "closed": true }))
}

pub fn list(
    ctx: &AppContext,
    scenario_id: Option<ScenarioId>,
    role: Option<String>,
) -> Result<Value, RigError> {
    let filter = SessionFilter {
        scenario: scenario_id,
        role,
    };
    let summaries: Vec<_> = ctx
        .sessions
        .list(&filter)
        .iter()
        .map(|session| session.summary())
        .collect();
    Ok(json!({ "sessions": summaries }))
}

pub async fn state(ctx: &AppContext, id: &SessionId) -> Result<Value, RigError> {
    // the driver reads go through the gate like any other operation; the
    // session is re-fetched inside so a concurrent close surfaces NotFound
    ctx.gate
        .run(id, "get_session_state", None, async {
            let session = ctx.sessions.get(id)?;
            let driver = session.driver();
            let url = driver.current_url().await.map_err(RigError::from)?;
            let title = driver.title().await.map_err(RigError::from)?;
            let cookies = driver.cookies().await.map_err(RigError::from)?;
            let viewport = driver.viewport();
            Ok(json!({
                "sessionId": id,
                "url": url,
                "title": title,
                "viewport": viewport,
                "cookieCount": cookies.len(),
            }))
        })
        .await
}

pub fn screenshot_history(ctx: &AppContext, id: &SessionId) -> Result<Value, RigError> {
    let session = ctx.sessions.get(id)?;
    Ok(json!({ "screenshots": session.screenshot_history() }))
}

pub fn debug_info(
    ctx: &AppContext,
    id: &SessionId,
    include_console: bool,
    include_errors: bool,
    include_network: bool,
    limit: usize,
) -> Result<Value, RigError> {
    let session = ctx.sessions.get(id)?;
    let report = session.debug_report(include_console, include_errors, include_network, limit);
    Ok(serde_json::to_value(report)
        .map_err(|err| RigError::resource(format!("report encoding: {err}")))?)
}
