//! The tool surface: discriminated requests, boundary validation, dispatch.
//!
//! Every handler catches all errors at this boundary and returns a
//! structured [`ToolResponse`]; no single invocation may crash the process
//! or leave a registry half-mutated.

mod args;
mod page;
mod scenario;
mod session;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use webrig_core_types::{RigError, ScenarioId, SessionId};
use webrig_page_driver::WaitCondition;
use webrig_registry::ScenarioPhase;

use crate::context::AppContext;

use args::{
    optional_bool, optional_object, optional_str, optional_str_list, optional_u64, required_str,
};

#[derive(Clone, Debug)]
pub enum ToolRequest {
    CreateTestScenario {
        name: String,
        description: String,
        experiment: String,
        parameters: Map<String, Value>,
        tags: Vec<String>,
        initial_state: Map<String, Value>,
    },
    ListTestScenarios {
        tag: Option<String>,
    },
    GetTestScenario {
        scenario_id: ScenarioId,
    },
    UpdateScenarioState {
        scenario_id: ScenarioId,
        phase: Option<ScenarioPhase>,
        custom: Option<Map<String, Value>>,
    },
    EndTestScenario {
        scenario_id: ScenarioId,
    },
    StartSession {
        scenario_id: Option<ScenarioId>,
        role: Option<String>,
        label: Option<String>,
        headless: Option<bool>,
        url: Option<String>,
        record_screenshots: bool,
        debug_mode: bool,
    },
    EndSession {
        session_id: SessionId,
    },
    ListSessions {
        scenario_id: Option<ScenarioId>,
        role: Option<String>,
    },
    GetSessionState {
        session_id: SessionId,
    },
    GetScreenshotHistory {
        session_id: SessionId,
    },
    GetDebugInfo {
        session_id: SessionId,
        include_console: bool,
        include_errors: bool,
        include_network: bool,
        limit: usize,
    },
    Navigate {
        session_id: SessionId,
        url: String,
        wait: WaitCondition,
        timeout_ms: Option<u64>,
    },
    FillField {
        session_id: SessionId,
        selector: String,
        value: String,
    },
    ClickElement {
        session_id: SessionId,
        selector: String,
    },
    EvaluateScript {
        session_id: SessionId,
        expression: String,
        watch: bool,
    },
    TakeScreenshot {
        session_id: SessionId,
        full_page: bool,
    },
}

impl ToolRequest {
    /// Field-level validation happens here, before any registry mutation.
    pub fn parse(tool: &str, params: &Map<String, Value>) -> Result<Self, RigError> {
        match tool {
            "create_test_scenario" => Ok(Self::CreateTestScenario {
                name: required_str(params, "name")?,
                description: optional_str(params, "description")?.unwrap_or_default(),
                experiment: optional_str(params, "experimentName")?.unwrap_or_default(),
                parameters: optional_object(params, "testParameters")?.unwrap_or_default(),
                tags: optional_str_list(params, "tags")?.unwrap_or_default(),
                initial_state: optional_object(params, "initialState")?.unwrap_or_default(),
            }),
            "list_test_scenarios" => Ok(Self::ListTestScenarios {
                tag: optional_str(params, "tag")?,
            }),
            "get_test_scenario" => Ok(Self::GetTestScenario {
                scenario_id: required_str(params, "scenarioId")?.into(),
            }),
            "update_scenario_state" => Ok(Self::UpdateScenarioState {
                scenario_id: required_str(params, "scenarioId")?.into(),
                phase: optional_str(params, "phase")?
                    .map(|value| value.parse())
                    .transpose()?,
                custom: optional_object(params, "customData")?,
            }),
            "end_test_scenario" => Ok(Self::EndTestScenario {
                scenario_id: required_str(params, "scenarioId")?.into(),
            }),
            "start_session" => Ok(Self::StartSession {
                scenario_id: optional_str(params, "scenarioId")?.map(Into::into),
                role: optional_str(params, "role")?,
                label: optional_str(params, "label")?,
                headless: optional_bool(params, "headless")?,
                url: optional_str(params, "url")?,
                record_screenshots: optional_bool(params, "recordScreenshots")?.unwrap_or(false),
                debug_mode: optional_bool(params, "debugMode")?.unwrap_or(false),
            }),
            "end_session" => Ok(Self::EndSession {
                session_id: required_str(params, "sessionId")?.into(),
            }),
            "list_sessions" => Ok(Self::ListSessions {
                scenario_id: optional_str(params, "scenarioId")?.map(Into::into),
                role: optional_str(params, "role")?,
            }),
            "get_session_state" => Ok(Self::GetSessionState {
                session_id: required_str(params, "sessionId")?.into(),
            }),
            "get_screenshot_history" => Ok(Self::GetScreenshotHistory {
                session_id: required_str(params, "sessionId")?.into(),
            }),
            "get_debug_info" => Ok(Self::GetDebugInfo {
                session_id: required_str(params, "sessionId")?.into(),
                include_console: optional_bool(params, "includeConsole")?.unwrap_or(true),
                include_errors: optional_bool(params, "includeErrors")?.unwrap_or(true),
                include_network: optional_bool(params, "includeNetwork")?.unwrap_or(true),
                limit: optional_u64(params, "limit")?.unwrap_or(50) as usize,
            }),
            "navigate" => Ok(Self::Navigate {
                session_id: required_str(params, "sessionId")?.into(),
                url: required_str(params, "url")?,
                wait: match optional_str(params, "waitUntil")?.as_deref() {
                    None | Some("load") => WaitCondition::Load,
                    Some("domcontentloaded") => WaitCondition::DomContentLoaded,
                    Some("networkidle") => WaitCondition::NetworkIdle,
                    Some(other) => {
                        return Err(RigError::validation(
                            "waitUntil",
                            format!("unknown wait condition `{other}`"),
                        ))
                    }
                },
                timeout_ms: optional_u64(params, "timeoutMs")?,
            }),
            "fill_field" => Ok(Self::FillField {
                session_id: required_str(params, "sessionId")?.into(),
                selector: required_str(params, "selector")?,
                value: required_str(params, "value")?,
            }),
            "click_element" => Ok(Self::ClickElement {
                session_id: required_str(params, "sessionId")?.into(),
                selector: required_str(params, "selector")?,
            }),
            "evaluate_script" => Ok(Self::EvaluateScript {
                session_id: required_str(params, "sessionId")?.into(),
                expression: required_str(params, "expression")?,
                watch: optional_bool(params, "watch")?.unwrap_or(false),
            }),
            "take_screenshot" => Ok(Self::TakeScreenshot {
                session_id: required_str(params, "sessionId")?.into(),
                full_page: optional_bool(params, "fullPage")?.unwrap_or(false),
            }),
            other => Err(RigError::validation(
                "tool",
                format!("unknown tool `{other}`"),
            )),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ToolErrorBody {
    pub kind: String,
    pub message: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ToolResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolErrorBody>,
}

impl ToolResponse {
    pub fn success(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(err: &RigError) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(ToolErrorBody {
                kind: err.kind().to_string(),
                message: err.to_string(),
            }),
        }
    }
}

/// Parse, validate and run one tool invocation against the context.
pub async fn dispatch(ctx: &AppContext, tool: &str, params: Value) -> ToolResponse {
    let params = match params {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        _ => {
            return ToolResponse::failure(&RigError::validation("arguments", "must be an object"))
        }
    };
    let request = match ToolRequest::parse(tool, &params) {
        Ok(request) => request,
        Err(err) => return ToolResponse::failure(&err),
    };
    debug!(tool, "tool invocation");
    match handle(ctx, request).await {
        Ok(data) => ToolResponse::success(data),
        Err(err) => ToolResponse::failure(&err),
    }
}

async fn handle(ctx: &AppContext, request: ToolRequest) -> Result<Value, RigError> {
    match request {
        ToolRequest::CreateTestScenario {
            name,
            description,
            experiment,
            parameters,
            tags,
            initial_state,
        } => scenario::create(ctx, name, description, experiment, parameters, tags, initial_state),
        ToolRequest::ListTestScenarios { tag } => scenario::list(ctx, tag.as_deref()),
        ToolRequest::GetTestScenario { scenario_id } => scenario::get(ctx, &scenario_id),
        ToolRequest::UpdateScenarioState {
            scenario_id,
            phase,
            custom,
        } => scenario::update_state(ctx, &scenario_id, phase, custom),
        ToolRequest::EndTestScenario { scenario_id } => scenario::end(ctx, &scenario_id).await,
        ToolRequest::StartSession {
            scenario_id,
            role,
            label,
            headless,
            url,
            record_screenshots,
            debug_mode,
        } => {
            session::start(
                ctx,
                scenario_id,
                role,
                label,
                headless,
                url,
                record_screenshots,
                debug_mode,
            )
            .await
        }
        ToolRequest::EndSession { session_id } => session::end(ctx, &session_id).await,
        ToolRequest::ListSessions { scenario_id, role } => {
            session::list(ctx, scenario_id, role)
        }
        ToolRequest::GetSessionState { session_id } => session::state(ctx, &session_id).await,
        ToolRequest::GetScreenshotHistory { session_id } => {
            session::screenshot_history(ctx, &session_id)
        }
        ToolRequest::GetDebugInfo {
            session_id,
            include_console,
            include_errors,
            include_network,
            limit,
        } => session::debug_info(
            ctx,
            &session_id,
            include_console,
            include_errors,
            include_network,
            limit,
        ),
        ToolRequest::Navigate {
            session_id,
            url,
            wait,
            timeout_ms,
        } => page::navigate(ctx, &session_id, &url, wait, timeout_ms).await,
        ToolRequest::FillField {
            session_id,
            selector,
            value,
        } => page::fill(ctx, &session_id, &selector, &value).await,
        ToolRequest::ClickElement {
            session_id,
            selector,
        } => page::click(ctx, &session_id, &selector).await,
        ToolRequest::EvaluateScript {
            session_id,
            expression,
            watch,
        } => page::evaluate(ctx, &session_id, &expression, watch).await,
        ToolRequest::TakeScreenshot {
            session_id,
            full_page,
        } => page::screenshot(ctx, &session_id, full_page).await,
    }
}
