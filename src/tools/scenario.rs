use serde_json::{json, Map, Value};

use webrig_core_types::{RigError, ScenarioId};
use webrig_registry::{ScenarioMeta, ScenarioPhase, StateUpdate};

use crate::context::AppContext;

pub fn create(
    ctx: &AppContext,
    name: String,
    description: String,
    experiment: String,
    parameters: Map<String, Value>,
    tags: Vec<String>,
    initial_state: Map<String, Value>,
) -> Result<Value, RigError> {
    let meta = ScenarioMeta {
        name,
        description,
        experiment,
        parameters,
        tags,
    };
    let scenario = ctx.scenarios.create(meta, initial_state);
    Ok(json!({ "scenarioId": scenario.id }))
}

pub fn list(ctx: &AppContext, tag: Option<&str>) -> Result<Value, RigError> {
    let summaries: Vec<_> = ctx
        .scenarios
        .list(tag)
        .iter()
        .map(|scenario| scenario.summary())
        .collect();
    Ok(json!({ "scenarios": summaries }))
}

pub fn get(ctx: &AppContext, id: &ScenarioId) -> Result<Value, RigError> {
    let scenario = ctx.scenarios.get(id)?;
    Ok(serde_json::to_value(scenario.summary())
        .map_err(|err| RigError::resource(format!("summary encoding: {err}")))?)
}

pub fn update_state(
    ctx: &AppContext,
    id: &ScenarioId,
    phase: Option<ScenarioPhase>,
    custom: Option<Map<String, Value>>,
) -> Result<Value, RigError> {
    let scenario = ctx.scenarios.get(id)?;
    scenario.update_state(StateUpdate { phase, custom });
    Ok(json!({ "updated": true }))
}

pub async fn end(ctx: &AppContext, id: &ScenarioId) -> Result<Value, RigError> {
    // member ids are snapshotted up front so gate slots can be pruned after
    // the cascade
    let members = ctx.scenarios.get(id)?.member_ids();
    let closed = ctx.cleanup.close_scenario(id).await?;
    for member in &members {
        ctx.gate.forget(member);
    }
    Ok(json!({ "closedSessionCount": closed }))
}
