use serde_json::{json, Value};
use tempfile::TempDir;

use webrig_cli::tools::ToolResponse;
use webrig_cli::{dispatch, AppContext, RigConfig};

fn ctx() -> (AppContext, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = RigConfig {
        artifacts_root: dir.path().to_path_buf(),
        navigation_timeout_ms: 2_000,
        ..RigConfig::default()
    };
    (AppContext::with_stub(config), dir)
}

async fn call(ctx: &AppContext, tool: &str, args: Value) -> ToolResponse {
    dispatch(ctx, tool, args).await
}

fn data(response: &ToolResponse) -> &Value {
    assert!(
        response.ok,
        "expected success, got {:?}",
        response.error
    );
    response.data.as_ref().expect("data")
}

fn error_kind(response: &ToolResponse) -> &str {
    assert!(!response.ok, "expected failure, got {:?}", response.data);
    &response.error.as_ref().expect("error").kind
}

async fn start_member(ctx: &AppContext, scenario: &str, role: &str, label: &str) -> String {
    let response = call(
        ctx,
        "start_session",
        json!({ "scenarioId": scenario, "role": role, "label": label }),
    )
    .await;
    data(&response)["sessionId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn end_to_end_scenario_lifecycle() {
    let (ctx, _dir) = ctx();

    let created = call(&ctx, "create_test_scenario", json!({ "name": "T" })).await;
    let scenario = data(&created)["scenarioId"].as_str().unwrap().to_string();

    let admin = start_member(&ctx, &scenario, "admin", "A").await;
    let participant = start_member(&ctx, &scenario, "participant", "P1").await;
    assert_ne!(admin, participant);

    let summary = call(&ctx, "get_test_scenario", json!({ "scenarioId": scenario })).await;
    assert_eq!(data(&summary)["memberCount"], json!(2));

    let ended = call(&ctx, "end_session", json!({ "sessionId": admin })).await;
    assert_eq!(data(&ended)["closed"], json!(true));

    let summary = call(&ctx, "get_test_scenario", json!({ "scenarioId": scenario })).await;
    let members = data(&summary)["members"].as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["session"], json!(participant));

    let ended = call(&ctx, "end_test_scenario", json!({ "scenarioId": scenario })).await;
    assert_eq!(data(&ended)["closedSessionCount"], json!(1));

    let gone = call(&ctx, "get_test_scenario", json!({ "scenarioId": scenario })).await;
    assert_eq!(error_kind(&gone), "not_found");
    let gone = call(&ctx, "get_session_state", json!({ "sessionId": participant })).await;
    assert_eq!(error_kind(&gone), "not_found");
}

#[tokio::test]
async fn cascading_close_counts_every_member() {
    let (ctx, _dir) = ctx();
    let created = call(&ctx, "create_test_scenario", json!({ "name": "cascade" })).await;
    let scenario = data(&created)["scenarioId"].as_str().unwrap().to_string();
    start_member(&ctx, &scenario, "admin", "A").await;
    start_member(&ctx, &scenario, "participant", "P1").await;

    let ended = call(&ctx, "end_test_scenario", json!({ "scenarioId": scenario })).await;
    assert_eq!(data(&ended)["closedSessionCount"], json!(2));

    let listed = call(&ctx, "list_sessions", json!({})).await;
    assert!(data(&listed)["sessions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn start_session_with_unknown_scenario_is_lenient() {
    let (ctx, _dir) = ctx();
    let response = call(
        &ctx,
        "start_session",
        json!({ "scenarioId": "no-such-scenario", "role": "admin" }),
    )
    .await;
    let session = data(&response)["sessionId"].as_str().unwrap().to_string();

    // the session is usable despite the dangling link
    let state = call(&ctx, "get_session_state", json!({ "sessionId": session })).await;
    assert_eq!(data(&state)["url"], json!("about:blank"));

    // and it is unscoped: filtering by the bogus scenario finds nothing
    let listed = call(
        &ctx,
        "list_sessions",
        json!({ "scenarioId": "no-such-scenario" }),
    )
    .await;
    assert!(data(&listed)["sessions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn ending_a_session_twice_reports_not_found() {
    let (ctx, _dir) = ctx();
    let started = call(&ctx, "start_session", json!({})).await;
    let session = data(&started)["sessionId"].as_str().unwrap().to_string();

    let first = call(&ctx, "end_session", json!({ "sessionId": session })).await;
    assert!(first.ok);
    let second = call(&ctx, "end_session", json!({ "sessionId": session })).await;
    assert_eq!(error_kind(&second), "not_found");
}

#[tokio::test]
async fn update_state_merges_custom_data_key_by_key() {
    let (ctx, _dir) = ctx();
    let created = call(&ctx, "create_test_scenario", json!({ "name": "merge" })).await;
    let scenario = data(&created)["scenarioId"].as_str().unwrap().to_string();

    for custom in [json!({ "a": 1 }), json!({ "b": 2 })] {
        let updated = call(
            &ctx,
            "update_scenario_state",
            json!({ "scenarioId": scenario, "customData": custom }),
        )
        .await;
        assert!(updated.ok);
    }
    let summary = call(&ctx, "get_test_scenario", json!({ "scenarioId": scenario })).await;
    assert_eq!(data(&summary)["customData"], json!({ "a": 1, "b": 2 }));

    call(
        &ctx,
        "update_scenario_state",
        json!({ "scenarioId": scenario, "customData": { "a": 3 } }),
    )
    .await;
    let summary = call(&ctx, "get_test_scenario", json!({ "scenarioId": scenario })).await;
    assert_eq!(data(&summary)["customData"], json!({ "a": 3, "b": 2 }));
}

#[tokio::test]
async fn phase_updates_apply_and_reject_unknown_values() {
    let (ctx, _dir) = ctx();
    let created = call(&ctx, "create_test_scenario", json!({ "name": "phases" })).await;
    let scenario = data(&created)["scenarioId"].as_str().unwrap().to_string();

    let updated = call(
        &ctx,
        "update_scenario_state",
        json!({ "scenarioId": scenario, "phase": "running" }),
    )
    .await;
    assert!(updated.ok);
    let summary = call(&ctx, "get_test_scenario", json!({ "scenarioId": scenario })).await;
    assert_eq!(data(&summary)["phase"], json!("running"));

    let rejected = call(
        &ctx,
        "update_scenario_state",
        json!({ "scenarioId": scenario, "phase": "exploded" }),
    )
    .await;
    assert_eq!(error_kind(&rejected), "validation");
}

#[tokio::test]
async fn validation_errors_name_the_field() {
    let (ctx, _dir) = ctx();
    let response = call(&ctx, "create_test_scenario", json!({})).await;
    assert_eq!(error_kind(&response), "validation");
    assert!(response.error.as_ref().unwrap().message.contains("name"));

    let response = call(&ctx, "navigate", json!({ "sessionId": "x" })).await;
    assert!(response.error.as_ref().unwrap().message.contains("url"));

    let response = call(&ctx, "bogus_tool", json!({})).await;
    assert_eq!(error_kind(&response), "validation");
}

#[tokio::test]
async fn navigation_updates_state_and_history() {
    let (ctx, _dir) = ctx();
    let started = call(&ctx, "start_session", json!({})).await;
    let session = data(&started)["sessionId"].as_str().unwrap().to_string();

    let navigated = call(
        &ctx,
        "navigate",
        json!({ "sessionId": session, "url": "https://example.com/form" }),
    )
    .await;
    assert!(navigated.ok);

    let state = call(&ctx, "get_session_state", json!({ "sessionId": session })).await;
    assert_eq!(data(&state)["url"], json!("https://example.com/form"));

    let debug = call(&ctx, "get_debug_info", json!({ "sessionId": session })).await;
    let history = data(&debug)["history"].as_array().unwrap();
    assert!(history
        .iter()
        .any(|entry| entry["tool"] == json!("navigate") && entry["ok"] == json!(true)));
}

#[tokio::test]
async fn screenshots_land_in_the_session_directory() {
    let (ctx, dir) = ctx();
    let started = call(
        &ctx,
        "start_session",
        json!({ "recordScreenshots": true }),
    )
    .await;
    let session = data(&started)["sessionId"].as_str().unwrap().to_string();

    // scoped creation happened at session start
    assert!(dir.path().join(&session).is_dir());

    let shot = call(&ctx, "take_screenshot", json!({ "sessionId": session })).await;
    let path = data(&shot)["path"].as_str().unwrap().to_string();
    assert!(path.starts_with(dir.path().join(&session).to_str().unwrap()));
    assert!(std::path::Path::new(&path).is_file());

    let history = call(
        &ctx,
        "get_screenshot_history",
        json!({ "sessionId": session }),
    )
    .await;
    assert_eq!(data(&history)["screenshots"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn watched_expressions_show_up_in_debug_info() {
    let (ctx, _dir) = ctx();
    let started = call(&ctx, "start_session", json!({ "debugMode": true })).await;
    let session = data(&started)["sessionId"].as_str().unwrap().to_string();

    let evaluated = call(
        &ctx,
        "evaluate_script",
        json!({ "sessionId": session, "expression": "window.appState", "watch": true }),
    )
    .await;
    assert!(evaluated.ok);

    let debug = call(&ctx, "get_debug_info", json!({ "sessionId": session })).await;
    assert_eq!(
        data(&debug)["watched"],
        json!(["window.appState"])
    );
}

#[tokio::test]
async fn list_test_scenarios_filters_by_tag() {
    let (ctx, _dir) = ctx();
    call(
        &ctx,
        "create_test_scenario",
        json!({ "name": "smoke-run", "tags": ["smoke"] }),
    )
    .await;
    call(&ctx, "create_test_scenario", json!({ "name": "other" })).await;

    let listed = call(&ctx, "list_test_scenarios", json!({ "tag": "smoke" })).await;
    let scenarios = data(&listed)["scenarios"].as_array().unwrap();
    assert_eq!(scenarios.len(), 1);
    assert_eq!(scenarios[0]["name"], json!("smoke-run"));
}
