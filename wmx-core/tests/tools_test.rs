//! JSON tool boundary end to end

mod common;

use common::*;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

use wmx_core::catalog::FixtureCatalog;
use wmx_core::config::Settings;
use wmx_core::install::{Installer, WorkerPool};
use wmx_core::Marketplace;

const X_URL: &str = "https://example/x.git";

struct Fixture {
    _remote: TempDir,
    _temp_root: TempDir,
    project: TempDir,
    marketplace: Marketplace,
}

fn fixture() -> Fixture {
    init_test_logging();

    let remote = tempfile::tempdir().unwrap();
    write_ready_component(remote.path());
    let temp_root = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();

    let settings = Settings {
        component_base_path: project.path().join("components"),
        ..Default::default()
    };
    let pool = WorkerPool::default();
    let retriever = Arc::new(FakeRetriever::new().with_repository(X_URL, remote.path()));
    let installer =
        Installer::new(&settings, retriever, pool.clone()).with_temp_root(temp_root.path());
    let catalog = Arc::new(FixtureCatalog::new(vec![
        component("x-id", "X", X_URL),
        component("y-id", "Y", "https://example/y.git"),
    ]));

    Fixture {
        _remote: remote,
        _temp_root: temp_root,
        project,
        marketplace: Marketplace::new(settings, catalog, installer, pool),
    }
}

async fn call(f: &Fixture, request: Value) -> Value {
    f.marketplace.handle_value(&request).await
}

#[tokio::test]
async fn test_search_response_shape() {
    let f = fixture();

    let response = call(&f, json!({"tool": "search", "arguments": {"query": "x component", "limit": 99}})).await;

    assert_eq!(response["success"], true);
    assert_eq!(response["total_found"], 1);
    assert_eq!(response["search_params"]["limit"], 50);
    let summary = &response["components"][0];
    assert_eq!(summary["id"], "x-id");
    assert_eq!(summary["author"], "Test Author");
    assert_eq!(summary["repository_url"], X_URL);
}

#[tokio::test]
async fn test_get_details_not_found() {
    let f = fixture();

    let response = call(&f, json!({"tool": "get_details", "arguments": {"component_id": "nope"}})).await;

    assert_eq!(response["success"], false);
    assert_eq!(response["error"], "Component with ID 'nope' not found");
    assert_eq!(response["error_kind"], "not_found");
    assert!(response["message"].is_string());
}

#[tokio::test]
async fn test_install_then_list() {
    let f = fixture();

    let installed = call(&f, json!({"tool": "install", "arguments": {"component_id": "x-id"}})).await;
    assert_eq!(installed["success"], true, "{installed}");
    assert_eq!(installed["component_id"], "x-id");
    assert_eq!(installed["version"], "2.0.1");
    assert_eq!(installed["repository_url"], X_URL);
    assert_eq!(installed["author"], "Test Author");
    assert!(installed["files_installed"]
        .as_array()
        .unwrap()
        .contains(&json!("X/index.ts")));

    let again = call(&f, json!({"tool": "install", "arguments": {"component_id": "x-id"}})).await;
    assert_eq!(again["success"], false);
    assert_eq!(again["error_kind"], "already_exists");

    let listing = call(&f, json!({"tool": "list_installed"})).await;
    assert_eq!(listing["success"], true);
    assert_eq!(listing["total_count"], 1);
    assert_eq!(listing["installed_components"][0]["name"], "X");
    assert_eq!(listing["installed_components"][0]["has_metadata"], true);
    assert_eq!(listing["installed_components"][0]["id"], "x-id");
}

#[tokio::test]
async fn test_install_retrieval_failure_is_structured() {
    let f = fixture();
    let target = f.project.path().join("elsewhere");

    let response = call(
        &f,
        json!({"tool": "install", "arguments": {"component_id": "y-id", "target_path": target}}),
    )
    .await;

    assert_eq!(response["success"], false);
    assert_eq!(response["error_kind"], "retrieval_failure");
    assert_eq!(response["message"], "Failed to install component Y");
    assert!(!target.join("Y").exists());
}

#[tokio::test]
async fn test_list_missing_directory() {
    let f = fixture();

    let response = call(&f, json!({"tool": "list_installed", "arguments": {"base_path": "/no/such/dir"}})).await;

    assert_eq!(response["success"], true);
    assert_eq!(response["total_count"], 0);
    assert!(response["message"]
        .as_str()
        .unwrap()
        .starts_with("Components directory not found"));
}

#[tokio::test]
async fn test_validate_and_publish_tools() {
    let f = fixture();
    let component_dir = f.project.path().join("MyButton");
    write_ready_component(&component_dir);

    let report = call(&f, json!({"tool": "validate", "arguments": {"component_path": component_dir}})).await;
    assert_eq!(report["valid"], true);
    assert_eq!(report["marketplace_ready"], true);
    assert_eq!(report["requirements_met"]["icon.svg"], true);

    let plan = call(
        &f,
        json!({"tool": "prepare_for_publishing", "arguments": {"component_path": component_dir, "tags": ["x"]}}),
    )
    .await;
    assert_eq!(plan["success"], true);
    assert_eq!(plan["component"]["tags"], json!(["x"]));
    assert_eq!(plan["files_to_publish"][0]["type"], "markdown");

    let dry_run = call(&f, json!({"tool": "publish_dry_run", "arguments": {"component_path": component_dir}})).await;
    assert_eq!(dry_run["success"], true);
    assert_eq!(dry_run["publishing_details"]["dry_run"], true);
    assert!(dry_run["component_id"]
        .as_str()
        .unwrap()
        .starts_with("comp_rnbutton_"));
}

#[tokio::test]
async fn test_not_ready_publish_carries_issues() {
    let f = fixture();
    let component_dir = f.project.path().join("Broken");
    write_files(&component_dir, &[("wmconfig.json", VALID_WMCONFIG)]);

    let plan = call(
        &f,
        json!({"tool": "prepare_for_publishing", "arguments": {"component_path": component_dir}}),
    )
    .await;
    assert_eq!(plan["success"], false);
    assert_eq!(plan["error"], "Component is not ready for publishing");
    assert_eq!(plan["validation_issues"].as_array().unwrap().len(), 2);

    let dry_run = call(&f, json!({"tool": "publish_dry_run", "arguments": {"component_path": component_dir}})).await;
    assert_eq!(dry_run["success"], false);
    assert_eq!(dry_run["step"], "preparation");
}

#[tokio::test]
async fn test_template_tool() {
    let f = fixture();

    let response = call(&f, json!({"tool": "get_publishing_template"})).await;

    assert_eq!(response["success"], true);
    assert_eq!(response["template"]["wmconfig_json"]["name"], "MyComponent");
    assert_eq!(response["template"]["files_to_create"].as_array().unwrap().len(), 6);
    assert_eq!(response["instructions"].as_array().unwrap().len(), 9);
}

#[tokio::test]
async fn test_malformed_requests_never_panic() {
    let f = fixture();

    for request in [
        json!({"tool": "rm_rf"}),
        json!({"arguments": {}}),
        json!({"tool": "install", "arguments": {"force_overwrite": "yes"}}),
        json!("just a string"),
    ] {
        let response = call(&f, request).await;
        assert_eq!(response["success"], false);
        assert_eq!(response["error_kind"], "invalid_request");
        assert_eq!(response["message"], "Invalid tool request");
    }
}

#[tokio::test]
async fn test_inflight_retrievals_do_not_block_local_tools() {
    init_test_logging();
    let component_dir = tempfile::tempdir().unwrap();
    write_ready_component(component_dir.path());
    let project = tempfile::tempdir().unwrap();

    let marketplace = Marketplace::from_settings(Settings::default()).unwrap();

    // Every retrieval slot taken, as with that many clones hanging on a remote
    let slots = marketplace.retrieval_slots();
    let mut held = Vec::new();
    for _ in 0..slots.size() {
        held.push(slots.acquire().await.unwrap());
    }

    let requests = [
        json!({"tool": "validate", "arguments": {"component_path": component_dir.path()}}),
        json!({"tool": "list_installed", "arguments": {"base_path": project.path()}}),
        json!({"tool": "prepare_for_publishing", "arguments": {"component_path": component_dir.path()}}),
    ];
    for request in requests {
        let response = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            marketplace.handle_value(&request),
        )
        .await
        .unwrap_or_else(|_| panic!("{} stalled behind retrievals", request["tool"]));
        // validate reports carry no success flag
        assert!(response["success"].as_bool().unwrap_or(true), "{response}");
    }

    drop(held);
}
