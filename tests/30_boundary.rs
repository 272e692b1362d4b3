mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{get, send, system_admin_token, test_app, token, trust_token};
use school_erp::auth::{Role, TokenScope};

#[tokio::test]
async fn tenant_health_requires_token() {
    let app = test_app();
    let res = get(&app.router, "demo.localhost", "/api/tenant/health", None).await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn garbage_token_is_unauthorized() {
    let app = test_app();
    let res = get(&app.router, "demo.localhost", "/api/tenant/health", Some("not-a-jwt")).await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn system_token_is_rejected_on_trust_domain() {
    let app = test_app();
    let admin = system_admin_token();
    let res = get(&app.router, "demo.localhost", "/api/tenant/health", Some(&admin)).await;

    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["error"], "Cross-domain access denied");
}

#[tokio::test]
async fn trust_token_is_rejected_on_other_trust() {
    let app = test_app();
    let demo = trust_token("demo", Role::TrustAdmin);
    let res = get(&app.router, "oakridge.localhost", "/api/tenant/health", Some(&demo)).await;

    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn trust_token_reaches_own_health_check() {
    let app = test_app();
    let demo = trust_token("demo", Role::Staff);
    let res = get(&app.router, "demo.localhost", "/api/tenant/health", Some(&demo)).await;

    // Authorized, but no database server is configured in tests
    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.body["success"], false);
    assert_eq!(res.body["data"]["trust_code"], "demo");
    assert_eq!(res.body["data"]["database"], "school_erp_trust_demo");
    assert_eq!(res.body["data"]["reachable"], false);
}

#[tokio::test]
async fn root_requires_system_admin_token() {
    let app = test_app();

    let anonymous = get(&app.router, "localhost", "/api/root/trusts", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let demo = trust_token("demo", Role::TrustAdmin);
    let trust_scoped = get(&app.router, "localhost", "/api/root/trusts", Some(&demo)).await;
    assert_eq!(trust_scoped.status, StatusCode::FORBIDDEN);

    let staff = token(TokenScope::System, Role::Staff);
    let system_staff = get(&app.router, "localhost", "/api/root/trusts", Some(&staff)).await;
    assert_eq!(system_staff.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn root_is_unavailable_on_trust_domain() {
    let app = test_app();
    let admin = system_admin_token();
    let res = get(&app.router, "demo.localhost", "/api/root/trusts", Some(&admin)).await;

    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn system_admin_lists_and_shows_trusts() {
    let app = test_app();
    let admin = system_admin_token();

    let list = get(&app.router, "localhost", "/api/root/trusts", Some(&admin)).await;
    assert_eq!(list.status, StatusCode::OK);
    let codes: Vec<&str> = list.body["data"]
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|t| t["trust_code"].as_str())
        .collect();
    assert_eq!(codes, vec!["demo", "maroon", "oakridge"]);

    let show = get(&app.router, "localhost", "/api/root/trusts/maroon", Some(&admin)).await;
    assert_eq!(show.status, StatusCode::OK);
    assert_eq!(show.body["data"]["status"], "SUSPENDED");

    let missing = get(&app.router, "localhost", "/api/root/trusts/nosuch", Some(&admin)).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn trust_health_reports_unreachable_databases() {
    let app = test_app();
    let admin = system_admin_token();

    let one = get(&app.router, "localhost", "/api/root/trusts/demo/health", Some(&admin)).await;
    assert_eq!(one.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(one.body["data"]["reachable"], false);
    assert!(one.body["data"]["error"].is_string());

    let all = get(&app.router, "localhost", "/api/root/trusts/health", Some(&admin)).await;
    assert_eq!(all.status, StatusCode::OK);
    let reports = all.body["data"].as_array().expect("array");
    // Suspended trusts are skipped
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r["reachable"] == false));
}

#[tokio::test]
async fn suspending_a_trust_takes_effect_immediately() {
    let app = test_app();
    let admin = system_admin_token();

    let before = get(&app.router, "demo.localhost", "/api/tenant", None).await;
    assert_eq!(before.status, StatusCode::OK);

    let res = send(
        &app.router,
        Method::PUT,
        Some("localhost"),
        "/api/root/trusts/demo/status",
        Some(&admin),
        Some(json!({ "status": "SUSPENDED" })),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["trust"]["status"], "SUSPENDED");
    assert_eq!(res.body["data"]["pool_closed"], false);

    let after = get(&app.router, "demo.localhost", "/api/tenant", None).await;
    assert_eq!(after.status, StatusCode::FORBIDDEN);

    let reactivated = send(
        &app.router,
        Method::PUT,
        Some("localhost"),
        "/api/root/trusts/demo/status",
        Some(&admin),
        Some(json!({ "status": "ACTIVE" })),
    )
    .await;
    assert_eq!(reactivated.status, StatusCode::OK);

    let again = get(&app.router, "demo.localhost", "/api/tenant", None).await;
    assert_eq!(again.status, StatusCode::OK);
}

#[tokio::test]
async fn status_change_for_unknown_trust_is_not_found() {
    let app = test_app();
    let admin = system_admin_token();

    let res = send(
        &app.router,
        Method::PUT,
        Some("localhost"),
        "/api/root/trusts/nosuch/status",
        Some(&admin),
        Some(json!({ "status": "ACTIVE" })),
    )
    .await;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn pool_routes_report_cache_state() {
    let app = test_app();
    let admin = system_admin_token();

    let pools = get(&app.router, "localhost", "/api/root/pools", Some(&admin)).await;
    assert_eq!(pools.status, StatusCode::OK);
    assert_eq!(pools.body["data"], json!([]));

    let evict = send(
        &app.router,
        Method::DELETE,
        Some("localhost"),
        "/api/root/pools/school_erp_trust_demo",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(evict.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn inventory_needs_the_system_database() {
    let app = test_app();
    let admin = system_admin_token();

    let res = get(&app.router, "localhost", "/api/root/databases", Some(&admin)).await;

    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.body["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn mixed_case_scope_matches_its_trust() {
    let app = test_app();
    let scope: TokenScope = "Demo".parse().expect("scope");
    let demo = token(scope, Role::Staff);

    let res = get(&app.router, "demo.localhost", "/api/tenant/health", Some(&demo)).await;

    // Authorized; the database itself is unreachable in tests
    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.body["data"]["trust_code"], "demo");
}
