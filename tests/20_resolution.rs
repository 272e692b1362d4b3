mod common;

use axum::http::{Method, StatusCode};
use common::{get, send, test_app};

#[tokio::test]
async fn bare_base_domain_is_system() {
    let app = test_app();
    let res = get(&app.router, "localhost:3000", "/api/tenant", None).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["success"], true);
    assert_eq!(res.body["data"]["scope"], "system");
}

#[tokio::test]
async fn reserved_subdomain_and_ip_are_system() {
    let app = test_app();

    let www = get(&app.router, "www.localhost", "/api/tenant", None).await;
    assert_eq!(www.body["data"]["scope"], "system");

    let ip = get(&app.router, "127.0.0.1:3000", "/api/tenant", None).await;
    assert_eq!(ip.status, StatusCode::OK);
    assert_eq!(ip.body["data"]["scope"], "system");
}

#[tokio::test]
async fn trust_subdomain_resolves_to_trust() {
    let app = test_app();
    let res = get(&app.router, "Demo.LocalHost:3000", "/api/tenant", None).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["scope"], "trust");
    assert_eq!(res.body["data"]["trust_code"], "demo");
    assert_eq!(res.body["data"]["subdomain"], "demo");
}

#[tokio::test]
async fn unknown_subdomain_is_not_found() {
    let app = test_app();
    let res = get(&app.router, "nosuch.localhost", "/api/tenant", None).await;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["success"], false);
    assert_eq!(res.body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn suspended_trust_is_forbidden() {
    let app = test_app();
    let res = get(&app.router, "maroon.localhost", "/api/tenant", None).await;

    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["success"], false);
}

#[tokio::test]
async fn nested_subdomain_is_rejected() {
    let app = test_app();
    let res = get(&app.router, "a.demo.localhost", "/api/tenant", None).await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn foreign_domain_is_not_found() {
    let app = test_app();
    let res = get(&app.router, "demo.example.org", "/api/tenant", None).await;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_host_is_bad_request() {
    let app = test_app();
    let res = send(&app.router, Method::GET, None, "/api/tenant", None, None).await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["success"], false);
}

#[tokio::test]
async fn repeated_lookups_hit_the_cache() {
    let app = test_app();

    for _ in 0..3 {
        let res = get(&app.router, "oakridge.localhost", "/api/tenant", None).await;
        assert_eq!(res.status, StatusCode::OK);
    }

    assert_eq!(app.store.lookups(), 1);
}

#[tokio::test]
async fn public_routes_skip_resolution() {
    let app = test_app();
    let res = get(&app.router, "nosuch.localhost", "/", None).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["name"], "School ERP");
}
