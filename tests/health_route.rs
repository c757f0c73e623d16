use catalog_sync::routes::health::{HealthResponse, health_check};
use catalog_sync::sync::SyncConfig;
use catalog_sync::test_support::{TestRocketBuilder, offline_config};
use rocket::http::Status;
use rocket::routes;

#[test]
fn health_endpoint_returns_ok() {
    let client = TestRocketBuilder::new()
        .mount_api_routes(routes![health_check])
        .blocking_client();

    let response = client.get("/api/v1/health").dispatch();
    assert_eq!(response.status(), Status::Ok);

    let payload: HealthResponse = response.into_json().expect("valid JSON payload");
    assert_eq!(payload.status, "ok");
    assert!(!payload.token_configured);
}

#[test]
fn health_endpoint_reports_configured_token() {
    let config = SyncConfig {
        api_token: Some("token".to_string()),
        ..offline_config()
    };
    let client = TestRocketBuilder::new()
        .sync_config(config)
        .mount_api_routes(routes![health_check])
        .blocking_client();

    let payload: HealthResponse = client
        .get("/api/v1/health")
        .dispatch()
        .into_json()
        .expect("valid JSON payload");
    assert!(payload.token_configured);
}
