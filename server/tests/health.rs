use axum::{body::Body, http::Request};
use ratebridge_server::{app_router, AppState, ServerConfig};
use tower::ServiceExt;

#[tokio::test]
async fn health_works_without_api_key() {
    let config = ServerConfig::from_lookup(|key| match key {
        "ENV" => Some("test".to_string()),
        _ => None,
    });
    let app = app_router(AppState::new(config));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = app_router(AppState::new(ServerConfig::default()));

    let response = app
        .oneshot(Request::builder().uri("/rates").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}
