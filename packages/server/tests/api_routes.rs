//! HTTP routing tests driven through the router without binding a socket.

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use roomcast_server::{bootstrap::Application, config::ServerConfig};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn create_router() -> Router {
    let config = ServerConfig {
        database_path: ":memory:".to_string(),
        ..ServerConfig::default()
    };
    Application::build(&config)
        .await
        .expect("failed to build application")
        .router()
}

fn login_request(username: &str, password: &str) -> Request<Body> {
    let body = json!({ "username": username, "password": password });
    Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn login_as_admin(router: &Router) -> String {
    let response = router
        .clone()
        .oneshot(login_request("admin", &STANDARD.encode("admin")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await["token"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_health_check_is_public() {
    // テスト項目: ヘルスチェックは認証なしで 200 を返す
    // given (前提条件):
    let router = create_router().await;

    // when (操作):
    let response = router
        .oneshot(get_request("/api/health", None))
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn test_login_with_seeded_admin_returns_token() {
    // テスト項目: 初期ユーザー admin/admin でログインできる
    // given (前提条件):
    let router = create_router().await;

    // when (操作):
    let response = router
        .oneshot(login_request("admin", &STANDARD.encode("admin")))
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(!body["token"].as_str().unwrap().is_empty());
    assert!(body["expiresAt"].as_str().unwrap().ends_with("+09:00"));
}

#[tokio::test]
async fn test_login_with_wrong_password_is_unauthorized() {
    // テスト項目: パスワードが違えば 401
    // given (前提条件):
    let router = create_router().await;

    // when (操作):
    let response = router
        .oneshot(login_request("admin", &STANDARD.encode("nope")))
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_with_plain_password_is_bad_request() {
    // テスト項目: base64 でないパスワードは 400
    // given (前提条件):
    let router = create_router().await;

    // when (操作):
    let response = router
        .oneshot(login_request("admin", "not base64!"))
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    // テスト項目: 保護されたルートはトークンなし・不正トークンで 401
    // given (前提条件):
    let router = create_router().await;

    for uri in [
        "/api/server/list",
        "/api/server/info/1",
        "/api/server/room?id=1",
        "/api/auth/info",
    ] {
        // when (操作):
        let missing = router.clone().oneshot(get_request(uri, None)).await.unwrap();
        let invalid = router
            .clone()
            .oneshot(get_request(uri, Some("garbage")))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(invalid.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn test_directory_routes_return_seeded_data() {
    // テスト項目: ログイン後はサーバー・ルームの一覧を取得できる
    // given (前提条件):
    let router = create_router().await;
    let token = login_as_admin(&router).await;

    // when (操作):
    let servers = router
        .clone()
        .oneshot(get_request("/api/server/list", Some(&token)))
        .await
        .unwrap();
    let info = router
        .clone()
        .oneshot(get_request("/api/server/info/1", Some(&token)))
        .await
        .unwrap();
    let rooms = router
        .clone()
        .oneshot(get_request("/api/server/room?id=1", Some(&token)))
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(servers.status(), StatusCode::OK);
    assert_eq!(
        json_body(servers).await,
        json!([{ "id": 1, "name": "Default server", "description": "Default server" }])
    );
    assert_eq!(json_body(info).await["name"], "Default server");
    assert_eq!(
        json_body(rooms).await,
        json!([{ "id": 1, "name": "Default room", "description": "Default room", "serverId": 1 }])
    );
}

#[tokio::test]
async fn test_unknown_server_is_not_found() {
    // テスト項目: 存在しないサーバー ID は 404、数値でない ID は 400
    // given (前提条件):
    let router = create_router().await;
    let token = login_as_admin(&router).await;

    // when (操作):
    let missing = router
        .clone()
        .oneshot(get_request("/api/server/info/42", Some(&token)))
        .await
        .unwrap();
    let malformed = router
        .clone()
        .oneshot(get_request("/api/server/info/abc", Some(&token)))
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_auth_info_returns_username() {
    // テスト項目: 認証情報にはユーザー名と空の権限一覧が入る
    // given (前提条件):
    let router = create_router().await;
    let token = login_as_admin(&router).await;

    // when (操作):
    let response = router
        .oneshot(get_request("/api/auth/info", Some(&token)))
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({ "username": "admin", "authorities": [] })
    );
}

#[tokio::test]
async fn test_relogin_invalidates_previous_token() {
    // テスト項目: 再ログインすると以前のトークンは使えなくなる
    // given (前提条件):
    let router = create_router().await;
    let first = login_as_admin(&router).await;

    // when (操作):
    let second = login_as_admin(&router).await;
    let with_first = router
        .clone()
        .oneshot(get_request("/api/server/list", Some(&first)))
        .await
        .unwrap();
    let with_second = router
        .oneshot(get_request("/api/server/list", Some(&second)))
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(with_first.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(with_second.status(), StatusCode::OK);
}
