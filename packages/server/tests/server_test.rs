use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use werewolf_server::{app, models::config::EngineConfig, state::AppState};

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn seeded_app() -> Router {
    let config = EngineConfig {
        role_seed: Some(11),
        ..EngineConfig::default()
    };
    app::create_app_with_state(AppState::with_config(config))
}

#[tokio::test]
async fn test_create_and_join_room() {
    let app = seeded_app();

    let (status, body) = call(&app, "POST", "/api/room/create", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let room_id = body["room_id"].as_str().unwrap().to_string();

    let (status, _) = call(&app, "POST", &format!("/api/room/{}/join/1", room_id), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = call(&app, "POST", &format!("/api/room/{}/join/1", room_id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["kind"], "state");

    let (status, body) = call(&app, "GET", &format!("/api/room/{}", room_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["members"], json!([1]));
}

#[tokio::test]
async fn test_unknown_role_is_rejected() {
    let app = seeded_app();
    let (_, body) = call(&app, "POST", "/api/room/create", Some(json!({}))).await;
    let room_id = body["room_id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &app,
        "PUT",
        &format!("/api/room/{}/roles", room_id),
        Some(json!({ "werewolf": 1, "dragon": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "config");
}

#[tokio::test]
async fn test_full_round_over_http() {
    let app = seeded_app();
    let (_, body) = call(&app, "POST", "/api/room/create", Some(json!({}))).await;
    let room_id = body["room_id"].as_str().unwrap().to_string();
    for id in 1..=5 {
        call(&app, "POST", &format!("/api/room/{}/join/{}", room_id, id), None).await;
    }
    let (status, _) = call(
        &app,
        "PUT",
        &format!("/api/room/{}/roles", room_id),
        Some(json!({ "werewolf": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, "POST", &format!("/api/room/{}/start", room_id), None).await;
    assert_eq!(status, StatusCode::OK);
    let game_id = body["game_id"].as_u64().unwrap();

    // 各プレイヤーの視点で人狼を探す
    let mut wolf = None;
    for id in 1..=5u64 {
        let (_, view) = call(
            &app,
            "GET",
            &format!("/api/game/{}/state?user_id={}", game_id, id),
            None,
        )
        .await;
        if view["role_key"] == "werewolf" {
            wolf = Some(id);
        }
    }
    let wolf = wolf.unwrap();
    let victim = if wolf == 1 { 2 } else { 1 };

    let (status, receipt) = call(
        &app,
        "POST",
        &format!("/api/game/{}/actions", game_id),
        Some(json!({ "actor_id": wolf, "kind": "wolf_kill", "target_id": victim, "phase_number": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["phase_closed"], true);

    let (status, outcome) = call(
        &app,
        "POST",
        &format!("/api/game/{}/night/resolve", game_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["status"], "already_resolved");
    assert_eq!(outcome["summary"]["killed"], victim);

    // 死者は投票できない
    let (status, _) = call(
        &app,
        "POST",
        &format!("/api/game/{}/actions", game_id),
        Some(json!({ "actor_id": victim, "kind": "day_vote", "target_id": wolf })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, outcome) = call(
        &app,
        "POST",
        &format!("/api/game/{}/day/resolve?force=true", game_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["status"], "resolved");
    assert_eq!(outcome["summary"]["exiled"], Value::Null);

    let (status, phase) = call(
        &app,
        "POST",
        &format!("/api/game/{}/phase/next", game_id),
        Some(json!({ "to": "day" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(phase["number"], 4);

    let (status, _) = call(&app, "POST", &format!("/api/room/{}/end", room_id), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/game/{}/phase/next", game_id),
        Some(json!({ "to": "night" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "state");
}

#[tokio::test]
async fn test_unknown_game_is_404() {
    let app = seeded_app();
    let (status, body) = call(&app, "GET", "/api/game/42/state?user_id=1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn test_oversized_role_counts_and_durations_are_rejected() {
    let app = seeded_app();
    let (_, body) = call(&app, "POST", "/api/room/create", Some(json!({}))).await;
    let room_id = body["room_id"].as_str().unwrap().to_string();
    for id in 1..=5 {
        call(&app, "POST", &format!("/api/room/{}/join/{}", room_id, id), None).await;
    }

    let (status, body) = call(
        &app,
        "PUT",
        &format!("/api/room/{}/roles", room_id),
        Some(json!({ "werewolf": u32::MAX })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "config");

    let (status, body) = call(&app, "POST", &format!("/api/room/{}/start", room_id), None).await;
    assert_eq!(status, StatusCode::OK);
    let game_id = body["game_id"].as_u64().unwrap();

    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/game/{}/phase/next", game_id),
        Some(json!({ "to": "day", "duration_seconds": 10_000_000_000_000_000u64 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "config");

    // 失敗した遷移は何も変えない
    let (_, view) = call(
        &app,
        "GET",
        &format!("/api/game/{}/state?user_id=1", game_id),
        None,
    )
    .await;
    assert_eq!(view["phase"], "night");
    assert_eq!(view["phase_number"], 1);
}
