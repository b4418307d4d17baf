use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use werewolf_rules::UserId;

use crate::{
    services::{game_service, room_service},
    state::AppState,
    utils::{api_error::ApiError, websocket},
};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    pub name: Option<String>,
    pub max_players: Option<usize>,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        // ルーム作成
        // curl -X POST http://localhost:8080/api/room/create -H 'content-type: application/json' -d '{}'
        .route("/create", post(create_room))
        // ルーム一覧取得
        // curl http://localhost:8080/api/room/rooms
        .route("/rooms", get(get_rooms))
        // 特定のルーム情報取得
        // curl http://localhost:8080/api/room/{roomid}
        .route("/:roomid", get(get_room_info))
        // ルーム参加
        // curl -X POST http://localhost:8080/api/room/{roomid}/join/{playerid}
        .route("/:roomid/join/:playerid", post(join_room))
        // ルーム脱退
        // curl -X POST http://localhost:8080/api/room/{roomid}/leave/{playerid}
        .route("/:roomid/leave/:playerid", post(leave_room))
        // 役職構成の設定
        // curl -X PUT http://localhost:8080/api/room/{roomid}/roles -d '{"werewolf":1,"seer":1}'
        .route("/:roomid/roles", put(configure_roles))
        // ゲーム開始
        // curl -X POST http://localhost:8080/api/room/{roomid}/start
        .route("/:roomid/start", post(start_game))
        // ゲーム終了
        // curl -X POST http://localhost:8080/api/room/{roomid}/end
        .route("/:roomid/end", post(end_game))
        // ルーム削除
        // curl -X DELETE http://localhost:8080/api/room/{roomid}/delete
        .route("/:roomid/delete", delete(delete_room))
        // WebSocket接続
        // user_id を付けると本人宛ての情報も届く
        // websocat 'ws://localhost:8080/api/room/{roomid}/ws?user_id={playerid}'
        .route("/:roomid/ws", get(websocket::handler))
        .with_state(state)
}

pub async fn create_room(
    State(state): State<AppState>,
    body: Option<Json<CreateRoomRequest>>,
) -> impl IntoResponse {
    let Json(request) = body.unwrap_or_default();
    let room_id = room_service::create_room(state, request.name, request.max_players).await;
    (
        StatusCode::OK,
        Json(json!({ "success": true, "room_id": room_id.to_string() })),
    )
}

async fn get_rooms(State(state): State<AppState>) -> impl IntoResponse {
    let rooms = room_service::get_rooms(&state).await;
    (StatusCode::OK, Json(rooms))
}

async fn get_room_info(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let room = room_service::get_room_info(&state, &room_id).await?;
    Ok((StatusCode::OK, Json(room)))
}

pub async fn join_room(
    State(state): State<AppState>,
    Path((room_id, player_id)): Path<(String, UserId)>,
) -> Result<impl IntoResponse, ApiError> {
    room_service::join_room(state, &room_id, player_id).await?;
    Ok((StatusCode::OK, Json(json!({ "success": true }))))
}

pub async fn leave_room(
    State(state): State<AppState>,
    Path((room_id, player_id)): Path<(String, UserId)>,
) -> Result<impl IntoResponse, ApiError> {
    room_service::leave_room(state, &room_id, player_id).await?;
    Ok((StatusCode::OK, Json(json!({ "success": true }))))
}

async fn configure_roles(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(role_config): Json<BTreeMap<String, u32>>,
) -> Result<impl IntoResponse, ApiError> {
    room_service::configure_roles(state, &room_id, role_config).await?;
    Ok((StatusCode::OK, Json(json!({ "success": true }))))
}

async fn start_game(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let game_id = game_service::start_game(state, &room_id).await?;
    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "game_id": game_id })),
    ))
}

async fn end_game(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let game_id = game_service::end_game(state, &room_id).await?;
    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "game_id": game_id })),
    ))
}

async fn delete_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> impl IntoResponse {
    if room_service::delete_room(state, &room_id).await {
        (StatusCode::OK, Json(json!({ "success": true })))
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": format!("room {} not found", room_id) })),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::room::Room;
    use axum::{body::to_bytes, body::Body, http::Request};
    use std::collections::HashMap;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_create_room() {
        let state = AppState::new();
        let app = routes(state);

        let request = Request::builder()
            .method("POST")
            .uri("/create")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"name":"moonlit","max_players":6}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["room_id"], "1");
    }

    #[tokio::test]
    async fn test_get_rooms() {
        let state = AppState::new();
        let app = routes(state.clone());

        // テスト用のルームを作成
        let room_id = room_service::create_room(state, None, None).await;

        let request = Request::builder()
            .method("GET")
            .uri("/rooms")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let rooms: HashMap<String, Room> =
            serde_json::from_slice(&body).expect("Failed to parse response body");
        assert!(rooms.contains_key(&room_id.to_string()));
    }

    #[tokio::test]
    async fn test_unknown_room_is_404() {
        let app = routes(AppState::new());
        let request = Request::builder()
            .method("POST")
            .uri("/99/join/1")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["kind"], "not_found");
    }

    #[tokio::test]
    async fn test_start_needs_enough_players() {
        let state = AppState::new();
        let room_id = room_service::create_room(state.clone(), None, None).await;
        room_service::join_room(state.clone(), &room_id.to_string(), 1)
            .await
            .unwrap();

        let request = Request::builder()
            .method("POST")
            .uri(format!("/{}/start", room_id))
            .body(Body::empty())
            .unwrap();
        let response = routes(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
