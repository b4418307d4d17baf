use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use werewolf_rules::{PhaseKind, UserId};

use crate::{
    models::game::GameId,
    services::{
        action_service::{self, ActionRequest},
        game_service::{self, ResolveMode},
    },
    state::AppState,
    utils::api_error::ApiError,
};

#[derive(Debug, Deserialize)]
pub struct ViewerQuery {
    pub user_id: UserId,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResolveQuery {
    #[serde(default)]
    pub force: bool,
}

impl ResolveQuery {
    fn mode(&self) -> ResolveMode {
        if self.force {
            ResolveMode::Force
        } else {
            ResolveMode::WhenReady
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdvanceRequest {
    pub to: PhaseKind,
    #[serde(default)]
    pub duration_seconds: Option<u64>,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .nest(
            "/:gameid",
            Router::new()
                // 閲覧者から見た状態
                // curl 'http://localhost:8080/api/game/{gameid}/state?user_id=1'
                .route("/state", get(get_public_state))
                // curl -X POST http://localhost:8080/api/game/{gameid}/actions \
                //   -d '{"actor_id":1,"kind":"wolf_kill","target_id":2}'
                .route("/actions", post(submit_action))
                // 締め切り時は force=true
                .route("/night/resolve", post(resolve_night))
                .route("/day/resolve", post(resolve_day))
                .route("/phase/next", post(advance_phase)),
        )
        .with_state(state)
}

async fn get_public_state(
    State(state): State<AppState>,
    Path(game_id): Path<GameId>,
    Query(viewer): Query<ViewerQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let view = game_service::query_public_state(state, game_id, viewer.user_id).await?;
    Ok((StatusCode::OK, Json(view)))
}

async fn submit_action(
    State(state): State<AppState>,
    Path(game_id): Path<GameId>,
    Json(request): Json<ActionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = action_service::submit_action(state, game_id, request).await?;
    Ok((StatusCode::OK, Json(receipt)))
}

async fn resolve_night(
    State(state): State<AppState>,
    Path(game_id): Path<GameId>,
    Query(query): Query<ResolveQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = game_service::resolve_night(state, game_id, query.mode()).await?;
    // 占い結果は本人にだけ届ける
    Ok((StatusCode::OK, Json(outcome.map(|s| s.redacted()))))
}

async fn resolve_day(
    State(state): State<AppState>,
    Path(game_id): Path<GameId>,
    Query(query): Query<ResolveQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = game_service::resolve_day_vote(state, game_id, query.mode()).await?;
    Ok((StatusCode::OK, Json(outcome)))
}

async fn advance_phase(
    State(state): State<AppState>,
    Path(game_id): Path<GameId>,
    Json(request): Json<AdvanceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let phase = game_service::advance_phase(state, game_id, request.to, request.duration_seconds).await?;
    Ok((StatusCode::OK, Json(phase)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::room_service;
    use crate::utils::test_setup::setup_test_env;
    use axum::{body::to_bytes, body::Body, http::Request};
    use tower::ServiceExt;

    async fn started_game(state: &AppState) -> GameId {
        let room_id = room_service::create_room(state.clone(), None, None)
            .await
            .to_string();
        for id in 1..=5 {
            room_service::join_room(state.clone(), &room_id, id).await.unwrap();
        }
        game_service::start_game(state.clone(), &room_id).await.unwrap()
    }

    #[tokio::test]
    async fn test_public_state_hides_other_roles() {
        setup_test_env();
        let state = AppState::new();
        let game_id = started_game(&state).await;

        let request = Request::builder()
            .uri(format!("/{}/state?user_id=3", game_id))
            .body(Body::empty())
            .unwrap();
        let response = routes(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["phase"], "night");
        assert_eq!(value["phase_number"], 1);
        assert_eq!(value["role_key"], "villager");
        assert_eq!(value["players"].as_array().unwrap().len(), 5);
        assert!(value["players"][0].get("role_key").is_none());
    }

    #[tokio::test]
    async fn test_villager_cannot_kill() {
        setup_test_env();
        let state = AppState::new();
        let game_id = started_game(&state).await;

        let request = Request::builder()
            .method("POST")
            .uri(format!("/{}/actions", game_id))
            .header("content-type", "application/json")
            .body(Body::from(r#"{"actor_id":1,"kind":"wolf_kill","target_id":2}"#))
            .unwrap();
        let response = routes(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_day_resolve_during_first_night_is_conflict() {
        setup_test_env();
        let state = AppState::new();
        let game_id = started_game(&state).await;

        let request = Request::builder()
            .method("POST")
            .uri(format!("/{}/day/resolve", game_id))
            .body(Body::empty())
            .unwrap();
        let response = routes(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_forced_empty_night() {
        setup_test_env();
        let state = AppState::new();
        let game_id = started_game(&state).await;

        let request = Request::builder()
            .method("POST")
            .uri(format!("/{}/night/resolve?force=true", game_id))
            .body(Body::empty())
            .unwrap();
        let response = routes(state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["status"], "resolved");
        assert_eq!(value["summary"], serde_json::json!({}));

        let game = state.games.snapshot(game_id).await.unwrap();
        assert_eq!(game.current_phase().unwrap().number, 2);
    }
}
