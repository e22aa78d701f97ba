//! Combat API - encounters and their initiative rosters

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;

use super::error::ApiError;
use super::AppState;
use crate::combat::{Combat, CombatUpdate, Initiative, InitiativeUpdate, NewCombat, NewInitiative};

/// Deletion response
#[derive(Debug, Serialize)]
struct DeleteResponse {
    success: bool,
}

/// Build the combat router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/combats", get(list_combats).post(create_combat))
        .route("/combats/active", get(active_combat))
        .route(
            "/combats/{id}",
            get(get_combat).put(update_combat).delete(delete_combat),
        )
        .route("/combats/{id}/next-turn", post(next_turn))
        .route("/combats/{id}/initiative", post(add_initiative))
        .route(
            "/combats/{id}/initiative/{initiative_id}",
            put(update_initiative).delete(delete_initiative),
        )
}

/// GET /combats
async fn list_combats(State(state): State<AppState>) -> Result<Json<Vec<Combat>>, ApiError> {
    Ok(Json(state.combats.list().await?))
}

/// POST /combats
async fn create_combat(
    State(state): State<AppState>,
    payload: Result<Json<NewCombat>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let combat = state.combats.create(&req).await?;
    Ok((StatusCode::CREATED, Json(combat)))
}

/// GET /combats/active
async fn active_combat(State(state): State<AppState>) -> Result<Json<Combat>, ApiError> {
    state
        .combats
        .active()
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("no active combat".to_string()))
}

/// GET /combats/{id}
async fn get_combat(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Combat>, ApiError> {
    let Path(id) = path?;
    Ok(Json(state.combats.get(id).await?))
}

/// PUT /combats/{id}
async fn update_combat(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<CombatUpdate>, JsonRejection>,
) -> Result<Json<Combat>, ApiError> {
    let Path(id) = path?;
    let Json(update) = payload?;
    Ok(Json(state.combats.update(id, &update).await?))
}

/// DELETE /combats/{id}
async fn delete_combat(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let Path(id) = path?;
    state.combats.delete(id).await?;
    Ok(Json(DeleteResponse { success: true }))
}

/// POST /combats/{id}/next-turn
async fn next_turn(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Combat>, ApiError> {
    let Path(id) = path?;
    Ok(Json(state.combats.next_turn(id).await?))
}

/// POST /combats/{id}/initiative
async fn add_initiative(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<NewInitiative>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(combat_id) = path?;
    let Json(req) = payload?;
    let entry = state.combats.add_initiative(combat_id, &req).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// PUT /combats/{id}/initiative/{initiative_id}
async fn update_initiative(
    State(state): State<AppState>,
    path: Result<Path<(i64, i64)>, PathRejection>,
    payload: Result<Json<InitiativeUpdate>, JsonRejection>,
) -> Result<Json<Initiative>, ApiError> {
    let Path((combat_id, initiative_id)) = path?;
    let Json(update) = payload?;
    let entry = state
        .combats
        .update_initiative(combat_id, initiative_id, &update)
        .await?;
    Ok(Json(entry))
}

/// DELETE /combats/{id}/initiative/{initiative_id}
async fn delete_initiative(
    State(state): State<AppState>,
    path: Result<Path<(i64, i64)>, PathRejection>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let Path((combat_id, initiative_id)) = path?;
    state
        .combats
        .delete_initiative(combat_id, initiative_id)
        .await?;
    Ok(Json(DeleteResponse { success: true }))
}
