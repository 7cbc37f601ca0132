//! Interactive watch sessions
//!
//! A session holds one viewer's page controller on the server. Clients
//! change the selection with small POSTs and poll `/player` for the player
//! state of whatever is selected at that moment.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::anime::ProviderQuery;
use super::{json_error, upstream_error, JsonError};
use crate::models::{PlaybackMode, PlayerArea, SessionView};
use crate::services::sessions::SessionHandle;
use crate::services::watch::WatchController;
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectEpisodeRequest {
    pub episode_id: String,
}

#[derive(Deserialize)]
pub struct ModeRequest {
    pub mode: PlaybackMode,
}

#[derive(Deserialize)]
pub struct ProviderRequest {
    pub provider: String,
}

#[derive(Serialize)]
pub struct NextEpisodeResponse {
    pub advanced: bool,
    pub session: SessionView,
}

fn session_view(session_id: Uuid, controller: &WatchController) -> SessionView {
    SessionView {
        session_id,
        anime_id: controller.info().id.clone(),
        provider: controller.provider().to_string(),
        episode_id: controller.current_episode().map(|e| e.id.clone()),
        episode_index: controller.current_index(),
        episode_count: controller.info().episodes.len(),
        mode: controller.requested_mode(),
        has_next: controller.has_next(),
    }
}

async fn find_session(state: &AppState, session_id: &Uuid) -> Result<SessionHandle, JsonError> {
    state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| json_error(StatusCode::NOT_FOUND, "Session not found or expired"))
}

/// POST /api/watch/:id/sessions?provider=<name> - start a session on the first episode
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ProviderQuery>,
) -> Result<impl IntoResponse, JsonError> {
    let provider = state.config.resolve_provider(query.provider.as_deref());
    let info = state.anime_info(&id, &provider).await.map_err(|e| {
        tracing::warn!("Cannot start session for {} ({}): {}", id, provider, e);
        upstream_error(&e)
    })?;

    let (session_id, handle) = state.sessions.create(WatchController::new(info, provider)).await;
    let view = session_view(session_id, &*handle.lock().await);

    tracing::info!("Session {} created for anime {}", session_id, view.anime_id);
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/sessions/:session_id
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, JsonError> {
    let handle = find_session(&state, &session_id).await?;
    let controller = handle.lock().await;
    Ok(Json(session_view(session_id, &controller)))
}

/// DELETE /api/sessions/:session_id
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, JsonError> {
    if state.sessions.remove(&session_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(json_error(StatusCode::NOT_FOUND, "Session not found or expired"))
    }
}

/// POST /api/sessions/:session_id/episode - replace the current episode
pub async fn select_episode(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<SelectEpisodeRequest>,
) -> Result<Json<SessionView>, JsonError> {
    let handle = find_session(&state, &session_id).await?;
    let mut controller = handle.lock().await;

    controller
        .select_episode(&payload.episode_id)
        .map_err(|e| json_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    Ok(Json(session_view(session_id, &controller)))
}

/// POST /api/sessions/:session_id/next - advance if there is a following episode
pub async fn next_episode(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<NextEpisodeResponse>, JsonError> {
    let handle = find_session(&state, &session_id).await?;
    let mut controller = handle.lock().await;

    let advanced = controller.advance_to_next_episode();
    Ok(Json(NextEpisodeResponse {
        advanced,
        session: session_view(session_id, &controller),
    }))
}

/// POST /api/sessions/:session_id/mode - native player or iframe embed
pub async fn set_mode(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<ModeRequest>,
) -> Result<Json<SessionView>, JsonError> {
    let handle = find_session(&state, &session_id).await?;
    let mut controller = handle.lock().await;

    controller.set_mode(payload.mode);
    Ok(Json(session_view(session_id, &controller)))
}

/// POST /api/sessions/:session_id/provider - reload the anime for another provider
/// Selection goes back to the first episode. On failure the session is left untouched.
pub async fn change_provider(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<ProviderRequest>,
) -> Result<Json<SessionView>, JsonError> {
    let handle = find_session(&state, &session_id).await?;
    let provider = state.config.resolve_provider(Some(&payload.provider));
    let anime_id = handle.lock().await.info().id.clone();

    let info = state.anime_info(&anime_id, &provider).await.map_err(|e| {
        tracing::warn!("Provider switch to {} for {} failed: {}", provider, anime_id, e);
        upstream_error(&e)
    })?;

    let mut controller = handle.lock().await;
    controller.change_provider(provider, info);
    Ok(Json(session_view(session_id, &controller)))
}

/// GET /api/sessions/:session_id/player - player state for the current selection
pub async fn get_player(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<PlayerArea>, JsonError> {
    let handle = find_session(&state, &session_id).await?;
    Ok(Json(state.resolve_session_player(&handle).await))
}
