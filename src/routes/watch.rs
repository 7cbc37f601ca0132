use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::models::PlaybackMode;
use crate::services::watch::WatchController;
use crate::views::{render_not_found, render_watch_page, WatchPage};
use crate::AppState;

/// Query parameters of the watch page
#[derive(Deserialize, Default)]
pub struct WatchQuery {
    pub provider: Option<String>,
    pub episode: Option<String>,
    pub mode: Option<String>,
}

fn not_found(state: &AppState) -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(render_not_found(&state.config.site_name)),
    )
        .into_response()
}

/// GET /watch - no anime id
pub async fn watch_missing_id(State(state): State<Arc<AppState>>) -> Response {
    not_found(&state)
}

/// GET /watch/:id?provider=<name>&episode=<episode id>&mode=<native|iframe>
/// Server-rendered watch page. Starts on the first episode unless `episode` names another one.
pub async fn watch_page(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<WatchQuery>,
) -> Response {
    let id = id.trim();
    if id.is_empty() {
        return not_found(&state);
    }

    let provider = state.config.resolve_provider(query.provider.as_deref());

    let info = match state.anime_info(id, &provider).await {
        Ok(info) => info,
        Err(e) => {
            tracing::warn!("Watch page for {} ({}) unavailable: {}", id, provider, e);
            return not_found(&state);
        }
    };

    let mut controller = WatchController::new(info, provider);
    if let Some(episode_id) = query.episode.as_deref().filter(|e| !e.is_empty()) {
        if let Err(e) = controller.select_episode(episode_id) {
            tracing::debug!("Ignoring episode parameter: {}", e);
        }
    }
    controller.set_mode(PlaybackMode::from_query(query.mode.as_deref()));

    let area = state.resolve_player(&mut controller).await;

    Html(render_watch_page(&WatchPage {
        site_name: &state.config.site_name,
        controller: &controller,
        area: &area,
    }))
    .into_response()
}
