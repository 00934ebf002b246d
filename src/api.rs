use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::commands::{ChatKind, Dispatcher};
use crate::service::InjuryService;

/// Cache status header on `/injuries/{alias}`: `HIT` or `MISS`.
pub const X_CACHE: &str = "x-cache";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<InjuryService>,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(service: Arc<InjuryService>, prefix: impl Into<String>) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(service.clone(), prefix));
        Self {
            service,
            dispatcher,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/clubs", get(list_clubs))
        .route("/injuries/{alias}", get(injuries))
        .route("/refresh", post(refresh))
        .route("/command", post(command))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct ClubOut {
    id: String,
    display_name: String,
}

async fn list_clubs(State(state): State<AppState>) -> Json<Vec<ClubOut>> {
    let out = state
        .service
        .registry()
        .list_canonical()
        .into_iter()
        .map(|c| ClubOut {
            id: c.id.clone(),
            display_name: c.display_name.clone(),
        })
        .collect();
    Json(out)
}

#[derive(Serialize)]
struct NotFoundOut {
    error: &'static str,
    alias: String,
    suggestion: Option<String>,
}

async fn injuries(State(state): State<AppState>, Path(alias): Path<String>) -> Response {
    let registry = state.service.registry();
    let Some(club) = registry.resolve(&alias) else {
        let suggestion = registry.suggest(&alias).map(|(a, _)| a);
        let body = NotFoundOut {
            error: "unknown club",
            alias,
            suggestion,
        };
        return (StatusCode::NOT_FOUND, Json(body)).into_response();
    };

    let (result, status) = state.service.lookup(&club).await;
    (
        [(X_CACHE, status.as_str())],
        Json(result),
    )
        .into_response()
}

async fn refresh(State(state): State<AppState>) -> String {
    let n = state.service.refresh();
    format!("cleared {n} cached result(s)")
}

#[derive(Deserialize)]
struct CommandReq {
    text: String,
    #[serde(default)]
    group: bool,
}

#[derive(Serialize)]
struct CommandResp {
    reply: Option<String>,
}

async fn command(State(state): State<AppState>, Json(req): Json<CommandReq>) -> Json<CommandResp> {
    let reply = state
        .dispatcher
        .handle(&req.text, ChatKind::from_group_flag(req.group))
        .await;
    Json(CommandResp { reply })
}
