//! Axum router and all HTTP handlers for arena-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Tests compose the bare router directly.

use std::{convert::Infallible, sync::Arc};

use arena_schemas::{ChangeEvent, DateKey, GameDocument};
use arena_store::StoreError;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

use crate::{
    api_types::{
        DailyChallengeRequest, DailyChallengeResponse, ErrorResponse, GameResponse,
        HealthResponse, PutGameResponse, ReconcileResponse,
    },
    feed,
    state::{uptime_secs, AppState, BusMsg},
    upsert::{self, UpsertOutcome},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/stream", get(stream))
        .route("/v1/games/:id", get(get_game).put(put_game))
        .route("/v1/games/:id/change", post(game_change))
        .route("/v1/challenges/daily", post(daily_challenge))
        .route("/v1/challenges/:date", get(get_challenge))
        .with_state(state)
}

fn error(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: msg.into() })).into_response()
}

fn store_error(e: StoreError) -> Response {
    let status = match &e {
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::VersionConflict { .. } | StoreError::AlreadyExists { .. } => {
            StatusCode::CONFLICT
        }
        StoreError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
        StoreError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        warn!(error = %e, "store failure");
    }
    error(status, e.to_string())
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
            store: st.store.backend_name().to_string(),
            uptime_secs: uptime_secs(),
            config_hash: st.config_hash.clone(),
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/games/:id
// ---------------------------------------------------------------------------

pub(crate) async fn get_game(State(st): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match st.store.get_game(&id).await {
        Ok(Some(g)) => (
            StatusCode::OK,
            Json(GameResponse {
                game: g.doc.to_json(),
                version: g.version,
            }),
        )
            .into_response(),
        Ok(None) => error(StatusCode::NOT_FOUND, format!("game {id} not found")),
        Err(e) => store_error(e),
    }
}

// ---------------------------------------------------------------------------
// PUT /v1/games/:id
// ---------------------------------------------------------------------------

/// Write a game the way a client would. Creating a game is not an update;
/// overwriting one is, and gets reconciled (by the store's feed, or inline
/// when the store has none).
pub(crate) async fn put_game(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut doc = match GameDocument::from_json(body) {
        Ok(d) => d,
        Err(e) => return error(StatusCode::BAD_REQUEST, format!("invalid game document: {e}")),
    };
    if !doc.game_id.is_empty() && doc.game_id != id {
        return error(
            StatusCode::BAD_REQUEST,
            format!("gameId {} does not match path {id}", doc.game_id),
        );
    }
    doc.game_id = id.clone();

    let event = match st.store.replace_game(doc.clone()).await {
        Ok(ev) => ev,
        Err(StoreError::NotFound { .. }) => {
            return match st.store.insert_game(doc).await {
                Ok(version) => {
                    info!(game_id = %id, "game created");
                    (
                        StatusCode::CREATED,
                        Json(PutGameResponse {
                            created: true,
                            version,
                            reconcile: None,
                        }),
                    )
                        .into_response()
                }
                Err(e) => store_error(e),
            };
        }
        Err(e) => return store_error(e),
    };

    let mut version = event.after_version.unwrap_or_default();
    let reconcile = if st.inline_dispatch {
        match feed::settle(&st, &event).await {
            Ok(settled) => {
                if let Some(v) = settled.written_version() {
                    version = v;
                }
                Some(ReconcileResponse::from(&settled))
            }
            Err(e) => return store_error(e),
        }
    } else {
        None
    };

    (
        StatusCode::OK,
        Json(PutGameResponse {
            created: false,
            version,
            reconcile,
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// POST /v1/games/:id/change
// ---------------------------------------------------------------------------

/// Webhook delivery of one change event. Without a store feed the
/// adapter's own writes are settled before responding.
pub(crate) async fn game_change(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(event): Json<ChangeEvent>,
) -> Response {
    if event.game_id != id {
        return error(
            StatusCode::BAD_REQUEST,
            format!("event game_id {} does not match path {id}", event.game_id),
        );
    }
    match feed::settle(&st, &event).await {
        Ok(settled) => (StatusCode::OK, Json(ReconcileResponse::from(&settled))).into_response(),
        Err(e) => store_error(e),
    }
}

// ---------------------------------------------------------------------------
// POST /v1/challenges/daily
// ---------------------------------------------------------------------------

/// Manual trigger of the daily upsert; safe to repeat.
pub(crate) async fn daily_challenge(
    State(st): State<Arc<AppState>>,
    body: Option<Json<DailyChallengeRequest>>,
) -> Response {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let key = match req.date.as_deref() {
        Some(raw) => match raw.parse::<DateKey>() {
            Ok(k) => k,
            Err(e) => return error(StatusCode::BAD_REQUEST, e.to_string()),
        },
        None => match st.store.server_time().await {
            Ok(now) => st.schedule.date_key_for(now),
            Err(e) => return store_error(e),
        },
    };

    match upsert::run_daily(&st, key).await {
        Ok(outcome) => {
            let status = match outcome {
                UpsertOutcome::Created(_) => StatusCode::CREATED,
                UpsertOutcome::AlreadyExists(_) => StatusCode::OK,
            };
            (status, Json(DailyChallengeResponse::new(key.to_string(), &outcome))).into_response()
        }
        Err(e) => error(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/challenges/:date
// ---------------------------------------------------------------------------

pub(crate) async fn get_challenge(
    State(st): State<Arc<AppState>>,
    Path(date): Path<String>,
) -> Response {
    let key: DateKey = match date.parse() {
        Ok(k) => k,
        Err(e) => return error(StatusCode::BAD_REQUEST, format!("{e}")),
    };
    match st.store.get_challenge(&key).await {
        Ok(Some(doc)) => (StatusCode::OK, Json(doc)).into_response(),
        Ok(None) => error(StatusCode::NOT_FOUND, format!("no challenge for {key}")),
        Err(e) => store_error(e),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(m.event_name()).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
