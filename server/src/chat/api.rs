//! REST endpoints for the unary chat operations and log inspection.
//!
//! Domain failures are answered with HTTP 200 and `is_ok: false`; the status
//! body is the result, not the HTTP code.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{Action, ChatError};
use crate::state::AppState;

/// Upper bound on actions returned by one history request.
const MAX_PAGE: usize = 1000;

// --- Request / Response types ---

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct DisconnectRequest {
    pub user_token: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub user_token: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct StatusBody {
    pub is_ok: bool,
    pub error_message: String,
}

impl<T> From<&Result<T, ChatError>> for StatusBody {
    fn from(result: &Result<T, ChatError>) -> Self {
        match result {
            Ok(_) => Self {
                is_ok: true,
                error_message: String::new(),
            },
            Err(e) => Self {
                is_ok: false,
                error_message: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub user_token: String,
    pub status: StatusBody,
}

#[derive(Debug, Deserialize)]
pub struct ActionsQuery {
    pub from: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub index: u64,
    pub username: String,
    pub action_type: &'static str,
    pub payload: String,
    pub time: f64,
}

impl From<&Action> for ActionResponse {
    fn from(action: &Action) -> Self {
        Self {
            index: action.index,
            username: action.username.clone(),
            action_type: action.kind.as_str(),
            payload: action.payload.clone(),
            time: action.epoch_seconds(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ActionsResponse {
    pub actions: Vec<ActionResponse>,
    /// Log length once the page was taken; never less than the last index + 1.
    pub length: usize,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub actions: usize,
    pub sessions: usize,
    pub subscribers: usize,
}

// --- Handlers ---

/// POST /api/chat/connect
pub async fn connect(
    State(state): State<AppState>,
    Json(req): Json<ConnectRequest>,
) -> Json<ConnectResponse> {
    let result = state.chat.connect(&req.username);
    Json(ConnectResponse {
        status: StatusBody::from(&result),
        user_token: result.unwrap_or_default(),
    })
}

/// POST /api/chat/disconnect
pub async fn disconnect(
    State(state): State<AppState>,
    Json(req): Json<DisconnectRequest>,
) -> Json<StatusBody> {
    let result = state.chat.disconnect(&req.user_token);
    Json(StatusBody::from(&result))
}

/// POST /api/chat/send
pub async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> Json<StatusBody> {
    let result = state.chat.send_message(&req.user_token, &req.text);
    Json(StatusBody::from(&result))
}

/// GET /api/chat/actions?from=N
/// Snapshot of the log from index N (default 0), at most `MAX_PAGE` entries.
pub async fn list_actions(
    State(state): State<AppState>,
    Query(query): Query<ActionsQuery>,
) -> Json<ActionsResponse> {
    let log = state.chat.log();
    let actions = log
        .slice(query.from.unwrap_or(0))
        .iter()
        .take(MAX_PAGE)
        .map(|a| ActionResponse::from(a.as_ref()))
        .collect();

    Json(ActionsResponse {
        actions,
        length: log.len(),
    })
}

/// GET /api/chat/stats
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        actions: state.chat.log().len(),
        sessions: state.chat.sessions().len(),
        subscribers: state.subscribers.len(),
    })
}
