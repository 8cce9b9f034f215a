//! Websocket Connection Handler
//!
//! Accepts upgrades on `/ws/chat/{room_name}/{chat_id}`, verifies the
//! caller's token before the socket is accepted, and drives the
//! per-connection read loop. Each connection gets one reader (this task)
//! and one writer task; events for the socket flow through the bus into
//! the writer's channel.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::domain::entities::user::User;
use crate::infrastructure::metrics;
use crate::shared::error::{AppError, GatewayError};
use crate::startup::AppState;

use super::events::{ErrorDetails, ServerEvent};
use super::session::Session;

/// Claims the token issuer signs; the gateway only reads the subject.
#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[allow(dead_code)]
    exp: usize,
}

/// Connect-time query parameters.
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    token: Option<String>,
}

/// Websocket upgrade handler.
///
/// Identity is resolved before the upgrade completes; an unauthenticated
/// caller gets a 401 response and never holds a socket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path((room_name, chat_id)): Path<(String, i64)>,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let user = authenticate(params.token.as_deref(), &state).await?;
    tracing::debug!(user = %user.username, room = %room_name, chat_id, "Upgrade accepted");
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user, room_name, chat_id)))
}

/// Verify the connect token and resolve it to a user.
async fn authenticate(token: Option<&str>, state: &AppState) -> Result<User, AppError> {
    let token = token.ok_or_else(|| AppError::Unauthorized("Missing token".into()))?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.settings.jwt.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

    let user_id: i64 = token_data
        .claims
        .sub
        .parse()
        .map_err(|_| AppError::Unauthorized("Invalid user ID in token".into()))?;

    state
        .storage
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Unknown user".into()))
}

/// Drive one websocket connection to completion.
async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    user: User,
    room_name: String,
    chat_id: i64,
) {
    let session = Session::new(user, room_name, chat_id);
    metrics::CONNECTIONS_ACTIVE.inc();

    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    // Writer task: everything the bus (or the error path) queues goes out
    // through here, serialized once per event.
    let writer_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!("Failed to serialize event: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    if let Err(e) = state.gateway.connect(&session, tx.clone()).await {
        tracing::error!(
            user = %session.user.username,
            chat_id = session.chat_id,
            error = %e,
            "Connect sequence failed"
        );
        // A failed connect has already released everything it acquired.
        metrics::CONNECTIONS_ACTIVE.dec();
        writer_task.abort();
        return;
    }

    // Read loop: this connection's events, strictly in receipt order.
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                handle_text(&state, &session, &tx, &text).await;
            }
            Ok(Message::Close(_)) => {
                tracing::debug!(conn_id = %session.conn_id, "Connection closed by client");
                break;
            }
            Ok(_) => {
                // Ping/Pong are answered by axum; binary frames are ignored.
            }
            Err(e) => {
                tracing::debug!(conn_id = %session.conn_id, error = %e, "Websocket error");
                break;
            }
        }
    }

    state.gateway.disconnect(&session).await;
    metrics::CONNECTIONS_ACTIVE.dec();
    writer_task.abort();
}

/// Handle one inbound text frame. Handler failures become a unicast
/// `error` envelope to this connection only; nothing here can take the
/// connection down or reach the group.
async fn handle_text(
    state: &AppState,
    session: &Session,
    tx: &mpsc::UnboundedSender<ServerEvent>,
    text: &str,
) {
    let outcome = match serde_json::from_str::<Value>(text) {
        Ok(raw) => state.router.dispatch(session, raw).await,
        Err(e) => Err(GatewayError::validation(format!("Invalid JSON: {}", e))),
    };

    if let Err(e) = outcome {
        tracing::error!(
            user = %session.user.username,
            chat_id = session.chat_id,
            error = %e,
            "Error while processing received content"
        );
        let event = ServerEvent::Error {
            error_message: e.to_string(),
            details: ErrorDetails {
                user_id: session.user.id,
                user_name: session.user.username.clone(),
                chat_id: session.chat_id,
                message_id: e.message_id(),
            },
        };
        let _ = tx.send(event);
    }
}
