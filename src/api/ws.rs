//! WebSocket session transport
//!
//! One analysis session per socket connection. The socket loop owns the
//! session and processes messages strictly sequentially in arrival order,
//! which is what the merge and completion-latch logic require; `reset` is
//! just another sequential event in the same loop. Independent sessions
//! run their classifier calls concurrently with each other.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::models::{InboundMessage, OutboundMessage};
use crate::services::InterviewSession;
use crate::AppState;

/// GET /ws - upgrade to a session socket
pub async fn session_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let session = Arc::new(Mutex::new(InterviewSession::new(
        Arc::clone(&state.classifier),
        Arc::clone(&state.script),
        state.params.clone(),
    )));
    let session_id = session.lock().await.id();

    // Register for REST access (manual override, reports)
    state
        .sessions
        .write()
        .await
        .insert(session_id, Arc::clone(&session));
    info!(session_id = %session_id, "Session connected");

    let connected = OutboundMessage::Connection {
        status: "connected".to_string(),
        session_id,
    };
    if send(&mut socket, &connected).await.is_err() {
        state.sessions.write().await.remove(&session_id);
        return;
    }

    while let Some(message) = socket.recv().await {
        let message = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue, // ping/pong/binary
            Err(e) => {
                debug!(session_id = %session_id, error = %e, "Socket receive error");
                break;
            }
        };

        let outbound = handle_message(&session, &message).await;
        if send(&mut socket, &outbound).await.is_err() {
            break;
        }
    }

    state.sessions.write().await.remove(&session_id);
    info!(session_id = %session_id, "Session disconnected");
}

/// Process one inbound message against the session. Malformed messages
/// and rejected inputs become `error` replies; the session continues.
async fn handle_message(
    session: &Arc<Mutex<InterviewSession>>,
    text: &str,
) -> OutboundMessage {
    let inbound: InboundMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            return OutboundMessage::Error {
                message: format!("Malformed message: {}", e),
            };
        }
    };

    match inbound {
        InboundMessage::TranscriptChunk { payload } => {
            let mut session = session.lock().await;
            match session.process_chunk(&payload.chunk, payload.speaker).await {
                Ok(result) => OutboundMessage::AnalysisResult {
                    payload: result,
                    timestamp: Utc::now(),
                },
                Err(Error::InvalidInput(msg)) => OutboundMessage::Error { message: msg },
                Err(e) => {
                    warn!(session_id = %session.id(), error = %e, "Chunk processing failed");
                    OutboundMessage::Error {
                        message: e.to_string(),
                    }
                }
            }
        }
        InboundMessage::Reset => {
            session.lock().await.reset();
            OutboundMessage::Reset {
                status: "ok".to_string(),
            }
        }
    }
}

async fn send(socket: &mut WebSocket, message: &OutboundMessage) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "Failed to serialize outbound message");
            return Ok(());
        }
    };
    socket.send(Message::Text(json)).await
}
