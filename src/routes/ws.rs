//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. Exam generation streams progress before the result.
//!
//! The socket is split so the read half stays polled while an exam is being
//! generated: a close or read error mid-generation cancels the session token
//! and drops the in-flight work.

use std::fmt::Display;
use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::logic::build_exam;
use crate::protocol::{ClientWsMessage, GenerateIn, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "examgen_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state), fields(session = %Uuid::new_v4()))]
async fn handle_ws(socket: WebSocket, state: Arc<AppState>) {
  info!(target: "examgen_backend", "WebSocket connected");
  let session_token = state.request_token();
  let (mut tx, mut rx) = socket.split();
  run_session(&mut tx, &mut rx, &state, &session_token).await;
  info!(target: "examgen_backend", "WebSocket disconnected");
}

/// Serialize and send; false when the socket is gone.
async fn send<Tx>(tx: &mut Tx, msg: &ServerWsMessage) -> bool
where
  Tx: Sink<Message> + Unpin,
  Tx::Error: Display,
{
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  });
  match tx.send(Message::Text(out)).await {
    Ok(()) => true,
    Err(e) => {
      error!(target: "examgen_backend", error = %e, "WS send error");
      false
    }
  }
}

/// Message loop for one connection. Cancels `token` when the session ends.
async fn run_session<Tx, Rx, E>(tx: &mut Tx, rx: &mut Rx, state: &AppState, token: &CancellationToken)
where
  Tx: Sink<Message> + Unpin,
  Tx::Error: Display,
  Rx: Stream<Item = Result<Message, E>> + Unpin,
{
  while let Some(Ok(msg)) = rx.next().await {
    match msg {
      Message::Text(txt) => {
        let keep_open = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(ClientWsMessage::Ping) => send(tx, &ServerWsMessage::Pong).await,
          Ok(ClientWsMessage::GenerateExam { request }) => {
            debug!(target: "examgen_backend", ?request, "WS generate_exam received");
            generate_exam(tx, rx, state, request, token).await
          }
          Err(e) => send(tx, &ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) }).await,
        };
        if !keep_open {
          break;
        }
      }
      Message::Ping(payload) => { let _ = tx.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }

  token.cancel();
}

/// Answer the peer while an exam is in flight. Returns once the peer is gone.
async fn serve_until_disconnect<Tx, Rx, E>(tx: &mut Tx, rx: &mut Rx)
where
  Tx: Sink<Message> + Unpin,
  Tx::Error: Display,
  Rx: Stream<Item = Result<Message, E>> + Unpin,
{
  while let Some(Ok(msg)) = rx.next().await {
    let alive = match msg {
      Message::Text(txt) => match serde_json::from_str::<ClientWsMessage>(&txt) {
        Ok(ClientWsMessage::Ping) => send(tx, &ServerWsMessage::Pong).await,
        _ => send(tx, &ServerWsMessage::Error { message: "An exam is already being generated".into() }).await,
      },
      Message::Ping(payload) => tx.send(Message::Pong(payload)).await.is_ok(),
      Message::Close(_) => false,
      _ => true,
    };
    if !alive {
      return;
    }
  }
}

/// Returns false when the session should end.
async fn generate_exam<Tx, Rx, E>(
  tx: &mut Tx,
  rx: &mut Rx,
  state: &AppState,
  request: GenerateIn,
  token: &CancellationToken,
) -> bool
where
  Tx: Sink<Message> + Unpin,
  Tx::Error: Display,
  Rx: Stream<Item = Result<Message, E>> + Unpin,
{
  let (req, include_answer_key) = match request.into_request(state.limits.max_questions) {
    Ok(v) => v,
    Err(message) => return send(tx, &ServerWsMessage::Error { message }).await,
  };

  let progress = |percent: u8, stage: &str| ServerWsMessage::Progress { percent, stage: stage.to_string() };

  if !send(tx, &progress(10, "generating")).await {
    return false;
  }

  let built = tokio::select! {
    built = build_exam(&state.client, &state.prompts, &req, include_answer_key, token) => built,
    _ = serve_until_disconnect(tx, rx) => {
      warn!(target: "examgen_backend", subject = %req.subject, "Client left during generation; cancelling");
      token.cancel();
      return false;
    }
  };
  info!(
    target: "examgen_backend",
    subject = %req.subject,
    total = built.exam.questions.total(),
    used_fallback = built.used_fallback,
    fallback_marker = built.exam.questions.has_fallback_marker(),
    "WS exam generated"
  );

  send(tx, &progress(90, "assembling")).await
    && send(tx, &progress(100, "done")).await
    && send(
      tx,
      &ServerWsMessage::Exam { exam: built.exam, used_fallback: built.used_fallback, sources: built.sources },
    )
    .await
}
