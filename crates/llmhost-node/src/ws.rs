// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! WebSocket bridge for the chat protocol — translates browser WebSocket text
//! frames to and from `llmhost_chat::ChatSessionEngine`.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use llmhost_chat::{ChatSessionEngine, OutboundMessage};

use crate::AppState;

pub async fn chat_ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let (out_tx, mut out_rx) = mpsc::channel::<OutboundMessage>(64);
    let (mut engine, ready) = ChatSessionEngine::new(
        state.chat_preamble.clone(),
        state.inference_engine.clone(),
        state.max_active_prompts,
        out_tx,
    );

    info!(session_id = %engine.session_id(), "chat session connected");
    if socket.send(Message::Text(ready.to_json())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = engine.handle_text(&text).await {
                            if socket.send(Message::Text(reply.to_json())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(session_id = %engine.session_id(), "WebSocket recv error: {e}");
                        break;
                    }
                }
            }
            Some(token_msg) = out_rx.recv() => {
                if socket.send(Message::Text(token_msg.to_json())).await.is_err() {
                    break;
                }
            }
            complete = engine.next_terminal_event() => {
                if socket.send(Message::Text(complete.to_json())).await.is_err() {
                    break;
                }
            }
        }
    }

    if engine.active_prompt_count() > 0 {
        warn!(
            session_id = %engine.session_id(),
            active = engine.active_prompt_count(),
            "chat session disconnected with generations still in flight",
        );
    }
    info!(session_id = %engine.session_id(), "chat session disconnected");
}
