// WebSocket handler for battle snapshot streaming and in-band commands.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::engine::battle::BattleSnapshot;
use crate::metrics;

use super::AppState;

/// Commands a client may send over the socket.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Answer { answer: usize },
    Submit,
}

/// WebSocket upgrade handler for one battle.
pub async fn ws_battle(
    ws: WebSocketUpgrade,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Response {
    if state.battle_server.snapshot(id).is_none() {
        return (
            StatusCode::NOT_FOUND,
            axum::Json(json!({ "error": "battle not found" })),
        )
            .into_response();
    }
    ws.on_upgrade(move |socket| handle_ws(socket, state, id))
}

fn snapshot_message(snapshot: &BattleSnapshot) -> Message {
    let body = json!({ "type": "snapshot", "snapshot": snapshot });
    Message::Text(body.to_string().into())
}

fn error_message(error: &str) -> Message {
    Message::Text(json!({ "type": "error", "error": error }).to_string().into())
}

async fn handle_ws(mut socket: WebSocket, state: AppState, battle_id: Uuid) {
    let Some(mut rx) = state.battle_server.subscribe(battle_id) else {
        return;
    };
    metrics::CONNECTED_WEBSOCKETS.inc();
    tracing::debug!(%battle_id, "WebSocket client connected");

    // Late joiners see the current state immediately.
    let current = rx.borrow_and_update().clone();
    let mut done = current.is_complete();
    if socket.send(snapshot_message(&current)).await.is_ok() {
        metrics::WEBSOCKET_MESSAGES_SENT_TOTAL.inc();
    } else {
        done = true;
    }

    while !done {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    // Battle task is gone (torn down)
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                if socket.send(snapshot_message(&snapshot)).await.is_err() {
                    break;
                }
                metrics::WEBSOCKET_MESSAGES_SENT_TOTAL.inc();
                done = snapshot.is_complete();
            }
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Answer { answer }) => {
                                state.battle_server.select(battle_id, answer).await.err()
                            }
                            Ok(ClientMessage::Submit) => {
                                state.battle_server.submit(battle_id).await.err()
                            }
                            Err(e) => {
                                if socket.send(error_message(&format!("bad message: {e}"))).await.is_err() {
                                    break;
                                }
                                continue;
                            }
                        };
                        // Successful commands show up as the next snapshot
                        if let Some(e) = reply {
                            if socket.send(error_message(&e.to_string())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    let _ = socket.send(Message::Close(None)).await;
    metrics::CONNECTED_WEBSOCKETS.dec();
    tracing::debug!(%battle_id, "WebSocket client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_client_messages() {
        assert_eq!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"answer","answer":2}"#).unwrap(),
            ClientMessage::Answer { answer: 2 }
        );
        assert_eq!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"submit"}"#).unwrap(),
            ClientMessage::Submit
        );
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"answer"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"dance"}"#).is_err());
    }
}
