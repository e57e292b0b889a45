use crate::handlers::{flow::FlowView, AppState};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{Sink, SinkExt, StreamExt};

pub async fn flow_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Push the current flow status, then every change, until the client leaves.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut updates = state.flow.subscribe();

    let current = FlowView::new(updates.borrow_and_update().clone(), state.network);
    if !send_json(&mut sender, &current).await {
        return;
    }

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = FlowView::new(updates.borrow_and_update().clone(), state.network);
                if !send_json(&mut sender, &view).await {
                    break;
                }
            }

            Some(Ok(msg)) = receiver.next() => {
                match msg {
                    Message::Close(_) => break,
                    Message::Ping(data) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    tracing::debug!("Flow WebSocket closed");
}

async fn send_json<S>(sender: &mut S, view: &FlowView) -> bool
where
    S: Sink<Message> + Unpin,
{
    match serde_json::to_string(view) {
        Ok(msg) => sender.send(Message::Text(msg)).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to encode flow status: {}", e);
            false
        }
    }
}
