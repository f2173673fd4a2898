use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use uuid::Uuid;

use super::message::InboundMessage;
use super::registry::{ConnectionId, ConnectionRegistry, Outbound};
use super::store::MessageStore;

/// What the receive loop should do after one iteration. `Disconnect` is a
/// clean close (peer close frame or end of stream); `Fatal` is a transport
/// fault that has already been logged. Both leave the room the same way.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopOutcome {
    Continue,
    Disconnect,
    Fatal,
}

const LEAVE_NOTICE: &str = "A client has left the chat";

/// Runs one chat connection to completion: attach, pump frames, and on any
/// exit path detach before the socket is dropped, then announce the leave
/// best-effort.
pub async fn run<S: MessageStore>(
    socket: WebSocket,
    registry: ConnectionRegistry,
    store: S,
    chat_id: Uuid,
) {
    let (sink, stream) = socket.split();
    run_session(sink, stream, registry, store, chat_id).await;
}

async fn run_session<S, W, R>(
    mut sink: W,
    mut stream: R,
    registry: ConnectionRegistry,
    store: S,
    chat_id: Uuid,
) where
    S: MessageStore,
    W: Sink<WsMessage> + Unpin + Send + 'static,
    R: Stream<Item = Result<WsMessage, axum::Error>> + Unpin,
{
    let conn_id = ConnectionId::new();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    registry.attach(chat_id, conn_id, tx.clone()).await;

    // Writer half: drains the outbound queue into the socket. Stops when
    // the peer is gone or the session drops the last sender.
    let mut writer = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sink.send(text.into()).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            _ = &mut writer => break,
            frame = stream.next() => {
                let outcome = match frame {
                    Some(Ok(msg)) => handle_frame(&store, &registry, chat_id, &tx, msg).await,
                    Some(Err(err)) => {
                        tracing::warn!(%chat_id, %conn_id, "websocket error: {err}");
                        LoopOutcome::Fatal
                    }
                    None => LoopOutcome::Disconnect,
                };
                match outcome {
                    LoopOutcome::Continue => {}
                    LoopOutcome::Disconnect | LoopOutcome::Fatal => break,
                }
            }
        }
    }

    registry.detach(chat_id, conn_id).await;
    registry.broadcast(chat_id, LEAVE_NOTICE).await;
    writer.abort();
}

async fn handle_frame<S: MessageStore>(
    store: &S,
    registry: &ConnectionRegistry,
    chat_id: Uuid,
    reply: &Outbound,
    msg: WsMessage,
) -> LoopOutcome {
    match msg {
        WsMessage::Text(_) | WsMessage::Binary(_) => {
            handle_payload(store, registry, chat_id, reply, &msg.into_data()).await
        }
        WsMessage::Close(_) => LoopOutcome::Disconnect,
        // Pings are answered by axum; nothing to do here.
        _ => LoopOutcome::Continue,
    }
}

/// Handles one inbound payload: parse, persist, broadcast. Malformed
/// payloads are dropped without a reply; a storage failure is reported to
/// the sender only. Neither closes the connection.
pub async fn handle_payload<S: MessageStore>(
    store: &S,
    registry: &ConnectionRegistry,
    chat_id: Uuid,
    reply: &Outbound,
    data: &[u8],
) -> LoopOutcome {
    let inbound = match InboundMessage::parse(data) {
        Ok(inbound) => inbound,
        Err(err) => {
            tracing::debug!(%chat_id, "dropping payload: {err}");
            return LoopOutcome::Continue;
        }
    };

    let message = match store
        .create(chat_id, inbound.profile_id, inbound.text, inbound.media_file_ids)
        .await
    {
        Ok(message) => message,
        Err(err) => {
            tracing::error!(%chat_id, "failed to store message: {err}");
            let _ = reply.send(
                serde_json::json!({ "error": "failed to store message" }).to_string(),
            );
            return LoopOutcome::Continue;
        }
    };

    match serde_json::to_string(&message.public()) {
        Ok(payload) => {
            registry.broadcast(chat_id, &payload).await;
        }
        Err(err) => {
            tracing::error!(%chat_id, "failed to serialize message {}: {err}", message.id);
        }
    }

    LoopOutcome::Continue
}
