use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::protocol::{ClientMessage, ErrorCode, ServerMessage};
use crate::publish::{self, EventBus};
use crate::session::registry::SessionRegistry;
use crate::session::state::{Session, SessionError};

/// Outgoing messages buffered per connection
const OUTBOX_CAPACITY: usize = 32;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub bus: Arc<EventBus>,
}

impl AppState {
    pub fn new() -> Self {
        let bus = Arc::new(EventBus::new());
        let registry = Arc::new(SessionRegistry::new(bus.clone()));
        Self { registry, bus }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    use futures_util::StreamExt;

    let connection_id = Uuid::new_v4();
    info!("New WebSocket connection: {}", connection_id);

    // Channel for outgoing messages
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(OUTBOX_CAPACITY);

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Forward outgoing messages to the socket
    let send_task = tokio::spawn(async move {
        use futures_util::SinkExt;
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize message: {}", e);
                }
            }
        }
    });

    // Topic forwarders spawned when this connection starts following a session
    let mut forwarders: Vec<tokio::task::JoinHandle<()>> = Vec::new();

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => {
                    handle_client_message(client_msg, &state, &tx, &mut forwarders).await;
                }
                Err(e) => {
                    warn!("Failed to parse client message: {}", e);
                    let _ = tx
                        .send(ServerMessage::Error {
                            code: ErrorCode::InvalidMessage,
                            message: format!("Invalid message format: {}", e),
                        })
                        .await;
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client {} requested close", connection_id);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                debug!("WebSocket error for {}: {}", connection_id, e);
                break;
            }
        }
    }

    for task in forwarders {
        task.abort();
    }
    send_task.abort();
    info!("WebSocket connection closed: {}", connection_id);
}

/// Dispatch one client message onto the engine
async fn handle_client_message(
    msg: ClientMessage,
    state: &AppState,
    tx: &mpsc::Sender<ServerMessage>,
    forwarders: &mut Vec<tokio::task::JoinHandle<()>>,
) {
    match msg {
        ClientMessage::CreateSession => {
            let session = state.registry.create_session();
            let _ = tx
                .send(ServerMessage::SessionCreated {
                    session_id: session.id().clone(),
                })
                .await;
        }
        ClientMessage::Join { session_id, name } => match lookup(state, &session_id) {
            Ok(session) => match session.join(&name).await {
                Ok(player_id) => {
                    follow_session(&session_id, state, tx, forwarders);
                    let _ = tx
                        .send(ServerMessage::Joined {
                            session_id,
                            player_id,
                        })
                        .await;
                }
                Err(e) => send_session_error(tx, e).await,
            },
            Err(e) => send_session_error(tx, e).await,
        },
        ClientMessage::Vote {
            session_id,
            player_id,
            choice,
        } => match lookup(state, &session_id) {
            Ok(session) => {
                if let Err(e) = session.vote(player_id, choice).await {
                    send_session_error(tx, e).await;
                }
            }
            Err(e) => send_session_error(tx, e).await,
        },
        ClientMessage::Kick {
            session_id,
            player_id,
        } => match lookup(state, &session_id) {
            Ok(session) => session.kick(player_id).await,
            Err(e) => send_session_error(tx, e).await,
        },
        ClientMessage::RequestReset { session_id } => match lookup(state, &session_id) {
            Ok(session) => session.request_reset().await,
            Err(e) => send_session_error(tx, e).await,
        },
        ClientMessage::Reset { session_id } => match lookup(state, &session_id) {
            Ok(session) => session.reset().await,
            Err(e) => send_session_error(tx, e).await,
        },
        ClientMessage::Tally { session_id } => match lookup(state, &session_id) {
            Ok(session) => {
                // the result reaches subscribers on the session's result topic
                session.tally().await;
            }
            Err(e) => send_session_error(tx, e).await,
        },
        ClientMessage::Stats { session_id } => match lookup(state, &session_id) {
            Ok(session) => {
                let stats = session.stats().await;
                let _ = tx.send(ServerMessage::Stats { stats }).await;
            }
            Err(e) => send_session_error(tx, e).await,
        },
    }
}

fn lookup(state: &AppState, session_id: &str) -> Result<Arc<Session>, SessionError> {
    state
        .registry
        .get_session(session_id)
        .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
}

/// Subscribe the connection to every topic of a session and forward events
/// into its outbox.
fn follow_session(
    session_id: &str,
    state: &AppState,
    tx: &mpsc::Sender<ServerMessage>,
    forwarders: &mut Vec<tokio::task::JoinHandle<()>>,
) {
    for topic in [
        publish::stats_topic(session_id),
        publish::result_topic(session_id),
        publish::reset_topic(session_id),
    ] {
        let mut receiver = state.bus.subscribe(&topic);
        let tx = tx.clone();
        forwarders.push(tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        let msg = ServerMessage::Event {
                            topic: topic.clone(),
                            event,
                        };
                        if tx.send(msg).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("Subscriber lagged on {}, skipped {} events", topic, skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }));
    }
}

async fn send_session_error(tx: &mpsc::Sender<ServerMessage>, err: SessionError) {
    let code = match &err {
        SessionError::DuplicateName(_) => ErrorCode::DuplicateName,
        SessionError::UnknownPlayer(_) => ErrorCode::UnknownPlayer,
        SessionError::NotFound(_) => ErrorCode::SessionNotFound,
    };
    let _ = tx
        .send(ServerMessage::Error {
            code,
            message: err.to_string(),
        })
        .await;
}
