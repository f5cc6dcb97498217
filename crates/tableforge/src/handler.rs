//! Per-connection handler: handshake, admission, and message routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive `Handshake` → authenticate the bearer token
//!   2. Create a session, send `HandshakeAck`
//!   3. Loop: merge inbound client requests with the room's broadcast
//!      events, dispatching each to a typed response

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tableforge_protocol::{ApiError, GameEvent, GameState, InteractionId, InteractionStatus, MapState, ValidationResult};
use tableforge_room::RoomError;
use tableforge_session::{Authenticator, Identity};
use tableforge_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::message::{ClientRequest, ServerResponse};
use crate::server::AppState;
use crate::ServerError;

/// How long the connection may go without sending a first `Handshake`
/// before the handler gives up and closes it.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Drop guard that disconnects a user's session and leaves any joined room
/// when the handler exits, however it exits.
struct SessionGuard<A: Authenticator> {
    user_id: tableforge_protocol::UserId,
    room: Option<InteractionId>,
    state: Arc<AppState<A>>,
}

impl<A: Authenticator> Drop for SessionGuard<A> {
    fn drop(&mut self) {
        let user_id = self.user_id.clone();
        let room = self.room.clone();
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            if let Some(interaction_id) = room {
                if let Some(handle) = state.rooms.get(&interaction_id) {
                    let _ = handle.update_connection(user_id.clone(), false).await;
                }
                state.rooms.broadcaster().unsubscribe(&interaction_id, &user_id);
            }
            let mut sessions = state.sessions.lock().await;
            let _ = sessions.disconnect(&user_id);
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<A: Authenticator>(
    conn: WebSocketConnection,
    state: Arc<AppState<A>>,
) -> Result<(), ServerError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let identity = perform_handshake(&conn, &state).await?;
    let user_id = identity.user_id.clone();
    tracing::info!(%conn_id, %user_id, "client authenticated");

    {
        let mut sessions = state.sessions.lock().await;
        sessions.create(user_id.clone())?;
    }

    let mut guard = SessionGuard { user_id: user_id.clone(), room: None, state: Arc::clone(&state) };
    let mut is_dm = false;
    let mut event_rx: Option<mpsc::UnboundedReceiver<GameEvent>> = None;

    loop {
        tokio::select! {
            biased;

            event = next_event(&mut event_rx) => {
                match event {
                    Some(event) => {
                        let response = ServerResponse::Event(event);
                        if send_response(&conn, &response).await.is_err() {
                            break;
                        }
                    }
                    None => event_rx = None,
                }
            }

            data = conn.recv() => {
                let data = match data {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%user_id, "connection closed cleanly");
                        break;
                    }
                    Err(err) => {
                        tracing::debug!(%user_id, error = %err, "recv error");
                        break;
                    }
                };

                let request: ClientRequest = match serde_json::from_slice(&data) {
                    Ok(request) => request,
                    Err(err) => {
                        tracing::debug!(%user_id, error = %err, "failed to decode request");
                        let response = ServerResponse::Error {
                            code: ApiError::InvalidArgument.code().to_string(),
                            message: err.to_string(),
                        };
                        let _ = send_response(&conn, &response).await;
                        continue;
                    }
                };

                if matches!(request, ClientRequest::Handshake { .. }) {
                    continue;
                }

                let response = dispatch(&state, &mut guard, &mut is_dm, &mut event_rx, request).await;
                if send_response(&conn, &response).await.is_err() {
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Receives the next broadcast event for the joined room, or never resolves
/// if no room has been joined yet.
async fn next_event(rx: &mut Option<mpsc::UnboundedReceiver<GameEvent>>) -> Option<GameEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn perform_handshake<A: Authenticator>(
    conn: &WebSocketConnection,
    state: &Arc<AppState<A>>,
) -> Result<Identity, ServerError> {
    let data = match tokio::time::timeout(HANDSHAKE_TIMEOUT, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ServerError::Protocol(tableforge_protocol::ProtocolError::InvalidMessage(
                "connection closed before handshake".into(),
            )));
        }
        Ok(Err(err)) => return Err(ServerError::Transport(err)),
        Err(_) => {
            return Err(ServerError::Protocol(tableforge_protocol::ProtocolError::InvalidMessage(
                "handshake timed out".into(),
            )));
        }
    };

    let request: ClientRequest =
        serde_json::from_slice(&data).map_err(tableforge_protocol::ProtocolError::Decode)?;

    let ClientRequest::Handshake { token } = request else {
        let response = ServerResponse::Error {
            code: ApiError::InvalidArgument.code().to_string(),
            message: "first message must be a handshake".to_string(),
        };
        let _ = send_response(conn, &response).await;
        return Err(ServerError::Protocol(tableforge_protocol::ProtocolError::InvalidMessage(
            "first message must be a handshake".into(),
        )));
    };

    let identity = match state.auth.authenticate(&token).await {
        Ok(identity) => identity,
        Err(err) => {
            let response = ServerResponse::Error {
                code: ApiError::Unauthenticated.code().to_string(),
                message: err.to_string(),
            };
            let _ = send_response(conn, &response).await;
            return Err(ServerError::Session(err));
        }
    };

    let ack = ServerResponse::HandshakeAck { user_id: identity.user_id.clone() };
    send_response(conn, &ack).await?;
    Ok(identity)
}

async fn send_response(conn: &WebSocketConnection, response: &ServerResponse) -> Result<(), ServerError> {
    let bytes = serde_json::to_vec(response).map_err(tableforge_protocol::ProtocolError::Encode)?;
    conn.send(&bytes).await.map_err(ServerError::Transport)
}

/// Dispatches one authenticated client request to its handler, producing
/// the response to send back. Errors from sub-crates become `Error`
/// responses rather than tearing down the connection. Every request first
/// passes the admission rate limit, keyed by user id.
async fn dispatch<A: Authenticator>(
    state: &Arc<AppState<A>>,
    guard: &mut SessionGuard<A>,
    is_dm: &mut bool,
    event_rx: &mut Option<mpsc::UnboundedReceiver<GameEvent>>,
    request: ClientRequest,
) -> ServerResponse {
    let user_id = guard.user_id.clone();

    if !state.rate_limiter.check(user_id.as_str()) {
        return ServerResponse::Error {
            code: ApiError::ResourceExhausted.code().to_string(),
            message: "rate limit exceeded".to_string(),
        };
    }

    match request {
        ClientRequest::Handshake { .. } => unreachable!("filtered before dispatch"),

        ClientRequest::Health => {
            let (healthy, services, stats) =
                crate::health::check(state.started_at, &state.rooms, &state.persistence).await;
            ServerResponse::Health {
                status: if healthy { "ok" } else { "degraded" }.to_string(),
                uptime_secs: state.started_at.elapsed().as_secs(),
                services,
                stats,
            }
        }

        ClientRequest::JoinRoom { interaction_id, entity_id, entity_type, is_dm: requested_dm } => {
            let fresh = fresh_state(interaction_id.clone());
            let handle = match state.rooms.get_or_create_room(interaction_id.clone(), fresh).await {
                Ok(handle) => handle,
                Err(err) => return room_error(err),
            };

            if let Err(err) = handle.join(user_id.clone(), entity_id, entity_type, requested_dm).await {
                return room_error(err);
            }

            let rx = state.rooms.broadcaster().subscribe(interaction_id.clone(), user_id.clone(), requested_dm);
            *event_rx = Some(rx);
            *is_dm = requested_dm;
            guard.room = Some(interaction_id.clone());

            match handle.state().await {
                Ok(game_state) => {
                    let participant_count = game_state.participants.len();
                    ServerResponse::JoinedRoom { success: true, room_id: interaction_id, game_state, participant_count }
                }
                Err(err) => room_error(err),
            }
        }

        ClientRequest::LeaveRoom { interaction_id } => {
            let Some(handle) = state.rooms.get(&interaction_id) else {
                return room_error(RoomError::NotFound(interaction_id));
            };
            match handle.leave(user_id.clone()).await {
                Ok(()) => {
                    state.rooms.broadcaster().unsubscribe(&interaction_id, &user_id);
                    *event_rx = None;
                    guard.room = None;
                    ServerResponse::Left { success: true, message: "left room".to_string() }
                }
                Err(err) => room_error(err),
            }
        }

        ClientRequest::PauseInteraction { interaction_id, reason } => {
            if !*is_dm {
                return room_error(RoomError::DmOnly);
            }
            let Some(handle) = state.rooms.get(&interaction_id) else {
                return room_error(RoomError::NotFound(interaction_id));
            };
            match handle.pause(reason.unwrap_or_else(|| "paused by dm".to_string())).await {
                Ok(()) => ServerResponse::Paused { success: true },
                Err(err) => room_error(err),
            }
        }

        ClientRequest::ResumeInteraction { interaction_id } => {
            if !*is_dm {
                return room_error(RoomError::DmOnly);
            }
            let Some(handle) = state.rooms.get(&interaction_id) else {
                return room_error(RoomError::NotFound(interaction_id));
            };
            match handle.resume().await {
                Ok(()) => ServerResponse::Resumed { success: true },
                Err(err) => room_error(err),
            }
        }

        ClientRequest::TakeTurn { interaction_id, action } => {
            let Some(handle) = state.rooms.get(&interaction_id) else {
                return room_error(RoomError::NotFound(interaction_id));
            };
            match handle.process_turn_action(action).await {
                Ok(()) => match handle.state().await {
                    Ok(game_state) => {
                        ServerResponse::TurnResult { success: true, result: ValidationResult::ok(), game_state }
                    }
                    Err(err) => room_error(err),
                },
                Err(RoomError::ActionRejected(reason)) => match handle.state().await {
                    Ok(game_state) => {
                        ServerResponse::TurnResult { success: false, result: ValidationResult::reject(reason), game_state }
                    }
                    Err(err) => room_error(err),
                },
                Err(err) => room_error(err),
            }
        }

        ClientRequest::SkipTurn { interaction_id, reason: _ } => {
            let Some(handle) = state.rooms.get(&interaction_id) else {
                return room_error(RoomError::NotFound(interaction_id));
            };
            match handle.skip_turn(user_id.clone()).await {
                Ok(()) => ServerResponse::Skipped { success: true },
                Err(err) => room_error(err),
            }
        }

        ClientRequest::BacktrackTurn { interaction_id, turn_number: _, reason: _ } => {
            let Some(handle) = state.rooms.get(&interaction_id) else {
                return room_error(RoomError::NotFound(interaction_id));
            };
            match handle.backtrack_turn(user_id.clone()).await {
                Ok(()) => ServerResponse::Backtracked { success: true },
                Err(err) => room_error(err),
            }
        }

        ClientRequest::GetRoomState { interaction_id } => {
            let Some(handle) = state.rooms.get(&interaction_id) else {
                return room_error(RoomError::NotFound(interaction_id));
            };
            match handle.state().await {
                Ok(game_state) => ServerResponse::RoomState { game_state },
                Err(err) => room_error(err),
            }
        }

        ClientRequest::SendChatMessage { interaction_id, content, channel, recipients } => {
            let Some(handle) = state.rooms.get(&interaction_id) else {
                return room_error(RoomError::NotFound(interaction_id));
            };
            match handle.send_chat_message(user_id.clone(), *is_dm, content, channel, recipients).await {
                Ok(()) => ServerResponse::ChatSent { success: true },
                Err(err) => room_error(err),
            }
        }

        ClientRequest::GetChatHistory { interaction_id, channel, limit } => {
            let Some(handle) = state.rooms.get(&interaction_id) else {
                return room_error(RoomError::NotFound(interaction_id));
            };
            match handle.get_chat_history(user_id.clone(), *is_dm, channel, limit).await {
                Ok(messages) => ServerResponse::ChatHistory { messages },
                Err(err) => room_error(err),
            }
        }

        ClientRequest::Heartbeat => {
            let mut sessions = state.sessions.lock().await;
            let _ = sessions.heartbeat(&user_id);
            ServerResponse::HeartbeatAck
        }
    }
}

fn room_error(err: RoomError) -> ServerResponse {
    let api: ApiError = (&err).into();
    ServerResponse::Error { code: api.code().to_string(), message: err.to_string() }
}

/// A brand-new interaction with no persisted state: empty party, waiting
/// for participants to join.
fn fresh_state(interaction_id: InteractionId) -> GameState {
    GameState {
        interaction_id,
        status: InteractionStatus::Waiting,
        initiative_order: Vec::new(),
        current_turn_index: 0,
        round_number: 1,
        participants: Vec::new(),
        map_state: MapState { width: 20, height: 20, entities: Vec::new(), obstacles: Vec::new(), terrain: Vec::new() },
        turn_history: Vec::new(),
        chat_log: Vec::new(),
        timestamp: Utc::now(),
    }
}
