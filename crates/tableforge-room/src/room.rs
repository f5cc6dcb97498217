//! Room actor: an isolated Tokio task that owns one interaction's
//! authoritative `GameState`.
//!
//! Each room runs in its own task and is reached only through its command
//! channel — no shared mutable state, just message passing. This gives
//! `processTurnAction` the linearizability the engine requires: the actor
//! processes one command at a time, in arrival order.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Utc;
use tableforge_broadcast::Broadcaster;
use tableforge_chat::{ChatConfig, ChatService, Sender as ChatSender};
use tableforge_engine::DefaultDamageResolver;
use tableforge_persistence::PersistenceGateway;
use tableforge_protocol::{
    ApiError, ChatChannel, ChatMessage, EntityId, EntityType, GameEvent, GameState,
    InitiativeEntry, InteractionId, InteractionStatus, Participant, StateDelta, TurnAction,
    TurnRecordStatus, UserId,
};
use tableforge_recovery::{default_strategy, ErrorKind, RecoveryStrategy, SnapshotRing};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::config::RoomConfig;
use crate::error::RoomError;

/// A room's view of one connected user, distinct from the game-facing
/// `Participant` record in `GameState` (which tracks HP, position, etc.).
#[derive(Debug, Clone)]
pub struct RoomMember {
    pub entity_id: EntityId,
    pub entity_type: EntityType,
    pub is_dm: bool,
    pub is_connected: bool,
}

/// A snapshot of room metadata, handed back to callers that ask for it.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub interaction_id: InteractionId,
    pub status: InteractionStatus,
    pub member_count: usize,
    pub round_number: u32,
    pub idle_duration: StdDuration,
}

pub(crate) enum RoomCommand {
    Join {
        user_id: UserId,
        entity_id: EntityId,
        entity_type: EntityType,
        is_dm: bool,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Leave {
        user_id: UserId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    UpdateConnection {
        user_id: UserId,
        is_connected: bool,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    ProcessTurnAction {
        action: TurnAction,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    SkipTurn {
        requested_by: UserId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    BacktrackTurn {
        requested_by: UserId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Pause {
        reason: String,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Resume {
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Complete {
        reason: String,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    SendChatMessage {
        sender: UserId,
        is_dm: bool,
        content: String,
        channel: ChatChannel,
        recipients: Option<Vec<UserId>>,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    GetState {
        reply: oneshot::Sender<GameState>,
    },
    GetChatHistory {
        viewer: UserId,
        viewer_is_dm: bool,
        channel: Option<ChatChannel>,
        limit: Option<usize>,
        reply: oneshot::Sender<Vec<ChatMessage>>,
    },
    GetParticipant {
        user_id: UserId,
        reply: oneshot::Sender<Option<RoomMember>>,
    },
    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },
    Shutdown,
}

/// Cheaply-cloneable handle to a running room actor.
#[derive(Clone)]
pub struct RoomHandle {
    interaction_id: InteractionId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn interaction_id(&self) -> &InteractionId {
        &self.interaction_id
    }

    pub async fn join(
        &self,
        user_id: UserId,
        entity_id: EntityId,
        entity_type: EntityType,
        is_dm: bool,
    ) -> Result<(), RoomError> {
        self.call(|reply| RoomCommand::Join { user_id, entity_id, entity_type, is_dm, reply }).await
    }

    pub async fn leave(&self, user_id: UserId) -> Result<(), RoomError> {
        self.call(|reply| RoomCommand::Leave { user_id, reply }).await
    }

    pub async fn update_connection(&self, user_id: UserId, is_connected: bool) -> Result<(), RoomError> {
        self.call(|reply| RoomCommand::UpdateConnection { user_id, is_connected, reply }).await
    }

    pub async fn process_turn_action(&self, action: TurnAction) -> Result<(), RoomError> {
        self.call(|reply| RoomCommand::ProcessTurnAction { action, reply }).await
    }

    pub async fn skip_turn(&self, requested_by: UserId) -> Result<(), RoomError> {
        self.call(|reply| RoomCommand::SkipTurn { requested_by, reply }).await
    }

    pub async fn backtrack_turn(&self, requested_by: UserId) -> Result<(), RoomError> {
        self.call(|reply| RoomCommand::BacktrackTurn { requested_by, reply }).await
    }

    pub async fn pause(&self, reason: impl Into<String>) -> Result<(), RoomError> {
        let reason = reason.into();
        self.call(|reply| RoomCommand::Pause { reason, reply }).await
    }

    pub async fn resume(&self) -> Result<(), RoomError> {
        self.call(|reply| RoomCommand::Resume { reply }).await
    }

    pub async fn complete(&self, reason: impl Into<String>) -> Result<(), RoomError> {
        let reason = reason.into();
        self.call(|reply| RoomCommand::Complete { reason, reply }).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn send_chat_message(
        &self,
        sender: UserId,
        is_dm: bool,
        content: impl Into<String>,
        channel: ChatChannel,
        recipients: Option<Vec<UserId>>,
    ) -> Result<(), RoomError> {
        let content = content.into();
        self.call(|reply| RoomCommand::SendChatMessage { sender, is_dm, content, channel, recipients, reply })
            .await
    }

    pub async fn state(&self) -> Result<GameState, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.sender.send(RoomCommand::GetState { reply }).await.map_err(|_| RoomError::Unavailable)?;
        rx.await.map_err(|_| RoomError::Unavailable)
    }

    /// Returns chat history visible to `viewer`, newest message first.
    pub async fn get_chat_history(
        &self,
        viewer: UserId,
        viewer_is_dm: bool,
        channel: Option<ChatChannel>,
        limit: Option<usize>,
    ) -> Result<Vec<ChatMessage>, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::GetChatHistory { viewer, viewer_is_dm, channel, limit, reply })
            .await
            .map_err(|_| RoomError::Unavailable)?;
        rx.await.map_err(|_| RoomError::Unavailable)
    }

    pub async fn participant(&self, user_id: UserId) -> Result<Option<RoomMember>, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::GetParticipant { user_id, reply })
            .await
            .map_err(|_| RoomError::Unavailable)?;
        rx.await.map_err(|_| RoomError::Unavailable)
    }

    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.sender.send(RoomCommand::GetInfo { reply }).await.map_err(|_| RoomError::Unavailable)?;
        rx.await.map_err(|_| RoomError::Unavailable)
    }

    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender.send(RoomCommand::Shutdown).await.map_err(|_| RoomError::Unavailable)
    }

    async fn call<F>(&self, make: F) -> Result<(), RoomError>
    where
        F: FnOnce(oneshot::Sender<Result<(), RoomError>>) -> RoomCommand,
    {
        let (reply, rx) = oneshot::channel();
        self.sender.send(make(reply)).await.map_err(|_| RoomError::Unavailable)?;
        rx.await.map_err(|_| RoomError::Unavailable)?
    }
}

struct RoomActor {
    state: GameState,
    config: RoomConfig,
    members: HashMap<UserId, RoomMember>,
    broadcaster: Arc<Broadcaster>,
    persistence: Arc<dyn PersistenceGateway>,
    chat: ChatService,
    recovery: SnapshotRing,
    last_activity: Instant,
    dm_disconnect_deadline: Option<Instant>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    async fn run(mut self) {
        let interaction_id = self.state.interaction_id.clone();
        tracing::info!(%interaction_id, "room actor started");

        loop {
            let turn_dl = self.turn_deadline();
            let dm_dl = self.dm_disconnect_deadline;
            let deadline = match (turn_dl, dm_dl) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (Some(a), None) => Some(a),
                (None, Some(b)) => Some(b),
                (None, None) => None,
            };
            let sleep = match deadline {
                Some(d) => tokio::time::sleep_until(d),
                None => tokio::time::sleep(StdDuration::from_secs(3600)),
            };
            tokio::pin!(sleep);

            tokio::select! {
                cmd = self.receiver.recv() => {
                    match cmd {
                        Some(cmd) => {
                            if self.handle(cmd).await {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = &mut sleep, if deadline.is_some() => {
                    let now = Instant::now();
                    if matches!(turn_dl, Some(d) if now >= d) {
                        self.handle_turn_timeout();
                    }
                    if matches!(self.dm_disconnect_deadline, Some(d) if now >= d) {
                        self.handle_dm_disconnect_timeout();
                    }
                }
            }
        }

        tracing::info!(%interaction_id, "room actor stopped");
    }

    fn turn_deadline(&self) -> Option<Instant> {
        if self.state.status != InteractionStatus::Active || self.state.initiative_order.is_empty() {
            return None;
        }
        Some(self.last_activity + self.config.turn_time_limit)
    }

    /// Returns `true` if the actor loop should stop after this command.
    async fn handle(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join { user_id, entity_id, entity_type, is_dm, reply } => {
                let result = self.handle_join(user_id, entity_id, entity_type, is_dm);
                let _ = reply.send(result);
            }
            RoomCommand::Leave { user_id, reply } => {
                let result = self.handle_leave(user_id);
                let _ = reply.send(result);
            }
            RoomCommand::UpdateConnection { user_id, is_connected, reply } => {
                let result = self.handle_update_connection(user_id, is_connected);
                let _ = reply.send(result);
            }
            RoomCommand::ProcessTurnAction { action, reply } => {
                let result = self.handle_process_turn_action(action).await;
                let _ = reply.send(result);
            }
            RoomCommand::SkipTurn { requested_by, reply } => {
                let result = self.handle_skip_turn(&requested_by);
                let _ = reply.send(result);
            }
            RoomCommand::BacktrackTurn { requested_by, reply } => {
                let result = self.handle_backtrack_turn(&requested_by);
                let _ = reply.send(result);
            }
            RoomCommand::Pause { reason, reply } => {
                let result = self.handle_pause(reason);
                let _ = reply.send(result);
            }
            RoomCommand::Resume { reply } => {
                let result = self.handle_resume();
                let _ = reply.send(result);
            }
            RoomCommand::Complete { reason, reply } => {
                let result = self.handle_complete(reason).await;
                let _ = reply.send(result);
            }
            RoomCommand::SendChatMessage { sender, is_dm, content, channel, recipients, reply } => {
                let result = self.handle_send_chat_message(sender, is_dm, content, channel, recipients);
                let _ = reply.send(result);
            }
            RoomCommand::GetState { reply } => {
                let _ = reply.send(self.state.clone());
            }
            RoomCommand::GetChatHistory { viewer, viewer_is_dm, channel, limit, reply } => {
                let history = self.chat.get_chat_history(&self.state, &viewer, viewer_is_dm, channel, limit);
                let _ = reply.send(history);
            }
            RoomCommand::GetParticipant { user_id, reply } => {
                let _ = reply.send(self.members.get(&user_id).cloned());
            }
            RoomCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::Shutdown => {
                tracing::info!(interaction_id = %self.state.interaction_id, "room shutting down");
                return true;
            }
        }
        false
    }

    fn handle_join(
        &mut self,
        user_id: UserId,
        entity_id: EntityId,
        entity_type: EntityType,
        is_dm: bool,
    ) -> Result<(), RoomError> {
        if self.members.contains_key(&user_id) {
            return Err(RoomError::AlreadyJoined(user_id));
        }

        self.members.insert(
            user_id.clone(),
            RoomMember { entity_id: entity_id.clone(), entity_type, is_dm, is_connected: true },
        );

        if self.state.participant(&entity_id).is_none() {
            self.state.participants.push(Participant {
                entity_id: entity_id.clone(),
                entity_type,
                user_id: user_id.clone(),
                is_dm,
                current_hp: 1,
                max_hp: 1,
                position: tableforge_protocol::Position { x: 0, y: 0 },
                movement_speed: 6,
                conditions: Vec::new(),
                inventory: tableforge_protocol::Inventory { items: Vec::new(), equipped: Vec::new(), capacity: 0 },
                available_actions: vec!["move".into(), "attack".into(), "end".into()],
                turn_status: tableforge_protocol::TurnStatus::Waiting,
            });
            self.rebuild_initiative();
        }

        self.touch();
        self.emit(GameEvent::ParticipantJoined { interaction_id: self.state.interaction_id.clone(), entity_id });
        Ok(())
    }

    fn handle_leave(&mut self, user_id: UserId) -> Result<(), RoomError> {
        let member = self.members.remove(&user_id).ok_or_else(|| RoomError::NotParticipant(user_id.clone()))?;
        self.state.participants.retain(|p| p.user_id != user_id);
        self.rebuild_initiative();
        self.touch();
        self.emit(GameEvent::ParticipantLeft {
            interaction_id: self.state.interaction_id.clone(),
            entity_id: member.entity_id,
        });
        Ok(())
    }

    fn handle_update_connection(&mut self, user_id: UserId, is_connected: bool) -> Result<(), RoomError> {
        let is_dm = {
            let member = self.members.get_mut(&user_id).ok_or_else(|| RoomError::NotParticipant(user_id.clone()))?;
            member.is_connected = is_connected;
            member.is_dm
        };

        self.touch();
        if is_dm && !is_connected && self.state.status == InteractionStatus::Active {
            self.dm_disconnect_deadline = Some(Instant::now() + self.config.dm_disconnect_grace);
        } else if is_dm && is_connected {
            // The DM reconnecting cancels a pending grace-period pause, but
            // does not itself resume an interaction already paused — that
            // stays an explicit DM operation.
            self.dm_disconnect_deadline = None;
        }

        if is_connected {
            self.send_full_sync(&user_id);
        }

        self.emit(if is_connected {
            GameEvent::PlayerReconnected { interaction_id: self.state.interaction_id.clone(), user_id, is_dm }
        } else {
            GameEvent::PlayerDisconnected { interaction_id: self.state.interaction_id.clone(), user_id, is_dm }
        });
        Ok(())
    }

    /// Sends the reconnecting user a full-state resync, ahead of the
    /// `PlayerReconnected` notice, so their client doesn't have to infer
    /// what it missed while disconnected.
    fn send_full_sync(&self, user_id: &UserId) {
        let delta = StateDelta::full_sync(self.state.interaction_id.clone(), self.state.clone(), Utc::now());
        self.broadcaster.broadcast_to_user(
            &self.state.interaction_id,
            user_id,
            GameEvent::StateDeltaEvent { delta },
        );
    }

    fn handle_dm_disconnect_timeout(&mut self) {
        self.dm_disconnect_deadline = None;
        let _ = self.handle_pause("dm disconnect grace period elapsed".to_string());
    }

    async fn handle_process_turn_action(&mut self, action: TurnAction) -> Result<(), RoomError> {
        let validation = tableforge_engine::validate(&self.state, &action);
        if !validation.valid {
            let message = validation.errors.join("; ");
            self.emit_recovery_error(ErrorKind::ConcurrentActionConflict, ApiError::Conflict, &message);
            return Err(RoomError::ActionRejected(message));
        }

        let before = self.state.clone();
        let delta = tableforge_engine::apply(&mut self.state, &action, &DefaultDamageResolver);
        self.touch();

        if let Err(violation) = tableforge_engine::check_invariants(&self.state) {
            tracing::error!(
                interaction_id = %self.state.interaction_id,
                violation = %violation,
                "game state invariant violated after applying action, rolling back"
            );
            let strategy = default_strategy(ErrorKind::InvalidGameState);
            if strategy == RecoveryStrategy::RollbackToSnapshot {
                self.state = before;
            }
            self.emit_recovery_error(ErrorKind::InvalidGameState, ApiError::Internal, &violation);
            return Err(RoomError::ActionRejected(violation));
        }

        self.recovery.push(self.state.clone(), Utc::now());

        let interaction_id = self.state.interaction_id.clone();
        if let Some(entity_id) = self.state.current_entity_id().cloned() {
            if action.action_type == tableforge_protocol::ActionType::End {
                self.emit(GameEvent::TurnStarted {
                    interaction_id: interaction_id.clone(),
                    entity_id,
                    round_number: self.state.round_number,
                });
            }
        }
        self.emit(GameEvent::StateDeltaEvent { delta });

        let snapshot = self.state.clone();
        let persistence = self.persistence.clone();
        let document = serde_json::to_value(&snapshot).unwrap_or(serde_json::Value::Null);
        let id = interaction_id.as_str().to_string();
        tokio::spawn(async move {
            if let Err(err) = persistence.write("game_states", &id, document).await {
                tracing::warn!(%err, "failed to persist game state");
            }
        });

        Ok(())
    }

    fn handle_skip_turn(&mut self, requested_by: &UserId) -> Result<(), RoomError> {
        let is_dm = self.members.get(requested_by).map(|m| m.is_dm).unwrap_or(false);
        if !is_dm {
            return Err(RoomError::DmOnly);
        }
        self.skip_current_turn("skipped by dm");
        Ok(())
    }

    fn skip_current_turn(&mut self, reason: &str) {
        let Some(entity_id) = self.state.current_entity_id().cloned() else { return };
        tableforge_engine::advance_turn(&mut self.state, TurnRecordStatus::Skipped);
        self.touch();
        self.emit(GameEvent::TurnSkipped {
            interaction_id: self.state.interaction_id.clone(),
            entity_id,
            reason: reason.to_string(),
        });
    }

    fn handle_turn_timeout(&mut self) {
        tableforge_engine::advance_turn(&mut self.state, TurnRecordStatus::Timeout);
        self.touch();
        if let Some(entity_id) = self.state.current_entity_id().cloned() {
            self.emit(GameEvent::TurnSkipped {
                interaction_id: self.state.interaction_id.clone(),
                entity_id,
                reason: "timeout".to_string(),
            });
        }
    }

    fn handle_backtrack_turn(&mut self, requested_by: &UserId) -> Result<(), RoomError> {
        let is_dm = self.members.get(requested_by).map(|m| m.is_dm).unwrap_or(false);
        if !is_dm {
            return Err(RoomError::DmOnly);
        }
        let snapshot = self.recovery.newest_before(self.state.timestamp).map_err(|_| RoomError::NoSnapshotAvailable)?;
        let to_turn_number = snapshot.state.turn_history.len() as u32;
        self.state = snapshot.state.clone();
        self.touch();
        self.emit(GameEvent::TurnBacktracked { interaction_id: self.state.interaction_id.clone(), to_turn_number });
        Ok(())
    }

    fn handle_pause(&mut self, reason: String) -> Result<(), RoomError> {
        if !self.state.status.can_transition_to(InteractionStatus::Paused) {
            return Err(RoomError::InvalidTransition);
        }
        self.state.status = InteractionStatus::Paused;
        self.touch();
        self.emit(GameEvent::InteractionPaused { interaction_id: self.state.interaction_id.clone(), reason });
        Ok(())
    }

    fn handle_resume(&mut self) -> Result<(), RoomError> {
        if !self.state.status.can_transition_to(InteractionStatus::Active) {
            return Err(RoomError::InvalidTransition);
        }
        self.state.status = InteractionStatus::Active;
        self.touch();
        self.emit(GameEvent::InteractionResumed { interaction_id: self.state.interaction_id.clone() });
        Ok(())
    }

    async fn handle_complete(&mut self, reason: String) -> Result<(), RoomError> {
        if !self.state.status.can_transition_to(InteractionStatus::Completed) {
            return Err(RoomError::InvalidTransition);
        }
        self.state.status = InteractionStatus::Completed;
        self.touch();

        let interaction_id = self.state.interaction_id.clone();
        let document = serde_json::json!({ "state": self.state, "reason": reason });
        if let Err(err) = self.persistence.write("completions", interaction_id.as_str(), document).await {
            tracing::warn!(%err, "failed to persist completion record");
        }

        self.emit(GameEvent::InteractionCompleted { interaction_id });
        Ok(())
    }

    fn handle_send_chat_message(
        &mut self,
        sender: UserId,
        is_dm: bool,
        content: String,
        channel: ChatChannel,
        recipients: Option<Vec<UserId>>,
    ) -> Result<(), RoomError> {
        let chat_sender = ChatSender::Participant { user_id: sender, is_dm };
        let message = self
            .chat
            .send_message(&mut self.state, &chat_sender, &content, channel, recipients, None)
            .map_err(|err| RoomError::ActionRejected(err.to_string()))?;
        self.touch();
        self.emit(GameEvent::ChatMessageEvent { interaction_id: self.state.interaction_id.clone(), message });
        Ok(())
    }

    fn rebuild_initiative(&mut self) {
        let entries: Vec<InitiativeEntry> = self
            .state
            .participants
            .iter()
            .map(|p| {
                let carried = self.state.initiative_order.iter().find(|e| e.entity_id == p.entity_id);
                InitiativeEntry {
                    entity_id: p.entity_id.clone(),
                    entity_type: p.entity_type,
                    initiative: carried.map(|e| e.initiative).unwrap_or(0),
                    user_id: Some(p.user_id.clone()),
                }
            })
            .collect();
        tableforge_engine::rebuild_initiative(&mut self.state, entries);
        self.emit(GameEvent::InitiativeUpdated {
            interaction_id: self.state.interaction_id.clone(),
            order: self.state.initiative_order.clone(),
        });
    }

    fn emit(&self, event: GameEvent) {
        self.broadcaster.broadcast(event);
    }

    /// Classifies an error under the recovery strategy table and emits it
    /// as a `GameEvent::Error`. The recovery strategy drives what this
    /// function's caller does about it; `api_error` is the stable code the
    /// event carries for clients, consistent with every other error path.
    fn emit_recovery_error(&self, kind: ErrorKind, api_error: ApiError, message: &str) {
        let strategy = default_strategy(kind);
        tracing::debug!(?kind, ?strategy, "error classified for recovery");
        self.emit(GameEvent::Error {
            interaction_id: self.state.interaction_id.clone(),
            code: api_error.code().to_string(),
            message: message.to_string(),
            at: Utc::now(),
        });
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
        self.state.timestamp = Utc::now();
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            interaction_id: self.state.interaction_id.clone(),
            status: self.state.status,
            member_count: self.members.len(),
            round_number: self.state.round_number,
            idle_duration: self.last_activity.elapsed(),
        }
    }
}

pub(crate) fn spawn_room(
    state: GameState,
    config: RoomConfig,
    broadcaster: Arc<Broadcaster>,
    persistence: Arc<dyn PersistenceGateway>,
) -> RoomHandle {
    let interaction_id = state.interaction_id.clone();
    let (tx, rx) = mpsc::channel(256);
    let snapshot_capacity = config.snapshot_capacity;

    let actor = RoomActor {
        state,
        config,
        members: HashMap::new(),
        broadcaster,
        persistence,
        chat: ChatService::new(ChatConfig::default()),
        recovery: SnapshotRing::new(snapshot_capacity),
        last_activity: Instant::now(),
        dm_disconnect_deadline: None,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle { interaction_id, sender: tx }
}
