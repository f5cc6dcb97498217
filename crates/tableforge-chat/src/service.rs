//! Channel-scoped chat: validation, rate limiting, content filtering, and
//! visibility-aware history retrieval.

use tableforge_protocol::{ChatChannel, ChatMessage, EntityId, GameState, UserId};
use tableforge_session::RateLimiter;

use crate::error::ChatError;
use crate::filter::ContentFilter;

/// Identity of whoever is posting a message. Distinct from [`tableforge_session::Identity`]
/// because chat permissions hinge on DM/system role, not on session plumbing.
#[derive(Debug, Clone)]
pub enum Sender {
    Participant { user_id: UserId, is_dm: bool },
    System,
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub max_message_length: usize,
    pub rate_limit_window_secs: u64,
    pub rate_limit_max_messages: u32,
    pub max_history_size: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_message_length: 1000,
            rate_limit_window_secs: 60,
            rate_limit_max_messages: 5,
            max_history_size: 10,
        }
    }
}

pub struct ChatService {
    config: ChatConfig,
    rate_limiter: RateLimiter,
    filter: Option<ContentFilter>,
}

impl ChatService {
    pub fn new(config: ChatConfig) -> Self {
        let rate_limiter = RateLimiter::new(
            std::time::Duration::from_secs(config.rate_limit_window_secs),
            config.rate_limit_max_messages,
        );
        Self { config, rate_limiter, filter: None }
    }

    pub fn with_filter(mut self, filter: ContentFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn send_message(
        &self,
        state: &mut GameState,
        sender: &Sender,
        content: &str,
        channel: ChatChannel,
        recipients: Option<Vec<UserId>>,
        entity_id: Option<EntityId>,
    ) -> Result<ChatMessage, ChatError> {
        let trimmed = content.trim();
        if trimmed.is_empty() || trimmed.len() > self.config.max_message_length {
            return Err(ChatError::InvalidLength { max: self.config.max_message_length });
        }

        if let Sender::Participant { user_id, .. } = sender {
            if !self.rate_limiter.check(user_id.as_str()) {
                return Err(ChatError::RateLimited);
            }
        }

        self.authorize(state, sender, channel, recipients.as_deref())?;

        let masked = self.filter.as_ref().map(|f| f.apply(trimmed)).unwrap_or_else(|| trimmed.to_string());

        let user_id = match sender {
            Sender::Participant { user_id, .. } => Some(user_id.clone()),
            Sender::System => None,
        };

        let message = ChatMessage {
            id: generate_id(),
            user_id,
            entity_id,
            content: masked,
            channel,
            recipients,
            timestamp: chrono::Utc::now(),
        };

        state.chat_log.push(message.clone());
        if state.chat_log.len() > self.config.max_history_size {
            let overflow = state.chat_log.len() - self.config.max_history_size;
            state.chat_log.drain(0..overflow);
        }

        Ok(message)
    }

    fn authorize(
        &self,
        state: &GameState,
        sender: &Sender,
        channel: ChatChannel,
        recipients: Option<&[UserId]>,
    ) -> Result<(), ChatError> {
        let is_participant = |user_id: &UserId| state.participants.iter().any(|p| &p.user_id == user_id);

        match channel {
            ChatChannel::System => {
                if !matches!(sender, Sender::System) {
                    return Err(ChatError::SystemChannelForbidden);
                }
            }
            ChatChannel::Dm => match sender {
                Sender::Participant { is_dm: true, .. } => {}
                _ => return Err(ChatError::DmChannelForbidden),
            },
            ChatChannel::Party => {
                if let Sender::Participant { user_id, .. } = sender {
                    if !is_participant(user_id) {
                        return Err(ChatError::SenderNotParticipant);
                    }
                }
            }
            ChatChannel::Private => {
                let Sender::Participant { user_id, .. } = sender else {
                    return Err(ChatError::SenderNotParticipant);
                };
                if !is_participant(user_id) {
                    return Err(ChatError::SenderNotParticipant);
                }
                let recipients = recipients.filter(|r| !r.is_empty()).ok_or(ChatError::EmptyRecipients)?;
                for recipient in recipients {
                    if !is_participant(recipient) {
                        return Err(ChatError::RecipientNotParticipant(recipient.as_str().to_string()));
                    }
                }
            }
        }
        Ok(())
    }

    /// Returns history visible to `viewer`, newest first, optionally
    /// restricted to one channel and truncated to `limit` entries.
    pub fn get_chat_history(
        &self,
        state: &GameState,
        viewer: &UserId,
        viewer_is_dm: bool,
        channel: Option<ChatChannel>,
        limit: Option<usize>,
    ) -> Vec<ChatMessage> {
        let mut visible: Vec<ChatMessage> = state
            .chat_log
            .iter()
            .filter(|m| channel.is_none_or(|c| m.channel == c))
            .filter(|m| self.visible_to(m, viewer, viewer_is_dm))
            .cloned()
            .collect();

        visible.reverse();
        if let Some(limit) = limit {
            visible.truncate(limit);
        }
        visible
    }

    fn visible_to(&self, message: &ChatMessage, viewer: &UserId, viewer_is_dm: bool) -> bool {
        match message.channel {
            ChatChannel::Party | ChatChannel::System => true,
            ChatChannel::Dm => viewer_is_dm || message.user_id.as_ref() == Some(viewer),
            ChatChannel::Private => {
                message.user_id.as_ref() == Some(viewer)
                    || message.recipients.as_ref().is_some_and(|r| r.contains(viewer))
            }
        }
    }
}

fn generate_id() -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    let bytes: [u8; 8] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
