//! Per-interaction subscriber registry and fan-out.
//!
//! Delivery is at-most-once per subscriber and preserves the order events
//! were broadcast in, because each subscriber has its own unbounded
//! `mpsc` channel and `broadcast` sends into it in order. A subscriber
//! whose receiver has been dropped is pruned lazily on the next send.

use dashmap::DashMap;
use tableforge_protocol::{GameEvent, InteractionId, UserId};
use tokio::sync::mpsc;

struct Subscriber {
    user_id: UserId,
    is_dm: bool,
    tx: mpsc::UnboundedSender<GameEvent>,
}

#[derive(Default)]
pub struct Broadcaster {
    subscribers: DashMap<InteractionId, Vec<Subscriber>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber for an interaction and returns the
    /// receiving half of its event channel.
    pub fn subscribe(
        &self,
        interaction_id: InteractionId,
        user_id: UserId,
        is_dm: bool,
    ) -> mpsc::UnboundedReceiver<GameEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .entry(interaction_id.clone())
            .or_default()
            .push(Subscriber { user_id: user_id.clone(), is_dm, tx });
        tracing::debug!(%interaction_id, %user_id, "subscribed to interaction events");
        rx
    }

    pub fn unsubscribe(&self, interaction_id: &InteractionId, user_id: &UserId) {
        if let Some(mut subs) = self.subscribers.get_mut(interaction_id) {
            subs.retain(|s| &s.user_id != user_id);
        }
    }

    /// Sends `event` to every subscriber of `interaction_id` for whom the
    /// event is visible, pruning any subscriber whose receiver was dropped.
    pub fn broadcast(&self, event: GameEvent) {
        let interaction_id = event.interaction_id().clone();
        if let Some(mut subs) = self.subscribers.get_mut(&interaction_id) {
            subs.retain(|s| {
                if !event.visible_to(&s.user_id, s.is_dm) {
                    return true;
                }
                s.tx.send(event.clone()).is_ok()
            });
        }
    }

    /// Sends `event` to a single subscriber, bypassing visibility
    /// filtering — used for targeted notices like full-sync-on-reconnect.
    pub fn broadcast_to_user(&self, interaction_id: &InteractionId, user_id: &UserId, event: GameEvent) {
        if let Some(mut subs) = self.subscribers.get_mut(interaction_id) {
            subs.retain(|s| {
                if &s.user_id != user_id {
                    return true;
                }
                s.tx.send(event.clone()).is_ok()
            });
        }
    }

    pub fn subscriber_count(&self, interaction_id: &InteractionId) -> usize {
        self.subscribers.get(interaction_id).map(|s| s.len()).unwrap_or(0)
    }

    pub fn remove_interaction(&self, interaction_id: &InteractionId) {
        self.subscribers.remove(interaction_id);
    }
}
