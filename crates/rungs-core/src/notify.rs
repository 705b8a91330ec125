//! Fire-and-forget progression notifications.
//!
//! Mutations queue notifications while their transaction is open and the
//! engine publishes them only after commit, so a listener never hears about a
//! change that was rolled back.

use crate::model::badge::BadgeKey;
use crate::model::boss::BossRewards;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

/// Buffered notifications per subscriber before the slowest one starts
/// missing messages.
pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    LevelUp {
        user_id: String,
        old_level: u32,
        new_level: u32,
    },
    RankUp {
        user_id: String,
        new_rank: String,
        rank_name: String,
        grade: String,
    },
    BadgeUnlock {
        user_id: String,
        badge_id: BadgeKey,
    },
    BossDefeated {
        user_id: String,
        boss: String,
        boss_name: String,
        rewards: BossRewards,
    },
}

impl Notification {
    #[must_use]
    pub fn user_id(&self) -> &str {
        match self {
            Self::LevelUp { user_id, .. }
            | Self::RankUp { user_id, .. }
            | Self::BadgeUnlock { user_id, .. }
            | Self::BossDefeated { user_id, .. } => user_id,
        }
    }
}

/// Broadcast channel with zero or more listeners.
#[derive(Debug, Clone)]
pub struct NotificationBus {
    sender: broadcast::Sender<Notification>,
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl NotificationBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Publish to current listeners. Having none is not an error.
    pub fn publish(&self, notification: Notification) {
        if self.sender.send(notification).is_err() {
            trace!("notification dropped: no listeners");
        }
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::badge::BadgeTier;

    #[test]
    fn publish_without_listeners_is_silent() {
        let bus = NotificationBus::default();
        assert_eq!(bus.listener_count(), 0);
        bus.publish(Notification::LevelUp {
            user_id: "rep-1".to_string(),
            old_level: 1,
            new_level: 2,
        });
    }

    #[test]
    fn every_listener_receives() {
        let bus = NotificationBus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        let note = Notification::BadgeUnlock {
            user_id: "rep-1".to_string(),
            badge_id: BadgeKey::new("closer", BadgeTier::Bronze),
        };
        bus.publish(note.clone());
        assert_eq!(a.try_recv().expect("a receives"), note);
        assert_eq!(b.try_recv().expect("b receives"), note);
    }

    #[test]
    fn serializes_with_kind_tag() {
        let note = Notification::RankUp {
            user_id: "rep-1".to_string(),
            new_rank: "sdr_2".to_string(),
            rank_name: "SDR II".to_string(),
            grade: "E-2".to_string(),
        };
        let json = serde_json::to_value(&note).expect("serialize");
        assert_eq!(json["kind"], "rank_up");
        assert_eq!(json["grade"], "E-2");
        assert_eq!(note.user_id(), "rep-1");
    }
}
