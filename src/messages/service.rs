use std::collections::HashMap;
use std::sync::Arc;

use confab_error::{AppError, AppResult};
use confab_types::{
    GroupId, Message, MessageId, MessageKind, MessageView, User, UserId,
};
use serde::Serialize;
use tracing::{error, warn};

use crate::mqtt::FanoutPublisher;
use crate::store::{GroupStore, MembershipStore, MessageStore, UserStore};

/// One entry of the recent-conversations overview: the partner, the latest
/// message exchanged with them and how many of their messages are unread.
#[derive(Debug, Clone, Serialize)]
pub struct RecentChat {
    pub partner: User,
    pub last_message: Message,
    pub unseen_count: i64,
}

/// Routes messages: validates, authorizes against membership, persists and
/// then fans out.
///
/// Persist happens-before publish, always. A message that was accepted is in
/// Postgres; whether the broker got it only affects real-time delivery and is
/// never surfaced to the sender.
#[derive(Clone)]
pub struct MessageService {
    messages: Arc<dyn MessageStore>,
    groups: Arc<dyn GroupStore>,
    memberships: Arc<dyn MembershipStore>,
    users: Arc<dyn UserStore>,
    publisher: Arc<FanoutPublisher>,
}

impl MessageService {
    pub fn new(
        messages: Arc<dyn MessageStore>,
        groups: Arc<dyn GroupStore>,
        memberships: Arc<dyn MembershipStore>,
        users: Arc<dyn UserStore>,
        publisher: Arc<FanoutPublisher>,
    ) -> Self {
        Self {
            messages,
            groups,
            memberships,
            users,
            publisher,
        }
    }

    /// Send a direct message to another user.
    pub async fn send_direct(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        content: String,
        kind: Option<&str>,
    ) -> AppResult<MessageView> {
        let kind = parse_kind(kind)?;
        if content.is_empty() {
            return Err(AppError::validation("Message content is required"));
        }
        if self.users.get(receiver_id).await?.is_none() {
            return Err(AppError::not_found("Receiver not found"));
        }

        let message = Message::new_direct(sender_id, receiver_id, content, kind);
        self.messages.insert(&message).await?;

        if let Err(err) = self.publisher.publish_direct(&message).await {
            error!(message_id = %message.id, error = %err, "Direct message fan-out failed");
        }

        self.finish_send(message).await
    }

    /// Send a message to a group the sender belongs to.
    pub async fn send_group(
        &self,
        sender_id: UserId,
        group_id: GroupId,
        content: String,
        kind: Option<&str>,
    ) -> AppResult<MessageView> {
        let kind = parse_kind(kind)?;
        if content.is_empty() {
            return Err(AppError::validation("Message content is required"));
        }
        self.groups.require(group_id).await?;
        if !self.memberships.is_member(group_id, sender_id).await? {
            return Err(AppError::forbidden("You are not a member of this group"));
        }

        let message = Message::new_group(sender_id, group_id, content, kind);
        self.messages.insert(&message).await?;

        if let Err(err) = self.publisher.publish_group(&message).await {
            error!(message_id = %message.id, error = %err, "Group message fan-out failed");
        }

        self.finish_send(message).await
    }

    /// Direct history between two users. Only the two participants may read
    /// it.
    pub async fn list_direct(
        &self,
        requester_id: UserId,
        user_a: UserId,
        user_b: UserId,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<MessageView>> {
        if requester_id != user_a && requester_id != user_b {
            return Err(AppError::forbidden(
                "You can only view your own conversations",
            ));
        }

        let messages = self.messages.list_direct(user_a, user_b, limit, offset).await?;
        self.hydrate_all(messages).await
    }

    /// Group history. Members only.
    pub async fn list_group(
        &self,
        requester_id: UserId,
        group_id: GroupId,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<MessageView>> {
        self.groups.require(group_id).await?;
        if !self.memberships.is_member(group_id, requester_id).await? {
            return Err(AppError::forbidden("You are not a member of this group"));
        }

        let messages = self.messages.list_group(group_id, limit, offset).await?;
        self.hydrate_all(messages).await
    }

    /// Mark messages as read. Only messages addressed to the requester are
    /// touched; ids of other people's messages are silently skipped.
    pub async fn mark_read(&self, requester_id: UserId, ids: Vec<MessageId>) -> AppResult<u64> {
        if ids.is_empty() {
            return Err(AppError::validation("Message IDs are required"));
        }
        self.messages.mark_read(requester_id, &ids).await
    }

    /// Unread direct messages addressed to the requester, optionally from one
    /// counterpart only.
    pub async fn count_unseen(
        &self,
        requester_id: UserId,
        counterpart: Option<UserId>,
    ) -> AppResult<i64> {
        self.messages.count_unseen(requester_id, counterpart).await
    }

    /// Delete a message. Senders may only delete their own.
    pub async fn delete_message(&self, requester_id: UserId, id: MessageId) -> AppResult<()> {
        let message = self
            .messages
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found("Message not found"))?;

        if message.sender_id != requester_id {
            return Err(AppError::forbidden("You can only delete your own messages"));
        }

        self.messages.delete(id).await
    }

    /// Recent direct conversations of the requester: latest message per
    /// partner plus the unread count, newest first.
    pub async fn recent_chats(&self, requester_id: UserId) -> AppResult<Vec<RecentChat>> {
        let latest = self.messages.latest_direct_per_partner(requester_id).await?;

        let partner_ids: Vec<UserId> = latest
            .iter()
            .filter_map(|m| partner_of(m, requester_id))
            .collect();
        let partners: HashMap<UserId, User> = self
            .users
            .get_many(&partner_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let mut chats = Vec::with_capacity(latest.len());
        for message in latest {
            let Some(partner_id) = partner_of(&message, requester_id) else {
                continue;
            };
            let Some(partner) = partners.get(&partner_id) else {
                warn!(partner_id = %partner_id, "Chat partner profile missing, skipping conversation");
                continue;
            };

            let unseen_count = self
                .messages
                .count_unseen(requester_id, Some(partner_id))
                .await?;

            chats.push(RecentChat {
                partner: partner.clone(),
                last_message: message,
                unseen_count,
            });
        }
        Ok(chats)
    }

    /// Post-persist tail shared by both send paths: bump the sender's
    /// presence and attach their profile to the response.
    async fn finish_send(&self, message: Message) -> AppResult<MessageView> {
        if let Err(err) = self.users.touch_presence(message.sender_id).await {
            warn!(user_id = %message.sender_id, error = %err, "Presence touch failed");
        }

        let sender = self.users.require(message.sender_id).await?;
        Ok(MessageView::new(message, sender))
    }

    /// Attach sender profiles to a page of messages.
    async fn hydrate_all(&self, messages: Vec<Message>) -> AppResult<Vec<MessageView>> {
        let mut sender_ids: Vec<UserId> = messages.iter().map(|m| m.sender_id).collect();
        sender_ids.sort_unstable();
        sender_ids.dedup();

        let senders: HashMap<UserId, User> = self
            .users
            .get_many(&sender_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let mut views = Vec::with_capacity(messages.len());
        for message in messages {
            match senders.get(&message.sender_id) {
                Some(sender) => views.push(MessageView::new(message, sender.clone())),
                None => {
                    warn!(message_id = %message.id, sender_id = %message.sender_id, "Sender profile missing, skipping message in listing");
                }
            }
        }
        Ok(views)
    }
}

/// The other side of a direct message from `user_id`'s point of view.
fn partner_of(message: &Message, user_id: UserId) -> Option<UserId> {
    if message.sender_id == user_id {
        message.target.receiver_id()
    } else {
        Some(message.sender_id)
    }
}

/// Resolve the wire `type` field. Absent or empty means text; anything
/// unrecognized is rejected rather than stored verbatim.
fn parse_kind(raw: Option<&str>) -> AppResult<MessageKind> {
    match raw {
        None => Ok(MessageKind::default()),
        Some("") => Ok(MessageKind::default()),
        Some(value) => value.parse::<MessageKind>().map_err(AppError::validation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind_defaults_to_text() {
        assert_eq!(parse_kind(None).unwrap(), MessageKind::Text);
        assert_eq!(parse_kind(Some("")).unwrap(), MessageKind::Text);
    }

    #[test]
    fn test_parse_kind_accepts_known_kinds() {
        assert_eq!(parse_kind(Some("image")).unwrap(), MessageKind::Image);
        assert_eq!(parse_kind(Some("file")).unwrap(), MessageKind::File);
        assert_eq!(parse_kind(Some("system")).unwrap(), MessageKind::System);
    }

    #[test]
    fn test_parse_kind_rejects_unknown() {
        let err = parse_kind(Some("video")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_partner_of_direct_message() {
        let me = uuid::Uuid::new_v4();
        let other = uuid::Uuid::new_v4();

        let sent = Message::new_direct(me, other, "hi".to_string(), MessageKind::Text);
        assert_eq!(partner_of(&sent, me), Some(other));

        let received = Message::new_direct(other, me, "hi".to_string(), MessageKind::Text);
        assert_eq!(partner_of(&received, me), Some(other));
    }

    #[test]
    fn test_partner_of_group_message_is_none_for_sender() {
        let me = uuid::Uuid::new_v4();
        let message = Message::new_group(me, uuid::Uuid::new_v4(), "hi".to_string(), MessageKind::Text);
        assert_eq!(partner_of(&message, me), None);
    }
}
