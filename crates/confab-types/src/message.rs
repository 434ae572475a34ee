use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{GroupId, MessageId, User, UserId};

// ============================================================================
// Message kind
// ============================================================================

/// Closed set of message kinds accepted by the router.
///
/// Anything else coming over the wire is rejected at the API boundary rather
/// than stored as an opaque string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    File,
    /// Emitted by the server itself for membership announcements.
    System,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::File => "file",
            MessageKind::System => "system",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(MessageKind::Text),
            "image" => Ok(MessageKind::Image),
            "file" => Ok(MessageKind::File),
            "system" => Ok(MessageKind::System),
            other => Err(format!("unknown message type: {}", other)),
        }
    }
}

// ============================================================================
// Message target
// ============================================================================

/// Destination of a message: exactly one of a direct receiver or a group.
///
/// The two variants flatten to a plain `receiver_id` / `group_id` field in
/// JSON, so payloads keep the familiar flat shape while the type makes a
/// "both set" or "neither set" message unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageTarget {
    Direct { receiver_id: UserId },
    Group { group_id: GroupId },
}

impl MessageTarget {
    /// Rebuild a target from the two nullable database columns.
    pub fn from_columns(
        receiver_id: Option<Uuid>,
        group_id: Option<Uuid>,
    ) -> Result<Self, String> {
        match (receiver_id, group_id) {
            (Some(receiver_id), None) => Ok(MessageTarget::Direct { receiver_id }),
            (None, Some(group_id)) => Ok(MessageTarget::Group { group_id }),
            (Some(_), Some(_)) => Err("message has both a receiver and a group".to_string()),
            (None, None) => Err("message has neither a receiver nor a group".to_string()),
        }
    }

    pub fn receiver_id(&self) -> Option<UserId> {
        match self {
            MessageTarget::Direct { receiver_id } => Some(*receiver_id),
            MessageTarget::Group { .. } => None,
        }
    }

    pub fn group_id(&self) -> Option<GroupId> {
        match self {
            MessageTarget::Direct { .. } => None,
            MessageTarget::Group { group_id } => Some(*group_id),
        }
    }

    pub fn is_direct(&self) -> bool {
        matches!(self, MessageTarget::Direct { .. })
    }
}

// ============================================================================
// Message
// ============================================================================

/// A persisted chat message, direct or group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    #[serde(flatten)]
    pub target: MessageTarget,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub is_read: bool,
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    fn new(sender_id: UserId, target: MessageTarget, content: String, kind: MessageKind) -> Self {
        let now = Utc::now();
        Message {
            id: Uuid::new_v4(),
            sender_id,
            target,
            content,
            kind,
            is_read: false,
            timestamp: now,
            created_at: now,
            updated_at: now,
        }
    }

    /// Fresh direct message with a server-assigned id and timestamp.
    pub fn new_direct(
        sender_id: UserId,
        receiver_id: UserId,
        content: String,
        kind: MessageKind,
    ) -> Self {
        Self::new(sender_id, MessageTarget::Direct { receiver_id }, content, kind)
    }

    /// Fresh group message with a server-assigned id and timestamp.
    pub fn new_group(
        sender_id: UserId,
        group_id: GroupId,
        content: String,
        kind: MessageKind,
    ) -> Self {
        Self::new(sender_id, MessageTarget::Group { group_id }, content, kind)
    }

    /// Membership announcement attributed to the acting user.
    pub fn new_system(actor_id: UserId, group_id: GroupId, content: String) -> Self {
        Self::new(
            actor_id,
            MessageTarget::Group { group_id },
            content,
            MessageKind::System,
        )
    }
}

/// Message joined with its sender profile, the shape list and send endpoints
/// return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    pub sender: User,
}

impl MessageView {
    pub fn new(message: Message, sender: User) -> Self {
        MessageView { message, sender }
    }
}
