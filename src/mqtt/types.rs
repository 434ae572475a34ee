use chrono::{DateTime, Utc};
use confab_types::{GroupId, Message, MessageId, MessageKind, UserId};
use serde::{Deserialize, Serialize};

/// Topic a user subscribes to for their direct messages.
pub fn direct_topic(receiver_id: UserId) -> String {
    format!("chat/user/{}", receiver_id)
}

/// Topic all members of a group subscribe to.
pub fn group_topic(group_id: GroupId) -> String {
    format!("chat/group/{}", group_id)
}

/// Wire payload published to the broker.
///
/// This is the contract with mobile and web clients: exactly one of
/// `receiver_id` / `group_id` is present, the other is omitted entirely, and
/// the kind travels as `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanoutPayload {
    pub id: MessageId,
    pub sender_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
}

impl From<&Message> for FanoutPayload {
    fn from(message: &Message) -> Self {
        FanoutPayload {
            id: message.id,
            sender_id: message.sender_id,
            receiver_id: message.target.receiver_id(),
            group_id: message.target.group_id(),
            content: message.content.clone(),
            kind: message.kind,
            timestamp: message.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_topic_format() {
        let id = Uuid::parse_str("7f9c24e5-2c91-4a0b-9a5d-1c3b8e6f0a42").unwrap();
        assert_eq!(
            direct_topic(id),
            "chat/user/7f9c24e5-2c91-4a0b-9a5d-1c3b8e6f0a42"
        );
        assert_eq!(
            group_topic(id),
            "chat/group/7f9c24e5-2c91-4a0b-9a5d-1c3b8e6f0a42"
        );
    }

    #[test]
    fn test_direct_payload_shape() {
        let message = Message::new_direct(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "hello".to_string(),
            MessageKind::Text,
        );
        let payload = FanoutPayload::from(&message);

        let value = serde_json::to_value(&payload).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 6);
        for key in ["id", "sender_id", "receiver_id", "content", "type", "timestamp"] {
            assert!(object.contains_key(key), "missing key {}", key);
        }
        assert_eq!(value["type"], "text");
        assert_eq!(value["content"], "hello");
    }

    #[test]
    fn test_group_payload_omits_receiver() {
        let message = Message::new_group(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "hello".to_string(),
            MessageKind::Text,
        );
        let payload = FanoutPayload::from(&message);

        let value = serde_json::to_value(&payload).unwrap();
        assert!(value.get("receiver_id").is_none());
        assert_eq!(
            value["group_id"],
            message.target.group_id().unwrap().to_string()
        );
    }
}
