// ============================================================================
// Confab Shared Types
// Domain model shared by the server, stores and fan-out publisher.
// ============================================================================

mod group;
mod message;
mod user;

pub use group::{Group, GroupMember, GroupMemberView, GroupSummary, GroupView};
pub use message::{Message, MessageKind, MessageTarget, MessageView};
pub use user::User;

/// Identifier of a user profile.
pub type UserId = uuid::Uuid;

/// Identifier of a group conversation.
pub type GroupId = uuid::Uuid;

/// Identifier of a single message.
pub type MessageId = uuid::Uuid;
