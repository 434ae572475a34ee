use chrono::{DateTime, Utc};
use confab_error::{AppError, AppResult};
use confab_types::{GroupId, Message, MessageId, MessageKind, MessageTarget, UserId};
use sqlx::PgPool;
use uuid::Uuid;

const MESSAGE_COLUMNS: &str =
    "id, sender_id, receiver_id, group_id, content, kind, is_read, timestamp, created_at, updated_at";

#[async_trait::async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a message. The caller has already validated the target.
    async fn insert(&self, message: &Message) -> AppResult<()>;

    /// Fetch a single message by id.
    async fn get(&self, id: MessageId) -> AppResult<Option<Message>>;

    /// Direct history between two users, both directions, newest first.
    async fn list_direct(
        &self,
        user_a: UserId,
        user_b: UserId,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Message>>;

    /// Group history, newest first.
    async fn list_group(&self, group_id: GroupId, limit: i64, offset: i64)
        -> AppResult<Vec<Message>>;

    /// Mark the given messages read, but only those addressed to
    /// `receiver_id`. Returns how many rows matched.
    async fn mark_read(&self, receiver_id: UserId, ids: &[MessageId]) -> AppResult<u64>;

    /// Unread direct messages addressed to `receiver_id`, optionally
    /// restricted to one sender.
    async fn count_unseen(
        &self,
        receiver_id: UserId,
        counterpart: Option<UserId>,
    ) -> AppResult<i64>;

    /// Delete one message.
    async fn delete(&self, id: MessageId) -> AppResult<()>;

    /// Latest direct message per conversation partner of `user_id`, newest
    /// conversation first.
    async fn latest_direct_per_partner(&self, user_id: UserId) -> AppResult<Vec<Message>>;
}

/// Raw messages row; the nullable target pair and the textual kind are
/// tightened into domain types on the way out.
#[derive(sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    sender_id: Uuid,
    receiver_id: Option<Uuid>,
    group_id: Option<Uuid>,
    content: String,
    kind: String,
    is_read: bool,
    timestamp: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for Message {
    type Error = AppError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let target = MessageTarget::from_columns(row.receiver_id, row.group_id)
            .map_err(AppError::internal)?;
        let kind = row
            .kind
            .parse::<MessageKind>()
            .map_err(AppError::internal)?;

        Ok(Message {
            id: row.id,
            sender_id: row.sender_id,
            target,
            content: row.content,
            kind,
            is_read: row.is_read,
            timestamp: row.timestamp,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn rows_to_messages(rows: Vec<MessageRow>) -> AppResult<Vec<Message>> {
    rows.into_iter().map(Message::try_from).collect()
}

pub struct PostgresMessageStore {
    pool: PgPool,
}

impl PostgresMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MessageStore for PostgresMessageStore {
    async fn insert(&self, message: &Message) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, sender_id, receiver_id, group_id, content, kind,
                                  is_read, timestamp, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(message.id)
        .bind(message.sender_id)
        .bind(message.target.receiver_id())
        .bind(message.target.group_id())
        .bind(&message.content)
        .bind(message.kind.as_str())
        .bind(message.is_read)
        .bind(message.timestamp)
        .bind(message.created_at)
        .bind(message.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: MessageId) -> AppResult<Option<Message>> {
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Message::try_from).transpose()
    }

    async fn list_direct(
        &self,
        user_a: UserId,
        user_b: UserId,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE (sender_id = $1 AND receiver_id = $2)
               OR (sender_id = $2 AND receiver_id = $1)
            ORDER BY timestamp DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(user_a)
        .bind(user_b)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows_to_messages(rows)
    }

    async fn list_group(
        &self,
        group_id: GroupId,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE group_id = $1
            ORDER BY timestamp DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(group_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows_to_messages(rows)
    }

    async fn mark_read(&self, receiver_id: UserId, ids: &[MessageId]) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            UPDATE messages
            SET is_read = TRUE, updated_at = NOW()
            WHERE receiver_id = $1 AND id = ANY($2)
            "#,
        )
        .bind(receiver_id)
        .bind(ids)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn count_unseen(
        &self,
        receiver_id: UserId,
        counterpart: Option<UserId>,
    ) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM messages
            WHERE receiver_id = $1
              AND is_read = FALSE
              AND ($2::uuid IS NULL OR sender_id = $2)
            "#,
        )
        .bind(receiver_id)
        .bind(counterpart)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn delete(&self, id: MessageId) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Message not found"));
        }

        Ok(())
    }

    async fn latest_direct_per_partner(&self, user_id: UserId) -> AppResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT DISTINCT ON (CASE WHEN m.sender_id = $1 THEN m.receiver_id ELSE m.sender_id END)
                   m.id, m.sender_id, m.receiver_id, m.group_id, m.content, m.kind,
                   m.is_read, m.timestamp, m.created_at, m.updated_at
            FROM messages m
            WHERE m.group_id IS NULL
              AND (m.sender_id = $1 OR m.receiver_id = $1)
            ORDER BY (CASE WHEN m.sender_id = $1 THEN m.receiver_id ELSE m.sender_id END),
                     m.timestamp DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut messages = rows_to_messages(rows)?;
        messages.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(messages)
    }
}
