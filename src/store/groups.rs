use chrono::{DateTime, Utc};
use confab_error::{AppError, AppResult};
use confab_types::{Group, GroupId, GroupMember, GroupMemberView, User, UserId};
use sqlx::PgPool;
use tracing::warn;

const GROUP_COLUMNS: &str = "id, name, description, avatar_url, creator_id, created_at, updated_at";

#[async_trait::async_trait]
pub trait GroupStore: Send + Sync {
    /// Fetch a group by id.
    async fn get(&self, id: GroupId) -> AppResult<Option<Group>>;

    /// Create a group together with its initial memberships in one
    /// transaction. The creator always becomes an admin member; ids in
    /// `member_ids` that do not resolve to a user are skipped with a warning
    /// rather than failing the whole creation.
    async fn create_with_members(&self, group: &Group, member_ids: &[UserId]) -> AppResult<()>;

    /// Partial update of name, description and avatar. `None` keeps the
    /// current value.
    async fn update(
        &self,
        id: GroupId,
        name: Option<String>,
        description: Option<String>,
        avatar_url: Option<String>,
    ) -> AppResult<Group>;

    /// Delete the group, its memberships and its messages in one
    /// transaction, so no partial teardown is ever observable.
    async fn delete_cascade(&self, id: GroupId) -> AppResult<()>;

    /// Groups the user belongs to, newest first.
    async fn groups_for_user(&self, user_id: UserId) -> AppResult<Vec<Group>>;

    /// Fetch a group or fail with `NotFound`.
    async fn require(&self, id: GroupId) -> AppResult<Group> {
        self.get(id)
            .await?
            .ok_or_else(|| AppError::not_found("Group not found"))
    }
}

#[async_trait::async_trait]
pub trait MembershipStore: Send + Sync {
    /// Whether the user is a member of the group.
    async fn is_member(&self, group_id: GroupId, user_id: UserId) -> AppResult<bool>;

    /// Whether the user is an admin member of the group.
    async fn is_admin(&self, group_id: GroupId, user_id: UserId) -> AppResult<bool>;

    /// Add a membership row. Fails with `Conflict` if the user is already a
    /// member.
    async fn add_member(
        &self,
        group_id: GroupId,
        user_id: UserId,
        is_admin: bool,
    ) -> AppResult<GroupMember>;

    /// Remove a membership row. Fails with `NotFound` if the user is not a
    /// member.
    async fn remove_member(&self, group_id: GroupId, user_id: UserId) -> AppResult<()>;

    /// Member roster with profiles, oldest membership first.
    async fn list_members(&self, group_id: GroupId) -> AppResult<Vec<GroupMemberView>>;
}

pub struct PostgresGroupStore {
    pool: PgPool,
}

impl PostgresGroupStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl GroupStore for PostgresGroupStore {
    async fn get(&self, id: GroupId) -> AppResult<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }

    async fn create_with_members(&self, group: &Group, member_ids: &[UserId]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO groups (id, name, description, avatar_url, creator_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(group.id)
        .bind(&group.name)
        .bind(&group.description)
        .bind(&group.avatar_url)
        .bind(group.creator_id)
        .bind(group.created_at)
        .bind(group.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO group_users (group_id, user_id, joined_at, is_admin, created_at, updated_at)
            VALUES ($1, $2, NOW(), TRUE, NOW(), NOW())
            "#,
        )
        .bind(group.id)
        .bind(group.creator_id)
        .execute(&mut *tx)
        .await?;

        for member_id in member_ids {
            if *member_id == group.creator_id {
                continue;
            }

            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)",
            )
            .bind(member_id)
            .fetch_one(&mut *tx)
            .await?;

            if !exists {
                warn!(group_id = %group.id, user_id = %member_id, "Skipping unknown user in group creation");
                continue;
            }

            // ON CONFLICT covers ids listed twice; the row stays as first
            // inserted.
            sqlx::query(
                r#"
                INSERT INTO group_users (group_id, user_id, joined_at, is_admin, created_at, updated_at)
                VALUES ($1, $2, NOW(), FALSE, NOW(), NOW())
                ON CONFLICT (group_id, user_id) DO NOTHING
                "#,
            )
            .bind(group.id)
            .bind(member_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update(
        &self,
        id: GroupId,
        name: Option<String>,
        description: Option<String>,
        avatar_url: Option<String>,
    ) -> AppResult<Group> {
        let group = sqlx::query_as::<_, Group>(&format!(
            r#"
            UPDATE groups
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                avatar_url = COALESCE($4, avatar_url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {GROUP_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(avatar_url)
        .fetch_optional(&self.pool)
        .await?;

        group.ok_or_else(|| AppError::not_found("Group not found"))
    }

    async fn delete_cascade(&self, id: GroupId) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM group_users WHERE group_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM messages WHERE group_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn groups_for_user(&self, user_id: UserId) -> AppResult<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(
            r#"
            SELECT g.id, g.name, g.description, g.avatar_url, g.creator_id,
                   g.created_at, g.updated_at
            FROM groups g
            JOIN group_users gu ON gu.group_id = g.id
            WHERE gu.user_id = $1
            ORDER BY g.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(groups)
    }
}

pub struct PostgresMembershipStore {
    pool: PgPool,
}

impl PostgresMembershipStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Membership row joined with the member's profile columns.
#[derive(sqlx::FromRow)]
struct MemberRow {
    group_id: uuid::Uuid,
    user_id: uuid::Uuid,
    joined_at: DateTime<Utc>,
    is_admin: bool,
    member_created_at: DateTime<Utc>,
    member_updated_at: DateTime<Utc>,
    username: String,
    email: String,
    avatar_url: Option<String>,
    last_seen: DateTime<Utc>,
    is_online: bool,
    user_created_at: DateTime<Utc>,
    user_updated_at: DateTime<Utc>,
}

impl From<MemberRow> for GroupMemberView {
    fn from(row: MemberRow) -> Self {
        GroupMemberView {
            membership: GroupMember {
                group_id: row.group_id,
                user_id: row.user_id,
                joined_at: row.joined_at,
                is_admin: row.is_admin,
                created_at: row.member_created_at,
                updated_at: row.member_updated_at,
            },
            user: User {
                id: row.user_id,
                username: row.username,
                email: row.email,
                avatar_url: row.avatar_url,
                last_seen: row.last_seen,
                is_online: row.is_online,
                created_at: row.user_created_at,
                updated_at: row.user_updated_at,
            },
        }
    }
}

#[async_trait::async_trait]
impl MembershipStore for PostgresMembershipStore {
    async fn is_member(&self, group_id: GroupId, user_id: UserId) -> AppResult<bool> {
        let member = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM group_users WHERE group_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(member)
    }

    async fn is_admin(&self, group_id: GroupId, user_id: UserId) -> AppResult<bool> {
        let admin = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM group_users
                WHERE group_id = $1 AND user_id = $2 AND is_admin = TRUE
            )
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(admin)
    }

    async fn add_member(
        &self,
        group_id: GroupId,
        user_id: UserId,
        is_admin: bool,
    ) -> AppResult<GroupMember> {
        let member = sqlx::query_as::<_, GroupMember>(
            r#"
            INSERT INTO group_users (group_id, user_id, joined_at, is_admin, created_at, updated_at)
            VALUES ($1, $2, NOW(), $3, NOW(), NOW())
            RETURNING group_id, user_id, joined_at, is_admin, created_at, updated_at
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .bind(is_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            AppError::conflict_on_unique(err, "User is already a member of this group")
        })?;

        Ok(member)
    }

    async fn remove_member(&self, group_id: GroupId, user_id: UserId) -> AppResult<()> {
        let result = sqlx::query(
            "DELETE FROM group_users WHERE group_id = $1 AND user_id = $2",
        )
        .bind(group_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User is not a member of this group"));
        }

        Ok(())
    }

    async fn list_members(&self, group_id: GroupId) -> AppResult<Vec<GroupMemberView>> {
        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT gu.group_id, gu.user_id, gu.joined_at, gu.is_admin,
                   gu.created_at AS member_created_at, gu.updated_at AS member_updated_at,
                   u.username, u.email, u.avatar_url, u.last_seen, u.is_online,
                   u.created_at AS user_created_at, u.updated_at AS user_updated_at
            FROM group_users gu
            JOIN users u ON u.id = gu.user_id
            WHERE gu.group_id = $1
            ORDER BY gu.joined_at ASC
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(GroupMemberView::from).collect())
    }
}
