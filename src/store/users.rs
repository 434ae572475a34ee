use confab_error::{AppError, AppResult};
use confab_types::{User, UserId};
use sqlx::PgPool;

/// Columns of the API-facing profile, without credentials.
const USER_COLUMNS: &str =
    "id, username, email, avatar_url, last_seen, is_online, created_at, updated_at";

#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch a profile by id.
    async fn get(&self, id: UserId) -> AppResult<Option<User>>;

    /// Fetch several profiles at once, in no particular order.
    async fn get_many(&self, ids: &[UserId]) -> AppResult<Vec<User>>;

    /// Whether a profile row exists.
    async fn exists(&self, id: UserId) -> AppResult<bool>;

    /// Substring search over username and email.
    async fn search(&self, query: &str, limit: i64) -> AppResult<Vec<User>>;

    /// Partial profile update. `None` fields are left untouched.
    async fn update_profile(
        &self,
        id: UserId,
        username: Option<String>,
        avatar_url: Option<String>,
    ) -> AppResult<User>;

    /// Record activity: mark the user online and bump `last_seen`.
    async fn touch_presence(&self, id: UserId) -> AppResult<()>;

    /// Fetch a profile or fail with `NotFound`.
    async fn require(&self, id: UserId) -> AppResult<User> {
        self.get(id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }
}

pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserStore for PostgresUserStore {
    async fn get(&self, id: UserId) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn get_many(&self, ids: &[UserId]) -> AppResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn exists(&self, id: UserId) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn search(&self, query: &str, limit: i64) -> AppResult<Vec<User>> {
        let pattern = format!("%{}%", query);
        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE username ILIKE $1 OR email ILIKE $1
            ORDER BY username
            LIMIT $2
            "#
        ))
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn update_profile(
        &self,
        id: UserId,
        username: Option<String>,
        avatar_url: Option<String>,
    ) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                avatar_url = COALESCE($3, avatar_url),
                last_seen = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(username)
        .bind(avatar_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| AppError::conflict_on_unique(err, "Username is already taken"))?;

        user.ok_or_else(|| AppError::not_found("User not found"))
    }

    async fn touch_presence(&self, id: UserId) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET is_online = TRUE, last_seen = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL not set");
        let pool = PgPool::connect(&url).await.expect("connect");
        sqlx::migrate!("./migrations").run(&pool).await.expect("migrate");
        pool
    }

    async fn seed_user(pool: &PgPool, username: &str) -> UserId {
        let id = uuid::Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash)
            VALUES ($1, $2, $3, 'x')
            "#,
        )
        .bind(id)
        .bind(username)
        .bind(format!("{}@example.com", username))
        .execute(pool)
        .await
        .expect("insert user");
        id
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_get_and_exists() {
        let pool = test_pool().await;
        let store = PostgresUserStore::new(pool.clone());

        let id = seed_user(&pool, &format!("u{}", uuid::Uuid::new_v4().simple())).await;

        assert!(store.exists(id).await.unwrap());
        let user = store.get(id).await.unwrap().unwrap();
        assert_eq!(user.id, id);
        assert!(!store.exists(uuid::Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_touch_presence_marks_online() {
        let pool = test_pool().await;
        let store = PostgresUserStore::new(pool.clone());

        let id = seed_user(&pool, &format!("u{}", uuid::Uuid::new_v4().simple())).await;
        store.touch_presence(id).await.unwrap();

        let user = store.get(id).await.unwrap().unwrap();
        assert!(user.is_online);
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_update_profile_conflict_on_taken_username() {
        let pool = test_pool().await;
        let store = PostgresUserStore::new(pool.clone());

        let taken = format!("u{}", uuid::Uuid::new_v4().simple());
        seed_user(&pool, &taken).await;
        let id = seed_user(&pool, &format!("u{}", uuid::Uuid::new_v4().simple())).await;

        let err = store
            .update_profile(id, Some(taken), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
