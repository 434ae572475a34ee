//! Shared harness for the database-backed flow tests.
//!
//! Builds the service layer exactly as the server wires it, minus the HTTP
//! surface and with MQTT fan-out disabled.

use std::sync::Arc;

use confab_config::MqttConfig;
use confab_server::groups::GroupService;
use confab_server::messages::MessageService;
use confab_server::mqtt::FanoutPublisher;
use confab_server::store::{
    MembershipStore, PostgresGroupStore, PostgresMembershipStore, PostgresMessageStore,
    PostgresUserStore, UserStore,
};
use confab_types::UserId;
use sqlx::PgPool;
use uuid::Uuid;

pub struct Services {
    pub groups: GroupService,
    pub messages: MessageService,
    pub memberships: Arc<dyn MembershipStore>,
    pub users: Arc<dyn UserStore>,
}

pub async fn test_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL not set");
    let pool = PgPool::connect(&url).await.expect("connect");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrate");
    pool
}

pub fn services(pool: &PgPool) -> Services {
    let (publisher, _) = FanoutPublisher::connect(&MqttConfig {
        enabled: false,
        host: "localhost".to_string(),
        port: 1883,
        client_id: "test-client".to_string(),
        username: None,
        password: None,
        keep_alive_secs: 60,
    });
    let publisher = Arc::new(publisher);

    let users: Arc<dyn UserStore> = Arc::new(PostgresUserStore::new(pool.clone()));
    let groups_store = Arc::new(PostgresGroupStore::new(pool.clone()));
    let memberships: Arc<dyn MembershipStore> =
        Arc::new(PostgresMembershipStore::new(pool.clone()));
    let messages_store = Arc::new(PostgresMessageStore::new(pool.clone()));

    let groups = GroupService::new(
        groups_store.clone(),
        memberships.clone(),
        users.clone(),
        messages_store.clone(),
        publisher.clone(),
    );
    let messages = MessageService::new(
        messages_store,
        groups_store,
        memberships.clone(),
        users.clone(),
        publisher,
    );

    Services {
        groups,
        messages,
        memberships,
        users,
    }
}

pub async fn seed_user(pool: &PgPool, prefix: &str) -> UserId {
    let id = Uuid::new_v4();
    let username = format!("{}-{}", prefix, id.simple());
    sqlx::query(
        r#"
        INSERT INTO users (id, username, email, password_hash)
        VALUES ($1, $2, $3, 'x')
        "#,
    )
    .bind(id)
    .bind(&username)
    .bind(format!("{}@example.com", username))
    .execute(pool)
    .await
    .expect("insert user");
    id
}
