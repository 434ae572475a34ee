use std::sync::Arc;

use confab_config::Config;

use crate::db::DbPool;
use crate::groups::GroupService;
use crate::messages::MessageService;
use crate::mqtt::FanoutPublisher;
use crate::store::{
    PostgresGroupStore, PostgresMembershipStore, PostgresMessageStore, PostgresUserStore,
    UserStore,
};

/// Application context handed to every handler.
///
/// Stores are wired once here; handlers talk to the services (or the user
/// store directly for profile reads) and nothing else.
pub struct AppContext {
    pub config: Arc<Config>,
    pub pool: DbPool,
    pub users: Arc<dyn UserStore>,
    pub groups: GroupService,
    pub messages: MessageService,
    pub publisher: Arc<FanoutPublisher>,
}

impl AppContext {
    pub fn new(config: Arc<Config>, pool: DbPool, publisher: Arc<FanoutPublisher>) -> Self {
        let users: Arc<dyn UserStore> = Arc::new(PostgresUserStore::new(pool.clone()));
        let groups_store = Arc::new(PostgresGroupStore::new(pool.clone()));
        let memberships = Arc::new(PostgresMembershipStore::new(pool.clone()));
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
            memberships,
            users.clone(),
            publisher.clone(),
        );

        Self {
            config,
            pool,
            users,
            groups,
            messages,
            publisher,
        }
    }
}
