// ============================================================================
// Persistence Layer
// Trait-per-concern stores over Postgres. Services depend on the traits so
// tests can swap implementations; the Postgres structs share one pool.
// ============================================================================

mod groups;
mod messages;
mod users;

pub use groups::{GroupStore, MembershipStore, PostgresGroupStore, PostgresMembershipStore};
pub use messages::{MessageStore, PostgresMessageStore};
pub use users::{PostgresUserStore, UserStore};
