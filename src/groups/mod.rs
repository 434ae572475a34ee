// ============================================================================
// Group Lifecycle
// ============================================================================
//
// Creation, metadata updates, membership management and deletion of group
// conversations, including the system messages announcing roster changes.
//
// ============================================================================

mod service;

pub use service::GroupService;
