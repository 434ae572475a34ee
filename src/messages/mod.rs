// ============================================================================
// Message Routing
// ============================================================================
//
// Validation, authorization and persistence of direct and group messages,
// with best-effort MQTT fan-out after the database commit. Also read state,
// unseen counts and the recent-conversations overview.
//
// ============================================================================

mod service;

pub use service::{MessageService, RecentChat};
