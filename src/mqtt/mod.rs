// MQTT fan-out module
//
// Real-time delivery of persisted messages to connected clients. Clients
// subscribe to their own user topic and to the topics of groups they belong
// to; the server only ever publishes.

pub mod publisher;
pub mod types;

pub use publisher::{spawn_event_loop, FanoutPublisher};
pub use types::{direct_topic, group_topic, FanoutPayload};
