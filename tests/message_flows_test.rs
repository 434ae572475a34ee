//! Message routing flows against a real Postgres instance.
//!
//! Run with a database available:
//!
//! ```text
//! DATABASE_URL=postgres://localhost/confab_test cargo test -- --ignored
//! ```

use confab_error::AppError;
use confab_types::MessageKind;
use serial_test::serial;
use uuid::Uuid;

mod test_utils;
use test_utils::{seed_user, services, test_pool};

#[tokio::test]
#[serial]
#[ignore] // Requires database
async fn test_direct_send_persists_and_touches_presence() {
    let pool = test_pool().await;
    let svc = services(&pool);

    let alice = seed_user(&pool, "alice").await;
    let bob = seed_user(&pool, "bob").await;

    let view = svc
        .messages
        .send_direct(alice, bob, "hello".to_string(), None)
        .await
        .expect("send direct");

    assert_eq!(view.sender.id, alice);
    assert_eq!(view.message.content, "hello");
    assert_eq!(view.message.kind, MessageKind::Text);
    assert_eq!(view.message.target.receiver_id(), Some(bob));
    assert!(!view.message.is_read);

    let sender = svc
        .users
        .get(alice)
        .await
        .expect("get sender")
        .expect("sender exists");
    assert!(sender.is_online, "sending bumps the sender's presence");
}

#[tokio::test]
#[serial]
#[ignore] // Requires database
async fn test_send_direct_validations() {
    let pool = test_pool().await;
    let svc = services(&pool);

    let alice = seed_user(&pool, "alice").await;
    let bob = seed_user(&pool, "bob").await;

    let err = svc
        .messages
        .send_direct(alice, Uuid::new_v4(), "hello".to_string(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = svc
        .messages
        .send_direct(alice, bob, String::new(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = svc
        .messages
        .send_direct(alice, bob, "clip".to_string(), Some("video"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let view = svc
        .messages
        .send_direct(alice, bob, "pic".to_string(), Some("image"))
        .await
        .expect("send image");
    assert_eq!(view.message.kind, MessageKind::Image);
}

#[tokio::test]
#[serial]
#[ignore] // Requires database
async fn test_direct_history_order_and_privacy() {
    let pool = test_pool().await;
    let svc = services(&pool);

    let alice = seed_user(&pool, "alice").await;
    let bob = seed_user(&pool, "bob").await;
    let outsider = seed_user(&pool, "outsider").await;

    svc.messages
        .send_direct(alice, bob, "one".to_string(), None)
        .await
        .expect("send one");
    svc.messages
        .send_direct(alice, bob, "two".to_string(), None)
        .await
        .expect("send two");
    svc.messages
        .send_direct(bob, alice, "three".to_string(), None)
        .await
        .expect("send three");

    let page = svc
        .messages
        .list_direct(bob, alice, bob, 50, 0)
        .await
        .expect("full history");
    assert_eq!(page.len(), 3);
    assert_eq!(page[0].message.content, "three", "newest first");

    let page = svc
        .messages
        .list_direct(bob, alice, bob, 2, 0)
        .await
        .expect("first page");
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].message.content, "three");
    assert_eq!(page[1].message.content, "two");

    let page = svc
        .messages
        .list_direct(bob, alice, bob, 2, 2)
        .await
        .expect("second page");
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].message.content, "one");

    let err = svc
        .messages
        .list_direct(outsider, alice, bob, 50, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
#[serial]
#[ignore] // Requires database
async fn test_mark_read_and_unseen_counts() {
    let pool = test_pool().await;
    let svc = services(&pool);

    let alice = seed_user(&pool, "alice").await;
    let bob = seed_user(&pool, "bob").await;

    svc.messages
        .send_direct(alice, bob, "one".to_string(), None)
        .await
        .expect("send one");
    svc.messages
        .send_direct(alice, bob, "two".to_string(), None)
        .await
        .expect("send two");
    svc.messages
        .send_direct(bob, alice, "three".to_string(), None)
        .await
        .expect("send three");

    assert_eq!(svc.messages.count_unseen(bob, Some(alice)).await.unwrap(), 2);
    assert_eq!(svc.messages.count_unseen(bob, None).await.unwrap(), 2);
    assert_eq!(svc.messages.count_unseen(alice, Some(bob)).await.unwrap(), 1);

    let err = svc.messages.mark_read(bob, vec![]).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Hand over every id, own sent message included; only messages addressed
    // to the requester are updated.
    let history = svc
        .messages
        .list_direct(bob, alice, bob, 50, 0)
        .await
        .expect("history");
    let all_ids: Vec<Uuid> = history.iter().map(|v| v.message.id).collect();

    let updated = svc.messages.mark_read(bob, all_ids).await.expect("mark read");
    assert_eq!(updated, 2);
    assert_eq!(svc.messages.count_unseen(bob, Some(alice)).await.unwrap(), 0);
    assert_eq!(
        svc.messages.count_unseen(alice, Some(bob)).await.unwrap(),
        1,
        "the other side is untouched"
    );
}

#[tokio::test]
#[serial]
#[ignore] // Requires database
async fn test_group_send_requires_membership() {
    let pool = test_pool().await;
    let svc = services(&pool);

    let creator = seed_user(&pool, "creator").await;
    let outsider = seed_user(&pool, "outsider").await;

    let view = svc
        .groups
        .create_group(creator, "Members only".to_string(), None, vec![])
        .await
        .expect("create group");
    let group_id = view.group.id;

    assert!(!svc
        .memberships
        .is_member(group_id, outsider)
        .await
        .expect("membership check"));

    let err = svc
        .messages
        .send_group(outsider, group_id, "hi".to_string(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let history = svc
        .messages
        .list_group(creator, group_id, 50, 0)
        .await
        .expect("history");
    assert!(history.is_empty(), "the rejected message is not persisted");

    let err = svc
        .messages
        .send_group(creator, Uuid::new_v4(), "hi".to_string(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
#[serial]
#[ignore] // Requires database
async fn test_delete_message_sender_only() {
    let pool = test_pool().await;
    let svc = services(&pool);

    let alice = seed_user(&pool, "alice").await;
    let bob = seed_user(&pool, "bob").await;

    let view = svc
        .messages
        .send_direct(alice, bob, "oops".to_string(), None)
        .await
        .expect("send");
    let message_id = view.message.id;

    let err = svc
        .messages
        .delete_message(bob, message_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    svc.messages
        .delete_message(alice, message_id)
        .await
        .expect("sender deletes own message");

    let err = svc
        .messages
        .delete_message(alice, message_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
#[serial]
#[ignore] // Requires database
async fn test_recent_chats_overview() {
    let pool = test_pool().await;
    let svc = services(&pool);

    let me = seed_user(&pool, "me").await;
    let ann = seed_user(&pool, "ann").await;
    let ben = seed_user(&pool, "ben").await;

    svc.messages
        .send_direct(ann, me, "first from ann".to_string(), None)
        .await
        .expect("ann sends");
    svc.messages
        .send_direct(me, ann, "reply to ann".to_string(), None)
        .await
        .expect("reply");
    svc.messages
        .send_direct(ben, me, "from ben".to_string(), None)
        .await
        .expect("ben sends");

    let chats = svc.messages.recent_chats(me).await.expect("recent chats");
    assert_eq!(chats.len(), 2);

    assert_eq!(chats[0].partner.id, ben, "newest conversation first");
    assert_eq!(chats[0].last_message.content, "from ben");
    assert_eq!(chats[0].unseen_count, 1);

    let ann_chat = chats
        .iter()
        .find(|c| c.partner.id == ann)
        .expect("conversation with ann");
    assert_eq!(
        ann_chat.last_message.content, "reply to ann",
        "own replies count as the latest message"
    );
    assert_eq!(ann_chat.unseen_count, 1);
}
