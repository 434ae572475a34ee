use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use confab_error::{AppError, AppResult};
use confab_types::{Group, GroupId, GroupSummary, GroupView, Message, UserId};
use tracing::{error, warn};
use uuid::Uuid;

use crate::mqtt::FanoutPublisher;
use crate::store::{GroupStore, MembershipStore, MessageStore, UserStore};

/// Orchestrates the group lifecycle on top of the stores.
///
/// Store calls enforce row-level facts (membership exists, name persisted);
/// this service owns the ordering of checks, so every endpoint reports "no
/// such group" before "you are not allowed".
#[derive(Clone)]
pub struct GroupService {
    groups: Arc<dyn GroupStore>,
    memberships: Arc<dyn MembershipStore>,
    users: Arc<dyn UserStore>,
    messages: Arc<dyn MessageStore>,
    publisher: Arc<FanoutPublisher>,
}

impl GroupService {
    pub fn new(
        groups: Arc<dyn GroupStore>,
        memberships: Arc<dyn MembershipStore>,
        users: Arc<dyn UserStore>,
        messages: Arc<dyn MessageStore>,
        publisher: Arc<FanoutPublisher>,
    ) -> Self {
        Self {
            groups,
            memberships,
            users,
            messages,
            publisher,
        }
    }

    /// Create a group with the creator as admin member plus the given initial
    /// members. Unknown member ids are skipped, not fatal.
    pub async fn create_group(
        &self,
        creator_id: UserId,
        name: String,
        description: Option<String>,
        member_ids: Vec<UserId>,
    ) -> AppResult<GroupView> {
        if name.is_empty() {
            return Err(AppError::validation("Group name is required"));
        }
        self.users.require(creator_id).await?;

        let now = Utc::now();
        let group = Group {
            id: Uuid::new_v4(),
            name,
            description,
            avatar_url: None,
            creator_id,
            created_at: now,
            updated_at: now,
        };

        self.groups.create_with_members(&group, &member_ids).await?;
        self.hydrate(group).await
    }

    /// Fetch a group with creator and roster. Members only.
    pub async fn get_group(&self, requester_id: UserId, group_id: GroupId) -> AppResult<GroupView> {
        let group = self.groups.require(group_id).await?;
        if !self.memberships.is_member(group_id, requester_id).await? {
            return Err(AppError::forbidden("You are not a member of this group"));
        }
        self.hydrate(group).await
    }

    /// Partial metadata update. Admins only.
    pub async fn update_group(
        &self,
        actor_id: UserId,
        group_id: GroupId,
        name: Option<String>,
        description: Option<String>,
        avatar_url: Option<String>,
    ) -> AppResult<GroupView> {
        self.groups.require(group_id).await?;
        if !self.memberships.is_admin(group_id, actor_id).await? {
            return Err(AppError::forbidden("Only group admins can update the group"));
        }
        if matches!(&name, Some(name) if name.is_empty()) {
            return Err(AppError::validation("Group name cannot be empty"));
        }

        let group = self
            .groups
            .update(group_id, name, description, avatar_url)
            .await?;
        self.hydrate(group).await
    }

    /// Add a user to a group and announce it. Admins only.
    pub async fn add_member(
        &self,
        actor_id: UserId,
        group_id: GroupId,
        user_id: UserId,
    ) -> AppResult<()> {
        self.groups.require(group_id).await?;
        if !self.memberships.is_admin(group_id, actor_id).await? {
            return Err(AppError::forbidden("Only group admins can add members"));
        }
        let user = self.users.require(user_id).await?;

        self.memberships.add_member(group_id, user_id, false).await?;

        self.announce(
            actor_id,
            group_id,
            format!("{} has joined the group", user.username),
        )
        .await;
        Ok(())
    }

    /// Remove a user from a group and announce it.
    ///
    /// Anyone may remove themselves; removing someone else takes admin
    /// rights, and the creator can only ever be removed by leaving.
    pub async fn remove_member(
        &self,
        actor_id: UserId,
        group_id: GroupId,
        user_id: UserId,
    ) -> AppResult<()> {
        let group = self.groups.require(group_id).await?;
        if !self.memberships.is_member(group_id, user_id).await? {
            return Err(AppError::not_found("User is not a member of this group"));
        }

        if actor_id != user_id {
            if !self.memberships.is_admin(group_id, actor_id).await? {
                return Err(AppError::forbidden("Only group admins can remove members"));
            }
            if user_id == group.creator_id {
                return Err(AppError::forbidden("The group creator cannot be removed"));
            }
        } else if actor_id == group.creator_id {
            // Allowed, but the group is left without its creator.
            warn!(group_id = %group_id, user_id = %user_id, "Group creator left their own group");
        }

        let user = self.users.require(user_id).await?;
        self.memberships.remove_member(group_id, user_id).await?;

        self.announce(
            actor_id,
            group_id,
            format!("{} has left the group", user.username),
        )
        .await;
        Ok(())
    }

    /// Delete a group with all memberships and messages. Creator only.
    pub async fn delete_group(&self, actor_id: UserId, group_id: GroupId) -> AppResult<()> {
        let group = self.groups.require(group_id).await?;
        if actor_id != group.creator_id {
            return Err(AppError::forbidden(
                "Only the group creator can delete the group",
            ));
        }

        self.groups.delete_cascade(group_id).await
    }

    /// Groups the given user belongs to, with creator profiles attached.
    pub async fn groups_for_user(&self, user_id: UserId) -> AppResult<Vec<GroupSummary>> {
        if !self.users.exists(user_id).await? {
            return Err(AppError::not_found("User not found"));
        }

        let groups = self.groups.groups_for_user(user_id).await?;

        let creator_ids: Vec<UserId> = groups.iter().map(|g| g.creator_id).collect();
        let creators: HashMap<UserId, _> = self
            .users
            .get_many(&creator_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let mut summaries = Vec::with_capacity(groups.len());
        for group in groups {
            match creators.get(&group.creator_id) {
                Some(creator) => summaries.push(GroupSummary {
                    creator: creator.clone(),
                    group,
                }),
                None => {
                    warn!(group_id = %group.id, creator_id = %group.creator_id, "Group creator profile missing, skipping group in listing");
                }
            }
        }
        Ok(summaries)
    }

    /// Attach creator and member roster to a group row.
    async fn hydrate(&self, group: Group) -> AppResult<GroupView> {
        let creator = self
            .users
            .get(group.creator_id)
            .await?
            .ok_or_else(|| AppError::internal("group creator profile missing"))?;
        let members = self.memberships.list_members(group.id).await?;

        Ok(GroupView {
            group,
            creator,
            members,
        })
    }

    /// Persist and fan out a membership announcement. Neither step may fail
    /// the membership operation itself, so errors are only logged.
    async fn announce(&self, actor_id: UserId, group_id: GroupId, content: String) {
        let message = Message::new_system(actor_id, group_id, content);

        if let Err(err) = self.messages.insert(&message).await {
            error!(group_id = %group_id, error = %err, "Failed to persist system message");
            return;
        }
        if let Err(err) = self.publisher.publish_group(&message).await {
            error!(group_id = %group_id, error = %err, "Failed to publish system message");
        }
    }
}
