//! Centralized authorization and lookup predicates.
//!
//! Every mutation goes through these instead of re-implementing its own
//! membership checks. The public `is_group_member`/`is_group_admin` pair is
//! the predicate set an external access-control layer consults.

use sea_orm::{
    DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};

use crate::{
    EngineError, ResultEngine, categories, group_members,
    group_members::{MemberRole, MemberStatus},
    groups, users,
};

use super::{Engine, with_tx};

impl Engine {
    pub(super) async fn require_active_user(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<users::Model> {
        let model = users::Entity::find_by_id(user_id.to_string())
            .one(db)
            .await?
            .filter(|user| user.is_active)
            .ok_or_else(|| EngineError::KeyNotFound("user".to_string()))?;
        Ok(model)
    }

    pub(super) async fn require_group(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultEngine<groups::Model> {
        groups::Entity::find_by_id(group_id.to_string())
            .one(db)
            .await?
            .filter(|group| group.is_active)
            .ok_or_else(|| EngineError::KeyNotFound("group".to_string()))
    }

    pub(super) async fn membership(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<Option<group_members::Model>> {
        group_members::Entity::find_by_id((group_id.to_string(), user_id.to_string()))
            .one(db)
            .await
            .map_err(Into::into)
    }

    pub(super) async fn require_active_member(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<group_members::Model> {
        self.membership(db, group_id, user_id)
            .await?
            .filter(group_members::Model::is_active)
            .ok_or_else(|| EngineError::NotAGroupMember(user_id.to_string()))
    }

    pub(super) async fn require_group_admin(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<group_members::Model> {
        let member = self.require_active_member(db, group_id, user_id).await?;
        if !member.is_admin() {
            return Err(EngineError::Forbidden(
                "only group admins may perform this operation".to_string(),
            ));
        }
        Ok(member)
    }

    pub(super) async fn count_active_admins(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultEngine<u64> {
        group_members::Entity::find()
            .filter(group_members::Column::GroupId.eq(group_id.to_string()))
            .filter(group_members::Column::Status.eq(MemberStatus::Active.as_str()))
            .filter(group_members::Column::Role.eq(MemberRole::Admin.as_str()))
            .count(db)
            .await
            .map_err(Into::into)
    }

    pub(super) async fn count_active_members(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultEngine<u64> {
        group_members::Entity::find()
            .filter(group_members::Column::GroupId.eq(group_id.to_string()))
            .filter(group_members::Column::Status.eq(MemberStatus::Active.as_str()))
            .count(db)
            .await
            .map_err(Into::into)
    }

    /// Active members in the stable order used by the equal-split allocator.
    pub(super) async fn active_members_ordered(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultEngine<Vec<group_members::Model>> {
        group_members::Entity::find()
            .filter(group_members::Column::GroupId.eq(group_id.to_string()))
            .filter(group_members::Column::Status.eq(MemberStatus::Active.as_str()))
            .order_by_asc(group_members::Column::JoinedAt)
            .order_by_asc(group_members::Column::UserId)
            .all(db)
            .await
            .map_err(Into::into)
    }

    /// A category is usable by a user if it is system-wide or their own.
    pub(super) async fn require_category_usable(
        &self,
        db: &DatabaseTransaction,
        category_id: &str,
        user_id: &str,
    ) -> ResultEngine<categories::Model> {
        let model = categories::Entity::find_by_id(category_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("category".to_string()))?;
        if !model.is_system && model.user_id.as_deref() != Some(user_id) {
            return Err(EngineError::KeyNotFound("category".to_string()));
        }
        Ok(model)
    }

    /// Whether `user_id` is an active member of the group.
    pub async fn is_group_member(&self, group_id: &str, user_id: &str) -> ResultEngine<bool> {
        with_tx!(self, |db_tx| {
            let member = self.membership(&db_tx, group_id, user_id).await?;
            Ok(member.is_some_and(|m| m.is_active()))
        })
    }

    /// Whether `user_id` is an active admin of the group.
    pub async fn is_group_admin(&self, group_id: &str, user_id: &str) -> ResultEngine<bool> {
        with_tx!(self, |db_tx| {
            let member = self.membership(&db_tx, group_id, user_id).await?;
            Ok(member.is_some_and(|m| m.is_active() && m.is_admin()))
        })
    }
}
