use chrono::Utc;
use uuid::Uuid;

use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*};

use crate::{
    Currency, EngineError, ResultEngine, group_members,
    group_members::{MemberRole, MemberStatus},
    groups,
};

use super::{Engine, normalize_optional_text, normalize_required_name, with_tx};

impl Engine {
    /// Creates a group and its owner's admin membership as one atomic
    /// operation, so the "owner is always an active admin" invariant holds
    /// from the first committed state.
    pub async fn create_group(
        &self,
        name: &str,
        description: Option<&str>,
        currency: Option<Currency>,
        owner_id: &str,
    ) -> ResultEngine<String> {
        let name = normalize_required_name(name, "group")?;
        let description = normalize_optional_text(description);

        with_tx!(self, |db_tx| {
            self.require_active_user(&db_tx, owner_id).await?;

            let group_id = Uuid::new_v4().to_string();
            let now = Utc::now();
            let group = groups::ActiveModel {
                id: ActiveValue::Set(group_id.clone()),
                name: ActiveValue::Set(name),
                description: ActiveValue::Set(description),
                owner_id: ActiveValue::Set(owner_id.to_string()),
                currency: ActiveValue::Set(currency.unwrap_or_default().code().to_string()),
                is_active: ActiveValue::Set(true),
                created_at: ActiveValue::Set(now),
            };
            group.insert(&db_tx).await?;

            let owner_membership = group_members::ActiveModel {
                group_id: ActiveValue::Set(group_id.clone()),
                user_id: ActiveValue::Set(owner_id.to_string()),
                role: ActiveValue::Set(MemberRole::Admin.as_str().to_string()),
                status: ActiveValue::Set(MemberStatus::Active.as_str().to_string()),
                invited_by: ActiveValue::Set(None),
                joined_at: ActiveValue::Set(Some(now)),
                created_at: ActiveValue::Set(now),
            };
            owner_membership.insert(&db_tx).await?;

            Ok(group_id)
        })
    }

    /// Updates a group's name/description (admins only).
    pub async fn update_group(
        &self,
        group_id: &str,
        user_id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> ResultEngine<groups::Model> {
        with_tx!(self, |db_tx| {
            let group = self.require_group(&db_tx, group_id).await?;
            self.require_group_admin(&db_tx, group_id, user_id).await?;

            let mut active: groups::ActiveModel = group.into();
            if let Some(name) = name {
                active.name = ActiveValue::Set(normalize_required_name(name, "group")?);
            }
            if description.is_some() {
                active.description = ActiveValue::Set(normalize_optional_text(description));
            }
            let updated = active.update(&db_tx).await?;
            Ok(updated)
        })
    }

    /// Deactivates a group (owner only). Refused while other members are
    /// still active: they have to leave or be removed first.
    pub async fn deactivate_group(&self, group_id: &str, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let group = self.require_group(&db_tx, group_id).await?;
            if group.owner_id != user_id {
                return Err(EngineError::Forbidden(
                    "only the group owner may deactivate it".to_string(),
                ));
            }
            if self.count_active_members(&db_tx, group_id).await? > 1 {
                return Err(EngineError::StateConflict(
                    "group still has other active members".to_string(),
                ));
            }

            let mut active: groups::ActiveModel = group.into();
            active.is_active = ActiveValue::Set(false);
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Lists the active groups the user is an active member of, with the
    /// user's role in each.
    pub async fn list_groups(
        &self,
        user_id: &str,
    ) -> ResultEngine<Vec<(groups::Model, MemberRole)>> {
        with_tx!(self, |db_tx| {
            let rows: Vec<(group_members::Model, Option<groups::Model>)> =
                group_members::Entity::find()
                    .filter(group_members::Column::UserId.eq(user_id.to_string()))
                    .filter(group_members::Column::Status.eq(MemberStatus::Active.as_str()))
                    .find_also_related(groups::Entity)
                    .filter(groups::Column::IsActive.eq(true))
                    .all(&db_tx)
                    .await?;

            let mut out = Vec::with_capacity(rows.len());
            for (member, group) in rows {
                let Some(group) = group else { continue };
                out.push((group, MemberRole::try_from(member.role.as_str())?));
            }
            Ok(out)
        })
    }

    /// Returns a group, visible to its active members only.
    pub async fn group_for_member(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<groups::Model> {
        with_tx!(self, |db_tx| {
            let group = self.require_group(&db_tx, group_id).await?;
            self.require_active_member(&db_tx, group_id, user_id)
                .await?;
            Ok(group)
        })
    }
}
