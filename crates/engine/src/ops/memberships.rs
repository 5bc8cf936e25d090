use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    EngineError, ResultEngine, group_members,
    group_members::{MemberRole, MemberStatus},
    groups, invitations,
    invitations::InvitationStatus,
    users,
};

use super::{Engine, normalize_email, with_tx};

const INVITATION_EXPIRY_DAYS: i64 = 7;

/// Result of inviting someone: the token the delivery collaborator sends out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvitationOutcome {
    pub invitation_id: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Engine {
    /// Invites an email address to a group (admins only).
    ///
    /// Re-inviting the same address while a pending invitation exists
    /// returns the existing token instead of minting a second one.
    pub async fn invite_member(
        &self,
        group_id: &str,
        email: &str,
        inviter_id: &str,
    ) -> ResultEngine<InvitationOutcome> {
        let email = normalize_email(email)?;

        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, group_id).await?;
            self.require_group_admin(&db_tx, group_id, inviter_id)
                .await?;

            // Already an active member? Nothing to invite.
            if let Some(user) = users::Entity::find()
                .filter(users::Column::Email.eq(email.clone()))
                .one(&db_tx)
                .await?
            {
                let member = self.membership(&db_tx, group_id, &user.id).await?;
                if member.is_some_and(|m| m.is_active()) {
                    return Err(EngineError::StateConflict(
                        "user is already an active member".to_string(),
                    ));
                }
            }

            let now = Utc::now();
            let existing = invitations::Entity::find()
                .filter(invitations::Column::GroupId.eq(group_id.to_string()))
                .filter(invitations::Column::Email.eq(email.clone()))
                .filter(invitations::Column::Status.eq(InvitationStatus::Pending.as_str()))
                .one(&db_tx)
                .await?;
            if let Some(invitation) = existing {
                if invitation.expires_at > now {
                    return Ok(InvitationOutcome {
                        invitation_id: invitation.id,
                        token: invitation.token,
                        expires_at: invitation.expires_at,
                    });
                }
                let mut expired: invitations::ActiveModel = invitation.into();
                expired.status = ActiveValue::Set(InvitationStatus::Expired.as_str().to_string());
                expired.update(&db_tx).await?;
            }

            let id = Uuid::new_v4().to_string();
            let token = Uuid::new_v4().simple().to_string();
            let expires_at = now + Duration::days(INVITATION_EXPIRY_DAYS);
            let active = invitations::ActiveModel {
                id: ActiveValue::Set(id.clone()),
                group_id: ActiveValue::Set(group_id.to_string()),
                email: ActiveValue::Set(email),
                invited_by: ActiveValue::Set(inviter_id.to_string()),
                token: ActiveValue::Set(token.clone()),
                status: ActiveValue::Set(InvitationStatus::Pending.as_str().to_string()),
                expires_at: ActiveValue::Set(expires_at),
                created_at: ActiveValue::Set(now),
            };
            active.insert(&db_tx).await?;

            Ok(InvitationOutcome {
                invitation_id: id,
                token,
                expires_at,
            })
        })
    }

    /// Accepts an invitation, joining the accepting user to the group.
    ///
    /// Membership creation is get-or-create: a `left` or `pending` row is
    /// re-activated, an `active` row makes the call a no-op, and a
    /// concurrent insert collision is resolved by a single retry as an
    /// update.
    pub async fn accept_invitation(&self, token: &str, user_id: &str) -> ResultEngine<String> {
        with_tx!(self, |db_tx| {
            let invitation = invitations::Entity::find()
                .filter(invitations::Column::Token.eq(token.to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("invitation".to_string()))?;

            let status = InvitationStatus::try_from(invitation.status.as_str())?;
            if status != InvitationStatus::Pending {
                return Err(EngineError::StateConflict(format!(
                    "invitation is already {}",
                    invitation.status
                )));
            }

            let now = Utc::now();
            if invitation.expires_at <= now {
                let mut expired: invitations::ActiveModel = invitation.into();
                expired.status = ActiveValue::Set(InvitationStatus::Expired.as_str().to_string());
                expired.update(&db_tx).await?;
                // Persist the expiry flip even though the acceptance fails.
                db_tx.commit().await?;
                return Err(EngineError::StateConflict(
                    "invitation has expired".to_string(),
                ));
            }

            let group_id = invitation.group_id.clone();
            self.require_group(&db_tx, &group_id).await?;
            self.require_active_user(&db_tx, user_id).await?;

            self.activate_membership(&db_tx, &group_id, user_id, Some(&invitation.invited_by), now)
                .await?;

            let mut accepted: invitations::ActiveModel = invitation.into();
            accepted.status = ActiveValue::Set(InvitationStatus::Accepted.as_str().to_string());
            accepted.update(&db_tx).await?;

            Ok(group_id)
        })
    }

    /// Declines a pending invitation.
    pub async fn decline_invitation(&self, token: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let invitation = invitations::Entity::find()
                .filter(invitations::Column::Token.eq(token.to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("invitation".to_string()))?;
            if InvitationStatus::try_from(invitation.status.as_str())? != InvitationStatus::Pending
            {
                return Err(EngineError::StateConflict(format!(
                    "invitation is already {}",
                    invitation.status
                )));
            }
            let mut declined: invitations::ActiveModel = invitation.into();
            declined.status = ActiveValue::Set(InvitationStatus::Declined.as_str().to_string());
            declined.update(&db_tx).await?;
            Ok(())
        })
    }

    async fn activate_membership(
        &self,
        db_tx: &sea_orm::DatabaseTransaction,
        group_id: &str,
        user_id: &str,
        invited_by: Option<&str>,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        match self.membership(db_tx, group_id, user_id).await? {
            Some(member) if member.is_active() => Ok(()),
            Some(member) => {
                let mut active: group_members::ActiveModel = member.into();
                active.status = ActiveValue::Set(MemberStatus::Active.as_str().to_string());
                active.joined_at = ActiveValue::Set(Some(now));
                active.update(db_tx).await?;
                Ok(())
            }
            None => {
                let active = group_members::ActiveModel {
                    group_id: ActiveValue::Set(group_id.to_string()),
                    user_id: ActiveValue::Set(user_id.to_string()),
                    role: ActiveValue::Set(MemberRole::Member.as_str().to_string()),
                    status: ActiveValue::Set(MemberStatus::Active.as_str().to_string()),
                    invited_by: ActiveValue::Set(invited_by.map(ToString::to_string)),
                    joined_at: ActiveValue::Set(Some(now)),
                    created_at: ActiveValue::Set(now),
                };
                if let Err(err) = active.insert(db_tx).await {
                    // A concurrent acceptance may have inserted the row
                    // first; the operation is idempotent, so retry as an
                    // update once.
                    match self.membership(db_tx, group_id, user_id).await? {
                        Some(member) if member.is_active() => Ok(()),
                        Some(member) => {
                            let mut active: group_members::ActiveModel = member.into();
                            active.status =
                                ActiveValue::Set(MemberStatus::Active.as_str().to_string());
                            active.joined_at = ActiveValue::Set(Some(now));
                            active.update(db_tx).await?;
                            Ok(())
                        }
                        None => Err(err.into()),
                    }
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Changes a member's role (admins only).
    ///
    /// The sole remaining admin cannot be demoted; the check runs in the
    /// same transaction as the write so two concurrent demotions cannot
    /// leave the group adminless.
    pub async fn change_member_role(
        &self,
        group_id: &str,
        target_user_id: &str,
        role: MemberRole,
        acting_user_id: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, group_id).await?;
            self.require_group_admin(&db_tx, group_id, acting_user_id)
                .await?;
            let target = self
                .require_active_member(&db_tx, group_id, target_user_id)
                .await?;

            if role == MemberRole::Member
                && target.is_admin()
                && self.count_active_admins(&db_tx, group_id).await? <= 1
            {
                return Err(EngineError::StateConflict(
                    "cannot demote the last admin".to_string(),
                ));
            }

            let mut active: group_members::ActiveModel = target.into();
            active.role = ActiveValue::Set(role.as_str().to_string());
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Removes a member (admins) or lets a member leave (self).
    ///
    /// The membership row is never deleted: status flips to `left`. When the
    /// last active member goes, the group is deactivated in the same
    /// transaction.
    pub async fn remove_member(
        &self,
        group_id: &str,
        target_user_id: &str,
        acting_user_id: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let group = self.require_group(&db_tx, group_id).await?;
            if acting_user_id != target_user_id {
                self.require_group_admin(&db_tx, group_id, acting_user_id)
                    .await?;
            }
            let target = self
                .require_active_member(&db_tx, group_id, target_user_id)
                .await?;

            let active_members = self.count_active_members(&db_tx, group_id).await?;
            let is_last_member = active_members <= 1;

            if !is_last_member
                && target.is_admin()
                && self.count_active_admins(&db_tx, group_id).await? <= 1
            {
                return Err(EngineError::StateConflict(
                    "cannot remove the last admin".to_string(),
                ));
            }

            let mut left: group_members::ActiveModel = target.into();
            left.status = ActiveValue::Set(MemberStatus::Left.as_str().to_string());
            left.update(&db_tx).await?;

            if is_last_member {
                let mut inactive: groups::ActiveModel = group.into();
                inactive.is_active = ActiveValue::Set(false);
                inactive.update(&db_tx).await?;
            }
            Ok(())
        })
    }

    /// A member leaves the group on their own.
    pub async fn leave_group(&self, group_id: &str, user_id: &str) -> ResultEngine<()> {
        self.remove_member(group_id, user_id, user_id).await
    }

    /// Lists a group's memberships with their user rows (members only).
    pub async fn list_members(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<Vec<(group_members::Model, users::Model)>> {
        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, group_id).await?;
            self.require_active_member(&db_tx, group_id, user_id)
                .await?;

            let rows: Vec<(group_members::Model, Option<users::Model>)> =
                group_members::Entity::find()
                    .filter(group_members::Column::GroupId.eq(group_id.to_string()))
                    .order_by_asc(group_members::Column::JoinedAt)
                    .order_by_asc(group_members::Column::UserId)
                    .find_also_related(users::Entity)
                    .all(&db_tx)
                    .await?;

            let mut out = Vec::with_capacity(rows.len());
            for (member, user) in rows {
                let Some(user) = user else { continue };
                out.push((member, user));
            }
            Ok(out)
        })
    }

    /// Lists a group's invitations (admins only).
    pub async fn list_invitations(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<Vec<invitations::Model>> {
        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, group_id).await?;
            self.require_group_admin(&db_tx, group_id, user_id).await?;
            invitations::Entity::find()
                .filter(invitations::Column::GroupId.eq(group_id.to_string()))
                .order_by_desc(invitations::Column::CreatedAt)
                .all(&db_tx)
                .await
                .map_err(Into::into)
        })
    }
}
