use chrono::{DateTime, Utc};
use uuid::Uuid;

use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    EngineError, ResultEngine, TransactionKind,
    expense_splits::{self, allocate_equal, validate_share_sum},
    transactions::validate_amount,
};

use super::{Engine, with_tx};

/// One explicit share of a group expense.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShareInput {
    pub user_id: String,
    pub amount_minor: i64,
}

/// How to partition a group expense between members.
#[derive(Clone, Debug)]
pub enum SplitMode {
    /// Divide evenly between all currently-active members, remainder minor
    /// units going to the first members in stable order.
    Equal,
    /// Caller-supplied shares; they must sum exactly to the amount.
    Explicit(Vec<ShareInput>),
}

impl Engine {
    /// Replaces the split set of a group expense.
    ///
    /// Delete-then-insert runs inside one DB transaction: either the new
    /// set is committed whole or the prior set survives untouched.
    pub async fn create_splits(
        &self,
        transaction_id: &str,
        acting_user_id: &str,
        mode: SplitMode,
    ) -> ResultEngine<Vec<expense_splits::Model>> {
        with_tx!(self, |db_tx| {
            let tx = self
                .require_visible_transaction(&db_tx, transaction_id, acting_user_id)
                .await?;
            if tx.deleted_at.is_some() {
                return Err(EngineError::StateConflict(
                    "cannot split a deleted transaction".to_string(),
                ));
            }
            if TransactionKind::try_from(tx.kind.as_str())? != TransactionKind::Expense {
                return Err(EngineError::InvalidSplitTarget(
                    "only expenses can be split".to_string(),
                ));
            }
            let Some(group_id) = tx.group_id.clone() else {
                return Err(EngineError::InvalidSplitTarget(
                    "only group transactions can be split".to_string(),
                ));
            };
            self.require_active_member(&db_tx, &group_id, acting_user_id)
                .await?;

            let members = self.active_members_ordered(&db_tx, &group_id).await?;
            let pairs: Vec<(String, i64)> = match mode {
                SplitMode::Equal => {
                    let shares = allocate_equal(tx.amount_minor, members.len())?;
                    members
                        .into_iter()
                        .map(|m| m.user_id)
                        .zip(shares)
                        .collect()
                }
                SplitMode::Explicit(shares) => {
                    if shares.is_empty() {
                        return Err(EngineError::InvalidValue(
                            "explicit split needs at least one share".to_string(),
                        ));
                    }
                    let mut seen = std::collections::HashSet::new();
                    for share in &shares {
                        validate_amount(share.amount_minor)?;
                        if !seen.insert(share.user_id.clone()) {
                            return Err(EngineError::InvalidValue(format!(
                                "duplicate split user: {}",
                                share.user_id
                            )));
                        }
                        if !members.iter().any(|m| m.user_id == share.user_id) {
                            return Err(EngineError::NotAGroupMember(share.user_id.clone()));
                        }
                    }
                    let amounts: Vec<i64> = shares.iter().map(|s| s.amount_minor).collect();
                    validate_share_sum(tx.amount_minor, &amounts)?;
                    shares
                        .into_iter()
                        .map(|s| (s.user_id, s.amount_minor))
                        .collect()
                }
            };

            expense_splits::Entity::delete_many()
                .filter(expense_splits::Column::TransactionId.eq(transaction_id.to_string()))
                .exec(&db_tx)
                .await?;

            let now = Utc::now();
            let mut created = Vec::with_capacity(pairs.len());
            for (user_id, amount_minor) in pairs {
                let active = expense_splits::ActiveModel {
                    id: ActiveValue::Set(Uuid::new_v4().to_string()),
                    transaction_id: ActiveValue::Set(transaction_id.to_string()),
                    user_id: ActiveValue::Set(user_id),
                    amount_minor: ActiveValue::Set(amount_minor),
                    is_paid: ActiveValue::Set(false),
                    paid_at: ActiveValue::Set(None),
                    created_at: ActiveValue::Set(now),
                };
                created.push(active.insert(&db_tx).await?);
            }
            Ok(created)
        })
    }

    /// Lists a transaction's splits, visible to anyone who can see the
    /// transaction.
    pub async fn list_splits(
        &self,
        transaction_id: &str,
        user_id: &str,
    ) -> ResultEngine<Vec<expense_splits::Model>> {
        with_tx!(self, |db_tx| {
            self.require_visible_transaction(&db_tx, transaction_id, user_id)
                .await?;
            expense_splits::Entity::find()
                .filter(expense_splits::Column::TransactionId.eq(transaction_id.to_string()))
                .order_by_asc(expense_splits::Column::UserId)
                .all(&db_tx)
                .await
                .map_err(Into::into)
        })
    }

    /// Marks a split as paid. Allowed for the debtor themself or a group
    /// admin; setting an already-paid split again is a no-op.
    pub async fn mark_split_paid(
        &self,
        split_id: &str,
        acting_user_id: &str,
        paid_at: DateTime<Utc>,
    ) -> ResultEngine<expense_splits::Model> {
        self.set_split_paid(split_id, acting_user_id, Some(paid_at))
            .await
    }

    /// Clears the paid flag of a split.
    pub async fn mark_split_unpaid(
        &self,
        split_id: &str,
        acting_user_id: &str,
    ) -> ResultEngine<expense_splits::Model> {
        self.set_split_paid(split_id, acting_user_id, None).await
    }

    async fn set_split_paid(
        &self,
        split_id: &str,
        acting_user_id: &str,
        paid_at: Option<DateTime<Utc>>,
    ) -> ResultEngine<expense_splits::Model> {
        with_tx!(self, |db_tx| {
            let split = expense_splits::Entity::find_by_id(split_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("split".to_string()))?;

            if split.user_id != acting_user_id {
                let tx = self
                    .require_visible_transaction(&db_tx, &split.transaction_id, acting_user_id)
                    .await?;
                let group_id = tx.group_id.ok_or_else(|| {
                    EngineError::InvalidSplitTarget(
                        "split belongs to a personal transaction".to_string(),
                    )
                })?;
                self.require_group_admin(&db_tx, &group_id, acting_user_id)
                    .await?;
            }

            let mut active: expense_splits::ActiveModel = split.into();
            active.is_paid = ActiveValue::Set(paid_at.is_some());
            active.paid_at = ActiveValue::Set(paid_at);
            let updated = active.update(&db_tx).await?;
            Ok(updated)
        })
    }
}
