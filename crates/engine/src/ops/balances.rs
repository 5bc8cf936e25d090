use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, Statement, TransactionTrait, prelude::*};

use crate::{
    ResultEngine, TransactionKind,
    group_members::{self, MemberStatus},
    users,
};

use super::{Engine, with_tx};

/// Group-level income/expense totals over non-deleted transactions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct GroupBalance {
    pub income_minor: i64,
    pub expense_minor: i64,
    pub balance_minor: i64,
}

/// One member's net position inside a group.
///
/// `total_paid` is what they fronted (expenses they created in the group),
/// `total_owed` is the sum of their own split shares. A positive balance
/// means the group owes them. This is intentionally a set of independent
/// per-member net positions, not a pairwise settlement plan.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct MemberBalance {
    pub user_id: String,
    pub email: String,
    pub full_name: String,
    pub total_paid_minor: i64,
    pub total_owed_minor: i64,
    pub balance_minor: i64,
}

impl Engine {
    /// Income/expense totals of a group (members only).
    pub async fn group_balance(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<GroupBalance> {
        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, group_id).await?;
            self.require_active_member(&db_tx, group_id, user_id)
                .await?;

            let income = self
                .sum_group_transactions(&db_tx, group_id, TransactionKind::Income)
                .await?;
            let expense = self
                .sum_group_transactions(&db_tx, group_id, TransactionKind::Expense)
                .await?;
            Ok(GroupBalance {
                income_minor: income,
                expense_minor: expense,
                balance_minor: income - expense,
            })
        })
    }

    /// Per-member net positions of a group (members only), in stable member
    /// order.
    pub async fn member_balances(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<Vec<MemberBalance>> {
        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, group_id).await?;
            self.require_active_member(&db_tx, group_id, user_id)
                .await?;

            let rows: Vec<(group_members::Model, Option<users::Model>)> =
                group_members::Entity::find()
                    .filter(group_members::Column::GroupId.eq(group_id.to_string()))
                    .filter(group_members::Column::Status.eq(MemberStatus::Active.as_str()))
                    .order_by_asc(group_members::Column::JoinedAt)
                    .order_by_asc(group_members::Column::UserId)
                    .find_also_related(users::Entity)
                    .all(&db_tx)
                    .await?;

            let mut out = Vec::with_capacity(rows.len());
            for (member, user) in rows {
                let Some(user) = user else { continue };
                let total_paid = self
                    .sum_member_expenses(&db_tx, group_id, &member.user_id)
                    .await?;
                let total_owed = self
                    .sum_member_shares(&db_tx, group_id, &member.user_id)
                    .await?;
                out.push(MemberBalance {
                    user_id: member.user_id,
                    email: user.email,
                    full_name: user.full_name,
                    total_paid_minor: total_paid,
                    total_owed_minor: total_owed,
                    balance_minor: total_paid - total_owed,
                });
            }
            Ok(out)
        })
    }

    async fn sum_group_transactions(
        &self,
        db_tx: &DatabaseTransaction,
        group_id: &str,
        kind: TransactionKind,
    ) -> ResultEngine<i64> {
        let backend = db_tx.get_database_backend();
        let stmt = Statement::from_sql_and_values(
            backend,
            "SELECT COALESCE(SUM(amount_minor), 0) AS sum \
             FROM transactions \
             WHERE group_id = ? AND kind = ? AND deleted_at IS NULL",
            vec![group_id.into(), kind.as_str().into()],
        );
        let row = db_tx.query_one(stmt).await?;
        Ok(row.and_then(|r| r.try_get("", "sum").ok()).unwrap_or(0))
    }

    async fn sum_member_expenses(
        &self,
        db_tx: &DatabaseTransaction,
        group_id: &str,
        member_id: &str,
    ) -> ResultEngine<i64> {
        let backend = db_tx.get_database_backend();
        let stmt = Statement::from_sql_and_values(
            backend,
            "SELECT COALESCE(SUM(amount_minor), 0) AS sum \
             FROM transactions \
             WHERE group_id = ? AND user_id = ? AND kind = ? AND deleted_at IS NULL",
            vec![
                group_id.into(),
                member_id.into(),
                TransactionKind::Expense.as_str().into(),
            ],
        );
        let row = db_tx.query_one(stmt).await?;
        Ok(row.and_then(|r| r.try_get("", "sum").ok()).unwrap_or(0))
    }

    async fn sum_member_shares(
        &self,
        db_tx: &DatabaseTransaction,
        group_id: &str,
        member_id: &str,
    ) -> ResultEngine<i64> {
        let backend = db_tx.get_database_backend();
        let stmt = Statement::from_sql_and_values(
            backend,
            "SELECT COALESCE(SUM(expense_splits.amount_minor), 0) AS sum \
             FROM expense_splits \
             INNER JOIN transactions ON transactions.id = expense_splits.transaction_id \
             WHERE transactions.group_id = ? AND transactions.deleted_at IS NULL \
               AND expense_splits.user_id = ?",
            vec![group_id.into(), member_id.into()],
        );
        let row = db_tx.query_one(stmt).await?;
        Ok(row.and_then(|r| r.try_get("", "sum").ok()).unwrap_or(0))
    }
}
