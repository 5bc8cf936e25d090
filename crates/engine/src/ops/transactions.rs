use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use sea_orm::{
    ActiveValue, DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Statement, TransactionTrait, prelude::*,
};

use crate::{
    EngineError, RecurrenceRule, ResultEngine, TransactionKind,
    categories::CategoryKind,
    transactions::{self, validate_amount, validate_category_kind},
};

use super::{Engine, budget::month_bounds, normalize_optional_text, with_tx};

/// Input for creating a transaction.
#[derive(Clone, Debug)]
pub struct NewTransaction {
    pub user_id: String,
    /// `None` is a personal transaction, `Some` scopes it to a group the
    /// creator must be an active member of.
    pub group_id: Option<String>,
    pub category_id: String,
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub description: Option<String>,
    pub occurred_on: NaiveDate,
    pub recurrence: Option<RecurrenceRule>,
}

/// Listing filter. `group_id: None` lists the user's personal transactions.
#[derive(Clone, Debug, Default)]
pub struct TransactionFilter {
    pub group_id: Option<String>,
    pub kind: Option<TransactionKind>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub include_deleted: bool,
    pub limit: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct MonthlySummary {
    pub income_minor: i64,
    pub expense_minor: i64,
    pub balance_minor: i64,
    pub transaction_count: u64,
}

impl Engine {
    /// Creates a transaction after validating the amount, the category's
    /// kind compatibility and (for group transactions) the creator's active
    /// membership.
    pub async fn create_transaction(&self, cmd: NewTransaction) -> ResultEngine<String> {
        validate_amount(cmd.amount_minor)?;
        if let Some(rule) = &cmd.recurrence {
            rule.validate()?;
        }
        let description = normalize_optional_text(cmd.description.as_deref());

        with_tx!(self, |db_tx| {
            self.require_active_user(&db_tx, &cmd.user_id).await?;
            let category = self
                .require_category_usable(&db_tx, &cmd.category_id, &cmd.user_id)
                .await?;
            validate_category_kind(CategoryKind::try_from(category.kind.as_str())?, cmd.kind)?;

            if let Some(group_id) = &cmd.group_id {
                self.require_group(&db_tx, group_id).await?;
                self.require_active_member(&db_tx, group_id, &cmd.user_id)
                    .await?;
            }

            let (frequency, interval, day_of_month, recurrence_end) =
                RecurrenceRule::to_columns(cmd.recurrence.as_ref());
            let id = Uuid::new_v4().to_string();
            let active = transactions::ActiveModel {
                id: ActiveValue::Set(id.clone()),
                user_id: ActiveValue::Set(cmd.user_id.clone()),
                group_id: ActiveValue::Set(cmd.group_id.clone()),
                category_id: ActiveValue::Set(cmd.category_id.clone()),
                kind: ActiveValue::Set(cmd.kind.as_str().to_string()),
                amount_minor: ActiveValue::Set(cmd.amount_minor),
                description: ActiveValue::Set(description),
                occurred_on: ActiveValue::Set(cmd.occurred_on),
                frequency: ActiveValue::Set(frequency),
                recurrence_interval: ActiveValue::Set(interval),
                day_of_month: ActiveValue::Set(day_of_month),
                recurrence_end: ActiveValue::Set(recurrence_end),
                deleted_at: ActiveValue::Set(None),
                created_at: ActiveValue::Set(Utc::now()),
            };
            active.insert(&db_tx).await?;
            Ok(id)
        })
    }

    /// Updates a transaction's mutable fields (creator only). The kind is
    /// immutable; switching categories re-checks compatibility.
    pub async fn update_transaction(
        &self,
        transaction_id: &str,
        user_id: &str,
        amount_minor: Option<i64>,
        description: Option<&str>,
        occurred_on: Option<NaiveDate>,
        category_id: Option<&str>,
    ) -> ResultEngine<transactions::Model> {
        if let Some(amount) = amount_minor {
            validate_amount(amount)?;
        }

        with_tx!(self, |db_tx| {
            let tx = self
                .require_own_transaction(&db_tx, transaction_id, user_id)
                .await?;
            if tx.deleted_at.is_some() {
                return Err(EngineError::StateConflict(
                    "cannot update a deleted transaction".to_string(),
                ));
            }
            let kind = TransactionKind::try_from(tx.kind.as_str())?;

            let mut active: transactions::ActiveModel = tx.into();
            if let Some(amount) = amount_minor {
                active.amount_minor = ActiveValue::Set(amount);
            }
            if description.is_some() {
                active.description = ActiveValue::Set(normalize_optional_text(description));
            }
            if let Some(date) = occurred_on {
                active.occurred_on = ActiveValue::Set(date);
            }
            if let Some(category_id) = category_id {
                let category = self
                    .require_category_usable(&db_tx, category_id, user_id)
                    .await?;
                validate_category_kind(CategoryKind::try_from(category.kind.as_str())?, kind)?;
                active.category_id = ActiveValue::Set(category_id.to_string());
            }
            let updated = active.update(&db_tx).await?;
            Ok(updated)
        })
    }

    /// Soft-deletes a transaction (flag + timestamp). Split history is kept.
    pub async fn soft_delete_transaction(
        &self,
        transaction_id: &str,
        user_id: &str,
        deleted_at: DateTime<Utc>,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let tx = self
                .require_own_transaction(&db_tx, transaction_id, user_id)
                .await?;
            if tx.deleted_at.is_some() {
                return Err(EngineError::StateConflict(
                    "transaction is already deleted".to_string(),
                ));
            }
            let mut active: transactions::ActiveModel = tx.into();
            active.deleted_at = ActiveValue::Set(Some(deleted_at));
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Returns a transaction visible to the caller: their own, or one in a
    /// group they are an active member of.
    pub async fn get_transaction(
        &self,
        transaction_id: &str,
        user_id: &str,
    ) -> ResultEngine<transactions::Model> {
        with_tx!(self, |db_tx| {
            self.require_visible_transaction(&db_tx, transaction_id, user_id)
                .await
        })
    }

    /// Lists transactions for the user, personal or per group.
    pub async fn list_transactions(
        &self,
        user_id: &str,
        filter: TransactionFilter,
    ) -> ResultEngine<Vec<transactions::Model>> {
        with_tx!(self, |db_tx| {
            let mut query = transactions::Entity::find();
            match &filter.group_id {
                Some(group_id) => {
                    self.require_active_member(&db_tx, group_id, user_id)
                        .await?;
                    query = query.filter(transactions::Column::GroupId.eq(group_id.clone()));
                }
                None => {
                    query = query
                        .filter(transactions::Column::UserId.eq(user_id.to_string()))
                        .filter(transactions::Column::GroupId.is_null());
                }
            }
            if let Some(kind) = filter.kind {
                query = query.filter(transactions::Column::Kind.eq(kind.as_str()));
            }
            if let Some(from) = filter.from {
                query = query.filter(transactions::Column::OccurredOn.gte(from));
            }
            if let Some(to) = filter.to {
                query = query.filter(transactions::Column::OccurredOn.lte(to));
            }
            if !filter.include_deleted {
                query = query.filter(transactions::Column::DeletedAt.is_null());
            }
            if let Some(limit) = filter.limit {
                query = query.limit(limit);
            }
            query
                .order_by_desc(transactions::Column::OccurredOn)
                .order_by_desc(transactions::Column::CreatedAt)
                .all(&db_tx)
                .await
                .map_err(Into::into)
        })
    }

    /// Scheduled entry point: materializes the next instance of every
    /// recurring transaction whose next date is due.
    ///
    /// The recurrence rule moves to the new instance and is cleared from the
    /// rolled row, so each roll produces at most one forward occurrence per
    /// series and the entry point stays idempotent between due dates.
    pub async fn roll_recurring_transactions(
        &self,
        now: DateTime<Utc>,
    ) -> ResultEngine<Vec<String>> {
        let today = now.date_naive();

        with_tx!(self, |db_tx| {
            let recurring: Vec<transactions::Model> = transactions::Entity::find()
                .filter(transactions::Column::Frequency.is_not_null())
                .filter(transactions::Column::DeletedAt.is_null())
                .all(&db_tx)
                .await?;

            let mut created = Vec::new();
            for tx in recurring {
                let Some(rule) = RecurrenceRule::from_columns(
                    tx.frequency.as_deref(),
                    tx.recurrence_interval,
                    tx.day_of_month,
                    tx.recurrence_end,
                )?
                else {
                    continue;
                };
                let Some(next) = rule.next_date(tx.occurred_on) else {
                    // Series ended: stop considering this row.
                    let mut finished: transactions::ActiveModel = tx.into();
                    finished.frequency = ActiveValue::Set(None);
                    finished.recurrence_interval = ActiveValue::Set(None);
                    finished.day_of_month = ActiveValue::Set(None);
                    finished.recurrence_end = ActiveValue::Set(None);
                    finished.update(&db_tx).await?;
                    continue;
                };
                if next > today {
                    continue;
                }

                let (frequency, interval, day_of_month, recurrence_end) =
                    RecurrenceRule::to_columns(Some(&rule));
                let id = Uuid::new_v4().to_string();
                let spawned = transactions::ActiveModel {
                    id: ActiveValue::Set(id.clone()),
                    user_id: ActiveValue::Set(tx.user_id.clone()),
                    group_id: ActiveValue::Set(tx.group_id.clone()),
                    category_id: ActiveValue::Set(tx.category_id.clone()),
                    kind: ActiveValue::Set(tx.kind.clone()),
                    amount_minor: ActiveValue::Set(tx.amount_minor),
                    description: ActiveValue::Set(tx.description.clone()),
                    occurred_on: ActiveValue::Set(next),
                    frequency: ActiveValue::Set(frequency),
                    recurrence_interval: ActiveValue::Set(interval),
                    day_of_month: ActiveValue::Set(day_of_month),
                    recurrence_end: ActiveValue::Set(recurrence_end),
                    deleted_at: ActiveValue::Set(None),
                    created_at: ActiveValue::Set(now),
                };
                spawned.insert(&db_tx).await?;

                let mut rolled: transactions::ActiveModel = tx.into();
                rolled.frequency = ActiveValue::Set(None);
                rolled.recurrence_interval = ActiveValue::Set(None);
                rolled.day_of_month = ActiveValue::Set(None);
                rolled.recurrence_end = ActiveValue::Set(None);
                rolled.update(&db_tx).await?;

                created.push(id);
            }
            Ok(created)
        })
    }

    /// Personal income/expense totals for a calendar month.
    pub async fn monthly_summary(
        &self,
        user_id: &str,
        year: i32,
        month: u32,
    ) -> ResultEngine<MonthlySummary> {
        let (start, end) = month_bounds(year, month)?;

        with_tx!(self, |db_tx| {
            let backend = db_tx.get_database_backend();
            let mut totals = [0i64; 2];
            for (slot, kind) in [TransactionKind::Income, TransactionKind::Expense]
                .into_iter()
                .enumerate()
            {
                let stmt = Statement::from_sql_and_values(
                    backend,
                    "SELECT COALESCE(SUM(amount_minor), 0) AS sum \
                     FROM transactions \
                     WHERE user_id = ? AND group_id IS NULL AND kind = ? \
                       AND deleted_at IS NULL AND occurred_on >= ? AND occurred_on < ?",
                    vec![user_id.into(), kind.as_str().into(), start.into(), end.into()],
                );
                let row = db_tx.query_one(stmt).await?;
                totals[slot] = row.and_then(|r| r.try_get("", "sum").ok()).unwrap_or(0);
            }

            let transaction_count = transactions::Entity::find()
                .filter(transactions::Column::UserId.eq(user_id.to_string()))
                .filter(transactions::Column::GroupId.is_null())
                .filter(transactions::Column::DeletedAt.is_null())
                .filter(transactions::Column::OccurredOn.gte(start))
                .filter(transactions::Column::OccurredOn.lt(end))
                .count(&db_tx)
                .await?;

            Ok(MonthlySummary {
                income_minor: totals[0],
                expense_minor: totals[1],
                balance_minor: totals[0] - totals[1],
                transaction_count,
            })
        })
    }

    async fn require_own_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        transaction_id: &str,
        user_id: &str,
    ) -> ResultEngine<transactions::Model> {
        let tx = transactions::Entity::find_by_id(transaction_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("transaction".to_string()))?;
        if tx.user_id != user_id {
            return Err(EngineError::KeyNotFound("transaction".to_string()));
        }
        Ok(tx)
    }

    pub(super) async fn require_visible_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        transaction_id: &str,
        user_id: &str,
    ) -> ResultEngine<transactions::Model> {
        let tx = transactions::Entity::find_by_id(transaction_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("transaction".to_string()))?;
        if tx.user_id == user_id {
            return Ok(tx);
        }
        match &tx.group_id {
            Some(group_id) => {
                self.require_active_member(db_tx, group_id, user_id).await?;
                Ok(tx)
            }
            None => Err(EngineError::KeyNotFound("transaction".to_string())),
        }
    }
}
