use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, Statement, TransactionTrait, prelude::*,
};

use crate::{
    Currency, EngineError, ResultEngine, TransactionKind,
    categories::{self, BudgetStatus},
    users,
};

use super::{Engine, with_tx};

/// Structured alert payload handed to the notification collaborator. The
/// engine never sends anything itself.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct BudgetAlert {
    pub user_id: String,
    pub email: String,
    pub category_id: String,
    pub category_name: String,
    pub icon: String,
    pub status: BudgetStatus,
    pub budget_display: String,
    pub spent_display: String,
}

pub(super) fn month_bounds(year: i32, month: u32) -> ResultEngine<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        EngineError::InvalidValue(format!("invalid month: {year}-{month:02}"))
    })?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .ok_or_else(|| EngineError::InvalidValue(format!("invalid month: {year}-{month:02}")))?;
    Ok((start, end))
}

impl Engine {
    pub(super) async fn sum_for_month(
        &self,
        db_tx: &DatabaseTransaction,
        category_id: &str,
        kind: TransactionKind,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ResultEngine<i64> {
        let backend = db_tx.get_database_backend();
        let stmt = Statement::from_sql_and_values(
            backend,
            "SELECT COALESCE(SUM(amount_minor), 0) AS sum \
             FROM transactions \
             WHERE category_id = ? AND kind = ? AND deleted_at IS NULL \
               AND occurred_on >= ? AND occurred_on < ?",
            vec![
                category_id.into(),
                kind.as_str().into(),
                start.into(),
                end.into(),
            ],
        );
        let row = db_tx.query_one(stmt).await?;
        Ok(row.and_then(|r| r.try_get("", "sum").ok()).unwrap_or(0))
    }

    /// Sum of the category's non-deleted expenses in a calendar month.
    pub async fn monthly_spent(
        &self,
        category_id: &str,
        user_id: &str,
        year: i32,
        month: u32,
    ) -> ResultEngine<i64> {
        let (start, end) = month_bounds(year, month)?;
        with_tx!(self, |db_tx| {
            self.require_category_usable(&db_tx, category_id, user_id)
                .await?;
            self.sum_for_month(&db_tx, category_id, TransactionKind::Expense, start, end)
                .await
        })
    }

    /// Sum of the category's non-deleted income in a calendar month.
    pub async fn monthly_income(
        &self,
        category_id: &str,
        user_id: &str,
        year: i32,
        month: u32,
    ) -> ResultEngine<i64> {
        let (start, end) = month_bounds(year, month)?;
        with_tx!(self, |db_tx| {
            self.require_category_usable(&db_tx, category_id, user_id)
                .await?;
            self.sum_for_month(&db_tx, category_id, TransactionKind::Income, start, end)
                .await
        })
    }

    /// Budget state of a category for a month (current month when
    /// unspecified). `None` when the category has no budget to track —
    /// that is not an error.
    pub async fn budget_status(
        &self,
        category_id: &str,
        user_id: &str,
        year: Option<i32>,
        month: Option<u32>,
    ) -> ResultEngine<Option<BudgetStatus>> {
        let now = Utc::now().date_naive();
        let (start, end) = month_bounds(
            year.unwrap_or_else(|| now.year()),
            month.unwrap_or_else(|| now.month()),
        )?;

        with_tx!(self, |db_tx| {
            let category = self
                .require_category_usable(&db_tx, category_id, user_id)
                .await?;
            let Some(budget_minor) = category.budget_minor else {
                return Ok(None);
            };
            let spent = self
                .sum_for_month(&db_tx, category_id, TransactionKind::Expense, start, end)
                .await?;
            Ok(Some(BudgetStatus::compute(
                budget_minor,
                spent,
                category.alert_threshold,
            )))
        })
    }

    /// Scheduled entry point: walks every budgeted custom category and
    /// returns the alerts that should go out now. Alerts already raised in
    /// the last 24h are suppressed via `last_alerted_at`, so the trigger can
    /// re-invoke this as often as it likes.
    pub async fn check_all_budgets(&self, now: DateTime<Utc>) -> ResultEngine<Vec<BudgetAlert>> {
        let today = now.date_naive();
        let (start, end) = month_bounds(today.year(), today.month())?;

        with_tx!(self, |db_tx| {
            let budgeted: Vec<categories::Model> = categories::Entity::find()
                .filter(categories::Column::BudgetMinor.is_not_null())
                .filter(categories::Column::UserId.is_not_null())
                .all(&db_tx)
                .await?;

            let mut alerts = Vec::new();
            for category in budgeted {
                let Some(budget_minor) = category.budget_minor else {
                    continue;
                };
                let Some(owner_id) = category.user_id.clone() else {
                    continue;
                };

                let spent = self
                    .sum_for_month(&db_tx, &category.id, TransactionKind::Expense, start, end)
                    .await?;
                let status = BudgetStatus::compute(budget_minor, spent, category.alert_threshold);
                if !status.is_alert {
                    continue;
                }
                if let Some(last) = category.last_alerted_at {
                    if now - last < Duration::hours(24) {
                        continue;
                    }
                }

                let Some(owner) = users::Entity::find_by_id(owner_id.clone())
                    .one(&db_tx)
                    .await?
                    .filter(|user| user.is_active)
                else {
                    continue;
                };
                let currency =
                    Currency::try_from(owner.preferred_currency.as_str()).unwrap_or_default();

                alerts.push(BudgetAlert {
                    user_id: owner_id,
                    email: owner.email,
                    category_id: category.id.clone(),
                    category_name: category.name.clone(),
                    icon: category.icon.clone(),
                    status,
                    budget_display: currency.format_minor(budget_minor),
                    spent_display: currency.format_minor(spent),
                });

                let mut stamped: categories::ActiveModel = category.into();
                stamped.last_alerted_at = ActiveValue::Set(Some(now));
                stamped.update(&db_tx).await?;
            }
            Ok(alerts)
        })
    }
}
