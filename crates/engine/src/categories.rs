//! Categories and their monthly budget status.
//!
//! A category is either system-wide (`is_system`, no owner) or owned by a
//! user. [`BudgetStatus`] is the pure spent/remaining/alert computation; the
//! monthly SUM feeding it lives in the budget ops.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine, transactions::TransactionKind};

pub const DEFAULT_ALERT_THRESHOLD: i32 = 80;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    Income,
    Expense,
    Both,
}

impl CategoryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Both => "both",
        }
    }

    /// Whether a transaction of `kind` may use a category of this kind.
    pub fn accepts(self, kind: TransactionKind) -> bool {
        match self {
            Self::Both => true,
            Self::Income => kind == TransactionKind::Income,
            Self::Expense => kind == TransactionKind::Expense,
        }
    }
}

impl TryFrom<&str> for CategoryKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "both" => Ok(Self::Both),
            other => Err(EngineError::InvalidValue(format!(
                "invalid category kind: {other}"
            ))),
        }
    }
}

/// Validates an alert threshold percentage.
pub fn validate_alert_threshold(threshold: i32) -> ResultEngine<()> {
    if !(0..=100).contains(&threshold) {
        return Err(EngineError::InvalidValue(
            "alert threshold must be between 0 and 100".to_string(),
        ));
    }
    Ok(())
}

/// Computed monthly budget state for a category.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub budget_minor: i64,
    pub spent_minor: i64,
    pub remaining_minor: i64,
    pub percentage: f64,
    pub is_over_budget: bool,
    pub is_alert: bool,
    pub alert_threshold: i32,
}

impl BudgetStatus {
    /// Pure computation from a budget, the month's spend and the alert
    /// threshold. A zero budget yields 0% rather than dividing by zero.
    pub fn compute(budget_minor: i64, spent_minor: i64, alert_threshold: i32) -> Self {
        let percentage = if budget_minor > 0 {
            spent_minor as f64 / budget_minor as f64 * 100.0
        } else {
            0.0
        };
        Self {
            budget_minor,
            spent_minor,
            remaining_minor: budget_minor - spent_minor,
            percentage,
            is_over_budget: spent_minor > budget_minor,
            is_alert: percentage >= f64::from(alert_threshold),
            alert_threshold,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub kind: String,
    pub icon: String,
    pub color: String,
    pub budget_minor: Option<i64>,
    pub alert_threshold: i32,
    pub is_system: bool,
    pub user_id: Option<String>,
    pub last_alerted_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_status_zero_budget_never_divides() {
        let status = BudgetStatus::compute(0, 5000, 80);
        assert_eq!(status.percentage, 0.0);
        assert!(status.is_over_budget);
        assert!(!status.is_alert);
    }

    #[test]
    fn budget_status_alert_fires_exactly_at_threshold() {
        let below = BudgetStatus::compute(20_000, 15_999, 80);
        assert!(!below.is_alert);

        let at = BudgetStatus::compute(20_000, 16_000, 80);
        assert!((at.percentage - 80.0).abs() < f64::EPSILON);
        assert!(at.is_alert);
        assert!(!at.is_over_budget);

        let above = BudgetStatus::compute(20_000, 21_000, 80);
        assert!(above.is_alert);
        assert!(above.is_over_budget);
        assert_eq!(above.remaining_minor, -1000);
    }

    #[test]
    fn budget_status_percentage_is_monotonic_in_spend() {
        let mut last = -1.0;
        for spent in (0..=30_000).step_by(500) {
            let status = BudgetStatus::compute(20_000, spent, 80);
            assert!(status.percentage >= last);
            last = status.percentage;
        }
    }

    #[test]
    fn category_kind_compatibility() {
        assert!(CategoryKind::Both.accepts(TransactionKind::Income));
        assert!(CategoryKind::Both.accepts(TransactionKind::Expense));
        assert!(CategoryKind::Income.accepts(TransactionKind::Income));
        assert!(!CategoryKind::Income.accepts(TransactionKind::Expense));
        assert!(!CategoryKind::Expense.accepts(TransactionKind::Income));
    }
}
