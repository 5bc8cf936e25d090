use chrono::Utc;
use uuid::Uuid;

use sea_orm::{
    ActiveValue, Condition, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};

use crate::{
    EngineError, ResultEngine, categories,
    categories::{CategoryKind, DEFAULT_ALERT_THRESHOLD, validate_alert_threshold},
    transactions, TransactionKind,
};

use super::{Engine, normalize_required_name, with_tx};

/// Input for creating a custom category.
#[derive(Clone, Debug)]
pub struct NewCategory {
    pub name: String,
    pub kind: CategoryKind,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub budget_minor: Option<i64>,
    pub alert_threshold: Option<i32>,
}

const DEFAULT_ICON: &str = "📁";
const DEFAULT_COLOR: &str = "#6B7280";

/// System categories installed at seed time. Budgets are opt-in per user, so
/// none of these carry one.
const SYSTEM_CATEGORIES: &[(&str, &str, &str, CategoryKind)] = &[
    ("Food", "🍔", "#F59E0B", CategoryKind::Expense),
    ("Transport", "🚗", "#3B82F6", CategoryKind::Expense),
    ("Housing", "🏠", "#8B5CF6", CategoryKind::Expense),
    ("Bills & Utilities", "💡", "#EF4444", CategoryKind::Expense),
    ("Entertainment", "🎬", "#EC4899", CategoryKind::Expense),
    ("Shopping", "🛒", "#14B8A6", CategoryKind::Expense),
    ("Health", "💊", "#10B981", CategoryKind::Expense),
    ("Education", "📚", "#6366F1", CategoryKind::Expense),
    ("Travel", "✈️", "#F97316", CategoryKind::Expense),
    ("Other expenses", "📦", "#6B7280", CategoryKind::Expense),
    ("Salary", "💰", "#22C55E", CategoryKind::Income),
    ("Freelance", "💼", "#0EA5E9", CategoryKind::Income),
    ("Investments", "📈", "#A855F7", CategoryKind::Income),
    ("Gifts received", "🎁", "#F43F5E", CategoryKind::Income),
    ("Other income", "💵", "#84CC16", CategoryKind::Income),
];

impl Engine {
    /// Creates a custom category owned by the user.
    pub async fn create_category(&self, user_id: &str, cmd: NewCategory) -> ResultEngine<String> {
        let name = normalize_required_name(&cmd.name, "category")?;
        if let Some(budget) = cmd.budget_minor {
            if budget < 0 {
                return Err(EngineError::InvalidAmount(
                    "budget_minor must not be negative".to_string(),
                ));
            }
        }
        let threshold = cmd.alert_threshold.unwrap_or(DEFAULT_ALERT_THRESHOLD);
        validate_alert_threshold(threshold)?;

        with_tx!(self, |db_tx| {
            self.require_active_user(&db_tx, user_id).await?;

            let duplicate = categories::Entity::find()
                .filter(categories::Column::UserId.eq(user_id.to_string()))
                .filter(categories::Column::Name.eq(name.clone()))
                .one(&db_tx)
                .await?;
            if duplicate.is_some() {
                return Err(EngineError::ExistingKey(name));
            }

            let id = Uuid::new_v4().to_string();
            let active = categories::ActiveModel {
                id: ActiveValue::Set(id.clone()),
                name: ActiveValue::Set(name),
                kind: ActiveValue::Set(cmd.kind.as_str().to_string()),
                icon: ActiveValue::Set(cmd.icon.unwrap_or_else(|| DEFAULT_ICON.to_string())),
                color: ActiveValue::Set(cmd.color.unwrap_or_else(|| DEFAULT_COLOR.to_string())),
                budget_minor: ActiveValue::Set(cmd.budget_minor),
                alert_threshold: ActiveValue::Set(threshold),
                is_system: ActiveValue::Set(false),
                user_id: ActiveValue::Set(Some(user_id.to_string())),
                last_alerted_at: ActiveValue::Set(None),
                created_at: ActiveValue::Set(Utc::now()),
            };
            active.insert(&db_tx).await?;
            Ok(id)
        })
    }

    /// Updates one of the user's custom categories. `budget_minor` uses a
    /// nested option: `Some(None)` clears the budget, `None` leaves it
    /// untouched.
    pub async fn update_category(
        &self,
        user_id: &str,
        category_id: &str,
        name: Option<&str>,
        budget_minor: Option<Option<i64>>,
        alert_threshold: Option<i32>,
    ) -> ResultEngine<categories::Model> {
        if let Some(Some(budget)) = budget_minor {
            if budget < 0 {
                return Err(EngineError::InvalidAmount(
                    "budget_minor must not be negative".to_string(),
                ));
            }
        }
        if let Some(threshold) = alert_threshold {
            validate_alert_threshold(threshold)?;
        }

        with_tx!(self, |db_tx| {
            let category = self.require_owned_category(&db_tx, category_id, user_id).await?;

            let mut active: categories::ActiveModel = category.into();
            if let Some(name) = name {
                active.name = ActiveValue::Set(normalize_required_name(name, "category")?);
            }
            if let Some(budget) = budget_minor {
                active.budget_minor = ActiveValue::Set(budget);
            }
            if let Some(threshold) = alert_threshold {
                active.alert_threshold = ActiveValue::Set(threshold);
            }
            let updated = active.update(&db_tx).await?;
            Ok(updated)
        })
    }

    /// Deletes one of the user's custom categories. Blocked while any
    /// transaction still references it.
    pub async fn delete_category(&self, user_id: &str, category_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let category = self.require_owned_category(&db_tx, category_id, user_id).await?;

            let referencing = transactions::Entity::find()
                .filter(transactions::Column::CategoryId.eq(category_id.to_string()))
                .count(&db_tx)
                .await?;
            if referencing > 0 {
                return Err(EngineError::StateConflict(
                    "category still has transactions".to_string(),
                ));
            }

            let active: categories::ActiveModel = category.into();
            active.delete(&db_tx).await?;
            Ok(())
        })
    }

    /// Lists the categories visible to a user: the system set plus their
    /// own, optionally narrowed to those usable for a transaction kind.
    pub async fn list_categories(
        &self,
        user_id: &str,
        kind: Option<TransactionKind>,
    ) -> ResultEngine<Vec<categories::Model>> {
        with_tx!(self, |db_tx| {
            let mut query = categories::Entity::find().filter(
                Condition::any()
                    .add(categories::Column::IsSystem.eq(true))
                    .add(categories::Column::UserId.eq(user_id.to_string())),
            );
            if let Some(kind) = kind {
                query = query.filter(
                    categories::Column::Kind
                        .is_in([kind.as_str(), CategoryKind::Both.as_str()]),
                );
            }
            query
                .order_by_asc(categories::Column::Name)
                .all(&db_tx)
                .await
                .map_err(Into::into)
        })
    }

    /// Installs the default system categories, skipping ones that already
    /// exist. Returns how many rows were created. Safe to re-run.
    pub async fn seed_system_categories(&self) -> ResultEngine<usize> {
        with_tx!(self, |db_tx| {
            let mut created = 0;
            for (name, icon, color, kind) in SYSTEM_CATEGORIES {
                let existing = categories::Entity::find()
                    .filter(categories::Column::IsSystem.eq(true))
                    .filter(categories::Column::Name.eq(*name))
                    .one(&db_tx)
                    .await?;
                if existing.is_some() {
                    continue;
                }
                let active = categories::ActiveModel {
                    id: ActiveValue::Set(Uuid::new_v4().to_string()),
                    name: ActiveValue::Set((*name).to_string()),
                    kind: ActiveValue::Set(kind.as_str().to_string()),
                    icon: ActiveValue::Set((*icon).to_string()),
                    color: ActiveValue::Set((*color).to_string()),
                    budget_minor: ActiveValue::Set(None),
                    alert_threshold: ActiveValue::Set(DEFAULT_ALERT_THRESHOLD),
                    is_system: ActiveValue::Set(true),
                    user_id: ActiveValue::Set(None),
                    last_alerted_at: ActiveValue::Set(None),
                    created_at: ActiveValue::Set(Utc::now()),
                };
                active.insert(&db_tx).await?;
                created += 1;
            }
            Ok(created)
        })
    }

    async fn require_owned_category(
        &self,
        db_tx: &sea_orm::DatabaseTransaction,
        category_id: &str,
        user_id: &str,
    ) -> ResultEngine<categories::Model> {
        let category = categories::Entity::find_by_id(category_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("category".to_string()))?;
        if category.is_system {
            return Err(EngineError::Forbidden(
                "system categories cannot be modified".to_string(),
            ));
        }
        if category.user_id.as_deref() != Some(user_id) {
            return Err(EngineError::KeyNotFound("category".to_string()));
        }
        Ok(category)
    }
}
