use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    Currency, EngineError, RecurrenceRule, ResultEngine,
    reminders::{self, ReminderKind},
    transactions::validate_amount,
    users,
};

use super::{Engine, normalize_optional_text, normalize_required_name, with_tx};

/// Input for creating a reminder.
#[derive(Clone, Debug)]
pub struct NewReminder {
    pub user_id: String,
    pub group_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub kind: ReminderKind,
    pub due_at: DateTime<Utc>,
    pub amount_minor: Option<i64>,
    pub recurrence: Option<RecurrenceRule>,
}

/// Structured payload for a reminder whose notification is due. Delivery is
/// an external collaborator's job.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct DueReminder {
    pub reminder_id: String,
    pub user_id: String,
    pub email: String,
    pub title: String,
    pub description: Option<String>,
    pub kind: ReminderKind,
    pub due_at: DateTime<Utc>,
    pub amount_display: Option<String>,
}

impl Engine {
    pub async fn create_reminder(&self, cmd: NewReminder) -> ResultEngine<String> {
        let title = normalize_required_name(&cmd.title, "reminder")?;
        if let Some(amount) = cmd.amount_minor {
            validate_amount(amount)?;
        }
        if let Some(rule) = &cmd.recurrence {
            rule.validate()?;
        }
        let description = normalize_optional_text(cmd.description.as_deref());

        with_tx!(self, |db_tx| {
            self.require_active_user(&db_tx, &cmd.user_id).await?;
            if let Some(group_id) = &cmd.group_id {
                self.require_group(&db_tx, group_id).await?;
                self.require_active_member(&db_tx, group_id, &cmd.user_id)
                    .await?;
            }

            let (frequency, interval, day_of_month, recurrence_end) =
                RecurrenceRule::to_columns(cmd.recurrence.as_ref());
            let id = Uuid::new_v4().to_string();
            let active = reminders::ActiveModel {
                id: ActiveValue::Set(id.clone()),
                user_id: ActiveValue::Set(cmd.user_id.clone()),
                group_id: ActiveValue::Set(cmd.group_id.clone()),
                title: ActiveValue::Set(title),
                description: ActiveValue::Set(description),
                kind: ActiveValue::Set(cmd.kind.as_str().to_string()),
                due_at: ActiveValue::Set(cmd.due_at),
                amount_minor: ActiveValue::Set(cmd.amount_minor),
                frequency: ActiveValue::Set(frequency),
                recurrence_interval: ActiveValue::Set(interval),
                day_of_month: ActiveValue::Set(day_of_month),
                recurrence_end: ActiveValue::Set(recurrence_end),
                is_completed: ActiveValue::Set(false),
                completed_at: ActiveValue::Set(None),
                notification_sent: ActiveValue::Set(false),
                notification_sent_at: ActiveValue::Set(None),
                created_at: ActiveValue::Set(Utc::now()),
            };
            active.insert(&db_tx).await?;
            Ok(id)
        })
    }

    /// Updates an incomplete reminder (owner only). Changing the due date
    /// resets the notification flag so the new date gets announced.
    pub async fn update_reminder(
        &self,
        reminder_id: &str,
        user_id: &str,
        title: Option<&str>,
        description: Option<&str>,
        due_at: Option<DateTime<Utc>>,
        amount_minor: Option<Option<i64>>,
    ) -> ResultEngine<reminders::Model> {
        if let Some(Some(amount)) = amount_minor {
            validate_amount(amount)?;
        }

        with_tx!(self, |db_tx| {
            let reminder = self.require_own_reminder(&db_tx, reminder_id, user_id).await?;
            if reminder.is_completed {
                return Err(EngineError::StateConflict(
                    "cannot update a completed reminder".to_string(),
                ));
            }

            let mut active: reminders::ActiveModel = reminder.into();
            if let Some(title) = title {
                active.title = ActiveValue::Set(normalize_required_name(title, "reminder")?);
            }
            if description.is_some() {
                active.description = ActiveValue::Set(normalize_optional_text(description));
            }
            if let Some(due_at) = due_at {
                active.due_at = ActiveValue::Set(due_at);
                active.notification_sent = ActiveValue::Set(false);
                active.notification_sent_at = ActiveValue::Set(None);
            }
            if let Some(amount) = amount_minor {
                active.amount_minor = ActiveValue::Set(amount);
            }
            let updated = active.update(&db_tx).await?;
            Ok(updated)
        })
    }

    pub async fn delete_reminder(&self, reminder_id: &str, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let reminder = self.require_own_reminder(&db_tx, reminder_id, user_id).await?;
            let active: reminders::ActiveModel = reminder.into();
            active.delete(&db_tx).await?;
            Ok(())
        })
    }

    /// Lists the user's reminders, soonest first.
    pub async fn list_reminders(
        &self,
        user_id: &str,
        include_completed: bool,
        group_id: Option<&str>,
    ) -> ResultEngine<Vec<reminders::Model>> {
        with_tx!(self, |db_tx| {
            let mut query = reminders::Entity::find()
                .filter(reminders::Column::UserId.eq(user_id.to_string()));
            if let Some(group_id) = group_id {
                query = query.filter(reminders::Column::GroupId.eq(group_id.to_string()));
            }
            if !include_completed {
                query = query.filter(reminders::Column::IsCompleted.eq(false));
            }
            query
                .order_by_asc(reminders::Column::DueAt)
                .all(&db_tx)
                .await
                .map_err(Into::into)
        })
    }

    /// Completes a reminder. A recurring one spawns a brand-new row for the
    /// next occurrence in the same transaction; the completed row is never
    /// advanced in place. Returns the spawned reminder's id, if any.
    pub async fn complete_reminder(
        &self,
        reminder_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<Option<String>> {
        with_tx!(self, |db_tx| {
            let reminder = self.require_own_reminder(&db_tx, reminder_id, user_id).await?;
            if reminder.is_completed {
                return Err(EngineError::StateConflict(
                    "reminder is already completed".to_string(),
                ));
            }

            let rule = RecurrenceRule::from_columns(
                reminder.frequency.as_deref(),
                reminder.recurrence_interval,
                reminder.day_of_month,
                reminder.recurrence_end,
            )?;
            let next_due = rule.and_then(|r| r.next_occurrence(reminder.due_at));

            let spawned = match next_due {
                Some(due_at) => {
                    let id = Uuid::new_v4().to_string();
                    let next = reminders::ActiveModel {
                        id: ActiveValue::Set(id.clone()),
                        user_id: ActiveValue::Set(reminder.user_id.clone()),
                        group_id: ActiveValue::Set(reminder.group_id.clone()),
                        title: ActiveValue::Set(reminder.title.clone()),
                        description: ActiveValue::Set(reminder.description.clone()),
                        kind: ActiveValue::Set(reminder.kind.clone()),
                        due_at: ActiveValue::Set(due_at),
                        amount_minor: ActiveValue::Set(reminder.amount_minor),
                        frequency: ActiveValue::Set(reminder.frequency.clone()),
                        recurrence_interval: ActiveValue::Set(reminder.recurrence_interval),
                        day_of_month: ActiveValue::Set(reminder.day_of_month),
                        recurrence_end: ActiveValue::Set(reminder.recurrence_end),
                        is_completed: ActiveValue::Set(false),
                        completed_at: ActiveValue::Set(None),
                        notification_sent: ActiveValue::Set(false),
                        notification_sent_at: ActiveValue::Set(None),
                        created_at: ActiveValue::Set(now),
                    };
                    next.insert(&db_tx).await?;
                    Some(id)
                }
                None => None,
            };

            let mut completed: reminders::ActiveModel = reminder.into();
            completed.is_completed = ActiveValue::Set(true);
            completed.completed_at = ActiveValue::Set(Some(now));
            completed.update(&db_tx).await?;

            Ok(spawned)
        })
    }

    /// Scheduled entry point: incomplete, un-notified reminders due within
    /// the window, as structured notification payloads.
    pub async fn due_reminders(
        &self,
        now: DateTime<Utc>,
        window_minutes: i64,
    ) -> ResultEngine<Vec<DueReminder>> {
        let threshold = now + Duration::minutes(window_minutes);

        with_tx!(self, |db_tx| {
            let rows: Vec<(reminders::Model, Option<users::Model>)> = reminders::Entity::find()
                .filter(reminders::Column::IsCompleted.eq(false))
                .filter(reminders::Column::NotificationSent.eq(false))
                .filter(reminders::Column::DueAt.lte(threshold))
                .filter(reminders::Column::DueAt.gte(now))
                .order_by_asc(reminders::Column::DueAt)
                .find_also_related(users::Entity)
                .all(&db_tx)
                .await?;

            let mut out = Vec::with_capacity(rows.len());
            for (reminder, user) in rows {
                let Some(user) = user.filter(|u| u.is_active) else {
                    continue;
                };
                let currency =
                    Currency::try_from(user.preferred_currency.as_str()).unwrap_or_default();
                out.push(DueReminder {
                    reminder_id: reminder.id,
                    user_id: reminder.user_id,
                    email: user.email,
                    title: reminder.title,
                    description: reminder.description,
                    kind: ReminderKind::try_from(reminder.kind.as_str())?,
                    due_at: reminder.due_at,
                    amount_display: reminder
                        .amount_minor
                        .map(|amount| currency.format_minor(amount)),
                });
            }
            Ok(out)
        })
    }

    /// Stamps a reminder as notified so the trigger can re-run without
    /// duplicating deliveries.
    pub async fn mark_notification_sent(
        &self,
        reminder_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let reminder = reminders::Entity::find_by_id(reminder_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("reminder".to_string()))?;
            let mut active: reminders::ActiveModel = reminder.into();
            active.notification_sent = ActiveValue::Set(true);
            active.notification_sent_at = ActiveValue::Set(Some(now));
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    async fn require_own_reminder(
        &self,
        db_tx: &sea_orm::DatabaseTransaction,
        reminder_id: &str,
        user_id: &str,
    ) -> ResultEngine<reminders::Model> {
        let reminder = reminders::Entity::find_by_id(reminder_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("reminder".to_string()))?;
        if reminder.user_id != user_id {
            return Err(EngineError::KeyNotFound("reminder".to_string()));
        }
        Ok(reminder)
    }
}
