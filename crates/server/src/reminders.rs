//! Reminder endpoints.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;

use api_types::recurrence::{Frequency, RecurrenceRule};
use api_types::reminder::{
    ReminderCompleted, ReminderCreated, ReminderKind, ReminderListQuery, ReminderNew,
    ReminderUpdate, ReminderView, RemindersResponse,
};

use crate::{ServerError, server::ServerState, transactions::rule_view};
use engine::{NewReminder, reminders, users};

fn map_kind(kind: ReminderKind) -> engine::ReminderKind {
    match kind {
        ReminderKind::Payment => engine::ReminderKind::Payment,
        ReminderKind::Bill => engine::ReminderKind::Bill,
        ReminderKind::General => engine::ReminderKind::General,
    }
}

fn map_rule(rule: RecurrenceRule) -> engine::RecurrenceRule {
    engine::RecurrenceRule {
        frequency: match rule.frequency {
            Frequency::Daily => engine::Frequency::Daily,
            Frequency::Weekly => engine::Frequency::Weekly,
            Frequency::Monthly => engine::Frequency::Monthly,
            Frequency::Yearly => engine::Frequency::Yearly,
        },
        interval: rule.interval,
        day_of_month: rule.day_of_month,
        end_date: rule.end_date,
    }
}

fn map_reminder(reminder: reminders::Model) -> ReminderView {
    let recurrence = rule_view(
        reminder.frequency.as_deref(),
        reminder.recurrence_interval,
        reminder.day_of_month,
        reminder.recurrence_end,
    );
    ReminderView {
        id: reminder.id,
        group_id: reminder.group_id,
        title: reminder.title,
        description: reminder.description,
        kind: match reminder.kind.as_str() {
            "payment" => ReminderKind::Payment,
            "bill" => ReminderKind::Bill,
            _ => ReminderKind::General,
        },
        due_at: reminder.due_at,
        amount_minor: reminder.amount_minor,
        recurrence,
        is_completed: reminder.is_completed,
    }
}

pub async fn create(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ReminderNew>,
) -> Result<(StatusCode, Json<ReminderCreated>), ServerError> {
    let id = state
        .engine
        .create_reminder(NewReminder {
            user_id: user.id,
            group_id: payload.group_id,
            title: payload.title,
            description: payload.description,
            kind: map_kind(payload.kind),
            due_at: payload.due_at,
            amount_minor: payload.amount_minor,
            recurrence: payload.recurrence.map(map_rule),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(ReminderCreated { id })))
}

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Query(query): Query<ReminderListQuery>,
) -> Result<Json<RemindersResponse>, ServerError> {
    let reminders = state
        .engine
        .list_reminders(
            &user.id,
            query.include_completed.unwrap_or(false),
            query.group_id.as_deref(),
        )
        .await?
        .into_iter()
        .map(map_reminder)
        .collect();
    Ok(Json(RemindersResponse { reminders }))
}

pub async fn update(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(reminder_id): Path<String>,
    Json(payload): Json<ReminderUpdate>,
) -> Result<Json<ReminderView>, ServerError> {
    let amount_minor = if payload.clear_amount.unwrap_or(false) {
        Some(None)
    } else {
        payload.amount_minor.map(Some)
    };
    let updated = state
        .engine
        .update_reminder(
            &reminder_id,
            &user.id,
            payload.title.as_deref(),
            payload.description.as_deref(),
            payload.due_at,
            amount_minor,
        )
        .await?;
    Ok(Json(map_reminder(updated)))
}

pub async fn remove(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(reminder_id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_reminder(&reminder_id, &user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn complete(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(reminder_id): Path<String>,
) -> Result<Json<ReminderCompleted>, ServerError> {
    let next_reminder_id = state
        .engine
        .complete_reminder(&reminder_id, &user.id, Utc::now())
        .await?;
    Ok(Json(ReminderCompleted { next_reminder_id }))
}
