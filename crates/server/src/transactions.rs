//! Transaction endpoints.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;

use api_types::recurrence::{Frequency, RecurrenceRule};
use api_types::transaction::{
    MonthlySummaryQuery, MonthlySummaryView, TransactionCreated, TransactionKind,
    TransactionListQuery, TransactionListResponse, TransactionNew, TransactionUpdate,
    TransactionView,
};

use crate::{ServerError, server::ServerState};
use engine::{NewTransaction, TransactionFilter, transactions, users};

fn map_kind(kind: TransactionKind) -> engine::TransactionKind {
    match kind {
        TransactionKind::Income => engine::TransactionKind::Income,
        TransactionKind::Expense => engine::TransactionKind::Expense,
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

pub(crate) fn rule_view(
    frequency: Option<&str>,
    interval: Option<i32>,
    day_of_month: Option<i32>,
    end_date: Option<chrono::NaiveDate>,
) -> Option<RecurrenceRule> {
    let frequency = match frequency {
        Some("daily") => Frequency::Daily,
        Some("weekly") => Frequency::Weekly,
        Some("monthly") => Frequency::Monthly,
        Some("yearly") => Frequency::Yearly,
        _ => return None,
    };
    Some(RecurrenceRule {
        frequency,
        interval: interval.unwrap_or(1).max(1) as u32,
        day_of_month: day_of_month.map(|d| d as u32),
        end_date,
    })
}

fn map_transaction(tx: transactions::Model) -> TransactionView {
    let recurrence = rule_view(
        tx.frequency.as_deref(),
        tx.recurrence_interval,
        tx.day_of_month,
        tx.recurrence_end,
    );
    TransactionView {
        id: tx.id,
        user_id: tx.user_id,
        group_id: tx.group_id,
        category_id: tx.category_id,
        kind: match tx.kind.as_str() {
            "income" => TransactionKind::Income,
            _ => TransactionKind::Expense,
        },
        amount_minor: tx.amount_minor,
        description: tx.description,
        occurred_on: tx.occurred_on,
        recurrence,
        is_deleted: tx.deleted_at.is_some(),
    }
}

pub async fn create(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionCreated>), ServerError> {
    let id = state
        .engine
        .create_transaction(NewTransaction {
            user_id: user.id,
            group_id: payload.group_id,
            category_id: payload.category_id,
            kind: map_kind(payload.kind),
            amount_minor: payload.amount_minor,
            description: payload.description,
            occurred_on: payload.occurred_on,
            recurrence: payload.recurrence.map(map_rule),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(TransactionCreated { id })))
}

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Query(query): Query<TransactionListQuery>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let transactions = state
        .engine
        .list_transactions(
            &user.id,
            TransactionFilter {
                group_id: query.group_id,
                kind: query.kind.map(map_kind),
                from: query.from,
                to: query.to,
                include_deleted: query.include_deleted.unwrap_or(false),
                limit: query.limit,
            },
        )
        .await?
        .into_iter()
        .map(map_transaction)
        .collect();
    Ok(Json(TransactionListResponse { transactions }))
}

pub async fn get(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state
        .engine
        .get_transaction(&transaction_id, &user.id)
        .await?;
    Ok(Json(map_transaction(tx)))
}

pub async fn update(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(transaction_id): Path<String>,
    Json(payload): Json<TransactionUpdate>,
) -> Result<Json<TransactionView>, ServerError> {
    let updated = state
        .engine
        .update_transaction(
            &transaction_id,
            &user.id,
            payload.amount_minor,
            payload.description.as_deref(),
            payload.occurred_on,
            payload.category_id.as_deref(),
        )
        .await?;
    Ok(Json(map_transaction(updated)))
}

pub async fn remove(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(transaction_id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .soft_delete_transaction(&transaction_id, &user.id, Utc::now())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn summary(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Query(query): Query<MonthlySummaryQuery>,
) -> Result<Json<MonthlySummaryView>, ServerError> {
    let summary = state
        .engine
        .monthly_summary(&user.id, query.year, query.month)
        .await?;
    Ok(Json(MonthlySummaryView {
        income_minor: summary.income_minor,
        expense_minor: summary.expense_minor,
        balance_minor: summary.balance_minor,
        transaction_count: summary.transaction_count,
    }))
}
