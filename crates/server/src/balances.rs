//! Group balance endpoint.

use axum::{
    Extension, Json,
    extract::{Path, State},
};

use api_types::balance::{GroupBalanceResponse, GroupBalanceSummary, MemberBalanceView};

use crate::{ServerError, server::ServerState};
use engine::users;

pub async fn group_balance(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
) -> Result<Json<GroupBalanceResponse>, ServerError> {
    let group = state.engine.group_for_member(&group_id, &user.id).await?;
    let summary = state.engine.group_balance(&group_id, &user.id).await?;
    let members = state
        .engine
        .member_balances(&group_id, &user.id)
        .await?
        .into_iter()
        .map(|balance| MemberBalanceView {
            user_id: balance.user_id,
            email: balance.email,
            full_name: balance.full_name,
            total_paid_minor: balance.total_paid_minor,
            total_owed_minor: balance.total_owed_minor,
            balance_minor: balance.balance_minor,
        })
        .collect();

    Ok(Json(GroupBalanceResponse {
        group_id: group.id,
        currency: group.currency,
        summary: GroupBalanceSummary {
            income_minor: summary.income_minor,
            expense_minor: summary.expense_minor,
            balance_minor: summary.balance_minor,
        },
        members,
    }))
}
