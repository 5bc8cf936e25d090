use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Eur,
    Usd,
    Gbp,
    Chf,
    Cad,
    Xaf,
    Xof,
}

impl Currency {
    /// Returns the canonical code used by the engine/database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eur => "EUR",
            Self::Usd => "USD",
            Self::Gbp => "GBP",
            Self::Chf => "CHF",
            Self::Cad => "CAD",
            Self::Xaf => "XAF",
            Self::Xof => "XOF",
        }
    }
}

/// Shared recurrence description for reminders and recurring transactions.
pub mod recurrence {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Frequency {
        Daily,
        Weekly,
        Monthly,
        Yearly,
    }

    impl Frequency {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Daily => "daily",
                Self::Weekly => "weekly",
                Self::Monthly => "monthly",
                Self::Yearly => "yearly",
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct RecurrenceRule {
        pub frequency: Frequency,
        pub interval: u32,
        pub day_of_month: Option<u32>,
        pub end_date: Option<NaiveDate>,
    }
}

pub mod user {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RegisterUser {
        pub email: String,
        pub password: String,
        pub full_name: String,
        pub preferred_currency: Option<Currency>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserCreated {
        pub id: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserView {
        pub id: String,
        pub email: String,
        pub full_name: String,
        pub preferred_currency: String,
        pub is_verified: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProfileUpdate {
        pub full_name: Option<String>,
        pub preferred_currency: Option<Currency>,
    }
}

pub mod group {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupNew {
        pub name: String,
        pub description: Option<String>,
        pub currency: Option<Currency>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupCreated {
        pub id: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupUpdate {
        pub name: Option<String>,
        pub description: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupView {
        pub id: String,
        pub name: String,
        pub description: Option<String>,
        pub owner_id: String,
        pub currency: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupSummary {
        pub id: String,
        pub name: String,
        pub currency: String,
        pub role: super::membership::MemberRole,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupListResponse {
        pub groups: Vec<GroupSummary>,
    }
}

pub mod membership {
    use super::*;

    /// Role of a user in a group.
    ///
    /// - `admin`: manages members, roles and group settings.
    /// - `member`: records transactions and sees balances.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum MemberRole {
        Admin,
        Member,
    }

    impl MemberRole {
        /// Returns the canonical role string used by the engine/database.
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Admin => "admin",
                Self::Member => "member",
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum MemberStatus {
        Pending,
        Active,
        Left,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberView {
        pub user_id: String,
        pub email: String,
        pub full_name: String,
        pub role: MemberRole,
        pub status: MemberStatus,
        pub joined_at: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MembersResponse {
        pub members: Vec<MemberView>,
    }

    /// Request body for changing a member's role.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct RoleUpdate {
        pub role: MemberRole,
    }
}

pub mod invitation {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InviteNew {
        pub email: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvitationCreated {
        pub invitation_id: String,
        pub token: String,
        pub expires_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvitationView {
        pub id: String,
        pub email: String,
        pub status: String,
        pub expires_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvitationsResponse {
        pub invitations: Vec<InvitationView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AcceptInvitation {
        pub token: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvitationAccepted {
        pub group_id: String,
    }
}

pub mod category {
    use super::*;

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
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryNew {
        pub name: String,
        pub kind: CategoryKind,
        pub icon: Option<String>,
        pub color: Option<String>,
        pub budget_minor: Option<i64>,
        pub alert_threshold: Option<i32>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryCreated {
        pub id: String,
    }

    /// `clear_budget: true` removes the budget; otherwise `budget_minor` is
    /// applied when present.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryUpdate {
        pub name: Option<String>,
        pub budget_minor: Option<i64>,
        pub clear_budget: Option<bool>,
        pub alert_threshold: Option<i32>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryView {
        pub id: String,
        pub name: String,
        pub kind: String,
        pub icon: String,
        pub color: String,
        pub budget_minor: Option<i64>,
        pub alert_threshold: i32,
        pub is_system: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryListResponse {
        pub categories: Vec<CategoryView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetStatusQuery {
        pub year: Option<i32>,
        pub month: Option<u32>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetStatusView {
        pub budget_minor: i64,
        pub spent_minor: i64,
        pub remaining_minor: i64,
        pub percentage: f64,
        pub is_over_budget: bool,
        pub is_alert: bool,
        pub alert_threshold: i32,
    }

    /// Budget status endpoint response; `status` is absent when the
    /// category tracks no budget.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetStatusResponse {
        pub category_id: String,
        pub status: Option<BudgetStatusView>,
    }
}

pub mod transaction {
    use super::*;
    use super::recurrence::RecurrenceRule;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Income,
        Expense,
    }

    impl TransactionKind {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Income => "income",
                Self::Expense => "expense",
            }
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub group_id: Option<String>,
        pub category_id: String,
        pub kind: TransactionKind,
        pub amount_minor: i64,
        pub description: Option<String>,
        pub occurred_on: NaiveDate,
        pub recurrence: Option<RecurrenceRule>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionCreated {
        pub id: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionUpdate {
        pub amount_minor: Option<i64>,
        pub description: Option<String>,
        pub occurred_on: Option<NaiveDate>,
        pub category_id: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: String,
        pub user_id: String,
        pub group_id: Option<String>,
        pub category_id: String,
        pub kind: TransactionKind,
        pub amount_minor: i64,
        pub description: Option<String>,
        pub occurred_on: NaiveDate,
        pub recurrence: Option<RecurrenceRule>,
        pub is_deleted: bool,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionListQuery {
        pub group_id: Option<String>,
        pub kind: Option<TransactionKind>,
        pub from: Option<NaiveDate>,
        pub to: Option<NaiveDate>,
        pub include_deleted: Option<bool>,
        pub limit: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MonthlySummaryQuery {
        pub year: i32,
        pub month: u32,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MonthlySummaryView {
        pub income_minor: i64,
        pub expense_minor: i64,
        pub balance_minor: i64,
        pub transaction_count: u64,
    }
}

pub mod split {
    use super::*;

    /// Request body for (re)computing a transaction's splits. Either
    /// `equal_split: true` or an explicit `shares` list.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct SplitRequest {
        pub equal_split: Option<bool>,
        pub shares: Option<Vec<ShareNew>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ShareNew {
        pub user_id: String,
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SplitView {
        pub id: String,
        pub transaction_id: String,
        pub user_id: String,
        pub amount_minor: i64,
        pub is_paid: bool,
        pub paid_at: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SplitsResponse {
        pub splits: Vec<SplitView>,
    }
}

pub mod balance {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupBalanceSummary {
        pub income_minor: i64,
        pub expense_minor: i64,
        pub balance_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberBalanceView {
        pub user_id: String,
        pub email: String,
        pub full_name: String,
        pub total_paid_minor: i64,
        pub total_owed_minor: i64,
        pub balance_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupBalanceResponse {
        pub group_id: String,
        pub currency: String,
        pub summary: GroupBalanceSummary,
        pub members: Vec<MemberBalanceView>,
    }
}

pub mod reminder {
    use super::*;
    use super::recurrence::RecurrenceRule;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ReminderKind {
        Payment,
        Bill,
        General,
    }

    impl ReminderKind {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Payment => "payment",
                Self::Bill => "bill",
                Self::General => "general",
            }
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReminderNew {
        pub group_id: Option<String>,
        pub title: String,
        pub description: Option<String>,
        pub kind: ReminderKind,
        pub due_at: DateTime<Utc>,
        pub amount_minor: Option<i64>,
        pub recurrence: Option<RecurrenceRule>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReminderCreated {
        pub id: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReminderUpdate {
        pub title: Option<String>,
        pub description: Option<String>,
        pub due_at: Option<DateTime<Utc>>,
        pub amount_minor: Option<i64>,
        pub clear_amount: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReminderView {
        pub id: String,
        pub group_id: Option<String>,
        pub title: String,
        pub description: Option<String>,
        pub kind: ReminderKind,
        pub due_at: DateTime<Utc>,
        pub amount_minor: Option<i64>,
        pub recurrence: Option<RecurrenceRule>,
        pub is_completed: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RemindersResponse {
        pub reminders: Vec<ReminderView>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ReminderListQuery {
        pub group_id: Option<String>,
        pub include_completed: Option<bool>,
    }

    /// Response of completing a reminder; a recurring one reports the
    /// spawned follow-up.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReminderCompleted {
        pub next_reminder_id: Option<String>,
    }
}
