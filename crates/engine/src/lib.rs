//! Core library of the tontina shared-finance backend.
//!
//! The [`Engine`] owns the database connection and exposes every domain
//! operation: accounts, groups and memberships, categories with monthly
//! budgets, transactions, expense splits and reminders. Each mutating
//! operation runs inside a single database transaction, so cross-entity
//! invariants (split sums, last-admin protection, owner membership) hold in
//! every committed state.
//!
//! The pure pieces — [`RecurrenceRule`], [`BudgetStatus`],
//! [`expense_splits::allocate_equal`] and the validation functions — take no
//! connection and are unit-tested on their own.

pub use categories::{BudgetStatus, CategoryKind};
pub use currency::Currency;
pub use error::EngineError;
pub use group_members::{MemberRole, MemberStatus};
pub use invitations::InvitationStatus;
pub use ops::{
    BudgetAlert, DueReminder, Engine, EngineBuilder, GroupBalance, InvitationOutcome,
    MemberBalance, MonthlySummary, NewCategory, NewReminder, NewTransaction, ShareInput,
    SplitMode, TransactionFilter,
};
pub use recurrence::{Frequency, RecurrenceRule};
pub use reminders::ReminderKind;
pub use transactions::TransactionKind;

pub mod categories;
pub mod expense_splits;
pub mod group_members;
pub mod groups;
pub mod invitations;
pub mod reminders;
pub mod transactions;
pub mod users;

mod currency;
mod error;
mod ops;
mod recurrence;

type ResultEngine<T> = Result<T, EngineError>;
