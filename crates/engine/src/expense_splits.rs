//! Expense splits.
//!
//! One row per (group expense transaction, member): that member's obligated
//! share. The invariant the allocator guards is that the shares of a
//! transaction always sum to its exact amount in minor units.

use sea_orm::entity::prelude::*;

use crate::{EngineError, ResultEngine};

/// Divides `amount_minor` into `member_count` shares that sum exactly to the
/// amount.
///
/// Largest-remainder policy: every share gets the floored division and the
/// first `amount_minor % member_count` shares get one extra minor unit.
/// Callers pass members in a stable order (joined_at, then user id) so the
/// same request always produces the same allocation.
pub fn allocate_equal(amount_minor: i64, member_count: usize) -> ResultEngine<Vec<i64>> {
    if member_count == 0 {
        return Err(EngineError::InvalidSplitTarget(
            "group has no active members to split between".to_string(),
        ));
    }
    let count = member_count as i64;
    let base = amount_minor / count;
    let remainder = (amount_minor % count) as usize;
    Ok((0..member_count)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect())
}

/// Explicit shares must add up to the transaction amount, to the minor unit.
pub fn validate_share_sum(amount_minor: i64, shares: &[i64]) -> ResultEngine<()> {
    let got: i64 = shares.iter().sum();
    if got != amount_minor {
        return Err(EngineError::SplitSumMismatch {
            expected: amount_minor,
            got,
        });
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expense_splits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub transaction_id: String,
    pub user_id: String,
    pub amount_minor: i64,
    pub is_paid: bool,
    pub paid_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::transactions::Entity",
        from = "Column::TransactionId",
        to = "super::transactions::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Transactions,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_shares_sum_to_amount_for_any_member_count() {
        for count in 1..=50 {
            for amount in [1, 99, 100, 30_000, 12_345, 1_000_001] {
                let shares = allocate_equal(amount, count).unwrap();
                assert_eq!(shares.len(), count);
                assert_eq!(shares.iter().sum::<i64>(), amount, "{amount} / {count}");
            }
        }
    }

    #[test]
    fn remainder_goes_to_the_first_members() {
        assert_eq!(allocate_equal(100, 3).unwrap(), vec![34, 33, 33]);
        assert_eq!(allocate_equal(101, 3).unwrap(), vec![34, 34, 33]);
        assert_eq!(allocate_equal(30_000, 3).unwrap(), vec![10_000, 10_000, 10_000]);
    }

    #[test]
    fn zero_members_is_rejected() {
        assert!(allocate_equal(100, 0).is_err());
    }

    #[test]
    fn share_sum_validation() {
        assert!(validate_share_sum(300, &[100, 100, 100]).is_ok());
        let err = validate_share_sum(300, &[100, 100, 99]).unwrap_err();
        assert_eq!(
            err,
            EngineError::SplitSumMismatch {
                expected: 300,
                got: 299
            }
        );
    }
}
