//! Reminders table.
//!
//! Completing a recurring reminder never advances the row in place: a fresh
//! row is spawned for the next occurrence and the old one stays completed.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::EngineError;

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

impl TryFrom<&str> for ReminderKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "payment" => Ok(Self::Payment),
            "bill" => Ok(Self::Bill),
            "general" => Ok(Self::General),
            other => Err(EngineError::InvalidValue(format!(
                "invalid reminder kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "reminders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub group_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub kind: String,
    pub due_at: DateTimeUtc,
    pub amount_minor: Option<i64>,
    pub frequency: Option<String>,
    pub recurrence_interval: Option<i32>,
    pub day_of_month: Option<i32>,
    pub recurrence_end: Option<Date>,
    pub is_completed: bool,
    pub completed_at: Option<DateTimeUtc>,
    pub notification_sent: bool,
    pub notification_sent_at: Option<DateTimeUtc>,
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
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Groups,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
