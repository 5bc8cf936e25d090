use chrono::Utc;
use uuid::Uuid;

use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*};

use crate::{Currency, EngineError, ResultEngine, users};

use super::{Engine, normalize_email, normalize_required_name, with_tx};

impl Engine {
    /// Registers a new account. The email is unique across the system.
    pub async fn register_user(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        preferred_currency: Option<Currency>,
    ) -> ResultEngine<String> {
        let email = normalize_email(email)?;
        let full_name = normalize_required_name(full_name, "user")?;
        if password.is_empty() {
            return Err(EngineError::InvalidValue(
                "password must not be empty".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let existing = users::Entity::find()
                .filter(users::Column::Email.eq(email.clone()))
                .one(&db_tx)
                .await?;
            if existing.is_some() {
                return Err(EngineError::ExistingKey(email));
            }

            let id = Uuid::new_v4().to_string();
            let active = users::ActiveModel {
                id: ActiveValue::Set(id.clone()),
                email: ActiveValue::Set(email),
                password: ActiveValue::Set(password.to_string()),
                full_name: ActiveValue::Set(full_name),
                preferred_currency: ActiveValue::Set(
                    preferred_currency.unwrap_or_default().code().to_string(),
                ),
                is_verified: ActiveValue::Set(false),
                is_active: ActiveValue::Set(true),
                created_at: ActiveValue::Set(Utc::now()),
            };
            active.insert(&db_tx).await?;
            Ok(id)
        })
    }

    /// Marks an account as verified. The verification challenge itself is
    /// delivered by an external collaborator.
    pub async fn verify_user(&self, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let user = self.require_active_user(&db_tx, user_id).await?;
            if user.is_verified {
                return Err(EngineError::StateConflict(
                    "user is already verified".to_string(),
                ));
            }
            let mut active: users::ActiveModel = user.into();
            active.is_verified = ActiveValue::Set(true);
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        full_name: Option<&str>,
        preferred_currency: Option<Currency>,
    ) -> ResultEngine<users::Model> {
        with_tx!(self, |db_tx| {
            let user = self.require_active_user(&db_tx, user_id).await?;
            let mut active: users::ActiveModel = user.into();
            if let Some(name) = full_name {
                active.full_name = ActiveValue::Set(normalize_required_name(name, "user")?);
            }
            if let Some(currency) = preferred_currency {
                active.preferred_currency = ActiveValue::Set(currency.code().to_string());
            }
            let updated = active.update(&db_tx).await?;
            Ok(updated)
        })
    }

    /// Deactivates an account. The row is kept so memberships and splits
    /// remain auditable.
    pub async fn deactivate_user(&self, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let user = self.require_active_user(&db_tx, user_id).await?;
            let mut active: users::ActiveModel = user.into();
            active.is_active = ActiveValue::Set(false);
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    pub async fn user_profile(&self, user_id: &str) -> ResultEngine<users::Model> {
        with_tx!(self, |db_tx| self.require_active_user(&db_tx, user_id).await)
    }
}
