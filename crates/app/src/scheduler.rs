//! Periodic trigger task.
//!
//! The engine exposes idempotent entry points (budget checks, recurring
//! rolls, due-reminder collection); this task is the time-based invoker that
//! calls them on an interval. Payloads are logged as structured JSON for the
//! delivery collaborator to pick up.

use std::sync::Arc;

use chrono::Utc;
use engine::Engine;

use crate::settings::Scheduler;

pub async fn run(engine: Arc<Engine>, settings: Scheduler) {
    let period = std::time::Duration::from_secs(settings.interval_minutes * 60);
    let mut ticker = tokio::time::interval(period);

    loop {
        ticker.tick().await;
        let now = Utc::now();

        match engine.check_all_budgets(now).await {
            Ok(alerts) => {
                for alert in &alerts {
                    match serde_json::to_string(alert) {
                        Ok(payload) => tracing::info!(target: "notifications", "budget_alert {payload}"),
                        Err(err) => tracing::error!("failed to serialize budget alert: {err}"),
                    }
                }
                if !alerts.is_empty() {
                    tracing::info!("budget check raised {} alert(s)", alerts.len());
                }
            }
            Err(err) => tracing::error!("budget check failed: {err}"),
        }

        match engine.roll_recurring_transactions(now).await {
            Ok(created) if !created.is_empty() => {
                tracing::info!("rolled {} recurring transaction(s)", created.len());
            }
            Ok(_) => {}
            Err(err) => tracing::error!("recurring transaction roll failed: {err}"),
        }

        match engine
            .due_reminders(now, settings.reminder_window_minutes)
            .await
        {
            Ok(due) => {
                for reminder in due {
                    match serde_json::to_string(&reminder) {
                        Ok(payload) => {
                            tracing::info!(target: "notifications", "reminder_due {payload}");
                            if let Err(err) = engine
                                .mark_notification_sent(&reminder.reminder_id, now)
                                .await
                            {
                                tracing::error!("failed to mark reminder notified: {err}");
                            }
                        }
                        Err(err) => tracing::error!("failed to serialize reminder: {err}"),
                    }
                }
            }
            Err(err) => tracing::error!("due-reminder collection failed: {err}"),
        }
    }
}
