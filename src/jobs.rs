use std::time::Duration;

use sqlx::PgPool;
use tracing::{error, info};

use crate::state::AppState;

/// Spawns the background task that opens and closes offer windows.
///
/// Offers are stored inactive; this task flips `active_offer` so the flag
/// holds exactly when now falls inside the stored window. A failed tick is
/// logged and retried on the next interval.
pub fn spawn_offer_sweep(state: AppState) {
    let period = Duration::from_secs(state.config.offer_sweep_seconds);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            if let Err(e) = sweep_offers(&state.db).await {
                error!(error = %e, "offer sweep failed");
            }
        }
    });
}

async fn sweep_offers(db: &PgPool) -> anyhow::Result<()> {
    let activated = sqlx::query(
        r#"
        UPDATE products SET active_offer = TRUE, updated_at = now()
        WHERE active_offer = FALSE
          AND start_offer_date <= now()
          AND end_offer_date >= now()
        "#,
    )
    .execute(db)
    .await?
    .rows_affected();

    let deactivated = sqlx::query(
        r#"
        UPDATE products SET active_offer = FALSE, updated_at = now()
        WHERE active_offer = TRUE
          AND end_offer_date < now()
        "#,
    )
    .execute(db)
    .await?
    .rows_affected();

    if activated > 0 || deactivated > 0 {
        info!(activated, deactivated, "offer sweep applied");
    }
    Ok(())
}
