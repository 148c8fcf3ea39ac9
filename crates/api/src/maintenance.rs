//! Background maintenance: sweeping carts that have been idle too long.

use std::time::Duration;

use domain::CartService;
use store::Store;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Runs one sweep, logging rather than propagating failures.
pub async fn sweep_once<S: Store>(carts: &CartService<S>, stale_after: chrono::Duration) -> u64 {
    match carts.sweep_stale_carts(stale_after).await {
        Ok(swept) => swept,
        Err(err) => {
            tracing::error!(error = %err, "stale cart sweep failed");
            0
        }
    }
}

/// Spawns a task sweeping stale carts every `every`, starting immediately.
pub fn spawn_cart_sweeper<S: Store>(
    carts: CartService<S>,
    every: Duration,
    stale_after: chrono::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            tracing::info!("running daily maintenance");
            sweep_once(&carts, stale_after).await;
        }
    })
}
