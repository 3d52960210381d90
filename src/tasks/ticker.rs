//! One-second ticker background task

use std::{sync::Arc, time::Duration};
use tokio::time::interval;
use tracing::{info, warn};

use crate::state::AppState;

/// Background task that advances the work timer once per second.
///
/// Runs independently of the coordinator so pending network calls or
/// confirmations never stall the displayed time.
pub async fn ticker_task(state: Arc<AppState>) {
    info!("Starting timer ticker task");

    let mut interval = interval(Duration::from_secs(1));
    // The first tick completes immediately
    interval.tick().await;

    loop {
        interval.tick().await;

        if let Err(e) = state.tick() {
            warn!("Failed to advance timer: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Settings, services::PromptBoard};

    #[tokio::test(start_paused = true)]
    async fn counts_seconds_only_while_running() {
        let state = Arc::new(AppState::new(
            Settings::Unconfigured { reason: "test".to_string() },
            Arc::new(PromptBoard::new()),
            0,
            "127.0.0.1".to_string(),
        ));
        let handle = tokio::spawn(ticker_task(Arc::clone(&state)));

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(state.get_timer_snapshot().unwrap().elapsed_seconds, 0);

        state.update_timer("start", |timer| timer.start()).unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(state.get_timer_snapshot().unwrap().elapsed_seconds, 5);

        state.update_timer("pause", |timer| timer.pause()).unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(state.get_timer_snapshot().unwrap().elapsed_seconds, 5);

        handle.abort();
    }
}
