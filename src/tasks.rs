use crate::state::AppState;
use std::time::Duration;
use tracing::info;

const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub fn start_background_tasks(state: AppState) {
    // Progress record eviction
    let ttl = Duration::from_secs(state.settings.progress_ttl_secs);
    let period = sweep_interval(ttl);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let evicted = state.progress.evict_expired(ttl);
            if evicted > 0 {
                info!(
                    "Evicted {} finished progress records ({} remaining).",
                    evicted,
                    state.progress.len()
                );
            }
        }
    });
}

fn sweep_interval(ttl: Duration) -> Duration {
    ttl.clamp(Duration::from_secs(1), MAX_SWEEP_INTERVAL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_interval() {
        assert_eq!(sweep_interval(Duration::ZERO), Duration::from_secs(1));
        assert_eq!(sweep_interval(Duration::from_secs(5)), Duration::from_secs(5));
        assert_eq!(sweep_interval(Duration::from_secs(3600)), MAX_SWEEP_INTERVAL);
    }
}
