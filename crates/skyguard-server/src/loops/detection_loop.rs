//! Detection loop.
//!
//! Waits for new snapshots and runs one cycle per snapshot on the blocking
//! pool. Only the newest snapshot matters: a cycle still running when the
//! next snapshot arrives is cancelled and its output discarded.

use std::sync::Arc;

use skyguard_core::{CycleCache, CycleError, CycleGuard, Snapshot};

use crate::state::AppState;

/// Start the detection loop.
pub async fn run_detection_loop(state: Arc<AppState>) {
    let mut rx = state.subscribe_snapshots();
    let mut cache = CycleCache::new();

    loop {
        if rx.changed().await.is_err() {
            tracing::info!("Snapshot channel closed, stopping detection loop");
            break;
        }
        let Some(snapshot) = rx.borrow_and_update().clone() else {
            continue;
        };
        cache = process_snapshot(&state, snapshot, cache).await;
    }
}

/// Run one cycle and publish its report. Returns the cache for the next cycle.
pub async fn process_snapshot(
    state: &Arc<AppState>,
    snapshot: Arc<Snapshot>,
    cache: CycleCache,
) -> CycleCache {
    let sequence = snapshot.sequence();
    let engine = state.engine();
    let guard = CycleGuard::new(state.begin_cycle(sequence)).with_budget(engine.budget_for(&snapshot));

    let joined = tokio::task::spawn_blocking(move || {
        let mut cache = cache;
        let outcome = engine.run_cycle(&snapshot, &mut cache, &guard);
        (outcome, cache)
    })
    .await;

    match joined {
        Ok((Ok(report), cache)) => {
            let conflicts = report.conflicts.len();
            if state.publish_report(report) && conflicts > 0 {
                tracing::warn!(sequence, "Detected {} conflict(s)", conflicts);
            }
            cache
        }
        Ok((Err(CycleError::Superseded { .. }), cache)) => {
            tracing::debug!(sequence, "Cycle superseded by newer snapshot");
            cache
        }
        Ok((Err(e), mut cache)) => {
            tracing::warn!(sequence, "Cycle abandoned: {}", e);
            cache.invalidate();
            cache
        }
        Err(e) => {
            tracing::error!(sequence, "Detection task failed: {}", e);
            CycleCache::new()
        }
    }
}
