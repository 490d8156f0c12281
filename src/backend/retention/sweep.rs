/**
 * Retention Sweep
 *
 * Messages live for a limited time (24 hours by default). The sweep deletes
 * expired messages oldest first, in batches, together with their blobs.
 *
 * # Batch Loop
 *
 * 1. Select up to `batch_size` messages created before the cutoff
 * 2. Delete the rows, then their blobs
 * 3. Stop when a batch comes back short or empty
 *
 * Blob failures are counted and logged; they never abort the sweep.
 */

use chrono::{DateTime, Utc};

use crate::backend::error::BackendError;
use crate::backend::messaging::db as message_db;
use crate::backend::server::clock::to_millis;
use crate::backend::server::state::AppState;
use crate::shared::RealtimeEvent;

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub messages_deleted: u64,
    pub blobs_deleted: u64,
    pub blob_failures: u64,
    pub batches: u32,
}

/// Delete every message older than the configured TTL, as of `now`
pub async fn clear_old_messages(
    state: &AppState,
    now: DateTime<Utc>,
) -> Result<SweepReport, BackendError> {
    let retention = &state.config.retention;
    let ttl = chrono::Duration::from_std(retention.ttl())
        .map_err(|e| BackendError::internal(format!("retention TTL out of range: {}", e)))?;
    let cutoff = now
        .checked_sub_signed(ttl)
        .map(to_millis)
        .ok_or_else(|| BackendError::internal("retention TTL out of range"))?;
    let batch_size = retention.batch_size.max(1);

    let mut report = SweepReport::default();
    loop {
        let batch = message_db::expired_messages(&state.pool, cutoff, batch_size).await?;
        if batch.is_empty() {
            break;
        }
        report.batches += 1;

        let ids: Vec<_> = batch.iter().map(|m| m.id).collect();
        report.messages_deleted += message_db::delete_messages(&state.pool, &ids).await?;

        for expired in &batch {
            state
                .broadcast
                .publish(RealtimeEvent::message_deleted(expired.conversation_id, expired.id));

            let Some(storage_id) = expired.storage_id else {
                continue;
            };
            match state.blobs.delete(storage_id).await {
                Ok(true) => report.blobs_deleted += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(storage_id = %storage_id, error = %e, "[Retention] failed to delete blob");
                    report.blob_failures += 1;
                }
            }
        }

        if batch.len() < batch_size as usize {
            break;
        }
    }

    Ok(report)
}

/// Run the sweep forever on the configured interval
pub async fn run_periodic(state: AppState) {
    let mut interval = tokio::time::interval(state.config.retention.interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        match clear_old_messages(&state, Utc::now()).await {
            Ok(report) if report.messages_deleted > 0 => {
                tracing::info!(
                    messages = report.messages_deleted,
                    blobs = report.blobs_deleted,
                    blob_failures = report.blob_failures,
                    batches = report.batches,
                    "[Retention] expired messages removed"
                );
            }
            Ok(_) => tracing::debug!("[Retention] nothing to remove"),
            Err(e) => tracing::error!("[Retention] sweep failed: {}", e),
        }
    }
}
