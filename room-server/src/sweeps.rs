use std::sync::Arc;

use room_core::{Resolution, StaleSweep, now_millis, resolve_timeout};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::room_manager::{ManagerError, RoomManager};

impl RoomManager {
    /// Penalise and advance every room whose current turn has run out.
    /// Returns how many rooms were updated.
    pub async fn sweep_timeouts(&self) -> usize {
        let room_ids = match self.store().list_room_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Failed to list rooms for timeout sweep: {}", e);
                return 0;
            }
        };

        let mut updated = 0;
        for room_id in room_ids {
            let result = self
                .transact(&room_id, |room| {
                    Ok(match resolve_timeout(room, now_millis()) {
                        Some(resolution) => (resolution, true),
                        None => (Resolution::default(), false),
                    })
                })
                .await;

            match result {
                Ok(committed) if committed.value => {
                    self.publish(&room_id, &committed).await;
                    updated += 1;
                }
                Ok(_) | Err(ManagerError::RoomNotFound(_)) => {}
                Err(e) => warn!(room_id = %room_id, "Timeout sweep failed: {}", e),
            }
        }
        updated
    }

    /// Evict idle anonymous players and delete rooms left empty.
    pub async fn sweep_stale(&self, sweep: &StaleSweep) -> usize {
        let room_ids = match self.store().list_room_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Failed to list rooms for stale sweep: {}", e);
                return 0;
            }
        };

        let mut updated = 0;
        for room_id in room_ids {
            match self
                .apply_sweep(&room_id, |room| sweep.sweep_room(room, now_millis()))
                .await
            {
                Ok(true) => updated += 1,
                Ok(false) | Err(ManagerError::RoomNotFound(_)) => {}
                Err(e) => warn!(room_id = %room_id, "Stale sweep failed: {}", e),
            }
        }
        updated
    }
}

/// Start the periodic timeout and stale-player sweeps.
pub fn spawn_sweeps(manager: Arc<RoomManager>, config: &Config) {
    let timeout_every = config.timeout_sweep_interval();
    let timeout_manager = manager.clone();
    tokio::spawn(async move {
        let mut ticker = interval(timeout_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let updated = timeout_manager.sweep_timeouts().await;
            if updated > 0 {
                info!(updated, "Timed out turns advanced");
            } else {
                debug!("Timeout sweep found nothing to do");
            }
        }
    });

    let stale_every = config.stale_sweep_interval();
    let sweep = StaleSweep::new(config.stale_idle_threshold());
    tokio::spawn(async move {
        let mut ticker = interval(stale_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let updated = manager.sweep_stale(&sweep).await;
            if updated > 0 {
                info!(updated, "Stale players evicted");
            }
        }
    });
}
