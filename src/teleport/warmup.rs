//! At most one pending warmup per player.
//!
//! Each entry is a [`ScheduledAction`]: the scheduler handle of the delayed
//! move plus the [`CancelPlan`] to settle if it gets pre-empted. Entries remove
//! themselves when they fire; [`WarmupRegistry::reconcile`] clears the rest.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, warn};

use super::cancel::CancelPlan;
use super::ports::Services;
use super::scheduler::{Executor, Job, TaskHandle};
use super::types::PlayerRef;

#[derive(Debug)]
pub struct ScheduledAction {
    id: u64,
    pub player: PlayerRef,
    pub delay: Duration,
    handle: TaskHandle,
    on_cancel: CancelPlan,
}

impl ScheduledAction {
    pub fn is_live(&self) -> bool {
        self.handle.is_live()
    }
}

type Entries = Arc<Mutex<HashMap<PlayerRef, ScheduledAction>>>;

fn lock(entries: &Entries) -> MutexGuard<'_, HashMap<PlayerRef, ScheduledAction>> {
    entries.lock().unwrap_or_else(|e| e.into_inner())
}

pub struct WarmupRegistry {
    services: Services,
    entries: Entries,
    next_id: AtomicU64,
}

impl WarmupRegistry {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            entries: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Schedule `work` on the main executor after `delay`, replacing any
    /// warmup already pending for `player`. The replaced one is cancelled
    /// before the new one is installed, and its plan is settled.
    pub fn schedule(&self, player: PlayerRef, delay: Duration, work: Job, on_cancel: CancelPlan) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let entries = Arc::clone(&self.entries);
        let job: Job = Box::new(move || {
            {
                let mut map = lock(&entries);
                if map.get(&player).map(|a| a.id) == Some(id) {
                    map.remove(&player);
                }
            }
            work();
        });

        let displaced = {
            let mut map = lock(&self.entries);
            let displaced = map
                .remove(&player)
                .filter(|old| old.handle.cancel());
            let handle = self
                .services
                .scheduler
                .schedule_once(Executor::Main, delay, job);
            map.insert(
                player,
                ScheduledAction {
                    id,
                    player,
                    delay,
                    handle,
                    on_cancel,
                },
            );
            displaced
        };

        if let Some(old) = displaced {
            debug!("warmup for {} superseded by a new one", player);
            old.on_cancel.settle(&self.services);
        }
    }

    /// Cancel and drop the pending warmup without settling it. Returns whether
    /// a live one existed.
    pub fn cancel(&self, player: &PlayerRef) -> bool {
        self.take(player).is_some()
    }

    /// Cancel the pending warmup and settle its plan (refund + notice).
    pub fn interrupt(&self, player: &PlayerRef) -> bool {
        match self.take(player) {
            Some(action) => {
                action.on_cancel.settle(&self.services);
                true
            }
            None => false,
        }
    }

    /// Drop entries whose task already fired or can no longer fire.
    ///
    /// A task cancelled outside this registry (its executor went away) never
    /// ran, so its plan is settled here. Returns how many entries were dropped.
    pub fn reconcile(&self) -> usize {
        let dead: Vec<ScheduledAction> = {
            let mut map = lock(&self.entries);
            let keys: Vec<PlayerRef> = map
                .iter()
                .filter(|(_, action)| !action.is_live())
                .map(|(k, _)| *k)
                .collect();
            keys.iter().filter_map(|k| map.remove(k)).collect()
        };
        let count = dead.len();
        for action in dead {
            if action.handle.is_cancelled() {
                warn!("warmup for {} was abandoned by the scheduler", action.player);
                action.on_cancel.settle(&self.services);
            }
        }
        count
    }

    pub fn is_warming_up(&self, player: &PlayerRef) -> bool {
        lock(&self.entries)
            .get(player)
            .map(ScheduledAction::is_live)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take(&self, player: &PlayerRef) -> Option<ScheduledAction> {
        let removed = lock(&self.entries).remove(player)?;
        if removed.handle.cancel() {
            Some(removed)
        } else {
            None
        }
    }
}
