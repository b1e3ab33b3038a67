//! Per-player teleport cooldown.
//!
//! Records when each player last completed a teleport and reports how long
//! they still have to wait. A zero period disables the check entirely.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use super::types::PlayerRef;

#[derive(Debug)]
pub struct CooldownTracker {
    period: Duration,
    last_teleport: Mutex<HashMap<PlayerRef, Instant>>,
}

impl CooldownTracker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_teleport: Mutex::new(HashMap::new()),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Time left before `player` may teleport again, `None` if they may now.
    pub fn remaining(&self, player: &PlayerRef) -> Option<Duration> {
        if self.period.is_zero() {
            return None;
        }
        let map = self.last_teleport.lock().unwrap_or_else(|e| e.into_inner());
        let last = map.get(player)?;
        let elapsed = last.elapsed();
        if elapsed >= self.period {
            None
        } else {
            Some(self.period - elapsed)
        }
    }

    pub fn record(&self, player: &PlayerRef) {
        if self.period.is_zero() {
            return;
        }
        let mut map = self.last_teleport.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(*player, Instant::now());
        // Entries past their period carry no information; keep the map small.
        let period = self.period;
        map.retain(|_, at| at.elapsed() < period);
    }

    pub fn forget(&self, player: &PlayerRef) {
        let mut map = self.last_teleport.lock().unwrap_or_else(|e| e.into_inner());
        map.remove(player);
    }
}
