//! In-crate fakes for unit tests that need a `Services` bundle.

use std::sync::{Arc, Mutex};

use super::ports::{Economy, Messenger, PermissionOracle, PlayerDirectory, Services, UserPreferences};
use super::scheduler::Scheduler;
use super::types::{Location, MessageKey, Money, Notice, PlayerRef, Position};

/// Records deposits and notices; every withdrawal succeeds.
#[derive(Default)]
pub(crate) struct Ledger {
    deposits: Mutex<Vec<(PlayerRef, u64)>>,
    notices: Mutex<Vec<(PlayerRef, MessageKey)>>,
}

impl Ledger {
    pub(crate) fn deposits(&self) -> Vec<(PlayerRef, u64)> {
        self.deposits.lock().unwrap().clone()
    }

    pub(crate) fn notices(&self, player: &PlayerRef) -> Vec<MessageKey> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == player)
            .map(|(_, k)| *k)
            .collect()
    }
}

impl Economy for Ledger {
    fn withdraw(&self, _player: &PlayerRef, _amount: Money) -> bool {
        true
    }
    fn deposit(&self, player: &PlayerRef, amount: Money) -> bool {
        self.deposits.lock().unwrap().push((*player, amount.0));
        true
    }
    fn format(&self, amount: Money) -> String {
        amount.0.to_string()
    }
}

impl Messenger for Ledger {
    fn send(&self, recipient: &PlayerRef, notice: Notice) {
        self.notices.lock().unwrap().push((*recipient, notice.key));
    }
}

/// Nobody is online and everything is allowed.
struct EmptyWorld;

impl PlayerDirectory for EmptyWorld {
    fn is_online(&self, _player: &PlayerRef) -> bool {
        false
    }
    fn current_position(&self, _player: &PlayerRef) -> Option<Position> {
        None
    }
    fn move_player(&self, _player: &PlayerRef, _position: &Position) {}
    fn find_safe_location(&self, near: &Location) -> Option<Location> {
        Some(near.clone())
    }
    fn online_players(&self) -> Vec<PlayerRef> {
        Vec::new()
    }
}

impl PermissionOracle for EmptyWorld {
    fn has_permission(&self, _source: &PlayerRef, _key: &str) -> bool {
        false
    }
}

impl UserPreferences for EmptyWorld {
    fn teleport_enabled(&self, _player: &PlayerRef) -> bool {
        true
    }
}

pub(crate) fn fake_services(scheduler: Arc<dyn Scheduler>) -> (Services, Arc<Ledger>) {
    let ledger = Arc::new(Ledger::default());
    let world = Arc::new(EmptyWorld);
    let services = Services {
        scheduler,
        economy: ledger.clone(),
        players: world.clone(),
        permissions: world.clone(),
        preferences: world,
        messenger: ledger.clone(),
    };
    (services, ledger)
}
