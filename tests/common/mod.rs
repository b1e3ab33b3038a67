//! Test utilities & fixtures.
//! Recording fakes for every host port plus a `World` that wires them into a
//! `TeleportHandler`. Must be built inside a tokio runtime (the scheduler
//! spawns its main executor there).
#![allow(dead_code)] // each test binary uses a different subset

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use uuid::Uuid;
use waypoint::config::TeleportConfig;
use waypoint::teleport::{
    Economy, Executor, Job, Location, MessageKey, Messenger, Money, Notice, PermissionOracle,
    PlayerDirectory, PlayerRef, Position, Rotation, Scheduler, Services, TaskHandle,
    TeleportHandler, TokioScheduler, UserPreferences,
};

#[derive(Default)]
pub struct FakeEconomy {
    balances: Mutex<HashMap<PlayerRef, u64>>,
    pub withdrawals: Mutex<Vec<(PlayerRef, u64)>>,
    pub deposits: Mutex<Vec<(PlayerRef, u64)>>,
}

impl FakeEconomy {
    pub fn set_balance(&self, player: PlayerRef, amount: u64) {
        self.balances.lock().unwrap().insert(player, amount);
    }
    pub fn balance(&self, player: &PlayerRef) -> u64 {
        *self.balances.lock().unwrap().get(player).unwrap_or(&0)
    }
    pub fn withdraw_count(&self) -> usize {
        self.withdrawals.lock().unwrap().len()
    }
    pub fn deposit_count(&self) -> usize {
        self.deposits.lock().unwrap().len()
    }
    pub fn calls(&self) -> usize {
        self.withdraw_count() + self.deposit_count()
    }
}

impl Economy for FakeEconomy {
    fn withdraw(&self, player: &PlayerRef, amount: Money) -> bool {
        self.withdrawals.lock().unwrap().push((*player, amount.0));
        let mut balances = self.balances.lock().unwrap();
        let balance = balances.entry(*player).or_insert(0);
        if *balance < amount.0 {
            return false;
        }
        *balance -= amount.0;
        true
    }

    fn deposit(&self, player: &PlayerRef, amount: Money) -> bool {
        self.deposits.lock().unwrap().push((*player, amount.0));
        *self.balances.lock().unwrap().entry(*player).or_insert(0) += amount.0;
        true
    }

    fn format(&self, amount: Money) -> String {
        format!("${}", amount.0)
    }
}

pub struct FakeDirectory {
    online: Mutex<HashSet<PlayerRef>>,
    positions: Mutex<HashMap<PlayerRef, Position>>,
    safe_spots: Mutex<bool>,
    pub moves: Mutex<Vec<(PlayerRef, Position)>>,
}

impl Default for FakeDirectory {
    fn default() -> Self {
        Self {
            online: Mutex::new(HashSet::new()),
            positions: Mutex::new(HashMap::new()),
            safe_spots: Mutex::new(true),
            moves: Mutex::new(Vec::new()),
        }
    }
}

impl FakeDirectory {
    pub fn join(&self, player: PlayerRef, position: Position) {
        self.online.lock().unwrap().insert(player);
        self.positions.lock().unwrap().insert(player, position);
    }
    pub fn leave(&self, player: &PlayerRef) {
        self.online.lock().unwrap().remove(player);
    }
    pub fn walk(&self, player: &PlayerRef, position: Position) {
        self.positions.lock().unwrap().insert(*player, position);
    }
    pub fn set_safe_spots(&self, available: bool) {
        *self.safe_spots.lock().unwrap() = available;
    }
    pub fn position(&self, player: &PlayerRef) -> Option<Position> {
        self.positions.lock().unwrap().get(player).cloned()
    }
    pub fn move_count(&self) -> usize {
        self.moves.lock().unwrap().len()
    }
}

impl PlayerDirectory for FakeDirectory {
    fn is_online(&self, player: &PlayerRef) -> bool {
        self.online.lock().unwrap().contains(player)
    }

    fn current_position(&self, player: &PlayerRef) -> Option<Position> {
        if !self.is_online(player) {
            return None;
        }
        self.position(player)
    }

    fn move_player(&self, player: &PlayerRef, position: &Position) {
        self.moves.lock().unwrap().push((*player, position.clone()));
        self.positions.lock().unwrap().insert(*player, position.clone());
    }

    fn find_safe_location(&self, near: &Location) -> Option<Location> {
        if *self.safe_spots.lock().unwrap() {
            // lift onto the block surface
            Some(Location::new(near.world.clone(), near.x, near.y.ceil(), near.z))
        } else {
            None
        }
    }

    fn online_players(&self) -> Vec<PlayerRef> {
        let mut players: Vec<PlayerRef> = self.online.lock().unwrap().iter().copied().collect();
        players.sort();
        players
    }
}

#[derive(Default)]
pub struct FakePermissions {
    granted: Mutex<HashSet<(PlayerRef, String)>>,
}

impl FakePermissions {
    pub fn grant(&self, player: PlayerRef, key: &str) {
        self.granted.lock().unwrap().insert((player, key.to_string()));
    }
}

impl PermissionOracle for FakePermissions {
    fn has_permission(&self, source: &PlayerRef, key: &str) -> bool {
        self.granted
            .lock()
            .unwrap()
            .contains(&(*source, key.to_string()))
    }
}

#[derive(Default)]
pub struct FakePreferences {
    toggled_off: Mutex<HashSet<PlayerRef>>,
}

impl FakePreferences {
    pub fn toggle_off(&self, player: PlayerRef) {
        self.toggled_off.lock().unwrap().insert(player);
    }
}

impl UserPreferences for FakePreferences {
    fn teleport_enabled(&self, player: &PlayerRef) -> bool {
        !self.toggled_off.lock().unwrap().contains(player)
    }
}

#[derive(Default)]
pub struct RecordingMessenger {
    pub sent: Mutex<Vec<(PlayerRef, Notice)>>,
}

impl RecordingMessenger {
    pub fn count(&self, player: &PlayerRef, key: MessageKey) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, n)| p == player && n.key == key)
            .count()
    }
    pub fn received(&self, player: &PlayerRef) -> Vec<MessageKey> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == player)
            .map(|(_, n)| n.key)
            .collect()
    }
    pub fn total_of(&self, key: MessageKey) -> usize {
        self.sent.lock().unwrap().iter().filter(|(_, n)| n.key == key).count()
    }
}

impl Messenger for RecordingMessenger {
    fn send(&self, recipient: &PlayerRef, notice: Notice) {
        self.sent.lock().unwrap().push((*recipient, notice));
    }
}

/// Real tokio scheduler that counts how often it is asked to schedule.
pub struct CountingScheduler {
    inner: TokioScheduler,
    pub calls: AtomicUsize,
}

impl CountingScheduler {
    pub fn start() -> Self {
        Self {
            inner: TokioScheduler::start(),
            calls: AtomicUsize::new(0),
        }
    }
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
    /// Stop the main executor, as a host does on server shutdown.
    pub async fn shutdown_main(&self) {
        self.inner.main_thread().shutdown().await;
    }
}

impl Scheduler for CountingScheduler {
    fn schedule_once(&self, executor: Executor, delay: Duration, job: Job) -> TaskHandle {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.schedule_once(executor, delay, job)
    }

    // The test body stands in for the host's command thread.
    fn is_main_executor(&self) -> bool {
        true
    }
}

pub struct World {
    pub scheduler: Arc<CountingScheduler>,
    pub economy: Arc<FakeEconomy>,
    pub players: Arc<FakeDirectory>,
    pub permissions: Arc<FakePermissions>,
    pub preferences: Arc<FakePreferences>,
    pub messenger: Arc<RecordingMessenger>,
}

impl World {
    pub fn new() -> Self {
        Self {
            scheduler: Arc::new(CountingScheduler::start()),
            economy: Arc::new(FakeEconomy::default()),
            players: Arc::new(FakeDirectory::default()),
            permissions: Arc::new(FakePermissions::default()),
            preferences: Arc::new(FakePreferences::default()),
            messenger: Arc::new(RecordingMessenger::default()),
        }
    }

    pub fn services(&self) -> Services {
        Services {
            scheduler: self.scheduler.clone(),
            economy: self.economy.clone(),
            players: self.players.clone(),
            permissions: self.permissions.clone(),
            preferences: self.preferences.clone(),
            messenger: self.messenger.clone(),
        }
    }

    pub fn handler(&self, config: TeleportConfig) -> Arc<TeleportHandler> {
        Arc::new(TeleportHandler::new(self.services(), config))
    }

    /// A connected player standing at `x`, `z` in the overworld with `balance`.
    pub fn player(&self, x: f64, z: f64, balance: u64) -> PlayerRef {
        let p = PlayerRef::player(Uuid::new_v4());
        self.players.join(p, spot(x, z));
        self.economy.set_balance(p, balance);
        p
    }
}

pub fn spot(x: f64, z: f64) -> Position {
    Position::new(Location::new("world", x, 64.5, z), Rotation { yaw: 90.0, pitch: 0.0 })
}

/// Config with no warmup, no cooldown and free commands.
pub fn instant_config() -> TeleportConfig {
    TeleportConfig::default()
}

pub fn warmup_config(secs: u64) -> TeleportConfig {
    TeleportConfig {
        warmup_secs: secs,
        ..TeleportConfig::default()
    }
}

/// Let timers up to `secs` fire and the main executor drain.
pub async fn wait_secs(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}
