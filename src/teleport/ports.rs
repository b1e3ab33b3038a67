//! Host-provided collaborators. The engine consumes these and never implements
//! them; the host plugin adapts its own economy, player and permission APIs.

use std::sync::Arc;

use super::scheduler::Scheduler;
use super::types::{Location, Money, Notice, PlayerRef, Position};

/// Permission that lets a source teleport players with teleports toggled off.
pub const PERM_TOGGLE_BYPASS: &str = "waypoint.tptoggle.force";
/// Permission that skips the warmup delay.
pub const PERM_WARMUP_BYPASS: &str = "waypoint.teleport.timer.bypass";
/// Permission that skips the teleport cooldown.
pub const PERM_COOLDOWN_BYPASS: &str = "waypoint.teleport.cooldown.bypass";
/// Permission that makes configured command costs free.
pub const PERM_NO_COST: &str = "waypoint.nocommandcost";

/// Currency ledger. Withdrawals must be all-or-nothing: a failed withdraw
/// leaves the balance untouched.
pub trait Economy: Send + Sync {
    fn withdraw(&self, player: &PlayerRef, amount: Money) -> bool;
    fn deposit(&self, player: &PlayerRef, amount: Money) -> bool;
    /// Human readable amount, e.g. "$1.50".
    fn format(&self, amount: Money) -> String;
}

pub trait PlayerDirectory: Send + Sync {
    fn is_online(&self, player: &PlayerRef) -> bool;
    /// Current position, `None` when the player is not connected.
    fn current_position(&self, player: &PlayerRef) -> Option<Position>;
    /// Moves a player. The engine only calls this from the main executor.
    fn move_player(&self, player: &PlayerRef, position: &Position);
    /// Nearest location a player can stand at without suffocating or falling
    /// into the void.
    fn find_safe_location(&self, near: &Location) -> Option<Location>;
    /// Snapshot of currently connected players.
    fn online_players(&self) -> Vec<PlayerRef>;
    /// Display name used in notices; falls back to the raw identifier.
    fn display_name(&self, player: &PlayerRef) -> String {
        player.to_string()
    }
}

pub trait PermissionOracle: Send + Sync {
    fn has_permission(&self, source: &PlayerRef, key: &str) -> bool;
}

/// Persisted per-player preferences.
pub trait UserPreferences: Send + Sync {
    /// Whether the player accepts being teleported to / teleported by others.
    fn teleport_enabled(&self, player: &PlayerRef) -> bool;
}

pub trait Messenger: Send + Sync {
    fn send(&self, recipient: &PlayerRef, notice: Notice);
}

/// Bundle of host collaborators shared by every engine component.
#[derive(Clone)]
pub struct Services {
    pub scheduler: Arc<dyn Scheduler>,
    pub economy: Arc<dyn Economy>,
    pub players: Arc<dyn PlayerDirectory>,
    pub permissions: Arc<dyn PermissionOracle>,
    pub preferences: Arc<dyn UserPreferences>,
    pub messenger: Arc<dyn Messenger>,
}

impl Services {
    pub fn notify(&self, recipient: &PlayerRef, notice: Notice) {
        // Console has no chat; notices to it are only logged.
        if recipient.is_console() {
            log::info!("[console] {} {:?}", notice.key.as_str(), notice.args);
            return;
        }
        self.messenger.send(recipient, notice);
    }

    pub fn name_of(&self, player: &PlayerRef) -> String {
        match player {
            PlayerRef::Console => "Console".to_string(),
            other => self.players.display_name(other),
        }
    }

    /// Console bypasses every permission check.
    pub fn permitted(&self, source: &PlayerRef, key: &str) -> bool {
        source.is_console() || self.permissions.has_permission(source, key)
    }
}
