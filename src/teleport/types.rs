//! Plain data shared across the teleport engine: player identities, positions,
//! money amounts and keyed user notices.

use std::fmt;
use uuid::Uuid;

/// Opaque identity of a command participant.
///
/// Never a live handle to a connected player; the directory port resolves it
/// on every access so a disconnect/reconnect cannot leave stale state behind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlayerRef {
    /// A player, keyed by account UUID
    Player(Uuid),
    /// The server console (never online, never moves, never pays)
    Console,
}

impl PlayerRef {
    pub fn player(id: Uuid) -> Self {
        PlayerRef::Player(id)
    }

    pub fn is_console(&self) -> bool {
        matches!(self, PlayerRef::Console)
    }
}

impl fmt::Display for PlayerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerRef::Player(id) => write!(f, "{}", id),
            PlayerRef::Console => write!(f, "CONSOLE"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Location {
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    pub fn new(world: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Rotation {
    pub yaw: f32,
    pub pitch: f32,
}

/// Where a player stands and which way they face.
#[derive(Clone, Debug, PartialEq)]
pub struct Position {
    pub location: Location,
    pub rotation: Rotation,
}

impl Position {
    pub fn new(location: Location, rotation: Rotation) -> Self {
        Self { location, rotation }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let loc = &self.location;
        write!(f, "{} {:.1},{:.1},{:.1}", loc.world, loc.x, loc.y, loc.z)
    }
}

/// Non-negative currency amount in minor units (cents, copper, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(pub u64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for Money {
    fn from(v: u64) -> Self {
        Money(v)
    }
}

/// Message template identifiers. Wording and localisation live with the
/// messaging port; the engine only picks the key and its arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKey {
    /// "You cannot teleport to yourself."
    SelfTeleport,
    /// "{0} has teleportation disabled."
    TeleportDisabled,
    /// "You need {0} to do that."
    NotEnoughMoney,
    /// "{0} has been returned to your account."
    Refunded,
    /// "Wait {0}s before teleporting again."
    TeleportCooldown,
    /// "Teleport commencing in {0}s. Don't move."
    TeleportWarmup,
    /// "Pending teleport cancelled."
    TeleportCancelled,
    /// "Teleporting..."
    Teleporting,
    /// "{0} teleported to you."
    TeleportedToYou,
    /// "Teleported {0} to {1}."
    TeleportedOther,
    /// "Target is not online."
    PlayerOffline,
    /// "No safe location near {0}."
    UnsafeDestination,
    /// "{0} has requested to teleport to you."
    RequestToYou,
    /// "{0} has requested that you teleport to them."
    RequestHere,
    /// "Request sent to {0}."
    RequestSent,
    /// "This request will time out after {0} seconds."
    RequestTimeout,
    /// "Teleport request accepted."
    RequestAccepted,
    /// "{0} accepted your teleport request."
    RequestAcceptedBy,
    /// "Teleport request denied."
    RequestDenied,
    /// "{0} denied your teleport request."
    RequestDeniedBy,
    /// "Your teleport request to {0} timed out."
    RequestExpired,
    /// "Your teleport request to {0} was replaced."
    RequestReplaced,
    /// "You do not have a pending request."
    NoPendingRequest,
    /// "Cancelled {0} outstanding teleport request(s)."
    RequestsCancelled,
}

impl MessageKey {
    /// Stable template key handed to the localisation layer.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKey::SelfTeleport => "teleport.self",
            MessageKey::TeleportDisabled => "teleport.disabled",
            MessageKey::NotEnoughMoney => "economy.notEnoughMoney",
            MessageKey::Refunded => "economy.refunded",
            MessageKey::TeleportCooldown => "teleport.cooldown",
            MessageKey::TeleportWarmup => "teleport.warmup",
            MessageKey::TeleportCancelled => "teleport.cancelled",
            MessageKey::Teleporting => "teleport.teleporting",
            MessageKey::TeleportedToYou => "teleport.toYou",
            MessageKey::TeleportedOther => "teleport.other",
            MessageKey::PlayerOffline => "player.offline",
            MessageKey::UnsafeDestination => "teleport.unsafe",
            MessageKey::RequestToYou => "request.toYou",
            MessageKey::RequestHere => "request.here",
            MessageKey::RequestSent => "request.sent",
            MessageKey::RequestTimeout => "request.timeout",
            MessageKey::RequestAccepted => "request.accepted",
            MessageKey::RequestAcceptedBy => "request.acceptedBy",
            MessageKey::RequestDenied => "request.denied",
            MessageKey::RequestDeniedBy => "request.deniedBy",
            MessageKey::RequestExpired => "request.expired",
            MessageKey::RequestReplaced => "request.replaced",
            MessageKey::NoPendingRequest => "request.none",
            MessageKey::RequestsCancelled => "request.cancelledAll",
        }
    }
}

/// A keyed message plus its positional arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub key: MessageKey,
    pub args: Vec<String>,
}

impl Notice {
    pub fn new(key: MessageKey) -> Self {
        Self {
            key,
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, value: impl ToString) -> Self {
        self.args.push(value.to_string());
        self
    }
}

/// Why an order was created. Only used for logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TeleportCause {
    #[default]
    Command,
    Request,
    Admin,
}
