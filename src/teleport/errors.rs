//! Why a teleport did not happen.

use std::time::Duration;
use thiserror::Error;

/// Reasons a teleport is rejected or cancelled.
///
/// Everything except [`TeleportError::InvalidOrder`] is user-triggerable and is
/// resolved into a notice (plus a refund when something was charged) before it
/// reaches the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TeleportError {
    /// Origin and destination are the same player; rejected before any charge.
    #[error("cannot teleport a player to themselves")]
    SelfTeleport,

    /// Destination has teleports toggled off and no bypass applies.
    #[error("target has teleportation disabled")]
    TargetToggledOff,

    /// Withdrawal from the charged party failed; nothing was scheduled.
    #[error("insufficient funds")]
    InsufficientFunds,

    /// A participant disconnected before the move happened; cost refunded.
    #[error("target is offline")]
    TargetOffline,

    /// Safe placement found nowhere to land; cost refunded.
    #[error("no safe location at destination")]
    NoSafeLocation,

    /// Origin teleported too recently.
    #[error("teleport on cooldown for another {}s", remaining.as_secs())]
    Cooldown { remaining: Duration },

    /// Accept/deny with nothing pending for that recipient.
    #[error("no pending teleport request")]
    NoPendingRequest,

    /// Caller built an order that breaks a builder invariant. A defect in the
    /// calling command, not user feedback.
    #[error("invalid teleport order: {0}")]
    InvalidOrder(String),
}

impl TeleportError {
    /// Whether this kind is a programming error rather than user feedback.
    pub fn is_defect(&self) -> bool {
        matches!(self, TeleportError::InvalidOrder(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_invalid_order_is_a_defect() {
        assert!(TeleportError::InvalidOrder("missing to".into()).is_defect());
        assert!(!TeleportError::TargetOffline.is_defect());
        assert!(!TeleportError::SelfTeleport.is_defect());
    }

    #[test]
    fn cooldown_message_shows_whole_seconds() {
        let e = TeleportError::Cooldown {
            remaining: Duration::from_millis(4_900),
        };
        assert_eq!(e.to_string(), "teleport on cooldown for another 4s");
    }
}
