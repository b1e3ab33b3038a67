//! Cancellation records.
//!
//! A cancelled warmup or request is described by a [`CancelPlan`] instead of a
//! closure: who gets money back, how much, and who is told about it. Settling
//! a plan is the only place refunds happen.

use log::{error, info};

use super::ports::Services;
use super::types::{MessageKey, Money, Notice, PlayerRef};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Refund {
    pub payer: PlayerRef,
    pub amount: Money,
}

impl Refund {
    pub fn new(payer: PlayerRef, amount: Money) -> Option<Self> {
        if amount.is_zero() {
            None
        } else {
            Some(Self { payer, amount })
        }
    }

    /// Deposit the amount back. A failed deposit is logged, never retried.
    pub fn apply(&self, services: &Services) -> bool {
        if services.economy.deposit(&self.payer, self.amount) {
            info!(target: "teleport", "refunded {} to {}", self.amount.0, self.payer);
            true
        } else {
            error!(target: "teleport",
                "refund of {} to {} failed; ledger needs manual correction",
                self.amount.0, self.payer
            );
            false
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CancelPlan {
    pub refund: Option<Refund>,
    pub recipient: PlayerRef,
    pub notice: Notice,
}

impl CancelPlan {
    pub fn new(recipient: PlayerRef, notice: Notice) -> Self {
        Self {
            refund: None,
            recipient,
            notice,
        }
    }

    pub fn with_refund(mut self, refund: Option<Refund>) -> Self {
        self.refund = refund;
        self
    }

    /// Pay back the charged party (if any) and deliver the notice.
    ///
    /// The payer gets a separate refund notice only when they are not already
    /// the recipient of the cancellation notice.
    pub fn settle(self, services: &Services) {
        if let Some(refund) = &self.refund {
            if refund.apply(services) && refund.payer != self.recipient {
                let shown = services.economy.format(refund.amount);
                services.notify(&refund.payer, Notice::new(MessageKey::Refunded).arg(shown));
            }
        }
        services.notify(&self.recipient, self.notice);
    }
}
