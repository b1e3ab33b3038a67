//! Teleport orders and their builder.
//!
//! An order is plain data: who asked, who moves, where to, who pays and how the
//! move should happen. Building checks the structural invariants; starting it
//! (see [`TeleportBuilder::start`]) runs the policy checks, charges, and either
//! moves immediately or schedules a warmup.

use std::sync::Arc;
use std::time::Duration;

use super::cancel::Refund;
use super::context::TeleportContext;
use super::errors::TeleportError;
use super::types::{Money, PlayerRef, Position, TeleportCause};

/// Who pays for an order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Charge {
    pub payer: PlayerRef,
    pub amount: Money,
    /// Collected before the order was built (pending requests pay up front);
    /// starting the order must not withdraw again but still owes a refund on
    /// cancellation.
    pub prepaid: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TeleportOrder {
    pub source: PlayerRef,
    pub from: PlayerRef,
    pub to: PlayerRef,
    pub charge: Option<Charge>,
    pub warmup: Duration,
    pub safe: bool,
    pub silent: bool,
    pub bypass_toggle: bool,
    pub cause: TeleportCause,
}

impl TeleportOrder {
    pub fn cost(&self) -> Money {
        self.charge.as_ref().map(|c| c.amount).unwrap_or_default()
    }

    pub fn charged(&self) -> Option<PlayerRef> {
        self.charge.as_ref().map(|c| c.payer)
    }

    /// Refund owed if this order is cancelled after it was charged.
    pub(crate) fn refund(&self) -> Option<Refund> {
        self.charge
            .as_ref()
            .and_then(|c| Refund::new(c.payer, c.amount))
    }

    /// Refund owed if this order is rejected before `start` charged anything.
    pub(crate) fn prepaid_refund(&self) -> Option<Refund> {
        self.charge
            .as_ref()
            .filter(|c| c.prepaid)
            .and_then(|c| Refund::new(c.payer, c.amount))
    }
}

/// Result of a successful start.
#[derive(Clone, Debug, PartialEq)]
pub enum Started {
    /// Moved right away.
    Teleported(Position),
    /// Move pending; it fires after the warmup unless cancelled first.
    WarmingUp(Duration),
}

/// Fluent builder for [`TeleportOrder`], bound to the handler that created it.
pub struct TeleportBuilder {
    ctx: Arc<TeleportContext>,
    source: Option<PlayerRef>,
    from: Option<PlayerRef>,
    to: Option<PlayerRef>,
    charge: Option<PlayerRef>,
    cost: Money,
    prepaid: bool,
    warmup: Duration,
    safe: bool,
    silent: bool,
    bypass_toggle: bool,
    cause: TeleportCause,
}

impl TeleportBuilder {
    pub(crate) fn new(ctx: Arc<TeleportContext>) -> Self {
        let warmup = ctx.config.warmup();
        let safe = ctx.config.safe_teleport;
        Self {
            ctx,
            source: None,
            from: None,
            to: None,
            charge: None,
            cost: Money::ZERO,
            prepaid: false,
            warmup,
            safe,
            silent: false,
            bypass_toggle: false,
            cause: TeleportCause::Command,
        }
    }

    /// Command invoker; defaults to the origin player.
    pub fn source(mut self, source: PlayerRef) -> Self {
        self.source = Some(source);
        self
    }

    /// Player who moves.
    pub fn from(mut self, player: PlayerRef) -> Self {
        self.from = Some(player);
        self
    }

    /// Player whose position is the destination.
    pub fn to(mut self, player: PlayerRef) -> Self {
        self.to = Some(player);
        self
    }

    /// Player debited for the cost.
    pub fn charge(mut self, payer: PlayerRef) -> Self {
        self.charge = Some(payer);
        self
    }

    pub fn cost(mut self, amount: impl Into<Money>) -> Self {
        self.cost = amount.into();
        self
    }

    /// Mark the cost as already collected by the caller.
    pub fn prepaid(mut self, prepaid: bool) -> Self {
        self.prepaid = prepaid;
        self
    }

    /// Overrides the configured warmup.
    pub fn warmup(mut self, delay: Duration) -> Self {
        self.warmup = delay;
        self
    }

    pub fn safe(mut self, safe: bool) -> Self {
        self.safe = safe;
        self
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn bypass_toggle(mut self, bypass: bool) -> Self {
        self.bypass_toggle = bypass;
        self
    }

    pub fn cause(mut self, cause: TeleportCause) -> Self {
        self.cause = cause;
        self
    }

    pub fn build(&self) -> Result<TeleportOrder, TeleportError> {
        let from = self
            .from
            .ok_or_else(|| TeleportError::InvalidOrder("origin player not set".into()))?;
        let to = self
            .to
            .ok_or_else(|| TeleportError::InvalidOrder("destination player not set".into()))?;
        let charge = match (self.charge, self.cost.is_zero()) {
            (_, true) => None,
            (Some(payer), false) => Some(Charge {
                payer,
                amount: self.cost,
                prepaid: self.prepaid,
            }),
            (None, false) => {
                return Err(TeleportError::InvalidOrder(format!(
                    "cost {} without a charged player",
                    self.cost.0
                )))
            }
        };
        Ok(TeleportOrder {
            source: self.source.unwrap_or(from),
            from,
            to,
            charge,
            warmup: self.warmup,
            safe: self.safe,
            silent: self.silent,
            bypass_toggle: self.bypass_toggle,
            cause: self.cause,
        })
    }

    /// Build and start the order.
    pub fn start(self) -> Result<Started, TeleportError> {
        let order = self.build().map_err(|e| {
            log::error!(target: "teleport", "{}", e);
            e
        })?;
        self.ctx.start(&order)
    }
}
