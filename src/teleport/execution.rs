//! The move itself.
//!
//! A [`TeleportExecution`] runs on the main executor, either inline from the
//! command that started it (no warmup) or as the fired job of a warmup. It reads the destination's position when
//! it runs, not when the order was created, so a moving target is followed
//! until the last moment.

use std::sync::Arc;

use log::info;

use super::cancel::CancelPlan;
use super::cooldown::CooldownTracker;
use super::errors::TeleportError;
use super::order::TeleportOrder;
use super::ports::Services;
use super::types::{MessageKey, Notice, Position};

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Teleported(Position),
    /// Cancelled after charging; the refund and notice were already settled.
    Cancelled(TeleportError),
}

pub struct TeleportExecution {
    order: TeleportOrder,
    services: Services,
    cooldowns: Arc<CooldownTracker>,
}

impl TeleportExecution {
    pub fn new(order: TeleportOrder, services: Services, cooldowns: Arc<CooldownTracker>) -> Self {
        Self {
            order,
            services,
            cooldowns,
        }
    }

    pub fn order(&self) -> &TeleportOrder {
        &self.order
    }

    /// Plan settled when this execution is cancelled before or while running.
    pub fn cancel_plan(&self, notice: Notice) -> CancelPlan {
        CancelPlan::new(self.order.from, notice).with_refund(self.order.refund())
    }

    /// Must run on the main executor: either as a fired warmup job or inline
    /// from a command handler that is itself on the main executor.
    pub fn run(&self) -> Outcome {
        debug_assert!(
            self.services.scheduler.is_main_executor(),
            "teleport {} -> {} executed off the main executor",
            self.order.from,
            self.order.to
        );
        let order = &self.order;
        let players = &self.services.players;

        if !players.is_online(&order.to) || !players.is_online(&order.from) {
            return self.abort(TeleportError::TargetOffline, Notice::new(MessageKey::PlayerOffline));
        }
        let Some(destination) = players.current_position(&order.to) else {
            return self.abort(TeleportError::TargetOffline, Notice::new(MessageKey::PlayerOffline));
        };

        let target = if order.safe {
            match players.find_safe_location(&destination.location) {
                Some(location) => Position::new(location, destination.rotation),
                None => {
                    let notice = Notice::new(MessageKey::UnsafeDestination).arg(&destination);
                    return self.abort(TeleportError::NoSafeLocation, notice);
                }
            }
        } else {
            destination
        };

        players.move_player(&order.from, &target);
        self.cooldowns.record(&order.from);
        info!(target: "teleport",
            "{:?} teleport: {} -> {} at {} (source {})",
            order.cause, order.from, order.to, target, order.source
        );

        let services = &self.services;
        services.notify(&order.from, Notice::new(MessageKey::Teleporting));
        if !order.silent {
            services.notify(
                &order.to,
                Notice::new(MessageKey::TeleportedToYou).arg(services.name_of(&order.from)),
            );
            if order.source != order.from && order.source != order.to {
                services.notify(
                    &order.source,
                    Notice::new(MessageKey::TeleportedOther)
                        .arg(services.name_of(&order.from))
                        .arg(services.name_of(&order.to)),
                );
            }
        }
        Outcome::Teleported(target)
    }

    fn abort(&self, error: TeleportError, notice: Notice) -> Outcome {
        info!(target: "teleport",
            "teleport {} -> {} cancelled: {}",
            self.order.from, self.order.to, error
        );
        self.cancel_plan(notice).settle(&self.services);
        Outcome::Cancelled(error)
    }
}
