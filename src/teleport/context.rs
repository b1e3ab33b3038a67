//! Shared state behind a [`TeleportHandler`](super::handler::TeleportHandler)
//! and every builder it hands out, plus the start sequence for orders.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};

use super::cancel::CancelPlan;
use super::cooldown::CooldownTracker;
use super::errors::TeleportError;
use super::execution::{Outcome, TeleportExecution};
use super::order::{Started, TeleportOrder};
use super::ports::{Services, PERM_COOLDOWN_BYPASS, PERM_TOGGLE_BYPASS, PERM_WARMUP_BYPASS};
use super::types::{MessageKey, Notice};
use super::warmup::WarmupRegistry;
use crate::config::TeleportConfig;

pub(crate) struct TeleportContext {
    pub(crate) services: Services,
    pub(crate) warmups: WarmupRegistry,
    pub(crate) cooldowns: Arc<CooldownTracker>,
    pub(crate) config: TeleportConfig,
}

impl TeleportContext {
    pub(crate) fn new(services: Services, config: TeleportConfig) -> Self {
        Self {
            warmups: WarmupRegistry::new(services.clone()),
            cooldowns: Arc::new(CooldownTracker::new(config.cooldown())),
            services,
            config,
        }
    }

    /// Validate, charge, then move now or after the warmup.
    ///
    /// Rejections happen before anything is withdrawn. A prepaid order that is
    /// rejected here is refunded along with the rejection notice.
    pub(crate) fn start(&self, order: &TeleportOrder) -> Result<Started, TeleportError> {
        let services = &self.services;

        if order.from == order.to {
            return self.reject(order, TeleportError::SelfTeleport, Notice::new(MessageKey::SelfTeleport));
        }

        if let Some(remaining) = self.cooldowns.remaining(&order.from) {
            if !services.permitted(&order.source, PERM_COOLDOWN_BYPASS) {
                let secs = remaining.as_secs().max(1);
                return self.reject(
                    order,
                    TeleportError::Cooldown { remaining },
                    Notice::new(MessageKey::TeleportCooldown).arg(secs),
                );
            }
        }

        if !order.bypass_toggle
            && !services.permitted(&order.source, PERM_TOGGLE_BYPASS)
            && !services.preferences.teleport_enabled(&order.to)
        {
            return self.reject(
                order,
                TeleportError::TargetToggledOff,
                Notice::new(MessageKey::TeleportDisabled).arg(services.name_of(&order.to)),
            );
        }

        if let Some(charge) = order.charge.as_ref().filter(|c| !c.prepaid) {
            if !services.economy.withdraw(&charge.payer, charge.amount) {
                let shown = services.economy.format(charge.amount);
                services.notify(&charge.payer, Notice::new(MessageKey::NotEnoughMoney).arg(shown));
                debug!("{} could not pay {} for a teleport", charge.payer, charge.amount.0);
                return Err(TeleportError::InsufficientFunds);
            }
        }

        let warmup = if services.permitted(&order.from, PERM_WARMUP_BYPASS) {
            Duration::ZERO
        } else {
            order.warmup
        };
        let execution = TeleportExecution::new(
            order.clone(),
            services.clone(),
            Arc::clone(&self.cooldowns),
        );

        if warmup.is_zero() {
            return match execution.run() {
                Outcome::Teleported(position) => Ok(Started::Teleported(position)),
                Outcome::Cancelled(error) => Err(error),
            };
        }

        let on_cancel = execution.cancel_plan(Notice::new(MessageKey::TeleportCancelled));
        self.warmups.schedule(
            order.from,
            warmup,
            Box::new(move || {
                execution.run();
            }),
            on_cancel,
        );
        info!(target: "teleport",
            "teleport {} -> {} warming up for {}s",
            order.from, order.to, warmup.as_secs()
        );
        services.notify(
            &order.from,
            Notice::new(MessageKey::TeleportWarmup).arg(warmup.as_secs()),
        );
        Ok(Started::WarmingUp(warmup))
    }

    fn reject(
        &self,
        order: &TeleportOrder,
        error: TeleportError,
        notice: Notice,
    ) -> Result<Started, TeleportError> {
        debug!("teleport {} -> {} rejected: {}", order.from, order.to, error);
        CancelPlan::new(order.source, notice)
            .with_refund(order.prepaid_refund())
            .settle(&self.services);
        Err(error)
    }
}
