//! Façade used by command adapters.
//!
//! Owns the warmup registry, the pending request registry and the cooldown
//! tracker; nothing else touches them. Construct one per plugin instance and
//! share it as `Arc<TeleportHandler>`.
//!
//! Every command entry point (`builder().start()`, `accept`, `get_and_execute`,
//! `teleport_all_here`, ...) must be called from the main executor: without a
//! warmup the move happens inline on the caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, info};

use super::context::TeleportContext;
use super::errors::TeleportError;
use super::order::{Started, TeleportBuilder};
use super::ports::{Services, PERM_NO_COST, PERM_TOGGLE_BYPASS};
use super::requests::{PendingRequestRegistry, TeleportPrep};
use super::scheduler::{Executor, TaskHandle};
use super::types::{MessageKey, Money, Notice, PlayerRef, TeleportCause};
use crate::config::TeleportConfig;

pub struct TeleportHandler {
    ctx: Arc<TeleportContext>,
    requests: PendingRequestRegistry,
    /// Running maintenance loop: its generation and next pass.
    maintenance: Mutex<Option<(u64, TaskHandle)>>,
    maintenance_gen: AtomicU64,
}

impl TeleportHandler {
    pub fn new(services: Services, config: TeleportConfig) -> Self {
        let requests = PendingRequestRegistry::new(services.clone(), config.request_timeout());
        Self {
            ctx: Arc::new(TeleportContext::new(services, config)),
            requests,
            maintenance: Mutex::new(None),
            maintenance_gen: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &TeleportConfig {
        &self.ctx.config
    }

    /// Fresh order builder using this handler's services and defaults.
    pub fn builder(&self) -> TeleportBuilder {
        TeleportBuilder::new(Arc::clone(&self.ctx))
    }

    /// Store `prep` in `target`'s inbox, replacing (and refunding) any older one.
    pub fn add_ask_question(&self, target: PlayerRef, prep: TeleportPrep) {
        self.requests.add(target, prep);
    }

    pub fn pending_request(&self, target: &PlayerRef) -> Option<TeleportPrep> {
        self.requests.get(target)
    }

    /// Accept the request waiting for `target`.
    ///
    /// `None` when nothing was pending. `Some` means the request was popped
    /// and started; the inner result is how the start went.
    pub fn get_and_execute(&self, target: &PlayerRef) -> Option<Result<Started, TeleportError>> {
        let prep = self.requests.take(target)?;
        let services = &self.ctx.services;
        services.notify(target, Notice::new(MessageKey::RequestAccepted));
        if prep.requester != *target {
            services.notify(
                &prep.requester,
                Notice::new(MessageKey::RequestAcceptedBy).arg(services.name_of(target)),
            );
        }
        info!(target: "teleport", "{} accepted request from {}", target, prep.requester);
        Some(self.ctx.start(&prep.order))
    }

    /// Deny the request waiting for `target`, refunding the requester.
    pub fn remove(&self, target: &PlayerRef) -> bool {
        let services = &self.ctx.services;
        let notice = Notice::new(MessageKey::RequestDeniedBy).arg(services.name_of(target));
        if self.requests.cancel(target, notice) {
            services.notify(target, Notice::new(MessageKey::RequestDenied));
            true
        } else {
            false
        }
    }

    /// `tpaccept`: like [`get_and_execute`](Self::get_and_execute) but tells
    /// `target` when there was nothing to accept.
    pub fn accept(&self, target: &PlayerRef) -> Result<Started, TeleportError> {
        self.get_and_execute(target).unwrap_or_else(|| {
            self.no_pending(target);
            Err(TeleportError::NoPendingRequest)
        })
    }

    /// `tpdeny`
    pub fn deny(&self, target: &PlayerRef) -> Result<(), TeleportError> {
        if self.remove(target) {
            Ok(())
        } else {
            self.no_pending(target);
            Err(TeleportError::NoPendingRequest)
        }
    }

    fn no_pending(&self, target: &PlayerRef) {
        self.ctx
            .services
            .notify(target, Notice::new(MessageKey::NoPendingRequest));
    }

    pub fn can_bypass_tp_toggle(&self, source: &PlayerRef) -> bool {
        self.ctx.services.permitted(source, PERM_TOGGLE_BYPASS)
    }

    /// Configured cost of `command` for `payer`, zero with the no-cost permission.
    pub fn command_cost(&self, command: &str, payer: &PlayerRef) -> Money {
        if self.ctx.services.permitted(payer, PERM_NO_COST) {
            Money::ZERO
        } else {
            self.ctx.config.cost_of(command)
        }
    }

    /// `tpa` (requester goes to target) or `tpahere` (target comes to requester).
    ///
    /// The command cost is taken from the requester now and refunded if the
    /// request is denied, replaced, expires or fails after acceptance.
    pub fn request(&self, requester: PlayerRef, target: PlayerRef, here: bool) -> Result<(), TeleportError> {
        let services = &self.ctx.services;
        if requester == target {
            services.notify(&requester, Notice::new(MessageKey::SelfTeleport));
            return Err(TeleportError::SelfTeleport);
        }
        if !self.can_bypass_tp_toggle(&requester) && !services.preferences.teleport_enabled(&target) {
            services.notify(
                &requester,
                Notice::new(MessageKey::TeleportDisabled).arg(services.name_of(&target)),
            );
            return Err(TeleportError::TargetToggledOff);
        }

        let command = if here { "tpahere" } else { "tpa" };
        let cost = self.command_cost(command, &requester);
        let (from, to) = if here { (target, requester) } else { (requester, target) };
        // Nothing may fail between the withdrawal and registering the request.
        let order = self
            .builder()
            .source(requester)
            .from(from)
            .to(to)
            .charge(requester)
            .cost(cost)
            .prepaid(true)
            .bypass_toggle(true)
            .cause(TeleportCause::Request)
            .build()?;
        if !cost.is_zero() && !services.economy.withdraw(&requester, cost) {
            let shown = services.economy.format(cost);
            services.notify(&requester, Notice::new(MessageKey::NotEnoughMoney).arg(shown));
            return Err(TeleportError::InsufficientFunds);
        }

        self.add_ask_question(target, TeleportPrep::new(requester, order));

        let name = services.name_of(&requester);
        let ask = if here { MessageKey::RequestHere } else { MessageKey::RequestToYou };
        services.notify(&target, Notice::new(ask).arg(name));
        services.notify(
            &target,
            Notice::new(MessageKey::RequestTimeout).arg(self.requests.timeout().as_secs()),
        );
        services.notify(
            &requester,
            Notice::new(MessageKey::RequestSent).arg(services.name_of(&target)),
        );
        debug!("{} sent {} to {}", requester, command, target);
        Ok(())
    }

    /// Ask every online player (except the requester and those with teleports
    /// toggled off) to come to `requester`. Free of charge.
    pub fn ask_all_here(&self, requester: PlayerRef) -> usize {
        let services = &self.ctx.services;
        let name = services.name_of(&requester);
        let mut asked = 0;
        for player in services.players.online_players() {
            if player == requester || !services.preferences.teleport_enabled(&player) {
                continue;
            }
            let order = match self
                .builder()
                .source(requester)
                .from(player)
                .to(requester)
                .bypass_toggle(true)
                .cause(TeleportCause::Request)
                .build()
            {
                Ok(order) => order,
                Err(e) => {
                    log::error!(target: "teleport", "{}", e);
                    continue;
                }
            };
            self.add_ask_question(player, TeleportPrep::new(requester, order));
            services.notify(&player, Notice::new(MessageKey::RequestHere).arg(&name));
            asked += 1;
        }
        info!(target: "teleport", "{} asked {} players to teleport here", requester, asked);
        asked
    }

    /// Admin: move every online player to `destination` immediately.
    /// Returns how many were moved.
    pub fn teleport_all_here(&self, source: PlayerRef, destination: PlayerRef) -> usize {
        let bypass = self.can_bypass_tp_toggle(&source);
        let mut moved = 0;
        for player in self.ctx.services.players.online_players() {
            if player == destination {
                continue;
            }
            let started = self
                .builder()
                .source(source)
                .from(player)
                .to(destination)
                .warmup(Duration::ZERO)
                .bypass_toggle(bypass)
                .cause(TeleportCause::Admin)
                .start();
            if matches!(started, Ok(Started::Teleported(_))) {
                moved += 1;
            }
        }
        moved
    }

    /// `tpacancel`: withdraw every request `requester` has outstanding.
    pub fn cancel_requests_from(&self, requester: &PlayerRef) -> usize {
        let count = self.requests.cancel_from(requester);
        self.ctx.services.notify(
            requester,
            Notice::new(MessageKey::RequestsCancelled).arg(count),
        );
        count
    }

    /// Movement hook. Cancels and refunds a pending warmup when configured to.
    pub fn player_moved(&self, player: &PlayerRef) -> bool {
        self.ctx.config.cancel_on_move && self.ctx.warmups.interrupt(player)
    }

    /// Disconnect hook: drop the player's warmup and every request they are
    /// part of, refunding whoever paid.
    pub fn player_quit(&self, player: &PlayerRef) {
        self.ctx.warmups.interrupt(player);
        self.requests
            .cancel(player, Notice::new(MessageKey::PlayerOffline));
        self.requests.cancel_from(player);
        self.ctx.cooldowns.forget(player);
    }

    pub fn is_warming_up(&self, player: &PlayerRef) -> bool {
        self.ctx.warmups.is_warming_up(player)
    }

    /// Cancel a warmup without refund or notice (the caller handles both).
    pub fn cancel_warmup(&self, player: &PlayerRef) -> bool {
        self.ctx.warmups.cancel(player)
    }

    pub fn clear_expired(&self) -> usize {
        self.requests.clear_expired()
    }

    /// Start the periodic sweep of expired requests and dead warmup entries.
    ///
    /// Each pass runs on the scheduler's async executor and arms the next one
    /// `maintenance_interval_secs` later. Calling this again replaces the
    /// running loop. It stops on [`stop_maintenance`](Self::stop_maintenance)
    /// or once the handler is dropped.
    pub fn spawn_maintenance(self: &Arc<Self>) {
        let generation = self.maintenance_gen.fetch_add(1, Ordering::Relaxed) + 1;
        let mut slot = self.maintenance_slot();
        if let Some((_, previous)) = slot.take() {
            previous.cancel();
        }
        *slot = Some((generation, self.arm_maintenance(generation)));
    }

    pub fn stop_maintenance(&self) -> bool {
        match self.maintenance_slot().take() {
            Some((_, next)) => {
                next.cancel();
                true
            }
            None => false,
        }
    }

    fn arm_maintenance(self: &Arc<Self>, generation: u64) -> TaskHandle {
        let weak = Arc::downgrade(self);
        let period = self.ctx.config.maintenance_interval();
        self.ctx.services.scheduler.schedule_once(
            Executor::Async,
            period,
            Box::new(move || {
                let Some(handler) = weak.upgrade() else {
                    debug!("teleport maintenance loop terminated");
                    return;
                };
                handler.maintain();
                let mut slot = handler.maintenance_slot();
                // re-arm only if this loop was neither stopped nor replaced
                if matches!(*slot, Some((g, _)) if g == generation) {
                    *slot = Some((generation, handler.arm_maintenance(generation)));
                }
            }),
        )
    }

    fn maintain(&self) {
        let expired = self.clear_expired();
        let stale = self.ctx.warmups.reconcile();
        if expired + stale > 0 {
            debug!("maintenance: expired_requests={} stale_warmups={}", expired, stale);
        }
    }

    fn maintenance_slot(&self) -> MutexGuard<'_, Option<(u64, TaskHandle)>> {
        self.maintenance.lock().unwrap_or_else(|e| e.into_inner())
    }
}
