//! Pending teleport requests (`tpa` / `tpahere`), one per recipient.
//!
//! Expiry is not timer driven. Every access sweeps out requests past their
//! deadline first, so a stale request can never be returned or accepted; the
//! handler's maintenance task only bounds how long a forgotten one lingers.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use log::debug;
use tokio::time::Instant;

use super::cancel::{CancelPlan, Refund};
use super::order::TeleportOrder;
use super::ports::Services;
use super::types::{MessageKey, Money, Notice, PlayerRef};

/// How long a request stays acceptable unless configured otherwise.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A proposal waiting in the recipient's inbox.
#[derive(Clone, Debug)]
pub struct TeleportPrep {
    pub requester: PlayerRef,
    pub charged: Option<PlayerRef>,
    pub cost: Money,
    pub order: TeleportOrder,
    expires_at: Option<Instant>,
}

impl TeleportPrep {
    /// Only a prepaid charge is carried over: that is the money the registry
    /// owes back if the request is cancelled.
    pub fn new(requester: PlayerRef, order: TeleportOrder) -> Self {
        let (charged, cost) = match order.charge.as_ref().filter(|c| c.prepaid) {
            Some(c) => (Some(c.payer), c.amount),
            None => (None, Money::ZERO),
        };
        Self {
            requester,
            charged,
            cost,
            order,
            expires_at: None,
        }
    }

    /// Deadline, set when the prep is added to a registry.
    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|at| now >= at).unwrap_or(false)
    }

    fn cancel_plan(&self, notice: Notice) -> CancelPlan {
        let refund = self.charged.and_then(|payer| Refund::new(payer, self.cost));
        CancelPlan::new(self.requester, notice).with_refund(refund)
    }
}

pub struct PendingRequestRegistry {
    timeout: Duration,
    services: Services,
    entries: Mutex<HashMap<PlayerRef, TeleportPrep>>,
}

impl PendingRequestRegistry {
    pub fn new(services: Services, timeout: Duration) -> Self {
        Self {
            timeout,
            services,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Put `prep` in `recipient`'s inbox, cancelling whatever was there.
    pub fn add(&self, recipient: PlayerRef, mut prep: TeleportPrep) {
        prep.expires_at = Some(Instant::now() + self.timeout);
        let (expired, replaced) = {
            let mut map = self.lock();
            let expired = Self::drain_expired(&mut map);
            (expired, map.insert(recipient, prep))
        };
        self.settle_expired(expired);
        if let Some(old) = replaced {
            debug!("request to {} from {} replaced", recipient, old.requester);
            let notice =
                Notice::new(MessageKey::RequestReplaced).arg(self.services.name_of(&recipient));
            old.cancel_plan(notice).settle(&self.services);
        }
    }

    /// The live request waiting for `recipient`, if any.
    pub fn get(&self, recipient: &PlayerRef) -> Option<TeleportPrep> {
        let (expired, found) = {
            let mut map = self.lock();
            let expired = Self::drain_expired(&mut map);
            (expired, map.get(recipient).cloned())
        };
        self.settle_expired(expired);
        found
    }

    /// Remove and return the live request for `recipient` without settling
    /// it; the caller now owns its charge.
    pub fn take(&self, recipient: &PlayerRef) -> Option<TeleportPrep> {
        let (expired, found) = {
            let mut map = self.lock();
            let expired = Self::drain_expired(&mut map);
            (expired, map.remove(recipient))
        };
        self.settle_expired(expired);
        found
    }

    /// Remove the request for `recipient` and cancel it with `notice` sent to
    /// the requester. Returns whether one existed.
    pub fn cancel(&self, recipient: &PlayerRef, notice: Notice) -> bool {
        match self.take(recipient) {
            Some(prep) => {
                prep.cancel_plan(notice).settle(&self.services);
                true
            }
            None => false,
        }
    }

    /// Cancel every request sent by `requester`, whoever it was sent to.
    pub fn cancel_from(&self, requester: &PlayerRef) -> usize {
        let (expired, mine) = {
            let mut map = self.lock();
            let expired = Self::drain_expired(&mut map);
            let keys: Vec<PlayerRef> = map
                .iter()
                .filter(|(_, prep)| prep.requester == *requester)
                .map(|(k, _)| *k)
                .collect();
            let mine: Vec<(PlayerRef, TeleportPrep)> = keys
                .into_iter()
                .filter_map(|k| map.remove(&k).map(|p| (k, p)))
                .collect();
            (expired, mine)
        };
        self.settle_expired(expired);
        let count = mine.len();
        for (recipient, prep) in mine {
            // The requester gets one summary notice from the caller; only the
            // refund is settled per request.
            debug!("request from {} to {} withdrawn", requester, recipient);
            if let Some(refund) = prep.charged.and_then(|payer| Refund::new(payer, prep.cost)) {
                refund.apply(&self.services);
            }
        }
        count
    }

    /// Sweep out expired requests. Returns how many were removed.
    pub fn clear_expired(&self) -> usize {
        let expired = {
            let mut map = self.lock();
            Self::drain_expired(&mut map)
        };
        let count = expired.len();
        self.settle_expired(expired);
        count
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn drain_expired(map: &mut HashMap<PlayerRef, TeleportPrep>) -> Vec<(PlayerRef, TeleportPrep)> {
        let now = Instant::now();
        let keys: Vec<PlayerRef> = map
            .iter()
            .filter(|(_, prep)| prep.is_expired(now))
            .map(|(k, _)| *k)
            .collect();
        keys.into_iter()
            .filter_map(|k| map.remove(&k).map(|p| (k, p)))
            .collect()
    }

    fn settle_expired(&self, expired: Vec<(PlayerRef, TeleportPrep)>) {
        for (recipient, prep) in expired {
            debug!("request to {} from {} expired", recipient, prep.requester);
            let notice =
                Notice::new(MessageKey::RequestExpired).arg(self.services.name_of(&recipient));
            prep.cancel_plan(notice).settle(&self.services);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PlayerRef, TeleportPrep>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::teleport::order::Charge;
    use crate::teleport::scheduler::TokioScheduler;
    use crate::teleport::test_support::fake_services;
    use crate::teleport::types::TeleportCause;
    use std::sync::Arc;
    use uuid::Uuid;

    fn someone() -> PlayerRef {
        PlayerRef::player(Uuid::new_v4())
    }

    fn paid_prep(requester: PlayerRef, target: PlayerRef, amount: u64) -> TeleportPrep {
        let order = TeleportOrder {
            source: requester,
            from: requester,
            to: target,
            charge: Some(Charge {
                payer: requester,
                amount: Money(amount),
                prepaid: true,
            }),
            warmup: Duration::ZERO,
            safe: true,
            silent: false,
            bypass_toggle: true,
            cause: TeleportCause::Request,
        };
        TeleportPrep::new(requester, order)
    }

    #[test]
    fn only_prepaid_charges_are_owed_back() {
        let (a, b) = (someone(), someone());
        let mut prep = paid_prep(a, b, 10);
        assert_eq!(prep.charged, Some(a));
        assert_eq!(prep.cost, Money(10));

        if let Some(charge) = prep.order.charge.as_mut() {
            charge.prepaid = false;
        }
        let unpaid = TeleportPrep::new(a, prep.order);
        assert_eq!(unpaid.charged, None);
        assert!(unpaid.cost.is_zero());
    }

    #[tokio::test(start_paused = true)]
    async fn replacement_settles_the_older_prep() {
        let (services, ledger) = fake_services(Arc::new(TokioScheduler::start()));
        let registry = PendingRequestRegistry::new(services, DEFAULT_REQUEST_TIMEOUT);
        let (a, b, target) = (someone(), someone(), someone());

        registry.add(target, paid_prep(a, target, 10));
        registry.add(target, paid_prep(b, target, 20));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&target).map(|p| p.requester), Some(b));
        assert_eq!(ledger.deposits(), vec![(a, 10)]);
        assert_eq!(ledger.notices(&a), vec![MessageKey::RequestReplaced]);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_is_observed_on_access_once() {
        let (services, ledger) = fake_services(Arc::new(TokioScheduler::start()));
        let registry = PendingRequestRegistry::new(services, Duration::from_secs(5));
        let (a, target) = (someone(), someone());

        registry.add(target, paid_prep(a, target, 10));
        tokio::time::advance(Duration::from_secs(5)).await;

        // nothing settles until someone looks
        assert!(ledger.deposits().is_empty());
        assert!(registry.take(&target).is_none());
        assert!(registry.is_empty());
        assert_eq!(registry.clear_expired(), 0);
        assert_eq!(ledger.deposits(), vec![(a, 10)]);
        assert_eq!(ledger.notices(&a), vec![MessageKey::RequestExpired]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_from_refunds_without_per_request_notices() {
        let (services, ledger) = fake_services(Arc::new(TokioScheduler::start()));
        let registry = PendingRequestRegistry::new(services, DEFAULT_REQUEST_TIMEOUT);
        let (a, b, c) = (someone(), someone(), someone());

        registry.add(b, paid_prep(a, b, 10));
        registry.add(c, paid_prep(a, c, 10));
        registry.add(a, paid_prep(b, a, 10));

        assert_eq!(registry.cancel_from(&a), 2);
        assert_eq!(registry.len(), 1);
        assert_eq!(ledger.deposits(), vec![(a, 10), (a, 10)]);
        assert!(ledger.notices(&a).is_empty());
    }
}
