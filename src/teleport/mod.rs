//! Teleport request, warmup and refund coordination.
//!
//! Leaf to root: [`scheduler`] (cancelable delayed jobs), [`warmup`] (one
//! pending warmup per player), [`order`] and [`execution`] (what to move and
//! the move itself), [`requests`] (one pending `tpa` per recipient) and the
//! [`handler`] façade tying them together.

pub mod cancel;
mod context;
pub mod cooldown;
pub mod errors;
pub mod execution;
pub mod handler;
pub mod order;
pub mod ports;
pub mod requests;
pub mod scheduler;
#[cfg(test)]
mod test_support;
pub mod types;
pub mod warmup;

pub use cancel::{CancelPlan, Refund};
pub use errors::TeleportError;
pub use execution::{Outcome, TeleportExecution};
pub use handler::TeleportHandler;
pub use order::{Charge, Started, TeleportBuilder, TeleportOrder};
pub use ports::{
    Economy, Messenger, PermissionOracle, PlayerDirectory, Services, UserPreferences,
    PERM_COOLDOWN_BYPASS, PERM_NO_COST, PERM_TOGGLE_BYPASS, PERM_WARMUP_BYPASS,
};
pub use requests::{PendingRequestRegistry, TeleportPrep, DEFAULT_REQUEST_TIMEOUT};
pub use scheduler::{Executor, Job, Scheduler, TaskHandle, TokioScheduler};
pub use types::{Location, MessageKey, Money, Notice, PlayerRef, Position, Rotation, TeleportCause};
pub use warmup::{ScheduledAction, WarmupRegistry};
