//! # Waypoint - Teleport coordination for game-server admin plugins
//!
//! Waypoint is the engine behind `tpa`, `tpahere`, `tpaccept`, `tpdeny` and
//! admin teleports: delayed, chargeable, cancelable moves with a pending
//! request phase. The host server plugs in through small traits (economy,
//! player directory, permissions, preferences, messaging) and the engine
//! guarantees:
//!
//! - **One at a time**: at most one warmup per moving player and one pending
//!   request per recipient; a newer one cancels the older.
//! - **Refund on cancel**: anything charged is paid back when a request is
//!   denied, replaced or expires, or when a warmed-up teleport cannot complete.
//! - **Main-thread moves**: warmups fire on the serialized main executor.
//!   Handler entry points are command handlers and must be called from the
//!   main executor too, since a teleport without warmup moves inline (checked
//!   with a debug assertion).
//! - **Lazy expiry**: requests expire on access instead of each holding a timer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use waypoint::config::Config;
//! use waypoint::teleport::{Services, TeleportHandler};
//!
//! async fn wire(services: Services) -> anyhow::Result<Arc<TeleportHandler>> {
//!     let config = Config::load("waypoint.toml").await?;
//!     config.validate()?;
//!     let handler = Arc::new(TeleportHandler::new(services, config.teleport));
//!     handler.spawn_maintenance();
//!     Ok(handler)
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`teleport`] - Scheduler, registries, orders, executions and the handler façade
//! - [`config`] - Configuration loading and validation
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │ TeleportHandler │ ← accept / deny / request / admin entry points
//! └─────────────────┘
//!     │          │
//! ┌────────┐ ┌──────────┐
//! │Requests│ │ Warmups  │ ← per-player slots, lazy expiry / cancelable tasks
//! └────────┘ └──────────┘
//!          │
//! ┌─────────────────┐
//! │   Scheduler     │ ← main executor actor + async timers
//! └─────────────────┘
//! ```

pub mod config;
pub mod teleport;
