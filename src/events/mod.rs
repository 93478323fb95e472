//! Pool events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: the supervisor control loop, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the fan-out listener spawned by `Supervisor::run` (feeds
//!   `SubscriberSet`), and any receiver obtained through `PoolHandle::subscribe`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
