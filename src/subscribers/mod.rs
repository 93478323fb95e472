//! # Event subscribers for the pool supervisor.
//!
//! Provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out, and
//! built-in implementations (feature `logging`).
//!
//! ```text
//! control loop ── publish(Event) ──► Bus ──► fan-out listener ──► SubscriberSet::emit
//!                                                                  ┌──────┼──────┐
//!                                                                  ▼      ▼      ▼
//!                                                             LogWriter Metrics Custom
//! ```

#[cfg(feature = "logging")]
mod embedded;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
