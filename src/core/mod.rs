//! Runtime core: the supervisor and its control loop.
//!
//! Public API from this module: [`Supervisor`], [`SupervisorBuilder`],
//! [`PoolHandle`], [`PoolConfig`], the hook traits, and the worker views.
//!
//! Internal modules:
//! - [`pool`]: the state machine behind the control loop;
//! - [`startup`]: decides whether a new worker started;
//! - [`reload`]: rolling reload queue and callback bookkeeping;
//! - [`registry`]: active and retiring workers;
//! - [`timer`]: cancellable per-worker timers;
//! - [`signals`]: cross-platform OS signal handling.

mod builder;
mod command;
mod config;
mod handle;
mod hooks;
mod pool;
mod registry;
mod reload;
mod signals;
mod startup;
mod supervisor;
mod timer;
mod worker;


pub use builder::SupervisorBuilder;
pub use config::{PoolConfig, WORKER_ID_ENV};
pub use handle::PoolHandle;
pub use hooks::{DefaultHooks, MessageHandler, ReloadHooks};
pub use reload::ReloadCallback;
pub use supervisor::Supervisor;
pub use worker::{LifecycleState, WorkerId, WorkerInfo};

pub(crate) use command::{Command, CommandTx, HostSignal};
