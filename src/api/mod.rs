//! Purpose: Method-shaped callers over the native modules, plus their record and event shapes.
//! Exports: `ConnectionApi`, `ThreadApi`, `EventQueueApi`, `ApiResult`, and the `methods`,
//!          `types`, `events` modules.
//! Role: Thin layer; every call goes through `Executor` and never touches values directly.
//! Invariants: Arguments are passed positionally in the order the native dispatch expects.

pub mod connection;
pub mod event_queue;
pub mod events;
pub mod methods;
pub mod thread;
pub mod types;

pub use connection::ConnectionApi;
pub use event_queue::EventQueueApi;
pub use thread::ThreadApi;

use crate::core::error::Error;

pub type ApiResult<T> = Result<T, Error>;
