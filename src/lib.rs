//! Purpose: Binding layer between Rust callers and a native collaboration library's C ABI.
//! Exports: `core` (values, marshaling, call protocol), `api` (module callers, records, events),
//!          `abi` (C-callable value primitives), `config` (settings and logging init).
//! Role: Library crate; also built as a cdylib/staticlib so the native side can link `pbx_*`.
//! Invariants: Every value crossing the boundary is released exactly once.
//! Invariants: Core modules take their collaborators (registry, channel) as explicit inputs.
//! Invariants: `core` never depends on `api`; event types plug in through `TypeRegistry<Event>`.
pub mod abi;
pub mod api;
pub mod config;
pub mod core;

pub use crate::core::error::{Error, ErrorInfo, ErrorKind};
pub use crate::core::executor::Executor;
pub use crate::core::value::{DynamicValue, ValueTag};
