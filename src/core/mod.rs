// Value model, marshaling, and the native call protocol.
pub mod channel;
pub mod envelope;
pub mod error;
pub mod event_queue;
pub mod executor;
pub mod handle;
pub mod json;
pub mod mapper;
pub mod registry;
pub mod value;
pub mod wire;
