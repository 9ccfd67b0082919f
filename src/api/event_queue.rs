//! Purpose: Caller for the EventQueue module.
//! Exports: `EventQueueApi`.
//! Role: Turns queued event values into typed `Event`s through the type registry, and serves an
//!       in-process `EventQueue` as the EventQueue module.
//! Invariants: `wait_event` blocks until an event or a break arrives; `get_event` never blocks.
use std::sync::Arc;

use super::ApiResult;
use super::events::{Event, shared_registry};
use super::methods::EventQueueMethod;
use crate::core::channel::{FfiChannel, NativeChannel, NativeModule, NativeModuleFns};
use crate::core::envelope::Envelope;
use crate::core::error::{Error, ErrorInfo};
use crate::core::event_queue::EventQueue;
use crate::core::executor::Executor;
use crate::core::handle::ValueHandle;
use crate::core::mapper::Encode;

pub struct EventQueueApi<C = FfiChannel> {
    executor: Executor<C>,
}

impl EventQueueApi<FfiChannel> {
    pub fn open(fns: NativeModuleFns) -> ApiResult<Self> {
        Ok(Self::new(FfiChannel::open(fns, None)?))
    }
}

impl EventQueueApi<Arc<EventQueue>> {
    /// Caller over an in-process queue, fed through `pbx_event_queue_push` or `EventQueue::push`.
    pub fn local(queue: Arc<EventQueue>) -> Self {
        Self::new(queue)
    }
}

impl<C: NativeChannel> EventQueueApi<C> {
    pub fn new(channel: C) -> Self {
        Self::with_executor(Executor::with_registry(channel, shared_registry()))
    }

    pub fn with_executor(executor: Executor<C>) -> Self {
        Self { executor }
    }

    pub fn wait_event(&self) -> ApiResult<Event> {
        self.executor.call(EventQueueMethod::WaitEvent, &[])
    }

    pub fn get_event(&self) -> ApiResult<Option<Event>> {
        self.executor.call_opt(EventQueueMethod::GetEvent, &[])
    }

    pub fn emit_break_event(&self) -> ApiResult<()> {
        self.executor.call_void(EventQueueMethod::EmitBreakEvent, &[])
    }
}

impl NativeChannel for EventQueue {
    fn module(&self) -> NativeModule {
        NativeModule::EventQueue
    }

    fn exec(&self, method: i32, _args: &ValueHandle) -> Result<ValueHandle, Error> {
        let envelope = match EventQueueMethod::from_id(method) {
            Some(EventQueueMethod::WaitEvent) => Envelope::success(self.wait_event()),
            Some(EventQueueMethod::GetEvent) => match self.get_event() {
                Some(event) => Envelope::success(event),
                None => Envelope::empty(),
            },
            Some(EventQueueMethod::EmitBreakEvent) => {
                self.emit_break();
                Envelope::empty()
            }
            None => Envelope::failure(ErrorInfo {
                code: -1,
                name: "UnknownMethod".to_string(),
                scope: NativeModule::EventQueue.name().to_string(),
                message: format!("no EventQueue method with id {method}"),
                ..ErrorInfo::default()
            }),
        };
        Ok(ValueHandle::new(envelope.encode()))
    }
}
