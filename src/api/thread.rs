//! Purpose: Caller for the ThreadApi module.
//! Exports: `ThreadApi`.
//! Role: Thread and message operations; a ThreadApi handle lives under a Connection handle.
use bytes::Bytes;

use super::ApiResult;
use super::connection::ConnectionApi;
use super::events::shared_registry;
use super::methods::ThreadApiMethod;
use super::types::{Message, PagingList, PagingQuery, Thread, UserWithPubKey};
use crate::core::channel::{FfiChannel, NativeChannel, NativeModuleFns};
use crate::core::executor::Executor;

pub struct ThreadApi<C = FfiChannel> {
    executor: Executor<C>,
}

impl ThreadApi<FfiChannel> {
    pub fn open(fns: NativeModuleFns, connection: &ConnectionApi<FfiChannel>) -> ApiResult<Self> {
        Ok(Self::new(FfiChannel::open(fns, Some(connection.handle()))?))
    }
}

impl<C: NativeChannel> ThreadApi<C> {
    pub fn new(channel: C) -> Self {
        Self::with_executor(Executor::with_registry(channel, shared_registry()))
    }

    pub fn with_executor(executor: Executor<C>) -> Self {
        Self { executor }
    }

    /// Returns the new thread's id.
    pub fn create_thread(
        &self,
        context_id: &str,
        users: &[UserWithPubKey],
        managers: &[UserWithPubKey],
        public_meta: &Bytes,
        private_meta: &Bytes,
    ) -> ApiResult<String> {
        self.executor.call(
            ThreadApiMethod::CreateThread,
            &[&context_id, &users, &managers, public_meta, private_meta],
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn update_thread(
        &self,
        thread_id: &str,
        users: &[UserWithPubKey],
        managers: &[UserWithPubKey],
        public_meta: &Bytes,
        private_meta: &Bytes,
        version: i64,
        force: bool,
    ) -> ApiResult<()> {
        self.executor.call_void(
            ThreadApiMethod::UpdateThread,
            &[
                &thread_id,
                &users,
                &managers,
                public_meta,
                private_meta,
                &version,
                &force,
            ],
        )
    }

    pub fn get_thread(&self, thread_id: &str) -> ApiResult<Thread> {
        self.executor.call(ThreadApiMethod::GetThread, &[&thread_id])
    }

    pub fn list_threads(&self, context_id: &str, query: &PagingQuery) -> ApiResult<PagingList<Thread>> {
        self.executor.call(
            ThreadApiMethod::ListThreads,
            &[&context_id, &query.skip, &query.limit, &query.sort_order],
        )
    }

    pub fn delete_thread(&self, thread_id: &str) -> ApiResult<()> {
        self.executor
            .call_void(ThreadApiMethod::DeleteThread, &[&thread_id])
    }

    /// Returns the new message's id.
    pub fn send_message(
        &self,
        thread_id: &str,
        public_meta: &Bytes,
        private_meta: &Bytes,
        data: &Bytes,
    ) -> ApiResult<String> {
        self.executor.call(
            ThreadApiMethod::SendMessage,
            &[&thread_id, public_meta, private_meta, data],
        )
    }

    pub fn get_message(&self, message_id: &str) -> ApiResult<Message> {
        self.executor.call(ThreadApiMethod::GetMessage, &[&message_id])
    }

    pub fn list_messages(&self, thread_id: &str, query: &PagingQuery) -> ApiResult<PagingList<Message>> {
        self.executor.call(
            ThreadApiMethod::ListMessages,
            &[&thread_id, &query.skip, &query.limit, &query.sort_order],
        )
    }

    pub fn delete_message(&self, message_id: &str) -> ApiResult<()> {
        self.executor
            .call_void(ThreadApiMethod::DeleteMessage, &[&message_id])
    }

    pub fn subscribe_for_thread_events(&self) -> ApiResult<()> {
        self.executor
            .call_void(ThreadApiMethod::SubscribeForThreadEvents, &[])
    }

    pub fn unsubscribe_from_thread_events(&self) -> ApiResult<()> {
        self.executor
            .call_void(ThreadApiMethod::UnsubscribeFromThreadEvents, &[])
    }

    pub fn subscribe_for_message_events(&self, thread_id: &str) -> ApiResult<()> {
        self.executor
            .call_void(ThreadApiMethod::SubscribeForMessageEvents, &[&thread_id])
    }

    pub fn unsubscribe_from_message_events(&self, thread_id: &str) -> ApiResult<()> {
        self.executor
            .call_void(ThreadApiMethod::UnsubscribeFromMessageEvents, &[&thread_id])
    }
}
