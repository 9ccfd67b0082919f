//! Purpose: Caller for the Connection module.
//! Exports: `ConnectionApi`.
//! Role: Opens the root native handle that the other module handles are created under.
use std::path::Path;

use tracing::info;

use super::ApiResult;
use super::events::shared_registry;
use super::methods::ConnectionMethod;
use super::types::{Context, PagingList, PagingQuery, UserInfo};
use crate::config::BindingConfig;
use crate::core::channel::{FfiChannel, NativeChannel, NativeHandle, NativeModuleFns};
use crate::core::error::{Error, ErrorKind};
use crate::core::executor::Executor;

pub struct ConnectionApi<C = FfiChannel> {
    executor: Executor<C>,
}

impl ConnectionApi<FfiChannel> {
    /// Opens a Connection handle; call `connect` before anything else.
    pub fn open(fns: NativeModuleFns) -> ApiResult<Self> {
        Ok(Self::new(FfiChannel::open(fns, None)?))
    }

    /// Native handle that child modules (threads, stores, inboxes) are opened under.
    pub fn handle(&self) -> &NativeHandle {
        self.executor.channel().handle()
    }
}

impl<C: NativeChannel> ConnectionApi<C> {
    pub fn new(channel: C) -> Self {
        Self::with_executor(Executor::with_registry(channel, shared_registry()))
    }

    pub fn with_executor(executor: Executor<C>) -> Self {
        Self { executor }
    }

    pub fn connect(&self, user_priv_key: &str, solution_id: &str, bridge_url: &str) -> ApiResult<()> {
        self.executor.call_void(
            ConnectionMethod::Connect,
            &[&user_priv_key, &solution_id, &bridge_url],
        )?;
        info!(solution_id, bridge_url, "connected");
        Ok(())
    }

    pub fn connect_public(&self, solution_id: &str, bridge_url: &str) -> ApiResult<()> {
        self.executor
            .call_void(ConnectionMethod::ConnectPublic, &[&solution_id, &bridge_url])
    }

    pub fn get_connection_id(&self) -> ApiResult<i64> {
        self.executor.call(ConnectionMethod::GetConnectionId, &[])
    }

    pub fn list_contexts(&self, query: &PagingQuery) -> ApiResult<PagingList<Context>> {
        self.executor.call(
            ConnectionMethod::ListContexts,
            &[&query.skip, &query.limit, &query.sort_order],
        )
    }

    pub fn list_context_users(
        &self,
        context_id: &str,
        query: &PagingQuery,
    ) -> ApiResult<PagingList<UserInfo>> {
        self.executor.call(
            ConnectionMethod::ListContextUsers,
            &[&context_id, &query.skip, &query.limit, &query.sort_order],
        )
    }

    pub fn disconnect(&self) -> ApiResult<()> {
        self.executor.call_void(ConnectionMethod::Disconnect, &[])?;
        info!("disconnected");
        Ok(())
    }

    pub fn set_certs_path(&self, path: &Path) -> ApiResult<()> {
        let path = path.to_str().ok_or_else(|| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("certs path is not valid UTF-8: {}", path.display()))
        })?;
        self.executor
            .call_void(ConnectionMethod::SetCertsPath, &[&path])
    }

    /// Hands configured settings to the native side.
    pub fn apply_config(&self, config: &BindingConfig) -> ApiResult<()> {
        if let Some(path) = &config.certs_path {
            self.set_certs_path(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ConnectionApi;
    use crate::api::methods::ConnectionMethod;
    use crate::api::types::{PagingQuery, SortOrder};
    use crate::config::BindingConfig;
    use crate::core::channel::{NativeChannel, NativeModule};
    use crate::core::envelope::Envelope;
    use crate::core::error::Error;
    use crate::core::handle::ValueHandle;
    use crate::core::json::{from_json, to_json};
    use crate::core::mapper::Encode;
    use serde_json::{Value, json};
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<(i32, Value)>>,
    }

    impl NativeChannel for Recorder {
        fn module(&self) -> NativeModule {
            NativeModule::Connection
        }

        fn exec(&self, method: i32, args: &ValueHandle) -> Result<ValueHandle, Error> {
            self.calls.borrow_mut().push((method, to_json(args.value())));
            let response = if method == ConnectionMethod::GetConnectionId as i32 {
                Envelope::success(42i64).encode()
            } else if method == ConnectionMethod::ListContexts as i32 {
                from_json(&json!({
                    "status": true,
                    "result": {"totalAvailable": 1, "readItems": [{"userId": "u", "contextId": "c"}]}
                }))
            } else {
                Envelope::<()>::empty().encode()
            };
            Ok(ValueHandle::new(response))
        }
    }

    #[test]
    fn calls_send_positional_arguments() {
        let api = ConnectionApi::new(Recorder::default());
        assert_eq!(api.get_connection_id().expect("id"), 42);
        let page = api
            .list_contexts(&PagingQuery::new(0, 10, SortOrder::Asc))
            .expect("contexts");
        assert_eq!(page.read_items[0].context_id, "c");
        api.disconnect().expect("disconnect");

        let calls = api.executor.channel().calls.borrow();
        assert_eq!(calls[0], (ConnectionMethod::GetConnectionId as i32, json!([])));
        assert_eq!(calls[1], (ConnectionMethod::ListContexts as i32, json!([0, 10, "asc"])));
        assert_eq!(calls[2].0, ConnectionMethod::Disconnect as i32);
    }

    #[test]
    fn apply_config_forwards_certs_path_only_when_set() {
        let api = ConnectionApi::new(Recorder::default());
        api.apply_config(&BindingConfig::default()).expect("no-op");
        assert!(api.executor.channel().calls.borrow().is_empty());

        let config = BindingConfig::from_lookup(|key| {
            (key == "PRIVBRIDGE_CERTS_PATH").then(|| "/etc/ssl/cacert.pem".to_string())
        });
        api.apply_config(&config).expect("certs");
        let calls = api.executor.channel().calls.borrow();
        assert_eq!(
            calls[0],
            (ConnectionMethod::SetCertsPath as i32, json!(["/etc/ssl/cacert.pem"]))
        );
    }
}
