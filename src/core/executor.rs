//! Purpose: The one implementation of "call a native method, get a typed result or an error".
//! Exports: `Executor`.
//! Role: encode args -> invoke channel -> decode envelope -> release both values -> resolve.
//! Invariants: Argument and result values are released exactly once on every exit path.
//! Invariants: No state survives between calls; no retries; every call is a single attempt.
//! Invariants: Business errors surface as `ErrorKind::Native`, shape errors as `ErrorKind::Protocol`.
use std::sync::Arc;

use tracing::{Level, debug, debug_span, trace, warn};

use crate::core::channel::{NativeChannel, NativeMethod};
use crate::core::envelope::Envelope;
use crate::core::error::{Error, ErrorKind};
use crate::core::handle::ValueHandle;
use crate::core::json;
use crate::core::mapper::{Decode, DecodeContext, Encode, ErasedRegistry};
use crate::core::registry::TypeRegistry;

pub struct Executor<C> {
    channel: C,
    registry: Option<Arc<ErasedRegistry>>,
}

impl<C: NativeChannel> Executor<C> {
    /// Executor without a type registry; polymorphic results decode as their base shape.
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            registry: None,
        }
    }

    /// Executor resolving polymorphic `T` results through `registry`.
    pub fn with_registry<T: 'static>(channel: C, registry: Arc<TypeRegistry<T>>) -> Self {
        let registry: Arc<ErasedRegistry> = registry;
        Self {
            channel,
            registry: Some(registry),
        }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Call whose result is discarded.
    pub fn call_void<M: NativeMethod>(&self, method: M, args: &[&dyn Encode]) -> Result<(), Error> {
        self.invoke::<M, ()>(method, args)?.resolve().map(|_| ())
    }

    /// Call that must produce a result; absence is a protocol error.
    pub fn call<M: NativeMethod, T: Decode>(
        &self,
        method: M,
        args: &[&dyn Encode],
    ) -> Result<T, Error> {
        self.call_opt(method, args)?.ok_or_else(|| {
            Error::protocol(format!(
                "{}::{method:?} returned no result",
                self.channel.module()
            ))
        })
    }

    /// Call whose result may legitimately be absent (non-blocking polls).
    pub fn call_opt<M: NativeMethod, T: Decode>(
        &self,
        method: M,
        args: &[&dyn Encode],
    ) -> Result<Option<T>, Error> {
        self.invoke(method, args)?.resolve()
    }

    fn invoke<M: NativeMethod, T: Decode>(
        &self,
        method: M,
        args: &[&dyn Encode],
    ) -> Result<Envelope<T>, Error> {
        let module = self.channel.module();
        if M::MODULE != module {
            return Err(Error::new(ErrorKind::Usage).with_message(format!(
                "{}::{method:?} dispatched on a {module} channel",
                M::MODULE
            )));
        }
        let span = debug_span!("native_call", %module, method = ?method, id = method.id());
        let _enter = span.enter();

        let args = ValueHandle::new(args.encode());
        let result = self.channel.exec(method.id(), &args)?;
        if tracing::enabled!(Level::TRACE) {
            trace!(envelope = %json::to_json(result.value()), "native response");
        }

        let cx = DecodeContext::from_erased(self.registry.as_deref());
        let envelope = Envelope::<T>::decode(result.value(), &cx);
        drop(result);
        drop(args);

        match &envelope {
            Ok(Envelope { error: Some(info), .. }) => {
                debug!(code = info.code, name = %info.name, "native call failed");
            }
            Ok(_) => debug!("native call succeeded"),
            Err(err) => warn!(error = %err, "native response did not match the expected shape"),
        }
        envelope
    }
}

#[cfg(test)]
mod tests {
    use super::Executor;
    use crate::core::channel::{NativeChannel, NativeMethod, NativeModule};
    use crate::core::envelope::Envelope;
    use crate::core::error::{Error, ErrorInfo, ErrorKind};
    use crate::core::handle::{ValueHandle, tracking};
    use crate::core::json::from_json;
    use crate::core::mapper::Encode;
    use serde_json::json;
    use std::cell::Cell;

    #[derive(Clone, Copy, Debug)]
    enum ListMethod {
        Delete = 2,
        Get = 3,
        List = 4,
    }

    impl NativeMethod for ListMethod {
        const MODULE: NativeModule = NativeModule::ThreadApi;

        fn id(self) -> i32 {
            self as i32
        }
    }

    #[derive(Debug, Default)]
    struct Item {
        item_id: String,
    }

    crate::record!(Item {
        ItemId(required) => item_id,
    });

    #[derive(Debug, Default)]
    struct Page {
        total: i64,
        items: Vec<Item>,
    }

    crate::record!(Page {
        TotalAvailable(required) => total,
        ReadItems(required) => items,
    });

    #[derive(Clone, Copy, Debug)]
    enum Outcome {
        Success,
        Business,
        MissingStatus,
        WrongResultShape,
        ChannelFailure,
    }

    struct ScriptedChannel {
        outcome: Cell<Outcome>,
    }

    impl NativeChannel for ScriptedChannel {
        fn module(&self) -> NativeModule {
            NativeModule::ThreadApi
        }

        fn exec(&self, _method: i32, args: &ValueHandle) -> Result<ValueHandle, Error> {
            assert!(args.value().as_array().is_ok());
            let response = match self.outcome.get() {
                Outcome::Success => from_json(&json!({
                    "status": true,
                    "result": {"totalAvailable": 1, "readItems": [{"itemId": "i-1"}]}
                })),
                Outcome::Business => Envelope::<()>::failure(ErrorInfo {
                    code: 100,
                    name: "InvalidArgument".to_string(),
                    message: "bad limit".to_string(),
                    ..ErrorInfo::default()
                })
                .encode(),
                Outcome::MissingStatus => from_json(&json!({"result": null})),
                Outcome::WrongResultShape => from_json(&json!({
                    "status": true,
                    "result": {"totalAvailable": "two", "readItems": []}
                })),
                Outcome::ChannelFailure => {
                    return Err(Error::new(ErrorKind::Internal).with_message("native crashed"));
                }
            };
            Ok(ValueHandle::new(response))
        }
    }

    fn next_random(state: &mut u64) -> u64 {
        *state ^= *state << 13;
        *state ^= *state >> 7;
        *state ^= *state << 17;
        *state
    }

    #[test]
    fn every_outcome_releases_each_value_exactly_once() {
        let executor = Executor::new(ScriptedChannel {
            outcome: Cell::new(Outcome::Success),
        });
        let outcomes = [
            Outcome::Success,
            Outcome::Business,
            Outcome::MissingStatus,
            Outcome::WrongResultShape,
            Outcome::ChannelFailure,
        ];
        let mut seed = 0x9E37_79B9_7F4A_7C15u64;
        let mut expected_allocs = 0;
        let before = tracking::snapshot();

        for _ in 0..5000 {
            let outcome = outcomes[(next_random(&mut seed) % outcomes.len() as u64) as usize];
            executor.channel().outcome.set(outcome);
            let limit = (next_random(&mut seed) % 100) as i64;
            let result: Result<Page, Error> = executor.call(
                ListMethod::List,
                &[&"ctx", &0i64, &limit, &"desc"],
            );
            expected_allocs += match outcome {
                Outcome::ChannelFailure => 1,
                _ => 2,
            };
            match outcome {
                Outcome::Success => {
                    let page = result.expect("ok");
                    assert_eq!(page.total, 1);
                    assert_eq!(page.items[0].item_id, "i-1");
                }
                Outcome::Business => assert!(result.expect_err("business").is_native()),
                Outcome::ChannelFailure => {
                    assert_eq!(result.expect_err("channel").kind(), ErrorKind::Internal)
                }
                _ => assert!(result.expect_err("shape").is_protocol()),
            }
        }

        let after = tracking::snapshot();
        assert_eq!(after.0 - before.0, expected_allocs);
        assert_eq!(after.1 - before.1, expected_allocs);
    }

    #[test]
    fn required_result_must_be_present() {
        struct EmptyChannel;
        impl NativeChannel for EmptyChannel {
            fn module(&self) -> NativeModule {
                NativeModule::ThreadApi
            }
            fn exec(&self, _method: i32, _args: &ValueHandle) -> Result<ValueHandle, Error> {
                Ok(ValueHandle::new(Envelope::<()>::empty().encode()))
            }
        }

        let executor = Executor::new(EmptyChannel);
        let err = executor
            .call::<_, Item>(ListMethod::Get, &[&"t-1"])
            .expect_err("absent");
        assert!(err.is_protocol());
        let absent: Option<Item> = executor
            .call_opt(ListMethod::Get, &[&"t-1"])
            .expect("optional");
        assert!(absent.is_none());
        executor
            .call_void(ListMethod::Delete, &[&"t-1"])
            .expect("void");
    }

    #[test]
    fn method_from_another_module_is_rejected_before_encoding() {
        struct Unreachable;
        impl NativeChannel for Unreachable {
            fn module(&self) -> NativeModule {
                NativeModule::StoreApi
            }
            fn exec(&self, _method: i32, _args: &ValueHandle) -> Result<ValueHandle, Error> {
                unreachable!("must not dispatch")
            }
        }

        let before = tracking::snapshot();
        let err = Executor::new(Unreachable)
            .call_void(ListMethod::Delete, &[&"t-1"])
            .expect_err("wrong module");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(tracking::snapshot(), before);
    }
}
