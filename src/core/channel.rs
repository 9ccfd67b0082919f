//! Purpose: Per-module capability to invoke a native method with dynamic-value arguments.
//! Exports: `NativeModule`, `NativeMethod`, `NativeChannel`, `NativeModuleFns`, `NativeHandle`, `FfiChannel`,
//!          and the raw `NewFn`/`FreeFn`/`ExecFn` signatures.
//! Role: Single seam between the Executor and whatever actually runs the native dispatch.
//! Invariants: Argument handles are only borrowed by the callee; the caller releases them.
//! Invariants: Result handles are owned by the caller as soon as `exec` returns.
//! Invariants: A `NativeHandle` calls its module's `free` exactly once.
use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;

use crate::core::error::{Error, ErrorKind};
use crate::core::handle::{ValueHandle, pbx_value};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum NativeModule {
    Connection,
    ThreadApi,
    StoreApi,
    CryptoApi,
    InboxApi,
    EventQueue,
    BackendRequester,
}

impl NativeModule {
    pub const ALL: [NativeModule; 7] = [
        NativeModule::Connection,
        NativeModule::ThreadApi,
        NativeModule::StoreApi,
        NativeModule::CryptoApi,
        NativeModule::InboxApi,
        NativeModule::EventQueue,
        NativeModule::BackendRequester,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NativeModule::Connection => "Connection",
            NativeModule::ThreadApi => "ThreadApi",
            NativeModule::StoreApi => "StoreApi",
            NativeModule::CryptoApi => "CryptoApi",
            NativeModule::InboxApi => "InboxApi",
            NativeModule::EventQueue => "EventQueue",
            NativeModule::BackendRequester => "BackendRequester",
        }
    }
}

impl fmt::Display for NativeModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stable method id within one module's native dispatch table.
pub trait NativeMethod: Copy + fmt::Debug {
    const MODULE: NativeModule;

    fn id(self) -> i32;
}

pub trait NativeChannel {
    fn module(&self) -> NativeModule;

    /// Runs `method` with borrowed `args`; the returned handle belongs to the caller.
    fn exec(&self, method: i32, args: &ValueHandle) -> Result<ValueHandle, Error>;
}

impl<C: NativeChannel + ?Sized> NativeChannel for &C {
    fn module(&self) -> NativeModule {
        (**self).module()
    }

    fn exec(&self, method: i32, args: &ValueHandle) -> Result<ValueHandle, Error> {
        (**self).exec(method, args)
    }
}

impl<C: NativeChannel + ?Sized> NativeChannel for std::sync::Arc<C> {
    fn module(&self) -> NativeModule {
        (**self).module()
    }

    fn exec(&self, method: i32, args: &ValueHandle) -> Result<ValueHandle, Error> {
        (**self).exec(method, args)
    }
}

/// `new_<Module>(parent)`; `parent` is null for modules that stand alone.
pub type NewFn = unsafe extern "C" fn(parent: *mut c_void) -> *mut c_void;
/// `free_<Module>(handle)`.
pub type FreeFn = unsafe extern "C" fn(handle: *mut c_void);
/// `exec_<Module>(handle, method, args)`.
pub type ExecFn =
    unsafe extern "C" fn(handle: *mut c_void, method: i32, args: *const pbx_value) -> *mut pbx_value;

/// Entry points of one native module, supplied by whoever loaded the library.
#[derive(Clone, Copy)]
pub struct NativeModuleFns {
    pub module: NativeModule,
    pub new: NewFn,
    pub free: FreeFn,
    pub exec: ExecFn,
}

impl fmt::Debug for NativeModuleFns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeModuleFns")
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}

/// Owned native-side state for one module instance.
pub struct NativeHandle {
    ptr: NonNull<c_void>,
    fns: NativeModuleFns,
}

impl NativeHandle {
    pub fn open(fns: NativeModuleFns, parent: Option<&NativeHandle>) -> Result<Self, Error> {
        let parent = parent.map_or(std::ptr::null_mut(), NativeHandle::as_ptr);
        let ptr = unsafe { (fns.new)(parent) };
        let ptr = NonNull::new(ptr).ok_or_else(|| {
            Error::new(ErrorKind::Internal)
                .with_message(format!("new_{} returned null", fns.module))
        })?;
        tracing::debug!(module = %fns.module, "opened native handle");
        Ok(Self { ptr, fns })
    }

    pub fn module(&self) -> NativeModule {
        self.fns.module
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.ptr.as_ptr()
    }
}

// A handle may move between threads; concurrent use of one handle is not offered (no `Sync`).
unsafe impl Send for NativeHandle {}

impl Drop for NativeHandle {
    fn drop(&mut self) {
        unsafe { (self.fns.free)(self.ptr.as_ptr()) };
        tracing::debug!(module = %self.fns.module, "freed native handle");
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeHandle")
            .field("module", &self.fns.module)
            .field("ptr", &self.ptr)
            .finish()
    }
}

/// Channel that dispatches through a module's `exec_<Module>` entry point.
#[derive(Debug)]
pub struct FfiChannel {
    handle: NativeHandle,
}

impl FfiChannel {
    pub fn new(handle: NativeHandle) -> Self {
        Self { handle }
    }

    pub fn open(fns: NativeModuleFns, parent: Option<&NativeHandle>) -> Result<Self, Error> {
        NativeHandle::open(fns, parent).map(Self::new)
    }

    pub fn handle(&self) -> &NativeHandle {
        &self.handle
    }
}

impl NativeChannel for FfiChannel {
    fn module(&self) -> NativeModule {
        self.handle.module()
    }

    fn exec(&self, method: i32, args: &ValueHandle) -> Result<ValueHandle, Error> {
        let raw = unsafe { (self.handle.fns.exec)(self.handle.as_ptr(), method, args.as_ptr()) };
        unsafe { ValueHandle::from_raw(raw) }
    }
}

#[cfg(test)]
mod tests {
    use super::{FfiChannel, NativeChannel, NativeModule, NativeModuleFns};
    use crate::core::error::ErrorKind;
    use crate::core::handle::{ValueHandle, alloc_raw, pbx_value, value_ref};
    use crate::core::value::DynamicValue;
    use std::cell::Cell;
    use std::ffi::c_void;

    thread_local! {
        static OPENED: Cell<usize> = const { Cell::new(0) };
        static FREED: Cell<usize> = const { Cell::new(0) };
    }

    unsafe extern "C" fn fake_new(_parent: *mut c_void) -> *mut c_void {
        OPENED.with(|n| n.set(n.get() + 1));
        Box::into_raw(Box::new(0u64)) as *mut c_void
    }

    unsafe extern "C" fn fake_new_null(_parent: *mut c_void) -> *mut c_void {
        std::ptr::null_mut()
    }

    unsafe extern "C" fn fake_free(handle: *mut c_void) {
        FREED.with(|n| n.set(n.get() + 1));
        drop(unsafe { Box::from_raw(handle as *mut u64) });
    }

    // Echoes `[method, args]` back so the test can see what crossed the boundary.
    unsafe extern "C" fn fake_exec(
        _handle: *mut c_void,
        method: i32,
        args: *const pbx_value,
    ) -> *mut pbx_value {
        let args = unsafe { value_ref(args) }.clone();
        alloc_raw(DynamicValue::Array(vec![DynamicValue::Int32(method), args]))
    }

    unsafe extern "C" fn fake_exec_null(
        _handle: *mut c_void,
        _method: i32,
        _args: *const pbx_value,
    ) -> *mut pbx_value {
        std::ptr::null_mut()
    }

    fn fns() -> NativeModuleFns {
        NativeModuleFns {
            module: NativeModule::ThreadApi,
            new: fake_new,
            free: fake_free,
            exec: fake_exec,
        }
    }

    #[test]
    fn handle_is_freed_exactly_once() {
        let opened = OPENED.with(Cell::get);
        let freed = FREED.with(Cell::get);
        {
            let channel = FfiChannel::open(fns(), None).expect("open");
            assert_eq!(channel.module(), NativeModule::ThreadApi);
        }
        assert_eq!(OPENED.with(Cell::get) - opened, 1);
        assert_eq!(FREED.with(Cell::get) - freed, 1);
    }

    #[test]
    fn exec_passes_method_and_borrowed_args() {
        let channel = FfiChannel::open(fns(), None).expect("open");
        let args = ValueHandle::new(DynamicValue::Array(vec![DynamicValue::string("abc")]));
        let result = channel.exec(4, &args).expect("exec");
        let items = result.value().as_array().expect("array");
        assert_eq!(items[0], DynamicValue::Int32(4));
        assert_eq!(&items[1], args.value());
    }

    #[test]
    fn null_handles_and_results_are_errors() {
        let mut broken = fns();
        broken.new = fake_new_null;
        let err = FfiChannel::open(broken, None).expect_err("null handle");
        assert_eq!(err.kind(), ErrorKind::Internal);

        let mut silent = fns();
        silent.exec = fake_exec_null;
        let channel = FfiChannel::open(silent, None).expect("open");
        let args = ValueHandle::new(DynamicValue::array());
        let err = channel.exec(0, &args).expect_err("null result");
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }
}
