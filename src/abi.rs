//! Purpose: C ABI over dynamic values, their tagged binary form, and the event queue.
//! Exports: `pbx_value_*`, `pbx_object_iter_*`, `pbx_event_queue_*`, `pbx_buf_free`,
//!          `pbx_error_free`, `pbx_init_logging`.
//! Role: What a native library or foreign host links against to build and read values.
//! Invariants: Opaque handles; every `*_new` / out-handle is released by its matching `*_free`.
//! Invariants: `push`/`set`/`queue_push` take ownership of the child even when they fail.
//! Invariants: Borrowed views (strings, binaries, array items, iterator entries) live only as
//!             long as the value they came from is neither mutated nor freed.
//! Invariants: Status returns are `0` ok, `-1` error; error kinds map 1:1 with `ErrorKind`.
#![allow(non_camel_case_types)]

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;
use std::sync::Arc;

use crate::config::{BindingConfig, init_tracing};
use crate::core::error::{Error, ErrorKind, to_abi_code};
use crate::core::event_queue::EventQueue;
use crate::core::handle::{alloc_raw, borrow_ptr, free_raw, take_raw, value_mut, value_ref};
use crate::core::value::{DynamicValue, ValueTag};
use crate::core::wire;

pub use crate::core::handle::pbx_value;

#[repr(C)]
pub struct pbx_buf {
    data: *mut u8,
    len: usize,
}

impl pbx_buf {
    pub fn as_slice(&self) -> &[u8] {
        if self.data.is_null() {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.data, self.len) }
    }
}

impl Default for pbx_buf {
    fn default() -> Self {
        Self {
            data: ptr::null_mut(),
            len: 0,
        }
    }
}

#[repr(C)]
pub struct pbx_error {
    kind: i32,
    message: *mut c_char,
    key: *mut c_char,
    native_code: i64,
    native_name: *mut c_char,
    /// Full `ErrorInfo` as JSON, for hosts that surface scope/description/full.
    native_json: *mut c_char,
    has_native: u8,
}

impl pbx_error {
    pub fn kind(&self) -> i32 {
        self.kind
    }

    pub fn native_code(&self) -> Option<i64> {
        (self.has_native != 0).then_some(self.native_code)
    }

    pub fn native_json(&self) -> Option<&CStr> {
        if self.native_json.is_null() {
            return None;
        }
        Some(unsafe { CStr::from_ptr(self.native_json) })
    }
}

#[repr(C)]
pub struct pbx_object_iter {
    object: *const pbx_value,
    pos: usize,
}

#[repr(C)]
pub struct pbx_event_queue {
    queue: Arc<EventQueue>,
}

impl pbx_event_queue {
    /// Hands an existing queue to foreign code; release with `pbx_event_queue_free`.
    pub fn into_raw(queue: Arc<EventQueue>) -> *mut pbx_event_queue {
        Box::into_raw(Box::new(pbx_event_queue { queue }))
    }

    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn pbx_init_logging() {
    init_tracing(&BindingConfig::from_env());
}

#[unsafe(no_mangle)]
pub extern "C" fn pbx_value_new_null() -> *mut pbx_value {
    alloc_raw(DynamicValue::Null)
}

#[unsafe(no_mangle)]
pub extern "C" fn pbx_value_new_bool(value: u8) -> *mut pbx_value {
    alloc_raw(DynamicValue::Bool(value != 0))
}

#[unsafe(no_mangle)]
pub extern "C" fn pbx_value_new_int32(value: i32) -> *mut pbx_value {
    alloc_raw(DynamicValue::Int32(value))
}

#[unsafe(no_mangle)]
pub extern "C" fn pbx_value_new_int64(value: i64) -> *mut pbx_value {
    alloc_raw(DynamicValue::Int64(value))
}

#[unsafe(no_mangle)]
pub extern "C" fn pbx_value_new_float32(value: f32) -> *mut pbx_value {
    alloc_raw(DynamicValue::Float32(value))
}

#[unsafe(no_mangle)]
pub extern "C" fn pbx_value_new_float64(value: f64) -> *mut pbx_value {
    alloc_raw(DynamicValue::Float64(value))
}

#[unsafe(no_mangle)]
pub extern "C" fn pbx_value_new_array() -> *mut pbx_value {
    alloc_raw(DynamicValue::array())
}

#[unsafe(no_mangle)]
pub extern "C" fn pbx_value_new_object() -> *mut pbx_value {
    alloc_raw(DynamicValue::object())
}

#[unsafe(no_mangle)]
pub extern "C" fn pbx_value_new_string(
    data: *const u8,
    len: usize,
    out_value: *mut *mut pbx_value,
    out_err: *mut *mut pbx_error,
) -> i32 {
    let text = match str_arg(data, len, "string") {
        Ok(text) => text.to_string(),
        Err(err) => return fail(out_err, err),
    };
    write_handle(out_value, DynamicValue::String(text), out_err)
}

#[unsafe(no_mangle)]
pub extern "C" fn pbx_value_new_binary(
    data: *const u8,
    len: usize,
    out_value: *mut *mut pbx_value,
    out_err: *mut *mut pbx_error,
) -> i32 {
    let bytes = match bytes_arg(data, len, "binary") {
        Ok(bytes) => bytes::Bytes::copy_from_slice(bytes),
        Err(err) => return fail(out_err, err),
    };
    write_handle(out_value, DynamicValue::Binary(bytes), out_err)
}

/// Appends `item` to `array`; `item` is consumed either way.
#[unsafe(no_mangle)]
pub extern "C" fn pbx_value_array_push(
    array: *mut pbx_value,
    item: *mut pbx_value,
    out_err: *mut *mut pbx_error,
) -> i32 {
    let item = match take_arg(item, "item") {
        Ok(item) => item,
        Err(err) => return fail(out_err, err),
    };
    let array = match borrow_mut(array, "array") {
        Ok(array) => array,
        Err(err) => return fail(out_err, err),
    };
    match array.push(item) {
        Ok(()) => 0,
        Err(err) => fail(out_err, err),
    }
}

/// Sets `key` on `object`, replacing an existing entry; `item` is consumed either way.
#[unsafe(no_mangle)]
pub extern "C" fn pbx_value_object_set(
    object: *mut pbx_value,
    key: *const u8,
    key_len: usize,
    item: *mut pbx_value,
    out_err: *mut *mut pbx_error,
) -> i32 {
    let item = match take_arg(item, "item") {
        Ok(item) => item,
        Err(err) => return fail(out_err, err),
    };
    let key = match str_arg(key, key_len, "key") {
        Ok(key) => key,
        Err(err) => return fail(out_err, err),
    };
    let object = match borrow_mut(object, "object") {
        Ok(object) => object,
        Err(err) => return fail(out_err, err),
    };
    match object.set(key, item) {
        Ok(()) => 0,
        Err(err) => fail(out_err, err),
    }
}

/// Tag byte of `value`; a null handle reports `Invalid`.
#[unsafe(no_mangle)]
pub extern "C" fn pbx_value_type(value: *const pbx_value) -> u8 {
    if value.is_null() {
        return ValueTag::Invalid as u8;
    }
    unsafe { value_ref(value) }.tag() as u8
}

#[unsafe(no_mangle)]
pub extern "C" fn pbx_value_get_bool(
    value: *const pbx_value,
    out: *mut u8,
    out_err: *mut *mut pbx_error,
) -> i32 {
    let result = borrow(value, "value")
        .and_then(DynamicValue::as_bool)
        .and_then(|flag| write_out(out, u8::from(flag), "out"));
    status(result, out_err)
}

macro_rules! scalar_getter {
    ($name:ident, $ty:ty, $accessor:ident) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn $name(
            value: *const pbx_value,
            out: *mut $ty,
            out_err: *mut *mut pbx_error,
        ) -> i32 {
            let result = borrow(value, "value")
                .and_then(DynamicValue::$accessor)
                .and_then(|scalar| write_out(out, scalar, "out"));
            status(result, out_err)
        }
    };
}

scalar_getter!(pbx_value_get_int32, i32, as_i32);
scalar_getter!(pbx_value_get_int64, i64, as_i64);
scalar_getter!(pbx_value_get_float32, f32, as_f32);
scalar_getter!(pbx_value_get_float64, f64, as_f64);

/// Borrowed UTF-8 view; not NUL-terminated.
#[unsafe(no_mangle)]
pub extern "C" fn pbx_value_get_string(
    value: *const pbx_value,
    out_data: *mut *const u8,
    out_len: *mut usize,
    out_err: *mut *mut pbx_error,
) -> i32 {
    let result = borrow(value, "value")
        .and_then(DynamicValue::as_str)
        .and_then(|text| write_view(out_data, out_len, text.as_bytes()));
    status(result, out_err)
}

#[unsafe(no_mangle)]
pub extern "C" fn pbx_value_get_binary(
    value: *const pbx_value,
    out_data: *mut *const u8,
    out_len: *mut usize,
    out_err: *mut *mut pbx_error,
) -> i32 {
    let result = borrow(value, "value")
        .and_then(DynamicValue::as_binary)
        .and_then(|bytes| write_view(out_data, out_len, bytes));
    status(result, out_err)
}

#[unsafe(no_mangle)]
pub extern "C" fn pbx_value_array_len(
    value: *const pbx_value,
    out_len: *mut usize,
    out_err: *mut *mut pbx_error,
) -> i32 {
    let result = borrow(value, "value")
        .and_then(DynamicValue::as_array)
        .and_then(|items| write_out(out_len, items.len(), "out_len"));
    status(result, out_err)
}

/// Borrowed item handle; never pass it to `pbx_value_free`.
#[unsafe(no_mangle)]
pub extern "C" fn pbx_value_array_get(
    value: *const pbx_value,
    index: usize,
    out_item: *mut *const pbx_value,
    out_err: *mut *mut pbx_error,
) -> i32 {
    let result = borrow(value, "value")
        .and_then(DynamicValue::as_array)
        .and_then(|items| {
            items.get(index).ok_or_else(|| {
                Error::new(ErrorKind::Usage)
                    .with_message(format!("index {index} out of bounds for length {}", items.len()))
            })
        })
        .and_then(|item| write_out(out_item, borrow_ptr(item), "out_item"));
    status(result, out_err)
}

#[unsafe(no_mangle)]
pub extern "C" fn pbx_object_iter_new(
    object: *const pbx_value,
    out_iter: *mut *mut pbx_object_iter,
    out_err: *mut *mut pbx_error,
) -> i32 {
    if let Err(err) = borrow(object, "object").and_then(DynamicValue::as_object) {
        return fail(out_err, err);
    }
    if out_iter.is_null() {
        return fail(out_err, null_arg("out_iter"));
    }
    let iter = Box::new(pbx_object_iter { object, pos: 0 });
    unsafe {
        *out_iter = Box::into_raw(iter);
    }
    0
}

/// Yields the next entry: `1` with borrowed key/value written, `0` when exhausted, `-1` on error.
#[unsafe(no_mangle)]
pub extern "C" fn pbx_object_iter_next(
    iter: *mut pbx_object_iter,
    out_key: *mut *const u8,
    out_key_len: *mut usize,
    out_value: *mut *const pbx_value,
    out_err: *mut *mut pbx_error,
) -> i32 {
    if iter.is_null() {
        return fail(out_err, null_arg("iter"));
    }
    let iter = unsafe { &mut *iter };
    let entries = match borrow(iter.object, "object").and_then(DynamicValue::as_object) {
        Ok(entries) => entries,
        Err(err) => return fail(out_err, err),
    };
    let Some((key, item)) = entries.get(iter.pos) else {
        return 0;
    };
    let written = write_view(out_key, out_key_len, key.as_bytes())
        .and_then(|()| write_out(out_value, borrow_ptr(item), "out_value"));
    if let Err(err) = written {
        return fail(out_err, err);
    }
    iter.pos += 1;
    1
}

#[unsafe(no_mangle)]
pub extern "C" fn pbx_object_iter_free(iter: *mut pbx_object_iter) {
    if iter.is_null() {
        return;
    }
    unsafe {
        drop(Box::from_raw(iter));
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn pbx_value_free(value: *mut pbx_value) {
    unsafe { free_raw(value) };
}

#[unsafe(no_mangle)]
pub extern "C" fn pbx_value_encode(
    value: *const pbx_value,
    out_buf: *mut pbx_buf,
    out_err: *mut *mut pbx_error,
) -> i32 {
    let encoded = match borrow(value, "value").and_then(wire::encode) {
        Ok(encoded) => encoded,
        Err(err) => return fail(out_err, err),
    };
    if out_buf.is_null() {
        return fail(out_err, null_arg("out_buf"));
    }
    let mut data = encoded.to_vec().into_boxed_slice();
    let buf = unsafe { &mut *out_buf };
    buf.len = data.len();
    buf.data = data.as_mut_ptr();
    std::mem::forget(data);
    0
}

#[unsafe(no_mangle)]
pub extern "C" fn pbx_value_decode(
    data: *const u8,
    len: usize,
    out_value: *mut *mut pbx_value,
    out_err: *mut *mut pbx_error,
) -> i32 {
    let value = match bytes_arg(data, len, "data").and_then(wire::decode) {
        Ok(value) => value,
        Err(err) => return fail(out_err, err),
    };
    write_handle(out_value, value, out_err)
}

#[unsafe(no_mangle)]
pub extern "C" fn pbx_event_queue_new() -> *mut pbx_event_queue {
    pbx_event_queue::into_raw(Arc::new(EventQueue::new()))
}

/// Delivers `event` to the queue, waking one waiter; `event` is consumed either way.
#[unsafe(no_mangle)]
pub extern "C" fn pbx_event_queue_push(
    queue: *const pbx_event_queue,
    event: *mut pbx_value,
    out_err: *mut *mut pbx_error,
) -> i32 {
    let event = match take_arg(event, "event") {
        Ok(event) => event,
        Err(err) => return fail(out_err, err),
    };
    if queue.is_null() {
        return fail(out_err, null_arg("queue"));
    }
    unsafe { &*queue }.queue.push(event);
    0
}

#[unsafe(no_mangle)]
pub extern "C" fn pbx_event_queue_free(queue: *mut pbx_event_queue) {
    if queue.is_null() {
        return;
    }
    unsafe {
        drop(Box::from_raw(queue));
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn pbx_buf_free(buf: *mut pbx_buf) {
    if buf.is_null() {
        return;
    }
    unsafe {
        let buf = &mut *buf;
        if !buf.data.is_null() {
            drop(Box::from_raw(ptr::slice_from_raw_parts_mut(buf.data, buf.len)));
        }
        buf.data = ptr::null_mut();
        buf.len = 0;
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn pbx_error_free(err: *mut pbx_error) {
    if err.is_null() {
        return;
    }
    unsafe {
        let err = Box::from_raw(err);
        for text in [err.message, err.key, err.native_name, err.native_json] {
            if !text.is_null() {
                drop(CString::from_raw(text));
            }
        }
    }
}

fn null_arg(name: &str) -> Error {
    Error::new(ErrorKind::Usage).with_message(format!("{name} is null"))
}

fn borrow<'a>(value: *const pbx_value, name: &str) -> Result<&'a DynamicValue, Error> {
    if value.is_null() {
        return Err(null_arg(name));
    }
    Ok(unsafe { value_ref(value) })
}

fn borrow_mut<'a>(value: *mut pbx_value, name: &str) -> Result<&'a mut DynamicValue, Error> {
    if value.is_null() {
        return Err(null_arg(name));
    }
    Ok(unsafe { value_mut(value) })
}

fn take_arg(value: *mut pbx_value, name: &str) -> Result<DynamicValue, Error> {
    if value.is_null() {
        return Err(null_arg(name));
    }
    Ok(unsafe { take_raw(value) })
}

fn bytes_arg<'a>(data: *const u8, len: usize, name: &str) -> Result<&'a [u8], Error> {
    if len == 0 {
        return Ok(&[]);
    }
    if data.is_null() {
        return Err(null_arg(name));
    }
    Ok(unsafe { std::slice::from_raw_parts(data, len) })
}

fn str_arg<'a>(data: *const u8, len: usize, name: &str) -> Result<&'a str, Error> {
    let bytes = bytes_arg(data, len, name)?;
    std::str::from_utf8(bytes).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("{name} is not valid UTF-8"))
            .with_source(err)
    })
}

fn write_out<T>(out: *mut T, value: T, name: &str) -> Result<(), Error> {
    if out.is_null() {
        return Err(null_arg(name));
    }
    unsafe {
        *out = value;
    }
    Ok(())
}

fn write_view(out_data: *mut *const u8, out_len: *mut usize, view: &[u8]) -> Result<(), Error> {
    if out_data.is_null() || out_len.is_null() {
        return Err(null_arg("out_data/out_len"));
    }
    unsafe {
        *out_data = view.as_ptr();
        *out_len = view.len();
    }
    Ok(())
}

fn write_handle(
    out_value: *mut *mut pbx_value,
    value: DynamicValue,
    out_err: *mut *mut pbx_error,
) -> i32 {
    if out_value.is_null() {
        return fail(out_err, null_arg("out_value"));
    }
    unsafe {
        *out_value = alloc_raw(value);
    }
    0
}

fn status(result: Result<(), Error>, out_err: *mut *mut pbx_error) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => fail(out_err, err),
    }
}

fn fail(out_err: *mut *mut pbx_error, err: Error) -> i32 {
    if out_err.is_null() {
        return -1;
    }
    let native = err.native_info();
    let error = Box::new(pbx_error {
        kind: to_abi_code(err.kind()),
        message: to_c_string(&err.to_string()),
        key: err.key().map(to_c_string).unwrap_or(ptr::null_mut()),
        native_code: native.map_or(0, |info| info.code),
        native_name: native
            .map(|info| to_c_string(&info.name))
            .unwrap_or(ptr::null_mut()),
        native_json: native
            .and_then(|info| serde_json::to_string(info).ok())
            .map(|json| to_c_string(&json))
            .unwrap_or(ptr::null_mut()),
        has_native: u8::from(native.is_some()),
    });
    unsafe {
        *out_err = Box::into_raw(error);
    }
    -1
}

fn to_c_string(input: &str) -> *mut c_char {
    CString::new(input)
        .map(|s| s.into_raw())
        .unwrap_or(ptr::null_mut())
}
