//! Purpose: Owned, boundary-crossing form of a `DynamicValue` with guaranteed release.
//! Exports: `pbx_value`, `ValueHandle`, `alloc_raw`, `free_raw`, `take_raw`, `borrow_ptr`.
//! Role: Every value handed to or received from native code lives behind one of these.
//! Invariants: One allocation is matched by exactly one release; `ValueHandle` releases on drop.
//! Invariants: Raw pointers only leave a handle through `into_raw`, which gives up ownership.
//! Notes: Test builds track allocations per thread so leak/double-free checks can run in parallel.
use std::ptr::NonNull;

use crate::core::error::{Error, ErrorKind};
use crate::core::value::DynamicValue;

#[allow(non_camel_case_types)]
#[repr(transparent)]
pub struct pbx_value {
    value: DynamicValue,
}

/// Views a value nested inside another handle as a `pbx_value`; the pointer is borrowed.
pub fn borrow_ptr(value: &DynamicValue) -> *const pbx_value {
    (value as *const DynamicValue).cast()
}

pub fn alloc_raw(value: DynamicValue) -> *mut pbx_value {
    #[cfg(test)]
    tracking::on_alloc();
    Box::into_raw(Box::new(pbx_value { value }))
}

/// # Safety
/// `ptr` must come from `alloc_raw` and must not have been released already.
pub unsafe fn free_raw(ptr: *mut pbx_value) {
    if ptr.is_null() {
        return;
    }
    #[cfg(test)]
    tracking::on_release();
    unsafe { drop(Box::from_raw(ptr)) };
}

/// # Safety
/// `ptr` must be non-null, live, and not mutated for the returned lifetime.
pub unsafe fn value_ref<'a>(ptr: *const pbx_value) -> &'a DynamicValue {
    unsafe { &(*ptr).value }
}

/// # Safety
/// `ptr` must be non-null, live, and not aliased for the returned lifetime.
pub unsafe fn value_mut<'a>(ptr: *mut pbx_value) -> &'a mut DynamicValue {
    unsafe { &mut (*ptr).value }
}

/// # Safety
/// `ptr` must come from `alloc_raw`; ownership moves into the returned value.
pub unsafe fn take_raw(ptr: *mut pbx_value) -> DynamicValue {
    #[cfg(test)]
    tracking::on_release();
    let boxed = unsafe { Box::from_raw(ptr) };
    boxed.value
}

/// Scope guard over one allocated value. Dropping it is the release.
#[derive(Debug)]
pub struct ValueHandle {
    ptr: NonNull<pbx_value>,
}

impl ValueHandle {
    pub fn new(value: DynamicValue) -> Self {
        let ptr = alloc_raw(value);
        // Box allocations are never null.
        Self {
            ptr: unsafe { NonNull::new_unchecked(ptr) },
        }
    }

    /// Adopts a handle produced on the other side of the boundary.
    ///
    /// # Safety
    /// A non-null `ptr` must come from `alloc_raw` and be owned by nobody else.
    pub unsafe fn from_raw(ptr: *mut pbx_value) -> Result<Self, Error> {
        NonNull::new(ptr)
            .map(|ptr| Self { ptr })
            .ok_or_else(|| Error::new(ErrorKind::Protocol).with_message("native call returned null value"))
    }

    pub fn value(&self) -> &DynamicValue {
        unsafe { value_ref(self.ptr.as_ptr()) }
    }

    /// Borrowed pointer for the duration of a native call; ownership stays here.
    pub fn as_ptr(&self) -> *const pbx_value {
        self.ptr.as_ptr()
    }

    pub fn into_raw(self) -> *mut pbx_value {
        let ptr = self.ptr.as_ptr();
        std::mem::forget(self);
        ptr
    }

    pub fn into_value(self) -> DynamicValue {
        let ptr = self.into_raw();
        unsafe { take_raw(ptr) }
    }
}

impl Drop for ValueHandle {
    fn drop(&mut self) {
        unsafe { free_raw(self.ptr.as_ptr()) };
    }
}

// The tree is exclusively owned and has no interior mutability.
unsafe impl Send for ValueHandle {}
