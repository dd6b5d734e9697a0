//! Callback types and the generic default memory callback.
//!
//! A pool has three callback slots: a memory-provisioning callback, a mark
//! callback, and an optional finalizer. Each is a boxed `FnMut` closure, so
//! callers capture whatever state they need directly rather than threading
//! an opaque context parameter through every call.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// A memory-provisioning callback.
///
/// Semantics, keyed on the inputs:
/// - `ptr = None` → behave as an allocation of `new_sz` bytes.
/// - `new_sz = 0` → behave as a release of `ptr`.
/// - both present and nonzero → behave as a realloc, preserving
///   `min(old_sz, new_sz)` bytes at the start of the region.
///
/// Returns `None` on allocation failure.
pub type MemoryCallback = Box<dyn FnMut(Option<NonNull<u8>>, usize, usize) -> Option<NonNull<u8>>>;

/// A mark callback: traverses the client's root set and calls
/// [`crate::Pool::mark`] on every reachable cell ID. Returns `Err(())` on
/// failure, which propagates as a failed `alloc`/`force_gc`.
///
/// Quantified over the pool's buffer lifetime (`for<'p> FnMut(&mut
/// Pool<'p, Id>) ...`, written here with an elided `'_`): the callback
/// never stores the reference past the call, so it must work for whatever
/// lifetime the pool it is invoked on happens to carry.
pub type MarkCallback<Id> = Box<dyn FnMut(&mut crate::Pool<'_, Id>) -> Result<(), ()>>;

/// An optional finalizer, invoked once per swept cell before it is zeroed.
pub type FreeCallback<Id> = Box<dyn FnMut(&mut crate::Pool<'_, Id>, Id)>;

/// Alignment used for the backing buffer: pointer alignment, matching the
/// requirement that `cell_sz` be a multiple of it.
const BUFFER_ALIGN: usize = std::mem::align_of::<usize>();

fn layout_for(size: usize) -> Layout {
    Layout::from_size_align(size.max(1), BUFFER_ALIGN).expect("pool buffer layout overflow")
}

/// The generic default memory callback: a realloc-style wrapper over
/// `std::alloc`.
#[must_use]
pub fn generic_memory_callback() -> MemoryCallback {
    Box::new(|ptr, old_sz, new_sz| match (ptr, new_sz) {
        (None, 0) => None,
        (None, _) => {
            // SAFETY: layout_for never produces a zero-sized layout.
            let raw = unsafe { alloc::alloc(layout_for(new_sz)) };
            NonNull::new(raw)
        }
        (Some(p), 0) => {
            // SAFETY: `p` was allocated by this same callback with `old_sz`.
            unsafe { alloc::dealloc(p.as_ptr(), layout_for(old_sz)) };
            None
        }
        (Some(p), _) => {
            // SAFETY: `p` was allocated by this same callback with
            // `layout_for(old_sz)`, and `new_sz` is nonzero.
            let raw = unsafe { alloc::realloc(p.as_ptr(), layout_for(old_sz), new_sz) };
            NonNull::new(raw)
        }
    })
}
