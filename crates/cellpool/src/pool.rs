//! The pool itself: layout, construction, marking, sweeping, and growth.

use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::callbacks::{FreeCallback, MarkCallback, MemoryCallback};
use crate::error::PoolError;
use crate::id::CellId;
use crate::markbits;
use crate::metrics::PoolMetrics;
use crate::tracing_support::internal as trace;

/// The default cell-ID width, matching `OSCAR_POOL_ID_TYPE`'s default of a
/// 32-bit unsigned integer.
pub type DefaultId = u32;

/// A fixed-cell mark-and-sweep object pool.
///
/// `Id` selects the cell-ID width (see [`CellId`]); it defaults to `u32`.
/// `'buf` is the lifetime of a caller-owned buffer for a fixed-arena pool
/// (see [`Pool::new_fixed`]); a growable pool (see [`Pool::new_growable`])
/// owns its backing memory outright and uses `'static`.
///
/// Cell memory and the markbit array are embedded directly in one
/// contiguous backing buffer, laid out as:
///
/// ```text
/// [ cell 0 ][ cell 1 ] ... [ cell count-1 ][ markbits, ceil(count/8) bytes ]
/// ```
///
/// `Pool` is neither `Send` nor `Sync`: it is a single-threaded,
/// cooperative structure, not a shared resource.
pub struct Pool<'buf, Id: CellId = DefaultId> {
    cell_sz: usize,
    count: usize,
    sz: usize,
    raw: NonNull<u8>,
    sweep: usize,
    marked: usize,
    mem_cb: Option<MemoryCallback>,
    mark_cb: Option<MarkCallback<Id>>,
    free_cb: Option<FreeCallback<Id>>,
    metrics: PoolMetrics,
    /// Guards against a callback re-entering the pool. Only ever toggled
    /// around a callback invocation; checked with `debug_assert!` at the
    /// top of every public operation a callback must not call back into.
    in_callback: bool,
    _buffer: PhantomData<&'buf mut ()>,
}

/// Bytes needed for `min_count` cells and their markbits: the minimum a
/// buffer must provide for a pool to be useful at all.
fn min_required(cell_sz: usize, min_count: usize) -> usize {
    min_count * cell_sz + markbits::bytes_for(min_count)
}

/// Decide how many `cell_sz`-byte cells (plus their markbits) fit in `rem`
/// bytes, decrementing from the naive `rem / cell_sz` estimate until the
/// markbit array's own size no longer pushes the total over budget.
///
/// `min_count` is the smallest count the caller will accept: a fixed arena
/// needs at least two cells to be useful, while a growable pool may start
/// from a single cell and rely on growth from there.
fn compute_count(cell_sz: usize, rem: usize, min_count: usize) -> Result<usize, PoolError> {
    let required = min_required(cell_sz, min_count);
    if rem < required {
        return Err(PoolError::BufferTooSmall {
            available: rem,
            required,
        });
    }
    let mut count = rem / cell_sz;
    while count > min_count && count * cell_sz + markbits::bytes_for(count) > rem {
        count -= 1;
    }
    if count < min_count || count * cell_sz + markbits::bytes_for(count) > rem {
        return Err(PoolError::BufferTooSmall {
            available: rem,
            required,
        });
    }
    Ok(count)
}

fn validate_cell_sz<Id: CellId>(cell_sz: usize) -> Result<(), PoolError> {
    let id_width = std::mem::size_of::<Id>();
    if cell_sz < id_width {
        return Err(PoolError::CellTooSmall {
            cell_sz,
            min: id_width,
        });
    }
    if cell_sz % std::mem::align_of::<usize>() != 0 {
        return Err(PoolError::Misaligned { cell_sz });
    }
    Ok(())
}

impl<'buf, Id: CellId> Pool<'buf, Id> {
    /// Build a pool backed by caller-owned memory. The pool never grows:
    /// no memory callback is recorded, which is how later calls know never
    /// to realloc or free `buffer`.
    ///
    /// The whole of `buffer` is partitioned between cells and markbits: this
    /// struct is an ordinary Rust value rather than a header embedded at the
    /// front of `buffer`, so no bytes are reserved for a header (see
    /// `DESIGN.md`). At least two cells are required; use
    /// [`Pool::new_growable`] for a pool that may start from a single cell.
    pub fn new_fixed(
        cell_sz: usize,
        buffer: &'buf mut [u8],
        mark_cb: MarkCallback<Id>,
        free_cb: Option<FreeCallback<Id>>,
    ) -> Result<Self, PoolError> {
        validate_cell_sz::<Id>(cell_sz)?;
        let rem = buffer.len();
        let count = compute_count(cell_sz, rem, 2)?;
        let sz = count * cell_sz + markbits::bytes_for(count);
        buffer[..sz].fill(0);

        // SAFETY: `buffer` is a non-empty slice we were just given a unique
        // borrow of; its pointer is never null.
        let raw = unsafe { NonNull::new_unchecked(buffer.as_mut_ptr()) };

        Ok(Self {
            cell_sz,
            count,
            sz,
            raw,
            sweep: 0,
            marked: 0,
            mem_cb: None,
            mark_cb: Some(mark_cb),
            free_cb,
            metrics: PoolMetrics::default(),
            in_callback: false,
            _buffer: PhantomData,
        })
    }

    /// The number of cells currently addressable.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Collection/allocation counters for this pool. See [`PoolMetrics`].
    #[must_use]
    pub fn metrics(&self) -> PoolMetrics {
        self.metrics
    }

    /// Size in bytes of one cell.
    #[must_use]
    pub fn cell_size(&self) -> usize {
        self.cell_sz
    }

    /// Mark cell `id` as reachable. Idempotent: marking an already-marked
    /// cell again is a no-op. Out-of-range IDs are silently ignored, since
    /// a mark callback legitimately walks structures that may hold stale or
    /// sentinel links.
    pub fn mark(&mut self, id: Id) {
        let idx = id.to_usize();
        if idx >= self.count {
            return;
        }
        let newly_marked = {
            let bits = self.markbits_mut();
            markbits::set_marked(bits, idx)
        };
        if newly_marked {
            self.marked += 1;
        }
    }

    /// A pointer to the first byte of cell `id`, or `None` if `id` is out
    /// of range.
    ///
    /// # Staleness
    ///
    /// The returned pointer is valid only until the next call to
    /// [`Pool::alloc`] or [`Pool::force_gc`] on this pool: a growable pool
    /// may move its backing buffer, and a sweep may zero the cell in place.
    /// Clients must persist cell IDs, not pointers, and re-resolve through
    /// `get` after any such call.
    #[must_use]
    pub fn get(&self, id: Id) -> Option<NonNull<u8>> {
        let idx = id.to_usize();
        if idx >= self.count {
            return None;
        }
        // SAFETY: idx < self.count, so this offset lies within the cell
        // region of the backing buffer.
        unsafe { Some(NonNull::new_unchecked(self.raw.as_ptr().add(idx * self.cell_sz))) }
    }

    /// Obtain a fresh cell ID.
    ///
    /// May invoke the mark callback (and, for growable pools, the memory
    /// callback) if no unmarked cell is immediately available. Returns
    /// `None` if the pool is exhausted: the mark callback failed, growth
    /// failed, or every cell remains reachable after a full cycle.
    pub fn alloc(&mut self) -> Option<Id> {
        debug_assert!(
            !self.in_callback,
            "alloc() must not be called from within a mark/free callback"
        );

        if let Some(id) = self.find_unmarked(self.sweep) {
            self.metrics.record_alloc();
            return Some(id);
        }

        let _span = trace::trace_collection("alloc");

        self.marked = 0;
        if self.run_mark_callback().is_err() {
            return None;
        }
        trace::log_mark_done(self.count, self.marked);

        let threshold = if self.count < 4 {
            1
        } else {
            self.count - self.count / 4
        };
        if self.mem_cb.is_some() && self.marked >= threshold && self.grow().is_err() {
            return None;
        }

        self.sweep = 0;
        let id = self.find_unmarked(0);
        self.metrics.record_collection(u64::from(id.is_some()));
        if id.is_some() {
            self.metrics.record_alloc();
        }
        id
    }

    /// Run an unconditional full mark/sweep cycle: every unreachable cell
    /// is finalized and the whole cell region is zeroed. No growth is
    /// considered. Returns an error if the mark callback fails.
    pub fn force_gc(&mut self) -> Result<(), PoolError> {
        debug_assert!(
            !self.in_callback,
            "force_gc() must not be called from within a mark/free callback"
        );

        let _span = trace::trace_collection("force_gc");

        self.marked = 0;
        self.clear_all_markbits();
        if self.run_mark_callback().is_err() {
            return Err(PoolError::MarkCallbackFailed);
        }
        trace::log_mark_done(self.count, self.marked);

        let mut reclaimed: u64 = 0;
        for idx in 0..self.count {
            let was_marked = {
                let bits = self.markbits_mut();
                markbits::check_and_clear(bits, idx)
            };
            if !was_marked {
                self.invoke_free_cb(Id::from_usize(idx));
                reclaimed += 1;
            }
        }

        // SAFETY: cell_sz * count never exceeds sz (invariant 1).
        unsafe {
            self.raw.as_ptr().write_bytes(0, self.cell_sz * self.count);
        }
        self.sweep = 0;
        self.metrics.record_collection(reclaimed);
        Ok(())
    }

    /// Scan markbits forward from `start`, clearing each bit as it is
    /// observed. On the first unmarked cell, finalize it, zero it, advance
    /// the sweep cursor past it, and return its ID. `None` if the scan
    /// reaches `count` without finding one — at which point the whole
    /// markbit vector from `start` onward has been cleared, so a later
    /// mark phase starts from a clean slate.
    fn find_unmarked(&mut self, start: usize) -> Option<Id> {
        let count = self.count;
        for idx in start..count {
            let was_marked = {
                let bits = self.markbits_mut();
                markbits::check_and_clear(bits, idx)
            };
            if !was_marked {
                let id = Id::from_usize(idx);
                self.invoke_free_cb(id);
                // SAFETY: idx < count, within the cell region.
                unsafe {
                    self.raw
                        .as_ptr()
                        .add(idx * self.cell_sz)
                        .write_bytes(0, self.cell_sz);
                }
                self.sweep = idx + 1;
                trace::log_sweep_result(true, idx);
                return Some(id);
            }
        }
        self.sweep = count;
        trace::log_sweep_result(false, 0);
        None
    }

    /// Double the backing buffer through the memory callback and relocate
    /// the markbit array, which would otherwise be stranded in the middle
    /// of the newly expanded cell region.
    fn grow(&mut self) -> Result<(), PoolError> {
        let old_count = self.count;
        let old_markbits_offset = self.cell_sz * old_count;
        let old_mark_bytes = markbits::bytes_for(old_count);
        let new_sz = self.sz * 2;

        let mut mem_cb = self
            .mem_cb
            .take()
            .expect("grow() is only reached for growable pools");
        let result = mem_cb(Some(self.raw), self.sz, new_sz);
        self.mem_cb = Some(mem_cb);
        let Some(new_raw) = result else {
            return Err(PoolError::AllocationFailed);
        };

        let new_count = compute_count(self.cell_sz, new_sz, 1)?;
        let new_markbits_offset = self.cell_sz * new_count;
        let new_mark_bytes = markbits::bytes_for(new_count);

        // SAFETY: the memory callback preserved the first `self.sz` bytes
        // of `new_raw`, which includes the old markbits at
        // `old_markbits_offset`; `new_markbits_offset + new_mark_bytes`
        // fits within `new_sz` by construction of `compute_count`.
        unsafe {
            let base = new_raw.as_ptr();
            std::ptr::copy(
                base.add(old_markbits_offset),
                base.add(new_markbits_offset),
                old_mark_bytes,
            );
            std::ptr::write_bytes(
                base.add(old_markbits_offset),
                0,
                new_markbits_offset - old_markbits_offset,
            );
            std::ptr::write_bytes(
                base.add(new_markbits_offset).add(old_mark_bytes),
                0,
                new_mark_bytes - old_mark_bytes,
            );
        }

        self.sz = new_sz;
        self.raw = new_raw;
        self.count = new_count;
        self.metrics.record_grow();
        trace::log_grow(old_count, new_count);
        Ok(())
    }

    fn markbits_mut(&mut self) -> &mut [u8] {
        // SAFETY: the markbit region starts at `cell_sz * count` and spans
        // `bytes_for(count)` bytes, both within `sz` (invariant 1).
        unsafe {
            std::slice::from_raw_parts_mut(
                self.raw.as_ptr().add(self.cell_sz * self.count),
                markbits::bytes_for(self.count),
            )
        }
    }

    fn clear_all_markbits(&mut self) {
        self.markbits_mut().fill(0);
    }

    fn run_mark_callback(&mut self) -> Result<(), ()> {
        let mut cb = self
            .mark_cb
            .take()
            .expect("a mark callback is required and is never removed after construction");
        self.in_callback = true;
        let result = cb(self);
        self.in_callback = false;
        self.mark_cb = Some(cb);
        result
    }

    fn invoke_free_cb(&mut self, id: Id) {
        if let Some(mut cb) = self.free_cb.take() {
            self.in_callback = true;
            cb(self, id);
            self.in_callback = false;
            self.free_cb = Some(cb);
        }
    }
}

impl Pool<'static, DefaultId> {
    /// Build a growable pool of `start_count` cells, each `cell_sz` bytes.
    /// The memory callback is used to obtain the backing region; growth
    /// doubles it on demand (see [`Pool::alloc`]).
    pub fn new_growable(
        cell_sz: usize,
        start_count: usize,
        mem_cb: MemoryCallback,
        mark_cb: MarkCallback<DefaultId>,
        free_cb: Option<FreeCallback<DefaultId>>,
    ) -> Result<Self, PoolError> {
        Pool::new_growable_with_id(cell_sz, start_count, mem_cb, mark_cb, free_cb)
    }
}

impl<Id: CellId> Pool<'static, Id> {
    /// Like [`Pool::new_growable`], generic over the cell-ID width.
    pub fn new_growable_with_id(
        cell_sz: usize,
        start_count: usize,
        mut mem_cb: MemoryCallback,
        mark_cb: MarkCallback<Id>,
        free_cb: Option<FreeCallback<Id>>,
    ) -> Result<Self, PoolError> {
        validate_cell_sz::<Id>(cell_sz)?;
        if start_count == 0 {
            return Err(PoolError::ZeroCount);
        }

        // The actual cell count is derived from this initial region via
        // `compute_count` rather than trusted as `start_count` outright, so
        // the pool's invariants hold regardless of how tightly this
        // estimates the markbit overhead for a given cell_sz/start_count
        // ratio (see DESIGN.md). A growable pool may start from a single
        // cell and grow from there, unlike a fixed arena.
        let initial_region = cell_sz * start_count + (cell_sz / 8) + 1;
        let count = compute_count(cell_sz, initial_region, 1)?;
        let sz = count * cell_sz + markbits::bytes_for(count);

        let raw = mem_cb(None, 0, sz).ok_or(PoolError::AllocationFailed)?;
        // SAFETY: `mem_cb` just returned a fresh `sz`-byte allocation.
        unsafe {
            raw.as_ptr().write_bytes(0, sz);
        }

        Ok(Self {
            cell_sz,
            count,
            sz,
            raw,
            sweep: 0,
            marked: 0,
            mem_cb: Some(mem_cb),
            mark_cb: Some(mark_cb),
            free_cb,
            metrics: PoolMetrics::default(),
            in_callback: false,
            _buffer: PhantomData,
        })
    }
}

impl<Id: CellId> Drop for Pool<'_, Id> {
    fn drop(&mut self) {
        if let Some(mut free_cb) = self.free_cb.take() {
            for idx in 0..self.count {
                free_cb(self, Id::from_usize(idx));
            }
        }
        if let Some(mut mem_cb) = self.mem_cb.take() {
            // SAFETY: `self.raw` was obtained from this same callback with
            // `self.sz` bytes, and is released exactly once here.
            mem_cb(Some(self.raw), self.sz, 0);
        }
    }
}
