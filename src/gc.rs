//! Mark-and-sweep heap for shape nodes.
//!
//! Every live `Gc<T>` handle counts as a root, so an object is reclaimed as soon
//! as its last strong handle goes away. The mark-and-sweep pass is a backstop for
//! objects whose eager reclamation had to be deferred, and it is also where weak
//! slots get pruned. `WeakGc<T>` handles never keep their target alive; they carry
//! the generation of the box they were created from and stop resolving once that
//! box is reclaimed or reused.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::ptr::NonNull;
use std::rc::{Rc, Weak};

use serde::Serialize;
use thiserror::Error;

/// Default threshold: collect after this many net allocations
pub const DEFAULT_GC_THRESHOLD: usize = 100;

/// Objects per chunk. Matches the 256 bits of `ChunkBitmask`.
const CHUNK_CAPACITY: usize = 256;

/// Keep at most this many spare guard buffers around.
const GUARD_POOL_LIMIT: usize = 16;

// ============================================================================
// ChunkBitmask - mark bits for one chunk
// ============================================================================

/// 256-bit mark set, one bit per slot of a chunk.
#[derive(Clone, Copy, Default)]
struct ChunkBitmask {
    bits: [u64; 4],
}

impl ChunkBitmask {
    #[inline]
    fn set(&mut self, index: usize) {
        if let Some(word) = self.bits.get_mut(index >> 6) {
            *word |= 1 << (index & 63);
        }
    }

    #[inline]
    fn get(&self, index: usize) -> bool {
        self.bits
            .get(index >> 6)
            .is_some_and(|word| word & (1 << (index & 63)) != 0)
    }

    #[inline]
    fn clear(&mut self) {
        self.bits = [0; 4];
    }

    /// Indices below `len` whose bit is still clear.
    fn iter_unmarked(&self, len: usize) -> impl Iterator<Item = usize> + '_ {
        self.bits
            .iter()
            .enumerate()
            .flat_map(|(word_idx, word)| {
                let mut free = !*word;
                std::iter::from_fn(move || {
                    if free == 0 {
                        return None;
                    }
                    let bit = free.trailing_zeros() as usize;
                    free &= free - 1;
                    Some((word_idx << 6) + bit)
                })
            })
            .take_while(move |index| *index < len)
    }
}

// ============================================================================
// Traceable - how the collector sees an object
// ============================================================================

/// Types stored in a `Heap`.
///
/// `trace` reports strong edges, `trace_weak` hands out every weak slot so the
/// collector can clear the ones whose target died, and `release_memory` lets a
/// full collection drop caches the object can rebuild on demand.
pub trait Traceable: Sized + Default {
    /// Visit all strong `Gc<Self>` references held by this object.
    fn trace<F: FnMut(GcPtr<Self>)>(&self, visitor: F);

    /// Visit all weak references held by this object.
    fn trace_weak<F: FnMut(&mut WeakGc<Self>)>(&mut self, _visitor: F) {}

    /// Drop reconstructible data. Returns true if anything was released.
    fn release_memory(&mut self) -> bool {
        false
    }
}

// ============================================================================
// GcBox - storage for one object
// ============================================================================

/// Internal storage for a GC-managed object.
pub struct GcBox<T: Traceable> {
    /// chunk_idx * CHUNK_CAPACITY + index_in_chunk
    index: usize,

    /// Bumped every time the object is reclaimed, so stale weak handles
    /// can tell a reused box from the object they were created for.
    generation: Cell<u32>,

    data: RefCell<T>,

    /// Number of live `Gc` handles.
    ref_count: Cell<usize>,

    /// Whether this box is on the free list
    pooled: Cell<bool>,
}

impl<T: Traceable> GcBox<T> {
    fn new(index: usize) -> Self {
        Self {
            index,
            generation: Cell::new(0),
            data: RefCell::new(T::default()),
            ref_count: Cell::new(0),
            pooled: Cell::new(false),
        }
    }

    /// Take the object's contents out, leaving a default value behind.
    /// Returns `None` if the data is currently borrowed.
    fn retire(&self) -> Option<T> {
        let mut data = self.data.try_borrow_mut().ok()?;
        let old = std::mem::take(&mut *data);
        self.generation.set(self.generation.get().wrapping_add(1));
        Some(old)
    }

    fn is_dead_for(&self, generation: u32) -> bool {
        self.pooled.get() || self.generation.get() != generation
    }
}

// ============================================================================
// Gc - strong handle
// ============================================================================

/// A strong handle to a GC-managed object.
///
/// Works like `Rc<T>`: cloning increments the reference count and dropping the
/// last handle reclaims the object. Handles must not outlive the `Heap`.
pub struct Gc<T: Traceable> {
    id: usize,
    ptr: NonNull<GcBox<T>>,
    space: Weak<RefCell<Space<T>>>,
}

impl<T: Traceable> Gc<T> {
    /// Borrow the inner data immutably
    pub fn borrow(&self) -> Ref<'_, T> {
        debug_assert!(self.space.strong_count() > 0, "heap dropped");
        unsafe { self.ptr.as_ref().data.borrow() }
    }

    /// Borrow the inner data mutably
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        debug_assert!(self.space.strong_count() > 0, "heap dropped");
        unsafe { self.ptr.as_ref().data.borrow_mut() }
    }

    /// Slot index of the object. Reused after the object is reclaimed.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Generation of the underlying box; `(id, generation)` is unique over the
    /// lifetime of the heap.
    pub fn generation(&self) -> u32 {
        unsafe { self.ptr.as_ref().generation.get() }
    }

    /// Check if two handles point to the same object
    pub fn ptr_eq(a: &Gc<T>, b: &Gc<T>) -> bool {
        a.ptr == b.ptr
    }

    /// Untracked copy for tracing. Must not outlive `self`.
    pub fn copy_ref(&self) -> GcPtr<T> {
        GcPtr {
            id: self.id,
            ptr: self.ptr,
        }
    }

    /// Create a weak handle that does not keep the object alive.
    pub fn downgrade(&self) -> WeakGc<T> {
        WeakGc {
            id: self.id,
            generation: self.generation(),
            ptr: Some(self.ptr),
            space: self.space.clone(),
        }
    }

    /// Number of live strong handles (including this one).
    pub fn strong_count(&self) -> usize {
        unsafe { self.ptr.as_ref().ref_count.get() }
    }
}

impl<T: Traceable> PartialEq for Gc<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl<T: Traceable> Eq for Gc<T> {}

impl<T: Traceable> std::hash::Hash for Gc<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T: Traceable> Clone for Gc<T> {
    fn clone(&self) -> Self {
        if self.space.strong_count() > 0 {
            let gc_box = unsafe { self.ptr.as_ref() };
            if !gc_box.pooled.get() {
                gc_box.ref_count.set(gc_box.ref_count.get() + 1);
            }
        }
        Self {
            id: self.id,
            ptr: self.ptr,
            space: self.space.clone(),
        }
    }
}

impl<T: Traceable> Drop for Gc<T> {
    fn drop(&mut self) {
        // The box memory belongs to the space; once it is gone ptr dangles.
        let Some(space_rc) = self.space.upgrade() else {
            return;
        };

        let gc_box = unsafe { self.ptr.as_ref() };
        if gc_box.pooled.get() {
            return;
        }

        let count = gc_box.ref_count.get().saturating_sub(1);
        gc_box.ref_count.set(count);
        if count > 0 {
            return;
        }

        // Last handle: reclaim now. The old contents are dropped after the
        // space borrow ends so handles they own can reclaim their targets too.
        // If the space is busy the object waits for the next sweep.
        let retired = match space_rc.try_borrow_mut() {
            Ok(mut space) => match gc_box.retire() {
                Some(old) => {
                    space.pool_object(self.ptr);
                    Some(old)
                }
                None => None,
            },
            Err(_) => None,
        };
        drop(space_rc);
        drop(retired);
    }
}

impl<T: Traceable> std::fmt::Debug for Gc<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gc").field("id", &self.id).finish()
    }
}

// ============================================================================
// GcPtr - untracked pointer used while tracing
// ============================================================================

/// A raw pointer to a GC-managed object. Copy and no Drop.
pub struct GcPtr<T: Traceable> {
    pub(crate) id: usize,
    pub(crate) ptr: NonNull<GcBox<T>>,
}

impl<T: Traceable> Copy for GcPtr<T> {}

impl<T: Traceable> Clone for GcPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Traceable> GcPtr<T> {
    pub fn id(&self) -> usize {
        self.id
    }
}

// ============================================================================
// WeakGc - weak handle
// ============================================================================

/// A weak handle. Resolves to `None` once the target has been reclaimed,
/// even if its box was handed out again to a new object.
pub struct WeakGc<T: Traceable> {
    id: usize,
    generation: u32,
    ptr: Option<NonNull<GcBox<T>>>,
    space: Weak<RefCell<Space<T>>>,
}

impl<T: Traceable> WeakGc<T> {
    /// A weak handle that never resolves.
    pub fn new() -> Self {
        Self {
            id: 0,
            generation: 0,
            ptr: None,
            space: Weak::new(),
        }
    }

    fn target(&self) -> Option<&GcBox<T>> {
        let ptr = self.ptr?;
        if self.space.strong_count() == 0 {
            return None;
        }
        let gc_box = unsafe { ptr.as_ref() };
        if gc_box.is_dead_for(self.generation) {
            return None;
        }
        Some(gc_box)
    }

    /// Whether the target is still alive.
    pub fn is_live(&self) -> bool {
        self.target().is_some()
    }

    /// Get a strong handle to the target if it is still alive.
    pub fn upgrade(&self) -> Option<Gc<T>> {
        let gc_box = self.target()?;
        gc_box.ref_count.set(gc_box.ref_count.get() + 1);
        Some(Gc {
            id: self.id,
            ptr: NonNull::from(gc_box),
            space: self.space.clone(),
        })
    }

    /// Whether this handle refers to `target` (and `target` is the object it was
    /// created from, not a later occupant of the same box).
    pub fn refers_to(&self, target: &Gc<T>) -> bool {
        self.ptr == Some(target.ptr) && self.generation == target.generation()
    }

    /// Forget the target.
    pub fn clear(&mut self) {
        self.ptr = None;
        self.space = Weak::new();
    }

    /// Whether `clear` was called (or the collector cleared the slot).
    pub fn is_cleared(&self) -> bool {
        self.ptr.is_none()
    }

    /// Slot index of the target at creation time.
    pub fn id(&self) -> usize {
        self.id
    }
}

impl<T: Traceable> Default for WeakGc<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Traceable> Clone for WeakGc<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            generation: self.generation,
            ptr: self.ptr,
            space: self.space.clone(),
        }
    }
}

impl<T: Traceable> std::fmt::Debug for WeakGc<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakGc")
            .field("id", &self.id)
            .field("live", &self.is_live())
            .finish()
    }
}

// ============================================================================
// AllocError
// ============================================================================

/// Allocation failures reported by the heap.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    #[error("heap limit of {limit} live objects reached ({live} live)")]
    LimitReached { live: usize, limit: usize },

    #[error("heap has been dropped")]
    HeapDropped,
}

// ============================================================================
// Space - the arena
// ============================================================================

struct Space<T: Traceable> {
    /// Fixed-capacity chunks; inner vecs never reallocate, so box pointers stay stable.
    chunks: Vec<Vec<GcBox<T>>>,

    free_list: Vec<NonNull<GcBox<T>>>,

    marked_chunks: Vec<ChunkBitmask>,

    /// Kept between cycles to reuse its capacity.
    mark_stack: Vec<NonNull<GcBox<T>>>,

    /// Contents of swept objects, dropped once the space is no longer borrowed.
    graveyard: Vec<T>,

    /// Set by a collection; weak slots are pruned once the graveyard is empty.
    weak_sweep_pending: bool,

    guard_pool: Vec<Vec<Gc<T>>>,

    /// Incremented on alloc, decremented on reclaim
    net_allocs: isize,

    /// 0 = never collect automatically
    gc_threshold: isize,

    max_live_objects: Option<usize>,

    collections: u64,

    self_weak: Weak<RefCell<Space<T>>>,
}

impl<T: Traceable> Space<T> {
    fn new() -> Self {
        Self {
            chunks: Vec::new(),
            free_list: Vec::new(),
            marked_chunks: Vec::new(),
            mark_stack: Vec::new(),
            graveyard: Vec::new(),
            weak_sweep_pending: false,
            guard_pool: Vec::new(),
            net_allocs: 0,
            gc_threshold: DEFAULT_GC_THRESHOLD as isize,
            max_live_objects: None,
            collections: 0,
            self_weak: Weak::new(),
        }
    }

    fn live_objects(&self) -> usize {
        let total: usize = self.chunks.iter().map(Vec::len).sum();
        total.saturating_sub(self.free_list.len())
    }

    fn alloc_internal(&mut self) -> Result<Gc<T>, AllocError> {
        if let Some(limit) = self.max_live_objects {
            if self.live_objects() >= limit {
                self.collect();
                let live = self.live_objects();
                if live >= limit {
                    return Err(AllocError::LimitReached { live, limit });
                }
            }
        }
        Ok(self.allocate_box())
    }

    /// Hand out a box without checking the live-object cap.
    fn allocate_box(&mut self) -> Gc<T> {
        let ptr = match self.free_list.pop() {
            Some(ptr) => ptr,
            None => self.push_new_box(),
        };
        let gc_box = unsafe { ptr.as_ref() };
        gc_box.ref_count.set(1);
        gc_box.pooled.set(false);
        let index = gc_box.index;

        self.net_allocs += 1;
        if self.gc_threshold > 0 && self.net_allocs >= self.gc_threshold {
            self.collect();
        }

        Gc {
            id: index,
            ptr,
            space: self.self_weak.clone(),
        }
    }

    /// Strong handles to every object that currently has one.
    fn live_handles(&self) -> Vec<Gc<T>> {
        let mut handles = Vec::new();
        for chunk in &self.chunks {
            for gc_box in chunk {
                if gc_box.pooled.get() || gc_box.ref_count.get() == 0 {
                    continue;
                }
                gc_box.ref_count.set(gc_box.ref_count.get() + 1);
                handles.push(Gc {
                    id: gc_box.index,
                    ptr: NonNull::from(gc_box),
                    space: self.self_weak.clone(),
                });
            }
        }
        handles
    }

    fn push_new_box(&mut self) -> NonNull<GcBox<T>> {
        let need_new_chunk = self
            .chunks
            .last()
            .is_none_or(|chunk| chunk.len() >= CHUNK_CAPACITY);
        if need_new_chunk {
            self.chunks.push(Vec::with_capacity(CHUNK_CAPACITY));
            self.marked_chunks.push(ChunkBitmask::default());
        }
        let chunk_idx = self.chunks.len().saturating_sub(1);
        let mut ptr = NonNull::dangling();
        if let Some(chunk) = self.chunks.last_mut() {
            let index = chunk_idx * CHUNK_CAPACITY + chunk.len();
            chunk.push(GcBox::new(index));
            if let Some(gc_box) = chunk.last() {
                ptr = NonNull::from(gc_box);
            }
        }
        ptr
    }

    fn pool_object(&mut self, ptr: NonNull<GcBox<T>>) {
        let gc_box = unsafe { ptr.as_ref() };
        if gc_box.pooled.get() {
            return;
        }
        self.net_allocs -= 1;
        gc_box.pooled.set(true);
        gc_box.ref_count.set(0);
        self.free_list.push(ptr);
    }

    /// Mark phase: every object with a live handle is a root.
    fn mark(&mut self) {
        for bitmask in &mut self.marked_chunks {
            bitmask.clear();
        }

        let mut stack = std::mem::take(&mut self.mark_stack);
        stack.clear();

        for chunk in &self.chunks {
            for gc_box in chunk {
                if !gc_box.pooled.get() && gc_box.ref_count.get() > 0 {
                    stack.push(NonNull::from(gc_box));
                }
            }
        }

        while let Some(ptr) = stack.pop() {
            let gc_box = unsafe { ptr.as_ref() };
            let chunk_idx = gc_box.index / CHUNK_CAPACITY;
            let index_in_chunk = gc_box.index % CHUNK_CAPACITY;

            let Some(bitmask) = self.marked_chunks.get_mut(chunk_idx) else {
                continue;
            };
            if bitmask.get(index_in_chunk) {
                continue;
            }
            bitmask.set(index_in_chunk);

            // An object borrowed mutably right now is in use by its owner, and
            // anything it points to holds a handle count of its own.
            let Ok(data) = gc_box.data.try_borrow() else {
                continue;
            };
            let marked = &self.marked_chunks;
            data.trace(|child: GcPtr<T>| {
                let child_box = unsafe { child.ptr.as_ref() };
                let already = marked
                    .get(child_box.index / CHUNK_CAPACITY)
                    .is_none_or(|bits| bits.get(child_box.index % CHUNK_CAPACITY));
                if !already && !child_box.pooled.get() {
                    stack.push(child.ptr);
                }
            });
        }

        self.mark_stack = stack;
    }

    /// Sweep phase: retire every unmarked object. Returns the number swept.
    fn sweep(&mut self) -> usize {
        let mut unmarked = Vec::new();
        for (chunk, bitmask) in self.chunks.iter().zip(self.marked_chunks.iter()) {
            for index_in_chunk in bitmask.iter_unmarked(chunk.len()) {
                if let Some(gc_box) = chunk.get(index_in_chunk) {
                    if !gc_box.pooled.get() {
                        unmarked.push(NonNull::from(gc_box));
                    }
                }
            }
        }

        let mut swept = 0;
        for ptr in unmarked {
            let gc_box = unsafe { ptr.as_ref() };
            if let Some(old) = gc_box.retire() {
                self.graveyard.push(old);
                self.pool_object(ptr);
                swept += 1;
            }
        }
        swept
    }

    fn collect(&mut self) {
        self.mark();
        let swept = self.sweep();
        self.net_allocs = 0;
        self.collections += 1;
        self.weak_sweep_pending = true;
        tracing::debug!(swept, live = self.live_objects(), "heap collection");
    }

    /// Clear weak slots whose target is gone. Returns the number cleared.
    fn sweep_weak_refs(&mut self) -> usize {
        self.weak_sweep_pending = false;
        let mut cleared = 0;
        for chunk in &self.chunks {
            for gc_box in chunk {
                if gc_box.pooled.get() {
                    continue;
                }
                let Ok(mut data) = gc_box.data.try_borrow_mut() else {
                    continue;
                };
                data.trace_weak(|weak| {
                    if !weak.is_cleared() && !weak.is_live() {
                        weak.clear();
                        cleared += 1;
                    }
                });
            }
        }
        if cleared > 0 {
            tracing::debug!(cleared, "cleared dead weak references");
        }
        cleared
    }

    /// Ask every live object to drop reconstructible data.
    fn release_memory(&mut self) -> usize {
        let mut released = 0;
        for chunk in &self.chunks {
            for gc_box in chunk {
                if gc_box.pooled.get() {
                    continue;
                }
                if let Ok(mut data) = gc_box.data.try_borrow_mut() {
                    if data.release_memory() {
                        released += 1;
                    }
                }
            }
        }
        released
    }

    fn stats(&self) -> GcStats {
        let total_objects: usize = self.chunks.iter().map(Vec::len).sum();
        GcStats {
            total_objects,
            pooled_objects: self.free_list.len(),
            live_objects: total_objects.saturating_sub(self.free_list.len()),
            collections: self.collections,
        }
    }

    fn create_guard(&mut self) -> Guard<T> {
        let storage = self.guard_pool.pop().unwrap_or_default();
        Guard {
            space: self.self_weak.clone(),
            guarded: RefCell::new(storage),
        }
    }
}

impl<T: Traceable> Drop for Space<T> {
    fn drop(&mut self) {
        // Handles still alive see pooled=true and skip the box memory.
        for chunk in &self.chunks {
            for gc_box in chunk {
                gc_box.pooled.set(true);
            }
        }
    }
}

/// Drop retired object contents with the space unborrowed, then prune weak
/// slots if a collection ran. Returns the number of objects dropped.
fn settle<T: Traceable>(space: &Rc<RefCell<Space<T>>>) -> usize {
    let mut dropped = 0;
    loop {
        let dead = match space.try_borrow_mut() {
            Ok(mut s) => std::mem::take(&mut s.graveyard),
            Err(_) => return dropped,
        };
        if dead.is_empty() {
            break;
        }
        dropped += dead.len();
        drop(dead);
    }
    if let Ok(mut s) = space.try_borrow_mut() {
        if s.weak_sweep_pending {
            s.sweep_weak_refs();
        }
    }
    dropped
}

// ============================================================================
// Heap - the public wrapper
// ============================================================================

/// The public face of the arena.
pub struct Heap<T: Traceable> {
    inner: Rc<RefCell<Space<T>>>,
}

impl<T: Traceable> Heap<T> {
    pub fn new() -> Self {
        let inner = Rc::new(RefCell::new(Space::new()));
        inner.borrow_mut().self_weak = Rc::downgrade(&inner);
        Self { inner }
    }

    /// Create a new guard for allocating objects
    pub fn create_guard(&self) -> Guard<T> {
        self.inner.borrow_mut().create_guard()
    }

    /// Allocate an object outside any guard, ignoring the live-object cap.
    /// The returned handle is the only root; meant for objects the owner keeps
    /// for as long as the heap exists.
    pub fn alloc_root(&self) -> Gc<T> {
        let obj = self.inner.borrow_mut().allocate_box();
        settle(&self.inner);
        obj
    }

    /// Handles to every live object, in heap order.
    pub fn live_objects(&self) -> Vec<Gc<T>> {
        self.inner.borrow().live_handles()
    }

    pub fn stats(&self) -> GcStats {
        self.inner.borrow().stats()
    }

    /// Run a mark-and-sweep cycle and prune dead weak slots.
    pub fn collect(&self) {
        self.inner.borrow_mut().collect();
        settle(&self.inner);
    }

    /// Collect, then let every surviving object release reconstructible data.
    /// Returns the number of objects that released something.
    pub fn collect_full(&self) -> usize {
        self.collect();
        let released = self.inner.borrow_mut().release_memory();
        tracing::debug!(released, "released reconstructible memory");
        released
    }

    /// Set the GC threshold (0 = disable automatic collection)
    pub fn set_gc_threshold(&self, threshold: usize) {
        self.inner.borrow_mut().gc_threshold = threshold as isize;
    }

    /// Cap the number of live objects; `None` removes the cap.
    pub fn set_max_live_objects(&self, limit: Option<usize>) {
        self.inner.borrow_mut().max_live_objects = limit;
    }
}

impl<T: Traceable> Default for Heap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Traceable> Clone for Heap<T> {
    fn clone(&self) -> Self {
        Heap {
            inner: self.inner.clone(),
        }
    }
}

// ============================================================================
// Guard - allocation scope
// ============================================================================

/// Allocation scope for a multi-step operation.
///
/// Everything allocated through the guard, or handed to `guard`, stays rooted
/// until the guard is dropped, even if the operation lets go of its own handles
/// in between. Guard storage is pooled by the heap.
pub struct Guard<T: Traceable> {
    space: Weak<RefCell<Space<T>>>,
    guarded: RefCell<Vec<Gc<T>>>,
}

impl<T: Traceable> Guard<T> {
    /// Allocate a default-initialized object and root it in this guard.
    pub fn try_alloc(&self) -> Result<Gc<T>, AllocError> {
        let space = self.space.upgrade().ok_or(AllocError::HeapDropped)?;
        let first = space.borrow_mut().alloc_internal();
        let reclaimed = settle(&space);
        let result = match first {
            // Dropping the swept contents may have freed enough to fit.
            Err(AllocError::LimitReached { .. }) if reclaimed > 0 => {
                let retry = space.borrow_mut().alloc_internal();
                settle(&space);
                retry
            }
            other => other,
        };
        let obj = result?;
        self.guarded.borrow_mut().push(obj.clone());
        Ok(obj)
    }

}

impl<T: Traceable> Drop for Guard<T> {
    fn drop(&mut self) {
        let mut guarded = std::mem::take(self.guarded.get_mut());
        // Release the handles before touching the space: the drops may reclaim.
        guarded.clear();
        if let Some(space) = self.space.upgrade() {
            if let Ok(mut space) = space.try_borrow_mut() {
                if space.guard_pool.len() < GUARD_POOL_LIMIT {
                    space.guard_pool.push(guarded);
                }
            }
        }
    }
}

// ============================================================================
// GcStats
// ============================================================================

/// Heap occupancy counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GcStats {
    /// Total number of boxes (including pooled)
    pub total_objects: usize,
    /// Boxes on the free list
    pub pooled_objects: usize,
    pub live_objects: usize,
    /// Completed mark-and-sweep cycles
    pub collections: u64,
}

// ============================================================================
// Tests
// ============================================================================
