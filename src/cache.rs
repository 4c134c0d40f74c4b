//! Scratch pool for transient vectors, matrices and bounding boxes.
//!
//! Hot paths (matrix revalidation, picking) borrow short-lived values from a
//! [`ScratchPool`] instead of constructing fresh ones. The pool keeps one
//! free list per type. Values handed out still carry whatever the previous
//! borrower left in them: callers overwrite before reading.
//!
//! Borrowing goes through the [`Pooled`] guard, which returns the value on
//! drop. Because the guard owns the value and is consumed when released, a
//! value cannot be returned twice or used after it went back.
//!
//! Whether free lists are locked is chosen once, by type: [`Local`] pools are
//! single-threaded and lock-free, [`Shared`] pools guard every free list with
//! a mutex and can be shared between threads.

use std::cell::RefCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, trace};

use crate::bounds::{BoundingBox, ParaxialBoundingBox};
use crate::math::{Matrix2, Matrix3, Matrix4, Vector2, Vector3, Vector4};

/// Storage behind one free list.
pub trait FreeListCell<T>: Default {
    /// Removes and returns the most recently released value.
    fn pop(&self) -> Option<T>;
    /// Releases a value onto the list.
    fn push(&self, value: T);
    /// Number of values waiting on the list.
    fn len(&self) -> usize;
    /// Returns `true` if no value is waiting on the list.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Drops every waiting value, returning how many there were.
    fn clear(&self) -> usize;
}

impl<T> FreeListCell<T> for RefCell<Vec<T>> {
    fn pop(&self) -> Option<T> {
        self.borrow_mut().pop()
    }

    fn push(&self, value: T) {
        self.borrow_mut().push(value);
    }

    fn len(&self) -> usize {
        self.borrow().len()
    }

    fn clear(&self) -> usize {
        let mut items = self.borrow_mut();
        let drained = items.len();
        items.clear();
        drained
    }
}

impl<T> FreeListCell<T> for Mutex<Vec<T>> {
    fn pop(&self) -> Option<T> {
        self.lock().unwrap_or_else(PoisonError::into_inner).pop()
    }

    fn push(&self, value: T) {
        self.lock().unwrap_or_else(PoisonError::into_inner).push(value);
    }

    fn len(&self) -> usize {
        self.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn clear(&self) -> usize {
        let mut items = self.lock().unwrap_or_else(PoisonError::into_inner);
        let drained = items.len();
        items.clear();
        drained
    }
}

/// Selects how a pool's free lists are guarded.
pub trait SyncMode: 'static {
    /// Free-list storage for values of type `T`.
    type List<T>: FreeListCell<T>;
}

/// Unlocked free lists for single-threaded use.
#[derive(Debug, Clone, Copy, Default)]
pub struct Local;

/// Mutex-guarded free lists; the pool is `Sync`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Shared;

impl SyncMode for Local {
    type List<T> = RefCell<Vec<T>>;
}

impl SyncMode for Shared {
    type List<T> = Mutex<Vec<T>>;
}

/// One per-type free list plus its miss counter.
pub struct FreeList<T, M: SyncMode> {
    items: M::List<T>,
    allocated: AtomicUsize,
}

impl<T, M: SyncMode> Default for FreeList<T, M> {
    fn default() -> Self {
        Self {
            items: Default::default(),
            allocated: AtomicUsize::new(0),
        }
    }
}

/// Types that can be borrowed from a [`ScratchPool`].
pub trait Poolable: Default + Sized {
    /// The pool's free list for this type.
    fn free_list<M: SyncMode>(pool: &ScratchPool<M>) -> &FreeList<Self, M>;
}

macro_rules! impl_poolable {
    ($($ty:ty => $field:ident),* $(,)?) => {
        $(
            impl Poolable for $ty {
                fn free_list<M: SyncMode>(pool: &ScratchPool<M>) -> &FreeList<Self, M> {
                    &pool.$field
                }
            }
        )*
    };
}

/// Per-type free lists of scratch values.
///
/// Construct one per subsystem that drives a hot loop and pass it down;
/// there is no process-wide instance.
pub struct ScratchPool<M: SyncMode = Local> {
    vector2: FreeList<Vector2, M>,
    vector3: FreeList<Vector3, M>,
    vector4: FreeList<Vector4, M>,
    matrix2: FreeList<Matrix2, M>,
    matrix3: FreeList<Matrix3, M>,
    matrix4: FreeList<Matrix4, M>,
    bounding_box: FreeList<BoundingBox, M>,
    paraxial: FreeList<ParaxialBoundingBox, M>,
}

impl_poolable! {
    Vector2 => vector2,
    Vector3 => vector3,
    Vector4 => vector4,
    Matrix2 => matrix2,
    Matrix3 => matrix3,
    Matrix4 => matrix4,
    BoundingBox => bounding_box,
    ParaxialBoundingBox => paraxial,
}

impl<M: SyncMode> ScratchPool<M> {
    /// Creates a pool with empty free lists.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrows a value, allocating one if the free list is empty.
    ///
    /// The contents are stale; overwrite them before reading.
    #[must_use]
    pub fn get<T: Poolable>(&self) -> Pooled<'_, T, M> {
        Pooled {
            pool: self,
            value: self.take(),
            detached: false,
        }
    }

    /// Takes a value out of the pool without a guard.
    ///
    /// The value is owned by the caller; hand it back with [`put`](Self::put)
    /// or let it drop.
    #[must_use]
    pub fn take<T: Poolable>(&self) -> T {
        let list = T::free_list(self);
        if let Some(value) = list.items.pop() {
            return value;
        }
        let total = list.allocated.fetch_add(1, Ordering::Relaxed) + 1;
        trace!(kind = std::any::type_name::<T>(), total, "scratch pool miss");
        T::default()
    }

    /// Releases a value onto its free list.
    pub fn put<T: Poolable>(&self, value: T) {
        T::free_list(self).items.push(value);
    }

    /// Releases every present value; `None` entries are skipped.
    pub fn put_all<T, I>(&self, values: I)
    where
        T: Poolable,
        I: IntoIterator<Item = Option<T>>,
    {
        let list = T::free_list(self);
        for value in values.into_iter().flatten() {
            list.items.push(value);
        }
    }

    /// Allocates `count` values of type `T` up front.
    pub fn prewarm<T: Poolable>(&self, count: usize) {
        let list = T::free_list(self);
        for _ in 0..count {
            list.items.push(T::default());
        }
        list.allocated.fetch_add(count, Ordering::Relaxed);
    }

    /// Number of values of type `T` waiting to be borrowed.
    #[must_use]
    pub fn available<T: Poolable>(&self) -> usize {
        T::free_list(self).items.len()
    }

    /// Number of values of type `T` this pool has ever allocated.
    #[must_use]
    pub fn allocated<T: Poolable>(&self) -> usize {
        T::free_list(self).allocated.load(Ordering::Relaxed)
    }

    /// Drains every free list. Values currently borrowed are unaffected and
    /// are accepted back when released.
    pub fn clear(&self) -> usize {
        let drained = self.vector2.items.clear()
            + self.vector3.items.clear()
            + self.vector4.items.clear()
            + self.matrix2.items.clear()
            + self.matrix3.items.clear()
            + self.matrix4.items.clear()
            + self.bounding_box.items.clear()
            + self.paraxial.items.clear();
        debug!(drained, "scratch pool cleared");
        drained
    }
}

impl<M: SyncMode> Default for ScratchPool<M> {
    fn default() -> Self {
        Self {
            vector2: FreeList::default(),
            vector3: FreeList::default(),
            vector4: FreeList::default(),
            matrix2: FreeList::default(),
            matrix3: FreeList::default(),
            matrix4: FreeList::default(),
            bounding_box: FreeList::default(),
            paraxial: FreeList::default(),
        }
    }
}

impl<M: SyncMode> fmt::Debug for ScratchPool<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScratchPool")
            .field("mode", &std::any::type_name::<M>())
            .field("vector3", &self.vector3.items.len())
            .field("matrix4", &self.matrix4.items.len())
            .field("bounding_box", &self.bounding_box.items.len())
            .finish_non_exhaustive()
    }
}

/// A value borrowed from a [`ScratchPool`], returned when dropped.
pub struct Pooled<'p, T: Poolable, M: SyncMode = Local> {
    pool: &'p ScratchPool<M>,
    value: T,
    detached: bool,
}

impl<T: Poolable, M: SyncMode> Pooled<'_, T, M> {
    /// Keeps the value instead of returning it to the pool.
    #[must_use]
    pub fn into_inner(mut self) -> T {
        self.detached = true;
        std::mem::take(&mut self.value)
    }
}

impl<T: Poolable, M: SyncMode> Deref for Pooled<'_, T, M> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Poolable, M: SyncMode> DerefMut for Pooled<'_, T, M> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: Poolable, M: SyncMode> Drop for Pooled<'_, T, M> {
    fn drop(&mut self) {
        if !self.detached {
            self.pool.put(std::mem::take(&mut self.value));
        }
    }
}

impl<T: Poolable + fmt::Debug, M: SyncMode> fmt::Debug for Pooled<'_, T, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pooled").field(&self.value).finish()
    }
}
