//! Lazy value coordinated by an exclusive lock.
//!
//! This module provides [`SyncLazy<T, F>`], the thread-safe flavor of the
//! lazy value. Every operation, including plain flag reads, runs while
//! holding the instance's [`StateLock`], and `get` keeps holding it for the
//! whole supplier call. A slow supplier therefore stalls every other caller
//! of the same instance; in exchange, concurrent callers racing to fill an
//! empty cache run the supplier exactly once and all observe its result.
//!
//! The supplier itself runs inside the lock's reentry window, so it may call
//! any method of its own instance from the same thread without deadlocking.

use core::cell::UnsafeCell;
use core::convert::Infallible;
use core::fmt;

use crate::error::{Error, Result};
use crate::lock::StateLock;
use crate::state::{CacheState, Lookup};
use crate::Lazy;

/// A deferred value with toggleable memoization, safe to share between
/// threads.
///
/// Same contract as [`UnsyncLazy`](crate::UnsyncLazy), with every operation
/// linearizable per instance. The lock is reentrant for the supplier: while
/// `get` runs it, the supplier may read or change its own instance (flags,
/// cache, even a nested `get`) on the same thread. Anything it changes is
/// applied before the outer `get` stores its result. Other threads, and code
/// running inside `T`'s `Clone`, `Drop` or `Debug` while the lock is held,
/// cannot re-enter and block as usual.
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use poly_lazy::SyncLazy;
///
/// let calls = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&calls);
/// let lazy = Arc::new(SyncLazy::new(move || counter.fetch_add(1, Ordering::SeqCst) + 1));
///
/// let threads: Vec<_> = (0..4)
///    .map(|_| {
///       let lazy = Arc::clone(&lazy);
///       std::thread::spawn(move || lazy.get())
///    })
///    .collect();
/// for handle in threads {
///    assert_eq!(handle.join().unwrap(), 1);
/// }
/// assert_eq!(calls.load(Ordering::SeqCst), 1);
/// ```
pub struct SyncLazy<T, F> {
   supplier: F,
   state: UnsafeCell<CacheState<T>>,
   lock: StateLock,
}

impl<T, F> SyncLazy<T, F> {
   /// Creates an uncached lazy value with caching enabled.
   #[inline]
   #[must_use]
   pub const fn new(supplier: F) -> Self {
      Self::with_caching(supplier, true)
   }

   /// Creates an uncached lazy value with the given caching mode.
   #[inline]
   #[must_use]
   pub const fn with_caching(supplier: F, caching_enabled: bool) -> Self {
      Self {
         supplier,
         state: UnsafeCell::new(CacheState::new(caching_enabled)),
         lock: StateLock::new(),
      }
   }

   /// Like [`new`](Self::new), but fails with [`Error::InvalidArgument`] when
   /// no supplier is given.
   #[inline]
   pub fn try_new(supplier: Option<F>) -> Result<Self> {
      Self::try_with_caching(supplier, true)
   }

   /// Like [`with_caching`](Self::with_caching), but fails with
   /// [`Error::InvalidArgument`] when no supplier is given.
   #[inline]
   pub fn try_with_caching(supplier: Option<F>, caching_enabled: bool) -> Result<Self> {
      match supplier {
         Some(supplier) => Ok(Self::with_caching(supplier, caching_enabled)),
         None => Err(Error::supplier_required()),
      }
   }

   /// Returns the supplier this value was built from.
   #[inline]
   pub fn supplier(&self) -> &F {
      &self.supplier
   }

   /// Runs `f` with exclusive access to the state, blocking until the lock is
   /// free.
   #[inline]
   fn locked<R>(&self, f: impl FnOnce(&mut CacheState<T>) -> R) -> R {
      let _guard = self.lock.lock();
      // SAFETY: We hold the lock and no reentry window is open while this
      // guard lives, so no other reference to the state exists.
      f(unsafe { &mut *self.state.get() })
   }

   /// Like [`locked`](Self::locked), but gives up instead of blocking.
   #[inline]
   fn try_locked<R>(&self, f: impl FnOnce(&mut CacheState<T>) -> R) -> Option<R> {
      let _guard = self.lock.try_lock()?;
      // SAFETY: See `locked`.
      Some(f(unsafe { &mut *self.state.get() }))
   }

   #[inline]
   pub fn is_caching_enabled(&self) -> bool {
      self.locked(|state| state.is_caching_enabled())
   }

   /// Enables or disables caching. Does not clear an already cached value.
   #[inline]
   pub fn set_caching_enabled(&self, enabled: bool) {
      self.locked(|state| state.set_caching_enabled(enabled));
   }

   /// Returns `true` if a computed value is held, whether or not caching is
   /// currently enabled.
   #[inline]
   pub fn is_cached(&self) -> bool {
      self.locked(|state| state.is_cached())
   }

   /// Drops the cached value, if any. The next caching `get` recomputes.
   #[inline]
   pub fn clear_cache(&self) {
      self.locked(|state| state.clear());
   }

   /// Non-blocking [`is_cached`](Self::is_cached).
   ///
   /// Returns `None` if another operation (possibly a supplier call on another
   /// thread) holds the lock right now. From inside this instance's own
   /// supplier it always answers.
   #[inline]
   pub fn try_is_cached(&self) -> Option<bool> {
      self.try_locked(|state| state.is_cached())
   }

   /// Non-blocking [`is_caching_enabled`](Self::is_caching_enabled).
   ///
   /// Returns `None` if another operation holds the lock right now.
   #[inline]
   pub fn try_is_caching_enabled(&self) -> Option<bool> {
      self.try_locked(|state| state.is_caching_enabled())
   }

   /// Returns a clone of the cached value without running the supplier.
   #[inline]
   pub fn cached(&self) -> Option<T>
   where
      T: Clone,
   {
      self.locked(|state| state.cached().cloned())
   }

   /// Removes the cached value and hands it back.
   ///
   /// Requires exclusive access (`&mut self`), so it never blocks.
   #[inline]
   pub fn take(&mut self) -> Option<T> {
      self.state.get_mut().take()
   }

   /// Consumes the lazy value, returning the supplier and the cached value.
   #[inline]
   pub fn into_inner(self) -> (F, Option<T>) {
      (self.supplier, self.state.into_inner().into_value())
   }

   /// Serves a `get` through `compute` with the lock held throughout.
   ///
   /// `compute` runs inside the reentry window with no borrow of the state
   /// alive. If it fails or panics, the guard releases the lock and the state
   /// is left as the supplier left it.
   fn resolve<E>(&self, compute: impl FnOnce() -> Result<T, E>) -> Result<T, E>
   where
      T: Clone,
   {
      let guard = self.lock.lock();

      // SAFETY: We hold the lock with the reentry window closed, so no other
      // reference to the state exists. The borrow ends before `compute` runs.
      let fill = match unsafe { (*self.state.get()).lookup() } {
         Lookup::Hit(value) => return Ok(value.clone()),
         Lookup::Fill => true,
         Lookup::Bypass => false,
      };

      let value = guard
         .allow_reentry(compute)
         .inspect_err(|_| log::debug!("lazy value supplier failed"))?;
      if fill {
         log::trace!("lazy value computed and cached");
         // SAFETY: Still holding the lock, and the window is closed again.
         Ok(unsafe { (*self.state.get()).fill(value) }.clone())
      } else {
         log::trace!("lazy value computed with caching disabled");
         Ok(value)
      }
   }

   /// Returns the value, running the supplier when nothing usable is cached.
   ///
   /// Callers that arrive while the cache is being filled block and then
   /// receive the freshly cached value. A panicking supplier releases the
   /// lock and leaves the cache empty.
   #[inline]
   pub fn get(&self) -> T
   where
      F: Fn() -> T,
      T: Clone,
   {
      match self.resolve(|| Ok::<_, Infallible>((self.supplier)())) {
         Ok(value) => value,
         Err(never) => match never {},
      }
   }

   /// Returns the value, running the fallible supplier when nothing usable is
   /// cached.
   ///
   /// An `Err` from the supplier is returned unchanged to this caller and
   /// nothing is cached; callers blocked behind it then try again themselves.
   #[inline]
   pub fn try_get<E>(&self) -> Result<T, E>
   where
      F: Fn() -> Result<T, E>,
      T: Clone,
   {
      self.resolve(&self.supplier)
   }
}

impl<T: Clone, F: Fn() -> T> Lazy<T> for SyncLazy<T, F> {
   #[inline]
   fn get(&self) -> T {
      SyncLazy::get(self)
   }

   #[inline]
   fn set_caching_enabled(&self, enabled: bool) {
      SyncLazy::set_caching_enabled(self, enabled)
   }

   #[inline]
   fn is_caching_enabled(&self) -> bool {
      SyncLazy::is_caching_enabled(self)
   }

   #[inline]
   fn is_cached(&self) -> bool {
      SyncLazy::is_cached(self)
   }

   #[inline]
   fn clear_cache(&self) {
      SyncLazy::clear_cache(self)
   }
}

// SAFETY:
// The state is only touched while holding the lock, so `T` is never accessed
// from two threads at once, but values may be created, cloned and dropped on
// any thread (`T: Send`). The supplier is called through `&F` from any thread
// and exposed via `supplier()`, hence `F: Sync`.
unsafe impl<T: Send, F: Sync> Sync for SyncLazy<T, F> {}

impl<T, F> From<F> for SyncLazy<T, F> {
   /// Wraps `supplier` with caching enabled.
   #[inline]
   fn from(supplier: F) -> Self {
      Self::new(supplier)
   }
}

impl<T: fmt::Debug, F> fmt::Debug for SyncLazy<T, F> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_struct("SyncLazy");
      let printed = self.try_locked(|state| {
         d.field("caching_enabled", &state.is_caching_enabled())
            .field("value", &state.cached());
      });
      if printed.is_none() {
         d.field("value", &format_args!("<locked>"));
      }
      d.finish_non_exhaustive()
   }
}
