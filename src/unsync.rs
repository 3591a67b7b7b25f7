//! Lazy value without any synchronization.
//!
//! This module provides [`UnsyncLazy<T, F>`], the single-threaded flavor of
//! the lazy value. It keeps its state in a `RefCell`, which makes it `!Sync`:
//! the compiler refuses to share it between threads, so the "externally
//! synchronized or single-threaded only" contract is enforced statically
//! rather than left to the caller. Moving it to another thread is fine.

use core::cell::RefCell;
use core::convert::Infallible;
use core::fmt;

use crate::error::{Error, Result};
use crate::state::{CacheState, Lookup};
use crate::Lazy;

/// A deferred value with toggleable memoization and no synchronization.
///
/// The supplier `F` runs on first [`get`](Self::get) and, while caching is
/// enabled, its result is reused until [`clear_cache`](Self::clear_cache).
/// With caching disabled every `get` runs the supplier again and any value
/// cached earlier is left in place, to be served again once caching is
/// re-enabled.
///
/// ```
/// use std::cell::Cell;
/// use poly_lazy::UnsyncLazy;
///
/// let calls = Cell::new(0);
/// let lazy = UnsyncLazy::new(|| {
///    calls.set(calls.get() + 1);
///    calls.get()
/// });
///
/// assert_eq!(lazy.get(), 1);
/// assert_eq!(lazy.get(), 1);
/// lazy.clear_cache();
/// assert_eq!(lazy.get(), 2);
/// ```
///
/// It cannot be shared across threads:
///
/// ```compile_fail
/// fn assert_sync<T: Sync>() {}
/// assert_sync::<poly_lazy::UnsyncLazy<i32, fn() -> i32>>();
/// ```
pub struct UnsyncLazy<T, F> {
   supplier: F,
   state: RefCell<CacheState<T>>,
}

impl<T, F> UnsyncLazy<T, F> {
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
         state: RefCell::new(CacheState::new(caching_enabled)),
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

   #[inline]
   pub fn is_caching_enabled(&self) -> bool {
      self.state.borrow().is_caching_enabled()
   }

   /// Enables or disables caching. Does not clear an already cached value.
   #[inline]
   pub fn set_caching_enabled(&self, enabled: bool) {
      self.state.borrow_mut().set_caching_enabled(enabled);
   }

   /// Returns `true` if a computed value is held, whether or not caching is
   /// currently enabled.
   #[inline]
   pub fn is_cached(&self) -> bool {
      self.state.borrow().is_cached()
   }

   /// Drops the cached value, if any. The next caching `get` recomputes.
   #[inline]
   pub fn clear_cache(&self) {
      self.state.borrow_mut().clear();
   }

   /// Returns a clone of the cached value without running the supplier.
   #[inline]
   pub fn cached(&self) -> Option<T>
   where
      T: Clone,
   {
      self.state.borrow().cached().cloned()
   }

   /// Removes the cached value and hands it back.
   ///
   /// Requires exclusive access (`&mut self`), so it never touches the
   /// `RefCell` borrow flag.
   #[inline]
   pub fn take(&mut self) -> Option<T> {
      self.state.get_mut().take()
   }

   /// Consumes the lazy value, returning the supplier and the cached value.
   #[inline]
   pub fn into_inner(self) -> (F, Option<T>) {
      (self.supplier, self.state.into_inner().into_value())
   }

   /// Serves a `get` through `compute`.
   ///
   /// No borrow of the state is held while `compute` runs, so a supplier may
   /// inspect its own instance.
   fn resolve<E>(&self, compute: impl FnOnce() -> Result<T, E>) -> Result<T, E>
   where
      T: Clone,
   {
      let fill = match self.state.borrow().lookup() {
         Lookup::Hit(value) => return Ok(value.clone()),
         Lookup::Fill => true,
         Lookup::Bypass => false,
      };

      let value = compute().inspect_err(|_| log::debug!("lazy value supplier failed"))?;
      if fill {
         log::trace!("lazy value computed and cached");
         Ok(self.state.borrow_mut().fill(value).clone())
      } else {
         log::trace!("lazy value computed with caching disabled");
         Ok(value)
      }
   }

   /// Returns the value, running the supplier when nothing usable is cached.
   ///
   /// Panics raised by the supplier propagate and leave the cache untouched.
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
   /// An `Err` from the supplier is returned unchanged and nothing is cached.
   #[inline]
   pub fn try_get<E>(&self) -> Result<T, E>
   where
      F: Fn() -> Result<T, E>,
      T: Clone,
   {
      self.resolve(&self.supplier)
   }
}

impl<T: Clone, F: Fn() -> T> Lazy<T> for UnsyncLazy<T, F> {
   #[inline]
   fn get(&self) -> T {
      UnsyncLazy::get(self)
   }

   #[inline]
   fn set_caching_enabled(&self, enabled: bool) {
      UnsyncLazy::set_caching_enabled(self, enabled)
   }

   #[inline]
   fn is_caching_enabled(&self) -> bool {
      UnsyncLazy::is_caching_enabled(self)
   }

   #[inline]
   fn is_cached(&self) -> bool {
      UnsyncLazy::is_cached(self)
   }

   #[inline]
   fn clear_cache(&self) {
      UnsyncLazy::clear_cache(self)
   }
}

impl<T, F> From<F> for UnsyncLazy<T, F> {
   /// Wraps `supplier` with caching enabled.
   #[inline]
   fn from(supplier: F) -> Self {
      Self::new(supplier)
   }
}

impl<T: fmt::Debug, F> fmt::Debug for UnsyncLazy<T, F> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_struct("UnsyncLazy");
      match self.state.try_borrow() {
         Ok(state) => d
            .field("caching_enabled", &state.is_caching_enabled())
            .field("value", &state.cached()),
         Err(_) => d.field("value", &format_args!("<borrowed>")),
      };
      d.finish_non_exhaustive()
   }
}
