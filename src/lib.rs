//! Deferred values with toggleable memoization.
//!
//! A lazy value wraps a zero-argument supplier. Nothing runs until the value
//! is first requested; after that the result is cached and reused until the
//! cache is cleared. Caching can be switched off and on at runtime: while it
//! is off every request runs the supplier again, and a value cached earlier
//! stays put, to be served again once caching is back on.
//!
//! Two flavors share one state machine and the [`Lazy<T>`] trait:
//!
//! - [`UnsyncLazy<T, F>`]: no synchronization at all. It is `!Sync`, so the
//!   compiler keeps it on one thread at a time.
//! - [`SyncLazy<T, F>`]: every operation runs under an exclusive lock built on
//!   `parking_lot`'s futex-based parking. Concurrent callers racing to fill an
//!   empty cache run the supplier once and all observe its result.
//!
//! Values are handed out by clone. Wrap expensive or identity-sensitive
//! payloads in an [`Arc`](std::sync::Arc) to share the one cached instance.
//!
//! # Examples
//!
//! ## Counting supplier
//!
//! ```rust
//! use std::cell::Cell;
//! use poly_lazy::UnsyncLazy;
//!
//! let counter = Cell::new(0);
//! let lazy = UnsyncLazy::new(|| {
//!     counter.set(counter.get() + 1);
//!     counter.get()
//! });
//!
//! assert_eq!(lazy.get(), 1);
//! assert_eq!(lazy.get(), 1); // cached
//! lazy.clear_cache();
//! assert_eq!(lazy.get(), 2);
//! ```
//!
//! ## Toggling the cache
//!
//! ```rust
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use poly_lazy::SyncLazy;
//!
//! let next = AtomicU32::new(0);
//! let lazy = SyncLazy::new(|| next.fetch_add(1, Ordering::Relaxed));
//!
//! assert_eq!(lazy.get(), 0);
//! lazy.set_caching_enabled(false);
//! assert_eq!(lazy.get(), 1); // bypasses the cache
//! assert!(lazy.is_cached()); // ...but does not clear it
//! lazy.set_caching_enabled(true);
//! assert_eq!(lazy.get(), 0);
//! ```

/// Error type.
mod error;

/// Exclusive lock for the coordinated flavor.
mod lock;

/// Memoization state machine.
mod state;

/// Lock-coordinated lazy value.
mod sync;

/// Unsynchronized lazy value.
mod unsync;

use std::borrow::Cow;
use std::rc::Rc;
use std::sync::Arc;

pub use error::{Error, Result};
pub use sync::SyncLazy;
pub use unsync::UnsyncLazy;

/// The capability shared by both lazy flavors.
///
/// Generic code can accept `impl Lazy<T>` (or `&dyn Lazy<T>`) and stay
/// agnostic of whether the value it is handed is coordinated.
pub trait Lazy<T> {
   /// Returns the value, running the supplier unless caching is enabled and a
   /// value is cached.
   fn get(&self) -> T;

   /// Enables or disables caching without clearing the cache.
   fn set_caching_enabled(&self, enabled: bool);

   /// Returns the caching flag.
   fn is_caching_enabled(&self) -> bool;

   /// Returns `true` if a computed value is held.
   fn is_cached(&self) -> bool;

   /// Drops the cached value, if any.
   fn clear_cache(&self);
}

macro_rules! forward_lazy {
   ($($ptr:ty),* $(,)?) => {$(
      impl<T, L: Lazy<T> + ?Sized> Lazy<T> for $ptr {
         #[inline]
         fn get(&self) -> T {
            (**self).get()
         }

         #[inline]
         fn set_caching_enabled(&self, enabled: bool) {
            (**self).set_caching_enabled(enabled)
         }

         #[inline]
         fn is_caching_enabled(&self) -> bool {
            (**self).is_caching_enabled()
         }

         #[inline]
         fn is_cached(&self) -> bool {
            (**self).is_cached()
         }

         #[inline]
         fn clear_cache(&self) {
            (**self).clear_cache()
         }
      }
   )*};
}

forward_lazy!(&L, Box<L>, Rc<L>, Arc<L>);

/// Creates an unsynchronized lazy value with caching enabled.
#[inline]
pub fn unsync<T, F: Fn() -> T>(supplier: F) -> UnsyncLazy<T, F> {
   UnsyncLazy::new(supplier)
}

/// Creates an unsynchronized lazy value with the given caching mode.
#[inline]
pub fn unsync_with_caching<T, F: Fn() -> T>(supplier: F, caching_enabled: bool) -> UnsyncLazy<T, F> {
   UnsyncLazy::with_caching(supplier, caching_enabled)
}

/// Creates a lock-coordinated lazy value with caching enabled.
#[inline]
pub fn sync<T, F: Fn() -> T>(supplier: F) -> SyncLazy<T, F> {
   SyncLazy::new(supplier)
}

/// Creates a lock-coordinated lazy value with the given caching mode.
#[inline]
pub fn sync_with_caching<T, F: Fn() -> T>(supplier: F, caching_enabled: bool) -> SyncLazy<T, F> {
   SyncLazy::with_caching(supplier, caching_enabled)
}

/// Checks that a lazy value is present.
///
/// Returns `lazy` unchanged, or [`Error::InvalidArgument`] carrying
/// [`Error::LAZY_REQUIRED`] when it is `None`.
///
/// ```rust
/// use poly_lazy::{require_lazy, Error, UnsyncLazy};
///
/// let missing: Option<UnsyncLazy<u8, fn() -> u8>> = None;
/// let err = require_lazy(missing).unwrap_err();
/// assert_eq!(err.message(), Some(Error::LAZY_REQUIRED));
/// ```
#[inline]
pub fn require_lazy<T, L: Lazy<T>>(lazy: Option<L>) -> Result<L> {
   require_lazy_with(lazy, Some(Error::LAZY_REQUIRED))
}

/// Checks that a lazy value is present, failing with a caller-chosen message.
///
/// The message is carried verbatim, including when it is itself `None`.
#[inline]
pub fn require_lazy_with<T, L: Lazy<T>>(
   lazy: Option<L>,
   message: Option<impl Into<Cow<'static, str>>>,
) -> Result<L> {
   lazy.ok_or_else(|| Error::invalid_argument(message))
}
