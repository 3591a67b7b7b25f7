//! The memoization state machine shared by both lazy variants.
//!
//! [`CacheState`] holds nothing but the caching flag and the optional cached
//! value; it knows nothing about suppliers or synchronization. Each variant
//! asks it what to do ([`CacheState::lookup`]), runs the supplier itself if
//! needed, and hands the result back ([`CacheState::fill`]).
//!
//! The state space is `{Uncached, Cached} x {CachingOn, CachingOff}`:
//!
//! - `Uncached x On` computes and stores on `get`.
//! - `Cached x On` answers `get` from the cache.
//! - `* x Off` computes on every `get` and leaves the cache as it is.
//! - `clear` moves to `Uncached` without touching the flag.
//! - toggling the flag never touches the cache, so a value cached before
//!   caching was disabled is served again once it is re-enabled.

/// What a `get` should do given the current state.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Lookup<'a, T> {
   /// Caching is on and a value is cached.
   Hit(&'a T),
   /// Caching is on and the cache is empty; the computed value must be stored.
   Fill,
   /// Caching is off; compute and return without storing.
   Bypass,
}

/// Caching flag plus the last computed value.
///
/// `hasCachedValue` is `value.is_some()`, so the cached value is dropped
/// whenever the state becomes uncached.
#[derive(Debug, Clone)]
pub(crate) struct CacheState<T> {
   caching_enabled: bool,
   value: Option<T>,
}

impl<T> CacheState<T> {
   /// Creates an uncached state.
   #[inline]
   pub(crate) const fn new(caching_enabled: bool) -> Self {
      Self {
         caching_enabled,
         value: None,
      }
   }

   #[inline]
   pub(crate) fn is_caching_enabled(&self) -> bool {
      self.caching_enabled
   }

   /// Only changes the flag. An existing cached value is kept.
   #[inline]
   pub(crate) fn set_caching_enabled(&mut self, enabled: bool) {
      self.caching_enabled = enabled;
   }

   #[inline]
   pub(crate) fn is_cached(&self) -> bool {
      self.value.is_some()
   }

   /// Returns the cached value regardless of the caching flag.
   #[inline]
   pub(crate) fn cached(&self) -> Option<&T> {
      self.value.as_ref()
   }

   /// Decides how a `get` is served.
   #[inline]
   pub(crate) fn lookup(&self) -> Lookup<'_, T> {
      if !self.caching_enabled {
         return Lookup::Bypass;
      }
      match &self.value {
         Some(value) => Lookup::Hit(value),
         None => Lookup::Fill,
      }
   }

   /// Stores a freshly computed value and returns a reference to it.
   ///
   /// Called after a [`Lookup::Fill`]. If another fill raced in between (only
   /// possible for the uncoordinated variant with a supplier that re-enters
   /// its own instance), the newer value replaces the older one.
   #[inline]
   pub(crate) fn fill(&mut self, value: T) -> &T {
      self.value.insert(value)
   }

   /// Drops the cached value. Returns `true` if one was present.
   #[inline]
   pub(crate) fn clear(&mut self) -> bool {
      self.take().is_some()
   }

   /// Removes and returns the cached value.
   #[inline]
   pub(crate) fn take(&mut self) -> Option<T> {
      let value = self.value.take();
      if value.is_some() {
         log::debug!("lazy value cache cleared");
      }
      value
   }

   #[inline]
   pub(crate) fn into_value(self) -> Option<T> {
      self.value
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn starts_uncached_with_requested_mode() {
      let on: CacheState<i32> = CacheState::new(true);
      assert!(on.is_caching_enabled());
      assert!(!on.is_cached());
      assert_eq!(on.lookup(), Lookup::Fill);

      let off: CacheState<i32> = CacheState::new(false);
      assert!(!off.is_caching_enabled());
      assert_eq!(off.lookup(), Lookup::Bypass);
   }

   #[test]
   fn fill_then_hit() {
      let mut state = CacheState::new(true);
      assert_eq!(state.fill(7), &7);
      assert!(state.is_cached());
      assert_eq!(state.lookup(), Lookup::Hit(&7));
   }

   #[test]
   fn toggle_keeps_stale_value() {
      let mut state = CacheState::new(true);
      state.fill(1);
      state.set_caching_enabled(false);
      assert!(state.is_cached());
      assert_eq!(state.lookup(), Lookup::Bypass);
      assert_eq!(state.cached(), Some(&1));

      state.set_caching_enabled(true);
      assert_eq!(state.lookup(), Lookup::Hit(&1));
   }

   #[test]
   fn clear_is_idempotent() {
      let mut state = CacheState::new(false);
      state.fill("x");
      assert!(state.clear());
      assert!(!state.clear());
      assert!(!state.is_cached());
      assert!(!state.is_caching_enabled());
   }
}
