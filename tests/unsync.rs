use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use poly_lazy::{Error, UnsyncLazy};

fn random_supplier() -> u64 {
   rand::random()
}

#[test]
fn test_try_new_without_supplier_fails() {
   let err = UnsyncLazy::<u64, fn() -> u64>::try_new(None).unwrap_err();
   assert!(matches!(err, Error::InvalidArgument { .. }));
   assert_eq!(err.message(), Some(Error::SUPPLIER_REQUIRED));

   for caching in [true, false] {
      let err = UnsyncLazy::<u64, fn() -> u64>::try_with_caching(None, caching).unwrap_err();
      assert_eq!(err.message(), Some(Error::SUPPLIER_REQUIRED));
   }
}

#[test]
fn test_try_new_with_supplier_defaults() {
   let supplier = || 3_u64;
   let lazy = UnsyncLazy::<u64, _>::try_new(Some(supplier)).unwrap();
   assert_eq!((lazy.supplier())(), 3);
   assert!(lazy.is_caching_enabled());
   assert!(!lazy.is_cached());

   let lazy = UnsyncLazy::<u64, _>::try_with_caching(Some(supplier), false).unwrap();
   assert!(!lazy.is_caching_enabled());
   assert!(!lazy.is_cached());

   let lazy = UnsyncLazy::<u64, _>::try_with_caching(Some(supplier), true).unwrap();
   assert!(lazy.is_caching_enabled());
}

#[test]
fn test_set_caching_enabled() {
   let lazy: UnsyncLazy<(), _> = UnsyncLazy::with_caching(|| (), false);
   lazy.set_caching_enabled(true);
   assert!(lazy.is_caching_enabled());

   let lazy: UnsyncLazy<(), _> = UnsyncLazy::with_caching(|| (), true);
   lazy.set_caching_enabled(false);
   assert!(!lazy.is_caching_enabled());
}

#[test]
fn test_counting_supplier_end_to_end() {
   let counter = Cell::new(0);
   let lazy = UnsyncLazy::new(|| {
      counter.set(counter.get() + 1);
      counter.get()
   });

   assert_eq!(lazy.get(), 1);
   assert_eq!(lazy.get(), 1);
   assert_eq!(counter.get(), 1);
   lazy.clear_cache();
   assert!(!lazy.is_cached());
   assert_eq!(lazy.get(), 2);
   assert_eq!(counter.get(), 2);
}

#[test]
fn test_cached_value_is_shared_instance() {
   let lazy = UnsyncLazy::new(|| Rc::new(random_supplier()));
   let first = lazy.get();
   let second = lazy.get();
   assert!(Rc::ptr_eq(&first, &second));
   assert!(lazy.is_cached());
   assert_eq!(lazy.cached().as_deref(), Some(&*first));

   lazy.clear_cache();
   assert!(!lazy.is_cached());
   assert_eq!(lazy.cached(), None);
   let third = lazy.get();
   assert!(!Rc::ptr_eq(&second, &third));
}

#[test]
fn test_caching_disabled_always_computes() {
   let calls = Cell::new(0);
   let lazy = UnsyncLazy::with_caching(
      || {
         calls.set(calls.get() + 1);
         random_supplier()
      },
      false,
   );

   let values: Vec<_> = (0..8).map(|_| lazy.get()).collect();
   assert_eq!(calls.get(), 8);
   assert!(!lazy.is_cached());
   // Eight equal random u64s would be astronomically unlikely.
   assert!(values.windows(2).any(|w| w[0] != w[1]));
}

#[test]
fn test_disable_keeps_stale_value() {
   let counter = Cell::new(0);
   let lazy = UnsyncLazy::new(|| {
      counter.set(counter.get() + 1);
      counter.get()
   });

   assert_eq!(lazy.get(), 1);
   lazy.set_caching_enabled(false);
   assert!(lazy.is_cached());
   assert_eq!(lazy.get(), 2);
   assert_eq!(lazy.get(), 3);
   assert_eq!(lazy.cached(), Some(1));

   lazy.set_caching_enabled(true);
   assert_eq!(lazy.get(), 1);
   assert_eq!(counter.get(), 3);
}

#[test]
fn test_clear_cache_is_idempotent() {
   let lazy = UnsyncLazy::new(|| 5);
   lazy.clear_cache();
   lazy.clear_cache();
   assert!(!lazy.is_cached());
   assert_eq!(lazy.get(), 5);
   lazy.clear_cache();
   lazy.clear_cache();
   assert!(!lazy.is_cached());
}

#[test]
fn test_try_get_propagates_errors() {
   let attempts = Cell::new(0);
   let lazy = UnsyncLazy::new(|| {
      attempts.set(attempts.get() + 1);
      if attempts.get() < 3 {
         Err(format!("attempt {} failed", attempts.get()))
      } else {
         Ok(attempts.get() * 10)
      }
   });

   assert_eq!(lazy.try_get(), Err("attempt 1 failed".to_string()));
   assert!(!lazy.is_cached());
   assert_eq!(lazy.try_get(), Err("attempt 2 failed".to_string()));
   assert_eq!(lazy.try_get(), Ok(30));
   assert!(lazy.is_cached());
   assert_eq!(lazy.try_get(), Ok(30));
   assert_eq!(attempts.get(), 3);
}

#[test]
fn test_panicking_supplier_leaves_cache_empty() {
   let fail = Cell::new(true);
   let lazy = UnsyncLazy::new(|| {
      if fail.get() {
         panic!("supplier failed");
      }
      7
   });

   let result = panic::catch_unwind(AssertUnwindSafe(|| lazy.get()));
   assert!(result.is_err());
   assert!(!lazy.is_cached());

   fail.set(false);
   assert_eq!(lazy.get(), 7);
}

#[test]
fn test_supplier_may_inspect_own_instance() {
   type SelfAware = UnsyncLazy<bool, Box<dyn Fn() -> bool>>;

   let lazy: Rc<SelfAware> = Rc::new_cyclic(|weak: &Weak<SelfAware>| {
      let weak = weak.clone();
      UnsyncLazy::new(Box::new(move || {
         weak.upgrade().map_or(true, |this| this.is_cached())
      }) as Box<dyn Fn() -> bool>)
   });

   assert!(!lazy.get());
   assert!(lazy.is_cached());
   assert!(!lazy.get());
}

#[test]
fn test_take_and_into_inner() {
   let mut lazy = UnsyncLazy::new(|| String::from("value"));
   assert_eq!(lazy.take(), None);
   assert_eq!(lazy.get(), "value");
   assert_eq!(lazy.take(), Some(String::from("value")));
   assert!(!lazy.is_cached());

   lazy.get();
   let (supplier, cached) = lazy.into_inner();
   assert_eq!(cached.as_deref(), Some("value"));
   assert_eq!(supplier(), "value");
}

#[test]
fn test_debug() {
   let lazy: UnsyncLazy<i32, _> = UnsyncLazy::new(|| 42);
   assert_eq!(
      format!("{lazy:?}"),
      "UnsyncLazy { caching_enabled: true, value: None, .. }"
   );
   lazy.get();
   assert_eq!(
      format!("{lazy:?}"),
      "UnsyncLazy { caching_enabled: true, value: Some(42), .. }"
   );
}

#[test]
fn test_from_supplier() {
   let lazy: UnsyncLazy<i32, _> = UnsyncLazy::from(|| 9);
   assert!(lazy.is_caching_enabled());
   assert_eq!(lazy.get(), 9);
}
