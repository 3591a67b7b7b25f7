use std::cell::Cell;

use poly_lazy::UnsyncLazy;

fn main() {
   let loads = Cell::new(0);
   let config = UnsyncLazy::new(|| {
      // This closure runs once per cache-fill
      loads.set(loads.get() + 1);
      println!("Loading configuration (load #{})...", loads.get());
      format!("profile=production;revision={}", loads.get())
   });

   println!("First read: {}", config.get());
   println!("Second read: {}", config.get());
   assert_eq!(loads.get(), 1);

   // Bypass the cache for a one-off fresh read; the cached value stays put.
   config.set_caching_enabled(false);
   println!("Fresh read: {}", config.get());
   config.set_caching_enabled(true);
   println!("Cached read: {}", config.get());
   assert_eq!(loads.get(), 2);

   config.clear_cache();
   println!("Reloaded: {}", config.get());
   assert_eq!(loads.get(), 3);
}
