//! A shared exchange rate that readers hit concurrently. An operator switches
//! to live quotes for a while, and the rate cached before the switch is
//! served again once caching comes back, until an explicit refresh.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use poly_lazy::SyncLazy;

/// Pretend upstream quote feed: every fetch returns the next tick.
static FEED: AtomicU32 = AtomicU32::new(10_000);

fn fetch_quote() -> u32 {
   thread::sleep(Duration::from_millis(30));
   FEED.fetch_add(25, Ordering::SeqCst)
}

fn main() {
   let rate = Arc::new(SyncLazy::new(fetch_quote));

   let readers: Vec<_> = (0..4)
      .map(|id| {
         let rate = Arc::clone(&rate);
         thread::spawn(move || {
            let quote = rate.get();
            println!("reader {id}: EUR/USD {}", quote);
            quote
         })
      })
      .collect();
   let quotes: Vec<_> = readers.into_iter().map(|r| r.join().unwrap()).collect();
   // One fetch served every reader.
   assert!(quotes.iter().all(|&q| q == quotes[0]));
   let snapshot = quotes[0];

   rate.set_caching_enabled(false);
   let live: Vec<_> = (0..3).map(|_| rate.get()).collect();
   println!("live quotes while caching is off: {live:?}");
   assert!(live.iter().all(|&q| q != snapshot));
   assert_eq!(rate.cached(), Some(snapshot));

   rate.set_caching_enabled(true);
   println!("caching back on, serving the old snapshot: {}", rate.get());
   assert_eq!(rate.get(), snapshot);

   rate.clear_cache();
   let refreshed = rate.get();
   println!("after refresh: {refreshed}");
   assert!(refreshed > snapshot);
}
