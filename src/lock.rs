//! Exclusive lock guarding a coordinated lazy value.
//!
//! The lock is a single `AtomicU8` with the following layout:
//! - Bit 0: LOCKED - Some thread holds exclusive access
//! - Bit 1: WAITING - At least one thread is parked waiting for the lock
//!
//! Uncontended acquisition and release are a single atomic operation each.
//! Contended callers park on the address of the atomic through
//! `parking_lot_core`, and are woken by the releasing thread only when the
//! WAITING bit says someone is actually asleep.
//!
//! The holder may open a reentry window ([`StateGuard::allow_reentry`]) while
//! it runs foreign code that holds no borrow of the guarded data. Inside the
//! window the holding thread's own `lock`/`try_lock` calls succeed with a
//! nested guard instead of parking forever. Every nested guard closes the
//! window again for as long as it lives, so at most one live guard ever hands
//! out access to the data.

use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use parking_lot_core::{DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};

/// Returns a non-zero identifier unique among live threads: the address of a
/// thread-local, the same trick `parking_lot`'s `RawThreadId` uses.
#[inline]
fn current_thread_id() -> usize {
   thread_local!(static KEY: u8 = const { 0 });
   KEY.with(|key| key as *const u8 as usize)
}

/// Raw exclusive lock, reentrant only inside an open reentry window.
pub(crate) struct StateLock {
   state: AtomicU8,
   /// Thread id of the holder while it has a reentry window open, else 0.
   /// Only the holding thread ever stores its own id here, so Relaxed is
   /// enough: no other thread can observe a match.
   reentrant_owner: AtomicUsize,
}

impl StateLock {
   /// Bit flag: Lock is held.
   const LOCKED: u8 = 1;
   /// Bit flag: At least one thread is waiting for the lock.
   const WAITING: u8 = 2;

   /// Creates an unlocked lock.
   #[inline]
   pub(crate) const fn new() -> Self {
      Self {
         state: AtomicU8::new(0),
         reentrant_owner: AtomicUsize::new(0),
      }
   }

   #[inline]
   fn key(&self) -> usize {
      self.state.as_ptr() as usize
   }

   /// Hands out a nested guard if the current thread holds the lock and has a
   /// reentry window open.
   #[inline]
   fn reenter(&self) -> Option<StateGuard<'_>> {
      let me = current_thread_id();
      if self.reentrant_owner.load(Ordering::Relaxed) != me {
         return None;
      }
      self.reentrant_owner.store(0, Ordering::Relaxed);
      Some(StateGuard {
         lock: self,
         reentered_by: me,
      })
   }

   /// Wakes every thread parked on this lock.
   #[inline]
   fn notify_all(&self) {
      // SAFETY: The key is the address of our atomic, the same key `wait` parks on.
      unsafe {
         parking_lot_core::unpark_all(self.key(), DEFAULT_UNPARK_TOKEN);
      }
   }

   /// Parks the current thread until the lock state differs from `expected_state`.
   #[inline]
   fn wait(&self, expected_state: u8) {
      log::trace!("lazy value locked by another thread, parking");
      // SAFETY: See `notify_all`. The validation closure runs under the
      // parking lot's bucket lock, so a release between our failed acquire and
      // the actual sleep is never missed.
      unsafe {
         let _ = parking_lot_core::park(
            self.key(),
            || self.state.load(Ordering::Relaxed) == expected_state,
            || {},
            |_, _| {},
            DEFAULT_PARK_TOKEN,
            None,
         );
      }
      // Wake-ups may be spurious; the caller re-checks the state.
   }

   /// One acquisition attempt.
   ///
   /// Returns `Ok(guard)` when the lock was taken, or `Err(state)` with the
   /// state observed while it was held. Unless `nowait` is set, the WAITING
   /// bit is published before returning `Err`, so the holder will wake us.
   #[inline]
   fn lock_step(&self, nowait: bool) -> Result<StateGuard<'_>, u8> {
      loop {
         let current_state = self.state.load(Ordering::Relaxed);

         if current_state & Self::LOCKED == 0 {
            match self.state.compare_exchange_weak(
               current_state,
               current_state | Self::LOCKED,
               Ordering::Acquire, // Observe everything the previous holder wrote
               Ordering::Relaxed,
            ) {
               Ok(_) => return Ok(StateGuard::new(self)),
               Err(_) => {
                  std::hint::spin_loop();
                  continue;
               }
            }
         }

         if !nowait && current_state & Self::WAITING == 0 {
            let new_state = current_state | Self::WAITING;
            match self.state.compare_exchange_weak(
               current_state,
               new_state,
               Ordering::Relaxed,
               Ordering::Relaxed,
            ) {
               Ok(_) => return Err(new_state),
               Err(_) => {
                  std::hint::spin_loop();
                  continue;
               }
            }
         }

         return Err(current_state);
      }
   }

   /// Acquires the lock, blocking until it is available.
   ///
   /// Re-entering without an open reentry window deadlocks.
   #[inline]
   pub(crate) fn lock(&self) -> StateGuard<'_> {
      if let Some(guard) = self.reenter() {
         return guard;
      }
      let mut observed = match self.lock_step(false) {
         Ok(guard) => return guard,
         Err(state) => state,
      };
      loop {
         self.wait(observed);
         match self.lock_step(false) {
            Ok(guard) => return guard,
            Err(state) => observed = state,
         }
      }
   }

   /// Acquires the lock only if it is free right now.
   #[inline]
   pub(crate) fn try_lock(&self) -> Option<StateGuard<'_>> {
      self.reenter().or_else(|| self.lock_step(true).ok())
   }

   /// Releases the lock, waking parked threads if any announced themselves.
   #[inline]
   fn unlock(&self) {
      // Release ordering publishes the holder's writes to the next acquirer.
      let prev_state = self.state.swap(0, Ordering::Release);
      debug_assert!(prev_state & Self::LOCKED != 0, "unlock of an unlocked StateLock");
      if prev_state & Self::WAITING != 0 {
         self.notify_all();
      }
   }
}

/// RAII guard for [`StateLock`]. Releases the lock when dropped, including
/// while unwinding out of a panicking supplier. A nested guard instead
/// reopens the reentry window it closed.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub(crate) struct StateGuard<'a> {
   lock: &'a StateLock,
   /// Thread id for a nested guard, 0 for the outermost one.
   reentered_by: usize,
}

impl<'a> StateGuard<'a> {
   /// Creates an outermost guard. Assumes the LOCKED bit is already set on `lock`.
   #[inline(always)]
   const fn new(lock: &'a StateLock) -> Self {
      Self {
         lock,
         reentered_by: 0,
      }
   }

   /// Runs `f` with reentry by the current thread allowed.
   ///
   /// The caller must not hold any borrow of the guarded data across `f`.
   /// The window closes again when `f` returns or unwinds.
   #[inline]
   pub(crate) fn allow_reentry<R>(&self, f: impl FnOnce() -> R) -> R {
      struct Close<'a>(&'a AtomicUsize);

      impl Drop for Close<'_> {
         #[inline]
         fn drop(&mut self) {
            self.0.store(0, Ordering::Relaxed);
         }
      }

      let owner = &self.lock.reentrant_owner;
      owner.store(current_thread_id(), Ordering::Relaxed);
      let _close = Close(owner);
      f()
   }
}

impl Drop for StateGuard<'_> {
   #[inline(always)]
   fn drop(&mut self) {
      if self.reentered_by == 0 {
         self.lock.unlock();
      } else {
         self.lock
            .reentrant_owner
            .store(self.reentered_by, Ordering::Relaxed);
      }
   }
}
