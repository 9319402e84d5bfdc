//! Pool de objetos reciclables con expiración por inactividad.
//!
//! [`RecyclingPool`] hands out owned objects wrapped in a [`Pooled`] handle
//! and takes them back through [`RecyclingPool::checkin`]. Idle objects older
//! than the expiration window, or objects rejected by
//! [`PoolHooks::on_validate`], are discarded the next time someone checks out.
//! There is no background sweeper.
//!
//! Every operation runs under a single pool-wide mutex, so one pool can be
//! shared (`Arc<RecyclingPool<T>>`) between several collections.

use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::error::PoolError;

/// Idle time after which an unlocked entry is no longer reused.
pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(30);

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// Time source used to stamp entry transitions.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Lifecycle callbacks supplied by the owner of a pool.
///
/// Hooks run while the pool's mutex is held. A hook must not call back into
/// the same pool: the mutex is not reentrant and the call deadlocks.
pub trait PoolHooks<T>: Send + Sync {
    /// Builds a fresh object when nothing in the pool can be reused.
    fn on_create(&self) -> T;

    /// Returns `false` to discard an idle object instead of reusing it.
    fn on_validate(&self, _object: &T) -> bool {
        true
    }

    /// Receives every object the pool discards (expired or invalid).
    fn on_expired(&self, _object: T) {}
}

/// [`PoolHooks`] backed by a plain factory closure.
pub struct FactoryHooks<F>(pub F);

impl<T, F> PoolHooks<T> for FactoryHooks<F>
where
    F: Fn() -> T + Send + Sync,
{
    fn on_create(&self) -> T {
        (self.0)()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Locked,
    Unlocked,
}

/// An object owned by the pool plus its bookkeeping.
pub struct PoolEntry<T> {
    id: u64,
    value: T,
    state: EntryState,
    since: Instant,
}

impl<T> PoolEntry<T> {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> EntryState {
        self.state
    }

    /// Time of the last lock/unlock transition.
    pub fn since(&self) -> Instant {
        self.since
    }

    fn transition(&mut self, state: EntryState, now: Instant) {
        self.state = state;
        self.since = now;
    }
}

/// A checked-out entry. The caller owns it exclusively until it is passed
/// back to [`RecyclingPool::checkin`].
///
/// Dropping the handle instead releases the entry's lock and discards the
/// object; it is not returned to the idle set.
#[must_use = "dropping a pooled handle discards the object instead of recycling it"]
pub struct Pooled<T> {
    lease: Lease<T>,
    entry: PoolEntry<T>,
}

/// Lock record of one checked-out entry. Clears itself from the owning
/// pool when dropped while still armed.
struct Lease<T> {
    pool: u64,
    entry: u64,
    state: Weak<Mutex<PoolState<T>>>,
    armed: bool,
}

impl<T> Lease<T> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<T> Drop for Lease<T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(state) = self.state.upgrade() {
            let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.locked.remove(&self.entry).is_some() {
                debug!(pool = self.pool, entry = self.entry, "pooled entry dropped without checkin");
            }
        }
    }
}

impl<T> Pooled<T> {
    pub fn entry_id(&self) -> u64 {
        self.entry.id
    }

    pub fn entry(&self) -> &PoolEntry<T> {
        &self.entry
    }
}

impl<T> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.entry.value
    }
}

impl<T> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.entry.value
    }
}

impl<T: fmt::Debug> fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled")
            .field("pool", &self.lease.pool)
            .field("entry", &self.entry.id)
            .field("value", &self.entry.value)
            .finish()
    }
}

struct PoolState<T> {
    // entry id -> time it was checked out
    locked: HashMap<u64, Instant>,
    // ordered by checkin time, most recent last
    unlocked: Vec<PoolEntry<T>>,
    next_entry: u64,
}

pub struct RecyclingPool<T> {
    id: u64,
    expiration: Duration,
    hooks: Box<dyn PoolHooks<T>>,
    clock: Box<dyn Clock>,
    state: Arc<Mutex<PoolState<T>>>,
}

impl<T> RecyclingPool<T> {
    pub fn new(hooks: impl PoolHooks<T> + 'static) -> Self {
        Self {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            expiration: DEFAULT_EXPIRATION,
            hooks: Box::new(hooks),
            clock: Box::new(SystemClock),
            state: Arc::new(Mutex::new(PoolState {
                locked: HashMap::new(),
                unlocked: Vec::new(),
                next_entry: 0,
            })),
        }
    }

    /// Pool whose only hook is a factory; every idle object is valid.
    pub fn from_fn<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::new(FactoryHooks(factory))
    }

    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = expiration;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn expiration(&self) -> Duration {
        self.expiration
    }

    /// Reuses the most recently checked-in object that is neither expired
    /// nor invalid, or creates a new one.
    ///
    /// The whole unlocked set is scanned on every call, so every stale entry
    /// is discarded before the pool decides between reuse and creation.
    pub fn checkout(&self) -> Pooled<T> {
        let mut state = self.lock();
        let now = self.clock.now();

        let idle = std::mem::take(&mut state.unlocked);
        let mut survivors = Vec::with_capacity(idle.len());
        for entry in idle {
            let idle_for = now.saturating_duration_since(entry.since);
            if idle_for > self.expiration {
                trace!(pool = self.id, entry = entry.id, ?idle_for, "discarding expired entry");
                self.hooks.on_expired(entry.value);
            } else if !self.hooks.on_validate(&entry.value) {
                trace!(pool = self.id, entry = entry.id, "discarding invalid entry");
                self.hooks.on_expired(entry.value);
            } else {
                survivors.push(entry);
            }
        }
        state.unlocked = survivors;

        let reusable = state.unlocked.pop();
        let mut entry = match reusable {
            Some(entry) => {
                debug!(pool = self.id, entry = entry.id, "reusing pooled entry");
                entry
            }
            None => {
                let id = state.next_entry;
                state.next_entry += 1;
                debug!(pool = self.id, entry = id, "creating pooled entry");
                PoolEntry {
                    id,
                    value: self.hooks.on_create(),
                    state: EntryState::Unlocked,
                    since: now,
                }
            }
        };
        entry.transition(EntryState::Locked, now);
        state.locked.insert(entry.id, now);

        Pooled {
            lease: Lease {
                pool: self.id,
                entry: entry.id,
                state: Arc::downgrade(&self.state),
                armed: true,
            },
            entry,
        }
    }

    /// Returns a checked-out object to the pool.
    ///
    /// # Panics
    ///
    /// Panics when `pooled` is not currently locked in this pool, which can
    /// only happen when it was checked out of a different pool.
    pub fn checkin(&self, pooled: Pooled<T>) {
        if let Err(err) = self.try_checkin(pooled) {
            panic!("recycling pool misuse: {err}");
        }
    }

    /// Fallible form of [`checkin`](Self::checkin). On error the object is
    /// dropped without being pooled and its lock is released in the pool it
    /// came from.
    pub fn try_checkin(&self, pooled: Pooled<T>) -> Result<(), PoolError> {
        let Pooled { mut lease, mut entry } = pooled;
        let err = PoolError::NotCheckedOut {
            pool: self.id,
            entry: entry.id,
        };
        if lease.pool != self.id {
            return Err(err);
        }
        lease.disarm();
        let mut state = self.lock();
        if state.locked.remove(&entry.id).is_none() {
            return Err(err);
        }
        trace!(pool = self.id, entry = entry.id, "checked in");
        entry.transition(EntryState::Unlocked, self.clock.now());
        state.unlocked.push(entry);
        Ok(())
    }

    pub fn locked_len(&self) -> usize {
        self.lock().locked.len()
    }

    pub fn unlocked_len(&self) -> usize {
        self.lock().unlocked.len()
    }

    fn lock(&self) -> MutexGuard<'_, PoolState<T>> {
        // a hook panicking inside checkout loses the idle entries not yet scanned; the rest stays consistent
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> fmt::Debug for RecyclingPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecyclingPool")
            .field("id", &self.id)
            .field("expiration", &self.expiration)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;

    /// Clock that only moves when told to.
    pub(crate) struct ManualClock {
        base: Instant,
        offset: Mutex<Duration>,
    }

    impl ManualClock {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self {
                base: Instant::now(),
                offset: Mutex::new(Duration::ZERO),
            })
        }

        pub(crate) fn advance(&self, by: Duration) {
            *self.offset.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.base + *self.offset.lock().unwrap()
        }
    }

    fn counting_pool() -> RecyclingPool<usize> {
        let next = AtomicUsize::new(0);
        RecyclingPool::from_fn(move || next.fetch_add(1, Ordering::SeqCst))
    }

    struct TrackingHooks {
        created: AtomicUsize,
        expired: Arc<Mutex<Vec<usize>>>,
        reject: Option<usize>,
    }

    impl PoolHooks<usize> for TrackingHooks {
        fn on_create(&self) -> usize {
            self.created.fetch_add(1, Ordering::SeqCst)
        }

        fn on_validate(&self, object: &usize) -> bool {
            Some(*object) != self.reject
        }

        fn on_expired(&self, object: usize) {
            self.expired.lock().unwrap().push(object);
        }
    }

    #[test]
    fn checkin_then_checkout_reuses_the_same_instance() {
        let pool = counting_pool();
        let first = pool.checkout();
        let id = first.entry_id();
        assert_eq!(*first, 0);
        pool.checkin(first);

        let again = pool.checkout();
        assert_eq!(again.entry_id(), id);
        assert_eq!(*again, 0);
        assert_eq!(again.entry().state(), EntryState::Locked);
    }

    #[test]
    fn reuse_prefers_most_recent_checkin() {
        let pool = counting_pool();
        let a = pool.checkout();
        let b = pool.checkout();
        pool.checkin(a);
        pool.checkin(b);
        assert_eq!(*pool.checkout(), 1);
        assert_eq!(*pool.checkout(), 0);
        assert_eq!(*pool.checkout(), 2);
    }

    #[test]
    fn expired_entries_are_discarded_and_replaced() {
        let clock = ManualClock::new();
        let expired = Arc::new(Mutex::new(Vec::new()));
        let pool = RecyclingPool::new(TrackingHooks {
            created: AtomicUsize::new(0),
            expired: expired.clone(),
            reject: None,
        })
        .with_clock(clock.clone());

        let a = pool.checkout();
        let b = pool.checkout();
        pool.checkin(a);
        clock.advance(Duration::from_secs(20));
        pool.checkin(b);
        clock.advance(Duration::from_secs(11));

        // a idled 31s, b 11s: a goes, b is reused
        let reused = pool.checkout();
        assert_eq!(*reused, 1);
        assert_eq!(*expired.lock().unwrap(), vec![0]);

        pool.checkin(reused);
        clock.advance(DEFAULT_EXPIRATION + Duration::from_millis(1));
        let fresh = pool.checkout();
        assert_eq!(*fresh, 2);
        assert_eq!(*expired.lock().unwrap(), vec![0, 1]);
        assert_eq!(pool.unlocked_len(), 0);
    }

    #[test]
    fn entry_idle_exactly_the_expiration_is_still_reused() {
        let clock = ManualClock::new();
        let pool = counting_pool()
            .with_expiration(Duration::from_secs(5))
            .with_clock(clock.clone());
        let a = pool.checkout();
        pool.checkin(a);
        clock.advance(Duration::from_secs(5));
        assert_eq!(*pool.checkout(), 0);
    }

    #[test]
    fn invalid_entries_are_discarded_through_the_expired_hook() {
        let expired = Arc::new(Mutex::new(Vec::new()));
        let pool = RecyclingPool::new(TrackingHooks {
            created: AtomicUsize::new(0),
            expired: expired.clone(),
            reject: Some(0),
        });
        let a = pool.checkout();
        pool.checkin(a);
        assert_eq!(*pool.checkout(), 1);
        assert_eq!(*expired.lock().unwrap(), vec![0]);
    }

    #[test]
    fn foreign_checkin_is_rejected() {
        let pool = counting_pool();
        let other = counting_pool();
        let handle = other.checkout();
        let entry = handle.entry_id();
        assert!(matches!(
            pool.try_checkin(handle),
            Err(PoolError::NotCheckedOut { entry: e, .. }) if e == entry
        ));
        assert_eq!(pool.unlocked_len(), 0);
        assert_eq!(other.locked_len(), 0);
        assert_eq!(other.unlocked_len(), 0);
    }

    #[test]
    fn dropped_handles_release_their_lock() {
        let pool = counting_pool();
        for _ in 0..1000 {
            drop(pool.checkout());
        }
        assert_eq!(pool.locked_len(), 0);
        assert_eq!(pool.unlocked_len(), 0);

        let kept = pool.checkout();
        assert_eq!(pool.locked_len(), 1);
        pool.checkin(kept);
        assert_eq!(pool.locked_len(), 0);
        assert_eq!(pool.unlocked_len(), 1);
    }

    struct PanicOnce(std::sync::atomic::AtomicBool);

    impl PoolHooks<usize> for PanicOnce {
        fn on_create(&self) -> usize {
            7
        }

        fn on_validate(&self, _object: &usize) -> bool {
            if self.0.swap(false, Ordering::SeqCst) {
                panic!("validation blew up");
            }
            true
        }
    }

    #[test]
    fn pool_stays_usable_after_a_hook_panics() {
        let pool = RecyclingPool::new(PanicOnce(std::sync::atomic::AtomicBool::new(true)));
        let a = pool.checkout();
        pool.checkin(a);

        let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| pool.checkout()));
        assert!(caught.is_err());
        assert_eq!(pool.unlocked_len(), 0);
        assert_eq!(pool.locked_len(), 0);

        let fresh = pool.checkout();
        assert_eq!(fresh.entry_id(), 1);
        pool.checkin(fresh);
        assert_eq!(pool.unlocked_len(), 1);
    }

    #[test]
    fn handle_may_outlive_its_pool() {
        let pool = counting_pool();
        let handle = pool.checkout();
        drop(pool);
        assert_eq!(*handle, 0);
        drop(handle);
    }

    #[test]
    #[should_panic(expected = "recycling pool misuse")]
    fn foreign_checkin_panics() {
        let pool = counting_pool();
        let other = counting_pool();
        pool.checkin(other.checkout());
    }

    #[test]
    fn concurrent_callers_never_share_an_instance() {
        let pool = Arc::new(counting_pool());
        let live = Arc::new(Mutex::new(HashSet::new()));

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let pool = pool.clone();
                let live = live.clone();
                scope.spawn(move || {
                    for _ in 0..200 {
                        let handle = pool.checkout();
                        assert!(live.lock().unwrap().insert(*handle));
                        std::thread::yield_now();
                        assert!(live.lock().unwrap().remove(&*handle));
                        pool.checkin(handle);
                    }
                });
            }
        });

        assert_eq!(pool.locked_len(), 0);
        assert!(pool.unlocked_len() <= 8);
    }

    proptest! {
        #[test]
        fn live_handles_are_always_distinct(ops in proptest::collection::vec(any::<Option<usize>>(), 1..64)) {
            let pool = counting_pool();
            let mut live: Vec<Pooled<usize>> = Vec::new();
            for op in ops {
                match op {
                    Some(i) if !live.is_empty() => {
                        let handle = live.swap_remove(i % live.len());
                        pool.checkin(handle);
                    }
                    _ => live.push(pool.checkout()),
                }
                let distinct: HashSet<usize> = live.iter().map(|h| **h).collect();
                prop_assert_eq!(distinct.len(), live.len());
                prop_assert_eq!(pool.locked_len(), live.len());
            }
        }
    }
}
