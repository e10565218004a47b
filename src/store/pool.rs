//! Bounded connection pool.
//!
//! Connections are created lazily up to `max`, handed out one per
//! statement, and returned to the idle list when the guard drops. A guard
//! that saw a broken connection is discarded instead so the slot can be
//! refilled.

use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;

use super::errors::{StoreError, StoreResult};

/// Live pool counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub open_connections: usize,
    pub in_use: usize,
    pub idle: usize,
}

type Factory<T> = Box<dyn Fn() -> StoreResult<T> + Send + Sync>;

/// A bounded pool for reusable connection-like objects.
pub struct Pool<T> {
    max: usize,
    factory: Factory<T>,
    idle: Mutex<Vec<T>>,
    available: Condvar,
    open: AtomicUsize,
}

/// A pooled value that returns to the pool on drop.
pub struct Pooled<T> {
    pool: Arc<Pool<T>>,
    value: Option<T>,
}

impl<T> Pool<T> {
    pub fn new<F>(max: usize, factory: F) -> Arc<Self>
    where
        F: Fn() -> StoreResult<T> + Send + Sync + 'static,
    {
        Arc::new(Self {
            max: max.max(1),
            factory: Box::new(factory),
            idle: Mutex::new(Vec::new()),
            available: Condvar::new(),
            open: AtomicUsize::new(0),
        })
    }

    fn lock_idle(&self) -> MutexGuard<'_, Vec<T>> {
        self.idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Take an idle connection, open a new one, or wait up to `timeout`.
    pub fn acquire(self: &Arc<Self>, timeout: Option<Duration>) -> StoreResult<Pooled<T>> {
        let deadline = timeout.map(|limit| Instant::now() + limit);
        let mut idle = self.lock_idle();

        loop {
            if let Some(item) = idle.pop() {
                return Ok(self.wrap(item));
            }

            if self.open.load(Ordering::SeqCst) < self.max {
                self.open.fetch_add(1, Ordering::SeqCst);
                drop(idle);
                return match (self.factory)() {
                    Ok(item) => Ok(self.wrap(item)),
                    Err(e) => {
                        self.release_slot();
                        Err(e)
                    }
                };
            }

            idle = match deadline {
                None => self
                    .available
                    .wait(idle)
                    .unwrap_or_else(|poisoned| poisoned.into_inner()),
                Some(limit) => {
                    let now = Instant::now();
                    if now >= limit {
                        return Err(StoreError::PoolExhausted);
                    }
                    let (guard, _) = self
                        .available
                        .wait_timeout(idle, limit - now)
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                    guard
                }
            };
        }
    }

    pub fn stats(&self) -> PoolStats {
        let idle = self.lock_idle().len();
        let open = self.open.load(Ordering::SeqCst);
        PoolStats {
            open_connections: open,
            in_use: open.saturating_sub(idle),
            idle,
        }
    }

    fn wrap(self: &Arc<Self>, item: T) -> Pooled<T> {
        Pooled {
            pool: Arc::clone(self),
            value: Some(item),
        }
    }

    fn release(&self, item: T) {
        self.lock_idle().push(item);
        self.available.notify_one();
    }

    fn release_slot(&self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
        self.available.notify_one();
    }
}

impl<T> Pooled<T> {
    /// Drop the connection instead of returning it to the idle list
    pub fn discard(mut self) {
        if self.value.take().is_some() {
            self.pool.release_slot();
        }
    }
}

impl<T> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Only `discard` and `drop` take the value, and both consume the guard.
        match self.value.as_ref() {
            Some(value) => value,
            None => unreachable!("pooled value already released"),
        }
    }
}

impl<T> Drop for Pooled<T> {
    fn drop(&mut self) {
        if let Some(item) = self.value.take() {
            self.pool.release(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_reuses_connections() {
        let pool = Pool::new(2, || Ok(7usize));
        let first = pool.acquire(None).unwrap();
        let second = pool.acquire(None).unwrap();
        assert_eq!(*first, 7);
        assert_eq!(
            pool.stats(),
            PoolStats {
                open_connections: 2,
                in_use: 2,
                idle: 0
            }
        );

        drop(first);
        assert_eq!(pool.stats().idle, 1);
        assert_eq!(pool.stats().in_use, 1);

        drop(second);
        assert_eq!(pool.stats().idle, 2);
        assert_eq!(pool.stats().open_connections, 2);
    }

    #[test]
    fn test_pool_timeout() {
        let pool = Pool::new(1, || Ok(42usize));
        let _guard = pool.acquire(None).unwrap();
        let result = pool.acquire(Some(Duration::from_millis(10)));
        assert_eq!(result.err(), Some(StoreError::PoolExhausted));
    }

    #[test]
    fn test_pool_discard_allows_recreate() {
        let pool = Pool::new(1, || Ok(7usize));
        let guard = pool.acquire(None).unwrap();
        guard.discard();
        assert_eq!(pool.stats().open_connections, 0);

        let next = pool.acquire(Some(Duration::from_millis(10)));
        assert!(next.is_ok());
    }

    #[test]
    fn test_pool_factory_failure_frees_slot() {
        let pool: Arc<Pool<usize>> = Pool::new(1, || Err(StoreError::Open("disk gone".into())));
        let err = pool.acquire(Some(Duration::from_millis(10))).err();
        assert_eq!(err, Some(StoreError::Open("disk gone".into())));
        assert_eq!(pool.stats().open_connections, 0);
    }

    #[test]
    fn test_pool_waiter_wakes_on_release() {
        let pool = Pool::new(1, || Ok(1usize));
        let guard = pool.acquire(None).unwrap();

        let waiter = {
            let pool = Arc::clone(&pool);
            std::thread::spawn(move || pool.acquire(Some(Duration::from_secs(2))).is_ok())
        };

        std::thread::sleep(Duration::from_millis(20));
        drop(guard);
        assert!(waiter.join().unwrap());
    }
}
