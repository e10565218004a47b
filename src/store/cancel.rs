//! Per-operation cancellation.
//!
//! Every store call made through [`run_blocking`](super::run_blocking) gets a
//! fresh [`CancelToken`]. The token is cancelled when the timeout fires or
//! when the waiting request future is dropped. Backends either poll the flag
//! or register a hook that interrupts the statement on their connection.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::errors::{StoreError, StoreResult};

type Hook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    next_id: AtomicU64,
    hooks: Mutex<Vec<(u64, Hook)>>,
}

impl Inner {
    fn lock_hooks(&self) -> MutexGuard<'_, Vec<(u64, Hook)>> {
        self.hooks.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Shared cancellation state for one store operation
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once the token has been cancelled
    pub fn check(&self) -> StoreResult<()> {
        if self.is_cancelled() {
            Err(StoreError::interrupted())
        } else {
            Ok(())
        }
    }

    /// Cancel and run every registered hook once.
    ///
    /// Hooks run under the registry lock, so a hook never fires after its
    /// [`CancelRegistration`] has been dropped.
    pub fn cancel(&self) {
        let mut hooks = self.inner.lock_hooks();
        self.inner.cancelled.store(true, Ordering::SeqCst);
        for (_, hook) in hooks.drain(..) {
            hook();
        }
    }

    /// Run `hook` on cancellation, or right away if already cancelled.
    ///
    /// The hook is unregistered when the returned registration drops.
    pub fn on_cancel(&self, hook: impl FnOnce() + Send + 'static) -> CancelRegistration {
        let mut hooks = self.inner.lock_hooks();
        if self.is_cancelled() {
            hook();
            return CancelRegistration {
                inner: Arc::clone(&self.inner),
                id: None,
            };
        }
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        hooks.push((id, Box::new(hook)));
        CancelRegistration {
            inner: Arc::clone(&self.inner),
            id: Some(id),
        }
    }

    /// A guard that cancels this token when dropped unless disarmed
    pub fn drop_guard(&self) -> CancelOnDrop {
        CancelOnDrop {
            token: Some(self.clone()),
        }
    }
}

/// Keeps a cancellation hook registered while alive
#[must_use = "the hook is unregistered when this is dropped"]
pub struct CancelRegistration {
    inner: Arc<Inner>,
    id: Option<u64>,
}

impl Drop for CancelRegistration {
    fn drop(&mut self) {
        if let Some(id) = self.id {
            self.inner.lock_hooks().retain(|(hook_id, _)| *hook_id != id);
        }
    }
}

/// Cancels its token on drop
#[must_use = "the token is cancelled as soon as this is dropped"]
pub struct CancelOnDrop {
    token: Option<CancelToken>,
}

impl CancelOnDrop {
    /// The operation finished; leave the token alone
    pub fn disarm(mut self) {
        self.token = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }
}
