//! Classical read/write mutual exclusion.
//!
//! Every lock here is built only from [`SharedRegister`]s and [`SharedFlag`]s
//! and waits by busy spinning. Participants identify themselves with an
//! explicit id in `0..capacity()` on every call; there is no thread-local
//! identity, so the same thread may act as different participants.
//!
//! Calling `unlock(id)` without holding the lock as `id`, or `lock(id)` twice,
//! is a protocol violation. Debug builds catch some of these with assertions,
//! release builds do not check.
//!
//! [`SharedRegister`]: crate::register::SharedRegister
//! [`SharedFlag`]: crate::register::SharedFlag

use std::hint::spin_loop;

use crate::error::{check_id, LockError};
use crate::guard::LockGuard;

mod bakery;
mod filter;
mod peterson;
mod tree;

pub use bakery::BakeryLock;
pub use filter::FilterLock;
pub use peterson::PetersonLock;
pub use tree::TreeLock;

pub trait Lock: Sync {
    /// Number of participants the lock was built for.
    fn capacity(&self) -> usize;
    fn lock(&self, id: usize) -> Result<(), LockError>;
    fn unlock(&self, id: usize) -> Result<(), LockError>;

    fn acquire(&self, id: usize) -> Result<LockGuard<'_, Self>, LockError> {
        self.lock(id)?;
        Ok(LockGuard::new(self, id))
    }
    fn handle(&self, id: usize) -> Result<LockRef<'_, Self>, LockError> {
        check_id(id, self.capacity())?;
        Ok(LockRef { lock: self, id })
    }
}

pub trait BoundedLock: Lock + Sized {
    fn with_capacity(max_threads: usize) -> Result<Self, LockError>;
}

/// A participant's view of a lock, with its id already validated.
pub struct LockRef<'a, L: Lock + ?Sized> {
    lock: &'a L,
    id: usize,
}

impl<'a, L: Lock + ?Sized> LockRef<'a, L> {
    pub fn id(&self) -> usize { self.id }
    /// Only a [`LockError::LabelOverflow`] can surface here.
    pub fn acquire(&mut self) -> Result<LockGuard<'a, L>, LockError> {
        self.lock.lock(self.id)?;
        Ok(LockGuard::new(self.lock, self.id))
    }
}

// Shared by every algorithm: poll until `waiting` turns false.
fn spin_while(mut waiting: impl FnMut() -> bool) {
    while waiting() { spin_loop() }
}
