use crate::lock::Lock;

/// Holds `lock` on behalf of participant `id` until dropped.
pub struct LockGuard<'a, L: Lock + ?Sized> {
    lock: &'a L,
    id: usize,
}

impl<'a, L: Lock + ?Sized> LockGuard<'a, L> {
    // The caller must already hold `lock` as `id`.
    pub(crate) fn new(lock: &'a L, id: usize) -> Self {
        Self { lock, id }
    }
    pub fn id(&self) -> usize { self.id }
}

impl<L: Lock + ?Sized> Drop for LockGuard<'_, L> {
    fn drop(&mut self) {
        // the id was validated when the lock was taken
        let _ = self.lock.unlock(self.id);
    }
}
