use crate::error::{check_id, LockError};
use crate::register::SharedRegister;

use super::{spin_while, BoundedLock, Lock};

/// Filter lock admitting up to `n_in_zone` participants at once.
///
/// A participant climbs `n_threads - n_in_zone` levels. Each level holds back
/// at least one of the participants trying to reach it, so past the last
/// level at most `n_in_zone` remain. With `n_in_zone == 1` this is the plain
/// filter lock.
#[derive(Debug)]
pub struct FilterLock {
    // level 0 means not contending
    levels: Box<[SharedRegister]>,
    // victims[l - 1] breaks ties at level l
    victims: Box<[SharedRegister]>,
}

impl FilterLock {
    pub fn new(n_threads: usize, n_in_zone: usize) -> Result<Self, LockError> {
        if n_threads <= n_in_zone {
            return Err(LockError::ZoneTooLarge { n_threads, n_in_zone });
        }
        if n_in_zone == 0 {
            return Err(LockError::EmptyZone);
        }
        let n_levels = n_threads - n_in_zone;
        log::debug!("filter lock for {n_threads} threads, {n_in_zone} in zone, {n_levels} levels");
        Ok(FilterLock {
            levels: SharedRegister::array(n_threads),
            victims: SharedRegister::array(n_levels),
        })
    }

    pub fn n_levels(&self) -> usize { self.victims.len() }

    /// How many participants may hold the lock at once.
    pub fn n_in_zone(&self) -> usize { self.capacity() - self.n_levels() }
}

impl Lock for FilterLock {
    fn capacity(&self) -> usize { self.levels.len() }

    fn lock(&self, id: usize) -> Result<(), LockError> {
        check_id(id, self.capacity())?;
        let FilterLock { levels, victims } = self;
        debug_assert_eq!(levels[id].read(), 0, "participant {id} locked twice");
        for level in 1..=self.n_levels() {
            let victim = &victims[level - 1];
            levels[id].write(level);
            victim.write(id);
            // spin until nobody else is at this level or above, or someone
            // else became the victim
            spin_while(|| {
                (0..self.capacity()).any(|k| k != id && levels[k].read() >= level)
                    && victim.read() == id
            });
        }
        Ok(())
    }

    fn unlock(&self, id: usize) -> Result<(), LockError> {
        check_id(id, self.capacity())?;
        debug_assert_eq!(self.levels[id].read(), self.n_levels(), "participant {id} unlocked without holding");
        self.levels[id].write(0);
        Ok(())
    }
}

impl BoundedLock for FilterLock {
    fn with_capacity(max_threads: usize) -> Result<Self, LockError> {
        FilterLock::new(max_threads, 1)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use rand::Rng;

    use super::*;

    #[test]
    fn zone_must_be_smaller_than_population() {
        assert_eq!(
            FilterLock::new(3, 4).unwrap_err(),
            LockError::ZoneTooLarge { n_threads: 3, n_in_zone: 4 }
        );
        assert_eq!(
            FilterLock::new(2, 2).unwrap_err(),
            LockError::ZoneTooLarge { n_threads: 2, n_in_zone: 2 }
        );
        assert_eq!(FilterLock::new(2, 0).unwrap_err(), LockError::EmptyZone);
        assert!(FilterLock::with_capacity(1).is_err());

        let lock = FilterLock::new(5, 2).unwrap();
        assert_eq!(lock.capacity(), 5);
        assert_eq!(lock.n_levels(), 3);
        assert_eq!(lock.n_in_zone(), 2);
    }

    #[test]
    fn rejects_foreign_ids() {
        let lock = FilterLock::new(4, 1).unwrap();
        assert_eq!(lock.lock(4), Err(LockError::InvalidId { id: 4, capacity: 4 }));
        assert_eq!(lock.unlock(9), Err(LockError::InvalidId { id: 9, capacity: 4 }));
        assert!(lock.levels.iter().all(|level| level.read() == 0));
    }

    #[test]
    fn holder_sits_past_the_last_level() {
        let lock = FilterLock::new(4, 2).unwrap();
        lock.lock(3).unwrap();
        assert_eq!(lock.levels[3].read(), 2);
        assert_eq!(lock.victims[1].read(), 3);
        lock.unlock(3).unwrap();
        assert_eq!(lock.levels[3].read(), 0);
    }

    #[test]
    fn reusable_after_release() {
        let lock = FilterLock::new(5, 3).unwrap();
        for _ in 0..3 {
            for id in (0..5).rev() {
                lock.lock(id).unwrap();
                lock.unlock(id).unwrap();
            }
        }
        assert!(lock.levels.iter().all(|level| level.read() == 0));
    }

    #[test]
    fn newcomer_pushes_waiter_into_zone() {
        let lock = Arc::new(FilterLock::new(3, 2).unwrap());
        lock.lock(0).unwrap();

        // 1 is the victim at the only level while 0 sits there
        let second = thread::spawn({
            let lock = lock.clone();
            move || {
                lock.lock(1).unwrap();
                lock.unlock(1).unwrap();
            }
        });
        thread::sleep(Duration::from_millis(100));
        assert!(!second.is_finished());

        // 2 takes over as victim, so 1 shares the zone with 0
        let third = thread::spawn({
            let lock = lock.clone();
            move || {
                lock.lock(2).unwrap();
                lock.unlock(2).unwrap();
            }
        });
        second.join().unwrap();
        thread::sleep(Duration::from_millis(100));
        assert!(!third.is_finished());

        lock.unlock(0).unwrap();
        third.join().unwrap();
    }

    #[test]
    fn m_exclusion() {
        let mut rng = rand::thread_rng();
        let n_threads = rng.gen_range(3..=6);
        let n_in_zone = rng.gen_range(1..n_threads);
        let lock = Arc::new(FilterLock::new(n_threads, n_in_zone).unwrap());
        let inside = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let ths = (0..n_threads)
            .map(|id| {
                let lock = lock.clone();
                let inside = inside.clone();
                let peak = peak.clone();
                thread::spawn(move || {
                    for _ in 0..5_000 {
                        let _guard = lock.acquire(id).unwrap();
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect::<Vec<_>>();
        ths.into_iter().for_each(|th| th.join().unwrap());
        assert!(peak.load(Ordering::SeqCst) <= n_in_zone);
    }
}
