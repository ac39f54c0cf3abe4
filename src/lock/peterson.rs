use crate::error::{check_id, LockError};
use crate::register::{SharedFlag, SharedRegister};

use super::{spin_while, BoundedLock, Lock};

/// Peterson's lock for exactly two participants, ids 0 and 1.
#[derive(Debug, Default)]
pub struct PetersonLock {
    flags: [SharedFlag; 2],
    victim: SharedRegister,
}

impl PetersonLock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Lock for PetersonLock {
    fn capacity(&self) -> usize { 2 }

    fn lock(&self, id: usize) -> Result<(), LockError> {
        check_id(id, 2)?;
        let PetersonLock { flags, victim } = self;
        let (my_flag, other_flag) = (&flags[id], &flags[1 - id]);
        debug_assert!(!my_flag.read(), "participant {id} locked twice");
        my_flag.write(true);
        victim.write(id);
        spin_while(|| other_flag.read() && victim.read() == id);
        Ok(())
    }

    fn unlock(&self, id: usize) -> Result<(), LockError> {
        check_id(id, 2)?;
        debug_assert!(self.flags[id].read(), "participant {id} unlocked without holding");
        self.flags[id].write(false);
        Ok(())
    }
}

impl BoundedLock for PetersonLock {
    fn with_capacity(max_threads: usize) -> Result<Self, LockError> {
        if max_threads == 2 {
            Ok(PetersonLock::new())
        } else {
            Err(LockError::InvalidCapacity {
                requested: max_threads,
                reason: "Peterson lock supports exactly two threads",
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    use crate::register::SharedRegister;

    use super::*;

    #[test]
    fn rejects_foreign_ids() {
        let lock = PetersonLock::new();
        assert_eq!(lock.lock(2), Err(LockError::InvalidId { id: 2, capacity: 2 }));
        assert_eq!(lock.unlock(5), Err(LockError::InvalidId { id: 5, capacity: 2 }));
        // the failed call left no trace
        assert!(!lock.flags[0].read() && !lock.flags[1].read());
    }

    #[test]
    fn capacity_must_be_two() {
        assert!(PetersonLock::with_capacity(2).is_ok());
        assert!(PetersonLock::with_capacity(1).is_err());
        assert!(PetersonLock::with_capacity(3).is_err());
    }

    #[test]
    fn reusable_after_release() {
        let lock = PetersonLock::new();
        for round in 0..100 {
            let id = round % 2;
            lock.lock(id).unwrap();
            lock.unlock(id).unwrap();
            assert!(!lock.flags[0].read() && !lock.flags[1].read());
        }
        // an uncontended participant never spins
        lock.lock(1).unwrap();
        lock.unlock(1).unwrap();
    }

    #[test]
    fn mutual_exclusion() {
        const WORK: usize = 100_000;
        let lock = Arc::new(PetersonLock::new());
        let count = Arc::new(SharedRegister::default());
        let ths = (0..2)
            .map(|id| {
                let lock = lock.clone();
                let count = count.clone();
                thread::spawn(move || {
                    for _ in 0..WORK {
                        let _guard = lock.acquire(id).unwrap();
                        count.write(count.read() + 1);
                    }
                })
            })
            .collect::<Vec<_>>();
        ths.into_iter().for_each(|th| th.join().unwrap());
        assert_eq!(count.read(), 2 * WORK);
    }

    #[test]
    fn waiter_overtaken_at_most_once() {
        let lock = Arc::new(PetersonLock::new());
        let entries = Arc::new(Mutex::new(Vec::new()));

        lock.lock(0).unwrap();
        let waiter = thread::spawn({
            let lock = lock.clone();
            let entries = entries.clone();
            move || {
                let _guard = lock.acquire(1).unwrap();
                entries.lock().unwrap().push(1);
                thread::sleep(Duration::from_millis(50));
            }
        });
        // let 1 announce itself before 0 lets go
        thread::sleep(Duration::from_millis(100));
        assert!(!waiter.is_finished());

        // 0 releases and immediately asks again: it must yield to 1 first
        lock.unlock(0).unwrap();
        lock.lock(0).unwrap();
        entries.lock().unwrap().push(0);
        lock.unlock(0).unwrap();

        waiter.join().unwrap();
        assert_eq!(*entries.lock().unwrap(), vec![1, 0]);
    }
}
