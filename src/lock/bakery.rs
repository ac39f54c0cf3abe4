use crate::error::{check_id, LockError};
use crate::register::{SharedFlag, SharedRegister};

use super::{spin_while, BoundedLock, Lock};

/// Lamport's bakery lock for any fixed number of participants.
///
/// Waiting participants are served in `(label, id)` order, so equal labels
/// drawn concurrently are broken in favour of the smaller id. Labels grow
/// without bound while the lock stays contended; when the next label would
/// not fit in a `usize`, `lock` fails with [`LockError::LabelOverflow`]
/// instead of wrapping around.
#[derive(Debug)]
pub struct BakeryLock {
    flags: Box<[SharedFlag]>,
    labels: Box<[SharedRegister]>,
}

impl BakeryLock {
    pub fn new(n_threads: usize) -> Self {
        log::debug!("bakery lock for {n_threads} threads");
        BakeryLock {
            flags: SharedFlag::array(n_threads),
            labels: SharedRegister::array(n_threads),
        }
    }

    fn max_label(&self) -> usize {
        self.flags.iter()
            .zip(self.labels.iter())
            .filter(|(flag, _)| flag.read())
            .map(|(_, label)| label.read())
            .max()
            .unwrap_or(0)
    }
}

impl Lock for BakeryLock {
    fn capacity(&self) -> usize { self.flags.len() }

    fn lock(&self, id: usize) -> Result<(), LockError> {
        check_id(id, self.capacity())?;
        let BakeryLock { flags, labels } = self;
        debug_assert!(!flags[id].read(), "participant {id} locked twice");
        flags[id].write(true);
        let Some(my_label) = self.max_label().checked_add(1) else {
            flags[id].write(false);
            return Err(LockError::LabelOverflow { id });
        };
        labels[id].write(my_label);
        spin_while(|| {
            (0..self.capacity()).any(|k| {
                if k == id || !flags[k].read() { return false }
                (labels[k].read(), k) < (my_label, id)
            })
        });
        Ok(())
    }

    fn unlock(&self, id: usize) -> Result<(), LockError> {
        check_id(id, self.capacity())?;
        debug_assert!(self.flags[id].read(), "participant {id} unlocked without holding");
        self.flags[id].write(false);
        Ok(())
    }
}

impl BoundedLock for BakeryLock {
    fn with_capacity(max_threads: usize) -> Result<Self, LockError> {
        if max_threads == 0 {
            return Err(LockError::InvalidCapacity {
                requested: 0,
                reason: "bakery lock needs at least one thread",
            });
        }
        Ok(BakeryLock::new(max_threads))
    }
}
