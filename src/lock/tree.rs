use crate::error::{check_id, LockError};

use super::{BoundedLock, Lock, PetersonLock};

/// Tournament of two-party locks for a power-of-two number of participants.
///
/// At the leaves participants `2k` and `2k + 1` compete for pair lock `k`.
/// The winner moves one level towards the root as contender `id / 2`, and
/// so on until the root pair lock admits a single participant.
///
/// Holding the lock means holding one pair lock on every level, so `unlock`
/// releases from the root back down to the leaves. Releasing a leaf first
/// would let the neighbour climb into a level this participant still holds.
#[derive(Debug)]
pub struct TreeLock<L = PetersonLock> {
    n_threads: usize,
    // levels[0] are the leaves, the last one is the root
    levels: Box<[TreeNode<L>]>,
}

#[derive(Debug)]
struct TreeNode<L> {
    pairs: Box<[L]>,
}

impl<L: BoundedLock> TreeNode<L> {
    fn with_contenders(contenders: usize) -> Result<Self, LockError> {
        let pairs = (0..contenders / 2)
            .map(|_| L::with_capacity(2))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TreeNode { pairs: pairs.into_boxed_slice() })
    }

    fn lock(&self, contender: usize) -> Result<(), LockError> {
        self.pairs[contender / 2].lock(contender % 2)
    }

    fn unlock(&self, contender: usize) -> Result<(), LockError> {
        self.pairs[contender / 2].unlock(contender % 2)
    }
}

impl TreeLock {
    pub fn new(n_threads: usize) -> Result<Self, LockError> {
        Self::with_pair_lock(n_threads)
    }
}

impl<L: BoundedLock> TreeLock<L> {
    /// Like [`TreeLock::new`], using `L` as the two-party lock.
    pub fn with_pair_lock(n_threads: usize) -> Result<Self, LockError> {
        if n_threads < 2 {
            return Err(LockError::InvalidCapacity {
                requested: n_threads,
                reason: "tree lock needs at least two threads",
            });
        }
        if !n_threads.is_power_of_two() {
            return Err(LockError::InvalidCapacity {
                requested: n_threads,
                reason: "tree lock needs a power of two threads",
            });
        }
        let depth = n_threads.trailing_zeros() as usize;
        let levels = (0..depth)
            .map(|level| TreeNode::with_contenders(n_threads >> level))
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("tree lock for {n_threads} threads, {depth} levels");
        Ok(TreeLock { n_threads, levels: levels.into_boxed_slice() })
    }

    /// Number of pair locks a participant passes through.
    pub fn depth(&self) -> usize { self.levels.len() }
}

impl<L: BoundedLock> Lock for TreeLock<L> {
    fn capacity(&self) -> usize { self.n_threads }

    fn lock(&self, id: usize) -> Result<(), LockError> {
        check_id(id, self.capacity())?;
        for (depth, node) in self.levels.iter().enumerate() {
            if let Err(err) = node.lock(id >> depth) {
                // give back the levels already won
                for (held, node) in self.levels[..depth].iter().enumerate().rev() {
                    node.unlock(id >> held)?;
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn unlock(&self, id: usize) -> Result<(), LockError> {
        check_id(id, self.capacity())?;
        for (depth, node) in self.levels.iter().enumerate().rev() {
            node.unlock(id >> depth)?;
        }
        Ok(())
    }
}

impl<L: BoundedLock> BoundedLock for TreeLock<L> {
    fn with_capacity(max_threads: usize) -> Result<Self, LockError> {
        Self::with_pair_lock(max_threads)
    }
}
