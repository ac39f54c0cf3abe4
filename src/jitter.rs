use rand::Rng;
use std::hint::spin_loop;

/// Busy-waits for a random number of spins to shake up thread interleavings.
#[derive(Debug, Clone, Copy)]
pub struct Jitter {
    max_spins: u32,
}

impl Jitter {
    pub fn new(max_spins: u32) -> Self {
        Jitter { max_spins }
    }
    pub fn pause(&self) {
        if self.max_spins == 0 { return }
        let spins = random_spins(self.max_spins);
        for _ in 0..spins { spin_loop(); }
    }
}

fn random_spins(limit: u32) -> u32 {
    rand::thread_rng().gen_range(0..=limit)
}
