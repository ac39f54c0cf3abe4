//! Sequentially consistent shared cells.
//!
//! Every algorithm in [`crate::lock`] is only correct if all participants
//! agree on a single global order of reads and writes, so both register
//! kinds use `SeqCst` for every access and offer nothing but `read` and
//! `write`. There is no read-modify-write operation, so a
//! `write(read() + 1)` done without holding a lock can lose updates.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering::SeqCst};

#[derive(Debug, Default)]
pub struct SharedRegister(AtomicUsize);

impl SharedRegister {
    pub fn new(value: usize) -> Self {
        SharedRegister(AtomicUsize::new(value))
    }
    pub fn read(&self) -> usize { self.0.load(SeqCst) }
    pub fn write(&self, value: usize) { self.0.store(value, SeqCst) }

    /// `len` registers, all starting at zero.
    pub fn array(len: usize) -> Box<[SharedRegister]> {
        let mut registers: Vec<SharedRegister> = Vec::with_capacity(len);
        for _ in 0..len { registers.push(SharedRegister::default()); }
        registers.into_boxed_slice()
    }
}

#[derive(Debug, Default)]
pub struct SharedFlag(AtomicBool);

impl SharedFlag {
    pub fn new(value: bool) -> Self {
        SharedFlag(AtomicBool::new(value))
    }
    pub fn read(&self) -> bool { self.0.load(SeqCst) }
    pub fn write(&self, value: bool) { self.0.store(value, SeqCst) }

    /// `len` flags, all lowered.
    pub fn array(len: usize) -> Box<[SharedFlag]> {
        let mut flags: Vec<SharedFlag> = Vec::with_capacity(len);
        for _ in 0..len { flags.push(SharedFlag::default()); }
        flags.into_boxed_slice()
    }
}
