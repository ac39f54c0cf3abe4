//! Counter workload for checking locks under contention.
//!
//! Each worker repeatedly takes the lock, bumps a [`SharedRegister`] with a
//! separate read and write, and lets go. The register has no atomic
//! increment, so any failure of mutual exclusion shows up as lost updates
//! in the final count.

use std::panic::resume_unwind;
use std::sync::atomic::{AtomicUsize, Ordering::SeqCst};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::LockError;
use crate::jitter::Jitter;
use crate::lock::Lock;
use crate::register::SharedRegister;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Experiment {
    pub threads: usize,
    /// Critical sections entered by each thread per trial.
    pub increments: usize,
    pub trials: usize,
    /// Upper bound of random spins inside and after each critical section.
    pub jitter: u32,
}

impl Default for Experiment {
    fn default() -> Self {
        Experiment { threads: 8, increments: 1000, trials: 1000, jitter: 0 }
    }
}

impl Experiment {
    pub fn new(threads: usize, increments: usize) -> Self {
        Experiment { threads, increments, ..Default::default() }
    }
    pub fn with_trials(self, trials: usize) -> Self {
        Experiment { trials, ..self }
    }
    pub fn with_jitter(self, jitter: u32) -> Self {
        Experiment { jitter, ..self }
    }
    pub fn expected(&self) -> usize { self.threads * self.increments }

    fn check<L: Lock + ?Sized>(&self, lock: &L) -> Result<(), LockError> {
        if self.threads == 0 {
            return Err(LockError::InvalidCapacity {
                requested: 0,
                reason: "experiment needs at least one thread",
            });
        }
        if self.threads > lock.capacity() {
            return Err(LockError::InvalidCapacity {
                requested: self.threads,
                reason: "experiment has more threads than the lock supports",
            });
        }
        Ok(())
    }
}

/// Counts how many workers are inside the critical section.
#[derive(Debug, Default)]
pub struct Occupancy {
    inside: AtomicUsize,
    peak: AtomicUsize,
}

impl Occupancy {
    pub fn enter(&self) {
        let inside = self.inside.fetch_add(1, SeqCst) + 1;
        self.peak.fetch_max(inside, SeqCst);
    }
    pub fn exit(&self) {
        self.inside.fetch_sub(1, SeqCst);
    }
    pub fn current(&self) -> usize { self.inside.load(SeqCst) }
    /// Highest occupancy seen since construction.
    pub fn peak(&self) -> usize { self.peak.load(SeqCst) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trial {
    pub count: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub trials: usize,
    /// Trials whose final count differed from the expected one.
    pub mismatches: usize,
    pub elapsed: Duration,
    pub peak_occupancy: usize,
}

impl Report {
    pub fn is_exact(&self) -> bool { self.mismatches == 0 }
}

/// Runs one trial: resets `counter`, lets every worker do its increments
/// under `lock` and reports the final count.
pub fn run_trial<L: Lock + ?Sized>(
    lock: &L,
    counter: &SharedRegister,
    occupancy: &Occupancy,
    experiment: &Experiment,
) -> Result<Trial, LockError> {
    experiment.check(lock)?;
    let handles = (0..experiment.threads)
        .map(|id| lock.handle(id))
        .collect::<Result<Vec<_>, _>>()?;
    let jitter = Jitter::new(experiment.jitter);
    let increments = experiment.increments;
    counter.write(0);

    let start = Instant::now();
    thread::scope(|s| {
        let workers = handles
            .into_iter()
            .map(|mut handle| {
                s.spawn(move || -> Result<(), LockError> {
                    for _ in 0..increments {
                        let guard = handle.acquire()?;
                        occupancy.enter();
                        counter.write(counter.read() + 1);
                        jitter.pause();
                        occupancy.exit();
                        drop(guard);
                        jitter.pause();
                    }
                    Ok(())
                })
            })
            .collect::<Vec<_>>();
        workers
            .into_iter()
            .try_for_each(|worker| worker.join().unwrap_or_else(|panic| resume_unwind(panic)))
    })?;
    let trial = Trial { count: counter.read(), elapsed: start.elapsed() };
    log::debug!("trial finished with count {} in {:?}", trial.count, trial.elapsed);
    Ok(trial)
}

/// Repeats [`run_trial`] `experiment.trials` times on the same lock.
pub fn run<L: Lock + ?Sized>(lock: &L, experiment: &Experiment) -> Result<Report, LockError> {
    experiment.check(lock)?;
    let counter = SharedRegister::default();
    let occupancy = Occupancy::default();
    let expected = experiment.expected();
    let mut report = Report {
        trials: experiment.trials,
        mismatches: 0,
        elapsed: Duration::ZERO,
        peak_occupancy: 0,
    };
    for _ in 0..experiment.trials {
        let trial = run_trial(lock, &counter, &occupancy, experiment)?;
        if trial.count != expected {
            log::warn!("wrong count: {} (expected {expected})", trial.count);
            report.mismatches += 1;
        }
        report.elapsed += trial.elapsed;
    }
    report.peak_occupancy = occupancy.peak();
    log::info!(
        "{} threads x {} increments: {}/{} mismatches in {:?}",
        experiment.threads, experiment.increments, report.mismatches, report.trials, report.elapsed
    );
    Ok(report)
}
