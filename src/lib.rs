#![deny(unsafe_op_in_unsafe_fn)]

pub mod guard;
pub mod harness;
pub mod lock;
pub mod register;

mod error;
mod jitter;

pub use error::LockError;

type Str = &'static str;
