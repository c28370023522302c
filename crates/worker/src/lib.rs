//! Background task primitives for the connections index.
//!
//! Provides task spawning that works from inside or outside a tokio
//! runtime, and a delayed scheduler that gates work on host idleness and
//! coalesces bursts of the same request into a single run.

mod idle;
mod scheduler;
mod spawn;

pub use idle::{AlwaysIdle, IdleProbe};
pub use scheduler::IdleScheduler;
pub use spawn::{spawn, spawn_blocking};
