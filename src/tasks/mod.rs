//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Eviction sweep: Removes expired cache entries from both tiers at the
//!   configured interval

mod cleanup;

pub use cleanup::spawn_cleanup_task;
