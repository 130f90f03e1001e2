//! Background Tasks Module
//!
//! Periodic housekeeping that runs alongside the cache service.
//!
//! # Tasks
//! - Expired-entry sweep: reclaims stale rows from both tiers

mod sweep;

pub use sweep::spawn_sweep_task;
