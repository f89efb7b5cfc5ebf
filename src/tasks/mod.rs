//! Background Tasks Module
//!
//! Contains periodic maintenance tasks for the cache.

mod sweeper;

pub use sweeper::{spawn_configured_sweeper, spawn_expiry_sweeper, SweeperHandle};
