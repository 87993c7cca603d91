//! Background Tasks Module
//!
//! # Tasks
//! - Expiry Sweeper: Removes expired cache entries at the configured interval

mod sweeper;

pub use sweeper::spawn_expiry_sweeper;
