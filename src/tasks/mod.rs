//! Background Tasks Module
//!
//! # Tasks
//! - Sweeper: purges expired keys from the in-memory store at a fixed interval

mod sweeper;

pub use sweeper::spawn_sweeper;
