//! Message retention
//!
//! Expired messages and their blobs are removed by a periodic sweep started
//! from `server::init::spawn_background_tasks`.

pub mod sweep;

pub use sweep::{clear_old_messages, run_periodic, SweepReport};
