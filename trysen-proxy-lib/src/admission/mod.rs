//! Admission control for issue submissions.
//!
//! Two gates run for every classified request:
//!
//! 1. **Interval ceiling**: once `ceiling` submissions were accepted in the current interval,
//!    every further one is dropped until the interval ends.
//! 2. **Per-client budget**: each client address gets `current_limit` submissions. Every
//!    accepted submission pushes the expiry of the client's entry one window further, so the
//!    budget only refills after the client stayed quiet for a whole window.
//!
//! At the end of each interval the budget handed to new clients is recomputed: if the ceiling
//! was hit, it shrinks in proportion to how early that happened.
//!
//! ```toml
//! [admission]
//! interval_secs = 60
//! ceiling = 240
//! base_limit = 8
//! cache_capacity = 8192
//! hold_delay_secs = 32
//! ```

mod cache;
mod controller;
mod scheduler;

pub use cache::BoundedExpiringCache;
pub use controller::{adaptive_limit, AdmissionController, Decision, IntervalSnapshot};
pub use scheduler::spawn_interval_ticker;
