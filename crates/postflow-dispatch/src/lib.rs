//! # Postflow Dispatch
//!
//! The dispatcher core: decides which campaigns are due, advances campaign
//! statuses through their lifecycle, and runs the periodic send sweep.
//!
//! ## Architecture
//! ```text
//! Dispatcher loop (tokio interval, default 59s, single instance)
//!   ├── advance_statuses: created → launched → completed
//!   └── run_dispatch: for each launched, non-disabled campaign
//!         ├── latest attempt → is_due gate (1/7/30-day spacing)
//!         ├── Mailer::send (one batch per campaign)
//!         └── record Attempt (success | failure + server response)
//! ```
//!
//! Store and mailer are injected via the postflow-core traits; nothing in
//! this crate opens a database or a socket on its own.

pub mod due;
pub mod engine;
pub mod runner;
pub mod status;

pub use due::is_due;
pub use engine::Dispatcher;
pub use runner::{DispatchReport, run_dispatch};
pub use status::{advance_statuses, next_status};
