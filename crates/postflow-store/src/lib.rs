//! # Postflow Store
//!
//! SQLite persistence for campaigns, messages, clients, and send attempts.
//! Implements the `CampaignStore` trait from postflow-core.

mod sqlite;

pub use sqlite::SqliteStore;
