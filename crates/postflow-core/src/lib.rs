//! # Postflow Core
//!
//! Shared foundation for the Postflow mailing dispatcher:
//! - domain types (campaigns, messages, clients, attempts)
//! - configuration (TOML, `~/.postflow/config.toml`)
//! - error type
//! - the store and mailer traits implemented by the leaf crates

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::PostflowConfig;
pub use error::{PostflowError, Result};
pub use traits::{CampaignStore, Mailer};
pub use types::{
    Attempt, AttemptOutcome, Campaign, CampaignStatus, Client, Message, NewAttempt, Periodicity,
};
