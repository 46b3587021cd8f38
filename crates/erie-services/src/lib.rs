//! erie/crates/erie-services/src/lib.rs
//!
//! Application services for ERIE: the operations behind each screen, built
//! on the `erie-core` record store. Every call takes an explicit
//! [`AppContext`].

pub mod accounts;
pub mod admin;
pub mod chat;
pub mod context;
pub mod feed;
pub mod profile;
pub mod scheduler;
pub mod support;
pub mod wallet;

pub use admin::SecretTap;
pub use context::{AppContext, RewardSettings};
pub use scheduler::{ScheduledTask, Scheduler, TaskOutcome};
