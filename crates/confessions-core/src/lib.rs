//! confessions-core - Core library for Confessions
//!
//! This crate contains the shared models, storage backends, identity
//! resolution and feed/like logic used by every Confessions client.

pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod identity;
pub mod likes;
pub mod models;
pub mod services;
pub mod state;
pub mod store;
pub mod util;

#[cfg(test)]
mod testing;

pub use config::ClientConfig;
pub use error::{Error, Result};
pub use likes::{LikeState, ToggleOutcome};
pub use models::{Confession, ConfessionId, Identity, LikeRecord};
pub use services::ConfessionService;
pub use state::FeedSnapshot;
pub use store::{Backend, ConfessionStore};
