//! # Enrichr Common Library
//!
//! Shared code for the enrichr crates including:
//! - Common error type
//! - Event types (EnrichEvent) and the broadcast event bus
//! - TOML configuration loading
//! - Tracing subscriber initialization

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
pub use events::{EnrichEvent, EventBus, JobStatus};
