pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod search;

// Re-exports
pub use config::Settings;
pub use error::{Error, Result};
