//! HTTP trigger service and CLI around the `watchman` ingestion library.

pub mod config;
pub mod runner;
pub mod server;

pub use config::Config;
pub use runner::Watchman;
