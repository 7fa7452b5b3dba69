//! Credential handling.

pub mod credentials;

pub use credentials::{RedditCredentials, SecretString};
