//! Redacted secrets for API credentials, held in `secrecy` boxes that are
//! zeroed on drop.

use secrecy::{ExposeSecret, SecretBox};
use std::fmt;

const REDACTED: &str = "[REDACTED]";

/// Token, API key or password. Formats as `[REDACTED]`; only
/// [`expose`](Self::expose) yields the value, when a request is built.
pub struct SecretString(SecretBox<str>);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(value.into().into_boxed_str()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

/// Reddit "script" app credentials used for the password-grant handshake.
///
/// `client_id` is the app's personal-use-script id, `client_secret` its token.
#[derive(Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
    pub username: String,
    pub password: SecretString,
}

impl RedditCredentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: SecretString::new(client_secret),
            username: username.into(),
            password: SecretString::new(password),
        }
    }
}

impl fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &REDACTED)
            .field("username", &self.username)
            .field("password", &REDACTED)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_is_redacted_when_formatted() {
        let secret = SecretString::new("AAAA-bearer-token");
        assert_eq!(format!("{:?}", secret), "[REDACTED]");
        assert_eq!(format!("{}", secret), "[REDACTED]");
        assert_eq!(secret.expose(), "AAAA-bearer-token");
    }

    #[test]
    fn test_clone_keeps_value() {
        let secret = SecretString::new(String::from("api-key"));
        assert_eq!(secret.clone().expose(), "api-key");
    }

    #[test]
    fn test_reddit_credentials_debug() {
        let creds = RedditCredentials::new("script-id", "script-secret", "watcher", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("script-id"));
        assert!(debug.contains("watcher"));
        assert!(!debug.contains("script-secret"));
        assert!(!debug.contains("hunter2"));
    }
}
