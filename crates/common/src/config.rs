//! Credentials for the account under test

use std::fmt;

use crate::error::{Error, Result};

/// Environment variable holding the login landing URL
pub const URL_ENV: &str = "EXCEL_URL";
/// Environment variable holding the account user name
pub const USERNAME_ENV: &str = "EXCEL_USERNAME";
/// Environment variable holding the account password
pub const PASSWORD_ENV: &str = "EXCEL_PASSWORD";

/// Login target and account credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub url: String,
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Read credentials from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through `lookup`. Missing and empty values are both
    /// reported as [`Error::MissingEnv`] naming the key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| Error::MissingEnv(key.to_string()))
        };

        Ok(Self {
            url: require(URL_ENV)?,
            username: require(USERNAME_ENV)?,
            password: require(PASSWORD_ENV)?,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
