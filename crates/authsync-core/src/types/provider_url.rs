//! Identity-provider URL type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::{Error, InvalidInputError};

/// A validated identity-provider base URL (e.g. a Supabase project URL).
///
/// The URL must use HTTPS, or HTTP when pointing at localhost. The auth API
/// lives under `/auth/v1` relative to this base.
///
/// # Example
///
/// ```
/// use authsync_core::ProviderUrl;
///
/// let url = ProviderUrl::new("https://xyz.supabase.co").unwrap();
/// assert_eq!(url.auth_url("user"), "https://xyz.supabase.co/auth/v1/user");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProviderUrl(Url);

impl ProviderUrl {
    /// Create a new provider URL from a string, validating the format.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not valid or doesn't meet requirements.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let s = s.as_ref();
        let url = Url::parse(s).map_err(|e| InvalidInputError::ProviderUrl {
            value: s.to_string(),
            reason: e.to_string(),
        })?;

        Self::validate(&url, s)?;

        Ok(Self(url))
    }

    /// Returns the auth API URL for a path such as `user` or
    /// `token?grant_type=password`.
    pub fn auth_url(&self, path: &str) -> String {
        // Url always renders a root path as "/", so trim before joining
        let base = self.0.as_str().trim_end_matches('/');
        format!("{}/auth/v1/{}", base, path.trim_start_matches('/'))
    }

    /// Returns the base URL as a string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the inner URL.
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Returns the host string.
    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }

    fn validate(url: &Url, original: &str) -> Result<(), Error> {
        if url.cannot_be_a_base() {
            return Err(InvalidInputError::ProviderUrl {
                value: original.to_string(),
                reason: "must be an absolute URL".to_string(),
            }
            .into());
        }

        let scheme = url.scheme();
        let is_localhost = url
            .host_str()
            .is_some_and(|h| h == "localhost" || h == "127.0.0.1" || h == "[::1]" || h == "::1");

        if scheme != "https" && !(scheme == "http" && is_localhost) {
            return Err(InvalidInputError::ProviderUrl {
                value: original.to_string(),
                reason: "must use HTTPS (HTTP allowed only for localhost)".to_string(),
            }
            .into());
        }

        if url.host_str().is_none() {
            return Err(InvalidInputError::ProviderUrl {
                value: original.to_string(),
                reason: "must have a host".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

impl fmt::Display for ProviderUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProviderUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for ProviderUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for ProviderUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ProviderUrl::new(&s).map_err(serde::de::Error::custom)
    }
}

impl AsRef<str> for ProviderUrl {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_https_url() {
        let url = ProviderUrl::new("https://xyz.supabase.co").unwrap();
        assert_eq!(url.host(), Some("xyz.supabase.co"));
    }

    #[test]
    fn valid_localhost_http() {
        let url = ProviderUrl::new("http://127.0.0.1:54321").unwrap();
        assert_eq!(url.host(), Some("127.0.0.1"));
    }

    #[test]
    fn auth_url_construction() {
        let url = ProviderUrl::new("https://xyz.supabase.co").unwrap();
        assert_eq!(
            url.auth_url("token?grant_type=password"),
            "https://xyz.supabase.co/auth/v1/token?grant_type=password"
        );
    }

    #[test]
    fn trailing_slash_does_not_double_up() {
        let url = ProviderUrl::new("https://xyz.supabase.co/").unwrap();
        assert_eq!(url.auth_url("/user"), "https://xyz.supabase.co/auth/v1/user");
    }

    #[test]
    fn invalid_http_non_localhost() {
        assert!(ProviderUrl::new("http://xyz.supabase.co").is_err());
    }

    #[test]
    fn invalid_relative_url() {
        assert!(ProviderUrl::new("/auth/v1/user").is_err());
    }

    #[test]
    fn deserializes_with_validation() {
        let ok: ProviderUrl = serde_json::from_str("\"https://a.example\"").unwrap();
        assert_eq!(ok.host(), Some("a.example"));
        assert!(serde_json::from_str::<ProviderUrl>("\"ftp://a.example\"").is_err());
    }
}
