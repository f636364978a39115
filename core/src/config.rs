/*
    spotify-roast-rs | Rust CLI tool to log in with Spotify and roast your music taste.
    Copyright (C) 2025  Israel Alberto Roldan Vega

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use reqwest::Url;
use rspotify::{scopes, Credentials, OAuth};
use std::collections::HashSet;
use std::env;
use thiserror::Error;

pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),
    #[error("Invalid redirect URI '{0}': expected <scheme>://<host>/...")]
    InvalidRedirectUri(String),
    #[error("Invalid endpoint URL '{0}'")]
    InvalidEndpoint(String),
}

/// Deployment-time settings for the login flow and both API clients.
#[derive(Clone)]
pub struct AppConfig {
    pub client_id: String,
    pub redirect_uri: String,
    pub scopes: HashSet<String>,
    pub authorize_url: String,
    pub token_url: String,
    pub api_base_url: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("api_base_url", &self.api_base_url)
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "<redacted>"))
            .field("gemini_model", &self.gemini_model)
            .field("gemini_base_url", &self.gemini_base_url)
            .finish()
    }
}

/// Scopes needed to read top artists/tracks.
/// - user-top-read: top items endpoints.
/// - user-read-private: profile details shown alongside them.
pub fn default_scopes() -> HashSet<String> {
    scopes!("user-top-read", "user-read-private")
}

impl AppConfig {
    /// Builds a config against the public Spotify and Gemini endpoints.
    pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            scopes: default_scopes(),
            authorize_url: format!("{}/authorize", DEFAULT_ACCOUNTS_URL),
            token_url: format!("{}/api/token", DEFAULT_ACCOUNTS_URL),
            api_base_url: DEFAULT_API_URL.to_string(),
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_URL.to_string(),
        }
    }

    /// Loads the configuration from the environment (and `.env`, via rspotify).
    ///
    /// Required: `RSPOTIFY_CLIENT_ID`, `RSPOTIFY_REDIRECT_URI`.
    /// Optional: `GEMINI_API_KEY`, `GEMINI_MODEL`, `SPOTIFY_ACCOUNTS_URL`,
    /// `SPOTIFY_API_URL`, `GEMINI_API_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        // PKCE is a public-client flow, so the secret is never read.
        let creds = Credentials::from_env().ok_or(ConfigError::Missing("RSPOTIFY_CLIENT_ID"))?;
        let oauth = OAuth::from_env(default_scopes())
            .ok_or(ConfigError::Missing("RSPOTIFY_REDIRECT_URI"))?;

        let accounts_url = env::var("SPOTIFY_ACCOUNTS_URL")
            .unwrap_or_else(|_| DEFAULT_ACCOUNTS_URL.to_string());
        let accounts_url = accounts_url.trim_end_matches('/');

        let config = Self {
            client_id: creds.id,
            redirect_uri: oauth.redirect_uri,
            scopes: oauth.scopes,
            authorize_url: format!("{}/authorize", accounts_url),
            token_url: format!("{}/api/token", accounts_url),
            api_base_url: env::var("SPOTIFY_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            gemini_api_key: non_blank(env::var("GEMINI_API_KEY").ok()),
            gemini_model: non_blank(env::var("GEMINI_MODEL").ok())
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_base_url: env::var("GEMINI_API_URL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_URL.to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// The redirect URI must be absolute with a host, e.g. `mood://slickback`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidRedirectUri(self.redirect_uri.clone());
        let url = Url::parse(&self.redirect_uri).map_err(|_| invalid())?;
        if url.host_str().map_or(true, str::is_empty) {
            return Err(invalid());
        }
        Ok(())
    }

    /// Space-separated scope string, sorted so URLs are stable.
    pub fn scope_param(&self) -> String {
        let mut scopes: Vec<&str> = self.scopes.iter().map(String::as_str).collect();
        scopes.sort_unstable();
        scopes.join(" ")
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_scheme_redirect_is_valid() {
        let config = AppConfig::new("client", "mood://slickback");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_redirect_without_host_is_rejected() {
        let config = AppConfig::new("client", "not a uri");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRedirectUri(_))
        ));

        let config = AppConfig::new("client", "mailto:someone@example.com");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_scope_param_is_sorted() {
        let config = AppConfig::new("client", "mood://slickback");
        assert_eq!(config.scope_param(), "user-read-private user-top-read");
    }

    #[test]
    fn test_blank_values_count_as_absent() {
        assert_eq!(non_blank(Some("   ".to_string())), None);
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some(" key ".to_string())), Some("key".to_string()));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let mut config = AppConfig::new("client", "mood://slickback");
        config.gemini_api_key = Some("super-secret".to_string());
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
