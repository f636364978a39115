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

//! Authorization Code flow with PKCE against the Spotify accounts service.
//!
//! The flow is a single linear handshake held by [`AuthFlow`]:
//! `Idle -> AwaitingRedirect -> ExchangingToken -> Authenticated`, with
//! `Failed` reachable from any non-terminal state. Starting a new login
//! replaces the verifier, so codes from an earlier attempt are refused.

use crate::config::{AppConfig, ConfigError};
use crate::pkce::{self, CodeVerifier};
use log::{debug, info, warn};
use reqwest::Url;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authorization denied by user or provider: {0}")]
    Denied(String),
    #[error("Malformed redirect: {0}")]
    MalformedRedirect(String),
    #[error("Token exchange failed (HTTP {status}): {message}")]
    ExchangeFailed { status: u16, message: String },
    #[error("Network error during token exchange: {0}")]
    NetworkError(String),
    #[error("Authorization code does not belong to the active login attempt")]
    StaleLogin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Idle,
    AwaitingRedirect,
    ExchangingToken,
    Authenticated,
    Failed,
}

/// Opaque bearer token for the streaming API. Lives for the session only.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

/// Single-use code from the redirect, tied to the login attempt that produced it.
#[derive(Debug, PartialEq, Eq)]
pub struct AuthorizationCode {
    value: String,
    attempt: u64,
}

impl AuthorizationCode {
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

struct LoginAttempt {
    id: u64,
    verifier: CodeVerifier,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct TokenErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Drives one PKCE login at a time and holds the resulting token.
pub struct AuthFlow {
    http: reqwest::Client,
    client_id: String,
    redirect_uri: String,
    redirect: Url,
    authorize_url: Url,
    token_url: String,
    scope: String,
    state: AuthState,
    attempt: Option<LoginAttempt>,
    attempts_started: u64,
    token: Option<AccessToken>,
}

impl AuthFlow {
    pub fn new(config: &AppConfig) -> Result<Self, ConfigError> {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: &AppConfig, http: reqwest::Client) -> Result<Self, ConfigError> {
        config.validate()?;
        let redirect = Url::parse(&config.redirect_uri)
            .map_err(|_| ConfigError::InvalidRedirectUri(config.redirect_uri.clone()))?;
        let authorize_url = Url::parse(&config.authorize_url)
            .map_err(|_| ConfigError::InvalidEndpoint(config.authorize_url.clone()))?;

        Ok(Self {
            http,
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.clone(),
            redirect,
            authorize_url,
            token_url: config.token_url.clone(),
            scope: config.scope_param(),
            state: AuthState::Idle,
            attempt: None,
            attempts_started: 0,
            token: None,
        })
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn access_token(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }

    /// Installs a token obtained out of band, skipping the handshake.
    pub fn set_access_token(&mut self, token: AccessToken) {
        self.attempt = None;
        self.token = Some(token);
        self.state = AuthState::Authenticated;
    }

    /// Starts a login attempt and returns the URL the user must open.
    ///
    /// Any previous attempt (and any token) is discarded.
    pub fn begin_login(&mut self) -> Url {
        let verifier = pkce::generate_verifier();
        let challenge = pkce::derive_challenge(&verifier);

        self.attempts_started += 1;
        if self.attempt.is_some() {
            debug!("Discarding verifier of previous login attempt");
        }
        self.attempt = Some(LoginAttempt {
            id: self.attempts_started,
            verifier,
        });
        self.token = None;
        self.state = AuthState::AwaitingRedirect;
        info!("Login attempt {} started", self.attempts_started);

        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("code_challenge_method", "S256")
            .append_pair("code_challenge", challenge.as_str())
            .append_pair("scope", &self.scope);
        url
    }

    /// Parses the custom-scheme redirect delivered back to the app.
    ///
    /// A URI that is not our registered redirect is rejected without touching
    /// the flow state; a provider answer (code or error) ends the wait.
    pub fn handle_redirect(&mut self, uri: &str) -> Result<AuthorizationCode, AuthError> {
        if self.state != AuthState::AwaitingRedirect {
            return Err(AuthError::MalformedRedirect(
                "no login is waiting for a redirect".to_string(),
            ));
        }

        let url = Url::parse(uri.trim())
            .map_err(|e| AuthError::MalformedRedirect(format!("unparseable URI: {}", e)))?;
        if url.scheme() != self.redirect.scheme() || url.host_str() != self.redirect.host_str() {
            return Err(AuthError::MalformedRedirect(format!(
                "expected a redirect to {}",
                self.redirect_uri
            )));
        }

        let mut code = None;
        let mut error = None;
        let mut error_description = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "error" => error = Some(value.into_owned()),
                "error_description" => error_description = Some(value.into_owned()),
                _ => {}
            }
        }

        if let Some(error) = error {
            warn!("Authorization denied: {}", error);
            self.fail();
            let reason = match error_description {
                Some(desc) => format!("{} ({})", error, desc),
                None => error,
            };
            return Err(AuthError::Denied(reason));
        }

        let attempt_id = self.attempt.as_ref().map(|a| a.id);
        match (code, attempt_id) {
            (Some(value), Some(attempt)) if !value.is_empty() => {
                self.state = AuthState::ExchangingToken;
                debug!("Received authorization code for attempt {}", attempt);
                Ok(AuthorizationCode { value, attempt })
            }
            _ => {
                self.fail();
                Err(AuthError::MalformedRedirect(
                    "redirect carries neither 'code' nor 'error'".to_string(),
                ))
            }
        }
    }

    /// Trades the authorization code for an access token.
    pub async fn exchange_code(
        &mut self,
        code: AuthorizationCode,
    ) -> Result<AccessToken, AuthError> {
        let verifier = match self.attempt.as_ref() {
            Some(attempt)
                if attempt.id == code.attempt && self.state == AuthState::ExchangingToken =>
            {
                attempt.verifier.clone()
            }
            _ => return Err(AuthError::StaleLogin),
        };

        match self.request_token(&code, &verifier).await {
            Ok(token) => {
                // The verifier is single use.
                self.attempt = None;
                self.token = Some(token.clone());
                self.state = AuthState::Authenticated;
                info!("Login attempt {} authenticated", code.attempt);
                Ok(token)
            }
            Err(e) => {
                warn!("Token exchange failed: {}", e);
                self.fail();
                Err(e)
            }
        }
    }

    async fn request_token(
        &self,
        code: &AuthorizationCode,
        verifier: &CodeVerifier,
    ) -> Result<AccessToken, AuthError> {
        debug!("POST {}", self.token_url);
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("grant_type", "authorization_code"),
                ("code", code.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("code_verifier", verifier.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::NetworkError(e.to_string()))?;

        // Error responses carry a JSON body too, so always read it.
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::NetworkError(e.to_string()))?;

        parse_token_response(status.as_u16(), status.is_success(), &body)
    }

    fn fail(&mut self) {
        self.attempt = None;
        self.state = AuthState::Failed;
    }
}

fn parse_token_response(status: u16, success: bool, body: &str) -> Result<AccessToken, AuthError> {
    if !success {
        let message = match serde_json::from_str::<TokenErrorBody>(body) {
            Ok(TokenErrorBody {
                error,
                error_description: Some(desc),
            }) => format!("{}: {}", error, desc),
            Ok(TokenErrorBody { error, .. }) => error,
            Err(_) => body.to_string(),
        };
        return Err(AuthError::ExchangeFailed { status, message });
    }

    let parsed: TokenResponse =
        serde_json::from_str(body).map_err(|e| AuthError::ExchangeFailed {
            status,
            message: format!("unexpected token response: {}", e),
        })?;
    if parsed.access_token.is_empty() {
        return Err(AuthError::ExchangeFailed {
            status,
            message: "empty access_token".to_string(),
        });
    }
    Ok(AccessToken(parsed.access_token))
}
