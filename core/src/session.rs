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

use crate::auth::{AccessToken, AuthError, AuthFlow, AuthState, AuthorizationCode};
use crate::config::{AppConfig, ConfigError};
use crate::models::{ArtistRecord, TimeRange, TrackRecord};
use crate::profile::{FetchError, ProfileClient};
use crate::roast::{GeminiClient, RoastError, Roaster, TextGenerator};
use log::info;
use reqwest::Url;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Not logged in: complete the Spotify login first")]
    NotAuthenticated,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Roast(#[from] RoastError),
}

/// One app session: the login flow, the token it yields, and the clients
/// that depend on that token.
pub struct Session<G = GeminiClient> {
    flow: AuthFlow,
    profile: ProfileClient,
    roaster: Roaster<G>,
}

impl Session<GeminiClient> {
    pub fn new(config: &AppConfig) -> Result<Self, ConfigError> {
        Self::with_generator(config, GeminiClient::from_config(config))
    }

    /// Starts already authenticated with a token obtained elsewhere.
    pub fn with_token(config: &AppConfig, token: AccessToken) -> Result<Self, ConfigError> {
        let mut session = Self::new(config)?;
        session.flow.set_access_token(token);
        Ok(session)
    }
}

impl<G: TextGenerator> Session<G> {
    pub fn with_generator(config: &AppConfig, generator: G) -> Result<Self, ConfigError> {
        Ok(Self {
            flow: AuthFlow::new(config)?,
            profile: ProfileClient::new(&config.api_base_url),
            roaster: Roaster::new(generator),
        })
    }

    pub fn auth_state(&self) -> AuthState {
        self.flow.state()
    }

    pub fn access_token(&self) -> Option<&AccessToken> {
        self.flow.access_token()
    }

    pub fn begin_login(&mut self) -> Url {
        self.flow.begin_login()
    }

    pub fn handle_redirect(&mut self, uri: &str) -> Result<AuthorizationCode, AuthError> {
        self.flow.handle_redirect(uri)
    }

    pub async fn exchange_code(
        &mut self,
        code: AuthorizationCode,
    ) -> Result<AccessToken, AuthError> {
        self.flow.exchange_code(code).await
    }

    /// Handles the redirect and exchanges its code in one step.
    pub async fn complete_login(&mut self, redirect_uri: &str) -> Result<AccessToken, AuthError> {
        let code = self.flow.handle_redirect(redirect_uri)?;
        self.flow.exchange_code(code).await
    }

    pub async fn top_artists(
        &self,
        limit: u32,
        time_range: TimeRange,
    ) -> Result<Vec<ArtistRecord>, SessionError> {
        let token = self.token()?;
        Ok(self
            .profile
            .fetch_top_artists(token, limit, time_range)
            .await?)
    }

    pub async fn top_tracks(
        &self,
        limit: u32,
        time_range: TimeRange,
    ) -> Result<Vec<TrackRecord>, SessionError> {
        let token = self.token()?;
        Ok(self
            .profile
            .fetch_top_tracks(token, limit, time_range)
            .await?)
    }

    /// Fetches the top artists and roasts them, best-ranked first.
    pub async fn roast_top_artists(
        &self,
        limit: u32,
        time_range: TimeRange,
    ) -> Result<String, SessionError> {
        let artists = self.top_artists(limit, time_range).await?;
        info!("Roasting {} top artists", artists.len());
        let names: Vec<String> = artists.into_iter().map(|a| a.name).collect();
        Ok(self.roaster.roast(&names).await?)
    }

    fn token(&self) -> Result<&AccessToken, SessionError> {
        self.flow
            .access_token()
            .ok_or(SessionError::NotAuthenticated)
    }
}
