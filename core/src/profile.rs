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

use crate::auth::AccessToken;
use crate::config::DEFAULT_API_URL;
use crate::models::{ArtistRecord, ImageDescriptor, TimeRange, TrackRecord};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Spotify rejected the access token (HTTP {0})")]
    Unauthorized(u16),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Unexpected response from Spotify: {0}")]
    ParseError(String),
    #[error("Spotify API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
}

// Wire schema of the /me/top/{type} endpoints. Optional fields are modelled
// as Option so an absent value falls back to a default while a present but
// mistyped value still fails the decode.

#[derive(Deserialize)]
struct Page<T> {
    items: Vec<T>,
}

#[derive(Deserialize)]
struct ArtistItem {
    id: String,
    name: String,
    #[serde(default)]
    images: Option<Vec<ImageItem>>,
}

#[derive(Deserialize)]
struct ImageItem {
    url: String,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

#[derive(Deserialize)]
struct TrackItem {
    name: String,
    artists: Vec<ArtistRef>,
}

#[derive(Deserialize)]
struct ArtistRef {
    name: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Reads the user's listening statistics from the Web API.
#[derive(Clone)]
pub struct ProfileClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for ProfileClient {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl ProfileClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Top artists in rank order. Zero items is a valid, empty result.
    pub async fn fetch_top_artists(
        &self,
        token: &AccessToken,
        limit: u32,
        time_range: TimeRange,
    ) -> Result<Vec<ArtistRecord>, FetchError> {
        let body = self.get_top("artists", token, limit, time_range).await?;
        parse_top_artists(&body)
    }

    /// Top tracks in rank order, each reduced to its first listed artist.
    pub async fn fetch_top_tracks(
        &self,
        token: &AccessToken,
        limit: u32,
        time_range: TimeRange,
    ) -> Result<Vec<TrackRecord>, FetchError> {
        let body = self.get_top("tracks", token, limit, time_range).await?;
        parse_top_tracks(&body)
    }

    async fn get_top(
        &self,
        kind: &str,
        token: &AccessToken,
        limit: u32,
        time_range: TimeRange,
    ) -> Result<String, FetchError> {
        let url = format!("{}/me/top/{}", self.base_url, kind);
        debug!("GET {} (limit={}, time_range={})", url, limit, time_range);

        let response = self
            .http
            .get(&url)
            .bearer_auth(token.as_str())
            .query(&[
                ("limit", limit.to_string()),
                ("time_range", time_range.as_str().to_string()),
            ])
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if status.is_success() {
            return Ok(body);
        }

        let code = status.as_u16();
        if code == 401 || code == 403 {
            warn!("Top {} request unauthorized (HTTP {})", kind, code);
            return Err(FetchError::Unauthorized(code));
        }

        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.error.message)
            .unwrap_or(body);
        warn!("Top {} request failed (HTTP {}): {}", kind, code, message);
        Err(FetchError::Api {
            status: code,
            message,
        })
    }
}

fn decode_page<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, FetchError> {
    serde_json::from_str::<Page<T>>(body)
        .map(|page| page.items)
        .map_err(|e| FetchError::ParseError(e.to_string()))
}

/// Decodes a top-artists page, keeping item and image order.
pub fn parse_top_artists(body: &str) -> Result<Vec<ArtistRecord>, FetchError> {
    let items: Vec<ArtistItem> = decode_page(body)?;

    Ok(items
        .into_iter()
        .map(|item| ArtistRecord {
            id: item.id,
            name: item.name,
            images: item
                .images
                .unwrap_or_default()
                .into_iter()
                .map(|img| ImageDescriptor {
                    url: img.url,
                    width: img.width.unwrap_or(0),
                    height: img.height.unwrap_or(0),
                })
                .collect(),
        })
        .collect())
}

/// Decodes a top-tracks page. A track without artists fails the whole page.
pub fn parse_top_tracks(body: &str) -> Result<Vec<TrackRecord>, FetchError> {
    let items: Vec<TrackItem> = decode_page(body)?;

    items
        .into_iter()
        .map(|item| {
            let artist = item.artists.into_iter().next().ok_or_else(|| {
                FetchError::ParseError(format!("track '{}' has no artists", item.name))
            })?;
            Ok(TrackRecord {
                name: item.name,
                artist: artist.name,
            })
        })
        .collect()
}
