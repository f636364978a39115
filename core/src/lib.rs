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

pub mod auth;
pub mod config;
pub mod models;
pub mod pkce;
pub mod profile;
pub mod roast;
pub mod session;

// Re-export key items for convenience
pub use auth::{AccessToken, AuthError, AuthFlow, AuthState, AuthorizationCode};
pub use config::{AppConfig, ConfigError};
pub use models::{ArtistRecord, ImageDescriptor, TimeRange, TrackRecord};
pub use profile::{FetchError, ProfileClient};
pub use roast::{GeminiClient, RoastError, Roaster, TextGenerator};
pub use session::{Session, SessionError};
