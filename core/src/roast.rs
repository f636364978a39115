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

use crate::config::{AppConfig, DEFAULT_GEMINI_MODEL, DEFAULT_GEMINI_URL};
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when the model answers without any text.
pub const FALLBACK_ROAST: &str = "Couldn't come up with a roast… their taste is too bland.";

#[derive(Error, Debug)]
pub enum RoastError {
    #[error("Generative API key is not configured (set GEMINI_API_KEY)")]
    MissingCredential,
    #[error("Generative API error: {0}")]
    ProviderError(String),
}

/// A text-generation backend. `Ok(None)` means the call succeeded but the
/// model produced no text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Option<String>, RoastError>;
}

/// Builds the roast prompt. Names are embedded in the order given, untruncated.
pub fn build_prompt(artist_names: &[String]) -> String {
    format!(
        "You are a brutally honest music critic.\n\
         Roast this person's music taste in a sarcastic, witty, playful way. In not more than 50 words.\n\
         No emojis. No compliments. Be clever and borderline offensive.\n\
         \n\
         Artists:\n\
         {}",
        artist_names.join("\n")
    )
}

/// Turns a list of artist names into a short roast.
pub struct Roaster<G = GeminiClient> {
    generator: G,
}

impl<G: TextGenerator> Roaster<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    pub async fn roast(&self, artist_names: &[String]) -> Result<String, RoastError> {
        info!("Generating roast for {} artists", artist_names.len());
        let prompt = build_prompt(artist_names);

        match self.generator.generate(&prompt).await? {
            Some(text) => Ok(text),
            None => {
                warn!("Model returned no text, using fallback roast");
                Ok(FALLBACK_ROAST.to_string())
            }
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    error: ProviderErrorDetail,
}

#[derive(Deserialize)]
struct ProviderErrorDetail {
    message: String,
}

/// Client for the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_GEMINI_URL.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            api_key,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.gemini_api_key.clone())
            .with_model(&config.gemini_model)
            .with_base_url(&config.gemini_base_url)
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<Option<String>, RoastError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(RoastError::MissingCredential)?;

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        debug!("POST {}", url);

        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RoastError::ProviderError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RoastError::ProviderError(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ProviderErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(RoastError::ProviderError(format!(
                "HTTP {}: {}",
                status.as_u16(),
                message
            )));
        }

        extract_text(&body)
    }
}

/// Concatenates the text parts of the first candidate.
fn extract_text(body: &str) -> Result<Option<String>, RoastError> {
    let parsed: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| RoastError::ProviderError(format!("unexpected response: {}", e)))?;

    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(text))
    }
}
