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

//! PKCE (RFC 7636) verifier and S256 challenge generation.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::fmt;

/// Number of random bytes behind a verifier.
pub const VERIFIER_ENTROPY_BYTES: usize = 64;

/// The client-held PKCE secret, base64url-encoded without padding.
#[derive(Clone, PartialEq, Eq)]
pub struct CodeVerifier(String);

impl CodeVerifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Keep the secret out of logs.
impl fmt::Debug for CodeVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CodeVerifier(..)")
    }
}

/// Public value sent with the authorization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeChallenge(String);

impl CodeChallenge {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CodeChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generates a fresh verifier from the operating system's CSPRNG.
pub fn generate_verifier() -> CodeVerifier {
    let mut bytes = [0u8; VERIFIER_ENTROPY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    CodeVerifier(URL_SAFE_NO_PAD.encode(bytes))
}

/// Derives the S256 challenge: base64url(SHA-256(ascii(verifier))).
pub fn derive_challenge(verifier: &CodeVerifier) -> CodeChallenge {
    let digest = Sha256::digest(verifier.as_str().as_bytes());
    CodeChallenge(URL_SAFE_NO_PAD.encode(digest))
}
