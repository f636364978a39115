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

mod common;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use common::{closed_port_url, spawn_stub};
use roast_core::{AppConfig, AuthError, AuthFlow, AuthState};
use sha2::{Digest, Sha256};

fn config_with_accounts(base: &str) -> AppConfig {
    let mut config = AppConfig::new("client-123", "mood://slickback");
    config.authorize_url = format!("{}/authorize", base);
    config.token_url = format!("{}/api/token", base);
    config
}

#[tokio::test]
async fn test_exchange_returns_access_token() {
    let (base, server) = spawn_stub(
        200,
        r#"{"access_token":"abc123","token_type":"Bearer","scope":"user-top-read","expires_in":3600}"#,
    )
    .await;
    let mut flow = AuthFlow::new(&config_with_accounts(&base)).unwrap();

    let authorize_url = flow.begin_login();
    let challenge = authorize_url
        .query_pairs()
        .find(|(k, _)| k == "code_challenge")
        .map(|(_, v)| v.into_owned())
        .unwrap();

    let code = flow
        .handle_redirect("mood://slickback?code=the-code")
        .unwrap();
    let token = flow.exchange_code(code).await.unwrap();

    assert_eq!(token.as_str(), "abc123");
    assert_eq!(flow.state(), AuthState::Authenticated);
    assert_eq!(flow.access_token().unwrap().as_str(), "abc123");

    let request = server.await.unwrap();
    assert_eq!(request.method, "POST");
    assert_eq!(request.path(), "/api/token");
    assert_eq!(
        request.header("content-type"),
        Some("application/x-www-form-urlencoded")
    );
    assert_eq!(request.form_value("client_id").as_deref(), Some("client-123"));
    assert_eq!(
        request.form_value("grant_type").as_deref(),
        Some("authorization_code")
    );
    assert_eq!(request.form_value("code").as_deref(), Some("the-code"));
    assert_eq!(
        request.form_value("redirect_uri").as_deref(),
        Some("mood://slickback")
    );

    // The verifier sent must be the one behind the challenge in the login URL.
    let verifier = request.form_value("code_verifier").unwrap();
    assert_eq!(URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes())), challenge);
}

#[tokio::test]
async fn test_exchange_reports_provider_error_body() {
    let (base, server) = spawn_stub(400, r#"{"error":"invalid_grant"}"#).await;
    let mut flow = AuthFlow::new(&config_with_accounts(&base)).unwrap();

    flow.begin_login();
    let code = flow.handle_redirect("mood://slickback?code=used").unwrap();
    let err = flow.exchange_code(code).await.unwrap_err();

    match err {
        AuthError::ExchangeFailed { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "invalid_grant");
        }
        other => panic!("expected ExchangeFailed, got {:?}", other),
    }
    assert_eq!(flow.state(), AuthState::Failed);
    assert!(flow.access_token().is_none());
    server.await.unwrap();
}

#[tokio::test]
async fn test_exchange_rejects_success_without_token() {
    let (base, server) = spawn_stub(200, r#"{"token_type":"Bearer"}"#).await;
    let mut flow = AuthFlow::new(&config_with_accounts(&base)).unwrap();

    flow.begin_login();
    let code = flow.handle_redirect("mood://slickback?code=c").unwrap();
    let err = flow.exchange_code(code).await.unwrap_err();

    assert!(matches!(err, AuthError::ExchangeFailed { status: 200, .. }));
    server.await.unwrap();
}

#[tokio::test]
async fn test_exchange_transport_failure_is_network_error() {
    let base = closed_port_url().await;
    let mut flow = AuthFlow::new(&config_with_accounts(&base)).unwrap();

    flow.begin_login();
    let code = flow.handle_redirect("mood://slickback?code=c").unwrap();
    let err = flow.exchange_code(code).await.unwrap_err();

    assert!(matches!(err, AuthError::NetworkError(_)));
    assert_eq!(flow.state(), AuthState::Failed);
}

#[tokio::test]
async fn test_denied_redirect_never_reaches_token_endpoint() {
    let base = closed_port_url().await;
    let mut flow = AuthFlow::new(&config_with_accounts(&base)).unwrap();

    flow.begin_login();
    let err = flow
        .handle_redirect("mood://slickback?error=access_denied")
        .unwrap_err();

    assert!(matches!(err, AuthError::Denied(_)));
    assert_ne!(flow.state(), AuthState::ExchangingToken);
}
