// Copyright 2025 itscheems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! OAuth2 client-credentials session
//!
//! The session owns everything about token lifetime: it performs the grant,
//! remembers when the token expires and refreshes it on demand. The holder
//! of the token (the transport) only receives new tokens through the
//! callback passed to [`OAuthSession::refresh_if_expired`].

use std::fmt;
use std::time::{Duration, Instant};

use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Tokens are refreshed this long before the server-side expiry
const EXPIRY_SKEW: Duration = Duration::from_secs(30);

/// Error types for token acquisition
#[derive(Debug, Error)]
pub enum OAuthError {
	#[error("Token request failed: {0}")]
	Network(String),
	#[error("Token endpoint returned HTTP {status}: {body}")]
	Rejected { status: u16, body: String },
	#[error("Invalid token response: {0}")]
	InvalidResponse(String),
}

/// Client ID and secret issued to the partner
#[derive(Clone)]
pub struct ClientCredentials {
	client_id: String,
	client_secret: String,
}

impl ClientCredentials {
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self {
			client_id: client_id.into(),
			client_secret: client_secret.into(),
		}
	}

	pub fn client_id(&self) -> &str {
		&self.client_id
	}
}

impl fmt::Debug for ClientCredentials {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ClientCredentials")
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.finish()
	}
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
	access_token: Option<String>,
	#[serde(default)]
	token_type: Option<String>,
	#[serde(default)]
	expires_in: Option<u64>,
}

/// Access token plus its local expiry deadline
pub struct AccessToken {
	pub secret: String,
	pub expires_at: Option<Instant>,
}

impl fmt::Debug for AccessToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AccessToken")
			.field("secret", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Client-credentials grant against a single token endpoint
pub struct OAuthSession {
	http: ReqwestClient,
	token_url: String,
	credentials: ClientCredentials,
	// Held across the refresh request so concurrent senders refresh once.
	expires_at: Mutex<Option<Instant>>,
}

impl fmt::Debug for OAuthSession {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("OAuthSession")
			.field("token_url", &self.token_url)
			.field("credentials", &self.credentials)
			.finish()
	}
}

impl OAuthSession {
	pub fn new(http: ReqwestClient, token_url: impl Into<String>, credentials: ClientCredentials) -> Self {
		Self {
			http,
			token_url: token_url.into(),
			credentials,
			expires_at: Mutex::new(None),
		}
	}

	/// Perform the grant and return the new access token
	pub async fn fetch_token(&self) -> Result<String, OAuthError> {
		let mut expires_at = self.expires_at.lock().await;
		let token = self.request_token().await?;
		*expires_at = token.expires_at;
		Ok(token.secret)
	}

	/// Refresh the token if it has expired, handing the new one to `on_refresh`
	///
	/// Tokens without an `expires_in` are treated as non-expiring.
	pub async fn refresh_if_expired<F>(&self, on_refresh: F) -> Result<(), OAuthError>
	where
		F: FnOnce(String),
	{
		let mut expires_at = self.expires_at.lock().await;
		if !is_expired(*expires_at, Instant::now()) {
			return Ok(());
		}

		info!(target: "sat_sdk", "Access token expired, refreshing");
		let token = self.request_token().await?;
		*expires_at = token.expires_at;
		on_refresh(token.secret);
		Ok(())
	}

	async fn request_token(&self) -> Result<AccessToken, OAuthError> {
		debug!(
			target: "sat_sdk",
			token_url = %self.token_url,
			client_id = %self.credentials.client_id,
			"Requesting access token"
		);

		let response = self
			.http
			.post(&self.token_url)
			.basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
			.form(&[("grant_type", "client_credentials")])
			.send()
			.await
			.map_err(|e| OAuthError::Network(e.to_string()))?;

		let status = response.status();
		if !status.is_success() {
			let body = response
				.text()
				.await
				.unwrap_or_else(|_| format!("HTTP {}", status));
			return Err(OAuthError::Rejected {
				status: status.as_u16(),
				body,
			});
		}

		let body = response
			.bytes()
			.await
			.map_err(|e| OAuthError::Network(e.to_string()))?;

		parse_token_response(&body, Instant::now())
	}
}

fn parse_token_response(body: &[u8], now: Instant) -> Result<AccessToken, OAuthError> {
	let parsed: TokenResponse =
		serde_json::from_slice(body).map_err(|e| OAuthError::InvalidResponse(e.to_string()))?;

	let secret = parsed
		.access_token
		.filter(|token| !token.is_empty())
		.ok_or_else(|| OAuthError::InvalidResponse("missing access_token".to_string()))?;

	if let Some(token_type) = parsed.token_type.as_deref()
		&& !token_type.eq_ignore_ascii_case("bearer")
	{
		debug!(target: "sat_sdk", token_type, "Unexpected token type, using as bearer");
	}

	// A lifetime past the clock's range never expires
	let expires_at = parsed.expires_in.and_then(|secs| {
		now.checked_add(Duration::from_secs(secs).saturating_sub(EXPIRY_SKEW))
	});

	Ok(AccessToken { secret, expires_at })
}

fn is_expired(expires_at: Option<Instant>, now: Instant) -> bool {
	matches!(expires_at, Some(deadline) if now >= deadline)
}
