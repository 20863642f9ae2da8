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

//! Authenticated HTTP transport
//!
//! Every request leaving the SDK goes through [`Transport::send`], which
//! stamps the standard SAT headers and the current bearer token. The token
//! is obtained once at construction and afterwards only replaced through the
//! OAuth session's refresh callback.
//!
//! There is no retry policy: each `send` is exactly one attempt, and 4xx/5xx
//! responses come back as ordinary [`RawResponse`]s.

use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{
	ACCEPT, AUTHORIZATION, CONTENT_TYPE, DATE, HeaderMap, HeaderName, HeaderValue,
	InvalidHeaderValue,
};
use reqwest::{Client as ReqwestClient, Method};
use thiserror::Error;
use tracing::debug;

use crate::constants::{DATE_TIME_FORMAT, JSON_MEDIA_TYPE, SDK_LABEL, SDK_VERSION_HEADER_KEY};
use crate::oauth::{ClientCredentials, OAuthError, OAuthSession};
use crate::types::RawResponse;

/// Error types for transport operations
#[derive(Debug, Error)]
pub enum TransportError {
	#[error("Failed to create HTTP client: {0}")]
	Build(String),
	#[error("Failed to obtain access token: {0}")]
	Token(#[from] OAuthError),
	#[error("Invalid header value: {0}")]
	InvalidHeader(String),
	#[error("Network error: {0}")]
	Network(String),
}

impl From<InvalidHeaderValue> for TransportError {
	fn from(e: InvalidHeaderValue) -> Self {
		TransportError::InvalidHeader(e.to_string())
	}
}

/// Bearer token slot shared by all in-flight requests
///
/// Readers always see either the old or the new token, never a partial
/// write.
pub struct TokenCell {
	inner: RwLock<Arc<str>>,
}

impl TokenCell {
	pub fn new(token: impl Into<Arc<str>>) -> Self {
		Self {
			inner: RwLock::new(token.into()),
		}
	}

	pub fn current(&self) -> Arc<str> {
		match self.inner.read() {
			Ok(guard) => Arc::clone(&guard),
			Err(poisoned) => Arc::clone(&poisoned.into_inner()),
		}
	}

	pub fn replace(&self, token: impl Into<Arc<str>>) {
		let token = token.into();
		match self.inner.write() {
			Ok(mut guard) => *guard = token,
			Err(poisoned) => *poisoned.into_inner() = token,
		}
	}
}

impl fmt::Debug for TokenCell {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("TokenCell(<redacted>)")
	}
}

/// Settings needed to build a [`Transport`]
#[derive(Debug, Clone)]
pub struct TransportSettings {
	pub token_url: String,
	pub credentials: ClientCredentials,
	/// `None` keeps reqwest's default (no timeout)
	pub timeout: Option<Duration>,
	/// Log request and response bodies
	pub debug: bool,
}

/// Outbound request before authentication headers are applied
#[derive(Debug, Clone)]
pub struct ApiRequest {
	pub method: Method,
	pub url: String,
	pub query: Vec<(String, String)>,
	pub headers: Vec<(HeaderName, String)>,
	pub body: Option<Vec<u8>>,
}

impl ApiRequest {
	pub fn new(method: Method, url: impl Into<String>) -> Self {
		Self {
			method,
			url: url.into(),
			query: Vec::new(),
			headers: Vec::new(),
			body: None,
		}
	}

	pub fn get(url: impl Into<String>) -> Self {
		Self::new(Method::GET, url)
	}

	pub fn post(url: impl Into<String>) -> Self {
		Self::new(Method::POST, url)
	}

	pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));
		self
	}

	pub fn with_header(mut self, name: HeaderName, value: impl Into<String>) -> Self {
		self.headers.push((name, value.into()));
		self
	}

	pub fn with_body(mut self, body: Vec<u8>) -> Self {
		self.body = Some(body);
		self
	}
}

/// HTTP session authenticated with an OAuth2 client-credentials token
pub struct Transport {
	http: ReqwestClient,
	oauth: OAuthSession,
	token: TokenCell,
	debug: bool,
}

impl fmt::Debug for Transport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Transport")
			.field("oauth", &self.oauth)
			.field("debug", &self.debug)
			.finish()
	}
}

impl Transport {
	/// Build the HTTP session and obtain the first access token
	///
	/// Fails if no token can be obtained; there is no degraded mode.
	pub async fn connect(settings: TransportSettings) -> Result<Self, TransportError> {
		let mut builder = ReqwestClient::builder();
		if let Some(timeout) = settings.timeout {
			builder = builder.timeout(timeout);
		}
		let http = builder
			.build()
			.map_err(|e| TransportError::Build(e.to_string()))?;

		let oauth = OAuthSession::new(http.clone(), settings.token_url, settings.credentials);
		let token = oauth.fetch_token().await?;

		Ok(Self {
			http,
			oauth,
			token: TokenCell::new(token),
			debug: settings.debug,
		})
	}

	/// Send one request with the standard headers and bearer token attached
	pub async fn send(&self, request: ApiRequest) -> Result<RawResponse, TransportError> {
		self.oauth
			.refresh_if_expired(|token| self.token.replace(token))
			.await?;

		let ApiRequest {
			method,
			url,
			query,
			headers,
			body,
		} = request;

		let mut builder = self.http.request(method.clone(), &url);
		if !query.is_empty() {
			builder = builder.query(&query);
		}
		for (name, value) in headers {
			builder = builder.header(name, HeaderValue::from_str(&value)?);
		}
		if let Some(body) = body {
			if self.debug {
				debug!(target: "sat_sdk", body = %String::from_utf8_lossy(&body), "Request body");
			}
			builder = builder.body(body);
		}

		let mut http_request = builder
			.build()
			.map_err(|e| TransportError::Network(e.to_string()))?;
		apply_standard_headers(http_request.headers_mut(), &self.token.current(), Utc::now())?;

		let final_url = http_request.url().to_string();
		debug!(target: "sat_sdk", method = %method, url = %final_url, "Sending request");

		let response = self
			.http
			.execute(http_request)
			.await
			.map_err(|e| TransportError::Network(format!("Request failed: {}", e)))?;

		let status = response.status();
		let response_headers = response.headers().clone();
		let body = response
			.bytes()
			.await
			.map_err(|e| TransportError::Network(format!("Failed to read response body: {}", e)))?
			.to_vec();

		debug!(target: "sat_sdk", method = %method, url = %final_url, status = status.as_u16(), "Received response");
		if self.debug {
			debug!(target: "sat_sdk", body = %String::from_utf8_lossy(&body), "Response body");
		}

		Ok(RawResponse {
			method,
			url: final_url,
			status,
			headers: response_headers,
			body,
		})
	}
}

/// Overwrite the headers every SAT request must carry
fn apply_standard_headers(
	headers: &mut HeaderMap,
	bearer: &str,
	now: DateTime<Utc>,
) -> Result<(), TransportError> {
	headers.insert(
		DATE,
		HeaderValue::from_str(&now.format(DATE_TIME_FORMAT).to_string())?,
	);
	headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MEDIA_TYPE));
	headers.insert(ACCEPT, HeaderValue::from_static(JSON_MEDIA_TYPE));
	headers.insert(
		HeaderName::from_static(SDK_VERSION_HEADER_KEY),
		HeaderValue::from_static(SDK_LABEL),
	);
	let mut authorization = HeaderValue::from_str(&format!("Bearer {}", bearer))?;
	authorization.set_sensitive(true);
	headers.insert(AUTHORIZATION, authorization);
	Ok(())
}
