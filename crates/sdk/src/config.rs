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

//! Client configuration
//!
//! # Environment
//!
//! [`SatClientConfig::from_env`] reads a `.env` file (if present) and then
//! the following variables:
//!
//! - `SAT_CLIENT_ID`, `SAT_CLIENT_SECRET` (required)
//! - `SAT_PRIVATE_KEY` (PEM text) or `SAT_PRIVATE_KEY_FILE` (path), one required
//! - `SAT_PUBLIC_KEY` or `SAT_PUBLIC_KEY_FILE`
//! - `SAT_PADDING_TYPE` (default: `PSS`)
//! - `SAT_DEBUG` (default: `false`)
//! - `SAT_BASE_URL` (default: playground URL)
//! - `SAT_ACCESS_TOKEN_URL`
//! - `SAT_TIMEOUT_SECS` (default: `30`)

use std::path::Path;
use std::time::Duration;

use ::config::builder::DefaultState;
use ::config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;

use crate::constants::{ACCESS_TOKEN_URL, DEFAULT_TIMEOUT_SECS, PLAYGROUND_SAT_BASE_URL};
use crate::error::SatError;
use crate::signing::PaddingScheme;

/// Prefix of every environment variable read by [`SatClientConfig::from_env`]
pub const ENV_PREFIX: &str = "SAT";

/// Settings used to build a [`SatClient`](crate::client::SatClient)
#[derive(Clone)]
pub struct SatClientConfig {
	pub client_id: String,
	pub client_secret: String,
	pub private_key: String,
	pub public_key: Option<String>,
	pub padding_type: PaddingScheme,
	pub debug: bool,
	pub base_url: String,
	pub access_token_url: String,
	pub timeout: Option<Duration>,
}

impl std::fmt::Debug for SatClientConfig {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SatClientConfig")
			.field("client_id", &self.client_id)
			.field("padding_type", &self.padding_type)
			.field("debug", &self.debug)
			.field("base_url", &self.base_url)
			.field("access_token_url", &self.access_token_url)
			.field("timeout", &self.timeout)
			.finish_non_exhaustive()
	}
}

impl SatClientConfig {
	/// Create a configuration with default settings
	///
	/// All three arguments are required and must not be blank.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		private_key: impl Into<String>,
	) -> Result<Self, SatError> {
		let client_id = client_id.into();
		let client_secret = client_secret.into();
		let private_key = private_key.into();

		require("client_id", &client_id)?;
		require("client_secret", &client_secret)?;
		require("private_key", &private_key)?;

		Ok(Self {
			client_id,
			client_secret,
			private_key,
			public_key: None,
			padding_type: PaddingScheme::default(),
			debug: false,
			base_url: PLAYGROUND_SAT_BASE_URL.to_string(),
			access_token_url: ACCESS_TOKEN_URL.to_string(),
			timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
		})
	}

	/// Public key used to verify callbacks
	pub fn with_public_key(mut self, public_key: impl Into<String>) -> Self {
		self.public_key = Some(public_key.into());
		self
	}

	pub fn with_padding_type(mut self, padding_type: PaddingScheme) -> Self {
		self.padding_type = padding_type;
		self
	}

	/// Log request and response bodies at `debug` level
	pub fn with_debug(mut self, debug: bool) -> Self {
		self.debug = debug;
		self
	}

	pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = base_url.into();
		self
	}

	pub fn with_access_token_url(mut self, access_token_url: impl Into<String>) -> Self {
		self.access_token_url = access_token_url.into();
		self
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);
		self
	}

	/// Load configuration from `SAT_*` environment variables
	pub fn from_env() -> Result<Self, SatError> {
		dotenv::dotenv().ok();
		Self::from_builder(Config::builder().add_source(env_source()))
	}

	/// Load configuration from a file, with `SAT_*` variables taking precedence
	///
	/// The format is picked from the file extension (TOML, JSON, YAML, ...).
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SatError> {
		dotenv::dotenv().ok();
		let builder = Config::builder()
			.add_source(File::from(path.as_ref()))
			.add_source(env_source());
		Self::from_builder(builder)
	}

	fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, SatError> {
		let source: ConfigSource = builder
			.build()
			.and_then(|c| c.try_deserialize())
			.map_err(|e| SatError::InvalidInput(format!("Failed to load configuration: {}", e)))?;

		let private_key = read_key(source.private_key, source.private_key_file.as_deref())?
			.unwrap_or_default();
		let public_key = read_key(source.public_key, source.public_key_file.as_deref())?;

		let mut config = Self::new(source.client_id, source.client_secret, private_key)?;
		config.public_key = public_key;
		if let Some(padding_type) = source.padding_type {
			config.padding_type = padding_type.parse()?;
		}
		if let Some(debug) = source.debug {
			config.debug = debug;
		}
		if let Some(base_url) = source.base_url {
			config.base_url = base_url;
		}
		if let Some(access_token_url) = source.access_token_url {
			config.access_token_url = access_token_url;
		}
		if let Some(secs) = source.timeout_secs {
			config.timeout = Some(Duration::from_secs(secs));
		}
		Ok(config)
	}
}

#[derive(Debug, Deserialize)]
struct ConfigSource {
	#[serde(default)]
	client_id: String,
	#[serde(default)]
	client_secret: String,
	private_key: Option<String>,
	private_key_file: Option<String>,
	public_key: Option<String>,
	public_key_file: Option<String>,
	padding_type: Option<String>,
	debug: Option<bool>,
	base_url: Option<String>,
	access_token_url: Option<String>,
	timeout_secs: Option<u64>,
}

fn env_source() -> Environment {
	Environment::with_prefix(ENV_PREFIX).try_parsing(true)
}

fn require(name: &str, value: &str) -> Result<(), SatError> {
	if value.trim().is_empty() {
		return Err(SatError::InvalidInput(format!("{} is required", name)));
	}
	Ok(())
}

/// Inline PEM wins over a key file
fn read_key(inline: Option<String>, file: Option<&str>) -> Result<Option<String>, SatError> {
	if let Some(pem) = inline.filter(|pem| !pem.trim().is_empty()) {
		return Ok(Some(pem));
	}
	match file.filter(|path| !path.trim().is_empty()) {
		Some(path) => std::fs::read_to_string(path)
			.map(Some)
			.map_err(|e| SatError::InvalidInput(format!("Failed to read key file {}: {}", path, e))),
		None => Ok(None),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const PARTNER_PRIVATE: &str = include_str!("../tests/fixtures/partner_private.pem");

	#[test]
	fn test_new_applies_defaults() {
		let config = SatClientConfig::new("client_id", "client_secret", PARTNER_PRIVATE).unwrap();

		assert_eq!(config.base_url, PLAYGROUND_SAT_BASE_URL);
		assert_eq!(config.access_token_url, ACCESS_TOKEN_URL);
		assert_eq!(config.padding_type, PaddingScheme::Pss);
		assert_eq!(config.timeout, Some(Duration::from_secs(30)));
		assert!(config.public_key.is_none());
		assert!(!config.debug);
	}

	#[test]
	fn test_new_rejects_blank_arguments() {
		for (id, secret, key) in [
			("", "secret", "key"),
			("id", "  ", "key"),
			("id", "secret", ""),
		] {
			let result = SatClientConfig::new(id, secret, key);
			assert!(matches!(result, Err(SatError::InvalidInput(_))));
		}
	}

	#[test]
	fn test_with_mutators() {
		let config = SatClientConfig::new("id", "secret", "key")
			.unwrap()
			.with_public_key("pub")
			.with_debug(true)
			.with_base_url("http://localhost:9000")
			.with_access_token_url("http://localhost:9000/token")
			.with_timeout(Duration::from_secs(5));

		assert_eq!(config.public_key.as_deref(), Some("pub"));
		assert!(config.debug);
		assert_eq!(config.base_url, "http://localhost:9000");
		assert_eq!(config.access_token_url, "http://localhost:9000/token");
		assert_eq!(config.timeout, Some(Duration::from_secs(5)));
	}

	#[test]
	fn test_debug_hides_secrets() {
		let config = SatClientConfig::new("id", "top-secret", PARTNER_PRIVATE).unwrap();
		let rendered = format!("{:?}", config);
		assert!(!rendered.contains("top-secret"));
		assert!(!rendered.contains("BEGIN"));
	}

	#[test]
	fn test_from_builder() {
		let builder = Config::builder()
			.set_override("client_id", "id")
			.unwrap()
			.set_override("client_secret", "secret")
			.unwrap()
			.set_override("private_key", PARTNER_PRIVATE)
			.unwrap()
			.set_override("padding_type", "pss")
			.unwrap()
			.set_override("debug", true)
			.unwrap()
			.set_override("timeout_secs", 7)
			.unwrap();

		let config = SatClientConfig::from_builder(builder).unwrap();
		assert_eq!(config.client_id, "id");
		assert_eq!(config.padding_type, PaddingScheme::Pss);
		assert!(config.debug);
		assert_eq!(config.timeout, Some(Duration::from_secs(7)));
	}

	#[test]
	fn test_from_builder_reads_key_file() {
		let key_path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/sat_public.pem");
		let builder = Config::builder()
			.set_override("client_id", "id")
			.unwrap()
			.set_override("client_secret", "secret")
			.unwrap()
			.set_override("private_key", PARTNER_PRIVATE)
			.unwrap()
			.set_override("public_key_file", key_path)
			.unwrap();

		let config = SatClientConfig::from_builder(builder).unwrap();
		assert!(config.public_key.unwrap().contains("BEGIN PUBLIC KEY"));
	}

	#[test]
	fn test_from_builder_rejects_unknown_padding() {
		let builder = Config::builder()
			.set_override("client_id", "id")
			.unwrap()
			.set_override("client_secret", "secret")
			.unwrap()
			.set_override("private_key", "key")
			.unwrap()
			.set_override("padding_type", "test")
			.unwrap();

		let result = SatClientConfig::from_builder(builder);
		assert!(matches!(result, Err(SatError::InvalidInput(_))));
	}

	#[test]
	fn test_from_builder_requires_credentials() {
		let result = SatClientConfig::from_builder(Config::builder());
		assert!(matches!(result, Err(SatError::InvalidInput(_))));
	}
}
