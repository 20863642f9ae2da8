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

use thiserror::Error;

use crate::envelope::EnvelopeError;
use crate::signing::SigningError;
use crate::transport::TransportError;
use crate::types::RawResponse;

/// Error types for SDK operations
///
/// A request the service rejects with a well-formed JSON:API error body is
/// not an error: operations return it as [`Outcome::Failure`](crate::types::Outcome).
#[derive(Debug, Error)]
pub enum SatError {
	#[error("Invalid input: {0}")]
	InvalidInput(String),
	/// Callback signature present but not valid for the payload
	#[error("Unauthenticated: {0}")]
	Unauthenticated(String),
	#[error("Signature error: {0}")]
	Signature(String),
	/// No access token could be obtained while building the client
	#[error("Failed to initialize client: {0}")]
	Token(#[source] TransportError),
	#[error(transparent)]
	Transport(#[from] TransportError),
	#[error(transparent)]
	Envelope(#[from] EnvelopeError),
	/// HTTP error whose body is not a decodable error document
	#[error("Unexpected response from {} {} (HTTP {}): {}", .raw.method, .raw.url, .raw.status_code(), .raw.text())]
	ResponseGeneral {
		raw: Box<RawResponse>,
		#[source]
		source: serde_json::Error,
	},
	#[error("An error occurred while {operation}: {source}")]
	Operation {
		operation: &'static str,
		#[source]
		source: Box<SatError>,
	},
}

impl SatError {
	pub(crate) fn operation(operation: &'static str, source: SatError) -> Self {
		SatError::Operation {
			operation,
			source: Box::new(source),
		}
	}

	/// The response behind a [`SatError::ResponseGeneral`], looking through
	/// operation wrappers
	pub fn raw_response(&self) -> Option<&RawResponse> {
		match self {
			SatError::ResponseGeneral { raw, .. } => Some(raw),
			SatError::Operation { source, .. } => source.raw_response(),
			_ => None,
		}
	}
}

impl From<SigningError> for SatError {
	fn from(e: SigningError) -> Self {
		match e {
			SigningError::InvalidInput(msg) => SatError::InvalidInput(msg),
			SigningError::Signing(msg) => SatError::Signature(msg),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use reqwest::header::HeaderMap;
	use reqwest::{Method, StatusCode};
	use std::error::Error as _;

	#[test]
	fn test_signing_errors_map_to_kinds() {
		let err: SatError = SigningError::InvalidInput("Public key not set".to_string()).into();
		assert!(matches!(err, SatError::InvalidInput(_)));

		let err: SatError = SigningError::Signing("boom".to_string()).into();
		assert!(matches!(err, SatError::Signature(_)));
	}

	#[test]
	fn test_operation_error_message_and_source() {
		let err = SatError::operation("checkout", SatError::InvalidInput("bad".to_string()));

		assert_eq!(
			err.to_string(),
			"An error occurred while checkout: Invalid input: bad"
		);
		assert!(err.source().is_some());
	}

	#[test]
	fn test_response_general_keeps_decode_error() {
		let decode_error = serde_json::from_slice::<serde_json::Value>(b"<html>").unwrap_err();
		let raw = RawResponse {
			method: Method::GET,
			url: "http://localhost/v2/account".to_string(),
			status: StatusCode::BAD_GATEWAY,
			headers: HeaderMap::new(),
			body: b"<html>".to_vec(),
		};
		let err = SatError::operation(
			"account",
			SatError::ResponseGeneral {
				raw: Box::new(raw),
				source: decode_error,
			},
		);

		assert_eq!(err.raw_response().unwrap().status_code(), 502);
		let inner = err.source().unwrap();
		assert!(inner.to_string().contains("HTTP 502"));
		assert!(inner.source().is_some());
	}
}
