// Copyright 2025 chenjjiaa
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

//! Request signing and callback verification
//!
//! Outbound checkout bodies are signed with the partner's RSA private key and
//! inbound callbacks are verified against the SAT public key. Both sides hash
//! the message with SHA-256 and pad it with RSA-PSS using a salt length
//! derived from the key size:
//!
//! ```text
//! salt_len = floor(modulus_bits / 8) - 32 - 2
//! ```
//!
//! PSS verification here is not salt-length-agnostic, so the salt length
//! must be derived the same way on both ends for signatures to interoperate.

use std::fmt;
use std::str::FromStr;

use base64::{Engine, engine::general_purpose::STANDARD};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Error types for signing operations
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
	#[error("Invalid input: {0}")]
	InvalidInput(String),
	#[error("Signing error: {0}")]
	Signing(String),
}

/// Padding scheme used to sign and verify messages
///
/// Only PSS is supported by the SAT service today. New variants can be added
/// here without touching any call site of [`Signer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PaddingScheme {
	/// RSASSA-PSS with SHA-256 and a key-size derived salt length
	#[default]
	Pss,
}

impl PaddingScheme {
	pub fn as_str(&self) -> &'static str {
		match self {
			PaddingScheme::Pss => "PSS",
		}
	}

	fn sign(self, key: &RsaPrivateKey, message: &[u8]) -> Result<Vec<u8>, rsa::Error> {
		match self {
			PaddingScheme::Pss => pss::sign(key, message),
		}
	}

	fn verify(self, key: &RsaPublicKey, message: &[u8], signature: &[u8]) -> bool {
		match self {
			PaddingScheme::Pss => pss::verify(key, message, signature),
		}
	}
}

impl fmt::Display for PaddingScheme {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for PaddingScheme {
	type Err = SigningError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.trim().eq_ignore_ascii_case("pss") {
			Ok(PaddingScheme::Pss)
		} else {
			Err(SigningError::InvalidInput(format!(
				"Unknown padding type: {}",
				s
			)))
		}
	}
}

impl TryFrom<String> for PaddingScheme {
	type Error = SigningError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

impl From<PaddingScheme> for String {
	fn from(value: PaddingScheme) -> Self {
		value.as_str().to_string()
	}
}

mod pss {
	use rsa::traits::PublicKeyParts;
	use rsa::{Pss, RsaPrivateKey, RsaPublicKey};
	use sha2::{Digest, Sha256};

	/// SHA-256 output size in bytes
	const DIGEST_SIZE: usize = 32;

	/// Salt length used by the SAT service for a given key
	pub(super) fn salt_len(key: &impl PublicKeyParts) -> usize {
		(key.n().bits() / 8).saturating_sub(DIGEST_SIZE + 2)
	}

	pub(super) fn sign(key: &RsaPrivateKey, message: &[u8]) -> Result<Vec<u8>, rsa::Error> {
		let digest = Sha256::digest(message);
		let padding = Pss::new_with_salt::<Sha256>(salt_len(key));
		key.sign_with_rng(&mut rand::thread_rng(), padding, &digest)
	}

	pub(super) fn verify(key: &RsaPublicKey, message: &[u8], signature: &[u8]) -> bool {
		let digest = Sha256::digest(message);
		let padding = Pss::new_with_salt::<Sha256>(salt_len(key));
		// Bad padding, wrong length and corrupt signatures all land here.
		key.verify(padding, &digest, signature).is_ok()
	}
}

/// Parsed key material plus the padding scheme used to sign and verify
///
/// Keys are parsed once at construction and never mutated afterwards, so a
/// single `Signer` can be shared across threads without locking.
#[derive(Clone)]
pub struct Signer {
	private_key: Option<RsaPrivateKey>,
	public_key: Option<RsaPublicKey>,
	padding: PaddingScheme,
}

impl fmt::Debug for Signer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Signer")
			.field("private_key", &self.private_key.is_some())
			.field("public_key", &self.public_key.is_some())
			.field("padding", &self.padding)
			.finish()
	}
}

impl Signer {
	/// Create a signer from PEM-encoded keys
	///
	/// Both PKCS#8 (`BEGIN PRIVATE KEY` / `BEGIN PUBLIC KEY`) and PKCS#1
	/// (`BEGIN RSA PRIVATE KEY` / `BEGIN RSA PUBLIC KEY`) encodings are
	/// accepted. Blank PEM strings are treated as "no key".
	pub fn new(
		private_key_pem: Option<&str>,
		public_key_pem: Option<&str>,
		padding: PaddingScheme,
	) -> Result<Self, SigningError> {
		let private_key = private_key_pem
			.filter(|pem| !pem.trim().is_empty())
			.map(parse_private_key)
			.transpose()?;
		let public_key = public_key_pem
			.filter(|pem| !pem.trim().is_empty())
			.map(parse_public_key)
			.transpose()?;

		Ok(Self::from_keys(private_key, public_key, padding))
	}

	/// Create a signer from already parsed keys
	pub fn from_keys(
		private_key: Option<RsaPrivateKey>,
		public_key: Option<RsaPublicKey>,
		padding: PaddingScheme,
	) -> Self {
		Self {
			private_key,
			public_key,
			padding,
		}
	}

	pub fn padding(&self) -> PaddingScheme {
		self.padding
	}

	pub fn has_private_key(&self) -> bool {
		self.private_key.is_some()
	}

	pub fn has_public_key(&self) -> bool {
		self.public_key.is_some()
	}

	/// Sign a message and return the base64-encoded signature
	pub fn sign(&self, message: impl AsRef<[u8]>) -> Result<String, SigningError> {
		let key = self
			.private_key
			.as_ref()
			.ok_or_else(|| SigningError::InvalidInput("Private key not set".to_string()))?;

		let signature = self
			.padding
			.sign(key, message.as_ref())
			.map_err(|e| SigningError::Signing(format!("Error signing message: {}", e)))?;

		Ok(STANDARD.encode(signature))
	}

	/// Verify a base64-encoded signature over a message
	///
	/// Returns `Ok(false)` when the signature simply does not match. Errors are
	/// reserved for unusable input: a missing public key, a blank signature or
	/// a signature that is not valid base64.
	pub fn verify(&self, message: impl AsRef<[u8]>, signature: &str) -> Result<bool, SigningError> {
		let key = self
			.public_key
			.as_ref()
			.ok_or_else(|| SigningError::InvalidInput("Public key not set".to_string()))?;

		if signature.trim().is_empty() {
			return Err(SigningError::InvalidInput("Signature is empty".to_string()));
		}

		let signature_bytes = STANDARD
			.decode(signature.trim())
			.map_err(|e| SigningError::InvalidInput(format!("Invalid base64 signature: {}", e)))?;

		let verified = self.padding.verify(key, message.as_ref(), &signature_bytes);
		if !verified {
			debug!(target: "sat_sdk", padding = %self.padding, "Signature verification failed");
		}
		Ok(verified)
	}
}

fn parse_private_key(pem: &str) -> Result<RsaPrivateKey, SigningError> {
	RsaPrivateKey::from_pkcs8_pem(pem)
		.or_else(|pkcs8_err| {
			RsaPrivateKey::from_pkcs1_pem(pem).map_err(|_| pkcs8_err.to_string())
		})
		.map_err(|e| SigningError::InvalidInput(format!("Invalid RSA private key PEM: {}", e)))
}

fn parse_public_key(pem: &str) -> Result<RsaPublicKey, SigningError> {
	RsaPublicKey::from_public_key_pem(pem)
		.or_else(|spki_err| RsaPublicKey::from_pkcs1_pem(pem).map_err(|_| spki_err.to_string()))
		.map_err(|e| SigningError::InvalidInput(format!("Invalid RSA public key PEM: {}", e)))
}

#[cfg(test)]
mod tests {
	use super::*;

	const PARTNER_PRIVATE: &str = include_str!("../tests/fixtures/partner_private.pem");
	const PARTNER_PUBLIC: &str = include_str!("../tests/fixtures/partner_public.pem");
	const SAT_PUBLIC: &str = include_str!("../tests/fixtures/sat_public.pem");

	fn partner_signer() -> Signer {
		Signer::new(Some(PARTNER_PRIVATE), Some(PARTNER_PUBLIC), PaddingScheme::Pss).unwrap()
	}

	#[test]
	fn test_sign_then_verify() {
		let signer = partner_signer();
		let message = r#"{"test_message": "Hello, World!!"}"#;

		let signature = signer.sign(message).unwrap();
		assert!(!signature.is_empty());
		assert!(signer.verify(message, &signature).unwrap());
	}

	#[test]
	fn test_verify_rejects_other_message() {
		let signer = partner_signer();

		let signature = signer.sign("Hello, World!").unwrap();
		assert!(!signer.verify("Hello, World! ", &signature).unwrap());

		let signature = signer.sign(r#"{"test_message": "Hello, World!!"}"#).unwrap();
		assert!(
			!signer
				.verify(r#"{"test_message": "Hello, Not World!!"}"#, &signature)
				.unwrap()
		);
	}

	#[test]
	fn test_verify_with_unrelated_key_fails_closed() {
		let signature = partner_signer().sign("payload").unwrap();
		let verifier = Signer::new(None, Some(SAT_PUBLIC), PaddingScheme::Pss).unwrap();

		assert!(!verifier.verify("payload", &signature).unwrap());
	}

	#[test]
	fn test_verify_garbage_signature_is_false() {
		let signer = partner_signer();

		// Valid base64, wrong length
		assert!(!signer.verify("payload", "c2lnbmF0dXJl").unwrap());

		// Valid base64, right length, corrupted bytes
		let mut raw = STANDARD.decode(signer.sign("payload").unwrap()).unwrap();
		raw[10] ^= 0xff;
		assert!(!signer.verify("payload", &STANDARD.encode(raw)).unwrap());
	}

	#[test]
	fn test_verify_invalid_base64_is_input_error() {
		let result = partner_signer().verify("payload", "not base64 !!!");
		assert!(matches!(result, Err(SigningError::InvalidInput(_))));
	}

	#[test]
	fn test_verify_blank_signature_is_input_error() {
		let result = partner_signer().verify("payload", "   ");
		assert!(matches!(result, Err(SigningError::InvalidInput(_))));
	}

	#[test]
	fn test_missing_keys_are_input_errors() {
		let signer = Signer::new(None, None, PaddingScheme::Pss).unwrap();

		assert!(matches!(
			signer.sign("payload"),
			Err(SigningError::InvalidInput(_))
		));
		assert!(matches!(
			signer.verify("payload", "c2lnbmF0dXJl"),
			Err(SigningError::InvalidInput(_))
		));
	}

	#[test]
	fn test_invalid_pem_is_rejected() {
		let err = Signer::new(Some("invalid_private_key"), None, PaddingScheme::Pss).unwrap_err();
		assert!(err.to_string().contains("Invalid RSA private key"));

		let err = Signer::new(Some(PARTNER_PRIVATE), Some("invalid_public_key"), PaddingScheme::Pss)
			.unwrap_err();
		assert!(err.to_string().contains("Invalid RSA public key"));
	}

	#[test]
	fn test_salt_len_for_2048_bit_key() {
		let key = parse_public_key(PARTNER_PUBLIC).unwrap();
		assert_eq!(pss::salt_len(&key), 256 - 32 - 2);
	}

	#[test]
	fn test_padding_scheme_parsing() {
		assert_eq!("PSS".parse::<PaddingScheme>().unwrap(), PaddingScheme::Pss);
		assert_eq!("pss".parse::<PaddingScheme>().unwrap(), PaddingScheme::Pss);
		assert!("test".parse::<PaddingScheme>().is_err());
		assert_eq!(PaddingScheme::Pss.to_string(), "PSS");
	}

	#[test]
	fn test_debug_does_not_leak_keys() {
		let rendered = format!("{:?}", partner_signer());
		assert!(!rendered.contains("BEGIN"));
		assert!(rendered.contains("private_key: true"));
	}
}
