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

use reqwest::Url;
use reqwest::header::HeaderName;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::SatClientConfig;
use crate::constants::{
	ACCOUNT_PATH, CHECK_STATUS_PATH, CHECKOUT_PATH, INQUIRY_PATH, PING_PATH, PRODUCT_CODE_QUERY,
	PRODUCT_LIST_PATH, SIGNATURE_HEADER_KEY,
};
use crate::envelope::{self, EnvelopeError};
use crate::error::SatError;
use crate::oauth::ClientCredentials;
use crate::signing::Signer;
use crate::transport::{ApiRequest, Transport, TransportError, TransportSettings};
use crate::types::{
	Account, ErrorResponse, InquiryRequest, InquiryResponse, OrderDetail, OrderRequest, Outcome,
	PartnerProduct, PingResponse, ProductListResponse, RawResponse, Response,
};

/// Client for the SAT partner API
///
/// Each operation is a single round trip. A request the service rejects
/// comes back as [`Outcome::Failure`]; only transport failures, undecodable
/// error bodies and misuse are returned as [`SatError`].
#[derive(Debug)]
pub struct SatClient {
	base_url: String,
	signer: Signer,
	transport: Transport,
}

impl SatClient {
	/// Parse the keys and obtain the first access token
	pub async fn new(config: SatClientConfig) -> Result<Self, SatError> {
		let signer = Signer::new(
			Some(&config.private_key),
			config.public_key.as_deref(),
			config.padding_type,
		)?;

		let transport = Transport::connect(TransportSettings {
			token_url: config.access_token_url,
			credentials: ClientCredentials::new(config.client_id, config.client_secret),
			timeout: config.timeout,
			debug: config.debug,
		})
		.await
		.map_err(SatError::Token)?;

		let base_url = config.base_url.trim_end_matches('/').to_string();
		info!(target: "sat_sdk", base_url = %base_url, padding = %signer.padding(), "SAT client initialized");

		Ok(Self {
			base_url,
			signer,
			transport,
		})
	}

	/// Signer used for checkout bodies and callback verification
	pub fn signature(&self) -> &Signer {
		&self.signer
	}

	/// Authenticated transport, for calls the SDK does not wrap
	pub fn http_client(&self) -> &Transport {
		&self.transport
	}

	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	/// Check connectivity and credentials
	///
	/// The ping body is a plain JSON object, not a JSON:API document.
	pub async fn ping(&self) -> Result<Outcome<PingResponse>, SatError> {
		let request = ApiRequest::get(self.url(PING_PATH));
		self.execute("ping", async { Ok(request) }, |body| {
			serde_json::from_value(body.clone()).map_err(EnvelopeError::from)
		})
		.await
	}

	/// Look up the bill for a client number
	pub async fn inquiry(&self, request: &InquiryRequest) -> Result<Outcome<InquiryResponse>, SatError> {
		let url = self.url(INQUIRY_PATH);
		self.execute(
			"inquiry",
			async move {
				let body = envelope::encode(request)?.to_vec()?;
				Ok(ApiRequest::post(url).with_body(body))
			},
			envelope::decode_one,
		)
		.await
	}

	/// Place an order
	///
	/// The body is signed exactly as sent and the signature travels in the
	/// `signature` header.
	pub async fn checkout(&self, request: &OrderRequest) -> Result<Outcome<OrderDetail>, SatError> {
		let url = self.url(CHECKOUT_PATH);
		self.execute(
			"checkout",
			async move {
				let body = envelope::encode(request)?.to_vec()?;
				let signature = self.signer.sign(&body)?;
				Ok(ApiRequest::post(url)
					.with_header(HeaderName::from_static(SIGNATURE_HEADER_KEY), signature)
					.with_body(body))
			},
			envelope::decode_one,
		)
		.await
	}

	/// Fetch the current state of an order by its request ID
	pub async fn check_status(&self, request_id: &str) -> Result<Outcome<OrderDetail>, SatError> {
		if request_id.trim().is_empty() {
			return Err(SatError::InvalidInput("request_id is required".to_string()));
		}
		let request = ApiRequest::get(self.status_url(request_id)?);
		self.execute("checking status", async { Ok(request) }, envelope::decode_one)
			.await
	}

	/// List the products enabled for these credentials
	///
	/// `product_code` narrows the list to a single product.
	pub async fn list_products(
		&self,
		product_code: Option<&str>,
	) -> Result<Outcome<ProductListResponse>, SatError> {
		let mut request = ApiRequest::get(self.url(PRODUCT_LIST_PATH));
		if let Some(code) = product_code.filter(|code| !code.is_empty()) {
			request = request.with_query(PRODUCT_CODE_QUERY, code);
		}
		self.execute("listing products", async { Ok(request) }, |body| {
			let products = envelope::decode_many::<PartnerProduct>(body)?;
			Ok(ProductListResponse { products })
		})
		.await
	}

	/// Current account balance
	pub async fn account(&self) -> Result<Outcome<Account>, SatError> {
		let request = ApiRequest::get(self.url(ACCOUNT_PATH));
		self.execute("getting account", async { Ok(request) }, envelope::decode_one)
			.await
	}

	/// Verify and decode an order-status callback
	///
	/// `payload` must be the raw request body exactly as received. The
	/// `signature` header is matched case-insensitively. `handler` runs only
	/// when the signature is valid, and its return value is passed back.
	pub fn handle_callback<I, K, V, F, R>(
		&self,
		payload: &str,
		headers: I,
		handler: F,
	) -> Result<R, SatError>
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: AsRef<str>,
		F: FnOnce(OrderDetail) -> R,
	{
		let signature = headers
			.into_iter()
			.find(|(name, _)| name.as_ref().eq_ignore_ascii_case(SIGNATURE_HEADER_KEY))
			.map(|(_, value)| value.as_ref().to_string())
			.ok_or_else(|| SatError::InvalidInput("Signature header is missing".to_string()))?;

		if !self.signer.verify(payload, &signature)? {
			warn!(target: "sat_sdk", "Rejected callback with invalid signature");
			return Err(SatError::Unauthenticated("Invalid callback signature".to_string()));
		}

		let document: Value = serde_json::from_str(payload)
			.map_err(|e| SatError::InvalidInput(format!("Callback payload is not JSON: {}", e)))?;
		let order: OrderDetail = envelope::decode_one(&document)?;

		info!(target: "sat_sdk", request_id = %order.id, status = %order.status, "Callback verified");
		Ok(handler(order))
	}

	fn url(&self, path: &str) -> String {
		format!("{}{}", self.base_url, path)
	}

	/// Check-status URL with the request ID percent-encoded as one path segment
	fn status_url(&self, request_id: &str) -> Result<String, SatError> {
		let mut url = Url::parse(&self.url(CHECK_STATUS_PATH))
			.map_err(|e| SatError::InvalidInput(format!("Invalid base URL: {}", e)))?;
		url.path_segments_mut()
			.map_err(|_| SatError::InvalidInput("Base URL cannot carry a path".to_string()))?
			.push(request_id);
		Ok(url.into())
	}

	/// Build, send and classify one request
	///
	/// Failures other than misuse and undecodable error bodies are logged and
	/// wrapped with the operation name.
	async fn execute<T, B, D>(
		&self,
		operation: &'static str,
		build: B,
		decode: D,
	) -> Result<Outcome<T>, SatError>
	where
		B: Future<Output = Result<ApiRequest, SatError>>,
		D: FnOnce(&Value) -> Result<T, EnvelopeError>,
	{
		let result = async {
			let request = build.await?;
			let raw = self.transport.send(request).await?;
			classify(raw, decode)
		}
		.await;

		result.map_err(|e| match e {
			SatError::InvalidInput(_) | SatError::ResponseGeneral { .. } => e,
			other => {
				error!(target: "sat_sdk", operation, error = %other, "Error when {}", operation);
				SatError::operation(operation, other)
			}
		})
	}
}

/// Decode a 2xx body with `decode`, anything else as an error document
fn classify<T, D>(raw: RawResponse, decode: D) -> Result<Outcome<T>, SatError>
where
	D: FnOnce(&Value) -> Result<T, EnvelopeError>,
{
	if raw.is_success() {
		let body = raw.json().map_err(EnvelopeError::from)?;
		let record = decode(&body)?;
		return Ok(Outcome::Success(Response::new(record, raw)));
	}

	match serde_json::from_slice::<ErrorResponse>(&raw.body) {
		Ok(errors) => {
			warn!(
				target: "sat_sdk",
				status = raw.status_code(),
				codes = %errors.error_codes(),
				"Request rejected"
			);
			Ok(Outcome::Failure(Response::new(errors, raw)))
		}
		Err(source) => Err(SatError::ResponseGeneral {
			raw: Box::new(raw),
			source,
		}),
	}
}

/// Blocking wrapper around [`SatClient`]
///
/// Owns a private tokio runtime. Must not be used from inside another
/// runtime; async code should use [`SatClient`] directly.
pub struct SyncSatClient {
	client: SatClient,
	runtime: tokio::runtime::Runtime,
}

impl SyncSatClient {
	pub fn new(config: SatClientConfig) -> Result<Self, SatError> {
		let runtime = tokio::runtime::Runtime::new().map_err(|e| {
			SatError::Transport(TransportError::Build(format!(
				"Failed to create tokio runtime: {}",
				e
			)))
		})?;
		let client = runtime.block_on(SatClient::new(config))?;
		Ok(Self { client, runtime })
	}

	/// The async client this wrapper drives
	pub fn client(&self) -> &SatClient {
		&self.client
	}

	pub fn ping(&self) -> Result<Outcome<PingResponse>, SatError> {
		self.runtime.block_on(self.client.ping())
	}

	pub fn inquiry(&self, request: &InquiryRequest) -> Result<Outcome<InquiryResponse>, SatError> {
		self.runtime.block_on(self.client.inquiry(request))
	}

	pub fn checkout(&self, request: &OrderRequest) -> Result<Outcome<OrderDetail>, SatError> {
		self.runtime.block_on(self.client.checkout(request))
	}

	pub fn check_status(&self, request_id: &str) -> Result<Outcome<OrderDetail>, SatError> {
		self.runtime.block_on(self.client.check_status(request_id))
	}

	pub fn list_products(
		&self,
		product_code: Option<&str>,
	) -> Result<Outcome<ProductListResponse>, SatError> {
		self.runtime.block_on(self.client.list_products(product_code))
	}

	pub fn account(&self) -> Result<Outcome<Account>, SatError> {
		self.runtime.block_on(self.client.account())
	}

	pub fn handle_callback<I, K, V, F, R>(
		&self,
		payload: &str,
		headers: I,
		handler: F,
	) -> Result<R, SatError>
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: AsRef<str>,
		F: FnOnce(OrderDetail) -> R,
	{
		self.client.handle_callback(payload, headers, handler)
	}
}
