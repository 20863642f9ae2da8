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

use std::borrow::Cow;
use std::ops::Deref;

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Resource type of inquiry requests
pub const INQUIRY_TYPE: &str = "inquiry";
/// Resource type of order requests
pub const ORDER_TYPE: &str = "order";

/// Treat an explicit JSON `null` like a missing field
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: Default + Deserialize<'de>,
{
	Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept both `"2203"` and `2203` for identifiers
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(match Option::<Value>::deserialize(deserializer)? {
		None | Some(Value::Null) => String::new(),
		Some(Value::String(s)) => s,
		Some(other) => other.to_string(),
	})
}

/// Name/value pair used for optional request fields and result lines
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Field {
	#[serde(deserialize_with = "nullable")]
	pub name: String,
	#[serde(deserialize_with = "nullable")]
	pub value: String,
}

impl Field {
	pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
		}
	}
}

/// Result of `GET /ping`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PingResponse {
	#[serde(deserialize_with = "nullable")]
	pub buildhash: String,
	#[serde(deserialize_with = "nullable")]
	pub sandbox: bool,
	#[serde(deserialize_with = "nullable")]
	pub status: String,
}

/// Bill inquiry for a client number and product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InquiryRequest {
	pub product_code: String,
	pub client_number: String,
	pub amount: Option<i64>,
	pub id: Option<String>,
	pub fields: Option<Vec<Field>>,
	#[serde(rename = "type")]
	pub resource_type: String,
}

impl InquiryRequest {
	pub fn new(product_code: impl Into<String>, client_number: impl Into<String>) -> Self {
		Self {
			product_code: product_code.into(),
			client_number: client_number.into(),
			amount: None,
			id: None,
			fields: None,
			resource_type: INQUIRY_TYPE.to_string(),
		}
	}

	pub fn with_amount(mut self, amount: i64) -> Self {
		self.amount = Some(amount);
		self
	}

	pub fn with_id(mut self, id: impl Into<String>) -> Self {
		self.id = Some(id.into());
		self
	}

	pub fn with_fields(mut self, fields: Vec<Field>) -> Self {
		self.fields = Some(fields);
		self
	}
}

/// Bill details returned by an inquiry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InquiryResponse {
	#[serde(deserialize_with = "lenient_string")]
	pub id: String,
	#[serde(deserialize_with = "nullable")]
	pub product_code: String,
	#[serde(deserialize_with = "nullable")]
	pub sales_price: f64,
	#[serde(deserialize_with = "nullable")]
	pub fields: Vec<Field>,
	#[serde(deserialize_with = "nullable")]
	pub inquiry_result: Vec<Field>,
	#[serde(deserialize_with = "nullable")]
	pub base_price: f64,
	#[serde(deserialize_with = "nullable")]
	pub admin_fee: f64,
	#[serde(deserialize_with = "nullable")]
	pub client_name: String,
	#[serde(deserialize_with = "nullable")]
	pub client_number: String,
	#[serde(deserialize_with = "nullable")]
	pub meter_id: String,
	#[serde(deserialize_with = "nullable")]
	pub ref_id: String,
	#[serde(deserialize_with = "nullable")]
	pub max_payment: i64,
	#[serde(deserialize_with = "nullable")]
	pub min_payment: i64,
}

/// Checkout request
///
/// `id` is the partner's request ID and must be unique per transaction; the
/// service rejects a reused ID with error code `P03`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
	pub id: String,
	pub product_code: String,
	pub client_number: String,
	pub amount: i64,
	pub fields: Option<Vec<Field>>,
	pub downline_id: Option<String>,
	#[serde(rename = "type")]
	pub resource_type: String,
}

impl OrderRequest {
	pub fn new(
		request_id: impl Into<String>,
		product_code: impl Into<String>,
		client_number: impl Into<String>,
		amount: i64,
	) -> Self {
		Self {
			id: request_id.into(),
			product_code: product_code.into(),
			client_number: client_number.into(),
			amount,
			fields: None,
			downline_id: None,
			resource_type: ORDER_TYPE.to_string(),
		}
	}

	pub fn with_fields(mut self, fields: Vec<Field>) -> Self {
		self.fields = Some(fields);
		self
	}

	pub fn with_downline_id(mut self, downline_id: impl Into<String>) -> Self {
		self.downline_id = Some(downline_id.into());
		self
	}
}

/// Order state as returned by checkout, check-status and callbacks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderDetail {
	#[serde(deserialize_with = "lenient_string")]
	pub id: String,
	pub fields: Option<Vec<Field>>,
	#[serde(deserialize_with = "nullable")]
	pub fulfillment_result: Vec<Field>,
	pub fulfilled_at: Option<DateTime<Utc>>,
	#[serde(deserialize_with = "nullable")]
	pub error_code: String,
	#[serde(deserialize_with = "nullable")]
	pub error_detail: String,
	#[serde(deserialize_with = "nullable")]
	pub product_code: String,
	#[serde(deserialize_with = "nullable")]
	pub status: String,
	#[serde(deserialize_with = "nullable")]
	pub partner_fee: i64,
	#[serde(deserialize_with = "nullable")]
	pub sales_price: i64,
	#[serde(deserialize_with = "nullable")]
	pub admin_fee: i64,
	#[serde(deserialize_with = "nullable")]
	pub client_name: String,
	#[serde(deserialize_with = "nullable")]
	pub client_number: String,
	#[serde(deserialize_with = "nullable")]
	pub voucher_code: String,
	#[serde(deserialize_with = "nullable")]
	pub serial_number: String,
}

/// Partner account balance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Account {
	#[serde(deserialize_with = "lenient_string")]
	pub id: String,
	#[serde(deserialize_with = "nullable")]
	pub saldo: i64,
}

/// Product availability, encoded as an integer on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ProductStatus {
	#[default]
	Active,
	Inactive,
}

impl TryFrom<u8> for ProductStatus {
	type Error = String;

	fn try_from(value: u8) -> Result<Self, Self::Error> {
		match value {
			1 => Ok(ProductStatus::Active),
			2 => Ok(ProductStatus::Inactive),
			other => Err(format!("unknown product status: {}", other)),
		}
	}
}

impl From<ProductStatus> for u8 {
	fn from(value: ProductStatus) -> Self {
		match value {
			ProductStatus::Active => 1,
			ProductStatus::Inactive => 2,
		}
	}
}

/// Product enabled for the partner's credentials
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartnerProduct {
	#[serde(deserialize_with = "lenient_string")]
	pub id: String,
	#[serde(alias = "product_name", deserialize_with = "nullable")]
	pub name: String,
	#[serde(deserialize_with = "nullable")]
	pub operator_name: String,
	#[serde(deserialize_with = "nullable")]
	pub category_name: String,
	#[serde(deserialize_with = "nullable")]
	pub is_inquiry: bool,
	#[serde(alias = "price", deserialize_with = "nullable")]
	pub sales_price: i64,
	#[serde(deserialize_with = "nullable")]
	pub status: ProductStatus,
	#[serde(deserialize_with = "nullable")]
	pub client_number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductListResponse {
	pub products: Vec<PartnerProduct>,
}

/// Single JSON:API error object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorObject {
	#[serde(deserialize_with = "lenient_string")]
	pub id: String,
	#[serde(deserialize_with = "nullable")]
	pub title: String,
	#[serde(deserialize_with = "nullable")]
	pub detail: String,
	#[serde(deserialize_with = "lenient_string")]
	pub status: String,
	#[serde(deserialize_with = "nullable")]
	pub code: String,
	#[serde(deserialize_with = "nullable")]
	pub meta: Map<String, Value>,
}

impl ErrorObject {
	pub fn new(code: impl Into<String>, detail: impl Into<String>, status: impl Into<String>) -> Self {
		Self {
			code: code.into(),
			detail: detail.into(),
			status: status.into(),
			..Default::default()
		}
	}
}

/// Structured error body returned with a 4xx/5xx status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorResponse {
	#[serde(deserialize_with = "nullable")]
	pub errors: Vec<ErrorObject>,
}

impl ErrorResponse {
	/// `status - code - detail` for every error, one per line
	pub fn error_messages(&self) -> String {
		self.errors
			.iter()
			.map(|e| format!("{} - {} - {}", e.status, e.code, e.detail))
			.collect::<Vec<_>>()
			.join("\n")
	}

	/// Error codes separated by `", "`
	pub fn error_codes(&self) -> String {
		self.join_with(|e| &e.code)
	}

	/// Error statuses separated by `", "`
	pub fn error_statuses(&self) -> String {
		self.join_with(|e| &e.status)
	}

	/// Error details separated by `", "`
	pub fn error_details(&self) -> String {
		self.join_with(|e| &e.detail)
	}

	fn join_with(&self, field: impl Fn(&ErrorObject) -> &String) -> String {
		self.errors
			.iter()
			.map(|e| field(e).as_str())
			.collect::<Vec<_>>()
			.join(", ")
	}
}

/// Snapshot of an HTTP response as received by the transport
#[derive(Debug, Clone)]
pub struct RawResponse {
	pub method: Method,
	pub url: String,
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub body: Vec<u8>,
}

impl RawResponse {
	pub fn status_code(&self) -> u16 {
		self.status.as_u16()
	}

	/// `true` for any 2xx status
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	pub fn text(&self) -> Cow<'_, str> {
		String::from_utf8_lossy(&self.body)
	}

	pub fn json(&self) -> Result<Value, serde_json::Error> {
		serde_json::from_slice(&self.body)
	}
}

/// A decoded record together with the response it was decoded from
#[derive(Debug, Clone)]
pub struct Response<T> {
	body: T,
	raw: RawResponse,
}

impl<T> Response<T> {
	pub fn new(body: T, raw: RawResponse) -> Self {
		Self { body, raw }
	}

	pub fn raw_response(&self) -> &RawResponse {
		&self.raw
	}

	pub fn is_success(&self) -> bool {
		self.raw.is_success()
	}

	pub fn into_inner(self) -> T {
		self.body
	}
}

impl<T> Deref for Response<T> {
	type Target = T;

	fn deref(&self) -> &T {
		&self.body
	}
}

/// Result of an operation that reached the service
///
/// A rejected request (4xx/5xx with a JSON:API error body) is an ordinary
/// value, not an error, so callers can branch on it directly.
#[derive(Debug, Clone)]
pub enum Outcome<T> {
	Success(Response<T>),
	Failure(Response<ErrorResponse>),
}

impl<T> Outcome<T> {
	pub fn is_success(&self) -> bool {
		self.raw_response().is_success()
	}

	pub fn raw_response(&self) -> &RawResponse {
		match self {
			Outcome::Success(response) => response.raw_response(),
			Outcome::Failure(response) => response.raw_response(),
		}
	}

	pub fn success(&self) -> Option<&T> {
		match self {
			Outcome::Success(response) => Some(&**response),
			Outcome::Failure(_) => None,
		}
	}

	pub fn failure(&self) -> Option<&ErrorResponse> {
		match self {
			Outcome::Success(_) => None,
			Outcome::Failure(response) => Some(&**response),
		}
	}

	pub fn into_result(self) -> Result<Response<T>, Response<ErrorResponse>> {
		match self {
			Outcome::Success(response) => Ok(response),
			Outcome::Failure(response) => Err(response),
		}
	}
}
