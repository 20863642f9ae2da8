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

//! JSON:API envelope transcoding
//!
//! The SAT service wraps every resource in a `{"data": {"id", "type",
//! "attributes"}}` document. Domain records in this crate are flat, so this
//! module moves the identifier and type in and out of the envelope:
//!
//! - [`encode`] lifts `request_id` (or `id`) and `type` out of a flat record
//!   and places everything else under `attributes`, dropping null values.
//! - [`decode_one`] / [`decode_many`] merge `id`, `type` and `attributes`
//!   back into one flat object and deserialize it into the target record.
//!
//! A missing `data` node is not an error: it decodes to an empty record and
//! the HTTP status decides whether the call succeeded.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

const ID_KEY: &str = "id";
const REQUEST_ID_KEY: &str = "request_id";
const TYPE_KEY: &str = "type";
const DATA_KEY: &str = "data";
const ATTRIBUTES_KEY: &str = "attributes";

/// Error types for envelope transcoding
#[derive(Debug, Error)]
pub enum EnvelopeError {
	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
	#[error("Expected a JSON object, found {0}")]
	NotAnObject(&'static str),
}

/// Top-level JSON:API document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
	pub data: Resource,
}

/// Resource object carried under `data`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	#[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
	pub resource_type: Option<String>,
	#[serde(default)]
	pub attributes: Map<String, Value>,
}

impl Document {
	/// Serialize the document into the exact bytes sent on the wire
	pub fn to_vec(&self) -> Result<Vec<u8>, EnvelopeError> {
		Ok(serde_json::to_vec(self)?)
	}
}

/// Wrap a flat record into a JSON:API document
///
/// The record must serialize to a JSON object.
pub fn encode<T: Serialize + ?Sized>(record: &T) -> Result<Document, EnvelopeError> {
	match serde_json::to_value(record)? {
		Value::Object(fields) => Ok(encode_map(fields)),
		other => Err(EnvelopeError::NotAnObject(kind_of(&other))),
	}
}

/// Wrap an already flattened JSON object into a JSON:API document
pub fn encode_map(mut fields: Map<String, Value>) -> Document {
	// `request_id` wins over `id`; both are removed from the attributes.
	let mut id = fields.remove(ID_KEY);
	if let Some(request_id) = fields.remove(REQUEST_ID_KEY) {
		id = Some(request_id);
	}
	let resource_type = fields.remove(TYPE_KEY);

	fields.retain(|_, value| !value.is_null());

	Document {
		data: Resource {
			id: id.and_then(scalar_to_string),
			resource_type: resource_type.and_then(scalar_to_string),
			attributes: fields,
		},
	}
}

/// Flatten a single-resource response into `{id, type, ...attributes}`
///
/// Attribute keys are merged last, so they override `id`/`type` on collision.
pub fn flatten_one(response: &Value) -> Map<String, Value> {
	flatten_resource(response.get(DATA_KEY))
}

/// Flatten a list response into one flat object per resource
pub fn flatten_many(response: &Value) -> Vec<Map<String, Value>> {
	match response.get(DATA_KEY) {
		Some(Value::Array(items)) => items.iter().map(|item| flatten_resource(Some(item))).collect(),
		_ => Vec::new(),
	}
}

/// Decode a single-resource response into a flat record
pub fn decode_one<T: DeserializeOwned>(response: &Value) -> Result<T, EnvelopeError> {
	Ok(serde_json::from_value(Value::Object(flatten_one(response)))?)
}

/// Decode a list response into flat records
pub fn decode_many<T: DeserializeOwned>(response: &Value) -> Result<Vec<T>, EnvelopeError> {
	flatten_many(response)
		.into_iter()
		.map(|item| serde_json::from_value(Value::Object(item)).map_err(EnvelopeError::from))
		.collect()
}

fn flatten_resource(data: Option<&Value>) -> Map<String, Value> {
	let empty = || Value::String(String::new());
	let mut flat = Map::new();

	flat.insert(
		ID_KEY.to_string(),
		data.and_then(|d| d.get(ID_KEY)).cloned().unwrap_or_else(empty),
	);
	flat.insert(
		TYPE_KEY.to_string(),
		data.and_then(|d| d.get(TYPE_KEY)).cloned().unwrap_or_else(empty),
	);

	if let Some(Value::Object(attributes)) = data.and_then(|d| d.get(ATTRIBUTES_KEY)) {
		for (key, value) in attributes {
			flat.insert(key.clone(), value.clone());
		}
	}

	flat
}

fn scalar_to_string(value: Value) -> Option<String> {
	match value {
		Value::Null => None,
		Value::String(s) => Some(s),
		other => Some(other.to_string()),
	}
}

fn kind_of(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "boolean",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}
