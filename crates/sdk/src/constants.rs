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

//! Endpoints, header names and wire constants shared across the SDK.

/// Default OAuth2 token endpoint
pub const ACCESS_TOKEN_URL: &str = "https://accounts.tokopedia.com/token";

/// Default SAT service base URL (playground environment)
pub const PLAYGROUND_SAT_BASE_URL: &str = "https://b2b-playground.tokopedia.com/api";

pub const PING_PATH: &str = "/ping";
pub const INQUIRY_PATH: &str = "/v2/inquiry";
pub const CHECKOUT_PATH: &str = "/v2/order";
/// Prefix of the check-status path; the request ID is appended as the last segment
pub const CHECK_STATUS_PATH: &str = "/v2/order";
pub const PRODUCT_LIST_PATH: &str = "/v2/product-list";
pub const ACCOUNT_PATH: &str = "/v2/account";

/// Query parameter used to filter the product list
pub const PRODUCT_CODE_QUERY: &str = "product_code";

/// Header carrying the RSA-PSS signature of a request or callback body
pub const SIGNATURE_HEADER_KEY: &str = "signature";

/// Header identifying the SDK build on every outbound request (`X-Sat-Sdk-Version`)
pub const SDK_VERSION_HEADER_KEY: &str = "x-sat-sdk-version";

/// `name@version` label sent in [`SDK_VERSION_HEADER_KEY`]
pub const SDK_LABEL: &str = concat!("sat_sdk@v", env!("CARGO_PKG_VERSION"));

/// `Date` header format (RFC 1123, always GMT)
pub const DATE_TIME_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
