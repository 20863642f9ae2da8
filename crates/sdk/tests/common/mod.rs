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

//! In-process stub of the SAT service and its token endpoint
//!
//! The server runs on its own thread with a dedicated actix system, so it
//! can be driven from both `#[tokio::test]` and plain `#[test]` functions.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, mpsc};
use std::thread;

use actix_web::dev::ServerHandle;
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};

use sat_sdk::SatClientConfig;

pub const PARTNER_PRIVATE: &str = include_str!("../fixtures/partner_private.pem");
pub const PARTNER_PUBLIC: &str = include_str!("../fixtures/partner_public.pem");
pub const SAT_PRIVATE: &str = include_str!("../fixtures/sat_private.pem");
pub const SAT_PUBLIC: &str = include_str!("../fixtures/sat_public.pem");

pub const TOKEN_PATH: &str = "/token";
pub const DEFAULT_TOKEN_BODY: &str =
	r#"{"access_token":"testingToken","token_type":"bearer","expires_in":3600}"#;

/// A request as seen by the stub
#[derive(Debug, Clone)]
pub struct RecordedRequest {
	pub method: String,
	pub path: String,
	pub query: String,
	/// Header names are lowercase
	pub headers: HashMap<String, String>,
	pub body: String,
}

impl RecordedRequest {
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}
}

#[derive(Debug, Clone)]
struct CannedResponse {
	method: String,
	path: String,
	status: u16,
	body: String,
}

struct StubState {
	routes: Mutex<Vec<CannedResponse>>,
	requests: Mutex<Vec<RecordedRequest>>,
	token_requests: Mutex<Vec<RecordedRequest>>,
	token_status: u16,
	/// `{n}` is replaced with the 1-based grant count
	token_body: String,
	token_count: AtomicUsize,
}

pub struct StubServer {
	pub base_url: String,
	state: web::Data<StubState>,
	handle: ServerHandle,
}

impl StubServer {
	pub fn start() -> Self {
		Self::start_with_token(200, DEFAULT_TOKEN_BODY)
	}

	pub fn start_with_token(token_status: u16, token_body: &str) -> Self {
		let state = web::Data::new(StubState {
			routes: Mutex::new(Vec::new()),
			requests: Mutex::new(Vec::new()),
			token_requests: Mutex::new(Vec::new()),
			token_status,
			token_body: token_body.to_string(),
			token_count: AtomicUsize::new(0),
		});

		let (tx, rx) = mpsc::channel();
		let server_state = state.clone();
		thread::spawn(move || {
			let system = actix_rt::System::new();
			system.block_on(async move {
				let server = HttpServer::new(move || {
					App::new()
						.app_data(server_state.clone())
						.default_service(web::to(handle_request))
				})
				.workers(1)
				.bind(("127.0.0.1", 0))
				.expect("bind stub server");
				let addr = server.addrs()[0];
				let running = server.run();
				tx.send((addr, running.handle())).expect("report stub address");
				running.await.expect("stub server");
			});
		});

		let (addr, handle) = rx.recv().expect("stub server startup");
		Self {
			base_url: format!("http://{}", addr),
			state,
			handle,
		}
	}

	/// Reply to `method path` with a JSON body
	pub fn respond(&self, method: &str, path: &str, status: u16, body: serde_json::Value) {
		self.respond_raw(method, path, status, &body.to_string());
	}

	pub fn respond_raw(&self, method: &str, path: &str, status: u16, body: &str) {
		self.state.routes.lock().unwrap().push(CannedResponse {
			method: method.to_string(),
			path: path.to_string(),
			status,
			body: body.to_string(),
		});
	}

	/// Requests received outside the token endpoint, in arrival order
	pub fn requests(&self) -> Vec<RecordedRequest> {
		self.state.requests.lock().unwrap().clone()
	}

	pub fn last_request(&self) -> RecordedRequest {
		self.requests().pop().expect("no request received")
	}

	pub fn token_requests(&self) -> Vec<RecordedRequest> {
		self.state.token_requests.lock().unwrap().clone()
	}

	pub fn config(&self) -> SatClientConfig {
		SatClientConfig::new("client_id", "client_secret", PARTNER_PRIVATE)
			.unwrap()
			.with_public_key(SAT_PUBLIC)
			.with_base_url(&self.base_url)
			.with_access_token_url(format!("{}{}", self.base_url, TOKEN_PATH))
	}
}

impl Drop for StubServer {
	fn drop(&mut self) {
		// The returned future only waits for shutdown; the stop command is sent now.
		drop(self.handle.stop(false));
	}
}

async fn handle_request(req: HttpRequest, body: web::Bytes, state: web::Data<StubState>) -> HttpResponse {
	let recorded = RecordedRequest {
		method: req.method().to_string(),
		path: req.path().to_string(),
		query: req.query_string().to_string(),
		headers: req
			.headers()
			.iter()
			.map(|(name, value)| {
				(
					name.as_str().to_ascii_lowercase(),
					value.to_str().unwrap_or_default().to_string(),
				)
			})
			.collect(),
		body: String::from_utf8_lossy(&body).to_string(),
	};

	if recorded.path == TOKEN_PATH {
		state.token_requests.lock().unwrap().push(recorded);
		let n = state.token_count.fetch_add(1, Ordering::SeqCst) + 1;
		return reply(state.token_status, state.token_body.replace("{n}", &n.to_string()));
	}

	let canned = state
		.routes
		.lock()
		.unwrap()
		.iter()
		.find(|route| route.method == recorded.method && route.path == recorded.path)
		.cloned();
	state.requests.lock().unwrap().push(recorded);

	match canned {
		Some(route) => reply(route.status, route.body),
		None => reply(
			404,
			r#"{"errors":[{"code":"NF","detail":"Not found","status":"404"}]}"#.to_string(),
		),
	}
}

fn reply(status: u16, body: String) -> HttpResponse {
	let status = actix_web::http::StatusCode::from_u16(status)
		.unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);
	HttpResponse::build(status)
		.content_type("application/json")
		.body(body)
}
