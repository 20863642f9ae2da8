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

//! Logging initialization for the SAT command-line client
//!
//! # Configuration
//!
//! - `RUST_LOG`: Log level filter (default: `info`)
//!   - Example: `RUST_LOG=sat_sdk=debug`
//!
//! - `LOG_TO_CONSOLE`: Write logs to stderr (default: `true`)
//!   - Set to `false`, `0`, or `no` to silence the console
//!   - stdout is reserved for command output
//!
//! - `LOG_DIR`: Also write logs to `{LOG_DIR}/sat-cli/` (default: unset)
//!   - Rotation: one file per day (UTC), e.g. `sat-cli.2026-01-03.log`
//!   - ANSI colors are disabled in file output

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use tracing::debug;
use tracing_appender::{
	non_blocking,
	rolling::{self, Rotation},
};
use tracing_subscriber::{
	EnvFilter, fmt, layer::SubscriberExt, registry::Registry, util::SubscriberInitExt,
};

/// Default log level (can be overridden by RUST_LOG environment variable)
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Log directory component and file prefix
pub const LOG_COMPONENT_NAME: &str = "sat-cli";

/// Default console output enabled (can be overridden by LOG_TO_CONSOLE environment variable)
pub const DEFAULT_LOG_TO_CONSOLE: bool = true;

// Flushes buffered file output when the process exits
static LOG_GUARD: OnceLock<non_blocking::WorkerGuard> = OnceLock::new();

fn setup_file_logging(log_dir: &Path) -> Result<non_blocking::NonBlocking> {
	let file_appender = rolling::RollingFileAppender::builder()
		.rotation(Rotation::DAILY)
		.filename_prefix(LOG_COMPONENT_NAME.to_string())
		.filename_suffix(".log")
		.build(log_dir)
		.with_context(|| {
			format!(
				"Failed to create rolling file appender in {}",
				log_dir.display()
			)
		})?;

	let (file_writer, guard) = non_blocking(file_appender);
	LOG_GUARD.set(guard).ok();

	Ok(file_writer)
}

/// Initialize logging with console output and optional file output
pub fn init_logging() -> Result<()> {
	dotenv::dotenv().ok();

	let log_level = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

	let log_to_console = env::var("LOG_TO_CONSOLE")
		.map(|v| !(v == "false" || v == "0" || v == "no"))
		.unwrap_or(DEFAULT_LOG_TO_CONSOLE);

	let log_dir = match env::var("LOG_DIR") {
		Ok(root) if !root.trim().is_empty() => {
			let dir = Path::new(&root).join(LOG_COMPONENT_NAME);
			std::fs::create_dir_all(&dir)
				.with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
			Some(dir)
		}
		_ => None,
	};

	let file_layer = match &log_dir {
		Some(dir) => Some(
			fmt::layer()
				.with_writer(setup_file_logging(dir)?)
				.with_timer(fmt::time::UtcTime::rfc_3339())
				.with_thread_ids(true)
				.with_target(true)
				.with_ansi(false),
		),
		None => None,
	};

	let console_layer = log_to_console.then(|| {
		fmt::layer()
			.with_writer(std::io::stderr)
			.with_timer(fmt::time::UtcTime::rfc_3339())
			.with_target(true)
			.with_ansi(true)
	});

	Registry::default()
		.with(filter)
		.with(file_layer)
		.with(console_layer)
		.init();

	debug!(target: "sat_cli", "Log level: {}", log_level);
	if let Some(dir) = &log_dir {
		debug!(
			target: "sat_cli",
			"Log file base name: {}/{}.YYYY-MM-DD.log (daily rolling)",
			dir.display(),
			LOG_COMPONENT_NAME
		);
	}

	Ok(())
}
