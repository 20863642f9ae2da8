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

//! SAT command-line client
//!
//! Reads `SAT_*` settings from the environment (or `--config <file>`),
//! runs one operation and prints the decoded result as JSON on stdout.
//!
//! Usage:
//!   sat-cli ping
//!   sat-cli inquiry --product-code pln-postpaid --client-number 2121212
//!   sat-cli checkout --request-id REQ-1 --product-code pln-postpaid --client-number 2121212 --amount 12500
//!   sat-cli status REQ-1
//!   sat-cli products [--code 25k-xl]
//!   sat-cli account
//!   sat-cli sign '<message>'
//!   sat-cli verify '<message>' '<signature>'

mod logging;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use sat_sdk::{InquiryRequest, OrderRequest, Outcome, SatClient, SatClientConfig, Signer};

use crate::logging::init_logging;

#[derive(Parser)]
#[command(name = "sat-cli")]
#[command(version)]
#[command(about = "Command-line client for the SAT partner API", long_about = None)]
struct Cli {
	/// Configuration file (TOML, JSON or YAML); SAT_* variables still override it
	#[arg(long, global = true)]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// Check connectivity and credentials
	Ping,

	/// Look up the bill for a client number
	Inquiry {
		#[arg(long)]
		product_code: String,
		#[arg(long)]
		client_number: String,
		#[arg(long)]
		amount: Option<i64>,
	},

	/// Place a signed order
	Checkout {
		/// Unique per transaction
		#[arg(long)]
		request_id: String,
		#[arg(long)]
		product_code: String,
		#[arg(long)]
		client_number: String,
		#[arg(long)]
		amount: i64,
	},

	/// Show the state of an order
	Status {
		request_id: String,
	},

	/// List the products enabled for these credentials
	Products {
		/// Only show this product
		#[arg(long)]
		code: Option<String>,
	},

	/// Show the account balance
	Account,

	/// Sign a message with the configured private key
	Sign {
		message: String,
	},

	/// Verify a signature with the configured public key
	Verify {
		message: String,
		signature: String,
	},
}

#[tokio::main]
async fn main() -> Result<()> {
	init_logging()?;

	let cli = Cli::parse();
	let config = match &cli.config {
		Some(path) => SatClientConfig::from_file(path),
		None => SatClientConfig::from_env(),
	}
	.context("Failed to load SAT configuration")?;

	match cli.command {
		Commands::Sign { message } => {
			let signature = signer(&config)?.sign(&message).context("Failed to sign message")?;
			println!("{}", signature);
		}
		Commands::Verify { message, signature } => {
			let valid = signer(&config)?
				.verify(&message, &signature)
				.context("Failed to verify signature")?;
			if !valid {
				bail!("Signature is not valid for this message");
			}
			println!("valid");
		}
		command => {
			info!(target: "sat_cli", base_url = %config.base_url, "Connecting to SAT");
			let client = SatClient::new(config)
				.await
				.context("Failed to create SAT client")?;
			run(&client, command).await?;
		}
	}

	Ok(())
}

async fn run(client: &SatClient, command: Commands) -> Result<()> {
	match command {
		Commands::Ping => print_outcome(client.ping().await?),
		Commands::Inquiry {
			product_code,
			client_number,
			amount,
		} => {
			let mut request = InquiryRequest::new(product_code, client_number);
			if let Some(amount) = amount {
				request = request.with_amount(amount);
			}
			print_outcome(client.inquiry(&request).await?)
		}
		Commands::Checkout {
			request_id,
			product_code,
			client_number,
			amount,
		} => {
			let request = OrderRequest::new(request_id, product_code, client_number, amount);
			print_outcome(client.checkout(&request).await?)
		}
		Commands::Status { request_id } => print_outcome(client.check_status(&request_id).await?),
		Commands::Products { code } => print_outcome(client.list_products(code.as_deref()).await?),
		Commands::Account => print_outcome(client.account().await?),
		// Local commands never reach the network
		Commands::Sign { .. } | Commands::Verify { .. } => Ok(()),
	}
}

fn signer(config: &SatClientConfig) -> Result<Signer> {
	Signer::new(
		Some(&config.private_key),
		config.public_key.as_deref(),
		config.padding_type,
	)
	.context("Failed to load signing keys")
}

/// Print the decoded body; a rejected request is printed and then reported as an error
fn print_outcome<T: Serialize>(outcome: Outcome<T>) -> Result<()> {
	match outcome {
		Outcome::Success(response) => {
			println!("{}", serde_json::to_string_pretty(&*response)?);
			Ok(())
		}
		Outcome::Failure(response) => {
			println!("{}", serde_json::to_string_pretty(&*response)?);
			bail!(
				"Request rejected with HTTP {}: {}",
				response.raw_response().status_code(),
				response.error_messages()
			)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::CommandFactory;

	#[test]
	fn test_cli_definition() {
		Cli::command().debug_assert();
	}

	#[test]
	fn test_parse_checkout() {
		let cli = Cli::try_parse_from([
			"sat-cli",
			"checkout",
			"--request-id",
			"REQ-1",
			"--product-code",
			"pln-postpaid",
			"--client-number",
			"2121212",
			"--amount",
			"12500",
		])
		.unwrap();

		match cli.command {
			Commands::Checkout {
				request_id, amount, ..
			} => {
				assert_eq!(request_id, "REQ-1");
				assert_eq!(amount, 12500);
			}
			_ => panic!("expected checkout"),
		}
	}

	#[test]
	fn test_parse_products_with_code() {
		let cli = Cli::try_parse_from(["sat-cli", "--config", "sat.toml", "products", "--code", "25k-xl"])
			.unwrap();

		assert_eq!(cli.config, Some(PathBuf::from("sat.toml")));
		assert!(matches!(cli.command, Commands::Products { code: Some(ref c) } if c == "25k-xl"));
	}
}
