// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! iconharvest - download an Icons8 collection and package every icon as
//! Windows `.ico` and macOS `.icns` files.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use iconharvest_cli_config::{load_config, CliOverrides, ConfigError};
use iconharvest_common_core::ValidationError;
use iconharvest_pipeline::{exit_code, PipelineError};
use iconharvest_session::{mask_account, FileSessionStore, SessionStore};
use tokio_util::sync::CancellationToken;
use tracing::warn;

mod credentials;
mod harvest;
mod inspect;
mod logging;
mod summary;

/// Harvest an Icons8 collection into .ico and .icns files
#[derive(Parser, Debug)]
#[command(name = "iconharvest", version, about, long_about = None)]
struct Args {
	/// Path to a configuration file (default: ~/.config/iconharvest/config.toml)
	#[arg(short, long, global = true, env = "ICONHARVEST_CONFIG")]
	config: Option<PathBuf>,

	/// Log level (overrides config)
	#[arg(short, long, global = true)]
	log_level: Option<String>,

	/// Log format: pretty, compact or json (overrides config)
	#[arg(long, global = true)]
	log_format: Option<String>,

	/// Write logs to this file instead of stderr
	#[arg(long, global = true)]
	log_file: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Download a collection and package its icons
	Run(RunArgs),
	/// Print the layers of an .ico or .icns file
	Inspect {
		/// Icon file to read
		file: PathBuf,
	},
	/// Forget the stored session for an account
	Logout {
		/// Account e-mail
		#[arg(long, env = "ICONHARVEST_EMAIL")]
		email: String,
	},
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
	/// Collection URL, e.g. https://icons8.com/icons/collections/<id>
	pub collection: String,

	/// Output directory
	#[arg(short, long)]
	pub output: Option<PathBuf>,

	/// Containers to produce
	#[arg(short, long, value_parser = ["ico", "icns", "both"])]
	pub format: Option<String>,

	/// Source resolution to download (16-512)
	#[arg(long)]
	pub size: Option<u32>,

	/// Also keep the downloaded PNG under png/
	#[arg(long)]
	pub keep_png: bool,

	/// Assets downloaded at once (1-16)
	#[arg(short = 'j', long)]
	pub concurrency: Option<usize>,

	/// WebDriver server (chromedriver or geckodriver)
	#[arg(long)]
	pub webdriver_url: Option<String>,

	/// Show the browser window
	#[arg(long)]
	pub headed: bool,

	/// Account e-mail
	#[arg(long, env = "ICONHARVEST_EMAIL")]
	pub email: Option<String>,

	/// Read the password from this file (otherwise ICONHARVEST_PASSWORD)
	#[arg(long, env = "ICONHARVEST_PASSWORD_FILE")]
	pub password_file: Option<PathBuf>,

	/// Read the password from stdin when a login is needed
	#[arg(long)]
	pub password_stdin: bool,
}

impl Args {
	fn overrides(&self) -> CliOverrides {
		let mut overrides = CliOverrides {
			log_level: self.log_level.clone(),
			log_format: self.log_format.clone(),
			log_file: self.log_file.clone(),
			..Default::default()
		};
		if let Command::Run(run) = &self.command {
			overrides.output_dir = run.output.clone();
			overrides.formats = run.format.clone();
			overrides.source_size = run.size;
			overrides.keep_png = run.keep_png.then_some(true);
			overrides.concurrency = run.concurrency;
			overrides.webdriver_url = run.webdriver_url.clone();
			overrides.headless = run.headed.then_some(false);
		}
		overrides
	}
}

/// Exit code for an error that ended the process before a result existed.
fn exit_code_for(err: &anyhow::Error) -> i32 {
	if let Some(e) = err.downcast_ref::<PipelineError>() {
		return e.exit_code();
	}
	if err.downcast_ref::<ConfigError>().is_some() || err.downcast_ref::<ValidationError>().is_some()
	{
		return exit_code::VALIDATION;
	}
	exit_code::NOTHING_PRODUCED
}

async fn run_cli(args: Args) -> Result<i32> {
	let config = load_config(args.overrides(), args.config.clone())?;
	logging::init_tracing(&config.logging)?;

	match args.command {
		Command::Run(run) => {
			let cancel = CancellationToken::new();
			let on_signal = cancel.clone();
			tokio::spawn(async move {
				if tokio::signal::ctrl_c().await.is_ok() {
					warn!("interrupt received, finishing assets in flight");
					on_signal.cancel();
				}
			});
			harvest::run(config, run, cancel).await
		}
		Command::Inspect { file } => {
			print!("{}", inspect::inspect_file(&file)?);
			Ok(exit_code::SUCCESS)
		}
		Command::Logout { email } => {
			let store = FileSessionStore::new(config.paths.session_dir());
			store
				.invalidate(&email)
				.await
				.with_context(|| format!("cannot remove the session for {}", mask_account(&email)))?;
			println!("Signed out {}", mask_account(&email));
			Ok(exit_code::SUCCESS)
		}
	}
}

#[tokio::main]
async fn main() {
	let args = Args::parse();
	let code = match run_cli(args).await {
		Ok(code) => code,
		Err(e) => {
			eprintln!("error: {e:#}");
			exit_code_for(&e)
		}
	};
	std::process::exit(code);
}
