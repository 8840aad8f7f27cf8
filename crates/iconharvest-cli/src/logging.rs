// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fs::OpenOptions;
use std::sync::Arc;

use anyhow::{Context, Result};
use iconharvest_cli_config::{LogFormat, LogLevel, LoggingConfig};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn log_level_to_tracing(level: LogLevel) -> tracing::Level {
	match level {
		LogLevel::Trace => tracing::Level::TRACE,
		LogLevel::Debug => tracing::Level::DEBUG,
		LogLevel::Info => tracing::Level::INFO,
		LogLevel::Warn => tracing::Level::WARN,
		LogLevel::Error => tracing::Level::ERROR,
	}
}

pub fn default_directive(level: LogLevel) -> String {
	format!("iconharvest={}", log_level_to_tracing(level))
}

/// Logs go to stderr so stdout carries only the run summary, or to
/// `logging.file` when one is configured.
pub fn init_tracing(logging: &LoggingConfig) -> Result<()> {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(default_directive(logging.level)));

	let (writer, ansi) = match &logging.file {
		Some(path) => {
			let file = OpenOptions::new()
				.create(true)
				.append(true)
				.open(path)
				.with_context(|| format!("cannot open log file {}", path.display()))?;
			(BoxMakeWriter::new(Arc::new(file)), false)
		}
		None => (BoxMakeWriter::new(std::io::stderr), true),
	};

	match logging.format {
		LogFormat::Json => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().json().with_writer(writer))
				.init();
		}
		LogFormat::Compact => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().compact().with_ansi(ansi).with_writer(writer))
				.init();
		}
		LogFormat::Pretty => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().pretty().with_ansi(ansi).with_writer(writer))
				.init();
		}
	}
	Ok(())
}
