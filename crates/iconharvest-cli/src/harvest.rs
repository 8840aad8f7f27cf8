// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wiring configuration into a pipeline run.

use std::sync::Arc;

use anyhow::{Context, Result};
use iconharvest_auth::Authenticator;
use iconharvest_cli_config::HarvestConfig;
use iconharvest_common_core::{AllowList, CollectionRef};
use iconharvest_common_http::RetryConfig;
use iconharvest_crawl::CrawlSettings;
use iconharvest_fetch::{FetchSettings, TransportSettings};
use iconharvest_packager::Packager;
use iconharvest_pipeline::{exit_code, FetchTransport, Pipeline, PipelineSettings};
use iconharvest_session::{FileSessionStore, SessionStore};
use iconharvest_webdriver::{WebDriverPage, WebDriverSettings};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::credentials::{plan_credentials, preset_password, CredentialPlan};
use crate::summary;
use crate::RunArgs;

pub fn pipeline_settings(config: &HarvestConfig, allow: AllowList) -> PipelineSettings {
	let retry = RetryConfig {
		max_attempts: config.retry.max_attempts,
		base_delay: config.retry.base_delay,
		max_delay: config.retry.max_delay,
		backoff_factor: config.retry.backoff_factor,
		jitter: config.retry.jitter,
	};
	PipelineSettings {
		concurrency: config.fetch.concurrency,
		allow,
		crawl: CrawlSettings {
			max_passes: config.browser.max_scroll_passes,
			settle_delay: config.browser.settle_delay,
			marker_timeout: config.browser.marker_timeout,
			source_size: config.output.source_size,
		},
		fetch: FetchSettings {
			max_file_size: config.fetch.max_file_size_bytes,
			retry,
			..FetchSettings::default()
		},
	}
}

pub fn webdriver_settings(config: &HarvestConfig) -> WebDriverSettings {
	WebDriverSettings {
		endpoint: config.browser.webdriver_url.clone(),
		headless: config.browser.headless,
		navigation_timeout: config.browser.navigation_timeout,
		..WebDriverSettings::default()
	}
}

/// Run one harvest and return the process exit code.
#[instrument(skip_all, fields(collection = %args.collection))]
pub async fn run(config: HarvestConfig, args: RunArgs, cancel: CancellationToken) -> Result<i32> {
	let allow = AllowList::icons8();
	// Reject bad input before a browser is started.
	CollectionRef::parse(&args.collection, &allow)?;

	let store = Arc::new(FileSessionStore::new(config.paths.session_dir()));
	let password = preset_password(args.password_file.as_deref())?;
	let session_stored = match args.email.as_deref() {
		Some(email) if password.is_none() && !args.password_stdin => store.exists(email).await,
		_ => false,
	};
	let (account, source) =
		match plan_credentials(args.email, password, args.password_stdin, session_stored)? {
			CredentialPlan::Anonymous => {
				info!("no account given, only public collections are reachable");
				(None, None)
			}
			CredentialPlan::Account { email, source } => (Some(email), source),
		};
	let authenticator = Authenticator::new(store, account, source)
		.with_marker_timeout(config.browser.marker_timeout);

	let page = tokio::select! {
		_ = cancel.cancelled() => return Ok(exit_code::CANCELLED),
		page = WebDriverPage::connect(webdriver_settings(&config)) => page.with_context(|| {
			format!(
				"cannot start a browser session at {}; is chromedriver or geckodriver running?",
				config.browser.webdriver_url
			)
		})?,
	};

	let packager = Packager::new(config.output.dir.clone(), config.output.formats)
		.with_keep_png(config.output.keep_png);
	let output_dirs = packager.directories();
	let transport = FetchTransport::Http(TransportSettings {
		request_timeout: config.fetch.request_timeout,
		max_body_bytes: config.fetch.max_file_size_bytes,
		user_agent: None,
		allow: allow.clone(),
	});

	let result = Pipeline::new(
		pipeline_settings(&config, allow),
		authenticator,
		Box::new(page),
		transport,
		packager,
	)
	.with_cancellation(cancel)
	.run(&args.collection)
	.await?;

	print!("{}", summary::render(&result, &output_dirs));
	Ok(result.exit_code())
}
