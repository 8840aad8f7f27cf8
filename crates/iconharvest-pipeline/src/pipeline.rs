// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::future::Future;
use std::sync::{Arc, Mutex};

use futures::stream::{self, StreamExt};
use iconharvest_auth::{ActiveSession, AuthenticationError, Authenticator};
use iconharvest_common_core::allow_list::IMAGE_HOST;
use iconharvest_common_core::{AllowList, AssetRecord, CollectionRef};
use iconharvest_common_page::PageDriver;
use iconharvest_crawl::{CrawlSettings, Crawler};
use iconharvest_fetch::{
	DownloadError, FetchSettings, Fetcher, ReqwestTransport, Transport, TransportError,
	TransportSettings,
};
use iconharvest_packager::Packager;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::PipelineError;
use crate::guard::SessionGuard;
use crate::outcome::{AssetFailure, AssetOutcome, OutcomeStatus, PipelineResult};
use crate::plan::{plan, Job, Planned};

/// Default number of assets downloaded and packaged at once.
pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
	pub concurrency: usize,
	pub allow: AllowList,
	pub crawl: CrawlSettings,
	pub fetch: FetchSettings,
}

impl Default for PipelineSettings {
	fn default() -> Self {
		Self {
			concurrency: DEFAULT_CONCURRENCY,
			allow: AllowList::icons8(),
			crawl: CrawlSettings::default(),
			fetch: FetchSettings::default(),
		}
	}
}

/// How downloads reach the network.
pub enum FetchTransport {
	/// Use this transport as is.
	Shared(Arc<dyn Transport>),
	/// Build an HTTP client once the session is known, presenting the
	/// browser's user agent when it has one.
	Http(TransportSettings),
}

impl FetchTransport {
	fn resolve(self, session: &ActiveSession) -> Result<Arc<dyn Transport>, TransportError> {
		match self {
			FetchTransport::Shared(transport) => Ok(transport),
			FetchTransport::Http(mut settings) => {
				if let Some(agent) = session.user_agent() {
					settings.user_agent = Some(agent.to_string());
				}
				Ok(Arc::new(ReqwestTransport::new(settings)?))
			}
		}
	}
}

/// One harvest: authenticate, crawl, then fetch and package every asset.
pub struct Pipeline {
	settings: PipelineSettings,
	authenticator: Authenticator,
	page: Box<dyn PageDriver>,
	transport: FetchTransport,
	packager: Packager,
	cancel: CancellationToken,
}

impl Pipeline {
	pub fn new(
		settings: PipelineSettings,
		authenticator: Authenticator,
		page: Box<dyn PageDriver>,
		transport: FetchTransport,
		packager: Packager,
	) -> Self {
		Self {
			settings,
			authenticator,
			page,
			transport,
			packager,
			cancel: CancellationToken::new(),
		}
	}

	pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
		self.cancel = cancel;
		self
	}

	/// Token that stops the run: no asset is started after it fires.
	pub fn cancellation_token(&self) -> CancellationToken {
		self.cancel.clone()
	}

	/// Harvest the collection named by `input`.
	///
	/// The input is validated before anything touches the network. Only
	/// failures that leave nothing to process are returned as errors; every
	/// asset's fate is in the returned [`PipelineResult`].
	#[instrument(skip_all, fields(collection = %input))]
	pub async fn run(self, input: &str) -> Result<PipelineResult, PipelineError> {
		let Pipeline {
			settings,
			mut authenticator,
			mut page,
			transport,
			packager,
			cancel,
		} = self;

		let collection = CollectionRef::parse(input, &settings.allow)?;
		if cancel.is_cancelled() {
			return Err(PipelineError::Cancelled);
		}
		packager.prepare().map_err(PipelineError::Output)?;

		let browsed = browse(
			&cancel,
			&settings.crawl,
			&mut authenticator,
			page.as_mut(),
			&collection,
		)
		.await;
		let (session, records) = match browsed {
			Ok(found) => found,
			Err(e) => {
				close_page(page.as_mut()).await;
				return Err(e);
			}
		};

		let transport = match transport.resolve(&session) {
			Ok(transport) => transport,
			Err(e) => {
				close_page(page.as_mut()).await;
				return Err(PipelineError::Transport(e));
			}
		};

		let guard = SessionGuard::new(authenticator, page, session, IMAGE_HOST);
		let fetcher = Fetcher::new(transport, settings.allow.clone(), settings.fetch.clone());
		let queue = plan(records);
		info!(
			assets = queue.len(),
			concurrency = settings.concurrency,
			"downloading"
		);

		let workers = Workers {
			guard: &guard,
			fetcher: &fetcher,
			packager: &packager,
			stop: cancel.child_token(),
			fatal: Mutex::new(None),
		};
		let outcomes = workers.process(queue, settings.concurrency).await;
		let fatal = workers.take_fatal();
		guard.close().await;

		if let Some(e) = fatal {
			return Err(PipelineError::Authentication(e));
		}

		let result = PipelineResult {
			collection: collection.to_string(),
			outcomes,
			cancelled: cancel.is_cancelled(),
		};
		info!(
			succeeded = result.succeeded(),
			failed = result.failed(),
			skipped = result.skipped(),
			cancelled = result.cancelled,
			"harvest finished"
		);
		Ok(result)
	}
}

/// The single-owner browser phase.
async fn browse(
	cancel: &CancellationToken,
	crawl: &CrawlSettings,
	authenticator: &mut Authenticator,
	page: &mut dyn PageDriver,
	collection: &CollectionRef,
) -> Result<(ActiveSession, Vec<AssetRecord>), PipelineError> {
	let session = until_cancelled(cancel, authenticator.authenticate(page, collection)).await?;
	let crawler = Crawler::new(crawl.clone());
	let records = until_cancelled(cancel, crawler.crawl(page, collection)).await?;
	Ok((session, records))
}

async fn until_cancelled<T, E>(
	cancel: &CancellationToken,
	fut: impl Future<Output = Result<T, E>>,
) -> Result<T, PipelineError>
where
	PipelineError: From<E>,
{
	tokio::select! {
		biased;
		_ = cancel.cancelled() => Err(PipelineError::Cancelled),
		result = fut => result.map_err(PipelineError::from),
	}
}

async fn close_page(page: &mut dyn PageDriver) {
	if let Err(e) = page.close().await {
		warn!(error = %e, "failed to close browser");
	}
}

struct Workers<'a> {
	guard: &'a SessionGuard,
	fetcher: &'a Fetcher,
	packager: &'a Packager,
	/// Fires on external cancellation or a fatal authentication failure.
	stop: CancellationToken,
	fatal: Mutex<Option<AuthenticationError>>,
}

impl Workers<'_> {
	async fn process(&self, queue: Vec<Planned>, concurrency: usize) -> Vec<AssetOutcome> {
		let mut outcomes: Vec<(usize, AssetOutcome)> = stream::iter(queue.into_iter().enumerate())
			.map(|(index, planned)| async move {
				let outcome = match planned {
					Planned::Duplicate(record) => {
						debug!(asset_id = %record.id, "duplicate asset skipped");
						AssetOutcome {
							asset_id: record.id,
							display_name: record.display_name,
							status: OutcomeStatus::SkippedDuplicate,
						}
					}
					Planned::Job(job) => {
						let status = self.process_one(&job).await;
						AssetOutcome {
							asset_id: job.record.id,
							display_name: job.record.display_name,
							status,
						}
					}
				};
				(index, outcome)
			})
			.buffer_unordered(concurrency.max(1))
			.collect()
			.await;

		outcomes.sort_by_key(|(index, _)| *index);
		outcomes.into_iter().map(|(_, outcome)| outcome).collect()
	}

	#[instrument(skip_all, fields(asset_id = %job.record.id, stem = %job.stem))]
	async fn process_one(&self, job: &Job) -> OutcomeStatus {
		if self.stop.is_cancelled() {
			return OutcomeStatus::Failed(AssetFailure::Cancelled);
		}

		let ticket = self.guard.ticket().await;
		let raster = match self.fetcher.fetch(&job.record, ticket.cookie.as_ref()).await {
			Ok(raster) => raster,
			Err(e) if e.is_auth_required() => {
				warn!("download refused for lack of authentication");
				let fresh = match self.guard.refresh(ticket.generation).await {
					Ok(fresh) => fresh,
					Err(AuthenticationError::CredentialsRequired) => {
						debug!("no credentials to sign in with");
						return self.download_failed(e);
					}
					Err(auth) => {
						self.record_fatal(auth);
						return OutcomeStatus::Failed(AssetFailure::Download(e));
					}
				};
				match self.fetcher.fetch(&job.record, fresh.cookie.as_ref()).await {
					Ok(raster) => raster,
					Err(e) => return self.download_failed(e),
				}
			}
			Err(e) => return self.download_failed(e),
		};

		let packager = self.packager.clone();
		let stem = job.stem.clone();
		match tokio::task::spawn_blocking(move || packager.package(&stem, raster)).await {
			Ok(Ok(output)) => {
				info!(files = output.artifacts.len(), "asset packaged");
				OutcomeStatus::Succeeded(output)
			}
			Ok(Err(e)) => {
				warn!(error = %e, "packaging failed");
				OutcomeStatus::Failed(AssetFailure::Packaging(e))
			}
			Err(e) => {
				warn!(error = %e, "packaging task aborted");
				OutcomeStatus::Failed(AssetFailure::Worker(e.to_string()))
			}
		}
	}

	fn download_failed(&self, e: DownloadError) -> OutcomeStatus {
		warn!(error = %e, "download failed");
		OutcomeStatus::Failed(AssetFailure::Download(e))
	}

	fn record_fatal(&self, err: AuthenticationError) {
		warn!(error = %err, "re-authentication failed, stopping");
		let mut fatal = self.fatal.lock().unwrap_or_else(|p| p.into_inner());
		if fatal.is_none() {
			*fatal = Some(err);
		}
		self.stop.cancel();
	}

	fn take_fatal(self) -> Option<AuthenticationError> {
		self.fatal.into_inner().unwrap_or_else(|p| p.into_inner())
	}
}
