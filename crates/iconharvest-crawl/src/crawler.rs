// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::HashSet;
use std::time::Duration;

use iconharvest_common_core::{AssetId, AssetRecord, CollectionRef, LARGEST_CATALOG_SIZE};
use iconharvest_common_page::{Marker, PageDriver, PageState};
use tracing::{debug, info, instrument, warn};

use crate::error::CollectionAccessError;
use crate::extract::{extract_records, records_from_source};

/// Consecutive passes without a new id that mark the end of the collection.
pub const EMPTY_PASSES_TO_STOP: u32 = 2;

#[derive(Debug, Clone)]
pub struct CrawlSettings {
	/// Upper bound on extraction passes, including the first one.
	pub max_passes: u32,
	/// Pause after each load-more trigger for the page to render new tiles.
	pub settle_delay: Duration,
	/// Wait for the first grid tile after navigation.
	pub marker_timeout: Duration,
	/// Source resolution requested in each record's locator.
	pub source_size: u32,
}

impl Default for CrawlSettings {
	fn default() -> Self {
		Self {
			max_passes: 100,
			settle_delay: Duration::from_millis(1200),
			marker_timeout: Duration::from_secs(20),
			source_size: LARGEST_CATALOG_SIZE,
		}
	}
}

/// Records keyed by id, in first-seen order.
#[derive(Debug, Default)]
struct Accumulator {
	seen: HashSet<AssetId>,
	records: Vec<AssetRecord>,
}

impl Accumulator {
	/// Merge a pass and return how many ids were new.
	fn merge(&mut self, batch: Vec<AssetRecord>) -> usize {
		let before = self.records.len();
		for record in batch {
			if self.seen.insert(record.id.clone()) {
				self.records.push(record);
			}
		}
		self.records.len() - before
	}
}

#[derive(Debug, Clone, Default)]
pub struct Crawler {
	settings: CrawlSettings,
}

impl Crawler {
	pub fn new(settings: CrawlSettings) -> Self {
		Self { settings }
	}

	pub fn settings(&self) -> &CrawlSettings {
		&self.settings
	}

	/// Enumerate every asset of `collection`, deduplicated by id, in the order
	/// each id was first seen.
	///
	/// Pass 1 is the extraction right after navigation. Every later pass first
	/// triggers the page's incremental loading. The crawl ends once
	/// [`EMPTY_PASSES_TO_STOP`] consecutive passes add nothing, so a collection
	/// whose last new id appears in pass N finishes after pass N + 2.
	#[instrument(skip_all, fields(collection = %collection))]
	pub async fn crawl(
		&self,
		page: &mut dyn PageDriver,
		collection: &CollectionRef,
	) -> Result<Vec<AssetRecord>, CollectionAccessError> {
		page.navigate(collection.url()).await?;
		match page.detect().await? {
			PageState::NoAccess => {
				return Err(CollectionAccessError::AccessDenied {
					collection: collection.to_string(),
				})
			}
			PageState::Challenge => return Err(CollectionAccessError::ChallengeDetected),
			_ => {}
		}

		if let Err(e) = page
			.wait_for(Marker::AssetGrid, self.settings.marker_timeout)
			.await
		{
			if !e.is_timeout() {
				return Err(e.into());
			}
			debug!("no grid tile appeared before the first pass");
		}

		let mut acc = Accumulator::default();
		let mut empty_streak = 0;
		let mut converged = false;

		for pass in 1..=self.settings.max_passes {
			if pass > 1 {
				page.load_more().await?;
				tokio::time::sleep(self.settings.settle_delay).await;
			}

			let visible = page.extract_visible().await?;
			let added = acc.merge(extract_records(&visible, self.settings.source_size));
			debug!(
				pass,
				visible = visible.len(),
				added,
				total = acc.records.len(),
				"crawl pass"
			);

			if added == 0 {
				empty_streak += 1;
				if empty_streak >= EMPTY_PASSES_TO_STOP {
					converged = true;
					break;
				}
			} else {
				empty_streak = 0;
			}
		}

		if !converged {
			warn!(
				max_passes = self.settings.max_passes,
				found = acc.records.len(),
				"crawl did not converge"
			);
			return Err(CollectionAccessError::DidNotConverge {
				passes: self.settings.max_passes,
				found: acc.records.len(),
			});
		}

		if acc.records.is_empty() {
			let html = page.page_source().await?;
			let recovered = acc.merge(records_from_source(&html, self.settings.source_size));
			if recovered > 0 {
				warn!(assets = recovered, "no icon tiles rendered, ids taken from page source");
			}
		}

		if acc.records.is_empty() {
			return Err(match page.detect().await? {
				PageState::NoAccess => CollectionAccessError::AccessDenied {
					collection: collection.to_string(),
				},
				_ => CollectionAccessError::EmptyOrInaccessible {
					collection: collection.to_string(),
				},
			});
		}

		info!(assets = acc.records.len(), "collection enumerated");
		Ok(acc.records)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use iconharvest_common_core::AllowList;
	use iconharvest_common_page::testing::{icon_tile, ScriptedPage};
	use iconharvest_common_page::VisibleAsset;
	use proptest::prelude::*;

	fn collection() -> CollectionRef {
		CollectionRef::parse(
			"https://icons8.com/icons/collections/abc",
			&AllowList::icons8(),
		)
		.unwrap()
	}

	fn crawler(max_passes: u32) -> Crawler {
		Crawler::new(CrawlSettings {
			max_passes,
			settle_delay: Duration::ZERO,
			marker_timeout: Duration::ZERO,
			source_size: 256,
		})
	}

	fn tiles(n: usize) -> Vec<VisibleAsset> {
		(0..n)
			.map(|i| icon_tile(&format!("id{i}"), &format!("Icon {i}")))
			.collect()
	}

	fn ids(records: &[AssetRecord]) -> Vec<String> {
		records.iter().map(|r| r.id.to_string()).collect()
	}

	#[tokio::test]
	async fn stops_two_passes_after_the_last_new_id() {
		// 10 tiles, 3 per pass: passes 1..=4 add ids, 5 and 6 confirm.
		let page = ScriptedPage::new().public().with_collection(tiles(10), 3);

		let records = crawler(100)
			.crawl(&mut page.clone(), &collection())
			.await
			.unwrap();

		assert_eq!(records.len(), 10);
		assert_eq!(page.extract_calls(), 6);
		assert_eq!(page.load_more_calls(), 5);
	}

	#[tokio::test]
	async fn one_flaky_empty_pass_does_not_end_the_crawl() {
		let all = tiles(4);
		let page = ScriptedPage::new().public().with_passes(vec![
			all[..2].to_vec(),
			all[..2].to_vec(),
			all.clone(),
		]);

		let records = crawler(100)
			.crawl(&mut page.clone(), &collection())
			.await
			.unwrap();

		assert_eq!(records.len(), 4);
		assert_eq!(page.extract_calls(), 5);
	}

	#[tokio::test]
	async fn out_of_order_passes_keep_first_seen_order() {
		let all = tiles(4);
		let page = ScriptedPage::new().public().with_passes(vec![
			vec![all[1].clone(), all[0].clone()],
			vec![all[3].clone(), all[0].clone(), all[2].clone(), all[1].clone()],
		]);

		let records = crawler(100)
			.crawl(&mut page.clone(), &collection())
			.await
			.unwrap();

		assert_eq!(ids(&records), ["id1", "id0", "id3", "id2"]);
	}

	#[tokio::test]
	async fn endless_growth_is_reported() {
		let passes: Vec<Vec<VisibleAsset>> = (1..=20).map(tiles).collect();
		let page = ScriptedPage::new().public().with_passes(passes);

		let err = crawler(5)
			.crawl(&mut page.clone(), &collection())
			.await
			.unwrap_err();

		assert!(matches!(
			err,
			CollectionAccessError::DidNotConverge { passes: 5, found: 5 }
		));
		assert_eq!(page.extract_calls(), 5);
	}

	#[tokio::test]
	async fn denied_collection_is_distinct_from_empty() {
		let page = ScriptedPage::new().public().with_no_access();
		let err = crawler(10)
			.crawl(&mut page.clone(), &collection())
			.await
			.unwrap_err();
		assert!(matches!(err, CollectionAccessError::AccessDenied { .. }));

		let page = ScriptedPage::new().public();
		let err = crawler(10)
			.crawl(&mut page.clone(), &collection())
			.await
			.unwrap_err();
		assert!(matches!(err, CollectionAccessError::EmptyOrInaccessible { .. }));
		assert_eq!(page.extract_calls(), 2);
	}

	#[tokio::test]
	async fn tileless_grid_falls_back_to_page_source() {
		let html = r#"<img src="https://img.icons8.com/?size=48&amp;id=a1">
			<img src="https://img.icons8.com/?size=48&amp;id=b2">
			<img src="https://img.icons8.com/?size=48&amp;id=a1">"#;
		let page = ScriptedPage::new().public().with_page_source(html);

		let records = crawler(10)
			.crawl(&mut page.clone(), &collection())
			.await
			.unwrap();

		assert_eq!(ids(&records), ["a1", "b2"]);
		assert_eq!(records[1].display_name, "icon-b2");
		assert_eq!(page.extract_calls(), 2);
	}

	#[tokio::test]
	async fn rendered_tiles_skip_the_page_source() {
		let page = ScriptedPage::new()
			.public()
			.with_collection(tiles(2), 2)
			.with_page_source(r#"<img src="https://img.icons8.com/?id=extra">"#);

		let records = crawler(10)
			.crawl(&mut page.clone(), &collection())
			.await
			.unwrap();

		assert_eq!(ids(&records), ["id0", "id1"]);
	}

	#[tokio::test]
	async fn default_crawl_requests_the_largest_catalog_size() {
		assert_eq!(CrawlSettings::default().source_size, 512);

		let page = ScriptedPage::new().public().with_collection(tiles(1), 1);
		let crawler = Crawler::new(CrawlSettings {
			settle_delay: Duration::ZERO,
			marker_timeout: Duration::ZERO,
			..CrawlSettings::default()
		});
		let records = crawler.crawl(&mut page.clone(), &collection()).await.unwrap();

		assert!(records[0].source_locator.as_str().contains("size=512"));
	}

	#[tokio::test(start_paused = true)]
	async fn settles_after_each_load() {
		let page = ScriptedPage::new().public().with_collection(tiles(2), 1);
		let crawler = Crawler::new(CrawlSettings {
			max_passes: 100,
			settle_delay: Duration::from_millis(1200),
			marker_timeout: Duration::ZERO,
			source_size: 256,
		});
		let started = tokio::time::Instant::now();

		crawler.crawl(&mut page.clone(), &collection()).await.unwrap();

		// passes 2, 3 and 4 each follow a load.
		let elapsed = started.elapsed();
		assert!(elapsed >= Duration::from_millis(3600), "elapsed {elapsed:?}");
		assert!(elapsed < Duration::from_millis(3700), "elapsed {elapsed:?}");
	}

	proptest! {
		#[test]
		fn output_is_unique_and_first_seen_for_any_batch_size(
			n in 1usize..40,
			batch in 1usize..12,
		) {
			let all = tiles(n);
			// Each pass lists its new tiles first, then repeats earlier ones
			// in reverse, so position never matches scroll order.
			let mut passes = Vec::new();
			let mut shown = 0;
			while shown < n {
				let next = (shown + batch).min(n);
				let mut view: Vec<VisibleAsset> = all[shown..next].to_vec();
				view.extend(all[..shown].iter().rev().cloned());
				passes.push(view);
				shown = next;
			}
			let page = ScriptedPage::new().public().with_passes(passes);

			let rt = tokio::runtime::Builder::new_current_thread()
				.enable_all()
				.build()
				.unwrap();
			let records = rt
				.block_on(crawler(100).crawl(&mut page.clone(), &collection()))
				.unwrap();

			let expected: Vec<String> = (0..n).map(|i| format!("id{i}")).collect();
			prop_assert_eq!(ids(&records), expected);
			let last_adding_pass = n.div_ceil(batch) as u32;
			prop_assert_eq!(page.extract_calls(), last_adding_pass + 2);
		}
	}
}
